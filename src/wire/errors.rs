use miette::Diagnostic;
use thiserror::Error;

/// Errors produced by the frame codec.
#[derive(Debug, Error, Diagnostic)]
pub enum WireError {
    /// The byte stream violates the frame format. `offset` is the absolute
    /// position of the offending byte, counted from the start of the
    /// connection.
    #[error("malformed frame at byte {offset}: {reason}")]
    #[diagnostic(
        code(satscope::wire::protocol),
        help("The producer stream is unreliable from this point on; close the connection.")
    )]
    Protocol { offset: u64, reason: String },
}

impl WireError {
    pub(crate) fn protocol(offset: u64, reason: impl Into<String>) -> Self {
        WireError::Protocol {
            offset,
            reason: reason.into(),
        }
    }

    /// Absolute byte offset the error was detected at.
    pub fn offset(&self) -> u64 {
        match self {
            WireError::Protocol { offset, .. } => *offset,
        }
    }
}
