//! Length-prefixed frame codec for the producer wire protocol.
//!
//! Every frame is `[u32 big-endian payload length][u8 type tag][payload]`,
//! where the payload length covers the tag byte and the payload. Variable
//! ids, counts, and step numbers are LEB128 varints since ids are unbounded
//! in principle. Solution literals use the unsigned mapping
//! `value ? 2*var : 2*var + 1` so polarity survives varint encoding.
//!
//! Encoding is a pure function ([`encode_frame`]); decoding is a resumable
//! state machine ([`FrameDecoder`]) that tolerates frames split arbitrarily
//! across reads and never blocks. A malformed or unknown frame yields
//! [`WireError::Protocol`] with the offending absolute byte offset; the
//! caller decides whether that is fatal for the connection.

mod codec;
mod decoder;
mod errors;

pub use codec::{FrameTag, encode_frame};
pub use decoder::FrameDecoder;
pub use errors::WireError;
