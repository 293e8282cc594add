//! Resumable frame decoder.

use bytes::{Buf, BytesMut};

use super::codec::{FrameTag, LEN_PREFIX, read_varint, unmap_literal};
use super::errors::WireError;
use crate::event::{Polarity, TraceEvent};

/// Incremental decoder over a growing byte buffer.
///
/// Feed it chunks as they arrive from the socket, then drain complete frames
/// with [`FrameDecoder::next_frame`]. Partial frames are held until the rest
/// arrives, so chunk boundaries never lose or duplicate events.
///
/// ```
/// use satscope::event::TraceEvent;
/// use satscope::wire::{FrameDecoder, encode_frame};
///
/// let frame = encode_frame(&TraceEvent::ClauseObserved { vars: vec![1, 2] });
/// let mut decoder = FrameDecoder::new(1024);
///
/// // Split the frame anywhere; the decoder resumes across feeds.
/// decoder.feed(&frame[..3]);
/// assert!(decoder.next_frame().unwrap().is_none());
/// decoder.feed(&frame[3..]);
/// assert!(decoder.next_frame().unwrap().is_some());
/// ```
///
/// After a [`WireError`] the stream position is unreliable and the decoder
/// should be discarded along with the connection.
#[derive(Debug)]
pub struct FrameDecoder {
    buf: BytesMut,
    /// Absolute offset of `buf[0]` from the start of the stream.
    consumed: u64,
    max_frame_len: usize,
}

impl FrameDecoder {
    pub fn new(max_frame_len: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(4096),
            consumed: 0,
            max_frame_len,
        }
    }

    /// Append raw bytes read from the transport.
    pub fn feed(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Number of buffered bytes not yet decoded.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Try to decode the next complete frame.
    ///
    /// Returns `Ok(None)` when more bytes are needed — never blocks.
    pub fn next_frame(&mut self) -> Result<Option<TraceEvent>, WireError> {
        if self.buf.len() < LEN_PREFIX {
            return Ok(None);
        }
        let declared = u32::from_be_bytes([self.buf[0], self.buf[1], self.buf[2], self.buf[3]]);
        let payload_len = declared as usize;
        if payload_len == 0 {
            return Err(WireError::protocol(self.consumed, "empty frame payload"));
        }
        if payload_len > self.max_frame_len {
            return Err(WireError::protocol(
                self.consumed,
                format!("declared payload length {payload_len} exceeds cap {}", self.max_frame_len),
            ));
        }
        if self.buf.len() < LEN_PREFIX + payload_len {
            return Ok(None);
        }

        let frame_start = self.consumed;
        let mut frame = self.buf.split_to(LEN_PREFIX + payload_len);
        frame.advance(LEN_PREFIX);
        let tag_offset = frame_start + LEN_PREFIX as u64;
        let event = decode_payload(&frame, tag_offset)?;
        self.consumed = frame_start + (LEN_PREFIX + payload_len) as u64;
        Ok(Some(event))
    }
}

/// Decode the tag byte plus payload of one frame. `tag_offset` is the
/// absolute stream offset of the tag byte, used for error reporting.
fn decode_payload(frame: &[u8], tag_offset: u64) -> Result<TraceEvent, WireError> {
    let tag_byte = frame[0];
    let tag = FrameTag::from_byte(tag_byte)
        .ok_or_else(|| WireError::protocol(tag_offset, format!("unknown frame tag {tag_byte:#04x}")))?;
    let body = &frame[1..];
    let mut pos = 0usize;
    let err_at = |pos: usize, reason: &str| {
        WireError::protocol(tag_offset + 1 + pos as u64, reason.to_string())
    };

    let event = match tag {
        FrameTag::Clause | FrameTag::Conflict => {
            let at = pos;
            let count = read_varint(body, &mut pos)
                .ok_or_else(|| err_at(at, "truncated variable count"))?;
            let mut vars = Vec::with_capacity(count.min(1024) as usize);
            for _ in 0..count {
                let at = pos;
                let var =
                    read_varint(body, &mut pos).ok_or_else(|| err_at(at, "truncated variable id"))?;
                if var == 0 {
                    return Err(err_at(at, "variable id zero is invalid"));
                }
                vars.push(var);
            }
            if tag == FrameTag::Clause {
                TraceEvent::ClauseObserved { vars }
            } else {
                TraceEvent::ConflictObserved { vars }
            }
        }
        FrameTag::Touch => {
            let at = pos;
            let var =
                read_varint(body, &mut pos).ok_or_else(|| err_at(at, "truncated variable id"))?;
            if var == 0 {
                return Err(err_at(at, "variable id zero is invalid"));
            }
            let polarity = match body.get(pos).copied() {
                Some(0) => Polarity::Positive,
                Some(1) => Polarity::Negative,
                Some(_) => return Err(err_at(pos, "invalid polarity byte")),
                None => return Err(err_at(pos, "truncated polarity byte")),
            };
            pos += 1;
            let at = pos;
            let step = read_varint(body, &mut pos).ok_or_else(|| err_at(at, "truncated step"))?;
            TraceEvent::VariableTouched {
                var,
                polarity,
                step,
            }
        }
        FrameTag::Solution => {
            let at = pos;
            let count = read_varint(body, &mut pos)
                .ok_or_else(|| err_at(at, "truncated literal count"))?;
            let mut assignment = Vec::with_capacity(count.min(1024) as usize);
            for _ in 0..count {
                let at = pos;
                let mapping = read_varint(body, &mut pos)
                    .ok_or_else(|| err_at(at, "truncated literal mapping"))?;
                let literal = unmap_literal(mapping);
                if literal.var == 0 {
                    return Err(err_at(at, "literal maps to variable zero"));
                }
                assignment.push(literal);
            }
            TraceEvent::SolutionFound { assignment }
        }
        FrameTag::Heartbeat => TraceEvent::Heartbeat,
        FrameTag::StreamEnd => TraceEvent::StreamEnded,
    };

    if pos != body.len() {
        return Err(err_at(pos, "trailing bytes after frame payload"));
    }
    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::encode_frame;

    #[test]
    fn empty_payload_is_protocol_error() {
        let mut decoder = FrameDecoder::new(1024);
        decoder.feed(&0u32.to_be_bytes());
        let err = decoder.next_frame().unwrap_err();
        assert_eq!(err.offset(), 0);
    }

    #[test]
    fn oversized_frame_is_protocol_error() {
        let mut decoder = FrameDecoder::new(16);
        decoder.feed(&1024u32.to_be_bytes());
        assert!(decoder.next_frame().is_err());
    }

    #[test]
    fn unknown_tag_reports_tag_offset() {
        let mut decoder = FrameDecoder::new(1024);
        decoder.feed(&1u32.to_be_bytes());
        decoder.feed(&[0x7e]);
        let err = decoder.next_frame().unwrap_err();
        // 4 length bytes precede the tag.
        assert_eq!(err.offset(), 4);
    }

    #[test]
    fn offsets_accumulate_across_frames() {
        let first = encode_frame(&TraceEvent::Heartbeat);
        let mut decoder = FrameDecoder::new(1024);
        decoder.feed(&first);
        decoder.next_frame().unwrap().unwrap();

        decoder.feed(&1u32.to_be_bytes());
        decoder.feed(&[0xff]);
        let err = decoder.next_frame().unwrap_err();
        assert_eq!(err.offset(), first.len() as u64 + 4);
    }
}
