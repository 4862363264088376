//! Newline-delimited frame accumulation.

use crate::{TransportError, TransportResult};

/// Largest frame accepted from the relay.
pub(crate) const MAX_FRAME_BYTES: usize = 1024 * 1024;

/// Accumulates raw bytes and yields complete lines.
///
/// Reads are done in chunks so a timed-out read never loses a partial line.
#[derive(Debug, Default)]
pub(crate) struct LineBuffer {
    buf: Vec<u8>,
    /// Dropping the rest of an oversized frame until its terminator.
    discarding: bool,
}

impl LineBuffer {
    pub(crate) fn extend(&mut self, bytes: &[u8]) -> TransportResult<()> {
        let bytes = if self.discarding {
            match bytes.iter().position(|b| *b == b'\n') {
                Some(pos) => {
                    self.discarding = false;
                    &bytes[pos + 1..]
                }
                None => return Ok(()),
            }
        } else {
            bytes
        };

        self.buf.extend_from_slice(bytes);
        if self.buf.len() > MAX_FRAME_BYTES && !self.buf.contains(&b'\n') {
            let len = self.buf.len();
            self.buf.clear();
            self.discarding = true;
            return Err(TransportError::FrameTooLarge(len));
        }
        Ok(())
    }

    /// Pop the next non-empty line, without its terminator.
    pub(crate) fn next_line(&mut self) -> Option<String> {
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_line_waits_for_terminator() {
        let mut frames = LineBuffer::default();
        frames.extend(b"{\"a\":").unwrap();
        assert_eq!(frames.next_line(), None);
        frames.extend(b"1}\n{\"b\"").unwrap();
        assert_eq!(frames.next_line().as_deref(), Some("{\"a\":1}"));
        assert_eq!(frames.next_line(), None);
    }

    #[test]
    fn test_skips_blank_lines_and_crlf() {
        let mut frames = LineBuffer::default();
        frames.extend(b"\n\r\none\r\ntwo\n").unwrap();
        assert_eq!(frames.next_line().as_deref(), Some("one"));
        assert_eq!(frames.next_line().as_deref(), Some("two"));
        assert_eq!(frames.next_line(), None);
    }

    #[test]
    fn test_oversized_frame_is_discarded() {
        let mut frames = LineBuffer::default();
        let big = vec![b'x'; MAX_FRAME_BYTES + 1];
        assert!(matches!(
            frames.extend(&big),
            Err(TransportError::FrameTooLarge(_))
        ));
        frames.extend(b"still the big frame").unwrap();
        assert_eq!(frames.next_line(), None);

        frames.extend(b"tail\n{\"next\":1}\n").unwrap();
        assert_eq!(frames.next_line().as_deref(), Some("{\"next\":1}"));
        assert_eq!(frames.next_line(), None);
    }

    #[test]
    fn test_oversized_frame_ending_in_same_chunk() {
        let mut frames = LineBuffer::default();
        let big = vec![b'x'; MAX_FRAME_BYTES + 1];
        assert!(frames.extend(&big).is_err());

        frames.extend(b"\nok\n").unwrap();
        assert_eq!(frames.next_line().as_deref(), Some("ok"));
    }
}
