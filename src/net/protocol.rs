//! Wire format of the counter broadcast.
//!
//! Each datagram is a short ASCII line:
//!
//! ```text
//! VBR:<seq>,<count>   reset  - device just came online
//! VBC:<seq>,<count>   update - routine report / heartbeat
//! ```
//!
//! `<seq>` and `<count>` are unsigned decimals. No checksum or framing
//! beyond UDP. The message buffer is 100 bytes and the last byte is
//! always NUL, so the text is at most 99 bytes; only the text is sent.

use core::fmt::{self, Write};
use core::str;

use heapless::Vec;

use crate::config::MAX_MESSAGE_LEN;
use crate::error::ProtocolError;

/// Encoded datagram payload.
pub type MessageBuf = Vec<u8, MAX_MESSAGE_LEN>;

const RESET_TAG: &str = "VBR:";
const UPDATE_TAG: &str = "VBC:";

/// What a listener should make of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MessageKind {
    /// First message after (re)connecting. Listeners re-baseline on it.
    Reset,
    /// Count changed, or heartbeat.
    Update,
}

impl MessageKind {
    pub fn tag(self) -> &'static str {
        match self {
            MessageKind::Reset => RESET_TAG,
            MessageKind::Update => UPDATE_TAG,
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            RESET_TAG => Some(MessageKind::Reset),
            UPDATE_TAG => Some(MessageKind::Update),
            _ => None,
        }
    }
}

/// One counter broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Message {
    pub kind: MessageKind,
    /// Packet sequence number, diagnostic only.
    pub seq: u32,
    /// Cycle count at send time.
    pub count: u32,
}

impl Message {
    pub fn reset(seq: u32, count: u32) -> Self {
        Self {
            kind: MessageKind::Reset,
            seq,
            count,
        }
    }

    pub fn update(seq: u32, count: u32) -> Self {
        Self {
            kind: MessageKind::Update,
            seq,
            count,
        }
    }

    /// Render the datagram text.
    pub fn encode(&self) -> MessageBuf {
        let mut out = Truncating(Vec::new());
        // Truncating never reports an error.
        let _ = write!(out, "{}{},{}", self.kind.tag(), self.seq, self.count);
        out.0
    }

    /// Parse a received datagram.
    ///
    /// Anything after the first NUL is padding and ignored, as is
    /// surrounding whitespace.
    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
        let text = str::from_utf8(&data[..end])
            .map_err(|_| ProtocolError::Malformed)?
            .trim();

        if text.is_empty() {
            return Err(ProtocolError::Empty);
        }

        let kind = text
            .get(..4)
            .and_then(MessageKind::from_tag)
            .ok_or(ProtocolError::UnknownKind)?;

        let (seq, count) = text[4..]
            .split_once(',')
            .ok_or(ProtocolError::Malformed)?;

        Ok(Self {
            kind,
            seq: parse_decimal(seq)?,
            count: parse_decimal(count)?,
        })
    }
}

fn parse_decimal(field: &str) -> Result<u32, ProtocolError> {
    let field = field.trim();
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ProtocolError::Malformed);
    }
    field.parse().map_err(|_| ProtocolError::Malformed)
}

/// `fmt::Write` sink that keeps the first `MAX_MESSAGE_LEN - 1` bytes and
/// silently drops the rest.
struct Truncating(MessageBuf);

impl Write for Truncating {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let room = (MAX_MESSAGE_LEN - 1).saturating_sub(self.0.len());
        let take = s.len().min(room);
        // `take` never exceeds the remaining capacity.
        let _ = self.0.extend_from_slice(&s.as_bytes()[..take]);
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Unit Tests
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_reset_and_update_tags() {
        assert_eq!(Message::reset(1, 0).encode().as_slice(), b"VBR:1,0");
        assert_eq!(Message::update(2, 1).encode().as_slice(), b"VBC:2,1");
    }

    #[test]
    fn encodes_largest_values_within_limit() {
        let buf = Message::update(u32::MAX, u32::MAX).encode();
        assert_eq!(buf.as_slice(), b"VBC:4294967295,4294967295");
        assert!(buf.len() < MAX_MESSAGE_LEN);
    }

    #[test]
    fn truncating_writer_stops_at_99_bytes() {
        let mut out = Truncating(Vec::new());
        for _ in 0..30 {
            write!(out, "abcdef").unwrap();
        }
        assert_eq!(out.0.len(), MAX_MESSAGE_LEN - 1);
    }

    #[test]
    fn decodes_what_it_encodes() {
        for msg in [Message::reset(7, 123), Message::update(8, 124)] {
            assert_eq!(Message::decode(&msg.encode()), Ok(msg));
        }
    }

    #[test]
    fn decode_ignores_nul_padding() {
        let mut padded = [0u8; MAX_MESSAGE_LEN];
        padded[..9].copy_from_slice(b"VBC:42,17");
        assert_eq!(Message::decode(&padded), Ok(Message::update(42, 17)));
    }

    #[test]
    fn decode_tolerates_trailing_newline() {
        assert_eq!(Message::decode(b"VBR:3,9\n"), Ok(Message::reset(3, 9)));
    }

    #[test]
    fn decode_rejects_unknown_tag() {
        assert_eq!(Message::decode(b"ABC:1,2"), Err(ProtocolError::UnknownKind));
        assert_eq!(Message::decode(b"VB"), Err(ProtocolError::UnknownKind));
    }

    #[test]
    fn decode_rejects_empty() {
        assert_eq!(Message::decode(b""), Err(ProtocolError::Empty));
        assert_eq!(Message::decode(&[0u8; 16]), Err(ProtocolError::Empty));
    }

    #[test]
    fn decode_rejects_bad_payloads() {
        for bad in [
            &b"VBC:"[..],
            b"VBC:12",
            b"VBC:1,2,3",
            b"VBC:-1,2",
            b"VBC:1,x",
            b"VBC:99999999999,1",
            b"VBC:,5",
        ] {
            assert_eq!(Message::decode(bad), Err(ProtocolError::Malformed), "{bad:?}");
        }
    }

    #[test]
    fn decode_rejects_invalid_utf8() {
        assert_eq!(
            Message::decode(&[b'V', b'B', b'C', b':', 0xFF, b',', b'1']),
            Err(ProtocolError::Malformed)
        );
    }
}
