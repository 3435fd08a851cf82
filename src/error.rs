//! Unified error type for trip-computer.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Implements `defmt::Format` (behind the `defmt` feature) for efficient
//! on-target logging, and `Display` for the host tools.

use core::fmt;

/// Top-level error type used across the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The network transport could not deliver a datagram.
    Transport(TransportError),

    /// A received datagram is not a valid counter message.
    Protocol(ProtocolError),
}

/// Failures reported by a [`Transport`](crate::broadcast::Transport).
///
/// The broadcast state machine absorbs these: they show up in the tick
/// outcome for logging and are never propagated as faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// The link went down between the tick's sample and the send.
    Disconnected,
    /// The network stack refused the datagram (no route, buffer full).
    SendFailed,
}

/// Decode failures for incoming datagrams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProtocolError {
    /// Datagram was empty (or only padding).
    Empty,
    /// The 4-byte tag is neither `VBR:` nor `VBC:`.
    UnknownKind,
    /// Tag was fine but the `<seq>,<count>` payload did not parse.
    Malformed,
}

// Convenience conversions

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Error::Transport(e)
    }
}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        Error::Protocol(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Transport(e) => write!(f, "transport error: {e}"),
            Error::Protocol(e) => write!(f, "protocol error: {e}"),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            TransportError::Disconnected => "link is down",
            TransportError::SendFailed => "datagram rejected by network stack",
        };
        f.write_str(msg)
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            ProtocolError::Empty => "empty datagram",
            ProtocolError::UnknownKind => "unknown message tag",
            ProtocolError::Malformed => "malformed sequence/count payload",
        };
        f.write_str(msg)
    }
}
