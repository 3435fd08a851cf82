//! Host-testable library for trip-computer.
//!
//! Everything here is pure logic with no hardware dependency: counting,
//! debouncing, the broadcast state machine and wire format, plus the
//! listener-side tracker and trip recorder used by the host tools.
//!
//! Usage: `cargo test --lib`
//!
//! Note: The embedded binary uses main.rs with #![no_std] and #![no_main]
//! and links against this library for its core logic. The host tools
//! live under `src/bin/` behind the `host` feature.

#![cfg_attr(not(test), no_std)]

// ═══════════════════════════════════════════════════════════════════════════
// Device side
// ═══════════════════════════════════════════════════════════════════════════

pub mod config;
pub mod counting;
pub mod device;
pub mod error;
pub mod net;

// ═══════════════════════════════════════════════════════════════════════════
// Listener side
// ═══════════════════════════════════════════════════════════════════════════

pub mod listener;
pub mod trip;

pub use counting::{CycleCounter, DebounceFilter, EdgeConsumer, EdgeEvent, EdgeProducer, EdgeQueue};
pub use device::Device;
pub use error::{Error, ProtocolError, TransportError};
pub use listener::{PacketTracker, Received};
pub use net::{
    subnet_broadcast, BroadcastStateMachine, LinkState, Message, MessageKind, TickOutcome,
    Transport,
};
pub use trip::{Trip, TripRecorder};
