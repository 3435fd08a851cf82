//! Application-wide constants and compile-time configuration.
//!
//! All hardware pin assignments, timing parameters, and protocol
//! constants live here so they can be tuned in one place.

// Counting

/// Minimum spacing between two accepted reed-switch closures (ms).
///
/// One pedal revolution closes the switch once; anything faster than
/// this is contact bounce.
pub const DEBOUNCE_WINDOW_MS: u64 = 300;

/// Depth of the edge queue between the sensor task and the main loop.
///
/// Must be a power of two. With a 300 ms debounce window and a 10 ms
/// tick the main loop never sees more than a couple of queued edges.
pub const EDGE_QUEUE_DEPTH: usize = 8;

// Broadcast

/// Maximum spacing between two broadcasts, even with no new cycles (ms).
pub const HEARTBEAT_INTERVAL_MS: u64 = 1000;

/// UDP port the count is broadcast on.
pub const BROADCAST_UDP_PORT: u16 = 20203;

/// Size of the message buffer. The text itself is at most one byte
/// shorter; the last byte is always NUL.
pub const MAX_MESSAGE_LEN: usize = 100;

/// Main loop period (ms). One broadcast decision is made per tick.
pub const TICK_PERIOD_MS: u64 = 10;

// Listener (host side)

/// Silence after which a listener treats the next packet as a fresh
/// start, even without an explicit reset message (ms).
pub const PACKET_RESET_MS: u64 = 5_000;

/// Silence after which the current trip is closed and logged (ms).
pub const TRIP_QUIET_MS: u64 = 60_000;

// Network

/// MAC address of the W5500 module (locally administered).
/// Replace with a unique address when running more than one counter.
pub const ETH_MAC_ADDR: [u8; 6] = [0x02, 0x00, 0x00, 0x20, 0x20, 0x03];

/// UDP socket buffer sizes (bytes). Only outbound packets are used.
pub const UDP_TX_BUFFER: usize = 256;
pub const UDP_RX_BUFFER: usize = 64;

// GPIO pin assignments (nRF52840-DK defaults)
//
// These are logical names; actual `embassy_nrf::peripherals::*` types are
// selected in `main.rs`.  Adjust for your custom PCB.
//
//   Reed switch    → P0.21 (active-low, internal pull-up)
//   W5500 SCK      → P1.15
//   W5500 MISO     → P1.14
//   W5500 MOSI     → P1.13
//   W5500 CS       → P1.12
//   W5500 INT      → P1.11
//   W5500 RST      → P1.10
