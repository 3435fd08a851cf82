//! Target-only glue - the pieces that touch nRF52840 peripherals.
//!
//! ## Components
//!
//! - **Sensor**: reed switch on a GPIOTE-backed input, feeds the edge queue
//! - **Eth**: W5500 Ethernet + embassy-net stack, exposed as a `Transport`

pub mod eth;
pub mod sensor;
