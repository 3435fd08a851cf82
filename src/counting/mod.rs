//! Cycle counting - reed-switch edges in, debounced count out.
//!
//! ## Components
//!
//! - **Intake**: lock-free edge queue fed by the sensor task
//! - **Debounce**: drops edges closer than the debounce window
//! - **Counter**: the running count and its dirty flag

pub mod counter;
pub mod debounce;
pub mod intake;

pub use counter::CycleCounter;
pub use debounce::DebounceFilter;
pub use intake::{EdgeConsumer, EdgeEvent, EdgeProducer, EdgeQueue};
