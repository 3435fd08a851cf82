//! Reed-switch input.
//!
//! The switch is active-low with the internal pull-up enabled. Each
//! falling edge is timestamped and pushed into the edge queue; debouncing
//! happens later on the main loop. Nothing else may happen here: no
//! logging, no counter access, no waiting on anything but the pin.

use embassy_nrf::gpio::{AnyPin, Input, Pull};
use embassy_time::Instant;
use trip_computer::EdgeProducer;

#[embassy_executor::task]
pub async fn sensor_task(pin: AnyPin, mut edges: EdgeProducer<'static>) -> ! {
    let mut switch = Input::new(pin, Pull::Up);

    loop {
        // Wait for falling edge (magnet passing, active-low).
        switch.wait_for_falling_edge().await;
        // A full queue drops the edge; the consumer reports the drop count.
        let _ = edges.push(Instant::now().as_millis());
    }
}
