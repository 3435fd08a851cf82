//! trip-computer firmware - nRF52840 + W5500.
//!
//! Counts reed-switch closures (one per pedal revolution) and broadcasts
//! the running count on the local subnet:
//!
//! - **sensor task**: timestamps falling edges into the edge queue
//! - **ethernet / net tasks**: W5500 driver and embassy-net stack
//! - **main loop**: every tick, debounce queued edges, then let the
//!   broadcast state machine decide whether to send

#![no_std]
#![no_main]

mod firmware;

use defmt::{debug, info, unwrap, warn};
use embassy_executor::Spawner;
use embassy_net::udp::PacketMetadata;
use embassy_nrf::gpio::{Input, Level, Output, OutputDrive, Pin as _, Pull};
use embassy_nrf::rng::{self, Rng};
use embassy_nrf::{bind_interrupts, peripherals, spim};
use embassy_time::{Delay, Duration, Instant, Ticker};
use embedded_hal_bus::spi::ExclusiveDevice;
use static_cell::StaticCell;
use trip_computer::config::{TICK_PERIOD_MS, UDP_RX_BUFFER, UDP_TX_BUFFER};
use trip_computer::{Device, EdgeQueue, TickOutcome};
use {defmt_rtt as _, panic_probe as _};

use firmware::eth::{self, EthTransport};
use firmware::sensor::sensor_task;

bind_interrupts!(struct Irqs {
    SPIM3 => spim::InterruptHandler<peripherals::SPI3>;
    RNG => rng::InterruptHandler<peripherals::RNG>;
});

static EDGES: StaticCell<EdgeQueue> = StaticCell::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_nrf::init(Default::default());
    info!("trip-computer starting");

    // Edge queue: sensor task produces, main loop consumes.
    let (producer, mut edges) = EDGES.init(EdgeQueue::new()).split();
    unwrap!(spawner.spawn(sensor_task(p.P0_21.degrade(), producer)));

    // W5500 on SPIM3.
    let mut spi_config = spim::Config::default();
    spi_config.frequency = spim::Frequency::M32;
    let spim = spim::Spim::new(p.SPI3, Irqs, p.P1_15, p.P1_14, p.P1_13, spi_config);
    let cs = Output::new(p.P1_12, Level::High, OutputDrive::Standard);
    let spi = unwrap!(ExclusiveDevice::new(spim, cs, Delay));
    let int = Input::new(p.P1_11, Pull::Up);
    let reset = Output::new(p.P1_10, Level::High, OutputDrive::Standard);

    let mut rng = Rng::new(p.RNG, Irqs);
    let mut seed = [0u8; 8];
    rng.blocking_fill_bytes(&mut seed);

    let stack = eth::init(&spawner, spi, int, reset, u64::from_le_bytes(seed)).await;

    let mut rx_meta = [PacketMetadata::EMPTY; 1];
    let mut rx_buffer = [0u8; UDP_RX_BUFFER];
    let mut tx_meta = [PacketMetadata::EMPTY; 4];
    let mut tx_buffer = [0u8; UDP_TX_BUFFER];
    let mut transport = EthTransport::new(
        stack,
        &mut rx_meta,
        &mut rx_buffer,
        &mut tx_meta,
        &mut tx_buffer,
    );

    let mut device = Device::default();
    let mut ticker = Ticker::every(Duration::from_millis(TICK_PERIOD_MS));
    let mut was_connected = false;
    let mut dropped_edges = 0;

    loop {
        if device.drain(&mut edges) > 0 {
            debug!("Count: {}", device.count());
        }
        if edges.dropped() != dropped_edges {
            dropped_edges = edges.dropped();
            warn!("Sensor: edge queue full, {} edges dropped", dropped_edges);
        }

        let outcome = device.tick(Instant::now().as_millis(), &mut transport).await;
        match outcome {
            TickOutcome::Idle => {}
            TickOutcome::Sent(msg) => debug!("Broadcast: {}", msg),
            TickOutcome::Skipped(msg) => warn!("Broadcast: link lost, skipped {}", msg),
            TickOutcome::Failed(msg, e) => warn!("Broadcast: {} failed: {}", msg, e),
        }

        if device.is_connected() != was_connected {
            was_connected = device.is_connected();
            match device.broadcaster().target() {
                Some(to) if was_connected => {
                    info!("Net: connected, broadcasting to {}", to.octets())
                }
                _ => info!("Net: disconnected"),
            }
        }

        ticker.next().await;
    }
}
