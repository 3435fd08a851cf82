//! Broadcast simulator
//!
//! Runs the real counter core on the host: a synthetic reed switch
//! (with contact bounce) feeds the device, and the broadcasts go out on a
//! host UDP socket. Handy for testing listeners without the hardware.
//!
//! Usage: `broadcast-sim [target-ip] [cadence-ms]`

use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tokio::net::UdpSocket;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trip_computer::config::{BROADCAST_UDP_PORT, TICK_PERIOD_MS};
use trip_computer::{Device, TickOutcome, Transport, TransportError};

const DEFAULT_CADENCE_MS: u64 = 800;
/// Extra edge this long after each real one, inside the debounce window.
const BOUNCE_MS: u64 = 4;
/// The switch is ignored for one debounce window after boot.
const FIRST_PEDAL_MS: u64 = 1_000;

struct HostTransport {
    socket: UdpSocket,
    target: Ipv4Addr,
}

impl Transport for HostTransport {
    fn is_connected(&self) -> bool {
        true
    }

    fn local_broadcast_address(&self) -> Ipv4Addr {
        self.target
    }

    async fn send_broadcast(&mut self, to: Ipv4Addr, payload: &[u8]) -> Result<(), TransportError> {
        self.socket
            .send_to(payload, (to, BROADCAST_UDP_PORT))
            .await
            .map(|_| ())
            .map_err(|e| {
                tracing::debug!("send_to {} failed: {}", to, e);
                TransportError::SendFailed
            })
    }
}

/// Synthetic pedal: one real edge every `cadence_ms` plus a bounce.
struct Pedal {
    cadence_ms: u64,
    next_ms: u64,
    bounce_pending: Option<u64>,
}

impl Pedal {
    fn new(cadence_ms: u64) -> Self {
        Self {
            cadence_ms: cadence_ms.max(1),
            next_ms: FIRST_PEDAL_MS,
            bounce_pending: None,
        }
    }

    /// Raw edges due at or before `now_ms`.
    fn edges_until(&mut self, now_ms: u64) -> Vec<u64> {
        let mut edges = Vec::new();
        loop {
            match self.bounce_pending {
                Some(at) if at <= now_ms && at < self.next_ms => {
                    edges.push(at);
                    self.bounce_pending = None;
                    continue;
                }
                _ => {}
            }
            if self.next_ms > now_ms {
                break;
            }
            edges.push(self.next_ms);
            self.bounce_pending = Some(self.next_ms + BOUNCE_MS);
            self.next_ms += self.cadence_ms;
        }
        edges
    }
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<(Ipv4Addr, u64)> {
    let target = match args.next() {
        Some(ip) => ip.parse().with_context(|| format!("invalid target ip {ip:?}"))?,
        None => Ipv4Addr::BROADCAST,
    };
    let cadence = match args.next() {
        Some(ms) => ms.parse().with_context(|| format!("invalid cadence {ms:?}"))?,
        None => DEFAULT_CADENCE_MS,
    };
    Ok((target, cadence))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let (target, cadence_ms) = parse_args(std::env::args().skip(1))?;

    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
        .await
        .context("failed to bind UDP socket")?;
    socket.set_broadcast(true).context("failed to enable SO_BROADCAST")?;
    let mut transport = HostTransport { socket, target };

    tracing::info!(
        "Broadcasting to {}:{} with one pedal stroke every {} ms",
        target,
        BROADCAST_UDP_PORT,
        cadence_ms
    );

    let mut device = Device::default();
    let mut pedal = Pedal::new(cadence_ms);
    let mut ticker = tokio::time::interval(Duration::from_millis(TICK_PERIOD_MS));
    let boot = Instant::now();

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => break,
        }

        let now = boot.elapsed().as_millis() as u64;
        for edge in pedal.edges_until(now) {
            device.on_raw_event(edge);
        }

        match device.tick(now, &mut transport).await {
            TickOutcome::Idle => {}
            TickOutcome::Sent(msg) => {
                tracing::info!("{}", String::from_utf8_lossy(&msg.encode()))
            }
            TickOutcome::Skipped(msg) => tracing::warn!("Skipped seq={}", msg.seq),
            TickOutcome::Failed(msg, e) => tracing::warn!("seq={} failed: {}", msg.seq, e),
        }
    }

    tracing::info!("Stopped at count {}", device.count());
    Ok(())
}
