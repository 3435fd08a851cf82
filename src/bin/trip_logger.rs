//! Trip logger
//!
//! Listens for counter broadcasts, groups cycles into trips and appends
//! each finished trip to a CSV file (`start,end,cycles`, local time).
//!
//! Usage: `trip-logger [config.json]`

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{Local, TimeZone, Utc};
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio::net::UdpSocket;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trip_computer::config::{BROADCAST_UDP_PORT, PACKET_RESET_MS, TRIP_QUIET_MS};
use trip_computer::{Message, PacketTracker, Received, Trip, TripRecorder};

const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Logger settings. Times are in seconds, like the listener configs the
/// desktop tools already use.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct LoggerConfig {
    listen_ip: IpAddr,
    listen_port: u16,
    packet_reset_time: f64,
    trip_quiet_time: f64,
    log_path: PathBuf,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            listen_ip: IpAddr::from([0, 0, 0, 0]),
            listen_port: BROADCAST_UDP_PORT,
            packet_reset_time: PACKET_RESET_MS as f64 / 1000.0,
            trip_quiet_time: TRIP_QUIET_MS as f64 / 1000.0,
            log_path: PathBuf::from("trip_log.csv"),
        }
    }
}

impl LoggerConfig {
    fn packet_reset_ms(&self) -> u64 {
        secs_to_ms(self.packet_reset_time)
    }

    fn trip_quiet_ms(&self) -> u64 {
        secs_to_ms(self.trip_quiet_time)
    }
}

fn secs_to_ms(secs: f64) -> u64 {
    (secs.max(0.0) * 1000.0).round() as u64
}

fn parse_config(json: &str) -> Result<LoggerConfig> {
    serde_json::from_str(json).context("invalid logger config")
}

async fn load_config(path: &Path) -> Result<LoggerConfig> {
    match tokio::fs::read_to_string(path).await {
        Ok(json) => parse_config(&json).with_context(|| format!("while reading {}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!("{} not found, using defaults", path.display());
            Ok(LoggerConfig::default())
        }
        Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
    }
}

fn unix_ms() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

/// `start,end,cycles` with local timestamps.
fn format_trip_row<Tz: TimeZone>(trip: &Trip, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let fmt = |ms: u64| {
        tz.timestamp_millis_opt(ms as i64)
            .single()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default()
    };
    format!("{},{},{}\n", fmt(trip.start_ms), fmt(trip.end_ms), trip.cycles)
}

async fn log_trip(path: &Path, trip: &Trip) -> Result<()> {
    let row = format_trip_row(trip, &Local);
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .with_context(|| format!("failed to open {}", path.display()))?;
    file.write_all(row.as_bytes()).await?;
    tracing::info!("Logged trip: {} cycles over {}s", trip.cycles, trip.duration_ms() / 1000);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config = load_config(&config_path).await?;

    let socket = UdpSocket::bind((config.listen_ip, config.listen_port))
        .await
        .with_context(|| format!("failed to bind {}:{}", config.listen_ip, config.listen_port))?;
    tracing::info!("Listening for counter broadcasts on port {}", config.listen_port);

    let mut tracker = PacketTracker::new(config.packet_reset_ms());
    let mut trips = TripRecorder::new(config.trip_quiet_ms());
    let mut poll = tokio::time::interval(Duration::from_secs(1));
    let mut buf = [0u8; 1024];

    loop {
        tokio::select! {
            recv = socket.recv_from(&mut buf) => {
                let (len, from) = recv.context("socket receive failed")?;
                let message = match Message::decode(&buf[..len]) {
                    Ok(m) => m,
                    Err(e) => {
                        tracing::debug!("Ignoring datagram from {}: {}", from, e);
                        continue;
                    }
                };

                let now = unix_ms();
                match tracker.receive(&message, now) {
                    Received::Baseline => {
                        tracing::info!("Baseline from {}: seq={} count={}", from, message.seq, message.count);
                    }
                    Received::Accepted { missed } if missed > 0 => {
                        tracing::warn!("Missed {} packets before seq={}", missed, message.seq);
                    }
                    Received::Accepted { .. } => {}
                    Received::Stale => {
                        tracing::debug!("Stale seq={} (last {})", message.seq, tracker.last_seq());
                    }
                }
                trips.record(tracker.take_new_cycles(), now);
            }
            _ = poll.tick() => {
                if let Some(trip) = trips.poll(unix_ms()) {
                    tracing::info!("Trip has been quiet for a while, logging");
                    log_trip(&config.log_path, &trip).await?;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Trip logging closing");
                break;
            }
        }
    }

    match trips.finish(unix_ms()) {
        Some(trip) => log_trip(&config.log_path, &trip).await?,
        None => tracing::info!("No trip data to log"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = parse_config("{}").unwrap();
        assert_eq!(config.listen_port, BROADCAST_UDP_PORT);
        assert_eq!(config.packet_reset_ms(), PACKET_RESET_MS);
        assert_eq!(config.trip_quiet_ms(), TRIP_QUIET_MS);
        assert_eq!(config.log_path, PathBuf::from("trip_log.csv"));
    }

    #[test]
    fn listener_style_config_parses() {
        let config = parse_config(
            r#"{"listen_ip": "10.1.50.2", "listen_port": 5050,
                "packet_reset_time": 2.5, "trip_quiet_time": 30}"#,
        )
        .unwrap();
        assert_eq!(config.listen_ip, IpAddr::from([10, 1, 50, 2]));
        assert_eq!(config.listen_port, 5050);
        assert_eq!(config.packet_reset_ms(), 2_500);
        assert_eq!(config.trip_quiet_ms(), 30_000);
    }

    #[test]
    fn bad_config_is_an_error() {
        assert!(parse_config(r#"{"listen_port": "nope"}"#).is_err());
    }

    #[test]
    fn negative_times_clamp_to_zero() {
        assert_eq!(secs_to_ms(-3.0), 0);
    }

    #[test]
    fn trip_row_is_csv_in_given_zone() {
        let trip = Trip {
            start_ms: 1_700_000_000_000,
            end_ms: 1_700_000_600_000,
            cycles: 812,
        };
        assert_eq!(
            format_trip_row(&trip, &Utc),
            "2023-11-14 22:13:20,2023-11-14 22:23:20,812\n"
        );
    }
}
