//! Integration tests for trip-computer host-testable logic.
//!
//! Drives the device through whole scenarios with a recording transport,
//! then feeds what it "sent" into the listener side.

use std::net::Ipv4Addr;

use embassy_futures::block_on;
use trip_computer::{
    Device, EdgeQueue, Message, MessageKind, PacketTracker, Received, TickOutcome, Transport,
    TransportError, TripRecorder,
};

const SUBNET: Ipv4Addr = Ipv4Addr::new(10, 1, 50, 255);

#[derive(Default)]
struct RecordingTransport {
    connected: bool,
    sent: Vec<Vec<u8>>,
}

impl RecordingTransport {
    fn texts(&self) -> Vec<String> {
        self.sent
            .iter()
            .map(|b| String::from_utf8(b.clone()).unwrap())
            .collect()
    }
}

impl Transport for RecordingTransport {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn local_broadcast_address(&self) -> Ipv4Addr {
        SUBNET
    }

    async fn send_broadcast(&mut self, to: Ipv4Addr, payload: &[u8]) -> Result<(), TransportError> {
        assert_eq!(to, SUBNET);
        self.sent.push(payload.to_vec());
        Ok(())
    }
}

fn tick(device: &mut Device, now: u64, link: &mut RecordingTransport) -> TickOutcome {
    block_on(device.tick(now, link))
}

#[test]
fn boot_connect_count_heartbeat_scenario() {
    let mut device = Device::new(300, 1000);
    let mut link = RecordingTransport::default();

    // Booted, link still down.
    assert_eq!(tick(&mut device, 400, &mut link), TickOutcome::Idle);

    // Tick 1: link comes up.
    link.connected = true;
    tick(&mut device, 500, &mut link);
    assert_eq!(link.texts(), ["VBR:1,0"]);

    // One pedal stroke, then tick 2 well inside the heartbeat interval.
    assert_eq!(device.on_raw_event(600), Some(1));
    tick(&mut device, 610, &mut link);
    assert_eq!(link.texts(), ["VBR:1,0", "VBC:2,1"]);

    // Quiet ticks until the heartbeat is due.
    let mut now = 620;
    while now <= 1_610 {
        assert_eq!(tick(&mut device, now, &mut link), TickOutcome::Idle);
        now += 10;
    }
    tick(&mut device, 1_620, &mut link);
    assert_eq!(link.texts(), ["VBR:1,0", "VBC:2,1", "VBC:3,1"]);
}

#[test]
fn bounce_50ms_apart_counts_once() {
    let mut device = Device::new(300, 1000);
    let mut link = RecordingTransport {
        connected: true,
        ..Default::default()
    };
    tick(&mut device, 1_000, &mut link);

    device.on_raw_event(2_000);
    device.on_raw_event(2_050);
    let outcome = tick(&mut device, 2_060, &mut link);

    assert_eq!(outcome, TickOutcome::Sent(Message::update(2, 1)));
    assert_eq!(device.count(), 1);
}

#[test]
fn reconnect_edge_resets_even_when_dirty() {
    let mut device = Device::new(300, 1000);
    let mut link = RecordingTransport::default();

    device.on_raw_event(1_000);
    device.on_raw_event(2_000);
    assert!(device.is_dirty());

    link.connected = true;
    let outcome = tick(&mut device, 2_010, &mut link);
    assert_eq!(outcome, TickOutcome::Sent(Message::reset(1, 2)));
    assert_eq!(link.sent.len(), 1);
    assert!(!device.is_dirty());

    // Nothing new: the next tick stays quiet.
    assert_eq!(tick(&mut device, 2_020, &mut link), TickOutcome::Idle);
}

#[test]
fn sequence_advances_by_one_across_reconnects() {
    let mut device = Device::new(300, 1000);
    let mut link = RecordingTransport::default();
    let mut now = 0;
    let pattern = [true, true, false, true, true, true, false, false, true];

    for up in pattern {
        link.connected = up;
        now += 400;
        device.on_raw_event(now);
        tick(&mut device, now + 5, &mut link);
    }

    let seqs: Vec<u32> = link
        .sent
        .iter()
        .map(|b| Message::decode(b).unwrap().seq)
        .collect();
    let expected: Vec<u32> = (1..=seqs.len() as u32).collect();
    assert_eq!(seqs, expected);

    let kinds: Vec<MessageKind> = link
        .sent
        .iter()
        .map(|b| Message::decode(b).unwrap().kind)
        .collect();
    assert_eq!(
        kinds,
        [
            MessageKind::Reset,
            MessageKind::Update,
            MessageKind::Reset,
            MessageKind::Update,
            MessageKind::Update,
            MessageKind::Reset,
        ]
    );
}

#[test]
fn queued_edges_flow_through_to_the_wire() {
    let mut device = Device::new(300, 1000);
    let mut queue = EdgeQueue::new();
    let (mut sensor, mut edges) = queue.split();
    let mut link = RecordingTransport {
        connected: true,
        ..Default::default()
    };
    tick(&mut device, 100, &mut link);

    for at in [500, 503, 507, 900, 902, 1_300] {
        sensor.push(at);
    }
    assert_eq!(device.drain(&mut edges), 3);
    tick(&mut device, 1_310, &mut link);

    assert_eq!(link.texts().last().map(String::as_str), Some("VBC:2,3"));
}

#[test]
fn listener_credits_every_cycle_the_device_counted() {
    let mut device = Device::new(300, 1000);
    let mut link = RecordingTransport {
        connected: true,
        ..Default::default()
    };
    let mut tracker = PacketTracker::new(5_000);
    let mut trips = TripRecorder::new(10_000);
    let mut delivered = 0;

    let mut now = 0;
    while now < 20_000 {
        if now >= 1_000 && now % 700 == 0 {
            device.on_raw_event(now);
        }
        tick(&mut device, now, &mut link);

        for bytes in &link.sent[delivered..] {
            let message = Message::decode(bytes).unwrap();
            tracker.receive(&message, now);
            trips.record(tracker.take_new_cycles(), now);
        }
        delivered = link.sent.len();
        now += 10;
    }

    let trip = trips.finish(now).expect("trip in progress");
    assert_eq!(u64::from(device.count()), trip.cycles);
}

#[test]
fn listener_rebaselines_after_device_reboot() {
    let mut tracker = PacketTracker::new(5_000);
    let mut trips = TripRecorder::new(60_000);

    // First power cycle.
    for (i, msg) in ["VBR:1,0", "VBC:2,1", "VBC:3,2", "VBC:4,2"].iter().enumerate() {
        let m = Message::decode(msg.as_bytes()).unwrap();
        tracker.receive(&m, i as u64 * 500);
        trips.record(tracker.take_new_cycles(), i as u64 * 500);
    }

    // Rebooted: count restarts from zero with a reset.
    let reset = Message::decode(b"VBR:1,0").unwrap();
    assert_eq!(tracker.receive(&reset, 3_000), Received::Baseline);
    let m = Message::decode(b"VBC:2,1").unwrap();
    tracker.receive(&m, 3_500);
    trips.record(tracker.take_new_cycles(), 3_500);

    assert_eq!(trips.current().map(|t| t.cycles), Some(3));
}
