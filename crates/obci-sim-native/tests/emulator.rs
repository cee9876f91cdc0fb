//! End-to-end behavior of the simulated board through its event channel.
//!
//! All tests run on paused Tokio time so timer counts are exact.

use std::sync::Arc;
use std::time::Duration;

use obci_sim_core::protocol::{
    decode_sample_packet, is_terminated, RawSample, PACKET_SIZE, SIMULATOR_PORT_NAME,
};
use obci_sim_core::types::FirmwareVersion;
use obci_sim_native::{ManualClock, Simulator, SimulatorConfig, SimulatorError, SimulatorEvent};

fn config() -> SimulatorConfig {
    SimulatorConfig { seed: Some(1), ..Default::default() }
}

async fn open(config: SimulatorConfig) -> Simulator {
    let mut sim = Simulator::open(SIMULATOR_PORT_NAME, config);
    assert_eq!(sim.next_event().await, Some(SimulatorEvent::Open));
    sim
}

/// Everything emitted so far, without waiting.
fn ready(sim: &mut Simulator) -> Vec<SimulatorEvent> {
    std::iter::from_fn(|| sim.try_next_event()).collect()
}

fn frames(events: &[SimulatorEvent]) -> Vec<RawSample> {
    events
        .iter()
        .filter_map(|event| match event {
            SimulatorEvent::Data(data) if data.len() == PACKET_SIZE => decode_sample_packet(data).ok(),
            _ => None,
        })
        .collect()
}

fn texts(events: &[SimulatorEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            SimulatorEvent::Data(data) if is_terminated(data) => {
                Some(String::from_utf8_lossy(data).into_owned())
            }
            _ => None,
        })
        .collect()
}

fn assert_consecutive(samples: &[RawSample]) {
    for pair in samples.windows(2) {
        assert_eq!(pair[1].sample_number, pair[0].sample_number.wrapping_add(1));
    }
}

// ============================================================================
// Open / Close
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_open_wrong_port_errors() {
    let mut sim = Simulator::open("/dev/ttyUSB0", config());
    assert_eq!(
        sim.next_event().await,
        Some(SimulatorEvent::Error(SimulatorError::PortNotOpen { port: "/dev/ttyUSB0".into() }))
    );
    assert_eq!(sim.write(b"b"), Err(SimulatorError::NotConnected));
}

#[tokio::test(start_paused = true)]
async fn test_open_serial_port_failure() {
    let mut sim = Simulator::open(
        SIMULATOR_PORT_NAME,
        SimulatorConfig { serial_port_failure: true, ..config() },
    );
    assert_eq!(sim.next_event().await, Some(SimulatorEvent::Error(SimulatorError::SerialPortFailure)));
    assert!(!sim.state().connected);
}

#[tokio::test(start_paused = true)]
async fn test_close_before_open_suppresses_open() {
    let mut sim = Simulator::open(SIMULATOR_PORT_NAME, config());
    sim.close().unwrap();

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(ready(&mut sim).is_empty());
    assert!(!sim.state().connected);
}

#[tokio::test(start_paused = true)]
async fn test_close_stops_everything() {
    let mut sim = open(config()).await;
    sim.write(b"b").unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    sim.close().unwrap();
    let events = ready(&mut sim);
    assert_eq!(events.last(), Some(&SimulatorEvent::Close));
    assert_eq!(frames(&events).len(), 2);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(ready(&mut sim).is_empty());
    assert_eq!(sim.write(b"v"), Err(SimulatorError::NotConnected));
    assert!(!sim.state().streaming);
}

#[tokio::test(start_paused = true)]
async fn test_flush_and_drain_accepted() {
    let sim = open(config()).await;
    assert!(sim.flush().is_ok());
    assert!(sim.drain().is_ok());
}

// ============================================================================
// Streaming
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_stream_at_250hz() {
    let mut sim = open(config()).await;
    sim.write(b"b").unwrap();
    tokio::time::sleep(Duration::from_millis(42)).await;

    let events = ready(&mut sim);
    assert_eq!(events.len(), 10);
    let samples = frames(&events);
    assert_eq!(samples.len(), 10);
    assert_eq!(samples[0].sample_number, 0);
    assert_consecutive(&samples);
}

#[tokio::test(start_paused = true)]
async fn test_stream_at_125hz() {
    let mut sim = open(SimulatorConfig { sample_rate: 125, ..config() }).await;
    sim.write(b"b").unwrap();
    tokio::time::sleep(Duration::from_millis(84)).await;

    let samples = frames(&ready(&mut sim));
    assert_eq!(samples.len(), 10);
    assert_consecutive(&samples);
}

#[tokio::test(start_paused = true)]
async fn test_daisy_stream_at_125hz() {
    let mut sim = open(SimulatorConfig { daisy: true, sample_rate: 125, ..config() }).await;
    sim.write(b"b").unwrap();
    tokio::time::sleep(Duration::from_millis(34)).await;

    let samples = frames(&ready(&mut sim));
    assert_eq!(samples.len(), 4);
    assert_consecutive(&samples);
}

#[tokio::test(start_paused = true)]
async fn test_stop_then_start_has_single_timer() {
    let mut sim = open(config()).await;
    sim.write(b"b").unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    sim.write(b"s").unwrap();
    sim.write(b"b").unwrap();
    // A repeated start must not add a second timer
    sim.write(b"b").unwrap();
    tokio::time::sleep(Duration::from_millis(42)).await;

    let samples = frames(&ready(&mut sim));
    assert_eq!(samples.len(), 2 + 10);
    assert_consecutive(&samples);
}

#[tokio::test(start_paused = true)]
async fn test_stop_halts_stream() {
    let mut sim = open(config()).await;
    sim.write(b"b").unwrap();
    tokio::time::sleep(Duration::from_millis(6)).await;
    sim.write(b"s").unwrap();
    let before = ready(&mut sim);
    assert_eq!(frames(&before).len(), 1);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(ready(&mut sim).is_empty());
}

// ============================================================================
// Commands
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_soft_reset_stops_stream_and_replies() {
    let mut sim = open(SimulatorConfig { firmware_version: FirmwareVersion::V2, ..config() }).await;
    sim.write(b"b").unwrap();
    tokio::time::sleep(Duration::from_millis(6)).await;
    sim.write(b"v").unwrap();

    let events = ready(&mut sim);
    let replies = texts(&events);
    assert_eq!(replies.len(), 1);
    assert!(replies[0].starts_with("OpenBCI V3 Simulator\n"));
    assert!(replies[0].ends_with("Firmware: v2\n$$$"));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(ready(&mut sim).is_empty());
    assert!(!sim.state().streaming);
}

#[tokio::test(start_paused = true)]
async fn test_v1_ignores_radio_commands() {
    let mut sim = open(config()).await;
    sim.write(&[0xF0, 0x00]).unwrap();
    sim.write(&[0xF0, 0x01, 0x09]).unwrap();
    sim.write(&[0xF0, 0x04, 0x40]).unwrap();

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(ready(&mut sim).is_empty());
    assert_eq!(sim.state().channel_number, 1);
}

#[tokio::test(start_paused = true)]
async fn test_v2_channel_set_then_get() {
    let mut sim = open(SimulatorConfig { firmware_version: FirmwareVersion::V2, ..config() }).await;
    sim.write(&[0xF0, 0x01, 0x09]).unwrap();
    sim.write(&[0xF0, 0x00]).unwrap();

    assert_eq!(
        ready(&mut sim),
        vec![
            SimulatorEvent::Data(b"Success: Channel changed to 0x\x09$$$".to_vec()),
            SimulatorEvent::Data(b"Success: Channel changed to 0x\x09$$$".to_vec()),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_board_failure_write_succeeds() {
    let mut sim = open(SimulatorConfig {
        firmware_version: FirmwareVersion::V2,
        board_failure: true,
        ..config()
    })
    .await;
    assert!(sim.write(&[0xF0, 0x04, 0x40]).is_ok());

    let replies = texts(&ready(&mut sim));
    assert_eq!(replies.len(), 1);
    assert!(replies[0].starts_with("Failure: No communications from Board."));
}

#[tokio::test(start_paused = true)]
async fn test_sd_log_session() {
    let clock = ManualClock::at(0.0);
    let mut sim = Simulator::with_clock(SIMULATOR_PORT_NAME, config(), Arc::new(clock.clone()));
    assert_eq!(sim.next_event().await, Some(SimulatorEvent::Open));

    sim.write(b"j").unwrap();
    clock.set_ms(1000.0);
    sim.write(b"S").unwrap();
    clock.advance_ms(1500.0);
    sim.write(b"j").unwrap();

    let replies = texts(&ready(&mut sim));
    assert_eq!(replies.len(), 3);
    assert_eq!(replies[0], "No open file to close\n$$$");
    assert!(replies[1].starts_with("Wiring is correct"));
    assert!(replies[2].starts_with("Total Elapsed Time: 1500 ms\n"));
    assert!(replies[2].ends_with("Overruns: 0\n$$$"));
    assert!(!sim.state().sd_log.active);
}

#[tokio::test(start_paused = true)]
async fn test_sample_numbers_survive_sd_log_and_sync() {
    let mut sim = open(config()).await;
    sim.write(b"b").unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    sim.write(b"a").unwrap();
    sim.write(b"<").unwrap();
    sim.write(b">100.0,150.0,").unwrap();
    sim.write(b"j").unwrap();
    tokio::time::sleep(Duration::from_millis(31)).await;

    let events = ready(&mut sim);
    assert_eq!(texts(&events), vec!["Synced!$$$".to_string()]);
    assert!(events.contains(&SimulatorEvent::Data(b",".to_vec())));

    let samples = frames(&events);
    assert_eq!(samples.len(), 10);
    assert_eq!(samples[0].sample_number, 0);
    assert_consecutive(&samples);
    assert_eq!(sim.state().sample_number, 10);
}

// ============================================================================
// Clock Sync
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_clock_sync_handshake() {
    let clock = ManualClock::at(0.0);
    let mut sim = Simulator::with_clock(SIMULATOR_PORT_NAME, config(), Arc::new(clock.clone()));
    assert_eq!(sim.next_event().await, Some(SimulatorEvent::Open));

    sim.write(b"<").unwrap();
    assert!(ready(&mut sim).is_empty());

    tokio::time::sleep(Duration::from_millis(11)).await;
    assert_eq!(ready(&mut sim), vec![SimulatorEvent::Data(b",".to_vec())]);

    clock.set_ms(300.0);
    sim.write(b">100.0,150.0,").unwrap();
    assert_eq!(ready(&mut sim), vec![SimulatorEvent::Data(b"Synced!$$$".to_vec())]);
    assert_eq!(sim.clock_origin_ms(), -25.0);

    let exchange = sim.last_sync_exchange().unwrap();
    assert_eq!((exchange.t0, exchange.t1, exchange.t2, exchange.t3), (0.0, 100.0, 150.0, 300.0));
}

#[tokio::test(start_paused = true)]
async fn test_unrequested_server_data_ignored() {
    let mut sim = open(config()).await;
    sim.write(b">100.0,150.0,").unwrap();

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(ready(&mut sim).is_empty());
    assert_eq!(sim.clock_origin_ms(), 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_sync_sent_suppressed_by_close() {
    let mut sim = open(config()).await;
    sim.write(b"<").unwrap();
    sim.close().unwrap();

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(ready(&mut sim), vec![SimulatorEvent::Close]);
}

#[tokio::test(start_paused = true)]
async fn test_sd_log_elapsed_unaffected_by_clock_sync() {
    let clock = ManualClock::at(0.0);
    let mut sim = Simulator::with_clock(SIMULATOR_PORT_NAME, config(), Arc::new(clock.clone()));
    assert_eq!(sim.next_event().await, Some(SimulatorEvent::Open));

    sim.write(b"a").unwrap();
    sim.write(b"<").unwrap();
    clock.set_ms(300.0);
    sim.write(b">100.0,150.0,").unwrap();
    assert_eq!(sim.clock_origin_ms(), -25.0);

    clock.set_ms(1000.0);
    sim.write(b"j").unwrap();

    let replies = texts(&ready(&mut sim));
    assert_eq!(replies.len(), 3);
    assert!(replies[2].starts_with("Total Elapsed Time: 1000 ms\n"));
}
