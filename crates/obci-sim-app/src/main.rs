//! OpenBCI Simulator
//!
//! Command-line driver for the simulated OpenBCI V3 board. Opens the
//! simulator, writes a sequence of commands, and logs every event the
//! board produces.
//!
//! # Usage
//!
//! ```bash
//! # Soft reset, then stream for one second
//! obci-sim run --commands "v b" --duration-ms 1000
//!
//! # Daisy board on V2 firmware, radio channel query (hex bytes)
//! obci-sim run --daisy --firmware v2 --commands "0xF000 b"
//!
//! # Options from a JSON file
//! obci-sim run --config board.json --commands "a j"
//!
//! # Print the command table
//! obci-sim commands
//! ```

use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use obci_sim_core::protocol::{
    cmd, decode_sample_packet, is_terminated, SdLogDuration, PACKET_SIZE, SIMULATOR_PORT_NAME,
    START_BYTE, TERMINATOR,
};
use obci_sim_core::types::FirmwareVersion;
use obci_sim_native::{Simulator, SimulatorConfig, SimulatorEvent, SimulatorOptions};

/// OpenBCI Simulator
#[derive(Parser, Debug)]
#[command(name = "obci-sim")]
#[command(author, version, about = "OpenBCI V3 board simulator", long_about = None)]
struct Cli {
    /// Logging verbosity level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Open the simulator, write commands, and log its output
    Run {
        /// JSON options file (camelCase keys)
        #[arg(short, long)]
        config: Option<String>,

        /// Port identifier to open
        #[arg(short, long, default_value = SIMULATOR_PORT_NAME)]
        port: String,

        /// Attach the daisy module
        #[arg(long)]
        daisy: bool,

        /// Firmware version: v1 or v2
        #[arg(short, long)]
        firmware: Option<String>,

        /// Seed for the synthetic signal
        #[arg(long)]
        seed: Option<u64>,

        /// Whitespace-separated commands; `0x..` tokens are hex bytes
        #[arg(short = 'C', long, default_value = "")]
        commands: String,

        /// How long to run after the last write
        #[arg(short, long, default_value = "1000")]
        duration_ms: u64,
    },

    /// Print the command byte table
    Commands,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Run { config, port, daisy, firmware, seed, commands, duration_ms } => {
            let mut options = match config {
                Some(path) => SimulatorOptions::from_path(&path)
                    .with_context(|| format!("loading options from {path}"))?,
                None => SimulatorOptions::default(),
            };
            if daisy {
                options.daisy = Some(true);
            }
            if let Some(firmware) = firmware {
                options.firmware_version = Some(parse_firmware(&firmware)?);
            }
            if seed.is_some() {
                options.seed = seed;
            }

            let writes = parse_commands(&commands)?;
            run(port, options, &writes, Duration::from_millis(duration_ms))?;
        }
        Commands::Commands => print_commands(),
    }

    Ok(())
}

fn parse_firmware(value: &str) -> anyhow::Result<FirmwareVersion> {
    match value.to_lowercase().as_str() {
        "v1" => Ok(FirmwareVersion::V1),
        "v2" => Ok(FirmwareVersion::V2),
        other => bail!("unknown firmware version: {other} (expected v1 or v2)"),
    }
}

/// Split the command string into writes.
///
/// Plain tokens are written as their bytes; `0x` tokens are hex pairs.
fn parse_commands(commands: &str) -> anyhow::Result<Vec<Vec<u8>>> {
    commands
        .split_whitespace()
        .map(|token| match token.strip_prefix("0x") {
            Some(hex) => parse_hex(hex).with_context(|| format!("bad hex command: {token}")),
            None => Ok(token.as_bytes().to_vec()),
        })
        .collect()
}

fn parse_hex(hex: &str) -> anyhow::Result<Vec<u8>> {
    if hex.is_empty() || hex.len() % 2 != 0 || !hex.is_ascii() {
        bail!("expected an even number of hex digits");
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| Ok(u8::from_str_radix(&hex[i..i + 2], 16)?))
        .collect()
}

/// Open the simulator, write each command, and log events until `duration` has passed.
fn run(
    port: String,
    options: SimulatorOptions,
    writes: &[Vec<u8>],
    duration: Duration,
) -> anyhow::Result<()> {
    let config = options.resolve()?;
    info!(
        "OpenBCI simulator v{}: {} Hz, daisy {}, firmware {:?}",
        env!("CARGO_PKG_VERSION"),
        config.sample_rate,
        config.daisy,
        config.firmware_version
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(simulate(port, config, writes, duration))
}

async fn simulate(
    port: String,
    config: SimulatorConfig,
    writes: &[Vec<u8>],
    duration: Duration,
) -> anyhow::Result<()> {
    let mut sim = Simulator::open(port, config);

    match sim.next_event().await {
        Some(SimulatorEvent::Open) => info!("Port {} open", sim.port()),
        Some(SimulatorEvent::Error(e)) => bail!("failed to open simulator: {e}"),
        other => bail!("unexpected first event: {other:?}"),
    }

    for write in writes {
        sim.write(write)?;
    }

    let mut samples = 0u64;
    let deadline = tokio::time::sleep(duration);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            () = &mut deadline => break,
            event = sim.next_event() => match event {
                Some(event) => samples += log_event(&event),
                None => break,
            },
        }
    }

    sim.close()?;
    while let Some(event) = sim.try_next_event() {
        samples += log_event(&event);
    }

    if let Some(exchange) = sim.last_sync_exchange() {
        info!(
            "Last clock sync: t0 {:.3}, t1 {:.3}, t2 {:.3}, t3 {:.3}; origin {:+.3} ms",
            exchange.t0,
            exchange.t1,
            exchange.t2,
            exchange.t3,
            sim.clock_origin_ms()
        );
    }

    info!("{} sample frames received", samples);
    Ok(())
}

/// Log one event. Returns 1 for a sample frame, 0 otherwise.
fn log_event(event: &SimulatorEvent) -> u64 {
    match event {
        SimulatorEvent::Data(data) if data.len() == PACKET_SIZE && data[0] == START_BYTE => {
            match decode_sample_packet(data) {
                Ok(sample) => {
                    debug!(
                        "Sample {:3}: ch1 {:+.3} uV, accel z {:+.3} g",
                        sample.sample_number,
                        sample.channel_volts(0) * 1e6,
                        sample.aux_g(2)
                    );
                    1
                }
                Err(e) => {
                    warn!("Malformed sample frame: {}", e);
                    0
                }
            }
        }
        SimulatorEvent::Data(data) if data.as_slice() == [cmd::SYNC_TIME_SENT] => {
            info!("Sync sent");
            0
        }
        SimulatorEvent::Data(data) if is_terminated(data) => {
            let text = String::from_utf8_lossy(&data[..data.len() - TERMINATOR.len()]);
            for line in text.lines() {
                info!("< {}", line.escape_debug());
            }
            0
        }
        SimulatorEvent::Data(data) => {
            warn!("Unframed data: {:02X?}", data);
            0
        }
        SimulatorEvent::Open => {
            info!("Open");
            0
        }
        SimulatorEvent::Close => {
            info!("Close");
            0
        }
        SimulatorEvent::Error(e) => {
            warn!("Error: {}", e);
            0
        }
    }
}

fn print_commands() {
    let mut table = vec![
        (char::from(cmd::STREAM_START).to_string(), "Start streaming".to_string()),
        (char::from(cmd::STREAM_STOP).to_string(), "Stop streaming".to_string()),
        (char::from(cmd::SOFT_RESET).to_string(), "Soft reset".to_string()),
    ];
    for duration in SdLogDuration::ALL {
        table.push((
            char::from(duration.to_byte()).to_string(),
            format!("SD log for {} s", duration.seconds()),
        ));
    }
    table.extend(
        [
            (char::from(cmd::SD_LOG_STOP).to_string(), "Stop SD log"),
            (char::from(cmd::SYNC_TIME_SET).to_string(), "Begin clock sync"),
            (">t1,t2,".to_string(), "Clock sync server data"),
            ("0xF000".to_string(), "Get radio channel (V2)"),
            ("0xF001NN".to_string(), "Set radio channel to NN (V2)"),
            ("0xF004NN".to_string(), "Set poll time to NN (V2)"),
        ]
        .map(|(command, about)| (command, about.to_string())),
    );

    println!("OpenBCI V3 simulator commands\n");
    for (command, about) in table {
        println!("  {command:<10} {about}");
    }
}
