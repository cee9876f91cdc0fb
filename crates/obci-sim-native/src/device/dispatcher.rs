//! Command dispatcher.
//!
//! Turns one written byte sequence into board state changes, zero or more
//! framed text responses, and requests for the stream scheduler or the
//! delayed sync-sent token. Dispatch is synchronous and never fails:
//! unrecognized or malformed input is ignored.

use rand::Rng;
use tracing::{debug, info, warn};

use obci_sim_core::protocol::{text, Command, SdLogDuration, TERMINATOR};

use super::clock_sync::ClockSyncEngine;
use super::state::DeviceState;

/// Upper bound of the synthetic maximum SD write time (µs).
const MAX_WRITE_TIME_US: f64 = 500.0;

/// Upper bound of the synthetic minimum SD write time (µs).
const MIN_WRITE_TIME_US: f64 = 200.0;

/// Request for the stream scheduler.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StreamControl {
    /// Begin emitting sample frames
    Start,
    /// Cancel the sample timer
    Stop,
}

/// Everything a dispatch produced.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DispatchOutcome {
    /// Framed responses, each emitted as one data event
    pub responses: Vec<Vec<u8>>,
    /// Scheduler request, if any
    pub stream: Option<StreamControl>,
    /// Emit the sync-sent token after the fixed delay
    pub sync_sent: bool,
}

impl DispatchOutcome {
    fn respond(&mut self, response: Vec<u8>) {
        self.responses.push(response);
    }
}

/// Inputs a dispatch may read or mutate.
pub struct DispatchContext<'a, R: Rng + ?Sized> {
    /// Board state
    pub state: &'a mut DeviceState,
    /// Clock sync handshake
    pub sync: &'a mut ClockSyncEngine,
    /// Device time at dispatch (ms), sync-corrected
    pub now_ms: f64,
    /// Raw monotonic time at dispatch (ms); SD-log session timing
    pub monotonic_ms: f64,
    /// Random source for synthetic SD statistics
    pub rng: &'a mut R,
    /// Log commands at info instead of debug
    pub verbose: bool,
}

/// Build a response: text, optional raw bytes, terminator.
fn framed(text: &str, raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() + raw.len() + TERMINATOR.len());
    out.extend_from_slice(text.as_bytes());
    out.extend_from_slice(raw);
    out.extend_from_slice(TERMINATOR);
    out
}

/// Dispatch one written byte sequence.
pub fn dispatch<R: Rng + ?Sized>(ctx: DispatchContext<'_, R>, data: &[u8]) -> DispatchOutcome {
    let mut out = DispatchOutcome::default();

    let Some(command) = Command::parse(data) else {
        debug!("Ignoring unrecognized command: {:02X?}", data);
        return out;
    };

    if ctx.verbose {
        info!("Command: {:?}", command);
    } else {
        debug!("Command: {:?}", command);
    }

    let DispatchContext { state, sync, now_ms, monotonic_ms, rng, .. } = ctx;

    // Radio commands do not exist on V1 firmware
    if command.requires_v2() && !state.firmware_version.has_radio_commands() {
        debug!("Ignoring {:?} on {:?} firmware", command, state.firmware_version);
        return out;
    }

    match command {
        Command::ChannelGet => {
            let prefix = if state.board_failure {
                text::CHANNEL_GET_FAILURE
            } else {
                text::CHANNEL_SUCCESS
            };
            out.respond(framed(prefix, &[state.channel_number]));
        }
        Command::ChannelSet { channel } => {
            if state.board_failure {
                out.respond(framed(text::RADIO_FAILURE, &[]));
            } else {
                state.channel_number = channel;
                out.respond(framed(text::CHANNEL_SUCCESS, &[channel]));
            }
        }
        Command::PollTimeSet { .. } => {
            let message = if state.board_failure {
                text::RADIO_FAILURE
            } else {
                text::POLL_TIME_SUCCESS
            };
            out.respond(framed(message, &[]));
        }
        Command::StreamStart => {
            if !state.streaming {
                out.stream = Some(StreamControl::Start);
            }
            state.streaming = true;
        }
        Command::StreamStop => {
            if state.streaming {
                out.stream = Some(StreamControl::Stop);
            }
            state.streaming = false;
        }
        Command::SoftReset => {
            if state.streaming {
                out.stream = Some(StreamControl::Stop);
            }
            state.streaming = false;
            out.respond(framed(&soft_reset_text(state), &[]));
        }
        Command::SdLogStart(duration) => sd_log_start(state, duration, monotonic_ms, &mut out),
        Command::SdLogStop => sd_log_stop(state, monotonic_ms, rng, &mut out),
        Command::SyncTimeSet => {
            sync.begin(now_ms);
            out.sync_sent = true;
        }
        Command::SyncClockServerData { payload } => match sync.complete(now_ms, payload) {
            Ok(outcome) => {
                info!(
                    "Clock synced: delta {:.3} ms (network {:.3} ms)",
                    outcome.delta, outcome.time_spent_on_network
                );
                out.respond(framed(text::SYNCED, &[]));
            }
            Err(e) => warn!("Clock sync rejected: {}", e),
        },
    }

    out
}

fn soft_reset_text(state: &DeviceState) -> String {
    let mut reply = String::from(text::RESET_BANNER);
    if state.daisy {
        reply.push_str(text::RESET_DAISY);
    }
    reply.push_str(text::RESET_ACCEL);
    if state.firmware_version.has_radio_commands() {
        reply.push_str(text::RESET_FIRMWARE_V2);
    }
    reply
}

fn sd_log_start(
    state: &mut DeviceState,
    duration: SdLogDuration,
    monotonic_ms: f64,
    out: &mut DispatchOutcome,
) {
    // Verbose acknowledgment only when it cannot corrupt the sample stream
    if !state.streaming {
        out.respond(framed(text::SD_START, &[]));
    }
    state.sd_log.active = true;
    state.sd_log.start_time_ms = monotonic_ms;
    state.sd_log.duration = Some(duration);
}

fn sd_log_stop<R: Rng + ?Sized>(
    state: &mut DeviceState,
    monotonic_ms: f64,
    rng: &mut R,
    out: &mut DispatchOutcome,
) {
    if !state.streaming {
        if state.sd_log.active {
            let elapsed = monotonic_ms - state.sd_log.start_time_ms;
            let max_write = rng.gen_range(0.0..MAX_WRITE_TIME_US);
            let min_write = rng.gen_range(0.0..MIN_WRITE_TIME_US);
            let report = format!(
                "Total Elapsed Time: {elapsed} ms\nMax write time: {max_write} us\nMin write time: {min_write} us\nOverruns: 0\n"
            );
            out.respond(framed(&report, &[]));
        } else {
            out.respond(framed(text::SD_NO_FILE, &[]));
        }
    }
    state.sd_log.active = false;
    state.sd_log.duration = None;
}
