//! # Robot Link
//!
//! Runs a base station and a set of simulated robots over an in-memory
//! radio medium, exercising the full link: commands, telemetry returned in
//! acknowledgement payloads and configuration reads.

use anyhow::{Context, Result};
use std::cell::RefCell;
use std::env;
use std::rc::Rc;
use tokio::time::interval;
use tracing::{debug, info, warn, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use robot_link::config::{Config, LoggingConfig};
use robot_link::radio::protocol::{Command, Message, MultiConfigMessage, Pose};
use robot_link::radio::{BaseStation, Ether};
use robot_link::simulation::SimulatedRobot;
use robot_link::telemetry::{TelemetryLogger, TelemetryRecorder};
use robot_link::variable::VariableId;

/// Variables polled from every robot
const POLLED_VARIABLES: [VariableId; 3] = [
    VariableId::BATTERY_VOLTAGE,
    VariableId::KICKER_TEMPERATURE,
    VariableId::SPEED_KP,
];

/// Log file name inside `[logging] directory`
const LOG_FILE_PREFIX: &str = "robot-link.log";

/// Main entry point for Robot Link
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration (defaults when no path is given)
///    - Set up logging with tracing subscriber
///    - Bring up the base station and simulated robots on one ether
///
/// 2. **Main Loop** (at `poll_rate_hz`)
///    - Send a command to the next robot in round-robin order
///    - Every `config_request_interval` ticks, request a config read instead
///    - Run every robot and the base station once
///
/// 3. **Graceful Shutdown**
///    - Ctrl+C stops the loop, totals are logged
///
/// # Errors
///
/// Returns error if the configuration is invalid or the link cannot start
#[tokio::main]
async fn main() -> Result<()> {
    let config = match env::args().nth(1) {
        Some(path) => Config::load(&path).with_context(|| format!("Failed to load {}", path))?,
        None => {
            let config = Config::default();
            config.validate()?;
            config
        }
    };

    let _guard = init_logging(&config.logging)?;
    info!("Robot Link v{} starting...", env!("CARGO_PKG_VERSION"));

    // Base station
    let ether = Ether::new();
    let transports = (0..config.radio.num_radios).map(|_| ether.radio()).collect();
    let mut base = BaseStation::new(transports, config.radio.channel, config.robot.max_robots)?;
    let information = base.init(config.radio.power_level)?;
    info!("Base station up: {}", serde_json::to_string(&information)?);

    let recorder = if config.telemetry.enabled {
        let logger = TelemetryLogger::new(
            &config.telemetry.log_dir,
            config.telemetry.max_records_per_file,
            config.telemetry.max_files_to_keep,
        )?;
        let logger = Rc::new(RefCell::new(logger));
        base.register_handler(TelemetryRecorder::new(logger.clone()));
        Some(logger)
    } else {
        None
    };

    // Simulated robots
    let mut robots = Vec::with_capacity(config.simulation.robots.len());
    for &id in &config.simulation.robots {
        robots.push(SimulatedRobot::new(ether.radio(), id, config.radio.channel, config.radio.power_level)?);
    }
    if robots.is_empty() {
        warn!("No simulated robots configured, the link will stay idle");
    }

    let mut ticker = interval(config.poll_period());
    info!("Starting poll loop at {}Hz", config.link.poll_rate_hz);
    info!("Press Ctrl+C to exit");

    let mut ticks: u64 = 0;
    let mut sent: u64 = 0;
    let mut dropped: u64 = 0;
    let mut received: u64 = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Some(target) = round_robin(&config.simulation.robots, ticks) {
                    let message = if ticks % config.link.config_request_interval == 0 {
                        MultiConfigMessage::read(&POLLED_VARIABLES)?.into()
                    } else {
                        command_for(ticks)
                    };

                    match base.send_to(target, &message) {
                        Ok(true) => sent += 1,
                        Ok(false) => {
                            dropped += 1;
                            debug!("Robot {} did not acknowledge {:?}", target, message.message_type());
                        }
                        Err(e) => warn!("Cannot address robot {}: {}", target, e),
                    }
                }

                for robot in robots.iter_mut() {
                    robot.step();
                }
                if base.run() {
                    received += 1;
                }

                ticks += 1;
                if ticks % config.link.status_log_interval == 0 {
                    info!("{} ticks: {} sent, {} dropped, {} received", ticks, sent, dropped, received);
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    if let Some(logger) = recorder {
        let mut logger = logger.borrow_mut();
        logger.flush()?;
        info!("Telemetry records written: {}", logger.total_records());
    }
    info!("Total: {} ticks, {} sent, {} dropped, {} received", ticks, sent, dropped, received);

    Ok(())
}

/// Install the tracing subscriber
///
/// Logs go to stdout, or to a daily rolling file when a directory is
/// configured. The returned guard must live until exit.
fn init_logging(logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let level: Level = logging
        .level
        .parse()
        .with_context(|| format!("Invalid log level {}", logging.level))?;
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    match &logging.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
            Ok(None)
        }
    }
}

/// Robot addressed on a given tick
fn round_robin(robots: &[u8], tick: u64) -> Option<u8> {
    if robots.is_empty() {
        return None;
    }
    Some(robots[(tick % robots.len() as u64) as usize])
}

/// Slowly rotating drive command
fn command_for(tick: u64) -> Message {
    let phase = (tick % 628) as f32 / 100.0;
    Command {
        speed: Pose::new(phase.cos(), phase.sin(), 0.0),
        ..Default::default()
    }
    .into()
}
