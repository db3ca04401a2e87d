//! # Telemetry Module
//!
//! Records messages received from robots to JSONL files with rotation.
//!
//! This module handles:
//! - Formatting each message as one JSON line with a UTC timestamp
//! - Writing to rotating log files (max N records per file)
//! - Retaining only the last M files
//! - Feeding the logger straight from the base station dispatcher

pub mod logger;

pub use logger::{TelemetryLogger, TelemetryRecord};

use std::cell::RefCell;
use std::rc::Rc;
use tracing::warn;

use crate::radio::dispatch::{MessageHandler, Origin};
use crate::radio::protocol::*;

/// Message handler that records everything robots send
///
/// Messages not coming from a robot are ignored. Write failures are logged
/// and never interrupt the link.
#[derive(Debug, Clone)]
pub struct TelemetryRecorder {
    logger: Rc<RefCell<TelemetryLogger>>,
}

impl TelemetryRecorder {
    pub fn new(logger: Rc<RefCell<TelemetryLogger>>) -> Self {
        Self { logger }
    }

    fn record(&mut self, origin: Origin, message: Message) {
        let Origin::Robot(robot) = origin else {
            return;
        };
        if let Err(e) = self.logger.borrow_mut().record(robot, &message) {
            warn!("Failed to record telemetry from robot {}: {}", robot, e);
        }
    }
}

impl MessageHandler for TelemetryRecorder {
    fn on_config_message(&mut self, origin: Origin, message: ConfigMessage) {
        self.record(origin, message.into());
    }

    fn on_multi_config_message(&mut self, origin: Origin, message: MultiConfigMessage) {
        self.record(origin, message.into());
    }

    fn on_status_high_freq(&mut self, origin: Origin, status: StatusHighFreq) {
        self.record(origin, status.into());
    }

    fn on_status_low_freq(&mut self, origin: Origin, status: StatusLowFreq) {
        self.record(origin, status.into());
    }

    fn on_imu_readings(&mut self, origin: Origin, readings: ImuReadings) {
        self.record(origin, readings.into());
    }

    fn on_odometry_reading(&mut self, origin: Origin, reading: OdometryReading) {
        self.record(origin, reading.into());
    }
}
