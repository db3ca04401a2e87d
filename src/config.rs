//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{Result, RobotLinkError};
use crate::radio::protocol::{MAX_CHANNEL, MAX_PIPES, NUMBER_OF_RADIOS};
use crate::radio::transport::PowerLevel;

/// Log levels accepted in `[logging] level`
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub radio: RadioConfig,
    #[serde(default)]
    pub robot: RobotConfig,
    #[serde(default)]
    pub link: LinkConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Radio front-end configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RadioConfig {
    /// Front-ends provisioned on the base station
    #[serde(default = "default_num_radios")]
    pub num_radios: u8,

    #[serde(default = "default_channel")]
    pub channel: u8,

    #[serde(default)]
    pub power_level: PowerLevel,
}

/// Robot addressing configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RobotConfig {
    /// Identity used when running as a robot
    #[serde(default)]
    pub identity: u8,

    #[serde(default = "default_max_robots")]
    pub max_robots: u8,
}

/// Poll loop configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LinkConfig {
    #[serde(default = "default_poll_rate_hz")]
    pub poll_rate_hz: u32,

    /// Ticks between config read requests
    #[serde(default = "default_config_request_interval")]
    pub config_request_interval: u64,

    /// Ticks between status log lines
    #[serde(default = "default_status_log_interval")]
    pub status_log_interval: u64,
}

/// Telemetry recording configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct TelemetryConfig {
    #[serde(default = "default_telemetry_enabled")]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Also write a daily rolling log file here
    #[serde(default)]
    pub directory: Option<String>,
}

/// Simulated robots attached to the in-memory ether
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SimulationConfig {
    #[serde(default = "default_sim_robots")]
    pub robots: Vec<u8>,
}

// Default value functions
fn default_num_radios() -> u8 { NUMBER_OF_RADIOS }
fn default_channel() -> u8 { 76 }

fn default_max_robots() -> u8 { 16 }

fn default_poll_rate_hz() -> u32 { 100 }
fn default_config_request_interval() -> u64 { 100 }
fn default_status_log_interval() -> u64 { 1000 }

fn default_telemetry_enabled() -> bool { true }
fn default_log_dir() -> String { "./logs".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }

fn default_log_level() -> String { "info".to_string() }

fn default_sim_robots() -> Vec<u8> { vec![0, 1, 2, 3] }

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            num_radios: default_num_radios(),
            channel: default_channel(),
            power_level: PowerLevel::default(),
        }
    }
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            identity: 0,
            max_robots: default_max_robots(),
        }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            poll_rate_hz: default_poll_rate_hz(),
            config_request_interval: default_config_request_interval(),
            status_log_interval: default_status_log_interval(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: default_telemetry_enabled(),
            log_dir: default_log_dir(),
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: None,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            robots: default_sim_robots(),
        }
    }
}

fn invalid(message: impl std::fmt::Display) -> RobotLinkError {
    RobotLinkError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use robot_link::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        // Validate radio configuration
        if self.radio.num_radios == 0 || self.radio.num_radios > NUMBER_OF_RADIOS {
            return Err(invalid(format!("num_radios must be between 1 and {}", NUMBER_OF_RADIOS)));
        }

        if self.radio.channel > MAX_CHANNEL {
            return Err(invalid(format!("channel must be between 0 and {}", MAX_CHANNEL)));
        }

        // Validate robot addressing
        let addressable = self.radio.num_radios * MAX_PIPES;
        if self.robot.max_robots == 0 || self.robot.max_robots > addressable {
            return Err(invalid(format!(
                "max_robots must be between 1 and {} with {} radios",
                addressable, self.radio.num_radios
            )));
        }

        if self.robot.identity >= self.robot.max_robots {
            return Err(invalid("robot identity must be less than max_robots"));
        }

        // Validate poll loop
        if self.link.poll_rate_hz == 0 || self.link.poll_rate_hz > 2000 {
            return Err(invalid("poll_rate_hz must be between 1 and 2000"));
        }

        if self.link.config_request_interval == 0 || self.link.status_log_interval == 0 {
            return Err(invalid("link intervals must be greater than 0"));
        }

        // Validate telemetry
        if self.telemetry.enabled {
            if self.telemetry.log_dir.is_empty() {
                return Err(invalid("telemetry log_dir cannot be empty when enabled"));
            }

            if self.telemetry.max_records_per_file == 0 {
                return Err(invalid("max_records_per_file must be greater than 0"));
            }

            if self.telemetry.max_files_to_keep == 0 {
                return Err(invalid("max_files_to_keep must be greater than 0"));
            }
        }

        // Validate logging
        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(invalid(format!("log level must be one of: {}", LOG_LEVELS.join(", "))));
        }

        // Validate simulated robots
        for &robot in &self.simulation.robots {
            if robot >= self.robot.max_robots {
                return Err(invalid(format!(
                    "simulated robot {} is out of bounds (must be 0-{})",
                    robot,
                    self.robot.max_robots - 1
                )));
            }
        }

        Ok(())
    }

    /// Poll period derived from `poll_rate_hz`
    pub fn poll_period(&self) -> std::time::Duration {
        std::time::Duration::from_micros(1_000_000 / self.link.poll_rate_hz.max(1) as u64)
    }
}
