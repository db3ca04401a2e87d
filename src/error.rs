//! # Error Types
//!
//! Custom error types for Robot Link using `thiserror`.

use thiserror::Error;

/// Main error type for Robot Link
#[derive(Debug, Error)]
pub enum RobotLinkError {
    /// Envelope carried a type tag with no known mapping
    #[error("Unknown message type: 0x{0:02X}")]
    UnknownMessageType(u8),

    /// Message violates a protocol constraint
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// CAN identifier could not be encoded or decoded
    #[error("CAN identifier error: {0}")]
    CanId(String),

    /// Pipe, radio or robot outside the address space
    #[error("Address error: {0}")]
    Address(String),

    /// Radio transport errors
    #[error("Transport error: {0}")]
    Transport(String),

    /// Telemetry recording errors
    #[error("Telemetry error: {0}")]
    Telemetry(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for Robot Link
pub type Result<T> = std::result::Result<T, RobotLinkError>;
