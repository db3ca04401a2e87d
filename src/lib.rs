//! # Robot Link Library
//!
//! Wire protocol of a multi-robot control link.
//!
//! This library provides the pieces shared by a base station and its
//! battery-powered robots: the 32-byte radio message envelope, the mapping
//! of robot identities onto radio front-ends and pipes, remote
//! synchronisation of robot configuration variables, and the identifier
//! scheme of the robots' internal CAN bus.

pub mod can;
pub mod config;
pub mod config_sync;
pub mod error;
pub mod radio;
pub mod simulation;
pub mod telemetry;
pub mod variable;
