//! # CAN Bus Module
//!
//! Identifier encoding and frame helpers for the robot's internal CAN bus.

pub mod frame;
pub mod id;
pub mod protocol;

pub use frame::{CanFrame, DeviceMap};
pub use id::{decode, encode, CanIdentifier, CanItem};
pub use protocol::{CanAccess, CanCommand, DeviceId};
