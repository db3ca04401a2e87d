//! # Radio Address Space
//!
//! Maps a robot identity onto a (radio front-end, pipe) pair and back.
//!
//! With `n` radios online, robots are dealt round-robin over the radios:
//!
//! ```text
//! radio_index = robot_id mod n
//! pipe        = robot_id div n + 1
//! robot_id    = (pipe - 1) * n + radio_index
//! ```
//!
//! Pipe 0 is reserved for broadcast / back-listening, so pipes run `1..=5`.
//! When the number of radios online changes every derived address is stale
//! and must be recomputed with a fresh `AddressSpace`.

use super::protocol::{RobotId, BASE_TO_ROBOT_ADDRESS, MAX_PIPES, NUMBER_OF_RADIOS, ROBOT_TO_BASE_ADDRESS};
use crate::error::{Result, RobotLinkError};

/// Robot identity served by `pipe` on radio `radio_index`
///
/// Caller guarantees `pipe >= 1`.
pub const fn robot_id(pipe: u8, radio_index: u8, num_radios_online: u8) -> RobotId {
    (pipe - 1) * num_radios_online + radio_index
}

/// Pipe on which `robot` is served
///
/// Caller guarantees `num_radios_online > 0`.
pub const fn pipe(robot: RobotId, num_radios_online: u8) -> u8 {
    robot / num_radios_online + 1
}

/// Radio front-end serving `robot`
///
/// Caller guarantees `num_radios_online > 0`.
pub const fn radio_index(robot: RobotId, num_radios_online: u8) -> u8 {
    robot % num_radios_online
}

/// Base → robot pipe address for a robot
pub fn base_to_robot_address(robot: RobotId) -> u64 {
    BASE_TO_ROBOT_ADDRESS + robot as u64
}

/// Robot → base pipe address for a robot
pub fn robot_to_base_address(robot: RobotId) -> u64 {
    ROBOT_TO_BASE_ADDRESS + robot as u64
}

/// Address space for a given number of online radios
///
/// All conversions are checked; out-of-range inputs are reported as
/// `RobotLinkError::Address` instead of producing a bogus identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressSpace {
    num_radios_online: u8,
}

impl AddressSpace {
    /// Create an address space
    ///
    /// # Arguments
    ///
    /// * `num_radios_online` - Radios actually responding (`1..=NUMBER_OF_RADIOS`)
    ///
    /// # Errors
    ///
    /// Returns error if no radio is online or more radios than provisioned
    pub fn new(num_radios_online: u8) -> Result<Self> {
        if num_radios_online == 0 || num_radios_online > NUMBER_OF_RADIOS {
            return Err(RobotLinkError::Address(format!(
                "{} radios online, must be between 1 and {}",
                num_radios_online, NUMBER_OF_RADIOS
            )));
        }
        Ok(Self { num_radios_online })
    }

    pub fn num_radios_online(&self) -> u8 {
        self.num_radios_online
    }

    /// Number of robots addressable with the radios online
    pub fn max_robots(&self) -> u8 {
        self.num_radios_online * MAX_PIPES
    }

    /// Robot identity served by `pipe` on radio `radio_index`
    pub fn robot_id(&self, pipe: u8, radio_index: u8) -> Result<RobotId> {
        if pipe == 0 || pipe > MAX_PIPES {
            return Err(RobotLinkError::Address(format!(
                "Pipe {} out of range 1..={}",
                pipe, MAX_PIPES
            )));
        }
        if radio_index >= self.num_radios_online {
            return Err(RobotLinkError::Address(format!(
                "Radio {} is not online ({} radios online)",
                radio_index, self.num_radios_online
            )));
        }
        Ok(robot_id(pipe, radio_index, self.num_radios_online))
    }

    /// Pipe on which `robot` is served
    pub fn pipe(&self, robot: RobotId) -> Result<u8> {
        self.check_robot(robot)?;
        Ok(pipe(robot, self.num_radios_online))
    }

    /// Radio front-end serving `robot`
    pub fn radio_index(&self, robot: RobotId) -> Result<u8> {
        self.check_robot(robot)?;
        Ok(radio_index(robot, self.num_radios_online))
    }

    fn check_robot(&self, robot: RobotId) -> Result<()> {
        if robot >= self.max_robots() {
            return Err(RobotLinkError::Address(format!(
                "Robot {} not addressable with {} radios online (max {})",
                robot,
                self.num_radios_online,
                self.max_robots()
            )));
        }
        Ok(())
    }
}
