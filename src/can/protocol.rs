//! # CAN Protocol Constants and Types
//!
//! Identifiers on the robot's internal CAN bus are standard 11-bit frames:
//!
//! ```text
//!  10   9  8  7   6  5   4  3  2  1  0
//! +---+---------+-------+--------------+
//! |cfg| device  |access | command/var  |
//! +---+---------+-------+--------------+
//! ```
//!
//! Lower identifiers win arbitration, so bus management frames addressed
//! to every device sit at the very bottom of the range.

use serde::Serialize;

use crate::error::{Result, RobotLinkError};

/// Highest valid standard-frame identifier
pub const MAX_CAN_ID: u16 = 0x7FF;

/// Maximum data length of a classic CAN frame
pub const MAX_CAN_DATA: usize = 8;

pub const CONFIG_BIT_SHIFT: u16 = 10;
pub const DEVICE_SHIFT: u16 = 7;
pub const DEVICE_MASK: u16 = 0b111;
pub const ACCESS_SHIFT: u16 = 5;
pub const ACCESS_MASK: u16 = 0b11;
pub const ITEM_MASK: u16 = 0b1_1111;

/// Bus management identifiers, identical for every device
pub const ESTOP: u16 = 0x000;
pub const STOP: u16 = 0x001;
pub const SYNC: u16 = 0x002;
pub const ANNOUNCE: u16 = 0x003;
pub const REQ_ANNOUNCE: u16 = 0x004;
pub const ACK: u16 = 0x005;

/// Largest setpoint magnitude accepted by the motor drivers
pub const SETPOINT_LIMIT: f32 = 1e5;

/// Device on the robot's CAN bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum DeviceId {
    /// Every device (bus management)
    All = 0,
    /// Main controller, coordinates all other devices
    Primary = 1,
    Driver0 = 2,
    Driver1 = 3,
    Driver2 = 4,
    Driver3 = 5,
    Dribbler = 6,
    Kicker = 7,
}

impl DeviceId {
    pub const ALL_DEVICES: [DeviceId; 8] = [
        DeviceId::All,
        DeviceId::Primary,
        DeviceId::Driver0,
        DeviceId::Driver1,
        DeviceId::Driver2,
        DeviceId::Driver3,
        DeviceId::Dribbler,
        DeviceId::Kicker,
    ];

    /// Wheel motor drivers in motor order
    pub const DRIVERS: [DeviceId; 4] = [DeviceId::Driver0, DeviceId::Driver1, DeviceId::Driver2, DeviceId::Driver3];

    /// Map the 3-bit device field
    pub fn from_bits(bits: u8) -> Self {
        Self::ALL_DEVICES[(bits as usize) & DEVICE_MASK as usize]
    }
}

/// Access type of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum CanAccess {
    Write = 0,
    Read = 1,
    /// Answer to a read or write
    Return = 2,
}

impl TryFrom<u8> for CanAccess {
    type Error = RobotLinkError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(CanAccess::Write),
            1 => Ok(CanAccess::Read),
            2 => Ok(CanAccess::Return),
            _ => Err(RobotLinkError::CanId(format!("Invalid access field {}", value))),
        }
    }
}

/// Command and telemetry codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum CanCommand {
    /// Emergency stop all devices
    Estop = 0x00,
    /// Graceful stop
    Stop = 0x01,
    /// Synchronise clocks
    Sync = 0x02,
    /// Announce presence on the bus
    Announce = 0x03,
    /// Ask every device to announce itself
    ReqAnnounce = 0x04,
    Ack = 0x05,
    LedSetDuty = 0x06,
    SetPosition = 0x08,
    SetSpeed = 0x09,
    SetTorque = 0x0A,
    Kick = 0x0C,
    Chip = 0x0D,
    Status = 0x1C,
    KickerStatus = 0x1D,
    Telemetry = 0x1E,
}

impl CanCommand {
    pub const ALL: [CanCommand; 15] = [
        CanCommand::Estop,
        CanCommand::Stop,
        CanCommand::Sync,
        CanCommand::Announce,
        CanCommand::ReqAnnounce,
        CanCommand::Ack,
        CanCommand::LedSetDuty,
        CanCommand::SetPosition,
        CanCommand::SetSpeed,
        CanCommand::SetTorque,
        CanCommand::Kick,
        CanCommand::Chip,
        CanCommand::Status,
        CanCommand::KickerStatus,
        CanCommand::Telemetry,
    ];

    /// Bus management command, only valid as its fixed identifier
    pub fn is_reserved(self) -> bool {
        self as u8 <= CanCommand::Ack as u8
    }
}

// Command codes must fit the 5-bit item field
const _: () = {
    let mut i = 0;
    while i < CanCommand::ALL.len() {
        assert!(CanCommand::ALL[i] as u16 <= ITEM_MASK);
        i += 1;
    }
};

impl TryFrom<u8> for CanCommand {
    type Error = RobotLinkError;

    fn try_from(value: u8) -> Result<Self> {
        CanCommand::ALL
            .iter()
            .copied()
            .find(|command| *command as u8 == value)
            .ok_or_else(|| RobotLinkError::CanId(format!("Unknown command code 0x{:02X}", value)))
    }
}
