//! # CAN Frames
//!
//! A classic CAN frame plus the payload helpers used on the robot bus:
//! float setpoints, raw configuration values and kicker status. All
//! multi-byte values are little-endian.

use bytes::{Buf, BufMut};
use std::collections::HashMap;

use super::id::{decode, encode, CanIdentifier, CanItem};
use super::protocol::*;
use crate::error::{Result, RobotLinkError};
use crate::radio::protocol::{KickerStatus, Status};
use crate::variable::VariableId;

/// Classic CAN frame with a standard identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CanFrame {
    pub id: u16,
    pub len: u8,
    pub data: [u8; MAX_CAN_DATA],
}

impl CanFrame {
    /// Build a frame
    ///
    /// # Errors
    ///
    /// Returns error if `id` exceeds 11 bits or `data` exceeds 8 bytes
    pub fn new(id: u16, data: &[u8]) -> Result<Self> {
        if id > MAX_CAN_ID {
            return Err(RobotLinkError::CanId(format!("0x{:X} is not an 11-bit identifier", id)));
        }
        if data.len() > MAX_CAN_DATA {
            return Err(RobotLinkError::CanId(format!(
                "{} data bytes, a CAN frame carries at most {}",
                data.len(),
                MAX_CAN_DATA
            )));
        }

        let mut frame = Self {
            id,
            len: data.len() as u8,
            ..Default::default()
        };
        frame.data[..data.len()].copy_from_slice(data);
        Ok(frame)
    }

    /// Data bytes actually carried
    pub fn payload(&self) -> &[u8] {
        &self.data[..(self.len as usize).min(MAX_CAN_DATA)]
    }

    /// Decoded identifier
    pub fn identifier(&self) -> Result<CanIdentifier> {
        decode(self.id)
    }

    /// Setpoint frame for a motor driver, value clamped to `±SETPOINT_LIMIT`
    ///
    /// # Errors
    ///
    /// Returns error if `command` is not a setpoint or `value` is NaN
    pub fn setpoint(device: DeviceId, command: CanCommand, value: f32) -> Result<Self> {
        if !matches!(command, CanCommand::SetPosition | CanCommand::SetSpeed | CanCommand::SetTorque) {
            return Err(RobotLinkError::CanId(format!("{:?} is not a setpoint command", command)));
        }
        if value.is_nan() {
            return Err(RobotLinkError::CanId("Setpoint is NaN".to_string()));
        }

        let id = encode(device, CanItem::Command(command), CanAccess::Write)?;
        let mut data = [0u8; 4];
        (&mut data[..]).put_f32_le(value.clamp(-SETPOINT_LIMIT, SETPOINT_LIMIT));
        Self::new(id, &data)
    }

    /// Configuration variable frame carrying a raw 32-bit value
    pub fn variable(device: DeviceId, variable: VariableId, access: CanAccess, value: u32) -> Result<Self> {
        let id = encode(device, CanItem::Variable(variable), access)?;
        let data = if access == CanAccess::Read { Vec::new() } else { value.to_le_bytes().to_vec() };
        Self::new(id, &data)
    }

    /// Kicker status report
    pub fn kicker_status(status: &KickerStatus) -> Result<Self> {
        let id = encode(DeviceId::Kicker, CanItem::Command(CanCommand::KickerStatus), CanAccess::Return)?;
        let mut data = [0u8; 3];
        let mut buf = &mut data[..];
        buf.put_u8(status.status as u8);
        buf.put_i8(status.temperature);
        buf.put_u8(status.capacitor_voltage);
        Self::new(id, &data)
    }

    /// First four data bytes as a float
    pub fn as_f32(&self) -> Option<f32> {
        let mut payload = self.payload();
        (payload.remaining() >= 4).then(|| payload.get_f32_le())
    }

    /// First four data bytes as a raw value
    pub fn as_u32(&self) -> Option<u32> {
        let mut payload = self.payload();
        (payload.remaining() >= 4).then(|| payload.get_u32_le())
    }

    /// Data bytes as kicker status
    pub fn as_kicker_status(&self) -> Option<KickerStatus> {
        let mut payload = self.payload();
        if payload.remaining() < 3 {
            return None;
        }
        Some(KickerStatus {
            status: Status::from_wire(payload.get_u8()),
            temperature: payload.get_i8(),
            capacitor_voltage: payload.get_u8(),
        })
    }
}

/// Hardware UID → device assignment for boards with a burned-in identity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceMap {
    boards: HashMap<u32, DeviceId>,
}

/// Boards currently fitted
const KNOWN_BOARDS: &[(u32, DeviceId)] = &[
    (0x44001C, DeviceId::Driver0),
    (0x4D004C, DeviceId::Driver1),
    (0x460053, DeviceId::Driver2),
    (0x4B0022, DeviceId::Driver3),
    (0x340031, DeviceId::Dribbler),
];

impl DeviceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map seeded with the currently fitted boards
    pub fn builtin() -> Self {
        KNOWN_BOARDS.iter().copied().collect()
    }

    /// Assign a board, returning the device it had before
    pub fn insert(&mut self, uid: u32, device: DeviceId) -> Option<DeviceId> {
        self.boards.insert(uid, device)
    }

    pub fn lookup(&self, uid: u32) -> Option<DeviceId> {
        self.boards.get(&uid).copied()
    }

    pub fn len(&self) -> usize {
        self.boards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boards.is_empty()
    }
}

impl FromIterator<(u32, DeviceId)> for DeviceMap {
    fn from_iter<I: IntoIterator<Item = (u32, DeviceId)>>(iter: I) -> Self {
        Self {
            boards: iter.into_iter().collect(),
        }
    }
}
