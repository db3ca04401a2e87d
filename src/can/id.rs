//! # CAN Identifier Codec
//!
//! Packs a (device, item, access) triple into an 11-bit identifier and
//! back. `item` is either a command code or a configuration variable; the
//! top bit says which.

use serde::Serialize;

use super::protocol::*;
use crate::error::{Result, RobotLinkError};
use crate::variable::VariableId;

/// What a frame carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CanItem {
    Command(CanCommand),
    Variable(VariableId),
}

/// Decoded CAN identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CanIdentifier {
    pub device: DeviceId,
    pub item: CanItem,
    pub access: CanAccess,
}

impl CanIdentifier {
    pub fn command(device: DeviceId, command: CanCommand, access: CanAccess) -> Self {
        Self {
            device,
            item: CanItem::Command(command),
            access,
        }
    }

    pub fn variable(device: DeviceId, variable: VariableId, access: CanAccess) -> Self {
        Self {
            device,
            item: CanItem::Variable(variable),
            access,
        }
    }

    /// Raw identifier
    pub fn raw(&self) -> Result<u16> {
        encode(self.device, self.item, self.access)
    }
}

impl TryFrom<u16> for CanIdentifier {
    type Error = RobotLinkError;

    fn try_from(id: u16) -> Result<Self> {
        decode(id)
    }
}

/// Encode an identifier
///
/// # Arguments
///
/// * `device` - Addressed device
/// * `item` - Command code or configuration variable
/// * `access` - Write, read or return
///
/// # Errors
///
/// Returns error if the variable is `NONE` or does not fit the 5-bit field,
/// or if a bus management command is addressed to anything but
/// `DeviceId::All` with `CanAccess::Write`
///
/// # Examples
///
/// ```
/// use robot_link::can::id::{encode, CanItem};
/// use robot_link::can::protocol::{CanAccess, CanCommand, DeviceId, ESTOP};
///
/// let id = encode(DeviceId::All, CanItem::Command(CanCommand::Estop), CanAccess::Write)?;
/// assert_eq!(id, ESTOP);
/// # Ok::<(), robot_link::error::RobotLinkError>(())
/// ```
pub fn encode(device: DeviceId, item: CanItem, access: CanAccess) -> Result<u16> {
    let (config, code) = match item {
        CanItem::Command(command) => {
            check_reserved(device, command, access)?;
            (0, command as u16)
        }
        CanItem::Variable(variable) => {
            if variable.is_none() {
                return Err(RobotLinkError::CanId("Variable NONE has no identifier".to_string()));
            }
            if variable.0 as u16 > ITEM_MASK {
                return Err(RobotLinkError::CanId(format!(
                    "Variable {} does not fit the {}-bit item field",
                    variable,
                    ITEM_MASK.count_ones()
                )));
            }
            (1, variable.0 as u16)
        }
    };

    Ok((config << CONFIG_BIT_SHIFT)
        | ((device as u16) << DEVICE_SHIFT)
        | ((access as u16) << ACCESS_SHIFT)
        | code)
}

/// Decode an identifier
///
/// # Errors
///
/// Returns error for identifiers above 11 bits, the invalid access value,
/// unknown command codes, variable `NONE` and bus management codes outside
/// their fixed identifiers
pub fn decode(id: u16) -> Result<CanIdentifier> {
    if id > MAX_CAN_ID {
        return Err(RobotLinkError::CanId(format!("0x{:X} is not an 11-bit identifier", id)));
    }

    let device = DeviceId::from_bits(((id >> DEVICE_SHIFT) & DEVICE_MASK) as u8);
    let access = CanAccess::try_from(((id >> ACCESS_SHIFT) & ACCESS_MASK) as u8)?;
    let code = (id & ITEM_MASK) as u8;

    let item = if id >> CONFIG_BIT_SHIFT == 1 {
        let variable = VariableId(code);
        if variable.is_none() {
            return Err(RobotLinkError::CanId(format!("0x{:03X} addresses variable NONE", id)));
        }
        CanItem::Variable(variable)
    } else {
        let command = CanCommand::try_from(code)?;
        check_reserved(device, command, access)?;
        CanItem::Command(command)
    };

    Ok(CanIdentifier { device, item, access })
}

/// Bus management frames exist only as `ESTOP`..`ACK`
fn check_reserved(device: DeviceId, command: CanCommand, access: CanAccess) -> Result<()> {
    if command.is_reserved() && (device != DeviceId::All || access != CanAccess::Write) {
        return Err(RobotLinkError::CanId(format!(
            "{:?} is a fixed identifier, cannot address {:?} with {:?}",
            command, device, access
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCESSES: [CanAccess; 3] = [CanAccess::Write, CanAccess::Read, CanAccess::Return];

    #[test]
    fn test_reserved_identifiers() {
        let cases = [
            (CanCommand::Estop, ESTOP),
            (CanCommand::Stop, STOP),
            (CanCommand::Sync, SYNC),
            (CanCommand::Announce, ANNOUNCE),
            (CanCommand::ReqAnnounce, REQ_ANNOUNCE),
            (CanCommand::Ack, ACK),
        ];
        for (command, expected) in cases {
            assert_eq!(
                encode(DeviceId::All, CanItem::Command(command), CanAccess::Write).unwrap(),
                expected
            );
        }
    }

    #[test]
    fn test_field_layout() {
        let id = encode(DeviceId::Kicker, CanItem::Variable(VariableId(0x15)), CanAccess::Return).unwrap();
        assert_eq!(id, (1 << 10) | (7 << 7) | (2 << 5) | 0x15);

        let id = encode(DeviceId::Driver2, CanItem::Command(CanCommand::SetSpeed), CanAccess::Write).unwrap();
        assert_eq!(id, (4 << 7) | 0x09);
    }

    #[test]
    fn test_round_trip_every_command() {
        for device in DeviceId::ALL_DEVICES {
            for access in ACCESSES {
                for command in CanCommand::ALL.into_iter().filter(|c| !c.is_reserved()) {
                    let triple = CanIdentifier::command(device, command, access);
                    assert_eq!(decode(triple.raw().unwrap()).unwrap(), triple);
                }
            }
        }
    }

    #[test]
    fn test_round_trip_every_variable() {
        for device in DeviceId::ALL_DEVICES {
            for access in ACCESSES {
                for raw in 1..=ITEM_MASK as u8 {
                    let triple = CanIdentifier::variable(device, VariableId(raw), access);
                    let id = triple.raw().unwrap();
                    assert!(id <= MAX_CAN_ID);
                    assert_eq!(CanIdentifier::try_from(id).unwrap(), triple);
                }
            }
        }
    }

    #[test]
    fn test_reserved_identifiers_do_not_vary() {
        for command in CanCommand::ALL.into_iter().filter(|c| c.is_reserved()) {
            for device in DeviceId::ALL_DEVICES {
                for access in ACCESSES {
                    let result = encode(device, CanItem::Command(command), access);
                    if device == DeviceId::All && access == CanAccess::Write {
                        assert_eq!(result.unwrap(), command as u16);
                    } else {
                        assert!(result.is_err(), "{:?} from {:?} with {:?}", command, device, access);
                    }
                }
            }
        }

        // Kicker, read, ESTOP code
        assert!(decode(0x3A0).is_err());
        assert!(decode((1 << DEVICE_SHIFT) | STOP).is_err());
        assert!(decode(1 << ACCESS_SHIFT).is_err());
        assert_eq!(
            decode(ESTOP).unwrap(),
            CanIdentifier::command(DeviceId::All, CanCommand::Estop, CanAccess::Write)
        );
    }

    #[test]
    fn test_encode_rejects_out_of_range_variable() {
        assert!(encode(DeviceId::Primary, CanItem::Variable(VariableId(32)), CanAccess::Read).is_err());
        assert!(encode(DeviceId::Primary, CanItem::Variable(VariableId::NONE), CanAccess::Read).is_err());
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert!(decode(0x800).is_err(), "More than 11 bits");
        assert!(decode(3 << ACCESS_SHIFT).is_err(), "Access field 3");
        assert!(decode(0x07).is_err(), "Unassigned command code");
        assert!(decode(1 << CONFIG_BIT_SHIFT).is_err(), "Variable NONE");
    }

    #[test]
    fn test_safety_frames_win_arbitration() {
        let estop = encode(DeviceId::All, CanItem::Command(CanCommand::Estop), CanAccess::Write).unwrap();
        let stop = encode(DeviceId::All, CanItem::Command(CanCommand::Stop), CanAccess::Write).unwrap();
        let setpoint = encode(DeviceId::Driver0, CanItem::Command(CanCommand::SetSpeed), CanAccess::Write).unwrap();
        let telemetry = encode(DeviceId::Driver0, CanItem::Command(CanCommand::Telemetry), CanAccess::Return).unwrap();
        let config = encode(DeviceId::All, CanItem::Variable(VariableId::SPEED_KP), CanAccess::Write).unwrap();

        assert!(estop < stop);
        assert!(stop < setpoint);
        assert!(setpoint < telemetry);
        assert!(telemetry < config, "Configuration traffic is lowest priority");
    }
}
