//! # Radio Protocol Constants and Types
//!
//! Core definitions for the base station ↔ robot radio link.
//!
//! Every message is a 32-byte radio payload:
//!
//! ```text
//! +------+-----------------------------------------+
//! | type | payload (fixed size per type, LE)  | 0s |
//! +------+-----------------------------------------+
//!   1 B               ≤ 31 B
//! ```
//!
//! `MessageType` values are never reused across protocol revisions. A
//! retired value stays reserved and decodes as unknown.

use serde::Serialize;

use crate::error::{Result, RobotLinkError};
use crate::variable::VariableId;

/// Hard radio payload limit
pub const MAX_MESSAGE_SIZE: usize = 32;

/// Size of the leading type tag
pub const MESSAGE_TYPE_SIZE: usize = 1;

/// Largest payload that fits behind the type tag
pub const MAX_PAYLOAD_SIZE: usize = MAX_MESSAGE_SIZE - MESSAGE_TYPE_SIZE;

/// Number of variable slots in a multi config message
pub const CONFIG_SLOTS: usize = 5;

/// Number of motor drivers reporting status
pub const NUM_MOTORS: usize = 4;

/// Reception pipes per radio front-end (pipe 0 is reserved)
pub const MAX_PIPES: u8 = 5;

/// Radio front-ends provisioned on the base station
pub const NUMBER_OF_RADIOS: u8 = 4;

/// Highest nRF24 channel
pub const MAX_CHANNEL: u8 = 125;

/// Base → robot pipe address (robot id is added)
pub const BASE_TO_ROBOT_ADDRESS: u64 = 0xB5_7A_10_00_00;

/// Robot → base pipe address (robot id is added)
pub const ROBOT_TO_BASE_ADDRESS: u64 = 0xB5_7A_20_00_00;

/// Broadcast address every robot listens on
pub const BROADCAST_ADDRESS: u64 = 0xB5_7A_EE_EE_EE;

/// Payload sizes (excluding the type tag)
pub const POSE_SIZE: usize = 12;
pub const KICKER_STATUS_SIZE: usize = 3;
pub const COMMAND_PAYLOAD_SIZE: usize = POSE_SIZE + 4 + 4 + 1;
pub const CONFIG_MESSAGE_PAYLOAD_SIZE: usize = 1 + 1 + 4;
pub const MULTI_CONFIG_PAYLOAD_SIZE: usize = 1 + CONFIG_SLOTS + 4 * CONFIG_SLOTS;
pub const STATUS_HF_PAYLOAD_SIZE: usize = 1 + NUM_MOTORS + POSE_SIZE;
pub const STATUS_LF_PAYLOAD_SIZE: usize = 4 + KICKER_STATUS_SIZE + NUM_MOTORS;
pub const IMU_READINGS_PAYLOAD_SIZE: usize = 4 * 6;
pub const ODOMETRY_READING_PAYLOAD_SIZE: usize = 2 * POSE_SIZE;
pub const OVERRIDE_ODOMETRY_PAYLOAD_SIZE: usize = POSE_SIZE;

/// Robot identity in `[0, max_robots)`
pub type RobotId = u8;

/// Protocol revision reported by the base station
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProtocolVersion {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

/// Current protocol revision
pub const PROTOCOL_VERSION: ProtocolVersion = ProtocolVersion { major: 3, minor: 1, patch: 0 };

impl std::fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Envelope type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum MessageType {
    /// Nothing received (all-zero buffer)
    None = 0,
    Command = 1,
    ConfigMessage = 2,
    // 3 was `Reply`, retired
    MultiConfigMessage = 4,
    StatusHighFreq = 5,
    StatusLowFreq = 6,
    ImuReadings = 7,
    OdometryReading = 8,
    OverrideOdometry = 9,
    /// Link keepalive without payload
    NoOp = 10,
}

/// Type tags that shipped once and must never be reassigned
pub const RETIRED_MESSAGE_TYPES: &[u8] = &[3];

impl MessageType {
    /// Every live message type
    pub const ALL: [MessageType; 10] = [
        MessageType::None,
        MessageType::Command,
        MessageType::ConfigMessage,
        MessageType::MultiConfigMessage,
        MessageType::StatusHighFreq,
        MessageType::StatusLowFreq,
        MessageType::ImuReadings,
        MessageType::OdometryReading,
        MessageType::OverrideOdometry,
        MessageType::NoOp,
    ];

    /// Encoded payload size for this type (excluding the tag)
    pub const fn payload_size(self) -> usize {
        match self {
            MessageType::None | MessageType::NoOp => 0,
            MessageType::Command => COMMAND_PAYLOAD_SIZE,
            MessageType::ConfigMessage => CONFIG_MESSAGE_PAYLOAD_SIZE,
            MessageType::MultiConfigMessage => MULTI_CONFIG_PAYLOAD_SIZE,
            MessageType::StatusHighFreq => STATUS_HF_PAYLOAD_SIZE,
            MessageType::StatusLowFreq => STATUS_LF_PAYLOAD_SIZE,
            MessageType::ImuReadings => IMU_READINGS_PAYLOAD_SIZE,
            MessageType::OdometryReading => ODOMETRY_READING_PAYLOAD_SIZE,
            MessageType::OverrideOdometry => OVERRIDE_ODOMETRY_PAYLOAD_SIZE,
        }
    }

    /// Wire value of the tag
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

// Every payload must fit the radio frame together with its tag
const _: () = {
    let mut i = 0;
    while i < MessageType::ALL.len() {
        assert!(MESSAGE_TYPE_SIZE + MessageType::ALL[i].payload_size() <= MAX_MESSAGE_SIZE);
        i += 1;
    }
};

impl TryFrom<u8> for MessageType {
    type Error = RobotLinkError;

    fn try_from(value: u8) -> Result<Self> {
        MessageType::ALL
            .iter()
            .copied()
            .find(|mt| mt.as_u8() == value)
            .ok_or(RobotLinkError::UnknownMessageType(value))
    }
}

/// Status of the robot or one of its MCUs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[repr(u8)]
pub enum Status {
    /// Estop, something is very wrong
    Emergency = 0,
    Ok = 1,
    /// Stopped, can be restarted easily
    Stop = 2,
    /// Performing a startup procedure
    Starting = 3,
    Overtemp = 4,
    /// Nothing received; never sent explicitly
    #[default]
    NoReply = 5,
    /// Kicker armed, capacitor recharges automatically
    Armed = 6,
    /// Kicker disarmed, capacitor may still be charged
    Disarmed = 7,
    /// Kicker discharged and safe to handle
    Safe = 8,
}

impl Status {
    /// Map a wire byte, treating garbage as `NoReply`
    pub fn from_wire(value: u8) -> Self {
        match value {
            0 => Status::Emergency,
            1 => Status::Ok,
            2 => Status::Stop,
            3 => Status::Starting,
            4 => Status::Overtemp,
            6 => Status::Armed,
            7 => Status::Disarmed,
            8 => Status::Safe,
            _ => Status::NoReply,
        }
    }
}

/// A 2D robot pose. XY are linear, Z is angular
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Pose {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Pose {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Kick requested alongside a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[repr(u8)]
pub enum KickType {
    #[default]
    None = 0,
    Kick = 1,
    Chip = 2,
}

impl KickType {
    pub fn from_wire(value: u8) -> Self {
        match value {
            1 => KickType::Kick,
            2 => KickType::Chip,
            _ => KickType::None,
        }
    }
}

/// Kicker temperature scale (°C per LSB)
pub const KICKER_SCALE_TEMP: f32 = 100.0 / i8::MAX as f32;

/// Kicker capacitor voltage scale (V per LSB)
pub const KICKER_SCALE_VCAP: f32 = 260.0 / u8::MAX as f32;

/// Kicker board status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct KickerStatus {
    pub status: Status,
    pub temperature: i8,
    pub capacitor_voltage: u8,
}

impl KickerStatus {
    /// Temperature in °C
    pub fn temperature_celsius(&self) -> f32 {
        self.temperature as f32 * KICKER_SCALE_TEMP
    }

    /// Capacitor voltage in volts
    pub fn capacitor_volts(&self) -> f32 {
        self.capacitor_voltage as f32 * KICKER_SCALE_VCAP
    }
}

/// Config-sync operation. `None` and the `*Return` variants are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[repr(u8)]
pub enum ConfigOperation {
    #[default]
    None = 0,
    Read = 1,
    ReadReturn = 2,
    Write = 3,
    WriteReturn = 4,
    SetDefault = 5,
    SetDefaultReturn = 6,
}

impl ConfigOperation {
    /// Map a wire byte, treating garbage as `None`
    pub fn from_wire(value: u8) -> Self {
        match value {
            1 => ConfigOperation::Read,
            2 => ConfigOperation::ReadReturn,
            3 => ConfigOperation::Write,
            4 => ConfigOperation::WriteReturn,
            5 => ConfigOperation::SetDefault,
            6 => ConfigOperation::SetDefaultReturn,
            _ => ConfigOperation::None,
        }
    }

    /// The reply operation for a request, `None` for terminal states
    pub fn reply(self) -> Option<ConfigOperation> {
        match self {
            ConfigOperation::Read => Some(ConfigOperation::ReadReturn),
            ConfigOperation::Write => Some(ConfigOperation::WriteReturn),
            ConfigOperation::SetDefault => Some(ConfigOperation::SetDefaultReturn),
            _ => None,
        }
    }

    /// Whether this operation ends an exchange
    pub fn is_terminal(self) -> bool {
        self.reply().is_none()
    }
}

/// Command from base station to robot
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Command {
    /// Desired robot speed
    pub speed: Pose,
    pub dribbler_speed: f32,
    pub kick_speed: f32,
    pub kick_type: KickType,
}

/// Single-variable configuration message (legacy form)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ConfigMessage {
    pub operation: ConfigOperation,
    pub variable: VariableId,
    pub value: u32,
}

/// Configuration message carrying up to five variables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MultiConfigMessage {
    pub operation: ConfigOperation,
    pub variables: [VariableId; CONFIG_SLOTS],
    pub values: [u32; CONFIG_SLOTS],
}

impl MultiConfigMessage {
    /// Request the current value of up to five variables
    pub fn read(variables: &[VariableId]) -> Result<Self> {
        Self::request(ConfigOperation::Read, variables.iter().map(|&v| (v, 0)))
    }

    /// Request writing raw values to up to five variables
    pub fn write(assignments: &[(VariableId, u32)]) -> Result<Self> {
        Self::request(ConfigOperation::Write, assignments.iter().copied())
    }

    /// Request resetting up to five variables to their defaults
    pub fn set_default(variables: &[VariableId]) -> Result<Self> {
        Self::request(ConfigOperation::SetDefault, variables.iter().map(|&v| (v, 0)))
    }

    fn request<I>(operation: ConfigOperation, slots: I) -> Result<Self>
    where
        I: ExactSizeIterator<Item = (VariableId, u32)>,
    {
        if slots.len() > CONFIG_SLOTS {
            return Err(RobotLinkError::Protocol(format!(
                "{} variables requested, at most {} fit in one message",
                slots.len(),
                CONFIG_SLOTS
            )));
        }

        let mut message = Self { operation, ..Default::default() };
        for (i, (variable, value)) in slots.enumerate() {
            message.variables[i] = variable;
            message.values[i] = value;
        }
        Ok(message)
    }

    /// Occupied slots as `(variable, value)` pairs
    pub fn slots(&self) -> impl Iterator<Item = (VariableId, u32)> + '_ {
        self.variables
            .iter()
            .zip(self.values.iter())
            .filter(|(variable, _)| !variable.is_none())
            .map(|(&variable, &value)| (variable, value))
    }
}

/// High-frequency status from robot to base station
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct StatusHighFreq {
    pub status: Status,
    pub motor_status: [Status; NUM_MOTORS],
    /// Measured speed
    pub speed: Pose,
}

/// Low-frequency status from robot to base station
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct StatusLowFreq {
    /// Battery voltage in volts
    pub battery_voltage: f32,
    pub kicker: KickerStatus,
    /// Motor temperatures in °C
    pub motor_temperature: [i8; NUM_MOTORS],
}

/// Raw IMU readings
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ImuReadings {
    /// Acceleration in m/s²
    pub acceleration: [f32; 3],
    /// Rate of turn in rad/s
    pub rate_of_turn: [f32; 3],
}

/// Odometry estimate from the robot
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct OdometryReading {
    pub position: Pose,
    pub speed: Pose,
}

/// Replace the robot's odometry estimate (e.g. from vision)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct OverrideOdometry {
    pub position: Pose,
}

/// Decoded radio message
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub enum Message {
    /// Nothing received
    #[default]
    None,
    Command(Command),
    ConfigMessage(ConfigMessage),
    MultiConfigMessage(MultiConfigMessage),
    StatusHighFreq(StatusHighFreq),
    StatusLowFreq(StatusLowFreq),
    ImuReadings(ImuReadings),
    OdometryReading(OdometryReading),
    OverrideOdometry(OverrideOdometry),
    NoOp,
}

impl Message {
    /// Type tag for this message
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::None => MessageType::None,
            Message::Command(_) => MessageType::Command,
            Message::ConfigMessage(_) => MessageType::ConfigMessage,
            Message::MultiConfigMessage(_) => MessageType::MultiConfigMessage,
            Message::StatusHighFreq(_) => MessageType::StatusHighFreq,
            Message::StatusLowFreq(_) => MessageType::StatusLowFreq,
            Message::ImuReadings(_) => MessageType::ImuReadings,
            Message::OdometryReading(_) => MessageType::OdometryReading,
            Message::OverrideOdometry(_) => MessageType::OverrideOdometry,
            Message::NoOp => MessageType::NoOp,
        }
    }
}

macro_rules! impl_from_payload {
    ($($payload:ident),*) => {
        $(
            impl From<$payload> for Message {
                fn from(payload: $payload) -> Self {
                    Message::$payload(payload)
                }
            }
        )*
    };
}

impl_from_payload!(
    Command,
    ConfigMessage,
    MultiConfigMessage,
    StatusHighFreq,
    StatusLowFreq,
    ImuReadings,
    OdometryReading,
    OverrideOdometry
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_payload_fits_frame() {
        for mt in MessageType::ALL {
            assert!(
                MESSAGE_TYPE_SIZE + mt.payload_size() <= MAX_MESSAGE_SIZE,
                "{:?} does not fit in {} bytes",
                mt,
                MAX_MESSAGE_SIZE
            );
        }
    }

    #[test]
    fn test_message_type_values_are_stable() {
        assert_eq!(MessageType::None.as_u8(), 0);
        assert_eq!(MessageType::Command.as_u8(), 1);
        assert_eq!(MessageType::ConfigMessage.as_u8(), 2);
        assert_eq!(MessageType::MultiConfigMessage.as_u8(), 4);
        assert_eq!(MessageType::NoOp.as_u8(), 10);
    }

    #[test]
    fn test_retired_types_are_not_reassigned() {
        for &retired in RETIRED_MESSAGE_TYPES {
            assert!(MessageType::try_from(retired).is_err());
            assert!(MessageType::ALL.iter().all(|mt| mt.as_u8() != retired));
        }
    }

    #[test]
    fn test_message_type_try_from() {
        assert_eq!(MessageType::try_from(5).unwrap(), MessageType::StatusHighFreq);
        match MessageType::try_from(0xAB) {
            Err(RobotLinkError::UnknownMessageType(0xAB)) => {}
            other => panic!("Expected UnknownMessageType, got: {:?}", other),
        }
    }

    #[test]
    fn test_config_operation_transitions() {
        assert_eq!(ConfigOperation::Read.reply(), Some(ConfigOperation::ReadReturn));
        assert_eq!(ConfigOperation::Write.reply(), Some(ConfigOperation::WriteReturn));
        assert_eq!(ConfigOperation::SetDefault.reply(), Some(ConfigOperation::SetDefaultReturn));
        assert!(ConfigOperation::None.is_terminal());
        assert!(ConfigOperation::ReadReturn.is_terminal());
        assert!(ConfigOperation::WriteReturn.is_terminal());
        assert!(ConfigOperation::SetDefaultReturn.is_terminal());
    }

    #[test]
    fn test_garbled_enums_map_to_safe_values() {
        assert_eq!(Status::from_wire(0xFF), Status::NoReply);
        assert_eq!(ConfigOperation::from_wire(0x42), ConfigOperation::None);
        assert_eq!(KickType::from_wire(9), KickType::None);
    }

    #[test]
    fn test_multi_config_builders() {
        let msg = MultiConfigMessage::read(&[VariableId::SPEED_KP, VariableId::SPEED_KI]).unwrap();
        assert_eq!(msg.operation, ConfigOperation::Read);
        assert_eq!(msg.variables[0], VariableId::SPEED_KP);
        assert_eq!(msg.variables[1], VariableId::SPEED_KI);
        assert!(msg.variables[2..].iter().all(|v| v.is_none()));
        assert_eq!(msg.slots().count(), 2);

        let msg = MultiConfigMessage::write(&[(VariableId::RADIO_CHANNEL, 42)]).unwrap();
        assert_eq!(msg.operation, ConfigOperation::Write);
        assert_eq!(msg.values[0], 42);
    }

    #[test]
    fn test_multi_config_too_many_variables() {
        let vars = [VariableId::SPEED_KP; CONFIG_SLOTS + 1];
        assert!(MultiConfigMessage::read(&vars).is_err());
    }

    #[test]
    fn test_kicker_status_scaling() {
        let kicker = KickerStatus { status: Status::Armed, temperature: i8::MAX, capacitor_voltage: u8::MAX };
        assert!((kicker.temperature_celsius() - 100.0).abs() < 0.01);
        assert!((kicker.capacitor_volts() - 260.0).abs() < 0.01);
    }

    #[test]
    fn test_message_type_of_payload() {
        let msg: Message = Command::default().into();
        assert_eq!(msg.message_type(), MessageType::Command);
        assert_eq!(Message::default().message_type(), MessageType::None);
        assert_eq!(Message::NoOp.message_type(), MessageType::NoOp);
    }
}
