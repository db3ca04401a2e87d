//! # Configuration Variable Identifiers
//!
//! Numeric identifiers shared by the radio config-sync protocol and the CAN
//! configuration frames. Identifiers are never reused once assigned.

use serde::Serialize;
use std::fmt;

/// Identifier of a remotely accessible configuration variable.
///
/// `VariableId::NONE` marks an empty slot in a config message. Identifiers
/// not listed here are still carried on the wire; the endpoint simply
/// reports them as unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct VariableId(pub u8);

impl VariableId {
    /// Empty slot / unavailable variable
    pub const NONE: VariableId = VariableId(0);
    pub const ROBOT_ID: VariableId = VariableId(1);
    pub const FIRMWARE_VERSION: VariableId = VariableId(2);
    pub const RADIO_CHANNEL: VariableId = VariableId(3);
    pub const BATTERY_VOLTAGE: VariableId = VariableId(4);
    pub const KICKER_TEMPERATURE: VariableId = VariableId(5);
    pub const KICKER_CAPACITOR_VOLTAGE: VariableId = VariableId(6);
    pub const KICKER_CHARGE_TARGET: VariableId = VariableId(7);
    pub const DRIBBLER_MAX_SPEED: VariableId = VariableId(8);
    pub const SPEED_KP: VariableId = VariableId(9);
    pub const SPEED_KI: VariableId = VariableId(10);
    pub const SPEED_KD: VariableId = VariableId(11);
    pub const MOTOR_CURRENT_LIMIT: VariableId = VariableId(12);
    pub const ODOMETRY_RESET: VariableId = VariableId(13);
    pub const STATUS_INTERVAL_MS: VariableId = VariableId(14);

    /// Whether this is the empty-slot marker
    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    /// Human readable name for well-known identifiers
    pub fn name(self) -> Option<&'static str> {
        let name = match self {
            Self::NONE => "NONE",
            Self::ROBOT_ID => "ROBOT_ID",
            Self::FIRMWARE_VERSION => "FIRMWARE_VERSION",
            Self::RADIO_CHANNEL => "RADIO_CHANNEL",
            Self::BATTERY_VOLTAGE => "BATTERY_VOLTAGE",
            Self::KICKER_TEMPERATURE => "KICKER_TEMPERATURE",
            Self::KICKER_CAPACITOR_VOLTAGE => "KICKER_CAPACITOR_VOLTAGE",
            Self::KICKER_CHARGE_TARGET => "KICKER_CHARGE_TARGET",
            Self::DRIBBLER_MAX_SPEED => "DRIBBLER_MAX_SPEED",
            Self::SPEED_KP => "SPEED_KP",
            Self::SPEED_KI => "SPEED_KI",
            Self::SPEED_KD => "SPEED_KD",
            Self::MOTOR_CURRENT_LIMIT => "MOTOR_CURRENT_LIMIT",
            Self::ODOMETRY_RESET => "ODOMETRY_RESET",
            Self::STATUS_INTERVAL_MS => "STATUS_INTERVAL_MS",
            _ => return None,
        };
        Some(name)
    }
}

impl Default for VariableId {
    fn default() -> Self {
        Self::NONE
    }
}

impl From<u8> for VariableId {
    fn from(raw: u8) -> Self {
        VariableId(raw)
    }
}

impl fmt::Display for VariableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "VAR_{}", self.0),
        }
    }
}
