//! # Radio Message Decoder
//!
//! Decodes 32-byte radio payloads into messages.

use bytes::Buf;

use super::protocol::*;
use crate::error::Result;
use crate::variable::VariableId;

/// Decode a radio payload
///
/// The payload interpretation is selected solely by the type tag in byte 0.
/// Input shorter than a full frame is treated as zero-padded, bytes past
/// `MAX_MESSAGE_SIZE` are ignored, and an empty buffer reads as
/// `Message::None`.
///
/// # Arguments
///
/// * `bytes` - Raw radio payload
///
/// # Returns
///
/// * `Result<Message>` - Decoded message
///
/// # Errors
///
/// Returns `UnknownMessageType` if the tag has no known mapping (including
/// retired tags). Callers treat this as "no actionable message".
pub fn decode_message(bytes: &[u8]) -> Result<Message> {
    let mut frame = [0u8; MAX_MESSAGE_SIZE];
    let len = bytes.len().min(MAX_MESSAGE_SIZE);
    frame[..len].copy_from_slice(&bytes[..len]);

    let message_type = MessageType::try_from(frame[0])?;
    let mut buf = &frame[MESSAGE_TYPE_SIZE..];

    let message = match message_type {
        MessageType::None => Message::None,
        MessageType::NoOp => Message::NoOp,
        MessageType::Command => Message::Command(get_command(&mut buf)),
        MessageType::ConfigMessage => Message::ConfigMessage(get_config_message(&mut buf)),
        MessageType::MultiConfigMessage => Message::MultiConfigMessage(get_multi_config(&mut buf)),
        MessageType::StatusHighFreq => Message::StatusHighFreq(get_status_high_freq(&mut buf)),
        MessageType::StatusLowFreq => Message::StatusLowFreq(get_status_low_freq(&mut buf)),
        MessageType::ImuReadings => Message::ImuReadings(get_imu_readings(&mut buf)),
        MessageType::OdometryReading => Message::OdometryReading(OdometryReading {
            position: get_pose(&mut buf),
            speed: get_pose(&mut buf),
        }),
        MessageType::OverrideOdometry => Message::OverrideOdometry(OverrideOdometry {
            position: get_pose(&mut buf),
        }),
    };

    Ok(message)
}

fn get_pose<B: Buf>(buf: &mut B) -> Pose {
    Pose {
        x: buf.get_f32_le(),
        y: buf.get_f32_le(),
        z: buf.get_f32_le(),
    }
}

fn get_command<B: Buf>(buf: &mut B) -> Command {
    Command {
        speed: get_pose(buf),
        dribbler_speed: buf.get_f32_le(),
        kick_speed: buf.get_f32_le(),
        kick_type: KickType::from_wire(buf.get_u8()),
    }
}

fn get_config_message<B: Buf>(buf: &mut B) -> ConfigMessage {
    ConfigMessage {
        operation: ConfigOperation::from_wire(buf.get_u8()),
        variable: VariableId(buf.get_u8()),
        value: buf.get_u32_le(),
    }
}

fn get_multi_config<B: Buf>(buf: &mut B) -> MultiConfigMessage {
    let operation = ConfigOperation::from_wire(buf.get_u8());

    let mut variables = [VariableId::NONE; CONFIG_SLOTS];
    for variable in variables.iter_mut() {
        *variable = VariableId(buf.get_u8());
    }

    let mut values = [0u32; CONFIG_SLOTS];
    for value in values.iter_mut() {
        *value = buf.get_u32_le();
    }

    MultiConfigMessage { operation, variables, values }
}

fn get_status_high_freq<B: Buf>(buf: &mut B) -> StatusHighFreq {
    let status = Status::from_wire(buf.get_u8());

    let mut motor_status = [Status::NoReply; NUM_MOTORS];
    for motor in motor_status.iter_mut() {
        *motor = Status::from_wire(buf.get_u8());
    }

    StatusHighFreq {
        status,
        motor_status,
        speed: get_pose(buf),
    }
}

fn get_status_low_freq<B: Buf>(buf: &mut B) -> StatusLowFreq {
    let battery_voltage = buf.get_f32_le();
    let kicker = KickerStatus {
        status: Status::from_wire(buf.get_u8()),
        temperature: buf.get_i8(),
        capacitor_voltage: buf.get_u8(),
    };

    let mut motor_temperature = [0i8; NUM_MOTORS];
    for temperature in motor_temperature.iter_mut() {
        *temperature = buf.get_i8();
    }

    StatusLowFreq {
        battery_voltage,
        kicker,
        motor_temperature,
    }
}

fn get_imu_readings<B: Buf>(buf: &mut B) -> ImuReadings {
    let mut readings = ImuReadings::default();
    for value in readings.acceleration.iter_mut() {
        *value = buf.get_f32_le();
    }
    for value in readings.rate_of_turn.iter_mut() {
        *value = buf.get_f32_le();
    }
    readings
}
