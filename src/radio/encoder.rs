//! # Radio Message Encoder
//!
//! Encodes messages into fixed 32-byte radio payloads.

use bytes::BufMut;

use super::protocol::*;

/// Radio payload buffer
pub type Frame = [u8; MAX_MESSAGE_SIZE];

/// Encode a message into a complete radio payload
///
/// The type tag goes in byte 0, followed by the little-endian payload.
/// Unused trailing bytes are always zero so no stale buffer content leaks
/// onto the air.
///
/// # Arguments
///
/// * `message` - Message to encode
///
/// # Returns
///
/// * `Frame` - 32-byte radio payload
///
/// # Examples
///
/// ```
/// use robot_link::radio::encoder::encode_message;
/// use robot_link::radio::protocol::{Message, MessageType};
///
/// let frame = encode_message(&Message::NoOp);
/// assert_eq!(frame[0], MessageType::NoOp.as_u8());
/// assert!(frame[1..].iter().all(|&b| b == 0));
/// ```
pub fn encode_message(message: &Message) -> Frame {
    let mut frame = [0u8; MAX_MESSAGE_SIZE];
    let mut buf = &mut frame[..];
    put_message(&mut buf, message);
    frame
}

/// Tag and payload, written in place
fn put_message<B: BufMut>(buf: &mut B, message: &Message) {
    buf.put_u8(message.message_type().as_u8());

    match message {
        Message::None | Message::NoOp => {}
        Message::Command(c) => put_command(buf, c),
        Message::ConfigMessage(cm) => put_config_message(buf, cm),
        Message::MultiConfigMessage(mcm) => put_multi_config(buf, mcm),
        Message::StatusHighFreq(s) => put_status_high_freq(buf, s),
        Message::StatusLowFreq(s) => put_status_low_freq(buf, s),
        Message::ImuReadings(ir) => put_imu_readings(buf, ir),
        Message::OdometryReading(odo) => {
            put_pose(buf, &odo.position);
            put_pose(buf, &odo.speed);
        }
        Message::OverrideOdometry(over) => put_pose(buf, &over.position),
    }
}

/// Number of meaningful bytes in an encoded message (tag + payload)
pub fn encoded_size(message: &Message) -> usize {
    MESSAGE_TYPE_SIZE + message.message_type().payload_size()
}

fn put_pose<B: BufMut>(buf: &mut B, pose: &Pose) {
    buf.put_f32_le(pose.x);
    buf.put_f32_le(pose.y);
    buf.put_f32_le(pose.z);
}

fn put_command<B: BufMut>(buf: &mut B, command: &Command) {
    put_pose(buf, &command.speed);
    buf.put_f32_le(command.dribbler_speed);
    buf.put_f32_le(command.kick_speed);
    buf.put_u8(command.kick_type as u8);
}

fn put_config_message<B: BufMut>(buf: &mut B, cm: &ConfigMessage) {
    buf.put_u8(cm.operation as u8);
    buf.put_u8(cm.variable.0);
    buf.put_u32_le(cm.value);
}

fn put_multi_config<B: BufMut>(buf: &mut B, mcm: &MultiConfigMessage) {
    buf.put_u8(mcm.operation as u8);
    for variable in &mcm.variables {
        buf.put_u8(variable.0);
    }
    for value in &mcm.values {
        buf.put_u32_le(*value);
    }
}

fn put_status_high_freq<B: BufMut>(buf: &mut B, status: &StatusHighFreq) {
    buf.put_u8(status.status as u8);
    for motor in &status.motor_status {
        buf.put_u8(*motor as u8);
    }
    put_pose(buf, &status.speed);
}

fn put_status_low_freq<B: BufMut>(buf: &mut B, status: &StatusLowFreq) {
    buf.put_f32_le(status.battery_voltage);
    buf.put_u8(status.kicker.status as u8);
    buf.put_i8(status.kicker.temperature);
    buf.put_u8(status.kicker.capacitor_voltage);
    for temperature in &status.motor_temperature {
        buf.put_i8(*temperature);
    }
}

fn put_imu_readings<B: BufMut>(buf: &mut B, readings: &ImuReadings) {
    for value in readings.acceleration.iter().chain(readings.rate_of_turn.iter()) {
        buf.put_f32_le(*value);
    }
}
