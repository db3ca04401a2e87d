//! # Radio Link Module
//!
//! Message envelope, addressing and endpoints of the base station ↔ robot
//! radio link.

pub mod address;
pub mod base;
pub mod decoder;
pub mod dispatch;
pub mod encoder;
pub mod protocol;
pub mod queue;
pub mod robot;
pub mod transport;

pub use base::{BaseRadio, BaseStation, Information};
pub use decoder::decode_message;
pub use dispatch::{Dispatcher, MessageHandler, Origin};
pub use encoder::{encode_message, Frame};
pub use protocol::{Message, MessageType, RobotId};
pub use robot::RobotLink;
pub use transport::{Ether, LoopbackRadio, PowerLevel, RadioTransport};
