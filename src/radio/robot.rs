//! # Robot Link Endpoint
//!
//! The constrained end of the link. A robot never initiates a transmission:
//! everything it sends rides on the acknowledgement of a frame the base
//! station sent to it.
//!
//! ```text
//! pipe 1  <- BASE_TO_ROBOT_ADDRESS + id   (auto-ack, ack payload = telemetry)
//! pipe 2  <- BROADCAST_ADDRESS            (no auto-ack)
//! writing -> ROBOT_TO_BASE_ADDRESS + id
//! ```

use tracing::{debug, info};

use super::address::{base_to_robot_address, robot_to_base_address};
use super::decoder::decode_message;
use super::dispatch::{Dispatcher, MessageHandler, Origin};
use super::encoder::{encode_message, Frame};
use super::protocol::{Message, RobotId, BROADCAST_ADDRESS, MAX_CHANNEL, MAX_MESSAGE_SIZE};
use super::queue::OutboundQueue;
use super::transport::{PowerLevel, RadioTransport};
use crate::config_sync::protocol::{respond_multi, respond_single};
use crate::config_sync::registry::VariableRegistry;
use crate::error::{Result, RobotLinkError};

/// Pipe carrying frames addressed to this robot
pub const ROBOT_PIPE: u8 = 1;

/// Pipe carrying broadcast frames
pub const BROADCAST_PIPE: u8 = 2;

/// Robot end of the radio link
pub struct RobotLink<T: RadioTransport> {
    transport: T,
    identity: RobotId,
    registry: VariableRegistry,
    dispatcher: Dispatcher,
    tx: OutboundQueue,
    frames_received: u64,
}

impl<T: RadioTransport> std::fmt::Debug for RobotLink<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RobotLink")
            .field("identity", &self.identity)
            .field("registry", &self.registry)
            .field("frames_received", &self.frames_received)
            .finish()
    }
}

impl<T: RadioTransport> RobotLink<T> {
    pub fn new(transport: T, identity: RobotId) -> Self {
        Self {
            transport,
            identity,
            registry: VariableRegistry::new(),
            dispatcher: Dispatcher::new(),
            tx: OutboundQueue::new(),
            frames_received: 0,
        }
    }

    /// Bring up the transceiver and open the robot's pipes
    ///
    /// # Arguments
    ///
    /// * `channel` - RF channel shared with the base station
    /// * `power` - Transmit power
    ///
    /// # Errors
    ///
    /// Returns error if the channel is out of range or the chip does not respond
    pub fn init(&mut self, channel: u8, power: PowerLevel) -> Result<()> {
        if channel > MAX_CHANNEL {
            return Err(RobotLinkError::Transport(format!(
                "Channel {} out of range 0..={}",
                channel, MAX_CHANNEL
            )));
        }
        if !self.transport.begin() {
            return Err(RobotLinkError::Transport(format!(
                "Radio of robot {} did not respond",
                self.identity
            )));
        }

        self.transport.set_channel(channel);
        self.transport.set_power_level(power);
        self.transport.open_reading_pipe(ROBOT_PIPE, base_to_robot_address(self.identity));
        self.transport.open_reading_pipe(BROADCAST_PIPE, BROADCAST_ADDRESS);
        self.transport.set_auto_ack(BROADCAST_PIPE, false);
        self.transport.open_writing_pipe(robot_to_base_address(self.identity));

        info!("Robot {} listening on channel {}", self.identity, channel);
        Ok(())
    }

    pub fn identity(&self) -> RobotId {
        self.identity
    }

    /// Variables this robot exposes to config requests
    pub fn registry_mut(&mut self) -> &mut VariableRegistry {
        &mut self.registry
    }

    /// Register the application handler for received messages
    pub fn register_handler<H: MessageHandler + 'static>(&mut self, handler: H) {
        self.dispatcher.register(handler);
    }

    /// Queue a message ahead of the cyclic telemetry
    pub fn send(&mut self, message: Message) {
        self.tx.push(message);
    }

    /// Update a slot of the cyclic telemetry buffer
    ///
    /// The slot is only transmitted from `run()`, on the next acknowledgement.
    pub fn write_tx_buffer(&mut self, index: usize, message: Message) {
        self.tx.write_slot(index, message);
    }

    pub fn frames_received(&self) -> u64 {
        self.frames_received
    }

    /// Process at most one received frame
    ///
    /// Config requests are answered through the registry before the message
    /// reaches the handler. After a receive, the next outbound message is
    /// loaded as the acknowledgement payload of the robot pipe.
    ///
    /// # Returns
    ///
    /// * `bool` - Whether a known message was received and handled
    pub fn run(&mut self) -> bool {
        let Some(pipe) = self.transport.available() else {
            return false;
        };

        let mut frame: Frame = [0u8; MAX_MESSAGE_SIZE];
        self.transport.read(&mut frame);
        self.frames_received += 1;

        let origin = if pipe == BROADCAST_PIPE { Origin::Broadcast } else { Origin::Base };
        let handled = match decode_message(&frame) {
            Ok(message) => {
                self.answer_config(message);
                self.dispatcher.dispatch(origin, message)
            }
            Err(e) => {
                debug!("Robot {} dropping frame on pipe {}: {}", self.identity, pipe, e);
                false
            }
        };

        self.load_ack_payload();
        handled
    }

    fn answer_config(&mut self, message: Message) {
        let reply = match message {
            Message::MultiConfigMessage(request) => respond_multi(&mut self.registry, request).map(Message::from),
            Message::ConfigMessage(request) => respond_single(&mut self.registry, request).map(Message::from),
            _ => None,
        };
        if let Some(reply) = reply {
            self.tx.push(reply);
        }
    }

    fn load_ack_payload(&mut self) {
        let Some(message) = self.tx.next() else {
            return;
        };
        if !self.transport.write_ack_payload(ROBOT_PIPE, &encode_message(&message)) {
            debug!("Robot {} ack FIFO full, dropping {:?}", self.identity, message.message_type());
        }
    }
}
