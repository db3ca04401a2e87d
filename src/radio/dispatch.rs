//! # Message Dispatcher
//!
//! Decodes incoming radio payloads and routes each message to the matching
//! method of a registered [`MessageHandler`]. Nothing received, unknown
//! tags, and a missing handler are all ordinary outcomes, never errors.

use tracing::debug;

use super::decoder::decode_message;
use super::protocol::*;

/// Where a message came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Addressed directly from the base station
    Base,
    /// Broadcast from the base station to every robot
    Broadcast,
    /// Sent by a robot (as seen from the base station)
    Robot(RobotId),
}

/// Receiver of decoded messages, one method per message kind
///
/// Every method defaults to doing nothing, so implementors only override
/// the kinds they care about.
#[allow(unused_variables)]
pub trait MessageHandler {
    fn on_command(&mut self, origin: Origin, command: Command) {}

    fn on_config_message(&mut self, origin: Origin, message: ConfigMessage) {}

    fn on_multi_config_message(&mut self, origin: Origin, message: MultiConfigMessage) {}

    fn on_status_high_freq(&mut self, origin: Origin, status: StatusHighFreq) {}

    fn on_status_low_freq(&mut self, origin: Origin, status: StatusLowFreq) {}

    fn on_imu_readings(&mut self, origin: Origin, readings: ImuReadings) {}

    fn on_odometry_reading(&mut self, origin: Origin, reading: OdometryReading) {}

    fn on_override_odometry(&mut self, origin: Origin, over: OverrideOdometry) {}
}

/// Routes decoded messages to a registered handler
#[derive(Default)]
pub struct Dispatcher {
    handler: Option<Box<dyn MessageHandler>>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("has_handler", &self.has_handler())
            .finish()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler, replacing any previous one
    pub fn register<H: MessageHandler + 'static>(&mut self, handler: H) {
        self.handler = Some(Box::new(handler));
    }

    /// Remove the registered handler
    pub fn unregister(&mut self) {
        self.handler = None;
    }

    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    /// Decode and dispatch a raw radio payload
    ///
    /// # Arguments
    ///
    /// * `origin` - Sender of the payload
    /// * `bytes` - Raw radio payload
    ///
    /// # Returns
    ///
    /// * `bool` - Whether a known message was handled. `None` and decode
    ///   failures both yield `false`.
    pub fn on_receive(&mut self, origin: Origin, bytes: &[u8]) -> bool {
        match decode_message(bytes) {
            Ok(message) => self.dispatch(origin, message),
            Err(e) => {
                debug!("Dropping radio payload from {:?}: {}", origin, e);
                false
            }
        }
    }

    /// Dispatch an already decoded message
    ///
    /// Returns `true` for every known message kind, even when no handler is
    /// registered; `NoOp` is handled by doing nothing.
    pub fn dispatch(&mut self, origin: Origin, message: Message) -> bool {
        let handler = self.handler.as_deref_mut();

        match message {
            Message::None => return false,
            Message::NoOp => {}
            Message::Command(c) => {
                if let Some(h) = handler {
                    h.on_command(origin, c);
                }
            }
            Message::ConfigMessage(cm) => {
                if let Some(h) = handler {
                    h.on_config_message(origin, cm);
                }
            }
            Message::MultiConfigMessage(mcm) => {
                if let Some(h) = handler {
                    h.on_multi_config_message(origin, mcm);
                }
            }
            Message::StatusHighFreq(s) => {
                if let Some(h) = handler {
                    h.on_status_high_freq(origin, s);
                }
            }
            Message::StatusLowFreq(s) => {
                if let Some(h) = handler {
                    h.on_status_low_freq(origin, s);
                }
            }
            Message::ImuReadings(ir) => {
                if let Some(h) = handler {
                    h.on_imu_readings(origin, ir);
                }
            }
            Message::OdometryReading(odo) => {
                if let Some(h) = handler {
                    h.on_odometry_reading(origin, odo);
                }
            }
            Message::OverrideOdometry(over) => {
                if let Some(h) = handler {
                    h.on_override_odometry(origin, over);
                }
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::radio::encoder::encode_message;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Recorder {
        calls: Rc<RefCell<Vec<(Origin, MessageType)>>>,
    }

    impl MessageHandler for Recorder {
        fn on_command(&mut self, origin: Origin, _command: Command) {
            self.calls.borrow_mut().push((origin, MessageType::Command));
        }

        fn on_status_high_freq(&mut self, origin: Origin, _status: StatusHighFreq) {
            self.calls.borrow_mut().push((origin, MessageType::StatusHighFreq));
        }
    }

    fn dispatcher_with_recorder() -> (Dispatcher, Rc<RefCell<Vec<(Origin, MessageType)>>>) {
        let recorder = Recorder::default();
        let calls = recorder.calls.clone();
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(recorder);
        (dispatcher, calls)
    }

    #[test]
    fn test_dispatch_invokes_matching_method() {
        let (mut dispatcher, calls) = dispatcher_with_recorder();
        let frame = encode_message(&Command::default().into());

        assert!(dispatcher.on_receive(Origin::Base, &frame));
        assert_eq!(*calls.borrow(), vec![(Origin::Base, MessageType::Command)]);
    }

    #[test]
    fn test_dispatch_passes_origin() {
        let (mut dispatcher, calls) = dispatcher_with_recorder();
        let frame = encode_message(&StatusHighFreq::default().into());

        assert!(dispatcher.on_receive(Origin::Robot(7), &frame));
        assert_eq!(calls.borrow()[0], (Origin::Robot(7), MessageType::StatusHighFreq));
    }

    #[test]
    fn test_none_is_not_handled() {
        let (mut dispatcher, calls) = dispatcher_with_recorder();
        assert!(!dispatcher.on_receive(Origin::Base, &[0u8; MAX_MESSAGE_SIZE]));
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn test_unknown_type_is_not_handled() {
        let (mut dispatcher, calls) = dispatcher_with_recorder();
        let mut frame = [0u8; MAX_MESSAGE_SIZE];
        frame[0] = 0xC8;

        assert!(!dispatcher.on_receive(Origin::Base, &frame));
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn test_known_message_without_override_is_handled() {
        let (mut dispatcher, calls) = dispatcher_with_recorder();
        let frame = encode_message(&ImuReadings::default().into());

        // Recorder does not override on_imu_readings, default no-op runs
        assert!(dispatcher.on_receive(Origin::Base, &frame));
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn test_no_handler_registered() {
        let mut dispatcher = Dispatcher::new();
        assert!(!dispatcher.has_handler());

        let frame = encode_message(&Command::default().into());
        assert!(dispatcher.on_receive(Origin::Base, &frame));
    }

    #[test]
    fn test_noop_is_handled_without_callback() {
        let (mut dispatcher, calls) = dispatcher_with_recorder();
        assert!(dispatcher.dispatch(Origin::Broadcast, Message::NoOp));
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn test_unregister() {
        let (mut dispatcher, _calls) = dispatcher_with_recorder();
        assert!(dispatcher.has_handler());
        dispatcher.unregister();
        assert!(!dispatcher.has_handler());
    }
}
