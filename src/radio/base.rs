//! # Base Station Endpoint
//!
//! The base station owns up to [`NUMBER_OF_RADIOS`] radio front-ends. Robots
//! are spread over the front-ends that are actually online (see
//! [`AddressSpace`]); each front-end listens for its robots on pipes 1..=5
//! and receives acknowledgement payloads on pipe 0. Ack payloads are
//! collected right after the write that produced them, so they stay
//! attributed to the robot written to even if the target changes before
//! the next poll.
//!
//! ```text
//!            ┌────────────┐  pipe 1..=5 <- ROBOT_TO_BASE + robot
//!  radio 0 ──┤ BaseRadio  │  pipe 0     <- ack payload of last robot written
//!            └────────────┘  writing    -> BASE_TO_ROBOT + robot | BROADCAST
//!  radio 1 ── ...
//! ```

use serde::Serialize;
use std::collections::VecDeque;
use tracing::{debug, info, warn};

use super::address::{base_to_robot_address, robot_to_base_address, AddressSpace};
use super::dispatch::{Dispatcher, MessageHandler, Origin};
use super::encoder::{encode_message, Frame};
use super::protocol::*;
use super::transport::{PowerLevel, RadioTransport};
use crate::error::{Result, RobotLinkError};

/// Current writing target of a front-end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxTarget {
    Robot(RobotId),
    Broadcast,
}

/// One radio front-end of the base station
#[derive(Debug)]
pub struct BaseRadio<T: RadioTransport> {
    transport: T,
    radio_index: u8,
    space: Option<AddressSpace>,
    rx_target: Option<RxTarget>,
    /// Frames drained after a write, already attributed to their sender
    received: VecDeque<(RobotId, Frame)>,
}

impl<T: RadioTransport> BaseRadio<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            radio_index: 0,
            space: None,
            rx_target: None,
            received: VecDeque::new(),
        }
    }

    /// Power up the front-end, returns whether the chip responds
    pub fn init(&mut self, channel: u8, power: PowerLevel) -> bool {
        if !self.transport.begin() {
            return false;
        }
        self.transport.set_channel(channel);
        self.transport.set_power_level(power);
        true
    }

    /// Serve the robots of `radio_index` within `space`
    ///
    /// Reopens every reading pipe; any previous writing target is forgotten.
    pub fn assign(&mut self, radio_index: u8, space: AddressSpace) -> Result<()> {
        for pipe in 1..=MAX_PIPES {
            let robot = space.robot_id(pipe, radio_index)?;
            self.transport.open_reading_pipe(pipe, robot_to_base_address(robot));
        }
        self.radio_index = radio_index;
        self.space = Some(space);
        self.rx_target = None;
        Ok(())
    }

    pub fn radio_index(&self) -> u8 {
        self.radio_index
    }

    pub fn rx_target(&self) -> Option<RxTarget> {
        self.rx_target
    }

    /// Point the writing pipe at `robot`
    ///
    /// Pipe 0 follows the same address so the robot's acknowledgement
    /// payloads land there.
    pub fn set_rx_robot(&mut self, robot: RobotId) {
        if self.rx_target == Some(RxTarget::Robot(robot)) {
            return;
        }
        let address = base_to_robot_address(robot);
        self.transport.open_writing_pipe(address);
        self.transport.open_reading_pipe(0, address);
        self.rx_target = Some(RxTarget::Robot(robot));
    }

    /// Point the writing pipe at the broadcast address
    pub fn set_rx_broadcast(&mut self) {
        if self.rx_target == Some(RxTarget::Broadcast) {
            return;
        }
        self.transport.open_writing_pipe(BROADCAST_ADDRESS);
        self.rx_target = Some(RxTarget::Broadcast);
    }

    /// Robot whose messages arrive on `pipe`
    ///
    /// Pipe 0 is attributed to the robot last written to.
    pub fn robot_for_pipe(&self, pipe: u8) -> Option<RobotId> {
        if pipe == 0 {
            return match self.rx_target {
                Some(RxTarget::Robot(robot)) => Some(robot),
                _ => None,
            };
        }
        self.space?.robot_id(pipe, self.radio_index).ok()
    }

    /// Pipe serving `robot`, `None` if it belongs to another front-end
    pub fn pipe_for_robot(&self, robot: RobotId) -> Option<u8> {
        let space = self.space?;
        if space.radio_index(robot).ok()? != self.radio_index {
            return None;
        }
        space.pipe(robot).ok()
    }

    /// Send a message to one of this front-end's robots
    ///
    /// # Returns
    ///
    /// * `bool` - Whether the frame was delivered
    pub fn send_to(&mut self, robot: RobotId, message: &Message) -> bool {
        if self.pipe_for_robot(robot).is_none() {
            debug!("Robot {} is not served by radio {}", robot, self.radio_index);
            return false;
        }
        self.set_rx_robot(robot);
        let delivered = self.transport.write(&encode_message(message));
        self.collect_received();
        delivered
    }

    /// Send a message to every robot listening on the broadcast address
    pub fn broadcast(&mut self, message: &Message) -> bool {
        self.set_rx_broadcast();
        self.transport.write(&encode_message(message))
    }

    /// Pop one received frame together with its sender
    ///
    /// Frames collected after earlier writes come first. Frames that cannot
    /// be attributed to a robot are consumed and dropped.
    pub fn receive(&mut self) -> Option<(RobotId, Frame)> {
        if let Some(received) = self.received.pop_front() {
            return Some(received);
        }
        self.read_attributed()
    }

    /// Move everything the transport holds into `received` while pipe 0
    /// still points at the robot just written to
    fn collect_received(&mut self) {
        while self.transport.available().is_some() {
            if let Some(received) = self.read_attributed() {
                self.received.push_back(received);
            }
        }
    }

    fn read_attributed(&mut self) -> Option<(RobotId, Frame)> {
        let pipe = self.transport.available()?;
        let mut frame: Frame = [0u8; MAX_MESSAGE_SIZE];
        self.transport.read(&mut frame);

        match self.robot_for_pipe(pipe) {
            Some(robot) => Some((robot, frame)),
            None => {
                debug!("Radio {} dropping unattributed frame on pipe {}", self.radio_index, pipe);
                None
            }
        }
    }
}

/// Snapshot of the base station state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Information {
    pub version: ProtocolVersion,
    pub num_radios: u8,
    pub max_robots: u8,
    /// Bit `i` set when provisioned radio `i` is online
    pub radios_online: u8,
    pub channel: u8,
}

/// The base station: all radio front-ends plus message dispatch
pub struct BaseStation<T: RadioTransport> {
    radios: Vec<BaseRadio<T>>,
    /// Provisioned slots online, position is the radio index
    online: Vec<usize>,
    space: Option<AddressSpace>,
    channel: u8,
    max_robots: u8,
    dispatcher: Dispatcher,
    cursor: usize,
}

impl<T: RadioTransport> std::fmt::Debug for BaseStation<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BaseStation")
            .field("online", &self.online)
            .field("space", &self.space)
            .field("channel", &self.channel)
            .field("max_robots", &self.max_robots)
            .finish()
    }
}

impl<T: RadioTransport> BaseStation<T> {
    /// Create a base station over the provisioned front-ends
    ///
    /// # Arguments
    ///
    /// * `transports` - One transport per provisioned radio, in slot order
    /// * `channel` - RF channel
    /// * `max_robots` - Robots the application expects to address
    ///
    /// # Errors
    ///
    /// Returns error if more radios than provisioned or an invalid channel is given
    pub fn new(transports: Vec<T>, channel: u8, max_robots: u8) -> Result<Self> {
        if transports.is_empty() || transports.len() > NUMBER_OF_RADIOS as usize {
            return Err(RobotLinkError::Transport(format!(
                "{} radios provisioned, must be between 1 and {}",
                transports.len(),
                NUMBER_OF_RADIOS
            )));
        }
        if channel > MAX_CHANNEL {
            return Err(RobotLinkError::Transport(format!(
                "Channel {} out of range 0..={}",
                channel, MAX_CHANNEL
            )));
        }

        Ok(Self {
            radios: transports.into_iter().map(BaseRadio::new).collect(),
            online: Vec::new(),
            space: None,
            channel,
            max_robots,
            dispatcher: Dispatcher::new(),
            cursor: 0,
        })
    }

    /// Probe every front-end and derive the address space
    ///
    /// # Errors
    ///
    /// Returns error if no front-end responds
    pub fn init(&mut self, power: PowerLevel) -> Result<Information> {
        let mut mask = 0u8;
        for (slot, radio) in self.radios.iter_mut().enumerate() {
            if radio.init(self.channel, power) {
                mask |= 1 << slot;
            } else {
                warn!("Radio {} did not respond", slot);
            }
        }

        self.set_radios_online(mask)?;
        Ok(self.information())
    }

    /// Re-derive the address space for a new set of online radios
    ///
    /// Online radios get contiguous indices in slot order. Every pipe
    /// address is recomputed.
    pub fn set_radios_online(&mut self, mask: u8) -> Result<()> {
        let online: Vec<usize> = (0..self.radios.len()).filter(|slot| mask & (1 << slot) != 0).collect();
        let space = AddressSpace::new(online.len() as u8).map_err(|e| {
            RobotLinkError::Transport(format!("No usable radio online (mask 0b{:04b}): {}", mask, e))
        })?;

        for (index, &slot) in online.iter().enumerate() {
            self.radios[slot].assign(index as u8, space)?;
        }

        if self.max_robots > space.max_robots() {
            warn!(
                "{} robots configured but only {} addressable with {} radios online",
                self.max_robots,
                space.max_robots(),
                space.num_radios_online()
            );
        }

        self.online = online;
        self.space = Some(space);
        self.cursor = 0;

        info!(
            "Base station: {} radios online (0b{:04b}), {} robots addressable",
            space.num_radios_online(),
            mask,
            self.max_robots()
        );
        Ok(())
    }

    /// Bitfield of the online radios
    pub fn radios_online(&self) -> u8 {
        self.online.iter().fold(0, |mask, &slot| mask | (1 << slot))
    }

    /// Robots addressable now, bounded by the configured maximum
    pub fn max_robots(&self) -> u8 {
        self.space.map_or(0, |space| space.max_robots().min(self.max_robots))
    }

    pub fn information(&self) -> Information {
        Information {
            version: PROTOCOL_VERSION,
            num_radios: self.online.len() as u8,
            max_robots: self.max_robots(),
            radios_online: self.radios_online(),
            channel: self.channel,
        }
    }

    /// Register the application handler for messages from robots
    pub fn register_handler<H: MessageHandler + 'static>(&mut self, handler: H) {
        self.dispatcher.register(handler);
    }

    /// Send a message to one robot through the front-end serving it
    ///
    /// # Returns
    ///
    /// * `Ok(bool)` - Whether the frame was delivered
    ///
    /// # Errors
    ///
    /// Returns error if the robot is outside the address space
    pub fn send_to(&mut self, robot: RobotId, message: &Message) -> Result<bool> {
        let space = self.space.ok_or_else(|| RobotLinkError::Transport("Base station not initialised".to_string()))?;
        if robot >= self.max_robots() {
            return Err(RobotLinkError::Address(format!(
                "Robot {} out of range, {} robots addressable",
                robot,
                self.max_robots()
            )));
        }

        let index = space.radio_index(robot)? as usize;
        let slot = self.online[index];
        Ok(self.radios[slot].send_to(robot, message))
    }

    /// Broadcast a message on every online front-end
    ///
    /// Returns whether any front-end delivered it.
    pub fn broadcast(&mut self, message: &Message) -> bool {
        let mut delivered = false;
        for &slot in &self.online {
            delivered |= self.radios[slot].broadcast(message);
        }
        delivered
    }

    /// Receive and dispatch at most one message
    ///
    /// Front-ends are polled in a fixed rotation starting after the one that
    /// produced the previous message.
    ///
    /// # Returns
    ///
    /// * `bool` - Whether a known message was received and handled
    pub fn run(&mut self) -> bool {
        let count = self.online.len();
        for step in 0..count {
            let index = (self.cursor + step) % count;
            let slot = self.online[index];
            if let Some((robot, frame)) = self.radios[slot].receive() {
                self.cursor = (index + 1) % count;
                return self.dispatcher.on_receive(Origin::Robot(robot), &frame);
            }
        }
        false
    }

    /// Front-end serving `robot`
    pub fn radio_for_robot(&self, robot: RobotId) -> Option<&BaseRadio<T>> {
        let index = self.space?.radio_index(robot).ok()? as usize;
        self.online.get(index).map(|&slot| &self.radios[slot])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::radio::robot::RobotLink;
    use crate::radio::transport::{Ether, LoopbackRadio, MockRadioTransport};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default, Clone)]
    struct Inbox(Rc<RefCell<Vec<(Origin, Message)>>>);

    impl MessageHandler for Inbox {
        fn on_status_high_freq(&mut self, origin: Origin, status: StatusHighFreq) {
            self.0.borrow_mut().push((origin, status.into()));
        }

        fn on_status_low_freq(&mut self, origin: Origin, status: StatusLowFreq) {
            self.0.borrow_mut().push((origin, status.into()));
        }

        fn on_multi_config_message(&mut self, origin: Origin, message: MultiConfigMessage) {
            self.0.borrow_mut().push((origin, message.into()));
        }

        fn on_command(&mut self, origin: Origin, command: Command) {
            self.0.borrow_mut().push((origin, command.into()));
        }
    }

    fn quiet_mock() -> MockRadioTransport {
        let mut mock = MockRadioTransport::new();
        mock.expect_begin().return_const(true);
        mock.expect_set_channel().return_const(());
        mock.expect_set_power_level().return_const(());
        mock.expect_open_reading_pipe().return_const(());
        mock.expect_open_writing_pipe().return_const(());
        mock
    }

    fn station(ether: &Ether, radios: usize, max_robots: u8) -> BaseStation<LoopbackRadio> {
        let transports = (0..radios).map(|_| ether.radio()).collect();
        let mut base = BaseStation::new(transports, 76, max_robots).unwrap();
        base.init(PowerLevel::Min).unwrap();
        base
    }

    fn robot(ether: &Ether, id: RobotId) -> RobotLink<LoopbackRadio> {
        let mut link = RobotLink::new(ether.radio(), id);
        link.init(76, PowerLevel::Min).unwrap();
        link
    }

    #[test]
    fn test_base_radio_pipe_mapping() {
        let mut radio = BaseRadio::new(quiet_mock());
        let space = AddressSpace::new(4).unwrap();
        radio.assign(0, space).unwrap();

        assert_eq!(radio.pipe_for_robot(12), Some(4));
        assert_eq!(radio.robot_for_pipe(4), Some(12));
        assert_eq!(radio.pipe_for_robot(13), None, "Robot 13 is on radio 1");
        assert_eq!(radio.robot_for_pipe(0), None, "Nobody written to yet");

        radio.set_rx_robot(8);
        assert_eq!(radio.robot_for_pipe(0), Some(8));

        radio.set_rx_broadcast();
        assert_eq!(radio.robot_for_pipe(0), None);
    }

    #[test]
    fn test_set_rx_robot_reopens_only_on_change() {
        let mut mock = MockRadioTransport::new();
        mock.expect_open_writing_pipe().times(2).return_const(());
        mock.expect_open_reading_pipe().times(2).return_const(());

        let mut radio = BaseRadio::new(mock);
        radio.set_rx_robot(1);
        radio.set_rx_robot(1);
        radio.set_rx_robot(2);
    }

    #[test]
    fn test_new_rejects_too_many_radios() {
        let transports = (0..5).map(|_| quiet_mock()).collect();
        assert!(BaseStation::new(transports, 76, 16).is_err());
        assert!(BaseStation::<MockRadioTransport>::new(Vec::new(), 76, 16).is_err());
    }

    #[test]
    fn test_init_with_missing_radio() {
        let ether = Ether::new();
        let transports = vec![ether.radio(), ether.absent_radio(), ether.radio(), ether.radio()];
        let mut base = BaseStation::new(transports, 42, 16).unwrap();

        let info = base.init(PowerLevel::High).unwrap();
        assert_eq!(info.version, PROTOCOL_VERSION);
        assert_eq!(info.num_radios, 3);
        assert_eq!(info.radios_online, 0b1101);
        assert_eq!(info.max_robots, 15);
        assert_eq!(info.channel, 42);
    }

    #[test]
    fn test_init_without_any_radio_fails() {
        let ether = Ether::new();
        let transports = vec![ether.absent_radio(), ether.absent_radio()];
        let mut base = BaseStation::new(transports, 42, 16).unwrap();
        assert!(base.init(PowerLevel::Min).is_err());
    }

    #[test]
    fn test_send_to_routes_to_serving_radio() {
        let ether = Ether::new();
        let mut base = station(&ether, 4, 16);

        assert_eq!(base.radio_for_robot(12).map(BaseRadio::radio_index), Some(0));
        assert_eq!(base.radio_for_robot(13).map(BaseRadio::radio_index), Some(1));

        let mut robot_12 = robot(&ether, 12);
        let inbox = Inbox::default();
        robot_12.register_handler(inbox.clone());

        assert!(base.send_to(12, &Command::default().into()).unwrap());
        assert!(robot_12.run());
        assert_eq!(inbox.0.borrow()[0], (Origin::Base, Message::from(Command::default())));

        // Robot 13 has no transceiver on the ether
        assert!(!base.send_to(13, &Command::default().into()).unwrap());
    }

    #[test]
    fn test_send_to_out_of_range() {
        let ether = Ether::new();
        let mut base = station(&ether, 4, 16);
        assert!(base.send_to(16, &Message::NoOp).is_err());
    }

    #[test]
    fn test_telemetry_round_trip_over_ack_payload() {
        let ether = Ether::new();
        let mut base = station(&ether, 2, 10);
        let inbox = Inbox::default();
        base.register_handler(inbox.clone());

        let mut robot_5 = robot(&ether, 5);
        let status = StatusHighFreq { status: Status::Ok, ..Default::default() };
        robot_5.write_tx_buffer(0, status.into());

        // First frame primes the ack FIFO, second one carries it back
        assert!(base.send_to(5, &Command::default().into()).unwrap());
        assert!(robot_5.run());
        assert!(!base.run());
        assert!(base.send_to(5, &Command::default().into()).unwrap());
        assert!(base.run());

        assert_eq!(*inbox.0.borrow(), vec![(Origin::Robot(5), Message::from(status))]);
    }

    #[test]
    fn test_config_read_over_the_air() {
        use crate::config_sync::registry::Access;
        use crate::variable::VariableId;
        use std::cell::Cell;

        let ether = Ether::new();
        let mut base = station(&ether, 4, 16);
        let inbox = Inbox::default();
        base.register_handler(inbox.clone());

        let mut robot_3 = robot(&ether, 3);
        robot_3
            .registry_mut()
            .register(VariableId::KICKER_TEMPERATURE, Access::Read, 0u8, Rc::new(Cell::new(37u8)))
            .unwrap();

        let request = MultiConfigMessage::read(&[VariableId::KICKER_TEMPERATURE]).unwrap();
        assert!(base.send_to(3, &request.into()).unwrap());
        assert!(robot_3.run());
        assert!(base.send_to(3, &Message::NoOp).unwrap());
        assert!(robot_3.run());
        assert!(base.run());

        let inbox = inbox.0.borrow();
        match inbox[0] {
            (Origin::Robot(3), Message::MultiConfigMessage(reply)) => {
                assert_eq!(reply.operation, ConfigOperation::ReadReturn);
                assert_eq!(reply.values[0], 37);
            }
            ref other => panic!("Unexpected {:?}", other),
        }
    }

    #[test]
    fn test_ack_payload_keeps_sender_after_retarget() {
        let ether = Ether::new();
        let mut base = station(&ether, 1, 5);
        let inbox = Inbox::default();
        base.register_handler(inbox.clone());

        let mut robot_0 = robot(&ether, 0);
        let mut robot_1 = robot(&ether, 1);
        let low_battery = StatusLowFreq { battery_voltage: 10.0, ..Default::default() };
        let full_battery = StatusLowFreq { battery_voltage: 16.0, ..Default::default() };
        robot_0.write_tx_buffer(0, low_battery.into());
        robot_1.write_tx_buffer(0, full_battery.into());

        // Load both ack FIFOs
        assert!(base.send_to(0, &Message::NoOp).unwrap());
        assert!(robot_0.run());
        assert!(base.send_to(1, &Message::NoOp).unwrap());
        assert!(robot_1.run());

        // Both acks arrive before the base polls, pipe 0 now points at robot 1
        assert!(base.send_to(0, &Message::NoOp).unwrap());
        assert!(base.send_to(1, &Message::NoOp).unwrap());
        assert!(base.run());
        assert!(base.run());
        assert!(!base.run());

        assert_eq!(
            *inbox.0.borrow(),
            vec![
                (Origin::Robot(0), Message::from(low_battery)),
                (Origin::Robot(1), Message::from(full_battery)),
            ]
        );
    }

    #[test]
    fn test_broadcast_reaches_every_robot() {
        let ether = Ether::new();
        let mut base = station(&ether, 2, 10);
        let mut robots: Vec<_> = (0..4).map(|id| robot(&ether, id)).collect();
        let inboxes: Vec<_> = robots
            .iter_mut()
            .map(|r| {
                let inbox = Inbox::default();
                r.register_handler(inbox.clone());
                inbox
            })
            .collect();

        // Both front-ends transmit, so every robot hears the broadcast twice
        assert!(base.broadcast(&Command::default().into()));
        for r in robots.iter_mut() {
            assert!(r.run());
            assert!(r.run());
            assert!(!r.run());
        }
        for inbox in &inboxes {
            let received = inbox.0.borrow();
            assert_eq!(received.len(), 2);
            assert!(received.iter().all(|(origin, _)| *origin == Origin::Broadcast));
        }
    }

    #[test]
    fn test_set_radios_online_reassigns_addresses() {
        let ether = Ether::new();
        let mut base = station(&ether, 4, 16);
        assert_eq!(base.information().radios_online, 0b1111);

        base.set_radios_online(0b0101).unwrap();
        assert_eq!(base.radios_online(), 0b0101);
        assert_eq!(base.max_robots(), 10);
        assert_eq!(base.radio_for_robot(7).map(BaseRadio::radio_index), Some(1));

        assert!(base.set_radios_online(0).is_err());
    }

    #[test]
    fn test_run_without_traffic() {
        let ether = Ether::new();
        let mut base = station(&ether, 3, 15);
        assert!(!base.run());
    }
}
