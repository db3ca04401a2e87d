//! # Simulated Robot
//!
//! A robot endpoint with fake firmware behind it: follows received
//! commands, integrates odometry, drains its battery and publishes status
//! through the cyclic telemetry buffer. Used by the demo binary and tests.

use std::cell::Cell;
use std::rc::Rc;

use crate::config_sync::registry::Access;
use crate::error::Result;
use crate::radio::dispatch::{MessageHandler, Origin};
use crate::radio::protocol::*;
use crate::radio::robot::RobotLink;
use crate::radio::transport::{PowerLevel, RadioTransport};
use crate::variable::VariableId;

/// Battery voltage of a full 4S pack
const BATTERY_FULL: f32 = 16.8;

/// Battery voltage the simulation never drops below
const BATTERY_EMPTY: f32 = 14.0;

/// Voltage lost per step
const BATTERY_DRAIN: f32 = 1e-4;

/// Simulated time per step in seconds
const STEP_SECONDS: f32 = 0.01;

/// Cyclic buffer slots
const SLOT_STATUS_HF: usize = 0;
const SLOT_STATUS_LF: usize = 1;
const SLOT_ODOMETRY: usize = 2;

#[derive(Debug, Default)]
struct Firmware {
    command: Cell<Command>,
    position: Cell<Pose>,
}

struct CommandFollower(Rc<Firmware>);

impl MessageHandler for CommandFollower {
    fn on_command(&mut self, _origin: Origin, command: Command) {
        self.0.command.set(command);
    }

    fn on_override_odometry(&mut self, _origin: Origin, over: OverrideOdometry) {
        self.0.position.set(over.position);
    }
}

/// Robot endpoint driven by simulated firmware
pub struct SimulatedRobot<T: RadioTransport> {
    link: RobotLink<T>,
    firmware: Rc<Firmware>,
    battery_voltage: Rc<Cell<f32>>,
    kicker_temperature: Rc<Cell<i8>>,
    steps: u64,
}

impl<T: RadioTransport> std::fmt::Debug for SimulatedRobot<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedRobot")
            .field("link", &self.link)
            .field("steps", &self.steps)
            .finish()
    }
}

impl<T: RadioTransport> SimulatedRobot<T> {
    /// Bring up a simulated robot and expose its configuration variables
    ///
    /// # Errors
    ///
    /// Returns error if the radio cannot be initialised
    pub fn new(transport: T, identity: RobotId, channel: u8, power: PowerLevel) -> Result<Self> {
        let mut link = RobotLink::new(transport, identity);
        link.init(channel, power)?;

        let firmware = Rc::new(Firmware::default());
        let battery_voltage = Rc::new(Cell::new(BATTERY_FULL));
        let kicker_temperature = Rc::new(Cell::new(25i8));

        let registry = link.registry_mut();
        registry.register(VariableId::ROBOT_ID, Access::Read, identity, Rc::new(Cell::new(identity)))?;
        registry.register(VariableId::BATTERY_VOLTAGE, Access::Read, BATTERY_FULL, battery_voltage.clone())?;
        registry.register(VariableId::KICKER_TEMPERATURE, Access::Read, 25i8, kicker_temperature.clone())?;
        registry.register(VariableId::SPEED_KP, Access::ReadWrite, 1.0f32, Rc::new(Cell::new(1.0f32)))?;
        registry.register(VariableId::DRIBBLER_MAX_SPEED, Access::ReadWrite, 1000u16, Rc::new(Cell::new(1000u16)))?;
        registry.register(VariableId::ODOMETRY_RESET, Access::Write, false, Rc::new(Cell::new(false)))?;

        link.register_handler(CommandFollower(firmware.clone()));

        Ok(Self {
            link,
            firmware,
            battery_voltage,
            kicker_temperature,
            steps: 0,
        })
    }

    pub fn identity(&self) -> RobotId {
        self.link.identity()
    }

    /// Last command received
    pub fn command(&self) -> Command {
        self.firmware.command.get()
    }

    pub fn position(&self) -> Pose {
        self.firmware.position.get()
    }

    /// Run the link once, advance the firmware and refresh telemetry
    ///
    /// Returns whether the link handled a message.
    pub fn step(&mut self) -> bool {
        let handled = self.link.run();
        self.steps += 1;

        let speed = self.firmware.command.get().speed;
        let mut position = self.firmware.position.get();
        position.x += speed.x * STEP_SECONDS;
        position.y += speed.y * STEP_SECONDS;
        position.z += speed.z * STEP_SECONDS;
        self.firmware.position.set(position);

        let battery = (BATTERY_FULL - self.steps as f32 * BATTERY_DRAIN).max(BATTERY_EMPTY);
        self.battery_voltage.set(battery);

        self.link.write_tx_buffer(
            SLOT_STATUS_HF,
            StatusHighFreq {
                status: Status::Ok,
                motor_status: [Status::Ok; NUM_MOTORS],
                speed,
            }
            .into(),
        );
        self.link.write_tx_buffer(
            SLOT_STATUS_LF,
            StatusLowFreq {
                battery_voltage: battery,
                kicker: KickerStatus {
                    status: Status::Armed,
                    temperature: self.kicker_temperature.get(),
                    capacitor_voltage: 200,
                },
                motor_temperature: [30; NUM_MOTORS],
            }
            .into(),
        );
        self.link.write_tx_buffer(SLOT_ODOMETRY, OdometryReading { position, speed }.into());

        handled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::radio::base::BaseStation;
    use crate::radio::transport::{Ether, LoopbackRadio};
    use std::cell::RefCell;

    #[derive(Default, Clone)]
    struct Inbox(Rc<RefCell<Vec<Message>>>);

    impl MessageHandler for Inbox {
        fn on_status_high_freq(&mut self, _origin: Origin, status: StatusHighFreq) {
            self.0.borrow_mut().push(status.into());
        }

        fn on_multi_config_message(&mut self, _origin: Origin, message: MultiConfigMessage) {
            self.0.borrow_mut().push(message.into());
        }
    }

    fn setup(robot: RobotId) -> (BaseStation<LoopbackRadio>, SimulatedRobot<LoopbackRadio>, Inbox) {
        let ether = Ether::new();
        let transports = (0..4).map(|_| ether.radio()).collect();
        let mut base = BaseStation::new(transports, 76, 16).unwrap();
        base.init(PowerLevel::Min).unwrap();
        let inbox = Inbox::default();
        base.register_handler(inbox.clone());

        let sim = SimulatedRobot::new(ether.radio(), robot, 76, PowerLevel::Min).unwrap();
        (base, sim, inbox)
    }

    #[test]
    fn test_follows_command() {
        let (mut base, mut sim, _inbox) = setup(6);
        let command = Command {
            speed: Pose::new(1.0, 0.0, 0.5),
            ..Default::default()
        };

        assert!(base.send_to(6, &command.into()).unwrap());
        assert!(sim.step());
        assert_eq!(sim.command(), command);
        assert!((sim.position().x - STEP_SECONDS).abs() < 1e-6);
    }

    #[test]
    fn test_reports_commanded_speed() {
        let (mut base, mut sim, inbox) = setup(1);
        let command = Command {
            speed: Pose::new(0.3, -0.2, 0.0),
            ..Default::default()
        };

        // Telemetry is refreshed after the command is handled, so it rides
        // on the acknowledgement of the frame after next
        base.send_to(1, &command.into()).unwrap();
        sim.step();
        base.send_to(1, &Message::NoOp).unwrap();
        sim.step();
        assert!(!base.run());
        base.send_to(1, &Message::NoOp).unwrap();
        assert!(base.run());

        let received = inbox.0.borrow();
        match received[0] {
            Message::StatusHighFreq(status) => {
                assert_eq!(status.status, Status::Ok);
                assert_eq!(status.speed, command.speed);
            }
            ref other => panic!("Unexpected {:?}", other),
        }
    }

    #[test]
    fn test_answers_config_read() {
        let (mut base, mut sim, inbox) = setup(2);
        let request = MultiConfigMessage::read(&[VariableId::ROBOT_ID, VariableId::DRIBBLER_MAX_SPEED]).unwrap();

        base.send_to(2, &request.into()).unwrap();
        sim.step();
        base.send_to(2, &Message::NoOp).unwrap();
        assert!(base.run());

        let received = inbox.0.borrow();
        match received[0] {
            Message::MultiConfigMessage(reply) => {
                assert_eq!(reply.operation, ConfigOperation::ReadReturn);
                assert_eq!(reply.values[0], 2);
                assert_eq!(reply.values[1], 1000);
            }
            ref other => panic!("Unexpected {:?}", other),
        }
    }

    #[test]
    fn test_battery_drains() {
        let (_base, mut sim, _inbox) = setup(0);
        for _ in 0..100 {
            assert!(!sim.step());
        }
        assert!(sim.battery_voltage.get() < BATTERY_FULL);
        assert!(sim.battery_voltage.get() >= BATTERY_EMPTY);
    }
}
