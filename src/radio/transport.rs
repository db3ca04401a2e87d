//! # Radio Transport
//!
//! Trait abstraction over an nRF24-style transceiver, plus an in-memory
//! [`Ether`] that connects [`LoopbackRadio`]s for tests and simulation.
//!
//! The loopback models what the protocol relies on: address-routed
//! delivery per pipe, per-pipe auto-acknowledgement, acknowledgement
//! payloads (delivered to the writer on pipe 0), channel separation and
//! three-deep hardware FIFOs.

use serde::Deserialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::encoder::Frame;

/// Number of pipes on a transceiver (pipe 0 included)
pub const NUM_PIPES: usize = 6;

/// Depth of the hardware RX and ack payload FIFOs
pub const FIFO_DEPTH: usize = 3;

/// Transmit power level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerLevel {
    #[default]
    Min,
    Low,
    High,
    Max,
}

/// Radio transceiver operations used by the link endpoints
#[cfg_attr(test, mockall::automock)]
pub trait RadioTransport {
    /// Power up the transceiver, returns whether the chip responds
    fn begin(&mut self) -> bool;

    fn set_channel(&mut self, channel: u8);

    fn set_power_level(&mut self, level: PowerLevel);

    fn open_reading_pipe(&mut self, pipe: u8, address: u64);

    fn open_writing_pipe(&mut self, address: u64);

    fn set_auto_ack(&mut self, pipe: u8, enabled: bool);

    /// Transmit a frame to the writing address, returns whether it was delivered
    fn write(&mut self, frame: &Frame) -> bool;

    /// Pipe of the oldest received frame, if any
    fn available(&mut self) -> Option<u8>;

    /// Pop the oldest received frame into `frame`
    fn read(&mut self, frame: &mut Frame);

    /// Queue a payload to piggyback on the next acknowledgement sent on `pipe`
    fn write_ack_payload(&mut self, pipe: u8, frame: &Frame) -> bool;
}

#[derive(Debug, Default)]
struct RadioState {
    present: bool,
    powered: bool,
    channel: u8,
    reading_pipes: [Option<u64>; NUM_PIPES],
    auto_ack: [bool; NUM_PIPES],
    writing_address: Option<u64>,
    rx: VecDeque<(u8, Frame)>,
    ack_payloads: [VecDeque<Frame>; NUM_PIPES],
}

#[derive(Debug, Default)]
struct EtherState {
    radios: Vec<RadioState>,
}

/// Shared in-memory radio medium
#[derive(Debug, Clone, Default)]
pub struct Ether {
    state: Arc<Mutex<EtherState>>,
}

impl Ether {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a new transceiver to the medium
    pub fn radio(&self) -> LoopbackRadio {
        self.attach(true)
    }

    /// Attach a transceiver whose chip never responds
    pub fn absent_radio(&self) -> LoopbackRadio {
        self.attach(false)
    }

    fn attach(&self, present: bool) -> LoopbackRadio {
        let mut state = self.lock();
        state.radios.push(RadioState {
            present,
            auto_ack: [true; NUM_PIPES],
            ..Default::default()
        });
        LoopbackRadio {
            ether: self.clone(),
            index: state.radios.len() - 1,
        }
    }

    fn lock(&self) -> MutexGuard<'_, EtherState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// In-memory transceiver attached to an [`Ether`]
#[derive(Debug, Clone)]
pub struct LoopbackRadio {
    ether: Ether,
    index: usize,
}

impl LoopbackRadio {
    fn with_state<R>(&self, f: impl FnOnce(&mut RadioState) -> R) -> R {
        let mut state = self.ether.lock();
        f(&mut state.radios[self.index])
    }
}

impl RadioTransport for LoopbackRadio {
    fn begin(&mut self) -> bool {
        self.with_state(|radio| {
            radio.powered = radio.present;
            radio.present
        })
    }

    fn set_channel(&mut self, channel: u8) {
        self.with_state(|radio| radio.channel = channel);
    }

    fn set_power_level(&mut self, _level: PowerLevel) {}

    fn open_reading_pipe(&mut self, pipe: u8, address: u64) {
        self.with_state(|radio| {
            if let Some(slot) = radio.reading_pipes.get_mut(pipe as usize) {
                *slot = Some(address);
            }
        });
    }

    fn open_writing_pipe(&mut self, address: u64) {
        self.with_state(|radio| radio.writing_address = Some(address));
    }

    fn set_auto_ack(&mut self, pipe: u8, enabled: bool) {
        self.with_state(|radio| {
            if let Some(slot) = radio.auto_ack.get_mut(pipe as usize) {
                *slot = enabled;
            }
        });
    }

    fn write(&mut self, frame: &Frame) -> bool {
        let mut state = self.ether.lock();
        let (channel, address) = {
            let writer = &state.radios[self.index];
            match (writer.powered, writer.writing_address) {
                (true, Some(address)) => (writer.channel, address),
                _ => return false,
            }
        };

        let mut delivered = false;
        let mut acks = Vec::new();

        for (i, radio) in state.radios.iter_mut().enumerate() {
            if i == self.index || !radio.powered || radio.channel != channel {
                continue;
            }
            for pipe in 0..NUM_PIPES {
                if radio.reading_pipes[pipe] != Some(address) || radio.rx.len() >= FIFO_DEPTH {
                    continue;
                }
                radio.rx.push_back((pipe as u8, *frame));
                delivered = true;
                if radio.auto_ack[pipe] {
                    if let Some(ack) = radio.ack_payloads[pipe].pop_front() {
                        acks.push(ack);
                    }
                }
            }
        }

        let writer = &mut state.radios[self.index];
        for ack in acks {
            if writer.rx.len() < FIFO_DEPTH {
                writer.rx.push_back((0, ack));
            }
        }

        delivered
    }

    fn available(&mut self) -> Option<u8> {
        self.with_state(|radio| radio.rx.front().map(|(pipe, _)| *pipe))
    }

    fn read(&mut self, frame: &mut Frame) {
        self.with_state(|radio| {
            if let Some((_, received)) = radio.rx.pop_front() {
                *frame = received;
            }
        });
    }

    fn write_ack_payload(&mut self, pipe: u8, frame: &Frame) -> bool {
        self.with_state(|radio| match radio.ack_payloads.get_mut(pipe as usize) {
            Some(fifo) if fifo.len() < FIFO_DEPTH => {
                fifo.push_back(*frame);
                true
            }
            _ => false,
        })
    }
}
