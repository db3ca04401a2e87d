//! # Outbound Queue
//!
//! Supplies the next message to attach to a transmit opportunity on the
//! robot. Application replies (config responses) wait in an ordered queue
//! and always go first; when nothing is pending, the last written value of
//! each telemetry slot is replayed round-robin so the link never carries
//! an empty acknowledgement.

use std::collections::VecDeque;
use tracing::debug;

use super::protocol::Message;

/// Capacity of the ordered queue and the cyclic replay buffer
pub const MAX_TX_BUFFER: usize = 8;

/// Pending outbound messages plus the cyclic "last known good" buffer
#[derive(Debug, Clone)]
pub struct OutboundQueue {
    pending: VecDeque<Message>,
    /// `None` for slots never written
    cyclic: [Option<Message>; MAX_TX_BUFFER],
    /// Number of cyclic slots in use (highest written index + 1)
    cyclic_len: usize,
    cursor: usize,
}

impl Default for OutboundQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl OutboundQueue {
    pub fn new() -> Self {
        Self {
            pending: VecDeque::with_capacity(MAX_TX_BUFFER),
            cyclic: [None; MAX_TX_BUFFER],
            cyclic_len: 0,
            cursor: 0,
        }
    }

    /// Append a message to the ordered queue
    ///
    /// Messages pushed while the queue is full are dropped.
    pub fn push(&mut self, message: Message) {
        if self.pending.len() >= MAX_TX_BUFFER {
            debug!("TX queue full, dropping {:?}", message.message_type());
            return;
        }
        self.pending.push_back(message);
    }

    /// Overwrite a slot of the cyclic replay buffer
    ///
    /// Indices at or beyond `MAX_TX_BUFFER` are ignored.
    pub fn write_slot(&mut self, index: usize, message: Message) {
        if index >= MAX_TX_BUFFER {
            debug!("TX buffer index {} out of range, ignoring", index);
            return;
        }
        if index >= self.cyclic_len {
            self.cyclic_len = index + 1;
        }
        self.cyclic[index] = Some(message);
    }

    /// Next message to transmit
    ///
    /// Pops the front of the ordered queue if non-empty, otherwise returns
    /// the next written cyclic slot from the rotation cursor and moves the
    /// cursor past it. Slots never written are skipped. Returns `None` only
    /// when both are empty.
    pub fn next(&mut self) -> Option<Message> {
        if let Some(message) = self.pending.pop_front() {
            return Some(message);
        }

        for step in 0..self.cyclic_len {
            let index = (self.cursor + step) % self.cyclic_len;
            if let Some(message) = self.cyclic[index] {
                self.cursor = (index + 1) % self.cyclic_len;
                return Some(message);
            }
        }
        None
    }

    /// Number of messages waiting in the ordered queue
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty() && self.cyclic_len == 0
    }
}
