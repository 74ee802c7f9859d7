//! Transaction state machine
//!
//! Every primitive the master performs is first checked here. The
//! transition either yields the state the bus will be in once the
//! primitive completes, or rejects the call before any register is
//! written.

use super::ops::{BusOp, Direction};
use crate::error::BusError;

/// Transaction states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusState {
    /// Bus released, no transaction open
    #[default]
    Idle,
    /// Start or restart sent, address byte expected next
    Started,
    /// Address byte sent, no data transferred yet
    Addressed(Direction),
    /// At least one data byte transferred in this direction
    Transferring(Direction),
    /// Byte received, the master owes the peer an ACK or NACK
    AckPending,
    /// Final byte NACKed, only restart or stop may follow
    ReadComplete,
    /// Stop sent
    Stopped,
}

impl BusState {
    /// Check if no transaction is open
    pub fn is_idle(&self) -> bool {
        matches!(self, BusState::Idle | BusState::Stopped)
    }

    /// Check if a stop is currently legal
    pub fn can_stop(&self) -> bool {
        self.transition(BusOp::Stop).is_ok()
    }

    /// Process an operation and return the next state
    pub fn transition(self, op: BusOp) -> Result<Self, BusError> {
        use BusState::*;
        use Direction::*;

        let next = match (self, op) {
            (Idle | Stopped, BusOp::Start) => Started,

            (Started, BusOp::Address(direction)) => Addressed(direction),

            (Addressed(Write) | Transferring(Write), BusOp::Write) => Transferring(Write),

            (Addressed(Read) | Transferring(Read), BusOp::Read) => AckPending,
            (AckPending, BusOp::Ack) => Transferring(Read),
            (AckPending, BusOp::Nack) => ReadComplete,

            (Addressed(Write) | Transferring(Write) | ReadComplete, BusOp::Restart) => Started,

            (Started | Addressed(Write) | Transferring(Write) | ReadComplete, BusOp::Stop) => {
                Stopped
            }

            (state, op) => return Err(BusError::OutOfOrder { state, op }),
        };

        Ok(next)
    }
}
