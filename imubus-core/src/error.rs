//! Bus error taxonomy
//!
//! One error type for every failure the master can report. Hardware
//! conditions that never resolve become [`BusError::Timeout`] instead of
//! hanging the caller.

use core::fmt;

use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};

use crate::bus::{BusOp, BusState};

/// Hardware condition the master was polling for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Condition {
    /// SEN never cleared
    Start,
    /// RSEN never cleared
    Restart,
    /// PEN never cleared
    Stop,
    /// TRSTAT never cleared
    Transmit,
    /// RBF never set
    Receive,
    /// ACKEN never cleared
    Acknowledge,
}

/// Which byte the peer refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NackSource {
    /// Address byte (no device answered)
    Address(u8),
    /// Data byte (device rejected register or value)
    Data(u8),
}

/// I2C master errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError {
    /// Poll budget exhausted waiting for a hardware condition
    Timeout(Condition),
    /// Primitive not legal in the current transaction state
    OutOfOrder {
        /// State the bus was in
        state: BusState,
        /// Rejected operation
        op: BusOp,
    },
    /// Peer did not acknowledge
    Nack(NackSource),
    /// Address does not fit in 7 bits
    InvalidAddress(u8),
    /// Read requested with an empty buffer
    EmptyRead,
    /// Clock configuration gives a divisor outside the BRG range
    InvalidConfig,
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusError::Timeout(condition) => write!(f, "timed out waiting for {:?}", condition),
            BusError::OutOfOrder { state, op } => {
                write!(f, "{:?} not allowed in state {:?}", op, state)
            }
            BusError::Nack(NackSource::Address(byte)) => {
                write!(f, "address byte {:#04x} not acknowledged", byte)
            }
            BusError::Nack(NackSource::Data(byte)) => {
                write!(f, "data byte {:#04x} not acknowledged", byte)
            }
            BusError::InvalidAddress(address) => {
                write!(f, "address {:#04x} is not a 7-bit address", address)
            }
            BusError::EmptyRead => f.write_str("read of zero bytes"),
            BusError::InvalidConfig => f.write_str("baud rate divisor out of range"),
        }
    }
}

impl embedded_hal::i2c::Error for BusError {
    fn kind(&self) -> ErrorKind {
        match self {
            BusError::Nack(NackSource::Address(_)) => {
                ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)
            }
            BusError::Nack(NackSource::Data(_)) => {
                ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data)
            }
            // A condition that never completes means something holds the lines
            BusError::Timeout(_) => ErrorKind::Bus,
            _ => ErrorKind::Other,
        }
    }
}
