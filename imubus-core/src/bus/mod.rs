//! I2C bus protocol model
//!
//! Wire-level vocabulary (direction, address byte, acknowledge) and the
//! transaction state machine that orders the master's primitives.

pub mod machine;
pub mod ops;

pub use machine::BusState;
pub use ops::{address_byte, Acknowledge, BusOp, Direction, MAX_ADDRESS};
