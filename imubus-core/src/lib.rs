//! Board-agnostic core logic for the imubus I2C master
//!
//! This crate contains everything that does not touch hardware:
//!
//! - Bus vocabulary (direction, address byte, acknowledge)
//! - Transaction state machine ordering the master's primitives
//! - Error taxonomy shared by the master and device drivers
//! - Clock and polling configuration

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod bus;
pub mod config;
pub mod error;

pub use bus::{BusOp, BusState, Direction};
pub use config::{AckPolicy, I2cConfig};
pub use error::{BusError, Condition, NackSource};
