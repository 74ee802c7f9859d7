//! Hardware driver implementations
//!
//! - [`i2c::I2cMaster`]: polled I2C master over a [`imubus_hal::RegisterAccess`]
//!   register block, with an explicit transaction state machine
//! - [`imu::Lsm6`]: LSM6-class accelerometer/gyroscope on any
//!   [`imubus_hal::I2cBus`]

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

#[macro_use]
mod log;

pub mod i2c;
pub mod imu;

pub use i2c::I2cMaster;
pub use imu::{ImuConfig, ImuError, Lsm6, RawSample};
