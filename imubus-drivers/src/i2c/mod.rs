//! I2C master driver
//!
//! [`I2cMaster`] sequences bus conditions over any
//! [`RegisterAccess`](imubus_hal::RegisterAccess) backend. It implements
//! the crate's [`I2cBus`](imubus_hal::I2cBus) trait for device drivers and
//! `embedded_hal::i2c::I2c` for third-party ones.

mod ehal;
mod master;

pub use master::I2cMaster;
