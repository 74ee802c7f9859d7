//! imubus Hardware Abstraction Layer
//!
//! Traits the I2C master and its device drivers are written against, plus
//! the register layout of the PIC32MX I2C peripheral.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Drivers (imubus-drivers: master, IMU)  │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  imubus-hal (this crate - traits)       │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ imubus-hal-   │       │  sim (feature │
//! │    pic32      │       │   "sim")      │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`regs::RegisterAccess`] - Peripheral registers by name
//! - [`gpio::OutputPin`] - Diagnostic indicator
//! - [`i2c::I2cBus`] - Transaction-level I2C for device drivers

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod gpio;
pub mod i2c;
pub mod regs;
#[cfg(any(test, feature = "sim"))]
pub mod sim;

// Re-export key traits at crate root for convenience
pub use gpio::{NoIndicator, OutputPin};
pub use i2c::I2cBus;
pub use regs::{Register, RegisterAccess};
