//! PIC32MX register backend for imubus
//!
//! Implements `imubus-hal` traits over the memory-mapped peripherals of
//! the PIC32MX1xx/2xx family (PIC32MX250F128B on the reference board):
//!
//! - [`Pic32I2c2`]: I2C2 register block plus ANSELB
//! - [`PortAPin`]: PORTA output latch, used for the diagnostic LED on RA4
//!
//! This is the only crate that dereferences raw addresses. Both types are
//! created through `unsafe` constructors that transfer ownership of the
//! registers they touch.
//!
//! # Usage
//!
//! ```ignore
//! let regs = unsafe { Pic32I2c2::new() };
//! let led = unsafe { PortAPin::new(INDICATOR_PIN) }.unwrap();
//! let mut master = I2cMaster::new(regs, led, I2cConfig::FAST);
//! master.setup()?;
//! ```

#![cfg_attr(not(test), no_std)]

pub mod gpio;
pub mod regs;

pub use gpio::{PortAPin, INDICATOR_PIN};
pub use regs::Pic32I2c2;

pub use imubus_hal::{OutputPin, Register, RegisterAccess};
