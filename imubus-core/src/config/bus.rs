//! I2C master configuration
//!
//! Clock, polling and acknowledge-handling settings for the master. The
//! defaults reproduce the reference board: I2C2 at 400 kHz from a 48 MHz
//! peripheral bus clock, SDA2/SCL2 on RB2/RB3.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::BusError;

/// Smallest divisor the baud rate generator accepts
pub const BRG_MIN: u64 = 2;

/// Largest divisor of the 12-bit baud rate generator
pub const BRG_MAX: u64 = 0x0FFF;

/// Status reads before a busy-wait gives up
///
/// One byte at 100 kHz takes 90 µs; at 48 MHz this budget is far longer.
pub const DEFAULT_POLL_LIMIT: u32 = 100_000;

/// Pulse gobbler delay of the PIC32MX I2C pins
pub const DEFAULT_PULSE_GOBBLER_NS: u32 = 104;

/// ANSELB bits of RB2 (SDA2) and RB3 (SCL2)
pub const DEFAULT_ANALOG_PIN_MASK: u32 = (1 << 2) | (1 << 3);

const NS_PER_S: u64 = 1_000_000_000;

/// What a composed transaction does when the peer NACKs a byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AckPolicy {
    /// Send a stop and report [`BusError::Nack`]
    #[default]
    Abort,
    /// Drive the indicator low and finish the transaction anyway
    Continue,
}

/// I2C master configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct I2cConfig {
    /// SCL frequency in Hz
    pub frequency_hz: u32,
    /// Peripheral bus clock feeding the baud rate generator, in Hz
    pub peripheral_clock_hz: u32,
    /// Pulse gobbler delay in ns
    pub pulse_gobbler_ns: u32,
    /// Status reads per busy-wait before reporting a timeout
    pub poll_limit: u32,
    /// Behavior of composed transactions on NACK
    pub ack_policy: AckPolicy,
    /// Analog-select bits to clear on the bus pins
    pub analog_pin_mask: u32,
}

impl Default for I2cConfig {
    fn default() -> Self {
        Self::FAST
    }
}

impl I2cConfig {
    /// Standard mode (100 kHz)
    pub const STANDARD: Self = Self::with_frequency(100_000);

    /// Fast mode (400 kHz)
    pub const FAST: Self = Self::with_frequency(400_000);

    const fn with_frequency(frequency_hz: u32) -> Self {
        Self {
            frequency_hz,
            peripheral_clock_hz: 48_000_000,
            pulse_gobbler_ns: DEFAULT_PULSE_GOBBLER_NS,
            poll_limit: DEFAULT_POLL_LIMIT,
            ack_policy: AckPolicy::Abort,
            analog_pin_mask: DEFAULT_ANALOG_PIN_MASK,
        }
    }

    /// Baud rate generator reload value
    ///
    /// `BRG = (1 / (2 * Fsck) - PGD) * Pbclk - 2`, computed in integer
    /// nanoseconds and truncated like the datasheet table.
    pub fn brg(&self) -> Result<u16, BusError> {
        if self.frequency_hz == 0 {
            return Err(BusError::InvalidConfig);
        }

        let half_period_ns = NS_PER_S / (2 * u64::from(self.frequency_hz));
        let low_ns = half_period_ns
            .checked_sub(u64::from(self.pulse_gobbler_ns))
            .ok_or(BusError::InvalidConfig)?;
        let ticks = low_ns * u64::from(self.peripheral_clock_hz) / NS_PER_S;
        let brg = ticks.checked_sub(2).ok_or(BusError::InvalidConfig)?;

        if !(BRG_MIN..=BRG_MAX).contains(&brg) {
            return Err(BusError::InvalidConfig);
        }
        Ok(brg as u16)
    }

    /// Check the whole configuration
    pub fn validate(&self) -> Result<u16, BusError> {
        if self.poll_limit == 0 {
            return Err(BusError::InvalidConfig);
        }
        self.brg()
    }
}
