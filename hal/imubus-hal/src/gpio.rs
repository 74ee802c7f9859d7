//! GPIO output abstraction
//!
//! The I2C master has a single GPIO concern: the diagnostic indicator that
//! goes low when a peer fails to acknowledge.

/// Digital output pin
pub trait OutputPin {
    /// Drive the pin high (logic 1)
    fn set_high(&mut self);

    /// Drive the pin low (logic 0)
    fn set_low(&mut self);

    /// Drive the pin to a specific level
    fn set_state(&mut self, high: bool) {
        if high {
            self.set_high();
        } else {
            self.set_low();
        }
    }

    /// Check if the output latch is high
    fn is_set_high(&self) -> bool;

    /// Check if the output latch is low
    fn is_set_low(&self) -> bool {
        !self.is_set_high()
    }
}

impl<T: OutputPin + ?Sized> OutputPin for &mut T {
    fn set_high(&mut self) {
        (**self).set_high()
    }

    fn set_low(&mut self) {
        (**self).set_low()
    }

    fn is_set_high(&self) -> bool {
        (**self).is_set_high()
    }
}

/// Indicator for boards without a spare LED
///
/// Remembers the last level so callers can still inspect it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoIndicator {
    high: bool,
}

impl NoIndicator {
    /// Create a new, initially low, indicator stand-in
    pub const fn new() -> Self {
        Self { high: false }
    }
}

impl OutputPin for NoIndicator {
    fn set_high(&mut self) {
        self.high = true;
    }

    fn set_low(&mut self) {
        self.high = false;
    }

    fn is_set_high(&self) -> bool {
        self.high
    }
}
