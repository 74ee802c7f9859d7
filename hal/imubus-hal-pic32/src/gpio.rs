//! PORTA output pins

use imubus_hal::gpio::OutputPin;

use crate::regs::{addr, read_sfr, write_sfr, CLR_OFFSET, SET_OFFSET};

/// RA4, the diagnostic LED on the reference board
pub const INDICATOR_PIN: u8 = 4;

/// Highest pin number PORTA implements on the 28-pin parts
const MAX_PIN: u8 = 4;

/// Digital output on PORTA
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PortAPin {
    mask: u32,
}

impl PortAPin {
    /// Take pin `pin` of PORTA and make it an output
    ///
    /// Returns `None` for pins the package does not bond out.
    ///
    /// # Safety
    ///
    /// The caller owns bit `pin` of TRISA and LATA; nothing else drives it.
    pub unsafe fn new(pin: u8) -> Option<Self> {
        if pin > MAX_PIN {
            return None;
        }
        let mask = 1 << pin;
        write_sfr(addr::TRISA + CLR_OFFSET, mask);
        Some(Self { mask })
    }

    /// Bit mask of this pin in the port registers
    pub fn mask(&self) -> u32 {
        self.mask
    }
}

impl OutputPin for PortAPin {
    fn set_high(&mut self) {
        // SAFETY: owned latch bit per `new`
        unsafe { write_sfr(addr::LATA + SET_OFFSET, self.mask) }
    }

    fn set_low(&mut self) {
        // SAFETY: owned latch bit per `new`
        unsafe { write_sfr(addr::LATA + CLR_OFFSET, self.mask) }
    }

    fn is_set_high(&self) -> bool {
        // SAFETY: LATA reads have no side effects
        unsafe { read_sfr(addr::LATA) & self.mask != 0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_pin_rejected_without_access() {
        // Rejected before any register is touched, so this is safe on the host
        assert!(unsafe { PortAPin::new(MAX_PIN + 1) }.is_none());
        assert!(unsafe { PortAPin::new(31) }.is_none());
    }

    #[test]
    fn test_indicator_on_port_a() {
        assert!(INDICATOR_PIN <= MAX_PIN);
    }
}
