//! Peripheral register access
//!
//! The I2C master never touches memory directly. It names the register it
//! wants and goes through [`RegisterAccess`], so the same sequencing code
//! runs against the MMIO backend on the target and against
//! [`crate::sim::SimRegisters`] on the host.

/// Registers used by the I2C master
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Register {
    /// Control register (I2CxCON)
    Con,
    /// Status register (I2CxSTAT)
    Stat,
    /// Transmit buffer (I2CxTRN)
    Trn,
    /// Receive buffer (I2CxRCV)
    Rcv,
    /// Baud rate generator reload (I2CxBRG)
    Brg,
    /// Analog select of the port carrying SDA/SCL (ANSELB)
    AnselB,
}

/// I2CxCON bit layout
pub mod con {
    /// Start condition enable, cleared by hardware
    pub const SEN: u32 = 1 << 0;
    /// Repeated start condition enable, cleared by hardware
    pub const RSEN: u32 = 1 << 1;
    /// Stop condition enable, cleared by hardware
    pub const PEN: u32 = 1 << 2;
    /// Receive enable, cleared by hardware at the end of the 8th bit
    pub const RCEN: u32 = 1 << 3;
    /// Acknowledge sequence enable, cleared by hardware
    pub const ACKEN: u32 = 1 << 4;
    /// Acknowledge data bit (0 = ACK, 1 = NACK)
    pub const ACKDT: u32 = 1 << 5;
    /// Module enable
    pub const ON: u32 = 1 << 15;

    /// Every request bit the hardware clears on completion
    pub const REQUESTS: u32 = SEN | RSEN | PEN | RCEN | ACKEN;
}

/// I2CxSTAT bit layout
pub mod stat {
    /// Receive buffer full
    pub const RBF: u32 = 1 << 1;
    /// Transmit in progress (8 bits + ACK)
    pub const TRSTAT: u32 = 1 << 14;
    /// Acknowledge received from the peer (1 = NACK)
    pub const ACKSTAT: u32 = 1 << 15;
}

/// ANSELB bits of the default bus pins
pub mod ansel {
    /// RB2 (SDA2)
    pub const ANSB2: u32 = 1 << 2;
    /// RB3 (SCL2)
    pub const ANSB3: u32 = 1 << 3;
}

/// Read/write access to peripheral registers by name
///
/// `read` takes `&mut self` because reading a hardware register can have
/// side effects (reading RCV clears RBF) and simulated backends advance
/// their state on every poll.
pub trait RegisterAccess {
    /// Read the full register value
    fn read(&mut self, reg: Register) -> u32;

    /// Write the full register value
    fn write(&mut self, reg: Register, value: u32);

    /// Set the bits in `mask`, leaving the others untouched
    ///
    /// Backends with atomic set aliases should override this.
    fn set_bits(&mut self, reg: Register, mask: u32) {
        let value = self.read(reg);
        self.write(reg, value | mask);
    }

    /// Clear the bits in `mask`, leaving the others untouched
    fn clear_bits(&mut self, reg: Register, mask: u32) {
        let value = self.read(reg);
        self.write(reg, value & !mask);
    }

    /// Check whether every bit in `mask` is set
    fn is_set(&mut self, reg: Register, mask: u32) -> bool {
        self.read(reg) & mask == mask
    }
}

impl<T: RegisterAccess + ?Sized> RegisterAccess for &mut T {
    fn read(&mut self, reg: Register) -> u32 {
        (**self).read(reg)
    }

    fn write(&mut self, reg: Register, value: u32) {
        (**self).write(reg, value)
    }

    fn set_bits(&mut self, reg: Register, mask: u32) {
        (**self).set_bits(reg, mask)
    }

    fn clear_bits(&mut self, reg: Register, mask: u32) {
        (**self).clear_bits(reg, mask)
    }

    fn is_set(&mut self, reg: Register, mask: u32) -> bool {
        (**self).is_set(reg, mask)
    }
}
