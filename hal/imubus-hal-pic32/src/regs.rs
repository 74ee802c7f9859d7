//! I2C2 register block
//!
//! Every SFR on the PIC32 is followed by write-only aliases, CLR at +0x4
//! and SET at +0x8. Writing a mask there changes only those bits,
//! atomically, so `set_bits`/`clear_bits` never read back.

use imubus_hal::regs::{Register, RegisterAccess};

/// Physical (KSEG1, uncached) register addresses
pub mod addr {
    /// I2C2 control
    pub const I2C2CON: usize = 0xBF80_5100;
    /// I2C2 status
    pub const I2C2STAT: usize = 0xBF80_5110;
    /// I2C2 baud rate generator
    pub const I2C2BRG: usize = 0xBF80_5140;
    /// I2C2 transmit buffer
    pub const I2C2TRN: usize = 0xBF80_5150;
    /// I2C2 receive buffer
    pub const I2C2RCV: usize = 0xBF80_5160;
    /// Port B analog select
    pub const ANSELB: usize = 0xBF88_6100;
    /// Port A direction
    pub const TRISA: usize = 0xBF88_6010;
    /// Port A output latch
    pub const LATA: usize = 0xBF88_6030;
}

/// Offset of the atomic bit-clear alias
pub const CLR_OFFSET: usize = 0x4;

/// Offset of the atomic bit-set alias
pub const SET_OFFSET: usize = 0x8;

/// Address of a register in the I2C2 block
pub const fn register_address(reg: Register) -> usize {
    match reg {
        Register::Con => addr::I2C2CON,
        Register::Stat => addr::I2C2STAT,
        Register::Trn => addr::I2C2TRN,
        Register::Rcv => addr::I2C2RCV,
        Register::Brg => addr::I2C2BRG,
        Register::AnselB => addr::ANSELB,
    }
}

/// Read a 32-bit SFR
///
/// # Safety
///
/// `address` must be a readable, word-aligned SFR owned by the caller.
pub(crate) unsafe fn read_sfr(address: usize) -> u32 {
    (address as *const u32).read_volatile()
}

/// Write a 32-bit SFR
///
/// # Safety
///
/// `address` must be a writable, word-aligned SFR (or alias) owned by the
/// caller.
pub(crate) unsafe fn write_sfr(address: usize, value: u32) {
    (address as *mut u32).write_volatile(value)
}

/// I2C2 peripheral registers
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Pic32I2c2 {
    _private: (),
}

impl Pic32I2c2 {
    /// Take the I2C2 register block
    ///
    /// # Safety
    ///
    /// Only one `Pic32I2c2` may exist, nothing else may access I2C2, and
    /// the caller owns the ANSELB bits of the bus pins. Must run on a
    /// PIC32MX1xx/2xx where the addresses in [`addr`] are valid.
    pub unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl RegisterAccess for Pic32I2c2 {
    fn read(&mut self, reg: Register) -> u32 {
        // SAFETY: owned SFR per `new`
        unsafe { read_sfr(register_address(reg)) }
    }

    fn write(&mut self, reg: Register, value: u32) {
        // SAFETY: owned SFR per `new`
        unsafe { write_sfr(register_address(reg), value) }
    }

    fn set_bits(&mut self, reg: Register, mask: u32) {
        // SAFETY: SET alias of an owned SFR
        unsafe { write_sfr(register_address(reg) + SET_OFFSET, mask) }
    }

    fn clear_bits(&mut self, reg: Register, mask: u32) {
        // SAFETY: CLR alias of an owned SFR
        unsafe { write_sfr(register_address(reg) + CLR_OFFSET, mask) }
    }
}
