//! LSM6DS33 accelerometer/gyroscope (I2C mode)
//!
//! # Register access
//!
//! Every register access is its own bus transaction:
//! - write: S, address(W), register, value, P
//! - read: S, address(W), register, Sr, address(R), data..., P
//!
//! With `IF_INC` set in CTRL3_C the device advances the register pointer
//! after each byte, so one burst from `OUT_TEMP_L` returns temperature,
//! gyroscope and accelerometer outputs.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use imubus_hal::i2c::I2cBus;

/// LSM6DS33 register addresses
pub mod reg {
    /// Device identification
    pub const WHO_AM_I: u8 = 0x0F;
    /// Accelerometer control: output data rate, full scale
    pub const CTRL1_XL: u8 = 0x10;
    /// Gyroscope control: output data rate, full scale
    pub const CTRL2_G: u8 = 0x11;
    /// Common control: IF_INC, BDU, reset
    pub const CTRL3_C: u8 = 0x12;
    /// Temperature output, low byte; start of the output block
    pub const OUT_TEMP_L: u8 = 0x20;
    /// Gyroscope X output, low byte
    pub const OUTX_L_G: u8 = 0x22;
    /// Accelerometer X output, low byte
    pub const OUTX_L_XL: u8 = 0x28;
}

/// Address with SA0 pulled high
pub const DEFAULT_ADDRESS: u8 = 0x6B;

/// Address with SA0 pulled low
pub const ALTERNATE_ADDRESS: u8 = 0x6A;

/// Fixed WHO_AM_I answer
pub const WHO_AM_I_VALUE: u8 = 0x69;

/// Bytes from OUT_TEMP_L through OUTZ_H_XL
pub const SAMPLE_LEN: usize = 14;

/// IF_INC bit of CTRL3_C
pub const CTRL3_IF_INC: u8 = 0x04;

/// Temperature sensitivity
const TEMP_LSB_PER_C: i32 = 16;

/// Temperature reading at raw 0
const TEMP_OFFSET_C: i32 = 25;

/// IMU configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ImuConfig {
    /// 7-bit bus address
    pub address: u8,
    /// CTRL1_XL value (default 1.66 kHz, ±2 g)
    pub ctrl1_xl: u8,
    /// CTRL2_G value (default 1.66 kHz, 1000 dps)
    pub ctrl2_g: u8,
    /// CTRL3_C value (default IF_INC only)
    pub ctrl3_c: u8,
}

impl Default for ImuConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS,
            ctrl1_xl: 0x82,
            ctrl2_g: 0x88,
            ctrl3_c: CTRL3_IF_INC,
        }
    }
}

/// IMU errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ImuError<E> {
    /// Bus transaction failed
    Bus(E),
    /// WHO_AM_I returned something other than [`WHO_AM_I_VALUE`]
    WrongDevice(u8),
}

impl<E: fmt::Display> fmt::Display for ImuError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImuError::Bus(e) => write!(f, "bus error: {}", e),
            ImuError::WrongDevice(id) => write!(
                f,
                "unexpected WHO_AM_I {:#04x} (expected {:#04x})",
                id, WHO_AM_I_VALUE
            ),
        }
    }
}

/// One burst of raw output registers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RawSample {
    /// Temperature, 16 LSB/°C around 25 °C
    pub temperature: i16,
    /// Angular rate X, Y, Z
    pub gyro: [i16; 3],
    /// Linear acceleration X, Y, Z
    pub accel: [i16; 3],
}

impl RawSample {
    /// Decode the little-endian output block starting at OUT_TEMP_L
    pub fn from_bytes(bytes: &[u8; SAMPLE_LEN]) -> Self {
        let word = |register: u8| {
            let i = usize::from(register - reg::OUT_TEMP_L);
            i16::from_le_bytes([bytes[i], bytes[i + 1]])
        };
        let axes = |x_low: u8| [word(x_low), word(x_low + 2), word(x_low + 4)];

        Self {
            temperature: word(reg::OUT_TEMP_L),
            gyro: axes(reg::OUTX_L_G),
            accel: axes(reg::OUTX_L_XL),
        }
    }

    /// Temperature in hundredths of a degree Celsius
    pub fn temperature_centi_c(&self) -> i32 {
        TEMP_OFFSET_C * 100 + i32::from(self.temperature) * 100 / TEMP_LSB_PER_C
    }
}

/// LSM6DS33 driver
pub struct Lsm6<B> {
    bus: B,
    config: ImuConfig,
}

impl<B: I2cBus> Lsm6<B> {
    /// Create a new driver; the device is not touched until `init_device`
    pub fn new(bus: B, config: ImuConfig) -> Self {
        Self { bus, config }
    }

    /// Get the configuration
    pub fn config(&self) -> &ImuConfig {
        &self.config
    }

    /// Give back the bus
    pub fn release(self) -> B {
        self.bus
    }

    /// Control register writes performed by `init_device`, in order
    pub fn init_sequence(&self) -> [(u8, u8); 3] {
        [
            (reg::CTRL1_XL, self.config.ctrl1_xl),
            (reg::CTRL2_G, self.config.ctrl2_g),
            (reg::CTRL3_C, self.config.ctrl3_c),
        ]
    }

    /// Configure accelerometer, gyroscope and register auto-increment
    ///
    /// One write transaction per register.
    pub fn init_device(&mut self) -> Result<(), ImuError<B::Error>> {
        for (register, value) in self.init_sequence() {
            self.write_register(register, value)?;
        }
        Ok(())
    }

    /// Write one register
    pub fn write_register(&mut self, register: u8, value: u8) -> Result<(), ImuError<B::Error>> {
        self.bus
            .write(self.config.address, &[register, value])
            .map_err(ImuError::Bus)
    }

    /// Read one register
    pub fn get_register(&mut self, register: u8) -> Result<u8, ImuError<B::Error>> {
        let mut value = [0u8];
        self.read_multiple(register, &mut value)?;
        Ok(value[0])
    }

    /// Read consecutive registers starting at `register`
    ///
    /// Needs IF_INC for more than one byte.
    pub fn read_multiple(&mut self, register: u8, buf: &mut [u8]) -> Result<(), ImuError<B::Error>> {
        self.bus
            .write_read(self.config.address, &[register], buf)
            .map_err(ImuError::Bus)
    }

    /// Read the identification register
    pub fn who_am_i(&mut self) -> Result<u8, ImuError<B::Error>> {
        self.get_register(reg::WHO_AM_I)
    }

    /// Check that an LSM6DS33 answers at the configured address
    pub fn verify(&mut self) -> Result<(), ImuError<B::Error>> {
        match self.who_am_i()? {
            WHO_AM_I_VALUE => Ok(()),
            id => Err(ImuError::WrongDevice(id)),
        }
    }

    /// Read temperature, gyroscope and accelerometer in one burst
    pub fn read_raw(&mut self) -> Result<RawSample, ImuError<B::Error>> {
        let mut bytes = [0u8; SAMPLE_LEN];
        self.read_multiple(reg::OUT_TEMP_L, &mut bytes)?;
        Ok(RawSample::from_bytes(&bytes))
    }
}
