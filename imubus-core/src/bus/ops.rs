//! Bus operations and wire encoding

use crate::error::BusError;

/// Highest valid 7-bit device address
pub const MAX_ADDRESS: u8 = 0x7F;

/// Data direction, encoded in bit 0 of the address byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Master transmits (R/W = 0)
    Write,
    /// Master receives (R/W = 1)
    Read,
}

impl Direction {
    /// Value of the R/W bit
    pub const fn rw_bit(self) -> u8 {
        match self {
            Direction::Write => 0,
            Direction::Read => 1,
        }
    }
}

/// Build the address byte sent after a start or restart
///
/// `address << 1 | rw`, rejecting addresses that do not fit in 7 bits.
pub fn address_byte(address: u8, direction: Direction) -> Result<u8, BusError> {
    if address > MAX_ADDRESS {
        return Err(BusError::InvalidAddress(address));
    }
    Ok(address << 1 | direction.rw_bit())
}

/// Acknowledge bit, as driven by a receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Acknowledge {
    /// Receiver accepted the byte (SDA low, bit value 0)
    Ack,
    /// Receiver declined the byte (SDA high, bit value 1)
    Nack,
}

impl Acknowledge {
    /// Decode from the raw bit (0 = ACK)
    pub const fn from_bit(bit: bool) -> Self {
        if bit {
            Acknowledge::Nack
        } else {
            Acknowledge::Ack
        }
    }

    /// Raw bit value (0 = ACK)
    pub const fn bit(self) -> bool {
        matches!(self, Acknowledge::Nack)
    }

    /// Check if the receiver accepted the byte
    pub const fn is_ack(self) -> bool {
        matches!(self, Acknowledge::Ack)
    }
}

/// Primitive operations checked against the transaction state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusOp {
    /// Start condition
    Start,
    /// Repeated start condition
    Restart,
    /// Address byte with the given direction
    Address(Direction),
    /// Data byte from master to peer
    Write,
    /// Data byte from peer to master
    Read,
    /// Master acknowledges the byte just received
    Ack,
    /// Master declines the byte just received
    Nack,
    /// Stop condition
    Stop,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_address_byte_direction_bit() {
        assert_eq!(address_byte(0x6B, Direction::Write), Ok(0xD6));
        assert_eq!(address_byte(0x6B, Direction::Read), Ok(0xD7));
        assert_eq!(address_byte(0x00, Direction::Read), Ok(0x01));
        assert_eq!(address_byte(MAX_ADDRESS, Direction::Write), Ok(0xFE));
    }

    #[test]
    fn test_address_out_of_range() {
        assert_eq!(
            address_byte(0x80, Direction::Write),
            Err(BusError::InvalidAddress(0x80))
        );
    }

    #[test]
    fn test_acknowledge_bit_mapping() {
        assert_eq!(Acknowledge::from_bit(false), Acknowledge::Ack);
        assert_eq!(Acknowledge::from_bit(true), Acknowledge::Nack);
        assert!(!Acknowledge::Ack.bit());
        assert!(Acknowledge::Nack.bit());
        assert!(Acknowledge::Ack.is_ack());
    }

    proptest! {
        #[test]
        fn prop_address_byte_encodes_rw_in_bit0(address in 0u8..=MAX_ADDRESS) {
            let write = address_byte(address, Direction::Write).unwrap();
            let read = address_byte(address, Direction::Read).unwrap();

            prop_assert_eq!(write & 1, 0);
            prop_assert_eq!(read & 1, 1);
            prop_assert_eq!(write >> 1, address);
            prop_assert_eq!(read >> 1, address);
        }

        #[test]
        fn prop_wide_addresses_rejected(address in 0x80u8..=0xFF) {
            prop_assert_eq!(
                address_byte(address, Direction::Read),
                Err(BusError::InvalidAddress(address))
            );
        }
    }
}
