//! `embedded-hal` 1.0 blocking I2C implementation
//!
//! Adjacent operations of the same direction share one address phase.
//! A direction change issues a repeated start; the last byte of a read run
//! is NACKed only when the run ends.

use embedded_hal::i2c::{ErrorType, I2c, Operation, SevenBitAddress};
use imubus_core::bus::{address_byte, Direction};
use imubus_core::error::{BusError, NackSource};
use imubus_hal::regs::RegisterAccess;
use imubus_hal::OutputPin;

use super::I2cMaster;

fn direction(op: &Operation<'_>) -> Direction {
    match op {
        Operation::Read(_) => Direction::Read,
        Operation::Write(_) => Direction::Write,
    }
}

impl<R: RegisterAccess, L: OutputPin> ErrorType for I2cMaster<R, L> {
    type Error = BusError;
}

impl<R: RegisterAccess, L: OutputPin> I2c<SevenBitAddress> for I2cMaster<R, L> {
    fn transaction(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), BusError> {
        if operations.is_empty() {
            return Ok(());
        }
        if operations
            .iter()
            .any(|op| matches!(op, Operation::Read(buf) if buf.is_empty()))
        {
            return Err(BusError::EmptyRead);
        }
        let addr_w = address_byte(address, Direction::Write)?;
        let addr_r = address_byte(address, Direction::Read)?;

        self.run_transaction(|m| {
            let mut previous = None;

            for i in 0..operations.len() {
                let dir = direction(&operations[i]);
                if previous != Some(dir) {
                    if previous.is_some() {
                        m.restart()?;
                    }
                    let addr = match dir {
                        Direction::Write => addr_w,
                        Direction::Read => addr_r,
                    };
                    m.send_checked(addr, NackSource::Address(addr))?;
                }

                let ends_run = operations
                    .get(i + 1)
                    .map_or(true, |next| direction(next) != dir);

                match &mut operations[i] {
                    Operation::Write(bytes) => {
                        for &byte in bytes.iter() {
                            m.send_checked(byte, NackSource::Data(byte))?;
                        }
                    }
                    Operation::Read(buf) => m.receive_into(buf, ends_run)?,
                }
                previous = Some(dir);
            }
            Ok(())
        })
    }
}
