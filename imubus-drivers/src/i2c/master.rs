//! Polled I2C master
//!
//! Drives the peripheral one bus condition at a time: request it through a
//! control bit, then poll the matching status bit until hardware reports
//! completion. Each primitive is checked against the transaction state
//! first, so an out-of-order call is rejected before any register changes.
//!
//! # Transactions
//!
//! ```text
//! register read:   S  AW  reg  Sr  AR  d0 ACK ... dn NACK  P
//! register write:  S  AW  reg  value  P
//! ```
//!
//! # Acknowledge failures
//!
//! [`I2cMaster::send`] never aborts: on NACK it drives the diagnostic
//! indicator low and returns [`Acknowledge::Nack`]. Composed transactions
//! then follow [`AckPolicy`].

use imubus_core::bus::{address_byte, Acknowledge, BusOp, BusState, Direction};
use imubus_core::config::{AckPolicy, I2cConfig};
use imubus_core::error::{BusError, Condition, NackSource};
use imubus_hal::i2c::I2cBus;
use imubus_hal::regs::{con, stat, Register, RegisterAccess};
use imubus_hal::OutputPin;

/// Polled I2C master
///
/// Owns the register block of one I2C peripheral and the diagnostic
/// indicator. Call [`setup`](Self::setup) once before any transfer.
pub struct I2cMaster<R, L> {
    regs: R,
    indicator: L,
    config: I2cConfig,
    state: BusState,
}

impl<R: RegisterAccess, L: OutputPin> I2cMaster<R, L> {
    /// Create a new master; the peripheral stays off until `setup`
    pub fn new(regs: R, indicator: L, config: I2cConfig) -> Self {
        Self {
            regs,
            indicator,
            config,
            state: BusState::Idle,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &I2cConfig {
        &self.config
    }

    /// Current transaction state
    pub fn state(&self) -> BusState {
        self.state
    }

    /// Register block
    pub fn registers(&self) -> &R {
        &self.regs
    }

    /// Register block, mutably
    pub fn registers_mut(&mut self) -> &mut R {
        &mut self.regs
    }

    /// Diagnostic indicator
    pub fn indicator(&self) -> &L {
        &self.indicator
    }

    /// Give back the register block and indicator
    pub fn release(self) -> (R, L) {
        (self.regs, self.indicator)
    }

    /// Configure and enable the peripheral
    ///
    /// Switches the module off to drop any request left over from a hung
    /// condition, loads the baud rate divisor, switches the bus pins to
    /// digital, turns the module back on and lights the indicator. Calling
    /// it again recovers a master whose last condition timed out.
    pub fn setup(&mut self) -> Result<(), BusError> {
        let brg = self.config.validate()?;

        self.regs
            .clear_bits(Register::Con, con::ON | con::REQUESTS);
        self.regs.write(Register::Brg, u32::from(brg));
        self.regs
            .clear_bits(Register::AnselB, self.config.analog_pin_mask);
        self.regs.set_bits(Register::Con, con::ON);
        self.indicator.set_high();
        self.state = BusState::Idle;

        debug!(
            "I2C master on: {} Hz, BRG={}",
            self.config.frequency_hz, brg
        );
        Ok(())
    }

    /// Send a start condition
    pub fn start(&mut self) -> Result<(), BusError> {
        let next = self.check(BusOp::Start)?;
        self.regs.set_bits(Register::Con, con::SEN);
        self.wait_clear(Register::Con, con::SEN, Condition::Start)?;
        self.state = next;
        Ok(())
    }

    /// Send a repeated start condition
    pub fn restart(&mut self) -> Result<(), BusError> {
        let next = self.check(BusOp::Restart)?;
        self.regs.set_bits(Register::Con, con::RSEN);
        self.wait_clear(Register::Con, con::RSEN, Condition::Restart)?;
        self.state = next;
        Ok(())
    }

    /// Send a stop condition, releasing the bus
    pub fn stop(&mut self) -> Result<(), BusError> {
        let next = self.check(BusOp::Stop)?;
        self.regs.set_bits(Register::Con, con::PEN);
        self.wait_clear(Register::Con, con::PEN, Condition::Stop)?;
        self.state = next;
        Ok(())
    }

    /// Transmit one byte and report the peer's acknowledge
    ///
    /// Right after a start or restart the byte is the address byte and its
    /// bit 0 selects the direction. A NACK drives the indicator low; the
    /// transaction state still advances.
    pub fn send(&mut self, byte: u8) -> Result<Acknowledge, BusError> {
        let op = match self.state {
            BusState::Started if byte & 1 == 0 => BusOp::Address(Direction::Write),
            BusState::Started => BusOp::Address(Direction::Read),
            _ => BusOp::Write,
        };
        let next = self.check(op)?;

        self.regs.write(Register::Trn, u32::from(byte));
        self.wait_clear(Register::Stat, stat::TRSTAT, Condition::Transmit)?;
        self.state = next;

        let ack = Acknowledge::from_bit(self.regs.is_set(Register::Stat, stat::ACKSTAT));
        if ack.is_ack() {
            trace!("sent {=u8:#x}", byte);
        } else {
            self.indicator.set_low();
            warn!("byte {=u8:#x} not acknowledged", byte);
        }
        Ok(ack)
    }

    /// Receive one byte
    ///
    /// Must be followed by [`ack`](Self::ack) or [`nack`](Self::nack).
    pub fn recv(&mut self) -> Result<u8, BusError> {
        let next = self.check(BusOp::Read)?;
        self.regs.set_bits(Register::Con, con::RCEN);
        self.wait_set(Register::Stat, stat::RBF, Condition::Receive)?;
        self.state = next;
        Ok((self.regs.read(Register::Rcv) & 0xFF) as u8)
    }

    /// Answer the byte just received with ACK or NACK
    pub fn acknowledge(&mut self, value: Acknowledge) -> Result<(), BusError> {
        let op = match value {
            Acknowledge::Ack => BusOp::Ack,
            Acknowledge::Nack => BusOp::Nack,
        };
        let next = self.check(op)?;

        if value.bit() {
            self.regs.set_bits(Register::Con, con::ACKDT);
        } else {
            self.regs.clear_bits(Register::Con, con::ACKDT);
        }
        self.regs.set_bits(Register::Con, con::ACKEN);
        self.wait_clear(Register::Con, con::ACKEN, Condition::Acknowledge)?;
        self.state = next;
        Ok(())
    }

    /// Request another byte from the peer
    pub fn ack(&mut self) -> Result<(), BusError> {
        self.acknowledge(Acknowledge::Ack)
    }

    /// Tell the peer the last byte was the final one
    pub fn nack(&mut self) -> Result<(), BusError> {
        self.acknowledge(Acknowledge::Nack)
    }

    /// Release the bus after a failed transaction
    ///
    /// Sends a stop regardless of the transaction state. A stop that does
    /// not complete is only logged; `setup` resets a wedged module.
    pub fn abort(&mut self) {
        if self.state.is_idle() {
            return;
        }

        self.regs.set_bits(Register::Con, con::PEN);
        if self
            .wait_clear(Register::Con, con::PEN, Condition::Stop)
            .is_err()
        {
            warn!("bus not released after abort");
        }
        self.state = BusState::Stopped;
    }

    /// Read `buf.len()` consecutive registers starting at `register`
    pub fn read_multiple(
        &mut self,
        address: u8,
        register: u8,
        buf: &mut [u8],
    ) -> Result<(), BusError> {
        I2cBus::write_read(self, address, &[register], buf)
    }

    /// Read a single register
    pub fn get_register(&mut self, address: u8, register: u8) -> Result<u8, BusError> {
        let mut value = [0u8];
        self.read_multiple(address, register, &mut value)?;
        Ok(value[0])
    }

    /// Write a single register
    pub fn write_register(&mut self, address: u8, register: u8, value: u8) -> Result<(), BusError> {
        I2cBus::write(self, address, &[register, value])
    }

    /// Run `body` inside start ... stop, aborting on error
    ///
    /// `body` must leave the bus in a state that allows a stop.
    pub(crate) fn run_transaction<T>(
        &mut self,
        body: impl FnOnce(&mut Self) -> Result<T, BusError>,
    ) -> Result<T, BusError> {
        self.start()?;

        let result = body(self).and_then(|value| {
            self.stop()?;
            Ok(value)
        });
        if let Err(e) = &result {
            debug!("transaction failed: {}", e);
            self.abort();
        }
        result
    }

    /// Send a byte and apply the acknowledge policy
    pub(crate) fn send_checked(&mut self, byte: u8, source: NackSource) -> Result<(), BusError> {
        match (self.send(byte)?, self.config.ack_policy) {
            (Acknowledge::Ack, _) | (Acknowledge::Nack, AckPolicy::Continue) => Ok(()),
            (Acknowledge::Nack, AckPolicy::Abort) => Err(BusError::Nack(source)),
        }
    }

    /// Receive into `buf`, NACKing the final byte only if `last_run`
    pub(crate) fn receive_into(&mut self, buf: &mut [u8], last_run: bool) -> Result<(), BusError> {
        let final_index = buf.len().saturating_sub(1);
        for (i, slot) in buf.iter_mut().enumerate() {
            *slot = self.recv()?;
            if last_run && i == final_index {
                self.nack()?;
            } else {
                self.ack()?;
            }
        }
        Ok(())
    }

    fn check(&self, op: BusOp) -> Result<BusState, BusError> {
        self.state.transition(op).map_err(|e| {
            warn!("{} rejected in state {}", op, self.state);
            e
        })
    }

    fn wait_clear(&mut self, reg: Register, mask: u32, condition: Condition) -> Result<(), BusError> {
        self.wait(reg, mask, false, condition)
    }

    fn wait_set(&mut self, reg: Register, mask: u32, condition: Condition) -> Result<(), BusError> {
        self.wait(reg, mask, true, condition)
    }

    /// Poll until `mask` reads as `until_set`, at most `poll_limit` reads
    fn wait(
        &mut self,
        reg: Register,
        mask: u32,
        until_set: bool,
        condition: Condition,
    ) -> Result<(), BusError> {
        for _ in 0..self.config.poll_limit {
            if self.regs.is_set(reg, mask) == until_set {
                return Ok(());
            }
        }
        warn!("timed out waiting for {}", condition);
        Err(BusError::Timeout(condition))
    }
}

impl<R: RegisterAccess, L: OutputPin> I2cBus for I2cMaster<R, L> {
    type Error = BusError;

    fn write(&mut self, address: u8, data: &[u8]) -> Result<(), BusError> {
        let addr_w = address_byte(address, Direction::Write)?;

        self.run_transaction(|m| {
            m.send_checked(addr_w, NackSource::Address(addr_w))?;
            for &byte in data {
                m.send_checked(byte, NackSource::Data(byte))?;
            }
            Ok(())
        })
    }

    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), BusError> {
        if buf.is_empty() {
            return Err(BusError::EmptyRead);
        }
        let addr_r = address_byte(address, Direction::Read)?;

        self.run_transaction(|m| {
            m.send_checked(addr_r, NackSource::Address(addr_r))?;
            m.receive_into(buf, true)
        })
    }

    fn write_read(
        &mut self,
        address: u8,
        write_data: &[u8],
        read_buf: &mut [u8],
    ) -> Result<(), BusError> {
        if read_buf.is_empty() {
            return Err(BusError::EmptyRead);
        }
        let addr_w = address_byte(address, Direction::Write)?;
        let addr_r = address_byte(address, Direction::Read)?;

        self.run_transaction(|m| {
            m.send_checked(addr_w, NackSource::Address(addr_w))?;
            for &byte in write_data {
                m.send_checked(byte, NackSource::Data(byte))?;
            }
            m.restart()?;
            m.send_checked(addr_r, NackSource::Address(addr_r))?;
            m.receive_into(read_buf, true)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imubus_hal::sim::{BusEvent, SimPin, SimRegisters};
    use proptest::prelude::*;

    const ADDR: u8 = 0x6B;
    const ADDR_W: u8 = 0xD6;
    const ADDR_R: u8 = 0xD7;

    type SimMaster = I2cMaster<SimRegisters, SimPin>;

    fn master_with(sim: SimRegisters, config: I2cConfig) -> SimMaster {
        let mut master = I2cMaster::new(sim, SimPin::default(), config);
        master.setup().unwrap();
        master
    }

    fn master() -> SimMaster {
        master_with(SimRegisters::new(), I2cConfig::default())
    }

    fn quick_timeout() -> I2cConfig {
        I2cConfig {
            poll_limit: 50,
            ..I2cConfig::default()
        }
    }

    #[test]
    fn test_setup_configures_peripheral() {
        let m = master();
        let sim = m.registers();

        assert_eq!(sim.peek(Register::Brg), 53);
        // Only RB2/RB3 switched to digital
        assert_eq!(sim.peek(Register::AnselB), 0xFFF3);
        assert_ne!(sim.peek(Register::Con) & con::ON, 0);
        assert!(m.indicator().is_set_high());
        assert_eq!(m.state(), BusState::Idle);
        assert!(sim.trace().is_empty());
    }

    #[test]
    fn test_setup_rejects_bad_divisor() {
        let config = I2cConfig {
            frequency_hz: 1_000,
            ..I2cConfig::default()
        };
        let mut m = I2cMaster::new(SimRegisters::new(), SimPin::default(), config);

        assert_eq!(m.setup(), Err(BusError::InvalidConfig));
        assert_eq!(m.registers().peek(Register::Brg), 0);
        assert_eq!(m.registers().peek(Register::Con), 0);
    }

    #[test]
    fn test_peripheral_off_times_out() {
        // Without setup the module ignores SEN and it never clears
        let mut m = I2cMaster::new(SimRegisters::new(), SimPin::default(), quick_timeout());

        assert_eq!(m.start(), Err(BusError::Timeout(Condition::Start)));
        assert_eq!(m.state(), BusState::Idle);
    }

    #[test]
    fn test_wait_exits_on_the_transition() {
        for latency in [0, 1, 5, 40] {
            let mut m = master_with(SimRegisters::with_latency(latency), I2cConfig::default());

            m.start().unwrap();
            assert_eq!(m.registers().polls(), latency + 1);

            m.send(ADDR_W).unwrap();
            assert_eq!(m.registers().polls(), latency + 1);

            m.stop().unwrap();
            assert_eq!(m.registers().polls(), latency + 1);
            assert!(!m.registers().is_busy());
        }
    }

    #[test]
    fn test_receive_wait_exits_on_rbf() {
        let mut m = master_with(SimRegisters::with_latency(7), I2cConfig::default());
        m.registers_mut().queue_responses(&[0x42]);

        m.start().unwrap();
        m.send(ADDR_R).unwrap();
        assert_eq!(m.recv(), Ok(0x42));
        assert_eq!(m.registers().polls(), 8);
        m.nack().unwrap();
        assert_eq!(m.registers().polls(), 8);
        m.stop().unwrap();
    }

    #[test]
    fn test_hung_condition_times_out_after_poll_limit() {
        let mut m = master_with(SimRegisters::new(), quick_timeout());

        m.registers_mut().hang_next_operation();
        assert_eq!(m.start(), Err(BusError::Timeout(Condition::Start)));
        assert_eq!(m.registers().polls(), 50);
        assert_eq!(m.state(), BusState::Idle);
    }

    #[test]
    fn test_setup_recovers_from_hung_start() {
        let mut m = master_with(SimRegisters::new(), quick_timeout());
        m.registers_mut().hang_next_operation();

        assert_eq!(
            m.get_register(ADDR, 0x0F),
            Err(BusError::Timeout(Condition::Start))
        );
        // SEN is still latched, so every transaction would time out
        assert_ne!(m.registers().peek(Register::Con) & con::SEN, 0);

        m.setup().unwrap();
        assert_eq!(m.registers().peek(Register::Con), con::ON);
        assert!(!m.registers().is_busy());

        m.registers_mut().queue_responses(&[0x69]);
        assert_eq!(m.get_register(ADDR, 0x0F), Ok(0x69));
        assert_eq!(m.state(), BusState::Stopped);
    }

    #[test]
    fn test_stop_leaves_stopped_state() {
        let mut m = master();
        m.start().unwrap();
        m.stop().unwrap();
        assert_eq!(m.state(), BusState::Stopped);
        assert!(m.state().is_idle());

        // A new transaction may begin straight away
        m.start().unwrap();
        assert_eq!(m.state(), BusState::Started);
    }

    #[test]
    fn test_hung_transmit_reports_transmit() {
        let mut m = master_with(SimRegisters::new(), quick_timeout());
        m.start().unwrap();

        m.registers_mut().hang_next_operation();
        assert_eq!(m.send(ADDR_W), Err(BusError::Timeout(Condition::Transmit)));
        // The byte never finished, the address phase has not happened
        assert_eq!(m.state(), BusState::Started);
    }

    #[test]
    fn test_primitive_sequence_on_the_wire() {
        let mut m = master();
        m.registers_mut().queue_responses(&[0x11, 0x22]);

        m.start().unwrap();
        assert_eq!(m.send(ADDR_W), Ok(Acknowledge::Ack));
        assert_eq!(m.send(0x28), Ok(Acknowledge::Ack));
        m.restart().unwrap();
        assert_eq!(m.send(ADDR_R), Ok(Acknowledge::Ack));
        assert_eq!(m.recv(), Ok(0x11));
        m.ack().unwrap();
        assert_eq!(m.recv(), Ok(0x22));
        m.nack().unwrap();
        m.stop().unwrap();

        assert_eq!(
            m.registers().trace(),
            &[
                BusEvent::Start,
                BusEvent::Write(ADDR_W),
                BusEvent::Write(0x28),
                BusEvent::Restart,
                BusEvent::Write(ADDR_R),
                BusEvent::Read(0x11),
                BusEvent::Ack,
                BusEvent::Read(0x22),
                BusEvent::Nack,
                BusEvent::Stop,
            ]
        );
        assert_eq!(m.state(), BusState::Stopped);
    }

    #[test]
    fn test_nack_drives_indicator_low_and_continues() {
        let mut m = master();
        m.registers_mut().nack_on(ADDR_W);

        m.start().unwrap();
        assert_eq!(m.send(ADDR_W), Ok(Acknowledge::Nack));
        assert!(m.indicator().is_set_low());
        assert_eq!(m.state(), BusState::Addressed(Direction::Write));

        // Execution carries on with the next primitive
        assert_eq!(m.send(0x10), Ok(Acknowledge::Ack));
        m.stop().unwrap();
        assert_eq!(
            m.registers().trace(),
            &[
                BusEvent::Start,
                BusEvent::Write(ADDR_W),
                BusEvent::Write(0x10),
                BusEvent::Stop,
            ]
        );
        assert_eq!(m.indicator().low_count(), 1);
    }

    #[test]
    fn test_out_of_order_rejected_without_touching_bus() {
        let mut m = master();

        assert_eq!(
            m.send(0x10),
            Err(BusError::OutOfOrder {
                state: BusState::Idle,
                op: BusOp::Write,
            })
        );
        assert!(m.recv().is_err());
        assert!(m.stop().is_err());
        assert!(m.restart().is_err());
        assert!(m.ack().is_err());
        assert!(m.registers().trace().is_empty());

        m.start().unwrap();
        assert!(m.start().is_err());
        m.send(ADDR_W).unwrap();
        // Write-addressed peer cannot be read from
        assert_eq!(
            m.recv(),
            Err(BusError::OutOfOrder {
                state: BusState::Addressed(Direction::Write),
                op: BusOp::Read,
            })
        );
        assert_eq!(
            m.registers().trace(),
            &[BusEvent::Start, BusEvent::Write(ADDR_W)]
        );
    }

    #[test]
    fn test_stop_refused_while_byte_unanswered() {
        let mut m = master();
        m.start().unwrap();
        m.send(ADDR_R).unwrap();
        m.recv().unwrap();

        assert!(m.stop().is_err());
        assert_eq!(m.state(), BusState::AckPending);
        m.nack().unwrap();
        m.stop().unwrap();
    }

    #[test]
    fn test_read_multiple_sequence() {
        let mut m = master();
        m.registers_mut().queue_responses(&[1, 2, 3]);

        let mut buf = [0u8; 3];
        m.read_multiple(ADDR, 0x22, &mut buf).unwrap();

        assert_eq!(buf, [1, 2, 3]);
        assert_eq!(
            m.registers().trace(),
            &[
                BusEvent::Start,
                BusEvent::Write(ADDR_W),
                BusEvent::Write(0x22),
                BusEvent::Restart,
                BusEvent::Write(ADDR_R),
                BusEvent::Read(1),
                BusEvent::Ack,
                BusEvent::Read(2),
                BusEvent::Ack,
                BusEvent::Read(3),
                BusEvent::Nack,
                BusEvent::Stop,
            ]
        );
        assert_eq!(m.state(), BusState::Stopped);
    }

    #[test]
    fn test_get_register_sequence() {
        let mut m = master();
        m.registers_mut().queue_responses(&[0x69]);

        assert_eq!(m.get_register(ADDR, 0x0F), Ok(0x69));

        let sim = m.registers();
        assert_eq!(sim.count(BusEvent::Start), 1);
        assert_eq!(sim.count(BusEvent::Restart), 1);
        assert_eq!(sim.count(BusEvent::Stop), 1);
        assert_eq!(sim.count(BusEvent::Read(0x69)), 1);
        assert_eq!(sim.count(BusEvent::Nack), 1);
        assert_eq!(sim.count(BusEvent::Ack), 0);
    }

    #[test]
    fn test_write_register_sequence() {
        let mut m = master();
        m.write_register(ADDR, 0x10, 0x82).unwrap();

        assert_eq!(
            m.registers().trace(),
            &[
                BusEvent::Start,
                BusEvent::Write(ADDR_W),
                BusEvent::Write(0x10),
                BusEvent::Write(0x82),
                BusEvent::Stop,
            ]
        );
    }

    #[test]
    fn test_plain_read_has_no_restart() {
        let mut m = master();
        m.registers_mut().queue_responses(&[9, 8]);

        let mut buf = [0u8; 2];
        I2cBus::read(&mut m, ADDR, &mut buf).unwrap();

        assert_eq!(buf, [9, 8]);
        assert_eq!(
            m.registers().trace(),
            &[
                BusEvent::Start,
                BusEvent::Write(ADDR_R),
                BusEvent::Read(9),
                BusEvent::Ack,
                BusEvent::Read(8),
                BusEvent::Nack,
                BusEvent::Stop,
            ]
        );
    }

    #[test]
    fn test_empty_read_rejected() {
        let mut m = master();
        assert_eq!(
            m.read_multiple(ADDR, 0x22, &mut []),
            Err(BusError::EmptyRead)
        );
        assert!(m.registers().trace().is_empty());
    }

    #[test]
    fn test_wide_address_rejected_before_start() {
        let mut m = master();
        assert_eq!(
            m.write_register(0x80, 0x10, 0x00),
            Err(BusError::InvalidAddress(0x80))
        );
        assert!(m.registers().trace().is_empty());
    }

    #[test]
    fn test_abort_policy_stops_on_address_nack() {
        let mut m = master();
        m.registers_mut().nack_on(ADDR_W);

        assert_eq!(
            m.get_register(ADDR, 0x0F),
            Err(BusError::Nack(NackSource::Address(ADDR_W)))
        );
        assert_eq!(
            m.registers().trace(),
            &[BusEvent::Start, BusEvent::Write(ADDR_W), BusEvent::Stop]
        );
        assert!(m.indicator().is_set_low());
        assert_eq!(m.state(), BusState::Stopped);
    }

    #[test]
    fn test_abort_policy_stops_on_data_nack() {
        let mut m = master();
        m.registers_mut().nack_on(0x10);

        assert_eq!(
            m.write_register(ADDR, 0x10, 0x82),
            Err(BusError::Nack(NackSource::Data(0x10)))
        );
        assert_eq!(m.registers().count(BusEvent::Write(0x82)), 0);
        assert_eq!(m.registers().count(BusEvent::Stop), 1);
    }

    #[test]
    fn test_continue_policy_completes_transaction() {
        let config = I2cConfig {
            ack_policy: AckPolicy::Continue,
            ..I2cConfig::default()
        };
        let mut m = master_with(SimRegisters::new(), config);
        m.registers_mut().nack_on(ADDR_W);
        m.registers_mut().nack_on(ADDR_R);

        // Nobody drives SDA, so the read returns the idle level
        assert_eq!(m.get_register(ADDR, 0x0F), Ok(0xFF));
        assert_eq!(m.registers().trace().len(), 8);
        assert_eq!(m.indicator().low_count(), 2);
        assert_eq!(m.state(), BusState::Stopped);
    }

    #[test]
    fn test_timeout_mid_transaction_releases_bus() {
        let mut m = master_with(SimRegisters::new(), quick_timeout());
        // start, addr, reg, restart, addr complete; the receive hangs
        m.registers_mut().hang_after(5);

        let mut buf = [0u8; 2];
        assert_eq!(
            m.read_multiple(ADDR, 0x22, &mut buf),
            Err(BusError::Timeout(Condition::Receive))
        );
        assert_eq!(m.registers().trace().last(), Some(&BusEvent::Stop));
        assert_eq!(m.state(), BusState::Stopped);

        // The master is usable again
        m.registers_mut().clear_trace();
        m.registers_mut().queue_responses(&[0x69]);
        assert_eq!(m.get_register(ADDR, 0x0F), Ok(0x69));
    }

    #[test]
    fn test_abort_when_idle_is_noop() {
        let mut m = master();
        m.abort();
        assert!(m.registers().trace().is_empty());
    }

    fn expected_read_trace(address: u8, register: u8, data: &[u8]) -> Vec<BusEvent> {
        let mut trace = vec![
            BusEvent::Start,
            BusEvent::Write(address << 1),
            BusEvent::Write(register),
            BusEvent::Restart,
            BusEvent::Write(address << 1 | 1),
        ];
        for (i, &byte) in data.iter().enumerate() {
            trace.push(BusEvent::Read(byte));
            trace.push(if i + 1 == data.len() {
                BusEvent::Nack
            } else {
                BusEvent::Ack
            });
        }
        trace.push(BusEvent::Stop);
        trace
    }

    proptest! {
        #[test]
        fn prop_read_multiple_wire_sequence(
            address in 0u8..=0x7F,
            register in any::<u8>(),
            data in proptest::collection::vec(any::<u8>(), 1..=64),
        ) {
            let mut m = master();
            prop_assert!(m.registers_mut().queue_responses(&data));

            let mut buf = vec![0u8; data.len()];
            m.read_multiple(address, register, &mut buf).unwrap();

            prop_assert_eq!(&buf, &data);
            let expected = expected_read_trace(address, register, &data);
            prop_assert_eq!(m.registers().trace(), expected.as_slice());
            prop_assert_eq!(m.registers().count(BusEvent::Ack), data.len() - 1);
            prop_assert_eq!(m.registers().count(BusEvent::Nack), 1);
            prop_assert!(!m.registers().trace_overflowed());
        }
    }
}
