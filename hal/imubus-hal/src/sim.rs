//! Simulated I2C peripheral
//!
//! [`SimRegisters`] behaves like the I2C2 register block closely enough for
//! the master's sequencing to run unmodified: setting a control bit
//! schedules the matching bus condition, the status bit flips after a
//! configurable number of polls, and every condition is recorded as a
//! [`BusEvent`] so tests can check the exact wire sequence.
//!
//! Storage is fixed-capacity (`heapless`), so the simulator also builds
//! for the target.

use heapless::{Deque, Vec};

use crate::gpio::OutputPin;
use crate::regs::{con, stat, Register, RegisterAccess};

/// Maximum number of recorded bus events
pub const TRACE_CAPACITY: usize = 256;

/// Maximum number of queued peer responses
pub const RESPONSE_CAPACITY: usize = 64;

/// Default number of busy polls before a condition completes
pub const DEFAULT_LATENCY: u32 = 3;

/// Byte returned when the peer has nothing queued (SDA idles high)
pub const IDLE_BYTE: u8 = 0xFF;

/// Something that happened on the simulated wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusEvent {
    /// Start condition
    Start,
    /// Repeated start condition
    Restart,
    /// Stop condition
    Stop,
    /// Byte clocked out by the master
    Write(u8),
    /// Byte clocked in from the peer
    Read(u8),
    /// Master acknowledged a received byte
    Ack,
    /// Master declined a received byte
    Nack,
}

/// Hardware operation in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Start,
    Restart,
    Stop,
    Transmit,
    Receive,
    Acknowledge,
}

impl Operation {
    /// Register the master polls while this operation runs
    fn status_register(self) -> Register {
        match self {
            Operation::Transmit | Operation::Receive => Register::Stat,
            _ => Register::Con,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    op: Operation,
    remaining: u32,
    hung: bool,
}

/// Simulated I2C2 register block with a scripted peer
#[derive(Debug)]
pub struct SimRegisters {
    con: u32,
    stat: u32,
    trn: u32,
    rcv: u32,
    brg: u32,
    anselb: u32,
    latency: u32,
    pending: Option<Pending>,
    hang_countdown: Option<u32>,
    polls: u32,
    responses: Deque<u8, RESPONSE_CAPACITY>,
    nack_bytes: Vec<u8, 8>,
    trace: Vec<BusEvent, TRACE_CAPACITY>,
    trace_overflowed: bool,
}

impl Default for SimRegisters {
    fn default() -> Self {
        Self::new()
    }
}

impl SimRegisters {
    /// Create a simulator in reset state with [`DEFAULT_LATENCY`]
    pub fn new() -> Self {
        Self::with_latency(DEFAULT_LATENCY)
    }

    /// Create a simulator whose conditions complete after `latency` busy polls
    pub fn with_latency(latency: u32) -> Self {
        Self {
            con: 0,
            stat: 0,
            trn: 0,
            rcv: 0,
            brg: 0,
            // Reset value: every port B pin is analog
            anselb: 0xFFFF,
            latency,
            pending: None,
            hang_countdown: None,
            polls: 0,
            responses: Deque::new(),
            nack_bytes: Vec::new(),
            trace: Vec::new(),
            trace_overflowed: false,
        }
    }

    /// Queue bytes the peer will return, in order
    ///
    /// Returns `false` if the queue filled up before all bytes fit.
    pub fn queue_responses(&mut self, bytes: &[u8]) -> bool {
        bytes.iter().all(|&b| self.responses.push_back(b).is_ok())
    }

    /// Make the peer NACK whenever `byte` is transmitted
    pub fn nack_on(&mut self, byte: u8) -> bool {
        self.nack_bytes.push(byte).is_ok()
    }

    /// The next scheduled operation never completes
    pub fn hang_next_operation(&mut self) {
        self.hang_after(0);
    }

    /// Let `operations` more operations complete, then hang the one after
    pub fn hang_after(&mut self, operations: u32) {
        self.hang_countdown = Some(operations);
    }

    /// Register value without read side effects
    pub fn peek(&self, reg: Register) -> u32 {
        match reg {
            Register::Con => self.con,
            Register::Stat => self.stat,
            Register::Trn => self.trn,
            Register::Rcv => self.rcv,
            Register::Brg => self.brg,
            Register::AnselB => self.anselb,
        }
    }

    /// Status polls observed by the most recent operation
    pub fn polls(&self) -> u32 {
        self.polls
    }

    /// Whether an operation is still in flight
    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// Recorded wire events
    pub fn trace(&self) -> &[BusEvent] {
        &self.trace
    }

    /// Number of recorded events equal to `event`
    pub fn count(&self, event: BusEvent) -> usize {
        self.trace.iter().filter(|&&e| e == event).count()
    }

    /// Whether events were dropped because the trace was full
    pub fn trace_overflowed(&self) -> bool {
        self.trace_overflowed
    }

    /// Forget recorded events
    pub fn clear_trace(&mut self) {
        self.trace.clear();
        self.trace_overflowed = false;
    }

    fn record(&mut self, event: BusEvent) {
        if self.trace.push(event).is_err() {
            self.trace_overflowed = true;
        }
    }

    fn schedule(&mut self, op: Operation) {
        let hung = match self.hang_countdown {
            Some(0) => {
                self.hang_countdown = None;
                true
            }
            Some(n) => {
                self.hang_countdown = Some(n - 1);
                false
            }
            None => false,
        };

        self.polls = 0;
        self.pending = Some(Pending {
            op,
            remaining: self.latency,
            hung,
        });
    }

    fn complete(&mut self, op: Operation) {
        match op {
            Operation::Start => self.con &= !con::SEN,
            Operation::Restart => self.con &= !con::RSEN,
            // A stop resets the sequencer, including a receive that never finished
            Operation::Stop => self.con &= !con::REQUESTS,
            Operation::Acknowledge => self.con &= !con::ACKEN,
            Operation::Transmit => self.stat &= !stat::TRSTAT,
            Operation::Receive => {
                self.con &= !con::RCEN;
                self.stat |= stat::RBF;
            }
        }
    }

    /// Advance the in-flight operation if `reg` is its status register
    fn poll(&mut self, reg: Register) {
        let Some(mut pending) = self.pending else {
            return;
        };
        if pending.op.status_register() != reg {
            return;
        }

        self.polls += 1;
        if pending.hung {
            return;
        }
        if pending.remaining == 0 {
            self.pending = None;
            self.complete(pending.op);
        } else {
            pending.remaining -= 1;
            self.pending = Some(pending);
        }
    }

    fn write_con(&mut self, value: u32) {
        let rising = value & !self.con;
        let was_on = self.con & con::ON != 0;
        self.con = value;

        // Control requests are ignored while the module is off
        if self.con & con::ON == 0 {
            if was_on {
                self.reset_sequencer();
            }
            return;
        }

        if rising & con::SEN != 0 {
            self.record(BusEvent::Start);
            self.schedule(Operation::Start);
        } else if rising & con::RSEN != 0 {
            self.record(BusEvent::Restart);
            self.schedule(Operation::Restart);
        } else if rising & con::PEN != 0 {
            self.record(BusEvent::Stop);
            self.schedule(Operation::Stop);
        } else if rising & con::RCEN != 0 {
            let byte = self.responses.pop_front().unwrap_or(IDLE_BYTE);
            self.rcv = u32::from(byte);
            self.record(BusEvent::Read(byte));
            self.schedule(Operation::Receive);
        } else if rising & con::ACKEN != 0 {
            if self.con & con::ACKDT != 0 {
                self.record(BusEvent::Nack);
            } else {
                self.record(BusEvent::Ack);
            }
            self.schedule(Operation::Acknowledge);
        }
    }

    /// Switching the module off abandons whatever was in flight
    fn reset_sequencer(&mut self) {
        self.pending = None;
        self.con &= !con::REQUESTS;
        self.stat &= !(stat::TRSTAT | stat::RBF);
    }

    fn write_trn(&mut self, value: u32) {
        self.trn = value & 0xFF;
        if self.con & con::ON == 0 {
            return;
        }

        let byte = self.trn as u8;
        self.record(BusEvent::Write(byte));
        self.stat |= stat::TRSTAT;
        if self.nack_bytes.contains(&byte) {
            self.stat |= stat::ACKSTAT;
        } else {
            self.stat &= !stat::ACKSTAT;
        }
        self.schedule(Operation::Transmit);
    }
}

impl RegisterAccess for SimRegisters {
    fn read(&mut self, reg: Register) -> u32 {
        self.poll(reg);
        let value = self.peek(reg);
        if reg == Register::Rcv {
            self.stat &= !stat::RBF;
        }
        value
    }

    fn write(&mut self, reg: Register, value: u32) {
        match reg {
            Register::Con => self.write_con(value),
            Register::Trn => self.write_trn(value),
            Register::Brg => self.brg = value,
            Register::AnselB => self.anselb = value,
            // Status and receive buffer are read-only
            Register::Stat | Register::Rcv => {}
        }
    }
}

/// Output pin that remembers its level and how often it was pulled low
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimPin {
    high: bool,
    low_count: u32,
}

impl SimPin {
    /// Create a pin that starts high
    pub fn new_high() -> Self {
        Self {
            high: true,
            low_count: 0,
        }
    }

    /// Number of `set_low` calls so far
    pub fn low_count(&self) -> u32 {
        self.low_count
    }
}

impl OutputPin for SimPin {
    fn set_high(&mut self) {
        self.high = true;
    }

    fn set_low(&mut self) {
        self.high = false;
        self.low_count += 1;
    }

    fn is_set_high(&self) -> bool {
        self.high
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled() -> SimRegisters {
        let mut sim = SimRegisters::with_latency(2);
        sim.write(Register::Con, con::ON);
        sim
    }

    #[test]
    fn test_start_bit_clears_after_latency() {
        let mut sim = enabled();
        sim.set_bits(Register::Con, con::SEN);
        assert_eq!(sim.trace(), &[BusEvent::Start]);

        // Two busy polls, the third observes completion
        assert!(sim.is_set(Register::Con, con::SEN));
        assert!(sim.is_set(Register::Con, con::SEN));
        assert!(!sim.is_set(Register::Con, con::SEN));
        assert_eq!(sim.polls(), 3);
        assert!(!sim.is_busy());
    }

    #[test]
    fn test_disabled_module_ignores_requests() {
        let mut sim = SimRegisters::new();
        sim.set_bits(Register::Con, con::SEN);
        assert!(sim.trace().is_empty());
        assert!(!sim.is_busy());
        assert!(sim.is_set(Register::Con, con::SEN));
    }

    #[test]
    fn test_transmit_and_scripted_nack() {
        let mut sim = enabled();
        assert!(sim.nack_on(0xD6));

        sim.write(Register::Trn, 0xD6);
        assert!(sim.is_set(Register::Stat, stat::TRSTAT));
        while sim.is_set(Register::Stat, stat::TRSTAT) {}
        assert!(sim.is_set(Register::Stat, stat::ACKSTAT));

        sim.write(Register::Trn, 0x10);
        while sim.is_set(Register::Stat, stat::TRSTAT) {}
        assert!(!sim.is_set(Register::Stat, stat::ACKSTAT));

        assert_eq!(sim.trace(), &[BusEvent::Write(0xD6), BusEvent::Write(0x10)]);
    }

    #[test]
    fn test_receive_fills_buffer_then_read_clears_rbf() {
        let mut sim = enabled();
        assert!(sim.queue_responses(&[0x69]));

        sim.set_bits(Register::Con, con::RCEN);
        while !sim.is_set(Register::Stat, stat::RBF) {}
        assert_eq!(sim.peek(Register::Con) & con::RCEN, 0);
        assert_eq!(sim.read(Register::Rcv), 0x69);
        assert_eq!(sim.peek(Register::Stat) & stat::RBF, 0);

        // Empty queue reads an idle-high bus
        sim.set_bits(Register::Con, con::RCEN);
        while !sim.is_set(Register::Stat, stat::RBF) {}
        assert_eq!(sim.read(Register::Rcv), u32::from(IDLE_BYTE));
    }

    #[test]
    fn test_ack_and_nack_follow_ackdt() {
        let mut sim = enabled();
        sim.clear_bits(Register::Con, con::ACKDT);
        sim.set_bits(Register::Con, con::ACKEN);
        while sim.is_set(Register::Con, con::ACKEN) {}

        sim.set_bits(Register::Con, con::ACKDT);
        sim.set_bits(Register::Con, con::ACKEN);
        while sim.is_set(Register::Con, con::ACKEN) {}

        assert_eq!(sim.trace(), &[BusEvent::Ack, BusEvent::Nack]);
    }

    #[test]
    fn test_hung_operation_never_completes() {
        let mut sim = enabled();
        sim.hang_next_operation();
        sim.set_bits(Register::Con, con::PEN);
        for _ in 0..1000 {
            assert!(sim.is_set(Register::Con, con::PEN));
        }
        assert_eq!(sim.polls(), 1000);
    }

    #[test]
    fn test_hang_after_skips_earlier_operations() {
        let mut sim = enabled();
        sim.hang_after(1);

        sim.set_bits(Register::Con, con::SEN);
        while sim.is_set(Register::Con, con::SEN) {}

        sim.write(Register::Trn, 0xD6);
        for _ in 0..100 {
            assert!(sim.is_set(Register::Stat, stat::TRSTAT));
        }

        // A new request replaces the hung one
        sim.set_bits(Register::Con, con::PEN);
        while sim.is_set(Register::Con, con::PEN) {}
        assert_eq!(
            sim.trace(),
            &[BusEvent::Start, BusEvent::Write(0xD6), BusEvent::Stop]
        );
    }

    #[test]
    fn test_stop_clears_stuck_receive() {
        let mut sim = enabled();
        sim.hang_next_operation();
        sim.set_bits(Register::Con, con::RCEN);

        sim.set_bits(Register::Con, con::PEN);
        while sim.is_set(Register::Con, con::PEN) {}
        assert_eq!(sim.peek(Register::Con), con::ON);

        // RCEN can rise again
        assert!(sim.queue_responses(&[0x5A]));
        sim.set_bits(Register::Con, con::RCEN);
        while !sim.is_set(Register::Stat, stat::RBF) {}
        assert_eq!(sim.read(Register::Rcv), 0x5A);
    }

    #[test]
    fn test_module_off_cancels_hung_start() {
        let mut sim = enabled();
        sim.hang_next_operation();
        sim.set_bits(Register::Con, con::SEN);
        for _ in 0..10 {
            assert!(sim.is_set(Register::Con, con::SEN));
        }

        sim.clear_bits(Register::Con, con::ON);
        assert!(!sim.is_busy());
        assert_eq!(sim.peek(Register::Con), 0);

        sim.set_bits(Register::Con, con::ON);
        sim.set_bits(Register::Con, con::SEN);
        while sim.is_set(Register::Con, con::SEN) {}
        assert_eq!(sim.trace(), &[BusEvent::Start, BusEvent::Start]);
    }

    #[test]
    fn test_sim_pin_counts_low_edges() {
        let mut pin = SimPin::new_high();
        pin.set_low();
        pin.set_high();
        pin.set_low();
        assert!(pin.is_set_low());
        assert_eq!(pin.low_count(), 2);
    }
}
