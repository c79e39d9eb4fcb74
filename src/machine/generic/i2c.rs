use tracing::{debug, trace, warn};

/// A single-tick command pulse presented to a two-wire master. At most one
/// command can be pulsed per tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BusCommand {
    #[default]
    Idle,
    Start,
    Write(u8),
    Stop,
}

/// Command-level view of a two-wire (I2C) bus master.
///
/// Completion is signalled only by `busy` falling. Acknowledge status is not
/// part of this interface.
pub trait TwoWireMaster {
    /// True while a start, write or stop is in flight.
    fn busy(&self) -> bool;

    /// Advance by one tick, sampling this tick's command pulse.
    fn tick(&mut self, command: BusCommand);
}

/// A device on the bus, seen at the granularity of whole bus operations.
pub trait BusTarget {
    fn start(&mut self);

    /// Returns true if the byte was acknowledged.
    fn write(&mut self, byte: u8) -> bool;

    fn stop(&mut self);
}

/// Bus bit periods taken by each operation. A write carries eight data bits
/// and the acknowledge slot.
const START_BITS: u32 = 1;
const WRITE_BITS: u32 = 9;
const STOP_BITS: u32 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Idle,
    Busy { command: BusCommand, remaining: u32 },
}

/// Command-level model of a two-wire master with a fixed bit period.
///
/// A pulse seen while idle is latched and `busy` reads true from the next
/// tick for the whole operation. The operation takes effect on the attached
/// [`BusTarget`] on its last busy tick.
pub struct I2cInitiator<T> {
    target: T,
    period: u32,
    state: State,
    pub op_count: usize,
    pub nack_count: usize,
}

impl<T: BusTarget> I2cInitiator<T> {
    /// `period` is the bus bit period in ticks (the clock divisor).
    pub fn new(target: T, period: u32) -> Self {
        Self {
            target,
            period: period.max(1),
            state: State::Idle,
            op_count: 0,
            nack_count: 0,
        }
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut T {
        &mut self.target
    }

    /// Busy duration of `command` in ticks.
    pub fn duration(&self, command: BusCommand) -> u32 {
        let bits = match command {
            BusCommand::Idle => 0,
            BusCommand::Start => START_BITS,
            BusCommand::Write(_) => WRITE_BITS,
            BusCommand::Stop => STOP_BITS,
        };
        bits * self.period
    }

    fn complete(&mut self, command: BusCommand) {
        self.op_count += 1;
        match command {
            BusCommand::Idle => {}
            BusCommand::Start => self.target.start(),
            BusCommand::Write(byte) => {
                if self.target.write(byte) {
                    debug!("I2C: wrote {byte:02X}, ACK");
                } else {
                    self.nack_count += 1;
                    warn!("I2C: wrote {byte:02X}, NACK");
                }
            }
            BusCommand::Stop => self.target.stop(),
        }
    }
}

impl<T: BusTarget> TwoWireMaster for I2cInitiator<T> {
    fn busy(&self) -> bool {
        matches!(self.state, State::Busy { .. })
    }

    fn tick(&mut self, command: BusCommand) {
        match self.state {
            State::Idle => {
                if command != BusCommand::Idle {
                    trace!("I2C: latched {command:?}");
                    self.state = State::Busy {
                        command,
                        remaining: self.duration(command),
                    };
                }
            }
            State::Busy {
                command: in_flight,
                remaining,
            } => {
                if command != BusCommand::Idle {
                    warn!("I2C: {command:?} ignored, {in_flight:?} still in flight");
                }
                if remaining <= 1 {
                    self.complete(in_flight);
                    self.state = State::Idle;
                } else {
                    self.state = State::Busy {
                        command: in_flight,
                        remaining: remaining - 1,
                    };
                }
            }
        }
    }
}
