use tracing::{debug, info, trace};

use super::i2c::BusCommand;

/// A single register write: `value` into `reg` of the device at the 7-bit
/// address `addr`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InitCommand {
    pub addr: u8,
    pub reg: u8,
    pub value: u8,
}

impl InitCommand {
    pub const fn new(addr: u8, reg: u8, value: u8) -> Self {
        Self { addr, reg, value }
    }

    /// Address byte on the wire: 7-bit address, write direction in bit 0.
    pub const fn addr_byte(&self) -> u8 {
        (self.addr & 0x7f) << 1
    }
}

/// Per-command step of the sequencer. The busy wait after `Stop` is
/// performed by the next command's `WaitBusy`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    WaitBusy,
    Start,
    WaitStart,
    WriteAddr,
    WaitWriteAddr,
    WriteReg,
    WaitWriteReg,
    WriteVal,
    WaitWriteVal,
    Stop,
}

#[cfg(test)]
const PHASES_PER_COMMAND: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeqState {
    /// `cursor == commands.len()` only in `WaitBusy`, draining the last stop.
    Running { cursor: usize, phase: Phase },
    Done,
}

impl SeqState {
    /// Dense numbering of the states for a table of `len` commands.
    #[cfg(test)]
    pub fn index(&self, len: usize) -> usize {
        match *self {
            SeqState::Running { cursor, phase } => cursor * PHASES_PER_COMMAND + phase as usize,
            SeqState::Done => len * PHASES_PER_COMMAND + 1,
        }
    }
}

/// Writes a fixed table of registers through a two-wire master, one command
/// at a time: start, address byte, register, value, stop, each followed by a
/// wait for `busy` to clear.
///
/// There is no timeout. A master that never clears `busy` parks the sequencer
/// in its current wait state forever.
#[derive(Debug)]
pub struct InitSequencer<'a> {
    commands: &'a [InitCommand],
    state: SeqState,
}

impl<'a> InitSequencer<'a> {
    pub fn new(commands: &'a [InitCommand]) -> Self {
        Self {
            commands,
            state: SeqState::Running {
                cursor: 0,
                phase: Phase::WaitBusy,
            },
        }
    }

    pub fn state(&self) -> SeqState {
        self.state
    }

    pub fn done(&self) -> bool {
        self.state == SeqState::Done
    }

    /// The command pulse driven to the master during the current tick.
    pub fn command(&self) -> BusCommand {
        let SeqState::Running { cursor, phase } = self.state else {
            return BusCommand::Idle;
        };
        let Some(cmd) = self.commands.get(cursor) else {
            return BusCommand::Idle;
        };
        match phase {
            Phase::Start => BusCommand::Start,
            Phase::WriteAddr => BusCommand::Write(cmd.addr_byte()),
            Phase::WriteReg => BusCommand::Write(cmd.reg),
            Phase::WriteVal => BusCommand::Write(cmd.value),
            Phase::Stop => BusCommand::Stop,
            _ => BusCommand::Idle,
        }
    }

    /// Advance by one tick, given the master's `busy` as seen this tick.
    pub fn tick(&mut self, busy: bool) {
        let SeqState::Running { cursor, phase } = self.state else {
            return;
        };
        let next = |phase| SeqState::Running { cursor, phase };
        let next = match phase {
            Phase::WaitBusy if busy => return,
            Phase::WaitBusy if cursor == self.commands.len() => SeqState::Done,
            Phase::WaitBusy => next(Phase::Start),
            Phase::Start => next(Phase::WaitStart),
            Phase::WriteAddr => next(Phase::WaitWriteAddr),
            Phase::WriteReg => next(Phase::WaitWriteReg),
            Phase::WriteVal => next(Phase::WaitWriteVal),
            Phase::Stop => {
                let cmd = &self.commands[cursor];
                debug!(
                    "init: command {cursor} done ({:02X}:{:02X} = {:02X})",
                    cmd.addr, cmd.reg, cmd.value
                );
                SeqState::Running {
                    cursor: cursor + 1,
                    phase: Phase::WaitBusy,
                }
            }
            _ if busy => return,
            Phase::WaitStart => next(Phase::WriteAddr),
            Phase::WaitWriteAddr => next(Phase::WriteReg),
            Phase::WaitWriteReg => next(Phase::WriteVal),
            Phase::WaitWriteVal => next(Phase::Stop),
        };
        trace!("init: {:?} -> {:?}", self.state, next);
        if next == SeqState::Done {
            info!("init: {} commands written", self.commands.len());
        }
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use bit_set::BitSet;
    use hex_literal::hex;

    use super::*;
    use crate::machine::generic::i2c::TwoWireMaster;

    const TWO: &[InitCommand] = &[
        InitCommand::new(0x4c, 0x04, 0x20),
        InitCommand::new(0x4c, 0x04, 0x00),
    ];

    /// Holds `busy` for a fixed number of ticks after each pulse, or forever
    /// once `stuck` is set and a pulse arrives.
    #[derive(Default)]
    struct Stub {
        latency: u32,
        remaining: u32,
        stuck: bool,
        log: Vec<BusCommand>,
    }

    impl TwoWireMaster for Stub {
        fn busy(&self) -> bool {
            self.remaining > 0
        }

        fn tick(&mut self, command: BusCommand) {
            self.log.push(command);
            if self.remaining > 0 {
                if !self.stuck {
                    self.remaining -= 1;
                }
            } else if command != BusCommand::Idle {
                self.remaining = if self.stuck { 1 } else { self.latency };
            }
        }
    }

    fn stub(latency: u32) -> Stub {
        Stub {
            latency,
            ..Default::default()
        }
    }

    fn step(seq: &mut InitSequencer, master: &mut Stub) {
        let busy = master.busy();
        let command = seq.command();
        seq.tick(busy);
        master.tick(command);
    }

    /// Ticks until `done` is first observed.
    fn run(seq: &mut InitSequencer, master: &mut Stub) -> usize {
        let mut ticks = 0;
        while !seq.done() {
            step(seq, master);
            ticks += 1;
            assert!(ticks < 1_000_000, "sequencer never finished");
        }
        ticks
    }

    #[test]
    fn test_two_commands_tick_count() {
        for latency in [0, 1, 3, 17] {
            let mut seq = InitSequencer::new(TWO);
            let mut master = stub(latency);
            let expected = 1 + TWO.len() * (5 * latency as usize + 10);
            assert_eq!(run(&mut seq, &mut master), expected, "latency {latency}");
        }
    }

    #[test]
    fn test_distinct_states_before_done() {
        let mut seq = InitSequencer::new(TWO);
        let mut master = stub(2);
        let mut visited = BitSet::new();
        while !seq.done() {
            visited.insert(seq.state().index(TWO.len()));
            step(&mut seq, &mut master);
        }
        assert_eq!(visited.len(), 10 * TWO.len() + 1);
        assert!(!visited.contains(SeqState::Done.index(TWO.len())));
    }

    #[test]
    fn test_done_is_sticky() {
        let mut seq = InitSequencer::new(TWO);
        let mut master = stub(1);
        run(&mut seq, &mut master);
        for _ in 0..1000 {
            step(&mut seq, &mut master);
            assert!(seq.done());
            assert_eq!(seq.command(), BusCommand::Idle);
        }
    }

    #[test]
    fn test_bus_traffic() {
        let mut seq = InitSequencer::new(TWO);
        let mut master = stub(3);
        run(&mut seq, &mut master);

        let pulses: Vec<_> = master
            .log
            .iter()
            .filter(|c| **c != BusCommand::Idle)
            .copied()
            .collect();
        let bytes: Vec<u8> = pulses
            .iter()
            .filter_map(|c| match c {
                BusCommand::Write(b) => Some(*b),
                _ => None,
            })
            .collect();
        assert_eq!(bytes, hex!("98 04 20 98 04 00"));
        assert_eq!(pulses[0], BusCommand::Start);
        assert_eq!(pulses[4], BusCommand::Stop);
        assert_eq!(pulses[5], BusCommand::Start);
        assert_eq!(pulses[9], BusCommand::Stop);
        assert_eq!(pulses.len(), 10);
    }

    #[test]
    fn test_pulses_last_one_tick() {
        let mut seq = InitSequencer::new(TWO);
        let mut master = stub(0);
        run(&mut seq, &mut master);
        // Even with a master that never reports busy, no pulse is repeated
        // on consecutive ticks.
        for pair in master.log.windows(2) {
            assert!(
                pair[0] == BusCommand::Idle || pair[1] == BusCommand::Idle,
                "{pair:?}"
            );
        }
    }

    #[test]
    fn test_stuck_busy_hangs_in_wait_state() {
        let mut seq = InitSequencer::new(TWO);
        let mut master = Stub {
            stuck: true,
            ..Default::default()
        };
        for _ in 0..10_000 {
            step(&mut seq, &mut master);
        }
        assert!(!seq.done());
        assert_eq!(
            seq.state(),
            SeqState::Running {
                cursor: 0,
                phase: Phase::WaitStart
            }
        );
        // The start pulse was issued exactly once and then released.
        let starts = master
            .log
            .iter()
            .filter(|c| **c == BusCommand::Start)
            .count();
        assert_eq!(starts, 1);
    }

    #[test]
    fn test_waits_for_idle_master_before_start() {
        let mut seq = InitSequencer::new(TWO);
        let mut master = Stub {
            remaining: 5,
            ..Default::default()
        };
        for _ in 0..5 {
            step(&mut seq, &mut master);
            assert_eq!(
                seq.state(),
                SeqState::Running {
                    cursor: 0,
                    phase: Phase::WaitBusy
                }
            );
        }
        step(&mut seq, &mut master);
        assert_eq!(
            seq.state(),
            SeqState::Running {
                cursor: 0,
                phase: Phase::Start
            }
        );
    }

    #[test]
    fn test_empty_table() {
        let mut seq = InitSequencer::new(&[]);
        let mut master = stub(1);
        assert_eq!(run(&mut seq, &mut master), 1);
        assert!(master.log.iter().all(|c| *c == BusCommand::Idle));
    }

    #[test]
    fn test_address_byte() {
        assert_eq!(InitCommand::new(0x4c, 0, 0).addr_byte(), 0x98);
        assert_eq!(InitCommand::new(0x7f, 0, 0).addr_byte(), 0xfe);
    }
}
