use tracing::{debug, trace, warn};

use super::TransmitterPort;
use crate::machine::generic::i2c::BusTarget;
use crate::machine::generic::init::InitCommand;

/// 7-bit bus address of the transmitter (0x98 on the wire).
pub const IT6613_ADDR: u8 = 0x98 >> 1;

const REG_RESET: u8 = 0x04;
const REG_AV_MUTE: u8 = 0xc1;

const RESET_ALL: u8 = 0x20;
const AV_MUTE: u8 = 0x01;

/// Bring-up sequence from the CAT6613/IT6613E programming guide. Entries
/// marked undocumented are kept as-is.
pub const IT6613_INIT: &[InitCommand] = &[
    InitCommand::new(IT6613_ADDR, 0x04, 0x20), // Reset everything
    InitCommand::new(IT6613_ADDR, 0x04, 0x00), // Clear reset
    InitCommand::new(IT6613_ADDR, 0x61, 0x10), // Enable clock ring
    InitCommand::new(IT6613_ADDR, 0xf8, 0xff), // Undocumented
    InitCommand::new(IT6613_ADDR, 0x09, 0xff), // Disable IRQs (0x09-0x0B)
    InitCommand::new(IT6613_ADDR, 0x0a, 0xff),
    InitCommand::new(IT6613_ADDR, 0x0b, 0xff),
    InitCommand::new(IT6613_ADDR, 0x0c, 0xff), // Clear interrupts (0x0C-0x0D)
    InitCommand::new(IT6613_ADDR, 0x0d, 0xff),
    InitCommand::new(IT6613_ADDR, 0xc0, 0x00), // DVI mode
    InitCommand::new(IT6613_ADDR, 0xc1, 0x03), // Mute screen
    InitCommand::new(IT6613_ADDR, 0xc6, 0x03),
    // TODO: pick the driver settings below from the pixel clock rate
    InitCommand::new(IT6613_ADDR, 0x61, 0x03), // REG_DRV_PDRXDET | REG_DRV_TERMON
    InitCommand::new(IT6613_ADDR, 0x62, 0x18), // REG_XP_ER0 | REG_XP_RESETB
    InitCommand::new(IT6613_ADDR, 0x63, 0x10), // Undocumented
    InitCommand::new(IT6613_ADDR, 0x64, 0x04), // Undocumented
    InitCommand::new(IT6613_ADDR, 0xc1, 0x00), // Unmute screen
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Transfer {
    Idle,
    Address,
    Register,
    Data { reg: u8 },
    /// Addressed to someone else, or not acknowledged.
    Ignored,
}

/// Register-level model of the IT6613 HDMI transmitter's control port.
///
/// Powers up held in soft reset with AV mute set. Register writes after the
/// pointer byte auto-increment.
pub struct It6613 {
    regs: [u8; 256],
    pub writes: Vec<(u8, u8)>,
    present: bool,
    reset_pin: bool,
    transfer: Transfer,

    last_vsync: bool,
    pub frames_shown: usize,
}

impl Default for It6613 {
    fn default() -> Self {
        Self::new()
    }
}

impl It6613 {
    pub fn new() -> Self {
        Self {
            regs: power_on_regs(),
            writes: Vec::new(),
            present: true,
            reset_pin: false,
            transfer: Transfer::Idle,
            last_vsync: false,
            frames_shown: 0,
        }
    }

    /// A transmitter that never acknowledges, as if unpowered or absent.
    pub fn absent() -> Self {
        Self {
            present: false,
            ..Self::new()
        }
    }

    pub fn reg(&self, reg: u8) -> u8 {
        self.regs[reg as usize]
    }

    pub fn in_reset(&self) -> bool {
        self.reset_pin || self.reg(REG_RESET) & RESET_ALL != 0
    }

    pub fn muted(&self) -> bool {
        self.reg(REG_AV_MUTE) & AV_MUTE != 0
    }

    /// Out of reset and unmuted: video on the input port reaches the link.
    pub fn configured(&self) -> bool {
        !self.in_reset() && !self.muted()
    }

    /// Drive the hardware reset pin. While asserted the chip ignores the bus
    /// and its registers return to power-on values.
    pub fn set_reset_pin(&mut self, reset: bool) {
        if reset && !self.reset_pin {
            debug!("IT6613: hardware reset asserted");
        }
        self.reset_pin = reset;
        if reset {
            self.regs = power_on_regs();
            self.transfer = Transfer::Idle;
        }
    }

    /// Sample the video input port for one pixel clock.
    pub fn sample(&mut self, port: &TransmitterPort) {
        if port.vsync && !self.last_vsync && self.configured() {
            self.frames_shown += 1;
            trace!("IT6613: frame {}", self.frames_shown);
        }
        self.last_vsync = port.vsync;
    }

    fn write_reg(&mut self, reg: u8, value: u8) {
        trace!("IT6613: reg {reg:02X} = {value:02X}");
        self.writes.push((reg, value));
        if reg == REG_RESET && value & RESET_ALL != 0 {
            self.regs = power_on_regs();
        }
        self.regs[reg as usize] = value;
    }
}

fn power_on_regs() -> [u8; 256] {
    let mut regs = [0; 256];
    regs[REG_RESET as usize] = RESET_ALL;
    regs[REG_AV_MUTE as usize] = AV_MUTE;
    regs
}

impl BusTarget for It6613 {
    fn start(&mut self) {
        self.transfer = Transfer::Address;
    }

    fn write(&mut self, byte: u8) -> bool {
        if self.reset_pin || !self.present {
            self.transfer = Transfer::Ignored;
            return false;
        }
        match self.transfer {
            Transfer::Address => {
                if byte == IT6613_ADDR << 1 {
                    self.transfer = Transfer::Register;
                    true
                } else {
                    self.transfer = Transfer::Ignored;
                    false
                }
            }
            Transfer::Register => {
                self.transfer = Transfer::Data { reg: byte };
                true
            }
            Transfer::Data { reg } => {
                self.write_reg(reg, byte);
                self.transfer = Transfer::Data {
                    reg: reg.wrapping_add(1),
                };
                true
            }
            Transfer::Idle => {
                warn!("IT6613: byte {byte:02X} outside a transaction");
                false
            }
            Transfer::Ignored => false,
        }
    }

    fn stop(&mut self) {
        self.transfer = Transfer::Idle;
    }
}
