use crate::interrupts::InterruptFlags;

/// Machine cycles per emulated second (4,194,304 Hz / 4). The CPU's
/// free-running counter wraps at this value.
pub const M_CYCLES_PER_SECOND: u32 = 1 << 20;

/// DIV advances every 64 m-cycles (16,384 Hz).
const DIV_MASK: u32 = 64 - 1;

/// DIV/TIMA/TMA/TAC (gbdev.io/pandocs/Timer_and_Divider_Registers.html).
///
/// Every tick is re-derived from the CPU's free-running cycle counter: a
/// register advances when the counter lands on a multiple of its period.
#[derive(Debug, Clone, Default)]
pub struct Timer {
    /// Divider register
    pub div: u8,
    /// Timer counter
    pub tima: u8,
    /// Timer modulo
    pub tma: u8,
    /// Timer control
    pub tac: u8,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self, addr: u16) -> u8 {
        match addr {
            0xFF04 => self.div,
            0xFF05 => self.tima,
            0xFF06 => self.tma,
            0xFF07 => self.tac | 0xF8,
            _ => 0xFF,
        }
    }

    pub fn write(&mut self, addr: u16, val: u8) {
        match addr {
            // Any write clears the divider.
            0xFF04 => self.reset_div(),
            0xFF05 => self.tima = val,
            0xFF06 => self.tma = val,
            0xFF07 => self.tac = val & 0x07,
            _ => {}
        }
    }

    pub fn reset_div(&mut self) {
        self.div = 0;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn enabled(&self) -> bool {
        self.tac & 0x04 != 0
    }

    /// TIMA period in m-cycles, selected by TAC bits 1..0.
    pub fn tima_period(&self) -> u32 {
        match self.tac & 0x03 {
            0b00 => 256,
            0b01 => 4,
            0b10 => 16,
            _ => 64,
        }
    }

    /// Advance for the machine cycle numbered `counter`.
    pub fn tick(&mut self, counter: u32, if_reg: &mut InterruptFlags) {
        if counter & DIV_MASK == 0 {
            self.div = self.div.wrapping_add(1);
        }

        if self.enabled() && counter & (self.tima_period() - 1) == 0 {
            match self.tima.checked_add(1) {
                Some(next) => self.tima = next,
                None => {
                    self.tima = self.tma;
                    if_reg.insert(InterruptFlags::TIMER);
                }
            }
        }
    }
}
