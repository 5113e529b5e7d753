use crate::{
    device::{Device, Video},
    interrupts::InterruptFlags,
};

// Line timing in m-cycles (gbdev.io/pandocs/Rendering.html)
const MODE2_CYCLES: u16 = 20; // OAM scan
const MODE3_CYCLES: u16 = 43; // Pixel transfer
pub const LINE_CYCLES: u16 = 114;

const SCREEN_HEIGHT: u8 = 144;
pub const LINES_PER_FRAME: u8 = 154;

/// Machine cycles per video frame.
pub const FRAME_CYCLES: u32 = LINE_CYCLES as u32 * LINES_PER_FRAME as u32;

// LCD modes reported in STAT bits 1..0
const MODE_HBLANK: u8 = 0;
const MODE_VBLANK: u8 = 1;
const MODE_OAM: u8 = 2;
const MODE_TRANSFER: u8 = 3;

// Post-boot register state from gbdev.io/pandocs/Power_Up_State.html
const BOOT_LCDC: u8 = 0x91;
const BOOT_BGP: u8 = 0xFC;

/// Register-level LCD controller.
///
/// Holds LCDC/STAT/SCY/SCX/LY/LYC/DMA/BGP/OBP0/OBP1/WY/WX, walks scanlines
/// and raises the VBlank and STAT interrupts. It does not render pixels.
#[derive(Debug, Clone)]
pub struct Ppu {
    lcdc: u8,
    stat: u8,
    scy: u8,
    scx: u8,
    ly: u8,
    lyc: u8,
    pub dma: u8,
    bgp: u8,
    obp0: u8,
    obp1: u8,
    wy: u8,
    wx: u8,
    mode: u8,
    line_clock: u16,
    stat_irq_line: bool,
    frames: u64,
}

impl Ppu {
    pub fn new() -> Self {
        Self {
            lcdc: BOOT_LCDC,
            stat: 0,
            scy: 0,
            scx: 0,
            ly: 0,
            lyc: 0,
            dma: 0xFF,
            bgp: BOOT_BGP,
            obp0: 0,
            obp1: 0,
            wy: 0,
            wx: 0,
            mode: MODE_OAM,
            line_clock: 0,
            stat_irq_line: false,
            frames: 0,
        }
    }

    pub fn lcd_enabled(&self) -> bool {
        self.lcdc & 0x80 != 0
    }

    pub fn mode(&self) -> u8 {
        self.mode
    }

    /// Completed frames since power-on.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    fn update_stat_irq(&mut self, if_reg: &mut InterruptFlags) {
        let coincidence = self.ly == self.lyc && self.stat & 0x40 != 0;
        let mode_signal = match self.mode {
            MODE_HBLANK => self.stat & 0x08 != 0,
            MODE_VBLANK => self.stat & 0x10 != 0,
            MODE_OAM => self.stat & 0x20 != 0,
            _ => false,
        };
        let current = coincidence || mode_signal;
        if current && !self.stat_irq_line {
            if_reg.insert(InterruptFlags::LCD_STAT);
        }
        self.stat_irq_line = current;
    }
}

impl Default for Ppu {
    fn default() -> Self {
        Self::new()
    }
}

impl Device for Ppu {
    fn read(&self, addr: u16) -> u8 {
        match addr {
            0xFF40 => self.lcdc,
            0xFF41 => {
                (self.stat & 0x78)
                    | 0x80
                    | (self.mode & 0x03)
                    | if self.ly == self.lyc { 0x04 } else { 0 }
            }
            0xFF42 => self.scy,
            0xFF43 => self.scx,
            0xFF44 => self.ly,
            0xFF45 => self.lyc,
            0xFF46 => self.dma,
            0xFF47 => self.bgp,
            0xFF48 => self.obp0,
            0xFF49 => self.obp1,
            0xFF4A => self.wy,
            0xFF4B => self.wx,
            _ => 0xFF,
        }
    }

    fn write(&mut self, addr: u16, val: u8) {
        match addr {
            0xFF40 => {
                self.lcdc = val;
                if !self.lcd_enabled() {
                    self.ly = 0;
                    self.line_clock = 0;
                    self.mode = MODE_HBLANK;
                }
            }
            0xFF41 => self.stat = (self.stat & 0x07) | (val & 0x78),
            0xFF42 => self.scy = val,
            0xFF43 => self.scx = val,
            // LY is read-only.
            0xFF44 => {}
            0xFF45 => self.lyc = val,
            0xFF46 => self.dma = val,
            0xFF47 => self.bgp = val,
            0xFF48 => self.obp0 = val,
            0xFF49 => self.obp1 = val,
            0xFF4A => self.wy = val,
            0xFF4B => self.wx = val,
            _ => {}
        }
    }

    fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Video for Ppu {
    fn step(&mut self, if_reg: &mut InterruptFlags) {
        if !self.lcd_enabled() {
            return;
        }

        self.line_clock += 1;
        if self.line_clock >= LINE_CYCLES {
            self.line_clock = 0;
            self.ly += 1;
            if self.ly == SCREEN_HEIGHT {
                if_reg.insert(InterruptFlags::VBLANK);
            } else if self.ly >= LINES_PER_FRAME {
                self.ly = 0;
                self.frames = self.frames.wrapping_add(1);
            }
        }

        self.mode = if self.ly >= SCREEN_HEIGHT {
            MODE_VBLANK
        } else if self.line_clock < MODE2_CYCLES {
            MODE_OAM
        } else if self.line_clock < MODE2_CYCLES + MODE3_CYCLES {
            MODE_TRANSFER
        } else {
            MODE_HBLANK
        };

        self.update_stat_irq(if_reg);
    }

    fn ly(&self) -> u8 {
        self.ly
    }
}
