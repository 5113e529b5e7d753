use log::debug;

use crate::{
    bits::{from_u16, to_u16},
    cartridge::Cartridge,
    device::{Device, Video},
    interrupts::{Interrupt, InterruptFlags},
    ppu::Ppu,
    timer::Timer,
};

const VRAM_SIZE: usize = 0x2000;
const WRAM_SIZE: usize = 0x2000;
const OAM_SIZE: usize = 0xA0;
const HRAM_SIZE: usize = 0x7F;

/// Bytes copied by one OAM DMA transfer.
const OAM_DMA_LEN: u16 = 0xA0;

/// Value read when no cartridge is inserted.
const OPEN_BUS: u8 = 0xFF;

/// Address router for the 16-bit CPU bus (gbdev.io/pandocs/Memory_Map.html).
pub struct Mmu {
    pub vram: [u8; VRAM_SIZE],
    pub wram: [u8; WRAM_SIZE],
    pub oam: [u8; OAM_SIZE],
    pub hram: [u8; HRAM_SIZE],
    pub cart: Option<Cartridge>,
    pub timer: Timer,
    video: Box<dyn Video>,
    pub if_reg: InterruptFlags,
    pub ie_reg: InterruptFlags,
}

impl Mmu {
    /// Bus with the built-in register-level [`Ppu`] and no cartridge.
    pub fn new() -> Self {
        Self::with_video(Box::new(Ppu::new()))
    }

    /// Bus driving a caller-supplied graphics controller.
    pub fn with_video(video: Box<dyn Video>) -> Self {
        Self {
            vram: [0; VRAM_SIZE],
            wram: [0; WRAM_SIZE],
            oam: [0; OAM_SIZE],
            hram: [0; HRAM_SIZE],
            cart: None,
            timer: Timer::new(),
            video,
            if_reg: InterruptFlags::VBLANK,
            ie_reg: InterruptFlags::empty(),
        }
    }

    pub fn load_cart(&mut self, cart: Cartridge) {
        self.cart = Some(cart);
    }

    pub fn video(&self) -> &dyn Video {
        self.video.as_ref()
    }

    pub fn read_byte(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x7FFF | 0xA000..=0xBFFF => {
                self.cart.as_ref().map(|c| c.read(addr)).unwrap_or(OPEN_BUS)
            }
            0x8000..=0x9FFF => self.vram[(addr - 0x8000) as usize],
            0xC000..=0xDFFF => self.wram[(addr - 0xC000) as usize],
            // Echo RAM: same cells as 0xC000-0xDDFF.
            0xE000..=0xFDFF => self.wram[(addr - 0xE000) as usize],
            0xFE00..=0xFE9F => self.oam[(addr - 0xFE00) as usize],
            0xFEA0..=0xFEFF => {
                debug!("read from unusable address {addr:04X}");
                0
            }
            0xFF00..=0xFF7F => self.read_io(addr),
            0xFF80..=0xFFFE => self.hram[(addr - 0xFF80) as usize],
            0xFFFF => self.ie_reg.bits(),
        }
    }

    pub fn write_byte(&mut self, addr: u16, val: u8) {
        match addr {
            0x0000..=0x7FFF | 0xA000..=0xBFFF => {
                if let Some(cart) = self.cart.as_mut() {
                    cart.write(addr, val);
                }
            }
            0x8000..=0x9FFF => self.vram[(addr - 0x8000) as usize] = val,
            0xC000..=0xDFFF => self.wram[(addr - 0xC000) as usize] = val,
            0xE000..=0xFDFF => self.wram[(addr - 0xE000) as usize] = val,
            0xFE00..=0xFE9F => self.oam[(addr - 0xFE00) as usize] = val,
            0xFEA0..=0xFEFF => {
                debug!("dropped write {val:02X} to unusable address {addr:04X}");
            }
            0xFF00..=0xFF7F => self.write_io(addr, val),
            0xFF80..=0xFFFE => self.hram[(addr - 0xFF80) as usize] = val,
            0xFFFF => self.ie_reg = InterruptFlags::from_bits_retain(val),
        }
    }

    /// Little-endian 16-bit read.
    pub fn read_word(&self, addr: u16) -> u16 {
        let lo = self.read_byte(addr);
        let hi = self.read_byte(addr.wrapping_add(1));
        to_u16(hi, lo)
    }

    /// Little-endian 16-bit write.
    pub fn write_word(&mut self, addr: u16, val: u16) {
        let (hi, lo) = from_u16(val);
        self.write_byte(addr, lo);
        self.write_byte(addr.wrapping_add(1), hi);
    }

    fn read_io(&self, addr: u16) -> u8 {
        match addr {
            0xFF04..=0xFF07 => self.timer.read(addr),
            0xFF0F => self.if_reg.bits() | 0xE0,
            0xFF40..=0xFF4B => self.video.read(addr),
            _ => {
                debug!("read from unsupported I/O register {addr:04X}");
                0
            }
        }
    }

    fn write_io(&mut self, addr: u16, val: u8) {
        match addr {
            0xFF04..=0xFF07 => self.timer.write(addr, val),
            0xFF0F => self.if_reg = InterruptFlags::from_bits_truncate(val),
            0xFF46 => {
                self.video.write(addr, val);
                self.oam_dma(val);
            }
            0xFF40..=0xFF4B => self.video.write(addr, val),
            _ => debug!("write {val:02X} to unsupported I/O register {addr:04X}"),
        }
    }

    /// Copy 160 bytes from `page << 8` into OAM.
    fn oam_dma(&mut self, page: u8) {
        let src = (page as u16) << 8;
        for i in 0..OAM_DMA_LEN {
            self.oam[i as usize] = self.read_byte(src.wrapping_add(i));
        }
    }

    /// Sources that are both enabled and requested.
    pub fn pending_interrupts(&self) -> InterruptFlags {
        self.ie_reg & self.if_reg
    }

    pub fn interrupt_pending(&self) -> bool {
        !self.pending_interrupts().is_empty()
    }

    pub fn request_interrupt(&mut self, source: Interrupt) {
        self.if_reg.insert(source.flag());
    }

    pub fn clear_interrupt(&mut self, source: Interrupt) {
        self.if_reg.remove(source.flag());
    }

    /// Advance the timer and graphics controller for machine cycle `counter`.
    pub fn step(&mut self, counter: u32) {
        self.timer.tick(counter, &mut self.if_reg);
        self.video.step(&mut self.if_reg);
    }

    pub fn reset_div(&mut self) {
        self.timer.reset_div();
    }

    /// Clear internal RAM and return every device to its post-boot state.
    /// The cartridge stays inserted and keeps its external RAM.
    pub fn reset(&mut self) {
        self.vram.fill(0);
        self.wram.fill(0);
        self.oam.fill(0);
        self.hram.fill(0);
        self.timer.reset();
        self.video.reset();
        if let Some(cart) = self.cart.as_mut() {
            cart.reset();
        }
        self.if_reg = InterruptFlags::VBLANK;
        self.ie_reg = InterruptFlags::empty();
    }
}

impl Default for Mmu {
    fn default() -> Self {
        Self::new()
    }
}
