//! Cartridge memory bank controllers.

use crate::device::Device;

pub const ROM_BANK_SIZE: usize = 0x4000;
pub const RAM_BANK_SIZE: usize = 0x2000;

/// Value returned for reads that hit no backing byte (disabled RAM, missing
/// bank data).
const DEFAULT_READ: u8 = 0x00;

/// Bank controllers this core can drive.
#[derive(Debug)]
pub enum Mbc {
    NoBanking(NoBanking),
    Type1(Mbc1),
}

impl Mbc {
    pub fn rom_banks(&self) -> usize {
        match self {
            Mbc::NoBanking(_) => 2,
            Mbc::Type1(m) => m.rom_banks,
        }
    }

    pub fn ram(&self) -> &[u8] {
        match self {
            Mbc::NoBanking(_) => &[],
            Mbc::Type1(m) => &m.ram,
        }
    }

    pub fn ram_mut(&mut self) -> &mut [u8] {
        match self {
            Mbc::NoBanking(_) => &mut [],
            Mbc::Type1(m) => &mut m.ram,
        }
    }
}

impl Device for Mbc {
    fn read(&self, addr: u16) -> u8 {
        match self {
            Mbc::NoBanking(m) => m.read(addr),
            Mbc::Type1(m) => m.read(addr),
        }
    }

    fn write(&mut self, addr: u16, val: u8) {
        match self {
            Mbc::NoBanking(m) => m.write(addr, val),
            Mbc::Type1(m) => m.write(addr, val),
        }
    }

    fn reset(&mut self) {
        match self {
            Mbc::NoBanking(m) => m.reset(),
            Mbc::Type1(m) => m.reset(),
        }
    }
}

/// 32 KiB ROM mapped flat at 0x0000-0x7FFF, no external RAM.
#[derive(Debug)]
pub struct NoBanking {
    rom: Vec<u8>,
}

impl NoBanking {
    pub fn new(rom: Vec<u8>) -> Self {
        Self { rom }
    }
}

impl Device for NoBanking {
    fn read(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x7FFF => self.rom.get(addr as usize).copied().unwrap_or(DEFAULT_READ),
            _ => DEFAULT_READ,
        }
    }

    fn write(&mut self, _addr: u16, _val: u8) {}

    fn reset(&mut self) {}
}

/// Interpretation of the 2-bit secondary register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BankingMode {
    /// Secondary bits only extend the 0x4000-0x7FFF ROM bank.
    #[default]
    Simple,
    /// Secondary bits also bank 0x0000-0x3FFF and external RAM.
    Advanced,
}

/// MBC1 (gbdev.io/pandocs/MBC1.html).
#[derive(Debug)]
pub struct Mbc1 {
    rom: Vec<u8>,
    ram: Vec<u8>,
    rom_banks: usize,
    ram_banks: usize,
    ram_enabled: bool,
    /// 5-bit primary ROM bank register (0x2000-0x3FFF), masked to the
    /// bank count on write.
    rom_bank: u8,
    /// 2-bit secondary register (0x4000-0x5FFF).
    secondary: u8,
    mode: BankingMode,
}

impl Mbc1 {
    /// `rom_banks` must be a power of two; `ram_size` is in bytes and may be
    /// smaller than a full bank.
    pub fn new(rom: Vec<u8>, rom_banks: usize, ram_size: usize) -> Self {
        Self {
            rom,
            ram: vec![0; ram_size],
            rom_banks: rom_banks.max(1),
            ram_banks: ram_size.div_ceil(RAM_BANK_SIZE),
            ram_enabled: false,
            rom_bank: 1,
            secondary: 0,
            mode: BankingMode::Simple,
        }
    }

    pub fn ram_enabled(&self) -> bool {
        self.ram_enabled
    }

    pub fn mode(&self) -> BankingMode {
        self.mode
    }

    /// Bank mapped at 0x0000-0x3FFF. Advanced mode maps the selected bank.
    pub fn low_bank(&self) -> usize {
        match self.mode {
            BankingMode::Simple => 0,
            BankingMode::Advanced => self.high_bank(),
        }
    }

    /// Bank mapped at 0x4000-0x7FFF. Bank 0 never appears here.
    pub fn high_bank(&self) -> usize {
        let bank = (((self.secondary as usize) << 5) | self.rom_bank as usize) & self.rom_mask();
        match bank {
            0 => 1,
            n => n,
        }
    }

    fn ram_bank(&self) -> usize {
        match (self.mode, self.ram_banks) {
            (BankingMode::Simple, _) | (_, 0) => 0,
            (BankingMode::Advanced, banks) => (self.secondary as usize) % banks,
        }
    }

    fn rom_mask(&self) -> usize {
        self.rom_banks - 1
    }

    fn rom_byte(&self, bank: usize, addr: u16) -> u8 {
        let offset = bank * ROM_BANK_SIZE + (addr as usize & (ROM_BANK_SIZE - 1));
        self.rom.get(offset).copied().unwrap_or(DEFAULT_READ)
    }

    fn ram_index(&self, addr: u16) -> usize {
        self.ram_bank() * RAM_BANK_SIZE + (addr as usize - 0xA000)
    }
}

impl Device for Mbc1 {
    fn read(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x3FFF => self.rom_byte(self.low_bank(), addr),
            0x4000..=0x7FFF => self.rom_byte(self.high_bank(), addr),
            0xA000..=0xBFFF if self.ram_enabled => self
                .ram
                .get(self.ram_index(addr))
                .copied()
                .unwrap_or(DEFAULT_READ),
            _ => DEFAULT_READ,
        }
    }

    fn write(&mut self, addr: u16, val: u8) {
        match addr {
            0x0000..=0x1FFF => self.ram_enabled = val & 0x0F == 0x0A,
            0x2000..=0x3FFF => self.rom_bank = val & 0x1F & self.rom_mask() as u8,
            0x4000..=0x5FFF => self.secondary = val & 0x03,
            0x6000..=0x7FFF => {
                self.mode = if val & 0x01 == 0 {
                    BankingMode::Simple
                } else {
                    BankingMode::Advanced
                };
            }
            0xA000..=0xBFFF if self.ram_enabled => {
                let idx = self.ram_index(addr);
                if let Some(b) = self.ram.get_mut(idx) {
                    *b = val;
                }
            }
            _ => {}
        }
    }

    fn reset(&mut self) {
        self.ram_enabled = false;
        self.rom_bank = 1;
        self.secondary = 0;
        self.mode = BankingMode::Simple;
    }
}
