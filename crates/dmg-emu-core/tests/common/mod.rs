#![allow(dead_code)]

use dmg_emu_core::{cartridge::Header, gameboy::GameBoy, mbc::ROM_BANK_SIZE};

/// Entry point the post-boot CPU starts executing at.
pub const ENTRY: u16 = 0x0100;

/// Builds ROM images in memory. Each bank's first byte holds its bank number
/// so banking tests can tell windows apart.
pub struct RomBuilder {
    rom: Vec<u8>,
}

impl RomBuilder {
    /// 32 KiB ROM without a bank controller.
    pub fn new() -> Self {
        Self::with_header(0x00, 0x00, 0x00)
    }

    /// MBC1 image with `2 << rom_code` banks.
    pub fn mbc1(cart_type: u8, rom_code: u8, ram_code: u8) -> Self {
        Self::with_header(cart_type, rom_code, ram_code)
    }

    fn with_header(cart_type: u8, rom_code: u8, ram_code: u8) -> Self {
        let banks = 2usize << rom_code;
        let mut rom = vec![0u8; banks * ROM_BANK_SIZE];
        for bank in 1..banks {
            rom[bank * ROM_BANK_SIZE] = bank as u8;
        }
        rom[0x0134..0x013C].copy_from_slice(b"TESTCART");
        rom[0x0147] = cart_type;
        rom[0x0148] = rom_code;
        rom[0x0149] = ram_code;
        Self { rom }
    }

    /// Place `bytes` at `addr` (a ROM offset).
    pub fn code(mut self, addr: u16, bytes: &[u8]) -> Self {
        let start = addr as usize;
        self.rom[start..start + bytes.len()].copy_from_slice(bytes);
        self
    }

    pub fn build(mut self) -> Vec<u8> {
        self.rom[0x014D] = Header::computed_checksum(&self.rom);
        self.rom
    }
}

/// Machine running `program` from the entry point of a plain 32 KiB ROM.
/// The program must end before the header title at 0x0134.
pub fn machine(program: &[u8]) -> GameBoy {
    let rom = RomBuilder::new().code(ENTRY, program).build();
    GameBoy::from_rom(rom).unwrap()
}

/// Machine that jumps from the entry point to `program` at 0x0150.
pub fn machine_at_0150(program: &[u8]) -> GameBoy {
    let rom = RomBuilder::new()
        .code(ENTRY, &[0xC3, 0x50, 0x01])
        .code(0x0150, program)
        .build();
    let mut gb = GameBoy::from_rom(rom).unwrap();
    gb.step();
    gb
}

/// Execute `n` whole instructions.
pub fn step_n(gb: &mut GameBoy, n: usize) {
    for _ in 0..n {
        gb.step();
    }
}
