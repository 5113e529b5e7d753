use crate::{
    cartridge::{Cartridge, CartridgeError},
    cpu::Cpu,
    mmu::Mmu,
    ppu::FRAME_CYCLES,
};

pub struct GameBoy {
    pub cpu: Cpu,
    pub mmu: Mmu,
}

impl GameBoy {
    /// Machine in the post-boot state with no cartridge inserted.
    pub fn new() -> Self {
        Self {
            cpu: Cpu::new(),
            mmu: Mmu::new(),
        }
    }

    pub fn from_cartridge(cart: Cartridge) -> Self {
        let mut gb = Self::new();
        gb.mmu.load_cart(cart);
        gb
    }

    /// Parse `rom` and build a machine around it.
    pub fn from_rom(rom: Vec<u8>) -> Result<Self, CartridgeError> {
        Ok(Self::from_cartridge(Cartridge::new(rom)?))
    }

    /// Advance one machine cycle. Returns true if an instruction was fetched.
    pub fn tick(&mut self) -> bool {
        self.cpu.tick(&mut self.mmu)
    }

    /// Run until the current instruction completes; returns m-cycles used.
    pub fn step(&mut self) -> u32 {
        self.cpu.step(&mut self.mmu)
    }

    pub fn run_cycles(&mut self, cycles: u64) {
        for _ in 0..cycles {
            self.tick();
        }
    }

    pub fn run_frame(&mut self) {
        self.run_cycles(FRAME_CYCLES as u64);
    }

    /// Reset to the post-boot state while keeping the inserted cartridge and
    /// its external RAM.
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.mmu.reset();
    }
}

impl Default for GameBoy {
    fn default() -> Self {
        Self::new()
    }
}
