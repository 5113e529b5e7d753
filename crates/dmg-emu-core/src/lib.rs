//! Game Boy (DMG) CPU, memory bus and cartridge core.
//!
//! This crate contains the platform-agnostic emulator logic: the SM83 CPU and
//! its opcode tables, the interrupt and timer subsystem, the memory map and the
//! MBC1 cartridge controller. Frontends drive the core one machine cycle at a
//! time through the [`gameboy`] facade.

/// Byte/word packing helpers.
pub mod bits;

/// Cartridge header parsing, construction errors and battery saves.
pub mod cartridge;

/// SM83 CPU core.
pub mod cpu;

/// Read/write/reset contract shared by bus devices.
pub mod device;

/// High-level facade that wires the CPU and MMU into a single machine.
pub mod gameboy;

pub mod interrupts;

/// Memory bank controllers.
pub mod mbc;

/// Memory map and hardware plumbing.
pub mod mmu;

/// Static base and CB-prefixed instruction tables.
pub mod opcodes;

/// Register-level LCD controller (no pixel output).
pub mod ppu;

pub mod registers;

/// Divider/timer unit.
pub mod timer;
