use crate::interrupts::InterruptFlags;

/// Memory-mapped device as seen by the bus.
///
/// Cartridges, their bank controllers and the graphics controller all expose
/// this contract so the [`Mmu`](crate::mmu::Mmu) can route accesses without
/// knowing the concrete type behind an address range. Addresses passed in are
/// the full CPU addresses, not offsets into the device.
pub trait Device {
    fn read(&self, addr: u16) -> u8;
    fn write(&mut self, addr: u16, val: u8);
    /// Return the device to its power-up register state. Backing memory that
    /// survives a console reset (cartridge ROM/RAM) is kept.
    fn reset(&mut self);
}

/// Graphics controller collaborator.
///
/// The bus forwards the LCD register window (0xFF40-0xFF4B) to it and clocks it
/// once per machine cycle so it can count scanlines and raise its interrupts.
pub trait Video: Device {
    fn step(&mut self, interrupts: &mut InterruptFlags);

    /// Current scanline (LY).
    fn ly(&self) -> u8;
}
