use bitflags::bitflags;

use crate::bits::{from_u16, to_u16};

bitflags! {
    /// Flag bits held in the upper nibble of F
    /// (gbdev.io/pandocs/The_CPU_Flags.html).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Flags: u8 {
        const Z = 0x80; // Zero
        const N = 0x40; // Subtract
        const H = 0x20; // Half Carry
        const C = 0x10; // Carry
    }
}

/// F can only ever hold the four flag bits.
const F_MASK: u8 = 0xF0;

// Post-boot DMG register state from gbdev.io/pandocs/Power_Up_State.html
const BOOT_A: u8 = 0x01;
const BOOT_F: u8 = 0xB0;
const BOOT_B: u8 = 0x00;
const BOOT_C: u8 = 0x13;
const BOOT_D: u8 = 0x00;
const BOOT_E: u8 = 0xD8;
const BOOT_H: u8 = 0x01;
const BOOT_L: u8 = 0x4D;
const BOOT_PC: u16 = 0x0100;
const BOOT_SP: u16 = 0xFFFE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum R8 {
    A,
    F,
    B,
    C,
    D,
    E,
    H,
    L,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum R16 {
    AF,
    BC,
    DE,
    HL,
    SP,
    PC,
}

impl R8 {
    pub fn name(self) -> &'static str {
        match self {
            R8::A => "A",
            R8::F => "F",
            R8::B => "B",
            R8::C => "C",
            R8::D => "D",
            R8::E => "E",
            R8::H => "H",
            R8::L => "L",
        }
    }
}

impl R16 {
    pub fn name(self) -> &'static str {
        match self {
            R16::AF => "AF",
            R16::BC => "BC",
            R16::DE => "DE",
            R16::HL => "HL",
            R16::SP => "SP",
            R16::PC => "PC",
        }
    }
}

/// SM83 register file. The paired views (AF, BC, DE, HL) are composed from
/// the 8-bit cells on every access and have no storage of their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registers {
    a: u8,
    f: u8,
    b: u8,
    c: u8,
    d: u8,
    e: u8,
    h: u8,
    l: u8,
    sp: u16,
    pc: u16,
    ime: bool,
}

impl Registers {
    /// Register file in the post-boot state.
    pub fn new() -> Self {
        let mut regs = Self {
            a: 0,
            f: 0,
            b: 0,
            c: 0,
            d: 0,
            e: 0,
            h: 0,
            l: 0,
            sp: 0,
            pc: 0,
            ime: false,
        };
        regs.reset();
        regs
    }

    pub fn reset(&mut self) {
        self.a = BOOT_A;
        self.f = BOOT_F;
        self.b = BOOT_B;
        self.c = BOOT_C;
        self.d = BOOT_D;
        self.e = BOOT_E;
        self.h = BOOT_H;
        self.l = BOOT_L;
        self.sp = BOOT_SP;
        self.pc = BOOT_PC;
        self.ime = false;
    }

    pub fn get8(&self, r: R8) -> u8 {
        match r {
            R8::A => self.a,
            R8::F => self.f,
            R8::B => self.b,
            R8::C => self.c,
            R8::D => self.d,
            R8::E => self.e,
            R8::H => self.h,
            R8::L => self.l,
        }
    }

    pub fn set8(&mut self, r: R8, val: u8) {
        match r {
            R8::A => self.a = val,
            R8::F => self.f = val & F_MASK,
            R8::B => self.b = val,
            R8::C => self.c = val,
            R8::D => self.d = val,
            R8::E => self.e = val,
            R8::H => self.h = val,
            R8::L => self.l = val,
        }
    }

    pub fn get16(&self, r: R16) -> u16 {
        match r {
            R16::AF => to_u16(self.a, self.f),
            R16::BC => to_u16(self.b, self.c),
            R16::DE => to_u16(self.d, self.e),
            R16::HL => to_u16(self.h, self.l),
            R16::SP => self.sp,
            R16::PC => self.pc,
        }
    }

    pub fn set16(&mut self, r: R16, val: u16) {
        let (hi, lo) = from_u16(val);
        match r {
            R16::AF => {
                self.a = hi;
                self.f = lo & F_MASK;
            }
            R16::BC => (self.b, self.c) = (hi, lo),
            R16::DE => (self.d, self.e) = (hi, lo),
            R16::HL => (self.h, self.l) = (hi, lo),
            R16::SP => self.sp = val,
            R16::PC => self.pc = val,
        }
    }

    pub fn a(&self) -> u8 {
        self.a
    }

    pub fn set_a(&mut self, val: u8) {
        self.a = val;
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn set_pc(&mut self, val: u16) {
        self.pc = val;
    }

    pub fn sp(&self) -> u16 {
        self.sp
    }

    pub fn set_sp(&mut self, val: u16) {
        self.sp = val;
    }

    pub fn hl(&self) -> u16 {
        self.get16(R16::HL)
    }

    pub fn set_hl(&mut self, val: u16) {
        self.set16(R16::HL, val);
    }

    pub fn flags(&self) -> Flags {
        Flags::from_bits_truncate(self.f)
    }

    pub fn set_flags(&mut self, flags: Flags) {
        self.f = flags.bits() & F_MASK;
    }

    pub fn flag_z(&self) -> bool {
        self.flags().contains(Flags::Z)
    }

    pub fn flag_n(&self) -> bool {
        self.flags().contains(Flags::N)
    }

    pub fn flag_h(&self) -> bool {
        self.flags().contains(Flags::H)
    }

    pub fn flag_c(&self) -> bool {
        self.flags().contains(Flags::C)
    }

    pub fn set_flag_z(&mut self, on: bool) {
        self.set_flag(Flags::Z, on);
    }

    pub fn set_flag_n(&mut self, on: bool) {
        self.set_flag(Flags::N, on);
    }

    pub fn set_flag_h(&mut self, on: bool) {
        self.set_flag(Flags::H, on);
    }

    pub fn set_flag_c(&mut self, on: bool) {
        self.set_flag(Flags::C, on);
    }

    fn set_flag(&mut self, flag: Flags, on: bool) {
        let mut flags = self.flags();
        flags.set(flag, on);
        self.set_flags(flags);
    }

    pub fn ime(&self) -> bool {
        self.ime
    }

    pub fn set_ime(&mut self, on: bool) {
        self.ime = on;
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_nibble_of_f_is_always_zero() {
        let mut regs = Registers::new();
        for v in 0..=u8::MAX {
            regs.set8(R8::F, v);
            assert_eq!(regs.get8(R8::F) & 0x0F, 0, "set8 F={v:02X}");

            regs.set16(R16::AF, to_u16(0x12, v));
            assert_eq!(regs.get8(R8::F) & 0x0F, 0, "set16 AF lo={v:02X}");
            assert_eq!(regs.get8(R8::A), 0x12);

            regs.set_flags(Flags::from_bits_retain(v));
            assert_eq!(regs.get16(R16::AF) & 0x000F, 0, "set_flags {v:02X}");
        }
    }

    #[test]
    fn pairs_are_views_over_8_bit_cells() {
        let mut regs = Registers::new();
        regs.set16(R16::BC, 0xBEEF);
        assert_eq!(regs.get8(R8::B), 0xBE);
        assert_eq!(regs.get8(R8::C), 0xEF);

        regs.set8(R8::L, 0x34);
        regs.set8(R8::H, 0x12);
        assert_eq!(regs.hl(), 0x1234);

        regs.set16(R16::DE, 0xFFFF);
        regs.set16(R16::DE, regs.get16(R16::DE).wrapping_add(1));
        assert_eq!((regs.get8(R8::D), regs.get8(R8::E)), (0, 0));
    }

    #[test]
    fn reset_matches_post_boot_state() {
        let mut regs = Registers::new();
        regs.set16(R16::AF, 0);
        regs.set_pc(0x4000);
        regs.set_ime(true);
        regs.reset();

        assert_eq!(regs.get16(R16::AF), 0x01B0);
        assert_eq!(regs.get16(R16::BC), 0x0013);
        assert_eq!(regs.get16(R16::DE), 0x00D8);
        assert_eq!(regs.get16(R16::HL), 0x014D);
        assert_eq!(regs.pc(), 0x0100);
        assert_eq!(regs.sp(), 0xFFFE);
        assert!(!regs.ime());
    }

    #[test]
    fn flag_setters_touch_only_their_bit() {
        let mut regs = Registers::new();
        regs.set_flags(Flags::empty());
        regs.set_flag_h(true);
        assert_eq!(regs.get8(R8::F), 0x20);
        regs.set_flag_c(true);
        regs.set_flag_z(true);
        regs.set_flag_h(false);
        assert!(regs.flag_z() && regs.flag_c() && !regs.flag_h() && !regs.flag_n());
        assert_eq!(regs.get8(R8::F), 0x90);
    }
}
