//! Flag arithmetic for the SM83 ALU. Every function is pure: it takes the
//! operands and the incoming flags and returns the result with the new flags.

use crate::{opcodes::ShiftOp, registers::Flags};

fn zero(val: u8) -> Flags {
    if val == 0 { Flags::Z } else { Flags::empty() }
}

fn flag(on: bool, f: Flags) -> Flags {
    if on { f } else { Flags::empty() }
}

/// ADD/ADC.
pub fn add8(a: u8, b: u8, carry_in: bool) -> (u8, Flags) {
    let c = carry_in as u8;
    let res = a.wrapping_add(b).wrapping_add(c);
    let half = (a & 0x0F) + (b & 0x0F) + c > 0x0F;
    let carry = a as u16 + b as u16 + c as u16 > 0xFF;
    (res, zero(res) | flag(half, Flags::H) | flag(carry, Flags::C))
}

/// SUB/SBC/CP.
pub fn sub8(a: u8, b: u8, carry_in: bool) -> (u8, Flags) {
    let c = carry_in as u8;
    let res = a.wrapping_sub(b).wrapping_sub(c);
    let half = (a & 0x0F) < (b & 0x0F) + c;
    let carry = (a as u16) < b as u16 + c as u16;
    (
        res,
        zero(res) | Flags::N | flag(half, Flags::H) | flag(carry, Flags::C),
    )
}

pub fn and8(a: u8, b: u8) -> (u8, Flags) {
    let res = a & b;
    (res, zero(res) | Flags::H)
}

pub fn or8(a: u8, b: u8) -> (u8, Flags) {
    let res = a | b;
    (res, zero(res))
}

pub fn xor8(a: u8, b: u8) -> (u8, Flags) {
    let res = a ^ b;
    (res, zero(res))
}

/// INC r. C is preserved.
pub fn inc8(val: u8, flags: Flags) -> (u8, Flags) {
    let res = val.wrapping_add(1);
    let half = val & 0x0F == 0x0F;
    (
        res,
        (flags & Flags::C) | zero(res) | flag(half, Flags::H),
    )
}

/// DEC r. C is preserved.
pub fn dec8(val: u8, flags: Flags) -> (u8, Flags) {
    let res = val.wrapping_sub(1);
    let half = val & 0x0F == 0x00;
    (
        res,
        (flags & Flags::C) | Flags::N | zero(res) | flag(half, Flags::H),
    )
}

/// ADD HL,rr. Z is preserved; H and C come from bits 11 and 15.
pub fn add16(hl: u16, val: u16, flags: Flags) -> (u16, Flags) {
    let res = hl.wrapping_add(val);
    let half = (hl & 0x0FFF) + (val & 0x0FFF) > 0x0FFF;
    let carry = hl as u32 + val as u32 > 0xFFFF;
    (
        res,
        (flags & Flags::Z) | flag(half, Flags::H) | flag(carry, Flags::C),
    )
}

/// SP plus a signed 8-bit offset, shared by ADD SP,e and LD HL,SP+e.
/// Z and N are cleared; H and C come from the unsigned low-byte addition.
pub fn add_sp_offset(sp: u16, offset: u8) -> (u16, Flags) {
    let res = sp.wrapping_add_signed(offset as i8 as i16);
    let half = (sp & 0x0F) + (offset as u16 & 0x0F) > 0x0F;
    let carry = (sp & 0xFF) + offset as u16 > 0xFF;
    (res, flag(half, Flags::H) | flag(carry, Flags::C))
}

/// CB rotate/shift group. Z reflects the result, N and H are cleared.
pub fn shift(op: ShiftOp, val: u8, carry_in: bool) -> (u8, Flags) {
    let (res, carry) = match op {
        ShiftOp::Rlc => (val.rotate_left(1), val & 0x80 != 0),
        ShiftOp::Rrc => (val.rotate_right(1), val & 0x01 != 0),
        ShiftOp::Rl => ((val << 1) | carry_in as u8, val & 0x80 != 0),
        ShiftOp::Rr => ((val >> 1) | ((carry_in as u8) << 7), val & 0x01 != 0),
        ShiftOp::Sla => (val << 1, val & 0x80 != 0),
        ShiftOp::Sra => ((val >> 1) | (val & 0x80), val & 0x01 != 0),
        ShiftOp::Swap => (val.rotate_left(4), false),
        ShiftOp::Srl => (val >> 1, val & 0x01 != 0),
    };
    (res, zero(res) | flag(carry, Flags::C))
}

/// RLCA/RRCA/RLA/RRA: same as the CB form but Z is always cleared.
pub fn rotate_a(op: ShiftOp, a: u8, carry_in: bool) -> (u8, Flags) {
    let (res, flags) = shift(op, a, carry_in);
    (res, flags - Flags::Z)
}

/// BIT n. C is preserved.
pub fn bit(n: u8, val: u8, flags: Flags) -> Flags {
    (flags & Flags::C) | Flags::H | flag(!crate::bits::bit(val, n), Flags::Z)
}

/// Decimal-adjust A after a BCD addition or subtraction.
pub fn daa(a: u8, flags: Flags) -> (u8, Flags) {
    let mut adjust = 0u8;
    let mut carry = false;
    let res = if flags.contains(Flags::N) {
        if flags.contains(Flags::H) {
            adjust |= 0x06;
        }
        if flags.contains(Flags::C) {
            adjust |= 0x60;
            carry = true;
        }
        a.wrapping_sub(adjust)
    } else {
        if flags.contains(Flags::H) || a & 0x0F > 0x09 {
            adjust |= 0x06;
        }
        if flags.contains(Flags::C) || a > 0x99 {
            adjust |= 0x60;
            carry = true;
        }
        a.wrapping_add(adjust)
    };
    (
        res,
        zero(res) | (flags & Flags::N) | flag(carry, Flags::C),
    )
}
