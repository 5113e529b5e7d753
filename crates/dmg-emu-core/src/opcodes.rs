//! Static SM83 instruction tables.
//!
//! Both tables (the base set and the 0xCB-prefixed set) hold one [`OpCode`]
//! record per byte value. They are built on first use and never mutated; the
//! CPU dispatches on [`OpCode::instr`] with a single `match`.
//!
//! Cycle costs are machine cycles (gbdev.io/gb-opcodes/optables/). Conditional
//! control flow records both the not-taken cost (`cycles`) and the taken cost
//! (`taken_cycles`). Prefixed entries carry the full cost of the pair and the
//! 0xCB entry of the base table costs nothing, so a prefixed instruction is
//! charged once.

use std::{fmt::Write as _, sync::OnceLock};

use crate::registers::{R8, R16};

/// Source or destination of an 8-bit transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Loc8 {
    Reg(R8),
    /// Memory at the address held in a register pair.
    Indirect(R16),
    /// `(HL)`, then HL is incremented.
    HlInc,
    /// `(HL)`, then HL is decremented.
    HlDec,
    Imm8,
    /// Memory at a 16-bit immediate address.
    Addr16,
    /// Memory at `0xFF00 + imm8`.
    HighImm,
    /// Memory at `0xFF00 + C`.
    HighC,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cond {
    NZ,
    Z,
    NC,
    C,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    Add,
    Adc,
    Sub,
    Sbc,
    And,
    Xor,
    Or,
    Cp,
}

/// Rotate/shift group shared by the CB table and the accumulator rotates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftOp {
    Rlc,
    Rrc,
    Rl,
    Rr,
    Sla,
    Sra,
    Swap,
    Srl,
}

/// Semantic action of an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instr {
    Nop,
    Stop,
    Halt,
    Di,
    Ei,
    PrefixCb,
    /// One of the eleven unused base opcodes.
    Illegal,

    Ld8(Loc8, Loc8),
    Ld16Imm(R16),
    LdAddrSp,
    LdSpHl,
    LdHlSpOffset,
    Push(R16),
    Pop(R16),

    Inc8(Loc8),
    Dec8(Loc8),
    Inc16(R16),
    Dec16(R16),
    AddHl(R16),
    AddSpOffset,
    Alu(AluOp, Loc8),

    Rlca,
    Rrca,
    Rla,
    Rra,
    Daa,
    Cpl,
    Scf,
    Ccf,

    Jr(Option<Cond>),
    Jp(Option<Cond>),
    JpHl,
    Call(Option<Cond>),
    Ret(Option<Cond>),
    Reti,
    Rst(u8),

    Shift(ShiftOp, Loc8),
    Bit(u8, Loc8),
    Res(u8, Loc8),
    Set(u8, Loc8),
}

/// Operand shape, used for encoded length and disassembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Reg8(R8),
    Reg16(R16),
    IndirectReg(R16),
    HlInc,
    HlDec,
    Imm8,
    Imm16,
    Addr16,
    HighImm8,
    HighC,
    /// Signed relative jump offset.
    Offset8,
    /// `SP + signed imm8`.
    SpOffset,
    Cond(Cond),
    Vector(u8),
    Bit(u8),
}

impl Operand {
    /// Immediate bytes this operand occupies after the opcode.
    pub const fn immediate_len(self) -> u8 {
        match self {
            Operand::Imm8 | Operand::HighImm8 | Operand::Offset8 | Operand::SpOffset => 1,
            Operand::Imm16 | Operand::Addr16 => 2,
            _ => 0,
        }
    }

    fn render(self, imm: &[u8], out: &mut String) {
        let b0 = imm.first().copied().unwrap_or(0);
        let b1 = imm.get(1).copied().unwrap_or(0);
        let _ = match self {
            Operand::Reg8(r) => write!(out, "{}", r.name()),
            Operand::Reg16(r) => write!(out, "{}", r.name()),
            Operand::IndirectReg(r) => write!(out, "({})", r.name()),
            Operand::HlInc => write!(out, "(HL+)"),
            Operand::HlDec => write!(out, "(HL-)"),
            Operand::Imm8 => write!(out, "${b0:02X}"),
            Operand::Imm16 => write!(out, "${b1:02X}{b0:02X}"),
            Operand::Addr16 => write!(out, "(${b1:02X}{b0:02X})"),
            Operand::HighImm8 => write!(out, "($FF00+${b0:02X})"),
            Operand::HighC => write!(out, "($FF00+C)"),
            Operand::Offset8 => write!(out, "{:+}", b0 as i8),
            Operand::SpOffset => write!(out, "SP{:+}", b0 as i8),
            Operand::Cond(c) => write!(out, "{c:?}"),
            Operand::Vector(v) => write!(out, "${v:02X}"),
            Operand::Bit(n) => write!(out, "{n}"),
        };
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpCode {
    pub code: u8,
    /// True for entries of the 0xCB-prefixed table.
    pub prefixed: bool,
    /// Machine cycles charged when executed (branch not taken).
    pub cycles: u8,
    /// Machine cycles charged when a conditional branch is taken. Equal to
    /// `cycles` for everything else.
    pub taken_cycles: u8,
    pub mnemonic: &'static str,
    pub operands: [Option<Operand>; 2],
    /// Encoded length in bytes, including any prefix.
    pub length: u8,
    pub instr: Instr,
}

impl OpCode {
    pub fn is_illegal(&self) -> bool {
        self.instr == Instr::Illegal
    }

    /// Render this instruction as text. `bytes` starts at the opcode (or the
    /// 0xCB prefix); missing immediate bytes render as zero.
    pub fn disassemble(&self, bytes: &[u8]) -> String {
        let imm_start = if self.prefixed { 2 } else { 1 };
        let imm = bytes.get(imm_start..).unwrap_or_default();

        let mut out = String::from(self.mnemonic);
        for (i, operand) in self.operands.iter().flatten().enumerate() {
            out.push_str(if i == 0 { " " } else { "," });
            operand.render(imm, &mut out);
        }
        out
    }
}

struct Tables {
    base: [OpCode; 256],
    cb: [OpCode; 256],
}

static TABLES: OnceLock<Tables> = OnceLock::new();

fn tables() -> &'static Tables {
    TABLES.get_or_init(|| Tables {
        base: std::array::from_fn(|i| build(i as u8, false)),
        cb: std::array::from_fn(|i| build(i as u8, true)),
    })
}

/// Base-table entry for `code`.
pub fn lookup(code: u8) -> &'static OpCode {
    &tables().base[code as usize]
}

/// Entry of the 0xCB-prefixed table for `code`.
pub fn lookup_cb(code: u8) -> &'static OpCode {
    &tables().cb[code as usize]
}

#[rustfmt::skip]
const BASE_CYCLES: [u8; 256] = [
//  x0 x1 x2 x3 x4 x5 x6 x7 x8 x9 xA xB xC xD xE xF
    1, 3, 2, 2, 1, 1, 2, 1, 5, 2, 2, 2, 1, 1, 2, 1, // 0x
    1, 3, 2, 2, 1, 1, 2, 1, 3, 2, 2, 2, 1, 1, 2, 1, // 1x
    2, 3, 2, 2, 1, 1, 2, 1, 2, 2, 2, 2, 1, 1, 2, 1, // 2x
    2, 3, 2, 2, 3, 3, 3, 1, 2, 2, 2, 2, 1, 1, 2, 1, // 3x
    1, 1, 1, 1, 1, 1, 2, 1, 1, 1, 1, 1, 1, 1, 2, 1, // 4x
    1, 1, 1, 1, 1, 1, 2, 1, 1, 1, 1, 1, 1, 1, 2, 1, // 5x
    1, 1, 1, 1, 1, 1, 2, 1, 1, 1, 1, 1, 1, 1, 2, 1, // 6x
    2, 2, 2, 2, 2, 2, 1, 2, 1, 1, 1, 1, 1, 1, 2, 1, // 7x
    1, 1, 1, 1, 1, 1, 2, 1, 1, 1, 1, 1, 1, 1, 2, 1, // 8x
    1, 1, 1, 1, 1, 1, 2, 1, 1, 1, 1, 1, 1, 1, 2, 1, // 9x
    1, 1, 1, 1, 1, 1, 2, 1, 1, 1, 1, 1, 1, 1, 2, 1, // Ax
    1, 1, 1, 1, 1, 1, 2, 1, 1, 1, 1, 1, 1, 1, 2, 1, // Bx
    2, 3, 3, 4, 3, 4, 2, 4, 2, 4, 3, 0, 3, 6, 2, 4, // Cx
    2, 3, 3, 0, 3, 4, 2, 4, 2, 4, 3, 0, 3, 0, 2, 4, // Dx
    3, 3, 2, 0, 0, 4, 2, 4, 4, 1, 4, 0, 0, 0, 2, 4, // Ex
    3, 3, 2, 1, 0, 4, 2, 4, 3, 2, 4, 1, 0, 0, 2, 4, // Fx
];

fn build(code: u8, prefixed: bool) -> OpCode {
    let instr = if prefixed {
        decode_cb(code)
    } else {
        decode_base(code)
    };
    let operands = operands_of(instr);

    let cycles = if prefixed {
        match instr {
            Instr::Bit(_, Loc8::Indirect(_)) => 3,
            Instr::Shift(_, Loc8::Indirect(_))
            | Instr::Res(_, Loc8::Indirect(_))
            | Instr::Set(_, Loc8::Indirect(_)) => 4,
            _ => 2,
        }
    } else {
        BASE_CYCLES[code as usize]
    };
    let taken_cycles = match instr {
        Instr::Jr(Some(_)) => 3,
        Instr::Jp(Some(_)) => 4,
        Instr::Call(Some(_)) => 6,
        Instr::Ret(Some(_)) => 5,
        _ => cycles,
    };

    let length = match instr {
        // STOP is followed by a padding byte.
        Instr::Stop => 2,
        _ => {
            let imm: u8 = operands.iter().flatten().map(|o| o.immediate_len()).sum();
            1 + prefixed as u8 + imm
        }
    };

    OpCode {
        code,
        prefixed,
        cycles,
        taken_cycles,
        mnemonic: mnemonic_of(instr),
        operands,
        length,
        instr,
    }
}

/// Register operand encoded in bits 2..0 (or 5..3) of an opcode.
fn r8(idx: u8) -> Loc8 {
    match idx & 0x07 {
        0 => Loc8::Reg(R8::B),
        1 => Loc8::Reg(R8::C),
        2 => Loc8::Reg(R8::D),
        3 => Loc8::Reg(R8::E),
        4 => Loc8::Reg(R8::H),
        5 => Loc8::Reg(R8::L),
        6 => Loc8::Indirect(R16::HL),
        _ => Loc8::Reg(R8::A),
    }
}

/// Register pair in bits 5..4 for 16-bit loads and arithmetic.
fn rp(code: u8) -> R16 {
    match (code >> 4) & 0x03 {
        0 => R16::BC,
        1 => R16::DE,
        2 => R16::HL,
        _ => R16::SP,
    }
}

/// Register pair in bits 5..4 for PUSH/POP.
fn rp_stack(code: u8) -> R16 {
    match (code >> 4) & 0x03 {
        0 => R16::BC,
        1 => R16::DE,
        2 => R16::HL,
        _ => R16::AF,
    }
}

fn cond(code: u8) -> Cond {
    match (code >> 3) & 0x03 {
        0 => Cond::NZ,
        1 => Cond::Z,
        2 => Cond::NC,
        _ => Cond::C,
    }
}

fn alu_op(code: u8) -> AluOp {
    match (code >> 3) & 0x07 {
        0 => AluOp::Add,
        1 => AluOp::Adc,
        2 => AluOp::Sub,
        3 => AluOp::Sbc,
        4 => AluOp::And,
        5 => AluOp::Xor,
        6 => AluOp::Or,
        _ => AluOp::Cp,
    }
}

fn decode_base(code: u8) -> Instr {
    use Instr::*;
    const A: Loc8 = Loc8::Reg(R8::A);

    match code {
        0x00 => Nop,
        0x10 => Stop,
        0x76 => Halt,
        0xF3 => Di,
        0xFB => Ei,
        0xCB => PrefixCb,

        0x08 => LdAddrSp,
        0x18 => Jr(None),
        0x20 | 0x28 | 0x30 | 0x38 => Jr(Some(cond(code))),
        c if c & 0xCF == 0x01 => Ld16Imm(rp(c)),
        c if c & 0xCF == 0x09 => AddHl(rp(c)),
        c if c & 0xCF == 0x03 => Inc16(rp(c)),
        c if c & 0xCF == 0x0B => Dec16(rp(c)),
        0x02 => Ld8(Loc8::Indirect(R16::BC), A),
        0x12 => Ld8(Loc8::Indirect(R16::DE), A),
        0x22 => Ld8(Loc8::HlInc, A),
        0x32 => Ld8(Loc8::HlDec, A),
        0x0A => Ld8(A, Loc8::Indirect(R16::BC)),
        0x1A => Ld8(A, Loc8::Indirect(R16::DE)),
        0x2A => Ld8(A, Loc8::HlInc),
        0x3A => Ld8(A, Loc8::HlDec),
        c if c & 0xC7 == 0x04 => Inc8(r8(c >> 3)),
        c if c & 0xC7 == 0x05 => Dec8(r8(c >> 3)),
        c if c & 0xC7 == 0x06 => Ld8(r8(c >> 3), Loc8::Imm8),
        0x07 => Rlca,
        0x0F => Rrca,
        0x17 => Rla,
        0x1F => Rra,
        0x27 => Daa,
        0x2F => Cpl,
        0x37 => Scf,
        0x3F => Ccf,

        0x40..=0x7F => Ld8(r8(code >> 3), r8(code)),
        0x80..=0xBF => Alu(alu_op(code), r8(code)),

        c if c & 0xE7 == 0xC0 => Ret(Some(cond(c))),
        0xC9 => Ret(None),
        0xD9 => Reti,
        c if c & 0xCF == 0xC1 => Pop(rp_stack(c)),
        c if c & 0xCF == 0xC5 => Push(rp_stack(c)),
        c if c & 0xE7 == 0xC2 => Jp(Some(cond(c))),
        0xC3 => Jp(None),
        0xE9 => JpHl,
        c if c & 0xE7 == 0xC4 => Call(Some(cond(c))),
        0xCD => Call(None),
        c if c & 0xC7 == 0xC6 => Alu(alu_op(c), Loc8::Imm8),
        c if c & 0xC7 == 0xC7 => Rst(c & 0x38),

        0xE0 => Ld8(Loc8::HighImm, A),
        0xF0 => Ld8(A, Loc8::HighImm),
        0xE2 => Ld8(Loc8::HighC, A),
        0xF2 => Ld8(A, Loc8::HighC),
        0xEA => Ld8(Loc8::Addr16, A),
        0xFA => Ld8(A, Loc8::Addr16),
        0xE8 => AddSpOffset,
        0xF8 => LdHlSpOffset,
        0xF9 => LdSpHl,

        // D3 DB DD E3 E4 EB EC ED F4 FC FD
        _ => Illegal,
    }
}

fn decode_cb(code: u8) -> Instr {
    let target = r8(code);
    let n = (code >> 3) & 0x07;
    match code {
        0x00..=0x3F => {
            let op = match n {
                0 => ShiftOp::Rlc,
                1 => ShiftOp::Rrc,
                2 => ShiftOp::Rl,
                3 => ShiftOp::Rr,
                4 => ShiftOp::Sla,
                5 => ShiftOp::Sra,
                6 => ShiftOp::Swap,
                _ => ShiftOp::Srl,
            };
            Instr::Shift(op, target)
        }
        0x40..=0x7F => Instr::Bit(n, target),
        0x80..=0xBF => Instr::Res(n, target),
        _ => Instr::Set(n, target),
    }
}

fn loc_operand(loc: Loc8) -> Operand {
    match loc {
        Loc8::Reg(r) => Operand::Reg8(r),
        Loc8::Indirect(rr) => Operand::IndirectReg(rr),
        Loc8::HlInc => Operand::HlInc,
        Loc8::HlDec => Operand::HlDec,
        Loc8::Imm8 => Operand::Imm8,
        Loc8::Addr16 => Operand::Addr16,
        Loc8::HighImm => Operand::HighImm8,
        Loc8::HighC => Operand::HighC,
    }
}

fn operands_of(instr: Instr) -> [Option<Operand>; 2] {
    let a = Some(Operand::Reg8(R8::A));
    match instr {
        Instr::Ld8(dst, src) => [Some(loc_operand(dst)), Some(loc_operand(src))],
        Instr::Ld16Imm(rr) => [Some(Operand::Reg16(rr)), Some(Operand::Imm16)],
        Instr::LdAddrSp => [Some(Operand::Addr16), Some(Operand::Reg16(R16::SP))],
        Instr::LdSpHl => [Some(Operand::Reg16(R16::SP)), Some(Operand::Reg16(R16::HL))],
        Instr::LdHlSpOffset => [Some(Operand::Reg16(R16::HL)), Some(Operand::SpOffset)],
        Instr::Push(rr) | Instr::Pop(rr) | Instr::Inc16(rr) | Instr::Dec16(rr) => {
            [Some(Operand::Reg16(rr)), None]
        }
        Instr::AddHl(rr) => [Some(Operand::Reg16(R16::HL)), Some(Operand::Reg16(rr))],
        Instr::AddSpOffset => [Some(Operand::Reg16(R16::SP)), Some(Operand::Offset8)],
        Instr::Inc8(loc) | Instr::Dec8(loc) | Instr::Shift(_, loc) => {
            [Some(loc_operand(loc)), None]
        }
        Instr::Alu(AluOp::Add | AluOp::Adc | AluOp::Sbc, loc) => [a, Some(loc_operand(loc))],
        Instr::Alu(_, loc) => [Some(loc_operand(loc)), None],
        Instr::Jr(c) => conditional(c, Operand::Offset8),
        Instr::Jp(c) | Instr::Call(c) => conditional(c, Operand::Imm16),
        Instr::Ret(c) => [c.map(Operand::Cond), None],
        Instr::JpHl => [Some(Operand::Reg16(R16::HL)), None],
        Instr::Rst(v) => [Some(Operand::Vector(v)), None],
        Instr::Bit(n, loc) | Instr::Res(n, loc) | Instr::Set(n, loc) => {
            [Some(Operand::Bit(n)), Some(loc_operand(loc))]
        }
        _ => [None, None],
    }
}

fn conditional(c: Option<Cond>, target: Operand) -> [Option<Operand>; 2] {
    match c {
        Some(c) => [Some(Operand::Cond(c)), Some(target)],
        None => [Some(target), None],
    }
}

fn mnemonic_of(instr: Instr) -> &'static str {
    match instr {
        Instr::Nop => "NOP",
        Instr::Stop => "STOP",
        Instr::Halt => "HALT",
        Instr::Di => "DI",
        Instr::Ei => "EI",
        Instr::PrefixCb => "PREFIX CB",
        Instr::Illegal => "ILLEGAL",
        Instr::Ld8(Loc8::HighImm | Loc8::HighC, _) | Instr::Ld8(_, Loc8::HighImm | Loc8::HighC) => {
            "LDH"
        }
        Instr::Ld8(..)
        | Instr::Ld16Imm(_)
        | Instr::LdAddrSp
        | Instr::LdSpHl
        | Instr::LdHlSpOffset => "LD",
        Instr::Push(_) => "PUSH",
        Instr::Pop(_) => "POP",
        Instr::Inc8(_) | Instr::Inc16(_) => "INC",
        Instr::Dec8(_) | Instr::Dec16(_) => "DEC",
        Instr::AddHl(_) | Instr::AddSpOffset => "ADD",
        Instr::Alu(op, _) => match op {
            AluOp::Add => "ADD",
            AluOp::Adc => "ADC",
            AluOp::Sub => "SUB",
            AluOp::Sbc => "SBC",
            AluOp::And => "AND",
            AluOp::Xor => "XOR",
            AluOp::Or => "OR",
            AluOp::Cp => "CP",
        },
        Instr::Rlca => "RLCA",
        Instr::Rrca => "RRCA",
        Instr::Rla => "RLA",
        Instr::Rra => "RRA",
        Instr::Daa => "DAA",
        Instr::Cpl => "CPL",
        Instr::Scf => "SCF",
        Instr::Ccf => "CCF",
        Instr::Jr(_) => "JR",
        Instr::Jp(_) | Instr::JpHl => "JP",
        Instr::Call(_) => "CALL",
        Instr::Ret(_) => "RET",
        Instr::Reti => "RETI",
        Instr::Rst(_) => "RST",
        Instr::Shift(op, _) => match op {
            ShiftOp::Rlc => "RLC",
            ShiftOp::Rrc => "RRC",
            ShiftOp::Rl => "RL",
            ShiftOp::Rr => "RR",
            ShiftOp::Sla => "SLA",
            ShiftOp::Sra => "SRA",
            ShiftOp::Swap => "SWAP",
            ShiftOp::Srl => "SRL",
        },
        Instr::Bit(..) => "BIT",
        Instr::Res(..) => "RES",
        Instr::Set(..) => "SET",
    }
}
