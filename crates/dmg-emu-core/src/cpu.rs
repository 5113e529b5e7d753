mod alu;

#[cfg(feature = "cpu-trace")]
use log::trace;
use log::warn;

use crate::{
    mmu::Mmu,
    opcodes::{self, AluOp, Cond, Instr, Loc8, OpCode, ShiftOp},
    registers::{Flags, R8, R16, Registers},
    timer::M_CYCLES_PER_SECOND,
};

/// Machine cycles charged for servicing an interrupt.
const INTERRUPT_DISPATCH_CYCLES: u32 = 5;

/// Resolved target of an 8-bit operand.
#[derive(Debug, Clone, Copy)]
enum Place {
    Reg(R8),
    Mem(u16),
}

/// SM83 fetch/decode/execute engine.
///
/// The CPU is clocked one machine cycle at a time through [`Cpu::tick`]. An
/// instruction's side effects are applied in full on the cycle it is fetched;
/// its remaining cost is then burned by the following ticks.
#[derive(Debug, Clone)]
pub struct Cpu {
    pub regs: Registers,
    /// Free-running m-cycle counter, wraps once per emulated second.
    cycles: u32,
    /// Cycles left before the next fetch or dispatch.
    remaining: u32,
    halted: bool,
    halt_bug: bool,
    /// Counts down to IME=1 after EI.
    ime_delay: u8,
}

impl Cpu {
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            cycles: 0,
            remaining: 0,
            halted: false,
            halt_bug: false,
            ime_delay: 0,
        }
    }

    /// Restore the post-boot register state. The bus is left untouched.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn ime(&self) -> bool {
        self.regs.ime()
    }

    pub fn halted(&self) -> bool {
        self.halted
    }

    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    pub fn ticks_remaining(&self) -> u32 {
        self.remaining
    }

    /// Formatted CPU state string for debugging.
    pub fn debug_state(&self) -> String {
        let f = self.regs.flags();
        format!(
            "AF:{:04X} BC:{:04X} DE:{:04X} HL:{:04X} PC:{:04X} SP:{:04X} {}{}{}{} IME:{} CY:{}",
            self.regs.get16(R16::AF),
            self.regs.get16(R16::BC),
            self.regs.get16(R16::DE),
            self.regs.get16(R16::HL),
            self.regs.pc(),
            self.regs.sp(),
            if f.contains(Flags::Z) { 'Z' } else { '-' },
            if f.contains(Flags::N) { 'N' } else { '-' },
            if f.contains(Flags::H) { 'H' } else { '-' },
            if f.contains(Flags::C) { 'C' } else { '-' },
            self.regs.ime() as u8,
            self.cycles,
        )
    }

    /// Advance one machine cycle. Returns true if an instruction was fetched
    /// on this cycle.
    pub fn tick(&mut self, mmu: &mut Mmu) -> bool {
        self.cycles = (self.cycles + 1) & (M_CYCLES_PER_SECOND - 1);
        mmu.step(self.cycles);

        if self.remaining > 0 {
            self.advance();
            return false;
        }

        if self.handle_interrupts(mmu) {
            self.advance();
            return false;
        }

        if self.halted {
            return false;
        }

        let enable_after = self.ime_delay == 1;
        let opcode = if self.halt_bug {
            // PC fails to increment, so this byte is fetched again next time.
            self.halt_bug = false;
            mmu.read_byte(self.regs.pc())
        } else {
            self.fetch8(mmu)
        };
        let op = opcodes::lookup(opcode);
        self.remaining += op.cycles as u32;
        self.execute(mmu, op);

        if enable_after && self.ime_delay > 0 {
            self.regs.set_ime(true);
        }
        if self.ime_delay > 0 {
            self.ime_delay -= 1;
        }
        self.advance();
        true
    }

    /// Tick until the current instruction (or interrupt dispatch) has fully
    /// elapsed. Returns the machine cycles consumed.
    pub fn step(&mut self, mmu: &mut Mmu) -> u32 {
        let mut elapsed = 0;
        loop {
            self.tick(mmu);
            elapsed += 1;
            if self.remaining == 0 {
                return elapsed;
            }
        }
    }

    fn advance(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
    }

    /// Service the highest-priority pending interrupt. Returns true if one
    /// was dispatched. A pending interrupt always wakes a halted CPU, even
    /// with IME clear.
    fn handle_interrupts(&mut self, mmu: &mut Mmu) -> bool {
        let pending = mmu.pending_interrupts();
        let Some(source) = pending.highest_priority() else {
            return false;
        };
        self.halted = false;
        if !self.regs.ime() {
            return false;
        }

        self.regs.set_ime(false);
        mmu.clear_interrupt(source);
        let pc = self.regs.pc();
        self.push_stack(mmu, pc);
        self.regs.set_pc(source.vector());
        self.remaining += INTERRUPT_DISPATCH_CYCLES;
        true
    }

    fn fetch8(&mut self, mmu: &Mmu) -> u8 {
        let pc = self.regs.pc();
        self.regs.set_pc(pc.wrapping_add(1));
        mmu.read_byte(pc)
    }

    fn fetch16(&mut self, mmu: &Mmu) -> u16 {
        let lo = self.fetch8(mmu) as u16;
        let hi = self.fetch8(mmu) as u16;
        (hi << 8) | lo
    }

    fn push_stack(&mut self, mmu: &mut Mmu, val: u16) {
        let sp = self.regs.sp().wrapping_sub(1);
        mmu.write_byte(sp, (val >> 8) as u8);
        let sp = sp.wrapping_sub(1);
        mmu.write_byte(sp, val as u8);
        self.regs.set_sp(sp);
    }

    fn pop_stack(&mut self, mmu: &Mmu) -> u16 {
        let sp = self.regs.sp();
        let val = mmu.read_word(sp);
        self.regs.set_sp(sp.wrapping_add(2));
        val
    }

    fn resolve(&mut self, mmu: &Mmu, loc: Loc8) -> Place {
        match loc {
            Loc8::Reg(r) => Place::Reg(r),
            Loc8::Indirect(rr) => Place::Mem(self.regs.get16(rr)),
            Loc8::HlInc => {
                let hl = self.regs.hl();
                self.regs.set_hl(hl.wrapping_add(1));
                Place::Mem(hl)
            }
            Loc8::HlDec => {
                let hl = self.regs.hl();
                self.regs.set_hl(hl.wrapping_sub(1));
                Place::Mem(hl)
            }
            Loc8::Imm8 => {
                let pc = self.regs.pc();
                self.regs.set_pc(pc.wrapping_add(1));
                Place::Mem(pc)
            }
            Loc8::Addr16 => Place::Mem(self.fetch16(mmu)),
            Loc8::HighImm => Place::Mem(0xFF00 | self.fetch8(mmu) as u16),
            Loc8::HighC => Place::Mem(0xFF00 | self.regs.get8(R8::C) as u16),
        }
    }

    fn read_place(&self, mmu: &Mmu, place: Place) -> u8 {
        match place {
            Place::Reg(r) => self.regs.get8(r),
            Place::Mem(addr) => mmu.read_byte(addr),
        }
    }

    fn write_place(&mut self, mmu: &mut Mmu, place: Place, val: u8) {
        match place {
            Place::Reg(r) => self.regs.set8(r, val),
            Place::Mem(addr) => mmu.write_byte(addr, val),
        }
    }

    fn read_loc(&mut self, mmu: &Mmu, loc: Loc8) -> u8 {
        let place = self.resolve(mmu, loc);
        self.read_place(mmu, place)
    }

    /// Read-modify-write through `loc`, setting F from the result.
    fn modify(&mut self, mmu: &mut Mmu, loc: Loc8, f: impl FnOnce(u8, Flags) -> (u8, Flags)) {
        let place = self.resolve(mmu, loc);
        let (res, flags) = f(self.read_place(mmu, place), self.regs.flags());
        self.write_place(mmu, place, res);
        self.regs.set_flags(flags);
    }

    fn condition(&self, cond: Option<Cond>) -> bool {
        let flags = self.regs.flags();
        match cond {
            None => true,
            Some(Cond::NZ) => !flags.contains(Flags::Z),
            Some(Cond::Z) => flags.contains(Flags::Z),
            Some(Cond::NC) => !flags.contains(Flags::C),
            Some(Cond::C) => flags.contains(Flags::C),
        }
    }

    fn branch_taken(&mut self, op: &OpCode) {
        self.remaining += op.taken_cycles.saturating_sub(op.cycles) as u32;
    }

    fn execute(&mut self, mmu: &mut Mmu, op: &OpCode) {
        #[cfg(feature = "cpu-trace")]
        trace!(
            "{:04X} {:<20} {}",
            self.regs.pc().wrapping_sub(1),
            op.mnemonic,
            self.debug_state()
        );

        match op.instr {
            Instr::Nop => {}
            Instr::Illegal => {
                warn!(
                    "illegal opcode {:02X} at PC={:04X}",
                    op.code,
                    self.regs.pc().wrapping_sub(1)
                );
            }
            Instr::Stop => {
                // Second byte is padding.
                self.fetch8(mmu);
                mmu.reset_div();
                self.halted = true;
            }
            Instr::Halt => {
                if self.regs.ime() || self.ime_delay > 0 || !mmu.interrupt_pending() {
                    self.halted = true;
                } else {
                    self.halt_bug = true;
                }
            }
            Instr::Di => {
                self.regs.set_ime(false);
                self.ime_delay = 0;
            }
            Instr::Ei => {
                if !self.regs.ime() && self.ime_delay == 0 {
                    self.ime_delay = 2;
                }
            }
            Instr::PrefixCb => {
                let code = self.fetch8(mmu);
                let cb = opcodes::lookup_cb(code);
                self.remaining += cb.cycles as u32;
                self.execute(mmu, cb);
            }

            Instr::Ld8(dst, src) => {
                let val = self.read_loc(mmu, src);
                let place = self.resolve(mmu, dst);
                self.write_place(mmu, place, val);
            }
            Instr::Ld16Imm(rr) => {
                let val = self.fetch16(mmu);
                self.regs.set16(rr, val);
            }
            Instr::LdAddrSp => {
                let addr = self.fetch16(mmu);
                mmu.write_word(addr, self.regs.sp());
            }
            Instr::LdSpHl => self.regs.set_sp(self.regs.hl()),
            Instr::LdHlSpOffset => {
                let offset = self.fetch8(mmu);
                let (res, flags) = alu::add_sp_offset(self.regs.sp(), offset);
                self.regs.set_hl(res);
                self.regs.set_flags(flags);
            }
            Instr::Push(rr) => {
                let val = self.regs.get16(rr);
                self.push_stack(mmu, val);
            }
            Instr::Pop(rr) => {
                let val = self.pop_stack(mmu);
                self.regs.set16(rr, val);
            }

            Instr::Inc8(loc) => self.modify(mmu, loc, alu::inc8),
            Instr::Dec8(loc) => self.modify(mmu, loc, alu::dec8),
            Instr::Inc16(rr) => self.regs.set16(rr, self.regs.get16(rr).wrapping_add(1)),
            Instr::Dec16(rr) => self.regs.set16(rr, self.regs.get16(rr).wrapping_sub(1)),
            Instr::AddHl(rr) => {
                let (res, flags) =
                    alu::add16(self.regs.hl(), self.regs.get16(rr), self.regs.flags());
                self.regs.set_hl(res);
                self.regs.set_flags(flags);
            }
            Instr::AddSpOffset => {
                let offset = self.fetch8(mmu);
                let (res, flags) = alu::add_sp_offset(self.regs.sp(), offset);
                self.regs.set_sp(res);
                self.regs.set_flags(flags);
            }
            Instr::Alu(alu_op, loc) => {
                let val = self.read_loc(mmu, loc);
                self.alu(alu_op, val);
            }

            Instr::Rlca => self.rotate_a(ShiftOp::Rlc),
            Instr::Rrca => self.rotate_a(ShiftOp::Rrc),
            Instr::Rla => self.rotate_a(ShiftOp::Rl),
            Instr::Rra => self.rotate_a(ShiftOp::Rr),
            Instr::Daa => {
                let (res, flags) = alu::daa(self.regs.a(), self.regs.flags());
                self.regs.set_a(res);
                self.regs.set_flags(flags);
            }
            Instr::Cpl => {
                self.regs.set_a(!self.regs.a());
                self.regs.set_flag_n(true);
                self.regs.set_flag_h(true);
            }
            Instr::Scf => {
                self.regs.set_flag_n(false);
                self.regs.set_flag_h(false);
                self.regs.set_flag_c(true);
            }
            Instr::Ccf => {
                let carry = self.regs.flag_c();
                self.regs.set_flag_n(false);
                self.regs.set_flag_h(false);
                self.regs.set_flag_c(!carry);
            }

            Instr::Jr(cond) => {
                let offset = self.fetch8(mmu) as i8;
                if self.condition(cond) {
                    let pc = self.regs.pc().wrapping_add_signed(offset as i16);
                    self.regs.set_pc(pc);
                    self.branch_taken(op);
                }
            }
            Instr::Jp(cond) => {
                let addr = self.fetch16(mmu);
                if self.condition(cond) {
                    self.regs.set_pc(addr);
                    self.branch_taken(op);
                }
            }
            Instr::JpHl => self.regs.set_pc(self.regs.hl()),
            Instr::Call(cond) => {
                let addr = self.fetch16(mmu);
                if self.condition(cond) {
                    let ret = self.regs.pc();
                    self.push_stack(mmu, ret);
                    self.regs.set_pc(addr);
                    self.branch_taken(op);
                }
            }
            Instr::Ret(cond) => {
                if self.condition(cond) {
                    let addr = self.pop_stack(mmu);
                    self.regs.set_pc(addr);
                    self.branch_taken(op);
                }
            }
            Instr::Reti => {
                let addr = self.pop_stack(mmu);
                self.regs.set_pc(addr);
                self.regs.set_ime(true);
            }
            Instr::Rst(vector) => {
                let ret = self.regs.pc();
                self.push_stack(mmu, ret);
                self.regs.set_pc(vector as u16);
            }

            Instr::Shift(shift_op, loc) => {
                self.modify(mmu, loc, |v, f| alu::shift(shift_op, v, f.contains(Flags::C)))
            }
            Instr::Bit(n, loc) => {
                let val = self.read_loc(mmu, loc);
                let flags = alu::bit(n, val, self.regs.flags());
                self.regs.set_flags(flags);
            }
            Instr::Res(n, loc) => {
                let place = self.resolve(mmu, loc);
                let val = self.read_place(mmu, place) & !(1 << n);
                self.write_place(mmu, place, val);
            }
            Instr::Set(n, loc) => {
                let place = self.resolve(mmu, loc);
                let val = self.read_place(mmu, place) | (1 << n);
                self.write_place(mmu, place, val);
            }
        }
    }

    fn alu(&mut self, op: AluOp, val: u8) {
        let a = self.regs.a();
        let carry = self.regs.flag_c();
        let (res, flags) = match op {
            AluOp::Add => alu::add8(a, val, false),
            AluOp::Adc => alu::add8(a, val, carry),
            AluOp::Sub | AluOp::Cp => alu::sub8(a, val, false),
            AluOp::Sbc => alu::sub8(a, val, carry),
            AluOp::And => alu::and8(a, val),
            AluOp::Xor => alu::xor8(a, val),
            AluOp::Or => alu::or8(a, val),
        };
        if op != AluOp::Cp {
            self.regs.set_a(res);
        }
        self.regs.set_flags(flags);
    }

    fn rotate_a(&mut self, op: ShiftOp) {
        let (res, flags) = alu::rotate_a(op, self.regs.a(), self.regs.flag_c());
        self.regs.set_a(res);
        self.regs.set_flags(flags);
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}
