mod common;

use common::{ENTRY, machine, step_n};
use dmg_emu_core::{interrupts::InterruptFlags, registers::R8};

#[test]
fn vblank_dispatch_jumps_to_vector() {
    let mut gb = machine(&[0x00, 0x00]);
    gb.cpu.regs.set_ime(true);
    gb.mmu.ie_reg = InterruptFlags::VBLANK;
    gb.mmu.if_reg = InterruptFlags::VBLANK;

    assert_eq!(gb.step(), 5);
    assert_eq!(gb.cpu.regs.pc(), 0x0040);
    assert!(!gb.cpu.ime());
    assert!(!gb.mmu.if_reg.contains(InterruptFlags::VBLANK));
    assert_eq!(gb.cpu.regs.sp(), 0xFFFC);
    assert_eq!(gb.mmu.read_word(0xFFFC), ENTRY);
}

#[test]
fn dispatch_services_one_source_by_priority() {
    let mut gb = machine(&[0x00]);
    gb.cpu.regs.set_ime(true);
    gb.mmu.ie_reg = InterruptFlags::all();
    gb.mmu.if_reg = InterruptFlags::TIMER | InterruptFlags::LCD_STAT | InterruptFlags::JOYPAD;

    gb.step();
    assert_eq!(gb.cpu.regs.pc(), 0x0048);
    assert_eq!(
        gb.mmu.if_reg,
        InterruptFlags::TIMER | InterruptFlags::JOYPAD
    );
}

#[test]
fn disabled_sources_are_not_dispatched() {
    let mut gb = machine(&[0x00, 0x00]);
    gb.cpu.regs.set_ime(true);
    gb.mmu.ie_reg = InterruptFlags::TIMER;
    gb.mmu.if_reg = InterruptFlags::VBLANK;

    assert_eq!(gb.step(), 1);
    assert_eq!(gb.cpu.regs.pc(), ENTRY + 1);
    assert!(gb.cpu.ime());
}

#[test]
fn pending_interrupt_wakes_halt_without_ime() {
    // HALT ; NOP ; NOP
    let mut gb = machine(&[0x76, 0x00, 0x00]);
    gb.mmu.ie_reg = InterruptFlags::VBLANK;
    gb.mmu.if_reg = InterruptFlags::empty();

    gb.step();
    assert!(gb.cpu.halted());
    step_n(&mut gb, 10);
    assert!(gb.cpu.halted());
    assert_eq!(gb.cpu.regs.pc(), ENTRY + 1);

    gb.mmu.if_reg = InterruptFlags::VBLANK;
    // The woken CPU fetches on the same cycle.
    assert!(gb.tick());
    assert!(!gb.cpu.halted());
    assert!(!gb.cpu.ime());
    // Execution continues after HALT instead of jumping to the vector.
    assert_eq!(gb.cpu.regs.pc(), ENTRY + 2);
    assert!(gb.mmu.if_reg.contains(InterruptFlags::VBLANK));
    assert_eq!(gb.cpu.regs.sp(), 0xFFFE);
}

#[test]
fn halt_with_ime_services_interrupt_on_wake() {
    let mut gb = machine(&[0x76, 0x00]);
    gb.cpu.regs.set_ime(true);
    gb.mmu.ie_reg = InterruptFlags::TIMER;
    gb.mmu.if_reg = InterruptFlags::empty();

    gb.step();
    assert!(gb.cpu.halted());
    gb.mmu.if_reg = InterruptFlags::TIMER;
    assert_eq!(gb.step(), 5);
    assert_eq!(gb.cpu.regs.pc(), 0x0050);
    assert_eq!(gb.mmu.read_word(gb.cpu.regs.sp()), ENTRY + 1);
}

#[test]
fn halt_bug_executes_next_byte_twice() {
    // HALT ; INC B ; NOP
    let mut gb = machine(&[0x76, 0x04, 0x00]);
    gb.cpu.regs.set8(R8::B, 0);
    gb.mmu.ie_reg = InterruptFlags::VBLANK;
    gb.mmu.if_reg = InterruptFlags::VBLANK;

    gb.step();
    assert!(!gb.cpu.halted());
    assert_eq!(gb.cpu.regs.pc(), ENTRY + 1);

    gb.step();
    assert_eq!(gb.cpu.regs.get8(R8::B), 1);
    assert_eq!(gb.cpu.regs.pc(), ENTRY + 1);

    gb.step();
    assert_eq!(gb.cpu.regs.get8(R8::B), 2);
    assert_eq!(gb.cpu.regs.pc(), ENTRY + 2);
}

#[test]
fn ei_takes_effect_after_the_next_instruction() {
    // EI ; NOP ; NOP
    let mut gb = machine(&[0xFB, 0x00, 0x00]);
    gb.mmu.ie_reg = InterruptFlags::VBLANK;
    gb.mmu.if_reg = InterruptFlags::VBLANK;

    gb.step();
    assert!(!gb.cpu.ime());
    assert_eq!(gb.cpu.regs.pc(), ENTRY + 1);

    // The instruction after EI still runs with interrupts disabled.
    gb.step();
    assert!(gb.cpu.ime());
    assert_eq!(gb.cpu.regs.pc(), ENTRY + 2);

    gb.step();
    assert_eq!(gb.cpu.regs.pc(), 0x0040);
    assert_eq!(gb.mmu.read_word(gb.cpu.regs.sp()), ENTRY + 2);
}

#[test]
fn repeated_ei_does_not_restart_the_delay() {
    // EI ; EI ; NOP
    let mut gb = machine(&[0xFB, 0xFB, 0x00]);
    step_n(&mut gb, 2);
    assert!(gb.cpu.ime());
}

#[test]
fn di_cancels_pending_ei() {
    // EI ; DI ; NOP ; NOP
    let mut gb = machine(&[0xFB, 0xF3, 0x00, 0x00]);
    gb.mmu.ie_reg = InterruptFlags::VBLANK;
    gb.mmu.if_reg = InterruptFlags::VBLANK;
    step_n(&mut gb, 4);
    assert!(!gb.cpu.ime());
    assert_eq!(gb.cpu.regs.pc(), ENTRY + 4);
}

#[test]
fn reti_enables_interrupts_immediately() {
    let mut gb = machine(&[0xD9]);
    gb.cpu.regs.set_sp(0xFFFC);
    gb.mmu.write_word(0xFFFC, 0x0200);

    gb.step();
    assert_eq!(gb.cpu.regs.pc(), 0x0200);
    assert_eq!(gb.cpu.regs.sp(), 0xFFFE);
    assert!(gb.cpu.ime());
}

#[test]
fn timer_overflow_interrupt_reaches_handler() {
    // HALT ; NOP
    let mut gb = machine(&[0x76, 0x00]);
    gb.cpu.regs.set_ime(true);
    gb.mmu.ie_reg = InterruptFlags::TIMER;
    gb.mmu.if_reg = InterruptFlags::empty();
    gb.mmu.timer.tima = 0xFE;
    // Enabled, one increment every 4 m-cycles.
    gb.mmu.write_byte(0xFF07, 0x05);

    let mut reached = false;
    for _ in 0..32 {
        gb.step();
        if gb.cpu.regs.pc() == 0x0050 {
            reached = true;
            break;
        }
    }
    assert!(reached, "timer handler not reached: {}", gb.cpu.debug_state());
    assert!(!gb.mmu.if_reg.contains(InterruptFlags::TIMER));
}
