use std::path::PathBuf;

use clap::Parser;
use dmg_emu_core::{
    cartridge::Cartridge, gameboy::GameBoy, opcodes, ppu::FRAME_CYCLES,
    timer::M_CYCLES_PER_SECOND,
};
use log::info;

#[derive(Parser)]
#[command(about = "Headless Game Boy (DMG) CPU runner")]
struct Args {
    /// Path to ROM file
    rom: PathBuf,

    /// Number of machine cycles to run
    #[arg(long, conflicts_with = "frames")]
    cycles: Option<u64>,

    /// Number of video frames to run
    #[arg(long)]
    frames: Option<u64>,

    /// Print every executed instruction with the register state
    #[arg(long)]
    trace: bool,

    /// Write battery-backed cartridge RAM back to disk on exit
    #[arg(long)]
    save: bool,
}

impl Args {
    fn cycle_budget(&self) -> u64 {
        match (self.cycles, self.frames) {
            (Some(cycles), _) => cycles,
            (None, Some(frames)) => frames * FRAME_CYCLES as u64,
            (None, None) => M_CYCLES_PER_SECOND as u64,
        }
    }
}

/// Render the instruction at `pc` without executing it.
fn disassemble_at(gb: &GameBoy, pc: u16) -> String {
    let code = gb.mmu.read_byte(pc);
    let op = if code == 0xCB {
        opcodes::lookup_cb(gb.mmu.read_byte(pc.wrapping_add(1)))
    } else {
        opcodes::lookup(code)
    };
    let bytes: Vec<u8> = (0..op.length as u16)
        .map(|i| gb.mmu.read_byte(pc.wrapping_add(i)))
        .collect();
    op.disassemble(&bytes)
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let cart = match Cartridge::from_file(&args.rom) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load ROM: {e}");
            return;
        }
    };

    let mut gb = GameBoy::from_cartridge(cart);
    let budget = args.cycle_budget();
    info!("Running {} for {budget} m-cycles", args.rom.display());

    let mut elapsed = 0u64;
    while elapsed < budget {
        if args.trace && gb.cpu.ticks_remaining() == 0 {
            // Interrupts raised during the tick decide whether it fetches,
            // so keep the pre-tick state and print it afterwards.
            let before = gb.cpu.clone();
            let pc = before.regs.pc();
            let line = disassemble_at(&gb, pc);
            if gb.tick() {
                println!("{pc:04X}  {line:<20} {}", before.debug_state());
            }
        } else {
            gb.tick();
        }
        elapsed += 1;
    }

    println!("{}", gb.cpu.debug_state());

    if args.save
        && let Some(cart) = gb.mmu.cart.as_ref()
        && let Err(e) = cart.save_ram()
    {
        eprintln!("Failed to write save file: {e}");
    }
}
