use std::{fs, path::Path, process::Command};

use tempfile::tempdir;

const ROM_SIZE: usize = 0x8000;

/// 32 KiB ROM-only image with `code` at the entry point.
fn write_rom(path: &Path, code: &[u8]) {
    let mut rom = vec![0u8; ROM_SIZE];
    rom[0x0100..0x0100 + code.len()].copy_from_slice(code);
    rom[0x0134..0x0138].copy_from_slice(b"CLI ");
    fs::write(path, rom).unwrap();
}

fn run(args: &[&str]) -> (String, String) {
    let out = Command::new(env!("CARGO_BIN_EXE_dmg-emu"))
        .args(args)
        .output()
        .unwrap();
    assert!(out.status.success());
    (
        String::from_utf8_lossy(&out.stdout).into_owned(),
        String::from_utf8_lossy(&out.stderr).into_owned(),
    )
}

#[test]
fn prints_final_register_state() {
    let dir = tempdir().unwrap();
    let rom = dir.path().join("nop.gb");
    // LD A,$42 ; HALT
    write_rom(&rom, &[0x3E, 0x42, 0x76]);

    let (stdout, _) = run(&[rom.to_str().unwrap(), "--cycles", "16"]);
    let last = stdout.lines().last().unwrap();
    assert!(last.starts_with("AF:42"), "{last}");
    assert!(last.contains("PC:0103"), "{last}");
}

#[test]
fn trace_lists_each_instruction() {
    let dir = tempdir().unwrap();
    let rom = dir.path().join("trace.gb");
    // LD A,$42 ; CB SWAP A ; HALT
    write_rom(&rom, &[0x3E, 0x42, 0xCB, 0x37, 0x76]);

    let (stdout, _) = run(&[rom.to_str().unwrap(), "--cycles", "16", "--trace"]);
    let lines: Vec<&str> = stdout.lines().collect();
    assert!(lines[0].starts_with("0100  LD A,$42"), "{}", lines[0]);
    assert!(lines[1].starts_with("0102  SWAP A"), "{}", lines[1]);
    assert!(lines[2].starts_with("0104  HALT"), "{}", lines[2]);
    assert!(lines.last().unwrap().starts_with("AF:24"));
}

#[test]
fn trace_includes_instruction_after_halt_wakeup() {
    let dir = tempdir().unwrap();
    let rom = dir.path().join("wake.gb");
    // XOR A ; LDH ($0F),A ; LD A,$01 ; LDH ($FF),A ; HALT ; INC A ; JR -2
    write_rom(
        &rom,
        &[0xAF, 0xE0, 0x0F, 0x3E, 0x01, 0xE0, 0xFF, 0x76, 0x3C, 0x18, 0xFE],
    );

    // VBlank arrives within one frame and wakes the CPU with IME clear.
    let (stdout, _) = run(&[rom.to_str().unwrap(), "--frames", "1", "--trace"]);
    let lines: Vec<&str> = stdout.lines().collect();
    assert!(lines[4].starts_with("0107  HALT"), "{}", lines[4]);
    assert!(lines[5].starts_with("0108  INC A"), "{}", lines[5]);
    assert!(lines[6].starts_with("0109  JR -2"), "{}", lines[6]);
}

#[test]
fn bad_rom_is_reported() {
    let dir = tempdir().unwrap();
    let rom = dir.path().join("short.gb");
    fs::write(&rom, [0u8; 16]).unwrap();

    let (stdout, stderr) = run(&[rom.to_str().unwrap()]);
    assert!(stdout.is_empty());
    assert!(stderr.contains("Failed to load ROM"), "{stderr}");
}
