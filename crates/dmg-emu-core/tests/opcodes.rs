use dmg_emu_core::opcodes::{Instr, lookup, lookup_cb};

#[test]
fn both_tables_cover_every_byte() {
    for code in 0..=u8::MAX {
        let base = lookup(code);
        assert_eq!(base.code, code);
        assert!(!base.prefixed);
        assert!(base.length >= 1);

        let cb = lookup_cb(code);
        assert_eq!(cb.code, code);
        assert!(cb.prefixed);
        assert_eq!(cb.length, 2);
        assert!(cb.cycles >= 2);
    }
}

#[test]
fn only_illegal_and_prefix_entries_are_free() {
    for code in 0..=u8::MAX {
        let op = lookup(code);
        match op.instr {
            Instr::Illegal | Instr::PrefixCb => assert_eq!(op.cycles, 0, "{code:02X}"),
            _ => assert!(op.cycles > 0, "{code:02X} has no cost"),
        }
    }
}

#[test]
fn taken_branches_cost_more() {
    for code in 0..=u8::MAX {
        let op = lookup(code);
        match op.instr {
            Instr::Jr(Some(_)) | Instr::Jp(Some(_)) | Instr::Call(Some(_)) | Instr::Ret(Some(_)) => {
                assert!(op.taken_cycles > op.cycles, "{code:02X}")
            }
            _ => assert_eq!(op.taken_cycles, op.cycles, "{code:02X}"),
        }
    }
}

#[test]
fn tables_are_built_once() {
    assert!(std::ptr::eq(lookup(0x3E), lookup(0x3E)));
    assert!(std::ptr::eq(lookup_cb(0x11), lookup_cb(0x11)));
}

#[test]
fn mnemonics_cover_known_families() {
    assert_eq!(lookup(0x00).mnemonic, "NOP");
    assert_eq!(lookup(0x76).mnemonic, "HALT");
    assert_eq!(lookup(0xD9).mnemonic, "RETI");
    assert_eq!(lookup(0xF0).mnemonic, "LDH");
    assert_eq!(lookup(0xDD).mnemonic, "ILLEGAL");
    assert_eq!(lookup_cb(0x30).mnemonic, "SWAP");
    assert_eq!(lookup_cb(0xC7).mnemonic, "SET");
}
