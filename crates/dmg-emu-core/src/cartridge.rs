use std::{
    fs, io,
    path::{Path, PathBuf},
};

use log::{info, warn};
use thiserror::Error;

use crate::{
    device::Device,
    mbc::{Mbc, Mbc1, NoBanking, RAM_BANK_SIZE, ROM_BANK_SIZE},
};

/// Smallest buffer that still contains a complete header.
pub const HEADER_END: usize = 0x0150;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeaderError {
    #[error("unsupported cartridge type ${0:02X}")]
    UnsupportedCartridgeType(u8),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BankSizeError {
    #[error("unknown ROM size code ${0:02X}")]
    UnknownRomSize(u8),
    #[error("unknown RAM size code ${0:02X}")]
    UnknownRamSize(u8),
    #[error("{controller:?} cannot address {banks} ROM banks")]
    RomBanks {
        controller: ControllerKind,
        banks: usize,
    },
    #[error("{controller:?} cannot address {size} bytes of external RAM")]
    RamBanks {
        controller: ControllerKind,
        size: usize,
    },
}

#[derive(Error, Debug)]
pub enum CartridgeError {
    #[error("ROM image is {len} bytes but at least {expected} are required")]
    Truncated { len: usize, expected: usize },
    #[error(transparent)]
    Header(#[from] HeaderError),
    #[error(transparent)]
    BankSize(#[from] BankSizeError),
    #[error("failed to read ROM: {0}")]
    Io(#[from] io::Error),
}

/// Bank controller family named by the cartridge type byte (0x0147).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerKind {
    NoBanking,
    Type1,
}

impl ControllerKind {
    fn max_rom_banks(self) -> usize {
        match self {
            ControllerKind::NoBanking => 2,
            ControllerKind::Type1 => 128,
        }
    }

    fn max_ram_size(self) -> usize {
        match self {
            ControllerKind::NoBanking => 0,
            ControllerKind::Type1 => 4 * RAM_BANK_SIZE,
        }
    }
}

/// Decoded cartridge header (0x0100-0x014F).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub title: String,
    pub manufacturer: String,
    pub cgb_flag: u8,
    pub new_licensee: String,
    pub sgb_flag: u8,
    pub cartridge_type: u8,
    pub rom_size_code: u8,
    pub ram_size_code: u8,
    pub destination: u8,
    pub old_licensee: u8,
    pub version: u8,
    pub header_checksum: u8,
    pub global_checksum: u16,
}

impl Header {
    pub fn parse(data: &[u8]) -> Result<Self, CartridgeError> {
        if data.len() < HEADER_END {
            return Err(CartridgeError::Truncated {
                len: data.len(),
                expected: HEADER_END,
            });
        }

        Ok(Self {
            title: ascii_field(&data[0x0134..0x0143]),
            manufacturer: ascii_field(&data[0x013F..0x0143]),
            cgb_flag: data[0x0143],
            new_licensee: ascii_field(&data[0x0144..0x0146]),
            sgb_flag: data[0x0146],
            cartridge_type: data[0x0147],
            rom_size_code: data[0x0148],
            ram_size_code: data[0x0149],
            destination: data[0x014A],
            old_licensee: data[0x014B],
            version: data[0x014C],
            header_checksum: data[0x014D],
            global_checksum: u16::from_be_bytes([data[0x014E], data[0x014F]]),
        })
    }

    pub fn controller(&self) -> Result<ControllerKind, HeaderError> {
        match self.cartridge_type {
            0x00 => Ok(ControllerKind::NoBanking),
            0x01..=0x03 => Ok(ControllerKind::Type1),
            other => Err(HeaderError::UnsupportedCartridgeType(other)),
        }
    }

    pub fn has_battery(&self) -> bool {
        self.cartridge_type == 0x03
    }

    pub fn rom_banks(&self) -> Result<usize, BankSizeError> {
        match self.rom_size_code {
            code @ 0x00..=0x08 => Ok(2 << code),
            code => Err(BankSizeError::UnknownRomSize(code)),
        }
    }

    /// External RAM size in bytes.
    pub fn ram_size(&self) -> Result<usize, BankSizeError> {
        match self.ram_size_code {
            0x00 => Ok(0),
            0x01 => Ok(0x800),
            0x02 => Ok(RAM_BANK_SIZE),
            0x03 => Ok(4 * RAM_BANK_SIZE),
            0x04 => Ok(16 * RAM_BANK_SIZE),
            0x05 => Ok(8 * RAM_BANK_SIZE),
            code => Err(BankSizeError::UnknownRamSize(code)),
        }
    }

    pub fn computed_checksum(data: &[u8]) -> u8 {
        data.get(0x0134..=0x014C)
            .unwrap_or_default()
            .iter()
            .fold(0u8, |x, &b| x.wrapping_sub(b).wrapping_sub(1))
    }

    pub fn cgb_supported(&self) -> bool {
        self.cgb_flag & 0x80 != 0
    }
}

fn ascii_field(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).trim().to_string()
}

/// A loaded game: parsed header plus the bank controller owning ROM and RAM.
#[derive(Debug)]
pub struct Cartridge {
    pub header: Header,
    mbc: Mbc,
    save_path: Option<PathBuf>,
}

impl Cartridge {
    pub fn new(data: Vec<u8>) -> Result<Self, CartridgeError> {
        let header = Header::parse(&data)?;
        let controller = header.controller()?;
        let rom_banks = header.rom_banks()?;
        let ram_size = header.ram_size()?;

        if rom_banks > controller.max_rom_banks() {
            return Err(BankSizeError::RomBanks {
                controller,
                banks: rom_banks,
            }
            .into());
        }
        if ram_size > controller.max_ram_size() {
            return Err(BankSizeError::RamBanks {
                controller,
                size: ram_size,
            }
            .into());
        }
        let rom_len = rom_banks * ROM_BANK_SIZE;
        if data.len() < rom_len {
            return Err(CartridgeError::Truncated {
                len: data.len(),
                expected: rom_len,
            });
        }

        let checksum = Header::computed_checksum(&data);
        if checksum != header.header_checksum {
            warn!(
                "header checksum mismatch: stored ${:02X}, computed ${checksum:02X}",
                header.header_checksum
            );
        }

        let mbc = match controller {
            ControllerKind::NoBanking => Mbc::NoBanking(NoBanking::new(data)),
            ControllerKind::Type1 => Mbc::Type1(Mbc1::new(data, rom_banks, ram_size)),
        };

        info!(
            "Loaded ROM: {} (controller: {controller:?}, ROM banks: {rom_banks}, RAM: {ram_size} bytes)",
            header.title
        );

        Ok(Self {
            header,
            mbc,
            save_path: None,
        })
    }

    /// Load a ROM from disk. Battery-backed cartridges pick up `<rom>.sav`
    /// next to the image when present.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CartridgeError> {
        let data = fs::read(&path)?;
        let mut cart = Self::new(data)?;

        if cart.header.has_battery() {
            let save = path.as_ref().with_extension("sav");
            if let Ok(bytes) = fs::read(&save) {
                for (d, s) in cart.mbc.ram_mut().iter_mut().zip(bytes.iter()) {
                    *d = *s;
                }
            }
            cart.save_path = Some(save);
        }
        Ok(cart)
    }

    pub fn controller(&self) -> ControllerKind {
        match self.mbc {
            Mbc::NoBanking(_) => ControllerKind::NoBanking,
            Mbc::Type1(_) => ControllerKind::Type1,
        }
    }

    pub fn mbc(&self) -> &Mbc {
        &self.mbc
    }

    pub fn ram(&self) -> &[u8] {
        self.mbc.ram()
    }

    pub fn ram_mut(&mut self) -> &mut [u8] {
        self.mbc.ram_mut()
    }

    /// Write battery-backed RAM to the save file chosen by [`from_file`].
    /// A no-op for cartridges without a battery or loaded from memory.
    ///
    /// [`from_file`]: Cartridge::from_file
    pub fn save_ram(&self) -> io::Result<()> {
        if let Some(path) = &self.save_path
            && !self.ram().is_empty()
        {
            fs::write(path, self.ram())?;
        }
        Ok(())
    }
}

impl Device for Cartridge {
    fn read(&self, addr: u16) -> u8 {
        self.mbc.read(addr)
    }

    fn write(&mut self, addr: u16, val: u8) {
        self.mbc.write(addr, val);
    }

    fn reset(&mut self) {
        self.mbc.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes(cart_type: u8, rom_code: u8, ram_code: u8) -> Vec<u8> {
        let mut data = vec![0u8; (2 << rom_code.min(8)) * ROM_BANK_SIZE];
        data[0x0134..0x0139].copy_from_slice(b"TETRA");
        data[0x0147] = cart_type;
        data[0x0148] = rom_code;
        data[0x0149] = ram_code;
        data[0x014D] = Header::computed_checksum(&data);
        data
    }

    #[test]
    fn header_fields_decode() {
        let mut data = header_bytes(0x03, 0x01, 0x02);
        data[0x0143] = 0x80;
        data[0x0144..0x0146].copy_from_slice(b"01");
        data[0x014A] = 0x01;
        data[0x014B] = 0x33;
        data[0x014C] = 0x02;
        data[0x014E] = 0xAB;
        data[0x014F] = 0xCD;

        let header = Header::parse(&data).unwrap();
        assert_eq!(header.title, "TETRA");
        assert!(header.cgb_supported());
        assert_eq!(header.new_licensee, "01");
        assert_eq!(header.destination, 0x01);
        assert_eq!(header.old_licensee, 0x33);
        assert_eq!(header.version, 0x02);
        assert_eq!(header.global_checksum, 0xABCD);
        assert!(header.has_battery());
        assert_eq!(header.rom_banks(), Ok(4));
        assert_eq!(header.ram_size(), Ok(0x2000));
    }

    /// Tetris header: title, old licensee 0x01, everything else zero.
    fn tetris_header(version: u8) -> Vec<u8> {
        let mut data = vec![0u8; 2 * ROM_BANK_SIZE];
        data[0x0134..0x013A].copy_from_slice(b"TETRIS");
        data[0x014B] = 0x01;
        data[0x014C] = version;
        data
    }

    #[test]
    fn checksum_of_known_headers() {
        assert_eq!(Header::computed_checksum(&tetris_header(0x00)), 0x0B);
        assert_eq!(Header::computed_checksum(&tetris_header(0x01)), 0x0A);
    }

    #[test]
    fn checksum_mismatch_still_loads() {
        let mut data = header_bytes(0x01, 0x00, 0x00);
        let good = data[0x014D];
        data[0x014D] = good.wrapping_add(1);

        let cart = Cartridge::new(data).unwrap();
        assert_eq!(cart.header.header_checksum, good.wrapping_add(1));
        assert_eq!(cart.controller(), ControllerKind::Type1);
    }

    #[test]
    fn unsupported_cartridge_type_is_header_error() {
        let data = header_bytes(0x19, 0x00, 0x00);
        let err = Cartridge::new(data).unwrap_err();
        assert!(matches!(
            err,
            CartridgeError::Header(HeaderError::UnsupportedCartridgeType(0x19))
        ));
    }

    #[test]
    fn no_banking_requires_single_rom_bank() {
        let data = header_bytes(0x00, 0x01, 0x00);
        let err = Cartridge::new(data).unwrap_err();
        assert!(matches!(
            err,
            CartridgeError::BankSize(BankSizeError::RomBanks {
                controller: ControllerKind::NoBanking,
                banks: 4
            })
        ));
    }

    #[test]
    fn oversized_ram_is_bank_size_error() {
        let data = header_bytes(0x03, 0x00, 0x04);
        assert!(matches!(
            Cartridge::new(data),
            Err(CartridgeError::BankSize(BankSizeError::RamBanks { .. }))
        ));
    }

    #[test]
    fn unknown_size_codes_are_rejected() {
        let mut data = header_bytes(0x01, 0x00, 0x00);
        data[0x0148] = 0x52;
        assert!(matches!(
            Cartridge::new(data.clone()),
            Err(CartridgeError::BankSize(BankSizeError::UnknownRomSize(0x52)))
        ));
        data[0x0148] = 0x00;
        data[0x0149] = 0x09;
        assert!(matches!(
            Cartridge::new(data),
            Err(CartridgeError::BankSize(BankSizeError::UnknownRamSize(0x09)))
        ));
    }

    #[test]
    fn short_buffers_are_truncated_errors() {
        assert!(matches!(
            Cartridge::new(vec![0; 0x100]),
            Err(CartridgeError::Truncated {
                len: 0x100,
                expected: HEADER_END
            })
        ));

        let mut data = header_bytes(0x01, 0x02, 0x00);
        data.truncate(0x8000);
        assert!(matches!(
            Cartridge::new(data),
            Err(CartridgeError::Truncated {
                len: 0x8000,
                expected: 0x20000
            })
        ));
    }
}
