use std::error::Error;
use std::fmt;
use std::fs::read;
use std::io;
use std::path::Path;

use crate::bus::BusError;
use crate::nrom_mapper::{create_mapper, Mapper};

pub const HEADER_SIZE: usize = 16;
pub const TRAINER_SIZE: usize = 512;
pub const PRG_BANK_SIZE: usize = 16 * 1024;
pub const CHR_BANK_SIZE: usize = 8 * 1024;

const MAGIC: [u8; 3] = [b'N', b'E', b'S'];

#[derive(Debug)]
pub enum CartridgeError {
    Io(io::Error),
    InvalidMagic([u8; 3]),
    Truncated { expected: usize, actual: usize },
    UnsupportedMapper(u16),
    MissingPrgRom,
}

impl fmt::Display for CartridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CartridgeError::Io(err) => write!(f, "could not read ROM: {}", err),
            CartridgeError::InvalidMagic(magic) => write!(f, "not an iNES image (magic {:02X?})", magic),
            CartridgeError::Truncated { expected, actual } => {
                write!(f, "ROM image is {} bytes, header describes {}", actual, expected)
            }
            CartridgeError::UnsupportedMapper(id) => write!(f, "unsupported mapper {}", id),
            CartridgeError::MissingPrgRom => write!(f, "ROM image has no PRG ROM"),
        }
    }
}

impl Error for CartridgeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CartridgeError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for CartridgeError {
    fn from(err: io::Error) -> CartridgeError {
        CartridgeError::Io(err)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mirroring {
    Horizontal,
    Vertical,
    FourScreen,
}

/// Decoded fields of the 16-byte iNES header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct INesHeader {
    prg_size: u8,
    chr_size: u8,
    flags_6: u8,
    flags_7: u8,
    flags_9: u8,
}

impl INesHeader {
    pub fn from_bytes(input: &[u8]) -> Result<INesHeader, CartridgeError> {
        if input.len() < HEADER_SIZE {
            return Err(CartridgeError::Truncated { expected: HEADER_SIZE, actual: input.len() });
        }
        if input[..3] != MAGIC {
            return Err(CartridgeError::InvalidMagic([input[0], input[1], input[2]]));
        }

        Ok(INesHeader {
            prg_size: input[4],
            chr_size: input[5],
            flags_6: input[6],
            flags_7: input[7],
            flags_9: input[9],
        })
    }

    /// Number of 16KB PRG ROM pages.
    pub fn prg_rom_pages(&self) -> usize {
        self.page_count(self.prg_size, self.prg_size_ext(), PRG_BANK_SIZE)
    }

    /// Number of 8KB CHR ROM pages.
    pub fn chr_rom_pages(&self) -> usize {
        self.page_count(self.chr_size, self.chr_size_ext(), CHR_BANK_SIZE)
    }

    pub fn prg_rom_size_bytes(&self) -> usize {
        self.size_bytes(self.prg_size, self.prg_size_ext(), PRG_BANK_SIZE)
    }

    pub fn chr_rom_size_bytes(&self) -> usize {
        self.size_bytes(self.chr_size, self.chr_size_ext(), CHR_BANK_SIZE)
    }

    pub fn mapper_number(&self) -> u16 {
        u16::from(self.flags_6 >> 4) | u16::from(self.flags_7 & 0xF0)
    }

    pub fn mirroring(&self) -> Mirroring {
        if self.four_screen_vram() {
            Mirroring::FourScreen
        } else if self.flags_6 & 0x01 != 0 {
            Mirroring::Vertical
        } else {
            Mirroring::Horizontal
        }
    }

    pub fn has_persistent_memory(&self) -> bool {
        self.flags_6 & 0x02 != 0
    }

    pub fn has_trainer(&self) -> bool {
        self.flags_6 & 0x04 != 0
    }

    pub fn four_screen_vram(&self) -> bool {
        self.flags_6 & 0x08 != 0
    }

    pub fn is_ines_2(&self) -> bool {
        (self.flags_7 >> 2) & 0x03 == 0b10
    }

    /// NES 2.0 PRG ROM size MSB nibble (byte 9, low nibble).
    pub fn prg_size_ext(&self) -> u8 {
        self.flags_9 & 0x0F
    }

    /// NES 2.0 CHR ROM size MSB nibble (byte 9, high nibble).
    pub fn chr_size_ext(&self) -> u8 {
        self.flags_9 >> 4
    }

    fn page_count(&self, lsb: u8, ext: u8, unit: usize) -> usize {
        let bytes = self.size_bytes(lsb, ext, unit);
        (bytes + unit - 1) / unit
    }

    fn size_bytes(&self, lsb: u8, ext: u8, unit: usize) -> usize {
        if !self.is_ines_2() || ext == 0 {
            return lsb as usize * unit;
        }
        if ext == 0x0F {
            // exponent-multiplier form: 2^E * (MM * 2 + 1)
            let exponent = u32::from(lsb >> 2).min(40);
            let multiplier = (lsb & 0x03) as usize * 2 + 1;
            return (1usize << exponent) * multiplier;
        }
        ((ext as usize) << 8 | lsb as usize) * unit
    }
}

/// A loaded cartridge: decoded header, banks sliced from the image, and the
/// mapper selected by the header.
#[derive(Debug)]
pub struct Cartridge {
    header: INesHeader,
    trainer: Option<Vec<u8>>,
    chr_banks: Vec<Vec<u8>>,
    mapper: Box<dyn Mapper>,
}

impl Cartridge {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Cartridge, CartridgeError> {
        let contents = read(path)?;

        Cartridge::from_bytes(&contents)
    }

    pub fn from_bytes(contents: &[u8]) -> Result<Cartridge, CartridgeError> {
        let header = INesHeader::from_bytes(contents)?;
        let mut ptr = HEADER_SIZE;

        let trainer_size = if header.has_trainer() { TRAINER_SIZE } else { 0 };
        let expected = HEADER_SIZE + trainer_size + header.prg_rom_size_bytes() + header.chr_rom_size_bytes();
        if contents.len() < expected {
            return Err(CartridgeError::Truncated { expected, actual: contents.len() });
        }

        let trainer = if header.has_trainer() {
            let trainer = contents[ptr..ptr + TRAINER_SIZE].to_vec();
            ptr += TRAINER_SIZE;
            Some(trainer)
        } else {
            None
        };

        let prg_rom = &contents[ptr..ptr + header.prg_rom_size_bytes()];
        ptr += header.prg_rom_size_bytes();

        let chr_rom = &contents[ptr..ptr + header.chr_rom_size_bytes()];

        let prg_banks = slice_banks(prg_rom, PRG_BANK_SIZE);
        let chr_banks = slice_banks(chr_rom, CHR_BANK_SIZE);
        let mapper = create_mapper(&header, prg_banks)?;

        Ok(Cartridge {
            header,
            trainer,
            chr_banks,
            mapper,
        })
    }

    pub fn header(&self) -> &INesHeader {
        &self.header
    }

    pub fn mapper_number(&self) -> u16 {
        self.header.mapper_number()
    }

    pub fn trainer(&self) -> Option<&[u8]> {
        self.trainer.as_deref()
    }

    pub fn chr_banks(&self) -> &[Vec<u8>] {
        &self.chr_banks
    }

    pub fn read(&self, addr: u16) -> Result<u8, BusError> {
        self.mapper.read(addr)
    }

    pub fn write(&mut self, addr: u16, value: u8) -> Result<(), BusError> {
        self.mapper.write(addr, value)
    }
}

fn slice_banks(rom: &[u8], bank_size: usize) -> Vec<Vec<u8>> {
    rom.chunks(bank_size).map(|bank| bank.to_vec()).collect()
}
