use std::fmt::Debug;

use crate::bus::BusError;
use crate::ines::{CartridgeError, INesHeader};

pub const PRG_RAM_SIZE: usize = 8 * 1024;

/// Cartridge-side view of CPU addresses $4020-$FFFF.
pub trait Mapper: Debug {
    fn read(&self, addr: u16) -> Result<u8, BusError>;
    fn write(&mut self, addr: u16, value: u8) -> Result<(), BusError>;
}

pub fn mapper_name(number: u16) -> &'static str {
    match number {
        0 => "NROM",
        1 => "MMC1",
        2 => "UxROM",
        3 => "CNROM",
        4 => "MMC3",
        7 => "AxROM",
        _ => "unknown",
    }
}

pub fn create_mapper(header: &INesHeader, prg_banks: Vec<Vec<u8>>) -> Result<Box<dyn Mapper>, CartridgeError> {
    match header.mapper_number() {
        0 => Ok(Box::new(Nrom::new(prg_banks, header.has_persistent_memory())?)),
        other => Err(CartridgeError::UnsupportedMapper(other)),
    }
}

/// Mapper 0: no registers. $8000-$BFFF is the first PRG bank, $C000-$FFFF
/// the last one (the same bank for 16KB carts).
#[derive(Debug)]
pub struct Nrom {
    prg_rom: Vec<Vec<u8>>,
    upper_bank: usize,
    prg_ram: Option<Vec<u8>>,
}

impl Nrom {
    pub fn new(prg_rom: Vec<Vec<u8>>, battery: bool) -> Result<Nrom, CartridgeError> {
        if prg_rom.is_empty() || prg_rom[0].is_empty() {
            return Err(CartridgeError::MissingPrgRom);
        }

        let upper_bank = prg_rom.len() - 1;
        let prg_ram = if battery { Some(vec![0; PRG_RAM_SIZE]) } else { None };

        Ok(Nrom {
            prg_rom,
            upper_bank,
            prg_ram,
        })
    }

    fn bank_byte(&self, bank: usize, offset: u16) -> u8 {
        let bank = &self.prg_rom[bank];
        bank[offset as usize % bank.len()]
    }
}

impl Mapper for Nrom {
    fn read(&self, addr: u16) -> Result<u8, BusError> {
        match addr {
            0x6000..=0x7FFF => match &self.prg_ram {
                Some(ram) => Ok(ram[(addr - 0x6000) as usize]),
                None => Err(BusError::UnimplementedRegion(addr)),
            },
            0x8000..=0xBFFF => Ok(self.bank_byte(0, addr - 0x8000)),
            0xC000..=0xFFFF => Ok(self.bank_byte(self.upper_bank, addr - 0xC000)),
            _ => Err(BusError::UnimplementedRegion(addr)),
        }
    }

    fn write(&mut self, addr: u16, value: u8) -> Result<(), BusError> {
        match addr {
            0x6000..=0x7FFF => match &mut self.prg_ram {
                Some(ram) => {
                    ram[(addr - 0x6000) as usize] = value;
                    Ok(())
                }
                None => Err(BusError::UnimplementedRegion(addr)),
            },
            // ROM; NROM has nothing to latch
            0x8000..=0xFFFF => Ok(()),
            _ => Err(BusError::UnimplementedRegion(addr)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bank(fill: u8) -> Vec<u8> {
        let mut bank = vec![fill; 0x4000];
        bank[0x3FFF] = fill.wrapping_add(1);
        bank
    }

    #[test]
    fn single_bank_is_mirrored() {
        let nrom = Nrom::new(vec![bank(0x10)], false).unwrap();

        assert_eq!(nrom.read(0x8000).unwrap(), 0x10);
        assert_eq!(nrom.read(0xC000).unwrap(), 0x10);
        assert_eq!(nrom.read(0xBFFF).unwrap(), 0x11);
        assert_eq!(nrom.read(0xFFFF).unwrap(), 0x11);
    }

    #[test]
    fn two_banks_map_first_and_last() {
        let nrom = Nrom::new(vec![bank(0x10), bank(0x20)], false).unwrap();

        assert_eq!(nrom.read(0x8000).unwrap(), 0x10);
        assert_eq!(nrom.read(0xC000).unwrap(), 0x20);
        assert_eq!(nrom.read(0xFFFF).unwrap(), 0x21);
    }

    #[test]
    fn battery_ram_window() {
        let mut nrom = Nrom::new(vec![bank(0)], true).unwrap();
        nrom.write(0x6000, 0xAA).unwrap();
        nrom.write(0x7FFF, 0xBB).unwrap();

        assert_eq!(nrom.read(0x6000).unwrap(), 0xAA);
        assert_eq!(nrom.read(0x7FFF).unwrap(), 0xBB);
    }

    #[test]
    fn missing_ram_and_expansion_are_unimplemented() {
        let mut nrom = Nrom::new(vec![bank(0)], false).unwrap();

        assert_eq!(nrom.read(0x6000), Err(BusError::UnimplementedRegion(0x6000)));
        assert_eq!(nrom.write(0x7000, 1), Err(BusError::UnimplementedRegion(0x7000)));
        assert_eq!(nrom.read(0x4020), Err(BusError::UnimplementedRegion(0x4020)));
    }

    #[test]
    fn rom_writes_are_ignored() {
        let mut nrom = Nrom::new(vec![bank(0x10)], false).unwrap();
        nrom.write(0x8000, 0xFF).unwrap();

        assert_eq!(nrom.read(0x8000).unwrap(), 0x10);
    }

    #[test]
    fn empty_prg_rom_is_rejected() {
        assert!(matches!(Nrom::new(vec![], false), Err(CartridgeError::MissingPrgRom)));
    }
}
