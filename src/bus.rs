//! CPU address bus.
//!
//! $0000-$07FF  2KB internal RAM
//! $0800-$1FFF  RAM mirrors (every $0800)
//! $2000-$2007  PPU registers
//! $2008-$3FFF  PPU register mirrors (not modeled)
//! $4000-$4017  APU and I/O registers (only $4014 OAM DMA is modeled)
//! $4018-$401F  APU and I/O test mode (not modeled)
//! $4020-$FFFF  cartridge

use std::convert::TryFrom;
use std::error::Error;
use std::fmt;

use crate::ines::Cartridge;
use crate::ppu::{Ppu, OAM_DMA};

pub const RAM_SIZE: usize = 0x0800;
pub const RAM_MASK: u16 = 0x07FF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// An access computed an address that does not fit in 16 bits.
    AddressOutOfRange(u32),
    /// The address decodes to a region this core does not model.
    UnimplementedRegion(u16),
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusError::AddressOutOfRange(addr) => write!(f, "address {:#X} is outside the 16-bit address space", addr),
            BusError::UnimplementedRegion(addr) => write!(f, "access to unimplemented region at {:#06X}", addr),
        }
    }
}

impl Error for BusError {}

/// Byte-addressed memory as seen by the CPU.
pub trait Memory {
    fn read(&mut self, addr: u16) -> Result<u8, BusError>;
    fn write(&mut self, addr: u16, value: u8) -> Result<(), BusError>;

    /// Little-endian word at `addr`, `addr + 1`. The high byte address does
    /// not wrap: a word read at $FFFF is out of range.
    fn read_word(&mut self, addr: u16) -> Result<u16, BusError> {
        let hi_addr = u32::from(addr) + 1;
        let hi_addr = u16::try_from(hi_addr).map_err(|_| BusError::AddressOutOfRange(hi_addr))?;
        let lo = self.read(addr)? as u16;
        let hi = self.read(hi_addr)? as u16;
        Ok((hi << 8) | lo)
    }
}

/// Address decoder over the parts of the console the CPU can reach. Built on
/// demand from the components owned by [`crate::Nes`].
pub struct Bus<'a> {
    ram: &'a mut [u8; RAM_SIZE],
    ppu: &'a mut Ppu,
    cartridge: &'a mut Cartridge,
}

impl<'a> Bus<'a> {
    pub fn new(ram: &'a mut [u8; RAM_SIZE], ppu: &'a mut Ppu, cartridge: &'a mut Cartridge) -> Bus<'a> {
        Bus { ram, ppu, cartridge }
    }
}

impl Memory for Bus<'_> {
    fn read(&mut self, addr: u16) -> Result<u8, BusError> {
        match addr {
            0x0000..=0x1FFF => Ok(self.ram[(addr & RAM_MASK) as usize]),
            0x2000..=0x2007 | OAM_DMA => self.ppu.read(addr),
            0x2008..=0x3FFF => Err(BusError::UnimplementedRegion(addr)),
            0x4000..=0x401F => Err(BusError::UnimplementedRegion(addr)),
            0x4020..=0xFFFF => self.cartridge.read(addr),
        }
    }

    fn write(&mut self, addr: u16, value: u8) -> Result<(), BusError> {
        match addr {
            0x0000..=0x1FFF => {
                self.ram[(addr & RAM_MASK) as usize] = value;
                Ok(())
            }
            0x2000..=0x2007 | OAM_DMA => self.ppu.write(addr, value),
            0x2008..=0x3FFF => Err(BusError::UnimplementedRegion(addr)),
            0x4000..=0x401F => Err(BusError::UnimplementedRegion(addr)),
            0x4020..=0xFFFF => self.cartridge.write(addr, value),
        }
    }
}
