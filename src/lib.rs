//! Instruction-execution and timing core for the NES: a 6502 CPU, the CPU
//! address bus, a scanline/vblank timing model of the PPU, and iNES
//! cartridge loading.

pub mod bus;
pub mod cpu;
pub mod ines;
pub mod nes;
pub mod nrom_mapper;
pub mod opcodes;
pub mod ppu;

pub use bus::{Bus, BusError, Memory};
pub use cpu::{Cpu, CpuError, Registers, Snapshot, Status};
pub use ines::{Cartridge, CartridgeError, INesHeader, Mirroring};
pub use nes::Nes;
pub use ppu::{Ppu, Register};
