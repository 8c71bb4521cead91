use slog::{debug, info, o, Logger};

use crate::bus::{Bus, BusError, Memory, RAM_SIZE};
use crate::cpu::{Cpu, CpuError};
use crate::ines::{Cartridge, CartridgeError};
use crate::nrom_mapper::mapper_name;
use crate::ppu::{Ppu, OAM_SIZE};

/// CPU stall for a $4014 transfer, plus one when it starts on an odd cycle.
const DMA_CYCLES: u32 = 513;

/// The console: owns every component and the 2KB of internal RAM. The CPU
/// reaches the rest through a [`Bus`] built for each operation.
#[derive(Debug)]
pub struct Nes {
    cpu: Cpu,
    ppu: Ppu,
    ram: [u8; RAM_SIZE],
    cartridge: Cartridge,
    cycles: u64,
    log: Logger,
}

impl Nes {
    pub fn new(cartridge: Cartridge, log: Logger) -> Nes {
        let cpu = Cpu::new(log.clone());
        let ppu = Ppu::new(log.clone());
        let log = log.new(o!("component" => "nes"));

        let header = cartridge.header();
        info!(log, "cartridge loaded";
            "mapper" => mapper_name(cartridge.mapper_number()),
            "prg_pages" => header.prg_rom_pages(),
            "chr_pages" => header.chr_rom_pages(),
            "battery" => header.has_persistent_memory());

        Nes {
            cpu,
            ppu,
            ram: [0; RAM_SIZE],
            cartridge,
            cycles: 0,
            log,
        }
    }

    pub fn load(rom: &[u8], log: Logger) -> Result<Nes, CartridgeError> {
        Ok(Nes::new(Cartridge::from_bytes(rom)?, log))
    }

    /// Resets the PPU, then the CPU through the reset vector. RAM keeps its
    /// contents.
    pub fn reset(&mut self) -> Result<(), BusError> {
        self.ppu.reset();
        let mut bus = Bus::new(&mut self.ram, &mut self.ppu, &mut self.cartridge);
        self.cpu.reset(&mut bus)?;
        self.cycles = 0;

        info!(self.log, "reset"; "pc" => self.cpu.registers().pc);
        Ok(())
    }

    /// Runs one instruction, any DMA it started, and a pending NMI. The PPU
    /// sees the cycles only after the instruction has finished.
    pub fn step(&mut self) -> Result<u32, CpuError> {
        let mut cycles = {
            let mut bus = Bus::new(&mut self.ram, &mut self.ppu, &mut self.cartridge);
            u32::from(self.cpu.step(&mut bus)?)
        };

        if let Some(page) = self.ppu.take_dma() {
            let odd = (self.cycles + u64::from(cycles)) % 2 == 1;
            cycles += self.oam_dma(page, odd)?;
        }

        self.cycles += u64::from(cycles);
        self.ppu.step(cycles);

        if self.ppu.take_nmi() {
            let nmi_cycles = {
                let mut bus = Bus::new(&mut self.ram, &mut self.ppu, &mut self.cartridge);
                u32::from(self.cpu.nmi(&mut bus)?)
            };
            debug!(self.log, "nmi"; "pc" => self.cpu.registers().pc, "scanline" => self.ppu.scanline());

            self.cycles += u64::from(nmi_cycles);
            self.ppu.step(nmi_cycles);
            cycles += nmi_cycles;
        }

        Ok(cycles)
    }

    fn oam_dma(&mut self, page: u8, odd: bool) -> Result<u32, BusError> {
        let base = (page as u16) << 8;
        let mut data = [0u8; OAM_SIZE];
        {
            let mut bus = Bus::new(&mut self.ram, &mut self.ppu, &mut self.cartridge);
            for (i, byte) in data.iter_mut().enumerate() {
                *byte = bus.read(base | i as u16)?;
            }
        }
        for &byte in data.iter() {
            self.ppu.write_oam(byte);
        }

        let cycles = if odd { DMA_CYCLES + 1 } else { DMA_CYCLES };
        debug!(self.log, "oam dma"; "page" => page, "cycles" => cycles);
        Ok(cycles)
    }

    /// Steps until the PPU finishes the current frame. Returns the CPU cycles
    /// spent.
    pub fn step_frame(&mut self) -> Result<u64, CpuError> {
        let frame = self.ppu.frame();
        let mut cycles = 0;
        while self.ppu.frame() == frame {
            cycles += u64::from(self.step()?);
        }
        Ok(cycles)
    }

    /// Steps until at least `budget` CPU cycles have been spent.
    pub fn run_cycles(&mut self, budget: u64) -> Result<u64, CpuError> {
        let mut cycles = 0;
        while cycles < budget {
            cycles += u64::from(self.step()?);
        }
        Ok(cycles)
    }

    /// Reads through the CPU bus, side effects included (a PPUSTATUS read
    /// clears vblank).
    pub fn read_byte(&mut self, addr: u16) -> Result<u8, BusError> {
        Bus::new(&mut self.ram, &mut self.ppu, &mut self.cartridge).read(addr)
    }

    pub fn write_byte(&mut self, addr: u16, value: u8) -> Result<(), BusError> {
        Bus::new(&mut self.ram, &mut self.ppu, &mut self.cartridge).write(addr, value)
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn ppu(&self) -> &Ppu {
        &self.ppu
    }

    pub fn cartridge(&self) -> &Cartridge {
        &self.cartridge
    }

    pub fn ram(&self) -> &[u8] {
        &self.ram
    }

    /// CPU cycles since reset, DMA stalls and interrupts included.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ines::tests::image;
    use crate::ines::PRG_BANK_SIZE;

    fn nes(program: &[u8]) -> Nes {
        let mut prg = vec![0xEAu8; PRG_BANK_SIZE];
        prg[..program.len()].copy_from_slice(program);
        prg[0x3FFC] = 0x00;
        prg[0x3FFD] = 0x80;

        let mut nes = Nes::load(&image(0x00, 0x00, &prg), Logger::root(slog::Discard, o!())).unwrap();
        nes.reset().unwrap();
        nes
    }

    #[test]
    fn reset_loads_the_vector() {
        let nes = nes(&[]);

        assert_eq!(nes.cpu().registers().pc, 0x8000);
        assert_eq!(nes.cpu().registers().s, 0xFF);
        assert_eq!(nes.cycles(), 0);
        assert_eq!(nes.cartridge().mapper_number(), 0);
        assert!(nes.cartridge().trainer().is_none());
    }

    #[test]
    fn cycles_are_forwarded_to_the_ppu() {
        let mut nes = nes(&[0xA9, 0x01, 0x8D, 0x00, 0x02]);

        assert_eq!(nes.step().unwrap(), 2);
        assert_eq!(nes.ppu().dot(), 6);
        assert_eq!(nes.step().unwrap(), 4);
        assert_eq!(nes.ppu().dot(), 18);
        assert_eq!(nes.cycles(), 6);
        assert_eq!(nes.ram()[0x200], 0x01);
    }

    #[test]
    fn oam_dma_copies_a_page() {
        let mut nes = nes(&[0xA9, 0x02, 0x8D, 0x14, 0x40]);
        for i in 0..=0xFFu16 {
            nes.write_byte(0x0200 + i, i as u8 ^ 0x5A).unwrap();
        }

        nes.step().unwrap();
        assert_eq!(nes.step().unwrap(), 4 + DMA_CYCLES);
        for i in 0..OAM_SIZE {
            assert_eq!(nes.ppu().oam()[i], i as u8 ^ 0x5A);
        }
        assert_eq!(nes.cycles(), 6 + u64::from(DMA_CYCLES));
    }

    #[test]
    fn oam_dma_on_odd_cycle_costs_one_more() {
        // LDA $00 takes three cycles, so the transfer starts on cycle 9
        let mut nes = nes(&[0xA5, 0x00, 0xA9, 0x02, 0x8D, 0x14, 0x40, 0xEA]);
        nes.step().unwrap();
        nes.step().unwrap();
        nes.step().unwrap();
        nes.step().unwrap();

        assert_eq!(nes.cycles(), 3 + 2 + 4 + 514 + 2);
    }

    #[test]
    fn read_and_write_byte_use_the_bus() {
        let mut nes = nes(&[0x12]);

        nes.write_byte(0x1805, 0x77).unwrap();
        assert_eq!(nes.read_byte(0x0005).unwrap(), 0x77);
        assert_eq!(nes.read_byte(0x8000).unwrap(), 0x12);
        assert_eq!(nes.read_byte(0x4016), Err(BusError::UnimplementedRegion(0x4016)));
    }

    #[test]
    fn bus_errors_stop_the_step() {
        // LDA $4000
        let mut nes = nes(&[0xAD, 0x00, 0x40]);

        assert_eq!(
            nes.step(),
            Err(CpuError::Bus(BusError::UnimplementedRegion(0x4000)))
        );
    }
}
