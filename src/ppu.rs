//! PPU timing unit: register file, OAM, VRAM and the scanline/dot counters.
//! No pixels are produced.

use slog::{debug, o, Logger};

use crate::bus::BusError;

pub const OAM_DMA: u16 = 0x4014;

pub const DOTS_PER_LINE: u32 = 341;
pub const PRE_RENDER_LINE: i16 = -1;
pub const POST_RENDER_LINE: i16 = 240;
pub const VBLANK_LINE: i16 = 241;
pub const LAST_LINE: i16 = 260;

pub const VRAM_SIZE: usize = 0x4000;
pub const OAM_SIZE: usize = 256;

pub const STATUS_VBLANK: u8 = 0x80;
const CTRL_INCREMENT_32: u8 = 0x04;
const CTRL_NMI: u8 = 0x80;

/// Memory-mapped PPU registers, by CPU address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    Ctrl,
    Mask,
    Status,
    OamAddr,
    OamData,
    Scroll,
    Addr,
    Data,
    OamDma,
}

impl Register {
    pub fn from_addr(addr: u16) -> Option<Register> {
        match addr {
            0x2000 => Some(Register::Ctrl),
            0x2001 => Some(Register::Mask),
            0x2002 => Some(Register::Status),
            0x2003 => Some(Register::OamAddr),
            0x2004 => Some(Register::OamData),
            0x2005 => Some(Register::Scroll),
            0x2006 => Some(Register::Addr),
            0x2007 => Some(Register::Data),
            OAM_DMA => Some(Register::OamDma),
            _ => None,
        }
    }

    pub fn addr(self) -> u16 {
        match self {
            Register::Ctrl => 0x2000,
            Register::Mask => 0x2001,
            Register::Status => 0x2002,
            Register::OamAddr => 0x2003,
            Register::OamData => 0x2004,
            Register::Scroll => 0x2005,
            Register::Addr => 0x2006,
            Register::Data => 0x2007,
            Register::OamDma => OAM_DMA,
        }
    }
}

#[derive(Debug)]
pub struct Ppu {
    ppuctrl: u8,
    ppumask: u8,
    ppustatus: u8,
    oamaddr: u8,
    // shared first/second write toggle for PPUSCROLL and PPUADDR
    latch_cleared: bool,
    scroll_x: u8,
    scroll_y: u8,
    vram_addr: u16,
    io_latch: u8,
    oamdma: u8,
    pending_dma: bool,
    vram: Vec<u8>,
    oam: [u8; OAM_SIZE],

    scanline: i16,
    dot: u32,
    frame: u64,
    nmi_occurred: bool,

    log: Logger,
}

impl Ppu {
    pub fn new(log: Logger) -> Ppu {
        Ppu {
            ppuctrl: 0,
            ppumask: 0,
            ppustatus: 0,
            oamaddr: 0,
            latch_cleared: true,
            scroll_x: 0,
            scroll_y: 0,
            vram_addr: 0,
            io_latch: 0,
            oamdma: 0,
            pending_dma: false,
            vram: vec![0xFF; VRAM_SIZE],
            oam: [0xFF; OAM_SIZE],
            scanline: PRE_RENDER_LINE,
            dot: 0,
            frame: 0,
            nmi_occurred: false,
            log: log.new(o!("component" => "ppu")),
        }
    }

    /// Returns registers and counters to the start of the pre-render line.
    /// VRAM and OAM contents survive a reset.
    pub fn reset(&mut self) {
        self.ppuctrl = 0;
        self.ppumask = 0;
        self.ppustatus = 0;
        self.oamaddr = 0;
        self.latch_cleared = true;
        self.scroll_x = 0;
        self.scroll_y = 0;
        self.vram_addr = 0;
        self.io_latch = 0;
        self.pending_dma = false;
        self.scanline = PRE_RENDER_LINE;
        self.dot = 0;
        self.frame = 0;
        self.nmi_occurred = false;
    }

    pub fn read(&mut self, addr: u16) -> Result<u8, BusError> {
        let register = Register::from_addr(addr).ok_or(BusError::UnimplementedRegion(addr))?;
        let value = match register {
            Register::Status => {
                let value = self.ppustatus;
                self.ppustatus &= !STATUS_VBLANK;
                self.latch_cleared = true;
                value
            }
            Register::OamData => self.oam[self.oamaddr as usize],
            Register::Data => {
                let value = self.vram[self.vram_index()];
                self.increment_vram_addr();
                value
            }
            // write-only
            _ => self.io_latch,
        };
        Ok(value)
    }

    pub fn write(&mut self, addr: u16, value: u8) -> Result<(), BusError> {
        let register = Register::from_addr(addr).ok_or(BusError::UnimplementedRegion(addr))?;
        if register != Register::OamDma {
            self.io_latch = value;
        }

        match register {
            Register::Ctrl => {
                let enabling = self.ppuctrl & CTRL_NMI == 0 && value & CTRL_NMI != 0;
                self.ppuctrl = value;
                if enabling && self.ppustatus & STATUS_VBLANK != 0 {
                    self.nmi_occurred = true;
                }
            }
            Register::Mask => self.ppumask = value,
            Register::Status => {}
            Register::OamAddr => self.oamaddr = value,
            Register::OamData => self.write_oam(value),
            Register::Scroll => {
                if self.latch_cleared {
                    self.scroll_x = value;
                } else {
                    self.scroll_y = value;
                }
                self.latch_cleared = !self.latch_cleared;
            }
            Register::Addr => {
                if self.latch_cleared {
                    self.vram_addr = (self.vram_addr & 0x00FF) | (value as u16) << 8;
                } else {
                    self.vram_addr = (self.vram_addr & 0xFF00) | value as u16;
                }
                self.latch_cleared = !self.latch_cleared;
            }
            Register::Data => {
                let index = self.vram_index();
                self.vram[index] = value;
                self.increment_vram_addr();
            }
            Register::OamDma => {
                self.oamdma = value;
                self.pending_dma = true;
            }
        }
        Ok(())
    }

    /// Stores at OAMADDR and advances it.
    pub fn write_oam(&mut self, value: u8) {
        self.oam[self.oamaddr as usize] = value;
        self.oamaddr = self.oamaddr.wrapping_add(1);
    }

    /// Advances the counters by `cpu_cycles` CPU cycles (three dots each).
    pub fn step(&mut self, cpu_cycles: u32) {
        let mut dots = u64::from(self.dot) + u64::from(cpu_cycles) * 3;
        while dots >= u64::from(DOTS_PER_LINE) {
            dots -= u64::from(DOTS_PER_LINE);
            self.next_line();
        }
        // below DOTS_PER_LINE after the loop
        self.dot = dots as u32;
    }

    fn next_line(&mut self) {
        self.scanline = if self.scanline == LAST_LINE {
            PRE_RENDER_LINE
        } else {
            self.scanline + 1
        };

        match self.scanline {
            VBLANK_LINE => {
                self.ppustatus |= STATUS_VBLANK;
                if self.ppuctrl & CTRL_NMI != 0 {
                    self.nmi_occurred = true;
                }
                debug!(self.log, "vblank"; "frame" => self.frame, "nmi" => self.nmi_occurred);
            }
            PRE_RENDER_LINE => {
                self.ppustatus &= !STATUS_VBLANK;
                self.frame += 1;
                debug!(self.log, "frame complete"; "frame" => self.frame);
            }
            _ => {}
        }
    }

    fn vram_index(&self) -> usize {
        (self.vram_addr as usize) & (VRAM_SIZE - 1)
    }

    fn increment_vram_addr(&mut self) {
        let increment = if self.ppuctrl & CTRL_INCREMENT_32 != 0 { 32 } else { 1 };
        self.vram_addr = self.vram_addr.wrapping_add(increment);
    }

    /// Page written to $4014 since the last call, if any.
    pub fn take_dma(&mut self) -> Option<u8> {
        if self.pending_dma {
            self.pending_dma = false;
            Some(self.oamdma)
        } else {
            None
        }
    }

    /// Consumes a latched NMI request.
    pub fn take_nmi(&mut self) -> bool {
        std::mem::replace(&mut self.nmi_occurred, false)
    }

    pub fn scanline(&self) -> i16 {
        self.scanline
    }

    pub fn dot(&self) -> u32 {
        self.dot
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// PPUSTATUS without the read side effects.
    pub fn status(&self) -> u8 {
        self.ppustatus
    }

    pub fn ctrl(&self) -> u8 {
        self.ppuctrl
    }

    pub fn mask(&self) -> u8 {
        self.ppumask
    }

    pub fn vram_addr(&self) -> u16 {
        self.vram_addr
    }

    pub fn scroll(&self) -> (u8, u8) {
        (self.scroll_x, self.scroll_y)
    }

    pub fn oam(&self) -> &[u8] {
        &self.oam
    }

    pub fn in_vblank(&self) -> bool {
        self.scanline > POST_RENDER_LINE
    }
}
