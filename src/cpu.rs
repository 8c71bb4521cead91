use std::convert::TryFrom;
use std::error::Error;
use std::fmt;

use slog::{debug, o, trace, Logger};

use crate::bus::{BusError, Memory};
use crate::opcodes::{Instruction, Mode, Op, OPCODES};

pub const STACK_BASE: u16 = 0x0100;
pub const NMI_VECTOR: u16 = 0xFFFA;
pub const RESET_VECTOR: u16 = 0xFFFC;
pub const IRQ_VECTOR: u16 = 0xFFFE;
/// Stack pointer after reset: the top of page one.
pub const STACK_RESET: u8 = 0xFF;

const INTERRUPT_CYCLES: u8 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuError {
    UnimplementedOpcode { opcode: u8, pc: u16 },
    Bus(BusError),
}

impl fmt::Display for CpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CpuError::UnimplementedOpcode { opcode, pc } => {
                write!(f, "unimplemented opcode {:#04X} at {:#06X}", opcode, pc)
            }
            CpuError::Bus(err) => write!(f, "bus error: {}", err),
        }
    }
}

impl Error for CpuError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CpuError::Bus(err) => Some(err),
            _ => None,
        }
    }
}

impl From<BusError> for CpuError {
    fn from(err: BusError) -> CpuError {
        CpuError::Bus(err)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Registers {
    pub pc: u16,
    pub s: u8,
    pub a: u8,
    pub x: u8,
    pub y: u8,
}

/// Processor status flags. B and bit 5 only exist in the pushed byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Status {
    pub carry: bool,
    pub zero: bool,
    pub interrupt_disable: bool,
    pub decimal: bool,
    pub overflow: bool,
    pub negative: bool,
}

impl Status {
    pub const CARRY: u8 = 0b0000_0001;
    pub const ZERO: u8 = 0b0000_0010;
    pub const INTERRUPT: u8 = 0b0000_0100;
    pub const DECIMAL: u8 = 0b0000_1000;
    pub const BREAK: u8 = 0b0001_0000;
    pub const UNUSED: u8 = 0b0010_0000;
    pub const OVERFLOW: u8 = 0b0100_0000;
    pub const NEGATIVE: u8 = 0b1000_0000;

    /// Packs the flags into the stacked byte. Bit 5 is always set; `brk`
    /// selects the B bit (set by PHP and BRK, clear for NMI).
    pub fn to_byte(self, brk: bool) -> u8 {
        let mut value = Status::UNUSED;
        if brk {
            value |= Status::BREAK;
        }
        if self.carry {
            value |= Status::CARRY;
        }
        if self.zero {
            value |= Status::ZERO;
        }
        if self.interrupt_disable {
            value |= Status::INTERRUPT;
        }
        if self.decimal {
            value |= Status::DECIMAL;
        }
        if self.overflow {
            value |= Status::OVERFLOW;
        }
        if self.negative {
            value |= Status::NEGATIVE;
        }
        value
    }

    pub fn from_byte(value: u8) -> Status {
        Status {
            carry: value & Status::CARRY != 0,
            zero: value & Status::ZERO != 0,
            interrupt_disable: value & Status::INTERRUPT != 0,
            decimal: value & Status::DECIMAL != 0,
            overflow: value & Status::OVERFLOW != 0,
            negative: value & Status::NEGATIVE != 0,
        }
    }
}

/// Register state between instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub pc: u16,
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub p: u8,
    pub s: u8,
    pub cycles: u64,
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04X}  A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X} CYC:{}",
            self.pc, self.a, self.x, self.y, self.p, self.s, self.cycles
        )
    }
}

#[derive(Debug, Clone, Copy)]
enum Operand {
    Implied,
    Accumulator,
    Immediate(u8),
    Address { addr: u16, page_crossed: bool },
    Relative(i8),
}

impl Operand {
    fn absolute(addr: u16) -> Operand {
        Operand::Address {
            addr,
            page_crossed: false,
        }
    }

    /// `base + index` without wrapping at the top of the address space.
    fn indexed(base: u16, index: u8) -> Result<Operand, BusError> {
        let addr = u32::from(base) + u32::from(index);
        let addr = u16::try_from(addr).map_err(|_| BusError::AddressOutOfRange(addr))?;
        Ok(Operand::Address {
            addr,
            page_crossed: (base & 0xFF00) != (addr & 0xFF00),
        })
    }

    fn address(self) -> u16 {
        match self {
            Operand::Address { addr, .. } => addr,
            other => unreachable!("operand {:?} has no address", other),
        }
    }

    fn page_crossed(self) -> bool {
        match self {
            Operand::Address { page_crossed, .. } => page_crossed,
            _ => false,
        }
    }
}

#[derive(Debug)]
pub struct Cpu {
    regs: Registers,
    p: Status,
    cycles: u64,
    last_cycles: u8,
    log: Logger,
}

impl Cpu {
    pub fn new(log: Logger) -> Cpu {
        Cpu {
            regs: Registers::default(),
            p: Status::default(),
            cycles: 0,
            last_cycles: 0,
            log: log.new(o!("component" => "cpu")),
        }
    }

    /// Loads PC from the reset vector and puts every other register in its
    /// startup state.
    pub fn reset<M: Memory>(&mut self, bus: &mut M) -> Result<(), BusError> {
        let pc = bus.read_word(RESET_VECTOR)?;
        self.regs = Registers {
            pc,
            s: STACK_RESET,
            a: 0,
            x: 0,
            y: 0,
        };
        self.p = Status {
            interrupt_disable: true,
            ..Status::default()
        };
        self.cycles = 0;
        self.last_cycles = 0;

        debug!(self.log, "reset"; "pc" => pc);
        Ok(())
    }

    pub fn registers(&self) -> &Registers {
        &self.regs
    }

    pub fn status(&self) -> Status {
        self.p
    }

    pub fn total_cycles(&self) -> u64 {
        self.cycles
    }

    /// Cycles consumed by the most recent instruction or interrupt.
    pub fn last_cycles(&self) -> u8 {
        self.last_cycles
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            pc: self.regs.pc,
            a: self.regs.a,
            x: self.regs.x,
            y: self.regs.y,
            p: self.p.to_byte(false),
            s: self.regs.s,
            cycles: self.cycles,
        }
    }

    /// Executes one instruction and returns the cycles it took.
    pub fn step<M: Memory>(&mut self, bus: &mut M) -> Result<u8, CpuError> {
        let pc = self.regs.pc;
        let opcode = self.fetch_byte(bus)?;
        let instruction = OPCODES[opcode as usize].ok_or(CpuError::UnimplementedOpcode { opcode, pc })?;

        trace!(self.log, "{:04X}  {:02X}  {:<4}{:?}", pc, opcode, instruction.op, instruction.mode;
            "a" => self.regs.a,
            "x" => self.regs.x,
            "y" => self.regs.y,
            "p" => self.p.to_byte(false),
            "sp" => self.regs.s,
            "cyc" => self.cycles);

        let extra = self.execute(bus, instruction)?;
        let cycles = instruction.cycles + extra;
        self.last_cycles = cycles;
        self.cycles += u64::from(cycles);
        Ok(cycles)
    }

    /// Services a non-maskable interrupt.
    pub fn nmi<M: Memory>(&mut self, bus: &mut M) -> Result<u8, BusError> {
        self.interrupt(bus, NMI_VECTOR, false)?;
        self.last_cycles = INTERRUPT_CYCLES;
        self.cycles += u64::from(INTERRUPT_CYCLES);
        Ok(INTERRUPT_CYCLES)
    }

    fn fetch_byte<M: Memory>(&mut self, bus: &mut M) -> Result<u8, BusError> {
        let result = bus.read(self.regs.pc)?;
        self.regs.pc = self.regs.pc.wrapping_add(1);
        Ok(result)
    }

    fn fetch_word<M: Memory>(&mut self, bus: &mut M) -> Result<u16, BusError> {
        let lo = self.fetch_byte(bus)? as u16;
        let hi = self.fetch_byte(bus)? as u16;
        Ok((hi << 8) | lo)
    }

    /// Pointer stored in the zero page; the high byte wraps to $00.
    fn read_zero_page_word<M: Memory>(&mut self, bus: &mut M, ptr: u8) -> Result<u16, BusError> {
        let lo = bus.read(ptr as u16)? as u16;
        let hi = bus.read(ptr.wrapping_add(1) as u16)? as u16;
        Ok((hi << 8) | lo)
    }

    fn resolve<M: Memory>(&mut self, bus: &mut M, mode: Mode) -> Result<Operand, BusError> {
        let operand = match mode {
            Mode::Implied => Operand::Implied,
            Mode::Accumulator => Operand::Accumulator,
            Mode::Immediate => Operand::Immediate(self.fetch_byte(bus)?),
            Mode::Relative => Operand::Relative(self.fetch_byte(bus)? as i8),
            Mode::ZeroPage => Operand::absolute(self.fetch_byte(bus)? as u16),
            Mode::ZeroPageX => Operand::absolute(self.fetch_byte(bus)?.wrapping_add(self.regs.x) as u16),
            Mode::ZeroPageY => Operand::absolute(self.fetch_byte(bus)?.wrapping_add(self.regs.y) as u16),
            Mode::Absolute => Operand::absolute(self.fetch_word(bus)?),
            Mode::AbsoluteX => {
                let base = self.fetch_word(bus)?;
                Operand::indexed(base, self.regs.x)?
            }
            Mode::AbsoluteY => {
                let base = self.fetch_word(bus)?;
                Operand::indexed(base, self.regs.y)?
            }
            Mode::Indirect => {
                let ptr = self.fetch_word(bus)?;
                // the high byte never carries into the next page
                let lo = bus.read(ptr)? as u16;
                let hi = bus.read((ptr & 0xFF00) | (ptr.wrapping_add(1) & 0x00FF))? as u16;
                Operand::absolute((hi << 8) | lo)
            }
            Mode::IndexedIndirect => {
                let ptr = self.fetch_byte(bus)?.wrapping_add(self.regs.x);
                Operand::absolute(self.read_zero_page_word(bus, ptr)?)
            }
            Mode::IndirectIndexed => {
                let ptr = self.fetch_byte(bus)?;
                let base = self.read_zero_page_word(bus, ptr)?;
                Operand::indexed(base, self.regs.y)?
            }
        };
        Ok(operand)
    }

    /// Runs a decoded instruction. Returns cycles beyond the base count.
    fn execute<M: Memory>(&mut self, bus: &mut M, instruction: Instruction) -> Result<u8, BusError> {
        let operand = self.resolve(bus, instruction.mode)?;
        let mut extra = 0;
        if instruction.page_penalty && operand.page_crossed() {
            extra += 1;
        }

        match instruction.op {
            Op::Adc => {
                let value = self.load(bus, operand)?;
                self.add_with_carry(value);
            }
            Op::Sbc => {
                let value = self.load(bus, operand)?;
                self.add_with_carry(!value);
            }
            Op::And => {
                let value = self.load(bus, operand)?;
                self.regs.a &= value;
                self.set_zn(self.regs.a);
            }
            Op::Ora => {
                let value = self.load(bus, operand)?;
                self.regs.a |= value;
                self.set_zn(self.regs.a);
            }
            Op::Eor => {
                let value = self.load(bus, operand)?;
                self.regs.a ^= value;
                self.set_zn(self.regs.a);
            }
            Op::Bit => {
                let value = self.load(bus, operand)?;
                self.p.zero = self.regs.a & value == 0;
                self.p.overflow = value & 0x40 != 0;
                self.p.negative = value & 0x80 != 0;
            }
            Op::Cmp => {
                let value = self.load(bus, operand)?;
                self.compare(self.regs.a, value);
            }
            Op::Cpx => {
                let value = self.load(bus, operand)?;
                self.compare(self.regs.x, value);
            }
            Op::Cpy => {
                let value = self.load(bus, operand)?;
                self.compare(self.regs.y, value);
            }

            Op::Asl => self.modify(bus, operand, |cpu, value| {
                cpu.p.carry = value & 0x80 != 0;
                value << 1
            })?,
            Op::Lsr => self.modify(bus, operand, |cpu, value| {
                cpu.p.carry = value & 0x01 != 0;
                value >> 1
            })?,
            Op::Rol => self.modify(bus, operand, |cpu, value| {
                let result = (value << 1) | cpu.p.carry as u8;
                cpu.p.carry = value & 0x80 != 0;
                result
            })?,
            Op::Ror => self.modify(bus, operand, |cpu, value| {
                let result = (value >> 1) | ((cpu.p.carry as u8) << 7);
                cpu.p.carry = value & 0x01 != 0;
                result
            })?,
            Op::Inc => self.modify(bus, operand, |_, value| value.wrapping_add(1))?,
            Op::Dec => self.modify(bus, operand, |_, value| value.wrapping_sub(1))?,

            Op::Inx => {
                self.regs.x = self.regs.x.wrapping_add(1);
                self.set_zn(self.regs.x);
            }
            Op::Iny => {
                self.regs.y = self.regs.y.wrapping_add(1);
                self.set_zn(self.regs.y);
            }
            Op::Dex => {
                self.regs.x = self.regs.x.wrapping_sub(1);
                self.set_zn(self.regs.x);
            }
            Op::Dey => {
                self.regs.y = self.regs.y.wrapping_sub(1);
                self.set_zn(self.regs.y);
            }

            Op::Bcc => extra += self.branch(operand, !self.p.carry),
            Op::Bcs => extra += self.branch(operand, self.p.carry),
            Op::Bne => extra += self.branch(operand, !self.p.zero),
            Op::Beq => extra += self.branch(operand, self.p.zero),
            Op::Bpl => extra += self.branch(operand, !self.p.negative),
            Op::Bmi => extra += self.branch(operand, self.p.negative),
            Op::Bvc => extra += self.branch(operand, !self.p.overflow),
            Op::Bvs => extra += self.branch(operand, self.p.overflow),

            Op::Jmp => self.regs.pc = operand.address(),
            Op::Jsr => {
                let target = operand.address();
                self.push_word(bus, self.regs.pc.wrapping_sub(1))?;
                self.regs.pc = target;
            }
            Op::Rts => {
                self.regs.pc = self.pull_word(bus)?.wrapping_add(1);
            }
            Op::Brk => {
                // skip the padding byte
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.interrupt(bus, IRQ_VECTOR, true)?;
            }
            Op::Rti => {
                self.p = Status::from_byte(self.pull(bus)?);
                self.regs.pc = self.pull_word(bus)?;
            }

            Op::Lda => {
                self.regs.a = self.load(bus, operand)?;
                self.set_zn(self.regs.a);
            }
            Op::Ldx => {
                self.regs.x = self.load(bus, operand)?;
                self.set_zn(self.regs.x);
            }
            Op::Ldy => {
                self.regs.y = self.load(bus, operand)?;
                self.set_zn(self.regs.y);
            }
            Op::Sta => bus.write(operand.address(), self.regs.a)?,
            Op::Stx => bus.write(operand.address(), self.regs.x)?,
            Op::Sty => bus.write(operand.address(), self.regs.y)?,

            Op::Pha => self.push(bus, self.regs.a)?,
            Op::Php => self.push(bus, self.p.to_byte(true))?,
            Op::Pla => {
                self.regs.a = self.pull(bus)?;
                self.set_zn(self.regs.a);
            }
            Op::Plp => self.p = Status::from_byte(self.pull(bus)?),

            Op::Tax => {
                self.regs.x = self.regs.a;
                self.set_zn(self.regs.x);
            }
            Op::Tay => {
                self.regs.y = self.regs.a;
                self.set_zn(self.regs.y);
            }
            Op::Tsx => {
                self.regs.x = self.regs.s;
                self.set_zn(self.regs.x);
            }
            Op::Txa => {
                self.regs.a = self.regs.x;
                self.set_zn(self.regs.a);
            }
            Op::Tya => {
                self.regs.a = self.regs.y;
                self.set_zn(self.regs.a);
            }
            Op::Txs => self.regs.s = self.regs.x,

            Op::Clc => self.p.carry = false,
            Op::Cld => self.p.decimal = false,
            Op::Cli => self.p.interrupt_disable = false,
            Op::Clv => self.p.overflow = false,
            Op::Sec => self.p.carry = true,
            Op::Sed => self.p.decimal = true,
            Op::Sei => self.p.interrupt_disable = true,
            Op::Nop => {}
        }

        Ok(extra)
    }

    fn load<M: Memory>(&mut self, bus: &mut M, operand: Operand) -> Result<u8, BusError> {
        match operand {
            Operand::Immediate(value) => Ok(value),
            Operand::Accumulator => Ok(self.regs.a),
            Operand::Address { addr, .. } => bus.read(addr),
            other => unreachable!("operand {:?} has no value", other),
        }
    }

    /// Read-modify-write on the accumulator or memory; sets Z and N from
    /// the result.
    fn modify<M, F>(&mut self, bus: &mut M, operand: Operand, f: F) -> Result<(), BusError>
    where
        M: Memory,
        F: FnOnce(&mut Cpu, u8) -> u8,
    {
        let result = match operand {
            Operand::Accumulator => {
                let value = self.regs.a;
                let result = f(self, value);
                self.regs.a = result;
                result
            }
            Operand::Address { addr, .. } => {
                let value = bus.read(addr)?;
                let result = f(self, value);
                bus.write(addr, result)?;
                result
            }
            other => unreachable!("operand {:?} cannot be modified", other),
        };
        self.set_zn(result);
        Ok(())
    }

    /// Binary add; SBC passes the inverted operand. The decimal flag has no
    /// effect on the 2A03.
    fn add_with_carry(&mut self, value: u8) {
        let a = self.regs.a;
        let sum = a as u16 + value as u16 + self.p.carry as u16;
        let result = sum as u8;

        self.p.carry = sum > 0xFF;
        self.p.overflow = (!(a ^ value) & (a ^ result) & 0x80) != 0;
        self.regs.a = result;
        self.set_zn(result);
    }

    fn compare(&mut self, register: u8, value: u8) {
        self.p.carry = register >= value;
        self.set_zn(register.wrapping_sub(value));
    }

    /// Returns the extra cycles: one when taken, two when the target is on
    /// another page.
    fn branch(&mut self, operand: Operand, condition: bool) -> u8 {
        let offset = match operand {
            Operand::Relative(offset) => offset,
            other => unreachable!("branch with operand {:?}", other),
        };
        if !condition {
            return 0;
        }

        let origin = self.regs.pc;
        self.regs.pc = origin.wrapping_add(offset as i16 as u16);
        if (origin & 0xFF00) != (self.regs.pc & 0xFF00) {
            2
        } else {
            1
        }
    }

    fn interrupt<M: Memory>(&mut self, bus: &mut M, vector: u16, brk: bool) -> Result<(), BusError> {
        self.push_word(bus, self.regs.pc)?;
        self.push(bus, self.p.to_byte(brk))?;
        self.p.interrupt_disable = true;
        self.regs.pc = bus.read_word(vector)?;
        Ok(())
    }

    fn set_zn(&mut self, value: u8) {
        self.p.zero = value == 0;
        self.p.negative = value & 0x80 != 0;
    }

    fn push<M: Memory>(&mut self, bus: &mut M, value: u8) -> Result<(), BusError> {
        bus.write(STACK_BASE | self.regs.s as u16, value)?;
        self.regs.s = self.regs.s.wrapping_sub(1);
        Ok(())
    }

    fn pull<M: Memory>(&mut self, bus: &mut M) -> Result<u8, BusError> {
        self.regs.s = self.regs.s.wrapping_add(1);
        bus.read(STACK_BASE | self.regs.s as u16)
    }

    /// High byte first, so the pull order is low byte first.
    fn push_word<M: Memory>(&mut self, bus: &mut M, value: u16) -> Result<(), BusError> {
        self.push(bus, (value >> 8) as u8)?;
        self.push(bus, value as u8)
    }

    fn pull_word<M: Memory>(&mut self, bus: &mut M) -> Result<u16, BusError> {
        let lo = self.pull(bus)? as u16;
        let hi = self.pull(bus)? as u16;
        Ok((hi << 8) | lo)
    }
}
