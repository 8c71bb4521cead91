//! Opcode decode table for the documented 6502 instruction set.
//!
//! Every byte maps to either a fixed (operation, addressing mode, base cycle
//! count) triple or to nothing. The table is built at compile time.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Adc, And, Asl, Bcc, Bcs, Beq, Bit, Bmi, Bne, Bpl, Brk, Bvc, Bvs, Clc,
    Cld, Cli, Clv, Cmp, Cpx, Cpy, Dec, Dex, Dey, Eor, Inc, Inx, Iny, Jmp,
    Jsr, Lda, Ldx, Ldy, Lsr, Nop, Ora, Pha, Php, Pla, Plp, Rol, Ror, Rti,
    Rts, Sbc, Sec, Sed, Sei, Sta, Stx, Sty, Tax, Tay, Tsx, Txa, Txs, Tya,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = format!("{:?}", self);
        f.pad(&name.to_uppercase())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Indirect,
    /// `(zp,X)`
    IndexedIndirect,
    /// `(zp),Y`
    IndirectIndexed,
    Relative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub op: Op,
    pub mode: Mode,
    /// Base cycle count.
    pub cycles: u8,
    /// One more cycle when the indexed address lands on another page.
    pub page_penalty: bool,
}

const fn i(op: Op, mode: Mode, cycles: u8) -> Option<Instruction> {
    Some(Instruction { op, mode, cycles, page_penalty: false })
}

const fn p(op: Op, mode: Mode, cycles: u8) -> Option<Instruction> {
    Some(Instruction { op, mode, cycles, page_penalty: true })
}

pub const fn decode(opcode: u8) -> Option<Instruction> {
    use self::Mode::*;
    use self::Op::*;

    match opcode {
        0x69 => i(Adc, Immediate, 2),
        0x65 => i(Adc, ZeroPage, 3),
        0x75 => i(Adc, ZeroPageX, 4),
        0x6D => i(Adc, Absolute, 4),
        0x7D => p(Adc, AbsoluteX, 4),
        0x79 => p(Adc, AbsoluteY, 4),
        0x61 => i(Adc, IndexedIndirect, 6),
        0x71 => p(Adc, IndirectIndexed, 5),

        0x29 => i(And, Immediate, 2),
        0x25 => i(And, ZeroPage, 3),
        0x35 => i(And, ZeroPageX, 4),
        0x2D => i(And, Absolute, 4),
        0x3D => p(And, AbsoluteX, 4),
        0x39 => p(And, AbsoluteY, 4),
        0x21 => i(And, IndexedIndirect, 6),
        0x31 => p(And, IndirectIndexed, 5),

        0x0A => i(Asl, Accumulator, 2),
        0x06 => i(Asl, ZeroPage, 5),
        0x16 => i(Asl, ZeroPageX, 6),
        0x0E => i(Asl, Absolute, 6),
        0x1E => i(Asl, AbsoluteX, 7),

        0x90 => i(Bcc, Relative, 2),
        0xB0 => i(Bcs, Relative, 2),
        0xF0 => i(Beq, Relative, 2),
        0x30 => i(Bmi, Relative, 2),
        0xD0 => i(Bne, Relative, 2),
        0x10 => i(Bpl, Relative, 2),
        0x50 => i(Bvc, Relative, 2),
        0x70 => i(Bvs, Relative, 2),

        0x24 => i(Bit, ZeroPage, 3),
        0x2C => i(Bit, Absolute, 4),

        0x00 => i(Brk, Implied, 7),

        0x18 => i(Clc, Implied, 2),
        0xD8 => i(Cld, Implied, 2),
        0x58 => i(Cli, Implied, 2),
        0xB8 => i(Clv, Implied, 2),

        0xC9 => i(Cmp, Immediate, 2),
        0xC5 => i(Cmp, ZeroPage, 3),
        0xD5 => i(Cmp, ZeroPageX, 4),
        0xCD => i(Cmp, Absolute, 4),
        0xDD => p(Cmp, AbsoluteX, 4),
        0xD9 => p(Cmp, AbsoluteY, 4),
        0xC1 => i(Cmp, IndexedIndirect, 6),
        0xD1 => p(Cmp, IndirectIndexed, 5),

        0xE0 => i(Cpx, Immediate, 2),
        0xE4 => i(Cpx, ZeroPage, 3),
        0xEC => i(Cpx, Absolute, 4),

        0xC0 => i(Cpy, Immediate, 2),
        0xC4 => i(Cpy, ZeroPage, 3),
        0xCC => i(Cpy, Absolute, 4),

        0xC6 => i(Dec, ZeroPage, 5),
        0xD6 => i(Dec, ZeroPageX, 6),
        0xCE => i(Dec, Absolute, 6),
        0xDE => i(Dec, AbsoluteX, 7),

        0xCA => i(Dex, Implied, 2),
        0x88 => i(Dey, Implied, 2),

        0x49 => i(Eor, Immediate, 2),
        0x45 => i(Eor, ZeroPage, 3),
        0x55 => i(Eor, ZeroPageX, 4),
        0x4D => i(Eor, Absolute, 4),
        0x5D => p(Eor, AbsoluteX, 4),
        0x59 => p(Eor, AbsoluteY, 4),
        0x41 => i(Eor, IndexedIndirect, 6),
        0x51 => p(Eor, IndirectIndexed, 5),

        0xE6 => i(Inc, ZeroPage, 5),
        0xF6 => i(Inc, ZeroPageX, 6),
        0xEE => i(Inc, Absolute, 6),
        0xFE => i(Inc, AbsoluteX, 7),

        0xE8 => i(Inx, Implied, 2),
        0xC8 => i(Iny, Implied, 2),

        0x4C => i(Jmp, Absolute, 3),
        0x6C => i(Jmp, Indirect, 5),
        0x20 => i(Jsr, Absolute, 6),

        0xA9 => i(Lda, Immediate, 2),
        0xA5 => i(Lda, ZeroPage, 3),
        0xB5 => i(Lda, ZeroPageX, 4),
        0xAD => i(Lda, Absolute, 4),
        0xBD => p(Lda, AbsoluteX, 4),
        0xB9 => p(Lda, AbsoluteY, 4),
        0xA1 => i(Lda, IndexedIndirect, 6),
        0xB1 => p(Lda, IndirectIndexed, 5),

        0xA2 => i(Ldx, Immediate, 2),
        0xA6 => i(Ldx, ZeroPage, 3),
        0xB6 => i(Ldx, ZeroPageY, 4),
        0xAE => i(Ldx, Absolute, 4),
        0xBE => p(Ldx, AbsoluteY, 4),

        0xA0 => i(Ldy, Immediate, 2),
        0xA4 => i(Ldy, ZeroPage, 3),
        0xB4 => i(Ldy, ZeroPageX, 4),
        0xAC => i(Ldy, Absolute, 4),
        0xBC => p(Ldy, AbsoluteX, 4),

        0x4A => i(Lsr, Accumulator, 2),
        0x46 => i(Lsr, ZeroPage, 5),
        0x56 => i(Lsr, ZeroPageX, 6),
        0x4E => i(Lsr, Absolute, 6),
        0x5E => i(Lsr, AbsoluteX, 7),

        0xEA => i(Nop, Implied, 2),

        0x09 => i(Ora, Immediate, 2),
        0x05 => i(Ora, ZeroPage, 3),
        0x15 => i(Ora, ZeroPageX, 4),
        0x0D => i(Ora, Absolute, 4),
        0x1D => p(Ora, AbsoluteX, 4),
        0x19 => p(Ora, AbsoluteY, 4),
        0x01 => i(Ora, IndexedIndirect, 6),
        0x11 => p(Ora, IndirectIndexed, 5),

        0x48 => i(Pha, Implied, 3),
        0x08 => i(Php, Implied, 3),
        0x68 => i(Pla, Implied, 4),
        0x28 => i(Plp, Implied, 4),

        0x2A => i(Rol, Accumulator, 2),
        0x26 => i(Rol, ZeroPage, 5),
        0x36 => i(Rol, ZeroPageX, 6),
        0x2E => i(Rol, Absolute, 6),
        0x3E => i(Rol, AbsoluteX, 7),

        0x6A => i(Ror, Accumulator, 2),
        0x66 => i(Ror, ZeroPage, 5),
        0x76 => i(Ror, ZeroPageX, 6),
        0x6E => i(Ror, Absolute, 6),
        0x7E => i(Ror, AbsoluteX, 7),

        0x40 => i(Rti, Implied, 6),
        0x60 => i(Rts, Implied, 6),

        0xE9 => i(Sbc, Immediate, 2),
        0xE5 => i(Sbc, ZeroPage, 3),
        0xF5 => i(Sbc, ZeroPageX, 4),
        0xED => i(Sbc, Absolute, 4),
        0xFD => p(Sbc, AbsoluteX, 4),
        0xF9 => p(Sbc, AbsoluteY, 4),
        0xE1 => i(Sbc, IndexedIndirect, 6),
        0xF1 => p(Sbc, IndirectIndexed, 5),

        0x38 => i(Sec, Implied, 2),
        0xF8 => i(Sed, Implied, 2),
        0x78 => i(Sei, Implied, 2),

        0x85 => i(Sta, ZeroPage, 3),
        0x95 => i(Sta, ZeroPageX, 4),
        0x8D => i(Sta, Absolute, 4),
        0x9D => i(Sta, AbsoluteX, 5),
        0x99 => i(Sta, AbsoluteY, 5),
        0x81 => i(Sta, IndexedIndirect, 6),
        0x91 => i(Sta, IndirectIndexed, 6),

        0x86 => i(Stx, ZeroPage, 3),
        0x96 => i(Stx, ZeroPageY, 4),
        0x8E => i(Stx, Absolute, 4),

        0x84 => i(Sty, ZeroPage, 3),
        0x94 => i(Sty, ZeroPageX, 4),
        0x8C => i(Sty, Absolute, 4),

        0xAA => i(Tax, Implied, 2),
        0xA8 => i(Tay, Implied, 2),
        0xBA => i(Tsx, Implied, 2),
        0x8A => i(Txa, Implied, 2),
        0x9A => i(Txs, Implied, 2),
        0x98 => i(Tya, Implied, 2),

        _ => None,
    }
}

const fn build_table() -> [Option<Instruction>; 256] {
    let mut table = [None; 256];
    let mut opcode = 0;
    while opcode < 256 {
        table[opcode] = decode(opcode as u8);
        opcode += 1;
    }
    table
}

pub static OPCODES: [Option<Instruction>; 256] = build_table();
