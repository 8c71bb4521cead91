use slog::{o, Logger};

use nescore::ines::{CHR_BANK_SIZE, PRG_BANK_SIZE};

pub fn discard() -> Logger {
    Logger::root(slog::Discard, o!())
}

/// A mapper 0 image with one PRG and one CHR page. `program` lands at
/// $8000, `patches` at their CPU addresses, and the reset vector points at
/// $8000.
pub fn rom(program: &[u8], patches: &[(u16, &[u8])]) -> Vec<u8> {
    let mut prg = vec![0xEAu8; PRG_BANK_SIZE];
    prg[..program.len()].copy_from_slice(program);
    for &(addr, bytes) in patches {
        let offset = (addr as usize - 0x8000) % PRG_BANK_SIZE;
        prg[offset..offset + bytes.len()].copy_from_slice(bytes);
    }
    prg[0x3FFC] = 0x00;
    prg[0x3FFD] = 0x80;

    let mut rom = b"NES\x1A\x01\x01\x00\x00".to_vec();
    rom.extend_from_slice(&[0u8; 8]);
    rom.extend_from_slice(&prg);
    rom.extend_from_slice(&[0u8; CHR_BANK_SIZE]);
    rom
}
