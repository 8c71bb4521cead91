mod common;

use nescore::{BusError, CartridgeError, CpuError, Nes, Snapshot};

use common::{discard, rom};

// LDX #5; LDA #0; CLC
// loop: ADC #3; DEX; BNE loop
// STA $10; JSR bump; JMP *
// bump ($8020): INC $10; RTS
const SUM_PROGRAM: &[u8] = &[
    0xA2, 0x05, 0xA9, 0x00, 0x18, 0x69, 0x03, 0xCA, 0xD0, 0xFB, 0x85, 0x10, 0x20, 0x20, 0x80, 0x4C, 0x0F, 0x80,
];
const BUMP: &[u8] = &[0xE6, 0x10, 0x60];

fn boot(image: &[u8]) -> Nes {
    let mut nes = Nes::load(image, discard()).unwrap();
    nes.reset().unwrap();
    nes
}

fn trace(nes: &mut Nes, steps: usize) -> Vec<Snapshot> {
    (0..steps)
        .map(|_| {
            nes.step().unwrap();
            nes.cpu().snapshot()
        })
        .collect()
}

// (pc, a, x, p, s, cycles) after each instruction
const SUM_TRACE: &[(u16, u8, u8, u8, u8, u64)] = &[
    (0x8002, 0x00, 0x05, 0x24, 0xFF, 2),
    (0x8004, 0x00, 0x05, 0x26, 0xFF, 4),
    (0x8005, 0x00, 0x05, 0x26, 0xFF, 6),
    (0x8007, 0x03, 0x05, 0x24, 0xFF, 8),
    (0x8008, 0x03, 0x04, 0x24, 0xFF, 10),
    (0x8005, 0x03, 0x04, 0x24, 0xFF, 13),
    (0x8007, 0x06, 0x04, 0x24, 0xFF, 15),
    (0x8008, 0x06, 0x03, 0x24, 0xFF, 17),
    (0x8005, 0x06, 0x03, 0x24, 0xFF, 20),
    (0x8007, 0x09, 0x03, 0x24, 0xFF, 22),
    (0x8008, 0x09, 0x02, 0x24, 0xFF, 24),
    (0x8005, 0x09, 0x02, 0x24, 0xFF, 27),
    (0x8007, 0x0C, 0x02, 0x24, 0xFF, 29),
    (0x8008, 0x0C, 0x01, 0x24, 0xFF, 31),
    (0x8005, 0x0C, 0x01, 0x24, 0xFF, 34),
    (0x8007, 0x0F, 0x01, 0x24, 0xFF, 36),
    (0x8008, 0x0F, 0x00, 0x26, 0xFF, 38),
    (0x800A, 0x0F, 0x00, 0x26, 0xFF, 40),
    (0x800C, 0x0F, 0x00, 0x26, 0xFF, 43),
    (0x8020, 0x0F, 0x00, 0x26, 0xFD, 49),
    (0x8022, 0x0F, 0x00, 0x24, 0xFD, 54),
    (0x800F, 0x0F, 0x00, 0x24, 0xFF, 60),
    (0x800F, 0x0F, 0x00, 0x24, 0xFF, 63),
];

#[test]
fn short_program_trace() {
    let mut nes = boot(&rom(SUM_PROGRAM, &[(0x8020, BUMP)]));
    let trace = trace(&mut nes, SUM_TRACE.len());

    let expected: Vec<Snapshot> = SUM_TRACE
        .iter()
        .map(|&(pc, a, x, p, s, cycles)| Snapshot { pc, a, x, y: 0, p, s, cycles })
        .collect();
    for (step, (actual, expected)) in trace.iter().zip(expected.iter()).enumerate() {
        assert_eq!(actual, expected, "after instruction {}", step + 1);
    }
    assert_eq!(nes.ram()[0x10], 0x10);
    assert_eq!(nes.cycles(), 63);
}

#[test]
fn traces_are_deterministic() {
    let image = rom(SUM_PROGRAM, &[(0x8020, BUMP)]);
    let mut first = boot(&image);
    let mut second = boot(&image);

    assert_eq!(trace(&mut first, 40), trace(&mut second, 40));
    assert_eq!(first.ppu().dot(), second.ppu().dot());
    assert_eq!(first.ppu().scanline(), second.ppu().scanline());
}

#[test]
fn reset_restarts_the_program() {
    let image = rom(SUM_PROGRAM, &[(0x8020, BUMP)]);
    let mut nes = boot(&image);
    let before = trace(&mut nes, 10);

    nes.reset().unwrap();
    assert_eq!(nes.cpu().registers().pc, 0x8000);
    assert_eq!(trace(&mut nes, 10), before);
}

#[test]
fn frame_is_29781_cycles_from_reset() {
    let mut nes = boot(&rom(&[0x4C, 0x00, 0x80], &[]));

    assert_eq!(nes.step_frame().unwrap(), 29781);
    assert_eq!(nes.ppu().frame(), 1);
    assert_eq!(nes.ppu().scanline(), -1);
}

#[test]
fn run_cycles_stops_at_the_first_step_past_the_budget() {
    let mut nes = boot(&rom(&[0x4C, 0x00, 0x80], &[]));

    assert_eq!(nes.run_cycles(10).unwrap(), 12);
    assert_eq!(nes.cycles(), 12);
}

#[test]
fn vblank_polling_loop() {
    // wait: BIT $2002; BPL wait; INC $00; JMP wait
    let mut nes = boot(&rom(&[0x2C, 0x02, 0x20, 0x10, 0xFB, 0xE6, 0x00, 0x4C, 0x00, 0x80], &[]));
    nes.step_frame().unwrap();
    assert_eq!(nes.ram()[0], 1);

    nes.step_frame().unwrap();
    assert_eq!(nes.ram()[0], 2);
}

#[test]
fn nmi_handler_runs_once_per_frame() {
    // LDA #$80; STA $2000; loop: JMP loop
    let program = [0xA9, 0x80, 0x8D, 0x00, 0x20, 0x4C, 0x05, 0x80];
    // handler: INC $00; RTI
    let handler: &[u8] = &[0xE6, 0x00, 0x40];
    let vector: &[u8] = &[0x00, 0x81];
    let mut nes = boot(&rom(&program, &[(0x8100, handler), (0xFFFA, vector)]));

    nes.step_frame().unwrap();
    assert_eq!(nes.ram()[0], 1);
    assert_eq!(nes.cpu().registers().s, 0xFF);

    nes.step_frame().unwrap();
    assert_eq!(nes.ram()[0], 2);
}

#[test]
fn sprite_dma_through_the_bus() {
    // LDX #0; fill: TXA; STA $0300,X; INX; BNE fill; LDA #$03; STA $4014
    let program = [0xA2, 0x00, 0x8A, 0x9D, 0x00, 0x03, 0xE8, 0xD0, 0xF9, 0xA9, 0x03, 0x8D, 0x14, 0x40];
    let mut nes = boot(&rom(&program, &[]));
    nes.run_cycles(4000).unwrap();

    let oam = nes.ppu().oam();
    assert!((0..256).all(|i| oam[i] == i as u8));
}

#[test]
fn unknown_opcode_stops_execution() {
    let mut nes = boot(&rom(&[0xEA, 0xFF], &[]));
    nes.step().unwrap();

    assert_eq!(nes.step(), Err(CpuError::UnimplementedOpcode { opcode: 0xFF, pc: 0x8001 }));
}

#[test]
fn apu_access_is_reported() {
    // STA $4015
    let mut nes = boot(&rom(&[0x8D, 0x15, 0x40], &[]));

    assert_eq!(nes.step(), Err(CpuError::Bus(BusError::UnimplementedRegion(0x4015))));
}

#[test]
fn bad_images_are_rejected() {
    let mut image = rom(&[], &[]);
    image[0] = b'M';
    assert!(matches!(Nes::load(&image, discard()), Err(CartridgeError::InvalidMagic(_))));

    let mut image = rom(&[], &[]);
    image[6] = 0x10;
    assert!(matches!(Nes::load(&image, discard()), Err(CartridgeError::UnsupportedMapper(1))));

    let image = rom(&[], &[]);
    assert!(matches!(
        Nes::load(&image[..1000], discard()),
        Err(CartridgeError::Truncated { .. })
    ));
}
