use gumdrop::Options;
use nescore::cpu::{NMI_VECTOR, RESET_VECTOR, IRQ_VECTOR};
use nescore::ines::Cartridge;

#[derive(Debug, Options)]
struct DemoOptions {
    #[options(help = "print help message")]
    help: bool,
    #[options(free, help = "the name of the ROM to inspect")]
    rom_path: String,
}

fn main() -> anyhow::Result<()> {
    let opts = DemoOptions::parse_args_default_or_exit();

    println!("opening rom {}", opts.rom_path);

    let cartridge = Cartridge::from_file(&opts.rom_path)?;
    for &(name, vector) in &[("nmi", NMI_VECTOR), ("reset", RESET_VECTOR), ("irq", IRQ_VECTOR)] {
        let lo = cartridge.read(vector)? as u16;
        let hi = cartridge.read(vector + 1)? as u16;
        println!("{:>5} vector: {:#06X}", name, (hi << 8) | lo);
    }
    Ok(())
}
