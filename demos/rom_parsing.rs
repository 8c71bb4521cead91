use gumdrop::Options;
use nescore::ines::*;
use nescore::nrom_mapper::mapper_name;

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
    let header = cartridge.header();

    let mapper = cartridge.mapper_number();
    println!("mapper:    {} ({})", mapper, mapper_name(mapper));
    println!("PRG ROM:   {} x 16KB", header.prg_rom_pages());
    println!("CHR ROM:   {} x 8KB", header.chr_rom_pages());
    println!("mirroring: {:?}", header.mirroring());
    println!("battery:   {}", header.has_persistent_memory());
    println!("trainer:   {}", header.has_trainer());
    println!("NES 2.0:   {}", header.is_ines_2());
    Ok(())
}
