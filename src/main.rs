use std::fs::{read, OpenOptions};

use anyhow::{bail, Context, Result};
use gumdrop::Options;
use slog::{info, o, Drain, Level, Logger};

use nescore::nrom_mapper::mapper_name;
use nescore::Nes;

#[derive(Debug, Options)]
struct RunOptions {
    #[options(help = "print help message")]
    help: bool,

    #[options(free, help = "the name of the ROM to execute")]
    rom_path: String,

    #[options(help = "number of instructions to execute", meta = "N")]
    steps: Option<u64>,

    #[options(help = "number of frames to execute (default 1)", meta = "N")]
    frames: Option<u64>,

    #[options(help = "write the full trace log to FILE", meta = "FILE")]
    trace: Option<String>,

    #[options(count, help = "more terminal output (-v debug, -vv trace)")]
    verbose: u32,

    #[options(help = "print the final CPU and PPU state")]
    dump: bool,
}

fn logger(opts: &RunOptions) -> Result<Logger> {
    let level = match opts.verbose {
        0 => Level::Info,
        1 => Level::Debug,
        _ => Level::Trace,
    };

    let term_decorator = slog_term::TermDecorator::new().build();
    let term_drain = slog_term::FullFormat::new(term_decorator).build().fuse();
    let term_drain = slog_async::Async::new(term_drain).build().fuse();
    let term_drain = term_drain.filter_level(level).fuse();

    let log = match &opts.trace {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(path)
                .with_context(|| format!("cannot open trace file {}", path))?;
            let file_decorator = slog_term::PlainSyncDecorator::new(file);
            let file_drain = slog_term::FullFormat::new(file_decorator).build().fuse();
            let drain = slog::Duplicate::new(file_drain, term_drain).fuse();
            Logger::root(drain, o!())
        }
        None => Logger::root(term_drain, o!()),
    };
    Ok(log)
}

fn run(nes: &mut Nes, opts: &RunOptions) -> Result<()> {
    match (opts.steps, opts.frames) {
        (Some(_), Some(_)) => bail!("--steps and --frames cannot be combined"),
        (Some(steps), None) => {
            for _ in 0..steps {
                nes.step()
                    .with_context(|| format!("stopped at {}", nes.cpu().snapshot()))?;
            }
        }
        (None, frames) => {
            for _ in 0..frames.unwrap_or(1) {
                nes.step_frame()
                    .with_context(|| format!("stopped at {}", nes.cpu().snapshot()))?;
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let opts = RunOptions::parse_args_default_or_exit();
    if opts.rom_path.is_empty() {
        bail!("no ROM given");
    }

    let log = logger(&opts)?;
    info!(log, "opening rom"; "path" => &opts.rom_path);

    let contents = read(&opts.rom_path).with_context(|| format!("cannot read {}", opts.rom_path))?;
    let mut nes = Nes::load(&contents, log.clone()).with_context(|| format!("cannot load {}", opts.rom_path))?;
    nes.reset()?;

    run(&mut nes, &opts)?;
    info!(log, "finished"; "cycles" => nes.cycles(), "frame" => nes.ppu().frame());

    if opts.dump {
        let mapper = nes.cartridge().mapper_number();
        println!("mapper {} ({})", mapper, mapper_name(mapper));

        let ppu = nes.ppu();
        println!("{}", nes.cpu().snapshot());
        println!(
            "PPU scanline:{} dot:{} frame:{} status:{:02X} ctrl:{:02X} vram_addr:{:04X}",
            ppu.scanline(),
            ppu.dot(),
            ppu.frame(),
            ppu.status(),
            ppu.ctrl(),
            ppu.vram_addr()
        );
    }
    Ok(())
}
