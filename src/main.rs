//! RustyMSX - MSX memory core diagnostics
//!
//! This is the command line front end of the memory core. It builds a machine
//! from a cartridge image or a configuration file, reports the detected mapper
//! and the resulting memory map, and dumps memory through the side-effect free
//! peek path.

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use rusty_msx::config::{DEFAULT_MEGAROM_SIZE, DEFAULT_RAM_SIZE};
use rusty_msx::util::{self, format_addr, hexdump, parse_addr};
use rusty_msx::{Machine, MachineConfig, MapperType, MemoryError, NoInvalidation, RomImage, RomPatch};

/// Bytes shown per `--dump`
const DUMP_LENGTH: usize = 256;

/// Command line arguments for RustyMSX
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Path to the cartridge ROM file
    #[clap(name = "ROM", required_unless_present = "config", conflicts_with = "config")]
    rom_path: Option<PathBuf>,

    /// JSON machine description instead of a single cartridge
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Mapper type (generic8k, generic16k, konami5, konami4, ascii8k, ascii16k or 0-5)
    #[clap(short, long, value_parser = parse_mapper)]
    mapper: Option<MapperType>,

    /// Cartridge base address
    #[clap(long, default_value = "0x4000", value_parser = parse_address)]
    base: u16,

    /// Cartridge window size in bytes
    #[clap(long, value_parser = parse_size)]
    size: Option<u32>,

    /// Leading header bytes to drop from the image
    #[clap(long, default_value_t = 0)]
    skip_header: usize,

    /// Patch the image after loading, as OFFSET=VALUE (repeatable)
    #[clap(long = "patch", value_parser = parse_patch)]
    patches: Vec<RomPatch>,

    /// Base address of 16KB of RAM, mounted when the cartridge leaves it free
    #[clap(long, default_value = "0xC000", value_parser = parse_address)]
    ram_base: u16,

    /// Hexdump 256 bytes starting at this address (repeatable)
    #[clap(long, value_parser = parse_address)]
    dump: Vec<u16>,

    /// Enable debug logging
    #[clap(short, long)]
    debug: bool,
}

fn parse_mapper(text: &str) -> Result<MapperType, String> {
    text.parse().map_err(|e: MemoryError| e.to_string())
}

fn parse_address(text: &str) -> Result<u16, String> {
    parse_addr(text).ok_or_else(|| format!("'{}' is not a 16-bit address", text))
}

fn parse_size(text: &str) -> Result<u32, String> {
    util::parse_size(text).ok_or_else(|| format!("'{}' is not a size between 1 and 0x10000", text))
}

fn parse_patch(text: &str) -> Result<RomPatch, String> {
    text.parse().map_err(|e: rusty_msx::RomError| e.to_string())
}

/// Build a machine around a single cartridge plus RAM
fn cartridge_machine(args: &Args, rom_path: &Path) -> Result<Machine> {
    let image = RomImage::from_file(rom_path, args.skip_header, &args.patches)
        .with_context(|| format!("Failed to load ROM: {}", rom_path.display()))?;
    let name = rom_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "cartridge".to_string());

    let mut machine = Machine::new(Rc::new(NoInvalidation));
    machine
        .insert_cartridge(name, args.base, args.size.unwrap_or(DEFAULT_MEGAROM_SIZE), image, args.mapper)
        .context("Failed to insert cartridge")?;

    match machine.insert_ram("ram", args.ram_base, DEFAULT_RAM_SIZE) {
        Ok(_) => {}
        Err(MemoryError::Overlap { existing, .. }) => {
            info!("Cartridge {} covers {}, no RAM mounted", existing, format_addr(args.ram_base));
        }
        Err(e) => return Err(e).context("Failed to mount RAM"),
    }
    Ok(machine)
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    if args.debug {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    info!("RustyMSX memory core starting...");

    let machine = match (&args.config, &args.rom_path) {
        (Some(config_path), _) => {
            let config = MachineConfig::from_file(config_path)
                .with_context(|| format!("Failed to read config: {}", config_path.display()))?;
            Machine::from_config(&config, Rc::new(NoInvalidation))
                .context("Failed to build machine")?
        }
        (None, Some(rom_path)) => cartridge_machine(&args, rom_path)?,
        (None, None) => anyhow::bail!("either a ROM or --config is required"),
    };

    println!("Memory map:");
    for mounted in machine.mounted() {
        let name = machine.device(mounted.id).map(|d| d.name()).unwrap_or("?");
        let mapper = mounted.mapper.map(|m| m.to_string()).unwrap_or_else(|| "-".to_string());
        println!(
            "  {}-{}  {:<20} mapper: {}",
            format_addr(mounted.base),
            format_addr((mounted.base as u32 + mounted.size - 1) as u16),
            name,
            mapper
        );
    }

    for &addr in &args.dump {
        println!();
        print!("{}", hexdump(&machine.peek_range(addr, DUMP_LENGTH), addr));
    }

    Ok(())
}
