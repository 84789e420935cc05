use std::fs;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use procmod::arch::ebc::PointerSize;
use procmod::cursor::Image;
use procmod::decoder::ProcessorDecoder;
use procmod::format::OutputFormat;
use procmod::parser::GoblinParser;
use procmod::pipeline::Session;
use procmod::strategy::{recursive, Strategy};
use procmod::{Address, Architecture, BinaryMetadata, BinaryParser, Config};

#[derive(Parser, Debug)]
#[command(author, version, about = "Disassembler for EFI Byte Code and MSP430 images")]
struct Cli {
    /// ELF, PE or raw image to disassemble
    file: PathBuf,
    /// Instruction set; required for raw images
    #[arg(short, long, value_enum)]
    arch: Option<Architecture>,
    #[arg(short, long, value_enum, default_value_t = Strategy::Linear)]
    strategy: Strategy,
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    /// Load address of a raw image (hex)
    #[arg(long, value_parser = parse_address)]
    base: Option<Address>,
    /// Start of recursive descent (hex)
    #[arg(long, value_parser = parse_address)]
    entry: Option<Address>,
    /// EBC pointer size in bytes (4 or 8)
    #[arg(long, value_parser = parse_pointer_size)]
    ptr_size: Option<PointerSize>,
    /// JSON analysis settings
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Write output here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn parse_address(s: &str) -> Result<Address, String> {
    let digits = s.trim_start_matches("0x").trim_start_matches("0X");
    Address::from_str_radix(digits, 16).map_err(|e| format!("bad address '{}': {}", s, e))
}

fn parse_pointer_size(s: &str) -> Result<PointerSize, String> {
    let bytes: u8 = s.parse().map_err(|e| format!("bad pointer size '{}': {}", s, e))?;
    PointerSize::try_from(bytes)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let data = fs::read(&cli.file).with_context(|| format!("reading {}", cli.file.display()))?;
    let mut config = match &cli.config {
        Some(path) => Config::from_json_file(path).with_context(|| format!("loading {}", path.display()))?,
        None => Config::default(),
    };
    config.base = cli.base.or(config.base);
    config.entry = cli.entry.or(config.entry);

    let (metadata, raw) = match GoblinParser::new().parse(&data) {
        Ok(metadata) => (metadata, false),
        Err(err) if cli.arch.is_some() => {
            log::warn!("{}; treating input as a raw image", err);
            (BinaryMetadata::default_raw(), true)
        }
        Err(err) => return Err(err).context("no --arch given for an unrecognized image"),
    };

    let arch = cli.arch.unwrap_or(metadata.architecture);
    if arch == Architecture::Unknown {
        bail!("unsupported architecture in {}", cli.file.display());
    }
    config.pointer_size = cli
        .ptr_size
        .or(config.pointer_size)
        .or(metadata.pointer_size);
    let decoder = ProcessorDecoder::for_architecture(arch, &config)?;

    let mut session = Session::new();
    for (addr, name) in &metadata.symbols {
        session.db.set_name(*addr, name.clone());
    }
    let entry = config.entry.or(metadata.entry_point);
    if let Some(entry) = entry {
        session.db.add_routine(entry, None);
    }

    let regions = if raw {
        let base = config.base.unwrap_or(0);
        if base.checked_add(data.len() as Address).is_none() {
            bail!("image of {} bytes does not fit at base 0x{:x}", data.len(), base);
        }
        vec![(&data[..], base)]
    } else {
        metadata.get_executable_data(&data)
    };

    let formatter = cli.format.get_formatter();
    let mut out: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(fs::File::create(path).with_context(|| format!("creating {}", path.display()))?),
        None => Box::new(std::io::stdout().lock()),
    };
    for (bytes, base) in regions {
        let image = Image::new(bytes, base);
        let disassembly = match (cli.strategy, entry) {
            (Strategy::Recursive, Some(entry)) if image.contains(entry) => {
                recursive::run_from(&image, &decoder, &mut session, entry)?
            }
            (strategy, _) => strategy.run(&image, &decoder, &mut session)?,
        };
        out.write_all(formatter.format(&disassembly, base)?.as_bytes())?;
    }
    out.flush()?;
    Ok(())
}
