//! finset CLI — XML <-> Fast Infoset conversion.

#[cfg(feature = "fast-alloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::fs::File;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};

use finset::encoder::{encode, EncoderConfig};
use finset::header::{Declaration, XmlVersion};
use finset::xml::parse_xml_events;
use finset::xml_serializer::events_to_xml_writer;

#[derive(Parser)]
#[command(name = "finset", about = "XML <-> Fast Infoset (X.891) conversion")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Encode XML to Fast Infoset
    Encode(EncodeArgs),
    /// Decode Fast Infoset to XML
    Decode(CommonArgs),
}

#[derive(Args)]
struct CommonArgs {
    /// Input file (stdin when omitted)
    input: Option<PathBuf>,

    /// Output file (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct EncodeArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Prepend the plaintext `<?xml encoding='finf'?>` declaration
    #[arg(long)]
    declaration: bool,

    /// XML version for the declaration (1.0 or 1.1)
    #[arg(long, value_parser = parse_version)]
    xml_version: Option<XmlVersion>,

    /// Literal character strings as UTF-16BE instead of UTF-8
    #[arg(long)]
    utf16: bool,
}

fn parse_version(s: &str) -> Result<XmlVersion, String> {
    match s {
        "1.0" => Ok(XmlVersion::V1_0),
        "1.1" => Ok(XmlVersion::V1_1),
        _ => Err(format!("unknown XML version '{s}' (expected 1.0 or 1.1)")),
    }
}

fn read_input(input: &Option<PathBuf>) -> std::io::Result<Vec<u8>> {
    let mut data = Vec::new();
    match input {
        Some(path) => {
            File::open(path)?.read_to_end(&mut data)?;
        }
        None => {
            std::io::stdin().lock().read_to_end(&mut data)?;
        }
    }
    Ok(data)
}

fn write_output(output: &Option<PathBuf>, f: impl FnOnce(&mut dyn Write) -> Result<(), String>) -> Result<(), String> {
    match output {
        Some(path) => {
            let mut file = File::create(path).map_err(|e| e.to_string())?;
            f(&mut file)?;
            file.flush().map_err(|e| e.to_string())
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            f(&mut lock)?;
            lock.flush().map_err(|e| e.to_string())
        }
    }
}

fn run_encode(args: &EncodeArgs) -> Result<(), String> {
    let data = read_input(&args.common.input).map_err(|e| e.to_string())?;
    let text = std::str::from_utf8(&data).map_err(|e| format!("input is not UTF-8: {e}"))?;
    let events = parse_xml_events(text).map_err(|e| e.to_string())?;

    let declaration = (args.declaration || args.xml_version.is_some()).then_some(Declaration {
        version: args.xml_version,
        standalone: None,
    });
    let config = EncoderConfig {
        declaration,
        utf16_literals: args.utf16,
        external_vocabulary_uri: None,
    };
    let bytes = encode(&events, &config).map_err(|e| e.to_string())?;
    write_output(&args.common.output, |w| {
        w.write_all(&bytes).map_err(|e| e.to_string())
    })
}

fn run_decode(args: &CommonArgs) -> Result<(), String> {
    let data = read_input(&args.input).map_err(|e| e.to_string())?;
    let events = finset::decode(&data).map_err(|e| e.to_string())?;
    write_output(&args.output, |w| {
        events_to_xml_writer(&events, &mut *w).map_err(|e| e.to_string())?;
        w.write_all(b"\n").map_err(|e| e.to_string())
    })
}

fn main() {
    let cli = Cli::parse();
    let result = match &cli.command {
        Command::Encode(args) => run_encode(args),
        Command::Decode(args) => run_decode(args),
    };
    if let Err(message) = result {
        eprintln!("finset: {message}");
        process::exit(1);
    }
}
