//! genstore Inspector
//!
//! Prints the header or the records of a store file.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use genstore::{Engine, OpenMode, StoreHeader, StoreKind, HEADER_SIZE};
use tracing_subscriber::{fmt, EnvFilter};

/// genstore Inspector
#[derive(Parser, Debug)]
#[command(name = "genstore-inspect")]
#[command(about = "Inspect genstore index, string and vlrecord files")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the decoded header
    Header {
        /// Store file
        path: PathBuf,
    },

    /// Print every record between two bounds
    Dump {
        /// Store file
        path: PathBuf,

        /// First index or byte offset (defaults to the store's first element)
        #[arg(short, long)]
        first: Option<i64>,

        /// Last index, or end offset for byte-addressed stores
        #[arg(short, long)]
        last: Option<i64>,

        /// Longest string or vlrecord accepted, in bytes
        #[arg(short, long, default_value = "1048576")]
        max_len: usize,
    },
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,genstore=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let outcome = match args.command {
        Commands::Header { path } => print_header(&path),
        Commands::Dump {
            path,
            first,
            last,
            max_len,
        } => dump(&path, first, last, max_len),
    };

    if let Err(e) = outcome {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn print_header(path: &Path) -> genstore::Result<()> {
    let mut image = [0u8; HEADER_SIZE as usize];
    File::open(path)?.read_exact(&mut image)?;
    let header = StoreHeader::decode(&image)?;
    println!("{}", header);
    Ok(())
}

fn dump(path: &Path, first: Option<i64>, last: Option<i64>, max_len: usize) -> genstore::Result<()> {
    let mut engine = Engine::default();
    let store = engine.open_store(path, OpenMode::ReadOnly)?;
    let kind = engine.stats(store)?.kind;

    let stream = engine.open_stream(store, None)?;
    engine.reset_stream(stream, first, last)?;

    match kind {
        StoreKind::Index => {
            loop {
                let index = engine.stream_position(stream)?;
                let Some(record) = engine.next_record(stream)? else {
                    break;
                };
                println!("{:>10}  {}", index, hex(&record));
            }
        }
        StoreKind::String => {
            loop {
                let offset = engine.stream_position(stream)?;
                let Some(value) = engine.next_string(stream, max_len)? else {
                    break;
                };
                println!("{:>10}  {}", offset, value);
            }
        }
        StoreKind::VLRecord => {
            loop {
                let offset = engine.stream_position(stream)?;
                let Some(payload) = engine.next_vlrecord(stream, max_len)? else {
                    break;
                };
                println!("{:>10}  [{}] {}", offset, payload.len(), hex(&payload));
            }
        }
    }

    engine.close_stream(stream)?;
    engine.close(store)
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect::<Vec<_>>().join(" ")
}
