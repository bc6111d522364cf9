//! disklru CLI
//!
//! Command-line interface for inspecting and driving a cache directory.

use std::io::Read;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use disklru::journal::{JournalHeader, JournalRecovery, JOURNAL_FILE};
use disklru::{CacheConfig, DiskLruCache, Result};
use tracing_subscriber::{fmt, EnvFilter};

/// disklru CLI
#[derive(Parser, Debug)]
#[command(name = "disklru-cli")]
#[command(about = "CLI for disklru cache directories")]
#[command(version)]
struct Args {
    /// Cache directory
    #[arg(short, long, default_value = "./disklru_data")]
    dir: String,

    /// Application version recorded in the journal header
    #[arg(short, long, default_value = "1")]
    app_version: u32,

    /// Number of values per entry
    #[arg(short = 'n', long, default_value = "1")]
    value_count: usize,

    /// Byte budget in MB
    #[arg(short, long, default_value = "10")]
    max_size_mb: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print one value of an entry
    Get {
        /// The key to read
        key: String,

        /// Value slot to print
        #[arg(short, long, default_value = "0")]
        index: usize,
    },

    /// Store an entry, one value per slot
    Put {
        /// The key to write
        key: String,

        /// The values to store
        values: Vec<String>,
    },

    /// Remove an entry
    Remove {
        /// The key to remove
        key: String,
    },

    /// Print entry count and size
    Stats,

    /// Check the journal without modifying the directory
    Verify,
}

fn main() -> ExitCode {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,disklru=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    let config = CacheConfig::builder()
        .directory(&args.dir)
        .app_version(args.app_version)
        .value_count(args.value_count)
        .max_size(args.max_size_mb * 1024 * 1024)
        .build();

    if let Commands::Verify = args.command {
        let header = JournalHeader::new(config.app_version, config.value_count);
        let result = JournalRecovery::verify(&config.directory.join(JOURNAL_FILE), &header)?;
        println!("records:    {}", result.records_replayed);
        println!("entries:    {}", result.entries_recovered);
        println!("torn:       {}", result.torn_entries);
        println!("redundant:  {}", result.redundant_ops);
        println!("truncated:  {}", result.was_truncated);
        return Ok(());
    }

    let cache = DiskLruCache::open(config)?;

    match args.command {
        Commands::Get { key, index } => match cache.get(&key)? {
            Some(mut snapshot) => match snapshot.reader(index) {
                Some(reader) => {
                    let mut value = Vec::new();
                    reader.read_to_end(&mut value)?;
                    println!("{}", String::from_utf8_lossy(&value));
                }
                None => println!("(no slot {})", index),
            },
            None => println!("(nil)"),
        },
        Commands::Put { key, values } => match cache.edit(&key)? {
            Some(mut editor) => {
                for (index, value) in values.iter().enumerate() {
                    editor.set(index, value)?;
                }
                editor.commit()?;
                println!("OK");
            }
            None => println!("(busy)"),
        },
        Commands::Remove { key } => {
            println!("{}", if cache.remove(&key)? { "1" } else { "0" });
        }
        Commands::Stats => {
            println!("entries:    {}", cache.entry_count());
            println!("size:       {}", cache.size());
            println!("max_size:   {}", cache.max_size());
            println!("redundant:  {}", cache.redundant_op_count());
        }
        Commands::Verify => {}
    }

    cache.close()
}
