//! Pack CLI - Command-line tool for building and extracting Pack archives.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pack::prelude::*;

/// Pack - single-file asset archive tool
#[derive(Parser)]
#[command(name = "pack")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pack files and directories into an archive
    Create {
        /// Output archive
        #[arg(short, long, env = "PACK_OUTPUT")]
        output: PathBuf,

        /// Input files or directories. Directory contents are stored relative to the directory.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Maximum compressed/raw ratio for storing an item compressed
        #[arg(short, long, env = "PACK_ZIP_THRESHOLD", default_value_t = pack::writer::DEFAULT_ZIP_THRESHOLD)]
        threshold: f32,

        /// Application data version written into the header
        #[arg(short, long, env = "PACK_DATA_VERSION", default_value_t = 0)]
        data_version: u64,

        /// Favor build speed over compression ratio
        #[arg(long)]
        fast: bool,
    },

    /// Extract every item of an archive
    Unpack {
        /// Path to the archive
        #[arg(short, long, env = "PACK_FILE")]
        archive: PathBuf,

        /// Output directory
        #[arg(short, long, env = "PACK_OUTPUT", default_value = ".")]
        output: PathBuf,

        /// Extract on all cores
        #[arg(short, long)]
        parallel: bool,
    },

    /// Show archive header information
    Info {
        /// Path to the archive
        #[arg(short, long, env = "PACK_FILE")]
        archive: PathBuf,
    },

    /// List archive items
    List {
        /// Path to the archive
        #[arg(short, long, env = "PACK_FILE")]
        archive: PathBuf,

        /// Expected application data version
        #[arg(long, env = "PACK_DATA_VERSION")]
        data_version: Option<u64>,

        /// Show sizes, offsets and reference flags
        #[arg(short, long)]
        detailed: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Create {
            output,
            inputs,
            threshold,
            data_version,
            fast,
        } => {
            let options = PackOptions::default()
                .with_zip_threshold(threshold)
                .with_data_version(data_version)
                .with_prefer_speed(fast);
            cmd_create(&output, &inputs, &options)?;
        }
        Commands::Unpack {
            archive,
            output,
            parallel,
        } => {
            cmd_unpack(&archive, &output, parallel)?;
        }
        Commands::Info { archive } => {
            cmd_info(&archive)?;
        }
        Commands::List {
            archive,
            data_version,
            detailed,
        } => {
            cmd_list(&archive, data_version, detailed)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init();
}

fn progress_bar(len: u64) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

fn cmd_create(output: &Path, inputs: &[PathBuf], options: &PackOptions) -> Result<()> {
    let mut entries = Vec::new();

    for input in inputs {
        if input.is_dir() {
            let found = collect_directory(input)
                .with_context(|| format!("Failed to scan {}", input.display()))?;
            entries.extend(found);
        } else {
            let name = input
                .file_name()
                .and_then(|n| n.to_str())
                .with_context(|| format!("Invalid file name: {}", input.display()))?;
            entries.push(PackEntry::new(input.clone(), name));
        }
    }

    if entries.is_empty() {
        bail!("No input files found");
    }

    tracing::debug!(inputs = inputs.len(), entries = entries.len(), "collected inputs");

    println!("Packing {} files into {}", entries.len(), output.display());

    let pb = progress_bar(entries.len() as u64)?;
    let start = Instant::now();

    let stats = pack_files_with_progress(output, &entries, options, |_, _| pb.inc(1))
        .context("Failed to create archive")?;

    pb.finish_and_clear();

    println!(
        "Packed {} items ({} deduplicated, {} compressed, {} raw) in {:?}",
        stats.item_count,
        stats.reference_count,
        stats.compressed_count,
        stats.raw_count,
        start.elapsed()
    );
    if stats.data_size > 0 {
        println!(
            "Payload: {} of {} bytes ({:.1}%)",
            stats.payload_size,
            stats.data_size,
            stats.payload_size as f64 * 100.0 / stats.data_size as f64
        );
    }

    Ok(())
}

fn cmd_unpack(archive: &Path, output: &Path, parallel: bool) -> Result<()> {
    let header = read_header(archive).context("Failed to read archive header")?;

    println!(
        "Unpacking {} items from {}",
        header.item_count(),
        archive.display()
    );

    let pb = progress_bar(header.item_count())?;
    let start = Instant::now();

    let count = if parallel {
        unpack_files_parallel(archive, output, |done, _| pb.set_position(done))
    } else {
        unpack_files_with_progress(archive, output, |index, _| pb.set_position(index + 1))
    }
    .context("Failed to unpack archive")?;

    pb.finish_and_clear();
    println!("Unpacked {} items in {:?}", count, start.elapsed());

    Ok(())
}

fn cmd_info(archive: &Path) -> Result<()> {
    let header = read_header(archive).context("Failed to read archive header")?;
    let (major, minor, patch) = header.version();
    let (lib_major, lib_minor, lib_patch) = library_version();

    println!("Archive:        {}", archive.display());
    println!("Format version: {}.{}.{}", major, minor, patch);
    println!("Library:        {}.{}.{}", lib_major, lib_minor, lib_patch);
    println!(
        "Byte order:     {}",
        if header.is_big_endian() { "big-endian" } else { "little-endian" }
    );
    println!("Items:          {}", header.item_count());
    println!("Data version:   {}", header.data_version());

    if let Err(e) = header.validate(header.data_version()) {
        println!("Readable:       no ({})", e);
    } else {
        println!("Readable:       yes");
    }

    Ok(())
}

fn cmd_list(archive: &Path, data_version: Option<u64>, detailed: bool) -> Result<()> {
    let data_version = match data_version {
        Some(version) => version,
        None => read_header(archive)
            .context("Failed to read archive header")?
            .data_version(),
    };

    let config = ReaderConfig::default().with_data_version(data_version);
    let reader = PackReader::open(archive, &config).context("Failed to open archive")?;

    for item in reader.items() {
        if detailed {
            let header = item.header();
            println!(
                "{:>12} {:>12} {:>12} {} {}",
                header.zip_size(),
                header.data_size(),
                header.data_offset(),
                if header.is_reference() { "R" } else { "-" },
                item.path()
            );
        } else {
            println!("{}", item.path());
        }
    }

    println!("\nTotal: {} items", reader.item_count());
    Ok(())
}
