use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use romcheck::{
    config, scanner, Algorithm, CatalogEntry, DatasheetReader, DigestComputer, DigestIndex,
    EntryTag,
};

#[derive(Parser)]
#[command(name = config::TOOL_NAME, version, about = "Compare console ROM collections against accuracy-focused datasheets")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check ROM files against datasheet catalogs
    Check {
        /// File or directory holding the ROMs to verify
        roms: PathBuf,

        /// Datasheet files or directories; files under a "mame" directory
        /// are parsed as arcade machine listings
        #[arg(short, long = "datasheet")]
        datasheets: Vec<PathBuf>,

        /// Additional datasheets to parse as arcade machine listings
        #[arg(long)]
        mame: Vec<PathBuf>,

        /// Also report catalog entries never seen during the scan
        #[arg(long)]
        missing: bool,

        /// Emit the report as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print the digest of a single file
    Hash {
        file: PathBuf,

        #[arg(long, value_enum, default_value_t = Algorithm::Crc32)]
        algorithm: Algorithm,

        /// Read size in bytes; values below the default floor are raised
        #[arg(long)]
        chunk_size: Option<usize>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("romcheck=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Check {
            roms,
            datasheets,
            mame,
            missing,
            json,
        } => run_check(roms, datasheets, mame, missing, json),
        Command::Hash {
            file,
            algorithm,
            chunk_size,
        } => run_hash(file, algorithm, chunk_size),
    }
}

fn run_check(
    roms: PathBuf,
    datasheets: Vec<PathBuf>,
    mame: Vec<PathBuf>,
    missing: bool,
    json: bool,
) -> Result<()> {
    let sheet_roots = if datasheets.is_empty() && mame.is_empty() {
        vec![config::default_datasheets_dir()]
    } else {
        datasheets
    };

    let entries = load_catalog_entries(&sheet_roots, &mame)?;
    if entries.is_empty() {
        bail!("no usable catalog entries found in the given datasheets");
    }

    let index = DigestIndex::build(entries);
    tracing::debug!(
        "index holds {} entries under {} digests",
        index.entry_count(),
        index.digest_count()
    );

    let scan = romcheck::ScanEngine::new()
        .scan(&roms)
        .with_context(|| format!("scanning {}", roms.display()))?;

    let report = index.reconcile(scan.items, missing);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        report.display();
        if !scan.failures.is_empty() {
            println!("\n{} path(s) could not be scanned:", scan.failures.len());
            for failure in &scan.failures {
                println!("  ! {}", failure.path.display());
            }
        }
    }

    Ok(())
}

/// Parse every datasheet under the given roots. A document that fails to
/// parse is skipped with a warning; a bad root path is fatal.
fn load_catalog_entries(
    sheet_roots: &[PathBuf],
    mame_roots: &[PathBuf],
) -> Result<Vec<CatalogEntry>> {
    let mut entries = Vec::new();

    let roots = sheet_roots
        .iter()
        .map(|root| (root, None))
        .chain(mame_roots.iter().map(|root| (root, Some(EntryTag::Machine))));

    for (root, forced_tag) in roots {
        let files = scanner::collect_files(root)
            .with_context(|| format!("collecting datasheets from {}", root.display()))?;

        for file in files {
            let tag = forced_tag.unwrap_or_else(|| {
                if config::is_mame_path(&file) {
                    EntryTag::Machine
                } else {
                    EntryTag::Game
                }
            });

            match DatasheetReader::open(&file, tag).and_then(DatasheetReader::collect_entries) {
                Ok(mut found) => {
                    tracing::debug!("{}: {} entries", file.display(), found.len());
                    entries.append(&mut found);
                }
                Err(err) => {
                    tracing::warn!("skipping datasheet {}: {}", file.display(), err);
                }
            }
        }
    }

    Ok(entries)
}

fn run_hash(file: PathBuf, algorithm: Algorithm, chunk_size: Option<usize>) -> Result<()> {
    let computer = match chunk_size {
        Some(size) => DigestComputer::with_chunk_size(size),
        None => DigestComputer::new(),
    };

    let digest = computer.digest_file(&file, algorithm)?;
    println!("{}  {}", digest, file.display());
    Ok(())
}
