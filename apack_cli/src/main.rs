mod logging;
mod settings;

use std::fs::File;
use std::io::{self, BufReader, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::Serialize;

use apack_core::byteio::ByteReader;
use apack_core::config::{CompressionConfig, EncryptionConfig, ReaderOptions, WriterOptions};
use apack_core::error::ApackError;
use apack_core::format::{Attribute, FileHeader, DEFAULT_CHUNK_SIZE};
use apack_core::providers::{CompressionProvider, EncryptionProvider, ProviderSet};
use apack_core::{ArchiveReader, ArchiveWriter, EntryInfo};

#[derive(Parser)]
#[command(name = "apack", about = "Create, inspect, extract, and verify APACK archives", version)]
struct Cli {
    /// Enable debug-level logging (overridden by RUST_LOG if set)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a new archive from one or more files
    Create {
        /// Destination archive path
        output: PathBuf,
        /// Files (or, with -r, directories) to add as entries
        inputs: Vec<PathBuf>,
        /// Compression algorithm: none | zstd | lz4
        #[arg(short = 'c', long, default_value = "none")]
        compression: String,
        /// Compression level (defaults to the algorithm's own default)
        #[arg(short = 'l', long)]
        level: Option<i32>,
        /// Encryption cipher: aes-256-gcm | chacha20-poly1305
        #[arg(short = 'e', long)]
        encryption: Option<String>,
        /// Password for encryption (prompted interactively if omitted)
        #[arg(short = 'p', long)]
        password: Option<String>,
        /// Chunk size in KiB
        #[arg(long)]
        chunk_size: Option<u32>,
        /// Recurse into directories given as inputs
        #[arg(short = 'r', long)]
        recursive: bool,
    },
    /// Extract every entry of an archive to a directory
    Extract {
        /// Source archive path
        archive: PathBuf,
        /// Destination directory (created if missing)
        #[arg(short = 'o', long, default_value = ".")]
        output_dir: PathBuf,
        /// Password, if the archive is encrypted
        #[arg(short = 'p', long)]
        password: Option<String>,
        /// Overwrite existing files at the destination
        #[arg(long)]
        overwrite: bool,
        /// Verify every entry without writing anything to disk
        #[arg(long)]
        dry_run: bool,
    },
    /// List the entries in an archive
    List {
        /// Archive path
        archive: PathBuf,
        /// Show per-entry size and chunk-count detail
        #[arg(short = 'l', long)]
        long: bool,
        /// Emit machine-readable JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show archive-level metadata
    Info {
        /// Archive path
        archive: PathBuf,
        /// Emit machine-readable JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Validate an archive's structure and, by default, every chunk's content
    Verify {
        /// Archive path
        archive: PathBuf,
        /// Only validate headers, TOC, trailer, and chunk framing
        #[arg(long)]
        quick: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result = match cli.command {
        Commands::Create {
            output,
            inputs,
            compression,
            level,
            encryption,
            password,
            chunk_size,
            recursive,
        } => run_create(output, inputs, compression, level, encryption, password, chunk_size, recursive),
        Commands::Extract {
            archive,
            output_dir,
            password,
            overwrite,
            dry_run,
        } => run_extract(archive, output_dir, password, overwrite, dry_run),
        Commands::List { archive, long, json } => run_list(archive, long, json),
        Commands::Info { archive, json } => run_info(archive, json),
        Commands::Verify { archive, quick } => {
            std::process::exit(run_verify(archive, quick));
        }
    };

    if let Err(err) = result {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

// ── Shared setup ────────────────────────────────────────────────────────────

fn providers() -> anyhow::Result<Arc<ProviderSet>> {
    let mut set = ProviderSet::new();
    apack_codecs::register_defaults(&mut set)?;
    Ok(Arc::new(set))
}

fn human_bytes(n: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut v = n as f64;
    let mut unit = 0;
    while v >= 1024.0 && unit < UNITS.len() - 1 {
        v /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{n} B")
    } else {
        format!("{v:.2} {}", UNITS[unit])
    }
}

/// Guess a MIME type from an extension; defaults to a generic binary type
/// since the archive itself treats `mime` as opaque metadata.
fn guess_mime(path: &Path) -> String {
    match path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()) {
        Some(ext) => match ext.as_str() {
            "txt" | "md" | "log" => "text/plain",
            "json" => "application/json",
            "html" | "htm" => "text/html",
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            _ => "application/octet-stream",
        },
        None => "application/octet-stream",
    }
    .to_string()
}

/// Peek just the `FileHeader` without opening a full `ArchiveReader`, so the
/// CLI can decide whether a password prompt is needed before committing to
/// the (seekable) reader path.
fn peek_header(path: &Path) -> anyhow::Result<FileHeader> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut r = ByteReader::new(BufReader::new(file));
    Ok(FileHeader::read_from(&mut r)?)
}

fn resolve_password(flag: Option<String>, prompt: &str) -> anyhow::Result<Vec<u8>> {
    if let Some(p) = flag {
        return Ok(p.into_bytes());
    }
    if io::stdin().is_terminal() {
        Ok(rpassword::prompt_password(prompt)?.into_bytes())
    } else {
        bail!("a password is required but none was supplied and stdin is not a terminal")
    }
}

/// Walk `inputs`, expanding directories (when `recursive`) into their files,
/// pairing each with the archive entry name it should be stored under.
fn collect_inputs(inputs: &[PathBuf], recursive: bool) -> anyhow::Result<Vec<(String, PathBuf)>> {
    let mut out = Vec::new();
    for input in inputs {
        if input.is_dir() {
            if !recursive {
                bail!("{} is a directory; pass -r/--recursive to include directories", input.display());
            }
            walk_dir(input, input, &mut out)?;
        } else {
            let name = input
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| anyhow::anyhow!("input path {} has no valid file name", input.display()))?
                .to_string();
            out.push((name, input.clone()));
        }
    }
    Ok(out)
}

fn walk_dir(root: &Path, dir: &Path, out: &mut Vec<(String, PathBuf)>) -> anyhow::Result<()> {
    for entry in std::fs::read_dir(dir).with_context(|| format!("reading directory {}", dir.display()))? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            walk_dir(root, &path, out)?;
        } else {
            let relative = path.strip_prefix(root).unwrap_or(&path);
            let name = relative.to_string_lossy().replace('\\', "/");
            out.push((name, path));
        }
    }
    Ok(())
}

// ── create ──────────────────────────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
fn run_create(
    output: PathBuf,
    inputs: Vec<PathBuf>,
    compression_name: String,
    level: Option<i32>,
    encryption_name: Option<String>,
    password: Option<String>,
    chunk_size_kib: Option<u32>,
    recursive: bool,
) -> anyhow::Result<()> {
    if inputs.is_empty() {
        bail!("at least one input file is required");
    }

    let file_defaults = settings::load()?;
    let providers = providers()?;

    let compression_name = if compression_name == "none" {
        file_defaults.compression.clone().unwrap_or(compression_name)
    } else {
        compression_name
    };
    let compression_provider = providers
        .compression
        .by_name(&compression_name)
        .with_context(|| format!("unknown compression algorithm '{compression_name}'"))?;
    let compression = if compression_provider.numeric_id() == apack_core::format::algorithm_ids::COMPRESSION_NONE {
        None
    } else {
        Some(CompressionConfig {
            algorithm_id: compression_provider.numeric_id(),
            level: level.or(file_defaults.level).unwrap_or_else(|| compression_provider.default_level()),
        })
    };

    let encryption = match encryption_name.or(file_defaults.encryption.clone()) {
        Some(name) => {
            let cipher = providers.encryption.by_name(&name).with_context(|| format!("unknown encryption cipher '{name}'"))?;
            let password = resolve_password(password, "Archive password: ")?;
            Some(EncryptionConfig {
                cipher_id: cipher.numeric_id(),
                kdf_id: apack_core::format::algorithm_ids::KDF_ARGON2ID,
                password,
                kdf_iterations: 3,
                kdf_memory_kb: 19_456,
                kdf_parallelism: 1,
            })
        }
        None => None,
    };

    let chunk_size = chunk_size_kib
        .or(file_defaults.chunk_size_kib)
        .map(|kib| kib * 1024)
        .unwrap_or(DEFAULT_CHUNK_SIZE);

    let entries = collect_inputs(&inputs, recursive)?;

    let sink = File::create(&output).with_context(|| format!("creating {}", output.display()))?;
    let mut writer = ArchiveWriter::create(
        sink,
        providers,
        WriterOptions {
            chunk_size,
            checksum_algorithm: apack_core::format::algorithm_ids::CHECKSUM_CRC32,
            compression,
            encryption,
        },
    )?;

    let mut total_raw = 0u64;
    for (name, path) in &entries {
        let source = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        let size = source.metadata()?.len();
        let mime = guess_mime(path);
        writer
            .add_entry(0, name, &mime, Vec::<Attribute>::new(), BufReader::new(source))
            .with_context(|| format!("adding entry '{name}'"))?;
        total_raw += size;
    }
    writer.close()?;

    let written = std::fs::metadata(&output)?.len();
    eprintln!("  entries     : {}", entries.len());
    eprintln!("  raw size    : {}", human_bytes(total_raw));
    eprintln!("  archive size: {}", human_bytes(written));
    Ok(())
}

// ── extract ─────────────────────────────────────────────────────────────────

fn run_extract(archive: PathBuf, output_dir: PathBuf, password: Option<String>, overwrite: bool, dry_run: bool) -> anyhow::Result<()> {
    let header = peek_header(&archive)?;
    let resolved_password = if header.mode_flags.encrypted {
        Some(resolve_password(password, "Archive password: ")?)
    } else {
        None
    };

    let providers = providers()?;
    let file = File::open(&archive).with_context(|| format!("opening {}", archive.display()))?;
    let reader = ArchiveReader::open(file, providers, ReaderOptions { password: resolved_password })?;

    if !dry_run {
        std::fs::create_dir_all(&output_dir).with_context(|| format!("creating {}", output_dir.display()))?;
    }

    let mut extracted = 0u64;
    for entry in reader.list_entries()? {
        let mut stream = reader.open_entry_by_id(entry.id)?;

        if dry_run {
            io::copy(&mut stream, &mut io::sink()).with_context(|| format!("verifying entry '{}'", entry.name))?;
        } else {
            let dest = output_dir.join(&entry.name);
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent)?;
            }
            if dest.exists() && !overwrite {
                bail!("{} already exists (pass --overwrite to replace it)", dest.display());
            }
            let mut out = File::create(&dest).with_context(|| format!("creating {}", dest.display()))?;
            io::copy(&mut stream, &mut out).with_context(|| format!("extracting entry '{}'", entry.name))?;
        }
        extracted += 1;
    }

    if dry_run {
        eprintln!("  verified {extracted} entries (dry run, nothing written)");
    } else {
        eprintln!("  extracted {extracted} entries to {}", output_dir.display());
    }
    Ok(())
}

// ── list / info ─────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct EntryJson {
    id: u64,
    name: String,
    mime: String,
    original_size: u64,
    stored_size: u64,
    chunk_count: u32,
}

impl From<EntryInfo> for EntryJson {
    fn from(e: EntryInfo) -> Self {
        Self {
            id: e.id,
            name: e.name,
            mime: e.mime,
            original_size: e.original_size,
            stored_size: e.stored_size,
            chunk_count: e.chunk_count,
        }
    }
}

fn run_list(archive: PathBuf, long: bool, json: bool) -> anyhow::Result<()> {
    let providers = providers()?;
    let header = peek_header(&archive)?;
    let password = if header.mode_flags.encrypted {
        Some(resolve_password(None, "Archive password: ")?)
    } else {
        None
    };
    let file = File::open(&archive).with_context(|| format!("opening {}", archive.display()))?;
    let reader = ArchiveReader::open(file, providers, ReaderOptions { password })?;
    let entries = reader.list_entries()?;

    if json {
        let as_json: Vec<EntryJson> = entries.into_iter().map(EntryJson::from).collect();
        println!("{}", serde_json::to_string_pretty(&as_json)?);
        return Ok(());
    }

    for entry in &entries {
        if long {
            println!(
                "{:>6}  {:>12}  {:>12}  {:>6}  {}",
                entry.id,
                human_bytes(entry.original_size),
                human_bytes(entry.stored_size),
                entry.chunk_count,
                entry.name
            );
        } else {
            println!("{}", entry.name);
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct ArchiveInfoJson {
    entry_count: u64,
    chunk_size: u32,
    total_original_size: u64,
    total_stored_size: u64,
    checksum_algorithm: u8,
}

fn run_info(archive: PathBuf, json: bool) -> anyhow::Result<()> {
    let providers = providers()?;
    let header = peek_header(&archive)?;
    let password = if header.mode_flags.encrypted {
        Some(resolve_password(None, "Archive password: ")?)
    } else {
        None
    };
    let file = File::open(&archive).with_context(|| format!("opening {}", archive.display()))?;
    let reader = ArchiveReader::open(file, providers, ReaderOptions { password })?;

    if json {
        let info = ArchiveInfoJson {
            entry_count: reader.entry_count(),
            chunk_size: reader.chunk_size(),
            total_original_size: reader.total_original_size(),
            total_stored_size: reader.total_stored_size(),
            checksum_algorithm: reader.checksum_algorithm(),
        };
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("=== {} ===", archive.display());
    println!("  entries       : {}", reader.entry_count());
    println!("  chunk size    : {}", human_bytes(reader.chunk_size() as u64));
    println!("  raw size      : {}", human_bytes(reader.total_original_size()));
    println!("  stored size   : {}", human_bytes(reader.total_stored_size()));
    println!("  encrypted     : {}", header.mode_flags.encrypted);
    println!("  stream mode   : {}", header.mode_flags.stream_mode);
    Ok(())
}

// ── verify ──────────────────────────────────────────────────────────────────

/// Exit codes: 0 ok, 1 corrupt, 2 cannot read.
fn run_verify(archive: PathBuf, quick: bool) -> i32 {
    let header = match peek_header(&archive) {
        Ok(h) => h,
        Err(err) => {
            eprintln!("cannot read {}: {err:#}", archive.display());
            return 2;
        }
    };

    let password = if header.mode_flags.encrypted {
        match resolve_password(None, "Archive password: ") {
            Ok(p) => Some(p),
            Err(err) => {
                eprintln!("cannot read {}: {err:#}", archive.display());
                return 2;
            }
        }
    } else {
        None
    };

    let providers = match providers() {
        Ok(p) => p,
        Err(err) => {
            eprintln!("cannot read {}: {err:#}", archive.display());
            return 2;
        }
    };

    let file = match File::open(&archive) {
        Ok(f) => f,
        Err(err) => {
            eprintln!("cannot read {}: {err}", archive.display());
            return 2;
        }
    };

    let reader = match ArchiveReader::open(file, providers, ReaderOptions { password }) {
        Ok(r) => r,
        Err(ApackError::Io(err)) => {
            eprintln!("cannot read {}: {err}", archive.display());
            return 2;
        }
        Err(err) => {
            eprintln!("{}: corrupt: {err}", archive.display());
            return 1;
        }
    };

    let result = if quick { reader.verify_quick() } else { reader.verify_full() };
    match result {
        Ok(()) => {
            println!("{}: ok ({} entries)", archive.display(), reader.entry_count());
            0
        }
        Err(err) => {
            eprintln!("{}: corrupt: {err}", archive.display());
            1
        }
    }
}
