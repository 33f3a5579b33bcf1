use anyhow::{bail, Context, Result};
use chunkdiff::config::{effective_chunk_size, DiffConfig};
use chunkdiff::report::{write_report, ReportFormat};
use chunkdiff::sync::{build_parallel, DeltaEngine, SignatureTable};
use chunkdiff::Delta;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    let chunk_size = Arg::new("chunk-size")
        .short('c')
        .long("chunk-size")
        .value_name("BYTES")
        .value_parser(clap::value_parser!(usize))
        .help("Chunk size in bytes (default 1024)");
    let output = Arg::new("output")
        .short('o')
        .long("output")
        .value_name("FILE")
        .help("Report file (default output.diff)");
    let format = Arg::new("format")
        .short('f')
        .long("format")
        .value_name("FORMAT")
        .help("Report format: text or json");

    Command::new("chunkdiff")
        .version(chunkdiff::VERSION)
        .about("Chunk-level delta between two files using a rolling checksum.")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .global(true)
                .help("Configuration file path"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .global(true)
                .help("Log level (trace, debug, info, warn, error)"),
        )
        .subcommand(
            Command::new("diff")
                .about("Compute the delta between an old and a new file")
                .arg(Arg::new("old").long("old").value_name("FILE").required(true))
                .arg(Arg::new("new").long("new").value_name("FILE").required(true))
                .arg(chunk_size.clone())
                .arg(output.clone())
                .arg(format.clone()),
        )
        .subcommand(
            Command::new("signature")
                .about("Write the chunk signatures of a baseline file")
                .arg(Arg::new("old").long("old").value_name("FILE").required(true))
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .value_name("FILE")
                        .required(true)
                        .help("Signature file to write"),
                )
                .arg(chunk_size)
                .arg(
                    Arg::new("parallel")
                        .long("parallel")
                        .action(ArgAction::SetTrue)
                        .help("Hash chunks on all cores"),
                ),
        )
        .subcommand(
            Command::new("delta")
                .about("Compute a delta from a signature file and a new file")
                .arg(
                    Arg::new("signature")
                        .long("signature")
                        .value_name("FILE")
                        .required(true),
                )
                .arg(Arg::new("new").long("new").value_name("FILE").required(true))
                .arg(output)
                .arg(format),
        )
}

/// Defaults, then the config file, then flags
fn load_config(matches: &ArgMatches, sub: &ArgMatches) -> Result<DiffConfig> {
    let global = |name: &str| {
        sub.get_one::<String>(name)
            .or_else(|| matches.get_one::<String>(name))
            .cloned()
    };

    let mut config = match global("config") {
        Some(path) => DiffConfig::from_file(&path)
            .with_context(|| format!("Failed to load config {}", path))?,
        None => DiffConfig::default(),
    };

    if let Some(level) = global("log-level") {
        config.log_level = level;
    }
    if let Ok(Some(size)) = sub.try_get_one::<usize>("chunk-size") {
        config.chunk_size = *size;
    }
    if let Ok(Some(output)) = sub.try_get_one::<String>("output") {
        config.output = PathBuf::from(output);
    }
    if let Ok(Some(format)) = sub.try_get_one::<String>("format") {
        config.format = format.parse::<ReportFormat>()?;
    }

    config.validate()?;
    Ok(config)
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn required<'a>(sub: &'a ArgMatches, name: &str) -> &'a str {
    sub.get_one::<String>(name)
        .map(String::as_str)
        .unwrap_or_default()
}

fn open(path: &str) -> Result<File> {
    File::open(path).with_context(|| format!("Failed to open file [{}]", path))
}

fn build_table(old: &str, requested: usize) -> Result<SignatureTable> {
    let len = std::fs::metadata(old)
        .with_context(|| format!("Failed to get file size of [{}]", old))?
        .len();
    let chunk_size = effective_chunk_size(requested, len)?;

    SignatureTable::build(open(old)?, chunk_size)
        .with_context(|| format!("Failed to hash [{}]", old))
}

async fn build_table_parallel(old: &str, requested: usize) -> Result<SignatureTable> {
    let len = tokio::fs::metadata(old)
        .await
        .with_context(|| format!("Failed to get file size of [{}]", old))?
        .len();
    let chunk_size = effective_chunk_size(requested, len)?;

    let file = tokio::fs::File::open(old)
        .await
        .with_context(|| format!("Failed to open file [{}]", old))?;
    build_parallel(file, chunk_size)
        .await
        .with_context(|| format!("Failed to hash [{}]", old))
}

fn run_engine(table: SignatureTable, new: &str) -> Result<Delta> {
    let engine = DeltaEngine::new(table.chunk_size())?;
    engine
        .compute(table, open(new)?)
        .with_context(|| format!("Failed to compute delta of [{}]", new))
}

/// Print the report and write it to the configured output file
fn emit(delta: &Delta, config: &DiffConfig) -> Result<()> {
    println!("Delta:");
    write_report(delta, config.format, io::stdout().lock())?;

    let file = File::create(&config.output)
        .with_context(|| format!("Failed to create delta file {}", config.output.display()))?;
    write_report(delta, config.format, BufWriter::new(file))?;

    info!(
        output = %config.output.display(),
        "{}",
        delta.stats()
    );
    Ok(())
}

fn write_signature(table: &SignatureTable, path: &Path) -> Result<()> {
    let bytes = table.to_bytes()?;
    std::fs::write(path, bytes)
        .with_context(|| format!("Failed to write signature file {}", path.display()))?;

    info!(
        chunks = table.len(),
        chunk_size = table.chunk_size(),
        output = %path.display(),
        "signature written"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    let Some((name, sub)) = matches.subcommand() else {
        bail!("a subcommand is required");
    };

    let config = load_config(&matches, sub)?;
    init_logging(&config.log_level);
    chunkdiff::metrics::init_metrics();

    match name {
        "diff" => {
            let table = build_table(required(sub, "old"), config.chunk_size)?;
            let delta = run_engine(table, required(sub, "new"))?;
            emit(&delta, &config)
        }
        "signature" => {
            let old = required(sub, "old");
            let table = if sub.get_flag("parallel") {
                build_table_parallel(old, config.chunk_size).await?
            } else {
                build_table(old, config.chunk_size)?
            };
            write_signature(&table, Path::new(required(sub, "output")))
        }
        "delta" => {
            let path = required(sub, "signature");
            let bytes = std::fs::read(path)
                .with_context(|| format!("Failed to read signature file [{}]", path))?;
            let table = SignatureTable::from_bytes(&bytes)?;
            let delta = run_engine(table, required(sub, "new"))?;
            emit(&delta, &config)
        }
        other => bail!("unknown subcommand {}", other),
    }
}
