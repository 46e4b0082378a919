use anyhow::{Context, Result};
use clap::Parser;
use colproto::{MessageSchema, ProtoColumnReader};
use config::Config;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::{error, info};

/// Read protobuf records back from a columnar parquet file
#[derive(Parser, Debug)]
#[command(name = "colproto")]
#[command(about = "Read projected protobuf records from a column file", long_about = None)]
struct Args {
    /// Parquet column file to read
    #[arg(short, long)]
    file: PathBuf,

    /// Serialized FileDescriptorSet containing the message type
    #[arg(short, long)]
    descriptor_set: PathBuf,

    /// Fully qualified message type, e.g. example.Person
    #[arg(short, long)]
    message: String,

    /// Comma-separated schema indices of the fields to read (overrides the config)
    #[arg(short, long)]
    required: Option<String>,

    /// Path to TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Stop after this many records
    #[arg(short, long)]
    limit: Option<usize>,

    /// Print the projection plan and exit
    #[arg(long)]
    plan: bool,
}

fn main() -> Result<()> {
    // Logs go to stderr so stdout only carries records
    // Set RUST_LOG to control the level, e.g. RUST_LOG=colproto=debug
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    run(args).inspect_err(|e| error!("{:#}", e))
}

fn run(args: Args) -> Result<()> {
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(required) = args.required {
        config.reader.required_fields = required;
    }
    config.validate().context("Invalid configuration")?;

    let descriptor_set = std::fs::read(&args.descriptor_set).with_context(|| {
        format!(
            "Failed to read descriptor set {}",
            args.descriptor_set.display()
        )
    })?;
    let schema = MessageSchema::from_descriptor_set(&descriptor_set, &args.message)
        .with_context(|| format!("Failed to load message type {}", args.message))?;
    let required = config.reader.required_fields()?;

    let reader = ProtoColumnReader::open_parquet(
        &args.file,
        config.reader.read_options(),
        &schema,
        &required,
    )
    .with_context(|| format!("Failed to open column file {}", args.file.display()))?;

    if args.plan {
        print!("{}", reader.plan());
        return Ok(());
    }

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut written = 0usize;

    for message in reader.take(args.limit.unwrap_or(usize::MAX)) {
        let message = message.with_context(|| format!("Failed to read record {}", written + 1))?;
        serde_json::to_writer(&mut out, &message).context("Failed to serialize record")?;
        writeln!(out)?;
        written += 1;
    }
    out.flush()?;

    info!(records = written, file = %args.file.display(), "done");
    Ok(())
}
