use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use protobuf::Message;

use perfetto_protos::trace::Trace;

use probedb::{IngestConfig, IngestSession, MetadataKey};

/// Ingest a Perfetto trace file and print a summary of the resulting tables.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Path to a serialized Perfetto trace file (.pb)
    trace: PathBuf,

    /// Optional JSON ingestion config
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the diagnostic stat map after ingestion
    #[arg(long)]
    stats: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => IngestConfig::from_file(path)?,
        None => IngestConfig::default(),
    };

    let bytes = std::fs::read(&cli.trace)
        .with_context(|| format!("Failed to read trace file: {}", cli.trace.display()))?;
    let trace = Trace::parse_from_bytes(&bytes).context(
        "Failed to parse trace. File may be corrupted or not a serialized Perfetto trace.",
    )?;
    println!("Loaded trace with {} packets", trace.packet.len());

    let mut session = IngestSession::new(config);
    session
        .ingest_trace(&trace)
        .context("Trace ingestion aborted")?;
    let storage = session.finish();

    println!("tracks:             {}", storage.tracks().len());
    println!("counter samples:    {}", storage.counters().len());
    println!("slices:             {}", storage.slices().len());
    println!("log events:         {}", storage.logs().len());
    println!("packages:           {}", storage.packages().len());
    println!("game interventions: {}", storage.game_interventions().len());
    println!("processes:          {}", storage.processes().len());
    println!("threads:            {}", storage.threads().len());
    if let Some(id) = storage.metadata(MetadataKey::StatsdTriggeringSubscriptionId) {
        println!("statsd triggering subscription id: {id}");
    }

    if cli.stats {
        println!("--- stats ---");
        for (name, value) in storage.stats() {
            println!("{name}: {value}");
        }
    }

    Ok(())
}
