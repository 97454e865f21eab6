//! acqmerge: re-serialize indexed events into size-bounded containers.
//!
//! ```text
//! acqmerge events.idx 'merged-{}-{}.acq' 901 [max_events [master_key]]
//! ```
//!
//! The output template's two `{}` placeholders are filled with the run
//! start time and sequence number of each output's first event. Failures
//! are reported on standard output and exit non-zero.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use acqfile_storage::{MergeConfig, Merger};

#[derive(Parser, Debug)]
#[command(name = "acqmerge", version, about = "Merge indexed acqfile events")]
struct Args {
    /// Line-oriented index of (source file, byte offset) event entries.
    index_file: PathBuf,

    /// Output filename template with two {} placeholders
    /// (run start time, sequence number).
    output_template: String,

    /// Downlink id, written as the run id of every output container.
    downlink_id: u32,

    /// Event budget of the first output file; later files shrink
    /// geometrically toward half of this.
    max_events: Option<u64>,

    /// Master translation key to force into every merged physics record,
    /// decimal or 0x-prefixed hex.
    #[arg(value_parser = parse_key)]
    override_master_key: Option<u32>,
}

fn parse_key(raw: &str) -> Result<u32, String> {
    let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => raw.parse(),
    };
    parsed.map_err(|_| format!("invalid key '{raw}'"))
}

fn run(args: Args) -> Result<()> {
    let mut config = MergeConfig::from_env();
    if let Some(max_events) = args.max_events {
        config.max_events = max_events;
    }
    config.override_master_key = args.override_master_key;

    let mut merger = Merger::new(args.downlink_id, args.output_template, config);
    let summary = merger
        .merge_index_file(&args.index_file)
        .with_context(|| format!("merging {}", args.index_file.display()))?;

    for output in &summary.outputs {
        println!("{}  {} events", output.path.display(), output.events);
    }
    println!(
        "{} events across {} files",
        summary.total_events(),
        summary.outputs.len()
    );
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    debug!(?args, "starting merge");
    if let Err(e) = run(args) {
        println!("acqmerge: {e:#}");
        std::process::exit(1);
    }
}
