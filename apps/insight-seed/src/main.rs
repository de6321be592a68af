use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use insight_protocol::Record;
use insight_store::Store;
use serde_json::Value as JsonValue;
use tracing::info;

#[derive(Debug, Parser)]
#[command(
    name = "insight-seed",
    version,
    about = "Replace the dashboard record collection with a JSON array file"
)]
struct Args {
    /// JSON file holding an array of record objects
    #[arg(default_value = "data.json")]
    path: PathBuf,
    /// Directory holding the dashboard datastore
    #[arg(long, env = "INSIGHT_STATE_DIR", default_value = "state")]
    state_dir: PathBuf,
    /// SQLite busy timeout in milliseconds
    #[arg(long, env = "INSIGHT_SQLITE_BUSY_MS", default_value_t = 5000)]
    busy_ms: u64,
}

fn main() -> Result<()> {
    insight_telemetry::init();
    let args = Args::parse();

    let records = read_records(&args.path)?;
    let store = Store::open_with_busy_timeout(&args.state_dir, Duration::from_millis(args.busy_ms))
        .with_context(|| format!("opening datastore in {}", args.state_dir.display()))?;
    let inserted = store
        .replace_records(&records)
        .context("replacing dashboard records")?;
    info!(inserted, db = %store.db_path().display(), "seed complete");
    println!(
        "Seeded {inserted} records into {}",
        store.db_path().display()
    );
    Ok(())
}

/// Parse `path` as a JSON array whose every entry is an object.
fn read_records(path: &Path) -> Result<Vec<Record>> {
    if !path.exists() {
        bail!("data file not found: {}", path.display());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let value: JsonValue =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
    let JsonValue::Array(items) = value else {
        bail!("{} must contain a JSON array of records", path.display());
    };
    items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| {
            Record::try_from(item)
                .map_err(|other| anyhow::anyhow!("entry {idx} is not an object: {other}"))
        })
        .collect()
}
