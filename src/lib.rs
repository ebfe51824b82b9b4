pub mod classifier;
pub mod ingest;
pub mod models;
pub mod session;
pub mod settings;
mod utils;

use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use session::{replay_messages, LayoutSnapshot};
use settings::SettingsStore;

const USAGE: &str = "usage: eyeread <layout.json> <messages.jsonl> [settings.json]";

/// Replays a recorded tracker session against a page layout and prints the report.
pub fn run() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (layout_path, messages_path) = match args.as_slice() {
        [layout, messages, ..] => (PathBuf::from(layout), PathBuf::from(messages)),
        _ => bail!(USAGE),
    };

    let settings = match args.get(2) {
        Some(path) => SettingsStore::new(PathBuf::from(path))?.settings(),
        None => settings::GazeSettings::default(),
    };

    let layout_raw = std::fs::read_to_string(&layout_path)
        .with_context(|| format!("Failed to read layout from {}", layout_path.display()))?;
    let layout: LayoutSnapshot = serde_json::from_str(&layout_raw)
        .with_context(|| format!("Invalid layout in {}", layout_path.display()))?;

    let messages = File::open(&messages_path)
        .with_context(|| format!("Failed to open {}", messages_path.display()))?;

    log::info!(
        "replaying {} against {}",
        messages_path.display(),
        layout_path.display()
    );
    let outcome = replay_messages(BufReader::new(messages), layout, &settings)?;
    for event in &outcome.events {
        log::info!("{} at {}", event.as_str(), event.at());
    }

    println!("{}", outcome.report.to_json()?);
    Ok(())
}
