use anyhow::{Context, Result};
use std::io::BufRead;

use crate::ingest::parse_backend_message;
use crate::models::{GazeEvent, GazePacket};
use crate::settings::GazeSettings;

use super::processor::{SessionProcessor, BATCH_SIZE};
use super::queue::SampleQueue;
use super::report::SessionReport;
use super::surface::{LayoutSnapshot, ReaderSurface};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Result of running a recorded session through the pipeline.
#[derive(Debug, Clone)]
pub struct ReplayOutcome {
    pub report: SessionReport,
    pub events: Vec<GazeEvent>,
    pub dropped_lines: usize,
}

/// Runs newline-delimited tracker messages through a fresh session against `layout`.
///
/// The session clock follows the message timestamps, so the outcome does not depend
/// on wall time. Blank lines are skipped; malformed lines are logged and counted.
pub fn replay_messages<R: BufRead>(
    reader: R,
    mut layout: LayoutSnapshot,
    settings: &GazeSettings,
) -> Result<ReplayOutcome> {
    let queue = SampleQueue::new();
    let viewport = layout.viewport();
    let mut dropped_lines = 0;

    for (number, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read message line {}", number + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        match parse_backend_message(&line, viewport) {
            Ok(Some(packet)) => {
                if !queue.push(packet) {
                    dropped_lines += 1;
                }
            }
            Ok(None) => {}
            Err(err) => {
                log_warn!("line {}: dropping malformed tracker message: {err:#}", number + 1);
                dropped_lines += 1;
            }
        }
    }

    let mut batch: Vec<GazePacket> = queue.drain_batch(BATCH_SIZE);
    let start = batch.first().map(|p| p.sample.timestamp).unwrap_or_default();
    let mut processor = SessionProcessor::new(settings.thresholds(), start);
    let mut events = Vec::new();

    while !batch.is_empty() {
        let now = batch.last().map(|p| p.sample.timestamp).unwrap_or(start);
        events.extend(processor.process_batch(&batch, &mut layout, now));
        batch = queue.drain_batch(BATCH_SIZE);
    }

    log_info!(
        "replayed {} samples, {} events, {} dropped lines",
        processor.stats().gaze_event_count,
        events.len(),
        dropped_lines
    );

    let report = processor.into_report(layout.element_positions());
    Ok(ReplayOutcome {
        report,
        events,
        dropped_lines,
    })
}
