use chrono::Utc;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{broadcast, watch};
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::ingest::{SourceSelector, SyntheticGazeGenerator, SYNTHETIC_INTERVAL_MS};
use crate::models::{GazeEvent, SessionStats, TimestampMs};
use crate::settings::SettingsStore;

use super::processor::{SessionProcessor, BATCH_SIZE};
use super::queue::SampleQueue;
use super::surface::SharedSurface;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// Minimum spacing between processing ticks (about 60Hz).
pub const PROCESS_INTERVAL_MS: u64 = 16;

pub fn now_ms() -> TimestampMs {
    Utc::now().timestamp_millis()
}

/// Where the processing loop publishes its output.
#[derive(Clone)]
pub struct LoopOutputs {
    pub events: broadcast::Sender<GazeEvent>,
    pub stats: watch::Sender<SessionStats>,
}

/// Single consumer of the sample queue. Owns the session's classifier state until
/// cancelled, then hands it back.
pub async fn processing_loop(
    session_id: String,
    mut processor: SessionProcessor,
    queue: SampleQueue,
    surface: SharedSurface,
    settings: Arc<SettingsStore>,
    outputs: LoopOutputs,
    cancel_token: CancellationToken,
) -> SessionProcessor {
    let mut ticker = tokio::time::interval(Duration::from_millis(PROCESS_INTERVAL_MS));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                processor.set_thresholds(settings.thresholds());
                let batch = queue.drain_batch(BATCH_SIZE);
                let events = {
                    let mut surface = surface.lock().await;
                    processor.process_batch(&batch, &mut *surface, now_ms())
                };

                for event in events {
                    // No subscribers is fine.
                    let _ = outputs.events.send(event);
                }
                outputs.stats.send_replace(processor.stats().clone());
            }
            _ = cancel_token.cancelled() => {
                log_info!(
                    "processing loop for session {} shutting down ({} packets processed)",
                    session_id,
                    processor.stats().gaze_event_count
                );
                break;
            }
        }
    }

    processor
}

/// 20Hz fallback producer. Only enqueues while the selector is simulating and the
/// settings allow it.
pub async fn synthetic_loop(
    queue: SampleQueue,
    surface: SharedSurface,
    settings: Arc<SettingsStore>,
    selector: Arc<Mutex<SourceSelector>>,
    mut generator: SyntheticGazeGenerator,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(Duration::from_millis(SYNTHETIC_INTERVAL_MS));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now = now_ms();
                let admitted = {
                    let mut selector = selector.lock().unwrap_or_else(PoisonError::into_inner);
                    if settings.simulation_enabled() {
                        selector.admit_synthetic(now)
                    } else {
                        selector.tick(now);
                        false
                    }
                };
                if !admitted {
                    continue;
                }

                let Some(bounds) = surface.lock().await.visible_sentence_bounds() else {
                    log_debug!("no visible sentence, skipping synthetic sample");
                    continue;
                };
                queue.push(generator.generate(bounds, now));
            }
            _ = cancel_token.cancelled() => {
                log_info!("synthetic gaze loop shutting down");
                break;
            }
        }
    }
}
