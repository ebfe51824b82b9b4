use anyhow::{bail, Context, Result};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::ingest::{
    parse_backend_message, SourceMode, SourceSelector, SyntheticGazeGenerator, TrackerClock,
};
use crate::models::{GazeEvent, SessionStats, TrackingStatus};
use crate::settings::SettingsStore;

use super::loop_worker::{now_ms, processing_loop, synthetic_loop, LoopOutputs};
use super::processor::SessionProcessor;
use super::queue::SampleQueue;
use super::report::SessionReport;
use super::surface::SharedSurface;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Owns the lifecycle of one tracking session at a time: `Idle -> Active -> Idle`.
pub struct SessionController {
    settings: Arc<SettingsStore>,
    surface: SharedSurface,
    queue: SampleQueue,
    selector: Arc<Mutex<SourceSelector>>,
    clock: Mutex<TrackerClock>,
    status: TrackingStatus,
    session_id: Option<String>,
    seed: Option<u64>,
    events_tx: broadcast::Sender<GazeEvent>,
    stats_tx: watch::Sender<SessionStats>,
    processing: Option<JoinHandle<SessionProcessor>>,
    synthetic: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl SessionController {
    pub fn new(settings: Arc<SettingsStore>, surface: SharedSurface) -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (stats_tx, _) = watch::channel(SessionStats::default());
        Self {
            settings,
            surface,
            queue: SampleQueue::new(),
            selector: Arc::new(Mutex::new(SourceSelector::new(now_ms()))),
            clock: Mutex::new(TrackerClock::default()),
            status: TrackingStatus::Idle,
            session_id: None,
            seed: None,
            events_tx,
            stats_tx,
            processing: None,
            synthetic: None,
            cancel_token: None,
        }
    }

    /// Makes the synthetic fallback reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub async fn start(&mut self) -> Result<String> {
        if self.status == TrackingStatus::Active {
            bail!("tracking session already active");
        }

        let session_id = Uuid::new_v4().to_string();
        let started_at = now_ms();
        log_info!("starting gaze session {session_id}");

        self.queue.clear();
        *self.lock_selector() = SourceSelector::new(started_at);
        self.lock_clock().reanchor();

        let processor = SessionProcessor::new(self.settings.thresholds(), started_at);
        self.stats_tx.send_replace(processor.stats().clone());

        let generator = match self.seed {
            Some(seed) => SyntheticGazeGenerator::seeded(seed),
            None => SyntheticGazeGenerator::new(),
        };

        let cancel_token = CancellationToken::new();
        let outputs = LoopOutputs {
            events: self.events_tx.clone(),
            stats: self.stats_tx.clone(),
        };

        self.processing = Some(tokio::spawn(processing_loop(
            session_id.clone(),
            processor,
            self.queue.clone(),
            Arc::clone(&self.surface),
            Arc::clone(&self.settings),
            outputs,
            cancel_token.clone(),
        )));
        self.synthetic = Some(tokio::spawn(synthetic_loop(
            self.queue.clone(),
            Arc::clone(&self.surface),
            Arc::clone(&self.settings),
            Arc::clone(&self.selector),
            generator,
            cancel_token.clone(),
        )));

        self.cancel_token = Some(cancel_token);
        self.session_id = Some(session_id.clone());
        self.status = TrackingStatus::Active;
        Ok(session_id)
    }

    /// Feeds one raw tracker message into the session. Returns whether a sample was
    /// queued; malformed messages are logged and dropped.
    ///
    /// Tracker timestamps are rebased onto the host clock before queueing, so the
    /// report's `gazeData` carries host-time timestamps.
    pub async fn ingest_backend_message(&self, raw: &str) -> bool {
        if self.status != TrackingStatus::Active {
            return false;
        }

        let viewport = self.surface.lock().await.viewport();
        let mut packet = match parse_backend_message(raw, viewport) {
            Ok(Some(packet)) => packet,
            Ok(None) => return false,
            Err(err) => {
                log_warn!("dropping malformed tracker message: {err:#}");
                return false;
            }
        };

        let tracker_ts = packet.sample.timestamp;
        let resuming = matches!(self.source_mode(), SourceMode::Simulating { .. });
        let mut clock = self.lock_clock();
        if resuming {
            clock.reanchor();
        }
        packet.sample.timestamp = clock.rebase(tracker_ts, now_ms());

        let mut accepted = self.queue.push(packet.clone());
        if !accepted {
            // A synthetic sample landed in between; take a fresh anchor and retry once.
            clock.reanchor();
            packet.sample.timestamp = clock.rebase(tracker_ts, now_ms());
            accepted = self.queue.push(packet);
        }
        drop(clock);

        if !accepted {
            log_debug!("tracker sample at {tracker_ts} refused by the queue");
            return false;
        }
        self.lock_selector().observe_real(now_ms());
        true
    }

    pub fn status(&self) -> TrackingStatus {
        self.status
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn stats(&self) -> SessionStats {
        self.stats_tx.borrow().clone()
    }

    pub fn watch_stats(&self) -> watch::Receiver<SessionStats> {
        self.stats_tx.subscribe()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GazeEvent> {
        self.events_tx.subscribe()
    }

    pub fn source_mode(&self) -> SourceMode {
        self.lock_selector().mode()
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Ends the session and throws its state away.
    pub async fn stop(&mut self) -> Result<()> {
        let processor = self.shutdown().await?;
        self.queue.clear();
        if let Some(processor) = processor {
            log_info!(
                "gaze session stopped after {} packets",
                processor.stats().gaze_event_count
            );
        }
        Ok(())
    }

    /// Ends the session, processing whatever is still queued, and builds the report.
    pub async fn finish(&mut self) -> Result<SessionReport> {
        if self.status != TrackingStatus::Active {
            bail!("no active tracking session");
        }

        let Some(mut processor) = self.shutdown().await? else {
            bail!("processing loop ended without returning its state");
        };
        let remaining = self.queue.drain_batch(usize::MAX);
        self.queue.clear();

        let mut surface = self.surface.lock().await;
        processor.process_batch(&remaining, &mut *surface, now_ms());
        self.stats_tx.send_replace(processor.stats().clone());
        let report = processor.into_report(surface.element_positions());
        log_info!(
            "gaze session finished: {} samples, {} new words",
            report.gaze_data.len(),
            report.new_words.len()
        );
        Ok(report)
    }

    /// Cancels both loops and waits for them; queued packets are left for the caller.
    async fn shutdown(&mut self) -> Result<Option<SessionProcessor>> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.synthetic.take() {
            handle
                .await
                .context("synthetic gaze loop task failed to join")?;
        }

        let processor = match self.processing.take() {
            Some(handle) => Some(
                handle
                    .await
                    .context("processing loop task failed to join")?,
            ),
            None => None,
        };

        self.status = TrackingStatus::Idle;
        self.session_id = None;
        Ok(processor)
    }

    fn lock_clock(&self) -> std::sync::MutexGuard<'_, TrackerClock> {
        self.clock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_selector(&self) -> std::sync::MutexGuard<'_, SourceSelector> {
        self.selector.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
    }
}
