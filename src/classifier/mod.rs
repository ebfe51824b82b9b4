//! Per-session gaze event engine.
//!
//! [`GazeEventEngine::process`] is the transition function: one packet plus the hover
//! target resolved by the caller go in, zero or more [`GazeEvent`]s come out. Rules run
//! in a fixed order on every packet:
//!
//! 1. backend nod counter (authoritative; suppresses local nod inference for the packet)
//! 2. word fixation and local nod inference
//! 3. sentence regression
//! 4. distraction
//! 5. popup-dismissal shake
//!
//! The engine never hit-tests and never blocks.

pub mod config;
pub mod distraction;
pub mod fixation;
pub mod nod;
pub mod regression;
pub mod shake;

pub use config::ClassifierThresholds;

use anyhow::{bail, Result};
use std::panic::{self, AssertUnwindSafe};

use crate::models::{GazeEvent, GazeSample, HoverTarget, TimestampMs};

use distraction::DistractionState;
use fixation::{FixationState, FixationStep};
use nod::NodDetectionState;
use regression::RegressionState;
use shake::ShakeDetectionState;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error};

/// Everything the engine needs for one packet.
#[derive(Debug, Clone, Copy)]
pub struct ClassifierInput<'a> {
    pub sample: &'a GazeSample,
    pub target: &'a HoverTarget,
    /// Cumulative nod counter from the tracker hardware, when the packet carried one.
    pub backend_nod_count: Option<u32>,
    /// Whether the word popup is currently shown.
    pub popup_visible: bool,
}

#[derive(Debug, Clone)]
pub struct GazeEventEngine {
    thresholds: ClassifierThresholds,
    fixation: FixationState,
    nod: NodDetectionState,
    regression: RegressionState,
    shake: ShakeDetectionState,
    distraction: DistractionState,
    last_timestamp: Option<TimestampMs>,
    fault_count: u64,
}

impl GazeEventEngine {
    pub fn new(thresholds: ClassifierThresholds, now: TimestampMs) -> Self {
        Self {
            thresholds,
            fixation: FixationState::default(),
            nod: NodDetectionState::default(),
            regression: RegressionState::default(),
            shake: ShakeDetectionState::default(),
            distraction: DistractionState::new(now),
            last_timestamp: None,
            fault_count: 0,
        }
    }

    pub fn thresholds(&self) -> ClassifierThresholds {
        self.thresholds
    }

    pub fn set_thresholds(&mut self, thresholds: ClassifierThresholds) {
        self.thresholds = thresholds;
    }

    /// Reinitializes all detection state and arms the distraction timer at `now`.
    pub fn reset_session(&mut self, now: TimestampMs) {
        self.fixation.reset();
        self.nod.reset();
        self.regression.reset();
        self.shake.reset();
        self.distraction = DistractionState::new(now);
        self.last_timestamp = None;
    }

    /// Runs one packet through the rules. A fault inside the transition (an error or
    /// a panic) discards the packet and returns every detector to neutral.
    pub fn process(&mut self, input: ClassifierInput<'_>) -> Vec<GazeEvent> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.transition(input)));
        let fault = match outcome {
            Ok(Ok(events)) => {
                for event in &events {
                    log_debug!("gaze event {} at {}", event.as_str(), event.at());
                }
                return events;
            }
            Ok(Err(err)) => err.to_string(),
            Err(_) => "panic during classification".to_string(),
        };

        self.fault_count += 1;
        log_error!(
            "classifier fault on sample at {}: {fault}; resetting detectors",
            input.sample.timestamp
        );
        self.reset_detectors();
        Vec::new()
    }

    fn transition(&mut self, input: ClassifierInput<'_>) -> Result<Vec<GazeEvent>> {
        let sample = input.sample;
        let now = sample.timestamp;
        if let Some(last) = self.last_timestamp {
            if now < last {
                bail!("sample time went backwards ({now} < {last})");
            }
        }
        self.last_timestamp = Some(now);

        let position = sample.position();
        let target = input.target;
        let mut events = Vec::new();

        // 1. Backend nod precedence.
        let backend_nodded = match input.backend_nod_count {
            Some(count) => {
                let word_id = target.word().map(|(id, _)| id);
                match self.nod.observe_backend(count, word_id, now) {
                    Some(event) => {
                        events.push(event);
                        true
                    }
                    None => false,
                }
            }
            None => false,
        };

        // 2. Word fixation and local nods.
        match target.word() {
            Some((word_id, word)) => match self.fixation.observe(word_id, now) {
                FixationStep::Started => {
                    self.nod.track_word(word_id, position.map(|p| p.y), now);
                }
                FixationStep::Dwelling { elapsed_ms } => {
                    if !backend_nodded {
                        if let Some(point) = position {
                            events.extend(self.nod.record(
                                point.y,
                                now,
                                self.thresholds.movement_threshold_px,
                            ));
                        }
                    }
                    events.extend(self.fixation.fire_if_elapsed(
                        word_id,
                        word,
                        elapsed_ms,
                        self.thresholds.fixation_threshold_ms,
                        now,
                    ));
                }
            },
            None => {
                self.fixation.reset();
                self.nod.clear_tracking();
            }
        }

        // 3. Sentence regression.
        if let Some(sentence) = target.sentence() {
            events.extend(self.regression.observe(sentence, now));
        }

        // 4. Distraction.
        let on_text = sample.valid && position.is_some() && target.is_some();
        events.extend(self.distraction.observe(
            on_text,
            target,
            now,
            self.thresholds.distraction_timeout_ms,
        ));

        // 5. Popup-dismissal shake.
        if input.popup_visible && !target.is_popup() {
            if let Some(point) = position {
                events.extend(self.shake.observe(
                    point.x,
                    now,
                    self.thresholds.movement_threshold_px,
                ));
            }
        } else {
            self.shake.reset();
        }

        Ok(events)
    }

    /// Neutral state after a fault. Keeps the backend nod counter and the distraction timer.
    fn reset_detectors(&mut self) {
        self.fixation.reset();
        self.nod.clear_detection();
        self.regression.reset();
        self.shake.reset();
    }

    pub fn last_backend_nod_count(&self) -> u32 {
        self.nod.last_backend_nod_count()
    }

    pub fn max_sentence_index_seen(&self) -> Option<usize> {
        self.regression.max_sentence_index_seen()
    }

    pub fn active_word_id(&self) -> Option<&str> {
        self.fixation.active_word_id()
    }

    pub fn fault_count(&self) -> u64 {
        self.fault_count
    }
}
