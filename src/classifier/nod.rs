use std::collections::VecDeque;

use crate::models::{GazeEvent, NodOrigin, TimestampMs};

const MAX_VERTICAL_SAMPLES: usize = 10;
/// Samples closer together than this are jitter, not gesture.
const MIN_SAMPLE_GAP_MS: i64 = 100;
/// A longer pause means the previous movement is stale.
const MAX_SAMPLE_GAP_MS: i64 = 2000;
/// Window inspected for the once/twice pattern.
const PATTERN_SAMPLES: usize = 4;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodDetectionState {
    tracked_word_id: Option<String>,
    recent_vertical_samples: VecDeque<f64>,
    last_movement_time: TimestampMs,
    last_backend_nod_count: u32,
}

impl NodDetectionState {
    /// Starts tracking a word. Re-entering the word already tracked keeps its samples.
    pub fn track_word(&mut self, word_id: &str, y: Option<f64>, now: TimestampMs) {
        if self.tracked_word_id.as_deref() == Some(word_id) {
            return;
        }
        self.tracked_word_id = Some(word_id.to_string());
        self.recent_vertical_samples.clear();
        self.recent_vertical_samples.extend(y);
        self.last_movement_time = now;
    }

    /// Compares the hardware's cumulative nod counter with the last one seen.
    /// Returns the event when the counter went up.
    pub fn observe_backend(
        &mut self,
        count: u32,
        word_id: Option<&str>,
        now: TimestampMs,
    ) -> Option<GazeEvent> {
        let previous = self.last_backend_nod_count;
        self.last_backend_nod_count = count;
        // Counter going down means the tracker restarted; adopt it as the new baseline.
        let increment = count.checked_sub(previous).filter(|delta| *delta > 0)?;

        let word_id = word_id.map(str::to_string);
        Some(if increment == 1 {
            GazeEvent::NodOnce {
                word_id,
                origin: NodOrigin::Backend,
                at: now,
            }
        } else {
            GazeEvent::NodTwice {
                word_id,
                origin: NodOrigin::Backend,
                at: now,
            }
        })
    }

    /// Records a vertical sample for the tracked word and checks for a nod.
    pub fn record(&mut self, y: f64, now: TimestampMs, threshold_px: f64) -> Option<GazeEvent> {
        let gap = now - self.last_movement_time;
        if gap < MIN_SAMPLE_GAP_MS {
            return None;
        }
        if gap > MAX_SAMPLE_GAP_MS {
            self.recent_vertical_samples.clear();
        }

        self.recent_vertical_samples.push_back(y);
        while self.recent_vertical_samples.len() > MAX_VERTICAL_SAMPLES {
            self.recent_vertical_samples.pop_front();
        }
        self.last_movement_time = now;

        let pattern = self.classify(threshold_px)?;
        self.recent_vertical_samples.clear();

        let word_id = self.tracked_word_id.clone();
        Some(match pattern {
            NodPattern::Once => GazeEvent::NodOnce {
                word_id,
                origin: NodOrigin::Local,
                at: now,
            },
            NodPattern::Twice => GazeEvent::NodTwice {
                word_id,
                origin: NodOrigin::Local,
                at: now,
            },
        })
    }

    fn classify(&self, threshold_px: f64) -> Option<NodPattern> {
        let len = self.recent_vertical_samples.len();
        if len < PATTERN_SAMPLES {
            return None;
        }

        let window: Vec<f64> = self
            .recent_vertical_samples
            .iter()
            .skip(len - PATTERN_SAMPLES)
            .copied()
            .collect();
        let moves = [window[1] - window[0], window[2] - window[1], window[3] - window[2]];

        let reversal = |a: f64, b: f64| {
            a.abs() >= threshold_px && b.abs() >= threshold_px && a.signum() != b.signum()
        };

        let first = reversal(moves[0], moves[1]);
        let second = reversal(moves[1], moves[2]);
        match (first, second) {
            (true, true) => Some(NodPattern::Twice),
            (true, false) | (false, true) => Some(NodPattern::Once),
            (false, false) => None,
        }
    }

    /// Gaze left all words: forget the word and its samples, keep the backend counter.
    pub fn clear_tracking(&mut self) {
        self.tracked_word_id = None;
        self.recent_vertical_samples.clear();
    }

    /// Drops all gesture state but keeps the hardware counter baseline.
    pub fn clear_detection(&mut self) {
        *self = Self {
            last_backend_nod_count: self.last_backend_nod_count,
            ..Self::default()
        };
    }

    pub fn last_backend_nod_count(&self) -> u32 {
        self.last_backend_nod_count
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodPattern {
    Once,
    Twice,
}
