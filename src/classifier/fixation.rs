use crate::models::{GazeEvent, TimestampMs};

/// Dwell tracking for the word currently under the gaze.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FixationState {
    active_word_id: Option<String>,
    fixation_start: TimestampMs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixationStep {
    /// A different word took over; dwell restarts at this sample.
    Started,
    Dwelling { elapsed_ms: i64 },
}

impl FixationState {
    pub fn observe(&mut self, word_id: &str, now: TimestampMs) -> FixationStep {
        if self.active_word_id.as_deref() == Some(word_id) {
            FixationStep::Dwelling {
                elapsed_ms: now - self.fixation_start,
            }
        } else {
            self.active_word_id = Some(word_id.to_string());
            self.fixation_start = now;
            FixationStep::Started
        }
    }

    /// Emits once the dwell passes the threshold, then forgets the word so the
    /// same dwell cannot fire twice.
    pub fn fire_if_elapsed(
        &mut self,
        word_id: &str,
        word: &str,
        elapsed_ms: i64,
        threshold_ms: i64,
        now: TimestampMs,
    ) -> Option<GazeEvent> {
        if elapsed_ms <= threshold_ms {
            return None;
        }
        self.reset();
        Some(GazeEvent::Fixation {
            word_id: word_id.to_string(),
            word: word.to_string(),
            at: now,
        })
    }

    pub fn active_word_id(&self) -> Option<&str> {
        self.active_word_id.as_deref()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
