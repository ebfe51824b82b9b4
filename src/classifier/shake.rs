use std::collections::VecDeque;

use crate::models::{GazeEvent, TimestampMs};

const SHAKE_WINDOW_MS: i64 = 400;
const MAX_X_SAMPLES: usize = 3;

/// Horizontal oscillation detector used to dismiss the word popup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShakeDetectionState {
    recent_x_samples: VecDeque<f64>,
    last_sample_time: Option<TimestampMs>,
}

impl ShakeDetectionState {
    pub fn observe(&mut self, x: f64, now: TimestampMs, threshold_px: f64) -> Option<GazeEvent> {
        if let Some(last) = self.last_sample_time {
            if now - last > SHAKE_WINDOW_MS {
                self.recent_x_samples.clear();
            }
        }
        self.last_sample_time = Some(now);

        self.recent_x_samples.push_back(x);
        while self.recent_x_samples.len() > MAX_X_SAMPLES {
            self.recent_x_samples.pop_front();
        }
        if self.recent_x_samples.len() < MAX_X_SAMPLES {
            return None;
        }

        let first = self.recent_x_samples[1] - self.recent_x_samples[0];
        let second = self.recent_x_samples[2] - self.recent_x_samples[1];
        let shaking = first.abs() > threshold_px
            && second.abs() > threshold_px
            && first.signum() != second.signum();
        if !shaking {
            return None;
        }

        self.recent_x_samples.clear();
        Some(GazeEvent::Shake { at: now })
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
