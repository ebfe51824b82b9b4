use crate::models::{GazeEvent, HoverTarget, TimestampMs};

/// Tracks the last moment the reader was looking at the text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DistractionState {
    last_valid_gaze_time: TimestampMs,
    last_known_sentence_id: Option<String>,
}

impl DistractionState {
    pub fn new(now: TimestampMs) -> Self {
        Self {
            last_valid_gaze_time: now,
            last_known_sentence_id: None,
        }
    }

    /// `on_text` is a valid sample that resolved to some target. Off-text samples past
    /// the timeout emit on every call; debouncing belongs to the caller.
    pub fn observe(
        &mut self,
        on_text: bool,
        target: &HoverTarget,
        now: TimestampMs,
        timeout_ms: i64,
    ) -> Option<GazeEvent> {
        if on_text {
            self.last_valid_gaze_time = now;
            if let Some(sentence) = target.sentence() {
                self.last_known_sentence_id = Some(sentence.id.clone());
            }
            return None;
        }

        if now - self.last_valid_gaze_time > timeout_ms {
            Some(GazeEvent::Distraction {
                last_known_sentence_id: self.last_known_sentence_id.clone(),
                at: now,
            })
        } else {
            None
        }
    }

    pub fn last_valid_gaze_time(&self) -> TimestampMs {
        self.last_valid_gaze_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SentenceRef;

    fn on_sentence() -> HoverTarget {
        HoverTarget::Sentence(SentenceRef {
            id: "sentence-4".into(),
            index: 4,
            text: "Look here.".into(),
        })
    }

    #[test]
    fn test_fires_every_sample_after_timeout() {
        let mut state = DistractionState::new(0);
        state.observe(true, &on_sentence(), 100, 3000);
        let fired: Vec<bool> = (1..=6)
            .map(|i| {
                state
                    .observe(false, &HoverTarget::None, 3000 + i * 100, 3000)
                    .is_some()
            })
            .collect();
        assert_eq!(fired, vec![false, true, true, true, true, true]);
    }

    #[test]
    fn test_reports_last_known_sentence() {
        let mut state = DistractionState::new(0);
        state.observe(true, &on_sentence(), 0, 1000);
        let event = state.observe(false, &HoverTarget::None, 1500, 1000);
        assert_eq!(
            event,
            Some(GazeEvent::Distraction {
                last_known_sentence_id: Some("sentence-4".into()),
                at: 1500,
            })
        );
    }

    #[test]
    fn test_valid_gaze_rearms_timer() {
        let mut state = DistractionState::new(0);
        assert!(state.observe(false, &HoverTarget::None, 3500, 3000).is_some());
        state.observe(true, &HoverTarget::Popup, 3600, 3000);
        assert!(state.observe(false, &HoverTarget::None, 3700, 3000).is_none());
        assert_eq!(state.last_valid_gaze_time(), 3600);
    }
}
