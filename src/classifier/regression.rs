use crate::models::{GazeEvent, SentenceRef, TimestampMs};

/// Furthest sentence reached this session, in reading order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegressionState {
    max_sentence_index_seen: Option<usize>,
}

impl RegressionState {
    /// A jump back to an earlier sentence than the furthest reached is a regression.
    /// Staying on the furthest sentence is not.
    pub fn observe(&mut self, sentence: &SentenceRef, now: TimestampMs) -> Option<GazeEvent> {
        match self.max_sentence_index_seen {
            Some(max) if sentence.index < max => Some(GazeEvent::Regression {
                sentence_id: sentence.id.clone(),
                sentence: sentence.text.clone(),
                at: now,
            }),
            _ => {
                self.max_sentence_index_seen = Some(sentence.index);
                None
            }
        }
    }

    pub fn max_sentence_index_seen(&self) -> Option<usize> {
        self.max_sentence_index_seen
    }

    pub fn reset(&mut self) {
        self.max_sentence_index_seen = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentence(index: usize) -> SentenceRef {
        SentenceRef {
            id: format!("sentence-{index}"),
            index,
            text: format!("Sentence number {index}."),
        }
    }

    #[test]
    fn test_regression_fires_per_backward_sample() {
        let mut state = RegressionState::default();
        let visits = [0, 1, 3, 3, 2, 1, 4, 0];
        let fired: Vec<bool> = visits
            .iter()
            .enumerate()
            .map(|(t, i)| state.observe(&sentence(*i), t as i64).is_some())
            .collect();
        assert_eq!(
            fired,
            vec![false, false, false, false, true, true, false, true]
        );
        assert_eq!(state.max_sentence_index_seen(), Some(4));
    }

    #[test]
    fn test_rereading_same_sentence_is_not_regression() {
        let mut state = RegressionState::default();
        for t in 0..5 {
            assert!(state.observe(&sentence(2), t).is_none());
        }
        assert_eq!(state.max_sentence_index_seen(), Some(2));
    }

    #[test]
    fn test_event_carries_sentence() {
        let mut state = RegressionState::default();
        state.observe(&sentence(2), 1000);
        let event = state.observe(&sentence(0), 1200);
        assert_eq!(
            event,
            Some(GazeEvent::Regression {
                sentence_id: "sentence-0".into(),
                sentence: "Sentence number 0.".into(),
                at: 1200,
            })
        );
    }
}
