use serde::{Deserialize, Serialize};

use super::sample::TimestampMs;

/// Where a nod gesture was recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodOrigin {
    /// Counted by the tracker hardware.
    Backend,
    /// Inferred from vertical gaze movement on a word.
    Local,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum GazeEvent {
    #[serde(rename_all = "camelCase")]
    Fixation {
        word_id: String,
        word: String,
        at: TimestampMs,
    },
    #[serde(rename_all = "camelCase")]
    Regression {
        sentence_id: String,
        sentence: String,
        at: TimestampMs,
    },
    #[serde(rename_all = "camelCase")]
    Distraction {
        last_known_sentence_id: Option<String>,
        at: TimestampMs,
    },
    #[serde(rename_all = "camelCase")]
    NodOnce {
        word_id: Option<String>,
        origin: NodOrigin,
        at: TimestampMs,
    },
    #[serde(rename_all = "camelCase")]
    NodTwice {
        word_id: Option<String>,
        origin: NodOrigin,
        at: TimestampMs,
    },
    Shake {
        at: TimestampMs,
    },
}

impl GazeEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            GazeEvent::Fixation { .. } => "fixation",
            GazeEvent::Regression { .. } => "regression",
            GazeEvent::Distraction { .. } => "distraction",
            GazeEvent::NodOnce { .. } => "nod_once",
            GazeEvent::NodTwice { .. } => "nod_twice",
            GazeEvent::Shake { .. } => "shake",
        }
    }

    pub fn at(&self) -> TimestampMs {
        match self {
            GazeEvent::Fixation { at, .. }
            | GazeEvent::Regression { at, .. }
            | GazeEvent::Distraction { at, .. }
            | GazeEvent::NodOnce { at, .. }
            | GazeEvent::NodTwice { at, .. }
            | GazeEvent::Shake { at } => *at,
        }
    }

    /// Number of nods this event stands for when it was inferred locally.
    pub fn local_nods(&self) -> u32 {
        match self {
            GazeEvent::NodOnce {
                origin: NodOrigin::Local,
                ..
            } => 1,
            GazeEvent::NodTwice {
                origin: NodOrigin::Local,
                ..
            } => 2,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_is_tagged() {
        let event = GazeEvent::Fixation {
            word_id: "w-3".into(),
            word: "pronunciation".into(),
            at: 900,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "fixation");
        assert_eq!(json["wordId"], "w-3");
    }

    #[test]
    fn test_local_nods_ignores_backend() {
        let backend = GazeEvent::NodTwice {
            word_id: None,
            origin: NodOrigin::Backend,
            at: 0,
        };
        let local = GazeEvent::NodTwice {
            word_id: None,
            origin: NodOrigin::Local,
            at: 0,
        };
        assert_eq!(backend.local_nods(), 0);
        assert_eq!(local.local_nods(), 2);
    }
}
