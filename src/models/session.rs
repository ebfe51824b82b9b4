use serde::{Deserialize, Serialize};

use super::sample::TimestampMs;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum TrackingStatus {
    #[default]
    Idle,
    Active,
}

/// Aggregates for one reading session. Counts only grow until the next reset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub start_time: TimestampMs,
    pub reading_time_ms: u64,
    pub gaze_event_count: u64,
    pub nod_event_count: u32,
}

impl SessionStats {
    pub fn new(start_time: TimestampMs) -> Self {
        Self {
            start_time,
            ..Self::default()
        }
    }

    pub fn update_reading_time(&mut self, now: TimestampMs) {
        self.reading_time_ms = now.saturating_sub(self.start_time).max(0) as u64;
    }

    /// Keeps the larger of the local and hardware nod tallies.
    pub fn update_nods(&mut self, local_nods: u32, backend_nods: u32) {
        self.nod_event_count = self.nod_event_count.max(local_nods.max(backend_nods));
    }
}
