use serde::Serialize;

use crate::models::TimestampMs;

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// How long a fresh session waits for tracker data before simulating.
pub const INITIAL_REAL_WINDOW_MS: i64 = 2_000;
/// How long real data may go silent before falling back.
pub const REAL_DATA_TIMEOUT_MS: i64 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum SourceMode {
    /// Waiting for or receiving tracker data; synthetic samples are discarded.
    #[serde(rename_all = "camelCase")]
    PreferringReal { last_real_at: TimestampMs },
    /// Tracker silent; synthetic samples feed the pipeline.
    #[serde(rename_all = "camelCase")]
    Simulating { since: TimestampMs },
}

/// Hysteresis switch between tracker data and synthetic fallback.
#[derive(Debug, Clone)]
pub struct SourceSelector {
    mode: SourceMode,
    real_seen: bool,
    failover_warned: bool,
}

impl SourceSelector {
    pub fn new(session_start: TimestampMs) -> Self {
        Self {
            mode: SourceMode::PreferringReal {
                last_real_at: session_start,
            },
            real_seen: false,
            failover_warned: false,
        }
    }

    pub fn mode(&self) -> SourceMode {
        self.mode
    }

    /// A tracker sample arrived. Always accepted; switches back to real data.
    pub fn observe_real(&mut self, now: TimestampMs) {
        if let SourceMode::Simulating { .. } = self.mode {
            log_info!("tracker data resumed, leaving simulation");
        }
        self.real_seen = true;
        self.mode = SourceMode::PreferringReal { last_real_at: now };
    }

    /// Advances the switch on the clock alone.
    pub fn tick(&mut self, now: TimestampMs) -> SourceMode {
        if let SourceMode::PreferringReal { last_real_at } = self.mode {
            let window = if self.real_seen {
                REAL_DATA_TIMEOUT_MS
            } else {
                INITIAL_REAL_WINDOW_MS
            };
            if now - last_real_at > window {
                if self.real_seen && !self.failover_warned {
                    log_warn!(
                        "no tracker data for {}ms, falling back to simulated gaze",
                        now - last_real_at
                    );
                    self.failover_warned = true;
                }
                self.mode = SourceMode::Simulating { since: now };
            }
        }
        self.mode
    }

    /// Whether a synthetic sample produced at `now` may enter the queue.
    pub fn admit_synthetic(&mut self, now: TimestampMs) -> bool {
        matches!(self.tick(now), SourceMode::Simulating { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulates_after_initial_window_without_real_data() {
        let mut selector = SourceSelector::new(0);
        assert!(!selector.admit_synthetic(1_000));
        assert!(!selector.admit_synthetic(2_000));
        assert!(selector.admit_synthetic(2_001));
        assert_eq!(selector.mode(), SourceMode::Simulating { since: 2_001 });
    }

    #[test]
    fn test_real_data_preempts_simulation() {
        let mut selector = SourceSelector::new(0);
        assert!(selector.admit_synthetic(3_000));
        selector.observe_real(3_100);
        assert!(!selector.admit_synthetic(3_150));
        assert_eq!(
            selector.mode(),
            SourceMode::PreferringReal { last_real_at: 3_100 }
        );
    }

    #[test]
    fn test_five_second_failover_once_real_seen() {
        let mut selector = SourceSelector::new(0);
        selector.observe_real(100);
        // The 2s start-up window no longer applies.
        assert!(!selector.admit_synthetic(4_000));
        assert!(!selector.admit_synthetic(5_100));
        assert!(selector.admit_synthetic(5_101));
        assert!(selector.failover_warned);
    }

    #[test]
    fn test_warning_is_one_time_per_session() {
        let mut selector = SourceSelector::new(0);
        selector.observe_real(0);
        selector.tick(6_000);
        assert!(selector.failover_warned);
        selector.observe_real(6_100);
        selector.tick(12_000);
        assert!(selector.failover_warned);
        assert!(matches!(selector.mode(), SourceMode::Simulating { .. }));
    }

    #[test]
    fn test_staying_in_simulation_keeps_since() {
        let mut selector = SourceSelector::new(0);
        selector.tick(2_500);
        selector.tick(9_000);
        assert_eq!(selector.mode(), SourceMode::Simulating { since: 2_500 });
    }
}
