use crate::models::TimestampMs;

const ENABLE_LOGS: bool = true;

use crate::log_debug;

/// Largest gap allowed between a rebased tracker timestamp and the host clock before
/// the offset is taken again.
pub const MAX_CLOCK_DRIFT_MS: i64 = 1_000;

/// Maps tracker timestamps onto the host clock, so tracker samples, synthetic samples
/// and the session timers all share one timeline.
///
/// The offset is anchored on the first tracker sample and kept while the tracker's
/// own spacing stays within [`MAX_CLOCK_DRIFT_MS`] of the host. Output never goes
/// backwards between anchors.
#[derive(Debug, Clone, Default)]
pub struct TrackerClock {
    offset_ms: Option<i64>,
    last_rebased: Option<TimestampMs>,
}

impl TrackerClock {
    pub fn rebase(&mut self, tracker_ts: TimestampMs, host_now: TimestampMs) -> TimestampMs {
        let rebased = match self.offset_ms {
            Some(offset) if (tracker_ts + offset - host_now).abs() <= MAX_CLOCK_DRIFT_MS => {
                tracker_ts + offset
            }
            previous => {
                if previous.is_some() {
                    log_debug!("tracker clock drifted past {MAX_CLOCK_DRIFT_MS}ms, re-anchoring");
                }
                self.offset_ms = Some(host_now - tracker_ts);
                host_now
            }
        };
        let rebased = self.last_rebased.map_or(rebased, |last| rebased.max(last));
        self.last_rebased = Some(rebased);
        rebased
    }

    /// Forgets the offset; the next tracker sample anchors a new one.
    pub fn reanchor(&mut self) {
        *self = Self::default();
    }

    pub fn offset_ms(&self) -> Option<i64> {
        self.offset_ms
    }
}
