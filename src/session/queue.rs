use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, PoisonError},
};

use crate::models::{GazePacket, TimestampMs};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

/// Queue length that triggers a trim.
pub const QUEUE_CAP: usize = 1_000;
/// Length kept after a trim; the oldest packets go.
pub const QUEUE_TRIM_TO: usize = 500;

#[derive(Debug, Default)]
struct QueueInner {
    packets: VecDeque<GazePacket>,
    last_enqueued: Option<TimestampMs>,
}

impl QueueInner {
    fn trim(&mut self) -> usize {
        let len = self.packets.len();
        if len <= QUEUE_CAP {
            return 0;
        }
        let dropped = len - QUEUE_TRIM_TO;
        self.packets.drain(..dropped);
        log_warn!("gaze queue overloaded ({len} packets), dropped {dropped} oldest");
        dropped
    }
}

/// FIFO between producers (tracker messages, synthetic timer) and the processing loop.
/// Cloning shares the same queue.
#[derive(Debug, Clone, Default)]
pub struct SampleQueue {
    inner: Arc<Mutex<QueueInner>>,
}

impl SampleQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, QueueInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a packet. Packets older than the last one enqueued are refused so
    /// timestamps never go backwards within a session.
    pub fn push(&self, packet: GazePacket) -> bool {
        let mut inner = self.lock();
        let timestamp = packet.sample.timestamp;
        if let Some(last) = inner.last_enqueued {
            if timestamp < last {
                log_debug!(
                    "dropping out-of-order {} sample ({timestamp} < {last})",
                    packet.source.as_str()
                );
                return false;
            }
        }
        inner.last_enqueued = Some(timestamp);
        inner.packets.push_back(packet);
        // Bounded even when the consumer stalls.
        inner.trim();
        true
    }

    /// Drops the oldest packets down to [`QUEUE_TRIM_TO`] once the queue has grown past
    /// [`QUEUE_CAP`]. Returns how many were dropped.
    pub fn trim_overflow(&self) -> usize {
        self.lock().trim()
    }

    /// Takes up to `max` packets in arrival order, trimming an overloaded queue first.
    pub fn drain_batch(&self, max: usize) -> Vec<GazePacket> {
        let mut inner = self.lock();
        inner.trim();
        let take = max.min(inner.packets.len());
        inner.packets.drain(..take).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().packets.is_empty()
    }

    /// Empties the queue and forgets the ordering baseline, ready for a new session.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.packets.clear();
        inner.last_enqueued = None;
    }
}
