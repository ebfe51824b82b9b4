use std::collections::{BTreeMap, HashSet};

use crate::classifier::{ClassifierInput, ClassifierThresholds, GazeEventEngine};
use crate::models::{GazeEvent, GazePacket, GazeSample, HoverTarget, Rect, SessionStats, TimestampMs};

use super::report::SessionReport;
use super::surface::ReaderSurface;

/// Packets drained per tick.
pub const BATCH_SIZE: usize = 5;
/// History length that triggers a trim.
pub const HISTORY_CAP: usize = 10_000;
/// History length kept after a trim.
pub const HISTORY_TRIM_TO: usize = 5_000;

/// Everything one reading session owns: the classifier, the running stats, the raw
/// sample history and the words the reader looked up.
///
/// Drives the pipeline synchronously; the async loop and offline replay both sit on top.
#[derive(Debug, Clone)]
pub struct SessionProcessor {
    engine: GazeEventEngine,
    stats: SessionStats,
    history: Vec<GazeSample>,
    new_words: Vec<String>,
    seen_words: HashSet<String>,
    local_nods: u32,
}

impl SessionProcessor {
    pub fn new(thresholds: ClassifierThresholds, start: TimestampMs) -> Self {
        let mut engine = GazeEventEngine::new(thresholds, start);
        engine.reset_session(start);
        Self {
            engine,
            stats: SessionStats::new(start),
            history: Vec::new(),
            new_words: Vec::new(),
            seen_words: HashSet::new(),
            local_nods: 0,
        }
    }

    pub fn set_thresholds(&mut self, thresholds: ClassifierThresholds) {
        if self.engine.thresholds() != thresholds {
            self.engine.set_thresholds(thresholds);
        }
    }

    /// Resolves the hover target, classifies the packet, and hands the resulting
    /// events to the surface.
    pub fn process_packet(
        &mut self,
        packet: &GazePacket,
        surface: &mut dyn ReaderSurface,
    ) -> Vec<GazeEvent> {
        let sample = &packet.sample;
        let target = sample
            .position()
            .map(|point| surface.hit_test(point))
            .unwrap_or(HoverTarget::None);

        let events = self.engine.process(ClassifierInput {
            sample,
            target: &target,
            backend_nod_count: packet.backend_nod_count,
            popup_visible: surface.popup_visible(),
        });

        for event in &events {
            surface.apply(event);
            self.local_nods += event.local_nods();
            if let GazeEvent::Fixation { word, .. } = event {
                self.record_word(word);
            }
        }

        self.push_history(sample.clone());
        self.stats.gaze_event_count += 1;
        self.stats
            .update_nods(self.local_nods, self.engine.last_backend_nod_count());
        events
    }

    /// Processes a drained batch in order, then refreshes the reading time once.
    pub fn process_batch(
        &mut self,
        packets: &[GazePacket],
        surface: &mut dyn ReaderSurface,
        now: TimestampMs,
    ) -> Vec<GazeEvent> {
        let mut events = Vec::new();
        for packet in packets {
            events.extend(self.process_packet(packet, surface));
        }
        self.stats.update_reading_time(now);
        events
    }

    fn record_word(&mut self, word: &str) {
        if self.seen_words.insert(word.to_string()) {
            self.new_words.push(word.to_string());
        }
    }

    fn push_history(&mut self, sample: GazeSample) {
        self.history.push(sample);
        if self.history.len() > HISTORY_CAP {
            let excess = self.history.len() - HISTORY_TRIM_TO;
            self.history.drain(..excess);
        }
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn history(&self) -> &[GazeSample] {
        &self.history
    }

    pub fn new_words(&self) -> &[String] {
        &self.new_words
    }

    pub fn engine(&self) -> &GazeEventEngine {
        &self.engine
    }

    pub fn into_report(self, positions: BTreeMap<String, Rect>) -> SessionReport {
        SessionReport {
            gaze_data: self.history,
            session_stats: self.stats,
            positions,
            new_words: self.new_words,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SampleSource;
    use crate::session::surface::fixtures::two_sentence_layout;
    use crate::settings::GazeSettings;

    fn backend(t: TimestampMs, valid: bool, x: f64, y: f64, nods: Option<u32>) -> GazePacket {
        GazePacket {
            sample: GazeSample::new(t, valid, x, y).unwrap(),
            backend_nod_count: nods,
            source: SampleSource::Backend,
        }
    }

    fn processor() -> SessionProcessor {
        SessionProcessor::new(GazeSettings::default().thresholds(), 0)
    }

    #[test]
    fn test_fixation_opens_popup_and_records_new_word() {
        let mut layout = two_sentence_layout();
        let mut processor = processor();
        let packets: Vec<_> = (0..=9)
            .map(|i| backend(i * 100, true, 300.0, 120.0, None))
            .collect();
        let events = processor.process_batch(&packets, &mut layout, 900);

        assert!(events
            .iter()
            .any(|e| matches!(e, GazeEvent::Fixation { word, at: 900, .. } if word == "pronunciation")));
        assert!(layout.popup_visible());
        assert_eq!(processor.new_words(), ["pronunciation"]);
        assert_eq!(processor.stats().gaze_event_count, 10);
        assert_eq!(processor.stats().reading_time_ms, 900);
        assert_eq!(processor.history().len(), 10);
    }

    #[test]
    fn test_repeat_fixation_keeps_single_new_word() {
        let mut layout = two_sentence_layout();
        let mut processor = processor();
        for dwell in 0..2 {
            let base = dwell * 5_000;
            for i in 0..=9 {
                processor.process_packet(&backend(base + i * 100, true, 300.0, 120.0, None), &mut layout);
            }
            // Look away so the next dwell starts fresh.
            processor.process_packet(&backend(base + 1_000, true, 150.0, 420.0, None), &mut layout);
        }
        assert_eq!(processor.new_words(), ["pronunciation"]);
    }

    #[test]
    fn test_nod_count_is_max_of_local_and_backend() {
        let mut layout = two_sentence_layout();
        let mut processor = processor();
        processor.process_packet(&backend(0, true, 300.0, 120.0, Some(3)), &mut layout);
        assert_eq!(processor.stats().nod_event_count, 3);
        processor.process_packet(&backend(100, true, 300.0, 120.0, Some(1)), &mut layout);
        assert_eq!(processor.stats().nod_event_count, 3);
    }

    #[test]
    fn test_shake_closes_popup_opened_by_fixation() {
        let mut layout = two_sentence_layout();
        let mut processor = processor();
        for i in 0..=9 {
            processor.process_packet(&backend(i * 100, true, 300.0, 120.0, None), &mut layout);
        }
        assert!(layout.popup_visible());

        // Horizontal sweep across sentence-1, well clear of the popup.
        let sweep = [(1_000, 150.0), (1_100, 260.0), (1_200, 140.0)];
        let events: Vec<_> = sweep
            .iter()
            .flat_map(|(t, x)| processor.process_packet(&backend(*t, true, *x, 420.0, None), &mut layout))
            .collect();
        assert!(events.iter().any(|e| matches!(e, GazeEvent::Shake { .. })));
        assert!(!layout.popup_visible());
    }

    #[test]
    fn test_history_trims_to_most_recent() {
        let mut layout = two_sentence_layout();
        let mut processor = processor();
        for t in 0..=(HISTORY_CAP as i64) {
            processor.process_packet(&backend(t, false, 0.0, 0.0, None), &mut layout);
        }
        assert_eq!(processor.history().len(), HISTORY_TRIM_TO);
        assert_eq!(processor.history()[0].timestamp, (HISTORY_CAP + 1 - HISTORY_TRIM_TO) as i64);
        assert_eq!(processor.stats().gaze_event_count, HISTORY_CAP as u64 + 1);
    }

    #[test]
    fn test_report_carries_positions_and_words() {
        let mut layout = two_sentence_layout();
        let mut processor = processor();
        for i in 0..=9 {
            processor.process_packet(&backend(i * 100, true, 300.0, 120.0, None), &mut layout);
        }
        let report = processor.into_report(layout.element_positions());
        assert_eq!(report.new_words, vec!["pronunciation".to_string()]);
        assert!(report.positions.contains_key("sentence-1"));
        assert!(report.positions.contains_key("word-popup"));
        assert_eq!(report.gaze_data.len(), 10);
    }
}
