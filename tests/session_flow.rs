use chrono::{Duration as ChronoDuration, SecondsFormat, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use eyeread_lib::ingest::SourceMode;
use eyeread_lib::models::{GazeEvent, TrackingStatus};
use eyeread_lib::session::{LayoutSnapshot, ReaderSurface, SessionController, SharedSurface};
use eyeread_lib::settings::{GazeSettings, SettingsStore};

const LAYOUT: &str = r#"{
    "viewport": {"width": 1280, "height": 720},
    "sentences": [
        {"id": "sentence-0", "index": 0, "text": "Practice your pronunciation daily.",
         "rect": {"x": 100, "y": 100, "width": 600, "height": 40}},
        {"id": "sentence-1", "index": 1, "text": "Reading aloud helps.",
         "rect": {"x": 100, "y": 400, "width": 600, "height": 40}}
    ],
    "words": [
        {"id": "word-2", "text": "pronunciation", "sentenceId": "sentence-0",
         "rect": {"x": 250, "y": 105, "width": 150, "height": 30}}
    ]
}"#;

fn layout() -> Arc<Mutex<LayoutSnapshot>> {
    Arc::new(Mutex::new(serde_json::from_str(LAYOUT).unwrap()))
}

fn controller(layout: &Arc<Mutex<LayoutSnapshot>>, settings: GazeSettings) -> SessionController {
    let surface: SharedSurface = layout.clone();
    let settings = Arc::new(SettingsStore::in_memory(settings).unwrap());
    SessionController::new(settings, surface).with_seed(11)
}

fn message(offset_ms: i64, x: f64, y: f64) -> String {
    tracker_message(offset_ms, x, y, 1)
}

fn tracker_message(offset_ms: i64, x: f64, y: f64, valid: u8) -> String {
    let timestamp = (Utc::now() + ChronoDuration::milliseconds(offset_ms))
        .to_rfc3339_opts(SecondsFormat::Millis, true);
    format!(
        r#"{{"type":"realtime_data","timestamp":"{timestamp}","gaze":{{"x":{x},"y":{y},"valid":{valid}}}}}"#
    )
}

#[tokio::test]
async fn test_dwell_produces_fixation_and_report() {
    let layout = layout();
    let mut controller = controller(&layout, GazeSettings::default());
    let mut events = controller.subscribe();
    let stats_rx = controller.watch_stats();

    let session_id = controller.start().await.unwrap();
    assert_eq!(controller.session_id(), Some(session_id.as_str()));
    assert_eq!(controller.status(), TrackingStatus::Active);

    for i in 0..10 {
        let raw = message(i * 100, 300.0, 120.0);
        assert!(controller.ingest_backend_message(&raw).await);
    }

    let fixation = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match events.recv().await {
                Ok(GazeEvent::Fixation { word, .. }) => break word,
                Ok(_) => continue,
                Err(err) => panic!("event channel closed: {err}"),
            }
        }
    })
    .await
    .expect("no fixation event");
    assert_eq!(fixation, "pronunciation");
    assert!(layout.lock().await.popup_visible());
    assert!(stats_rx.borrow().gaze_event_count >= 1);

    let report = controller.finish().await.unwrap();
    assert_eq!(controller.status(), TrackingStatus::Idle);
    assert_eq!(report.new_words, vec!["pronunciation".to_string()]);
    assert_eq!(report.gaze_data.len(), 10);
    assert_eq!(report.session_stats.gaze_event_count, 10);
    assert!(report.positions.contains_key("word-popup"));
    assert_eq!(controller.stats().gaze_event_count, 10);
}

#[tokio::test]
async fn test_lifecycle_guards() {
    let layout = layout();
    let mut controller = controller(&layout, GazeSettings::default());

    assert!(!controller.ingest_backend_message(&message(0, 1.0, 1.0)).await);
    assert!(controller.finish().await.is_err());

    controller.start().await.unwrap();
    assert!(controller.start().await.is_err());

    assert!(!controller.ingest_backend_message("{broken").await);
    assert!(!controller.ingest_backend_message(r#"{"type":"status"}"#).await);

    controller.stop().await.unwrap();
    assert_eq!(controller.status(), TrackingStatus::Idle);
    assert_eq!(controller.session_id(), None);
    assert_eq!(controller.queued(), 0);

    // A stopped controller can run a new session.
    controller.start().await.unwrap();
    controller.stop().await.unwrap();
}

#[tokio::test]
async fn test_falls_back_to_synthetic_gaze_without_tracker() {
    let layout = layout();
    let mut controller = controller(&layout, GazeSettings::default());
    controller.start().await.unwrap();

    assert!(matches!(
        controller.source_mode(),
        SourceMode::PreferringReal { .. }
    ));
    tokio::time::sleep(Duration::from_millis(2_600)).await;

    assert!(matches!(controller.source_mode(), SourceMode::Simulating { .. }));
    let report = controller.finish().await.unwrap();
    assert!(!report.gaze_data.is_empty());
    let bounds = layout.lock().await.visible_sentence_bounds().unwrap();
    for sample in &report.gaze_data {
        assert!(bounds.contains(sample.position().unwrap()));
    }
}

#[tokio::test]
async fn test_simulation_can_be_disabled() {
    let layout = layout();
    let settings = GazeSettings {
        simulation_enabled: false,
        ..GazeSettings::default()
    };
    let mut controller = controller(&layout, settings);
    controller.start().await.unwrap();

    tokio::time::sleep(Duration::from_millis(2_400)).await;

    let report = controller.finish().await.unwrap();
    assert!(report.gaze_data.is_empty());
    assert_eq!(report.session_stats.gaze_event_count, 0);
}

#[tokio::test]
async fn test_tracker_clock_behind_host_resumes_after_simulation() {
    let layout = layout();
    let mut controller = controller(&layout, GazeSettings::default());
    controller.start().await.unwrap();

    tokio::time::sleep(Duration::from_millis(2_500)).await;
    assert!(matches!(controller.source_mode(), SourceMode::Simulating { .. }));

    // Tracker clock runs a minute behind the host.
    for i in 0..20 {
        let raw = message(-60_000 + i * 20, 300.0, 120.0);
        assert!(controller.ingest_backend_message(&raw).await, "sample {i} refused");
    }
    assert!(matches!(
        controller.source_mode(),
        SourceMode::PreferringReal { .. }
    ));

    let report = controller.finish().await.unwrap();
    assert!(report.gaze_data.len() >= 20);
    assert!(report
        .gaze_data
        .windows(2)
        .all(|pair| pair[0].timestamp <= pair[1].timestamp));
}

#[tokio::test]
async fn test_tracker_clock_ahead_of_host_does_not_fake_distraction() {
    let layout = layout();
    let mut controller = controller(&layout, GazeSettings::default());
    controller.start().await.unwrap();

    // Tracker clock runs a minute ahead of the host.
    for i in 0..3 {
        let raw = message(60_000 + i * 50, 150.0, 120.0);
        assert!(controller.ingest_backend_message(&raw).await);
    }
    let blink = tracker_message(60_200, 0.0, 0.0, 0);
    assert!(controller.ingest_backend_message(&blink).await);

    let report = controller.finish().await.unwrap();
    assert_eq!(report.gaze_data.len(), 4);
    let surface = layout.lock().await;
    assert!(!surface
        .applied_events()
        .iter()
        .any(|event| matches!(event, GazeEvent::Distraction { .. })));
}
