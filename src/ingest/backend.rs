use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{GazePacket, GazeSample, SampleSource, TimestampMs};

pub const REALTIME_MESSAGE_TYPE: &str = "realtime_data";

/// Screen size used to clamp backend coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn clamp(&self, x: f64, y: f64) -> (f64, f64) {
        (x.clamp(0.0, self.width.max(0.0)), y.clamp(0.0, self.height.max(0.0)))
    }
}

#[derive(Debug, Deserialize)]
struct RealtimeMessage {
    timestamp: String,
    gaze: Option<GazeField>,
    pupil_diameter: Option<f64>,
    blink_detected: Option<bool>,
    behaviors: Option<Behaviors>,
}

#[derive(Debug, Deserialize)]
struct GazeField {
    x: f64,
    y: f64,
    valid: ValidFlag,
}

/// The tracker sends `0|1`; booleans are accepted too.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ValidFlag {
    Bool(bool),
    Number(f64),
}

impl ValidFlag {
    fn is_valid(&self) -> bool {
        match self {
            ValidFlag::Bool(value) => *value,
            ValidFlag::Number(value) => *value != 0.0,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Behaviors {
    nod_count: Option<f64>,
}

/// Parses one backend message.
///
/// `Ok(None)` means the message is not realtime gaze data and should be ignored.
/// `Err` means the message was meant to be gaze data but is malformed; callers log
/// and drop it.
pub fn parse_backend_message(raw: &str, viewport: Viewport) -> Result<Option<GazePacket>> {
    let value: serde_json::Value =
        serde_json::from_str(raw).context("backend message is not valid JSON")?;

    match value.get("type").and_then(|kind| kind.as_str()) {
        Some(REALTIME_MESSAGE_TYPE) => {}
        _ => return Ok(None),
    }

    let message: RealtimeMessage =
        serde_json::from_value(value).context("realtime message has an unexpected shape")?;
    let gaze = message
        .gaze
        .ok_or_else(|| anyhow!("realtime message has no gaze object"))?;
    if !gaze.x.is_finite() || !gaze.y.is_finite() {
        bail!("gaze coordinates are not finite");
    }

    let timestamp = parse_timestamp(&message.timestamp)?;
    let (x, y) = viewport.clamp(gaze.x, gaze.y);

    let mut sample = GazeSample::new(timestamp, gaze.valid.is_valid(), x, y)?;
    sample.pupil_diameter = message
        .pupil_diameter
        .filter(|diameter| diameter.is_finite() && *diameter > 0.0);
    sample.blink_detected = message.blink_detected;

    let backend_nod_count = message
        .behaviors
        .and_then(|behaviors| behaviors.nod_count)
        .filter(|count| count.is_finite() && *count >= 0.0)
        .map(|count| count as u32);

    Ok(Some(GazePacket {
        sample,
        backend_nod_count,
        source: SampleSource::Backend,
    }))
}

/// RFC 3339 timestamps keep their offset; offset-less ISO timestamps are read as UTC.
pub fn parse_timestamp(raw: &str) -> Result<TimestampMs> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc).timestamp_millis());
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .with_context(|| format!("unparsable timestamp {raw:?}"))?;
    Ok(naive.and_utc().timestamp_millis())
}
