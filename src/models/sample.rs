use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Milliseconds since the Unix epoch.
pub type TimestampMs = i64;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Axis-aligned element geometry in screen space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }
}

/// One gaze reading as it enters the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GazeSample {
    pub timestamp: TimestampMs,
    pub valid: bool,
    pub x: f64,
    pub y: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pupil_diameter: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blink_detected: Option<bool>,
}

impl GazeSample {
    /// Builds a sample, rejecting non-finite coordinates.
    pub fn new(timestamp: TimestampMs, valid: bool, x: f64, y: f64) -> Result<Self> {
        if !x.is_finite() || !y.is_finite() {
            bail!("gaze coordinates must be finite (x={x}, y={y})");
        }
        Ok(Self {
            timestamp,
            valid,
            x,
            y,
            pupil_diameter: None,
            blink_detected: None,
        })
    }

    /// Position for this tick, absent when either coordinate is not finite.
    pub fn position(&self) -> Option<Point> {
        if self.x.is_finite() && self.y.is_finite() {
            Some(Point { x: self.x, y: self.y })
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SampleSource {
    Backend,
    Synthetic,
}

impl SampleSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SampleSource::Backend => "backend",
            SampleSource::Synthetic => "synthetic",
        }
    }
}

/// A sample plus the side-channel data that travelled with it.
#[derive(Debug, Clone, PartialEq)]
pub struct GazePacket {
    pub sample: GazeSample,
    /// Cumulative nod count reported by the tracker hardware, when present.
    pub backend_nod_count: Option<u32>,
    pub source: SampleSource,
}

impl GazePacket {
    pub fn synthetic(sample: GazeSample) -> Self {
        Self {
            sample,
            backend_nod_count: None,
            source: SampleSource::Synthetic,
        }
    }
}
