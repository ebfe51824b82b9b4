/// Thresholds the classifier runs against, taken from [`crate::settings::GazeSettings`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifierThresholds {
    /// Dwell on one word longer than this emits a fixation.
    pub fixation_threshold_ms: i64,

    /// Time without valid on-text gaze before distraction fires.
    pub distraction_timeout_ms: i64,

    /// Minimum vertical (nod) or horizontal (shake) travel between samples, in px.
    pub movement_threshold_px: f64,
}
