use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{PoisonError, RwLock},
};

use crate::classifier::ClassifierThresholds;

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Reader-facing gaze settings. Every numeric field has an accepted range; see [`validation`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GazeSettings {
    pub fixation_threshold_ms: u64,
    /// Regressions per sentence before the review view marks it difficult.
    pub regression_count: u32,
    pub distraction_timeout_ms: u64,
    pub nod_movement_threshold_px: f64,
    /// Allow synthetic gaze when the tracker backend is silent.
    pub simulation_enabled: bool,
}

impl Default for GazeSettings {
    fn default() -> Self {
        Self {
            fixation_threshold_ms: 800,
            regression_count: 3,
            distraction_timeout_ms: 3000,
            nod_movement_threshold_px: 20.0,
            simulation_enabled: true,
        }
    }
}

impl GazeSettings {
    pub fn thresholds(&self) -> ClassifierThresholds {
        ClassifierThresholds {
            fixation_threshold_ms: self.fixation_threshold_ms as i64,
            distraction_timeout_ms: self.distraction_timeout_ms as i64,
            movement_threshold_px: self.nod_movement_threshold_px,
        }
    }
}

/// Range checks for settings. Out-of-range values are rejected, never clamped.
pub mod validation {
    use super::GazeSettings;
    use anyhow::{bail, Result};

    pub const FIXATION_THRESHOLD_MS: (u64, u64) = (100, 5_000);
    pub const REGRESSION_COUNT: (u32, u32) = (1, 20);
    pub const DISTRACTION_TIMEOUT_MS: (u64, u64) = (1_000, 10_000);
    pub const NOD_MOVEMENT_THRESHOLD_PX: (f64, f64) = (5.0, 100.0);

    pub fn validate_fixation_threshold_ms(value: u64) -> Result<()> {
        let (min, max) = FIXATION_THRESHOLD_MS;
        if !(min..=max).contains(&value) {
            bail!("fixationThresholdMs must be between {min} and {max}, got {value}");
        }
        Ok(())
    }

    pub fn validate_regression_count(value: u32) -> Result<()> {
        let (min, max) = REGRESSION_COUNT;
        if !(min..=max).contains(&value) {
            bail!("regressionCount must be between {min} and {max}, got {value}");
        }
        Ok(())
    }

    pub fn validate_distraction_timeout_ms(value: u64) -> Result<()> {
        let (min, max) = DISTRACTION_TIMEOUT_MS;
        if !(min..=max).contains(&value) {
            bail!("distractionTimeoutMs must be between {min} and {max}, got {value}");
        }
        Ok(())
    }

    pub fn validate_nod_movement_threshold_px(value: f64) -> Result<()> {
        let (min, max) = NOD_MOVEMENT_THRESHOLD_PX;
        if !value.is_finite() || value < min || value > max {
            bail!("nodMovementThresholdPx must be between {min} and {max}, got {value}");
        }
        Ok(())
    }

    pub fn validate(settings: &GazeSettings) -> Result<()> {
        validate_fixation_threshold_ms(settings.fixation_threshold_ms)?;
        validate_regression_count(settings.regression_count)?;
        validate_distraction_timeout_ms(settings.distraction_timeout_ms)?;
        validate_nod_movement_threshold_px(settings.nod_movement_threshold_px)?;
        Ok(())
    }
}

pub struct SettingsStore {
    path: Option<PathBuf>,
    data: RwLock<GazeSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            match serde_json::from_str::<GazeSettings>(&contents) {
                Ok(loaded) => match validation::validate(&loaded) {
                    Ok(()) => loaded,
                    Err(err) => {
                        log_warn!("settings file {} rejected ({err}); using defaults", path.display());
                        GazeSettings::default()
                    }
                },
                Err(err) => {
                    log_warn!("settings file {} unreadable ({err}); using defaults", path.display());
                    GazeSettings::default()
                }
            }
        } else {
            GazeSettings::default()
        };

        Ok(Self {
            path: Some(path),
            data: RwLock::new(data),
        })
    }

    /// A store that never touches disk.
    pub fn in_memory(settings: GazeSettings) -> Result<Self> {
        validation::validate(&settings)?;
        Ok(Self {
            path: None,
            data: RwLock::new(settings),
        })
    }

    pub fn settings(&self) -> GazeSettings {
        self.data.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn thresholds(&self) -> ClassifierThresholds {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .thresholds()
    }

    pub fn fixation_threshold_ms(&self) -> u64 {
        self.settings().fixation_threshold_ms
    }

    pub fn set_fixation_threshold_ms(&self, value: u64) -> Result<()> {
        self.apply("fixationThresholdMs", validation::validate_fixation_threshold_ms(value), |s| {
            s.fixation_threshold_ms = value
        })
    }

    pub fn regression_count(&self) -> u32 {
        self.settings().regression_count
    }

    pub fn set_regression_count(&self, value: u32) -> Result<()> {
        self.apply("regressionCount", validation::validate_regression_count(value), |s| {
            s.regression_count = value
        })
    }

    pub fn distraction_timeout_ms(&self) -> u64 {
        self.settings().distraction_timeout_ms
    }

    pub fn set_distraction_timeout_ms(&self, value: u64) -> Result<()> {
        self.apply(
            "distractionTimeoutMs",
            validation::validate_distraction_timeout_ms(value),
            |s| s.distraction_timeout_ms = value,
        )
    }

    pub fn nod_movement_threshold_px(&self) -> f64 {
        self.settings().nod_movement_threshold_px
    }

    pub fn set_nod_movement_threshold_px(&self, value: f64) -> Result<()> {
        self.apply(
            "nodMovementThresholdPx",
            validation::validate_nod_movement_threshold_px(value),
            |s| s.nod_movement_threshold_px = value,
        )
    }

    pub fn simulation_enabled(&self) -> bool {
        self.settings().simulation_enabled
    }

    pub fn set_simulation_enabled(&self, enabled: bool) -> Result<()> {
        self.apply("simulationEnabled", Ok(()), |s| s.simulation_enabled = enabled)
    }

    /// Replaces every field at once; nothing changes if any field is out of range.
    pub fn update(&self, settings: GazeSettings) -> Result<()> {
        self.apply("settings", validation::validate(&settings), |s| *s = settings)
    }

    fn apply(
        &self,
        field: &str,
        check: Result<()>,
        mutate: impl FnOnce(&mut GazeSettings),
    ) -> Result<()> {
        if let Err(err) = check {
            log_warn!("rejected {field} update, keeping previous value: {err}");
            return Err(err);
        }

        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        let previous = guard.clone();
        mutate(&mut *guard);
        if let Err(err) = self.persist(&guard) {
            *guard = previous;
            return Err(err);
        }
        log_info!("{field} updated");
        Ok(())
    }

    fn persist(&self, data: &GazeSettings) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(path, serialized)
            .with_context(|| format!("Failed to write settings to {}", path.display()))
    }
}
