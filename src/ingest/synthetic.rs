use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::models::{GazePacket, GazeSample, Rect, TimestampMs};

/// 20Hz fallback cadence.
pub const SYNTHETIC_INTERVAL_MS: u64 = 50;
const VALID_PROBABILITY: f64 = 0.9;

/// Produces plausible gaze over the visible sentence while no tracker data arrives.
#[derive(Debug)]
pub struct SyntheticGazeGenerator {
    rng: StdRng,
}

impl SyntheticGazeGenerator {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// A random point inside `bounds`, valid about nine times out of ten.
    pub fn generate(&mut self, bounds: Rect, now: TimestampMs) -> GazePacket {
        let x = self.sample_axis(bounds.x, bounds.width);
        let y = self.sample_axis(bounds.y, bounds.height);
        let valid = self.rng.gen_bool(VALID_PROBABILITY);
        GazePacket::synthetic(GazeSample {
            timestamp: now,
            valid,
            x,
            y,
            pupil_diameter: None,
            blink_detected: None,
        })
    }

    fn sample_axis(&mut self, origin: f64, extent: f64) -> f64 {
        if extent > 0.0 {
            origin + self.rng.gen_range(0.0..extent)
        } else {
            origin
        }
    }
}

impl Default for SyntheticGazeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SampleSource;

    #[test]
    fn test_points_stay_inside_sentence_bounds() {
        let bounds = Rect::new(100.0, 200.0, 400.0, 30.0);
        let mut generator = SyntheticGazeGenerator::seeded(7);
        for t in 0..500 {
            let packet = generator.generate(bounds, t);
            assert_eq!(packet.source, SampleSource::Synthetic);
            assert!(bounds.contains(packet.sample.position().unwrap()));
            assert_eq!(packet.sample.timestamp, t);
        }
    }

    #[test]
    fn test_validity_rate_is_about_ninety_percent() {
        let mut generator = SyntheticGazeGenerator::seeded(42);
        let bounds = Rect::new(0.0, 0.0, 10.0, 10.0);
        let valid = (0..2000)
            .filter(|t| generator.generate(bounds, *t).sample.valid)
            .count();
        assert!((1700..=1900).contains(&valid), "valid count {valid}");
    }

    #[test]
    fn test_same_seed_same_stream() {
        let bounds = Rect::new(0.0, 0.0, 50.0, 50.0);
        let mut a = SyntheticGazeGenerator::seeded(3);
        let mut b = SyntheticGazeGenerator::seeded(3);
        for t in 0..20 {
            assert_eq!(a.generate(bounds, t), b.generate(bounds, t));
        }
    }

    #[test]
    fn test_degenerate_bounds() {
        let mut generator = SyntheticGazeGenerator::seeded(1);
        let packet = generator.generate(Rect::new(12.0, 34.0, 0.0, 0.0), 0);
        assert_eq!((packet.sample.x, packet.sample.y), (12.0, 34.0));
    }
}
