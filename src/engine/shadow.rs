//! Shadow Monte Carlo: simulated crowd reactions to the current stress.
//!
//! Each tick draws a fixed number of "worlds". The panic probability is
//! instantaneous, but `shadow_fear` is a slow EMA against the previous
//! tick and never jumps with a single draw.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::state::clamp01;
use crate::state::ShadowConfig;

/// A world above this level counts toward the ghost pre-echo.
pub const GHOST_WORLD_LEVEL: f64 = 0.70;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShadowInterpretation {
    Collapse,
    Fractured,
    FomoAcceleration,
    #[default]
    Stable,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ShadowReading {
    pub worlds: Vec<f64>,
    pub shadow_fear: f64,
    pub panic_probability: f64,
    /// Sample standard deviation of the worlds
    pub uncertainty: f64,
    pub interpretation: ShadowInterpretation,
}

impl Default for ShadowReading {
    fn default() -> Self {
        Self {
            worlds: Vec::new(),
            shadow_fear: 0.1,
            panic_probability: 0.0,
            uncertainty: 0.0,
            interpretation: ShadowInterpretation::Stable,
        }
    }
}

impl ShadowReading {
    /// Two or more hot worlds last tick leave an echo in this one.
    pub fn ghost_echo(&self) -> bool {
        self.worlds.iter().filter(|w| **w > GHOST_WORLD_LEVEL).count() >= 2
    }
}

/// Run one tick of the shadow simulation.
pub fn simulate<R: Rng + ?Sized>(
    stress: f64,
    velocity: f64,
    fragility: f64,
    prev_shadow_fear: f64,
    cfg: &ShadowConfig,
    rng: &mut R,
) -> ShadowReading {
    let n = cfg.samples.max(1);
    let velocity = if velocity.is_finite() { velocity } else { 0.0 };

    let worlds: Vec<f64> = (0..n)
        .map(|_| {
            let drift: f64 = rng.gen_range(-1.0..2.0);
            let shock: f64 = rng.gen_range(-0.1..0.1);
            clamp01(stress + velocity * drift + shock * fragility)
        })
        .collect();

    let panicked = worlds.iter().filter(|w| **w > cfg.panic_threshold).count();
    let panic_probability = panicked as f64 / n as f64;

    let mean = worlds.iter().sum::<f64>() / n as f64;
    let uncertainty = if n > 1 {
        (worlds.iter().map(|w| (w - mean).powi(2)).sum::<f64>() / (n as f64 - 1.0)).sqrt()
    } else {
        0.0
    };

    let w = cfg.smoothing;
    let shadow_fear = clamp01(w * clamp01(stress) + (1.0 - w) * clamp01(prev_shadow_fear));

    let interpretation = if panic_probability > cfg.collapse_threshold {
        ShadowInterpretation::Collapse
    } else if panic_probability > cfg.fractured_threshold {
        ShadowInterpretation::Fractured
    } else if velocity > cfg.fomo_velocity {
        ShadowInterpretation::FomoAcceleration
    } else {
        ShadowInterpretation::Stable
    };

    ShadowReading { worlds, shadow_fear, panic_probability, uncertainty, interpretation }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_fixed_seed_is_deterministic() {
        let cfg = ShadowConfig::default();
        let a = simulate(0.5, 0.1, 0.1, 0.1, &cfg, &mut ChaCha8Rng::seed_from_u64(42));
        let b = simulate(0.5, 0.1, 0.1, 0.1, &cfg, &mut ChaCha8Rng::seed_from_u64(42));
        assert_eq!(a, b);
        assert_eq!(a.worlds.len(), 12);
    }

    #[test]
    fn test_sample_count_is_fixed() {
        let cfg = ShadowConfig { samples: 64, ..ShadowConfig::default() };
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..20 {
            let r = simulate(0.9, -0.8, 1.0, 0.5, &cfg, &mut rng);
            assert_eq!(r.worlds.len(), 64);
            assert!(r.worlds.iter().all(|w| (0.0..=1.0).contains(w)));
        }
    }

    #[test]
    fn test_shadow_fear_is_slow_ema() {
        let cfg = ShadowConfig::default();
        let r = simulate(0.5, 0.1, 0.1, 0.1, &cfg, &mut ChaCha8Rng::seed_from_u64(3));
        assert!((r.shadow_fear - (0.06 * 0.5 + 0.94 * 0.1)).abs() < 1e-12);
    }

    #[test]
    fn test_interpretation_labels() {
        let cfg = ShadowConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let calm = simulate(0.0, 0.0, 0.0, 0.1, &cfg, &mut rng);
        assert_eq!(calm.panic_probability, 0.0);
        assert_eq!(calm.interpretation, ShadowInterpretation::Stable);
        assert_eq!(calm.uncertainty, 0.0);

        let burning = simulate(1.0, 0.0, 0.0, 0.1, &cfg, &mut rng);
        assert_eq!(burning.panic_probability, 1.0);
        assert_eq!(burning.interpretation, ShadowInterpretation::Collapse);
    }

    #[test]
    fn test_ghost_echo_needs_two_hot_worlds() {
        let mut r = ShadowReading { worlds: vec![0.1, 0.71, 0.2], ..ShadowReading::default() };
        assert!(!r.ghost_echo());
        r.worlds.push(0.9);
        assert!(r.ghost_echo());
    }
}
