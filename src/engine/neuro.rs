//! Neurochemistry: three smoothed scalars with no memory beyond themselves.

use super::state::{clamp01, Neurochemistry};

/// |velocity| under this counts as calm and replenishes serotonin.
const CALM_VELOCITY: f64 = 0.05;

pub fn evolve(prev: &Neurochemistry, surprise: f64, velocity: f64, fatigue: f64, entropy: f64) -> Neurochemistry {
    let speed = if velocity.is_finite() { velocity.abs() } else { 0.0 };
    Neurochemistry {
        dopamine: clamp01(clamp01(prev.dopamine) + surprise * 0.12 - fatigue * 0.05),
        serotonin: clamp01(clamp01(prev.serotonin) + if speed < CALM_VELOCITY { 0.02 } else { -0.04 }),
        adrenaline: clamp01(speed * 4.5 + entropy * 0.4),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calm_tick() {
        let n = evolve(&Neurochemistry::default(), 0.0, 0.0, 0.0, 0.1);
        assert!((n.dopamine - 0.5).abs() < 1e-12);
        assert!((n.serotonin - 0.52).abs() < 1e-12);
        assert!((n.adrenaline - 0.04).abs() < 1e-12);
    }

    #[test]
    fn test_fast_velocity_drains_serotonin_and_spikes_adrenaline() {
        let n = evolve(&Neurochemistry::default(), 1.0, -0.3, 1.0, 0.5);
        assert!((n.dopamine - 0.57).abs() < 1e-12);
        assert!((n.serotonin - 0.46).abs() < 1e-12);
        assert_eq!(n.adrenaline, 1.0);
    }

    #[test]
    fn test_bounds_hold_at_extremes() {
        let prev = Neurochemistry { dopamine: 1.0, serotonin: 0.0, adrenaline: 1.0 };
        let n = evolve(&prev, 1.0, 0.5, 0.0, 1.0);
        assert_eq!(n.dopamine, 1.0);
        assert_eq!(n.serotonin, 0.0);
        let n = evolve(&prev, 0.0, f64::NAN, 1.0, 0.0);
        assert!((0.0..=1.0).contains(&n.dopamine));
        assert_eq!(n.adrenaline, 0.0);
    }
}
