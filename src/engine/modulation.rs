//! Post-recurrence modulations and the conscience layer.

use super::shadow::ShadowReading;
use super::state::{clamp01, Latent, Scar, ScarState, SystemVitals, Thought, ThoughtLabel};

const GHOST_ENTROPY_GAIN: f64 = 1.25;

/// Active scars dampen entropy, integrated ones restore energy.
pub fn apply_scar_damping(vitals: &mut SystemVitals, scars: &[Scar]) {
    let active = scars.iter().filter(|s| s.state == ScarState::Active).count() as f64;
    let integrated = scars.iter().filter(|s| s.state == ScarState::Integrated).count() as f64;
    vitals.entropy = clamp01(vitals.entropy * (1.0 - (0.05 * active).min(0.25)));
    vitals.energy = clamp01(vitals.energy + (0.03 * integrated).min(0.15));
}

/// Hot worlds from the previous tick amplify entropy in this one.
pub fn apply_ghost_pre_echo(vitals: &mut SystemVitals, prev_shadow: &ShadowReading) {
    if prev_shadow.ghost_echo() {
        vitals.entropy = clamp01(vitals.entropy * GHOST_ENTROPY_GAIN);
        vitals.ghost_active = true;
    }
}

pub fn conscience(in_stasis: bool, fear: f64, dopamine: f64) -> String {
    let line = if in_stasis {
        "Entering the void to recharge."
    } else if fear > 0.75 {
        "Systemic shock approaching. Monte Carlo paths are collapsing."
    } else if dopamine > 0.8 {
        "Neural harmony achieved."
    } else {
        "Observing the flow. All systems operational."
    };
    line.to_string()
}

pub fn internal_thought(vitals: &SystemVitals, latent: &Latent) -> Thought {
    let tension = clamp01(0.4 * vitals.stress + 0.3 * vitals.entropy + 0.3 * latent.asa_amp / 5.0);
    let label = if vitals.in_stasis {
        ThoughtLabel::StasisRecharging
    } else if tension > 0.7 {
        ThoughtLabel::HighTension
    } else {
        ThoughtLabel::Observing
    };
    Thought { tension, clarity: clamp01(1.0 - tension), label }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scar_damping_caps() {
        let mut v = SystemVitals { entropy: 0.4, energy: 0.5, ..SystemVitals::default() };
        let scars: Vec<Scar> = (0..10)
            .map(|_| Scar::new(ScarState::Active))
            .chain((0..2).map(|_| Scar::new(ScarState::Integrated)))
            .chain(std::iter::once(Scar::new(ScarState::Other)))
            .collect();
        apply_scar_damping(&mut v, &scars);
        assert!((v.entropy - 0.3).abs() < 1e-12);
        assert!((v.energy - 0.56).abs() < 1e-12);
    }

    #[test]
    fn test_no_scars_is_identity() {
        let mut v = SystemVitals::default();
        apply_scar_damping(&mut v, &[]);
        assert_eq!(v, SystemVitals::default());
    }

    #[test]
    fn test_ghost_pre_echo() {
        let mut v = SystemVitals { entropy: 0.4, ..SystemVitals::default() };
        let cold = ShadowReading { worlds: vec![0.9, 0.1], ..ShadowReading::default() };
        apply_ghost_pre_echo(&mut v, &cold);
        assert!(!v.ghost_active);
        assert_eq!(v.entropy, 0.4);

        let hot = ShadowReading { worlds: vec![0.9, 0.8, 0.1], ..ShadowReading::default() };
        apply_ghost_pre_echo(&mut v, &hot);
        assert!(v.ghost_active);
        assert!((v.entropy - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_conscience_priority() {
        assert_eq!(conscience(true, 0.9, 0.9), "Entering the void to recharge.");
        assert!(conscience(false, 0.8, 0.9).starts_with("Systemic shock"));
        assert_eq!(conscience(false, 0.2, 0.85), "Neural harmony achieved.");
        assert!(conscience(false, 0.2, 0.5).starts_with("Observing"));
    }

    #[test]
    fn test_internal_thought_labels() {
        let calm = internal_thought(&SystemVitals::default(), &Latent::default());
        assert_eq!(calm.label, ThoughtLabel::Observing);
        assert!((calm.tension + calm.clarity - 1.0).abs() < 1e-12);

        let tense = SystemVitals { stress: 1.0, entropy: 1.0, ..SystemVitals::default() };
        let t = internal_thought(&tense, &Latent { asa_amp: 3.0, ..Latent::default() });
        assert_eq!(t.label, ThoughtLabel::HighTension);

        let resting = SystemVitals { in_stasis: true, stress: 1.0, entropy: 1.0, ..SystemVitals::default() };
        assert_eq!(internal_thought(&resting, &Latent::default()).label, ThoughtLabel::StasisRecharging);
    }
}
