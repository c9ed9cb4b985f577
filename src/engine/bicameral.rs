//! Bicameral conflict resolver.
//!
//! Reconciles the stress-derived ("logic") fear with the shadow
//! ("intuition") fear. Persistent bias scalars make the resolver harder to
//! convince after it was burned by intuition, and a forgiveness step relaxes
//! them every tick.
//!
//! | Bias              | Raised by                         | Effect                       |
//! |-------------------|-----------------------------------|------------------------------|
//! | `arrogance`       | intuitive leap that saw a ghost   | raises the intuition bar     |
//! | `rigidity`        | rational denial of a real threat  | blocks the balanced mode     |
//! | `shame_multiplier`| repeated hallucinations           | scales penalties (1.0..=3.0) |

use serde::{Deserialize, Serialize};

use super::state::{clamp01, Timestamp};

/// Below this dissonance the two halves agree.
const DISSONANCE_GATE: f64 = 0.15;
const DISSONANCE_EXPONENT: f64 = 0.85;
const BALANCE_LIMIT: f64 = 0.2;
const SHAME_CAP: f64 = 3.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MindMode {
    Aligned,
    Balanced,
    IntuitiveLeap,
    RationalDenial,
    SkepticalLogic,
    Default,
}

impl MindMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MindMode::Aligned => "aligned",
            MindMode::Balanced => "balanced",
            MindMode::IntuitiveLeap => "intuitive_leap",
            MindMode::RationalDenial => "rational_denial",
            MindMode::SkepticalLogic => "skeptical_logic",
            MindMode::Default => "default",
        }
    }
}

/// Persistent meta-bias owned by the resolver
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResolverState {
    /// Over-reliance on intuition
    pub arrogance: f64,
    /// Over-reliance on data
    pub rigidity: f64,
    /// Error-correction weight, never below 1.0
    pub shame_multiplier: f64,
}

impl Default for ResolverState {
    fn default() -> Self {
        Self { arrogance: 0.0, rigidity: 0.0, shame_multiplier: 1.0 }
    }
}

impl ResolverState {
    /// Per-tick forgiveness. Call once every tick, conflict or not.
    pub fn decay(&mut self) {
        self.shame_multiplier = (self.shame_multiplier - 0.005).max(1.0);
        self.arrogance = (self.arrogance - 0.002).max(0.0);
        self.rigidity = (self.rigidity - 0.002).max(0.0);
    }

    pub fn is_balanced(&self) -> bool {
        self.arrogance < BALANCE_LIMIT && self.rigidity < BALANCE_LIMIT
    }

    pub fn intuition_threshold(&self) -> f64 {
        0.55 + self.arrogance * 0.25
    }
}

/// One reconciled decision; doubles as the record judged later.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Resolution {
    pub ts: Timestamp,
    pub mode: MindMode,
    pub logic_fear: f64,
    pub shadow_fear: f64,
    pub final_fear: f64,
    pub conflict_level: f64,
    pub shadow_high: bool,
    pub narrative: String,
}

/// Reconcile the two fear estimates under the current bias.
pub fn resolve_conflict(
    bias: &ResolverState,
    ts: Timestamp,
    logic_fear: f64,
    shadow_fear: f64,
    dopamine: f64,
) -> Resolution {
    let logic_fear = clamp01(logic_fear);
    let shadow_fear = clamp01(shadow_fear);
    let dissonance = (logic_fear - shadow_fear).abs().powf(DISSONANCE_EXPONENT);

    let resolution = |mode: MindMode, final_fear: f64, conflict_level: f64, narrative: &str| Resolution {
        ts,
        mode,
        logic_fear,
        shadow_fear,
        final_fear: clamp01(final_fear),
        conflict_level,
        shadow_high: shadow_fear > logic_fear,
        narrative: narrative.to_string(),
    };

    if dissonance < DISSONANCE_GATE {
        let (mode, narrative) = if bias.is_balanced() {
            (MindMode::Balanced, "Strategic equilibrium achieved.")
        } else {
            (MindMode::Aligned, "Mind and gut are aligned.")
        };
        return resolution(mode, logic_fear.max(shadow_fear), 0.0, narrative);
    }

    if shadow_fear > logic_fear {
        if dopamine > bias.intuition_threshold() {
            return resolution(
                MindMode::IntuitiveLeap,
                shadow_fear,
                dissonance,
                "Logic bypassed. Shadow signals high-probability risk.",
            );
        }
        return resolution(
            MindMode::RationalDenial,
            logic_fear,
            dissonance,
            "Intuition suppressed. Insufficient evidence for shadow action.",
        );
    }

    if logic_fear > shadow_fear {
        return resolution(
            MindMode::SkepticalLogic,
            logic_fear * 0.7 + shadow_fear * 0.3,
            dissonance,
            "Data suggests risk, but behavioral indicators remain calm.",
        );
    }

    resolution(MindMode::Default, logic_fear, dissonance, "Systemic stasis.")
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Intuition hallucinated danger
    Shame,
    /// Logic suppressed a real threat
    Trauma,
    /// Intuition was right
    Triumph,
    Validated,
}

/// Outcome of judging a past decision against reality
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Judgment {
    pub verdict: Verdict,
    pub confession: String,
    pub dopamine_delta: f64,
    pub energy_delta: f64,
    pub bias: ResolverState,
}

/// Append-only audit entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JudgedRecord {
    pub record: Resolution,
    pub reality: f64,
    pub verdict: Verdict,
}

/// Resolver bias plus its replay log
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BicameralMind {
    pub bias: ResolverState,
    history: Vec<JudgedRecord>,
}

impl BicameralMind {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(&self, ts: Timestamp, logic_fear: f64, shadow_fear: f64, dopamine: f64) -> Resolution {
        resolve_conflict(&self.bias, ts, logic_fear, shadow_fear, dopamine)
    }

    pub fn decay(&mut self) {
        self.bias.decay();
    }

    /// Compare a past decision with the observed outcome and adjust bias.
    pub fn judge(&mut self, record: &Resolution, reality: f64) -> Judgment {
        let b = &mut self.bias;
        let (verdict, confession, dopamine_delta, energy_delta) = match record.mode {
            MindMode::IntuitiveLeap if reality < 0.2 => {
                let deltas = (-0.15 * b.shame_multiplier, -0.10 * b.shame_multiplier);
                b.arrogance = clamp01(b.arrogance + 0.15);
                b.shame_multiplier = (b.shame_multiplier + 0.3).min(SHAME_CAP);
                (Verdict::Shame, "SHAME: Hallucinated danger. Over-reliance on shadow bias.", deltas.0, deltas.1)
            }
            MindMode::RationalDenial if reality > 0.6 => {
                b.rigidity = clamp01(b.rigidity + 0.15);
                (Verdict::Trauma, "TRAUMA: Rational blindness. Suppressed valid intuition.", -0.30, -0.20)
            }
            MindMode::IntuitiveLeap if reality > 0.6 => {
                b.shame_multiplier = (b.shame_multiplier - 0.5).max(1.0);
                b.arrogance = (b.arrogance - 0.1).max(0.0);
                (Verdict::Triumph, "TRIUMPH: Evolutionary leap confirmed. Intuition validated.", 0.10, 0.05)
            }
            _ => (Verdict::Validated, "Decision validated by reality.", 0.0, 0.0),
        };

        self.history.push(JudgedRecord { record: record.clone(), reality, verdict });

        Judgment {
            verdict,
            confession: confession.to_string(),
            dopamine_delta,
            energy_delta,
            bias: self.bias,
        }
    }

    pub fn history(&self) -> &[JudgedRecord] {
        &self.history
    }
}
