//! Organism state passed between ticks.
//!
//! Every struct deserialises with `#[serde(default)]`, so a snapshot with
//! missing fields reads back as first-tick values instead of failing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use super::bicameral::Resolution;
use super::shadow::ShadowReading;
use crate::onchain::GravityReading;
use crate::signals::ConsensusStatus;
use crate::state::ThreatThresholds;
use crate::subconscious::{Pulse, SubconsciousSignal};

pub type Timestamp = u64;

/// Clamp into [0, 1]. NaN collapses to 0 so no bounded field can go non-finite.
pub fn clamp01(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

/// Complete per-tick snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PranaState {
    #[serde(alias = "ts")]
    pub timestamp: Timestamp,
    pub system: SystemVitals,
    pub neurochemistry: Neurochemistry,
    pub shadow: ShadowReading,
    /// Headline output
    pub fear_index: f64,
    pub threat_state: ThreatLevel,
    pub latent: Latent,
    pub vascular: Vascular,
    pub temporal: TemporalReading,
    /// Bicameral decision for this tick
    pub mind: Option<Resolution>,
    /// Last on-chain reading folded into the fear index
    pub onchain: Option<GravityReading>,
    pub pulse: Option<Pulse>,
    pub subconscious: Option<SubconsciousSignal>,
    pub narrative: Option<String>,
    pub thought: Option<Thought>,
    pub prices: BTreeMap<String, f64>,
    #[serde(alias = "_memory")]
    pub memory: Memory,
    #[serde(alias = "_scars")]
    pub scars: Vec<Scar>,
}

impl Default for PranaState {
    fn default() -> Self {
        Self {
            timestamp: 0,
            system: SystemVitals::default(),
            neurochemistry: Neurochemistry::default(),
            shadow: ShadowReading::default(),
            fear_index: 0.0,
            threat_state: ThreatLevel::Normal,
            latent: Latent::default(),
            vascular: Vascular::default(),
            temporal: TemporalReading::default(),
            mind: None,
            onchain: None,
            pulse: None,
            subconscious: None,
            narrative: None,
            thought: None,
            prices: BTreeMap::new(),
            memory: Memory::default(),
            scars: Vec::new(),
        }
    }
}

impl PranaState {
    /// SHA-256 over the canonical JSON encoding, hex encoded.
    pub fn digest(&self) -> String {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        hex::encode(Sha256::digest(&bytes))
    }

    /// Every bounded scalar, by name. Used by audits and tests.
    pub fn bounded_fields(&self) -> Vec<(&'static str, f64)> {
        let s = &self.system;
        let n = &self.neurochemistry;
        vec![
            ("stress", s.stress),
            ("entropy", s.entropy),
            ("energy", s.energy),
            ("fatigue", s.fatigue),
            ("pain", s.pain),
            ("fragility", s.fragility),
            ("dopamine", n.dopamine),
            ("serotonin", n.serotonin),
            ("adrenaline", n.adrenaline),
            ("shadow_fear", self.shadow.shadow_fear),
            ("panic_probability", self.shadow.panic_probability),
            ("fear_index", self.fear_index),
            ("rbc", self.vascular.rbc),
            ("wbc", self.vascular.wbc),
            ("inflammation", self.vascular.inflammation),
            ("crash_coherence", self.latent.crash_coherence),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SystemVitals {
    pub stress: f64,
    pub entropy: f64,
    /// Signed; smoothed first difference of stress
    pub stress_velocity: f64,
    pub energy: f64,
    pub fatigue: f64,
    pub in_stasis: bool,
    pub pain: f64,
    pub fragility: f64,
    pub ghost_active: bool,
}

impl Default for SystemVitals {
    fn default() -> Self {
        Self {
            stress: 0.15,
            entropy: 0.10,
            stress_velocity: 0.0,
            energy: 1.0,
            fatigue: 0.0,
            in_stasis: false,
            pain: 0.0,
            fragility: 0.0,
            ghost_active: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Neurochemistry {
    pub dopamine: f64,
    pub serotonin: f64,
    pub adrenaline: f64,
}

impl Default for Neurochemistry {
    fn default() -> Self {
        Self { dopamine: 0.5, serotonin: 0.5, adrenaline: 0.1 }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Latent {
    /// Fragility-driven pain amplification
    pub asa_amp: f64,
    /// Share of assets falling harder than 2%
    pub crash_coherence: f64,
    pub surprise: f64,
}

impl Default for Latent {
    fn default() -> Self {
        Self { asa_amp: 1.0, crash_coherence: 0.0, surprise: 0.0 }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Vascular {
    pub rbc: f64,
    pub wbc: f64,
    pub inflammation: f64,
}

impl Default for Vascular {
    fn default() -> Self {
        Self { rbc: 1.0, wbc: 0.0, inflammation: 0.0 }
    }
}

impl Vascular {
    pub fn from_vitals(stress: f64, entropy: f64) -> Self {
        let rbc = clamp01(1.0 - stress * 0.3);
        let wbc = clamp01(entropy * 0.4);
        let inflammation = clamp01(wbc * 0.5 + stress * 0.2);
        Self { rbc, wbc, inflammation }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct TemporalReading {
    pub status: ConsensusStatus,
    pub minority_hits: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Thought {
    pub tension: f64,
    pub clarity: f64,
    pub label: ThoughtLabel,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThoughtLabel {
    StasisRecharging,
    HighTension,
    Observing,
}

/// Ordered threat labels. Declaration order is escalation order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThreatLevel {
    #[default]
    Normal,
    Warning,
    Panic,
    CrashImminent,
}

impl ThreatLevel {
    pub fn rank(&self) -> usize {
        match self {
            ThreatLevel::Normal => 0,
            ThreatLevel::Warning => 1,
            ThreatLevel::Panic => 2,
            ThreatLevel::CrashImminent => 3,
        }
    }

    pub fn from_fear(fear: f64, t: &ThreatThresholds) -> Self {
        if fear >= t.crash_imminent {
            ThreatLevel::CrashImminent
        } else if fear >= t.panic {
            ThreatLevel::Panic
        } else if fear >= t.warning {
            ThreatLevel::Warning
        } else {
            ThreatLevel::Normal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatLevel::Normal => "NORMAL",
            ThreatLevel::Warning => "WARNING",
            ThreatLevel::Panic => "PANIC",
            ThreatLevel::CrashImminent => "CRASH_IMMINENT",
        }
    }
}

/// Rolling baseline history as persisted in the snapshot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Memory {
    pub changes_mean_buf: Vec<f64>,
}

/// Trauma marker owned by an external subsystem.
///
/// Unknown fields are carried through untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Scar {
    pub state: ScarState,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Scar {
    pub fn new(state: ScarState) -> Self {
        Self { state, extra: Map::new() }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScarState {
    Active,
    Integrated,
    #[serde(other)]
    Other,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_reads_as_first_tick() {
        let state: PranaState = serde_json::from_str("{}").unwrap();
        assert_eq!(state.system.stress, 0.15);
        assert_eq!(state.system.entropy, 0.10);
        assert_eq!(state.system.energy, 1.0);
        assert_eq!(state.neurochemistry.dopamine, 0.5);
        assert_eq!(state.shadow.shadow_fear, 0.1);
        assert_eq!(state.threat_state, ThreatLevel::Normal);
        assert!(state.memory.changes_mean_buf.is_empty());
    }

    #[test]
    fn test_partial_system_keeps_other_defaults() {
        let state: PranaState =
            serde_json::from_str(r#"{"ts": 42, "system": {"stress": 0.4}, "_memory": {"changes_mean_buf": [1.0]}}"#)
                .unwrap();
        assert_eq!(state.timestamp, 42);
        assert_eq!(state.system.stress, 0.4);
        assert_eq!(state.system.energy, 1.0);
        assert_eq!(state.memory.changes_mean_buf, vec![1.0]);
    }

    #[test]
    fn test_scar_extra_fields_survive() {
        let raw = r#"{"scars": [{"state": "active", "origin": "2024-crash"}, {"state": "healing"}]}"#;
        let state: PranaState = serde_json::from_str(raw).unwrap();
        assert_eq!(state.scars[0].state, ScarState::Active);
        assert_eq!(state.scars[1].state, ScarState::Other);
        let out = serde_json::to_value(&state).unwrap();
        assert_eq!(out["scars"][0]["origin"], "2024-crash");
    }

    #[test]
    fn test_threat_order_and_bands() {
        let t = ThreatThresholds::default();
        assert!(ThreatLevel::Normal < ThreatLevel::CrashImminent);
        assert_eq!(ThreatLevel::from_fear(0.1, &t), ThreatLevel::Normal);
        assert_eq!(ThreatLevel::from_fear(0.35, &t), ThreatLevel::Warning);
        assert_eq!(ThreatLevel::from_fear(0.6, &t), ThreatLevel::Panic);
        assert_eq!(ThreatLevel::from_fear(0.9, &t), ThreatLevel::CrashImminent);
        assert_eq!(ThreatLevel::Panic.rank() - ThreatLevel::Normal.rank(), 2);
    }

    #[test]
    fn test_clamp01_handles_nan() {
        assert_eq!(clamp01(f64::NAN), 0.0);
        assert_eq!(clamp01(-3.0), 0.0);
        assert_eq!(clamp01(7.0), 1.0);
    }

    #[test]
    fn test_digest_is_stable() {
        let a = PranaState::default();
        let b = PranaState::default();
        assert_eq!(a.digest(), b.digest());
        assert_eq!(a.digest().len(), 64);
    }
}
