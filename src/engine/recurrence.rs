//! Entropy/stress recurrence.
//!
//! Exponentially smoothed state machine over {stress, entropy, velocity,
//! fatigue, energy}. The rolling baseline buffer is the only history it
//! owns; it is rebuilt from the snapshot each tick and written back.

use std::collections::VecDeque;

use rand::Rng;

use super::state::{clamp01, SystemVitals};
use crate::signals::{ChangeSummary, IngestorSignals};
use crate::state::PranaConfig;

/// Baseline falls back to the current mean until this many samples exist.
const BASELINE_MIN_SAMPLES: usize = 5;
/// Entropy below this takes the decay/seed branch.
const ENTROPY_SEED_GATE: f64 = 0.03;
const FRAGILITY_ENTROPY: f64 = 0.22;
const EPS: f64 = 1e-6;

/// Bounded FIFO of recent mean price changes
#[derive(Debug, Clone, PartialEq)]
pub struct RollingBuffer {
    cap: usize,
    values: VecDeque<f64>,
}

impl RollingBuffer {
    pub fn new(cap: usize) -> Self {
        let cap = cap.max(1);
        Self { cap, values: VecDeque::with_capacity(cap) }
    }

    /// Rebuild from persisted history, keeping only the newest `cap` entries.
    pub fn from_history(history: &[f64], cap: usize) -> Self {
        let mut buf = Self::new(cap);
        for v in history.iter().copied().filter(|v| v.is_finite()) {
            buf.push(v);
        }
        buf
    }

    pub fn push(&mut self, value: f64) {
        if self.values.len() >= self.cap {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            0.0
        } else {
            self.values.iter().sum::<f64>() / self.values.len() as f64
        }
    }

    pub fn front(&self) -> Option<f64> {
        self.values.front().copied()
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }
}

/// Everything the recurrence derives in one tick
#[derive(Debug, Clone)]
pub struct RecurrenceOutput {
    pub vitals: SystemVitals,
    pub baseline: f64,
    pub surprise: f64,
    /// Pain amplification from fragility
    pub asa_amp: f64,
    pub crash_coherence: f64,
    pub stress_target: f64,
}

fn sanitize(prev: &SystemVitals) -> SystemVitals {
    let velocity = if prev.stress_velocity.is_finite() { prev.stress_velocity.clamp(-1.0, 1.0) } else { 0.0 };
    SystemVitals {
        stress: clamp01(prev.stress),
        entropy: clamp01(prev.entropy),
        stress_velocity: velocity,
        energy: clamp01(prev.energy),
        fatigue: clamp01(prev.fatigue),
        ..prev.clone()
    }
}

/// Advance the recurrence by one tick.
pub fn step_recurrence<R: Rng + ?Sized>(
    prev: &SystemVitals,
    buffer: &mut RollingBuffer,
    changes: &ChangeSummary,
    ingestors: &IngestorSignals,
    cfg: &PranaConfig,
    rng: &mut R,
) -> RecurrenceOutput {
    let prev = sanitize(prev);
    let mean = changes.mean;

    buffer.push(mean);
    let baseline = if buffer.len() >= BASELINE_MIN_SAMPLES { buffer.mean() } else { mean };

    // Entropy
    let vol_signal = clamp01(changes.stdev / 2.0);
    let entropy = if prev.entropy >= ENTROPY_SEED_GATE {
        clamp01(prev.entropy * 0.88 + vol_signal * 0.40)
    } else {
        (prev.entropy * 0.70 + rng.gen_range(0.0_f64..0.001)).max(0.0)
    };
    let entropy = clamp01((entropy + changes.negative_fraction() * 0.15) * 0.80);

    // Pain and fragility
    let shortfall = (baseline - mean).max(0.0);
    let pain = if shortfall > cfg.pain_gate {
        clamp01((shortfall - cfg.pain_gate) / cfg.pain_scale)
    } else {
        0.0
    };
    let fragility = if mean > -0.05 && entropy < FRAGILITY_ENTROPY {
        clamp01((FRAGILITY_ENTROPY - entropy) * 4.5)
    } else {
        0.0
    };
    let surprise = clamp01((baseline - mean) / (baseline.abs() + cfg.pain_gate + EPS));
    let asa_amp = 1.0 + 2.8 * fragility * surprise;
    let effective_pain = pain * asa_amp;

    let stress_target = clamp01(
        0.4 * effective_pain + 0.2 * entropy + 0.2 * ingestors.onchain + 0.2 * ingestors.liquidations,
    );

    // Coherent sell-offs snap straight to the target
    let crash_coherence = changes.crash_fraction();
    let alpha = if crash_coherence * 1.6 > 0.35 {
        1.0
    } else if stress_target > prev.stress {
        cfg.rise
    } else {
        cfg.fall
    };

    let stress = clamp01(prev.stress * (1.0 - alpha) + stress_target * alpha);
    let velocity = 0.6 * prev.stress_velocity + 0.4 * (stress - prev.stress);
    let fatigue = clamp01(prev.fatigue + if stress > 0.7 { 0.018 } else { -0.045 });
    let energy = clamp01(prev.energy - stress * 0.02 + if stress < 0.2 { 0.002 } else { 0.0 });

    RecurrenceOutput {
        vitals: SystemVitals {
            stress,
            entropy,
            stress_velocity: velocity,
            energy,
            fatigue,
            in_stasis: energy < 0.15,
            pain,
            fragility,
            ghost_active: false,
        },
        baseline,
        surprise,
        asa_amp,
        crash_coherence,
        stress_target,
    }
}
