//! Subconscious boundary.
//!
//! Builds a fixed 12-dimensional feature vector from the organism's pulse
//! and hands it to an injected [`Subconscious`] model. The model is a black
//! box; only its four raw outputs are mapped back into bounded signals.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::engine::state::{clamp01, Timestamp};

pub const ECHO_DIM: usize = 5;
pub const FEATURE_DIM: usize = 12;
pub const OUTPUT_DIM: usize = 4;

/// Circadian pulse and the sensor echo it carried
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pulse {
    pub rhythm_phase: f64,
    pub voltage: f64,
    /// [stress, entropy, fatigue, energy, predictive_error]
    pub echo: [f64; ECHO_DIM],
}

impl Pulse {
    pub fn new(ts: Timestamp, energy: f64, echo: [f64; ECHO_DIM]) -> Self {
        let rhythm_phase = ((ts as f64 / 3600.0).sin() + 1.0) / 2.0;
        Self {
            rhythm_phase,
            voltage: clamp01(energy) * (0.8 + 0.2 * rhythm_phase),
            echo: echo.map(|v| if v.is_finite() { v } else { 0.0 }),
        }
    }
}

/// Values, deltas against the previous echo, tension, rhythm.
pub fn build_features(pulse: &Pulse, prev: Option<&Pulse>) -> ([f64; FEATURE_DIM], f64) {
    let deltas: [f64; ECHO_DIM] = match prev {
        Some(p) => std::array::from_fn(|i| pulse.echo[i] - p.echo[i]),
        None => [0.0; ECHO_DIM],
    };
    let tension: f64 = deltas.iter().map(|d| d.abs()).sum();

    let mut features = [0.0; FEATURE_DIM];
    features[..ECHO_DIM].copy_from_slice(&pulse.echo);
    features[ECHO_DIM..2 * ECHO_DIM].copy_from_slice(&deltas);
    features[2 * ECHO_DIM] = tension;
    features[2 * ECHO_DIM + 1] = pulse.rhythm_phase;
    (features, tension)
}

/// Inference model behind the feature vector.
pub trait Subconscious: Send {
    fn name(&self) -> &str;
    fn infer(&self, features: &[f64; FEATURE_DIM]) -> [f64; OUTPUT_DIM];
}

/// Model stand-in that always answers neutral.
#[derive(Debug, Clone, Copy, Default)]
pub struct DormantSubconscious;

impl Subconscious for DormantSubconscious {
    fn name(&self) -> &str {
        "dormant"
    }

    fn infer(&self, _features: &[f64; FEATURE_DIM]) -> [f64; OUTPUT_DIM] {
        [0.5, 0.5, 0.5, 0.0]
    }
}

/// Single dense layer with tanh saturation.
#[derive(Debug, Clone)]
pub struct LinearSubconscious {
    weights: [[f64; FEATURE_DIM]; OUTPUT_DIM],
    bias: [f64; OUTPUT_DIM],
}

impl LinearSubconscious {
    pub fn new(weights: [[f64; FEATURE_DIM]; OUTPUT_DIM], bias: [f64; OUTPUT_DIM]) -> Self {
        Self { weights, bias }
    }

    /// Small random weights from a fixed seed.
    pub fn seeded(seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let scale = 1.0 / (FEATURE_DIM as f64).sqrt();
        let weights = std::array::from_fn(|_| std::array::from_fn(|_| rng.gen_range(-scale..scale)));
        let bias = std::array::from_fn(|_| rng.gen_range(-0.1..0.1));
        Self { weights, bias }
    }
}

impl Subconscious for LinearSubconscious {
    fn name(&self) -> &str {
        "linear_tanh"
    }

    fn infer(&self, features: &[f64; FEATURE_DIM]) -> [f64; OUTPUT_DIM] {
        std::array::from_fn(|o| {
            let z: f64 = self.weights[o].iter().zip(features).map(|(w, x)| w * x).sum();
            (z + self.bias[o]).tanh()
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubconsciousSignal {
    pub action_potential: f64,
    pub sensory_gain: f64,
    pub energy_gate: f64,
    /// Sentiment bias in [-1, 1]
    pub mood_tone: f64,
    pub nervous_tension: f64,
}

impl SubconsciousSignal {
    pub fn from_outputs(raw: [f64; OUTPUT_DIM], tension: f64) -> Self {
        let raw = raw.map(|v| if v.is_finite() { v } else { 0.0 });
        Self {
            action_potential: clamp01(raw[0]),
            sensory_gain: clamp01(raw[1] + tension * 0.2),
            energy_gate: clamp01(raw[2]),
            mood_tone: raw[3].clamp(-1.0, 1.0),
            nervous_tension: tension,
        }
    }
}

/// Build features, run the model, map its outputs.
pub fn sense(model: &dyn Subconscious, pulse: &Pulse, prev: Option<&Pulse>) -> SubconsciousSignal {
    let (features, tension) = build_features(pulse, prev);
    SubconsciousSignal::from_outputs(model.infer(&features), tension)
}
