//! Per-tick state transition: (previous state, tick) -> next state.
//!
//! ```text
//! tick ─► signals ─► recurrence ─┬─► shadow ──┐
//!                                └─► neuro ───┴─► bicameral ─► fear ─► state
//! network vitals ─► chaos estimator ─────────────────────────────┘ (cross-talk)
//! ```
//!
//! The only mutable memory outside the snapshot lives in [`Organism`]: the
//! resolver bias, the on-chain histories, the RNG and the subconscious
//! model. Given the same seed, inputs and model, the output is identical.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde_json::json;

use super::bicameral::{BicameralMind, Judgment, Resolution};
use super::modulation::{apply_ghost_pre_echo, apply_scar_damping, conscience, internal_thought};
use super::neuro;
use super::recurrence::{step_recurrence, RollingBuffer};
use super::shadow;
use super::state::*;
use crate::logging::{log, log_gravity, log_resolution, log_tick, obj, v_num, Domain, Level, ProfileScope};
use crate::onchain::{ChaosEstimator, GravityReading, NetworkVitals};
use crate::signals::{cardiogram, extract_changes, temporal_consensus, Tick};
use crate::state::PranaConfig;
use crate::subconscious::{sense, DormantSubconscious, Pulse, Subconscious};
use crate::verify::{assert_prana_laws, LawViolation};

/// Result of one transition
#[derive(Debug, Clone)]
pub struct StepOutput {
    pub state: PranaState,
    pub resolution: Resolution,
    pub gravity: Option<GravityReading>,
    /// Digest of `state`. Kept current by [`StepOutput::absorb_judgment`].
    pub state_hash: String,
}

impl StepOutput {
    /// Fold a judgment into the state and refresh the digest.
    pub fn absorb_judgment(&mut self, judgment: &Judgment) {
        apply_judgment(&mut self.state, judgment);
        self.state_hash = self.state.digest();
    }
}

/// Owner of all cross-tick memory that is not part of the snapshot.
pub struct Organism {
    cfg: PranaConfig,
    mind: BicameralMind,
    chaos: ChaosEstimator,
    rng: ChaCha8Rng,
    subconscious: Box<dyn Subconscious>,
}

impl Organism {
    pub fn new(cfg: PranaConfig, seed: u64) -> Self {
        let cfg = cfg.sanitized();
        Self {
            chaos: ChaosEstimator::new(cfg.onchain.clone()),
            mind: BicameralMind::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            subconscious: Box::new(DormantSubconscious),
            cfg,
        }
    }

    pub fn with_subconscious(mut self, model: Box<dyn Subconscious>) -> Self {
        self.subconscious = model;
        self
    }

    pub fn config(&self) -> &PranaConfig {
        &self.cfg
    }

    pub fn mind(&self) -> &BicameralMind {
        &self.mind
    }

    /// Advance one tick. Never fails; see [`Organism::step_checked`].
    pub fn step(&mut self, prev: &PranaState, tick: &Tick, network: Option<&NetworkVitals>) -> StepOutput {
        let ts = tick.ts.unwrap_or(prev.timestamp.saturating_add(1));
        let _scope = ProfileScope::with_context("organism_step", &[("ts", json!(ts))]);
        let cfg = &self.cfg;
        let prices = tick.prices();

        // Sensory layer
        let ingestors = cardiogram(&prices, &prev.prices);
        let changes = extract_changes(tick, &prev.prices);
        let (consensus, minority_hits) = temporal_consensus(&prices, &prev.prices);

        // Recurrence
        let mut buffer = RollingBuffer::from_history(&prev.memory.changes_mean_buf, cfg.baseline_window);
        let rec = step_recurrence(&prev.system, &mut buffer, &changes, &ingestors, cfg, &mut self.rng);
        let mut system = rec.vitals;
        // fear and the vascular layer read entropy before modulation
        let raw_entropy = system.entropy;
        let neurochemistry = neuro::evolve(
            &prev.neurochemistry,
            rec.surprise,
            system.stress_velocity,
            system.fatigue,
            raw_entropy,
        );
        let shadow = shadow::simulate(
            system.stress,
            system.stress_velocity,
            system.fragility,
            prev.shadow.shadow_fear,
            &cfg.shadow,
            &mut self.rng,
        );
        log(
            Level::Trace,
            Domain::Stress,
            "recurrence",
            obj(&[
                ("baseline", v_num(rec.baseline)),
                ("stress_target", v_num(rec.stress_target)),
                ("surprise", v_num(rec.surprise)),
                ("asa_amp", v_num(rec.asa_amp)),
            ]),
        );
        log(
            Level::Trace,
            Domain::Shadow,
            "worlds",
            obj(&[
                ("panic_probability", v_num(shadow.panic_probability)),
                ("uncertainty", v_num(shadow.uncertainty)),
                ("interpretation", json!(shadow.interpretation)),
            ]),
        );

        // Modulations
        apply_scar_damping(&mut system, &prev.scars);
        apply_ghost_pre_echo(&mut system, &prev.shadow);
        system.in_stasis = system.energy < 0.15;

        // Bicameral resolution
        let logic_fear = logic_fear(system.stress, shadow.shadow_fear, raw_entropy);
        let resolution = self.mind.resolve(ts, logic_fear, shadow.shadow_fear, neurochemistry.dopamine);
        log_resolution(&resolution);

        // On-chain cross-talk
        let gravity = network.map(|v| self.chaos.observe(v));
        if let Some(g) = &gravity {
            log_gravity(g);
        }
        let fear_index = assemble_fear(
            resolution.final_fear,
            gravity.as_ref().map(|g| g.gravity_index),
            prev.fear_index,
            cfg,
        );
        let threat_state = ThreatLevel::from_fear(fear_index, &cfg.threat);

        let latent = Latent { asa_amp: rec.asa_amp, crash_coherence: rec.crash_coherence, surprise: rec.surprise };

        // Subconscious
        let pulse = Pulse::new(
            ts,
            system.energy,
            [system.stress, system.entropy, system.fatigue, system.energy, (logic_fear - shadow.shadow_fear).abs()],
        );
        let subconscious = sense(self.subconscious.as_ref(), &pulse, prev.pulse.as_ref());

        let (narrative, thought) = if cfg.enable_narrative {
            (
                Some(conscience(system.in_stasis, fear_index, neurochemistry.dopamine)),
                Some(internal_thought(&system, &latent)),
            )
        } else {
            (None, None)
        };

        self.mind.decay();

        let state = PranaState {
            timestamp: ts,
            vascular: Vascular::from_vitals(system.stress, raw_entropy),
            system,
            neurochemistry,
            shadow,
            fear_index,
            threat_state,
            latent,
            temporal: TemporalReading { status: consensus, minority_hits },
            mind: Some(resolution.clone()),
            onchain: gravity.clone(),
            pulse: Some(pulse),
            subconscious: Some(subconscious),
            narrative,
            thought,
            prices,
            memory: Memory { changes_mean_buf: buffer.to_vec() },
            scars: prev.scars.clone(),
        };
        log_tick(&state, tick.coins.len());

        let state_hash = state.digest();
        StepOutput { state, resolution, gravity, state_hash }
    }

    /// [`Organism::step`] followed by the transition laws.
    pub fn step_checked(
        &mut self,
        prev: &PranaState,
        tick: &Tick,
        network: Option<&NetworkVitals>,
    ) -> Result<StepOutput, LawViolation> {
        let out = self.step(prev, tick, network);
        assert_prana_laws(prev, &out.state, &self.cfg.laws)?;
        Ok(out)
    }

    /// Score a past decision against what actually happened.
    pub fn judge(&mut self, record: &Resolution, reality: f64) -> Judgment {
        self.mind.judge(record, clamp01(reality))
    }
}

/// Stress-derived fear before any reconciliation.
pub fn logic_fear(stress: f64, shadow_fear: f64, entropy: f64) -> f64 {
    clamp01(0.4 * ((stress + shadow_fear) / 2.0) + 0.4 * stress + 0.2 * entropy)
}

/// Blend in on-chain gravity, then cap the rise against the previous tick.
pub fn assemble_fear(resolved: f64, gravity: Option<f64>, prev_fear: f64, cfg: &PranaConfig) -> f64 {
    let w = cfg.crosstalk_weight;
    let blended = match gravity {
        Some(g) => (1.0 - w) * clamp01(resolved) + w * clamp01(g),
        None => clamp01(resolved),
    };
    clamp01(blended.min(clamp01(prev_fear) + cfg.laws.fear_jump_limit))
}

/// Fold a judgment's rewards and penalties into a state.
pub fn apply_judgment(state: &mut PranaState, judgment: &Judgment) {
    let n = &mut state.neurochemistry;
    n.dopamine = clamp01(n.dopamine + judgment.dopamine_delta);
    state.system.energy = clamp01(state.system.energy + judgment.energy_delta);
    state.system.in_stasis = state.system.energy < 0.15;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::bicameral::{MindMode, Verdict};
    use crate::signals::CoinQuote;

    fn tick(ts: u64, prices: &[(&str, f64)]) -> Tick {
        let mut t = Tick { ts: Some(ts), ..Tick::default() };
        for (id, p) in prices {
            t.coins.insert(id.to_string(), CoinQuote { price: Some(*p), ..CoinQuote::default() });
        }
        t
    }

    #[test]
    fn test_first_tick_from_empty_state() {
        let mut org = Organism::new(PranaConfig::default(), 1);
        let out = org.step(&PranaState::default(), &tick(100, &[("btc", 100.0)]), None);
        let s = &out.state;
        assert_eq!(s.timestamp, 100);
        assert_eq!(s.memory.changes_mean_buf.len(), 1);
        assert_eq!(s.shadow.worlds.len(), 12);
        assert_eq!(s.prices["btc"], 100.0);
        assert!(s.narrative.is_some());
        assert!(s.onchain.is_none());
        assert_eq!(out.state_hash, s.digest());
    }

    #[test]
    fn test_missing_tick_ts_advances_logical_clock() {
        let mut org = Organism::new(PranaConfig::default(), 1);
        let prev = PranaState { timestamp: 41, ..PranaState::default() };
        let out = org.step(&prev, &Tick::default(), None);
        assert_eq!(out.state.timestamp, 42);
    }

    #[test]
    fn test_fear_rise_is_slew_limited() {
        let cfg = PranaConfig::default();
        assert!((assemble_fear(0.9, None, 0.30, &cfg) - 0.50).abs() < 1e-12);
        assert_eq!(assemble_fear(0.1, None, 0.80, &cfg), 0.1);
        let crossed = assemble_fear(0.4, Some(1.0), 0.4, &cfg);
        assert!((crossed - (0.85 * 0.4 + 0.15)).abs() < 1e-12);
    }

    #[test]
    fn test_logic_fear_formula() {
        let f = logic_fear(0.5, 0.1, 0.2);
        assert!((f - (0.4 * 0.3 + 0.2 + 0.04)).abs() < 1e-12);
        assert_eq!(logic_fear(5.0, 5.0, 5.0), 1.0);
    }

    #[test]
    fn test_crash_tick_respects_laws() {
        let mut org = Organism::new(PranaConfig::default(), 3);
        let prev = PranaState { fear_index: 0.30, ..PranaState::default() };
        let mut t = tick(10, &[("a", 50.0), ("b", 20.0), ("c", 5.0)]);
        for q in t.coins.values_mut() {
            q.price_change_pct_1h = Some(-60.0);
        }
        let out = org.step_checked(&prev, &t, Some(&NetworkVitals { gas_velocity: 1.0, mev_activity: 1.0, liquidity_proximity: 1.0 }));
        let out = out.expect("slew-limited transition is legal");
        assert!(out.state.fear_index <= 0.50 + 1e-12);
        assert!(out.state.onchain.is_some());
    }

    #[test]
    fn test_scars_pass_through_untouched() {
        let mut org = Organism::new(PranaConfig::default(), 5);
        let mut prev = PranaState::default();
        prev.scars.push(Scar::new(ScarState::Active));
        let out = org.step(&prev, &tick(1, &[]), None);
        assert_eq!(out.state.scars, prev.scars);
    }

    #[test]
    fn test_active_scar_dampens_entropy_not_fear() {
        let t = tick(1, &[("btc", 100.0), ("eth", 10.0)]);
        let clean = Organism::new(PranaConfig::default(), 8).step(&PranaState::default(), &t, None);

        let mut scarred_prev = PranaState::default();
        scarred_prev.scars.push(Scar::new(ScarState::Active));
        let scarred = Organism::new(PranaConfig::default(), 8).step(&scarred_prev, &t, None);

        assert!(scarred.state.system.entropy < clean.state.system.entropy);
        assert_eq!(scarred.resolution.logic_fear, clean.resolution.logic_fear);
        assert_eq!(scarred.state.fear_index, clean.state.fear_index);
        assert_eq!(scarred.state.vascular, clean.state.vascular);
    }

    #[test]
    fn test_narrative_toggle() {
        let cfg = PranaConfig { enable_narrative: false, ..PranaConfig::default() };
        let mut org = Organism::new(cfg, 5);
        let out = org.step(&PranaState::default(), &tick(1, &[]), None);
        assert!(out.state.narrative.is_none());
        assert!(out.state.thought.is_none());
    }

    #[test]
    fn test_judgment_feeds_back() {
        let mut org = Organism::new(PranaConfig::default(), 5);
        let record = Resolution {
            ts: 0,
            mode: MindMode::IntuitiveLeap,
            logic_fear: 0.2,
            shadow_fear: 0.9,
            final_fear: 0.9,
            conflict_level: 0.5,
            shadow_high: true,
            narrative: String::new(),
        };
        let j = org.judge(&record, 0.05);
        assert_eq!(j.verdict, Verdict::Shame);
        assert_eq!(org.mind().history().len(), 1);

        let mut s = PranaState::default();
        apply_judgment(&mut s, &j);
        assert!((s.neurochemistry.dopamine - 0.35).abs() < 1e-12);
        assert!((s.system.energy - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_absorbed_judgment_refreshes_hash() {
        let mut org = Organism::new(PranaConfig::default(), 5);
        let mut out = org.step(&PranaState::default(), &tick(1, &[("btc", 100.0)]), None);
        let before = out.state_hash.clone();
        let record = Resolution { mode: MindMode::IntuitiveLeap, ..out.resolution.clone() };

        let j = org.judge(&record, 0.05);
        assert_eq!(j.verdict, Verdict::Shame);
        out.absorb_judgment(&j);
        assert_ne!(out.state_hash, before);
        assert_eq!(out.state_hash, out.state.digest());
    }

    #[test]
    fn test_bias_decays_every_tick() {
        let mut org = Organism::new(PranaConfig::default(), 5);
        org.mind.bias.arrogance = 0.1;
        org.step(&PranaState::default(), &tick(1, &[]), None);
        assert!((org.mind().bias.arrogance - 0.098).abs() < 1e-12);
    }
}
