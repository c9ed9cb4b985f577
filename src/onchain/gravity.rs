//! Gravity well: aggregated on-chain fear with inertia.

use serde::{Deserialize, Serialize};

use super::divergence::calculate_divergence;
use crate::engine::recurrence::RollingBuffer;
use crate::engine::state::clamp01;
use crate::state::OnchainConfig;

/// Normalised network readings, each in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkVitals {
    pub gas_velocity: f64,
    pub mev_activity: f64,
    pub liquidity_proximity: f64,
}

impl Default for NetworkVitals {
    /// Neutral reading used when no collector is wired in.
    fn default() -> Self {
        Self { gas_velocity: 0.2, mev_activity: 0.3, liquidity_proximity: 0.5 }
    }
}

impl NetworkVitals {
    fn sanitized(&self) -> Self {
        Self {
            gas_velocity: clamp01(self.gas_velocity),
            mev_activity: clamp01(self.mev_activity),
            liquidity_proximity: clamp01(self.liquidity_proximity),
        }
    }
}

/// Owned memory of the on-chain estimator
#[derive(Debug, Clone)]
pub struct ChaosHistoryState {
    gas: RollingBuffer,
    mev: RollingBuffer,
    liquidity: RollingBuffer,
    /// Aggregated fear from the previous observation
    pub prev_aggregated: f64,
    /// Previous undamped blend, `None` before the first observation
    pub lagged: Option<f64>,
}

impl ChaosHistoryState {
    pub fn new(cap: usize) -> Self {
        Self {
            gas: RollingBuffer::new(cap),
            mev: RollingBuffer::new(cap),
            liquidity: RollingBuffer::new(cap),
            prev_aggregated: 0.0,
            lagged: None,
        }
    }

    pub fn len(&self) -> usize {
        self.gas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gas.is_empty()
    }

    fn record(&mut self, v: &NetworkVitals) {
        self.gas.push(v.gas_velocity);
        self.mev.push(v.mev_activity);
        self.liquidity.push(v.liquidity_proximity);
    }

    /// Mean divergence across the three series.
    pub fn attractor_score(&self, scale: f64) -> f64 {
        let scores = [&self.gas, &self.mev, &self.liquidity].map(|b| calculate_divergence(&b.to_vec(), scale));
        scores.iter().sum::<f64>() / scores.len() as f64
    }

    /// Fear can only fall by the decay rate per observation.
    pub fn ratchet(&mut self, instant: f64, cfg: &OnchainConfig) -> f64 {
        let aggregated = clamp01(instant.max(self.prev_aggregated * cfg.decay_rate).max(cfg.floor));
        self.prev_aggregated = aggregated;
        aggregated
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GravityReading {
    /// Aggregated on-chain fear
    pub gravity_index: f64,
    pub chaos_attractor: f64,
    pub instant_fear: f64,
    /// Sensors at or above the alignment threshold
    pub alignment_count: usize,
    pub event_horizon: bool,
    /// Suggested seconds until the next observation
    pub dynamic_sleep: u64,
}

/// Independent on-chain fear pipeline.
#[derive(Debug, Clone)]
pub struct ChaosEstimator {
    cfg: OnchainConfig,
    history: ChaosHistoryState,
}

impl ChaosEstimator {
    pub fn new(cfg: OnchainConfig) -> Self {
        let history = ChaosHistoryState::new(cfg.history_cap);
        Self { cfg, history }
    }

    pub fn history(&self) -> &ChaosHistoryState {
        &self.history
    }

    pub fn observe(&mut self, vitals: &NetworkVitals) -> GravityReading {
        let cfg = &self.cfg;
        let v = vitals.sanitized();
        self.history.record(&v);

        let attractor = self.history.attractor_score(cfg.divergence_scale);
        let alignment_count = [v.gas_velocity, v.mev_activity, v.liquidity_proximity]
            .iter()
            .filter(|s| **s >= cfg.alignment_threshold)
            .count();

        let mut now = v.gas_velocity * cfg.gas_weight
            + v.mev_activity * cfg.mev_weight
            + v.liquidity_proximity * cfg.liquidity_weight
            + attractor * cfg.attractor_weight;
        if alignment_count >= 2 {
            now *= cfg.collapse_multiplier;
        }

        let lagged = self.history.lagged.unwrap_or(now);
        self.history.lagged = Some(now);
        let blend = cfg.instant_weight * now + (1.0 - cfg.instant_weight) * lagged;
        let instant_fear = clamp01(blend).powf(cfg.compression).min(1.0);

        let gravity_index = self.history.ratchet(instant_fear, cfg);
        let event_horizon = gravity_index > cfg.event_horizon_fear && attractor > cfg.event_horizon_attractor;

        GravityReading {
            gravity_index,
            chaos_attractor: attractor,
            instant_fear,
            alignment_count,
            event_horizon,
            dynamic_sleep: if event_horizon { cfg.fast_sleep_secs } else { cfg.slow_sleep_secs },
        }
    }
}
