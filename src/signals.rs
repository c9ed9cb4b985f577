//! Sensory layer: raw price tick → primitive change statistics.
//!
//! Every function here is total. Missing prices, empty intersections and
//! non-finite inputs produce the documented seed values, never an error.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::engine::state::Timestamp;

/// Percent moves beyond this are treated as feed glitches and clipped.
pub const CHANGE_CLIP_PCT: f64 = 80.0;

/// A single-asset move below this percent counts toward crash coherence.
pub const CRASH_MOVE_PCT: f64 = -2.0;

/// One collector snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Tick {
    pub ts: Option<Timestamp>,
    pub coins: BTreeMap<String, CoinQuote>,
}

impl Tick {
    /// Current price per asset, skipping quotes without a usable price.
    pub fn prices(&self) -> BTreeMap<String, f64> {
        self.coins
            .iter()
            .filter_map(|(id, q)| q.price.filter(|p| p.is_finite()).map(|p| (id.clone(), p)))
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoinQuote {
    pub price: Option<f64>,
    pub price_change_pct_1h: Option<f64>,
    pub price_change_pct_24h: Option<f64>,
    pub price_change_pct_7d: Option<f64>,
}

impl CoinQuote {
    /// First available percent change, shortest horizon first.
    pub fn pick_change(&self) -> Option<f64> {
        [self.price_change_pct_1h, self.price_change_pct_24h, self.price_change_pct_7d]
            .into_iter()
            .flatten()
            .find(|v| v.is_finite())
    }
}

/// Per-tick change statistics (percent units)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSummary {
    pub changes: Vec<f64>,
    pub mean: f64,
    /// Population standard deviation, 0 with fewer than 2 samples
    pub stdev: f64,
}

impl ChangeSummary {
    pub fn from_changes(changes: Vec<f64>) -> Self {
        let n = changes.len();
        let mean = if n == 0 { 0.0 } else { changes.iter().sum::<f64>() / n as f64 };
        let stdev = if n < 2 {
            0.0
        } else {
            let var = changes.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / n as f64;
            var.sqrt()
        };
        Self { changes, mean, stdev }
    }

    /// Share of assets that moved down
    pub fn negative_fraction(&self) -> f64 {
        self.fraction(|c| c < 0.0)
    }

    /// Share of assets that fell harder than [`CRASH_MOVE_PCT`]
    pub fn crash_fraction(&self) -> f64 {
        self.fraction(|c| c < CRASH_MOVE_PCT)
    }

    fn fraction(&self, pred: impl Fn(f64) -> bool) -> f64 {
        let hits = self.changes.iter().filter(|c| pred(**c)).count();
        hits as f64 / self.changes.len().max(1) as f64
    }
}

/// Extract one clipped percent change per asset.
///
/// A quoted percent field wins; otherwise the move is derived from the
/// previous tick's price when the asset is present in both.
pub fn extract_changes(tick: &Tick, prev_prices: &BTreeMap<String, f64>) -> ChangeSummary {
    let mut changes = Vec::with_capacity(tick.coins.len());
    for (id, quote) in &tick.coins {
        let change = quote.pick_change().or_else(|| {
            let now = quote.price.filter(|p| p.is_finite())?;
            let before = prev_prices.get(id).copied().filter(|p| p.is_finite() && p.abs() > 1e-12)?;
            Some((now - before) / before * 100.0)
        });
        if let Some(ch) = change.filter(|c| c.is_finite()) {
            changes.push(ch.clamp(-CHANGE_CLIP_PCT, CHANGE_CLIP_PCT));
        }
    }
    ChangeSummary::from_changes(changes)
}

/// Absolute relative move per asset present in both snapshots.
fn relative_moves(current: &BTreeMap<String, f64>, prev: &BTreeMap<String, f64>) -> Vec<f64> {
    current
        .iter()
        .filter_map(|(id, now)| {
            let before = prev.get(id)?;
            let delta = (now - before).abs() / (before.abs() + 1e-9);
            delta.is_finite().then_some(delta)
        })
        .collect()
}

/// Market "cardiogram": price-delta driven stress proxies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IngestorSignals {
    pub onchain: f64,
    pub liquidations: f64,
    pub chaos_attractor: f64,
}

impl IngestorSignals {
    /// Seed reading when nothing overlaps
    pub fn seed() -> Self {
        Self::from_market_stress(0.05)
    }

    fn from_market_stress(ms: f64) -> Self {
        Self {
            onchain: (ms * 2.5).clamp(0.05, 0.95),
            liquidations: (ms * 6.0).clamp(0.05, 0.95),
            chaos_attractor: (ms * 1.2).clamp(0.0, 0.6),
        }
    }
}

/// Micro-moves above 5 bps are amplified so calm tapes still register.
pub fn cardiogram(current: &BTreeMap<String, f64>, prev: &BTreeMap<String, f64>) -> IngestorSignals {
    let diffs: Vec<f64> = relative_moves(current, prev)
        .into_iter()
        .map(|d| if d > 0.0005 { d * 15.0 } else { d })
        .collect();
    if diffs.is_empty() {
        return IngestorSignals::seed();
    }
    let market_stress = diffs.iter().sum::<f64>() / diffs.len() as f64 * 300.0;
    IngestorSignals::from_market_stress(market_stress)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsensusStatus {
    #[default]
    ConsensusStable,
    TruthMigration,
}

/// Count assets moving more than 5%; three or more means the consensus broke.
pub fn temporal_consensus(current: &BTreeMap<String, f64>, prev: &BTreeMap<String, f64>) -> (ConsensusStatus, usize) {
    let hits = relative_moves(current, prev).into_iter().filter(|d| *d > 0.05).count();
    let status = if hits > 2 { ConsensusStatus::TruthMigration } else { ConsensusStatus::ConsensusStable };
    (status, hits)
}
