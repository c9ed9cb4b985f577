//! Runtime configuration.
//!
//! Every coefficient the pipeline uses lives here with its default. Values
//! are read from `PRANA_*` environment variables and sanitised into their
//! legal ranges, so a bad variable degrades to a usable config instead of
//! failing the host.

use serde::{Deserialize, Serialize};

pub const MIN_BASELINE_WINDOW: usize = 10;
pub const MAX_BASELINE_WINDOW: usize = 5000;
pub const MIN_SHADOW_SAMPLES: usize = 12;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}

/// Core pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PranaConfig {
    // === Recurrence ===
    /// Rolling baseline buffer length, bounded to [10, 5000]
    pub baseline_window: usize,
    /// Shortfall below baseline that registers as pain
    pub pain_gate: f64,
    pub pain_scale: f64,
    /// Stress smoothing rate when the target is above current stress
    pub rise: f64,
    /// Stress smoothing rate when the target is at or below current stress
    pub fall: f64,

    // === Assembly ===
    /// Weight of the on-chain gravity index in the final fear blend
    pub crosstalk_weight: f64,
    pub threat: ThreatThresholds,
    /// Emit conscience narrative and internal thought
    pub enable_narrative: bool,

    pub shadow: ShadowConfig,
    pub onchain: OnchainConfig,
    pub laws: LawConfig,
}

impl Default for PranaConfig {
    fn default() -> Self {
        Self {
            baseline_window: 60,
            pain_gate: 0.22,
            pain_scale: 4.5,
            rise: 0.12,
            fall: 0.20,
            crosstalk_weight: 0.15,
            threat: ThreatThresholds::default(),
            enable_narrative: true,
            shadow: ShadowConfig::default(),
            onchain: OnchainConfig::default(),
            laws: LawConfig::default(),
        }
    }
}

impl PranaConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            baseline_window: env_or("PRANA_BASELINE_WINDOW", d.baseline_window),
            pain_gate: env_or("PRANA_PAIN_GATE", d.pain_gate),
            pain_scale: env_or("PRANA_PAIN_SCALE", d.pain_scale),
            rise: env_or("PRANA_RISE", d.rise),
            fall: env_or("PRANA_FALL", d.fall),
            crosstalk_weight: env_or("PRANA_CROSSTALK_WEIGHT", d.crosstalk_weight),
            threat: d.threat,
            enable_narrative: env_flag("PRANA_NARRATIVE", d.enable_narrative),
            shadow: ShadowConfig {
                samples: env_or("PRANA_SHADOW_SAMPLES", d.shadow.samples),
                panic_threshold: env_or("PRANA_PANIC_THRESHOLD", d.shadow.panic_threshold),
                ..d.shadow
            },
            onchain: OnchainConfig {
                decay_rate: env_or("PRANA_ONCHAIN_DECAY", d.onchain.decay_rate),
                floor: env_or("PRANA_ONCHAIN_FLOOR", d.onchain.floor),
                ..d.onchain
            },
            laws: LawConfig {
                fear_jump_limit: env_or("PRANA_FEAR_JUMP_LIMIT", d.laws.fear_jump_limit),
                ..d.laws
            },
        }
        .sanitized()
    }

    /// Force every field into its legal range.
    pub fn sanitized(mut self) -> Self {
        self.baseline_window = self.baseline_window.clamp(MIN_BASELINE_WINDOW, MAX_BASELINE_WINDOW);
        self.pain_gate = finite_or(self.pain_gate, 0.22).max(0.0);
        self.pain_scale = finite_or(self.pain_scale, 4.5).max(1e-6);
        self.rise = finite_or(self.rise, 0.12).clamp(0.0, 1.0);
        self.fall = finite_or(self.fall, 0.20).clamp(0.0, 1.0);
        self.crosstalk_weight = finite_or(self.crosstalk_weight, 0.15).clamp(0.0, 1.0);
        self.shadow.samples = self.shadow.samples.max(MIN_SHADOW_SAMPLES);
        self.shadow.panic_threshold = finite_or(self.shadow.panic_threshold, 0.72).clamp(0.6, 0.72);
        self.shadow.smoothing = finite_or(self.shadow.smoothing, 0.06).clamp(0.0, 1.0);
        self.onchain.history_cap = self.onchain.history_cap.max(5);
        self.onchain.decay_rate = finite_or(self.onchain.decay_rate, 0.94).clamp(0.0, 1.0);
        self.onchain.floor = finite_or(self.onchain.floor, 0.0).clamp(0.0, 1.0);
        self.onchain.instant_weight = finite_or(self.onchain.instant_weight, 0.7).clamp(0.0, 1.0);
        self.laws.fear_jump_limit = finite_or(self.laws.fear_jump_limit, 0.20).clamp(0.0, 1.0);
        self
    }
}

fn finite_or(x: f64, default: f64) -> f64 {
    if x.is_finite() {
        x
    } else {
        default
    }
}

/// Fear levels at which the threat label escalates.
///
/// Bands are 0.20 wide so that a slew-limited fear rise can cross at most
/// one band per tick.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ThreatThresholds {
    pub warning: f64,
    pub panic: f64,
    pub crash_imminent: f64,
}

impl Default for ThreatThresholds {
    fn default() -> Self {
        Self { warning: 0.35, panic: 0.55, crash_imminent: 0.75 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShadowConfig {
    /// Worlds simulated per tick (never fewer than 12)
    pub samples: usize,
    /// A world above this level counts as panicked
    pub panic_threshold: f64,
    /// Weight of current stress in the shadow fear EMA
    pub smoothing: f64,
    pub collapse_threshold: f64,
    pub fractured_threshold: f64,
    pub fomo_velocity: f64,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            samples: 12,
            panic_threshold: 0.72,
            smoothing: 0.06,
            collapse_threshold: 0.7,
            fractured_threshold: 0.3,
            fomo_velocity: 0.4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnchainConfig {
    pub history_cap: usize,
    /// Divergence that maps to a chaos score of 1.0
    pub divergence_scale: f64,
    pub gas_weight: f64,
    pub mev_weight: f64,
    pub liquidity_weight: f64,
    pub attractor_weight: f64,
    /// Signal level at which a sensor counts toward collapse alignment
    pub alignment_threshold: f64,
    pub collapse_multiplier: f64,
    /// Share of the current blend vs the lagged one
    pub instant_weight: f64,
    /// Power-law exponent applied to the blended fear
    pub compression: f64,
    pub decay_rate: f64,
    pub floor: f64,
    pub event_horizon_fear: f64,
    pub event_horizon_attractor: f64,
    pub fast_sleep_secs: u64,
    pub slow_sleep_secs: u64,
}

impl Default for OnchainConfig {
    fn default() -> Self {
        Self {
            history_cap: 20,
            divergence_scale: 0.35,
            gas_weight: 0.2,
            mev_weight: 0.4,
            liquidity_weight: 0.15,
            attractor_weight: 1.0,
            alignment_threshold: 0.7,
            collapse_multiplier: 1.15,
            instant_weight: 0.7,
            compression: 0.72,
            decay_rate: 0.94,
            floor: 0.0,
            event_horizon_fear: 0.78,
            event_horizon_attractor: 0.5,
            fast_sleep_secs: 10,
            slow_sleep_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LawConfig {
    /// Law I: maximum fear rise per tick
    pub fear_jump_limit: f64,
    /// Law II: minimum fear for a NORMAL -> PANIC escalation
    pub escalation_floor: f64,
    /// Law III: entropy and crash coherence gates for PANIC
    pub panic_entropy_floor: f64,
    pub panic_coherence_floor: f64,
}

impl Default for LawConfig {
    fn default() -> Self {
        Self {
            fear_jump_limit: 0.20,
            escalation_floor: 0.40,
            panic_entropy_floor: 0.10,
            panic_coherence_floor: 0.35,
        }
    }
}

/// Host driver settings. Not consulted by the core.
#[derive(Debug, Clone)]
pub struct HostConfig {
    pub tick_path: String,
    pub state_path: String,
    pub seed: u64,
    /// Stop after this many ticks (0 = run forever)
    pub max_ticks: u64,
}

impl HostConfig {
    pub fn from_env() -> Self {
        Self {
            tick_path: std::env::var("PRANA_TICK_PATH").unwrap_or_else(|_| "state/coins_state.json".to_string()),
            state_path: std::env::var("PRANA_STATE_PATH").unwrap_or_else(|_| "state/state.json".to_string()),
            seed: env_or("PRANA_SEED", now_ts()),
            max_ticks: env_or("PRANA_MAX_TICKS", 0),
        }
    }
}

pub fn now_ts() -> u64 {
    chrono::Utc::now().timestamp() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_surface() {
        let cfg = PranaConfig::default();
        assert_eq!(cfg.baseline_window, 60);
        assert_eq!(cfg.pain_gate, 0.22);
        assert_eq!(cfg.pain_scale, 4.5);
        assert_eq!(cfg.rise, 0.12);
        assert_eq!(cfg.fall, 0.20);
        assert_eq!(cfg.shadow.samples, 12);
        assert_eq!(cfg.laws.fear_jump_limit, 0.20);
        assert_eq!(cfg.onchain.decay_rate, 0.94);
    }

    #[test]
    fn test_sanitize_bounds_window_and_samples() {
        let mut cfg = PranaConfig::default();
        cfg.baseline_window = 3;
        cfg.shadow.samples = 4;
        cfg.shadow.panic_threshold = 0.95;
        let cfg = cfg.sanitized();
        assert_eq!(cfg.baseline_window, MIN_BASELINE_WINDOW);
        assert_eq!(cfg.shadow.samples, MIN_SHADOW_SAMPLES);
        assert_eq!(cfg.shadow.panic_threshold, 0.72);

        let mut cfg = PranaConfig::default();
        cfg.baseline_window = 1_000_000;
        assert_eq!(cfg.sanitized().baseline_window, MAX_BASELINE_WINDOW);
    }

    #[test]
    fn test_sanitize_replaces_non_finite() {
        let mut cfg = PranaConfig::default();
        cfg.rise = f64::NAN;
        cfg.onchain.decay_rate = f64::INFINITY;
        let cfg = cfg.sanitized();
        assert_eq!(cfg.rise, 0.12);
        assert_eq!(cfg.onchain.decay_rate, 0.94);
    }
}
