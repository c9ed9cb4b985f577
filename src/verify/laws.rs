use std::fmt;

use crate::engine::state::{PranaState, ThreatLevel};
use crate::state::LawConfig;

/// The slew limiter caps fear at `prev + limit`, and that sum can round one
/// ULP high: `(0.1 + 0.2) - 0.1 > 0.2`.
const JUMP_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Law {
    /// Fear may not rise faster than the jump limit
    FearContinuity,
    /// NORMAL may not escalate to PANIC or worse on weak fear
    EscalationFloor,
    /// PANIC needs either disorder or a coherent sell-off
    PanicEvidence,
    /// Threat labels climb one rank at a time
    OrderedEscalation,
}

impl Law {
    pub fn numeral(&self) -> &'static str {
        match self {
            Law::FearContinuity => "I",
            Law::EscalationFloor => "II",
            Law::PanicEvidence => "III",
            Law::OrderedEscalation => "IV",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LawViolation {
    pub law: Law,
    pub prev: PranaState,
    pub curr: PranaState,
    pub detail: String,
}

impl fmt::Display for LawViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "law {} violated: {} ({} {:.3} -> {} {:.3})",
            self.law.numeral(),
            self.detail,
            self.prev.threat_state.as_str(),
            self.prev.fear_index,
            self.curr.threat_state.as_str(),
            self.curr.fear_index,
        )
    }
}

impl std::error::Error for LawViolation {}

fn violation(law: Law, prev: &PranaState, curr: &PranaState, detail: String) -> LawViolation {
    LawViolation { law, prev: prev.clone(), curr: curr.clone(), detail }
}

/// Validate a transition. Pure; never corrects either state.
pub fn assert_prana_laws(prev: &PranaState, curr: &PranaState, cfg: &LawConfig) -> Result<(), LawViolation> {
    let jump = curr.fear_index - prev.fear_index;
    if jump > cfg.fear_jump_limit + JUMP_TOLERANCE {
        return Err(violation(
            Law::FearContinuity,
            prev,
            curr,
            format!("fear rose {:.3}, limit {:.3}", jump, cfg.fear_jump_limit),
        ));
    }

    if prev.threat_state == ThreatLevel::Normal
        && curr.threat_state >= ThreatLevel::Panic
        && curr.fear_index < cfg.escalation_floor
    {
        return Err(violation(
            Law::EscalationFloor,
            prev,
            curr,
            format!("escalation at fear {:.3} below floor {:.2}", curr.fear_index, cfg.escalation_floor),
        ));
    }

    if curr.threat_state == ThreatLevel::Panic
        && curr.system.entropy < cfg.panic_entropy_floor
        && curr.latent.crash_coherence < cfg.panic_coherence_floor
    {
        return Err(violation(
            Law::PanicEvidence,
            prev,
            curr,
            format!(
                "panic with entropy {:.3} and crash coherence {:.3}",
                curr.system.entropy, curr.latent.crash_coherence
            ),
        ));
    }

    if curr.threat_state.rank() > prev.threat_state.rank() + 1 {
        return Err(violation(
            Law::OrderedEscalation,
            prev,
            curr,
            format!("skipped from {} to {}", prev.threat_state.as_str(), curr.threat_state.as_str()),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::reducer::assemble_fear;
    use crate::state::PranaConfig;

    fn state(fear: f64, threat: ThreatLevel) -> PranaState {
        let mut s = PranaState { fear_index: fear, threat_state: threat, ..PranaState::default() };
        s.system.entropy = 0.3;
        s
    }

    #[test]
    fn test_legal_transition_passes() {
        let prev = state(0.30, ThreatLevel::Normal);
        let curr = state(0.45, ThreatLevel::Warning);
        assert!(assert_prana_laws(&prev, &curr, &LawConfig::default()).is_ok());
    }

    #[test]
    fn test_law_one_fear_jump() {
        let prev = state(0.10, ThreatLevel::Normal);
        let curr = state(0.31, ThreatLevel::Normal);
        let err = assert_prana_laws(&prev, &curr, &LawConfig::default()).unwrap_err();
        assert_eq!(err.law, Law::FearContinuity);
        assert_eq!(err.prev.fear_index, 0.10);
        assert_eq!(err.curr.fear_index, 0.31);

        // exactly at the limit is allowed
        let curr = state(0.30, ThreatLevel::Normal);
        assert!(assert_prana_laws(&prev, &curr, &LawConfig::default()).is_ok());
    }

    #[test]
    fn test_law_one_accepts_slew_capped_fear() {
        let cfg = PranaConfig::default();
        let capped = assemble_fear(0.9, None, 0.10, &cfg);
        assert!(capped - 0.10 > cfg.laws.fear_jump_limit);

        let prev = state(0.10, ThreatLevel::Normal);
        assert!(assert_prana_laws(&prev, &state(capped, ThreatLevel::Normal), &cfg.laws).is_ok());
        let over = state(0.10 + cfg.laws.fear_jump_limit + 1e-6, ThreatLevel::Normal);
        assert_eq!(assert_prana_laws(&prev, &over, &cfg.laws).unwrap_err().law, Law::FearContinuity);
    }

    #[test]
    fn test_law_two_rejects_weak_escalation() {
        let prev = state(0.30, ThreatLevel::Normal);
        let curr = state(0.35, ThreatLevel::Panic);
        let err = assert_prana_laws(&prev, &curr, &LawConfig::default()).unwrap_err();
        assert_eq!(err.law, Law::EscalationFloor);
        assert!(err.to_string().starts_with("law II violated"));
    }

    #[test]
    fn test_law_three_panic_needs_evidence() {
        let prev = state(0.50, ThreatLevel::Warning);
        let mut curr = state(0.60, ThreatLevel::Panic);
        curr.system.entropy = 0.05;
        curr.latent.crash_coherence = 0.1;
        let err = assert_prana_laws(&prev, &curr, &LawConfig::default()).unwrap_err();
        assert_eq!(err.law, Law::PanicEvidence);

        curr.latent.crash_coherence = 0.5;
        assert!(assert_prana_laws(&prev, &curr, &LawConfig::default()).is_ok());
    }

    #[test]
    fn test_law_four_rank_skip() {
        let prev = state(0.60, ThreatLevel::Warning);
        let curr = state(0.70, ThreatLevel::CrashImminent);
        let err = assert_prana_laws(&prev, &curr, &LawConfig::default()).unwrap_err();
        assert_eq!(err.law, Law::OrderedEscalation);

        // de-escalation may skip
        let prev = state(0.80, ThreatLevel::CrashImminent);
        let curr = state(0.20, ThreatLevel::Normal);
        assert!(assert_prana_laws(&prev, &curr, &LawConfig::default()).is_ok());
    }

    #[test]
    fn test_violation_lifts_into_anyhow() {
        let prev = state(0.10, ThreatLevel::Normal);
        let curr = state(0.90, ThreatLevel::Normal);
        let res: anyhow::Result<()> = assert_prana_laws(&prev, &curr, &LawConfig::default()).map_err(Into::into);
        assert!(res.is_err());
    }
}
