//! On-chain chaos estimator.
//!
//! A secondary fear index computed from network vitals (gas velocity, MEV
//! activity, liquidity proximity). It runs beside the market pipeline and
//! feeds the assembled fear through a cross-talk weight.

pub mod divergence;
pub mod gravity;

pub use divergence::calculate_divergence;
pub use gravity::{ChaosEstimator, ChaosHistoryState, GravityReading, NetworkVitals};
