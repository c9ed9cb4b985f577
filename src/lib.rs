//! PRANA: a fear/threat index simulated from market price snapshots.
//!
//! Each tick runs a stateful pipeline (signal extraction, stress
//! recurrence, shadow Monte Carlo, neurochemistry, bicameral conflict
//! resolution) with an independent on-chain chaos estimator feeding the
//! final fear through cross-talk. Transitions are validated by the laws in
//! [`verify`].

pub mod engine;
pub mod logging;
pub mod onchain;
pub mod signals;
pub mod state;
pub mod storage;
pub mod subconscious;
pub mod verify;
