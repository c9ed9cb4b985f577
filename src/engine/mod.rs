//! Simulation core.
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │  Price tick  │────►│  Recurrence  │────►│ Shadow/Neuro │
//! └──────────────┘     └──────────────┘     └──────────────┘
//!                                                  │
//!                                                  ▼
//!                      ┌──────────────┐     ┌──────────────┐
//!                      │ Law enforcer │◄────│  Bicameral   │
//!                      │  (verify/)   │     │   resolver   │
//!                      └──────────────┘     └──────────────┘
//! ```
//!
//! Everything here is synchronous and free of I/O apart from trace logging.
//! [`reducer::Organism`] owns the cross-tick memory; a host sharing it across
//! threads wraps it in a single mutex.

pub mod bicameral;
pub mod modulation;
pub mod neuro;
pub mod recurrence;
pub mod reducer;
pub mod shadow;
pub mod state;

pub use reducer::{Organism, StepOutput};
pub use state::{PranaState, ThreatLevel};
