//! Transition legality checks.

pub mod laws;

pub use laws::{assert_prana_laws, Law, LawViolation};
