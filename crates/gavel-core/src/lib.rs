//! Core types, the strike store abstraction and the strike decay evaluator.
//!
//! No HTTP or database dependencies live here. Storage backends implement
//! [`store::StrikeStore`]; the command layer talks to
//! [`moderation::ModerationService`].

pub mod error;
pub mod escalation;
pub mod evaluator;
pub mod lookup;
pub mod moderation;
pub mod policy;
pub mod store;
pub mod strike;

pub use error::{Error, Result};
pub use evaluator::{StrikeEvaluator, evaluate_active_strikes};
pub use policy::{ESCALATION_THRESHOLD, MUTE_THRESHOLD};

#[cfg(test)]
mod tests;
