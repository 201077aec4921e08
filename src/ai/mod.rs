//! Decision engine for non-player units
//!
//! One shared utility-scoring core; intelligence tiers differ only by
//! stochastic perturbation and by how long their priority rule list is.
//! The captain command layer nudges ally scores through a compliance
//! check; it never overrides a unit outright.

pub mod captain;
pub mod decision;
pub mod scoring;
pub mod tier;

pub use captain::{ActiveCommand, CaptainCommand, Compliance};
pub use decision::{plan_turn, DecisionContext, TurnPlan};
pub use tier::IntelTier;
