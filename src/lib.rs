//! Skirmish - turn-based tactical encounter core
//!
//! A party-vs-party combat simulation driven one unit-turn at a time.
//! The caller hands in rosters and a terrain selection, drives the
//! encounter with `step()`, and polls the phase/result and aggregate
//! statistics once a terminal state is reached. No persistence, no
//! rendering, no content authoring.

pub mod ai;
pub mod combat;
pub mod core;
pub mod grid;
