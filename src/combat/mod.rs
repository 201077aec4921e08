//! Combat core: units, abilities, resolution, and the encounter loop

pub mod ability;
pub mod action;
pub mod dice;
pub mod events;
pub mod session;
pub mod stats;
pub mod status;
pub mod turns;
pub mod unit;

pub use ability::{Ability, AbilityKind, DamageType};
pub use action::{AbilityTarget, CombatAction};
pub use events::{CombatEvent, DeathCause, EventLog};
pub use session::CombatSession;
pub use stats::EncounterStats;
pub use status::{StatusEffect, StatusKind};
pub use turns::{EncounterResult, TurnPhase};
pub use unit::{Attributes, CombatUnit, Participant};
