//! Status effects: duration bookkeeping and over-time ticks
//!
//! Ticks run at the start of the owning unit's turn, always in
//! `TICK_ORDER`. An effect whose duration hits zero is removed first and
//! its final tick still applies.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::combat::dice::Dice;
use crate::combat::unit::CombatUnit;

/// Status effect kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusKind {
    Poisoned,
    Burning,
    Stunned,
    Hasted,
    Defending,
    Shielded,
}

/// Fixed evaluation order for start-of-turn ticks. Poison resolves
/// before burn; the non-damaging kinds only count down.
pub const TICK_ORDER: [StatusKind; 6] = [
    StatusKind::Poisoned,
    StatusKind::Burning,
    StatusKind::Stunned,
    StatusKind::Hasted,
    StatusKind::Defending,
    StatusKind::Shielded,
];

impl StatusKind {
    /// Damage dice applied each tick, for the over-time kinds
    pub fn tick_damage(&self) -> Option<Dice> {
        match self {
            StatusKind::Poisoned => Some(Dice::new(1, 4, 0)),
            StatusKind::Burning => Some(Dice::new(1, 6, 0)),
            _ => None,
        }
    }
}

/// An active status on a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEffect {
    pub kind: StatusKind,
    pub remaining: u8,
}

impl StatusEffect {
    pub fn new(kind: StatusKind, duration: u8) -> Self {
        Self {
            kind,
            remaining: duration,
        }
    }
}

/// Outcome of one status tick, reported back to the turn engine
#[derive(Debug, Clone, Copy)]
pub struct StatusTick {
    pub kind: StatusKind,
    pub damage: i32,
    pub expired: bool,
}

/// Run start-of-turn status bookkeeping for one unit.
///
/// Damage flows through `CombatUnit::apply_damage`, the same path direct
/// attacks use, so "alive" has one authoritative definition. The caller
/// checks for death after this returns.
pub fn tick_start_of_turn(unit: &mut CombatUnit, rng: &mut impl Rng) -> Vec<StatusTick> {
    let mut results = Vec::new();

    for kind in TICK_ORDER {
        let Some(idx) = unit.statuses.iter().position(|s| s.kind == kind) else {
            continue;
        };

        unit.statuses[idx].remaining = unit.statuses[idx].remaining.saturating_sub(1);
        let expired = unit.statuses[idx].remaining == 0;
        if expired {
            unit.statuses.remove(idx);
        }

        let damage = match kind.tick_damage() {
            Some(dice) => {
                let amount = dice.roll(rng);
                unit.apply_damage(amount)
            }
            None => 0,
        };

        results.push(StatusTick {
            kind,
            damage,
            expired,
        });

        if !unit.alive() {
            break;
        }
    }

    results
}
