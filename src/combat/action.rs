//! Combat actions and hit resolution
//!
//! Pure resolution helpers in the style of the rest of the combat math:
//! compute a result struct, let the session apply it.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::combat::ability::Ability;
use crate::combat::dice::d20;
use crate::combat::unit::CombatUnit;
use crate::core::types::UnitId;
use crate::grid::hex::HexCoord;

/// Weakness hits land half again as hard
const WEAKNESS_MULTIPLIER_NUM: i32 = 3;
const WEAKNESS_MULTIPLIER_DEN: i32 = 2;

/// Attack cover translates into up to +4 defense
const COVER_DEFENSE_SCALE: f32 = 4.0;

/// One action taken on a unit's turn
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CombatAction {
    UseAbility {
        ability: usize,
        target: AbilityTarget,
    },
    MoveTo(HexCoord),
    Defend,
    Pass,
}

/// What an ability is aimed at
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AbilityTarget {
    Unit(UnitId),
    Hex(HexCoord),
}

/// Outcome of a to-hit roll
#[derive(Debug, Clone, Copy)]
pub struct AttackRoll {
    pub hit: bool,
    pub critical: bool,
}

/// Roll to hit: natural 20 always hits and crits, natural 1 always
/// misses, otherwise d20 + attack bonus against defense + cover.
pub fn attack_roll(
    attacker: &CombatUnit,
    defender: &CombatUnit,
    ability: &Ability,
    cover: f32,
    rng: &mut impl Rng,
) -> AttackRoll {
    let roll = d20(rng);
    if roll == 20 {
        return AttackRoll {
            hit: true,
            critical: true,
        };
    }
    if roll == 1 {
        return AttackRoll {
            hit: false,
            critical: false,
        };
    }

    let cover_bonus = (cover * COVER_DEFENSE_SCALE) as i32;
    let hit = roll + attacker.attack_bonus(ability) >= defender.defense() + cover_bonus;
    AttackRoll {
        hit,
        critical: false,
    }
}

/// Roll damage for a landed hit. Criticals roll the dice twice;
/// weakness matches scale the total up.
pub fn damage_roll(
    attacker: &CombatUnit,
    defender: &CombatUnit,
    ability: &Ability,
    critical: bool,
    rng: &mut impl Rng,
) -> i32 {
    let mut damage = ability.power.roll(rng);
    if critical {
        damage += ability.power.roll(rng);
    }
    damage += attacker.attack_bonus(ability).max(0);

    if defender.weaknesses.contains(&ability.damage_type) {
        damage = damage * WEAKNESS_MULTIPLIER_NUM / WEAKNESS_MULTIPLIER_DEN;
    }
    damage.max(0)
}
