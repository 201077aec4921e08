//! Inbound participants and the live combat unit wrapper
//!
//! A `Participant` is the stat block the roster collaborator hands in; a
//! `CombatUnit` is the encounter-local mutable wrapper built from it.
//! Combat units are owned exclusively by the session arena and written
//! back to the roster once, after the encounter ends.

use serde::{Deserialize, Serialize};

use crate::combat::ability::{Ability, AbilityKind, DamageType};
use crate::combat::status::{StatusEffect, StatusKind};
use crate::core::types::{Team, UnitId};
use crate::grid::hex::HexCoord;

/// Flat damage soaked per hit while Shielded
pub const SHIELD_REDUCTION: i32 = 3;
/// Defense bonus while Defending
pub const DEFENDING_BONUS: i32 = 2;

/// Primary attributes, 1-20 scale
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Attributes {
    pub strength: i32,
    pub dexterity: i32,
    pub intelligence: i32,
    pub charisma: i32,
}

impl Attributes {
    /// d20-style modifier: (score - 10) / 2, rounded toward -inf
    pub fn modifier(score: i32) -> i32 {
        (score - 10).div_euclid(2)
    }

    pub fn dex_mod(&self) -> i32 {
        Self::modifier(self.dexterity)
    }

    pub fn str_mod(&self) -> i32 {
        Self::modifier(self.strength)
    }
}

impl Default for Attributes {
    fn default() -> Self {
        Self {
            strength: 10,
            dexterity: 10,
            intelligence: 10,
            charisma: 10,
        }
    }
}

/// Roster stat block consumed once at encounter setup and written back
/// once after it ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub id: UnitId,
    pub name: String,
    pub team: Team,
    pub attributes: Attributes,
    pub max_hp: i32,
    pub hp: i32,
    pub max_stamina: i32,
    pub stamina: i32,
    pub max_mana: i32,
    pub mana: i32,
    pub position: HexCoord,
    pub abilities: Vec<Ability>,
    pub weaknesses: Vec<DamageType>,
    pub alive: bool,
    pub elite: bool,
    pub player_controlled: bool,
    pub morale: i32,
    /// Relationship with the encounter's captain, -50..=50
    pub relationship: i32,
    /// Movement budget per turn, in open-terrain hexes
    pub speed: u32,
}

impl Participant {
    pub fn new(name: impl Into<String>, team: Team, position: HexCoord) -> Self {
        Self {
            id: UnitId::new(),
            name: name.into(),
            team,
            attributes: Attributes::default(),
            max_hp: 20,
            hp: 20,
            max_stamina: 10,
            stamina: 10,
            max_mana: 10,
            mana: 10,
            position,
            abilities: vec![Ability::sword()],
            weaknesses: Vec::new(),
            alive: true,
            elite: false,
            player_controlled: false,
            morale: 60,
            relationship: 0,
            speed: 3,
        }
    }
}

/// Live per-encounter unit state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombatUnit {
    pub id: UnitId,
    pub name: String,
    pub team: Team,
    pub attributes: Attributes,

    pub hp: i32,
    pub max_hp: i32,
    pub stamina: i32,
    pub max_stamina: i32,
    pub mana: i32,
    pub max_mana: i32,

    pub position: HexCoord,
    pub statuses: Vec<StatusEffect>,

    pub initiative: i32,
    pub tiebreaker: u32,

    pub moved: bool,
    pub acted: bool,
    pub acted_this_round: bool,

    pub morale: i32,
    pub stress: i32,
    pub relationship: i32,

    pub elite: bool,
    pub player_controlled: bool,
    pub abilities: Vec<Ability>,
    pub weaknesses: Vec<DamageType>,
    pub speed: u32,
}

impl CombatUnit {
    pub fn from_participant(p: &Participant) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            team: p.team,
            attributes: p.attributes,
            hp: p.hp.min(p.max_hp),
            max_hp: p.max_hp,
            stamina: p.stamina.min(p.max_stamina),
            max_stamina: p.max_stamina,
            mana: p.mana.min(p.max_mana),
            max_mana: p.max_mana,
            position: p.position,
            statuses: Vec::new(),
            initiative: 0,
            tiebreaker: 0,
            moved: false,
            acted: false,
            acted_this_round: false,
            morale: p.morale,
            stress: 0,
            relationship: p.relationship,
            elite: p.elite,
            player_controlled: p.player_controlled,
            abilities: p.abilities.clone(),
            weaknesses: p.weaknesses.clone(),
            speed: p.speed,
        }
    }

    /// The one authoritative alive predicate
    pub fn alive(&self) -> bool {
        self.hp > 0
    }

    pub fn hp_fraction(&self) -> f32 {
        if self.max_hp <= 0 {
            return 0.0;
        }
        (self.hp.max(0) as f32) / (self.max_hp as f32)
    }

    /// The single HP-reduction path. Applies shield soak, clamps at
    /// zero, and returns the damage actually dealt. Death marking is the
    /// turn engine's job; callers check `alive()` after this.
    pub fn apply_damage(&mut self, amount: i32) -> i32 {
        let mut amount = amount;
        if self.has_status(StatusKind::Shielded) {
            amount -= SHIELD_REDUCTION;
        }
        let amount = amount.max(0).min(self.hp);
        self.hp -= amount;
        amount
    }

    /// The single healing path; returns HP actually restored
    pub fn heal(&mut self, amount: i32) -> i32 {
        let amount = amount.max(0).min(self.max_hp - self.hp);
        self.hp += amount;
        amount
    }

    pub fn has_status(&self, kind: StatusKind) -> bool {
        self.statuses.iter().any(|s| s.kind == kind)
    }

    pub fn status_duration(&self, kind: StatusKind) -> Option<u8> {
        self.statuses
            .iter()
            .find(|s| s.kind == kind)
            .map(|s| s.remaining)
    }

    /// Apply a status. At most one instance per kind; re-application
    /// keeps the longer remaining duration, never the sum.
    pub fn apply_status(&mut self, kind: StatusKind, duration: u8) {
        if let Some(existing) = self.statuses.iter_mut().find(|s| s.kind == kind) {
            existing.remaining = existing.remaining.max(duration);
        } else {
            self.statuses.push(StatusEffect::new(kind, duration));
        }
    }

    /// Armor-class style defense target
    pub fn defense(&self) -> i32 {
        let mut defense = 10 + self.attributes.dex_mod();
        if self.has_status(StatusKind::Defending) {
            defense += DEFENDING_BONUS;
        }
        defense
    }

    /// To-hit bonus when swinging the given ability
    pub fn attack_bonus(&self, ability: &Ability) -> i32 {
        if ability.is_melee() {
            self.attributes.str_mod()
        } else {
            self.attributes.dex_mod()
        }
    }

    pub fn can_pay(&self, ability: &Ability) -> bool {
        self.stamina >= ability.stamina_cost && self.mana >= ability.mana_cost
    }

    pub fn pay_costs(&mut self, ability: &Ability) {
        self.stamina -= ability.stamina_cost;
        self.mana -= ability.mana_cost;
    }

    /// Affordable attack abilities, in roster order
    pub fn usable_attacks(&self) -> impl Iterator<Item = (usize, &Ability)> {
        self.abilities
            .iter()
            .enumerate()
            .filter(|(_, a)| a.kind == AbilityKind::Attack && self.can_pay(a))
    }

    /// Affordable healing ability, if any
    pub fn usable_heal(&self) -> Option<(usize, &Ability)> {
        self.abilities
            .iter()
            .enumerate()
            .find(|(_, a)| a.kind == AbilityKind::Heal && self.can_pay(a))
    }

    /// Rough danger estimate used by threat scoring: best single-hit
    /// damage this unit can put out.
    pub fn threat_power(&self) -> i32 {
        self.abilities
            .iter()
            .filter(|a| a.kind == AbilityKind::Attack)
            .map(|a| a.power.max() + self.attack_bonus(a))
            .max()
            .unwrap_or(0)
    }

    pub fn reset_turn_flags(&mut self) {
        self.moved = false;
        self.acted = false;
    }

    pub fn reset_round_flags(&mut self) {
        self.acted_this_round = false;
    }
}

#[cfg(test)]
pub mod test_support {
    use super::*;

    /// A plain sword-and-board unit for unit tests
    pub fn sample_unit(team: Team) -> CombatUnit {
        let p = Participant::new("fixture", team, HexCoord::new(0, 0));
        CombatUnit::from_participant(&p)
    }
}
