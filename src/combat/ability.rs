//! Ability data consumed by scoring and resolution
//!
//! Abilities are opaque stat bags handed in with the roster. The combat
//! core scores and resolves them; it does not author them.

use serde::{Deserialize, Serialize};

use crate::combat::dice::Dice;
use crate::combat::status::StatusKind;

/// What resolving the ability does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbilityKind {
    Attack,
    Heal,
}

/// Damage classification, matched against unit weaknesses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DamageType {
    Physical,
    Fire,
    Poison,
    Arcane,
}

/// A status the ability inflicts on its target when it lands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRider {
    pub kind: StatusKind,
    pub duration: u8,
}

/// One usable ability
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ability {
    pub name: String,
    pub kind: AbilityKind,
    /// Range in hexes; 1 = melee
    pub range: u32,
    /// Area radius around the target hex; 0 = single target
    pub radius: u32,
    pub stamina_cost: i32,
    pub mana_cost: i32,
    pub power: Dice,
    pub damage_type: DamageType,
    pub applies: Option<StatusRider>,
}

impl Ability {
    pub fn is_melee(&self) -> bool {
        self.kind == AbilityKind::Attack && self.range <= 1
    }

    pub fn is_area(&self) -> bool {
        self.kind == AbilityKind::Attack && self.radius > 0
    }

    pub fn is_free(&self) -> bool {
        self.stamina_cost == 0 && self.mana_cost == 0
    }

    // Stock abilities used by the headless runner and tests. Real
    // content arrives with the roster.

    pub fn sword() -> Self {
        Self {
            name: "Sword".into(),
            kind: AbilityKind::Attack,
            range: 1,
            radius: 0,
            stamina_cost: 0,
            mana_cost: 0,
            power: Dice::new(1, 8, 0),
            damage_type: DamageType::Physical,
            applies: None,
        }
    }

    pub fn bow() -> Self {
        Self {
            name: "Bow".into(),
            kind: AbilityKind::Attack,
            range: 6,
            radius: 0,
            stamina_cost: 1,
            mana_cost: 0,
            power: Dice::new(1, 6, 0),
            damage_type: DamageType::Physical,
            applies: None,
        }
    }

    pub fn firebolt() -> Self {
        Self {
            name: "Firebolt".into(),
            kind: AbilityKind::Attack,
            range: 5,
            radius: 0,
            stamina_cost: 0,
            mana_cost: 2,
            power: Dice::new(1, 10, 0),
            damage_type: DamageType::Fire,
            applies: Some(StatusRider {
                kind: StatusKind::Burning,
                duration: 2,
            }),
        }
    }

    pub fn fireburst() -> Self {
        Self {
            name: "Fireburst".into(),
            kind: AbilityKind::Attack,
            range: 5,
            radius: 1,
            stamina_cost: 0,
            mana_cost: 4,
            power: Dice::new(2, 6, 0),
            damage_type: DamageType::Fire,
            applies: None,
        }
    }

    pub fn venom_dagger() -> Self {
        Self {
            name: "Venom Dagger".into(),
            kind: AbilityKind::Attack,
            range: 1,
            radius: 0,
            stamina_cost: 1,
            mana_cost: 0,
            power: Dice::new(1, 4, 0),
            damage_type: DamageType::Poison,
            applies: Some(StatusRider {
                kind: StatusKind::Poisoned,
                duration: 3,
            }),
        }
    }

    pub fn mend() -> Self {
        Self {
            name: "Mend".into(),
            kind: AbilityKind::Heal,
            range: 3,
            radius: 0,
            stamina_cost: 0,
            mana_cost: 2,
            power: Dice::new(1, 8, 2),
            damage_type: DamageType::Arcane,
            applies: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_melee_classification() {
        assert!(Ability::sword().is_melee());
        assert!(!Ability::bow().is_melee());
        assert!(!Ability::mend().is_melee());
    }

    #[test]
    fn test_area_classification() {
        assert!(Ability::fireburst().is_area());
        assert!(!Ability::firebolt().is_area());
    }

    #[test]
    fn test_free_abilities() {
        assert!(Ability::sword().is_free());
        assert!(!Ability::firebolt().is_free());
    }
}
