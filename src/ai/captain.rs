//! Captain command layer
//!
//! The ally with the best leadership score is captain for the whole
//! encounter. Commands set a temporary additive bias on the captain
//! scoring terms of allies that pass an independent compliance roll;
//! failing units fight on unbiased, and demoralized failures turn
//! erratic instead.

use ahash::AHashMap;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::combat::unit::CombatUnit;
use crate::core::config::EncounterConfig;
use crate::core::types::{Team, UnitId};
use crate::grid::hex::HexCoord;

/// Orders a captain can issue
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CaptainCommand {
    FocusFire(UnitId),
    DefensiveFormation,
    SpreadOut,
    RetreatTo(HexCoord),
    ConserveResources,
}

/// Per-unit outcome of the compliance roll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Compliance {
    /// Bias applies
    Follows,
    /// Unit scores with no bias, normal AI
    Ignores,
    /// Low-morale failure: negative bias, prone to disengaging
    Erratic,
}

/// The currently active command plus each ally's compliance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveCommand {
    pub command: CaptainCommand,
    pub compliance: AHashMap<UnitId, Compliance>,
}

impl ActiveCommand {
    pub fn compliance_of(&self, unit: UnitId) -> Compliance {
        self.compliance
            .get(&unit)
            .copied()
            .unwrap_or(Compliance::Ignores)
    }

    /// Captain-term sub-score for this unit: the configured bias when it
    /// follows, the erratic penalty when it broke down, zero otherwise.
    pub fn bias_for(&self, unit: UnitId, config: &EncounterConfig) -> f32 {
        match self.compliance_of(unit) {
            Compliance::Follows => config.captain_bias,
            Compliance::Erratic => config.erratic_bias,
            Compliance::Ignores => 0.0,
        }
    }
}

/// Leadership score used for captain designation
pub fn leadership_score(unit: &CombatUnit) -> i32 {
    (unit.attributes.intelligence + unit.attributes.charisma) / 2
}

/// Pick the captain: the living ally with the highest leadership score,
/// ties broken by lowest unit id. Fixed for the encounter.
pub fn designate_captain(units: &[CombatUnit]) -> Option<UnitId> {
    units
        .iter()
        .filter(|u| u.team == Team::Ally && u.alive())
        .max_by(|a, b| {
            leadership_score(a)
                .cmp(&leadership_score(b))
                .then(b.id.cmp(&a.id))
        })
        .map(|u| u.id)
}

/// Success threshold for the compliance roll, compared against a
/// uniform 0-100 roll.
pub fn compliance_threshold(unit: &CombatUnit, captain_charisma: i32) -> i32 {
    captain_charisma * 5 + unit.morale + unit.relationship - unit.stress
}

/// Roll compliance for one unit. Failure with morale under the erratic
/// floor degrades into erratic behavior rather than plain independence.
pub fn roll_compliance(
    unit: &CombatUnit,
    captain_charisma: i32,
    config: &EncounterConfig,
    rng: &mut impl Rng,
) -> Compliance {
    let threshold = compliance_threshold(unit, captain_charisma);
    let roll = rng.gen_range(0..100);
    if roll < threshold {
        Compliance::Follows
    } else if unit.morale < config.erratic_morale_floor {
        Compliance::Erratic
    } else {
        Compliance::Ignores
    }
}
