//! Utility scoring for targets, abilities, and positions
//!
//! One scoring function per decision category. Every sub-score is
//! normalized into [0, 1] and combined with the configured weights, so
//! composite scores land in [0, 1] as well and tier noise fractions
//! stay meaningful.

use crate::ai::captain::{ActiveCommand, CaptainCommand};
use crate::combat::ability::{Ability, AbilityKind};
use crate::combat::unit::CombatUnit;
use crate::core::config::EncounterConfig;
use crate::core::types::{Team, UnitId};
use crate::grid::hex::HexCoord;
use crate::grid::map::Battlefield;

/// Threat power at or above this saturates the threat sub-score
const THREAT_CEILING: f32 = 20.0;
/// Enemy or ally counts saturate party-need sub-scores at this many
const PARTY_CEILING: f32 = 4.0;
/// Distance at which retreat safety saturates
const SAFE_DISTANCE: f32 = 6.0;
/// Distance at which objective progress bottoms out
const OBJECTIVE_HORIZON: f32 = 10.0;

fn living<'a>(units: &'a [CombatUnit], team: Team) -> impl Iterator<Item = &'a CombatUnit> {
    units.iter().filter(move |u| u.team == team && u.alive())
}

fn command_bias(
    command: Option<&ActiveCommand>,
    unit: UnitId,
    config: &EncounterConfig,
) -> (Option<CaptainCommand>, f32) {
    match command {
        Some(active) => (Some(active.command), active.bias_for(unit, config)),
        None => (None, 0.0),
    }
}

/// Score `target` as the recipient of `ability` thrown by `actor`.
pub fn score_target(
    actor: &CombatUnit,
    target: &CombatUnit,
    ability: &Ability,
    command: Option<&ActiveCommand>,
    config: &EncounterConfig,
) -> f32 {
    let w = &config.target_weights;

    let threat = (target.threat_power() as f32 / THREAT_CEILING).clamp(0.0, 1.0);
    let low_hp = 1.0 - target.hp_fraction();

    let dist = actor.position.distance(target.position);
    let in_range = if dist <= ability.range {
        1.0
    } else if dist <= ability.range + actor.speed {
        0.5
    } else {
        0.0
    };

    let weakness = if target.weaknesses.contains(&ability.damage_type) {
        1.0
    } else {
        0.0
    };

    let (active, bias) = command_bias(command, actor.id, config);
    let captain = match active {
        Some(CaptainCommand::FocusFire(focus)) if focus == target.id => bias,
        _ => 0.0,
    };

    w.threat * threat
        + w.low_hp * low_hp
        + w.in_range * in_range
        + w.weakness * weakness
        + w.captain_priority * captain
}

/// Best center for an area ability: the living enemy position covering
/// the most living enemies within the blast radius.
pub fn best_area_center(
    actor: &CombatUnit,
    ability: &Ability,
    units: &[CombatUnit],
) -> Option<(HexCoord, usize)> {
    let hostile = actor.team.opponent();
    living(units, hostile)
        .map(|center| {
            let caught = living(units, hostile)
                .filter(|e| e.position.distance(center.position) <= ability.radius)
                .count();
            (center.position, caught)
        })
        .max_by_key(|&(pos, caught)| (caught, std::cmp::Reverse((pos.q, pos.r))))
}

/// Score using `ability` at all, independent of the specific target.
pub fn score_ability(
    actor: &CombatUnit,
    ability: &Ability,
    units: &[CombatUnit],
    command: Option<&ActiveCommand>,
    config: &EncounterConfig,
) -> f32 {
    let w = &config.ability_weights;
    let hostile = actor.team.opponent();

    let situational = match ability.kind {
        AbilityKind::Heal => living(units, actor.team)
            .map(|a| 1.0 - a.hp_fraction())
            .fold(0.0f32, f32::max),
        AbilityKind::Attack if ability.is_area() => best_area_center(actor, ability, units)
            .map(|(_, caught)| (caught as f32 / PARTY_CEILING).clamp(0.0, 1.0))
            .unwrap_or(0.0),
        AbilityKind::Attack => {
            let reach = ability.range + actor.speed;
            if living(units, hostile).any(|e| actor.position.distance(e.position) <= reach) {
                1.0
            } else {
                0.3
            }
        }
    };

    let resource_efficiency = if ability.is_free() {
        1.0
    } else {
        let cost = (ability.stamina_cost + ability.mana_cost) as f32;
        let available = (actor.stamina + actor.mana).max(1) as f32;
        (1.0 - cost / available).clamp(0.0, 1.0)
    };

    let party_need = match ability.kind {
        AbilityKind::Heal => {
            let allies = living(units, actor.team).count().max(1);
            let injured = living(units, actor.team)
                .filter(|a| a.hp_fraction() < 0.5)
                .count();
            injured as f32 / allies as f32
        }
        AbilityKind::Attack => {
            (living(units, hostile).count() as f32 / PARTY_CEILING).clamp(0.0, 1.0)
        }
    };

    let self_preservation = match ability.kind {
        AbilityKind::Heal => 1.0 - actor.hp_fraction(),
        AbilityKind::Attack => actor.hp_fraction(),
    };

    let (active, bias) = command_bias(command, actor.id, config);
    let captain = match active {
        Some(CaptainCommand::ConserveResources) if ability.is_free() => bias,
        _ => 0.0,
    };

    w.situational * situational
        + w.resource_efficiency * resource_efficiency
        + w.party_need * party_need
        + w.self_preservation * self_preservation
        + w.captain_directive * captain
}

/// Score standing on `candidate` for `actor` this turn.
pub fn score_position(
    actor: &CombatUnit,
    candidate: HexCoord,
    units: &[CombatUnit],
    field: &Battlefield,
    command: Option<&ActiveCommand>,
    config: &EncounterConfig,
) -> f32 {
    let w = &config.position_weights;
    let hostile = actor.team.opponent();

    let cover = field.cover_at(candidate);

    let ally_positions: Vec<HexCoord> = living(units, actor.team)
        .filter(|a| a.id != actor.id)
        .map(|a| a.position)
        .collect();

    let flanking = if living(units, hostile).any(|enemy| {
        field.is_flanked(enemy.position, candidate, &ally_positions)
    }) {
        1.0
    } else {
        0.0
    };

    let near_allies = ally_positions
        .iter()
        .filter(|p| p.distance(candidate) <= 2)
        .count();
    let packed = (near_allies as f32 / 3.0).clamp(0.0, 1.0);

    let nearest_enemy = living(units, hostile)
        .map(|e| e.position.distance(candidate))
        .min();
    let retreat_safety = nearest_enemy
        .map(|d| (d as f32 / SAFE_DISTANCE).clamp(0.0, 1.0))
        .unwrap_or(1.0);

    let (active, bias) = command_bias(command, actor.id, config);

    // Spread-out inverts the clustering preference for compliant units
    let ally_proximity = match active {
        Some(CaptainCommand::SpreadOut) if bias > 0.0 => 1.0 - packed,
        _ => packed,
    };

    let objective = match active {
        Some(CaptainCommand::RetreatTo(hex)) if bias > 0.0 => Some(hex),
        _ => enemy_centroid(units, hostile),
    };
    let objective_distance = objective
        .map(|o| (1.0 - o.distance(candidate) as f32 / OBJECTIVE_HORIZON).clamp(0.0, 1.0))
        .unwrap_or(0.0);

    w.cover * cover
        + w.flanking * flanking
        + w.ally_proximity * ally_proximity
        + w.retreat_safety * retreat_safety
        + w.objective_distance * objective_distance
}

/// Mean position of the living units of `team`, rounded to a hex
pub fn enemy_centroid(units: &[CombatUnit], team: Team) -> Option<HexCoord> {
    let positions: Vec<HexCoord> = living(units, team).map(|u| u.position).collect();
    if positions.is_empty() {
        return None;
    }
    let n = positions.len() as i32;
    let q: i32 = positions.iter().map(|p| p.q).sum();
    let r: i32 = positions.iter().map(|p| p.r).sum();
    Some(HexCoord::new(q / n, r / n))
}
