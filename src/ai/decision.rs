//! Turn planning: tier-dispatched priority rules over utility scores
//!
//! `plan_turn` produces a movement-plus-action plan for one unit from a
//! read-only view of the encounter. The session applies the plan; no
//! state is mutated here.
//!
//! All tiers share the same scoring functions. Tiers differ in which
//! priority rules run before scoring and how much noise the selection
//! step injects. Low tier charges the nearest enemy, medium tier adds
//! healing, elite focus, and area fire, high tier adds flank
//! positioning and resource conservation with zero noise.

use ahash::AHashSet;
use rand::Rng;

use crate::ai::captain::{ActiveCommand, CaptainCommand, Compliance};
use crate::ai::scoring::{best_area_center, score_ability, score_position, score_target};
use crate::ai::tier::{select_best, IntelTier};
use crate::combat::ability::Ability;
use crate::combat::action::{AbilityTarget, CombatAction};
use crate::combat::unit::CombatUnit;
use crate::core::config::EncounterConfig;
use crate::core::types::UnitId;
use crate::grid::hex::HexCoord;
use crate::grid::map::Battlefield;

/// Chance per turn that an erratic unit disengages outright
const ERRATIC_DISENGAGE_CHANCE: f32 = 0.35;
/// High tier conserves costed abilities while no enemy is this close
const CONSERVE_DISTANCE: u32 = 2;

/// Read-only view handed to the planner
pub struct DecisionContext<'a> {
    pub actor: usize,
    pub units: &'a [CombatUnit],
    pub field: &'a Battlefield,
    pub command: Option<&'a ActiveCommand>,
    pub config: &'a EncounterConfig,
}

impl<'a> DecisionContext<'a> {
    pub fn actor(&self) -> &CombatUnit {
        &self.units[self.actor]
    }

    pub fn living_enemies(&self) -> impl Iterator<Item = &CombatUnit> {
        let hostile = self.actor().team.opponent();
        self.units.iter().filter(move |u| u.team == hostile && u.alive())
    }

    pub fn living_allies(&self) -> impl Iterator<Item = &CombatUnit> {
        let team = self.actor().team;
        let actor_id = self.actor().id;
        self.units
            .iter()
            .filter(move |u| u.team == team && u.alive() && u.id != actor_id)
    }

    /// Hexes blocked for movement: every living unit except the actor
    pub fn occupied(&self) -> AHashSet<HexCoord> {
        let actor_id = self.actor().id;
        self.units
            .iter()
            .filter(|u| u.alive() && u.id != actor_id)
            .map(|u| u.position)
            .collect()
    }

    pub fn nearest_enemy(&self) -> Option<&CombatUnit> {
        let pos = self.actor().position;
        self.living_enemies()
            .min_by_key(|e| (pos.distance(e.position), e.id))
    }

    fn unit(&self, id: UnitId) -> Option<&CombatUnit> {
        self.units.iter().find(|u| u.id == id)
    }

    fn noise_for(&self, tier: IntelTier) -> f32 {
        tier.noise_fraction(self.config.low_tier_noise, self.config.medium_tier_noise)
    }

    /// Can the actor hit `target_pos` with `ability` from `from`?
    /// Ranged abilities additionally need line of sight.
    fn can_reach(&self, from: HexCoord, target_pos: HexCoord, ability: &Ability) -> bool {
        from.distance(target_pos) <= ability.range
            && (ability.range <= 1 || self.field.has_line_of_sight(from, target_pos))
    }
}

/// One unit's plan for the turn. Movement resolves before the action.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnPlan {
    pub movement: Option<HexCoord>,
    pub action: CombatAction,
}

impl TurnPlan {
    fn stay(action: CombatAction) -> Self {
        Self {
            movement: None,
            action,
        }
    }

    fn pass() -> Self {
        Self::stay(CombatAction::Pass)
    }
}

/// Plan the active unit's turn.
pub fn plan_turn(ctx: &DecisionContext, rng: &mut impl Rng) -> TurnPlan {
    let actor = ctx.actor();

    if let Some(command) = ctx.command {
        if command.compliance_of(actor.id) == Compliance::Erratic
            && rng.gen::<f32>() < ERRATIC_DISENGAGE_CHANCE
        {
            return erratic_retreat(ctx);
        }
    }

    match IntelTier::from_intelligence(actor.attributes.intelligence) {
        IntelTier::Low => plan_low(ctx, rng),
        tier => plan_tactical(ctx, tier, rng),
    }
}

/// Erratic disengage: run from the nearest enemy and hunker down
fn erratic_retreat(ctx: &DecisionContext) -> TurnPlan {
    let actor = ctx.actor();
    let Some(threat) = ctx.nearest_enemy() else {
        return TurnPlan::stay(CombatAction::Defend);
    };
    let occupied = ctx.occupied();
    let movement = ctx
        .field
        .reachable(actor.position, actor.speed as f32, &occupied)
        .into_iter()
        .max_by_key(|c| (c.distance(threat.position), std::cmp::Reverse((c.q, c.r))))
        .filter(|c| c.distance(threat.position) > actor.position.distance(threat.position));
    TurnPlan {
        movement,
        action: CombatAction::Defend,
    }
}

/// Low tier: swing at whatever is in reach, otherwise charge the
/// nearest enemy. No healing, no repositioning subtlety.
fn plan_low(ctx: &DecisionContext, rng: &mut impl Rng) -> TurnPlan {
    let actor = ctx.actor();
    let noise = ctx.noise_for(IntelTier::Low);

    let Some((ability_idx, ability)) = actor.usable_attacks().next() else {
        return TurnPlan::pass();
    };

    if let Some(target) = pick_target(ctx, actor.position, ability, noise, rng) {
        return TurnPlan::stay(CombatAction::UseAbility {
            ability: ability_idx,
            target: AbilityTarget::Unit(target),
        });
    }

    let occupied = ctx.occupied();
    let Some(nearest) = ctx.nearest_enemy() else {
        // Nobody left to fight: wander
        let options = ctx
            .field
            .reachable(actor.position, actor.speed as f32, &occupied);
        let movement = if options.is_empty() {
            None
        } else {
            Some(options[rng.gen_range(0..options.len())])
        };
        return TurnPlan {
            movement,
            action: CombatAction::Pass,
        };
    };
    let movement =
        ctx.field
            .best_step_toward(actor.position, nearest.position, actor.speed as f32, &occupied);
    let from = movement.unwrap_or(actor.position);

    if let Some(target) = pick_target(ctx, from, ability, noise, rng) {
        return TurnPlan {
            movement,
            action: CombatAction::UseAbility {
                ability: ability_idx,
                target: AbilityTarget::Unit(target),
            },
        };
    }
    TurnPlan {
        movement,
        action: CombatAction::Pass,
    }
}

/// Medium and high tier: priority rules, then scored selection
fn plan_tactical(ctx: &DecisionContext, tier: IntelTier, rng: &mut impl Rng) -> TurnPlan {
    let actor = ctx.actor();
    let noise = ctx.noise_for(tier);

    if let Some(plan) = plan_healing(ctx) {
        return plan;
    }

    // Area fire on a cluster outranks scored ability selection
    for (idx, ability) in actor.usable_attacks().filter(|(_, a)| a.is_area()) {
        if let Some(plan) = plan_area(ctx, idx, ability) {
            return plan;
        }
    }

    let Some(ability_idx) = choose_attack(ctx, tier, noise, rng) else {
        return TurnPlan::stay(CombatAction::Defend);
    };
    let ability = &actor.abilities[ability_idx];

    plan_engage(ctx, tier, ability_idx, ability, noise, rng)
}

/// Self-heal and ally-heal priority rules
fn plan_healing(ctx: &DecisionContext) -> Option<TurnPlan> {
    let actor = ctx.actor();
    let (heal_idx, heal) = actor.usable_heal()?;

    if actor.hp_fraction() < ctx.config.self_heal_threshold {
        return Some(TurnPlan::stay(CombatAction::UseAbility {
            ability: heal_idx,
            target: AbilityTarget::Unit(actor.id),
        }));
    }

    let patient = ctx
        .living_allies()
        .filter(|a| a.hp_fraction() < ctx.config.ally_heal_threshold)
        .min_by_key(|a| (ordered_float::OrderedFloat(a.hp_fraction()), a.id))?;

    if ctx.can_reach(actor.position, patient.position, heal) {
        return Some(TurnPlan::stay(CombatAction::UseAbility {
            ability: heal_idx,
            target: AbilityTarget::Unit(patient.id),
        }));
    }

    // Close the gap toward the patient; heal next turn
    let occupied = ctx.occupied();
    let movement =
        ctx.field
            .best_step_toward(actor.position, patient.position, actor.speed as f32, &occupied)?;
    if ctx.can_reach(movement, patient.position, heal) {
        return Some(TurnPlan {
            movement: Some(movement),
            action: CombatAction::UseAbility {
                ability: heal_idx,
                target: AbilityTarget::Unit(patient.id),
            },
        });
    }
    Some(TurnPlan {
        movement: Some(movement),
        action: CombatAction::Defend,
    })
}

/// Pick a single-target attack by scored selection. High tier withholds
/// costed abilities while no enemy is in skirmish distance. Area
/// abilities only fire through the cluster rule.
fn choose_attack(
    ctx: &DecisionContext,
    tier: IntelTier,
    noise: f32,
    rng: &mut impl Rng,
) -> Option<usize> {
    let actor = ctx.actor();

    let conserve = tier == IntelTier::High
        && actor.hp_fraction() > 0.5
        && ctx
            .nearest_enemy()
            .map(|e| actor.position.distance(e.position) > CONSERVE_DISTANCE)
            .unwrap_or(true)
        && actor.usable_attacks().any(|(_, a)| a.is_free());

    let scored: Vec<(usize, f32)> = actor
        .usable_attacks()
        .filter(|(_, a)| !a.is_area() && (!conserve || a.is_free()))
        .map(|(idx, a)| (idx, score_ability(actor, a, ctx.units, ctx.command, ctx.config)))
        .collect();
    select_best(&scored, noise, rng)
}

/// Area fire when enough enemies bunch up inside the blast radius
fn plan_area(ctx: &DecisionContext, ability_idx: usize, ability: &Ability) -> Option<TurnPlan> {
    let actor = ctx.actor();
    let (center, caught) = best_area_center(actor, ability, ctx.units)?;
    if caught < ctx.config.cluster_size {
        return None;
    }

    if ctx.can_reach(actor.position, center, ability) {
        return Some(TurnPlan::stay(CombatAction::UseAbility {
            ability: ability_idx,
            target: AbilityTarget::Hex(center),
        }));
    }

    let occupied = ctx.occupied();
    let movement =
        ctx.field
            .best_step_toward(actor.position, center, actor.speed as f32, &occupied)?;
    if ctx.can_reach(movement, center, ability) {
        return Some(TurnPlan {
            movement: Some(movement),
            action: CombatAction::UseAbility {
                ability: ability_idx,
                target: AbilityTarget::Hex(center),
            },
        });
    }
    Some(TurnPlan {
        movement: Some(movement),
        action: CombatAction::Defend,
    })
}

/// Single-target engagement: choose a target, position, and swing
fn plan_engage(
    ctx: &DecisionContext,
    tier: IntelTier,
    ability_idx: usize,
    ability: &Ability,
    noise: f32,
    rng: &mut impl Rng,
) -> TurnPlan {
    let actor = ctx.actor();

    // Elite focus: when elites are on the field, they soak the targeting
    let elites_present = ctx.living_enemies().any(|e| e.elite);
    let scored: Vec<(UnitId, f32)> = ctx
        .living_enemies()
        .filter(|e| !elites_present || e.elite)
        .map(|e| (e.id, score_target(actor, e, ability, ctx.command, ctx.config)))
        .collect();
    let Some(target_id) = select_best(&scored, noise, rng) else {
        return TurnPlan::stay(CombatAction::Defend);
    };
    let Some(target) = ctx.unit(target_id) else {
        return TurnPlan::stay(CombatAction::Defend);
    };

    let occupied = ctx.occupied();

    // High-tier melee picks its adjacent hex for flanks and cover
    if tier == IntelTier::High && ability.is_melee() {
        let mut candidates: Vec<HexCoord> = ctx
            .field
            .reachable(actor.position, actor.speed as f32, &occupied)
            .into_iter()
            .filter(|c| c.is_adjacent(target.position))
            .collect();
        if actor.position.is_adjacent(target.position) {
            candidates.push(actor.position);
        }
        if let Some(best) = candidates.into_iter().max_by_key(|c| {
            (
                ordered_float::OrderedFloat(score_position(
                    actor, *c, ctx.units, ctx.field, ctx.command, ctx.config,
                )),
                std::cmp::Reverse((c.q, c.r)),
            )
        }) {
            let movement = (best != actor.position).then_some(best);
            return TurnPlan {
                movement,
                action: CombatAction::UseAbility {
                    ability: ability_idx,
                    target: AbilityTarget::Unit(target_id),
                },
            };
        }
    }

    if ctx.can_reach(actor.position, target.position, ability) {
        return TurnPlan::stay(CombatAction::UseAbility {
            ability: ability_idx,
            target: AbilityTarget::Unit(target_id),
        });
    }

    // Defensive formation: compliant units hold the line instead of
    // chasing targets they cannot reach this turn
    if let Some(command) = ctx.command {
        if command.command == CaptainCommand::DefensiveFormation
            && command.bias_for(actor.id, ctx.config) > 0.0
        {
            return TurnPlan::stay(CombatAction::Defend);
        }
    }

    let movement =
        ctx.field
            .best_step_toward(actor.position, target.position, actor.speed as f32, &occupied);
    let from = movement.unwrap_or(actor.position);
    let action = if ctx.can_reach(from, target.position, ability) {
        CombatAction::UseAbility {
            ability: ability_idx,
            target: AbilityTarget::Unit(target_id),
        }
    } else {
        CombatAction::Defend
    };
    TurnPlan { movement, action }
}

/// Targets hittable with `ability` from `from`, best first under noise
fn pick_target(
    ctx: &DecisionContext,
    from: HexCoord,
    ability: &Ability,
    noise: f32,
    rng: &mut impl Rng,
) -> Option<UnitId> {
    let actor = ctx.actor();
    let scored: Vec<(UnitId, f32)> = ctx
        .living_enemies()
        .filter(|e| ctx.can_reach(from, e.position, ability))
        .map(|e| (e.id, score_target(actor, e, ability, ctx.command, ctx.config)))
        .collect();
    select_best(&scored, noise, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::unit::test_support::sample_unit;
    use crate::core::types::Team;
    use ahash::AHashMap;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn context<'a>(
        actor: usize,
        units: &'a [CombatUnit],
        field: &'a Battlefield,
        config: &'a EncounterConfig,
    ) -> DecisionContext<'a> {
        DecisionContext {
            actor,
            units,
            field,
            command: None,
            config,
        }
    }

    #[test]
    fn test_low_tier_attacks_adjacent_enemy() {
        let config = EncounterConfig::default();
        let field = Battlefield::new(10, 10);
        let mut actor = sample_unit(Team::Ally);
        actor.attributes.intelligence = 6;
        actor.position = HexCoord::new(4, 4);
        let mut enemy = sample_unit(Team::Enemy);
        enemy.position = HexCoord::new(5, 4);
        let enemy_id = enemy.id;
        let units = vec![actor, enemy];

        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let plan = plan_turn(&context(0, &units, &field, &config), &mut rng);
        assert_eq!(plan.movement, None);
        assert_eq!(
            plan.action,
            CombatAction::UseAbility {
                ability: 0,
                target: AbilityTarget::Unit(enemy_id),
            }
        );
    }

    #[test]
    fn test_low_tier_charges_distant_enemy() {
        let config = EncounterConfig::default();
        let field = Battlefield::new(14, 14);
        let mut actor = sample_unit(Team::Ally);
        actor.attributes.intelligence = 6;
        actor.position = HexCoord::new(1, 5);
        let mut enemy = sample_unit(Team::Enemy);
        enemy.position = HexCoord::new(12, 5);
        let units = vec![actor, enemy];

        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let plan = plan_turn(&context(0, &units, &field, &config), &mut rng);
        let step = plan.movement.expect("should close the distance");
        assert!(step.distance(HexCoord::new(12, 5)) < HexCoord::new(1, 5).distance(HexCoord::new(12, 5)));
        assert_eq!(plan.action, CombatAction::Pass);
    }

    #[test]
    fn test_no_enemies_means_pass() {
        let config = EncounterConfig::default();
        let field = Battlefield::new(10, 10);
        let mut actor = sample_unit(Team::Ally);
        actor.attributes.intelligence = 6;
        let units = vec![actor];

        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let plan = plan_turn(&context(0, &units, &field, &config), &mut rng);
        assert_eq!(plan.action, CombatAction::Pass);
    }

    #[test]
    fn test_medium_tier_self_heals_when_critical() {
        let config = EncounterConfig::default();
        let field = Battlefield::new(10, 10);
        let mut actor = sample_unit(Team::Ally);
        actor.attributes.intelligence = 12;
        actor.abilities.push(Ability::mend());
        actor.hp = 4; // 20% of 20, under the 30% threshold
        let actor_id = actor.id;
        let mut enemy = sample_unit(Team::Enemy);
        enemy.position = HexCoord::new(5, 5);
        let units = vec![actor, enemy];

        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let plan = plan_turn(&context(0, &units, &field, &config), &mut rng);
        assert_eq!(
            plan.action,
            CombatAction::UseAbility {
                ability: 1,
                target: AbilityTarget::Unit(actor_id),
            }
        );
    }

    #[test]
    fn test_medium_tier_heals_dying_ally_in_range() {
        let config = EncounterConfig::default();
        let field = Battlefield::new(10, 10);
        let mut actor = sample_unit(Team::Ally);
        actor.attributes.intelligence = 12;
        actor.abilities.push(Ability::mend());
        actor.position = HexCoord::new(3, 3);
        let mut patient = sample_unit(Team::Ally);
        patient.hp = 3; // 15%, under the 20% ally threshold
        patient.position = HexCoord::new(4, 3);
        let patient_id = patient.id;
        let mut enemy = sample_unit(Team::Enemy);
        enemy.position = HexCoord::new(8, 8);
        let units = vec![actor, patient, enemy];

        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let plan = plan_turn(&context(0, &units, &field, &config), &mut rng);
        assert_eq!(
            plan.action,
            CombatAction::UseAbility {
                ability: 1,
                target: AbilityTarget::Unit(patient_id),
            }
        );
    }

    #[test]
    fn test_medium_tier_focuses_elite() {
        let config = EncounterConfig::default();
        let field = Battlefield::new(10, 10);
        let mut actor = sample_unit(Team::Ally);
        actor.attributes.intelligence = 12;
        actor.position = HexCoord::new(4, 4);
        let mut grunt = sample_unit(Team::Enemy);
        grunt.position = HexCoord::new(5, 4);
        let mut elite = sample_unit(Team::Enemy);
        elite.elite = true;
        elite.position = HexCoord::new(4, 5);
        let elite_id = elite.id;
        let units = vec![actor, grunt, elite];

        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let plan = plan_turn(&context(0, &units, &field, &config), &mut rng);
        match plan.action {
            CombatAction::UseAbility {
                target: AbilityTarget::Unit(id),
                ..
            } => assert_eq!(id, elite_id),
            other => panic!("expected attack on the elite, got {other:?}"),
        }
    }

    #[test]
    fn test_high_tier_uses_area_on_cluster() {
        let config = EncounterConfig::default();
        let field = Battlefield::new(12, 12);
        let mut actor = sample_unit(Team::Ally);
        actor.attributes.intelligence = 16;
        actor.abilities = vec![Ability::sword(), Ability::fireburst()];
        actor.position = HexCoord::new(3, 5);
        let mut units = vec![actor];
        for i in 0..3 {
            let mut e = sample_unit(Team::Enemy);
            e.position = HexCoord::new(6, 4 + i);
            units.push(e);
        }

        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let plan = plan_turn(&context(0, &units, &field, &config), &mut rng);
        match plan.action {
            CombatAction::UseAbility {
                ability: 1,
                target: AbilityTarget::Hex(_),
            } => {}
            other => panic!("expected area fire, got {other:?}"),
        }
    }

    #[test]
    fn test_high_tier_is_deterministic() {
        let config = EncounterConfig::default();
        let field = Battlefield::new(12, 12);
        let mut actor = sample_unit(Team::Ally);
        actor.attributes.intelligence = 18;
        actor.position = HexCoord::new(2, 6);
        let mut e1 = sample_unit(Team::Enemy);
        e1.position = HexCoord::new(8, 6);
        let mut e2 = sample_unit(Team::Enemy);
        e2.position = HexCoord::new(9, 3);
        let units = vec![actor, e1, e2];

        let mut rng_a = ChaCha8Rng::seed_from_u64(1);
        let mut rng_b = ChaCha8Rng::seed_from_u64(999);
        let ctx = context(0, &units, &field, &config);
        let plan_a = plan_turn(&ctx, &mut rng_a);
        let plan_b = plan_turn(&ctx, &mut rng_b);
        assert_eq!(plan_a, plan_b);
    }

    #[test]
    fn test_erratic_unit_can_disengage() {
        let config = EncounterConfig::default();
        let field = Battlefield::new(12, 12);
        let mut actor = sample_unit(Team::Ally);
        actor.attributes.intelligence = 12;
        actor.position = HexCoord::new(6, 6);
        let mut enemy = sample_unit(Team::Enemy);
        enemy.position = HexCoord::new(7, 6);
        let actor_id = actor.id;
        let units = vec![actor, enemy];

        let mut compliance = AHashMap::new();
        compliance.insert(actor_id, Compliance::Erratic);
        let command = ActiveCommand {
            command: crate::ai::captain::CaptainCommand::DefensiveFormation,
            compliance,
        };
        let ctx = DecisionContext {
            actor: 0,
            units: &units,
            field: &field,
            command: Some(&command),
            config: &config,
        };

        // Over many rolls the disengage branch must fire at least once
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let disengaged = (0..60).any(|_| {
            let plan = plan_turn(&ctx, &mut rng);
            plan.action == CombatAction::Defend && plan.movement.is_some()
        });
        assert!(disengaged);
    }
}
