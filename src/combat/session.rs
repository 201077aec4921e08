//! Encounter orchestrator
//!
//! `CombatSession` owns the unit arena, the battlefield, the turn
//! engine, and one seeded RNG; every roll in the encounter flows through
//! that RNG, so a seed fully determines the outcome. `step` drives one
//! phase transition at a time and returns the events it fired; player
//! turns park the session until `submit_action` is called.

use ahash::{AHashMap, AHashSet};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::ai::captain::{
    designate_captain, roll_compliance, ActiveCommand, CaptainCommand, Compliance,
};
use crate::ai::decision::{plan_turn, DecisionContext, TurnPlan};
use crate::ai::tier::IntelTier;
use crate::combat::ability::{Ability, AbilityKind};
use crate::combat::action::{attack_roll, damage_roll, AbilityTarget, CombatAction};
use crate::combat::events::{CombatEvent, DeathCause, EventLog};
use crate::combat::stats::EncounterStats;
use crate::combat::status::{tick_start_of_turn, StatusKind};
use crate::combat::turns::{EncounterResult, TurnEngine, TurnPhase};
use crate::combat::unit::{CombatUnit, Participant};
use crate::core::config::EncounterConfig;
use crate::core::error::Result;
use crate::core::types::{Round, Team, UnitId};
use crate::grid::hex::HexCoord;
use crate::grid::map::Battlefield;
use crate::grid::terrain::TerrainPreset;

/// One party-versus-party encounter from setup to write-back
pub struct CombatSession {
    field: Battlefield,
    units: Vec<CombatUnit>,
    engine: TurnEngine,
    rng: ChaCha8Rng,
    config: EncounterConfig,
    stats: EncounterStats,
    captain: Option<UnitId>,
    command: Option<ActiveCommand>,
    history: Vec<(Round, CombatEvent)>,
    awaiting: Option<UnitId>,
    extra_used: bool,
}

impl CombatSession {
    /// Build an encounter from a roster. Dead roster entries are left
    /// out; a side with nobody standing resolves immediately.
    pub fn new(
        roster: &[Participant],
        preset: TerrainPreset,
        width: u32,
        height: u32,
        seed: u64,
        config: EncounterConfig,
    ) -> Result<Self> {
        config.validate()?;

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let field = Battlefield::generate(preset, width, height, &mut rng);

        let mut units = Vec::new();
        let mut occupied: AHashSet<HexCoord> = AHashSet::new();
        for p in roster.iter().filter(|p| p.alive && p.hp > 0) {
            let mut unit = CombatUnit::from_participant(p);
            let spot = field.nearest_free(unit.position, &occupied);
            occupied.insert(spot);
            unit.position = spot;
            units.push(unit);
        }

        let captain = designate_captain(&units);
        let mut engine = TurnEngine::new(config.max_rounds);
        let mut log = EventLog::new();
        engine.setup(&mut units, &mut rng, &mut log);

        tracing::info!(
            seed,
            allies = units.iter().filter(|u| u.team == Team::Ally).count(),
            enemies = units.iter().filter(|u| u.team == Team::Enemy).count(),
            "encounter set up"
        );

        let mut session = Self {
            field,
            units,
            engine,
            rng,
            config,
            stats: EncounterStats::default(),
            captain,
            command: None,
            history: Vec::new(),
            awaiting: None,
            extra_used: false,
        };
        session.record(&log);
        Ok(session)
    }

    pub fn phase(&self) -> TurnPhase {
        self.engine.phase()
    }

    pub fn result(&self) -> Option<EncounterResult> {
        self.engine.result()
    }

    pub fn round(&self) -> Round {
        self.engine.round()
    }

    pub fn stats(&self) -> &EncounterStats {
        &self.stats
    }

    pub fn units(&self) -> &[CombatUnit] {
        &self.units
    }

    pub fn field(&self) -> &Battlefield {
        &self.field
    }

    pub fn captain(&self) -> Option<UnitId> {
        self.captain
    }

    pub fn active_command(&self) -> Option<&ActiveCommand> {
        self.command.as_ref()
    }

    /// The player unit whose action the session is waiting on
    pub fn awaiting_unit(&self) -> Option<UnitId> {
        self.awaiting
    }

    /// Full event history with the round each event fired in
    pub fn history(&self) -> &[(Round, CombatEvent)] {
        &self.history
    }

    /// Drive one phase transition. Returns the events fired. A no-op
    /// while waiting on a player action or once the encounter is over.
    pub fn step(&mut self) -> EventLog {
        let mut log = EventLog::new();
        if self.awaiting.is_some() {
            return log;
        }
        match self.engine.phase() {
            TurnPhase::NotStarted | TurnPhase::RoundStart => {
                self.engine.start_round(&mut self.units, &mut log);
                // Counted at round start so a mid-round finish still
                // includes the round it happened in
                self.stats.rounds = self.engine.round();
            }
            TurnPhase::UnitTurn => self.drive_turn(&mut log),
            TurnPhase::RoundEnd => self.finish_round(&mut log),
            TurnPhase::Ended(_) => {}
        }
        self.record(&log);
        log
    }

    /// Resolve the parked player unit's submission. A `MoveTo` while the
    /// movement budget is unspent only moves and keeps the session parked
    /// for the action half of the turn, mirroring the AI's move-then-act
    /// plans; any other action finishes the turn. A no-op when no action
    /// is awaited.
    pub fn submit_action(&mut self, action: CombatAction) -> EventLog {
        let mut log = EventLog::new();
        let Some(id) = self.awaiting.take() else {
            return log;
        };
        let Some(idx) = self.index_of(id) else {
            return log;
        };

        if let CombatAction::MoveTo(dest) = action {
            if !self.units[idx].moved {
                self.resolve_move(idx, dest, &mut log);
                self.awaiting = Some(id);
                self.record(&log);
                return log;
            }
        }

        self.resolve_action(idx, action, &mut log);

        if self.hasted_extra_available(idx) {
            self.extra_used = true;
            self.engine.grant_extra_action(&mut self.units[idx]);
            log.push(CombatEvent::ExtraActionGranted { unit: id });
            self.awaiting = Some(id);
            self.record(&log);
            return log;
        }

        self.end_turn(idx, &mut log);
        self.record(&log);
        log
    }

    /// Issue a captain command. Every living ally other than the captain
    /// rolls compliance; the captain follows their own order.
    pub fn issue_command(&mut self, command: CaptainCommand) -> EventLog {
        let mut log = EventLog::new();
        self.issue(command, &mut log);
        self.record(&log);
        log
    }

    /// Run the encounter to its terminal result, passing on any player
    /// turns.
    pub fn run_to_completion(&mut self) -> EncounterResult {
        while !self.engine.is_finished() {
            if self.awaiting.is_some() {
                self.submit_action(CombatAction::Pass);
            } else {
                self.step();
            }
        }
        self.engine.result().unwrap_or(EncounterResult::Stalemate)
    }

    /// Write encounter outcomes back to the roster once. Survivors keep
    /// their remaining pools; the fallen are flagged dead.
    pub fn reconcile(&self, roster: &mut [Participant]) {
        for p in roster.iter_mut() {
            let Some(unit) = self.units.iter().find(|u| u.id == p.id) else {
                continue;
            };
            if unit.alive() {
                p.alive = true;
                p.hp = unit.hp;
                p.stamina = unit.stamina;
                p.mana = unit.mana;
                p.position = unit.position;
            } else {
                p.alive = false;
                p.hp = 0;
            }
        }
    }

    fn index_of(&self, id: UnitId) -> Option<usize> {
        self.units.iter().position(|u| u.id == id)
    }

    fn record(&mut self, log: &EventLog) {
        let round = self.engine.round();
        self.history
            .extend(log.events.iter().cloned().map(|e| (round, e)));
    }

    fn end_turn(&mut self, idx: usize, log: &mut EventLog) {
        log.push(CombatEvent::TurnEnded {
            unit: self.units[idx].id,
        });
        self.engine.advance_turn();
    }

    fn hasted_extra_available(&self, idx: usize) -> bool {
        !self.extra_used
            && self.units[idx].alive()
            && !self.engine.is_finished()
            && self.units[idx].has_status(StatusKind::Hasted)
    }

    /// One full unit turn: status ticks, stun check, then either a
    /// player hand-off or an AI plan.
    fn drive_turn(&mut self, log: &mut EventLog) {
        let Some(idx) = self.engine.next_turn_index(&self.units) else {
            // Order exhausted; the phase has moved to RoundEnd
            return;
        };
        let id = self.units[idx].id;

        self.extra_used = false;
        self.units[idx].reset_turn_flags();
        log.push(CombatEvent::TurnStarted { unit: id });
        self.stats.turns_elapsed += 1;

        let team = self.units[idx].team;
        let ticks = tick_start_of_turn(&mut self.units[idx], &mut self.rng);
        for tick in &ticks {
            if tick.damage > 0 {
                log.push(CombatEvent::StatusDamage {
                    unit: id,
                    kind: tick.kind,
                    damage: tick.damage,
                });
                self.stats.record_damage(team, tick.damage);
            }
            if tick.expired {
                log.push(CombatEvent::StatusExpired {
                    unit: id,
                    kind: tick.kind,
                });
            }
        }
        if !self.units[idx].alive() {
            self.engine
                .mark_dead(&self.units, id, DeathCause::DamageOverTime, &mut self.stats, log);
            self.end_turn(idx, log);
            return;
        }

        // An expiring stun still takes its final tick, so the skip is
        // decided from the tick results rather than the remaining status
        if ticks.iter().any(|t| t.kind == StatusKind::Stunned) {
            log.push(CombatEvent::TurnSkippedStunned { unit: id });
            self.end_turn(idx, log);
            return;
        }

        if self.units[idx].player_controlled {
            self.awaiting = Some(id);
            return;
        }

        self.maybe_issue_command(idx, log);

        let plan = self.plan_for(idx);
        self.resolve_plan(idx, plan, log);

        if self.hasted_extra_available(idx) {
            self.extra_used = true;
            self.engine.grant_extra_action(&mut self.units[idx]);
            log.push(CombatEvent::ExtraActionGranted { unit: id });
            let plan = self.plan_for(idx);
            // Movement is spent; only the action half of the plan runs
            self.resolve_action(idx, plan.action, log);
        }

        self.end_turn(idx, log);
    }

    fn finish_round(&mut self, log: &mut EventLog) {
        self.engine.end_round(&self.units, log);
        // Commands last a single round
        self.command = None;
    }

    /// A high-tier AI captain opens each round by calling a focus
    /// target when no command is active yet.
    fn maybe_issue_command(&mut self, idx: usize, log: &mut EventLog) {
        if self.command.is_some() {
            return;
        }
        let unit = &self.units[idx];
        if Some(unit.id) != self.captain
            || unit.player_controlled
            || IntelTier::from_intelligence(unit.attributes.intelligence) != IntelTier::High
        {
            return;
        }
        let focus = self
            .units
            .iter()
            .filter(|u| u.team == Team::Enemy && u.alive())
            .max_by_key(|u| (u.elite, u.threat_power(), std::cmp::Reverse(u.id)))
            .map(|u| u.id);
        if let Some(target) = focus {
            self.issue(CaptainCommand::FocusFire(target), log);
        }
    }

    fn issue(&mut self, command: CaptainCommand, log: &mut EventLog) {
        let Some(captain_id) = self.captain else {
            return;
        };
        let Some(captain_idx) = self.index_of(captain_id) else {
            return;
        };
        if !self.units[captain_idx].alive() {
            return;
        }
        let charisma = self.units[captain_idx].attributes.charisma;

        let mut compliance = AHashMap::new();
        compliance.insert(captain_id, Compliance::Follows);
        for i in 0..self.units.len() {
            let unit = &self.units[i];
            if unit.team != Team::Ally || !unit.alive() || unit.id == captain_id {
                continue;
            }
            let rolled = roll_compliance(unit, charisma, &self.config, &mut self.rng);
            if rolled != Compliance::Follows {
                log.push(CombatEvent::CommandRefused { unit: unit.id });
            }
            compliance.insert(unit.id, rolled);
        }

        tracing::debug!(?command, "captain command issued");
        log.push(CombatEvent::CommandIssued {
            captain: captain_id,
            command,
        });
        self.command = Some(ActiveCommand {
            command,
            compliance,
        });
    }

    fn plan_for(&mut self, idx: usize) -> TurnPlan {
        let command = if self.units[idx].team == Team::Ally {
            self.command.as_ref()
        } else {
            None
        };
        let ctx = DecisionContext {
            actor: idx,
            units: &self.units,
            field: &self.field,
            command,
            config: &self.config,
        };
        plan_turn(&ctx, &mut self.rng)
    }

    fn resolve_plan(&mut self, idx: usize, plan: TurnPlan, log: &mut EventLog) {
        if let Some(dest) = plan.movement {
            self.resolve_move(idx, dest, log);
        }
        self.resolve_action(idx, plan.action, log);
    }

    /// Validated movement: the destination must be reachable with the
    /// unit's budget around living occupants. Illegal moves are dropped.
    fn resolve_move(&mut self, idx: usize, dest: HexCoord, log: &mut EventLog) {
        let actor = &self.units[idx];
        if actor.moved {
            return;
        }
        let from = actor.position;
        let speed = actor.speed as f32;
        let occupied: AHashSet<HexCoord> = self
            .units
            .iter()
            .filter(|u| u.alive() && u.id != self.units[idx].id)
            .map(|u| u.position)
            .collect();
        if !self.field.reachable(from, speed, &occupied).contains(&dest) {
            return;
        }
        let id = self.units[idx].id;
        self.units[idx].position = dest;
        self.units[idx].moved = true;
        log.push(CombatEvent::UnitMoved {
            unit: id,
            from,
            to: dest,
        });
    }

    fn resolve_action(&mut self, idx: usize, action: CombatAction, log: &mut EventLog) {
        match action {
            CombatAction::Pass => {}
            CombatAction::MoveTo(dest) => {
                self.resolve_move(idx, dest, log);
            }
            CombatAction::Defend => {
                let id = self.units[idx].id;
                self.units[idx].apply_status(StatusKind::Defending, 1);
                log.push(CombatEvent::StatusApplied {
                    unit: id,
                    kind: StatusKind::Defending,
                    duration: 1,
                });
            }
            CombatAction::UseAbility { ability, target } => {
                self.resolve_ability(idx, ability, target, log);
            }
        }
        self.units[idx].acted = true;
        self.units[idx].acted_this_round = true;
    }

    fn in_range_with_los(&self, from: HexCoord, to: HexCoord, ability: &Ability) -> bool {
        from.distance(to) <= ability.range
            && (ability.range <= 1 || self.field.has_line_of_sight(from, to))
    }

    /// Validated ability resolution. Illegal usages (unknown index,
    /// unaffordable, wrong target kind, out of range) are dropped
    /// without paying costs.
    fn resolve_ability(
        &mut self,
        idx: usize,
        ability_idx: usize,
        target: AbilityTarget,
        log: &mut EventLog,
    ) {
        let Some(ability) = self.units[idx].abilities.get(ability_idx).cloned() else {
            return;
        };
        if !self.units[idx].can_pay(&ability) {
            return;
        }

        match (ability.kind, target) {
            (AbilityKind::Heal, AbilityTarget::Unit(tid)) => {
                self.resolve_heal(idx, &ability, tid, log);
            }
            (AbilityKind::Attack, AbilityTarget::Hex(center)) if ability.is_area() => {
                self.resolve_area_attack(idx, &ability, center, log);
            }
            (AbilityKind::Attack, AbilityTarget::Unit(tid)) => {
                self.resolve_single_attack(idx, &ability, tid, log);
            }
            _ => {}
        }
    }

    fn resolve_heal(&mut self, idx: usize, ability: &Ability, tid: UnitId, log: &mut EventLog) {
        let Some(tidx) = self.index_of(tid) else {
            return;
        };
        if !self.units[tidx].alive() || self.units[tidx].team != self.units[idx].team {
            return;
        }
        if !self.in_range_with_los(self.units[idx].position, self.units[tidx].position, ability) {
            return;
        }

        self.units[idx].pay_costs(ability);
        self.stats.abilities_used += 1;

        let amount = ability.power.roll(&mut self.rng);
        let healed = self.units[tidx].heal(amount);
        self.stats.record_healing(self.units[idx].team, healed);
        log.push(CombatEvent::Healed {
            source: self.units[idx].id,
            target: tid,
            amount: healed,
        });
    }

    fn resolve_single_attack(
        &mut self,
        idx: usize,
        ability: &Ability,
        tid: UnitId,
        log: &mut EventLog,
    ) {
        let Some(tidx) = self.index_of(tid) else {
            return;
        };
        if !self.units[tidx].alive() || self.units[tidx].team == self.units[idx].team {
            return;
        }
        if !self.in_range_with_los(self.units[idx].position, self.units[tidx].position, ability) {
            return;
        }

        self.units[idx].pay_costs(ability);
        self.stats.abilities_used += 1;
        let attacker_id = self.units[idx].id;
        let attacker_team = self.units[idx].team;
        let victim_team = self.units[tidx].team;

        let cover = self.field.cover_at(self.units[tidx].position);
        let roll = attack_roll(&self.units[idx], &self.units[tidx], ability, cover, &mut self.rng);
        if !roll.hit {
            log.push(CombatEvent::AttackMissed {
                attacker: attacker_id,
                target: tid,
            });
            return;
        }

        let damage = damage_roll(
            &self.units[idx],
            &self.units[tidx],
            ability,
            roll.critical,
            &mut self.rng,
        );
        let dealt = self.units[tidx].apply_damage(damage);
        self.stats.record_damage(victim_team, dealt);
        if roll.critical {
            self.stats.record_crit(attacker_team);
        }
        log.push(CombatEvent::AttackHit {
            attacker: attacker_id,
            target: tid,
            damage: dealt,
            critical: roll.critical,
        });

        if self.units[tidx].alive() {
            if let Some(rider) = ability.applies {
                self.units[tidx].apply_status(rider.kind, rider.duration);
                log.push(CombatEvent::StatusApplied {
                    unit: tid,
                    kind: rider.kind,
                    duration: rider.duration,
                });
            }
        } else {
            self.engine
                .mark_dead(&self.units, tid, DeathCause::Attack, &mut self.stats, log);
        }
    }

    /// Area attacks hit every hostile inside the radius with a straight
    /// damage roll; no to-hit and no criticals.
    fn resolve_area_attack(
        &mut self,
        idx: usize,
        ability: &Ability,
        center: HexCoord,
        log: &mut EventLog,
    ) {
        if !self.in_range_with_los(self.units[idx].position, center, ability) {
            return;
        }

        self.units[idx].pay_costs(ability);
        self.stats.abilities_used += 1;
        let attacker_id = self.units[idx].id;
        let hostile = self.units[idx].team.opponent();

        let victims: Vec<usize> = self
            .units
            .iter()
            .enumerate()
            .filter(|(_, u)| {
                u.team == hostile && u.alive() && u.position.distance(center) <= ability.radius
            })
            .map(|(i, _)| i)
            .collect();

        for tidx in victims {
            let tid = self.units[tidx].id;
            let victim_team = self.units[tidx].team;
            let mut damage = ability.power.roll(&mut self.rng);
            if self.units[tidx].weaknesses.contains(&ability.damage_type) {
                damage = damage * 3 / 2;
            }
            let dealt = self.units[tidx].apply_damage(damage);
            self.stats.record_damage(victim_team, dealt);
            log.push(CombatEvent::AttackHit {
                attacker: attacker_id,
                target: tid,
                damage: dealt,
                critical: false,
            });

            if self.units[tidx].alive() {
                if let Some(rider) = ability.applies {
                    self.units[tidx].apply_status(rider.kind, rider.duration);
                    log.push(CombatEvent::StatusApplied {
                        unit: tid,
                        kind: rider.kind,
                        duration: rider.duration,
                    });
                }
            } else {
                self.engine
                    .mark_dead(&self.units, tid, DeathCause::Attack, &mut self.stats, log);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fighter(name: &str, team: Team, q: i32, r: i32) -> Participant {
        Participant::new(name, team, HexCoord::new(q, r))
    }

    fn duel_roster() -> Vec<Participant> {
        vec![
            fighter("ally", Team::Ally, 1, 4),
            fighter("enemy", Team::Enemy, 8, 4),
        ]
    }

    fn open_session(roster: &[Participant], seed: u64, config: EncounterConfig) -> CombatSession {
        CombatSession::new(roster, TerrainPreset::Plains, 10, 8, seed, config)
            .expect("session setup")
    }

    #[test]
    fn test_duel_reaches_a_result() {
        let mut session = open_session(&duel_roster(), 11, EncounterConfig::default());
        let result = session.run_to_completion();
        assert_eq!(session.result(), Some(result));
        assert!(session.round() <= 50);
    }

    #[test]
    fn test_round_count_matches_the_final_round() {
        let mut session = open_session(&duel_roster(), 11, EncounterConfig::default());
        session.run_to_completion();
        // Holds even when a death ends the encounter mid-round
        assert_eq!(session.stats().rounds, session.round());
    }

    #[test]
    fn test_same_seed_same_outcome() {
        let roster = duel_roster();
        let mut a = open_session(&roster, 77, EncounterConfig::default());
        let mut b = open_session(&roster, 77, EncounterConfig::default());
        assert_eq!(a.run_to_completion(), b.run_to_completion());
        assert_eq!(a.history().len(), b.history().len());
        assert_eq!(a.stats().turns_elapsed, b.stats().turns_elapsed);
    }

    #[test]
    fn test_empty_enemy_side_is_instant_victory() {
        let roster = vec![fighter("ally", Team::Ally, 1, 1)];
        let session = open_session(&roster, 1, EncounterConfig::default());
        assert_eq!(session.result(), Some(EncounterResult::Victory));
    }

    #[test]
    fn test_dead_roster_entries_are_left_out() {
        let mut roster = duel_roster();
        roster.push({
            let mut p = fighter("ghost", Team::Ally, 2, 2);
            p.alive = false;
            p
        });
        let session = open_session(&roster, 1, EncounterConfig::default());
        assert_eq!(session.units().len(), 2);
    }

    #[test]
    fn test_stalemate_at_round_cap() {
        let config = EncounterConfig {
            max_rounds: 1,
            ..EncounterConfig::default()
        };
        // Too far apart to engage within one round
        let roster = vec![
            fighter("ally", Team::Ally, 0, 4),
            fighter("enemy", Team::Enemy, 9, 4),
        ];
        let mut session = open_session(&roster, 5, config);
        assert_eq!(session.run_to_completion(), EncounterResult::Stalemate);
    }

    #[test]
    fn test_player_turn_parks_the_session() {
        let mut roster = duel_roster();
        roster[0].player_controlled = true;
        // Make sure the player acts first
        roster[0].attributes.dexterity = 20;
        roster[1].attributes.dexterity = 1;
        let mut session = open_session(&roster, 3, EncounterConfig::default());

        while session.awaiting_unit().is_none() && !session.engine.is_finished() {
            session.step();
        }
        let waiting_on = session.awaiting_unit().expect("player turn expected");
        assert_eq!(waiting_on, roster[0].id);

        // Steps are no-ops until the action arrives
        assert!(session.step().is_empty());
        let log = session.submit_action(CombatAction::Defend);
        assert!(log
            .events
            .iter()
            .any(|e| matches!(e, CombatEvent::TurnEnded { .. })));
        assert!(session.awaiting_unit().is_none());
    }

    #[test]
    fn test_player_moves_then_acts_in_one_turn() {
        let mut roster = duel_roster();
        roster[0].player_controlled = true;
        roster[0].attributes.dexterity = 20;
        roster[1].attributes.dexterity = 1;
        let mut session = open_session(&roster, 3, EncounterConfig::default());

        while session.awaiting_unit().is_none() && !session.engine.is_finished() {
            session.step();
        }
        let player = session.awaiting_unit().expect("player turn expected");
        let idx = session.units.iter().position(|u| u.id == player).unwrap();
        let from = session.units[idx].position;
        let occupied: AHashSet<HexCoord> = session
            .units
            .iter()
            .filter(|u| u.alive() && u.id != player)
            .map(|u| u.position)
            .collect();
        let dest = session.field.reachable(from, 1.0, &occupied)[0];

        // Movement alone keeps the turn open
        let log = session.submit_action(CombatAction::MoveTo(dest));
        assert!(log
            .events
            .iter()
            .any(|e| matches!(e, CombatEvent::UnitMoved { .. })));
        assert_eq!(session.awaiting_unit(), Some(player));

        // The action half finishes it
        let log = session.submit_action(CombatAction::Defend);
        assert!(log
            .events
            .iter()
            .any(|e| matches!(e, CombatEvent::TurnEnded { .. })));
        assert!(session.awaiting_unit().is_none());
        let unit = &session.units[idx];
        assert_eq!(unit.position, dest);
        assert!(unit.has_status(StatusKind::Defending));
    }

    #[test]
    fn test_poison_death_notifies_once() {
        let mut session = open_session(&duel_roster(), 9, EncounterConfig::default());
        let victim = session.units[0].id;
        session.units[0].hp = 1;
        session.units[0].apply_status(StatusKind::Poisoned, 3);

        session.run_to_completion();

        let deaths = session
            .history()
            .iter()
            .filter(|(_, e)| matches!(e, CombatEvent::UnitDied { unit, .. } if *unit == victim))
            .count();
        assert_eq!(deaths, 1);
        let dot_death = session.history().iter().any(|(_, e)| {
            matches!(
                e,
                CombatEvent::UnitDied {
                    unit,
                    cause: DeathCause::DamageOverTime,
                } if *unit == victim
            )
        });
        assert!(dot_death);
        assert_eq!(session.result(), Some(EncounterResult::Defeat));
    }

    #[test]
    fn test_stunned_unit_skips_turn() {
        let mut session = open_session(&duel_roster(), 21, EncounterConfig::default());
        let stunned = session.units[0].id;
        // A one-round stun expires on its tick but still consumes the turn
        session.units[0].apply_status(StatusKind::Stunned, 1);

        session.step(); // round start
        while session
            .history()
            .iter()
            .all(|(_, e)| !matches!(e, CombatEvent::TurnSkippedStunned { unit } if *unit == stunned))
        {
            if session.engine.is_finished() {
                panic!("stun skip never fired");
            }
            session.step();
        }
        let unit = session.units.iter().find(|u| u.id == stunned).unwrap();
        assert!(!unit.has_status(StatusKind::Stunned));
    }

    #[test]
    fn test_command_expires_at_round_end() {
        let roster = duel_roster();
        let mut session = open_session(&roster, 13, EncounterConfig::default());
        session.step(); // round start
        let enemy_id = session
            .units()
            .iter()
            .find(|u| u.team == Team::Enemy)
            .map(|u| u.id)
            .expect("enemy present");
        session.issue_command(CaptainCommand::FocusFire(enemy_id));
        assert!(session.active_command().is_some());

        while session.phase() == TurnPhase::UnitTurn {
            session.step();
        }
        session.step(); // round end
        assert!(session.active_command().is_none());
    }

    #[test]
    fn test_reconcile_writes_back_survivors_and_dead() {
        let mut roster = duel_roster();
        let mut session = open_session(&roster, 31, EncounterConfig::default());
        let result = session.run_to_completion();
        session.reconcile(&mut roster);

        for p in &roster {
            let unit = session
                .units()
                .iter()
                .find(|u| u.id == p.id)
                .expect("unit kept");
            assert_eq!(p.alive, unit.alive());
            if unit.alive() {
                assert_eq!(p.hp, unit.hp);
            } else {
                assert_eq!(p.hp, 0);
            }
        }
        match result {
            EncounterResult::Victory => assert!(roster[0].alive),
            EncounterResult::Defeat => assert!(roster[1].alive),
            EncounterResult::Stalemate => {}
        }
    }

    #[test]
    fn test_hasted_unit_gets_one_extra_action() {
        let mut roster = duel_roster();
        roster[0].attributes.dexterity = 20;
        roster[1].attributes.dexterity = 1;
        let mut session = open_session(&roster, 19, EncounterConfig::default());
        let hasted = session.units[0].id;
        session.units[0].apply_status(StatusKind::Hasted, 3);

        session.step(); // round start
        // Drive until the hasted unit's first turn has fully resolved
        while !session.history().iter().any(
            |(_, e)| matches!(e, CombatEvent::TurnEnded { unit } if *unit == hasted),
        ) {
            assert!(!session.engine.is_finished(), "encounter ended early");
            session.step();
        }
        let grants = session
            .history()
            .iter()
            .filter(|(_, e)| {
                matches!(e, CombatEvent::ExtraActionGranted { unit } if *unit == hasted)
            })
            .count();
        assert_eq!(grants, 1);
    }

    #[test]
    fn test_illegal_ability_index_is_dropped() {
        let mut session = open_session(&duel_roster(), 2, EncounterConfig::default());
        session.step(); // round start
        let mut log = EventLog::new();
        session.resolve_ability(0, 99, AbilityTarget::Unit(session.units[1].id), &mut log);
        assert!(log.is_empty());
        assert_eq!(session.stats().abilities_used, 0);
    }
}
