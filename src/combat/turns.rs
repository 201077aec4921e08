//! Encounter state machine: initiative, rounds, turns, termination
//!
//! `NotStarted -> RoundStart -> UnitTurn -> RoundEnd -> Ended(result)`,
//! with `UnitTurn` re-entered once per living unit per round. The turn
//! order is rolled and sorted once at setup and never re-sorted; dead
//! units stay members and are skipped through a grow-only dead-set.

use ahash::AHashSet;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::combat::dice::d20;
use crate::combat::events::{CombatEvent, DeathCause, EventLog};
use crate::combat::stats::EncounterStats;
use crate::combat::unit::CombatUnit;
use crate::core::types::{Round, Team, UnitId};

/// Terminal result of an encounter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncounterResult {
    Victory,
    Defeat,
    Stalemate,
}

/// Encounter phase tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TurnPhase {
    #[default]
    NotStarted,
    RoundStart,
    UnitTurn,
    RoundEnd,
    Ended(EncounterResult),
}

/// Fixed turn order: indices into the session's unit arena, sorted once
/// by descending (initiative, tiebreaker).
pub fn initiative_order(units: &[CombatUnit]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..units.len()).collect();
    order.sort_by(|&a, &b| {
        (units[b].initiative, units[b].tiebreaker).cmp(&(units[a].initiative, units[a].tiebreaker))
    });
    order
}

/// The encounter's turn state machine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnEngine {
    order: Vec<usize>,
    dead: AHashSet<UnitId>,
    round: Round,
    cursor: usize,
    phase: TurnPhase,
    max_rounds: u32,
}

impl TurnEngine {
    pub fn new(max_rounds: u32) -> Self {
        Self {
            order: Vec::new(),
            dead: AHashSet::new(),
            round: 0,
            cursor: 0,
            phase: TurnPhase::NotStarted,
            max_rounds,
        }
    }

    /// Roll initiative (`d20 + dex modifier`) and a secondary tiebreaker
    /// for every unit, fix the turn order, and resolve degenerate
    /// rosters straight to a terminal phase.
    pub fn setup(&mut self, units: &mut [CombatUnit], rng: &mut impl Rng, log: &mut EventLog) {
        for unit in units.iter_mut() {
            unit.initiative = d20(rng) + unit.attributes.dex_mod();
            unit.tiebreaker = rng.gen();
        }
        self.order = initiative_order(units);
        self.round = 0;
        self.cursor = 0;
        self.dead.clear();
        self.phase = TurnPhase::NotStarted;

        // An empty side never enters the turn loop
        if !units.iter().any(|u| u.team == Team::Ally && u.alive()) {
            self.finish(EncounterResult::Defeat, log);
        } else if !units.iter().any(|u| u.team == Team::Enemy && u.alive()) {
            self.finish(EncounterResult::Victory, log);
        }
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn result(&self) -> Option<EncounterResult> {
        match self.phase {
            TurnPhase::Ended(result) => Some(result),
            _ => None,
        }
    }

    pub fn round(&self) -> Round {
        self.round
    }

    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn dead_count(&self) -> usize {
        self.dead.len()
    }

    pub fn is_dead(&self, id: UnitId) -> bool {
        self.dead.contains(&id)
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, TurnPhase::Ended(_))
    }

    /// Begin the next round: bump the counter, reset per-round flags on
    /// living units, rewind the cursor.
    pub fn start_round(&mut self, units: &mut [CombatUnit], log: &mut EventLog) {
        if self.is_finished() {
            return;
        }
        self.round += 1;
        for unit in units.iter_mut().filter(|u| u.alive()) {
            unit.reset_round_flags();
        }
        self.cursor = 0;
        self.phase = TurnPhase::UnitTurn;
        tracing::debug!(round = self.round, "round started");
        log.push(CombatEvent::RoundStarted { round: self.round });
    }

    /// Advance past dead entries and return the arena index whose turn
    /// it is, or `None` once the order is exhausted for this round (the
    /// phase then moves to `RoundEnd`).
    pub fn next_turn_index(&mut self, units: &[CombatUnit]) -> Option<usize> {
        if self.phase != TurnPhase::UnitTurn {
            return None;
        }
        while self.cursor < self.order.len() {
            let idx = self.order[self.cursor];
            if !self.dead.contains(&units[idx].id) && units[idx].alive() {
                return Some(idx);
            }
            self.cursor += 1;
        }
        self.phase = TurnPhase::RoundEnd;
        None
    }

    /// End the current unit's turn and move the cursor on. Safe to call
    /// with no current actor; the machine never stalls.
    pub fn advance_turn(&mut self) {
        if self.phase == TurnPhase::UnitTurn || self.phase == TurnPhase::RoundEnd {
            self.cursor += 1;
        }
    }

    /// Idempotent death bookkeeping: adds to the grow-only dead-set,
    /// fires the death notification once, and immediately re-evaluates
    /// termination.
    pub fn mark_dead(
        &mut self,
        units: &[CombatUnit],
        id: UnitId,
        cause: DeathCause,
        stats: &mut EncounterStats,
        log: &mut EventLog,
    ) {
        if !self.dead.insert(id) {
            return;
        }
        let team = units.iter().find(|u| u.id == id).map(|u| u.team);
        if let Some(team) = team {
            stats.record_death(team);
        }
        tracing::debug!(?id, ?cause, "unit died");
        log.push(CombatEvent::UnitDied { unit: id, cause });
        self.evaluate_termination(units, log);
    }

    /// Victory iff no living enemies remain; defeat iff no living
    /// allies. Stalemate is checked separately at round end.
    pub fn evaluate_termination(&mut self, units: &[CombatUnit], log: &mut EventLog) {
        if self.is_finished() {
            return;
        }
        let allies_alive = units.iter().any(|u| u.team == Team::Ally && u.alive());
        let enemies_alive = units.iter().any(|u| u.team == Team::Enemy && u.alive());

        if !enemies_alive {
            self.finish(EncounterResult::Victory, log);
        } else if !allies_alive {
            self.finish(EncounterResult::Defeat, log);
        }
    }

    /// Round-end processing: re-check termination, apply the stalemate
    /// cap, otherwise queue up the next round.
    pub fn end_round(&mut self, units: &[CombatUnit], log: &mut EventLog) {
        if self.phase != TurnPhase::RoundEnd {
            return;
        }
        self.evaluate_termination(units, log);
        if self.is_finished() {
            return;
        }
        if self.round >= self.max_rounds {
            self.finish(EncounterResult::Stalemate, log);
            return;
        }
        self.phase = TurnPhase::RoundStart;
    }

    /// Reset the has-acted flag of the given unit (haste support).
    /// Movement is not refreshed.
    pub fn grant_extra_action(&self, unit: &mut CombatUnit) {
        unit.acted = false;
    }

    fn finish(&mut self, result: EncounterResult, log: &mut EventLog) {
        self.phase = TurnPhase::Ended(result);
        tracing::debug!(?result, round = self.round, "encounter ended");
        log.push(CombatEvent::EncounterEnded { result });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::unit::test_support::sample_unit;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn roster(allies: usize, enemies: usize) -> Vec<CombatUnit> {
        let mut units = Vec::new();
        for _ in 0..allies {
            units.push(sample_unit(Team::Ally));
        }
        for _ in 0..enemies {
            units.push(sample_unit(Team::Enemy));
        }
        units
    }

    fn engine_with(units: &mut [CombatUnit]) -> TurnEngine {
        let mut engine = TurnEngine::new(50);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut log = EventLog::new();
        engine.setup(units, &mut rng, &mut log);
        engine
    }

    #[test]
    fn test_initiative_order_descending() {
        let mut units = roster(2, 1);
        units[0].initiative = 15;
        units[1].initiative = 9;
        units[2].initiative = 14;
        assert_eq!(initiative_order(&units), vec![0, 2, 1]);
    }

    #[test]
    fn test_initiative_higher_total_acts_first() {
        // Ally rolled 13 with +2 dexterity (total 15); enemy rolled 14
        // with +0 (total 14). The ally leads the order.
        let mut units = roster(1, 1);
        units[0].initiative = 13 + 2;
        units[1].initiative = 14;
        let order = initiative_order(&units);
        assert_eq!(units[order[0]].team, Team::Ally);
    }

    #[test]
    fn test_initiative_tie_uses_tiebreaker() {
        let mut units = roster(1, 1);
        units[0].initiative = 12;
        units[0].tiebreaker = 5;
        units[1].initiative = 12;
        units[1].tiebreaker = 90;
        assert_eq!(initiative_order(&units), vec![1, 0]);
    }

    #[test]
    fn test_order_length_fixed_for_encounter() {
        let mut units = roster(2, 2);
        let mut engine = engine_with(&mut units);
        let initial_len = engine.order().len();

        // Kill a unit; the order keeps its full length
        let victim = units[0].id;
        units[0].hp = 0;
        let mut log = EventLog::new();
        let mut stats = EncounterStats::default();
        engine.mark_dead(&units, victim, DeathCause::Attack, &mut stats, &mut log);
        assert_eq!(engine.order().len(), initial_len);
    }

    #[test]
    fn test_mark_dead_idempotent() {
        let mut units = roster(2, 2);
        let mut engine = engine_with(&mut units);
        let victim = units[0].id;
        units[0].hp = 0;

        let mut log = EventLog::new();
        let mut stats = EncounterStats::default();
        engine.mark_dead(&units, victim, DeathCause::Attack, &mut stats, &mut log);
        engine.mark_dead(&units, victim, DeathCause::Attack, &mut stats, &mut log);

        assert_eq!(engine.dead_count(), 1);
        assert_eq!(stats.allies_lost, 1);
        let deaths = log
            .events
            .iter()
            .filter(|e| matches!(e, CombatEvent::UnitDied { .. }))
            .count();
        assert_eq!(deaths, 1);
    }

    #[test]
    fn test_dead_set_only_grows() {
        let mut units = roster(2, 2);
        let mut engine = engine_with(&mut units);
        let mut log = EventLog::new();
        let mut stats = EncounterStats::default();

        let mut seen = 0;
        for i in 0..units.len() {
            let id = units[i].id;
            units[i].hp = 0;
            engine.mark_dead(&units, id, DeathCause::Attack, &mut stats, &mut log);
            assert!(engine.dead_count() > seen);
            seen = engine.dead_count();
        }
    }

    #[test]
    fn test_round_counter_increments_by_one() {
        let mut units = roster(1, 1);
        let mut engine = engine_with(&mut units);
        let mut log = EventLog::new();

        assert_eq!(engine.round(), 0);
        engine.start_round(&mut units, &mut log);
        assert_eq!(engine.round(), 1);

        // Drain the round
        while let Some(_idx) = engine.next_turn_index(&units) {
            engine.advance_turn();
        }
        assert_eq!(engine.phase(), TurnPhase::RoundEnd);
        engine.end_round(&units, &mut log);
        assert_eq!(engine.phase(), TurnPhase::RoundStart);

        engine.start_round(&mut units, &mut log);
        assert_eq!(engine.round(), 2);
    }

    #[test]
    fn test_dead_units_skipped() {
        let mut units = roster(2, 1);
        let mut engine = engine_with(&mut units);
        let mut log = EventLog::new();
        let mut stats = EncounterStats::default();

        // Kill whichever unit acts first
        engine.start_round(&mut units, &mut log);
        let first = engine.next_turn_index(&units).expect("living units exist");
        let first_id = units[first].id;
        units[first].hp = 0;
        engine.mark_dead(&units, first_id, DeathCause::Attack, &mut stats, &mut log);

        // The dead unit no longer comes up
        while let Some(idx) = engine.next_turn_index(&units) {
            assert_ne!(units[idx].id, first_id);
            engine.advance_turn();
        }
    }

    #[test]
    fn test_victory_when_last_enemy_dies() {
        let mut units = roster(2, 1);
        let mut engine = engine_with(&mut units);
        let mut log = EventLog::new();
        let mut stats = EncounterStats::default();

        let enemy_idx = units.iter().position(|u| u.team == Team::Enemy).unwrap();
        let enemy_id = units[enemy_idx].id;
        units[enemy_idx].hp = 0;
        engine.mark_dead(&units, enemy_id, DeathCause::Attack, &mut stats, &mut log);

        assert_eq!(engine.result(), Some(EncounterResult::Victory));
        assert!(log
            .events
            .iter()
            .any(|e| matches!(e, CombatEvent::EncounterEnded { .. })));
    }

    #[test]
    fn test_stalemate_at_round_cap() {
        let mut units = roster(1, 1);
        let mut engine = TurnEngine::new(3);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut log = EventLog::new();
        engine.setup(&mut units, &mut rng, &mut log);

        for _ in 0..3 {
            engine.start_round(&mut units, &mut log);
            while engine.next_turn_index(&units).is_some() {
                engine.advance_turn();
            }
            engine.end_round(&units, &mut log);
        }
        assert_eq!(engine.result(), Some(EncounterResult::Stalemate));
    }

    #[test]
    fn test_degenerate_roster_resolves_immediately() {
        let mut only_allies = roster(2, 0);
        let mut engine = TurnEngine::new(50);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut log = EventLog::new();
        engine.setup(&mut only_allies, &mut rng, &mut log);
        assert_eq!(engine.result(), Some(EncounterResult::Victory));

        let mut only_enemies = roster(0, 2);
        let mut engine = TurnEngine::new(50);
        let mut log = EventLog::new();
        engine.setup(&mut only_enemies, &mut rng, &mut log);
        assert_eq!(engine.result(), Some(EncounterResult::Defeat));
    }

    #[test]
    fn test_terminal_phase_absorbs_transitions() {
        let mut units = roster(1, 0);
        let mut engine = engine_with(&mut units);
        assert!(engine.is_finished());

        let mut log = EventLog::new();
        engine.start_round(&mut units, &mut log);
        engine.end_round(&units, &mut log);
        assert!(log.is_empty());
        assert_eq!(engine.round(), 0);
    }

    #[test]
    fn test_grant_extra_action_resets_acted_only() {
        let mut units = roster(1, 1);
        let engine = engine_with(&mut units);
        units[0].moved = true;
        units[0].acted = true;
        engine.grant_extra_action(&mut units[0]);
        assert!(!units[0].acted);
        assert!(units[0].moved);
    }
}
