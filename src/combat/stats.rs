//! Aggregate encounter statistics
//!
//! Tracked from the ally party's perspective and read by the quest-flow
//! collaborator once the encounter is terminal. Damage taken is measured
//! from actual ally-side hits, never mirrored from damage dealt.

use serde::{Deserialize, Serialize};

use crate::core::types::Team;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct EncounterStats {
    /// Rounds the encounter ran, counting the one it ended in
    pub rounds: u32,
    /// Unit turns elapsed, stunned skips included
    pub turns_elapsed: u32,
    /// Damage allies inflicted on enemies
    pub damage_dealt: u32,
    /// Damage allies received
    pub damage_taken: u32,
    /// HP allies restored
    pub healing_done: u32,
    pub enemies_killed: u32,
    pub allies_lost: u32,
    pub critical_hits: u32,
    pub abilities_used: u32,
}

impl EncounterStats {
    /// Record damage landing on `victim_team`
    pub fn record_damage(&mut self, victim_team: Team, amount: i32) {
        if amount <= 0 {
            return;
        }
        match victim_team {
            Team::Enemy => self.damage_dealt += amount as u32,
            Team::Ally => self.damage_taken += amount as u32,
        }
    }

    pub fn record_healing(&mut self, source_team: Team, amount: i32) {
        if amount > 0 && source_team == Team::Ally {
            self.healing_done += amount as u32;
        }
    }

    pub fn record_death(&mut self, team: Team) {
        match team {
            Team::Enemy => self.enemies_killed += 1,
            Team::Ally => self.allies_lost += 1,
        }
    }

    pub fn record_crit(&mut self, attacker_team: Team) {
        if attacker_team == Team::Ally {
            self.critical_hits += 1;
        }
    }
}
