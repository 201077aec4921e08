//! Transition events emitted by the encounter
//!
//! Every notification point fires synchronously at the moment it occurs
//! and is returned to the caller after the driven step. The core never
//! waits on a consumer; events are plain values.

use serde::{Deserialize, Serialize};

use crate::ai::captain::CaptainCommand;
use crate::combat::status::StatusKind;
use crate::combat::turns::EncounterResult;
use crate::core::types::{Round, UnitId};
use crate::grid::hex::HexCoord;

/// What killed a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeathCause {
    Attack,
    DamageOverTime,
}

/// One observable transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CombatEvent {
    RoundStarted {
        round: Round,
    },
    TurnStarted {
        unit: UnitId,
    },
    TurnEnded {
        unit: UnitId,
    },
    TurnSkippedStunned {
        unit: UnitId,
    },
    UnitMoved {
        unit: UnitId,
        from: HexCoord,
        to: HexCoord,
    },
    AttackHit {
        attacker: UnitId,
        target: UnitId,
        damage: i32,
        critical: bool,
    },
    AttackMissed {
        attacker: UnitId,
        target: UnitId,
    },
    Healed {
        source: UnitId,
        target: UnitId,
        amount: i32,
    },
    StatusApplied {
        unit: UnitId,
        kind: StatusKind,
        duration: u8,
    },
    StatusExpired {
        unit: UnitId,
        kind: StatusKind,
    },
    StatusDamage {
        unit: UnitId,
        kind: StatusKind,
        damage: i32,
    },
    UnitDied {
        unit: UnitId,
        cause: DeathCause,
    },
    CommandIssued {
        captain: UnitId,
        command: CaptainCommand,
    },
    CommandRefused {
        unit: UnitId,
    },
    ExtraActionGranted {
        unit: UnitId,
    },
    EncounterEnded {
        result: EncounterResult,
    },
}

/// Events fired during one driven step
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    pub events: Vec<CombatEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: CombatEvent) {
        self.events.push(event);
    }

    pub fn contains_death(&self, unit: UnitId) -> bool {
        self.events
            .iter()
            .any(|e| matches!(e, CombatEvent::UnitDied { unit: u, .. } if *u == unit))
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
