//! Encounter configuration with documented tunables
//!
//! All magic numbers are collected here with explanations of their
//! purpose. The defaults are the values the simulation was balanced
//! against; overrides can be loaded from TOML.

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SkirmishError};

/// Weights for ranking attack targets. Sub-scores are in `[0, 1]`,
/// the weights sum to 1.0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetWeights {
    /// How dangerous the target is if left alone
    pub threat: f32,
    /// Bonus for nearly-dead targets (finish them off)
    pub low_hp: f32,
    /// Bonus for targets reachable this turn
    pub in_range: f32,
    /// Bonus when the ability hits a weakness
    pub weakness: f32,
    /// Captain focus-fire term
    pub captain_priority: f32,
}

impl Default for TargetWeights {
    fn default() -> Self {
        Self {
            threat: 0.3,
            low_hp: 0.2,
            in_range: 0.2,
            weakness: 0.2,
            captain_priority: 0.1,
        }
    }
}

/// Weights for ranking ability usage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbilityWeights {
    /// Does the battlefield situation call for this ability right now
    pub situational: f32,
    /// Cheap abilities score higher when resources are low
    pub resource_efficiency: f32,
    /// Does the party need this (healing the wounded, breaking clusters)
    pub party_need: f32,
    /// Does using this keep the actor alive
    pub self_preservation: f32,
    /// Captain directive term
    pub captain_directive: f32,
}

impl Default for AbilityWeights {
    fn default() -> Self {
        Self {
            situational: 0.3,
            resource_efficiency: 0.2,
            party_need: 0.2,
            self_preservation: 0.2,
            captain_directive: 0.1,
        }
    }
}

/// Weights for ranking candidate positions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionWeights {
    /// Cover value of the hex
    pub cover: f32,
    /// Standing opposite an ally across an enemy
    pub flanking: f32,
    /// Staying near friendly units
    pub ally_proximity: f32,
    /// Distance from the nearest enemy (escape routes)
    pub retreat_safety: f32,
    /// Progress toward the current objective point
    pub objective_distance: f32,
}

impl Default for PositionWeights {
    fn default() -> Self {
        Self {
            cover: 0.25,
            flanking: 0.25,
            ally_proximity: 0.2,
            retreat_safety: 0.2,
            objective_distance: 0.1,
        }
    }
}

/// Configuration for an encounter session
///
/// These values have been tuned to produce readable tactical behavior.
/// Changing them shifts pacing and AI character, not correctness.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncounterConfig {
    /// Hard round cap. Reaching it with survivors on both sides ends the
    /// encounter as a stalemate. This is a fail-safe against AI
    /// oscillation, not a balance lever.
    pub max_rounds: u32,

    /// Uniform noise added to every candidate score for low-tier AI,
    /// as a fraction of the maximum attainable score.
    pub low_tier_noise: f32,

    /// Same, for medium-tier AI. High tier adds no noise.
    pub medium_tier_noise: f32,

    /// Value of the captain-priority sub-score while a matching command
    /// is active and the unit complied. The composite score rises by
    /// exactly `captain_priority weight * captain_bias`.
    pub captain_bias: f32,

    /// Sub-score applied instead when a low-morale unit fails its
    /// compliance check (erratic behavior, biased toward disengaging).
    pub erratic_bias: f32,

    /// Morale below this turns compliance failure into erratic behavior
    /// rather than plain independence.
    pub erratic_morale_floor: i32,

    /// HP fraction below which medium/high tiers heal themselves.
    pub self_heal_threshold: f32,

    /// HP fraction below which medium/high tiers heal an ally.
    pub ally_heal_threshold: f32,

    /// Enemies within 1 hex of each other counting toward the
    /// area-ability cluster rule.
    pub cluster_size: usize,

    pub target_weights: TargetWeights,
    pub ability_weights: AbilityWeights,
    pub position_weights: PositionWeights,
}

impl Default for EncounterConfig {
    fn default() -> Self {
        Self {
            max_rounds: 50,
            low_tier_noise: 0.30,
            medium_tier_noise: 0.15,
            captain_bias: 1.0,
            erratic_bias: -1.0,
            erratic_morale_floor: 25,
            self_heal_threshold: 0.30,
            ally_heal_threshold: 0.20,
            cluster_size: 3,
            target_weights: TargetWeights::default(),
            ability_weights: AbilityWeights::default(),
            position_weights: PositionWeights::default(),
        }
    }
}

impl EncounterConfig {
    /// Parse a config from TOML, falling back to defaults for missing
    /// fields, and validate the tunables.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: EncounterConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_rounds == 0 {
            return Err(SkirmishError::InvalidConfig(
                "max_rounds must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.low_tier_noise)
            || !(0.0..=1.0).contains(&self.medium_tier_noise)
        {
            return Err(SkirmishError::InvalidConfig(
                "tier noise fractions must be within [0, 1]".into(),
            ));
        }
        if self.medium_tier_noise > self.low_tier_noise {
            return Err(SkirmishError::InvalidConfig(
                "medium tier noise must not exceed low tier noise".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(EncounterConfig::default().validate().is_ok());
    }

    #[test]
    fn test_target_weights_sum_to_one() {
        let w = TargetWeights::default();
        let sum = w.threat + w.low_hp + w.in_range + w.weakness + w.captain_priority;
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_position_weights_sum_to_one() {
        let w = PositionWeights::default();
        let sum = w.cover + w.flanking + w.ally_proximity + w.retreat_safety + w.objective_distance;
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_from_toml_overrides() {
        let config = EncounterConfig::from_toml_str("max_rounds = 20\nlow_tier_noise = 0.4\n")
            .expect("config should parse");
        assert_eq!(config.max_rounds, 20);
        assert!((config.low_tier_noise - 0.4).abs() < 1e-6);
        // Untouched fields keep their defaults
        assert!((config.medium_tier_noise - 0.15).abs() < 1e-6);
    }

    #[test]
    fn test_invalid_noise_rejected() {
        assert!(EncounterConfig::from_toml_str("low_tier_noise = 1.5").is_err());
    }

    #[test]
    fn test_zero_rounds_rejected() {
        assert!(EncounterConfig::from_toml_str("max_rounds = 0").is_err());
    }
}
