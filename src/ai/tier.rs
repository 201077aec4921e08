//! Intelligence tiers and noisy utility selection
//!
//! All units score candidates with the same functions; the tier only
//! controls how much uniform noise is injected before picking the
//! argmax. High-tier units pick deterministically.

use ordered_float::OrderedFloat;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

/// Utility scores are normalized into [0, 1]; noise fractions scale
/// against this ceiling.
pub const MAX_UTILITY: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntelTier {
    Low,
    Medium,
    High,
}

impl IntelTier {
    pub fn from_intelligence(intelligence: i32) -> Self {
        if intelligence <= 8 {
            IntelTier::Low
        } else if intelligence <= 14 {
            IntelTier::Medium
        } else {
            IntelTier::High
        }
    }

    /// Noise fraction added to each candidate score before selection.
    pub fn noise_fraction(self, low: f32, medium: f32) -> f32 {
        match self {
            IntelTier::Low => low,
            IntelTier::Medium => medium,
            IntelTier::High => 0.0,
        }
    }
}

/// Pick the best-scoring candidate after injecting up to
/// `noise * MAX_UTILITY` of uniform noise per candidate. Ties break on
/// the lowest key so high-tier selection is fully deterministic.
pub fn select_best<K: Ord + Copy>(
    candidates: &[(K, f32)],
    noise: f32,
    rng: &mut impl Rng,
) -> Option<K> {
    if candidates.is_empty() {
        return None;
    }
    candidates
        .iter()
        .map(|&(key, score)| {
            let jitter = if noise > 0.0 {
                rng.gen::<f32>() * noise * MAX_UTILITY
            } else {
                0.0
            };
            (key, score + jitter)
        })
        .max_by_key(|&(key, score)| (OrderedFloat(score), Reverse(key)))
        .map(|(key, _)| key)
}
