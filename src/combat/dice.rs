//! Seeded dice helpers
//!
//! Every roll in the encounter goes through the session's injected RNG;
//! nothing here touches a thread-local source.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// NdS+B dice expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dice {
    pub count: u32,
    pub sides: u32,
    pub bonus: i32,
}

impl Dice {
    pub fn new(count: u32, sides: u32, bonus: i32) -> Self {
        Self {
            count,
            sides,
            bonus,
        }
    }

    pub fn roll(&self, rng: &mut impl Rng) -> i32 {
        let mut total = self.bonus;
        for _ in 0..self.count {
            total += rng.gen_range(1..=self.sides) as i32;
        }
        total
    }

    /// Highest possible result
    pub fn max(&self) -> i32 {
        (self.count * self.sides) as i32 + self.bonus
    }
}

/// A plain d20
pub fn d20(rng: &mut impl Rng) -> i32 {
    rng.gen_range(1..=20)
}
