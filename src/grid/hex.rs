//! Axial hex coordinates for the battlefield
//!
//! Uses axial coordinates (q, r); the implicit cube coordinate s is
//! derived when needed for distance and rounding.

use serde::{Deserialize, Serialize};

/// Axial hex coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct HexCoord {
    pub q: i32,
    pub r: i32,
}

impl HexCoord {
    pub fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// Derived cube coordinate
    pub fn s(&self) -> i32 {
        -self.q - self.r
    }

    /// Hex distance (cube metric)
    pub fn distance(&self, other: HexCoord) -> u32 {
        let dq = (self.q - other.q).abs();
        let dr = (self.r - other.r).abs();
        let ds = (self.s() - other.s()).abs();
        ((dq + dr + ds) / 2) as u32
    }

    pub fn is_adjacent(&self, other: HexCoord) -> bool {
        self.distance(other) == 1
    }

    /// The 6 neighboring coordinates, in a fixed order
    pub fn neighbors(&self) -> [HexCoord; 6] {
        [
            HexCoord::new(self.q + 1, self.r),
            HexCoord::new(self.q + 1, self.r - 1),
            HexCoord::new(self.q, self.r - 1),
            HexCoord::new(self.q - 1, self.r),
            HexCoord::new(self.q - 1, self.r + 1),
            HexCoord::new(self.q, self.r + 1),
        ]
    }

    /// Hexes on the line from self to other, endpoints included
    pub fn line_to(&self, other: HexCoord) -> Vec<HexCoord> {
        let n = self.distance(other) as i32;
        if n == 0 {
            return vec![*self];
        }

        let mut results = Vec::with_capacity((n + 1) as usize);
        for i in 0..=n {
            let t = i as f32 / n as f32;
            let q = self.q as f32 + (other.q - self.q) as f32 * t;
            let r = self.r as f32 + (other.r - self.r) as f32 * t;
            results.push(Self::round(q, r));
        }
        results
    }

    /// Round a fractional hex to the nearest integer hex
    fn round(q: f32, r: f32) -> Self {
        let s = -q - r;
        let mut rq = q.round();
        let mut rr = r.round();
        let rs = s.round();

        let q_diff = (rq - q).abs();
        let r_diff = (rr - r).abs();
        let s_diff = (rs - s).abs();

        if q_diff > r_diff && q_diff > s_diff {
            rq = -rr - rs;
        } else if r_diff > s_diff {
            rr = -rq - rs;
        }

        Self::new(rq as i32, rr as i32)
    }

    /// All hexes within range (inclusive, includes self)
    pub fn hexes_in_range(&self, range: u32) -> Vec<HexCoord> {
        let range = range as i32;
        let mut results = Vec::new();
        for q in -range..=range {
            for r in (-range).max(-q - range)..=range.min(-q + range) {
                results.push(HexCoord::new(self.q + q, self.r + r));
            }
        }
        results
    }

    /// The neighbor that reduces distance to the goal the most.
    /// Ties resolve to the first neighbor in the fixed neighbor order.
    pub fn step_toward(&self, goal: HexCoord) -> HexCoord {
        if *self == goal {
            return *self;
        }
        let mut best = *self;
        let mut best_dist = self.distance(goal);
        for n in self.neighbors() {
            let d = n.distance(goal);
            if d < best_dist {
                best = n;
                best_dist = d;
            }
        }
        best
    }

    /// Mirror of `pos` through self. An attacker at `pos` and another at
    /// the mirrored hex have this coordinate caught between them.
    pub fn opposite_of(&self, pos: HexCoord) -> HexCoord {
        HexCoord::new(2 * self.q - pos.q, 2 * self.r - pos.r)
    }
}
