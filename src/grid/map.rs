//! Battlefield: terrain storage and positional queries
//!
//! The battlefield owns terrain only. Queries that depend on unit
//! positions (occupancy, flanking) take those positions as arguments so
//! the grid never carries mutable combat state.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use ahash::{AHashMap, AHashSet};
use ordered_float::OrderedFloat;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::grid::hex::HexCoord;
use crate::grid::terrain::{Terrain, TerrainPreset};

/// The battlefield grid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Battlefield {
    tiles: AHashMap<HexCoord, Terrain>,
    pub width: u32,
    pub height: u32,
}

impl Battlefield {
    /// Create an open battlefield
    pub fn new(width: u32, height: u32) -> Self {
        let mut tiles = AHashMap::new();
        for q in 0..width as i32 {
            for r in 0..height as i32 {
                tiles.insert(HexCoord::new(q, r), Terrain::Open);
            }
        }
        Self {
            tiles,
            width,
            height,
        }
    }

    /// Generate a battlefield from a terrain preset.
    ///
    /// The two outermost columns on each side stay open so deployments
    /// never land on impassable hexes.
    pub fn generate(preset: TerrainPreset, width: u32, height: u32, rng: &mut impl Rng) -> Self {
        let mut field = Self::new(width, height);
        let (rough, forest, water, wall) = preset.scatter_weights();

        for q in 2..width as i32 - 2 {
            for r in 0..height as i32 {
                let roll: f32 = rng.gen();
                let terrain = if roll < rough {
                    Terrain::Rough
                } else if roll < rough + forest {
                    Terrain::Forest
                } else if roll < rough + forest + water {
                    Terrain::Water
                } else if roll < rough + forest + water + wall {
                    Terrain::Wall
                } else {
                    Terrain::Open
                };
                field.set_terrain(HexCoord::new(q, r), terrain);
            }
        }
        field
    }

    pub fn in_bounds(&self, coord: HexCoord) -> bool {
        coord.q >= 0
            && coord.r >= 0
            && coord.q < self.width as i32
            && coord.r < self.height as i32
    }

    pub fn terrain_at(&self, coord: HexCoord) -> Option<Terrain> {
        self.tiles.get(&coord).copied()
    }

    pub fn set_terrain(&mut self, coord: HexCoord, terrain: Terrain) {
        if self.in_bounds(coord) {
            self.tiles.insert(coord, terrain);
        }
    }

    /// Cost to enter a hex; infinite when out of bounds or impassable
    pub fn movement_cost(&self, coord: HexCoord) -> f32 {
        self.terrain_at(coord)
            .map(|t| t.movement_cost())
            .unwrap_or(f32::INFINITY)
    }

    pub fn is_passable(&self, coord: HexCoord) -> bool {
        self.movement_cost(coord).is_finite()
    }

    /// Cover value at a hex (0.0 out of bounds)
    pub fn cover_at(&self, coord: HexCoord) -> f32 {
        self.terrain_at(coord).map(|t| t.cover_value()).unwrap_or(0.0)
    }

    /// Line of sight between two hexes. Intervening blocking terrain
    /// breaks it; the endpoints themselves never do.
    pub fn has_line_of_sight(&self, from: HexCoord, to: HexCoord) -> bool {
        let line = from.line_to(to);
        for coord in line.iter().skip(1).take(line.len().saturating_sub(2)) {
            if let Some(terrain) = self.terrain_at(*coord) {
                if terrain.blocks_los() {
                    return false;
                }
            }
        }
        true
    }

    /// All hexes reachable from `from` with the given movement budget,
    /// treating `occupied` hexes as blocked. Uniform-cost search over
    /// terrain entry costs. The origin itself is not included.
    pub fn reachable(
        &self,
        from: HexCoord,
        movement: f32,
        occupied: &AHashSet<HexCoord>,
    ) -> Vec<HexCoord> {
        let mut costs: AHashMap<HexCoord, f32> = AHashMap::new();
        let mut heap = BinaryHeap::new();

        costs.insert(from, 0.0);
        heap.push((Reverse(OrderedFloat(0.0f32)), from));

        while let Some((Reverse(OrderedFloat(cost)), coord)) = heap.pop() {
            if cost > *costs.get(&coord).unwrap_or(&f32::INFINITY) {
                continue;
            }

            for neighbor in coord.neighbors() {
                if !self.is_passable(neighbor) || occupied.contains(&neighbor) {
                    continue;
                }
                let next_cost = cost + self.movement_cost(neighbor);
                if next_cost > movement {
                    continue;
                }
                if next_cost < *costs.get(&neighbor).unwrap_or(&f32::INFINITY) {
                    costs.insert(neighbor, next_cost);
                    heap.push((Reverse(OrderedFloat(next_cost)), neighbor));
                }
            }
        }

        let mut result: Vec<HexCoord> = costs.into_keys().filter(|c| *c != from).collect();
        // Stable output order for deterministic downstream selection
        result.sort_by_key(|c| (c.q, c.r));
        result
    }

    /// Reachable hex that gets closest to `goal`; `None` when nothing
    /// improves on standing still. Ties resolve by lowest (q, r).
    pub fn best_step_toward(
        &self,
        from: HexCoord,
        goal: HexCoord,
        movement: f32,
        occupied: &AHashSet<HexCoord>,
    ) -> Option<HexCoord> {
        let current = from.distance(goal);
        self.reachable(from, movement, occupied)
            .into_iter()
            .filter(|c| c.distance(goal) < current)
            .min_by_key(|c| (c.distance(goal), c.q, c.r))
    }

    /// Nearest passable, unoccupied hex to `coord` (possibly itself)
    pub fn nearest_free(&self, coord: HexCoord, occupied: &AHashSet<HexCoord>) -> HexCoord {
        if self.is_passable(coord) && !occupied.contains(&coord) {
            return coord;
        }
        for radius in 1..(self.width + self.height) {
            let mut ring: Vec<HexCoord> = coord
                .hexes_in_range(radius)
                .into_iter()
                .filter(|c| {
                    c.distance(coord) == radius
                        && self.is_passable(*c)
                        && !occupied.contains(c)
                })
                .collect();
            ring.sort_by_key(|c| (c.q, c.r));
            if let Some(first) = ring.first() {
                return *first;
            }
        }
        coord
    }

    /// Is a target flanked by an attacker at `attacker_pos`? True when a
    /// second hostile stands on the hex mirrored through the target.
    pub fn is_flanked(
        &self,
        target: HexCoord,
        attacker_pos: HexCoord,
        other_attackers: &[HexCoord],
    ) -> bool {
        if !target.is_adjacent(attacker_pos) {
            return false;
        }
        let opposite = target.opposite_of(attacker_pos);
        other_attackers.iter().any(|p| *p == opposite)
    }
}
