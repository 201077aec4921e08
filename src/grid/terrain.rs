//! Battlefield terrain kinds and their movement/cover effects

use serde::{Deserialize, Serialize};

/// Terrain occupying a battlefield hex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Terrain {
    #[default]
    Open, // No penalty, no cover
    Rough,  // Slight penalty, light cover
    Forest, // Heavy penalty, heavy cover, blocks LOS
    Water,  // Impassable
    Wall,   // Impassable, blocks LOS
    Road,   // Movement bonus
}

impl Terrain {
    /// Movement cost to enter a hex of this terrain (1.0 = normal)
    pub fn movement_cost(&self) -> f32 {
        match self {
            Terrain::Open => 1.0,
            Terrain::Rough => 1.5,
            Terrain::Forest => 2.0,
            Terrain::Water => f32::INFINITY,
            Terrain::Wall => f32::INFINITY,
            Terrain::Road => 0.7,
        }
    }

    /// Cover value (0.0 = none, 1.0 = full)
    pub fn cover_value(&self) -> f32 {
        match self {
            Terrain::Open => 0.0,
            Terrain::Rough => 0.2,
            Terrain::Forest => 0.5,
            Terrain::Water => 0.0,
            Terrain::Wall => 0.0,
            Terrain::Road => 0.0,
        }
    }

    pub fn blocks_los(&self) -> bool {
        matches!(self, Terrain::Forest | Terrain::Wall)
    }

    pub fn is_passable(&self) -> bool {
        self.movement_cost().is_finite()
    }
}

/// Terrain selection handed in by the quest-flow collaborator at setup.
/// Each preset describes the scatter frequencies used to generate the
/// battlefield.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TerrainPreset {
    #[default]
    Plains,
    Woodland,
    Ruins,
    Cavern,
}

impl TerrainPreset {
    /// (rough, forest, water, wall) scatter chances per hex
    pub fn scatter_weights(&self) -> (f32, f32, f32, f32) {
        match self {
            TerrainPreset::Plains => (0.08, 0.04, 0.0, 0.0),
            TerrainPreset::Woodland => (0.10, 0.22, 0.03, 0.0),
            TerrainPreset::Ruins => (0.18, 0.04, 0.0, 0.12),
            TerrainPreset::Cavern => (0.22, 0.0, 0.06, 0.16),
        }
    }
}
