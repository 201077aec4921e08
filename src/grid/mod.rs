//! Battlefield grid - coordinates, terrain, and positional queries
//!
//! A pure query service: the grid holds terrain only. Unit positions are
//! owned by the combat session and passed into queries that need them.

pub mod hex;
pub mod map;
pub mod terrain;

pub use hex::HexCoord;
pub use map::Battlefield;
pub use terrain::{Terrain, TerrainPreset};
