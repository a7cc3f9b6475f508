//! Static per-cell terrain.
//!
//! Tiles carry only immutable layout data. Per-observer visibility and
//! exploration flags are computed at snapshot time; fog of war is observer
//! memory, not a world property.

use serde::{Deserialize, Serialize};

/// Canonical terrain classes for level tiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TerrainKind {
    Floor,
    Wall,
    Water,
    Void,
}

impl TerrainKind {
    pub fn is_passable(self) -> bool {
        matches!(self, TerrainKind::Floor)
    }
}

/// One cell of the static layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    terrain: TerrainKind,
}

impl Tile {
    pub const fn new(terrain: TerrainKind) -> Self {
        Self { terrain }
    }

    pub const WALL: Self = Self::new(TerrainKind::Wall);
    pub const FLOOR: Self = Self::new(TerrainKind::Floor);

    pub fn terrain(self) -> TerrainKind {
        self.terrain
    }

    pub fn is_wall(self) -> bool {
        matches!(self.terrain, TerrainKind::Wall)
    }

    pub fn is_passable(self) -> bool {
        self.terrain.is_passable()
    }
}

impl Default for Tile {
    fn default() -> Self {
        Self::WALL
    }
}
