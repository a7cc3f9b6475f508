//! Per-level authoritative world state.
//!
//! A [`GameWorld`] owns one level's tile grid, the id → entity registry, and
//! the cell → occupants spatial index. Invariant: every live placed entity
//! appears in exactly one spatial bucket (its current cell) and exactly once
//! in the registry; every removal clears both sides or reports a desync
//! instead of leaving a dangling reference.

use std::collections::HashMap;

use arrayvec::ArrayVec;

use crate::config::GameConfig;

use super::entity::Entity;
use super::ids::{EntityId, LevelId};
use super::position::Position;
use super::tile::Tile;

type OccupantSlots = ArrayVec<EntityId, { GameConfig::MAX_OCCUPANTS_PER_TILE }>;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    #[error("position {position} is out of bounds")]
    OutOfBounds { position: Position },

    #[error("entity {0} is not registered on this level")]
    UnknownEntity(EntityId),

    #[error("tile at {position} has no free occupant slot")]
    TileFull { position: Position },

    #[error("occupancy desync for entity {entity} at {position}")]
    OccupancyDesync { entity: EntityId, position: Position },
}

/// One level's grid, registry, and spatial index.
#[derive(Clone, Debug, Default)]
pub struct GameWorld {
    level: LevelId,
    width: i32,
    height: i32,
    tiles: Vec<Tile>,
    registry: HashMap<EntityId, Entity>,
    occupancy: HashMap<Position, OccupantSlots>,
}

impl GameWorld {
    pub fn new(level: LevelId, width: i32, height: i32, tiles: Vec<Tile>) -> Self {
        debug_assert_eq!(tiles.len(), (width * height) as usize);
        Self {
            level,
            width,
            height,
            tiles,
            registry: HashMap::new(),
            occupancy: HashMap::new(),
        }
    }

    pub fn level(&self) -> LevelId {
        self.level
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn in_bounds(&self, position: Position) -> bool {
        position.x >= 0 && position.y >= 0 && position.x < self.width && position.y < self.height
    }

    /// Flattened tile index; callers must check bounds first.
    pub fn tile_index(&self, position: Position) -> usize {
        (position.y * self.width + position.x) as usize
    }

    pub fn position_of_index(&self, index: usize) -> Position {
        Position::new(index as i32 % self.width, index as i32 / self.width)
    }

    pub fn tile(&self, position: Position) -> Option<Tile> {
        if !self.in_bounds(position) {
            return None;
        }
        Some(self.tiles[self.tile_index(position)])
    }

    pub fn set_tile(&mut self, position: Position, tile: Tile) {
        if self.in_bounds(position) {
            let index = self.tile_index(position);
            self.tiles[index] = tile;
        }
    }

    pub fn is_wall(&self, position: Position) -> bool {
        self.tile(position).map(|t| t.is_wall()).unwrap_or(false)
    }

    /// Vision/line-of-sight blocking test; anything off the grid blocks.
    pub fn is_opaque(&self, position: Position) -> bool {
        self.tile(position).map(|t| t.is_wall()).unwrap_or(true)
    }

    // ------------------------------------------------------------------
    // Registry
    // ------------------------------------------------------------------

    pub fn register_entity(&mut self, entity: Entity) {
        self.registry.insert(entity.id, entity);
    }

    pub fn unregister_entity(&mut self, id: EntityId) -> Option<Entity> {
        self.registry.remove(&id)
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.registry.get(&id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.registry.get_mut(&id)
    }

    /// Disjoint mutable access to two distinct entities, used by combat to
    /// resolve attacker and target in one call.
    pub fn pair_mut(&mut self, a: EntityId, b: EntityId) -> Option<(&mut Entity, &mut Entity)> {
        if a == b {
            return None;
        }
        match self.registry.get_disjoint_mut([&a, &b]) {
            [Some(first), Some(second)] => Some((first, second)),
            _ => None,
        }
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.registry.values()
    }

    pub fn entity_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.registry.keys().copied()
    }

    pub fn entity_count(&self) -> usize {
        self.registry.len()
    }

    // ------------------------------------------------------------------
    // Spatial index
    // ------------------------------------------------------------------

    /// Adds a registered entity to the bucket of its current cell.
    pub fn add_entity(&mut self, id: EntityId) -> bool {
        let Some(position) = self.registry.get(&id).map(|e| e.position) else {
            return false;
        };
        let slot = self.occupancy.entry(position).or_default();
        if slot.contains(&id) {
            return true;
        }
        slot.try_push(id).is_ok()
    }

    /// Removes an entity from its cell's bucket via swap-remove, verifying
    /// it was actually there.
    pub fn remove_entity(&mut self, id: EntityId) -> bool {
        let Some(position) = self.registry.get(&id).map(|e| e.position) else {
            return false;
        };
        self.remove_from_bucket(position, id)
    }

    fn remove_from_bucket(&mut self, position: Position, id: EntityId) -> bool {
        let Some(slot) = self.occupancy.get_mut(&position) else {
            return false;
        };
        let Some(index) = slot.iter().position(|occupant| *occupant == id) else {
            return false;
        };
        slot.swap_remove(index);
        if slot.is_empty() {
            self.occupancy.remove(&position);
        }
        true
    }

    /// Entities occupying a cell; empty for vacant or out-of-grid cells.
    pub fn entities_at(&self, position: Position) -> &[EntityId] {
        self.occupancy
            .get(&position)
            .map(|slot| slot.as_slice())
            .unwrap_or(&[])
    }

    /// First living entity on a cell, if any. Corpses and items don't count.
    pub fn living_entity_at(&self, position: Position) -> Option<EntityId> {
        self.entities_at(position)
            .iter()
            .copied()
            .find(|id| self.entity(*id).is_some_and(|e| e.is_alive()))
    }

    /// Moves an entity to a new cell, keeping registry position and spatial
    /// index in lockstep. On any failure no partial state change remains.
    pub fn update_entity_pos(&mut self, id: EntityId, position: Position) -> Result<(), WorldError> {
        if !self.in_bounds(position) {
            return Err(WorldError::OutOfBounds { position });
        }
        let origin = self
            .registry
            .get(&id)
            .map(|e| e.position)
            .ok_or(WorldError::UnknownEntity(id))?;
        if origin == position {
            return Ok(());
        }

        if !self.remove_from_bucket(origin, id) {
            return Err(WorldError::OccupancyDesync {
                entity: id,
                position: origin,
            });
        }
        let slot = self.occupancy.entry(position).or_default();
        if slot.try_push(id).is_err() {
            // Roll the removal back before reporting.
            self.occupancy
                .entry(origin)
                .or_default()
                .try_push(id)
                .expect("origin slot had room a moment ago");
            return Err(WorldError::TileFull { position });
        }

        self.registry
            .get_mut(&id)
            .expect("registry entry checked above")
            .position = position;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Registers and places an entity in one step.
    pub fn spawn(&mut self, mut entity: Entity) -> EntityId {
        entity.level = self.level;
        let id = entity.id;
        self.register_entity(entity);
        if !self.add_entity(id) {
            tracing::warn!(entity = %id, "spawned entity had no free occupant slot");
        }
        id
    }

    /// Removes an entity from both the spatial index and the registry,
    /// returning it for hand-off (inventory, level transition).
    pub fn despawn(&mut self, id: EntityId) -> Option<Entity> {
        self.remove_entity(id);
        self.unregister_entity(id)
    }
}
