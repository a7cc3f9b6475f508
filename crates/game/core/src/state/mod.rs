//! Authoritative simulation state: identifiers, geometry, tiles, entities,
//! and the per-level world container. Runtime layers query this state but
//! mutate it only through action handlers and systems.
mod entity;
mod glyph;
mod ids;
mod position;
mod tile;
mod world;

pub use entity::{
    AiComponent, AiState, Entity, EquipmentComponent, InventoryComponent, ItemCategory,
    ItemComponent, MemoryComponent, NarrativeComponent, Personality, RenderComponent,
    StatsComponent, StowError, TriggerComponent, TriggerKind, VisionComponent,
};
pub use glyph::Glyph;
pub use ids::{EntityAllocator, EntityId, EntityKind, LevelId};
pub use position::Position;
pub use tile::{TerrainKind, Tile};
pub use world::{GameWorld, WorldError};
