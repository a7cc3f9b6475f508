//! Deterministic simulation core for the warren dungeon server.
//!
//! `warren-core` owns the canonical rules: the entity-component world model,
//! the turn queue, visibility, movement/combat/targeting systems, command
//! handlers, and procedural level generation. Everything here is pure and
//! synchronous; the runtime crate layers scheduling and transport on top of
//! the types re-exported below.
pub mod action;
pub mod config;
pub mod dungeon;
pub mod rng;
pub mod state;
pub mod systems;
pub mod turn;

pub use action::{
    ActionError, ActionKind, ActionOutcome, DirectionPayload, EntityPayload, GameEvent,
    HandlerContext, ItemPayload, LogCategory, LogLine, TalkPayload, execute, handler_for,
};
pub use config::GameConfig;
pub use dungeon::{GeneratedLevel, generate_level};
pub use rng::{GameRng, level_seed};
pub use state::{
    AiComponent, AiState, Entity, EntityAllocator, EntityId, EntityKind, Glyph, GameWorld,
    InventoryComponent, ItemCategory, ItemComponent, LevelId, MemoryComponent, Personality,
    Position, StatsComponent, TerrainKind, Tile, TriggerComponent, TriggerKind, VisionComponent,
    WorldError,
};
pub use systems::{
    MoveOutcome, ValidationResult, Visibility, apply_attack, calculate_move, compute_fov,
    line_of_sight, refresh_vision, validate_interaction,
};
pub use turn::{TurnItem, TurnQueue};
