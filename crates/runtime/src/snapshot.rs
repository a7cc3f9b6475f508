//! Per-observer state snapshots.
//!
//! Builds the [`ServerResponse`] a single observer receives: tiles limited
//! to what they can currently see plus what their fog-of-war memory retains,
//! entities limited to currently visible cells, and stat hiding applied to
//! everyone but the observer itself.

use std::collections::HashSet;

use warren_core::{
    EntityId, GameWorld, LevelId, Position, TerrainKind, Visibility, refresh_vision,
};

use crate::protocol::{EntityView, GridSize, LogEntry, ResponseType, ServerResponse, TileView};

fn terrain_display(terrain: TerrainKind) -> (char, &'static str) {
    match terrain {
        TerrainKind::Floor => ('.', "#555555"),
        TerrainKind::Wall => ('#', "#888888"),
        TerrainKind::Water => ('~', "#3366AA"),
        TerrainKind::Void => (' ', "#000000"),
    }
}

/// Builds the full state frame for one observer. Returns `None` when the
/// observer is not registered on this level.
pub fn build_snapshot(
    world: &mut GameWorld,
    observer: EntityId,
    clock: u64,
    active_entity: EntityId,
    logs: Vec<LogEntry>,
) -> Option<ServerResponse> {
    world.entity(observer)?;

    let visibility = refresh_vision(world, observer).unwrap_or(Visibility::Tiles(HashSet::new()));
    let explored = explored_set(world, observer, world.level());

    let mut map = Vec::new();
    for index in 0..(world.width() * world.height()) as usize {
        let visible = visibility.contains(index);
        let remembered = explored.contains(&index);
        if !visible && !remembered && !matches!(visibility, Visibility::Omniscient) {
            continue;
        }
        let position = world.position_of_index(index);
        let tile = world.tile(position)?;
        let (symbol, color) = terrain_display(tile.terrain());
        map.push(TileView {
            x: position.x,
            y: position.y,
            symbol,
            color: color.to_string(),
            visible,
            explored: remembered || visible,
        });
    }

    let mut entities: Vec<EntityView> = world
        .entities()
        .filter(|entity| {
            world.in_bounds(entity.position)
                && visibility.contains(world.tile_index(entity.position))
        })
        .filter_map(|entity| {
            let glyph = entity.glyph()?;
            let stats = entity.stats;
            let is_self = entity.id == observer;
            Some(EntityView {
                id: entity.id,
                name: entity.name.clone(),
                x: entity.position.x,
                y: entity.position.y,
                symbol: glyph.symbol(),
                color: glyph.color_hex(),
                hp: stats.map(|s| s.hp).unwrap_or(0),
                is_dead: stats.map(|s| s.is_dead).unwrap_or(false),
                max_hp: is_self.then(|| stats.map(|s| s.max_hp)).flatten(),
                stamina: is_self.then(|| stats.map(|s| s.stamina)).flatten(),
                max_stamina: is_self.then(|| stats.map(|s| s.max_stamina)).flatten(),
                strength: is_self.then(|| stats.map(|s| s.strength)).flatten(),
                gold: is_self.then(|| stats.map(|s| s.gold)).flatten(),
            })
        })
        .collect();
    entities.sort_by_key(|view| view.id);

    Some(ServerResponse {
        response_type: ResponseType::State,
        tick: clock,
        active_entity_id: Some(active_entity),
        my_entity_id: Some(observer),
        grid: Some(GridSize {
            w: world.width(),
            h: world.height(),
        }),
        map: Some(map),
        entities: Some(entities),
        logs: (!logs.is_empty()).then_some(logs),
    })
}

fn explored_set(world: &GameWorld, observer: EntityId, level: LevelId) -> HashSet<usize> {
    world
        .entity(observer)
        .and_then(|e| e.memory.as_ref())
        .and_then(|m| m.explored_on(level))
        .cloned()
        .unwrap_or_default()
}

/// Convenience used by tests and debug tooling: whether `target` is on a
/// tile `observer` currently sees.
pub fn observer_sees(world: &mut GameWorld, observer: EntityId, target: Position) -> bool {
    let Some(visibility) = refresh_vision(world, observer) else {
        return false;
    };
    world.in_bounds(target) && visibility.contains(world.tile_index(target))
}
