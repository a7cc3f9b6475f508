//! Field-of-view computation and fog-of-war memory.
//!
//! Recursive shadow-casting: eight octant coordinate transforms feed one
//! scan routine that walks rows outward from the observer while narrowing a
//! visible slope interval `[start, end]`. When a blocking tile interrupts a
//! row the routine recurses into a narrower sub-scan for the deeper rows and
//! resumes the parent scan past the obstruction.
//!
//! The observer's own tile is always visible. Radius checks compare squared
//! distance against `radius²`; off-grid coordinates block propagation.

use std::collections::HashSet;

use crate::state::{EntityId, GameWorld, Position};

/// Result of a visibility query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Visibility {
    /// Observer sees the whole level; not a finite set.
    Omniscient,
    /// Flattened tile indices currently visible.
    Tiles(HashSet<usize>),
}

impl Visibility {
    pub fn contains(&self, tile_index: usize) -> bool {
        match self {
            Visibility::Omniscient => true,
            Visibility::Tiles(tiles) => tiles.contains(&tile_index),
        }
    }
}

/// Octant transforms (xx, xy, yx, yy) mapping scan coordinates onto the
/// grid; together they cover the full circle.
const OCTANTS: [[i32; 4]; 8] = [
    [1, 0, 0, 1],
    [0, 1, 1, 0],
    [0, -1, 1, 0],
    [-1, 0, 0, 1],
    [-1, 0, 0, -1],
    [0, -1, -1, 0],
    [0, 1, -1, 0],
    [1, 0, 0, -1],
];

/// Computes the set of visible tile indices from `origin`.
pub fn compute_fov(world: &GameWorld, origin: Position, radius: u32) -> HashSet<usize> {
    let mut visible = HashSet::new();
    if world.in_bounds(origin) {
        visible.insert(world.tile_index(origin));
    }
    for octant in &OCTANTS {
        scan_octant(
            world,
            &mut visible,
            origin,
            radius,
            1,
            1.0,
            0.0,
            octant[0],
            octant[1],
            octant[2],
            octant[3],
        );
    }
    visible
}

#[allow(clippy::too_many_arguments)]
fn scan_octant(
    world: &GameWorld,
    visible: &mut HashSet<usize>,
    origin: Position,
    radius: u32,
    row: i32,
    mut start: f64,
    end: f64,
    xx: i32,
    xy: i32,
    yx: i32,
    yy: i32,
) {
    if start < end {
        return;
    }
    let radius_sq = (radius as i64) * (radius as i64);
    let mut next_start = 0.0;
    let mut blocked = false;

    for distance in row..=radius as i32 {
        if blocked {
            break;
        }
        let dy = -distance;
        for dx in -distance..=0 {
            let left_slope = (dx as f64 - 0.5) / (dy as f64 + 0.5);
            let right_slope = (dx as f64 + 0.5) / (dy as f64 - 0.5);
            if start < right_slope {
                continue;
            }
            if end > left_slope {
                break;
            }

            let current = Position::new(origin.x + dx * xx + dy * xy, origin.y + dx * yx + dy * yy);
            let delta_sq = (dx as i64) * (dx as i64) + (dy as i64) * (dy as i64);
            if delta_sq <= radius_sq && world.in_bounds(current) {
                visible.insert(world.tile_index(current));
            }

            if blocked {
                if world.is_opaque(current) {
                    next_start = right_slope;
                } else {
                    blocked = false;
                    start = next_start;
                }
            } else if world.is_opaque(current) && distance < radius as i32 {
                // Recurse below the blocker with a narrowed interval, then
                // resume this row past it.
                blocked = true;
                scan_octant(
                    world,
                    visible,
                    origin,
                    radius,
                    distance + 1,
                    start,
                    left_slope,
                    xx,
                    xy,
                    yx,
                    yy,
                );
                next_start = right_slope;
            }
        }
    }
}

/// Cache-aware visibility for a registered observer.
///
/// A clean cache is returned verbatim; a dirty one is recomputed, stored
/// back, and the newly visible tiles are OR'd into the observer's explored
/// memory for this level. Returns `None` for entities without vision.
pub fn refresh_vision(world: &mut GameWorld, id: EntityId) -> Option<Visibility> {
    let (origin, radius, omniscient, cached) = {
        let entity = world.entity(id)?;
        let vision = entity.vision.as_ref()?;
        let cached = (!vision.dirty).then(|| vision.cache.clone());
        (entity.position, vision.radius, vision.omniscient, cached)
    };

    if omniscient {
        return Some(Visibility::Omniscient);
    }
    if let Some(cache) = cached {
        return Some(Visibility::Tiles(cache));
    }

    let tiles = compute_fov(world, origin, radius);
    let level = world.level();
    let entity = world.entity_mut(id)?;
    if let Some(memory) = entity.memory.as_mut() {
        memory.remember(level, tiles.iter().copied());
    }
    if let Some(vision) = entity.vision.as_mut() {
        vision.cache = tiles.clone();
        vision.dirty = false;
    }
    Some(Visibility::Tiles(tiles))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Entity, EntityAllocator, EntityKind, LevelId, TerrainKind, Tile};

    fn open_world(width: i32, height: i32) -> GameWorld {
        let tiles = vec![Tile::new(TerrainKind::Floor); (width * height) as usize];
        GameWorld::new(LevelId::SURFACE, width, height, tiles)
    }

    #[test]
    fn own_tile_is_always_visible() {
        let world = open_world(12, 12);
        let origin = Position::new(6, 6);
        let visible = compute_fov(&world, origin, 4);
        assert!(visible.contains(&world.tile_index(origin)));
    }

    #[test]
    fn indices_stay_inside_the_grid() {
        let world = open_world(8, 8);
        // Observer in a corner pushes scans off-grid in most directions.
        let visible = compute_fov(&world, Position::new(0, 0), 10);
        for index in visible {
            assert!(index < 64);
        }
    }

    #[test]
    fn radius_bounds_the_visible_set() {
        let world = open_world(32, 32);
        let origin = Position::new(16, 16);
        let visible = compute_fov(&world, origin, 3);
        for index in visible {
            let tile = world.position_of_index(index);
            assert!(origin.distance_sq(tile) <= 9, "{tile} beyond radius");
        }
    }

    #[test]
    fn adjacent_wall_face_is_visible_but_nothing_behind_it() {
        let mut world = open_world(12, 12);
        for y in 0..12 {
            world.set_tile(Position::new(5, y), Tile::WALL);
        }
        let visible = compute_fov(&world, Position::new(3, 5), 8);

        assert!(visible.contains(&world.tile_index(Position::new(5, 5))));
        assert!(!visible.contains(&world.tile_index(Position::new(7, 5))));
        assert!(!visible.contains(&world.tile_index(Position::new(9, 5))));
    }

    #[test]
    fn omniscient_observers_get_the_sentinel() {
        let mut world = open_world(8, 8);
        let mut alloc = EntityAllocator::new(0);
        let id = world.spawn(
            Entity::new(
                alloc.allocate(EntityKind::Player),
                "seer",
                Position::new(4, 4),
                LevelId::SURFACE,
            )
            .with_vision(4),
        );
        world.entity_mut(id).unwrap().vision.as_mut().unwrap().omniscient = true;

        assert_eq!(refresh_vision(&mut world, id), Some(Visibility::Omniscient));
    }

    #[test]
    fn clean_cache_is_reused_and_memory_accumulates() {
        let mut world = open_world(10, 10);
        let mut alloc = EntityAllocator::new(0);
        let id = world.spawn(
            Entity::new(
                alloc.allocate(EntityKind::Player),
                "scout",
                Position::new(2, 2),
                LevelId::SURFACE,
            )
            .with_vision(3)
            .with_memory(),
        );

        let first = refresh_vision(&mut world, id).unwrap();
        let Visibility::Tiles(first_tiles) = first else {
            panic!("finite observer")
        };
        assert!(!world.entity(id).unwrap().vision.as_ref().unwrap().dirty);

        // Move without invalidating: the stale cache comes back verbatim.
        world.update_entity_pos(id, Position::new(7, 7)).unwrap();
        let stale = refresh_vision(&mut world, id).unwrap();
        assert_eq!(stale, Visibility::Tiles(first_tiles.clone()));

        // Invalidate and recompute; memory keeps both areas.
        world
            .entity_mut(id)
            .unwrap()
            .vision
            .as_mut()
            .unwrap()
            .invalidate();
        let Visibility::Tiles(second_tiles) = refresh_vision(&mut world, id).unwrap() else {
            panic!("finite observer")
        };
        assert_ne!(second_tiles, first_tiles);

        let entity = world.entity(id).unwrap();
        let explored = entity
            .memory
            .as_ref()
            .unwrap()
            .explored_on(LevelId::SURFACE)
            .unwrap();
        for index in first_tiles.iter().chain(second_tiles.iter()) {
            assert!(explored.contains(index));
        }
    }
}
