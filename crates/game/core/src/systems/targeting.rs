//! Target validation shared by attack- and interact-style actions.

use crate::state::{Entity, GameWorld, Position};

/// Typed pass/fail result; callers treat failures as no-ops, never crashes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationResult {
    pub valid: bool,
    pub message: String,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            message: String::new(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: message.into(),
        }
    }
}

/// Integer Bresenham line-of-sight trace.
///
/// Blocking is ignored at the exact start and end cells: a target occupying
/// a wall-like cell is still visible, and standing next to a wall does not
/// blind you to what is past the opening. Any intervening wall cell rejects
/// the trace.
pub fn line_of_sight(world: &GameWorld, from: Position, to: Position) -> bool {
    let (mut x, mut y) = (from.x, from.y);
    let dx = (to.x - x).abs();
    let dy = -(to.y - y).abs();
    let sx = if x < to.x { 1 } else { -1 };
    let sy = if y < to.y { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        let here = Position::new(x, y);
        if here != from && here != to && world.is_opaque(here) {
            return false;
        }
        if x == to.x && y == to.y {
            return true;
        }
        let doubled = 2 * err;
        if doubled >= dy {
            err += dy;
            x += sx;
        }
        if doubled <= dx {
            err += dx;
            y += sy;
        }
    }
}

/// Shared gate for actions aimed at another entity: resolves existence,
/// same-level placement, Euclidean range, and (optionally) line of sight.
pub fn validate_interaction(
    actor: &Entity,
    target: Option<&Entity>,
    range_limit: f64,
    need_los: bool,
    world: &GameWorld,
) -> ValidationResult {
    let Some(target) = target else {
        return ValidationResult::fail("Target not found.");
    };
    if target.level != actor.level {
        return ValidationResult::fail("Target is too far away.");
    }
    let distance = actor.position.distance(target.position);
    if distance > range_limit {
        return ValidationResult::fail("Target is too far away.");
    }
    if need_los
        && distance > 0.0
        && !line_of_sight(world, actor.position, target.position)
    {
        return ValidationResult::fail("You cannot see the target.");
    }
    ValidationResult::ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{
        EntityAllocator, EntityKind, LevelId, StatsComponent, TerrainKind, Tile,
    };

    fn walled_world() -> GameWorld {
        let mut world = GameWorld::new(
            LevelId::SURFACE,
            12,
            12,
            vec![Tile::new(TerrainKind::Floor); 144],
        );
        for y in 0..12 {
            world.set_tile(Position::new(6, y), Tile::WALL);
        }
        world
    }

    fn at(alloc: &mut EntityAllocator, x: i32, y: i32, level: LevelId) -> Entity {
        Entity::new(
            alloc.allocate(EntityKind::Npc),
            "thing",
            Position::new(x, y),
            level,
        )
        .with_stats(StatsComponent::new(10, 2))
    }

    #[test]
    fn adjacent_wall_cell_is_a_valid_target() {
        let world = walled_world();
        assert!(line_of_sight(
            &world,
            Position::new(5, 5),
            Position::new(6, 5)
        ));
    }

    #[test]
    fn single_thick_wall_blocks_the_far_side() {
        let world = walled_world();
        assert!(!line_of_sight(
            &world,
            Position::new(5, 5),
            Position::new(7, 5)
        ));
        assert!(!line_of_sight(
            &world,
            Position::new(2, 5),
            Position::new(10, 5)
        ));
    }

    #[test]
    fn open_diagonals_pass() {
        let world = walled_world();
        assert!(line_of_sight(
            &world,
            Position::new(1, 1),
            Position::new(4, 9)
        ));
    }

    #[test]
    fn gate_checks_existence_level_and_range() {
        let mut alloc = EntityAllocator::new(0);
        let world = walled_world();
        let actor = at(&mut alloc, 2, 2, LevelId::SURFACE);

        let missing = validate_interaction(&actor, None, 5.0, false, &world);
        assert!(!missing.valid);
        assert_eq!(missing.message, "Target not found.");

        let elsewhere = at(&mut alloc, 3, 2, LevelId(3));
        let cross = validate_interaction(&actor, Some(&elsewhere), 5.0, false, &world);
        assert!(!cross.valid);

        let distant = at(&mut alloc, 2, 11, LevelId::SURFACE);
        let far = validate_interaction(&actor, Some(&distant), 1.5, false, &world);
        assert!(!far.valid);

        let near = at(&mut alloc, 3, 3, LevelId::SURFACE);
        assert!(validate_interaction(&actor, Some(&near), 1.5, false, &world).valid);
    }

    #[test]
    fn gate_applies_los_only_when_asked() {
        let mut alloc = EntityAllocator::new(0);
        let world = walled_world();
        let actor = at(&mut alloc, 4, 5, LevelId::SURFACE);
        let hidden = at(&mut alloc, 8, 5, LevelId::SURFACE);

        assert!(validate_interaction(&actor, Some(&hidden), 10.0, false, &world).valid);
        let blocked = validate_interaction(&actor, Some(&hidden), 10.0, true, &world);
        assert!(!blocked.valid);
        assert_eq!(blocked.message, "You cannot see the target.");
    }

    #[test]
    fn zero_distance_skips_los() {
        let mut alloc = EntityAllocator::new(0);
        let mut world = walled_world();
        world.set_tile(Position::new(3, 3), Tile::WALL);
        let actor = at(&mut alloc, 3, 3, LevelId::SURFACE);
        let same_cell = at(&mut alloc, 3, 3, LevelId::SURFACE);

        assert!(validate_interaction(&actor, Some(&same_cell), 1.0, true, &world).valid);
    }
}
