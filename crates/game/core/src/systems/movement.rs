//! Movement legality queries.

use crate::state::{Entity, EntityId, GameWorld, Position};

/// Result of a movement legality check.
///
/// `blocked_by_wall` and `blocker` are mutually exclusive: a move is stopped
/// by terrain or by a living entity, never both. The caller decides whether
/// a blocking entity becomes an attack (hostility mismatch) or simply makes
/// the cell impassable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MoveOutcome {
    pub new_x: i32,
    pub new_y: i32,
    pub moved: bool,
    pub blocked_by_wall: bool,
    pub blocker: Option<EntityId>,
}

/// Pure query: where would `actor` end up moving by `(dx, dy)`, and what
/// stops it. Performs no mutation; identical inputs always return identical
/// results.
pub fn calculate_move(world: &GameWorld, actor: &Entity, dx: i32, dy: i32) -> MoveOutcome {
    let destination = actor.position.shifted(dx, dy);
    let mut outcome = MoveOutcome {
        new_x: destination.x,
        new_y: destination.y,
        moved: false,
        blocked_by_wall: false,
        blocker: None,
    };

    let passable = world
        .tile(destination)
        .map(|t| t.is_passable())
        .unwrap_or(false);
    if !passable {
        outcome.blocked_by_wall = true;
        return outcome;
    }

    if let Some(blocker) = world.living_entity_at(destination)
        && blocker != actor.id
    {
        outcome.blocker = Some(blocker);
        return outcome;
    }

    outcome.moved = true;
    outcome
}

/// Destination as a position, for callers that go on to mutate the world.
impl MoveOutcome {
    pub fn destination(&self) -> Position {
        Position::new(self.new_x, self.new_y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{
        EntityAllocator, EntityKind, LevelId, StatsComponent, TerrainKind, Tile,
    };

    fn world_with_wall_at_5_5() -> GameWorld {
        let mut world = GameWorld::new(
            LevelId::SURFACE,
            10,
            10,
            vec![Tile::new(TerrainKind::Floor); 100],
        );
        world.set_tile(Position::new(5, 5), Tile::WALL);
        world
    }

    fn actor_at(alloc: &mut EntityAllocator, x: i32, y: i32) -> Entity {
        Entity::new(
            alloc.allocate(EntityKind::Player),
            "hero",
            Position::new(x, y),
            LevelId::SURFACE,
        )
        .with_stats(StatsComponent::new(20, 5))
    }

    #[test]
    fn wall_blocks_and_sets_only_the_wall_flag() {
        let mut alloc = EntityAllocator::new(0);
        let world = world_with_wall_at_5_5();
        let actor = actor_at(&mut alloc, 4, 5);

        let outcome = calculate_move(&world, &actor, 1, 0);
        assert!(!outcome.moved);
        assert!(outcome.blocked_by_wall);
        assert_eq!(outcome.blocker, None);
        assert_eq!((outcome.new_x, outcome.new_y), (5, 5));
    }

    #[test]
    fn open_floor_moves() {
        let mut alloc = EntityAllocator::new(0);
        let world = world_with_wall_at_5_5();
        let actor = actor_at(&mut alloc, 4, 5);

        let outcome = calculate_move(&world, &actor, 0, -1);
        assert!(outcome.moved);
        assert_eq!((outcome.new_x, outcome.new_y), (4, 4));
        assert!(!outcome.blocked_by_wall);
        assert_eq!(outcome.blocker, None);
    }

    #[test]
    fn living_entity_blocks_without_wall_flag() {
        let mut alloc = EntityAllocator::new(0);
        let mut world = world_with_wall_at_5_5();
        let rat = world.spawn(
            Entity::new(
                alloc.allocate(EntityKind::Npc),
                "rat",
                Position::new(4, 4),
                LevelId::SURFACE,
            )
            .with_stats(StatsComponent::new(5, 1)),
        );
        let actor = actor_at(&mut alloc, 4, 5);

        let outcome = calculate_move(&world, &actor, 0, -1);
        assert!(!outcome.moved);
        assert!(!outcome.blocked_by_wall);
        assert_eq!(outcome.blocker, Some(rat));
    }

    #[test]
    fn corpses_do_not_block() {
        let mut alloc = EntityAllocator::new(0);
        let mut world = world_with_wall_at_5_5();
        let rat = world.spawn(
            Entity::new(
                alloc.allocate(EntityKind::Npc),
                "rat",
                Position::new(4, 4),
                LevelId::SURFACE,
            )
            .with_stats(StatsComponent::new(5, 1)),
        );
        world
            .entity_mut(rat)
            .unwrap()
            .stats
            .as_mut()
            .unwrap()
            .take_damage(99);
        let actor = actor_at(&mut alloc, 4, 5);

        let outcome = calculate_move(&world, &actor, 0, -1);
        assert!(outcome.moved);
    }

    #[test]
    fn repeated_calls_agree() {
        let mut alloc = EntityAllocator::new(0);
        let world = world_with_wall_at_5_5();
        let actor = actor_at(&mut alloc, 4, 5);

        let first = calculate_move(&world, &actor, 1, 0);
        for _ in 0..8 {
            assert_eq!(calculate_move(&world, &actor, 1, 0), first);
        }
    }

    #[test]
    fn leaving_the_grid_counts_as_wall() {
        let mut alloc = EntityAllocator::new(0);
        let world = world_with_wall_at_5_5();
        let actor = actor_at(&mut alloc, 0, 0);

        let outcome = calculate_move(&world, &actor, -1, 0);
        assert!(!outcome.moved);
        assert!(outcome.blocked_by_wall);
    }
}
