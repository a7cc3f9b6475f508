//! Machine-controlled turn decisions.
//!
//! Synchronous and deterministic given the level RNG stream: hostile NPCs
//! hunt the nearest living player they can see, attack when adjacent, and
//! otherwise fall back to their personality (patrol, retreat, or idle).
//! AI turns never block.

use warren_core::{
    AiState, EntityId, GameRng, GameWorld, LogCategory, LogLine, Personality, Position,
    apply_attack, calculate_move, line_of_sight,
};

/// Resolves one NPC turn, mutating the world. Returns log lines for the
/// level's observers.
pub fn take_turn(world: &mut GameWorld, rng: &mut GameRng, actor: EntityId) -> Vec<LogLine> {
    let Some((position, hostile, personality, radius)) = world.entity(actor).and_then(|e| {
        let ai = e.ai?;
        e.stats?.is_alive().then_some(())?;
        Some((
            e.position,
            ai.hostile,
            ai.personality,
            e.vision.as_ref().map(|v| v.radius).unwrap_or(6),
        ))
    }) else {
        return Vec::new();
    };

    let prey = nearest_living_player(world, position);

    if hostile
        && let Some((target, target_pos)) = prey
        && position.distance_sq(target_pos) <= (radius as i64) * (radius as i64)
        && line_of_sight(world, position, target_pos)
    {
        set_state(world, actor, AiState::Hunting);

        if position.is_adjacent(target_pos) {
            let Some((attacker, target)) = world.pair_mut(actor, target) else {
                return Vec::new();
            };
            let line = apply_attack(attacker, target);
            return vec![LogLine::new(LogCategory::Combat, line)];
        }

        let (dx, dy) = position.direction_to(target_pos);
        step(world, actor, &[(dx, dy), (dx, 0), (0, dy)]);
        return Vec::new();
    }

    set_state(world, actor, AiState::Idle);
    match personality {
        Personality::Aggressive => {
            wander(world, rng, actor);
        }
        Personality::Skittish => {
            if let Some((_, threat_pos)) = prey
                && position.is_adjacent(threat_pos)
            {
                let (dx, dy) = threat_pos.direction_to(position);
                step(world, actor, &[(dx, dy), (dx, 0), (0, dy)]);
            } else if rng.chance(30) {
                wander(world, rng, actor);
            }
        }
        Personality::Lazy => {
            if rng.chance(20) {
                wander(world, rng, actor);
            }
        }
    }
    Vec::new()
}

fn nearest_living_player(world: &GameWorld, from: Position) -> Option<(EntityId, Position)> {
    world
        .entities()
        .filter(|e| e.id.is_player() && e.is_alive())
        .min_by_key(|e| (from.distance_sq(e.position), e.id))
        .map(|e| (e.id, e.position))
}

fn set_state(world: &mut GameWorld, actor: EntityId, state: AiState) {
    if let Some(ai) = world.entity_mut(actor).and_then(|e| e.ai.as_mut()) {
        ai.state = state;
    }
}

/// Tries each delta in order; applies the first legal step.
fn step(world: &mut GameWorld, actor: EntityId, deltas: &[(i32, i32)]) -> bool {
    for &(dx, dy) in deltas {
        if dx == 0 && dy == 0 {
            continue;
        }
        let Some(entity) = world.entity(actor) else {
            return false;
        };
        let outcome = calculate_move(world, entity, dx, dy);
        if outcome.moved {
            if world.update_entity_pos(actor, outcome.destination()).is_ok() {
                if let Some(vision) = world.entity_mut(actor).and_then(|e| e.vision.as_mut()) {
                    vision.invalidate();
                }
                return true;
            }
        }
    }
    false
}

const DIRECTIONS: [(i32, i32); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

fn wander(world: &mut GameWorld, rng: &mut GameRng, actor: EntityId) -> bool {
    let delta = *rng.pick(&DIRECTIONS);
    step(world, actor, &[delta])
}

#[cfg(test)]
mod tests {
    use super::*;
    use warren_core::{
        AiComponent, Entity, EntityAllocator, EntityKind, LevelId, Personality, StatsComponent,
        TerrainKind, Tile,
    };

    fn arena() -> (GameWorld, EntityAllocator) {
        (
            GameWorld::new(
                LevelId::SURFACE,
                16,
                16,
                vec![Tile::new(TerrainKind::Floor); 256],
            ),
            EntityAllocator::new(0),
        )
    }

    fn player(world: &mut GameWorld, alloc: &mut EntityAllocator, x: i32, y: i32) -> EntityId {
        world.spawn(
            Entity::new(
                alloc.allocate(EntityKind::Player),
                "hero",
                Position::new(x, y),
                LevelId::SURFACE,
            )
            .with_stats(StatsComponent::new(20, 5)),
        )
    }

    fn goblin(world: &mut GameWorld, alloc: &mut EntityAllocator, x: i32, y: i32) -> EntityId {
        world.spawn(
            Entity::new(
                alloc.allocate(EntityKind::Npc),
                "goblin",
                Position::new(x, y),
                LevelId::SURFACE,
            )
            .with_stats(StatsComponent::new(10, 2))
            .with_ai(AiComponent::hostile(Personality::Aggressive))
            .with_vision(6),
        )
    }

    #[test]
    fn adjacent_hostile_attacks_the_player() {
        let (mut world, mut alloc) = arena();
        let hero = player(&mut world, &mut alloc, 5, 5);
        let gob = goblin(&mut world, &mut alloc, 5, 6);
        let mut rng = GameRng::from_seed(1);

        let logs = take_turn(&mut world, &mut rng, gob);
        assert_eq!(logs.len(), 1);
        assert_eq!(world.entity(hero).unwrap().stats.unwrap().hp, 18);
        assert_eq!(
            world.entity(gob).unwrap().ai.unwrap().state,
            AiState::Hunting
        );
    }

    #[test]
    fn visible_hostile_closes_the_distance() {
        let (mut world, mut alloc) = arena();
        let _hero = player(&mut world, &mut alloc, 5, 5);
        let gob = goblin(&mut world, &mut alloc, 9, 5);
        let mut rng = GameRng::from_seed(1);

        take_turn(&mut world, &mut rng, gob);
        assert_eq!(world.entity(gob).unwrap().position, Position::new(8, 5));
    }

    #[test]
    fn hostile_behind_a_wall_does_not_hunt() {
        let (mut world, mut alloc) = arena();
        for y in 0..16 {
            world.set_tile(Position::new(7, y), Tile::WALL);
        }
        let _hero = player(&mut world, &mut alloc, 5, 5);
        let gob = goblin(&mut world, &mut alloc, 9, 5);
        let mut rng = GameRng::from_seed(1);

        take_turn(&mut world, &mut rng, gob);
        assert_eq!(
            world.entity(gob).unwrap().ai.unwrap().state,
            AiState::Idle
        );
    }

    #[test]
    fn dead_actors_do_nothing() {
        let (mut world, mut alloc) = arena();
        let _hero = player(&mut world, &mut alloc, 5, 5);
        let gob = goblin(&mut world, &mut alloc, 5, 6);
        world
            .entity_mut(gob)
            .unwrap()
            .stats
            .as_mut()
            .unwrap()
            .take_damage(99);
        let mut rng = GameRng::from_seed(1);

        assert!(take_turn(&mut world, &mut rng, gob).is_empty());
    }
}
