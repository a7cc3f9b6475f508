//! Procedural level generation.
//!
//! Deterministic per seed: rooms are placed by rejection sampling on
//! bounding-box overlap, consecutive rooms are joined by L-shaped corridors
//! whose leg order the RNG picks, exit triggers land in the first and last
//! rooms, and enemies/items populate from depth-scaled weighted templates.
//! The same seed always yields the same level.

use crate::config::GameConfig;
use crate::rng::GameRng;
use crate::state::{
    AiComponent, Entity, EntityAllocator, EntityKind, GameWorld, ItemComponent, LevelId,
    Personality, Position, StatsComponent, Tile, TriggerKind,
};

/// Axis-aligned room rectangle (interior coordinates, walls excluded).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Room {
    x: i32,
    y: i32,
    w: i32,
    h: i32,
}

impl Room {
    fn center(&self) -> Position {
        Position::new(self.x + self.w / 2, self.y + self.h / 2)
    }

    /// Overlap test with a one-tile margin so rooms keep a shared wall.
    fn intersects(&self, other: &Room) -> bool {
        self.x - 1 < other.x + other.w
            && self.x + self.w + 1 > other.x
            && self.y - 1 < other.y + other.h
            && self.y + self.h + 1 > other.y
    }

    fn random_point(&self, rng: &mut GameRng) -> Position {
        Position::new(
            rng.range(self.x, self.x + self.w - 1),
            rng.range(self.y, self.y + self.h - 1),
        )
    }
}

/// A freshly generated level plus the landmark positions the orchestrator
/// needs for spawning and level transitions.
pub struct GeneratedLevel {
    pub world: GameWorld,
    /// Player entry point; never a wall tile.
    pub start: Position,
    /// Arrival point when coming up from the level below.
    pub down_exit: Position,
    /// Arrival point when coming down from the level above, if this level
    /// has an upward exit.
    pub up_exit: Option<Position>,
}

const MAX_ROOMS: usize = 12;
const ROOM_MIN: i32 = 4;
const ROOM_MAX: i32 = 9;
const PLACEMENT_ATTEMPTS: usize = 90;

/// Builds one level. `alloc` spans levels so entity ids stay globally
/// unique within the shard.
pub fn generate_level(
    alloc: &mut EntityAllocator,
    level: LevelId,
    seed: u64,
    config: &GameConfig,
) -> GeneratedLevel {
    let mut rng = GameRng::from_seed(seed);
    let (width, height) = (config.level_width, config.level_height);
    let mut tiles = vec![Tile::WALL; (width * height) as usize];

    // Rejection-sampled room placement.
    let mut rooms: Vec<Room> = Vec::new();
    for _ in 0..PLACEMENT_ATTEMPTS {
        if rooms.len() >= MAX_ROOMS {
            break;
        }
        let w = rng.range(ROOM_MIN, ROOM_MAX);
        let h = rng.range(ROOM_MIN, ROOM_MAX);
        let x = rng.range(1, width - w - 2);
        let y = rng.range(1, height - h - 2);
        let candidate = Room { x, y, w, h };
        if rooms.iter().any(|room| room.intersects(&candidate)) {
            continue;
        }
        rooms.push(candidate);
    }
    debug_assert!(!rooms.is_empty(), "grid large enough for at least one room");

    for room in &rooms {
        carve_room(&mut tiles, width, room);
    }

    // Connect consecutive rooms; the RNG picks which corridor leg runs
    // first.
    for pair in rooms.windows(2) {
        let (a, b) = (pair[0].center(), pair[1].center());
        if rng.chance(50) {
            carve_h_corridor(&mut tiles, width, a.x, b.x, a.y);
            carve_v_corridor(&mut tiles, width, a.y, b.y, b.x);
        } else {
            carve_v_corridor(&mut tiles, width, a.y, b.y, a.x);
            carve_h_corridor(&mut tiles, width, a.x, b.x, b.y);
        }
    }

    let mut world = GameWorld::new(level, width, height, tiles);

    let first = rooms[0];
    let last = rooms[rooms.len() - 1];
    let start = first.center();

    // Exits: up in the first room (except on the surface), down in the
    // last. With a single room the two get distinct cells.
    let down_exit = if rooms.len() == 1 {
        Position::new(last.center().x - 1, last.center().y)
    } else {
        last.center()
    };
    world.spawn(
        Entity::new(
            alloc.allocate(EntityKind::Prop),
            "stairs down",
            down_exit,
            level,
        )
        .with_render(0xDDDDDD, b'>')
        .with_narrative("Rough-hewn steps wind down into the dark.")
        .with_trigger(TriggerKind::StairsDown, level.below()),
    );

    let up_exit = (level != LevelId::SURFACE).then(|| {
        let position = Position::new(first.center().x + 1, first.center().y);
        world.spawn(
            Entity::new(alloc.allocate(EntityKind::Prop), "stairs up", position, level)
                .with_render(0xDDDDDD, b'<')
                .with_narrative("Worn steps climb toward fresher air.")
                .with_trigger(TriggerKind::StairsUp, level.above()),
        );
        position
    });

    populate_enemies(&mut world, alloc, &mut rng, &rooms, level, start);
    populate_items(&mut world, alloc, &mut rng, &rooms, level);

    GeneratedLevel {
        world,
        start,
        down_exit,
        up_exit,
    }
}

fn carve_room(tiles: &mut [Tile], width: i32, room: &Room) {
    for y in room.y..room.y + room.h {
        for x in room.x..room.x + room.w {
            tiles[(y * width + x) as usize] = Tile::FLOOR;
        }
    }
}

fn carve_h_corridor(tiles: &mut [Tile], width: i32, x1: i32, x2: i32, y: i32) {
    for x in x1.min(x2)..=x1.max(x2) {
        tiles[(y * width + x) as usize] = Tile::FLOOR;
    }
}

fn carve_v_corridor(tiles: &mut [Tile], width: i32, y1: i32, y2: i32, x: i32) {
    for y in y1.min(y2)..=y1.max(y2) {
        tiles[(y * width + x) as usize] = Tile::FLOOR;
    }
}

/// Enemy template: base stats plus per-depth growth and a gating depth.
struct EnemyTemplate {
    name: &'static str,
    glyph: (u32, u8),
    base_hp: i32,
    hp_per_depth: i32,
    base_strength: i32,
    strength_per_depth: i32,
    min_depth: i32,
    /// Spawn weight out of 100 once unlocked.
    weight: u32,
    personality: Personality,
}

const ENEMIES: &[EnemyTemplate] = &[
    EnemyTemplate {
        name: "rat",
        glyph: (0x9A6B3F, b'r'),
        base_hp: 6,
        hp_per_depth: 1,
        base_strength: 1,
        strength_per_depth: 0,
        min_depth: 0,
        weight: 40,
        personality: Personality::Skittish,
    },
    EnemyTemplate {
        name: "goblin",
        glyph: (0x44AA44, b'g'),
        base_hp: 10,
        hp_per_depth: 2,
        base_strength: 2,
        strength_per_depth: 1,
        min_depth: 0,
        weight: 35,
        personality: Personality::Aggressive,
    },
    EnemyTemplate {
        name: "orc",
        glyph: (0x227722, b'o'),
        base_hp: 16,
        hp_per_depth: 2,
        base_strength: 4,
        strength_per_depth: 1,
        min_depth: 2,
        weight: 20,
        personality: Personality::Aggressive,
    },
    EnemyTemplate {
        name: "troll",
        glyph: (0x557799, b'T'),
        base_hp: 30,
        hp_per_depth: 3,
        base_strength: 6,
        strength_per_depth: 2,
        min_depth: 4,
        weight: 5,
        personality: Personality::Lazy,
    },
];

fn populate_enemies(
    world: &mut GameWorld,
    alloc: &mut EntityAllocator,
    rng: &mut GameRng,
    rooms: &[Room],
    level: LevelId,
    start: Position,
) {
    let depth = level.0.max(0);
    let unlocked: Vec<&EnemyTemplate> =
        ENEMIES.iter().filter(|t| depth >= t.min_depth).collect();
    let total_weight: u32 = unlocked.iter().map(|t| t.weight).sum();

    let count = rng.range(3, 5 + depth.min(6));
    for _ in 0..count {
        let room = rng.pick(rooms);
        let position = room.random_point(rng);
        if position == start || world.living_entity_at(position).is_some() {
            continue;
        }

        // Weighted roll across the unlocked templates.
        let mut roll = rng.next_u32() % total_weight;
        let template = unlocked
            .iter()
            .find(|t| {
                if roll < t.weight {
                    true
                } else {
                    roll -= t.weight;
                    false
                }
            })
            .expect("weights sum to total");

        let hp = template.base_hp + template.hp_per_depth * depth;
        let strength = template.base_strength + template.strength_per_depth * depth;
        world.spawn(
            Entity::new(alloc.allocate(EntityKind::Npc), template.name, position, level)
                .with_render(template.glyph.0, template.glyph.1)
                .with_stats(StatsComponent::new(hp, strength))
                .with_ai(AiComponent::hostile(template.personality))
                .with_vision(6),
        );
    }
}

fn populate_items(
    world: &mut GameWorld,
    alloc: &mut EntityAllocator,
    rng: &mut GameRng,
    rooms: &[Room],
    level: LevelId,
) {
    let depth = level.0.max(0);
    let count = rng.range(2, 4);
    for _ in 0..count {
        let room = rng.pick(rooms);
        let position = room.random_point(rng);

        let (name, glyph, item) = if rng.chance(50) {
            (
                "healing potion",
                (0xCC3366, b'!'),
                ItemComponent::consumable(8 + 2 * depth, 1),
            )
        } else if depth >= 2 && rng.chance(40) {
            (
                "iron armor",
                (0x8899AA, b'['),
                ItemComponent::armor(2 + depth / 2, 12),
            )
        } else {
            (
                "short sword",
                (0xAAAAAA, b'/'),
                ItemComponent::weapon(3 + depth / 2, 4),
            )
        };

        world.spawn(
            Entity::new(alloc.allocate(EntityKind::Item), name, position, level)
                .with_render(glyph.0, glyph.1)
                .with_item(item),
        );
    }
}
