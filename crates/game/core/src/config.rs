/// Game configuration constants and tunable parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameConfig {
    /// Tiles an observer can see without equipment or effects.
    pub default_vision_radius: u32,
    /// Width of generated levels in tiles.
    pub level_width: i32,
    /// Height of generated levels in tiles.
    pub level_height: i32,
}

impl GameConfig {
    // ===== compile-time constants used as type parameters =====
    /// Entities that can share one tile (actor + corpses + dropped items).
    pub const MAX_OCCUPANTS_PER_TILE: usize = 8;

    // ===== runtime-tunable defaults =====
    pub const DEFAULT_VISION_RADIUS: u32 = 8;
    pub const DEFAULT_LEVEL_WIDTH: i32 = 64;
    pub const DEFAULT_LEVEL_HEIGHT: i32 = 48;

    /// Inventory caps applied on pickup.
    pub const MAX_INVENTORY_SLOTS: usize = 16;
    pub const MAX_CARRY_WEIGHT: u32 = 100;

    /// Tick cost charged for every resolved action, including forced waits.
    pub const ACTION_COST: u64 = 10;

    pub fn new() -> Self {
        Self {
            default_vision_radius: Self::DEFAULT_VISION_RADIUS,
            level_width: Self::DEFAULT_LEVEL_WIDTH,
            level_height: Self::DEFAULT_LEVEL_HEIGHT,
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::new()
    }
}
