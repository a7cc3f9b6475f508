//! Component-based entity model.
//!
//! An [`Entity`] is a bag of optional components; its component set defines
//! its capabilities. Missing `Ai` means it never takes turns, missing
//! `Stats` means it cannot be harmed. Items are entities too: while carried
//! they live inside the holder's [`InventoryComponent`] with their level set
//! to [`LevelId::LIMBO`], and they re-enter a world's registry when dropped.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::glyph::Glyph;
use super::ids::{EntityId, LevelId};
use super::position::Position;

/// Display data for anything that can appear on a client map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderComponent {
    pub glyph: Glyph,
}

impl RenderComponent {
    pub fn new(color: u32, ch: u8) -> Self {
        Self {
            glyph: Glyph::new(color, ch),
        }
    }
}

/// Combat and resource stats.
///
/// HP is stored clamped: damage saturates at zero and sets `is_dead` in the
/// same operation, so no observer can ever read a negative value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatsComponent {
    pub hp: i32,
    pub max_hp: i32,
    pub stamina: i32,
    pub max_stamina: i32,
    pub strength: i32,
    pub gold: i32,
    pub is_dead: bool,
}

impl StatsComponent {
    pub fn new(max_hp: i32, strength: i32) -> Self {
        Self {
            hp: max_hp,
            max_hp,
            stamina: 10,
            max_stamina: 10,
            strength,
            gold: 0,
            is_dead: false,
        }
    }

    /// Applies damage, clamping HP at zero and flagging death when it lands
    /// there. Returns the HP actually removed.
    pub fn take_damage(&mut self, amount: i32) -> i32 {
        let dealt = amount.max(0).min(self.hp);
        self.hp -= dealt;
        if self.hp == 0 {
            self.is_dead = true;
        }
        dealt
    }

    pub fn heal(&mut self, amount: i32) {
        if self.is_dead {
            return;
        }
        self.hp = (self.hp + amount.max(0)).min(self.max_hp);
    }

    pub fn restore_full(&mut self) {
        if self.is_dead {
            return;
        }
        self.hp = self.max_hp;
        self.stamina = self.max_stamina;
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        !self.is_dead
    }
}

/// Behavior state for machine-controlled actors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AiState {
    #[default]
    Idle,
    Hunting,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Personality {
    #[default]
    Aggressive,
    Skittish,
    Lazy,
}

/// Turn-clock component; any entity that takes turns carries one.
///
/// Human-controlled entities carry it too (the scheduler keys on
/// `next_action_tick`); the behavior fields only matter for NPCs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AiComponent {
    pub hostile: bool,
    pub state: AiState,
    pub next_action_tick: u64,
    pub personality: Personality,
}

impl AiComponent {
    pub fn hostile(personality: Personality) -> Self {
        Self {
            hostile: true,
            state: AiState::Idle,
            next_action_tick: 0,
            personality,
        }
    }
}

/// Free-form description shown on examine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrativeComponent {
    pub description: String,
}

/// Field-of-view parameters plus the per-observer visibility cache.
///
/// The cache holds tile indices from the last computation; `dirty` must be
/// set by anything that can change what the observer sees (movement, door
/// state, vision radius changes). A clean cache is reused verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisionComponent {
    pub radius: u32,
    pub omniscient: bool,
    #[serde(skip)]
    pub cache: HashSet<usize>,
    #[serde(skip, default = "default_dirty")]
    pub dirty: bool,
}

fn default_dirty() -> bool {
    true
}

impl VisionComponent {
    pub fn new(radius: u32) -> Self {
        Self {
            radius,
            omniscient: false,
            cache: HashSet::new(),
            dirty: true,
        }
    }

    pub fn invalidate(&mut self) {
        self.dirty = true;
    }
}

/// Persistent fog-of-war memory, keyed per level.
///
/// Tiles stay explored once seen; an observer's memory of one level is
/// independent of every other level.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MemoryComponent {
    pub explored: HashMap<LevelId, HashSet<usize>>,
}

impl MemoryComponent {
    pub fn remember(&mut self, level: LevelId, tiles: impl IntoIterator<Item = usize>) {
        self.explored.entry(level).or_default().extend(tiles);
    }

    pub fn explored_on(&self, level: LevelId) -> Option<&HashSet<usize>> {
        self.explored.get(&level)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemCategory {
    Weapon,
    Armor,
    Consumable,
    Misc,
}

/// Item payload for entities that can be carried.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemComponent {
    pub category: ItemCategory,
    pub stack: u32,
    pub damage: i32,
    pub defense: i32,
    pub heal: i32,
    pub weight: u32,
}

impl ItemComponent {
    pub fn weapon(damage: i32, weight: u32) -> Self {
        Self {
            category: ItemCategory::Weapon,
            stack: 1,
            damage,
            defense: 0,
            heal: 0,
            weight,
        }
    }

    pub fn armor(defense: i32, weight: u32) -> Self {
        Self {
            category: ItemCategory::Armor,
            stack: 1,
            damage: 0,
            defense,
            heal: 0,
            weight,
        }
    }

    pub fn consumable(heal: i32, weight: u32) -> Self {
        Self {
            category: ItemCategory::Consumable,
            stack: 1,
            damage: 0,
            defense: 0,
            heal,
            weight,
        }
    }
}

/// Carried items, owned by value. Slot and weight caps are enforced on
/// `stow`, not retroactively.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct InventoryComponent {
    pub items: Vec<Entity>,
    pub max_slots: usize,
    pub max_weight: u32,
}

impl InventoryComponent {
    pub fn new(max_slots: usize, max_weight: u32) -> Self {
        Self {
            items: Vec::new(),
            max_slots,
            max_weight,
        }
    }

    pub fn total_weight(&self) -> u32 {
        self.items
            .iter()
            .filter_map(|item| item.item.as_ref())
            .map(|i| i.weight * i.stack.max(1))
            .sum()
    }

    pub fn slot_of(&self, id: EntityId) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }
}

/// Equipped slots as indices into the holder's inventory list.
///
/// The inventory owns the item; equipment holds a non-owning slot index so
/// there is a single source of truth for the item's state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EquipmentComponent {
    pub weapon: Option<usize>,
    pub armor: Option<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerKind {
    StairsDown,
    StairsUp,
}

/// Interaction payload; currently only level transitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerComponent {
    pub kind: TriggerKind,
    pub destination: LevelId,
}

/// One simulated object: actor, item, prop, or trigger.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    pub position: Position,
    pub level: LevelId,

    pub render: Option<RenderComponent>,
    pub stats: Option<StatsComponent>,
    pub ai: Option<AiComponent>,
    pub narrative: Option<NarrativeComponent>,
    pub vision: Option<VisionComponent>,
    pub memory: Option<MemoryComponent>,
    pub inventory: Option<InventoryComponent>,
    pub equipment: Option<EquipmentComponent>,
    pub item: Option<ItemComponent>,
    pub trigger: Option<TriggerComponent>,
}

impl Entity {
    pub fn new(id: EntityId, name: impl Into<String>, position: Position, level: LevelId) -> Self {
        Self {
            id,
            name: name.into(),
            position,
            level,
            render: None,
            stats: None,
            ai: None,
            narrative: None,
            vision: None,
            memory: None,
            inventory: None,
            equipment: None,
            item: None,
            trigger: None,
        }
    }

    pub fn with_render(mut self, color: u32, ch: u8) -> Self {
        self.render = Some(RenderComponent::new(color, ch));
        self
    }

    pub fn with_stats(mut self, stats: StatsComponent) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn with_ai(mut self, ai: AiComponent) -> Self {
        self.ai = Some(ai);
        self
    }

    pub fn with_narrative(mut self, description: impl Into<String>) -> Self {
        self.narrative = Some(NarrativeComponent {
            description: description.into(),
        });
        self
    }

    pub fn with_vision(mut self, radius: u32) -> Self {
        self.vision = Some(VisionComponent::new(radius));
        self
    }

    pub fn with_memory(mut self) -> Self {
        self.memory = Some(MemoryComponent::default());
        self
    }

    pub fn with_inventory(mut self, max_slots: usize, max_weight: u32) -> Self {
        self.inventory = Some(InventoryComponent::new(max_slots, max_weight));
        self.equipment = Some(EquipmentComponent::default());
        self
    }

    pub fn with_item(mut self, item: ItemComponent) -> Self {
        self.item = Some(item);
        self
    }

    pub fn with_trigger(mut self, kind: TriggerKind, destination: LevelId) -> Self {
        self.trigger = Some(TriggerComponent { kind, destination });
        self
    }

    /// Alive means "has stats and they are not dead". Statless scenery is
    /// not alive for collision or targeting purposes.
    pub fn is_alive(&self) -> bool {
        self.stats.map(|s| s.is_alive()).unwrap_or(false)
    }

    /// Can this entity take turns at all.
    pub fn can_act(&self) -> bool {
        self.ai.is_some() && self.stats.is_some()
    }

    pub fn glyph(&self) -> Option<Glyph> {
        self.render.map(|r| r.glyph)
    }

    /// Removes the inventory item at `slot`, keeping equipment slot indices
    /// consistent: slots referencing the removed index are cleared, slots
    /// past it shift down.
    pub fn remove_inventory_slot(&mut self, slot: usize) -> Option<Entity> {
        let inventory = self.inventory.as_mut()?;
        if slot >= inventory.items.len() {
            return None;
        }
        let removed = inventory.items.remove(slot);

        if let Some(equipment) = self.equipment.as_mut() {
            for slot_ref in [&mut equipment.weapon, &mut equipment.armor] {
                match *slot_ref {
                    Some(s) if s == slot => *slot_ref = None,
                    Some(s) if s > slot => *slot_ref = Some(s - 1),
                    _ => {}
                }
            }
        }
        Some(removed)
    }

    /// Stows an item entity into the inventory, merging stacks of identical
    /// consumables. On failure nothing is mutated and the item comes back to
    /// the caller for re-placement.
    pub fn stow(&mut self, mut item: Entity) -> Result<usize, (StowError, Entity)> {
        let weight = item
            .item
            .as_ref()
            .map(|i| i.weight * i.stack.max(1))
            .unwrap_or(0);
        let Some(inventory) = self.inventory.as_mut() else {
            return Err((StowError::NoInventory, item));
        };

        if inventory.total_weight() + weight > inventory.max_weight {
            return Err((StowError::TooHeavy, item));
        }

        // Stackable consumables merge by name instead of taking a slot.
        if let Some(incoming) = item.item.as_ref()
            && incoming.category == ItemCategory::Consumable
        {
            let merge = inventory.items.iter_mut().position(|held| {
                held.name == item.name
                    && held
                        .item
                        .as_ref()
                        .is_some_and(|h| h.category == ItemCategory::Consumable)
            });
            if let Some(slot) = merge {
                let held = inventory.items[slot]
                    .item
                    .as_mut()
                    .expect("merge target checked above");
                held.stack += incoming.stack.max(1);
                return Ok(slot);
            }
        }

        if inventory.items.len() >= inventory.max_slots {
            return Err((StowError::NoSlots, item));
        }

        item.level = LevelId::LIMBO;
        inventory.items.push(item);
        Ok(inventory.items.len() - 1)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum StowError {
    #[error("no inventory")]
    NoInventory,
    #[error("too heavy to carry")]
    TooHeavy,
    #[error("no free inventory slot")]
    NoSlots,
}
