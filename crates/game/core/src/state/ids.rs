//! Packed entity identifiers and level handles.
//!
//! An [`EntityId`] packs shard, kind, generation, and index into a single
//! `u64` so it can cross task and wire boundaries as one word. The packed
//! layout is part of the persistence contract: decomposition must exactly
//! invert packing for every in-range field value.

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Unique identifier for any entity tracked by the service.
///
/// Layout (most significant first): `[Shard:8][Kind:8][Generation:16][Index:32]`.
/// The zero value is the canonical nil sentinel. The generation field guards
/// against stale references to reused index slots.
///
/// On JSON boundaries the id serializes as a decimal string; number-limited
/// consumers (JavaScript) cannot represent the full 64-bit range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct EntityId(pub u64);

const SHARD_SHIFT: u64 = 56;
const KIND_SHIFT: u64 = 48;
const GENERATION_SHIFT: u64 = 32;

impl EntityId {
    /// Nil sentinel; never assigned to a live entity.
    pub const NIL: Self = Self(0);

    /// Packs the four id fields into one word.
    pub const fn pack(shard: u8, kind: EntityKind, generation: u16, index: u32) -> Self {
        Self(
            ((shard as u64) << SHARD_SHIFT)
                | ((kind as u64) << KIND_SHIFT)
                | ((generation as u64) << GENERATION_SHIFT)
                | index as u64,
        )
    }

    #[inline]
    pub const fn shard(self) -> u8 {
        (self.0 >> SHARD_SHIFT) as u8
    }

    #[inline]
    pub const fn kind_raw(self) -> u8 {
        (self.0 >> KIND_SHIFT) as u8
    }

    pub fn kind(self) -> EntityKind {
        EntityKind::from_raw(self.kind_raw())
    }

    #[inline]
    pub const fn generation(self) -> u16 {
        (self.0 >> GENERATION_SHIFT) as u16
    }

    #[inline]
    pub const fn index(self) -> u32 {
        self.0 as u32
    }

    #[inline]
    pub const fn is_nil(self) -> bool {
        self.0 == 0
    }

    /// Returns true for ids minted for human-controlled entities.
    #[inline]
    pub fn is_player(self) -> bool {
        self.kind_raw() == EntityKind::Player as u8
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for EntityId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct IdVisitor;

        impl Visitor<'_> for IdVisitor {
            type Value = EntityId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an entity id as a decimal string or integer")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<EntityId, E> {
                value
                    .parse::<u64>()
                    .map(EntityId)
                    .map_err(|_| E::invalid_value(de::Unexpected::Str(value), &self))
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<EntityId, E> {
                Ok(EntityId(value))
            }
        }

        deserializer.deserialize_any(IdVisitor)
    }
}

/// Category byte inside an [`EntityId`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EntityKind {
    Nil = 0,
    Player = 1,
    Npc = 2,
    Item = 3,
    Prop = 4,
}

impl EntityKind {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            1 => EntityKind::Player,
            2 => EntityKind::Npc,
            3 => EntityKind::Item,
            4 => EntityKind::Prop,
            _ => EntityKind::Nil,
        }
    }
}

/// Depth-indexed handle for one dungeon level.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct LevelId(pub i32);

impl LevelId {
    /// Entry level of every new session.
    pub const SURFACE: Self = Self(0);

    /// Sentinel for entities held inside an inventory rather than placed on
    /// any level.
    pub const LIMBO: Self = Self(i32::MIN);

    pub fn below(self) -> Self {
        Self(self.0 + 1)
    }

    pub fn above(self) -> Self {
        Self(self.0 - 1)
    }

    pub fn is_limbo(self) -> bool {
        self == Self::LIMBO
    }
}

impl fmt::Display for LevelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Hands out unique ids for one shard.
///
/// Indices grow monotonically; released indices are recycled with a bumped
/// generation so stale references never resolve to the new occupant.
#[derive(Clone, Debug)]
pub struct EntityAllocator {
    shard: u8,
    next_index: u32,
    free: Vec<(u32, u16)>,
}

impl EntityAllocator {
    pub fn new(shard: u8) -> Self {
        Self {
            shard,
            // Index 0 stays unused so the packed nil value can never collide
            // with a live Nil-kind id.
            next_index: 1,
            free: Vec::new(),
        }
    }

    pub fn allocate(&mut self, kind: EntityKind) -> EntityId {
        if let Some((index, generation)) = self.free.pop() {
            return EntityId::pack(self.shard, kind, generation, index);
        }
        let index = self.next_index;
        self.next_index = self
            .next_index
            .checked_add(1)
            .expect("entity index space exhausted");
        EntityId::pack(self.shard, kind, 0, index)
    }

    /// Returns an id's index slot to the free list with a bumped generation.
    pub fn release(&mut self, id: EntityId) {
        if id.is_nil() {
            return;
        }
        self.free.push((id.index(), id.generation().wrapping_add(1)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn pack_unpack_round_trips_extremes() {
        for (shard, kind, generation, index) in [
            (0u8, EntityKind::Nil, 0u16, 0u32),
            (u8::MAX, EntityKind::Prop, u16::MAX, u32::MAX),
            (1, EntityKind::Player, 7, 42),
        ] {
            let id = EntityId::pack(shard, kind, generation, index);
            assert_eq!(id.shard(), shard);
            assert_eq!(id.kind_raw(), kind as u8);
            assert_eq!(id.generation(), generation);
            assert_eq!(id.index(), index);
        }
    }

    #[test]
    fn nil_is_the_zero_value() {
        assert!(EntityId::NIL.is_nil());
        assert_eq!(EntityId::pack(0, EntityKind::Nil, 0, 0), EntityId::NIL);
    }

    #[test]
    fn serializes_as_decimal_string() {
        let id = EntityId::pack(1, EntityKind::Npc, 3, 99);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.0));

        let back: EntityId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn allocator_bumps_generation_on_reuse() {
        let mut alloc = EntityAllocator::new(0);
        let first = alloc.allocate(EntityKind::Npc);
        alloc.release(first);
        let second = alloc.allocate(EntityKind::Npc);

        assert_eq!(second.index(), first.index());
        assert_eq!(second.generation(), first.generation() + 1);
        assert_ne!(first, second);
    }

    proptest! {
        #[test]
        fn pack_unpack_round_trips(shard: u8, kind_raw in 0u8..=4, generation: u16, index: u32) {
            let kind = EntityKind::from_raw(kind_raw);
            let id = EntityId::pack(shard, kind, generation, index);
            prop_assert_eq!(id.shard(), shard);
            prop_assert_eq!(id.kind_raw(), kind as u8);
            prop_assert_eq!(id.generation(), generation);
            prop_assert_eq!(id.index(), index);
        }
    }
}
