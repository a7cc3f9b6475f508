//! Inventory handlers: pickup, drop, use, equip, unequip.
//!
//! Carried items are entities owned by the holder's inventory list; the
//! world re-owns them when dropped. Equipment slots are indices into that
//! list, so every mutation that removes a slot goes through
//! [`crate::state::Entity::remove_inventory_slot`] to keep them consistent.

use crate::action::{ActionError, ActionOutcome, HandlerContext, ItemPayload, LogCategory, decode};
use crate::state::ItemCategory;

pub fn handle_pickup(
    ctx: &mut HandlerContext<'_>,
    raw: &serde_json::Value,
) -> Result<ActionOutcome, ActionError> {
    let payload: ItemPayload = decode(raw)?;
    let actor_pos = ctx.actor_entity()?.position;

    let here = ctx.world.entities_at(actor_pos);
    if !here.contains(&payload.item_id) {
        return Err(ActionError::Rejected("There is nothing like that here.".to_string()));
    }
    if ctx
        .world
        .entity(payload.item_id)
        .and_then(|e| e.item.as_ref())
        .is_none()
    {
        return Err(ActionError::Rejected("You cannot carry that.".to_string()));
    }

    let item = ctx
        .world
        .despawn(payload.item_id)
        .ok_or(ActionError::Rejected("There is nothing like that here.".to_string()))?;
    let item_name = item.name.clone();

    match ctx.actor_mut()?.stow(item) {
        Ok(_) => Ok(ActionOutcome::log(
            LogCategory::Info,
            format!("You pick up the {item_name}."),
        )),
        Err((reason, mut item)) => {
            // Put it back where it was; the pickup never happened.
            item.position = actor_pos;
            ctx.world.spawn(item);
            Err(ActionError::Rejected(reason.to_string()))
        }
    }
}

pub fn handle_drop(
    ctx: &mut HandlerContext<'_>,
    raw: &serde_json::Value,
) -> Result<ActionOutcome, ActionError> {
    let payload: ItemPayload = decode(raw)?;
    let actor = ctx.actor_mut()?;
    let inventory = actor
        .inventory
        .as_ref()
        .ok_or(ActionError::MissingComponent("inventory"))?;
    let slot = inventory
        .slot_of(payload.item_id)
        .ok_or(ActionError::Rejected("You are not carrying that.".to_string()))?;

    let position = actor.position;
    let mut item = actor
        .remove_inventory_slot(slot)
        .ok_or(ActionError::Rejected("You are not carrying that.".to_string()))?;
    let item_name = item.name.clone();
    item.position = position;
    ctx.world.spawn(item);

    Ok(ActionOutcome::log(
        LogCategory::Info,
        format!("You drop the {item_name}."),
    ))
}

pub fn handle_use(
    ctx: &mut HandlerContext<'_>,
    raw: &serde_json::Value,
) -> Result<ActionOutcome, ActionError> {
    let payload: ItemPayload = decode(raw)?;
    let actor = ctx.actor_mut()?;
    let inventory = actor
        .inventory
        .as_ref()
        .ok_or(ActionError::MissingComponent("inventory"))?;
    let slot = inventory
        .slot_of(payload.item_id)
        .ok_or(ActionError::Rejected("You are not carrying that.".to_string()))?;

    let (name, heal, stack) = {
        let held = &inventory.items[slot];
        let item = held
            .item
            .as_ref()
            .ok_or(ActionError::Rejected("That is not usable.".to_string()))?;
        if item.category != ItemCategory::Consumable {
            return Err(ActionError::Rejected("That is not usable.".to_string()));
        }
        (held.name.clone(), item.heal, item.stack)
    };

    if let Some(stats) = actor.stats.as_mut() {
        stats.heal(heal);
    }
    if stack <= 1 {
        actor.remove_inventory_slot(slot);
    } else {
        let held = actor
            .inventory
            .as_mut()
            .expect("inventory checked above")
            .items[slot]
            .item
            .as_mut()
            .expect("item checked above");
        held.stack -= 1;
    }

    Ok(ActionOutcome::log(
        LogCategory::Info,
        format!("You use the {name}."),
    ))
}

pub fn handle_equip(
    ctx: &mut HandlerContext<'_>,
    raw: &serde_json::Value,
) -> Result<ActionOutcome, ActionError> {
    let payload: ItemPayload = decode(raw)?;
    let actor = ctx.actor_mut()?;
    let inventory = actor
        .inventory
        .as_ref()
        .ok_or(ActionError::MissingComponent("inventory"))?;
    let slot = inventory
        .slot_of(payload.item_id)
        .ok_or(ActionError::Rejected("You are not carrying that.".to_string()))?;

    let (name, category) = {
        let held = &inventory.items[slot];
        let item = held
            .item
            .as_ref()
            .ok_or(ActionError::Rejected("You cannot equip that.".to_string()))?;
        (held.name.clone(), item.category)
    };

    let equipment = actor
        .equipment
        .as_mut()
        .ok_or(ActionError::MissingComponent("equipment"))?;
    match category {
        ItemCategory::Weapon => equipment.weapon = Some(slot),
        ItemCategory::Armor => equipment.armor = Some(slot),
        _ => {
            return Err(ActionError::Rejected("You cannot equip that.".to_string()));
        }
    }

    Ok(ActionOutcome::log(
        LogCategory::Info,
        format!("You equip the {name}."),
    ))
}

pub fn handle_unequip(
    ctx: &mut HandlerContext<'_>,
    raw: &serde_json::Value,
) -> Result<ActionOutcome, ActionError> {
    let payload: ItemPayload = decode(raw)?;
    let actor = ctx.actor_mut()?;
    let inventory = actor
        .inventory
        .as_ref()
        .ok_or(ActionError::MissingComponent("inventory"))?;
    let slot = inventory
        .slot_of(payload.item_id)
        .ok_or(ActionError::Rejected("You are not carrying that.".to_string()))?;
    let name = inventory.items[slot].name.clone();

    let equipment = actor
        .equipment
        .as_mut()
        .ok_or(ActionError::MissingComponent("equipment"))?;
    let was_equipped = equipment.weapon == Some(slot) || equipment.armor == Some(slot);
    if !was_equipped {
        return Err(ActionError::Rejected("That is not equipped.".to_string()));
    }
    if equipment.weapon == Some(slot) {
        equipment.weapon = None;
    }
    if equipment.armor == Some(slot) {
        equipment.armor = None;
    }

    Ok(ActionOutcome::log(
        LogCategory::Info,
        format!("You unequip the {name}."),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::GameRng;
    use crate::state::{
        Entity, EntityAllocator, EntityId, EntityKind, GameWorld, ItemComponent, LevelId,
        Position, StatsComponent, TerrainKind, Tile,
    };
    use serde_json::json;

    fn setup() -> (GameWorld, EntityAllocator, EntityId) {
        let mut world = GameWorld::new(
            LevelId::SURFACE,
            8,
            8,
            vec![Tile::new(TerrainKind::Floor); 64],
        );
        let mut alloc = EntityAllocator::new(0);
        let hero = world.spawn(
            Entity::new(
                alloc.allocate(EntityKind::Player),
                "hero",
                Position::new(3, 3),
                LevelId::SURFACE,
            )
            .with_stats(StatsComponent::new(20, 5))
            .with_inventory(8, 50),
        );
        (world, alloc, hero)
    }

    fn ground_item(
        world: &mut GameWorld,
        alloc: &mut EntityAllocator,
        name: &str,
        item: ItemComponent,
        x: i32,
        y: i32,
    ) -> EntityId {
        world.spawn(
            Entity::new(
                alloc.allocate(EntityKind::Item),
                name,
                Position::new(x, y),
                LevelId::SURFACE,
            )
            .with_render(0x999933, b'/')
            .with_item(item),
        )
    }

    #[test]
    fn pickup_moves_item_into_limbo_and_drop_restores_it() {
        let (mut world, mut alloc, hero) = setup();
        let sword = ground_item(
            &mut world,
            &mut alloc,
            "sword",
            ItemComponent::weapon(4, 5),
            3,
            3,
        );
        let mut rng = GameRng::from_seed(1);
        let mut ctx = HandlerContext {
            actor: hero,
            world: &mut world,
            rng: &mut rng,
            clock: 0,
        };

        handle_pickup(&mut ctx, &json!({"itemId": sword.to_string()})).unwrap();
        assert!(world.entity(sword).is_none());
        let carried = &world.entity(hero).unwrap().inventory.as_ref().unwrap().items;
        assert_eq!(carried.len(), 1);
        assert_eq!(carried[0].level, LevelId::LIMBO);

        let mut rng = GameRng::from_seed(1);
        let mut ctx = HandlerContext {
            actor: hero,
            world: &mut world,
            rng: &mut rng,
            clock: 0,
        };
        handle_drop(&mut ctx, &json!({"itemId": sword.to_string()})).unwrap();
        let dropped = world.entity(sword).unwrap();
        assert_eq!(dropped.position, Position::new(3, 3));
        assert_eq!(dropped.level, LevelId::SURFACE);
        assert!(world.entities_at(Position::new(3, 3)).contains(&sword));
    }

    #[test]
    fn pickup_rejects_items_elsewhere() {
        let (mut world, mut alloc, hero) = setup();
        let sword = ground_item(
            &mut world,
            &mut alloc,
            "sword",
            ItemComponent::weapon(4, 5),
            6,
            6,
        );
        let mut rng = GameRng::from_seed(1);
        let mut ctx = HandlerContext {
            actor: hero,
            world: &mut world,
            rng: &mut rng,
            clock: 0,
        };

        assert!(handle_pickup(&mut ctx, &json!({"itemId": sword.to_string()})).is_err());
        assert!(world.entity(sword).is_some());
    }

    #[test]
    fn use_consumes_one_stack_unit_and_heals() {
        let (mut world, mut alloc, hero) = setup();
        let potion = ground_item(
            &mut world,
            &mut alloc,
            "potion",
            ItemComponent::consumable(6, 1),
            3,
            3,
        );
        world.entity_mut(hero).unwrap().stats.as_mut().unwrap().hp = 10;

        let mut rng = GameRng::from_seed(1);
        let mut ctx = HandlerContext {
            actor: hero,
            world: &mut world,
            rng: &mut rng,
            clock: 0,
        };
        handle_pickup(&mut ctx, &json!({"itemId": potion.to_string()})).unwrap();
        handle_use(&mut ctx, &json!({"itemId": potion.to_string()})).unwrap();

        let entity = world.entity(hero).unwrap();
        assert_eq!(entity.stats.unwrap().hp, 16);
        assert!(entity.inventory.as_ref().unwrap().items.is_empty());
    }

    #[test]
    fn equip_and_unequip_validate_categories() {
        let (mut world, mut alloc, hero) = setup();
        let sword = ground_item(
            &mut world,
            &mut alloc,
            "sword",
            ItemComponent::weapon(4, 5),
            3,
            3,
        );
        let potion = ground_item(
            &mut world,
            &mut alloc,
            "potion",
            ItemComponent::consumable(6, 1),
            3,
            3,
        );

        let mut rng = GameRng::from_seed(1);
        let mut ctx = HandlerContext {
            actor: hero,
            world: &mut world,
            rng: &mut rng,
            clock: 0,
        };
        handle_pickup(&mut ctx, &json!({"itemId": sword.to_string()})).unwrap();
        handle_pickup(&mut ctx, &json!({"itemId": potion.to_string()})).unwrap();

        handle_equip(&mut ctx, &json!({"itemId": sword.to_string()})).unwrap();
        assert!(handle_equip(&mut ctx, &json!({"itemId": potion.to_string()})).is_err());

        handle_unequip(&mut ctx, &json!({"itemId": sword.to_string()})).unwrap();
        let equipment = world.entity(hero).unwrap().equipment.unwrap();
        assert_eq!(equipment.weapon, None);
    }
}
