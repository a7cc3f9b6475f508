//! Attack handler.

use crate::action::{
    ActionError, ActionOutcome, EntityPayload, HandlerContext, LogCategory, decode,
};
use crate::systems::{apply_attack, validate_interaction};

/// Melee reach: the eight surrounding cells (diagonal is √2).
const MELEE_RANGE: f64 = 1.5;

pub fn handle_attack(
    ctx: &mut HandlerContext<'_>,
    raw: &serde_json::Value,
) -> Result<ActionOutcome, ActionError> {
    let payload: EntityPayload = decode(raw)?;
    if payload.target_id == ctx.actor {
        return Err(ActionError::Rejected(
            "You resist the urge to hit yourself.".to_string(),
        ));
    }

    let actor = ctx.actor_entity()?;
    if actor.stats.is_none() {
        return Err(ActionError::MissingComponent("stats"));
    }

    let target = ctx.world.entity(payload.target_id);
    let verdict = validate_interaction(actor, target, MELEE_RANGE, true, ctx.world);
    if !verdict.valid {
        return Err(ActionError::Rejected(verdict.message));
    }

    let (attacker, target) = ctx
        .world
        .pair_mut(ctx.actor, payload.target_id)
        .ok_or(ActionError::ActorMissing)?;
    let line = apply_attack(attacker, target);
    Ok(ActionOutcome::log(LogCategory::Combat, line))
}
