//! Movement handler, including bump attacks.

use crate::action::{
    ActionError, ActionOutcome, DirectionPayload, HandlerContext, LogCategory, decode,
};
use crate::systems::{apply_attack, calculate_move};

/// Hostility mismatch turns a blocked step into an attack; matching
/// dispositions just collide.
fn opposed(a_hostile: bool, b_hostile: bool) -> bool {
    a_hostile != b_hostile
}

pub fn handle_move(
    ctx: &mut HandlerContext<'_>,
    raw: &serde_json::Value,
) -> Result<ActionOutcome, ActionError> {
    let payload: DirectionPayload = decode(raw)?;
    let actor = ctx.actor_entity()?;
    let outcome = calculate_move(ctx.world, actor, payload.dx, payload.dy);

    if outcome.blocked_by_wall {
        return Err(ActionError::Rejected("You bump into a wall.".to_string()));
    }

    if let Some(blocker) = outcome.blocker {
        let actor_hostile = actor.ai.map(|ai| ai.hostile).unwrap_or(false);
        let blocker_hostile = ctx
            .world
            .entity(blocker)
            .and_then(|e| e.ai)
            .map(|ai| ai.hostile)
            .unwrap_or(false);

        if !opposed(actor_hostile, blocker_hostile) {
            return Err(ActionError::Rejected(
                "Something blocks your way.".to_string(),
            ));
        }
        let (attacker, target) = ctx
            .world
            .pair_mut(ctx.actor, blocker)
            .ok_or(ActionError::ActorMissing)?;
        let line = apply_attack(attacker, target);
        return Ok(ActionOutcome::log(LogCategory::Combat, line));
    }

    ctx.world.update_entity_pos(ctx.actor, outcome.destination())?;
    if let Some(vision) = ctx.actor_mut()?.vision.as_mut() {
        vision.invalidate();
    }
    Ok(ActionOutcome::none())
}
