//! Wait, talk, interact, login, and cheat handlers.

use crate::action::{
    ActionError, ActionOutcome, EmptyPayload, EntityPayload, GameEvent, HandlerContext,
    LogCategory, TalkPayload, decode,
};
use crate::state::TriggerKind;
use crate::systems::validate_interaction;

const INTERACT_RANGE: f64 = 1.5;

pub fn handle_init(
    ctx: &mut HandlerContext<'_>,
    _raw: &serde_json::Value,
) -> Result<ActionOutcome, ActionError> {
    let actor = ctx.actor_entity()?;
    Ok(ActionOutcome::log(
        LogCategory::System,
        format!("{} enters the warren.", actor.name),
    ))
}

pub fn handle_wait(
    ctx: &mut HandlerContext<'_>,
    _raw: &serde_json::Value,
) -> Result<ActionOutcome, ActionError> {
    ctx.actor_entity()?;
    Ok(ActionOutcome::none())
}

pub fn handle_talk(
    ctx: &mut HandlerContext<'_>,
    raw: &serde_json::Value,
) -> Result<ActionOutcome, ActionError> {
    let payload: TalkPayload = decode(raw)?;
    let actor = ctx.actor_entity()?;
    Ok(ActionOutcome::log(
        LogCategory::Chat,
        format!("{} says: {}", actor.name, payload.text.trim()),
    ))
}

pub fn handle_interact(
    ctx: &mut HandlerContext<'_>,
    raw: &serde_json::Value,
) -> Result<ActionOutcome, ActionError> {
    let payload: EntityPayload = decode(raw)?;
    let actor = ctx.actor_entity()?;
    let target = ctx.world.entity(payload.target_id);

    let verdict = validate_interaction(actor, target, INTERACT_RANGE, false, ctx.world);
    if !verdict.valid {
        return Err(ActionError::Rejected(verdict.message));
    }
    let target = target.expect("validated above");

    if let Some(trigger) = target.trigger {
        let direction = match trigger.kind {
            TriggerKind::StairsDown => "descend",
            TriggerKind::StairsUp => "climb",
        };
        return Ok(ActionOutcome::log(
            LogCategory::System,
            format!("You {direction} the stairs."),
        )
        .with_event(GameEvent::LevelTransition {
            entity: ctx.actor,
            destination: trigger.destination,
        }));
    }

    if let Some(narrative) = target.narrative.as_ref() {
        return Ok(ActionOutcome::log(
            LogCategory::Info,
            narrative.description.clone(),
        ));
    }

    Err(ActionError::Rejected("Nothing interesting happens.".to_string()))
}

pub fn handle_heal(
    ctx: &mut HandlerContext<'_>,
    raw: &serde_json::Value,
) -> Result<ActionOutcome, ActionError> {
    let _: EmptyPayload = decode(raw).unwrap_or_default();
    let actor = ctx.actor_mut()?;
    let stats = actor
        .stats
        .as_mut()
        .ok_or(ActionError::MissingComponent("stats"))?;
    if stats.is_dead {
        return Err(ActionError::Rejected("The dead stay dead.".to_string()));
    }
    stats.restore_full();
    Ok(ActionOutcome::log(
        LogCategory::System,
        "A warm glow restores you.",
    ))
}

pub fn handle_reveal(
    ctx: &mut HandlerContext<'_>,
    raw: &serde_json::Value,
) -> Result<ActionOutcome, ActionError> {
    let _: EmptyPayload = decode(raw).unwrap_or_default();
    let actor = ctx.actor_mut()?;
    let vision = actor
        .vision
        .as_mut()
        .ok_or(ActionError::MissingComponent("vision"))?;
    vision.omniscient = !vision.omniscient;
    vision.invalidate();
    let state = if vision.omniscient { "opens" } else { "closes" };
    Ok(ActionOutcome::log(
        LogCategory::System,
        format!("Your third eye {state}."),
    ))
}
