//! Command dispatch: the closed action enumeration, typed payloads, the
//! handler context, and the static kind → handler table.
//!
//! Handlers are pure functions over a [`HandlerContext`]; protocol parsing
//! stays at the boundary and game logic stays here. A handler either
//! succeeds with an [`ActionOutcome`] (optional log line, optional follow-up
//! event for the orchestrator) or fails with a typed [`ActionError`] — in
//! which case the actor's turn is not consumed and the player may retry.

mod handlers;
mod kind;
mod payload;

use serde::{Deserialize, Serialize};

use crate::rng::GameRng;
use crate::state::{Entity, EntityId, GameWorld, LevelId, WorldError};

pub use kind::ActionKind;
pub use payload::{
    DirectionPayload, EmptyPayload, EntityPayload, ItemPayload, TalkPayload, ValidatePayload,
    decode,
};

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    /// User-facing rejection; surfaced as an ERROR-category log line.
    #[error("{0}")]
    Rejected(String),

    #[error("malformed payload: {0}")]
    Payload(String),

    #[error("actor is missing required component: {0}")]
    MissingComponent(&'static str),

    #[error("acting entity is not registered on this level")]
    ActorMissing,

    #[error(transparent)]
    World(#[from] WorldError),
}

impl ActionError {
    /// Message shown to the acting player.
    pub fn user_message(&self) -> String {
        match self {
            ActionError::Rejected(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

/// Category tag attached to every log line on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogCategory {
    Info,
    Combat,
    Chat,
    System,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogLine {
    pub text: String,
    pub category: LogCategory,
}

impl LogLine {
    pub fn new(category: LogCategory, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            category,
        }
    }
}

/// Follow-up event a handler can hand to the orchestrator instead of (or in
/// addition to) a log line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameEvent {
    LevelTransition {
        entity: EntityId,
        destination: LevelId,
    },
}

/// Successful handler result.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActionOutcome {
    pub log: Option<LogLine>,
    pub event: Option<GameEvent>,
}

impl ActionOutcome {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn log(category: LogCategory, text: impl Into<String>) -> Self {
        Self {
            log: Some(LogLine::new(category, text)),
            event: None,
        }
    }

    pub fn with_event(mut self, event: GameEvent) -> Self {
        self.event = Some(event);
        self
    }
}

/// Everything a handler may touch while resolving one action.
///
/// The world doubles as entity list, target finder, and new-entity registrar
/// (it owns the registry); level switches are expressed through the returned
/// [`GameEvent`] rather than mutated in place.
pub struct HandlerContext<'a> {
    pub actor: EntityId,
    pub world: &'a mut GameWorld,
    pub rng: &'a mut GameRng,
    pub clock: u64,
}

impl HandlerContext<'_> {
    pub fn actor_entity(&self) -> Result<&Entity, ActionError> {
        self.world.entity(self.actor).ok_or(ActionError::ActorMissing)
    }

    pub fn actor_mut(&mut self) -> Result<&mut Entity, ActionError> {
        self.world
            .entity_mut(self.actor)
            .ok_or(ActionError::ActorMissing)
    }
}

/// Handler signature shared by every action.
pub type HandlerFn =
    fn(&mut HandlerContext<'_>, &serde_json::Value) -> Result<ActionOutcome, ActionError>;

/// Static dispatch table. `Unknown` has no handler by construction.
pub fn handler_for(kind: ActionKind) -> Option<HandlerFn> {
    match kind {
        ActionKind::Init => Some(handlers::system::handle_init),
        ActionKind::Move => Some(handlers::movement::handle_move),
        ActionKind::Attack => Some(handlers::combat::handle_attack),
        ActionKind::Wait => Some(handlers::system::handle_wait),
        ActionKind::Talk => Some(handlers::system::handle_talk),
        ActionKind::Interact => Some(handlers::system::handle_interact),
        ActionKind::Pickup => Some(handlers::inventory::handle_pickup),
        ActionKind::Drop => Some(handlers::inventory::handle_drop),
        ActionKind::Use => Some(handlers::inventory::handle_use),
        ActionKind::Equip => Some(handlers::inventory::handle_equip),
        ActionKind::Unequip => Some(handlers::inventory::handle_unequip),
        ActionKind::Heal => Some(handlers::system::handle_heal),
        ActionKind::Reveal => Some(handlers::system::handle_reveal),
        ActionKind::Unknown => None,
    }
}

/// Resolves one action end to end: table lookup, payload decode inside the
/// handler, effect application.
pub fn execute(
    ctx: &mut HandlerContext<'_>,
    kind: ActionKind,
    payload: &serde_json::Value,
) -> Result<ActionOutcome, ActionError> {
    let Some(handler) = handler_for(kind) else {
        return Err(ActionError::Rejected("Nothing happens.".to_string()));
    };
    handler(ctx, payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_known_kind_has_a_handler() {
        for kind in [
            ActionKind::Init,
            ActionKind::Move,
            ActionKind::Attack,
            ActionKind::Wait,
            ActionKind::Talk,
            ActionKind::Interact,
            ActionKind::Pickup,
            ActionKind::Drop,
            ActionKind::Use,
            ActionKind::Equip,
            ActionKind::Unequip,
            ActionKind::Heal,
            ActionKind::Reveal,
        ] {
            assert!(handler_for(kind).is_some(), "{kind} lacks a handler");
        }
    }

    #[test]
    fn unknown_is_never_dispatched() {
        assert!(handler_for(ActionKind::Unknown).is_none());
    }
}
