//! Game service orchestrator.
//!
//! Owns every level instance, the cross-level entity directory, and the
//! token → entity login map. Runs as its own task driven by two channels:
//! commands from connection handlers (login, submit, logout) and events
//! flowing back from instances (level transitions). Levels are generated on
//! demand the first time anything needs them.

use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use warren_core::{
    ActionKind, AiComponent, Entity, EntityAllocator, EntityId, EntityKind, GameConfig, LevelId,
    StatsComponent, generate_level, level_seed,
};

use crate::broadcaster::Broadcaster;
use crate::config::RuntimeConfig;
use crate::error::{Result, RuntimeError};
use crate::instance::{
    AddressedCommand, Instance, InstanceEvent, InstanceHandle, InstanceMessage, InstanceReport,
    JoinRequest, Placement,
};
use crate::protocol::ServerResponse;

/// Commands accepted by the service task.
pub enum ServiceCommand {
    /// Login handshake; creates the entity on first use of a token.
    Login {
        token: String,
        reply: oneshot::Sender<Result<LoginReply>>,
    },
    /// A parsed, authenticated command bound for the actor's level.
    Submit {
        entity: EntityId,
        action: String,
        payload: serde_json::Value,
    },
    Logout {
        entity: EntityId,
    },
    /// Operational inspection of one level.
    Report {
        level: LevelId,
        reply: oneshot::Sender<Option<InstanceReport>>,
    },
}

pub struct LoginReply {
    pub entity: EntityId,
    pub responses: mpsc::Receiver<ServerResponse>,
}

/// Clone-able client of the service task; this is what the transport layer
/// holds.
#[derive(Clone)]
pub struct GameHandle {
    tx: mpsc::Sender<ServiceCommand>,
}

impl GameHandle {
    pub async fn login(&self, token: impl Into<String>) -> Result<LoginReply> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(ServiceCommand::Login {
                token: token.into(),
                reply,
            })
            .await
            .map_err(|_| RuntimeError::ServiceChannelClosed)?;
        rx.await.map_err(RuntimeError::ReplyChannelClosed)?
    }

    /// Fire-and-forget submission; protocol errors are logged and dropped
    /// on the service side, per the error taxonomy.
    pub async fn submit(
        &self,
        entity: EntityId,
        action: impl Into<String>,
        payload: serde_json::Value,
    ) -> Result<()> {
        self.tx
            .send(ServiceCommand::Submit {
                entity,
                action: action.into(),
                payload,
            })
            .await
            .map_err(|_| RuntimeError::ServiceChannelClosed)
    }

    pub async fn logout(&self, entity: EntityId) -> Result<()> {
        self.tx
            .send(ServiceCommand::Logout { entity })
            .await
            .map_err(|_| RuntimeError::ServiceChannelClosed)
    }

    pub async fn report(&self, level: LevelId) -> Result<Option<InstanceReport>> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(ServiceCommand::Report { level, reply })
            .await
            .map_err(|_| RuntimeError::ServiceChannelClosed)?;
        rx.await.map_err(RuntimeError::ReplyChannelClosed)
    }
}

struct LevelEntry {
    handle: InstanceHandle,
    _task: JoinHandle<()>,
}

/// The orchestrator state; lives inside the service task.
pub struct GameService {
    config: RuntimeConfig,
    broadcaster: Broadcaster,
    allocator: EntityAllocator,
    levels: HashMap<LevelId, LevelEntry>,
    /// Which level currently owns each live entity. Mutated only here,
    /// during logins and level-transition events.
    directory: HashMap<EntityId, LevelId>,
    tokens: HashMap<String, EntityId>,
    events_tx: mpsc::Sender<InstanceEvent>,
}

impl GameService {
    /// Spawns the service task and returns the handle the transport uses.
    pub fn spawn(config: RuntimeConfig) -> GameHandle {
        let (cmd_tx, mut cmd_rx) = mpsc::channel::<ServiceCommand>(256);
        let (events_tx, mut events_rx) = mpsc::channel::<InstanceEvent>(64);
        let broadcaster = Broadcaster::new(config.observer_buffer);

        let mut service = GameService {
            broadcaster,
            allocator: EntityAllocator::new(0),
            levels: HashMap::new(),
            directory: HashMap::new(),
            tokens: HashMap::new(),
            events_tx,
            config,
        };

        tokio::spawn(async move {
            info!(seed = service.config.master_seed, "game service starting");
            loop {
                tokio::select! {
                    cmd = cmd_rx.recv() => match cmd {
                        Some(cmd) => service.handle_command(cmd).await,
                        None => break,
                    },
                    Some(event) = events_rx.recv() => service.handle_event(event).await,
                }
            }
            info!("game service stopped");
        });

        GameHandle { tx: cmd_tx }
    }

    async fn handle_command(&mut self, cmd: ServiceCommand) {
        match cmd {
            ServiceCommand::Login { token, reply } => {
                let result = self.login(token).await;
                let _ = reply.send(result);
            }
            ServiceCommand::Submit {
                entity,
                action,
                payload,
            } => self.submit(entity, action, payload).await,
            ServiceCommand::Logout { entity } => self.logout(entity).await,
            ServiceCommand::Report { level, reply } => {
                let report = match self.levels.get(&level) {
                    Some(entry) => entry.handle.report().await,
                    None => None,
                };
                let _ = reply.send(report);
            }
        }
    }

    async fn login(&mut self, token: String) -> Result<LoginReply> {
        if let Some(&entity) = self.tokens.get(&token) {
            // Known token: rebind the output channel (closing any previous
            // one) and wake the existing body.
            let level = *self
                .directory
                .get(&entity)
                .ok_or(RuntimeError::UnknownEntity(entity))?;
            let responses = self.broadcaster.register(entity);
            let handle = self.ensure_level(level).clone();
            let _ = handle.join_tx.send(JoinRequest::Wake { entity }).await;
            debug!(entity = %entity, level = %level, "token re-login");
            return Ok(LoginReply { entity, responses });
        }

        // Create on first use.
        let entity_id = self.allocator.allocate(EntityKind::Player);
        let name = format!("adventurer-{}", entity_id.index());
        let body = Entity::new(
            entity_id,
            name,
            warren_core::Position::ORIGIN,
            LevelId::SURFACE,
        )
        .with_render(0xFFFFFF, b'@')
        .with_stats(StatsComponent::new(30, 5))
        .with_ai(AiComponent::default())
        .with_vision(self.config.game.default_vision_radius)
        .with_memory()
        .with_inventory(GameConfig::MAX_INVENTORY_SLOTS, GameConfig::MAX_CARRY_WEIGHT);

        let responses = self.broadcaster.register(entity_id);
        let handle = self.ensure_level(LevelId::SURFACE).clone();
        let _ = handle
            .join_tx
            .send(JoinRequest::Arrive {
                entity: Box::new(body),
                placement: Placement::Start,
            })
            .await;

        self.tokens.insert(token, entity_id);
        self.directory.insert(entity_id, LevelId::SURFACE);
        info!(entity = %entity_id, "new entity created at login");
        Ok(LoginReply {
            entity: entity_id,
            responses,
        })
    }

    async fn submit(&mut self, entity: EntityId, action: String, payload: serde_json::Value) {
        let kind = ActionKind::parse(&action);
        if kind == ActionKind::Unknown {
            warn!(entity = %entity, action = %action, "unknown action token dropped");
            return;
        }
        let Some(&level) = self.directory.get(&entity) else {
            warn!(entity = %entity, "command for unplaced entity dropped");
            return;
        };
        let Some(entry) = self.levels.get(&level) else {
            warn!(entity = %entity, level = %level, "command for missing instance dropped");
            return;
        };
        let message = InstanceMessage::Command(AddressedCommand {
            entity,
            kind,
            payload,
        });
        if entry.handle.msg_tx.try_send(message).is_err() {
            warn!(entity = %entity, level = %level, "instance command queue full; command dropped");
        }
    }

    async fn logout(&mut self, entity: EntityId) {
        self.broadcaster.unregister(entity);
        if let Some(&level) = self.directory.get(&entity)
            && let Some(entry) = self.levels.get(&level)
        {
            let _ = entry.handle.leave_tx.send(entity).await;
        }
        debug!(entity = %entity, "logout");
    }

    async fn handle_event(&mut self, event: InstanceEvent) {
        match event {
            InstanceEvent::Transition { entity, from, to } => {
                let id = entity.id;
                // Descending arrives at the destination's up-stairs,
                // climbing at its down-stairs.
                let placement = if to.0 > from.0 {
                    Placement::FromAbove
                } else {
                    Placement::FromBelow
                };
                let handle = self.ensure_level(to).clone();
                self.directory.insert(id, to);
                let _ = handle
                    .join_tx
                    .send(JoinRequest::Arrive { entity, placement })
                    .await;
                info!(entity = %id, from = %from, to = %to, "level transition");
            }
        }
    }

    /// Returns the instance for a level, generating and spawning it on
    /// first touch. Generation is seeded per level off the master seed, so
    /// the dungeon is identical for every visitor and every run with the
    /// same seed.
    fn ensure_level(&mut self, level: LevelId) -> &InstanceHandle {
        if !self.levels.contains_key(&level) {
            let seed = level_seed(self.config.master_seed, level.0);
            let generated =
                generate_level(&mut self.allocator, level, seed, &self.config.game);
            info!(level = %level, entities = generated.world.entity_count(), "generated level");
            let (handle, task) = Instance::spawn(
                generated,
                &self.config,
                self.events_tx.clone(),
                self.broadcaster.clone(),
            );
            self.levels.insert(level, LevelEntry { handle, _task: task });
        }
        &self.levels[&level].handle
    }
}
