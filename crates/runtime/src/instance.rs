//! Per-level simulation runtime.
//!
//! One [`Instance`] task runs per active level, owning that level's world,
//! turn queue, clock, and RNG outright — all mutation is serialized through
//! this loop, so the level needs no internal locking. The loop: drain
//! join/leave signals, peek the earliest-ticking entity, death-check it,
//! then run its turn (synchronous AI decision, or a bounded wait for a
//! correctly-addressed human command). The acted entity's tick is always
//! updated before the next peek, so nothing is ever selected twice at one
//! priority. An empty queue sleeps on a bounded poll instead of spinning.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use warren_core::{
    ActionKind, ActionOutcome, Entity, EntityId, GameConfig, GameEvent, GameRng, GeneratedLevel,
    HandlerContext, LevelId, LogCategory, LogLine, Position, TurnQueue, execute, level_seed,
};

use crate::broadcaster::Broadcaster;
use crate::config::RuntimeConfig;
use crate::protocol::{LogEntry, ServerResponse};
use crate::replay::ReplaySession;
use crate::snapshot::build_snapshot;

/// A command already authenticated and parsed at the service boundary.
#[derive(Clone, Debug)]
pub struct AddressedCommand {
    pub entity: EntityId,
    pub kind: ActionKind,
    pub payload: serde_json::Value,
}

/// Where a joining entity lands on the level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    /// Fresh spawn at the level's start position.
    Start,
    /// Arrived by descending; lands at this level's up-stairs.
    FromAbove,
    /// Arrived by climbing; lands at this level's down-stairs.
    FromBelow,
}

/// Entities entering the level, drained opportunistically so a new player
/// is never starved behind another's unresolved turn.
pub enum JoinRequest {
    /// A new body arrives (login or level transition).
    Arrive {
        entity: Box<Entity>,
        placement: Placement,
    },
    /// An existing body reconnects and should be scheduled again.
    Wake { entity: EntityId },
}

/// Messages on the instance's command channel.
pub enum InstanceMessage {
    Command(AddressedCommand),
    /// Read-only operational report (clock, queue, replay log).
    Report { reply: oneshot::Sender<InstanceReport> },
}

/// Snapshot of an instance's bookkeeping for inspection and tests.
#[derive(Clone, Debug)]
pub struct InstanceReport {
    pub level: LevelId,
    pub clock: u64,
    pub queue_len: usize,
    pub entity_count: usize,
    pub replay: ReplaySession,
}

/// Cross-level effects the instance hands back to the orchestrator.
pub enum InstanceEvent {
    Transition {
        entity: Box<Entity>,
        from: LevelId,
        to: LevelId,
    },
}

/// Clone-able endpoints for one running level.
#[derive(Clone)]
pub struct InstanceHandle {
    pub level: LevelId,
    pub msg_tx: mpsc::Sender<InstanceMessage>,
    pub join_tx: mpsc::Sender<JoinRequest>,
    pub leave_tx: mpsc::Sender<EntityId>,
}

impl InstanceHandle {
    pub async fn report(&self) -> Option<InstanceReport> {
        let (reply, rx) = oneshot::channel();
        self.msg_tx.send(InstanceMessage::Report { reply }).await.ok()?;
        rx.await.ok()
    }
}

pub struct Instance {
    level: LevelId,
    world: warren_core::GameWorld,
    queue: TurnQueue,
    clock: u64,
    rng: GameRng,
    start: Position,
    down_exit: Position,
    up_exit: Option<Position>,
    replay: ReplaySession,

    msg_rx: mpsc::Receiver<InstanceMessage>,
    join_rx: mpsc::Receiver<JoinRequest>,
    leave_rx: mpsc::Receiver<EntityId>,
    events_tx: mpsc::Sender<InstanceEvent>,
    broadcaster: Broadcaster,

    human_turn_timeout: Duration,
    idle_poll: Duration,
    pending_logs: Vec<LogEntry>,
}

impl Instance {
    /// Spawns the instance task for a freshly generated level and returns
    /// its handle.
    pub fn spawn(
        generated: GeneratedLevel,
        config: &RuntimeConfig,
        events_tx: mpsc::Sender<InstanceEvent>,
        broadcaster: Broadcaster,
    ) -> (InstanceHandle, JoinHandle<()>) {
        let level = generated.world.level();
        let (msg_tx, msg_rx) = mpsc::channel(64);
        let (join_tx, join_rx) = mpsc::channel(16);
        let (leave_tx, leave_rx) = mpsc::channel(16);

        let mut instance = Instance {
            level,
            world: generated.world,
            queue: TurnQueue::new(),
            clock: 0,
            rng: GameRng::from_seed(level_seed(config.master_seed, level.0) ^ 0x51CE),
            start: generated.start,
            down_exit: generated.down_exit,
            up_exit: generated.up_exit,
            replay: ReplaySession::new(config.master_seed as i64, level.0),
            msg_rx,
            join_rx,
            leave_rx,
            events_tx,
            broadcaster,
            human_turn_timeout: config.human_turn_timeout,
            idle_poll: config.idle_poll,
            pending_logs: Vec::new(),
        };

        // Every generated actor starts on the queue at tick zero; the
        // pinned (tick, id) tie-break makes the opening order deterministic.
        let actors: Vec<EntityId> = instance
            .world
            .entities()
            .filter(|e| e.can_act())
            .map(|e| e.id)
            .collect();
        for id in actors {
            instance.queue.add_entity(id, 0);
        }

        let handle = InstanceHandle {
            level,
            msg_tx,
            join_tx,
            leave_tx,
        };
        let task = tokio::spawn(async move {
            debug!(level = %level, "instance loop starting");
            instance.run().await;
            debug!(level = %level, "instance loop stopped");
        });
        (handle, task)
    }

    async fn run(mut self) {
        loop {
            self.drain_signals();

            let Some(item) = self.queue.peek_next() else {
                // Idle: stay responsive to joins without busy-spinning.
                tokio::select! {
                    join = self.join_rx.recv() => match join {
                        Some(join) => self.handle_join(join),
                        None => return,
                    },
                    Some(leaving) = self.leave_rx.recv() => self.handle_leave(leaving),
                    Some(msg) = self.msg_rx.recv() => self.handle_idle_message(msg),
                    _ = tokio::time::sleep(self.idle_poll) => {}
                }
                continue;
            };

            // NPC-only levels advance slowly instead of spinning; a level
            // with no human in the schedule has nobody to race for.
            if !self.queue.entities().any(|id| id.is_player()) {
                tokio::time::sleep(self.idle_poll).await;
            }

            // Death check: corpses fall out of the schedule here.
            let alive = self
                .world
                .entity(item.entity)
                .map(|e| e.is_alive())
                .unwrap_or(false);
            if !alive {
                self.queue.remove_entity(item.entity);
                continue;
            }

            self.clock = self.clock.max(item.tick);
            let actor = item.entity;

            if actor.is_player() {
                self.human_turn(actor).await;
            } else {
                let logs = crate::ai::take_turn(&mut self.world, &mut self.rng, actor);
                self.push_logs(logs);
                self.finish_turn(actor);
            }

            self.broadcast();
        }
    }

    /// Blocks (bounded) until the acting entity's player sends a valid
    /// command. Ends on success, on the actor disconnecting, or on timeout;
    /// the last two force a Wait. Join/leave signals keep draining inside
    /// the wait so connections are never starved.
    async fn human_turn(&mut self, actor: EntityId) {
        if !self.broadcaster.is_subscribed(actor) {
            // Disconnected body: don't burn the full timeout every turn.
            self.finish_turn(actor);
            return;
        }

        let deadline = tokio::time::Instant::now() + self.human_turn_timeout;
        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => {
                    debug!(level = %self.level, entity = %actor, "human turn timed out; forcing wait");
                    self.finish_turn(actor);
                    return;
                }
                Some(join) = self.join_rx.recv() => {
                    self.handle_join(join);
                    self.broadcast();
                }
                Some(leaving) = self.leave_rx.recv() => {
                    self.handle_leave(leaving);
                    if leaving == actor {
                        self.finish_turn(actor);
                        return;
                    }
                }
                Some(msg) = self.msg_rx.recv() => {
                    let command = match msg {
                        InstanceMessage::Report { reply } => {
                            let _ = reply.send(self.report());
                            continue;
                        }
                        InstanceMessage::Command(command) => command,
                    };
                    if command.entity != actor {
                        debug!(
                            level = %self.level,
                            sender = %command.entity,
                            active = %actor,
                            "command from entity not at turn; dropped"
                        );
                        self.send_error(command.entity, "It is not your turn.");
                        continue;
                    }
                    if self.resolve_command(actor, command) {
                        return;
                    }
                }
            }
        }
    }

    /// Applies one correctly-addressed command. Returns true when the turn
    /// was consumed.
    fn resolve_command(&mut self, actor: EntityId, command: AddressedCommand) -> bool {
        let mut ctx = HandlerContext {
            actor,
            world: &mut self.world,
            rng: &mut self.rng,
            clock: self.clock,
        };
        match execute(&mut ctx, command.kind, &command.payload) {
            Ok(outcome) => {
                self.replay.record(
                    self.clock as i32,
                    command.kind,
                    actor.to_string(),
                    serde_json::to_vec(&command.payload).unwrap_or_default(),
                );
                self.apply_outcome(actor, outcome);
                true
            }
            Err(err) => {
                // Rejected actions do not consume the turn; tell the actor
                // and keep waiting.
                debug!(level = %self.level, entity = %actor, error = %err, "action rejected");
                self.send_error(actor, err.user_message());
                false
            }
        }
    }

    fn apply_outcome(&mut self, actor: EntityId, outcome: ActionOutcome) {
        if let Some(line) = outcome.log {
            self.push_logs(vec![line]);
        }
        match outcome.event {
            Some(GameEvent::LevelTransition {
                entity,
                destination,
            }) => {
                self.queue.remove_entity(entity);
                if let Some(body) = self.world.despawn(entity) {
                    let event = InstanceEvent::Transition {
                        entity: Box::new(body),
                        from: self.level,
                        to: destination,
                    };
                    if self.events_tx.try_send(event).is_err() {
                        warn!(level = %self.level, entity = %entity, "orchestrator event queue full; transition dropped");
                    }
                }
            }
            None => self.finish_turn(actor),
        }
    }

    /// Charges the action cost and re-keys the actor. Nothing advances to
    /// the next peek without passing through here.
    fn finish_turn(&mut self, actor: EntityId) {
        let next = self.clock + GameConfig::ACTION_COST;
        self.queue.update_priority(actor, next);
        if let Some(ai) = self.world.entity_mut(actor).and_then(|e| e.ai.as_mut()) {
            ai.next_action_tick = next;
        }
    }

    fn drain_signals(&mut self) {
        while let Ok(join) = self.join_rx.try_recv() {
            self.handle_join(join);
        }
        while let Ok(leaving) = self.leave_rx.try_recv() {
            self.handle_leave(leaving);
        }
    }

    fn handle_join(&mut self, join: JoinRequest) {
        match join {
            JoinRequest::Arrive { entity, placement } => {
                let mut entity = *entity;
                let target = match placement {
                    Placement::Start => self.start,
                    Placement::FromAbove => self.up_exit.unwrap_or(self.start),
                    Placement::FromBelow => self.down_exit,
                };
                entity.position = self.free_spot_near(target);
                entity.level = self.level;
                if let Some(vision) = entity.vision.as_mut() {
                    vision.invalidate();
                }
                let id = self.world.spawn(entity);
                self.queue.add_entity(id, self.clock);
                debug!(level = %self.level, entity = %id, "entity joined");
            }
            JoinRequest::Wake { entity } => {
                let alive = self
                    .world
                    .entity(entity)
                    .map(|e| e.is_alive() && e.can_act())
                    .unwrap_or(false);
                if alive {
                    self.queue.add_entity(entity, self.clock);
                    debug!(level = %self.level, entity = %entity, "entity woke");
                }
            }
        }
    }

    /// A departing connection stops the body's scheduling; the body itself
    /// stays in the world for a later reconnect.
    fn handle_leave(&mut self, entity: EntityId) {
        if self.queue.remove_entity(entity) {
            debug!(level = %self.level, entity = %entity, "entity left the schedule");
        }
    }

    fn handle_idle_message(&mut self, msg: InstanceMessage) {
        match msg {
            InstanceMessage::Report { reply } => {
                let _ = reply.send(self.report());
            }
            InstanceMessage::Command(command) => {
                // No turn in progress (empty queue); nobody can act.
                self.send_error(command.entity, "It is not your turn.");
            }
        }
    }

    fn report(&self) -> InstanceReport {
        InstanceReport {
            level: self.level,
            clock: self.clock,
            queue_len: self.queue.len(),
            entity_count: self.world.entity_count(),
            replay: self.replay.clone(),
        }
    }

    /// Nearest passable, unoccupied cell to `origin`, searching outward a
    /// few rings. Falls back to the origin itself.
    fn free_spot_near(&self, origin: Position) -> Position {
        for ring in 0..4 {
            for dy in -ring..=ring {
                for dx in -ring..=ring {
                    if dx.abs() != ring && dy.abs() != ring {
                        continue;
                    }
                    let candidate = origin.shifted(dx, dy);
                    let passable = self
                        .world
                        .tile(candidate)
                        .map(|t| t.is_passable())
                        .unwrap_or(false);
                    if passable && self.world.living_entity_at(candidate).is_none() {
                        return candidate;
                    }
                }
            }
        }
        origin
    }

    fn push_logs(&mut self, lines: Vec<LogLine>) {
        let clock = self.clock;
        self.pending_logs.extend(lines.into_iter().map(|line| LogEntry {
            text: line.text,
            category: line.category,
            tick: clock,
        }));
    }

    fn send_error(&self, entity: EntityId, message: impl Into<String>) {
        self.broadcaster.send(
            entity,
            ServerResponse::log_only(
                self.clock,
                vec![LogEntry {
                    text: message.into(),
                    category: LogCategory::Error,
                    tick: self.clock,
                }],
            ),
        );
    }

    /// Publishes a per-observer snapshot to every subscribed player on this
    /// level, then clears the turn's accumulated logs.
    fn broadcast(&mut self) {
        let active = self
            .queue
            .peek_next()
            .map(|item| item.entity)
            .unwrap_or(EntityId::NIL);
        let observers: Vec<EntityId> = self
            .world
            .entity_ids()
            .filter(|id| id.is_player())
            .collect();
        let logs = std::mem::take(&mut self.pending_logs);

        for observer in observers {
            if !self.broadcaster.is_subscribed(observer) {
                continue;
            }
            if let Some(response) =
                build_snapshot(&mut self.world, observer, self.clock, active, logs.clone())
            {
                self.broadcaster.send(observer, response);
            }
        }
    }
}
