//! Unified error types surfaced by the runtime API.
//!
//! Wraps failures from the service task, per-level instances, and the replay
//! codec so callers can bubble them up with consistent context.
use thiserror::Error;
use tokio::sync::oneshot;

pub use crate::replay::ReplayError;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("service command channel closed")]
    ServiceChannelClosed,

    #[error("service reply channel closed")]
    ReplyChannelClosed(#[source] oneshot::error::RecvError),

    #[error("entity {0} is not placed on any level")]
    UnknownEntity(warren_core::EntityId),

    #[error("level {0} has no running instance")]
    UnknownLevel(warren_core::LevelId),

    #[error("instance command queue for level {0} is full")]
    InstanceBusy(warren_core::LevelId),

    #[error(transparent)]
    Replay(#[from] ReplayError),
}
