//! Runtime orchestration for the warren simulation core.
//!
//! This crate wires the deterministic core into a running multiplayer
//! service: one tokio task per active level ([`instance`]), a shared
//! observer hub ([`broadcaster`]), the orchestrator task ([`service`]), the
//! wire protocol types ([`protocol`]), per-observer snapshot building
//! ([`snapshot`]), and the binary replay codec ([`replay`]). Consumers embed
//! [`GameHandle`] to log in, submit commands, and receive frames.
pub mod ai;
pub mod broadcaster;
pub mod config;
pub mod error;
pub mod instance;
pub mod protocol;
pub mod replay;
pub mod service;
pub mod snapshot;

pub use broadcaster::Broadcaster;
pub use config::RuntimeConfig;
pub use error::{Result, RuntimeError};
pub use instance::{
    AddressedCommand, Instance, InstanceEvent, InstanceHandle, InstanceMessage, InstanceReport,
    JoinRequest, Placement,
};
pub use protocol::{
    ClientCommand, EntityView, GridSize, LogEntry, ResponseType, ServerResponse, TileView,
};
pub use replay::{ReplayAction, ReplayError, ReplaySession};
pub use service::{GameHandle, GameService, LoginReply, ServiceCommand};
pub use snapshot::build_snapshot;
