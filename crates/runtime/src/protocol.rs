//! Wire protocol types.
//!
//! JSON frames exchanged with clients. Entity ids cross this boundary as
//! decimal strings (see [`warren_core::EntityId`]'s serde impl); tile and
//! entity views carry per-observer display data, never raw terrain enums or
//! hidden stats.

use serde::{Deserialize, Serialize};

use warren_core::{EntityId, LogCategory};

/// Client → server frame.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ClientCommand {
    /// Identifies the controlled entity. Overwritten server-side with the
    /// authenticated identity after login, regardless of what the client
    /// sends.
    #[serde(default)]
    pub token: String,
    pub action: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseType {
    /// Full per-observer snapshot.
    State,
    /// Log lines only (rejections, chat addressed to one observer).
    Log,
}

/// Server → client frame.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerResponse {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub tick: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_entity_id: Option<EntityId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub my_entity_id: Option<EntityId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid: Option<GridSize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map: Option<Vec<TileView>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entities: Option<Vec<EntityView>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logs: Option<Vec<LogEntry>>,
}

impl ServerResponse {
    /// Log-only frame addressed to a single observer.
    pub fn log_only(tick: u64, logs: Vec<LogEntry>) -> Self {
        Self {
            response_type: ResponseType::Log,
            tick,
            active_entity_id: None,
            my_entity_id: None,
            grid: None,
            map: None,
            entities: None,
            logs: Some(logs),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSize {
    pub w: i32,
    pub h: i32,
}

/// One tile as a given observer sees it right now.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileView {
    pub x: i32,
    pub y: i32,
    pub symbol: char,
    pub color: String,
    pub visible: bool,
    pub explored: bool,
}

/// One entity as a given observer may know it.
///
/// Living non-self entities expose HP and the dead flag but none of the
/// other resource stats; the observer's own entity carries everything.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityView {
    pub id: EntityId,
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub symbol: char,
    pub color: String,
    pub hp: i32,
    pub is_dead: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_hp: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stamina: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_stamina: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strength: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gold: Option<i32>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub text: String,
    pub category: LogCategory,
    pub tick: u64,
}
