//! Typed action payloads and the generic decode/validate layer.
//!
//! Handlers never see malformed payloads: the wrapping layer decodes the raw
//! JSON into the typed struct and runs its structural self-validation before
//! the handler is invoked.

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::state::EntityId;

use super::ActionError;

/// Structural self-validation run after JSON decoding.
pub trait ValidatePayload {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Decodes and validates a raw payload for a typed handler.
pub fn decode<T: DeserializeOwned + ValidatePayload>(
    raw: &serde_json::Value,
) -> Result<T, ActionError> {
    let payload: T =
        serde_json::from_value(raw.clone()).map_err(|e| ActionError::Payload(e.to_string()))?;
    payload.validate().map_err(ActionError::Payload)?;
    Ok(payload)
}

/// Movement delta; must be one of the eight unit directions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct DirectionPayload {
    pub dx: i32,
    pub dy: i32,
}

impl ValidatePayload for DirectionPayload {
    fn validate(&self) -> Result<(), String> {
        if !(-1..=1).contains(&self.dx) || !(-1..=1).contains(&self.dy) {
            return Err(format!("direction ({}, {}) is not a unit step", self.dx, self.dy));
        }
        if self.dx == 0 && self.dy == 0 {
            return Err("direction must be non-zero".to_string());
        }
        Ok(())
    }
}

/// Single-entity target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityPayload {
    pub target_id: EntityId,
}

impl ValidatePayload for EntityPayload {
    fn validate(&self) -> Result<(), String> {
        if self.target_id.is_nil() {
            return Err("target id must not be nil".to_string());
        }
        Ok(())
    }
}

/// Item-targeted payload for inventory actions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPayload {
    pub item_id: EntityId,
    #[serde(default)]
    pub count: Option<u32>,
}

impl ValidatePayload for ItemPayload {
    fn validate(&self) -> Result<(), String> {
        if self.item_id.is_nil() {
            return Err("item id must not be nil".to_string());
        }
        if self.count == Some(0) {
            return Err("count must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Chat text.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct TalkPayload {
    pub text: String,
}

impl ValidatePayload for TalkPayload {
    fn validate(&self) -> Result<(), String> {
        if self.text.trim().is_empty() {
            return Err("nothing to say".to_string());
        }
        if self.text.len() > 256 {
            return Err("message too long".to_string());
        }
        Ok(())
    }
}

/// Actions carrying no payload (Wait, Init, cheats).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct EmptyPayload {}

impl ValidatePayload for EmptyPayload {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn direction_must_be_a_unit_step() {
        assert!(decode::<DirectionPayload>(&json!({"dx": 1, "dy": 0})).is_ok());
        assert!(decode::<DirectionPayload>(&json!({"dx": -1, "dy": 1})).is_ok());
        assert!(decode::<DirectionPayload>(&json!({"dx": 0, "dy": 0})).is_err());
        assert!(decode::<DirectionPayload>(&json!({"dx": 2, "dy": 0})).is_err());
        assert!(decode::<DirectionPayload>(&json!({"dy": 1})).is_err());
    }

    #[test]
    fn entity_target_must_be_non_nil() {
        assert!(decode::<EntityPayload>(&json!({"targetId": "42"})).is_ok());
        assert!(decode::<EntityPayload>(&json!({"targetId": "0"})).is_err());
    }

    #[test]
    fn item_count_must_be_positive_when_present() {
        assert!(decode::<ItemPayload>(&json!({"itemId": "7"})).is_ok());
        assert!(decode::<ItemPayload>(&json!({"itemId": "7", "count": 3})).is_ok());
        assert!(decode::<ItemPayload>(&json!({"itemId": "7", "count": 0})).is_err());
    }
}
