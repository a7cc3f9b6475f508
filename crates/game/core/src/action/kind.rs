//! Closed action enumeration.
//!
//! External text tokens parse into [`ActionKind`] exactly once, at the
//! protocol boundary; everything past that point dispatches on the enum.
//! Unknown tokens map to [`ActionKind::Unknown`], which is logged and
//! dropped, never dispatched.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive, serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    Init,
    Move,
    Attack,
    Wait,
    Talk,
    Interact,
    // Inventory
    Pickup,
    Drop,
    Use,
    Equip,
    Unequip,
    // Cheats
    Heal,
    Reveal,
    /// Fallback for unrecognized tokens; never dispatched.
    Unknown,
}

impl ActionKind {
    /// Boundary parse; anything unrecognized becomes [`ActionKind::Unknown`].
    pub fn parse(token: &str) -> Self {
        Self::from_str(token.trim()).unwrap_or(ActionKind::Unknown)
    }

    /// Stable byte code used by the replay file format.
    pub fn wire_code(self) -> u8 {
        match self {
            ActionKind::Init => 0,
            ActionKind::Move => 1,
            ActionKind::Attack => 2,
            ActionKind::Wait => 3,
            ActionKind::Talk => 4,
            ActionKind::Interact => 5,
            ActionKind::Pickup => 6,
            ActionKind::Drop => 7,
            ActionKind::Use => 8,
            ActionKind::Equip => 9,
            ActionKind::Unequip => 10,
            ActionKind::Heal => 11,
            ActionKind::Reveal => 12,
            ActionKind::Unknown => u8::MAX,
        }
    }

    pub fn from_wire_code(code: u8) -> Self {
        match code {
            0 => ActionKind::Init,
            1 => ActionKind::Move,
            2 => ActionKind::Attack,
            3 => ActionKind::Wait,
            4 => ActionKind::Talk,
            5 => ActionKind::Interact,
            6 => ActionKind::Pickup,
            7 => ActionKind::Drop,
            8 => ActionKind::Use,
            9 => ActionKind::Equip,
            10 => ActionKind::Unequip,
            11 => ActionKind::Heal,
            12 => ActionKind::Reveal,
            _ => ActionKind::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!(ActionKind::parse("MOVE"), ActionKind::Move);
        assert_eq!(ActionKind::parse("move"), ActionKind::Move);
        assert_eq!(ActionKind::parse("  Attack "), ActionKind::Attack);
        assert_eq!(ActionKind::parse("pickup"), ActionKind::Pickup);
    }

    #[test]
    fn unknown_tokens_become_unknown() {
        assert_eq!(ActionKind::parse("DANCE"), ActionKind::Unknown);
        assert_eq!(ActionKind::parse(""), ActionKind::Unknown);
    }

    #[test]
    fn wire_codes_round_trip() {
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
            assert_eq!(ActionKind::from_wire_code(kind.wire_code()), kind);
        }
    }
}
