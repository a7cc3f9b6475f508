//! Pure gameplay systems: visibility, movement legality, combat resolution,
//! and target validation. Systems never own state; they read and mutate the
//! world handed to them.
pub mod combat;
pub mod movement;
pub mod targeting;
pub mod vision;

pub use combat::{CORPSE_GLYPH, apply_attack, attack_damage};
pub use movement::{MoveOutcome, calculate_move};
pub use targeting::{ValidationResult, line_of_sight, validate_interaction};
pub use vision::{Visibility, compute_fov, refresh_vision};
