//! Attack resolution.
//!
//! Damage flows through [`crate::state::StatsComponent::take_damage`], the
//! single authoritative path: HP is clamped at zero and the dead flag is set
//! in the same operation. Defense stats do not reduce damage.

use crate::state::{Entity, Glyph};

/// Corpse display: grey remains.
pub const CORPSE_GLYPH: Glyph = Glyph::new(0x777777, b'%');

/// Damage an attacker deals per swing: its Strength stat, with a floor of 1
/// so statless attackers still scratch.
pub fn attack_damage(attacker: &Entity) -> i32 {
    attacker.stats.map(|s| s.strength).unwrap_or(1).max(1)
}

/// Resolves one attack, mutating the target and returning the log line.
///
/// Attacking something that cannot be harmed (no stats) or is already dead
/// yields a distinct flavor message and changes nothing.
pub fn apply_attack(attacker: &Entity, target: &mut Entity) -> String {
    let Some(stats) = target.stats.as_mut() else {
        return format!("{} swings at {} to no effect.", attacker.name, target.name);
    };
    if stats.is_dead {
        return format!(
            "{} hacks at the lifeless body of {}.",
            attacker.name, target.name
        );
    }

    let damage = attack_damage(attacker);
    stats.take_damage(damage);

    if stats.is_dead {
        // Leave a corpse: grey glyph, hostility gone.
        if let Some(render) = target.render.as_mut() {
            render.glyph = CORPSE_GLYPH;
        }
        if let Some(ai) = target.ai.as_mut() {
            ai.hostile = false;
        }
        format!(
            "{} hits {} for {} damage, killing it!",
            attacker.name, target.name, damage
        )
    } else {
        format!(
            "{} hits {} for {} damage.",
            attacker.name, target.name, damage
        )
    }
}
