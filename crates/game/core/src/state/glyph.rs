//! Packed rendering primitive.

use serde::{Deserialize, Serialize};

/// Display cell packed into 32 bits: `[Color:24][Char:8]`.
///
/// Pack and unpack are pure bit operations independent of game state, so the
/// round trip is an invariant of the serialization layer rather than of any
/// system that happens to use the glyph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Glyph(pub u32);

impl Glyph {
    pub const fn new(color: u32, ch: u8) -> Self {
        Self(((color & 0x00FF_FFFF) << 8) | ch as u32)
    }

    #[inline]
    pub const fn color(self) -> u32 {
        self.0 >> 8
    }

    #[inline]
    pub const fn char_code(self) -> u8 {
        self.0 as u8
    }

    pub fn symbol(self) -> char {
        self.char_code() as char
    }

    /// CSS-style hex color for wire views.
    pub fn color_hex(self) -> String {
        format!("#{:06x}", self.color())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn round_trips_extremes() {
        for (color, ch) in [(0u32, 0u8), (0x00FF_FFFF, u8::MAX), (0x336699, b'@')] {
            let glyph = Glyph::new(color, ch);
            assert_eq!(glyph.color(), color);
            assert_eq!(glyph.char_code(), ch);
        }
    }

    #[test]
    fn color_bits_never_leak_into_char() {
        let base = Glyph::new(0x000000, b'g');
        let tinted = Glyph::new(0xABCDEF, b'g');
        assert_eq!(base.char_code(), tinted.char_code());

        let other_char = Glyph::new(0xABCDEF, b'G');
        assert_eq!(tinted.color(), other_char.color());
    }

    proptest! {
        #[test]
        fn round_trips(color in 0u32..=0x00FF_FFFF, ch: u8) {
            let glyph = Glyph::new(color, ch);
            prop_assert_eq!(glyph.color(), color);
            prop_assert_eq!(glyph.char_code(), ch);
        }
    }
}
