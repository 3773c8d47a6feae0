//! USB HID Usage IDs (page 0x07, Keyboard/Keypad page) emitted by the relay.
//!
//! Only the keys that text can produce are listed here: letters, digits,
//! the whitespace/editing keys, and the US-layout punctuation keys.  The
//! relay never sends function keys, navigation keys, or numpad keys, so
//! they are deliberately absent rather than mapped to a sentinel.
//!
//! Reference: USB HID Usage Tables 1.3, Section 10 (Keyboard/Keypad page 0x07).
//!
//! # Usage IDs are key positions, not characters
//!
//! HID codes identify **physical key positions**.  Letter A is 0x04 whether
//! the host then produces `a` or `A`; the difference is carried by the
//! modifier byte of the report (see [`Modifiers`]).  This is why `'1'` and
//! `'!'` share [`HidKeyCode::Digit1`]: the second one is sent with Shift held.
//!
//! The host interprets the positions with its own keyboard layout, so the
//! encoder assumes the host is configured for a US layout.

use serde::{Deserialize, Serialize};

/// USB HID Usage ID for a keyboard key (page 0x07).
///
/// The numeric value of each variant is its HID Usage ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum HidKeyCode {
    // Letters (HID 0x04–0x1D)
    KeyA = 0x04,
    KeyB = 0x05,
    KeyC = 0x06,
    KeyD = 0x07,
    KeyE = 0x08,
    KeyF = 0x09,
    KeyG = 0x0A,
    KeyH = 0x0B,
    KeyI = 0x0C,
    KeyJ = 0x0D,
    KeyK = 0x0E,
    KeyL = 0x0F,
    KeyM = 0x10,
    KeyN = 0x11,
    KeyO = 0x12,
    KeyP = 0x13,
    KeyQ = 0x14,
    KeyR = 0x15,
    KeyS = 0x16,
    KeyT = 0x17,
    KeyU = 0x18,
    KeyV = 0x19,
    KeyW = 0x1A,
    KeyX = 0x1B,
    KeyY = 0x1C,
    KeyZ = 0x1D,

    // Digits (HID 0x1E–0x27)
    Digit1 = 0x1E,
    Digit2 = 0x1F,
    Digit3 = 0x20,
    Digit4 = 0x21,
    Digit5 = 0x22,
    Digit6 = 0x23,
    Digit7 = 0x24,
    Digit8 = 0x25,
    Digit9 = 0x26,
    Digit0 = 0x27,

    // Control keys (HID 0x28–0x2C)
    Enter = 0x28,
    Escape = 0x29,
    Backspace = 0x2A,
    Tab = 0x2B,
    Space = 0x2C,

    // Punctuation (HID 0x2D–0x38; 0x32 is the non-US hash key and is unused)
    Minus = 0x2D,
    Equal = 0x2E,
    BracketLeft = 0x2F,
    BracketRight = 0x30,
    Backslash = 0x31,
    Semicolon = 0x33,
    Quote = 0x34,
    Backquote = 0x35,
    Comma = 0x36,
    Period = 0x37,
    Slash = 0x38,
}

impl HidKeyCode {
    /// Returns the raw HID Usage ID.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Converts a raw HID Usage ID back to a [`HidKeyCode`].
    ///
    /// Returns `None` for usage IDs the relay never emits (including 0x00,
    /// which in a report means "no key").
    pub fn from_u8(value: u8) -> Option<Self> {
        let key = match value {
            0x04 => HidKeyCode::KeyA,
            0x05 => HidKeyCode::KeyB,
            0x06 => HidKeyCode::KeyC,
            0x07 => HidKeyCode::KeyD,
            0x08 => HidKeyCode::KeyE,
            0x09 => HidKeyCode::KeyF,
            0x0A => HidKeyCode::KeyG,
            0x0B => HidKeyCode::KeyH,
            0x0C => HidKeyCode::KeyI,
            0x0D => HidKeyCode::KeyJ,
            0x0E => HidKeyCode::KeyK,
            0x0F => HidKeyCode::KeyL,
            0x10 => HidKeyCode::KeyM,
            0x11 => HidKeyCode::KeyN,
            0x12 => HidKeyCode::KeyO,
            0x13 => HidKeyCode::KeyP,
            0x14 => HidKeyCode::KeyQ,
            0x15 => HidKeyCode::KeyR,
            0x16 => HidKeyCode::KeyS,
            0x17 => HidKeyCode::KeyT,
            0x18 => HidKeyCode::KeyU,
            0x19 => HidKeyCode::KeyV,
            0x1A => HidKeyCode::KeyW,
            0x1B => HidKeyCode::KeyX,
            0x1C => HidKeyCode::KeyY,
            0x1D => HidKeyCode::KeyZ,
            0x1E => HidKeyCode::Digit1,
            0x1F => HidKeyCode::Digit2,
            0x20 => HidKeyCode::Digit3,
            0x21 => HidKeyCode::Digit4,
            0x22 => HidKeyCode::Digit5,
            0x23 => HidKeyCode::Digit6,
            0x24 => HidKeyCode::Digit7,
            0x25 => HidKeyCode::Digit8,
            0x26 => HidKeyCode::Digit9,
            0x27 => HidKeyCode::Digit0,
            0x28 => HidKeyCode::Enter,
            0x29 => HidKeyCode::Escape,
            0x2A => HidKeyCode::Backspace,
            0x2B => HidKeyCode::Tab,
            0x2C => HidKeyCode::Space,
            0x2D => HidKeyCode::Minus,
            0x2E => HidKeyCode::Equal,
            0x2F => HidKeyCode::BracketLeft,
            0x30 => HidKeyCode::BracketRight,
            0x31 => HidKeyCode::Backslash,
            0x33 => HidKeyCode::Semicolon,
            0x34 => HidKeyCode::Quote,
            0x35 => HidKeyCode::Backquote,
            0x36 => HidKeyCode::Comma,
            0x37 => HidKeyCode::Period,
            0x38 => HidKeyCode::Slash,
            _ => return None,
        };
        Some(key)
    }

    /// Letter key for `index` in `0..26` (`0` is A).
    pub(crate) fn letter(index: u8) -> Option<Self> {
        if index < 26 {
            Self::from_u8(0x04 + index)
        } else {
            None
        }
    }
}

/// Modifier byte of a boot-protocol keyboard report.
///
/// Bit layout follows the HID boot keyboard: bits 0–3 are the left-hand
/// Ctrl/Shift/Alt/GUI keys, bits 4–7 the right-hand ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Modifiers(pub u8);

impl Modifiers {
    pub const NONE: Modifiers = Modifiers(0x00);
    pub const LEFT_CTRL: Modifiers = Modifiers(1 << 0);
    pub const LEFT_SHIFT: Modifiers = Modifiers(1 << 1);
    pub const LEFT_ALT: Modifiers = Modifiers(1 << 2);
    pub const LEFT_GUI: Modifiers = Modifiers(1 << 3);
    pub const RIGHT_CTRL: Modifiers = Modifiers(1 << 4);
    pub const RIGHT_SHIFT: Modifiers = Modifiers(1 << 5);
    pub const RIGHT_ALT: Modifiers = Modifiers(1 << 6);
    pub const RIGHT_GUI: Modifiers = Modifiers(1 << 7);

    /// Returns the raw modifier byte.
    pub fn bits(self) -> u8 {
        self.0
    }

    /// Returns `true` if either Shift key is held.
    pub fn shift(self) -> bool {
        self.0 & (Self::LEFT_SHIFT.0 | Self::RIGHT_SHIFT.0) != 0
    }

    /// Returns `true` if no modifier bit is set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_u8_roundtrips_every_variant_value() {
        for value in 0u8..=0xFF {
            if let Some(key) = HidKeyCode::from_u8(value) {
                assert_eq!(key.as_u8(), value, "0x{value:02X} must map back to itself");
            }
        }
    }

    #[test]
    fn test_from_u8_rejects_no_key_and_non_us_hash() {
        assert_eq!(HidKeyCode::from_u8(0x00), None);
        assert_eq!(HidKeyCode::from_u8(0x32), None);
        assert_eq!(HidKeyCode::from_u8(0x39), None);
    }

    #[test]
    fn test_letter_helper_covers_a_to_z() {
        assert_eq!(HidKeyCode::letter(0), Some(HidKeyCode::KeyA));
        assert_eq!(HidKeyCode::letter(25), Some(HidKeyCode::KeyZ));
        assert_eq!(HidKeyCode::letter(26), None);
    }

    #[test]
    fn test_left_shift_is_bit_one() {
        // The boot keyboard layout puts Left Shift at 0x02.
        assert_eq!(Modifiers::LEFT_SHIFT.bits(), 0x02);
        assert!(Modifiers::LEFT_SHIFT.shift());
        assert!(Modifiers::RIGHT_SHIFT.shift());
        assert!(!Modifiers::LEFT_CTRL.shift());
    }

    #[test]
    fn test_default_modifiers_are_empty() {
        assert!(Modifiers::default().is_empty());
        assert_eq!(Modifiers::default(), Modifiers::NONE);
    }
}
