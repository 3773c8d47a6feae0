//! Boot-protocol keyboard input reports.
//!
//! Every keystroke travels to the host as an 8-byte input report:
//!
//! ```text
//! byte 0   modifier bitmask (see Modifiers)
//! byte 1   reserved, always 0x00
//! byte 2   keycode of the pressed key (0x00 = none)
//! byte 3-7 additional pressed keys, always 0x00 (the relay presses one key at a time)
//! ```
//!
//! Typing a character is a key-down report carrying the keycode followed by
//! the all-zero [`KEY_UP_FRAME`], which tells the host that every key has
//! been released.  A down report with no matching release leaves the host
//! believing the key is still held, so the two are always sent as a pair.

use thiserror::Error;

use crate::keymap::hid::{HidKeyCode, Modifiers};

/// Length of a keyboard input report in bytes.
pub const REPORT_LEN: usize = 8;

/// Report ID passed to the transport.  The descriptor declares no report IDs,
/// so every report uses ID 0.
pub const REPORT_ID: u8 = 0;

/// The universal "release all keys" frame.
pub const KEY_UP_FRAME: [u8; REPORT_LEN] = [0; REPORT_LEN];

/// HID report descriptor for a boot-protocol keyboard without report IDs.
///
/// Declares 8 modifier bits, one reserved byte, a 5-bit LED output report
/// (padded to a byte), and a 6-key rollover array of usages 0x00–0x65.
/// Handed to the transport at registration time.
pub const KEYBOARD_DESCRIPTOR: &[u8] = &[
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x06, // Usage (Keyboard)
    0xA1, 0x01, // Collection (Application)
    0x05, 0x07, //   Usage Page (Keyboard/Keypad)
    0x19, 0xE0, //   Usage Minimum (Left Control)
    0x29, 0xE7, //   Usage Maximum (Right GUI)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x01, //   Logical Maximum (1)
    0x75, 0x01, //   Report Size (1)
    0x95, 0x08, //   Report Count (8)
    0x81, 0x02, //   Input (Data, Variable, Absolute) ; modifier byte
    0x95, 0x01, //   Report Count (1)
    0x75, 0x08, //   Report Size (8)
    0x81, 0x01, //   Input (Constant) ; reserved byte
    0x95, 0x05, //   Report Count (5)
    0x75, 0x01, //   Report Size (1)
    0x05, 0x08, //   Usage Page (LEDs)
    0x19, 0x01, //   Usage Minimum (Num Lock)
    0x29, 0x05, //   Usage Maximum (Kana)
    0x91, 0x02, //   Output (Data, Variable, Absolute) ; LED report
    0x95, 0x01, //   Report Count (1)
    0x75, 0x03, //   Report Size (3)
    0x91, 0x01, //   Output (Constant) ; LED padding
    0x95, 0x06, //   Report Count (6)
    0x75, 0x08, //   Report Size (8)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x65, //   Logical Maximum (101)
    0x05, 0x07, //   Usage Page (Keyboard/Keypad)
    0x19, 0x00, //   Usage Minimum (0)
    0x29, 0x65, //   Usage Maximum (101)
    0x81, 0x00, //   Input (Data, Array) ; key array
    0xC0, // End Collection
];

/// Errors produced when parsing a raw report frame.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReportError {
    /// The frame is not exactly [`REPORT_LEN`] bytes long.
    #[error("keyboard report must be {REPORT_LEN} bytes, got {0}")]
    WrongLength(usize),
    /// The frame sets bytes the relay always leaves zero.
    #[error("keyboard report byte {0} must be zero")]
    NonZeroPadding(usize),
}

/// A single keyboard report: modifier bitmask plus at most one keycode.
///
/// Immutable value type.  A keycode of `0x00` means "no key", so
/// [`KeyReport::release`] renders to [`KEY_UP_FRAME`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyReport {
    modifiers: Modifiers,
    keycode: u8,
}

impl KeyReport {
    /// A report pressing `key` with `modifiers` held.
    pub fn new(modifiers: Modifiers, key: HidKeyCode) -> Self {
        Self {
            modifiers,
            keycode: key.as_u8(),
        }
    }

    /// The all-keys-released report.
    pub fn release() -> Self {
        Self {
            modifiers: Modifiers::NONE,
            keycode: 0,
        }
    }

    /// A Backspace press.  Backspace is never produced from text; it is only
    /// sent by explicit backspace requests.
    pub fn backspace() -> Self {
        Self::new(Modifiers::NONE, HidKeyCode::Backspace)
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    pub fn keycode(&self) -> u8 {
        self.keycode
    }

    /// Returns the pressed key, or `None` for a release report.
    pub fn key(&self) -> Option<HidKeyCode> {
        HidKeyCode::from_u8(self.keycode)
    }

    /// Renders the 8-byte wire frame `[modifier, 0, keycode, 0, 0, 0, 0, 0]`.
    pub fn to_frame(&self) -> [u8; REPORT_LEN] {
        [self.modifiers.bits(), 0x00, self.keycode, 0, 0, 0, 0, 0]
    }

    /// Parses a frame produced by [`KeyReport::to_frame`].
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] if the frame has the wrong length or uses the
    /// reserved byte or the extra key slots.
    pub fn from_frame(frame: &[u8]) -> Result<Self, ReportError> {
        if frame.len() != REPORT_LEN {
            return Err(ReportError::WrongLength(frame.len()));
        }
        if let Some(idx) = [1usize, 3, 4, 5, 6, 7].into_iter().find(|&i| frame[i] != 0) {
            return Err(ReportError::NonZeroPadding(idx));
        }
        Ok(Self {
            modifiers: Modifiers(frame[0]),
            keycode: frame[2],
        })
    }

    /// Returns `true` if this is the all-zero release report.
    pub fn is_release(&self) -> bool {
        self.keycode == 0 && self.modifiers.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keymap::encoder::encode;

    #[test]
    fn test_release_renders_all_zero_frame() {
        assert_eq!(KeyReport::release().to_frame(), KEY_UP_FRAME);
        assert!(KeyReport::release().is_release());
    }

    #[test]
    fn test_frame_places_modifier_and_keycode() {
        // Arrange
        let report = encode('A').unwrap();

        // Act
        let frame = report.to_frame();

        // Assert
        assert_eq!(frame, [0x02, 0x00, 0x04, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_every_mapped_character_renders_eight_bytes_with_zero_padding() {
        for c in ' '..='~' {
            let frame = encode(c).unwrap().to_frame();
            assert_eq!(frame.len(), REPORT_LEN);
            assert_eq!(frame[1], 0, "{c:?}");
            assert!(frame[3..].iter().all(|&b| b == 0), "{c:?}");
        }
    }

    #[test]
    fn test_backspace_report_uses_0x2a() {
        let report = KeyReport::backspace();
        assert_eq!(report.keycode(), 0x2A);
        assert_eq!(report.key(), Some(HidKeyCode::Backspace));
        assert!(report.modifiers().is_empty());
    }

    #[test]
    fn test_from_frame_parses_rendered_frame() {
        let report = encode('?').unwrap();
        assert_eq!(KeyReport::from_frame(&report.to_frame()), Ok(report));
    }

    #[test]
    fn test_from_frame_rejects_wrong_length() {
        assert_eq!(
            KeyReport::from_frame(&[0u8; 7]),
            Err(ReportError::WrongLength(7))
        );
    }

    #[test]
    fn test_from_frame_rejects_rollover_keys() {
        let frame = [0, 0, 0x04, 0x05, 0, 0, 0, 0];
        assert_eq!(
            KeyReport::from_frame(&frame),
            Err(ReportError::NonZeroPadding(3))
        );
    }

    #[test]
    fn test_descriptor_is_a_closed_application_collection() {
        assert_eq!(&KEYBOARD_DESCRIPTOR[..6], &[0x05, 0x01, 0x09, 0x06, 0xA1, 0x01]);
        assert_eq!(KEYBOARD_DESCRIPTOR.last(), Some(&0xC0));
        assert_eq!(KEYBOARD_DESCRIPTOR.len(), 63);
    }
}
