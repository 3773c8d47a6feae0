//! Character-to-keystroke encoder.
//!
//! [`encode`] is a pure, total function over `char`: every input either has a
//! fixed (modifier, keycode) mapping or yields `None`.  Characters without a
//! mapping (accented letters, emoji, carriage returns, ...) are skipped by the
//! dispatcher, so typed text is best effort rather than lossless.
//!
//! | Input                    | Keycode       | Modifier |
//! |--------------------------|---------------|----------|
//! | `a`–`z`                  | 0x04–0x1D     | none     |
//! | `A`–`Z`                  | 0x04–0x1D     | shift    |
//! | `1`–`9`, `0`             | 0x1E–0x26, 0x27 | none   |
//! | space, `\n`, `\t`        | 0x2C, 0x28, 0x2B | none  |
//! | ``-=[]\;',./` ``         | 0x2D–0x38     | none     |
//! | `!@#$%^&*()`             | 0x1E–0x27     | shift    |
//! | `_+{}|:"~<>?`            | 0x2D–0x38     | shift    |

use crate::keymap::hid::{HidKeyCode, Modifiers};
use crate::report::KeyReport;

/// Maps a character to the key report that types it, or `None` if the
/// character has no mapping.
pub fn encode(c: char) -> Option<KeyReport> {
    let (key, modifiers) = match c {
        'a'..='z' => (HidKeyCode::letter(c as u8 - b'a')?, Modifiers::NONE),
        'A'..='Z' => (HidKeyCode::letter(c as u8 - b'A')?, Modifiers::LEFT_SHIFT),

        '1' => (HidKeyCode::Digit1, Modifiers::NONE),
        '2' => (HidKeyCode::Digit2, Modifiers::NONE),
        '3' => (HidKeyCode::Digit3, Modifiers::NONE),
        '4' => (HidKeyCode::Digit4, Modifiers::NONE),
        '5' => (HidKeyCode::Digit5, Modifiers::NONE),
        '6' => (HidKeyCode::Digit6, Modifiers::NONE),
        '7' => (HidKeyCode::Digit7, Modifiers::NONE),
        '8' => (HidKeyCode::Digit8, Modifiers::NONE),
        '9' => (HidKeyCode::Digit9, Modifiers::NONE),
        '0' => (HidKeyCode::Digit0, Modifiers::NONE),

        ' ' => (HidKeyCode::Space, Modifiers::NONE),
        '\n' => (HidKeyCode::Enter, Modifiers::NONE),
        '\t' => (HidKeyCode::Tab, Modifiers::NONE),

        '-' => (HidKeyCode::Minus, Modifiers::NONE),
        '=' => (HidKeyCode::Equal, Modifiers::NONE),
        '[' => (HidKeyCode::BracketLeft, Modifiers::NONE),
        ']' => (HidKeyCode::BracketRight, Modifiers::NONE),
        '\\' => (HidKeyCode::Backslash, Modifiers::NONE),
        ';' => (HidKeyCode::Semicolon, Modifiers::NONE),
        '\'' => (HidKeyCode::Quote, Modifiers::NONE),
        '`' => (HidKeyCode::Backquote, Modifiers::NONE),
        ',' => (HidKeyCode::Comma, Modifiers::NONE),
        '.' => (HidKeyCode::Period, Modifiers::NONE),
        '/' => (HidKeyCode::Slash, Modifiers::NONE),

        // Shift + digit row
        '!' => (HidKeyCode::Digit1, Modifiers::LEFT_SHIFT),
        '@' => (HidKeyCode::Digit2, Modifiers::LEFT_SHIFT),
        '#' => (HidKeyCode::Digit3, Modifiers::LEFT_SHIFT),
        '$' => (HidKeyCode::Digit4, Modifiers::LEFT_SHIFT),
        '%' => (HidKeyCode::Digit5, Modifiers::LEFT_SHIFT),
        '^' => (HidKeyCode::Digit6, Modifiers::LEFT_SHIFT),
        '&' => (HidKeyCode::Digit7, Modifiers::LEFT_SHIFT),
        '*' => (HidKeyCode::Digit8, Modifiers::LEFT_SHIFT),
        '(' => (HidKeyCode::Digit9, Modifiers::LEFT_SHIFT),
        ')' => (HidKeyCode::Digit0, Modifiers::LEFT_SHIFT),

        // Shift + punctuation
        '_' => (HidKeyCode::Minus, Modifiers::LEFT_SHIFT),
        '+' => (HidKeyCode::Equal, Modifiers::LEFT_SHIFT),
        '{' => (HidKeyCode::BracketLeft, Modifiers::LEFT_SHIFT),
        '}' => (HidKeyCode::BracketRight, Modifiers::LEFT_SHIFT),
        '|' => (HidKeyCode::Backslash, Modifiers::LEFT_SHIFT),
        ':' => (HidKeyCode::Semicolon, Modifiers::LEFT_SHIFT),
        '"' => (HidKeyCode::Quote, Modifiers::LEFT_SHIFT),
        '~' => (HidKeyCode::Backquote, Modifiers::LEFT_SHIFT),
        '<' => (HidKeyCode::Comma, Modifiers::LEFT_SHIFT),
        '>' => (HidKeyCode::Period, Modifiers::LEFT_SHIFT),
        '?' => (HidKeyCode::Slash, Modifiers::LEFT_SHIFT),

        _ => return None,
    };
    Some(KeyReport::new(modifiers, key))
}

/// Returns the modifier byte of an encoded report.
///
/// `None` (no mapping) decodes to [`Modifiers::NONE`].
pub fn decode_modifier(report: Option<KeyReport>) -> Modifiers {
    report.map(|r| r.modifiers()).unwrap_or(Modifiers::NONE)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
