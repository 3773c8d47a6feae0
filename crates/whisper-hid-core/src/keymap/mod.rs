//! Key code tables for turning text into keyboard reports.
//!
//! The canonical representation is USB HID Usage IDs (page 0x07,
//! Keyboard/Keypad).  [`encoder`] maps characters onto those IDs plus the
//! modifier byte needed to produce them on a US-layout host.

pub mod encoder;
pub mod hid;

pub use encoder::{decode_modifier, encode};
pub use hid::{HidKeyCode, Modifiers};
