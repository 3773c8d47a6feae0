//! # whisper-hid-core
//!
//! Shared, I/O-free building blocks for the Whisper HID keyboard relay:
//! the character-to-keystroke encoder, the 8-byte keyboard report frame,
//! the connection state model, and the bounded log ring.
//!
//! # Architecture overview
//!
//! Whisper HID turns text produced by a speech-to-text process into keystrokes
//! on a host computer.  The phone (or any device running the relay) presents
//! itself to the host as a Bluetooth keyboard and "types" each character by
//! sending a key-down report followed by an all-zero key-up report.
//!
//! This crate is the pure foundation used by the `whisper-hid` service:
//!
//! - **`keymap`** – HID usage IDs for the keys the relay emits and the
//!   `encode(char)` table that maps text to (modifier, keycode) pairs.
//!
//! - **`report`** – The [`KeyReport`] value and its fixed 8-byte wire frame,
//!   plus the boot-keyboard report descriptor handed to the transport at
//!   registration time.
//!
//! - **`domain`** – The connection state machine's states, the reconnect
//!   backoff policy, and the log ring buffer served by `/logs`.

pub mod domain;
pub mod keymap;
pub mod report;

pub use domain::connection::{ConnectionState, HostDevice, PeerHandle, ReconnectPolicy};
pub use domain::log_ring::{LogEntry, LogLevel, LogRing};
pub use keymap::encoder::{decode_modifier, encode};
pub use keymap::hid::{HidKeyCode, Modifiers};
pub use report::{KeyReport, ReportError, KEYBOARD_DESCRIPTOR, KEY_UP_FRAME, REPORT_ID, REPORT_LEN};
