//! Application layer use cases for the keyboard relay.
//!
//! # What is the "application" layer? (for beginners)
//!
//! The *application* layer sits between the pure domain types in
//! `whisper_hid_core` and the infrastructure (Bluetooth stack, HTTP, files).
//! Use cases here orchestrate domain values and talk to the outside world only
//! through traits, so every rule can be tested with an in-memory fake.
//!
//! # Sub-modules
//!
//! - **`hid_transport`** – The [`hid_transport::HidTransport`] trait: the
//!   Bluetooth HID capability the relay consumes, and the callback events it
//!   produces.
//!
//! - **`manage_connection`** – The Connection Manager.  Owns registration,
//!   the host link, and the reconnect backoff timeline.
//!
//! - **`dispatch_keystrokes`** – The Keystroke Dispatcher.  A single worker
//!   that types queued text as timed down/up report pairs.

pub mod dispatch_keystrokes;
pub mod hid_transport;
pub mod manage_connection;
