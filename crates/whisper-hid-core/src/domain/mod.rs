//! Domain entities for the keyboard relay.
//!
//! This module contains pure state and arithmetic with no infrastructure
//! dependencies: no transport, no async runtime, no HTTP.
//!
//! # What lives here (for beginners)
//!
//! - [`connection`] describes *what state* the Bluetooth link is in and *when*
//!   the next reconnect attempt is due.  The component that actually drives
//!   the transport (the Connection Manager in the `whisper-hid` crate) reads
//!   and writes these types, but the rules themselves are testable here with
//!   plain `Instant` arithmetic.
//! - [`log_ring`] is the bounded, process-wide log buffer that backs the
//!   `/logs` endpoint.

/// Connection state machine values and the reconnect backoff policy.
pub mod connection;

/// Bounded FIFO of recent log entries.
pub mod log_ring;
