//! HID transport implementations.
//!
//! The relay talks to a Bluetooth HID stack through
//! [`HidTransport`](crate::application::hid_transport::HidTransport).  Platform
//! stacks are external collaborators; this module ships the in-memory
//! [`mock::MockTransport`] used by the tests and by the binary's simulated
//! mode.

pub mod mock;

pub use mock::{MockTransport, SentReport};
