//! Infrastructure layer for the relay.
//!
//! Contains the outward-facing adapters: the loopback control gateway, the
//! HID transport implementations, configuration loading, and logging setup.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `whisper_hid_core`, but MUST NOT be imported by the `application` layer.

pub mod gateway;
pub mod logging;
pub mod storage;
pub mod transport;
