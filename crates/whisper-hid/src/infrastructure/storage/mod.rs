//! Storage infrastructure: configuration file loading.
//!
//! The `config` sub-module reads the TOML configuration file, fills in
//! defaults for anything missing, and validates the result before any
//! service is constructed.  Nothing else in the relay touches the file system.

pub mod config;
