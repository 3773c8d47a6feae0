//! TOML-based configuration for the relay.
//!
//! The file is optional.  When it is absent every setting takes its default,
//! which is what a fresh install wants:
//!
//! ```toml
//! [gateway]
//! bind_address = "127.0.0.1"
//! port = 9877
//! allowed_origin = "http://localhost:5173"
//! max_concurrent_requests = 8
//! body_limit_bytes = 65536
//! rotate_token_on_restart = true
//!
//! [keyboard]
//! keystroke_delay_ms = 10
//! device_name = "Whisper Keyboard"
//! device_description = "Speech-to-text Bluetooth keyboard"
//! provider = "WhisperHID"
//!
//! [reconnect]
//! schedule_secs = [2, 4, 8, 16, 30]
//! window_secs = 300
//!
//! [logging]
//! level = "info"
//! ring_capacity = 200
//! ```
//!
//! # Serde default values
//!
//! Fields annotated with `#[serde(default = "some_fn")]` use the return value
//! of `some_fn()` when the field is absent, so a file that only sets
//! `[gateway] port = 9000` is valid and everything else keeps its default.
//!
//! # Validation
//!
//! [`AppConfig::validate`] rejects settings the relay cannot run safely with:
//! a non-loopback bind address (the gateway must never be reachable from the
//! network), fewer than four concurrent request handlers, an empty or zero
//! backoff schedule, a zero window, or a zero-sized log ring.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use whisper_hid_core::{ReconnectPolicy, KEYBOARD_DESCRIPTOR};

use crate::application::hid_transport::HidRegistration;

/// Minimum number of concurrently served gateway requests.
pub const MIN_CONCURRENT_REQUESTS: usize = 4;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config parsed but a value is unusable.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub keyboard: KeyboardConfig,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Control gateway listener settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GatewayConfig {
    /// Must be a loopback address.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// The single browser origin allowed to call the gateway.
    #[serde(default = "default_allowed_origin")]
    pub allowed_origin: String,
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
    #[serde(default = "default_body_limit_bytes")]
    pub body_limit_bytes: usize,
    /// Mint a fresh bearer token whenever `/restart` is called.
    #[serde(default = "default_true")]
    pub rotate_token_on_restart: bool,
}

/// How the relay presents itself to the host and how fast it types.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeyboardConfig {
    /// Wait after every report, in milliseconds.
    #[serde(default = "default_keystroke_delay_ms")]
    pub keystroke_delay_ms: u64,
    #[serde(default = "default_device_name")]
    pub device_name: String,
    #[serde(default = "default_device_description")]
    pub device_description: String,
    #[serde(default = "default_provider")]
    pub provider: String,
}

/// Reconnect backoff.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReconnectConfig {
    /// Delay before each attempt in seconds; the last value repeats.
    #[serde(default = "default_schedule_secs")]
    pub schedule_secs: Vec<u64>,
    /// Give up once this many seconds have passed since the host dropped.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// `tracing` level directive; `RUST_LOG` takes precedence.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Entries kept for `/logs`.
    #[serde(default = "default_ring_capacity")]
    pub ring_capacity: usize,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    9877
}
fn default_allowed_origin() -> String {
    "http://localhost:5173".to_string()
}
fn default_max_concurrent_requests() -> usize {
    8
}
fn default_body_limit_bytes() -> usize {
    64 * 1024
}
fn default_true() -> bool {
    true
}
fn default_keystroke_delay_ms() -> u64 {
    10
}
fn default_device_name() -> String {
    "Whisper Keyboard".to_string()
}
fn default_device_description() -> String {
    "Speech-to-text Bluetooth keyboard".to_string()
}
fn default_provider() -> String {
    "WhisperHID".to_string()
}
fn default_schedule_secs() -> Vec<u64> {
    vec![2, 4, 8, 16, 30]
}
fn default_window_secs() -> u64 {
    300
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_ring_capacity() -> usize {
    200
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            allowed_origin: default_allowed_origin(),
            max_concurrent_requests: default_max_concurrent_requests(),
            body_limit_bytes: default_body_limit_bytes(),
            rotate_token_on_restart: default_true(),
        }
    }
}

impl Default for KeyboardConfig {
    fn default() -> Self {
        Self {
            keystroke_delay_ms: default_keystroke_delay_ms(),
            device_name: default_device_name(),
            device_description: default_device_description(),
            provider: default_provider(),
        }
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            schedule_secs: default_schedule_secs(),
            window_secs: default_window_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            ring_capacity: default_ring_capacity(),
        }
    }
}

// ── Derived settings ──────────────────────────────────────────────────────────

impl AppConfig {
    /// Checks the values the relay cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.gateway.socket_addr()?;
        if self.gateway.max_concurrent_requests < MIN_CONCURRENT_REQUESTS {
            return Err(ConfigError::Invalid(format!(
                "gateway.max_concurrent_requests must be at least {MIN_CONCURRENT_REQUESTS}"
            )));
        }
        if self.reconnect.schedule_secs.is_empty()
            || self.reconnect.schedule_secs.contains(&0)
        {
            return Err(ConfigError::Invalid(
                "reconnect.schedule_secs must be non-empty and positive".into(),
            ));
        }
        if self.reconnect.window_secs == 0 {
            return Err(ConfigError::Invalid(
                "reconnect.window_secs must be positive".into(),
            ));
        }
        if self.logging.ring_capacity == 0 {
            return Err(ConfigError::Invalid(
                "logging.ring_capacity must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Backoff policy built from `[reconnect]`.
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy::new(
            self.reconnect
                .schedule_secs
                .iter()
                .copied()
                .map(Duration::from_secs)
                .collect(),
            Duration::from_secs(self.reconnect.window_secs),
        )
    }

    /// What the relay registers as.
    pub fn registration(&self) -> HidRegistration {
        HidRegistration {
            name: self.keyboard.device_name.clone(),
            description: self.keyboard.device_description.clone(),
            provider: self.keyboard.provider.clone(),
            descriptor: KEYBOARD_DESCRIPTOR.to_vec(),
        }
    }

    pub fn keystroke_delay(&self) -> Duration {
        Duration::from_millis(self.keyboard.keystroke_delay_ms)
    }
}

impl GatewayConfig {
    /// The listen address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `bind_address` is not an IP address
    /// or is not loopback.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self.bind_address.parse().map_err(|_| {
            ConfigError::Invalid(format!(
                "gateway.bind_address '{}' is not an IP address",
                self.bind_address
            ))
        })?;
        if !ip.is_loopback() {
            return Err(ConfigError::Invalid(format!(
                "gateway.bind_address '{ip}' must be a loopback address"
            )));
        }
        Ok(SocketAddr::new(ip, self.port))
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Parses and validates configuration from TOML text.
///
/// # Errors
///
/// [`ConfigError::Parse`] for malformed TOML, [`ConfigError::Invalid`] for
/// unusable values.
pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    let cfg: AppConfig = toml::from_str(content)?;
    cfg.validate()?;
    Ok(cfg)
}

/// Loads configuration from `path`, returning validated defaults if the file
/// does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// [`ConfigError::Parse`] if the TOML is malformed, and
/// [`ConfigError::Invalid`] if a value is unusable.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_config(&content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let cfg = AppConfig::default();
            cfg.validate()?;
            Ok(cfg)
        }
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
