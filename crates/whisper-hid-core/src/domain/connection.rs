//! Connection state and reconnect backoff.
//!
//! # State machine (for beginners)
//!
//! ```text
//!            register ok             peer connects
//!   Idle ───────────────► Registered ──────────────► Connected
//!    ▲                                                │    ▲
//!    │ restart                          peer drops    │    │ connect succeeds
//!    │                                                ▼    │
//!    └──────────── Failed ◄──── window elapsed ──── Reconnecting
//! ```
//!
//! - `Idle`: nothing is registered with the transport.  A failed registration
//!   also lands here; only an explicit restart tries again.
//! - `Registered`: the relay is advertised as a keyboard but no host is linked.
//! - `Connected`: a host is linked and keystrokes can flow.
//! - `Reconnecting`: the host dropped; attempts follow [`ReconnectPolicy`].
//! - `Failed`: the backoff window ran out.  Terminal until restart.
//!
//! Timestamps use [`std::time::Instant`] so the values are independent of any
//! particular async runtime.

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Opaque identifier of a paired peer, as understood by the transport
/// (for Bluetooth this is the device address).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerHandle(pub String);

impl PeerHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A host computer the relay can type into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostDevice {
    /// Transport-level handle used to address reports and connect requests.
    pub handle: PeerHandle,
    /// Human-readable name shown in `/status`.
    pub name: String,
}

impl HostDevice {
    pub fn new(handle: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            handle: PeerHandle::new(handle),
            name: name.into(),
        }
    }
}

/// Current state of the emulated-keyboard link.
///
/// Exactly one value exists per process; it is owned by the Connection
/// Manager and read by everyone else as a cloned snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Nothing registered with the transport.
    #[default]
    Idle,
    /// Registered as a keyboard, waiting for a host.
    Registered,
    /// Linked to `host`; keystrokes are accepted.
    Connected { host: HostDevice },
    /// The host dropped and reconnect attempts are running.
    Reconnecting {
        /// Number of attempts issued so far (0 right after the drop).
        attempt: u32,
        /// When the host dropped; the backoff window is measured from here.
        started_at: Instant,
        /// When the next attempt is due, if one is scheduled.
        next_retry_at: Option<Instant>,
    },
    /// Reconnection gave up.
    Failed { reason: String },
}

impl ConnectionState {
    /// Lower-case label reported as `/status.bluetooth`.
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Registered => "registered",
            ConnectionState::Connected { .. } => "connected",
            ConnectionState::Reconnecting { .. } => "reconnecting",
            ConnectionState::Failed { .. } => "failed",
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected { .. })
    }

    /// The linked host, only while `Connected`.
    pub fn host(&self) -> Option<&HostDevice> {
        match self {
            ConnectionState::Connected { host } => Some(host),
            _ => None,
        }
    }

    /// The attempt counter, only while `Reconnecting`.
    pub fn reconnect_attempt(&self) -> Option<u32> {
        match self {
            ConnectionState::Reconnecting { attempt, .. } => Some(*attempt),
            _ => None,
        }
    }

    /// Time left until the next scheduled attempt, rounded down to zero once
    /// it is overdue.  `None` outside `Reconnecting`.
    pub fn next_retry_in(&self, now: Instant) -> Option<Duration> {
        match self {
            ConnectionState::Reconnecting {
                next_retry_at: Some(at),
                ..
            } => Some(at.saturating_duration_since(now)),
            _ => None,
        }
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            ConnectionState::Failed { reason } => Some(reason),
            _ => None,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Idle => write!(f, "idle"),
            ConnectionState::Registered => write!(f, "registered, waiting for host"),
            ConnectionState::Connected { host } => {
                write!(f, "connected to {} ({})", host.name, host.handle)
            }
            ConnectionState::Reconnecting { attempt, .. } => {
                write!(f, "reconnecting (attempt {attempt})")
            }
            ConnectionState::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}

/// Reconnect backoff: per-attempt delays plus a total time window.
///
/// Attempt `n` (1-based) waits `schedule[n - 1]`; attempts beyond the end of
/// the schedule reuse its last entry.  Once more than `window` has elapsed
/// since the drop the manager gives up.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use whisper_hid_core::ReconnectPolicy;
///
/// let policy = ReconnectPolicy::default();
/// assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(2));
/// assert_eq!(policy.delay_for_attempt(9), Duration::from_secs(30));
/// assert_eq!(policy.max_attempts(), 13);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    schedule: Vec<Duration>,
    window: Duration,
}

impl Default for ReconnectPolicy {
    /// 2s, 4s, 8s, 16s, then 30s repeating, within a 5-minute window.
    fn default() -> Self {
        Self {
            schedule: [2, 4, 8, 16, 30].into_iter().map(Duration::from_secs).collect(),
            window: Duration::from_secs(300),
        }
    }
}

impl ReconnectPolicy {
    /// Builds a policy.  An empty schedule means "retry immediately".
    pub fn new(schedule: Vec<Duration>, window: Duration) -> Self {
        Self { schedule, window }
    }

    pub fn schedule(&self) -> &[Duration] {
        &self.schedule
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Delay before attempt `attempt` (1-based; 0 is treated as 1).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let idx = attempt.saturating_sub(1) as usize;
        self.schedule
            .get(idx)
            .or_else(|| self.schedule.last())
            .copied()
            .unwrap_or_default()
    }

    /// `true` once `elapsed` is strictly past the window.
    pub fn is_exhausted(&self, elapsed: Duration) -> bool {
        elapsed > self.window
    }

    /// Number of attempts whose cumulative delay fits inside the window.
    pub fn max_attempts(&self) -> u32 {
        let mut total = Duration::ZERO;
        let mut attempts = 0u32;
        loop {
            let delay = self.delay_for_attempt(attempts + 1);
            if delay.is_zero() {
                // A zero delay never advances the clock; report the schedule length.
                return self.schedule.len() as u32;
            }
            total += delay;
            if total > self.window {
                return attempts;
            }
            attempts += 1;
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
