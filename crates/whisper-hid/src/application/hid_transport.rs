//! The Bluetooth HID transport capability, as seen by the relay.
//!
//! The relay does not implement a Bluetooth stack.  It consumes one through the
//! [`HidTransport`] trait: a handful of synchronous calls plus callbacks that
//! arrive as [`TransportEvent`]s on a channel handed over at registration.
//!
//! # Why callbacks become channel events (for beginners)
//!
//! Bluetooth stacks report progress asynchronously ("the host connected",
//! "the host wants the current report").  Delivering those as messages on a
//! Tokio channel lets the Connection Manager process them one at a time on its
//! own task, instead of being re-entered from whatever thread the stack uses.
//!
//! Implementations live in the infrastructure layer; tests use the in-memory
//! `MockTransport` or a `mockall` mock of this trait.

use thiserror::Error;
use tokio::sync::mpsc;

use whisper_hid_core::{HostDevice, PeerHandle};

/// Error type for transport calls.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The stack refused to register the keyboard service.
    #[error("registration refused: {0}")]
    RegistrationRefused(String),
    /// A call that needs a registration was made without one.
    #[error("keyboard service is not registered")]
    NotRegistered,
    /// No host is linked, so there is nowhere to send a report.
    #[error("no host connected")]
    NotConnected,
    /// A single report write failed.
    #[error("report to {peer} failed: {reason}")]
    SendFailed { peer: PeerHandle, reason: String },
}

/// What the relay advertises when registering as a keyboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HidRegistration {
    /// Service name shown in the host's Bluetooth menu.
    pub name: String,
    pub description: String,
    pub provider: String,
    /// HID report descriptor (see `whisper_hid_core::KEYBOARD_DESCRIPTOR`).
    pub descriptor: Vec<u8>,
}

/// Asynchronous notifications from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Registration completed.  `plugged` is a host the stack already has
    /// a link to, if any.
    Registered { plugged: Option<HostDevice> },
    /// The stack dropped the registration on its own.
    Unregistered,
    /// A host linked (`connected = true`) or dropped.
    ConnectionStateChanged { peer: HostDevice, connected: bool },
    /// The host polled for the current input report.
    GetReport { peer: PeerHandle, report_id: u8 },
    /// The host wrote an output report (keyboard LEDs).
    SetReport { peer: PeerHandle, data: Vec<u8> },
}

/// Sender half handed to the transport at registration.
pub type EventSender = mpsc::UnboundedSender<TransportEvent>;

/// The injected Bluetooth HID capability.
///
/// All methods are synchronous and must not block for long; the stack is
/// expected to do its real work in the background and report through events.
#[cfg_attr(test, mockall::automock)]
pub trait HidTransport: Send + Sync {
    /// Registers the keyboard service.  Subsequent callbacks go to `events`.
    fn register(
        &self,
        registration: &HidRegistration,
        events: EventSender,
    ) -> Result<(), TransportError>;

    /// Releases the registration.  Calling it while unregistered is harmless.
    fn unregister(&self) -> Result<(), TransportError>;

    /// Hosts that have been paired before and may be connected without pairing.
    fn paired_peers(&self) -> Vec<HostDevice>;

    /// Starts connecting to `peer`.  `true` only means the attempt began; the
    /// outcome arrives later as [`TransportEvent::ConnectionStateChanged`].
    fn connect(&self, peer: &PeerHandle) -> bool;

    /// Sends one input report to `peer`.
    fn send_report(&self, peer: &PeerHandle, report_id: u8, data: &[u8])
        -> Result<(), TransportError>;

    /// Answers a [`TransportEvent::GetReport`] request.
    fn reply_report(
        &self,
        peer: &PeerHandle,
        report_id: u8,
        data: &[u8],
    ) -> Result<(), TransportError>;

    /// Acknowledges a [`TransportEvent::SetReport`] write.
    fn acknowledge_set_report(&self, peer: &PeerHandle) -> Result<(), TransportError>;
}
