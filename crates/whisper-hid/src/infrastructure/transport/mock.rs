//! In-memory HID transport.
//!
//! # Why a mock transport?
//!
//! The real transport is a platform Bluetooth stack: it needs radio hardware,
//! a paired host, and cannot be observed from test code.  `MockTransport`
//! replaces all of that with in-memory recording.  Every call is pushed into a
//! `Mutex<Vec<...>>` so tests can assert exactly what was sent and in what
//! order, and the `host_*` helpers play the part of the remote host by
//! emitting [`TransportEvent`]s.
//!
//! The binary also runs on this transport when no platform stack is wired in
//! (`--simulate-host`): [`MockTransport::simulated`] pairs one fake host that
//! links as soon as the relay asks it to.
//!
//! # Failure switches
//!
//! `fail_registration`, `fail_sends` and `decline_connects` are atomics so a
//! test can flip them on a transport already shared through an `Arc`.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use whisper_hid_core::{HostDevice, PeerHandle};

use crate::application::hid_transport::{
    EventSender, HidRegistration, HidTransport, TransportError, TransportEvent,
};

/// One recorded `send_report` or `reply_report` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentReport {
    pub peer: PeerHandle,
    pub report_id: u8,
    pub data: Vec<u8>,
}

/// A transport that records calls instead of touching a radio.
#[derive(Default)]
pub struct MockTransport {
    events: Mutex<Option<EventSender>>,
    paired: Mutex<Vec<HostDevice>>,
    plugged: Mutex<Option<HostDevice>>,
    registrations: Mutex<Vec<HidRegistration>>,
    unregister_calls: AtomicUsize,
    connect_requests: Mutex<Vec<PeerHandle>>,
    sent: Mutex<Vec<SentReport>>,
    replies: Mutex<Vec<SentReport>>,
    set_report_acks: Mutex<Vec<PeerHandle>>,
    /// When `true`, `register` is refused.
    pub fail_registration: AtomicBool,
    /// When `true`, every `send_report` fails.
    pub fail_sends: AtomicBool,
    /// When `true`, `connect` returns `false`.
    pub decline_connects: AtomicBool,
    /// When `true`, an accepted `connect` to a paired host immediately reports
    /// that host as connected.
    pub link_on_connect: AtomicBool,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockTransport {
    /// Creates a transport with no paired hosts and all switches off.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the paired host list.
    pub fn with_paired(self, hosts: Vec<HostDevice>) -> Self {
        *lock(&self.paired) = hosts;
        self
    }

    /// A transport with one paired host that is already linked at
    /// registration and accepts every connect request.
    pub fn simulated(host: HostDevice) -> Self {
        let transport = Self::new().with_paired(vec![host.clone()]);
        *lock(&transport.plugged) = Some(host);
        transport.link_on_connect.store(true, Ordering::SeqCst);
        transport
    }

    // ── Host-side simulation ─────────────────────────────────────────────────

    /// Delivers `event` to the registered listener.  Returns `false` when no
    /// listener is registered.
    pub fn emit(&self, event: TransportEvent) -> bool {
        match lock(&self.events).as_ref() {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }

    pub fn host_connected(&self, host: &HostDevice) -> bool {
        self.emit(TransportEvent::ConnectionStateChanged {
            peer: host.clone(),
            connected: true,
        })
    }

    pub fn host_disconnected(&self, host: &HostDevice) -> bool {
        self.emit(TransportEvent::ConnectionStateChanged {
            peer: host.clone(),
            connected: false,
        })
    }

    pub fn host_requests_report(&self, peer: &PeerHandle) -> bool {
        self.emit(TransportEvent::GetReport {
            peer: peer.clone(),
            report_id: 0,
        })
    }

    pub fn host_sets_report(&self, peer: &PeerHandle, data: Vec<u8>) -> bool {
        self.emit(TransportEvent::SetReport {
            peer: peer.clone(),
            data,
        })
    }

    // ── Recorded calls ───────────────────────────────────────────────────────

    pub fn registrations(&self) -> Vec<HidRegistration> {
        lock(&self.registrations).clone()
    }

    pub fn unregister_calls(&self) -> usize {
        self.unregister_calls.load(Ordering::SeqCst)
    }

    pub fn is_registered(&self) -> bool {
        lock(&self.events).is_some()
    }

    pub fn connect_requests(&self) -> Vec<PeerHandle> {
        lock(&self.connect_requests).clone()
    }

    pub fn sent_reports(&self) -> Vec<SentReport> {
        lock(&self.sent).clone()
    }

    /// Just the report payloads, in send order.
    pub fn sent_frames(&self) -> Vec<Vec<u8>> {
        lock(&self.sent).iter().map(|r| r.data.clone()).collect()
    }

    pub fn replies(&self) -> Vec<SentReport> {
        lock(&self.replies).clone()
    }

    pub fn set_report_acks(&self) -> Vec<PeerHandle> {
        lock(&self.set_report_acks).clone()
    }
}

impl HidTransport for MockTransport {
    fn register(
        &self,
        registration: &HidRegistration,
        events: EventSender,
    ) -> Result<(), TransportError> {
        if self.fail_registration.load(Ordering::SeqCst) {
            return Err(TransportError::RegistrationRefused(
                "simulated refusal".into(),
            ));
        }
        lock(&self.registrations).push(registration.clone());
        let plugged = lock(&self.plugged).clone();
        let _ = events.send(TransportEvent::Registered { plugged });
        *lock(&self.events) = Some(events);
        debug!(name = %registration.name, "mock transport registered");
        Ok(())
    }

    fn unregister(&self) -> Result<(), TransportError> {
        self.unregister_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.events).take();
        Ok(())
    }

    fn paired_peers(&self) -> Vec<HostDevice> {
        lock(&self.paired).clone()
    }

    fn connect(&self, peer: &PeerHandle) -> bool {
        lock(&self.connect_requests).push(peer.clone());
        if self.decline_connects.load(Ordering::SeqCst) {
            return false;
        }
        if self.link_on_connect.load(Ordering::SeqCst) {
            let host = lock(&self.paired).iter().find(|h| &h.handle == peer).cloned();
            if let Some(host) = host {
                self.host_connected(&host);
            }
        }
        true
    }

    fn send_report(
        &self,
        peer: &PeerHandle,
        report_id: u8,
        data: &[u8],
    ) -> Result<(), TransportError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(TransportError::SendFailed {
                peer: peer.clone(),
                reason: "simulated failure".into(),
            });
        }
        if !self.is_registered() {
            return Err(TransportError::NotRegistered);
        }
        lock(&self.sent).push(SentReport {
            peer: peer.clone(),
            report_id,
            data: data.to_vec(),
        });
        Ok(())
    }

    fn reply_report(
        &self,
        peer: &PeerHandle,
        report_id: u8,
        data: &[u8],
    ) -> Result<(), TransportError> {
        lock(&self.replies).push(SentReport {
            peer: peer.clone(),
            report_id,
            data: data.to_vec(),
        });
        Ok(())
    }

    fn acknowledge_set_report(&self, peer: &PeerHandle) -> Result<(), TransportError> {
        lock(&self.set_report_acks).push(peer.clone());
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
