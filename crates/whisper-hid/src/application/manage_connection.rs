//! ConnectionManager: registration, host link, and reconnect backoff.
//!
//! The manager is the single owner of the process-wide [`ConnectionState`] and
//! of the transport handle.  Everything else observes the state through a
//! cloned snapshot ([`ConnectionManager::snapshot`]) or a
//! [`tokio::sync::watch`] subscription.
//!
//! # Event flow (for beginners)
//!
//! ```text
//! HidTransport ──TransportEvent──► event pump task ──► apply_event()
//!                                                          │
//!                       reconnect timer task ──► on_retry_due()
//!                                                          │
//!                         gateway /restart ──► restart()   ▼
//!                                                   watch::Sender<ConnectionState>
//! ```
//!
//! Three actors can change the state: the event pump, the reconnect timer, and
//! callers of `start`/`restart`/`shutdown`.  Each transition is made while
//! holding the `timeline` mutex, so a check-then-set sequence can never
//! interleave with another one.  No `.await` happens while the mutex is held.
//!
//! # Reconnect timeline
//!
//! At most one retry timer exists.  Scheduling a new one cancels the previous
//! one, and every timer carries a generation number so a timer that already
//! fired but lost the race for the mutex recognises itself as stale.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use whisper_hid_core::{
    ConnectionState, HostDevice, PeerHandle, ReconnectPolicy, KEY_UP_FRAME, REPORT_ID, REPORT_LEN,
};

use crate::application::dispatch_keystrokes::ReportLink;
use crate::application::hid_transport::{
    HidRegistration, HidTransport, TransportError, TransportEvent,
};

/// How far past the window the give-up timer fires.  The window is exclusive,
/// so an attempt landing exactly on it is still issued.
const WINDOW_GRACE: Duration = Duration::from_millis(1);

/// Error type for registration-level operations.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The transport refused the keyboard registration.  The manager stays
    /// `Idle` until the next explicit restart.
    #[error("keyboard registration failed: {0}")]
    RegistrationFailed(#[source] TransportError),
}

/// Mutable bookkeeping guarded by one mutex.
#[derive(Default)]
struct Timeline {
    /// Most recently connected host; tried first when reconnecting.
    preferred: Option<HostDevice>,
    retry_timer: Option<JoinHandle<()>>,
    retry_generation: u64,
    event_pump: Option<JoinHandle<()>>,
    /// Bumped on every teardown so events from an old registration are dropped.
    registration_epoch: u64,
}

/// Owns the emulated-keyboard link to the host.
pub struct ConnectionManager {
    transport: Arc<dyn HidTransport>,
    registration: HidRegistration,
    policy: ReconnectPolicy,
    state: watch::Sender<ConnectionState>,
    timeline: Mutex<Timeline>,
    this: Weak<ConnectionManager>,
}

impl ConnectionManager {
    /// Creates a manager in `Idle`.  Nothing talks to the transport until
    /// [`start`](Self::start).
    pub fn new(
        transport: Arc<dyn HidTransport>,
        registration: HidRegistration,
        policy: ReconnectPolicy,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            transport,
            registration,
            policy,
            state: watch::channel(ConnectionState::Idle).0,
            timeline: Mutex::new(Timeline::default()),
            this: this.clone(),
        })
    }

    /// Returns a copy of the current state.
    pub fn snapshot(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    /// Subscribes to state changes; the receiver sees every transition.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    /// The host that will be tried first on the next reconnect.
    pub fn preferred_host(&self) -> Option<HostDevice> {
        self.lock().preferred.clone()
    }

    /// Registers the keyboard service: `Idle -> Registered`.
    ///
    /// Does nothing when the manager is not `Idle`.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::RegistrationFailed`] if the transport
    /// refuses.  The state stays `Idle` and no retry is scheduled.
    pub fn start(&self) -> Result<(), ConnectionError> {
        let mut timeline = self.lock();
        self.register_locked(&mut timeline)
    }

    /// Tears the registration down and registers again from scratch.
    ///
    /// Cancels any pending reconnect, unregisters, passes through `Idle`, then
    /// registers.  Calling it twice in a row ends in the same state.
    ///
    /// # Errors
    ///
    /// Same as [`start`](Self::start).
    pub fn restart(&self) -> Result<(), ConnectionError> {
        let mut timeline = self.lock();
        info!(from = self.snapshot().label(), "restarting keyboard service");
        self.teardown(&mut timeline);
        self.register_locked(&mut timeline)
    }

    /// Releases the registration and stops the background tasks.
    pub fn shutdown(&self) {
        let mut timeline = self.lock();
        self.teardown(&mut timeline);
        info!("keyboard service stopped");
    }

    /// Applies a transport event immediately, bypassing the event pump.
    pub fn handle_event(&self, event: TransportEvent) {
        let mut timeline = self.lock();
        self.apply_event(&mut timeline, event);
    }

    // ── Registration ──────────────────────────────────────────────────────────

    fn register_locked(&self, timeline: &mut Timeline) -> Result<(), ConnectionError> {
        let current = self.snapshot();
        if current != ConnectionState::Idle {
            debug!(state = current.label(), "register skipped");
            return Ok(());
        }

        let (tx, rx) = mpsc::unbounded_channel();
        if let Err(e) = self.transport.register(&self.registration, tx) {
            error!(error = %e, "keyboard registration failed; staying idle until restart");
            return Err(ConnectionError::RegistrationFailed(e));
        }

        let pump = self.spawn_event_pump(rx, timeline.registration_epoch);
        if let Some(old) = timeline.event_pump.replace(pump) {
            old.abort();
        }
        self.state.send_replace(ConnectionState::Registered);
        info!(name = %self.registration.name, "keyboard service registered");
        Ok(())
    }

    fn teardown(&self, timeline: &mut Timeline) {
        Self::cancel_retry(timeline);
        timeline.registration_epoch += 1;
        if let Some(pump) = timeline.event_pump.take() {
            pump.abort();
        }
        if let Err(e) = self.transport.unregister() {
            warn!(error = %e, "unregister failed");
        }
        self.state.send_replace(ConnectionState::Idle);
    }

    fn spawn_event_pump(
        &self,
        mut rx: mpsc::UnboundedReceiver<TransportEvent>,
        epoch: u64,
    ) -> JoinHandle<()> {
        let this = self.this.clone();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let Some(manager) = this.upgrade() else {
                    break;
                };
                let mut timeline = manager.lock();
                if timeline.registration_epoch != epoch {
                    debug!(?event, "dropping event from a previous registration");
                    continue;
                }
                manager.apply_event(&mut timeline, event);
            }
            debug!("transport event stream closed");
        })
    }

    // ── Event handling ────────────────────────────────────────────────────────

    fn apply_event(&self, timeline: &mut Timeline, event: TransportEvent) {
        match event {
            TransportEvent::Registered { plugged } => self.on_registered(timeline, plugged),
            TransportEvent::Unregistered => {
                Self::cancel_retry(timeline);
                self.state.send_replace(ConnectionState::Idle);
                warn!("transport dropped the keyboard registration");
            }
            TransportEvent::ConnectionStateChanged {
                peer,
                connected: true,
            } => self.on_peer_connected(timeline, peer),
            TransportEvent::ConnectionStateChanged {
                peer,
                connected: false,
            } => self.on_peer_disconnected(timeline, peer),
            TransportEvent::GetReport { peer, report_id } => {
                // Host polls for the current keys; nothing is held between keystrokes.
                if let Err(e) = self.transport.reply_report(&peer, report_id, &KEY_UP_FRAME) {
                    warn!(%peer, error = %e, "failed to answer report request");
                }
            }
            TransportEvent::SetReport { peer, data } => {
                debug!(%peer, len = data.len(), "host wrote output report");
                if let Err(e) = self.transport.acknowledge_set_report(&peer) {
                    warn!(%peer, error = %e, "failed to acknowledge output report");
                }
            }
        }
    }

    fn on_registered(&self, timeline: &mut Timeline, plugged: Option<HostDevice>) {
        match self.snapshot() {
            ConnectionState::Idle => {
                self.state.send_replace(ConnectionState::Registered);
            }
            ConnectionState::Registered => {}
            other => {
                debug!(state = other.label(), "ignoring registration callback");
                return;
            }
        }

        if let Some(host) = plugged {
            info!(host = %host.name, peer = %host.handle, "host already linked; connecting");
            if !self.transport.connect(&host.handle) {
                warn!(peer = %host.handle, "connect request to linked host was declined");
            }
            timeline.preferred = Some(host);
        }
    }

    fn on_peer_connected(&self, timeline: &mut Timeline, peer: HostDevice) {
        match self.snapshot() {
            ConnectionState::Registered | ConnectionState::Reconnecting { .. } => {}
            ConnectionState::Connected { host } if host.handle == peer.handle => return,
            ConnectionState::Connected { host } => {
                info!(from = %host.handle, to = %peer.handle, "host switched");
            }
            other => {
                warn!(peer = %peer.handle, state = other.label(), "ignoring host connection");
                return;
            }
        }

        Self::cancel_retry(timeline);
        info!(host = %peer.name, peer = %peer.handle, "host connected");
        timeline.preferred = Some(peer.clone());
        self.state
            .send_replace(ConnectionState::Connected { host: peer });
    }

    fn on_peer_disconnected(&self, timeline: &mut Timeline, peer: HostDevice) {
        match self.snapshot() {
            ConnectionState::Connected { host } if host.handle == peer.handle => {
                warn!(host = %host.name, peer = %host.handle, "host disconnected; reconnecting");
                self.begin_reconnect(timeline);
            }
            other => {
                debug!(peer = %peer.handle, state = other.label(), "ignoring host disconnect");
            }
        }
    }

    // ── Reconnect ─────────────────────────────────────────────────────────────

    fn begin_reconnect(&self, timeline: &mut Timeline) {
        let now = Instant::now();
        let started_at = now.into_std();
        let (wake_at, next_attempt) = self.next_deadline(now, started_at, 1);
        self.state.send_replace(ConnectionState::Reconnecting {
            attempt: 0,
            started_at,
            next_retry_at: next_attempt.map(Instant::into_std),
        });
        self.schedule_retry(timeline, wake_at);
    }

    /// When the retry timer should next fire for `attempt`.
    ///
    /// Returns the attempt time and `Some` of it while the attempt still fits
    /// inside the window.  Otherwise the timer fires just past the window so
    /// the manager fails on time, and no further attempt is advertised.
    fn next_deadline(
        &self,
        now: Instant,
        started_at: std::time::Instant,
        attempt: u32,
    ) -> (Instant, Option<Instant>) {
        let attempt_at = now + self.policy.delay_for_attempt(attempt);
        let give_up_at = Instant::from_std(started_at) + self.policy.window() + WINDOW_GRACE;
        if attempt_at <= give_up_at {
            (attempt_at, Some(attempt_at))
        } else {
            (give_up_at.max(now), None)
        }
    }

    fn schedule_retry(&self, timeline: &mut Timeline, at: Instant) {
        Self::cancel_retry(timeline);
        let generation = timeline.retry_generation;
        let this = self.this.clone();
        timeline.retry_timer = Some(tokio::spawn(async move {
            tokio::time::sleep_until(at).await;
            if let Some(manager) = this.upgrade() {
                manager.on_retry_due(generation);
            }
        }));
    }

    fn cancel_retry(timeline: &mut Timeline) {
        timeline.retry_generation += 1;
        if let Some(timer) = timeline.retry_timer.take() {
            timer.abort();
        }
    }

    fn on_retry_due(&self, generation: u64) {
        let mut timeline = self.lock();
        if timeline.retry_generation != generation {
            return;
        }
        // This timer is finishing; dropping the handle keeps it from being aborted.
        timeline.retry_timer = None;

        let (attempt, started_at) = match self.snapshot() {
            ConnectionState::Reconnecting {
                attempt,
                started_at,
                ..
            } => (attempt, started_at),
            _ => return,
        };

        let now = Instant::now();
        let elapsed = now.into_std().saturating_duration_since(started_at);
        if self.policy.is_exhausted(elapsed) {
            let reason = format!(
                "host did not reconnect within {}s ({attempt} attempts)",
                self.policy.window().as_secs()
            );
            error!(%reason, "giving up on reconnect");
            self.state.send_replace(ConnectionState::Failed { reason });
            return;
        }

        let attempt = attempt + 1;
        self.attempt_reconnect(&timeline, attempt);

        let (wake_at, next_attempt) = self.next_deadline(now, started_at, attempt + 1);
        self.state.send_replace(ConnectionState::Reconnecting {
            attempt,
            started_at,
            next_retry_at: next_attempt.map(Instant::into_std),
        });
        self.schedule_retry(&mut timeline, wake_at);
    }

    /// Issues one connect request: preferred host first, then the other
    /// paired hosts, stopping at the first that accepts.
    fn attempt_reconnect(&self, timeline: &Timeline, attempt: u32) {
        let mut peers = self.transport.paired_peers();
        if let Some(preferred) = &timeline.preferred {
            if let Some(pos) = peers.iter().position(|p| p.handle == preferred.handle) {
                let host = peers.remove(pos);
                peers.insert(0, host);
            }
        }

        for peer in &peers {
            if self.transport.connect(&peer.handle) {
                info!(attempt, peer = %peer.handle, "reconnect attempt started");
                return;
            }
            debug!(attempt, peer = %peer.handle, "peer declined reconnect attempt");
        }
        warn!(attempt, paired = peers.len(), "no paired host accepted a reconnect attempt");
    }

    fn lock(&self) -> MutexGuard<'_, Timeline> {
        self.timeline.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ReportLink for ConnectionManager {
    fn is_ready(&self) -> bool {
        self.state.borrow().is_connected()
    }

    fn send_frame(&self, frame: &[u8; REPORT_LEN]) -> Result<(), TransportError> {
        let peer: PeerHandle = self
            .state
            .borrow()
            .host()
            .map(|h| h.handle.clone())
            .ok_or(TransportError::NotConnected)?;
        self.transport.send_report(&peer, REPORT_ID, frame)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::hid_transport::MockHidTransport;
    use whisper_hid_core::KEYBOARD_DESCRIPTOR;

    fn registration() -> HidRegistration {
        HidRegistration {
            name: "Whisper Keyboard".into(),
            description: "test".into(),
            provider: "test".into(),
            descriptor: KEYBOARD_DESCRIPTOR.to_vec(),
        }
    }

    fn desk() -> HostDevice {
        HostDevice::new("AA:AA:AA:AA:AA:AA", "Desk")
    }

    fn laptop() -> HostDevice {
        HostDevice::new("BB:BB:BB:BB:BB:BB", "Laptop")
    }

    fn registering_mock() -> MockHidTransport {
        let mut mock = MockHidTransport::new();
        mock.expect_register().returning(|_, _| Ok(()));
        mock.expect_unregister().returning(|| Ok(()));
        mock
    }

    fn connected_manager(mock: MockHidTransport) -> Arc<ConnectionManager> {
        let manager =
            ConnectionManager::new(Arc::new(mock), registration(), ReconnectPolicy::default());
        manager.start().unwrap();
        manager.handle_event(TransportEvent::ConnectionStateChanged {
            peer: desk(),
            connected: true,
        });
        manager
    }

    #[tokio::test]
    async fn test_start_moves_idle_to_registered() {
        // Arrange
        let mut mock = MockHidTransport::new();
        mock.expect_register()
            .withf(|reg: &HidRegistration, _| reg.descriptor == KEYBOARD_DESCRIPTOR)
            .times(1)
            .returning(|_, _| Ok(()));
        let manager =
            ConnectionManager::new(Arc::new(mock), registration(), ReconnectPolicy::default());

        // Act
        manager.start().unwrap();

        // Assert
        assert_eq!(manager.snapshot(), ConnectionState::Registered);
    }

    #[tokio::test]
    async fn test_refused_registration_stays_idle() {
        let mut mock = MockHidTransport::new();
        mock.expect_register()
            .times(1)
            .returning(|_, _| Err(TransportError::RegistrationRefused("busy".into())));
        let manager =
            ConnectionManager::new(Arc::new(mock), registration(), ReconnectPolicy::default());

        let result = manager.start();

        assert!(matches!(result, Err(ConnectionError::RegistrationFailed(_))));
        assert_eq!(manager.snapshot(), ConnectionState::Idle);
    }

    #[tokio::test]
    async fn test_start_twice_registers_once() {
        let mut mock = MockHidTransport::new();
        mock.expect_register().times(1).returning(|_, _| Ok(()));
        let manager =
            ConnectionManager::new(Arc::new(mock), registration(), ReconnectPolicy::default());

        manager.start().unwrap();
        manager.start().unwrap();

        assert_eq!(manager.snapshot(), ConnectionState::Registered);
    }

    #[tokio::test]
    async fn test_peer_connect_moves_to_connected_and_records_preferred() {
        let manager = connected_manager(registering_mock());

        assert_eq!(
            manager.snapshot(),
            ConnectionState::Connected { host: desk() }
        );
        assert_eq!(manager.preferred_host(), Some(desk()));
        assert!(manager.is_ready());
    }

    #[tokio::test]
    async fn test_plugged_peer_on_registration_is_connected_once() {
        // Arrange
        let mut mock = registering_mock();
        mock.expect_connect()
            .withf(|peer: &PeerHandle| peer.as_str() == "AA:AA:AA:AA:AA:AA")
            .times(1)
            .returning(|_| true);
        let manager =
            ConnectionManager::new(Arc::new(mock), registration(), ReconnectPolicy::default());
        manager.start().unwrap();

        // Act
        manager.handle_event(TransportEvent::Registered {
            plugged: Some(desk()),
        });

        // Assert: the connect request only starts the link.
        assert_eq!(manager.snapshot(), ConnectionState::Registered);
        assert_eq!(manager.preferred_host(), Some(desk()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_enters_reconnecting_with_zero_attempts() {
        let manager = connected_manager(registering_mock());

        manager.handle_event(TransportEvent::ConnectionStateChanged {
            peer: desk(),
            connected: false,
        });

        let state = manager.snapshot();
        assert_eq!(state.reconnect_attempt(), Some(0));
        assert_eq!(
            state.next_retry_in(Instant::now().into_std()),
            Some(Duration::from_secs(2))
        );
        assert!(!manager.is_ready());
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_attempt_prefers_last_connected_host() {
        // Arrange: the laptop is listed first, but the desk was connected last.
        let mut mock = registering_mock();
        mock.expect_paired_peers()
            .returning(|| vec![laptop(), desk()]);
        mock.expect_connect()
            .withf(|peer: &PeerHandle| peer.as_str() == "AA:AA:AA:AA:AA:AA")
            .times(1)
            .returning(|_| true);
        let manager = connected_manager(mock);

        // Act
        manager.handle_event(TransportEvent::ConnectionStateChanged {
            peer: desk(),
            connected: false,
        });
        tokio::time::sleep(Duration::from_millis(2_001)).await;

        // Assert
        assert_eq!(manager.snapshot().reconnect_attempt(), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_declined_preferred_host_falls_back_to_other_peers() {
        let mut mock = registering_mock();
        mock.expect_paired_peers()
            .returning(|| vec![laptop(), desk()]);
        mock.expect_connect()
            .withf(|peer: &PeerHandle| peer.as_str() == "AA:AA:AA:AA:AA:AA")
            .times(1)
            .returning(|_| false);
        mock.expect_connect()
            .withf(|peer: &PeerHandle| peer.as_str() == "BB:BB:BB:BB:BB:BB")
            .times(1)
            .returning(|_| true);
        let manager = connected_manager(mock);

        manager.handle_event(TransportEvent::ConnectionStateChanged {
            peer: desk(),
            connected: false,
        });
        tokio::time::sleep(Duration::from_millis(2_001)).await;

        assert_eq!(manager.snapshot().reconnect_attempt(), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_success_cancels_timer() {
        let mut mock = registering_mock();
        mock.expect_paired_peers().returning(|| vec![desk()]);
        mock.expect_connect().returning(|_| true);
        let manager = connected_manager(mock);
        manager.handle_event(TransportEvent::ConnectionStateChanged {
            peer: desk(),
            connected: false,
        });
        tokio::time::sleep(Duration::from_millis(2_001)).await;

        manager.handle_event(TransportEvent::ConnectionStateChanged {
            peer: desk(),
            connected: true,
        });
        tokio::time::sleep(Duration::from_secs(600)).await;

        assert_eq!(
            manager.snapshot(),
            ConnectionState::Connected { host: desk() }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_exhaustion_fails_with_reason() {
        let mut mock = registering_mock();
        mock.expect_paired_peers().returning(Vec::new);
        let manager = connected_manager(mock);

        manager.handle_event(TransportEvent::ConnectionStateChanged {
            peer: desk(),
            connected: false,
        });
        tokio::time::sleep(Duration::from_millis(300_500)).await;

        let state = manager.snapshot();
        assert_eq!(state.label(), "failed");
        assert!(!state.failure_reason().unwrap_or_default().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_window_fails_when_it_elapses_not_at_next_tick() {
        // Arrange: the second attempt would land at 2 + 60 = 62s, past the window
        let mut mock = registering_mock();
        mock.expect_paired_peers().returning(Vec::new);
        let policy = ReconnectPolicy::new(
            vec![Duration::from_secs(2), Duration::from_secs(60)],
            Duration::from_secs(10),
        );
        let manager = ConnectionManager::new(Arc::new(mock), registration(), policy);
        manager.start().unwrap();
        manager.handle_event(TransportEvent::ConnectionStateChanged {
            peer: desk(),
            connected: true,
        });

        // Act
        manager.handle_event(TransportEvent::ConnectionStateChanged {
            peer: desk(),
            connected: false,
        });
        tokio::time::sleep(Duration::from_millis(2_001)).await;
        let after_first = manager.snapshot();
        tokio::time::sleep(Duration::from_secs(9)).await;

        // Assert
        assert_eq!(after_first.reconnect_attempt(), Some(1));
        assert_eq!(after_first.next_retry_in(Instant::now().into_std()), None);
        let state = manager.snapshot();
        assert_eq!(state.label(), "failed");
        assert!(state.failure_reason().unwrap_or_default().contains("1 attempts"));
    }

    #[tokio::test]
    async fn test_get_report_is_answered_with_key_up_frame() {
        let mut mock = registering_mock();
        mock.expect_reply_report()
            .withf(|_peer: &PeerHandle, id: &u8, data: &[u8]| *id == 0 && data == KEY_UP_FRAME)
            .times(1)
            .returning(|_, _, _| Ok(()));
        let manager = connected_manager(mock);

        manager.handle_event(TransportEvent::GetReport {
            peer: desk().handle,
            report_id: 0,
        });
    }

    #[tokio::test]
    async fn test_set_report_is_acknowledged() {
        let mut mock = registering_mock();
        mock.expect_acknowledge_set_report()
            .times(1)
            .returning(|_| Ok(()));
        let manager = connected_manager(mock);

        manager.handle_event(TransportEvent::SetReport {
            peer: desk().handle,
            data: vec![0x02],
        });

        assert!(manager.snapshot().is_connected());
    }

    #[tokio::test]
    async fn test_unregistered_event_returns_to_idle() {
        let manager = connected_manager(registering_mock());

        manager.handle_event(TransportEvent::Unregistered);

        assert_eq!(manager.snapshot(), ConnectionState::Idle);
    }

    #[tokio::test]
    async fn test_send_frame_targets_connected_host() {
        let mut mock = registering_mock();
        mock.expect_send_report()
            .withf(|peer: &PeerHandle, id: &u8, data: &[u8]| {
                peer.as_str() == "AA:AA:AA:AA:AA:AA" && *id == REPORT_ID && data.len() == 8
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
        let manager = connected_manager(mock);

        manager.send_frame(&KEY_UP_FRAME).unwrap();
    }

    #[tokio::test]
    async fn test_send_frame_without_host_is_not_connected() {
        let manager = ConnectionManager::new(
            Arc::new(registering_mock()),
            registration(),
            ReconnectPolicy::default(),
        );

        assert_eq!(
            manager.send_frame(&KEY_UP_FRAME),
            Err(TransportError::NotConnected)
        );
    }

    #[tokio::test]
    async fn test_subscribers_see_transitions() {
        let manager = ConnectionManager::new(
            Arc::new(registering_mock()),
            registration(),
            ReconnectPolicy::default(),
        );
        let mut rx = manager.subscribe();

        manager.start().unwrap();

        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), ConnectionState::Registered);
    }
}
