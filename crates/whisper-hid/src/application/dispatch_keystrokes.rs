//! KeystrokeDispatcher: turns text into timed key-down / key-up report pairs.
//!
//! One Tokio worker task drains an unbounded queue of [`DispatchJob`]s, so
//! keystrokes from concurrent callers never interleave on the wire.  Callers
//! never wait for typing to finish: `enqueue_*` only checks that the link is
//! up and hands the job over.
//!
//! # Timing (for beginners)
//!
//! ```text
//! for each mapped character:
//!     send [mod, 0, key, 0, 0, 0, 0, 0]   key down
//!     wait delay
//!     send [0; 8]                          all keys released
//!     wait delay
//! ```
//!
//! Hosts can drop reports that arrive faster than they process them, and a
//! down report without a release leaves a key stuck, hence the symmetric wait.
//!
//! # No buffering
//!
//! When the link is not connected the request is refused with
//! [`DispatchError::TransportUnavailable`] instead of being queued for later.
//! Replaying dictated text minutes after it was spoken is worse than losing it;
//! callers retry if they want to.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use whisper_hid_core::{encode, KeyReport, KEY_UP_FRAME, REPORT_LEN};

use crate::application::hid_transport::TransportError;

/// Default wait after each report.
pub const DEFAULT_KEYSTROKE_DELAY: Duration = Duration::from_millis(10);

/// Error type for enqueue operations.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    /// No host is connected; nothing was queued.
    #[error("transport unavailable")]
    TransportUnavailable,
    /// [`KeystrokeDispatcher::shutdown`] has been called.
    #[error("dispatcher is shutting down")]
    ShuttingDown,
}

/// Where the dispatcher sends frames.  Implemented by the Connection Manager.
pub trait ReportLink: Send + Sync {
    /// `true` while a host is connected.
    fn is_ready(&self) -> bool;

    /// Sends one 8-byte input report to the connected host.
    fn send_frame(&self, frame: &[u8; REPORT_LEN]) -> Result<(), TransportError>;
}

/// Work accepted by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchJob {
    /// Type every mapped character of the string, in order.
    Text(String),
    /// Press Backspace this many times.
    Backspace(u32),
}

/// Serial keystroke emitter.
pub struct KeystrokeDispatcher {
    link: Arc<dyn ReportLink>,
    queue: Mutex<Option<mpsc::UnboundedSender<DispatchJob>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl KeystrokeDispatcher {
    /// Spawns the worker task.  Must be called inside a Tokio runtime.
    pub fn spawn(link: Arc<dyn ReportLink>, delay: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(Arc::clone(&link), rx, delay));
        Self {
            link,
            queue: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Queues `text` for typing.
    ///
    /// # Errors
    ///
    /// [`DispatchError::TransportUnavailable`] when no host is connected,
    /// [`DispatchError::ShuttingDown`] after shutdown.
    pub fn enqueue_text(&self, text: &str) -> Result<(), DispatchError> {
        self.enqueue(DispatchJob::Text(text.to_owned()))
    }

    /// Queues `count` Backspace presses.
    ///
    /// # Errors
    ///
    /// Same as [`enqueue_text`](Self::enqueue_text).
    pub fn enqueue_backspace(&self, count: u32) -> Result<(), DispatchError> {
        self.enqueue(DispatchJob::Backspace(count))
    }

    fn enqueue(&self, job: DispatchJob) -> Result<(), DispatchError> {
        let queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        let tx = queue.as_ref().ok_or(DispatchError::ShuttingDown)?;
        if !self.link.is_ready() {
            return Err(DispatchError::TransportUnavailable);
        }
        tx.send(job).map_err(|_| DispatchError::ShuttingDown)
    }

    /// Stops accepting work and waits for already accepted jobs to finish.
    pub async fn shutdown(&self) {
        // Dropping the sender lets the worker drain the queue and exit.
        drop(
            self.queue
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take(),
        );
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                warn!(error = %e, "keystroke worker ended abnormally");
            }
        }
        info!("keystroke dispatcher stopped");
    }
}

async fn run_worker(
    link: Arc<dyn ReportLink>,
    mut rx: mpsc::UnboundedReceiver<DispatchJob>,
    delay: Duration,
) {
    while let Some(job) = rx.recv().await {
        match job {
            DispatchJob::Text(text) => {
                let mut typed = 0usize;
                for c in text.chars() {
                    match encode(c) {
                        Some(report) => {
                            press(link.as_ref(), report, delay).await;
                            typed += 1;
                        }
                        None => debug!(char = ?c, "no key mapping; skipped"),
                    }
                }
                debug!(typed, "text dispatched");
            }
            DispatchJob::Backspace(count) => {
                for _ in 0..count {
                    press(link.as_ref(), KeyReport::backspace(), delay).await;
                }
                debug!(count, "backspace dispatched");
            }
        }
    }
}

/// Sends one down/up pair.  A failed write is logged and typing continues.
async fn press(link: &dyn ReportLink, report: KeyReport, delay: Duration) {
    if let Err(e) = link.send_frame(&report.to_frame()) {
        warn!(keycode = report.keycode(), error = %e, "key-down report failed");
    }
    tokio::time::sleep(delay).await;
    if let Err(e) = link.send_frame(&KEY_UP_FRAME) {
        warn!(keycode = report.keycode(), error = %e, "key-up report failed");
    }
    tokio::time::sleep(delay).await;
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::time::Instant;

    /// Records every frame with the (virtual) time it was sent.
    struct RecordingLink {
        ready: AtomicBool,
        fail_every_other: AtomicBool,
        calls: Mutex<u32>,
        frames: Mutex<Vec<([u8; REPORT_LEN], Instant)>>,
    }

    impl RecordingLink {
        fn new(ready: bool) -> Arc<Self> {
            Arc::new(Self {
                ready: AtomicBool::new(ready),
                fail_every_other: AtomicBool::new(false),
                calls: Mutex::new(0),
                frames: Mutex::new(Vec::new()),
            })
        }

        fn frames(&self) -> Vec<[u8; REPORT_LEN]> {
            self.frames.lock().unwrap().iter().map(|(f, _)| *f).collect()
        }
    }

    impl ReportLink for RecordingLink {
        fn is_ready(&self) -> bool {
            self.ready.load(Ordering::SeqCst)
        }

        fn send_frame(&self, frame: &[u8; REPORT_LEN]) -> Result<(), TransportError> {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            if self.fail_every_other.load(Ordering::SeqCst) && *calls % 2 == 1 {
                return Err(TransportError::NotConnected);
            }
            self.frames.lock().unwrap().push((*frame, Instant::now()));
            Ok(())
        }
    }

    fn down(modifier: u8, key: u8) -> [u8; REPORT_LEN] {
        [modifier, 0, key, 0, 0, 0, 0, 0]
    }

    #[tokio::test(start_paused = true)]
    async fn test_text_is_sent_as_ordered_down_up_pairs() {
        // Arrange
        let link = RecordingLink::new(true);
        let dispatcher = KeystrokeDispatcher::spawn(link.clone(), DEFAULT_KEYSTROKE_DELAY);

        // Act
        dispatcher.enqueue_text("Hi! ").unwrap();
        dispatcher.shutdown().await;

        // Assert
        assert_eq!(
            link.frames(),
            vec![
                down(0x02, 0x0B),
                KEY_UP_FRAME,
                down(0x00, 0x0C),
                KEY_UP_FRAME,
                down(0x02, 0x1E),
                KEY_UP_FRAME,
                down(0x00, 0x2C),
                KEY_UP_FRAME,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_reports_are_separated_by_the_delay() {
        let link = RecordingLink::new(true);
        let dispatcher = KeystrokeDispatcher::spawn(link.clone(), Duration::from_millis(25));

        dispatcher.enqueue_text("ab").unwrap();
        dispatcher.shutdown().await;

        let times: Vec<Instant> = link.frames.lock().unwrap().iter().map(|(_, t)| *t).collect();
        assert_eq!(times.len(), 4);
        for pair in times.windows(2) {
            assert_eq!(pair[1] - pair[0], Duration::from_millis(25));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_backspace_emits_exactly_n_pairs() {
        for n in [0u32, 1, 5] {
            let link = RecordingLink::new(true);
            let dispatcher = KeystrokeDispatcher::spawn(link.clone(), DEFAULT_KEYSTROKE_DELAY);

            dispatcher.enqueue_backspace(n).unwrap();
            dispatcher.shutdown().await;

            let frames = link.frames();
            assert_eq!(frames.len(), 2 * n as usize);
            for pair in frames.chunks(2) {
                assert_eq!(pair[0], down(0x00, 0x2A));
                assert_eq!(pair[1], KEY_UP_FRAME);
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmapped_characters_are_skipped() {
        let link = RecordingLink::new(true);
        let dispatcher = KeystrokeDispatcher::spawn(link.clone(), DEFAULT_KEYSTROKE_DELAY);

        dispatcher.enqueue_text("é😀a").unwrap();
        dispatcher.shutdown().await;

        assert_eq!(link.frames(), vec![down(0x00, 0x04), KEY_UP_FRAME]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnected_link_rejects_without_queueing() {
        let link = RecordingLink::new(false);
        let dispatcher = KeystrokeDispatcher::spawn(link.clone(), DEFAULT_KEYSTROKE_DELAY);

        let result = dispatcher.enqueue_text("hello");
        link.ready.store(true, Ordering::SeqCst);
        dispatcher.shutdown().await;

        assert_eq!(result, Err(DispatchError::TransportUnavailable));
        assert!(link.frames().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_failure_does_not_abort_the_string() {
        // Arrange: every key-down fails, every key-up succeeds.
        let link = RecordingLink::new(true);
        link.fail_every_other.store(true, Ordering::SeqCst);
        let dispatcher = KeystrokeDispatcher::spawn(link.clone(), DEFAULT_KEYSTROKE_DELAY);

        // Act
        dispatcher.enqueue_text("abc").unwrap();
        dispatcher.shutdown().await;

        // Assert: all three releases still went out.
        assert_eq!(link.frames(), vec![KEY_UP_FRAME; 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_jobs_do_not_interleave() {
        let link = RecordingLink::new(true);
        let dispatcher = KeystrokeDispatcher::spawn(link.clone(), DEFAULT_KEYSTROKE_DELAY);

        dispatcher.enqueue_text("aa").unwrap();
        dispatcher.enqueue_backspace(2).unwrap();
        dispatcher.shutdown().await;

        let downs: Vec<u8> = link
            .frames()
            .into_iter()
            .filter(|f| *f != KEY_UP_FRAME)
            .map(|f| f[2])
            .collect();
        assert_eq!(downs, vec![0x04, 0x04, 0x2A, 0x2A]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_enqueue_after_shutdown_is_refused() {
        let link = RecordingLink::new(true);
        let dispatcher = KeystrokeDispatcher::spawn(link, DEFAULT_KEYSTROKE_DELAY);

        dispatcher.shutdown().await;

        assert_eq!(
            dispatcher.enqueue_backspace(1),
            Err(DispatchError::ShuttingDown)
        );
    }
}
