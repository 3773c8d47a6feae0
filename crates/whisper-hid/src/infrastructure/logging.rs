//! Logging setup: console output plus the in-memory ring served by `/logs`.
//!
//! Every module logs through `tracing` macros.  [`init`] installs two layers:
//!
//! - the `fmt` layer, writing human-readable lines to stderr, filtered by
//!   `RUST_LOG` or the configured level;
//! - [`LogRingLayer`], which copies the relay's own INFO, WARN and ERROR events
//!   into the shared [`LogRing`].
//!
//! The console layer writes through `tracing_appender::non_blocking`: the
//! calling thread only queues the formatted line and a worker thread does the
//! stderr write.  Pushing into the ring is a memory append.  No logging call
//! waits on I/O.

use std::fmt::{self, Write as _};
use std::sync::Arc;

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::EnvFilter;

use whisper_hid_core::{LogLevel, LogRing};

/// Target prefix of events that belong in the ring.
const RING_TARGET_PREFIX: &str = "whisper_hid";

/// Installs the global subscriber.
///
/// `level` is used when `RUST_LOG` is unset or invalid.  The returned guard
/// flushes queued console lines when dropped; hold it until exit.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init(level: &str, ring: Arc<LogRing>) -> Result<WorkerGuard, TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());
    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer(writer))
        .with(LogRingLayer::new(ring))
        .try_init()?;
    Ok(guard)
}

/// Human-readable `fmt` layer over a non-blocking writer.
pub fn console_layer<S>(writer: NonBlocking) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    tracing_subscriber::fmt::layer().with_writer(writer)
}

/// A `tracing` layer that appends events to a [`LogRing`].
pub struct LogRingLayer {
    ring: Arc<LogRing>,
}

impl LogRingLayer {
    pub fn new(ring: Arc<LogRing>) -> Self {
        Self { ring }
    }
}

impl<S: Subscriber> Layer<S> for LogRingLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        if !meta.target().starts_with(RING_TARGET_PREFIX) {
            return;
        }
        let level = match *meta.level() {
            Level::ERROR => LogLevel::Error,
            Level::WARN => LogLevel::Warn,
            Level::INFO => LogLevel::Info,
            _ => return,
        };

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.ring.push(level, visitor.finish());
    }
}

/// Flattens an event into `"message key=value key=value"`.
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn finish(self) -> String {
        if self.fields.is_empty() {
            self.message
        } else if self.message.is_empty() {
            self.fields.trim_start().to_string()
        } else {
            format!("{}{}", self.message, self.fields)
        }
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tracing_subscriber::registry;

    fn capture(f: impl FnOnce()) -> Arc<LogRing> {
        let ring = Arc::new(LogRing::new(10));
        let subscriber = registry().with(LogRingLayer::new(Arc::clone(&ring)));
        tracing::subscriber::with_default(subscriber, f);
        ring
    }

    #[test]
    fn test_info_event_is_copied_with_fields() {
        // Arrange / Act
        let ring = capture(|| {
            tracing::info!(target: "whisper_hid::test", peer = "AA:BB", attempt = 3, "host connected");
        });

        // Assert
        let entries = ring.snapshot();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].level, LogLevel::Info);
        assert_eq!(entries[0].msg, "host connected peer=AA:BB attempt=3");
    }

    #[test]
    fn test_debug_events_are_not_copied() {
        let ring = capture(|| {
            tracing::debug!(target: "whisper_hid::test", "noise");
            tracing::trace!(target: "whisper_hid::test", "more noise");
        });
        assert!(ring.is_empty());
    }

    #[test]
    fn test_foreign_targets_are_not_copied() {
        let ring = capture(|| {
            tracing::warn!(target: "hyper::proto", "connection reset");
        });
        assert!(ring.is_empty());
    }

    #[test]
    fn test_levels_are_mapped() {
        let ring = capture(|| {
            tracing::warn!(target: "whisper_hid", "w");
            tracing::error!(target: "whisper_hid", "e");
        });
        let levels: Vec<_> = ring.snapshot().into_iter().map(|e| e.level).collect();
        assert_eq!(levels, vec![LogLevel::Warn, LogLevel::Error]);
    }

    #[test]
    fn test_console_writes_do_not_wait_for_the_writer() {
        // Arrange: a writer that blocks until the test releases it
        struct GatedWriter {
            gate: Arc<Mutex<()>>,
            written: Arc<AtomicUsize>,
        }
        impl io::Write for GatedWriter {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                let _open = self.gate.lock().unwrap();
                self.written.fetch_add(1, Ordering::SeqCst);
                Ok(buf.len())
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }
        let gate = Arc::new(Mutex::new(()));
        let written = Arc::new(AtomicUsize::new(0));
        let held = gate.lock().unwrap();
        let (writer, guard) = tracing_appender::non_blocking(GatedWriter {
            gate: Arc::clone(&gate),
            written: Arc::clone(&written),
        });
        let ring = Arc::new(LogRing::new(10));
        let subscriber = registry()
            .with(console_layer(writer))
            .with(LogRingLayer::new(Arc::clone(&ring)));

        // Act: these return while the console writer is still stuck
        tracing::subscriber::with_default(subscriber, || {
            for n in 0..5 {
                tracing::info!(target: "whisper_hid::test", n, "typed");
            }
        });

        // Assert
        assert_eq!(ring.len(), 5);
        assert_eq!(written.load(Ordering::SeqCst), 0);
        drop(held);
        drop(guard);
        assert!(written.load(Ordering::SeqCst) > 0);
    }

    #[test]
    fn test_display_fields_are_unquoted() {
        let ring = capture(|| {
            let reason = String::from("window exhausted");
            tracing::error!(target: "whisper_hid", %reason, "giving up");
        });
        assert_eq!(ring.snapshot()[0].msg, "giving up reason=window exhausted");
    }
}
