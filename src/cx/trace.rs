//! Access tracing.
//!
//! The engine reports every window CSR touch - success or failure - to a
//! trace sink exactly once. The sink is the only side channel besides the
//! return value, and it must never fail the access it reports on: a sink
//! that cannot accept an event drops it.
//!
//! Sinks are attached at bring-up, not per access. The default is
//! [`NullTracer`]; the CLI attaches [`LogTracer`], and tests use
//! [`RecordingTracer`] to assert on the event stream.

use std::sync::Mutex;

use super::csr::{AccessKind, CxCsr, CxWord, HartId};
use super::engine::AccessError;

/// One window CSR touch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CxEvent {
    /// Hart that performed the access.
    pub hart: HartId,
    /// Which of the four window CSRs was touched.
    pub csr: CxCsr,
    /// Read or write.
    pub kind: AccessKind,
    /// Value transferred: the written value for writes (present even when
    /// the write failed), the obtained value for successful reads, absent
    /// for failed reads.
    pub value: Option<CxWord>,
    /// Error classification for failed accesses, `None` on success.
    /// Matches what the caller saw on the return channel.
    pub outcome: Option<AccessError>,
}

impl CxEvent {
    /// True when the traced access failed.
    #[inline]
    pub fn is_failure(&self) -> bool {
        self.outcome.is_some()
    }
}

/// Receiver for access events.
///
/// `record` is infallible by contract: implementations absorb their own
/// failures (full buffers, poisoned locks, closed pipes) instead of
/// propagating them into the register access being traced.
pub trait TraceSink: Send + Sync {
    /// Record one access event.
    fn record(&self, event: &CxEvent);
}

/// Sink that drops every event.
#[derive(Debug, Default)]
pub struct NullTracer;

impl TraceSink for NullTracer {
    fn record(&self, _event: &CxEvent) {}
}

/// Sink that emits one `log::trace!` line per access, the software
/// rendition of per-CSR hardware trace points.
///
/// Enable with e.g. `RUST_LOG=cx_emu=trace`.
#[derive(Debug, Default)]
pub struct LogTracer;

impl TraceSink for LogTracer {
    fn record(&self, event: &CxEvent) {
        match (event.value, event.outcome) {
            (Some(v), None) => log::trace!(
                target: "cx_emu::csr",
                "hart {} {} {} value={:#x}",
                event.hart, event.csr, event.kind, v
            ),
            (Some(v), Some(err)) => log::trace!(
                target: "cx_emu::csr",
                "hart {} {} {} value={:#x} failed: {}",
                event.hart, event.csr, event.kind, v, err
            ),
            (None, Some(err)) => log::trace!(
                target: "cx_emu::csr",
                "hart {} {} {} failed: {}",
                event.hart, event.csr, event.kind, err
            ),
            (None, None) => log::trace!(
                target: "cx_emu::csr",
                "hart {} {} {}",
                event.hart, event.csr, event.kind
            ),
        }
    }
}

/// Sink that buffers events in memory.
///
/// Used by tests to assert on the event stream and by the CLI to summarize
/// a run. A poisoned buffer lock is recovered, not propagated: the access
/// being traced must not observe sink trouble.
#[derive(Debug, Default)]
pub struct RecordingTracer {
    events: Mutex<Vec<CxEvent>>,
}

impl RecordingTracer {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        match self.events.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// True when nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all recorded events, oldest first.
    pub fn snapshot(&self) -> Vec<CxEvent> {
        match self.events.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Drop all recorded events.
    pub fn clear(&self) {
        match self.events.lock() {
            Ok(mut guard) => guard.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }
}

impl TraceSink for RecordingTracer {
    fn record(&self, event: &CxEvent) {
        match self.events.lock() {
            Ok(mut guard) => guard.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_event(outcome: Option<AccessError>) -> CxEvent {
        CxEvent {
            hart: 1,
            csr: CxCsr::Data,
            kind: AccessKind::Write,
            value: Some(0x42),
            outcome,
        }
    }

    #[test]
    fn test_recording_tracer_buffers_in_order() {
        let tracer = RecordingTracer::new();
        assert!(tracer.is_empty());

        tracer.record(&make_event(None));
        tracer.record(&make_event(Some(AccessError::NoExtensionSelected)));

        let events = tracer.snapshot();
        assert_eq!(events.len(), 2);
        assert!(!events[0].is_failure());
        assert!(events[1].is_failure());
        assert_eq!(events[1].outcome, Some(AccessError::NoExtensionSelected));
    }

    #[test]
    fn test_recording_tracer_clear() {
        let tracer = RecordingTracer::new();
        tracer.record(&make_event(None));
        tracer.clear();
        assert!(tracer.is_empty());
    }

    #[test]
    fn test_null_tracer_accepts_anything() {
        let tracer = NullTracer;
        tracer.record(&make_event(None));
        tracer.record(&make_event(Some(AccessError::InvalidWindow)));
    }

    #[test]
    fn test_event_failure_flag() {
        assert!(!make_event(None).is_failure());
        assert!(make_event(Some(AccessError::UnknownExtension(9))).is_failure());
    }
}
