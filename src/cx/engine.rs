//! Indirect access engine.
//!
//! This is the protocol core: given a hart's [`CxWindow`] and one
//! architectural register operation, the engine mutates or reads the
//! coordinates, and for `cxdata` accesses resolves the current selector
//! through the [`ExtensionRegistry`] and delegates to the handler.
//!
//! The engine itself is stateless - all mutable state lives in the window
//! passed in - so one engine instance serves every hart concurrently.
//!
//! # Validation order
//!
//! Data accesses always classify errors in the same order, so the outcome
//! is deterministic no matter which coordinate was "wrong":
//!
//! 1. `cxsel == 0`            -> `NoExtensionSelected` (registry untouched)
//! 2. selector not registered -> `UnknownExtension`
//! 3. handler rejects window  -> `InvalidWindow`
//! 4. handler faults          -> `ExtensionFault { status }`
//!
//! Set-selector and index legality is deliberately left to the handler:
//! legal ranges are extension-specific, and the engine stays
//! extension-agnostic.
//!
//! Every operation - coordinate or data, success or failure - is reported
//! exactly once to the attached trace sink, with the same classification
//! the caller sees on the return channel.

use std::sync::Arc;

use thiserror::Error;

use super::csr::{AccessKind, CxCsr, CxWord};
use super::registry::{ExtError, ExtensionRegistry};
use super::trace::{CxEvent, NullTracer, TraceSink};
use super::window::CxWindow;

/// One architectural register operation on the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CxOp {
    /// Read one of the four window CSRs.
    Read(CxCsr),
    /// Write one of the four window CSRs.
    Write(CxCsr, CxWord),
}

/// Failure of a `cxdata` access.
///
/// Coordinate accesses never fail; every variant here surfaces from the
/// data port and is returned to the CPU dispatcher, which translates it
/// into whatever trap convention the surrounding model uses. The engine
/// performs no retries and no silent recovery.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AccessError {
    /// Data access while `cxsel` is 0.
    #[error("no extension selected")]
    NoExtensionSelected,

    /// `cxsel` holds a non-zero value with no registered handler.
    #[error("no extension registered at selector {0}")]
    UnknownExtension(CxWord),

    /// The extension rejected the set-selector/index combination.
    #[error("extension rejected the selected window")]
    InvalidWindow,

    /// Extension-defined failure beyond bad addressing.
    #[error("extension fault, status 0x{status:08X}")]
    ExtensionFault {
        /// Opaque status word from the extension, for diagnostics.
        status: u32,
    },
}

impl From<ExtError> for AccessError {
    fn from(err: ExtError) -> Self {
        match err {
            ExtError::BadSetSelector | ExtError::BadIndex => AccessError::InvalidWindow,
            ExtError::Fault(status) => AccessError::ExtensionFault { status },
        }
    }
}

/// Result type for window register accesses.
pub type AccessResult<T> = Result<T, AccessError>;

/// The indirection engine shared by all harts of one CPU model.
pub struct CxEngine {
    registry: Arc<ExtensionRegistry>,
    tracer: Arc<dyn TraceSink>,
}

impl CxEngine {
    /// Create an engine over a bring-up-complete registry, without tracing.
    pub fn new(registry: Arc<ExtensionRegistry>) -> Self {
        Self::with_tracer(registry, Arc::new(NullTracer))
    }

    /// Create an engine with a trace sink attached.
    pub fn with_tracer(registry: Arc<ExtensionRegistry>, tracer: Arc<dyn TraceSink>) -> Self {
        Self { registry, tracer }
    }

    /// The registry this engine resolves selectors against.
    #[inline]
    pub fn registry(&self) -> &Arc<ExtensionRegistry> {
        &self.registry
    }

    /// Perform one tagged register operation.
    ///
    /// Reads return the value obtained; writes echo the value written.
    /// Only `cxdata` operations can fail.
    pub fn access(&self, win: &mut CxWindow, op: CxOp) -> AccessResult<CxWord> {
        match op {
            CxOp::Read(CxCsr::Selector) => Ok(self.read_selector(win)),
            CxOp::Read(CxCsr::SetSelector) => Ok(self.read_set_selector(win)),
            CxOp::Read(CxCsr::Index) => Ok(self.read_index(win)),
            CxOp::Read(CxCsr::Data) => self.read_data(win),
            CxOp::Write(CxCsr::Selector, v) => {
                self.write_selector(win, v);
                Ok(v)
            }
            CxOp::Write(CxCsr::SetSelector, v) => {
                self.write_set_selector(win, v);
                Ok(v)
            }
            CxOp::Write(CxCsr::Index, v) => {
                self.write_index(win, v);
                Ok(v)
            }
            CxOp::Write(CxCsr::Data, v) => {
                self.write_data(win, v)?;
                Ok(v)
            }
        }
    }

    // ========================================================================
    // Coordinate registers (infallible)
    // ========================================================================

    /// Write `cxsel`. Any bit pattern is legal to latch.
    pub fn write_selector(&self, win: &mut CxWindow, value: CxWord) {
        win.write_selector(value);
        self.report(win, CxCsr::Selector, AccessKind::Write, Some(value), None);
    }

    /// Read `cxsel`.
    pub fn read_selector(&self, win: &CxWindow) -> CxWord {
        let value = win.selector();
        self.report(win, CxCsr::Selector, AccessKind::Read, Some(value), None);
        value
    }

    /// Write `cxsetsel`. Any bit pattern is legal to latch.
    pub fn write_set_selector(&self, win: &mut CxWindow, value: CxWord) {
        win.write_set_selector(value);
        self.report(win, CxCsr::SetSelector, AccessKind::Write, Some(value), None);
    }

    /// Read `cxsetsel`.
    pub fn read_set_selector(&self, win: &CxWindow) -> CxWord {
        let value = win.set_selector();
        self.report(win, CxCsr::SetSelector, AccessKind::Read, Some(value), None);
        value
    }

    /// Write `cxidx`. Any bit pattern is legal to latch.
    pub fn write_index(&self, win: &mut CxWindow, value: CxWord) {
        win.write_index(value);
        self.report(win, CxCsr::Index, AccessKind::Write, Some(value), None);
    }

    /// Read `cxidx`.
    pub fn read_index(&self, win: &CxWindow) -> CxWord {
        let value = win.index();
        self.report(win, CxCsr::Index, AccessKind::Read, Some(value), None);
        value
    }

    // ========================================================================
    // Data register (fallible, one-shot transaction)
    // ========================================================================

    /// Read `cxdata`: fetch the extension register addressed by the current
    /// coordinates. Coordinates are left untouched whatever the outcome.
    pub fn read_data(&self, win: &CxWindow) -> AccessResult<CxWord> {
        let outcome = self.dispatch_read(win);
        self.report(win, CxCsr::Data, AccessKind::Read, outcome.ok(), outcome.err());
        outcome
    }

    /// Write `cxdata`: store `value` to the extension register addressed by
    /// the current coordinates. Coordinates are left untouched whatever the
    /// outcome; the written value is traced even on failure.
    pub fn write_data(&self, win: &CxWindow, value: CxWord) -> AccessResult<()> {
        let outcome = self.dispatch_write(win, value);
        self.report(win, CxCsr::Data, AccessKind::Write, Some(value), outcome.err());
        outcome
    }

    fn dispatch_read(&self, win: &CxWindow) -> AccessResult<CxWord> {
        let selector = win.selector();
        if win.is_unselected() {
            return Err(AccessError::NoExtensionSelected);
        }
        let ext = self
            .registry
            .lookup(selector)
            .ok_or(AccessError::UnknownExtension(selector))?;
        ext.read(win.set_selector(), win.index()).map_err(AccessError::from)
    }

    fn dispatch_write(&self, win: &CxWindow, value: CxWord) -> AccessResult<()> {
        let selector = win.selector();
        if win.is_unselected() {
            return Err(AccessError::NoExtensionSelected);
        }
        let ext = self
            .registry
            .lookup(selector)
            .ok_or(AccessError::UnknownExtension(selector))?;
        ext.write(win.set_selector(), win.index(), value)
            .map_err(AccessError::from)
    }

    fn report(
        &self,
        win: &CxWindow,
        csr: CxCsr,
        kind: AccessKind,
        value: Option<CxWord>,
        outcome: Option<AccessError>,
    ) {
        self.tracer.record(&CxEvent {
            hart: win.hart(),
            csr,
            kind,
            value,
            outcome,
        });
    }
}
