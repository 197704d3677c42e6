//! CX indirect register window.
//!
//! This module models the Composable Extensions (CX) interface: four
//! directly-addressable CSRs acting as a selector/index/data window through
//! which an arbitrarily large space of extension registers is accessed
//! indirectly, without consuming a new CSR number per extension register.
//!
//! # Access flow
//!
//! ```text
//!                 per hart                          shared, read-only
//!            +---------------+                   +--------------------+
//!  CSR op -->|   CxWindow    |    cxdata only    | ExtensionRegistry  |
//!            | cxsel         |  +-------------+  |  5 -> scratch      |
//!            | cxsetsel      |->|  CxEngine   |->|  6 -> mulacc       |
//!            | cxidx         |  +-------------+  |  ...               |
//!            +---------------+        |          +--------------------+
//!                                     v
//!                               TraceSink (one event per touch)
//! ```
//!
//! Coordinate CSRs latch unconditionally; validation is lazy and happens
//! only when `cxdata` is touched. The registry is populated at bring-up and
//! shared read-only across harts; each hart exclusively owns its window, so
//! the hot path takes no locks.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use cx_emu::cx::{CxEngine, CxWindow, ExtensionRegistry, ScratchExt};
//!
//! let mut registry = ExtensionRegistry::new();
//! registry.register(5, Arc::new(ScratchExt::new(1, 16))).unwrap();
//!
//! let engine = CxEngine::new(Arc::new(registry));
//! let mut win = CxWindow::new(0);
//!
//! engine.write_selector(&mut win, 5);
//! engine.write_index(&mut win, 3);
//! engine.write_data(&win, 0x42).unwrap();
//! assert_eq!(engine.read_data(&win), Ok(0x42));
//! ```

pub mod csr;
pub mod engine;
pub mod ext;
pub mod registry;
pub mod trace;
pub mod window;

pub use csr::{AccessKind, CxCsr, CxWord, HartId, CX_SEL_NONE};
pub use engine::{AccessError, AccessResult, CxEngine, CxOp};
pub use ext::{MulAccExt, ScratchExt};
pub use registry::{CxExtension, ExtError, ExtResult, ExtensionRegistry, RegistryError};
pub use trace::{CxEvent, LogTracer, NullTracer, RecordingTracer, TraceSink};
pub use window::CxWindow;
