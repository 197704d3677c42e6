//! Extension handler capability and selector registry.
//!
//! Every installed composable extension is reachable through one non-zero
//! selector value. The registry is built once during bring-up, before any
//! hart starts executing, and is shared read-only (behind `Arc`) afterwards.
//! The `&mut self` requirement on [`ExtensionRegistry::register`] makes that
//! ordering a type-level fact rather than a runtime lock.
//!
//! What a set-selector or index *means* is entirely up to the extension;
//! the registry and engine never range-check them. An extension rejects an
//! access it cannot serve by returning an [`ExtError`].

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;

use super::csr::{CxWord, CX_SEL_NONE};

/// Rejection reported by an extension handler.
///
/// `BadSetSelector`/`BadIndex` mean the current window coordinates do not
/// address anything in the extension; `Fault` carries an extension-defined
/// status word for failures beyond bad addressing (write to a read-only
/// register, internal unit error, ...).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ExtError {
    /// The set-selector does not name a register set of this extension.
    #[error("set selector out of range")]
    BadSetSelector,

    /// The index does not name a register within the selected set.
    #[error("index out of range")]
    BadIndex,

    /// Extension-defined failure, identified by an opaque status word.
    #[error("extension fault, status 0x{0:08X}")]
    Fault(u32),
}

/// Result type used by extension handlers.
pub type ExtResult<T> = Result<T, ExtError>;

/// Capability interface implemented by every composable extension.
///
/// Handlers are invoked with the hart's current set-selector and index;
/// they must return synchronously and never block. One handler instance may
/// be reached concurrently from several harts (the registry is shared), so
/// implementations guard any internal state themselves.
///
/// # Example
///
/// ```ignore
/// struct Identity;
/// impl CxExtension for Identity {
///     fn name(&self) -> &'static str { "identity" }
///     fn read(&self, _set: CxWord, index: CxWord) -> ExtResult<CxWord> {
///         Ok(index)
///     }
///     fn write(&self, _set: CxWord, _index: CxWord, _value: CxWord) -> ExtResult<()> {
///         Err(ExtError::Fault(1)) // read-only unit
///     }
/// }
/// ```
pub trait CxExtension: Send + Sync {
    /// Short name of the extension, used in trace output and summaries.
    fn name(&self) -> &'static str;

    /// Read the register at `(set, index)`.
    fn read(&self, set: CxWord, index: CxWord) -> ExtResult<CxWord>;

    /// Write `value` to the register at `(set, index)`.
    fn write(&self, set: CxWord, index: CxWord, value: CxWord) -> ExtResult<()>;
}

/// Errors raised while installing extensions.
///
/// These are bring-up configuration errors: startup should abort on them,
/// and they can never occur once harts are running.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    /// Selector 0 means "no extension selected" and cannot be bound.
    #[error("selector 0 is reserved")]
    ReservedSelector,

    /// The selector already has a handler bound to it.
    #[error("selector {0} is already registered")]
    DuplicateSelector(CxWord),
}

/// Selector -> handler table for one CPU model.
///
/// Lookups are counted (relaxed atomic) so tests and the CLI summary can
/// observe whether the data-access path consulted the registry at all.
pub struct ExtensionRegistry {
    handlers: HashMap<CxWord, Arc<dyn CxExtension>>,
    lookups: AtomicU64,
}

impl ExtensionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            lookups: AtomicU64::new(0),
        }
    }

    /// Bind `handler` to a non-zero `selector`.
    ///
    /// Fails without side effects if the selector is reserved (0) or
    /// already bound.
    pub fn register(
        &mut self,
        selector: CxWord,
        handler: Arc<dyn CxExtension>,
    ) -> Result<(), RegistryError> {
        if selector == CX_SEL_NONE {
            return Err(RegistryError::ReservedSelector);
        }
        if self.handlers.contains_key(&selector) {
            return Err(RegistryError::DuplicateSelector(selector));
        }
        self.handlers.insert(selector, handler);
        Ok(())
    }

    /// Resolve a selector to its handler. Total: absence is `None`, not an
    /// error - callers decide whether absence matters.
    pub fn lookup(&self, selector: CxWord) -> Option<Arc<dyn CxExtension>> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        self.handlers.get(&selector).cloned()
    }

    /// Number of lookups performed so far.
    #[inline]
    pub fn lookups(&self) -> u64 {
        self.lookups.load(Ordering::Relaxed)
    }

    /// Number of installed extensions.
    #[inline]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// True when no extension is installed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Installed roster as `(selector, name)` pairs, sorted by selector.
    pub fn roster(&self) -> Vec<(CxWord, &'static str)> {
        let mut entries: Vec<_> = self
            .handlers
            .iter()
            .map(|(sel, ext)| (*sel, ext.name()))
            .collect();
        entries.sort_unstable_by_key(|(sel, _)| *sel);
        entries
    }

    /// Print the installed roster, one line per extension.
    pub fn print_summary(&self) {
        println!("Installed extensions: {}", self.len());
        for (sel, name) in self.roster() {
            println!("  selector {:>3}: {}", sel, name);
        }
        println!("Registry lookups: {}", self.lookups());
    }
}

impl Default for ExtensionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("roster", &self.roster())
            .field("lookups", &self.lookups())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl CxExtension for Echo {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn read(&self, set: CxWord, index: CxWord) -> ExtResult<CxWord> {
            Ok(set ^ index)
        }

        fn write(&self, _set: CxWord, _index: CxWord, _value: CxWord) -> ExtResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let mut reg = ExtensionRegistry::new();
        reg.register(5, Arc::new(Echo)).unwrap();
        assert_eq!(reg.len(), 1);

        let ext = reg.lookup(5).expect("selector 5 registered");
        assert_eq!(ext.name(), "echo");
        assert_eq!(ext.read(0xF0, 0x0F).unwrap(), 0xFF);
    }

    #[test]
    fn test_reserved_selector_rejected() {
        let mut reg = ExtensionRegistry::new();
        let err = reg.register(0, Arc::new(Echo)).unwrap_err();
        assert_eq!(err, RegistryError::ReservedSelector);
        assert!(reg.is_empty());
    }

    #[test]
    fn test_duplicate_selector_rejected() {
        let mut reg = ExtensionRegistry::new();
        reg.register(7, Arc::new(Echo)).unwrap();
        let err = reg.register(7, Arc::new(Echo)).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateSelector(7));
        // First binding survives
        assert_eq!(reg.len(), 1);
        assert!(reg.lookup(7).is_some());
    }

    #[test]
    fn test_lookup_absent_is_none() {
        let reg = ExtensionRegistry::new();
        assert!(reg.lookup(9).is_none());
        assert!(reg.lookup(0).is_none());
    }

    #[test]
    fn test_lookup_counter() {
        let mut reg = ExtensionRegistry::new();
        reg.register(1, Arc::new(Echo)).unwrap();
        assert_eq!(reg.lookups(), 0);
        reg.lookup(1);
        reg.lookup(2);
        assert_eq!(reg.lookups(), 2);
    }

    #[test]
    fn test_roster_sorted() {
        let mut reg = ExtensionRegistry::new();
        reg.register(9, Arc::new(Echo)).unwrap();
        reg.register(2, Arc::new(Echo)).unwrap();
        let roster = reg.roster();
        assert_eq!(roster.len(), 2);
        assert_eq!(roster[0].0, 2);
        assert_eq!(roster[1].0, 9);
    }

    #[test]
    fn test_error_display() {
        assert!(RegistryError::ReservedSelector.to_string().contains("reserved"));
        assert!(RegistryError::DuplicateSelector(7).to_string().contains('7'));
        assert!(ExtError::Fault(0xAB).to_string().contains("000000AB"));
    }
}
