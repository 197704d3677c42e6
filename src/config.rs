//! Configuration management for cx-emu.
//!
//! Configuration is loaded from multiple sources in priority order:
//! 1. Environment variables (CX_EMU_HARTS)
//! 2. Project-local config file (`./cx-emu.toml`)
//! 3. User config file (`~/.config/cx-emu/config.toml`)
//! 4. Built-in defaults
//!
//! # Config File Format
//!
//! ```toml
//! # cx-emu.toml
//!
//! # Number of harts to model (each gets its own window)
//! harts = 2
//!
//! # Extension roster: installed at bring-up, before any hart runs
//! [[extension]]
//! selector = 5
//! kind = "scratch"
//! sets = 1
//! words = 16
//!
//! [[extension]]
//! selector = 6
//! kind = "mulacc"
//! ```

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cx::{CxWord, ExtensionRegistry, MulAccExt, ScratchExt};

/// Global cached configuration.
static CONFIG: OnceLock<Config> = OnceLock::new();

/// Which bundled extension model to install.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtensionKind {
    /// Scratchpad register file ([`ScratchExt`]).
    Scratch,
    /// Multiply-accumulate unit ([`MulAccExt`]).
    MulAcc,
}

/// One extension roster entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionConfig {
    /// Selector the extension is installed at. Must be non-zero and unique.
    pub selector: CxWord,

    /// Which bundled model to install.
    pub kind: ExtensionKind,

    /// Register sets (scratch only).
    #[serde(default = "default_sets")]
    pub sets: usize,

    /// Words per set (scratch only).
    #[serde(default = "default_words")]
    pub words: usize,
}

fn default_sets() -> usize {
    1
}

fn default_words() -> usize {
    16
}

/// cx-emu configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Number of harts to model.
    pub harts: Option<u32>,

    /// Extension roster installed at bring-up.
    #[serde(rename = "extension")]
    pub extensions: Vec<ExtensionConfig>,
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables
    /// 2. Project-local `cx-emu.toml`
    /// 3. User config `~/.config/cx-emu/config.toml`
    /// 4. Defaults
    pub fn load() -> Self {
        let mut config = Self::default();

        // Load user config first (lowest priority of file configs)
        if let Some(user_config) = Self::load_user_config() {
            config.merge(user_config);
        }

        // Load project-local config (higher priority)
        if let Some(local_config) = Self::load_local_config() {
            config.merge(local_config);
        }

        // Environment variables override everything
        config.apply_env_overrides();

        config
    }

    /// Get the cached global configuration.
    ///
    /// Loads configuration on first call and caches it.
    pub fn get() -> &'static Config {
        CONFIG.get_or_init(|| {
            let config = Self::load();
            log::debug!("Loaded configuration: {:?}", config);
            config
        })
    }

    /// Number of harts to model, with fallback to a single hart.
    pub fn harts(&self) -> u32 {
        self.harts.unwrap_or(1).max(1)
    }

    /// Build the extension registry from the roster.
    ///
    /// This is the bring-up step: it must complete before any hart starts
    /// executing. A reserved or duplicate selector aborts startup.
    pub fn build_registry(&self) -> Result<ExtensionRegistry> {
        let mut registry = ExtensionRegistry::new();
        for ext in &self.extensions {
            let handler: Arc<dyn crate::cx::CxExtension> = match ext.kind {
                ExtensionKind::Scratch => Arc::new(ScratchExt::new(ext.sets, ext.words)),
                ExtensionKind::MulAcc => Arc::new(MulAccExt::new()),
            };
            let name = handler.name();
            registry
                .register(ext.selector, handler)
                .with_context(|| format!("installing {} at selector {}", name, ext.selector))?;
            log::info!("Installed {} at selector {}", name, ext.selector);
        }
        Ok(registry)
    }

    /// Load user configuration from ~/.config/cx-emu/config.toml
    fn load_user_config() -> Option<Self> {
        let config_dir = dirs::config_dir()?;
        let config_path = config_dir.join("cx-emu").join("config.toml");
        Self::load_from_file(&config_path)
    }

    /// Load project-local configuration from ./cx-emu.toml
    fn load_local_config() -> Option<Self> {
        // Try current directory
        let local_path = Path::new("cx-emu.toml");
        if let Some(config) = Self::load_from_file(local_path) {
            return Some(config);
        }

        // Try to find project root by looking for Cargo.toml
        if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
            let project_path = Path::new(&manifest_dir).join("cx-emu.toml");
            if let Some(config) = Self::load_from_file(&project_path) {
                return Some(config);
            }
        }

        None
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    log::info!("Loaded config from {}", path.display());
                    Some(config)
                }
                Err(e) => {
                    log::warn!("Failed to parse {}: {}", path.display(), e);
                    None
                }
            },
            Err(e) => {
                log::warn!("Failed to read {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Merge another config into this one.
    /// Only overrides fields that are present in the other config.
    fn merge(&mut self, other: Self) {
        if other.harts.is_some() {
            self.harts = other.harts;
        }
        if !other.extensions.is_empty() {
            self.extensions = other.extensions;
        }
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(harts) = std::env::var("CX_EMU_HARTS") {
            match harts.parse::<u32>() {
                Ok(n) => {
                    log::info!("Using CX_EMU_HARTS from environment: {}", n);
                    self.harts = Some(n);
                }
                Err(_) => {
                    log::warn!("Ignoring non-numeric CX_EMU_HARTS: {}", harts);
                }
            }
        }
    }

    /// Get the path to the user config file (for display/creation).
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("cx-emu").join("config.toml"))
    }

    /// Generate a sample config file content.
    pub fn sample_config() -> String {
        r#"# cx-emu configuration
# Place this file at ~/.config/cx-emu/config.toml or ./cx-emu.toml

# Number of harts to model (default 1)
harts = 2

# Extension roster: each entry binds a bundled model to a selector.
# Selector 0 is reserved and cannot be used.

[[extension]]
selector = 5
kind = "scratch"
sets = 1
words = 16

[[extension]]
selector = 6
kind = "mulacc"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_harts() {
        let config = Config::default();
        assert_eq!(config.harts(), 1);
        assert!(config.extensions.is_empty());
    }

    #[test]
    fn test_config_merge() {
        let mut base = Config {
            harts: Some(4),
            extensions: vec![],
        };

        let overlay = Config {
            harts: None,
            extensions: vec![ExtensionConfig {
                selector: 5,
                kind: ExtensionKind::Scratch,
                sets: 1,
                words: 16,
            }],
        };

        base.merge(overlay);

        // harts unchanged (overlay was None)
        assert_eq!(base.harts, Some(4));
        // extension roster taken from overlay
        assert_eq!(base.extensions.len(), 1);
        assert_eq!(base.extensions[0].selector, 5);
    }

    #[test]
    fn test_sample_config_parses() {
        let sample = Config::sample_config();
        let config: Config = toml::from_str(&sample).expect("Sample config should parse");
        assert_eq!(config.harts(), 2);
        assert_eq!(config.extensions.len(), 2);
        assert_eq!(config.extensions[0].kind, ExtensionKind::Scratch);
        assert_eq!(config.extensions[1].kind, ExtensionKind::MulAcc);
        // Geometry defaults apply when omitted
        assert_eq!(config.extensions[1].sets, 1);
        assert_eq!(config.extensions[1].words, 16);
    }

    #[test]
    fn test_build_registry_from_sample() {
        let config: Config = toml::from_str(&Config::sample_config()).unwrap();
        let registry = config.build_registry().unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.roster(), vec![(5, "scratch"), (6, "mulacc")]);
    }

    #[test]
    fn test_build_registry_rejects_duplicates() {
        let config = Config {
            harts: None,
            extensions: vec![
                ExtensionConfig {
                    selector: 3,
                    kind: ExtensionKind::Scratch,
                    sets: 1,
                    words: 4,
                },
                ExtensionConfig {
                    selector: 3,
                    kind: ExtensionKind::MulAcc,
                    sets: 1,
                    words: 16,
                },
            ],
        };
        let err = config.build_registry().unwrap_err();
        assert!(err.to_string().contains("selector 3"));
    }

    #[test]
    fn test_build_registry_rejects_reserved_selector() {
        let config = Config {
            harts: None,
            extensions: vec![ExtensionConfig {
                selector: 0,
                kind: ExtensionKind::Scratch,
                sets: 1,
                words: 4,
            }],
        };
        assert!(config.build_registry().is_err());
    }
}
