//! Adapter configuration.
//!
//! [`AdapterConfig`] is the single source of truth for runtime settings.  It
//! can be built from defaults, parsed from a TOML file, and then adjusted by
//! the environment toggle:
//!
//! ```toml
//! asgi_version = "3.0"
//! spec_version = "2.3"
//! spool_threshold = 1048576
//! abort_on_lifespan_error = false
//! debug = false
//! ```
//!
//! Every field has a serde default, so a partial file (or an empty one) is
//! valid.

use std::path::{Path, PathBuf};

use rsgi_core::protocol::{DEFAULT_ASGI_VERSION, DEFAULT_SPEC_VERSION};
use rsgi_core::{AsgiVersion, DEFAULT_SPOOL_THRESHOLD};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable that raises adapter log verbosity to debug.
pub const DEBUG_ENV_VAR: &str = "RSGI_ADAPTER_DEBUG";

/// Error type for loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// All runtime configuration for the adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// AppProtocol interface version advertised in every scope.
    #[serde(default = "default_asgi_version")]
    pub asgi_version: String,

    /// AppProtocol HTTP spec version advertised in every scope.
    #[serde(default = "default_spec_version")]
    pub spec_version: String,

    /// Bytes a response body may occupy in memory before it spills to disk.
    #[serde(default = "default_spool_threshold")]
    pub spool_threshold: usize,

    /// Whether a failed lifespan startup should stop the process from serving.
    #[serde(default)]
    pub abort_on_lifespan_error: bool,

    /// Debug-level logging for the adapter.
    #[serde(default)]
    pub debug: bool,
}

fn default_asgi_version() -> String {
    DEFAULT_ASGI_VERSION.to_string()
}
fn default_spec_version() -> String {
    DEFAULT_SPEC_VERSION.to_string()
}
fn default_spool_threshold() -> usize {
    DEFAULT_SPOOL_THRESHOLD
}

impl Default for AdapterConfig {
    /// | Field                     | Default  |
    /// |---------------------------|----------|
    /// | asgi_version              | `"3.0"`  |
    /// | spec_version              | `"2.3"`  |
    /// | spool_threshold           | 1 MiB    |
    /// | abort_on_lifespan_error   | `false`  |
    /// | debug                     | `false`  |
    fn default() -> Self {
        Self {
            asgi_version: default_asgi_version(),
            spec_version: default_spec_version(),
            spool_threshold: default_spool_threshold(),
            abort_on_lifespan_error: false,
            debug: false,
        }
    }
}

impl AdapterConfig {
    /// Parses a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed TOML or wrongly typed fields.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads and parses a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Parse`] if its content is invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Applies `RSGI_ADAPTER_DEBUG` from the process environment.
    pub fn with_env_overrides(mut self) -> Self {
        if debug_toggle_enabled(std::env::var(DEBUG_ENV_VAR).ok().as_deref()) {
            self.debug = true;
        }
        self
    }

    /// The protocol metadata advertised in scopes.
    pub fn asgi(&self) -> AsgiVersion {
        AsgiVersion {
            version: self.asgi_version.clone(),
            spec_version: self.spec_version.clone(),
        }
    }
}

/// Interprets the value of the debug toggle.
pub fn debug_toggle_enabled(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────
