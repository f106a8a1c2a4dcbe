//! # Session configuration
//!
//! ## Overview
//!
//! [SessionConfig] holds the settings shared by every editing context in a
//! [Session](crate::session::Session). It can be built in code, or loaded from TOML:
//!
//! ```
//! use std::time::Duration;
//! use vimgrammar::config::SessionConfig;
//!
//! let config = SessionConfig::from_toml_str(r#"
//!     timeout_ms = 500
//!     max_macro_depth = 20
//!
//!     [digraphs]
//!     "hh" = "ℏ"
//! "#).unwrap();
//!
//! assert_eq!(config.timeout(), Some(Duration::from_millis(500)));
//! assert_eq!(config.max_macro_depth, 20);
//! assert_eq!(config.digraphs().unwrap(), vec![(('h', 'h'), 'ℏ')]);
//! ```
use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::builder::DEFAULT_MAX_COUNT;
use crate::errors::ConfigError;

fn default_timeout_ms() -> u64 {
    1000
}

fn default_timeout() -> bool {
    true
}

fn default_max_count() -> usize {
    DEFAULT_MAX_COUNT
}

fn default_max_macro_depth() -> usize {
    100
}

/// Settings for a [Session](crate::session::Session).
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// How many milliseconds to wait before firing an ambiguous binding, like Vim's
    /// `'timeoutlen'`.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Whether ambiguous bindings fire after a timeout at all, like Vim's `'timeout'`. When this
    /// is off, they only fire when the host flushes, or when another key resolves them.
    #[serde(default = "default_timeout")]
    pub timeout: bool,

    /// The largest count that can be typed.
    #[serde(default = "default_max_count")]
    pub max_count: usize,

    /// How deeply macros can replay other macros before giving up.
    #[serde(default = "default_max_macro_depth")]
    pub max_macro_depth: usize,

    /// Extra digraphs, keyed by their two characters.
    pub digraphs: BTreeMap<String, char>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            timeout_ms: default_timeout_ms(),
            timeout: default_timeout(),
            max_count: default_max_count(),
            max_macro_depth: default_max_macro_depth(),
            digraphs: BTreeMap::new(),
        }
    }
}

impl SessionConfig {
    /// Parse a configuration from TOML.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: SessionConfig = toml::from_str(s)?;

        // Check the digraphs now instead of when a session starts.
        let _ = config.digraphs()?;

        return Ok(config);
    }

    /// How long to wait on ambiguous bindings, if at all.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout.then(|| Duration::from_millis(self.timeout_ms))
    }

    /// The extra digraphs, as pairs of characters.
    pub fn digraphs(&self) -> Result<Vec<((char, char), char)>, ConfigError> {
        self.digraphs
            .iter()
            .map(|(digraph, c)| {
                let mut chars = digraph.chars();

                match (chars.next(), chars.next(), chars.next()) {
                    (Some(d1), Some(d2), None) => Ok(((d1, d2), *c)),
                    _ => Err(ConfigError::InvalidDigraph(digraph.clone())),
                }
            })
            .collect()
    }
}
