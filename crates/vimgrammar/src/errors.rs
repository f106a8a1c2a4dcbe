//! # Error Types
//!
//! ## Overview
//!
//! This module contains error types that group together some of the more specific errors returned
//! by components in this crate.
//!
//! Only [CatalogError] and [ConfigError] are fatal, and they can only happen before any keys have
//! been interpreted. Every [InterpretError] leaves the interpreter reset and ready for more input.
use keytrie::TrieError;

use crate::key::MacroError;
use crate::register::RegisterError;

/// Problems with a catalog that prevent building a command trie from it.
#[derive(thiserror::Error, Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum CatalogError {
    /// Two actions were bound to the same keys, or an action to no keys.
    #[error("Invalid binding: {0}")]
    Conflict(#[from] TrieError),

    /// An entry's keys couldn't be parsed.
    #[error("Invalid keys {0:?} in catalog: {1}")]
    InvalidKeys(String, MacroError),

    /// An action that takes an argument is also the prefix of another binding.
    #[error("Binding {0:?} takes an argument, but other bindings start with it")]
    ShadowedArgument(String),
}

/// Problems loading a [SessionConfig](crate::config::SessionConfig).
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum ConfigError {
    /// The configuration isn't valid TOML, or doesn't have the expected fields.
    #[error("Invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// A digraph definition isn't two characters long.
    #[error("Invalid digraph {0:?}: expected two characters")]
    InvalidDigraph(String),
}

/// Errors that occur while interpreting keys.
#[derive(thiserror::Error, Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum InterpretError {
    /// The typed keys don't match any binding.
    #[error("Invalid key sequence: {0}")]
    InvalidSequence(String),

    /// Input ended in the middle of a key sequence.
    #[error("Incomplete key sequence discarded: {0}")]
    IncompleteAtBoundary(String),

    /// The two characters typed after the digraph key don't form a digraph.
    #[error("Invalid digraph: {0:?} {1:?}")]
    UnknownDigraph(char, char),

    /// The editor failed to perform an action.
    #[error("Failed to perform {action}: {reason}")]
    ActionExecutionFailure {
        /// The action that failed.
        action: String,
        /// Why it failed.
        reason: String,
    },

    /// The catalog couldn't be turned into a command trie.
    #[error("Invalid catalog: {0}")]
    CatalogConflict(#[from] CatalogError),

    /// Error while getting or putting a value into the register store.
    #[error("Register error: {0}")]
    Register(#[from] RegisterError),

    /// Macro-related failure.
    #[error("Macro error: {0}")]
    Macro(#[from] MacroError),

    /// No editing context exists with the given identifier.
    #[error("No such editing context: {0}")]
    NoContext(u64),
}

impl InterpretError {
    /// Whether this error was recovered from by resetting, with nothing worth telling the user.
    pub fn is_silent(&self) -> bool {
        matches!(
            self,
            InterpretError::InvalidSequence(_) |
                InterpretError::IncompleteAtBoundary(_) |
                InterpretError::UnknownDigraph(_, _)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = InterpretError::InvalidSequence("gx".into());
        assert_eq!(err.to_string(), "Invalid key sequence: gx");
        assert!(err.is_silent());

        let err = InterpretError::ActionExecutionFailure {
            action: "delete".into(),
            reason: "Buffer is read-only".into(),
        };
        assert_eq!(err.to_string(), "Failed to perform delete: Buffer is read-only");
        assert!(!err.is_silent());

        let err = InterpretError::from(MacroError::LoopingMacro(100));
        assert!(matches!(err, InterpretError::Macro(MacroError::LoopingMacro(100))));

        let err = CatalogError::from(TrieError::EmptySequence { mode: "Normal".into() });
        assert_eq!(
            err.to_string(),
            "Invalid binding: Cannot bind an empty key sequence in Normal mode"
        );
    }
}
