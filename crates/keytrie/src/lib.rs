//! # keytrie
//!
//! ## Overview
//!
//! This crate provides environment-agnostic pieces for interpreting modal key sequences.
//!
//! A [CommandTrie] is a prefix tree over sequences of [InputKey] values, with one root for each
//! mapping mode. Consumers populate it through a [TrieBuilder] by inserting the full key
//! sequence for every action in their catalog, and then share the finished trie between any
//! number of interpreters. The trie is never modified after [TrieBuilder::build]; interpreters
//! only walk it, holding on to [NodeId] values as their position.
//!
//! A node can be a complete binding and a prefix of longer ones at the same time. Deciding what
//! to do in that case usually involves waiting a little for the next key, so the [timer] module
//! provides a [Timer](timer::Timer) abstraction that lets the host decide how time passes.
//!
//! ## Example
//!
//! ```
//! use keytrie::{Lookup, TrieBuilder};
//!
//! #[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
//! enum Mode {
//!     Normal,
//! }
//!
//! let mut builder = TrieBuilder::new();
//! builder.insert(Mode::Normal, &['d'], "delete-char").unwrap();
//! builder.insert(Mode::Normal, &['d', 'd'], "delete-line").unwrap();
//!
//! // Two different actions can't share a sequence.
//! assert!(builder.insert(Mode::Normal, &['d', 'd'], "yank-line").is_err());
//!
//! let trie = builder.build();
//!
//! assert!(matches!(trie.lookup(Mode::Normal, &['d']), Lookup::Ambiguous(_, &"delete-char")));
//! assert!(matches!(trie.lookup(Mode::Normal, &['d', 'd']), Lookup::Leaf(_, &"delete-line")));
//! assert!(matches!(trie.lookup(Mode::Normal, &['x']), Lookup::Unmatched));
//! ```

// Require docs for public APIs, and disable the more annoying clippy lints.
#![deny(missing_docs)]
#![allow(clippy::bool_to_int_with_if)]
#![allow(clippy::len_without_is_empty)]
#![allow(clippy::match_like_matches_macro)]
#![allow(clippy::needless_return)]
use std::fmt::Debug;
use std::hash::Hash;

pub mod timer;
mod trie;

pub use self::trie::{CommandTrie, Lookup, NodeId, TrieBuilder, TrieError};

/// Trait for keys that can be stored in a [CommandTrie].
pub trait InputKey: Clone + Debug + Hash + Eq {
    /// The error type returned when parsing a macro string fails.
    type Error;

    /// If the input that produced this key could possibly represent two keys, split out the first
    /// key.
    ///
    /// For example, this can occur in Unix terminals where ^[ is used to represent when Alt has
    /// been pressed. Rapidly typing Escape + "b" will produce ^[b, which may then be parsed as a
    /// single Alt-b keypress.
    fn decompose(&mut self) -> Option<Self>;

    /// Parse a string representing a series of keypresses.
    fn from_macro_str(mstr: &str) -> Result<Vec<Self>, Self::Error>;

    /// Return this key's representation as a single, printable codepoint, if it exists.
    fn get_char(&self) -> Option<char>;

    /// Describe a sequence of keys for error messages and logs.
    fn notate(keys: &[Self]) -> String {
        format!("{keys:?}")
    }
}

impl InputKey for char {
    type Error = std::convert::Infallible;

    fn decompose(&mut self) -> Option<Self> {
        None
    }

    fn from_macro_str(mstr: &str) -> Result<Vec<Self>, Self::Error> {
        Ok(mstr.chars().collect())
    }

    fn get_char(&self) -> Option<char> {
        Some(*self)
    }

    fn notate(keys: &[Self]) -> String {
        keys.iter().collect()
    }
}
