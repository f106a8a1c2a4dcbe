//! # vimgrammar
//!
//! ## Overview
//!
//! This crate interprets the keys typed in a Vim-style modal editor. It turns them into
//! structured commands, like "delete three words into register a", which it then hands to a host
//! editor to perform.
//!
//! The pieces fit together like this:
//!
//! - [key] converts terminal events into [key::KeyToken]s, and parses key notation like `<C-W>`
//! - [catalog] lists which key sequences are bound to which [action]s in each [mode]
//! - [builder] follows keys through the bindings, handling counts, registers, operators and
//!   ambiguous sequences
//! - [dispatch] passes finished commands to the host's [dispatch::Editor], and updates the
//!   [register]s
//! - [session] ties everything together for several editing contexts, and implements macros,
//!   `.` repetition and [digraph]s
//!
//! Most hosts only need a [session::Session]:
//!
//! ```no_run
//! use vimgrammar::catalog::Catalog;
//! use vimgrammar::config::SessionConfig;
//! use vimgrammar::keytrie::timer::NoTimer;
//! use vimgrammar::session::Session;
//!
//! let config = SessionConfig::from_toml_str("timeout_ms = 300").unwrap();
//! let mut session = Session::new(&Catalog::vim(), config).unwrap();
//! let ctx = session.open_context(Box::new(NoTimer));
//! # let _ = ctx;
//! ```
//!
//! For a complete program, see the `keylog` example, which prints the commands typed into a
//! terminal.

// Require docs for public APIs, and disable the more annoying clippy lints.
#![deny(missing_docs)]
#![allow(clippy::bool_to_int_with_if)]
#![allow(clippy::len_without_is_empty)]
#![allow(clippy::match_like_matches_macro)]
#![allow(clippy::needless_return)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]

#[macro_use]
mod util;

pub mod action;
pub mod builder;
pub mod catalog;
pub mod config;
pub mod digraph;
pub mod dispatch;
pub mod errors;
pub mod key;
pub mod mode;
pub mod register;
pub mod session;

pub use crossterm;
pub use keytrie;
