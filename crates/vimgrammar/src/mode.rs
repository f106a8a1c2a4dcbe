//! # Editing modes
//!
//! ## Overview
//!
//! A [VimMode] is the mode the interpreter is currently in. Several modes read their keys from
//! the same set of bindings, so each one has a [MappingMode] that picks the root of the command
//! trie to start from.

/// The kind of text a Visual mode selection covers.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum VisualKind {
    /// Select characters (`v`).
    Char,

    /// Select whole lines (`V`).
    Line,

    /// Select a rectangular block (`<C-V>`).
    Block,
}

/// The modes that the command builder can be in.
#[derive(Clone, Copy, Debug, Default, Hash, Eq, PartialEq)]
pub enum VimMode {
    /// Keys are commands.
    #[default]
    Normal,

    /// Keys are inserted as text.
    Insert,

    /// Keys overwrite existing text.
    Replace,

    /// Keys operate on a selection.
    Visual(VisualKind),

    /// An operator has been typed, and is waiting for a motion or text object.
    OperatorPending,
}

impl VimMode {
    /// The set of bindings this mode reads from.
    pub fn mapping_mode(&self) -> MappingMode {
        match self {
            VimMode::Normal => MappingMode::Normal,
            VimMode::Insert | VimMode::Replace => MappingMode::Insert,
            VimMode::Visual(_) => MappingMode::Visual,
            VimMode::OperatorPending => MappingMode::OperatorPending,
        }
    }

    /// Whether keys not bound in this mode get typed as text.
    pub fn is_insert(&self) -> bool {
        matches!(self, VimMode::Insert | VimMode::Replace)
    }

    /// Whether this is one of the Visual modes.
    pub fn is_visual(&self) -> bool {
        matches!(self, VimMode::Visual(_))
    }
}

/// Identifies one root of the command trie.
///
/// These correspond to the mode arguments of Vim's mapping commands (`:nmap`, `:xmap`, `:omap`,
/// `:imap`).
#[derive(Clone, Copy, Debug, Hash, Eq, Ord, PartialEq, PartialOrd)]
pub enum MappingMode {
    /// Bindings for Normal mode.
    Normal,

    /// Bindings for all Visual modes.
    Visual,

    /// Bindings for motions and text objects after an operator.
    OperatorPending,

    /// Bindings for Insert and Replace modes.
    Insert,
}

impl MappingMode {
    /// Every mapping mode, in a fixed order.
    pub const ALL: [MappingMode; 4] = [
        MappingMode::Normal,
        MappingMode::Visual,
        MappingMode::OperatorPending,
        MappingMode::Insert,
    ];
}
