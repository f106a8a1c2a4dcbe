//! # Registers
//!
//! ## Overview
//!
//! Registers hold text that has been yanked or deleted, so that it can be put back elsewhere,
//! along with a few special values like the last inserted text.
//!
//! Completed commands update the [RegisterStore] through [RegisterStore::record_yank] and
//! [RegisterStore::record_delete], which take care of the numbered ring, the small delete
//! register, and the unnamed register the same way Vim does:
//!
//! ```
//! use vimgrammar::register::{RegisterCell, RegisterName, RegisterShape, RegisterStore};
//!
//! let mut store = RegisterStore::default();
//!
//! store.record_yank(None, RegisterCell::new(RegisterShape::LineWise, "hello\n")).unwrap();
//! store.record_delete(None, RegisterCell::from("word")).unwrap();
//!
//! assert_eq!(store.read(RegisterName::Unnamed).unwrap().text, "word");
//! assert_eq!(store.read(RegisterName::SmallDelete).unwrap().text, "word");
//! assert_eq!(store.read(RegisterName::Numbered(1)).unwrap().text, "hello\n");
//! ```
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use keytrie::InputKey;

use crate::errors::InterpretError;
use crate::key::KeyToken;

/// A register store shared between editing contexts.
pub type SharedRegisters = Arc<RwLock<RegisterStore>>;

/// Error while getting or setting a register value.
#[derive(thiserror::Error, Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum RegisterError {
    /// Attempted to write to a read-only register.
    #[error("Register {0} is read-only")]
    ReadOnly(RegisterName),

    /// Failure to determine a macro register to use.
    #[error("No macro previously executed")]
    NoLastMacro,

    /// The register store lock was poisoned by a panicking thread.
    #[error("Register store is unavailable")]
    Poisoned,
}

/// Names a register.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum RegisterName {
    /// The default register, `""`.
    Unnamed,

    /// A register named by a letter, `"a` through `"z`.
    ///
    /// Uppercase letters refer to the same register as their lowercase versions, but append to
    /// it instead of replacing it.
    Named(char),

    /// The ring of recent yanks and deletes, `"0` through `"9`.
    Numbered(u8),

    /// The most recent deletion within a line, `"-`.
    SmallDelete,

    /// A register that discards everything written to it, `"_`.
    Blackhole,

    /// The last inserted text, `".`.
    LastInserted,

    /// The last command line, `":`.
    LastCommand,

    /// The last search pattern, `"/`.
    LastSearch,

    /// The name of the current file, `"%`.
    CurrentFile,
}

impl RegisterName {
    /// Get the register a character names, if any.
    pub fn from_char(c: char) -> Option<Self> {
        let name = match c {
            '"' => RegisterName::Unnamed,
            'a'..='z' | 'A'..='Z' => RegisterName::Named(c),
            '0'..='9' => RegisterName::Numbered(c as u8 - b'0'),
            '-' => RegisterName::SmallDelete,
            '_' => RegisterName::Blackhole,
            '.' => RegisterName::LastInserted,
            ':' => RegisterName::LastCommand,
            '/' => RegisterName::LastSearch,
            '%' => RegisterName::CurrentFile,
            _ => return None,
        };

        Some(name)
    }

    /// The character that names this register.
    pub fn to_char(&self) -> char {
        match self {
            RegisterName::Unnamed => '"',
            RegisterName::Named(c) => *c,
            RegisterName::Numbered(n) => char::from(b'0' + n % 10),
            RegisterName::SmallDelete => '-',
            RegisterName::Blackhole => '_',
            RegisterName::LastInserted => '.',
            RegisterName::LastCommand => ':',
            RegisterName::LastSearch => '/',
            RegisterName::CurrentFile => '%',
        }
    }

    /// Whether writing to this register appends to it.
    pub fn is_append(&self) -> bool {
        matches!(self, RegisterName::Named(c) if c.is_ascii_uppercase())
    }

    /// Whether only the session itself can change this register.
    pub fn is_read_only(&self) -> bool {
        matches!(
            self,
            RegisterName::LastInserted |
                RegisterName::LastCommand |
                RegisterName::LastSearch |
                RegisterName::CurrentFile
        )
    }

    /// Identify the storage behind this name, so that `"A` and `"a` are the same.
    fn slot(&self) -> RegisterName {
        match self {
            RegisterName::Named(c) => RegisterName::Named(c.to_ascii_lowercase()),
            other => *other,
        }
    }
}

impl fmt::Display for RegisterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}", self.to_char())
    }
}

/// How the text in a register should be put back.
#[derive(Clone, Copy, Debug, Default, Hash, Eq, PartialEq)]
pub enum RegisterShape {
    /// A run of characters.
    #[default]
    CharWise,

    /// Whole lines.
    LineWise,

    /// A rectangular block.
    BlockWise,
}

/// The current value stored in a register.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RegisterCell {
    /// The shape of the stored text.
    pub shape: RegisterShape,

    /// The stored text.
    pub text: String,
}

impl RegisterCell {
    /// Create a new cell.
    pub fn new(shape: RegisterShape, text: impl Into<String>) -> Self {
        RegisterCell { shape, text: text.into() }
    }

    /// Whether this cell holds whole lines.
    pub fn is_linewise(&self) -> bool {
        self.shape == RegisterShape::LineWise
    }

    /// Whether this text was deleted from within a single line.
    pub fn is_small(&self) -> bool {
        self.shape == RegisterShape::CharWise && !self.text.contains('\n')
    }

    /// Merge the contents of two register cells, respecting their shapes.
    pub fn merge(&self, other: &RegisterCell) -> RegisterCell {
        use RegisterShape::{BlockWise, CharWise, LineWise};

        match (self.shape, other.shape) {
            (CharWise, CharWise) | (LineWise, LineWise) | (CharWise, BlockWise) => {
                /*
                 * These keep the existing shape and need nothing in between:
                 *
                 * Char + Char = Char
                 * Char + Block = Char
                 * Line + Line = Line
                 */
                RegisterCell::new(self.shape, format!("{}{}", self.text, other.text))
            },
            (BlockWise, BlockWise | CharWise) => {
                /*
                 * These keep the existing shape and need a newline in between:
                 *
                 * Block + Block = Block
                 * Block + Char = Block
                 */
                RegisterCell::new(self.shape, format!("{}\n{}", self.text, other.text))
            },
            (BlockWise | CharWise, LineWise) => {
                /*
                 * These take the appended shape and need a newline in between:
                 *
                 * Block + Line = Line
                 * Char + Line = Line
                 */
                RegisterCell::new(other.shape, format!("{}\n{}", self.text, other.text))
            },
            (LineWise, BlockWise | CharWise) => {
                /*
                 * These keep the existing shape and need a trailing newline:
                 *
                 * Line + Block = Line
                 * Line + Char = Line
                 */
                RegisterCell::new(self.shape, format!("{}{}\n", self.text, other.text))
            },
        }
    }
}

impl From<&str> for RegisterCell {
    fn from(s: &str) -> RegisterCell {
        RegisterCell::new(RegisterShape::CharWise, s)
    }
}

/// Storage for register values.
///
/// Registers are created the first time they're written to, and stay around until
/// [RegisterStore::reset_registers] is called.
#[derive(Debug, Default)]
pub struct RegisterStore {
    cells: HashMap<RegisterName, RegisterCell>,
    macros: HashMap<RegisterName, Vec<KeyToken>>,
    last_macro: Option<RegisterName>,
}

impl RegisterStore {
    /// Create a new store with every register empty.
    pub fn new() -> Self {
        Self::default()
    }

    fn set(&mut self, name: RegisterName, cell: RegisterCell) {
        let slot = name.slot();

        self.macros.remove(&slot);
        self.cells.insert(slot, cell);
    }

    /// Update the value of a register.
    ///
    /// The new text is appended when `append` is true or when `name` is an uppercase letter.
    /// Writes to [RegisterName::Blackhole] are discarded.
    pub fn write(
        &mut self,
        name: RegisterName,
        text: &str,
        shape: RegisterShape,
        append: bool,
    ) -> Result<(), RegisterError> {
        if name.is_read_only() {
            return Err(RegisterError::ReadOnly(name));
        }

        if name == RegisterName::Blackhole {
            return Ok(());
        }

        let mut cell = RegisterCell::new(shape, text);

        if append || name.is_append() {
            if let Some(prev) = self.cells.get(&name.slot()) {
                cell = prev.merge(&cell);
            }
        }

        tracing::trace!(register = %name, shape = ?cell.shape, "register written");

        self.set(name, cell);

        return Ok(());
    }

    /// Get the current value of a register.
    pub fn read(&self, name: RegisterName) -> Option<RegisterCell> {
        if name == RegisterName::Blackhole {
            return None;
        }

        self.cells.get(&name.slot()).cloned()
    }

    /// Place new content at the front of the numbered ring.
    ///
    /// Registers `"0` through `"8` move down to `"1` through `"9`, and the old `"9` is dropped.
    pub fn shift_numbered_ring(&mut self, cell: RegisterCell) {
        for n in (0..9u8).rev() {
            let from = RegisterName::Numbered(n);

            if let Some(prev) = self.cells.remove(&from) {
                self.set(RegisterName::Numbered(n + 1), prev);
            } else {
                self.macros.remove(&RegisterName::Numbered(n + 1));
                self.cells.remove(&RegisterName::Numbered(n + 1));
            }
        }

        self.set(RegisterName::Numbered(0), cell);
    }

    fn record(
        &mut self,
        target: Option<RegisterName>,
        cell: RegisterCell,
        small: bool,
    ) -> Result<(), RegisterError> {
        let target = target.unwrap_or(RegisterName::Unnamed);

        if target.is_read_only() {
            return Err(RegisterError::ReadOnly(target));
        }

        if target == RegisterName::Blackhole {
            return Ok(());
        }

        self.shift_numbered_ring(cell.clone());

        match target {
            RegisterName::Unnamed => {
                if small {
                    self.set(RegisterName::SmallDelete, cell.clone());
                }

                self.set(RegisterName::Unnamed, cell);
            },
            RegisterName::Named(_) => {
                self.write(target, &cell.text, cell.shape, false)?;
            },
            _ => {
                self.set(target, cell.clone());
                self.set(RegisterName::Unnamed, cell);
            },
        }

        return Ok(());
    }

    /// Record text that has just been yanked into `target`.
    pub fn record_yank(
        &mut self,
        target: Option<RegisterName>,
        cell: RegisterCell,
    ) -> Result<(), RegisterError> {
        self.record(target, cell, false)
    }

    /// Record text that has just been deleted into `target`.
    ///
    /// Deletions within a single line also update [RegisterName::SmallDelete].
    pub fn record_delete(
        &mut self,
        target: Option<RegisterName>,
        cell: RegisterCell,
    ) -> Result<(), RegisterError> {
        let small = cell.is_small();

        self.record(target, cell, small)
    }

    /// Update the text last typed in Insert mode.
    pub fn set_last_inserted(&mut self, text: &str) {
        self.set(RegisterName::LastInserted, RegisterCell::from(text));
    }

    /// Update the last entered command line.
    pub fn set_last_command(&mut self, text: &str) {
        self.set(RegisterName::LastCommand, RegisterCell::from(text));
    }

    /// Update the last search pattern.
    pub fn set_last_search(&mut self, text: &str) {
        self.set(RegisterName::LastSearch, RegisterCell::from(text));
    }

    /// Update the current file name.
    pub fn set_current_file(&mut self, text: &str) {
        self.set(RegisterName::CurrentFile, RegisterCell::from(text));
    }

    /// Store a recorded macro, as key notation, in a register.
    pub fn set_macro(
        &mut self,
        name: RegisterName,
        keys: &[KeyToken],
    ) -> Result<(), RegisterError> {
        let text = KeyToken::notate(keys);

        self.write(name, &text, RegisterShape::CharWise, false)?;

        if !name.is_append() && name != RegisterName::Blackhole {
            self.macros.insert(name.slot(), keys.to_vec());
        }

        return Ok(());
    }

    /// Get the keys stored in a register for replaying as a macro.
    ///
    /// Passing `None` replays the most recently replayed register. Parsed keys are cached until
    /// the register is next written.
    pub fn macro_keys(
        &mut self,
        name: Option<RegisterName>,
    ) -> Result<Vec<KeyToken>, InterpretError> {
        let name = match name.or(self.last_macro) {
            Some(name) => name.slot(),
            None => return Err(RegisterError::NoLastMacro.into()),
        };

        self.last_macro = Some(name);

        if let Some(keys) = self.macros.get(&name) {
            return Ok(keys.clone());
        }

        let text = self.read(name).map(|cell| cell.text).unwrap_or_default();
        let keys = KeyToken::from_macro_str(&text)?;

        self.macros.insert(name, keys.clone());

        return Ok(keys);
    }

    /// Clear every register, and every cached macro.
    pub fn reset_registers(&mut self) {
        self.cells.clear();
        self.macros.clear();
        self.last_macro = None;
    }
}
