//! # Input keys
//!
//! ## Overview
//!
//! This module contains code for representing and processing keys.
//!
//! A [KeyToken] is the canonical form of a single key press. Tokens are normalized when they are
//! created, so that two presses which mean the same thing to Vim (like `<C-[>` and `<Esc>`)
//! always compare equal, and each token has exactly one canonical notation:
//!
//! ```
//! use vimgrammar::key::KeyToken;
//!
//! let key: KeyToken = "<C-[>".parse().unwrap();
//! assert_eq!(key.to_string(), "<Esc>");
//!
//! let key: KeyToken = "<M-x>".parse().unwrap();
//! assert_eq!(key.to_string(), "<A-x>");
//! ```
use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use keytrie::InputKey;

use self::parse::{parse_key_str, parse_macro_str};

pub mod mapper;
mod parse;

pub use self::mapper::KeyMapper;

/// Errors that occur while trying to use macros.
#[derive(thiserror::Error, Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum MacroError {
    /// Failure to interpret macro string.
    #[error("Invalid macro string: {0:?}")]
    InvalidMacro(String),

    /// Empty macro string.
    #[error("Empty macro string")]
    EmptyMacro,

    /// A macro that seems to be looping.
    #[error("Ending suspected macro loop; macro run {0} times w/o keyboard input")]
    LoopingMacro(usize),
}

bitflags! {
    /// Modifier keys held down during a key press.
    #[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
    pub struct KeyModifiers: u8 {
        /// The Control key.
        const CONTROL = 0b001;

        /// The Shift key.
        const SHIFT = 0b010;

        /// The Alt (or Meta) key.
        const ALT = 0b100;
    }
}

/// The key that was pressed, independent of modifiers.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum KeyCode {
    /// A character key.
    Char(char),
    /// Escape.
    Esc,
    /// Enter, or Return.
    Enter,
    /// Tab.
    Tab,
    /// Shift-Tab.
    BackTab,
    /// Backspace.
    Backspace,
    /// Delete.
    Delete,
    /// Insert.
    Insert,
    /// Home.
    Home,
    /// End.
    End,
    /// Page Up.
    PageUp,
    /// Page Down.
    PageDown,
    /// Left arrow.
    Left,
    /// Right arrow.
    Right,
    /// Up arrow.
    Up,
    /// Down arrow.
    Down,
    /// The NUL character.
    Null,
    /// A function key, from 1 through 35.
    F(u8),
    /// The virtual Undo key.
    Undo,
    /// The virtual Help key.
    Help,
    /// A key press that can't be represented by any other code.
    Unknown,
}

/// Broad classification of a [KeyToken].
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum KeyKind {
    /// A character typed without modifiers.
    Printable,
    /// A named key typed without modifiers.
    Special,
    /// Any key typed while holding a modifier.
    Modified,
    /// The sentinel for unrepresentable key presses.
    Unknown,
}

/// A single, normalized key press.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct KeyToken {
    code: KeyCode,
    modifiers: KeyModifiers,
}

impl KeyToken {
    /// The key that begins entering a digraph.
    pub const DIGRAPH: KeyToken = KeyToken {
        code: KeyCode::Char('k'),
        modifiers: KeyModifiers::CONTROL,
    };

    /// The virtual Undo key.
    pub const UNDO: KeyToken = KeyToken { code: KeyCode::Undo, modifiers: KeyModifiers::empty() };

    /// The token for key presses that can't be represented.
    pub const UNKNOWN: KeyToken = KeyToken {
        code: KeyCode::Unknown,
        modifiers: KeyModifiers::empty(),
    };

    /// Create a new token, normalizing equivalent key presses into the same value.
    pub fn new(code: KeyCode, mut modifiers: KeyModifiers) -> Self {
        match code {
            KeyCode::Char(c) => {
                let (c, extra) = match c {
                    '\t' => return KeyToken::new(KeyCode::Tab, modifiers),
                    '\r' => return KeyToken::new(KeyCode::Enter, modifiers),
                    '\u{1B}' => return KeyToken::new(KeyCode::Esc, modifiers),
                    '\u{7F}' => return KeyToken::new(KeyCode::Backspace, modifiers),
                    '\0' => return KeyToken::new(KeyCode::Null, modifiers),
                    '\u{01}'..='\u{1A}' => {
                        let c = char::from(c as u8 - 0x01 + b'a');
                        (c, KeyModifiers::CONTROL)
                    },
                    '\u{1C}'..='\u{1F}' => {
                        let c = char::from(c as u8 + 0x40);
                        (c, KeyModifiers::CONTROL)
                    },
                    c => (c, KeyModifiers::empty()),
                };

                modifiers |= extra;

                if modifiers.contains(KeyModifiers::CONTROL) {
                    let ctl = modifiers - KeyModifiers::CONTROL - KeyModifiers::SHIFT;

                    match c.to_ascii_lowercase() {
                        'i' => return KeyToken::new(KeyCode::Tab, ctl),
                        'm' => return KeyToken::new(KeyCode::Enter, ctl),
                        '[' => return KeyToken::new(KeyCode::Esc, ctl),
                        '?' => return KeyToken::new(KeyCode::Backspace, ctl),
                        '@' => return KeyToken::new(KeyCode::Null, ctl),
                        c => {
                            let modifiers = ctl | KeyModifiers::CONTROL;

                            return KeyToken { code: KeyCode::Char(c), modifiers };
                        },
                    }
                }

                // The character itself carries the case, so SHIFT is never kept.
                let c = if modifiers.contains(KeyModifiers::SHIFT) {
                    c.to_uppercase().next().unwrap_or(c)
                } else {
                    c
                };

                KeyToken { code: KeyCode::Char(c), modifiers: modifiers - KeyModifiers::SHIFT }
            },
            KeyCode::Tab if modifiers.contains(KeyModifiers::SHIFT) => {
                KeyToken { code: KeyCode::BackTab, modifiers: modifiers - KeyModifiers::SHIFT }
            },
            KeyCode::BackTab => {
                KeyToken { code: KeyCode::BackTab, modifiers: modifiers - KeyModifiers::SHIFT }
            },
            KeyCode::F(n) if n == 0 || n > 35 => KeyToken::UNKNOWN,
            KeyCode::Unknown => KeyToken::UNKNOWN,
            code => KeyToken { code, modifiers },
        }
    }

    /// The key that was pressed.
    pub fn code(&self) -> KeyCode {
        self.code
    }

    /// The modifiers held while pressing it.
    pub fn modifiers(&self) -> KeyModifiers {
        self.modifiers
    }

    /// Classify this token.
    pub fn kind(&self) -> KeyKind {
        match self.code {
            KeyCode::Unknown => KeyKind::Unknown,
            _ if !self.modifiers.is_empty() => KeyKind::Modified,
            KeyCode::Char(_) => KeyKind::Printable,
            _ => KeyKind::Special,
        }
    }

    /// If this is a decimal digit typed without modifiers, return its value.
    pub fn digit(&self) -> Option<usize> {
        let c = self.get_char()?;
        let d = c.to_digit(10)?;

        return Some(d as usize);
    }

    /// Whether this is a plain Escape key press.
    pub fn is_escape(&self) -> bool {
        self.code == KeyCode::Esc && self.modifiers.is_empty()
    }
}

impl From<char> for KeyToken {
    fn from(c: char) -> Self {
        KeyMapper::map_char(c)
    }
}

impl From<KeyCode> for KeyToken {
    fn from(code: KeyCode) -> Self {
        KeyToken::new(code, KeyModifiers::empty())
    }
}

impl From<crossterm::event::KeyEvent> for KeyToken {
    fn from(ke: crossterm::event::KeyEvent) -> Self {
        KeyMapper::map(&ke)
    }
}

impl FromStr for KeyToken {
    type Err = MacroError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        if input.is_empty() {
            return Err(MacroError::EmptyMacro);
        } else if let Ok((_, key)) = parse_key_str(input) {
            return Ok(key);
        } else {
            return Err(MacroError::InvalidMacro(input.to_string()));
        }
    }
}

fn push_mods(res: &mut String, modifiers: KeyModifiers) {
    if modifiers.contains(KeyModifiers::CONTROL) {
        res.push_str("C-");
    }

    if modifiers.contains(KeyModifiers::SHIFT) {
        res.push_str("S-");
    }

    if modifiers.contains(KeyModifiers::ALT) {
        res.push_str("A-");
    }
}

impl fmt::Display for KeyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut res = String::new();

        let push_named = |res: &mut String, modifiers: KeyModifiers, name: &str| {
            res.push('<');
            push_mods(res, modifiers);
            res.push_str(name);
            res.push('>');
        };

        let name = match self.code {
            KeyCode::Char(c) => {
                if self.modifiers.is_empty() {
                    match c {
                        '<' => res.push_str("<lt>"),
                        ' ' => res.push_str("<Space>"),
                        c => res.push(c),
                    }
                } else {
                    let c = match c {
                        '<' => "lt".to_string(),
                        ' ' => "Space".to_string(),
                        c if self.modifiers.contains(KeyModifiers::CONTROL) => {
                            c.to_ascii_uppercase().to_string()
                        },
                        c => c.to_string(),
                    };

                    push_named(&mut res, self.modifiers, c.as_str());
                }

                return f.write_str(&res);
            },
            KeyCode::F(n) => {
                push_named(&mut res, self.modifiers, format!("F{n}").as_str());

                return f.write_str(&res);
            },
            KeyCode::BackTab => {
                push_named(&mut res, self.modifiers | KeyModifiers::SHIFT, "Tab");

                return f.write_str(&res);
            },
            KeyCode::Esc => "Esc",
            KeyCode::Enter => "Enter",
            KeyCode::Tab => "Tab",
            KeyCode::Backspace => "BS",
            KeyCode::Delete => "Del",
            KeyCode::Insert => "Insert",
            KeyCode::Home => "Home",
            KeyCode::End => "End",
            KeyCode::PageUp => "PageUp",
            KeyCode::PageDown => "PageDown",
            KeyCode::Left => "Left",
            KeyCode::Right => "Right",
            KeyCode::Up => "Up",
            KeyCode::Down => "Down",
            KeyCode::Null => "Nul",
            KeyCode::Undo => "Undo",
            KeyCode::Help => "Help",
            KeyCode::Unknown => "Unknown",
        };

        push_named(&mut res, self.modifiers, name);

        f.write_str(&res)
    }
}

impl InputKey for KeyToken {
    type Error = MacroError;

    fn decompose(&mut self) -> Option<Self> {
        if let KeyCode::Char(_) = self.code {
            if self.modifiers.contains(KeyModifiers::ALT) {
                self.modifiers -= KeyModifiers::ALT;

                return Some(Self::from(KeyCode::Esc));
            }
        }

        return None;
    }

    fn from_macro_str(input: &str) -> Result<Vec<Self>, MacroError> {
        if input.is_empty() {
            return Err(MacroError::EmptyMacro);
        } else if let Ok((_, keys)) = parse_macro_str(input) {
            return Ok(keys);
        } else {
            return Err(MacroError::InvalidMacro(input.to_string()));
        }
    }

    fn get_char(&self) -> Option<char> {
        match self.code {
            KeyCode::Char(c) if self.modifiers.is_empty() => Some(c),
            _ => None,
        }
    }

    fn notate(keys: &[Self]) -> String {
        keys.iter().map(ToString::to_string).collect()
    }
}
