//! # Mapping terminal input
//!
//! Convert [crossterm] events into [KeyToken] values.
use crossterm::event::{
    Event,
    KeyCode as TermCode,
    KeyEvent,
    KeyEventKind,
    KeyModifiers as TermMods,
};

use super::{KeyCode, KeyModifiers, KeyToken};

/// Converts raw terminal key events into normalized [KeyToken] values.
///
/// Every key event produces a token. Events that have no representation (media keys, lock keys,
/// presses of a lone modifier, and keys held with Super or Hyper) become [KeyToken::UNKNOWN].
#[derive(Clone, Copy, Debug, Default)]
pub struct KeyMapper;

impl KeyMapper {
    fn code(code: TermCode) -> KeyCode {
        match code {
            TermCode::Char(c) => KeyCode::Char(c),
            TermCode::Esc => KeyCode::Esc,
            TermCode::Enter => KeyCode::Enter,
            TermCode::Tab => KeyCode::Tab,
            TermCode::BackTab => KeyCode::BackTab,
            TermCode::Backspace => KeyCode::Backspace,
            TermCode::Delete => KeyCode::Delete,
            TermCode::Insert => KeyCode::Insert,
            TermCode::Home => KeyCode::Home,
            TermCode::End => KeyCode::End,
            TermCode::PageUp => KeyCode::PageUp,
            TermCode::PageDown => KeyCode::PageDown,
            TermCode::Left => KeyCode::Left,
            TermCode::Right => KeyCode::Right,
            TermCode::Up => KeyCode::Up,
            TermCode::Down => KeyCode::Down,
            TermCode::Null => KeyCode::Null,

            // Terminals report Undo and Help as F14 and F15.
            TermCode::F(14) => KeyCode::Undo,
            TermCode::F(15) => KeyCode::Help,
            TermCode::F(n) => KeyCode::F(n),

            TermCode::CapsLock |
            TermCode::ScrollLock |
            TermCode::NumLock |
            TermCode::PrintScreen |
            TermCode::Pause |
            TermCode::Menu |
            TermCode::KeypadBegin |
            TermCode::Media(_) |
            TermCode::Modifier(_) => KeyCode::Unknown,
        }
    }

    fn modifiers(mods: TermMods) -> Option<KeyModifiers> {
        if mods.intersects(TermMods::SUPER | TermMods::HYPER) {
            return None;
        }

        let mut res = KeyModifiers::empty();

        if mods.contains(TermMods::CONTROL) {
            res |= KeyModifiers::CONTROL;
        }

        if mods.contains(TermMods::SHIFT) {
            res |= KeyModifiers::SHIFT;
        }

        if mods.intersects(TermMods::ALT | TermMods::META) {
            res |= KeyModifiers::ALT;
        }

        return Some(res);
    }

    /// Map a single key event.
    pub fn map(event: &KeyEvent) -> KeyToken {
        let Some(modifiers) = Self::modifiers(event.modifiers) else {
            return KeyToken::UNKNOWN;
        };

        KeyToken::new(Self::code(event.code), modifiers)
    }

    /// Map a terminal event, ignoring anything that isn't a key press.
    pub fn map_event(event: &Event) -> Option<KeyToken> {
        match event {
            Event::Key(ke) if ke.kind != KeyEventKind::Release => Some(Self::map(ke)),
            _ => None,
        }
    }

    /// Map a character, as delivered by hosts that only see text.
    pub fn map_char(c: char) -> KeyToken {
        KeyToken::new(KeyCode::Char(c), KeyModifiers::empty())
    }
}
