//! # Digraphs
//!
//! ## Overview
//!
//! Typing [KeyToken::DIGRAPH] (`<C-K>`) followed by two characters enters a single character that
//! usually isn't on the keyboard, such as `<C-K>e'` for `é` or `<C-K>a*` for `α`. The
//! [DigraphStore] holds the table of known digraphs, and a [DigraphResolver] tracks how far
//! along an editing context is in typing one.
use std::collections::HashMap;
use std::iter::FromIterator;

use keytrie::InputKey;

use crate::key::KeyToken;

macro_rules! digraphs {
    { $( $c: literal <- $d1: literal + $d2: literal ),* $(,)? } => {
        [ $( (($d1, $d2), $c), )* ]
    };
}

#[rustfmt::skip]
const LATIN: [((char, char), char); 62] = digraphs! {
    'à' <- 'a' + '!', 'á' <- 'a' + '\'', 'â' <- 'a' + '>', 'ã' <- 'a' + '?', 'ä' <- 'a' + ':',
    'å' <- 'a' + 'a', 'æ' <- 'a' + 'e', 'ç' <- 'c' + ',',
    'è' <- 'e' + '!', 'é' <- 'e' + '\'', 'ê' <- 'e' + '>', 'ë' <- 'e' + ':',
    'ì' <- 'i' + '!', 'í' <- 'i' + '\'', 'î' <- 'i' + '>', 'ï' <- 'i' + ':',
    'ð' <- 'd' + '-', 'ñ' <- 'n' + '?',
    'ò' <- 'o' + '!', 'ó' <- 'o' + '\'', 'ô' <- 'o' + '>', 'õ' <- 'o' + '?', 'ö' <- 'o' + ':',
    'ø' <- 'o' + '/', 'œ' <- 'o' + 'e',
    'ù' <- 'u' + '!', 'ú' <- 'u' + '\'', 'û' <- 'u' + '>', 'ü' <- 'u' + ':',
    'ý' <- 'y' + '\'', 'ÿ' <- 'y' + ':', 'þ' <- 't' + 'h', 'ß' <- 's' + 's',
    'À' <- 'A' + '!', 'Á' <- 'A' + '\'', 'Â' <- 'A' + '>', 'Ã' <- 'A' + '?', 'Ä' <- 'A' + ':',
    'Å' <- 'A' + 'A', 'Æ' <- 'A' + 'E', 'Ç' <- 'C' + ',',
    'È' <- 'E' + '!', 'É' <- 'E' + '\'', 'Ê' <- 'E' + '>', 'Ë' <- 'E' + ':',
    'Ì' <- 'I' + '!', 'Í' <- 'I' + '\'', 'Î' <- 'I' + '>', 'Ï' <- 'I' + ':',
    'Ñ' <- 'N' + '?',
    'Ò' <- 'O' + '!', 'Ó' <- 'O' + '\'', 'Ô' <- 'O' + '>', 'Õ' <- 'O' + '?', 'Ö' <- 'O' + ':',
    'Ø' <- 'O' + '/', 'Œ' <- 'O' + 'E',
    'Ù' <- 'U' + '!', 'Ú' <- 'U' + '\'', 'Û' <- 'U' + '>', 'Ü' <- 'U' + ':',
    'Ý' <- 'Y' + '\''
};

#[rustfmt::skip]
const GREEK: [((char, char), char); 49] = digraphs! {
    'α' <- 'a' + '*', 'β' <- 'b' + '*', 'γ' <- 'g' + '*', 'δ' <- 'd' + '*', 'ε' <- 'e' + '*',
    'ζ' <- 'z' + '*', 'η' <- 'y' + '*', 'θ' <- 'h' + '*', 'ι' <- 'i' + '*', 'κ' <- 'k' + '*',
    'λ' <- 'l' + '*', 'μ' <- 'm' + '*', 'ν' <- 'n' + '*', 'ξ' <- 'c' + '*', 'ο' <- 'o' + '*',
    'π' <- 'p' + '*', 'ρ' <- 'r' + '*', 'σ' <- 's' + '*', 'ς' <- '*' + 's', 'τ' <- 't' + '*',
    'υ' <- 'u' + '*', 'φ' <- 'f' + '*', 'χ' <- 'x' + '*', 'ψ' <- 'q' + '*', 'ω' <- 'w' + '*',
    'Α' <- 'A' + '*', 'Β' <- 'B' + '*', 'Γ' <- 'G' + '*', 'Δ' <- 'D' + '*', 'Ε' <- 'E' + '*',
    'Ζ' <- 'Z' + '*', 'Η' <- 'Y' + '*', 'Θ' <- 'H' + '*', 'Ι' <- 'I' + '*', 'Κ' <- 'K' + '*',
    'Λ' <- 'L' + '*', 'Μ' <- 'M' + '*', 'Ν' <- 'N' + '*', 'Ξ' <- 'C' + '*', 'Ο' <- 'O' + '*',
    'Π' <- 'P' + '*', 'Ρ' <- 'R' + '*', 'Σ' <- 'S' + '*', 'Τ' <- 'T' + '*', 'Υ' <- 'U' + '*',
    'Φ' <- 'F' + '*', 'Χ' <- 'X' + '*', 'Ψ' <- 'Q' + '*', 'Ω' <- 'W' + '*'
};

#[rustfmt::skip]
const SYMBOLS: [((char, char), char); 48] = digraphs! {
    // Currency
    '¢' <- 'C' + 't', '£' <- 'P' + 'd', '¤' <- 'C' + 'u', '¥' <- 'Y' + 'e', '€' <- 'E' + 'u',
    '€' <- '=' + 'e',

    // Punctuation
    '¡' <- '!' + 'I', '¿' <- '?' + 'I', '«' <- '<' + '<', '»' <- '>' + '>', '§' <- 'S' + 'E',
    '¶' <- 'P' + 'I', '©' <- 'C' + 'o', '®' <- 'R' + 'g', '°' <- 'D' + 'G', '·' <- '.' + 'M',
    '–' <- '-' + 'N', '—' <- '-' + 'M', '‘' <- '\'' + '6', '’' <- '\'' + '9', '“' <- '"' + '6',
    '”' <- '"' + '9', '…' <- ',' + '.', '†' <- '/' + '-', '‡' <- '/' + '=',

    // Arrows
    '←' <- '<' + '-', '→' <- '-' + '>', '↑' <- '-' + '!', '↓' <- '-' + 'v', '↔' <- '<' + '>',
    '↕' <- 'U' + 'D',

    // Math
    '±' <- '+' + '-', '×' <- '*' + 'X', '÷' <- '-' + ':', '≤' <- '=' + '<', '≥' <- '>' + '=',
    '≠' <- '!' + '=', '≡' <- '=' + '3', '≈' <- '?' + '2', '∞' <- '0' + '0', '√' <- 'R' + 'T',
    '∈' <- '(' + '-', '∀' <- 'F' + 'A', '∃' <- 'T' + 'E', '∂' <- 'd' + 'P', '∇' <- 'N' + 'B',
    '∫' <- 'I' + 'n', '½' <- '1' + '2'
};

/// Storage for mapping digraphs onto their characters.
///
/// Looking up a digraph that isn't in the table also tries its two characters in the opposite
/// order, so that `<C-K>:a` enters `ä` just like `<C-K>a:`.
#[derive(Clone, Debug)]
pub struct DigraphStore {
    mappings: HashMap<(char, char), char>,
}

impl DigraphStore {
    /// Create an empty digraph store.
    pub fn new() -> Self {
        DigraphStore { mappings: HashMap::new() }
    }

    /// Create a store with digraphs from [RFC1345](https://datatracker.ietf.org/doc/html/rfc1345)
    /// for accented Latin letters, Greek letters, currency, punctuation, arrows and some math
    /// symbols.
    pub fn rfc1345() -> Self {
        LATIN.iter().chain(GREEK.iter()).chain(SYMBOLS.iter()).collect()
    }

    /// Create a new mapping from a digraph to a character.
    pub fn put(&mut self, digraph: (char, char), c: char) {
        self.mappings.insert(digraph, c);
    }

    /// Get the character, if it exists, that a digraph maps to.
    pub fn get(&self, digraph: (char, char)) -> Option<char> {
        let (d1, d2) = digraph;

        self.mappings
            .get(&digraph)
            .or_else(|| self.mappings.get(&(d2, d1)))
            .copied()
    }

    /// The number of digraphs in the table.
    pub fn len(&self) -> usize {
        self.mappings.len()
    }
}

impl FromIterator<((char, char), char)> for DigraphStore {
    fn from_iter<T: IntoIterator<Item = ((char, char), char)>>(digraphs: T) -> Self {
        let mut store = DigraphStore::new();

        for (digraph, c) in digraphs {
            store.put(digraph, c);
        }

        return store;
    }
}

impl<'a> FromIterator<&'a ((char, char), char)> for DigraphStore {
    fn from_iter<T: IntoIterator<Item = &'a ((char, char), char)>>(digraphs: T) -> Self {
        digraphs.into_iter().copied().collect()
    }
}

impl Default for DigraphStore {
    fn default() -> Self {
        DigraphStore::rfc1345()
    }
}

/// How far along a digraph is.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum DigraphState {
    /// No digraph is being typed.
    #[default]
    Idle,

    /// Waiting for the first character.
    First,

    /// Waiting for the second character, after the given first one.
    Second(char),
}

/// What happened after giving a key to a [DigraphResolver].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DigraphStep {
    /// Another character is needed.
    Pending,

    /// The digraph is complete, and produced this character.
    Emit(char),

    /// A key that isn't a character was typed, and the digraph was abandoned.
    Cancelled,

    /// The two characters don't form a known digraph.
    Unknown(char, char),
}

/// Tracks a digraph as it gets typed.
#[derive(Clone, Copy, Debug, Default)]
pub struct DigraphResolver {
    state: DigraphState,
}

impl DigraphResolver {
    /// Create an idle resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Where the resolver is in typing a digraph.
    pub fn state(&self) -> DigraphState {
        self.state
    }

    /// Whether keys should currently go to this resolver.
    pub fn is_active(&self) -> bool {
        self.state != DigraphState::Idle
    }

    /// Start typing a digraph.
    pub fn start(&mut self) {
        self.state = DigraphState::First;
    }

    /// Abandon any digraph being typed.
    pub fn cancel(&mut self) {
        self.state = DigraphState::Idle;
    }

    /// Process the next key of a digraph.
    pub fn input(&mut self, store: &DigraphStore, key: &KeyToken) -> DigraphStep {
        let Some(c) = key.get_char() else {
            tracing::trace!(key = %key, "digraph cancelled");
            self.cancel();

            return DigraphStep::Cancelled;
        };

        match self.state {
            DigraphState::Idle => {
                return DigraphStep::Cancelled;
            },
            DigraphState::First => {
                self.state = DigraphState::Second(c);

                return DigraphStep::Pending;
            },
            DigraphState::Second(d1) => {
                self.cancel();

                match store.get((d1, c)) {
                    Some(c) => return DigraphStep::Emit(c),
                    None => {
                        tracing::debug!(d1 = %d1, d2 = %c, "unknown digraph");

                        return DigraphStep::Unknown(d1, c);
                    },
                }
            },
        }
    }
}
