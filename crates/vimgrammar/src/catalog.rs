//! # Action catalogs
//!
//! ## Overview
//!
//! A [Catalog] lists every binding the interpreter knows about: the modes it applies in, the keys
//! that invoke it, and the [ActionDescriptor] it invokes. [Catalog::vim] provides the default
//! Vim bindings, and [Catalog::build] turns a catalog into the shared [VimTrie].
//!
//! Building fails when two different actions are bound to the same keys in the same mode, or
//! when an action that takes an argument would hide longer bindings.
use bitflags::bitflags;

use keytrie::{CommandTrie, InputKey, TrieBuilder};

use crate::action::{ActionDescriptor, ActionFlags, Builtin, RegisterEffect};
use crate::errors::CatalogError;
use crate::key::KeyToken;
use crate::mode::{MappingMode, VimMode, VisualKind};

/// The command trie used by the Vim interpreter.
pub type VimTrie = CommandTrie<MappingMode, KeyToken, ActionDescriptor>;

bitflags! {
    /// The modes a catalog entry applies to.
    #[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
    pub struct MappedModes: u8 {
        /// Normal mode.
        const N = 0b0001;

        /// Visual modes.
        const V = 0b0010;

        /// Operator-Pending mode.
        const O = 0b0100;

        /// Insert and Replace modes.
        const I = 0b1000;

        /// Normal and Visual modes.
        const NV = MappedModes::N.bits() | MappedModes::V.bits();

        /// Normal, Visual and Operator-Pending modes.
        const NVO = MappedModes::N.bits() | MappedModes::V.bits() | MappedModes::O.bits();

        /// Visual and Operator-Pending modes.
        const VO = MappedModes::V.bits() | MappedModes::O.bits();
    }
}

impl MappedModes {
    /// The mapping modes selected by these flags.
    pub fn mapping_modes(&self) -> impl Iterator<Item = MappingMode> + '_ {
        MappingMode::ALL.into_iter().filter(|mode| {
            let flag = match mode {
                MappingMode::Normal => MappedModes::N,
                MappingMode::Visual => MappedModes::V,
                MappingMode::OperatorPending => MappedModes::O,
                MappingMode::Insert => MappedModes::I,
            };

            self.contains(flag)
        })
    }
}

const MAP: MappedModes = MappedModes::NVO;
const NVMAP: MappedModes = MappedModes::NV;
const VOMAP: MappedModes = MappedModes::VO;

const NMAP: MappedModes = MappedModes::N;
const VMAP: MappedModes = MappedModes::V;
const IMAP: MappedModes = MappedModes::I;

/// A single binding in a [Catalog].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CatalogEntry {
    /// The modes this binding applies in.
    pub modes: MappedModes,

    /// The keys that invoke the action, in key notation.
    pub keys: String,

    /// The bound action.
    pub action: ActionDescriptor,
}

/// A list of key bindings.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog with the default Vim bindings.
    pub fn vim() -> Self {
        let mut catalog = Catalog::new();

        for (modes, keys, action) in default_motions()
            .into_iter()
            .chain(default_objects())
            .chain(default_operators())
            .chain(default_normal())
            .chain(default_visual())
            .chain(default_insert())
        {
            catalog.add(modes, keys, action);
        }

        return catalog;
    }

    /// Bind `keys`, given in key notation, to an action in the given modes.
    pub fn add(&mut self, modes: MappedModes, keys: &str, action: ActionDescriptor) -> &mut Self {
        self.entries.push(CatalogEntry { modes, keys: keys.to_string(), action });
        self
    }

    /// The bindings in this catalog.
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Build the command trie for this catalog.
    pub fn build(&self) -> Result<VimTrie, CatalogError> {
        let mut builder = TrieBuilder::new();
        let mut arguments = vec![];

        for mode in MappingMode::ALL {
            builder.add_mode(mode);
        }

        for entry in self.entries.iter() {
            let keys = KeyToken::from_macro_str(&entry.keys)
                .map_err(|e| CatalogError::InvalidKeys(entry.keys.clone(), e))?;

            for mode in entry.modes.mapping_modes() {
                let node = builder.insert(mode, &keys, entry.action)?;

                if entry.action.needs_argument() {
                    arguments.push((node, mode, &entry.keys));
                }
            }
        }

        let trie = builder.build();

        for (node, mode, keys) in arguments {
            if trie.has_children(node) {
                let err = CatalogError::ShadowedArgument(format!("{mode:?} {keys}"));

                tracing::warn!(%err, "rejecting catalog");

                return Err(err);
            }
        }

        tracing::debug!(bindings = self.entries.len(), nodes = trie.len(), "built command trie");

        return Ok(trie);
    }
}

fn motion(name: &'static str, flags: ActionFlags) -> ActionDescriptor {
    ActionDescriptor::motion(name).with(ActionFlags::COUNT | flags)
}

fn object(name: &'static str) -> ActionDescriptor {
    ActionDescriptor::text_object(name).with(ActionFlags::COUNT)
}

fn operator(name: &'static str, effect: RegisterEffect) -> ActionDescriptor {
    ActionDescriptor::operator(name)
        .with(ActionFlags::COUNT | ActionFlags::REGISTER)
        .effect(effect)
}

fn command(name: &'static str, flags: ActionFlags) -> ActionDescriptor {
    ActionDescriptor::command(name).with(flags)
}

fn edit(name: &'static str, effect: RegisterEffect) -> ActionDescriptor {
    ActionDescriptor::command(name)
        .with(ActionFlags::COUNT | ActionFlags::REGISTER)
        .effect(effect)
}

fn insert(name: &'static str) -> ActionDescriptor {
    ActionDescriptor::command(name).with(ActionFlags::COUNT).enters(VimMode::Insert)
}

fn visual(kind: VisualKind) -> ActionDescriptor {
    let name = match kind {
        VisualKind::Char => "visual",
        VisualKind::Line => "visual-line",
        VisualKind::Block => "visual-block",
    };

    ActionDescriptor::command(name)
        .with(ActionFlags::KEEP_VISUAL)
        .enters(VimMode::Visual(kind))
}

fn normal() -> ActionDescriptor {
    ActionDescriptor::command("normal").enters(VimMode::Normal)
}

/// The motion a doubled operator (`dd`, `>>`, `g~~`) applies to.
fn line() -> ActionDescriptor {
    motion("line", ActionFlags::LINEWISE)
}

const NONE: ActionFlags = ActionFlags::empty();
const LINEWISE: ActionFlags = ActionFlags::LINEWISE;
const EXCLUSIVE: ActionFlags = ActionFlags::EXCLUSIVE;
const ARGUMENT: ActionFlags = ActionFlags::ARGUMENT;

#[rustfmt::skip]
fn default_motions() -> Vec<(MappedModes, &'static str, ActionDescriptor)> {
    [
        // Characters and lines.
        ( MAP, "h", motion("left", EXCLUSIVE) ),
        ( MAP, "l", motion("right", EXCLUSIVE) ),
        ( MAP, "j", motion("down", LINEWISE) ),
        ( MAP, "k", motion("up", LINEWISE) ),
        ( MAP, "<Left>", motion("left", EXCLUSIVE) ),
        ( MAP, "<Right>", motion("right", EXCLUSIVE) ),
        ( MAP, "<Up>", motion("up", LINEWISE) ),
        ( MAP, "<Down>", motion("down", LINEWISE) ),
        ( MAP, "<BS>", motion("left-wrap", EXCLUSIVE) ),
        ( MAP, "<C-H>", motion("left-wrap", EXCLUSIVE) ),
        ( MAP, "<Space>", motion("right-wrap", EXCLUSIVE) ),
        ( MAP, "<C-J>", motion("down", LINEWISE) ),
        ( MAP, "<C-N>", motion("down", LINEWISE) ),
        ( MAP, "<C-P>", motion("up", LINEWISE) ),
        ( MAP, "gj", motion("screen-down", LINEWISE) ),
        ( MAP, "gk", motion("screen-up", LINEWISE) ),
        ( MAP, "+", motion("first-word-down", LINEWISE) ),
        ( MAP, "<Enter>", motion("first-word-down", LINEWISE) ),
        ( MAP, "-", motion("first-word-up", LINEWISE) ),
        ( MAP, "_", motion("first-word-line", LINEWISE) ),

        // Positions within a line.
        ( MAP, "0", ActionDescriptor::motion("line-start").with(EXCLUSIVE) ),
        ( MAP, "<Home>", ActionDescriptor::motion("line-start").with(EXCLUSIVE) ),
        ( MAP, "^", ActionDescriptor::motion("first-word").with(EXCLUSIVE) ),
        ( MAP, "$", motion("line-end", NONE) ),
        ( MAP, "<End>", motion("line-end", NONE) ),
        ( MAP, "g_", motion("last-word", NONE) ),
        ( MAP, "g0", ActionDescriptor::motion("screen-line-start").with(EXCLUSIVE) ),
        ( MAP, "g$", motion("screen-line-end", NONE) ),
        ( MAP, "gm", ActionDescriptor::motion("screen-line-middle").with(EXCLUSIVE) ),
        ( MAP, "|", motion("column", EXCLUSIVE) ),

        // Words.
        ( MAP, "w", motion("word-begin-next", EXCLUSIVE) ),
        ( MAP, "W", motion("bigword-begin-next", EXCLUSIVE) ),
        ( MAP, "b", motion("word-begin-prev", EXCLUSIVE) ),
        ( MAP, "B", motion("bigword-begin-prev", EXCLUSIVE) ),
        ( MAP, "e", motion("word-end-next", NONE) ),
        ( MAP, "E", motion("bigword-end-next", NONE) ),
        ( MAP, "ge", motion("word-end-prev", NONE) ),
        ( MAP, "gE", motion("bigword-end-prev", NONE) ),
        ( MAP, "<S-Right>", motion("word-begin-next", EXCLUSIVE) ),
        ( MAP, "<S-Left>", motion("word-begin-prev", EXCLUSIVE) ),
        ( MAP, "<C-Right>", motion("bigword-begin-next", EXCLUSIVE) ),
        ( MAP, "<C-Left>", motion("bigword-begin-prev", EXCLUSIVE) ),

        // Character searches.
        ( MAP, "f", motion("find-forward", ARGUMENT) ),
        ( MAP, "F", motion("find-backward", ARGUMENT | EXCLUSIVE) ),
        ( MAP, "t", motion("till-forward", ARGUMENT) ),
        ( MAP, "T", motion("till-backward", ARGUMENT | EXCLUSIVE) ),
        ( MAP, ";", motion("repeat-find", NONE) ),
        ( MAP, ",", motion("repeat-find-reverse", NONE) ),

        // Larger movements.
        ( MAP, "G", motion("goto-line", LINEWISE) ),
        ( MAP, "gg", motion("goto-first-line", LINEWISE) ),
        ( MAP, "H", motion("screen-top", LINEWISE) ),
        ( MAP, "M", ActionDescriptor::motion("screen-middle").with(LINEWISE) ),
        ( MAP, "L", motion("screen-bottom", LINEWISE) ),
        ( MAP, "%", motion("match-pair", NONE) ),
        ( MAP, "(", motion("sentence-prev", EXCLUSIVE) ),
        ( MAP, ")", motion("sentence-next", EXCLUSIVE) ),
        ( MAP, "{", motion("paragraph-prev", EXCLUSIVE) ),
        ( MAP, "}", motion("paragraph-next", EXCLUSIVE) ),
        ( MAP, "[[", motion("section-begin-prev", EXCLUSIVE) ),
        ( MAP, "]]", motion("section-begin-next", EXCLUSIVE) ),
        ( MAP, "[]", motion("section-end-prev", EXCLUSIVE) ),
        ( MAP, "][", motion("section-end-next", EXCLUSIVE) ),

        // Searches and marks.
        ( MAP, "n", motion("search-next", EXCLUSIVE) ),
        ( MAP, "N", motion("search-prev", EXCLUSIVE) ),
        ( MAP, "*", motion("search-word-next", EXCLUSIVE) ),
        ( MAP, "#", motion("search-word-prev", EXCLUSIVE) ),
        ( MAP, "`", ActionDescriptor::motion("goto-mark").with(ARGUMENT | EXCLUSIVE) ),
        ( MAP, "'", ActionDescriptor::motion("goto-mark-line").with(ARGUMENT | LINEWISE) ),
    ].to_vec()
}

#[rustfmt::skip]
fn default_objects() -> Vec<(MappedModes, &'static str, ActionDescriptor)> {
    [
        ( VOMAP, "iw", object("inner-word") ),
        ( VOMAP, "aw", object("a-word") ),
        ( VOMAP, "iW", object("inner-bigword") ),
        ( VOMAP, "aW", object("a-bigword") ),
        ( VOMAP, "is", object("inner-sentence") ),
        ( VOMAP, "as", object("a-sentence") ),
        ( VOMAP, "ip", object("inner-paragraph") ),
        ( VOMAP, "ap", object("a-paragraph") ),
        ( VOMAP, "i(", object("inner-paren") ),
        ( VOMAP, "a(", object("a-paren") ),
        ( VOMAP, "i)", object("inner-paren") ),
        ( VOMAP, "a)", object("a-paren") ),
        ( VOMAP, "ib", object("inner-paren") ),
        ( VOMAP, "ab", object("a-paren") ),
        ( VOMAP, "i{", object("inner-brace") ),
        ( VOMAP, "a{", object("a-brace") ),
        ( VOMAP, "i}", object("inner-brace") ),
        ( VOMAP, "a}", object("a-brace") ),
        ( VOMAP, "iB", object("inner-brace") ),
        ( VOMAP, "aB", object("a-brace") ),
        ( VOMAP, "i[", object("inner-bracket") ),
        ( VOMAP, "a[", object("a-bracket") ),
        ( VOMAP, "i]", object("inner-bracket") ),
        ( VOMAP, "a]", object("a-bracket") ),
        ( VOMAP, "i<lt>", object("inner-angle") ),
        ( VOMAP, "a<lt>", object("a-angle") ),
        ( VOMAP, "i>", object("inner-angle") ),
        ( VOMAP, "a>", object("a-angle") ),
        ( VOMAP, "i\"", object("inner-double-quote") ),
        ( VOMAP, "a\"", object("a-double-quote") ),
        ( VOMAP, "i'", object("inner-single-quote") ),
        ( VOMAP, "a'", object("a-single-quote") ),
        ( VOMAP, "i`", object("inner-backtick") ),
        ( VOMAP, "a`", object("a-backtick") ),
        ( VOMAP, "it", object("inner-tag") ),
        ( VOMAP, "at", object("a-tag") ),
    ].to_vec()
}

#[rustfmt::skip]
fn default_operators() -> Vec<(MappedModes, &'static str, ActionDescriptor)> {
    let change = operator("change", RegisterEffect::Delete).enters(VimMode::Insert);

    [
        ( NVMAP, "d", operator("delete", RegisterEffect::Delete) ),
        ( NVMAP, "y", operator("yank", RegisterEffect::Yank) ),
        ( NVMAP, "c", change ),
        ( NVMAP, "<lt>", operator("indent-decrease", RegisterEffect::None) ),
        ( NVMAP, ">", operator("indent-increase", RegisterEffect::None) ),
        ( NVMAP, "=", operator("format", RegisterEffect::None) ),
        ( NVMAP, "!", operator("filter", RegisterEffect::None) ),
        ( NVMAP, "gu", operator("lowercase", RegisterEffect::None) ),
        ( NVMAP, "gU", operator("uppercase", RegisterEffect::None) ),
        ( NVMAP, "g~", operator("toggle-case", RegisterEffect::None) ),
        ( NVMAP, "g?", operator("rot13", RegisterEffect::None) ),
        ( NVMAP, "gq", operator("format-text", RegisterEffect::None) ),
        ( NVMAP, "zf", operator("fold-create", RegisterEffect::None) ),

        // Typing an operator twice applies it to whole lines.
        ( NMAP, "dd", line() ),
        ( NMAP, "yy", line() ),
        ( NMAP, "cc", line() ),
        ( NMAP, "<lt><lt>", line() ),
        ( NMAP, ">>", line() ),
        ( NMAP, "==", line() ),
        ( NMAP, "!!", line() ),
        ( NMAP, "guu", line() ),
        ( NMAP, "gugu", line() ),
        ( NMAP, "gUU", line() ),
        ( NMAP, "gUgU", line() ),
        ( NMAP, "g~~", line() ),
        ( NMAP, "g~g~", line() ),
        ( NMAP, "g??", line() ),
        ( NMAP, "g?g?", line() ),
        ( NMAP, "gqq", line() ),
        ( NMAP, "gqgq", line() ),
    ].to_vec()
}

#[rustfmt::skip]
fn default_normal() -> Vec<(MappedModes, &'static str, ActionDescriptor)> {
    [
        // Deleting, changing and yanking.
        ( NMAP, "x", edit("delete-char", RegisterEffect::Delete) ),
        ( NMAP, "<Del>", edit("delete-char", RegisterEffect::Delete) ),
        ( NMAP, "X", edit("delete-char-before", RegisterEffect::Delete) ),
        ( NMAP, "D", edit("delete-line-end", RegisterEffect::Delete) ),
        ( NMAP, "C", edit("change-line-end", RegisterEffect::Delete).enters(VimMode::Insert) ),
        ( NMAP, "s", edit("substitute-char", RegisterEffect::Delete).enters(VimMode::Insert) ),
        ( NMAP, "S", edit("substitute-line", RegisterEffect::Delete).enters(VimMode::Insert) ),
        ( NMAP, "Y", edit("yank-line", RegisterEffect::Yank).with(LINEWISE) ),
        ( NMAP, "p", edit("put-after", RegisterEffect::Put) ),
        ( NMAP, "P", edit("put-before", RegisterEffect::Put) ),
        ( NMAP, "gp", edit("put-after-move", RegisterEffect::Put) ),
        ( NMAP, "gP", edit("put-before-move", RegisterEffect::Put) ),
        ( NMAP, "]p", edit("put-after-indent", RegisterEffect::Put) ),
        ( NMAP, "[p", edit("put-before-indent", RegisterEffect::Put) ),
        ( NMAP, "r", command("replace-char", ActionFlags::COUNT | ARGUMENT) ),
        ( NMAP, "J", command("join-lines", ActionFlags::COUNT) ),
        ( NMAP, "gJ", command("join-lines-raw", ActionFlags::COUNT) ),
        ( NMAP, "~", command("toggle-case-char", ActionFlags::COUNT) ),
        ( NMAP, "<C-A>", command("increment", ActionFlags::COUNT) ),
        ( NMAP, "<C-X>", command("decrement", ActionFlags::COUNT) ),
        ( NMAP, "&", command("repeat-substitute", NONE) ),

        // Entering other modes.
        ( NMAP, "i", insert("insert-before") ),
        ( NMAP, "<Insert>", insert("insert-before") ),
        ( NMAP, "a", insert("insert-after") ),
        ( NMAP, "I", insert("insert-line-start") ),
        ( NMAP, "A", insert("insert-line-end") ),
        ( NMAP, "gI", insert("insert-column-zero") ),
        ( NMAP, "gi", insert("insert-last-position") ),
        ( NMAP, "o", insert("open-line-below") ),
        ( NMAP, "O", insert("open-line-above") ),
        ( NMAP, "R", command("replace-mode", ActionFlags::COUNT).enters(VimMode::Replace) ),
        ( NMAP, "v", visual(VisualKind::Char) ),
        ( NMAP, "V", visual(VisualKind::Line) ),
        ( NMAP, "<C-V>", visual(VisualKind::Block) ),
        ( NMAP, "gv", command("reselect", NONE).enters(VimMode::Visual(VisualKind::Char)) ),

        // History, macros and marks.
        ( NMAP, "u", command("undo", ActionFlags::COUNT) ),
        ( NMAP, "<Undo>", command("undo", ActionFlags::COUNT) ),
        ( NMAP, "U", command("undo-line", NONE) ),
        ( NMAP, "<C-R>", command("redo", ActionFlags::COUNT) ),
        ( NMAP, ".", command("repeat", ActionFlags::COUNT).builtin(Builtin::RepeatLast) ),
        ( NMAP, "q", command("record-macro", ARGUMENT).builtin(Builtin::RecordMacro) ),
        ( NMAP, "@", command("replay-macro", ActionFlags::COUNT | ARGUMENT).builtin(Builtin::ReplayMacro) ),
        ( NMAP, "m", command("set-mark", ARGUMENT) ),
        ( NMAP, "<C-O>", command("jump-older", ActionFlags::COUNT) ),
        ( NMAP, "<Tab>", command("jump-newer", ActionFlags::COUNT) ),

        // Scrolling and redrawing.
        ( NMAP, "<C-E>", command("scroll-line-down", ActionFlags::COUNT) ),
        ( NMAP, "<C-Y>", command("scroll-line-up", ActionFlags::COUNT) ),
        ( NMAP, "<C-D>", command("scroll-half-down", ActionFlags::COUNT) ),
        ( NMAP, "<C-U>", command("scroll-half-up", ActionFlags::COUNT) ),
        ( NMAP, "<C-F>", command("scroll-page-down", ActionFlags::COUNT) ),
        ( NMAP, "<C-B>", command("scroll-page-up", ActionFlags::COUNT) ),
        ( NMAP, "zz", command("scroll-cursor-middle", ActionFlags::COUNT) ),
        ( NMAP, "zt", command("scroll-cursor-top", ActionFlags::COUNT) ),
        ( NMAP, "zb", command("scroll-cursor-bottom", ActionFlags::COUNT) ),
        ( NMAP, "<C-L>", command("redraw", NONE) ),
        ( NMAP, "<C-G>", command("file-info", NONE) ),

        // Windows and files.
        ( NMAP, "<C-W>w", command("window-next", ActionFlags::COUNT) ),
        ( NMAP, "<C-W><C-W>", command("window-next", ActionFlags::COUNT) ),
        ( NMAP, "<C-W>h", command("window-left", ActionFlags::COUNT) ),
        ( NMAP, "<C-W>j", command("window-down", ActionFlags::COUNT) ),
        ( NMAP, "<C-W>k", command("window-up", ActionFlags::COUNT) ),
        ( NMAP, "<C-W>l", command("window-right", ActionFlags::COUNT) ),
        ( NMAP, "<C-W>s", command("window-split", ActionFlags::COUNT) ),
        ( NMAP, "<C-W>v", command("window-vsplit", ActionFlags::COUNT) ),
        ( NMAP, "<C-W>c", command("window-close", NONE) ),
        ( NMAP, "<C-W>o", command("window-only", NONE) ),
        ( NMAP, "<C-W>q", command("window-quit", NONE) ),
        ( NMAP, "ZZ", command("write-quit", NONE) ),
        ( NMAP, "ZQ", command("quit", NONE) ),
        ( NMAP, "<C-]>", command("goto-tag", NONE) ),
        ( NMAP, "K", command("keyword-lookup", NONE) ),
        ( NMAP, "<Help>", command("help", NONE) ),
        ( NMAP, "<F1>", command("help", NONE) ),
    ].to_vec()
}

#[rustfmt::skip]
fn default_visual() -> Vec<(MappedModes, &'static str, ActionDescriptor)> {
    let keep = ActionFlags::KEEP_VISUAL;

    [
        ( VMAP, "<Esc>", normal() ),
        ( VMAP, "<C-C>", normal() ),
        ( VMAP, "v", visual(VisualKind::Char) ),
        ( VMAP, "V", visual(VisualKind::Line) ),
        ( VMAP, "<C-V>", visual(VisualKind::Block) ),
        ( VMAP, "o", command("swap-anchor", keep) ),
        ( VMAP, "O", command("swap-anchor-column", keep) ),

        // Single keys that act on the whole selection.
        ( VMAP, "x", operator("delete", RegisterEffect::Delete) ),
        ( VMAP, "<Del>", operator("delete", RegisterEffect::Delete) ),
        ( VMAP, "s", operator("change", RegisterEffect::Delete).enters(VimMode::Insert) ),
        ( VMAP, "X", edit("delete-lines", RegisterEffect::Delete).with(LINEWISE) ),
        ( VMAP, "D", edit("delete-lines", RegisterEffect::Delete).with(LINEWISE) ),
        ( VMAP, "Y", edit("yank-lines", RegisterEffect::Yank).with(LINEWISE) ),
        ( VMAP, "C", edit("change-lines", RegisterEffect::Delete).enters(VimMode::Insert) ),
        ( VMAP, "S", edit("change-lines", RegisterEffect::Delete).enters(VimMode::Insert) ),
        ( VMAP, "R", edit("change-lines", RegisterEffect::Delete).enters(VimMode::Insert) ),
        ( VMAP, "u", operator("lowercase", RegisterEffect::None) ),
        ( VMAP, "U", operator("uppercase", RegisterEffect::None) ),
        ( VMAP, "~", operator("toggle-case", RegisterEffect::None) ),
        ( VMAP, "J", command("join-lines", NONE) ),
        ( VMAP, "gJ", command("join-lines-raw", NONE) ),
        ( VMAP, "r", command("replace-selection", ARGUMENT) ),
        ( VMAP, "p", edit("put-replace", RegisterEffect::Put) ),
        ( VMAP, "P", edit("put-replace-keep", RegisterEffect::Put) ),
        ( VMAP, "I", insert("insert-block-start") ),
        ( VMAP, "A", insert("insert-block-end") ),
    ].to_vec()
}

#[rustfmt::skip]
fn default_insert() -> Vec<(MappedModes, &'static str, ActionDescriptor)> {
    let put = ActionDescriptor::command("insert-register")
        .with(ARGUMENT | ActionFlags::REGISTER)
        .effect(RegisterEffect::Put);

    [
        ( IMAP, "<Esc>", normal() ),
        ( IMAP, "<C-C>", normal() ),
        ( IMAP, "<Insert>", command("toggle-replace", NONE).enters(VimMode::Replace) ),
        ( IMAP, "<C-R>", put ),
        ( IMAP, "<C-V>", command("insert-literal", ARGUMENT) ),
        ( IMAP, "<C-Q>", command("insert-literal", ARGUMENT) ),
        ( IMAP, "<C-W>", command("delete-word-before", NONE) ),
        ( IMAP, "<C-U>", command("delete-line-before", NONE) ),
        ( IMAP, "<BS>", command("delete-char-before", NONE) ),
        ( IMAP, "<C-H>", command("delete-char-before", NONE) ),
        ( IMAP, "<Del>", command("delete-char", NONE) ),
        ( IMAP, "<C-T>", command("indent-increase-line", NONE) ),
        ( IMAP, "<C-D>", command("indent-decrease-line", NONE) ),
        ( IMAP, "<C-E>", command("copy-char-below", NONE) ),
        ( IMAP, "<C-Y>", command("copy-char-above", NONE) ),
        ( IMAP, "<C-N>", command("complete-next", NONE) ),
        ( IMAP, "<C-P>", command("complete-prev", NONE) ),
        ( IMAP, "<Left>", ActionDescriptor::motion("left") ),
        ( IMAP, "<Right>", ActionDescriptor::motion("right") ),
        ( IMAP, "<Up>", ActionDescriptor::motion("up") ),
        ( IMAP, "<Down>", ActionDescriptor::motion("down") ),
        ( IMAP, "<Home>", ActionDescriptor::motion("line-start") ),
        ( IMAP, "<End>", ActionDescriptor::motion("line-end") ),
    ].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use keytrie::Lookup;

    fn keys(s: &str) -> Vec<KeyToken> {
        KeyToken::from_macro_str(s).unwrap()
    }

    #[test]
    fn test_vim_catalog_builds() {
        let trie = Catalog::vim().build().unwrap();

        for mode in MappingMode::ALL {
            assert!(trie.root(mode).is_some());
        }

        assert!(matches!(
            trie.lookup(MappingMode::Normal, &keys("d")),
            Lookup::Ambiguous(_, ActionDescriptor { name: "delete", .. })
        ));
        assert!(matches!(
            trie.lookup(MappingMode::Normal, &keys("dd")),
            Lookup::Leaf(_, ActionDescriptor { name: "line", .. })
        ));
        assert!(matches!(
            trie.lookup(MappingMode::Normal, &keys("0")),
            Lookup::Leaf(_, ActionDescriptor { name: "line-start", .. })
        ));
        assert!(matches!(trie.lookup(MappingMode::Normal, &keys("<C-W>")), Lookup::Prefix(_)));
        assert!(matches!(trie.lookup(MappingMode::OperatorPending, &keys("i")), Lookup::Prefix(_)));
        assert!(matches!(
            trie.lookup(MappingMode::OperatorPending, &keys("i(")),
            Lookup::Leaf(_, ActionDescriptor { name: "inner-paren", .. })
        ));
        assert!(matches!(
            trie.lookup(MappingMode::Visual, &keys("x")),
            Lookup::Leaf(_, ActionDescriptor { name: "delete", .. })
        ));

        // Text objects only exist after an operator or in Visual mode.
        assert!(matches!(
            trie.lookup(MappingMode::Normal, &keys("i")),
            Lookup::Leaf(_, ActionDescriptor { name: "insert-before", .. })
        ));

        // Insert mode only has a few bindings.
        assert_eq!(trie.lookup(MappingMode::Insert, &keys("a")), Lookup::Unmatched);
        assert!(matches!(
            trie.lookup(MappingMode::Insert, &keys("<Esc>")),
            Lookup::Leaf(_, ActionDescriptor { enter: Some(VimMode::Normal), .. })
        ));
    }

    #[test]
    fn test_argument_bindings_are_leaves() {
        let catalog = Catalog::vim();
        let trie = catalog.build().unwrap();

        for entry in catalog.entries() {
            if !entry.action.needs_argument() {
                continue;
            }

            for mode in entry.modes.mapping_modes() {
                let res = trie.lookup(mode, &keys(&entry.keys));
                assert!(matches!(res, Lookup::Leaf(_, _)), "{} in {mode:?}", entry.keys);
            }
        }
    }

    #[test]
    fn test_conflict() {
        let mut catalog = Catalog::new();
        catalog.add(NMAP, "x", ActionDescriptor::command("delete-char"));
        catalog.add(MAP, "x", ActionDescriptor::motion("x-marks-the-spot"));

        assert!(matches!(catalog.build(), Err(CatalogError::Conflict(_))));

        // The same action can be bound twice.
        let mut catalog = Catalog::new();
        catalog.add(NMAP, "x", ActionDescriptor::command("delete-char"));
        catalog.add(NMAP, "x", ActionDescriptor::command("delete-char"));
        assert!(catalog.build().is_ok());
    }

    #[test]
    fn test_invalid_catalogs() {
        let mut catalog = Catalog::new();
        catalog.add(NMAP, "", ActionDescriptor::command("nothing"));
        assert!(matches!(catalog.build(), Err(CatalogError::InvalidKeys(_, _))));

        let mut catalog = Catalog::new();
        catalog.add(NMAP, "f", ActionDescriptor::motion("find").with(ARGUMENT));
        catalog.add(NMAP, "fo", ActionDescriptor::motion("foo"));
        assert_eq!(
            catalog.build().err(),
            Some(CatalogError::ShadowedArgument("Normal f".into()))
        );
    }

    #[test]
    fn test_mapped_modes() {
        let modes = MAP.mapping_modes().collect::<Vec<_>>();
        assert_eq!(
            modes,
            vec![MappingMode::Normal, MappingMode::Visual, MappingMode::OperatorPending]
        );

        let modes = IMAP.mapping_modes().collect::<Vec<_>>();
        assert_eq!(modes, vec![MappingMode::Insert]);
    }
}
