//! # Command builder
//!
//! ## Overview
//!
//! A [CommandBuilder] reads one [KeyToken] at a time and assembles the Vim grammar around the
//! bindings in a [VimTrie]: counts, register names, operators waiting for a motion, and actions
//! that take the following key as an argument. Each call to [CommandBuilder::advance] reports
//! whether the keys so far form a complete [Command], might still become one, or never will.
//!
//! When a binding is also the start of longer ones (`g` next to `gg` in a custom catalog), the
//! builder arms its [Timer] and waits. The shorter binding fires when the timer's ticket is handed
//! back through [CommandBuilder::timeout], when the host calls [CommandBuilder::flush], or when the
//! next key doesn't continue any of the longer bindings.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use vimgrammar::builder::{Advance, CommandBuilder, CommandKind};
//! use vimgrammar::catalog::Catalog;
//! use vimgrammar::key::KeyToken;
//!
//! let trie = Arc::new(Catalog::vim().build().unwrap());
//! let mut builder = CommandBuilder::new(trie);
//!
//! assert_eq!(builder.advance(KeyToken::from('2')), Advance::Pending);
//! assert_eq!(builder.advance(KeyToken::from('d')), Advance::Pending);
//! assert_eq!(builder.advance(KeyToken::from('3')), Advance::Pending);
//!
//! match builder.advance(KeyToken::from('w')) {
//!     Advance::Complete(cmd) => {
//!         assert!(matches!(cmd.kind, CommandKind::Operator { .. }));
//!         assert_eq!(cmd.count, Some(6));
//!     },
//!     res => panic!("unexpected result: {res:?}"),
//! }
//!
//! assert!(builder.is_idle());
//! ```
use std::sync::Arc;
use std::time::Duration;

use keytrie::timer::{NoTimer, Timer, TimerTicket};
use keytrie::{InputKey, NodeId};

use crate::action::{ActionDescriptor, ActionFlags, RegisterEffect, Role};
use crate::catalog::VimTrie;
use crate::key::{KeyKind, KeyToken};
use crate::mode::VimMode;
use crate::register::RegisterName;

/// How long to wait before firing an ambiguous binding, matching Vim's default `'timeoutlen'`.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

/// The largest count that can be typed before a command, unless configured otherwise.
pub const DEFAULT_MAX_COUNT: usize = 999_999_999;

/// What a completed command does.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CommandKind {
    /// A motion, text object or command typed on its own.
    Simple(ActionDescriptor),

    /// An operator applied to the text covered by a motion or text object.
    Operator {
        /// The operator typed first.
        operator: ActionDescriptor,

        /// The motion or text object typed after it.
        motion: ActionDescriptor,

        /// The count typed between the operator and the motion.
        motion_count: Option<usize>,
    },

    /// An operator applied to the Visual mode selection.
    Selection(ActionDescriptor),

    /// A key typed as text in Insert or Replace mode.
    Literal(KeyToken),
}

/// A fully parsed command, ready to be performed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Command {
    /// What the command does.
    pub kind: CommandKind,

    /// How many times to repeat the command.
    ///
    /// For operators, this is the product of the counts typed before the operator and before
    /// the motion.
    pub count: Option<usize>,

    /// The register the command should use.
    pub register: Option<RegisterName>,

    /// The key typed after an action that takes an argument.
    pub argument: Option<KeyToken>,

    /// Every key that was typed for this command.
    pub keys: Vec<KeyToken>,

    /// The mode the command was typed in.
    pub mode: VimMode,
}

impl Command {
    /// The action that decides how this command behaves, if it isn't literal text.
    pub fn action(&self) -> Option<&ActionDescriptor> {
        match &self.kind {
            CommandKind::Simple(action) => Some(action),
            CommandKind::Operator { operator, .. } => Some(operator),
            CommandKind::Selection(operator) => Some(operator),
            CommandKind::Literal(_) => None,
        }
    }

    /// A name identifying what this command does.
    pub fn name(&self) -> &'static str {
        self.action().map(|action| action.name).unwrap_or("literal")
    }

    /// What this command does to the registers.
    pub fn effect(&self) -> RegisterEffect {
        self.action().map(|action| action.effect).unwrap_or_default()
    }

    /// The number of times to repeat this command, defaulting to once.
    pub fn count_or_default(&self) -> usize {
        self.count.unwrap_or(1)
    }

    /// The keys typed for this command, in key notation.
    pub fn notation(&self) -> String {
        KeyToken::notate(&self.keys)
    }

    /// Whether this command modifies text, and should be repeated by `.`.
    pub fn is_change(&self) -> bool {
        match &self.kind {
            CommandKind::Literal(_) => true,
            CommandKind::Operator { operator, .. } => operator.effect != RegisterEffect::Yank,
            CommandKind::Selection(operator) => operator.effect != RegisterEffect::Yank,
            CommandKind::Simple(action) => {
                if action.builtin.is_some() || action.role != Role::Command {
                    return false;
                }

                matches!(action.effect, RegisterEffect::Delete | RegisterEffect::Put) ||
                    matches!(action.enter, Some(VimMode::Insert | VimMode::Replace))
            },
        }
    }

    /// Replace the count this command was typed with.
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);

        if let CommandKind::Operator { motion_count, .. } = &mut self.kind {
            *motion_count = None;
        }

        self
    }
}

/// The result of feeding a key to a [CommandBuilder].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Advance {
    /// More keys are needed.
    Pending,

    /// The keys so far invoke this action, but longer bindings also start with them.
    ///
    /// The builder keeps waiting until another key, a flush or a timeout resolves it.
    Ambiguous(ActionDescriptor),

    /// The keys form a complete command.
    Complete(Command),

    /// The keys, in notation, don't match any binding and have been discarded.
    Invalid(String),

    /// The new key didn't continue an ambiguous binding, so that binding was completed, and
    /// then the key was read again from the start.
    Fallback(Command, Box<Advance>),
}

impl Advance {
    /// The commands completed by this step, in the order they were completed.
    pub fn commands(self) -> Vec<Command> {
        match self {
            Advance::Complete(cmd) => vec![cmd],
            Advance::Fallback(cmd, then) => {
                let mut cmds = vec![cmd];
                cmds.extend(then.commands());
                cmds
            },
            Advance::Pending | Advance::Ambiguous(_) | Advance::Invalid(_) => vec![],
        }
    }
}

/// An operator waiting for its motion.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PendingOperator {
    /// The operator's action.
    pub operator: ActionDescriptor,

    /// The count typed before the operator.
    pub count: Option<usize>,

    /// The register named before the operator.
    pub register: Option<RegisterName>,

    /// The operator's trie node, whose children are doubled forms like `dd`.
    pub node: NodeId,

    /// The mode to return to after the operator.
    pub mode: VimMode,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Awaiting {
    Register,
    Argument(ActionDescriptor),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct Ambiguity {
    action: ActionDescriptor,
    ticket: TimerTicket,
}

/// Incrementally parses keys into [Command] values.
pub struct CommandBuilder {
    trie: Arc<VimTrie>,
    mode: VimMode,

    count: Option<usize>,
    register: Option<RegisterName>,
    pending: Option<PendingOperator>,
    node: Option<NodeId>,
    /// A second path that matched the same keys, like `g` for both `gugu` and `gugg`.
    alt: Option<NodeId>,
    awaiting: Option<Awaiting>,
    ambiguous: Option<Ambiguity>,
    keys: Vec<KeyToken>,

    timer: Box<dyn Timer>,
    ticket: TimerTicket,
    timeout: Option<Duration>,
    max_count: usize,
}

impl CommandBuilder {
    /// Create a builder in Normal mode that reads bindings from `trie`.
    ///
    /// The builder starts out without a timer, so ambiguous bindings only fire when flushed or
    /// when another key resolves them.
    pub fn new(trie: Arc<VimTrie>) -> Self {
        CommandBuilder {
            trie,
            mode: VimMode::Normal,

            count: None,
            register: None,
            pending: None,
            node: None,
            alt: None,
            awaiting: None,
            ambiguous: None,
            keys: vec![],

            timer: Box::new(NoTimer),
            ticket: TimerTicket::new(0),
            timeout: Some(DEFAULT_TIMEOUT),
            max_count: DEFAULT_MAX_COUNT,
        }
    }

    /// Use `timer` to wait on ambiguous bindings, with tickets belonging to `owner`.
    pub fn with_timer(mut self, timer: Box<dyn Timer>, owner: u64) -> Self {
        self.timer = timer;
        self.ticket = TimerTicket::new(owner);
        self
    }

    /// Set how long to wait on ambiguous bindings, or `None` to wait until flushed.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the largest count that can be typed.
    pub fn with_max_count(mut self, max_count: usize) -> Self {
        self.max_count = max_count.max(1);
        self
    }

    /// The current mode.
    pub fn mode(&self) -> VimMode {
        self.mode
    }

    /// The count typed so far.
    pub fn count(&self) -> Option<usize> {
        self.count
    }

    /// The register named so far.
    pub fn register(&self) -> Option<RegisterName> {
        self.register
    }

    /// The operator waiting for a motion, if any.
    pub fn pending_operator(&self) -> Option<&PendingOperator> {
        self.pending.as_ref()
    }

    /// The ticket armed for the current ambiguous binding, if there is one.
    pub fn armed_ticket(&self) -> Option<TimerTicket> {
        self.ambiguous.map(|amb| amb.ticket)
    }

    /// Whether the builder is waiting for the key after `"` or after an action that takes an
    /// argument.
    pub fn is_awaiting(&self) -> bool {
        self.awaiting.is_some()
    }

    /// Whether the builder is waiting for a character argument, like the one after `f` or `r`.
    pub fn is_awaiting_argument(&self) -> bool {
        matches!(self.awaiting, Some(Awaiting::Argument(_)))
    }

    /// Whether nothing has been typed since the last command completed.
    pub fn is_idle(&self) -> bool {
        self.count.is_none() &&
            self.register.is_none() &&
            self.pending.is_none() &&
            self.node.is_none() &&
            self.awaiting.is_none() &&
            self.ambiguous.is_none()
    }

    /// The keys typed since the last command completed.
    pub fn keys(&self) -> &[KeyToken] {
        &self.keys
    }

    fn root(&self) -> Option<NodeId> {
        self.trie.root(self.mode.mapping_mode())
    }

    /// The trie node that the next key will be looked up from.
    pub fn current_node(&self) -> Option<NodeId> {
        self.node.or_else(|| self.root())
    }

    /// The keys that continue a binding from the current node, sorted by their notation.
    ///
    /// Counts, register names and arguments aren't included.
    pub fn possible_keys(&self) -> Vec<KeyToken> {
        if self.awaiting.is_some() {
            return vec![];
        }

        let mut nodes = vec![];
        nodes.extend(self.current_node());
        nodes.extend(self.alt);

        if let (None, Some(op)) = (self.node, &self.pending) {
            nodes.push(op.node);
        }

        let mut keys = nodes
            .into_iter()
            .flat_map(|node| self.trie.children(node).map(|(key, _)| *key))
            .collect::<Vec<_>>();

        keys.sort_by_cached_key(ToString::to_string);
        keys.dedup();

        return keys;
    }

    /// Clear everything typed since the last command.
    ///
    /// The mode is kept, except that a pending operator is abandoned and its mode restored.
    pub fn reset(&mut self) {
        if let Some(amb) = self.ambiguous.take() {
            self.timer.cancel(amb.ticket);
        }

        if let Some(op) = self.pending.take() {
            self.mode = op.mode;
        }

        self.count = None;
        self.register = None;
        self.node = None;
        self.alt = None;
        self.awaiting = None;
        self.keys.clear();
    }

    /// Clear everything typed since the last command, and return to Normal mode.
    pub fn full_reset(&mut self) {
        self.reset();
        self.mode = VimMode::Normal;
    }

    /// Process the next key.
    pub fn advance(&mut self, key: KeyToken) -> Advance {
        tracing::trace!(key = %key, mode = ?self.mode, "advancing command builder");

        if key.kind() == KeyKind::Unknown {
            if let Some(res) = self.fallback(key) {
                return res;
            }

            self.keys.push(key);

            return self.invalid();
        }

        if let Some(awaiting) = self.awaiting.take() {
            self.keys.push(key);

            match awaiting {
                Awaiting::Register => {
                    match key.get_char().and_then(RegisterName::from_char) {
                        Some(name) => {
                            self.register = Some(name);

                            return Advance::Pending;
                        },
                        None => return self.invalid(),
                    }
                },
                Awaiting::Argument(action) => {
                    let cmd = self.complete(action, Some(key));

                    return Advance::Complete(cmd);
                },
            }
        }

        if self.node.is_none() && !self.mode.is_insert() {
            if let Some(n) = key.digit() {
                if n != 0 || self.count.is_some() {
                    let count = self.count.unwrap_or(0).saturating_mul(10).saturating_add(n);

                    self.keys.push(key);
                    self.count = Some(count.min(self.max_count));

                    return Advance::Pending;
                }
            }

            if key.get_char() == Some('"') {
                self.keys.push(key);
                self.awaiting = Some(Awaiting::Register);

                return Advance::Pending;
            }
        }

        match self.step(&key) {
            Some((node, alt)) => {
                if let Some(amb) = self.ambiguous.take() {
                    self.timer.cancel(amb.ticket);
                }

                self.keys.push(key);
                self.node = Some(node);
                self.alt = alt;

                return self.reach(node);
            },
            None => {
                if let Some(res) = self.fallback(key) {
                    return res;
                }

                if self.mode.is_insert() {
                    return self.literals(key);
                }

                self.keys.push(key);

                return self.invalid();
            },
        }
    }

    /// Complete the binding waiting on an ambiguous sequence because `key` doesn't continue it,
    /// and then read `key` again from the start.
    fn fallback(&mut self, key: KeyToken) -> Option<Advance> {
        let amb = self.ambiguous.take()?;

        self.timer.cancel(amb.ticket);

        let cmd = self.complete(amb.action, None);

        tracing::debug!(cmd = %cmd.notation(), key = %key, "firing fallback binding");

        let then = self.advance(key);

        return Some(Advance::Fallback(cmd, Box::new(then)));
    }

    /// In Insert and Replace modes, keys that turn out not to be a binding are typed as text.
    fn literals(&mut self, key: KeyToken) -> Advance {
        if self.node.is_none() {
            self.keys.push(key);

            return Advance::Complete(self.literal(key));
        }

        let typed = std::mem::take(&mut self.keys);

        tracing::debug!(keys = %KeyToken::notate(&typed), "typing unbound keys as text");

        self.node = None;
        self.alt = None;

        let mut res = self.advance(key);

        for prev in typed.into_iter().rev() {
            let cmd = Command {
                kind: CommandKind::Literal(prev),
                count: None,
                register: None,
                argument: None,
                keys: vec![prev],
                mode: self.mode,
            };

            res = Advance::Fallback(cmd, Box::new(res));
        }

        return res;
    }

    /// Fire the binding waiting on an ambiguous sequence, if there is one.
    pub fn flush(&mut self) -> Option<Command> {
        let amb = self.ambiguous.take()?;

        self.timer.cancel(amb.ticket);

        return Some(self.complete(amb.action, None));
    }

    /// Handle an expired timer.
    ///
    /// Only the ticket armed for the current ambiguous binding fires it. Any other ticket is
    /// stale, and ignored.
    pub fn timeout(&mut self, ticket: TimerTicket) -> Option<Command> {
        match self.ambiguous {
            Some(amb) if amb.ticket == ticket => {
                self.ambiguous = None;

                return Some(self.complete(amb.action, None));
            },
            _ => {
                tracing::trace!(?ticket, "ignoring stale timer ticket");

                return None;
            },
        }
    }

    /// Find the node `key` leads to, along with a second node if two paths still match.
    fn step(&self, key: &KeyToken) -> Option<(NodeId, Option<NodeId>)> {
        let (first, second) = match self.node {
            Some(node) => {
                let alt = self.alt.and_then(|alt| self.trie.child(alt, key));

                (self.trie.child(node, key), alt)
            },
            None => {
                // Doubled operators continue from the operator's node.
                let doubled = self.pending.as_ref().and_then(|op| self.trie.child(op.node, key));
                let rooted = self.root().and_then(|root| self.trie.child(root, key));

                (doubled, rooted)
            },
        };

        match (first, second) {
            (Some(a), Some(b)) => {
                // Follow whichever one is bound here, and keep the other while it can continue.
                let (node, other) = match (self.trie.leaf(a), self.trie.leaf(b)) {
                    (None, Some(_)) => (b, a),
                    _ => (a, b),
                };

                return Some((node, self.trie.has_children(other).then_some(other)));
            },
            (Some(node), None) | (None, Some(node)) => {
                return Some((node, None));
            },
            (None, None) => {
                return None;
            },
        }
    }

    fn reach(&mut self, node: NodeId) -> Advance {
        let Some(action) = self.trie.leaf(node).copied() else {
            return Advance::Pending;
        };

        if action.needs_motion() {
            if self.mode.is_visual() {
                return Advance::Complete(self.complete_selection(action));
            }

            if self.pending.is_some() {
                return self.invalid();
            }

            self.pending = Some(PendingOperator {
                operator: action,
                count: self.count.take(),
                register: self.register.take(),
                node,
                mode: self.mode,
            });
            self.node = None;
            self.alt = None;
            self.mode = VimMode::OperatorPending;

            return Advance::Pending;
        }

        if action.needs_argument() {
            self.alt = None;
            self.awaiting = Some(Awaiting::Argument(action));

            return Advance::Pending;
        }

        if self.trie.has_children(node) || self.alt.is_some() {
            self.ticket = self.ticket.next();

            if let Some(delay) = self.timeout {
                self.timer.arm(self.ticket, delay);
            }

            self.ambiguous = Some(Ambiguity { action, ticket: self.ticket });

            return Advance::Ambiguous(action);
        }

        return Advance::Complete(self.complete(action, None));
    }

    fn finish(&mut self, kind: CommandKind, count: Option<usize>, next: VimMode) -> Command {
        let cmd = Command {
            kind,
            count: count.map(|n| n.min(self.max_count)),
            register: self.register,
            argument: None,
            keys: std::mem::take(&mut self.keys),
            mode: self.mode,
        };

        self.reset();
        self.mode = next;

        tracing::debug!(cmd = %cmd.notation(), name = cmd.name(), mode = ?next, "command complete");

        return cmd;
    }

    fn complete(&mut self, action: ActionDescriptor, argument: Option<KeyToken>) -> Command {
        let mut cmd = match self.pending.take() {
            Some(op) => {
                let count = match (op.count, self.count) {
                    (None, None) => None,
                    (outer, inner) => {
                        Some(outer.unwrap_or(1).saturating_mul(inner.unwrap_or(1)))
                    },
                };
                let kind = CommandKind::Operator {
                    operator: op.operator,
                    motion: action,
                    motion_count: self.count,
                };
                let next = op.operator.enter.unwrap_or(op.mode);

                self.register = self.register.or(op.register);
                self.mode = op.mode;

                self.finish(kind, count, next)
            },
            None => {
                let next = match action.enter {
                    Some(mode) => mode,
                    None if self.leaves_visual(&action) => VimMode::Normal,
                    None => self.mode,
                };

                self.finish(CommandKind::Simple(action), self.count, next)
            },
        };

        cmd.argument = argument;

        return cmd;
    }

    fn leaves_visual(&self, action: &ActionDescriptor) -> bool {
        self.mode.is_visual() &&
            action.role == Role::Command &&
            !action.flags.contains(ActionFlags::KEEP_VISUAL)
    }

    fn complete_selection(&mut self, operator: ActionDescriptor) -> Command {
        let next = operator.enter.unwrap_or(VimMode::Normal);

        self.finish(CommandKind::Selection(operator), self.count, next)
    }

    fn literal(&mut self, key: KeyToken) -> Command {
        let mode = self.mode;

        self.finish(CommandKind::Literal(key), None, mode)
    }

    fn invalid(&mut self) -> Advance {
        let keys = KeyToken::notate(&self.keys);

        tracing::debug!(keys = %keys, mode = ?self.mode, "invalid key sequence");

        self.full_reset();

        return Advance::Invalid(keys);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Builtin;
    use crate::catalog::{Catalog, MappedModes};
    use crate::key::KeyCode;
    use crate::mode::VisualKind;
    use keytrie::timer::ManualTimer;
    use rand::seq::SliceRandom;
    use rand::Rng;

    fn vim() -> CommandBuilder {
        CommandBuilder::new(Arc::new(Catalog::vim().build().unwrap()))
    }

    fn feed(builder: &mut CommandBuilder, keys: &str) -> Vec<Advance> {
        if keys.is_empty() {
            return vec![];
        }

        KeyToken::from_macro_str(keys)
            .unwrap()
            .into_iter()
            .map(|key| builder.advance(key))
            .collect()
    }

    fn complete(builder: &mut CommandBuilder, keys: &str) -> Command {
        match feed(builder, keys).pop() {
            Some(Advance::Complete(cmd)) => cmd,
            res => panic!("expected {keys:?} to complete, got {res:?}"),
        }
    }

    fn assert_reset(builder: &CommandBuilder) {
        assert_eq!(builder.count(), None);
        assert_eq!(builder.register(), None);
        assert_eq!(builder.pending_operator(), None);
        assert_eq!(builder.current_node(), builder.trie.root(builder.mode().mapping_mode()));
        assert!(builder.is_idle());
        assert!(builder.keys().is_empty());
    }

    /// A catalog where `d` deletes a character and `dd` deletes a line.
    fn ambiguous() -> (CommandBuilder, ManualTimer) {
        let mut catalog = Catalog::new();
        catalog.add(MappedModes::N, "d", ActionDescriptor::command("delete-char"));
        catalog.add(MappedModes::N, "dd", ActionDescriptor::command("delete-line"));
        catalog.add(MappedModes::N, "x", ActionDescriptor::command("cut"));
        catalog.add(MappedModes::N, "gab", ActionDescriptor::command("gab"));
        catalog.add(MappedModes::N, "g", ActionDescriptor::command("go"));

        let timer = ManualTimer::new();
        let builder = CommandBuilder::new(Arc::new(catalog.build().unwrap()))
            .with_timer(Box::new(timer.clone()), 7);

        (builder, timer)
    }

    #[test]
    fn test_simple_motion() {
        let mut builder = vim();

        let cmd = complete(&mut builder, "w");
        assert_eq!(cmd.name(), "word-begin-next");
        assert_eq!(cmd.count, None);
        assert_eq!(cmd.mode, VimMode::Normal);
        assert_eq!(builder.mode(), VimMode::Normal);
        assert_reset(&builder);

        let cmd = complete(&mut builder, "5j");
        assert_eq!(cmd.name(), "down");
        assert_eq!(cmd.count, Some(5));
        assert_eq!(cmd.notation(), "5j");
        assert_reset(&builder);
    }

    #[test]
    fn test_count_composition() {
        let mut builder = vim();

        let res = feed(&mut builder, "2d3");
        assert_eq!(res, vec![Advance::Pending, Advance::Pending, Advance::Pending]);
        assert_eq!(builder.mode(), VimMode::OperatorPending);
        assert_eq!(builder.pending_operator().unwrap().operator.name, "delete");
        assert_eq!(builder.pending_operator().unwrap().count, Some(2));
        assert_eq!(builder.count(), Some(3));

        let cmd = complete(&mut builder, "w");
        assert_eq!(cmd.count, Some(6));
        assert!(matches!(
            cmd.kind,
            CommandKind::Operator {
                operator: ActionDescriptor { name: "delete", .. },
                motion: ActionDescriptor { name: "word-begin-next", .. },
                motion_count: Some(3),
            }
        ));
        assert_eq!(builder.mode(), VimMode::Normal);
        assert_reset(&builder);

        // Counts on just one side.
        assert_eq!(complete(&mut builder, "d4w").count, Some(4));
        assert_eq!(complete(&mut builder, "4dw").count, Some(4));
        assert_eq!(complete(&mut builder, "dw").count, None);
    }

    #[test]
    fn test_leading_zero() {
        let mut builder = vim();

        let cmd = complete(&mut builder, "0");
        assert_eq!(cmd.name(), "line-start");
        assert_eq!(cmd.count, None);
        assert_reset(&builder);

        assert_eq!(feed(&mut builder, "10"), vec![Advance::Pending, Advance::Pending]);
        assert_eq!(builder.count(), Some(10));

        let cmd = complete(&mut builder, "G");
        assert_eq!(cmd.count, Some(10));

        // A zero after an operator is also a motion.
        let cmd = complete(&mut builder, "d0");
        assert!(matches!(
            cmd.kind,
            CommandKind::Operator { motion: ActionDescriptor { name: "line-start", .. }, .. }
        ));
    }

    #[test]
    fn test_max_count() {
        let mut builder = vim().with_max_count(50);

        let cmd = complete(&mut builder, "99999999999999999999999j");
        assert_eq!(cmd.count, Some(50));

        let cmd = complete(&mut builder, "40d40w");
        assert_eq!(cmd.count, Some(50));
    }

    #[test]
    fn test_register() {
        let mut builder = vim();

        assert_eq!(feed(&mut builder, "\"a"), vec![Advance::Pending, Advance::Pending]);
        assert_eq!(builder.register(), Some(RegisterName::Named('a')));

        let cmd = complete(&mut builder, "yy");
        assert_eq!(cmd.register, Some(RegisterName::Named('a')));
        assert_eq!(cmd.notation(), "\"ayy");

        // Counts and registers can come in either order.
        let cmd = complete(&mut builder, "3\"Bp");
        assert_eq!(cmd.register, Some(RegisterName::Named('B')));
        assert_eq!(cmd.count, Some(3));

        let cmd = complete(&mut builder, "\"_3dw");
        assert_eq!(cmd.register, Some(RegisterName::Blackhole));
        assert_eq!(cmd.count, Some(3));

        // Invalid register names abandon the command.
        let res = feed(&mut builder, "\"<C-A>");
        assert_eq!(res[1], Advance::Invalid("\"<C-A>".into()));
        assert_reset(&builder);
    }

    #[test]
    fn test_doubled_operators() {
        let mut builder = vim();

        let cmd = complete(&mut builder, "dd");
        assert!(matches!(
            cmd.kind,
            CommandKind::Operator {
                operator: ActionDescriptor { name: "delete", .. },
                motion: ActionDescriptor { name: "line", .. },
                ..
            }
        ));

        let cmd = complete(&mut builder, "2g~~");
        assert_eq!(cmd.name(), "toggle-case");
        assert_eq!(cmd.count, Some(2));

        let cmd = complete(&mut builder, "gUgU");
        assert_eq!(cmd.name(), "uppercase");

        let cmd = complete(&mut builder, "d3d");
        assert_eq!(cmd.count, Some(3));
        assert!(matches!(
            cmd.kind,
            CommandKind::Operator { motion: ActionDescriptor { name: "line", .. }, .. }
        ));

        // Doubled forms don't hide motions that start with the same key.
        for (keys, operator, motion) in [
            ("gugg", "lowercase", "goto-first-line"),
            ("gUge", "uppercase", "word-end-prev"),
            ("g~gj", "toggle-case", "screen-down"),
            ("gugu", "lowercase", "line"),
        ] {
            let cmd = complete(&mut builder, keys);
            assert_eq!(cmd.name(), operator, "{keys}");

            match cmd.kind {
                CommandKind::Operator { motion: m, .. } => assert_eq!(m.name, motion, "{keys}"),
                kind => panic!("{keys}: unexpected command {kind:?}"),
            }

            assert_eq!(builder.mode(), VimMode::Normal);
            assert_reset(&builder);
        }

        feed(&mut builder, "gug");
        let keys = builder.possible_keys();
        assert!(keys.contains(&key!('u')));
        assert!(keys.contains(&key!('g')));
        assert!(keys.contains(&key!('e')));
        builder.full_reset();

        // Operators can't be applied to other operators.
        let res = feed(&mut builder, "dy");
        assert_eq!(res[1], Advance::Invalid("dy".into()));
        assert_eq!(builder.mode(), VimMode::Normal);
        assert_reset(&builder);
    }

    #[test]
    fn test_text_objects() {
        let mut builder = vim();

        let cmd = complete(&mut builder, "ci(");
        assert!(matches!(
            cmd.kind,
            CommandKind::Operator {
                operator: ActionDescriptor { name: "change", .. },
                motion: ActionDescriptor { name: "inner-paren", .. },
                ..
            }
        ));
        assert_eq!(builder.mode(), VimMode::Insert);

        // Text objects aren't motions in Normal mode.
        builder.full_reset();
        let cmd = complete(&mut builder, "i");
        assert_eq!(cmd.name(), "insert-before");
    }

    #[test]
    fn test_possible_keys() {
        let mut builder = vim();

        let keys = builder.possible_keys();
        assert!(keys.contains(&KeyToken::from('d')));
        assert!(keys.contains(&KeyToken::from('g')));
        assert!(!keys.contains(&KeyToken::from('1')));

        feed(&mut builder, "g");
        let keys = builder.possible_keys();
        assert!(keys.contains(&KeyToken::from('g')));
        assert!(keys.contains(&KeyToken::from('U')));
        assert!(!keys.contains(&KeyToken::from('x')));

        // After an operator, both motions and doubled forms continue.
        builder.full_reset();
        feed(&mut builder, "d");
        let keys = builder.possible_keys();
        assert!(keys.contains(&KeyToken::from('d')));
        assert!(keys.contains(&KeyToken::from('w')));
        assert!(keys.contains(&KeyToken::from('i')));

        let mut sorted = keys.clone();
        sorted.sort_by_cached_key(ToString::to_string);
        assert_eq!(keys, sorted);

        // Arguments can be anything.
        feed(&mut builder, "f");
        assert!(builder.is_awaiting_argument());
        assert!(builder.possible_keys().is_empty());
    }

    #[test]
    fn test_prefix_never_completes() {
        let mut builder = vim();

        for prefix in ["g", "z", "<C-W>", "[", "Z", "gu", "gug"] {
            builder.full_reset();

            let res = feed(&mut builder, prefix);
            assert!(res.iter().all(|r| r == &Advance::Pending), "{prefix}: {res:?}");
        }
    }

    #[test]
    fn test_ambiguity() {
        let (mut builder, timer) = ambiguous();
        let delete_char = ActionDescriptor::command("delete-char");

        // A lone "d" could be either binding.
        let res = feed(&mut builder, "d");
        assert_eq!(res, vec![Advance::Ambiguous(delete_char)]);
        assert_eq!(timer.armed(), builder.armed_ticket());
        assert_eq!(timer.delay(), Some(DEFAULT_TIMEOUT));
        assert!(!builder.is_idle());

        // A second "d" picks the longer binding, and cancels the timer.
        let cmd = complete(&mut builder, "d");
        assert_eq!(cmd.name(), "delete-line");
        assert_eq!(cmd.notation(), "dd");
        assert_eq!(timer.armed(), None);
        assert_eq!(timer.cancels(), 1);
        assert_reset(&builder);

        // Anything else fires "d", and is then read again from the start.
        feed(&mut builder, "d");

        match builder.advance(KeyToken::from('x')) {
            Advance::Fallback(cmd, then) => {
                assert_eq!(cmd.name(), "delete-char");
                assert_eq!(cmd.notation(), "d");

                match *then {
                    Advance::Complete(cmd) => {
                        assert_eq!(cmd.name(), "cut");
                        assert_eq!(cmd.notation(), "x");
                    },
                    res => panic!("unexpected result: {res:?}"),
                }
            },
            res => panic!("unexpected result: {res:?}"),
        }

        assert_reset(&builder);

        // A key that's invalid everywhere still fires the fallback first.
        feed(&mut builder, "d");
        let res = builder.advance(KeyToken::from('q'));
        let Advance::Fallback(cmd, then) = res else {
            panic!("expected fallback");
        };
        assert_eq!(cmd.name(), "delete-char");
        assert_eq!(*then, Advance::Invalid("q".into()));
        assert_reset(&builder);

        // So does a key that can never be bound.
        feed(&mut builder, "d");
        let Advance::Fallback(cmd, then) = builder.advance(KeyToken::UNKNOWN) else {
            panic!("expected fallback");
        };
        assert_eq!(cmd.name(), "delete-char");
        assert_eq!(*then, Advance::Invalid("<Unknown>".into()));
        assert_eq!(timer.armed(), None);
        assert_reset(&builder);
    }

    #[test]
    fn test_ambiguity_deeper_failure() {
        let (mut builder, timer) = ambiguous();

        // Once a longer binding is chosen, the shorter one is abandoned.
        let res = feed(&mut builder, "gax");
        assert_eq!(res[0], Advance::Ambiguous(ActionDescriptor::command("go")));
        assert_eq!(res[1], Advance::Pending);
        assert_eq!(res[2], Advance::Invalid("gax".into()));
        assert_eq!(timer.armed(), None);
        assert_reset(&builder);
    }

    #[test]
    fn test_ambiguity_timeout() {
        let (mut builder, timer) = ambiguous();

        feed(&mut builder, "d");
        let first = timer.fire().unwrap();

        let cmd = builder.timeout(first).unwrap();
        assert_eq!(cmd.name(), "delete-char");
        assert_reset(&builder);

        // The old ticket is now stale.
        feed(&mut builder, "d");
        assert_eq!(builder.timeout(first), None);
        assert!(builder.armed_ticket().is_some());

        // A ticket that fires after the sequence was resolved is stale too.
        let second = timer.armed().unwrap();
        assert_ne!(first, second);
        complete(&mut builder, "d");
        assert_eq!(builder.timeout(second), None);
        assert_reset(&builder);

        // Flushing fires the fallback immediately.
        feed(&mut builder, "3d");
        let cmd = builder.flush().unwrap();
        assert_eq!(cmd.name(), "delete-char");
        assert_eq!(cmd.count, Some(3));
        assert_eq!(builder.flush(), None);
    }

    #[test]
    fn test_ambiguity_without_timeout() {
        let (builder, timer) = ambiguous();
        let mut builder = builder.with_timeout(None);

        feed(&mut builder, "d");
        assert_eq!(timer.armed(), None);
        assert_eq!(timer.arms(), 0);
        assert!(builder.armed_ticket().is_some());
        assert_eq!(builder.flush().unwrap().name(), "delete-char");
    }

    #[test]
    fn test_arguments() {
        let mut builder = vim();

        let cmd = complete(&mut builder, "fa");
        assert_eq!(cmd.name(), "find-forward");
        assert_eq!(cmd.argument, Some(KeyToken::from('a')));

        // Arguments are taken verbatim, even keys that are bindings or digits.
        let cmd = complete(&mut builder, "3tw");
        assert_eq!(cmd.argument, Some(KeyToken::from('w')));
        assert_eq!(cmd.count, Some(3));

        let cmd = complete(&mut builder, "r1");
        assert_eq!(cmd.name(), "replace-char");
        assert_eq!(cmd.argument, Some(KeyToken::from('1')));

        let cmd = complete(&mut builder, "f<Esc>");
        assert_eq!(cmd.argument, Some(KeyToken::from(KeyCode::Esc)));
        assert_eq!(builder.mode(), VimMode::Normal);

        // Arguments also work after operators.
        let cmd = complete(&mut builder, "dt)");
        assert!(matches!(
            cmd.kind,
            CommandKind::Operator { motion: ActionDescriptor { name: "till-forward", .. }, .. }
        ));
        assert_eq!(cmd.argument, Some(KeyToken::from(')')));

        let cmd = complete(&mut builder, "qa");
        assert_eq!(cmd.action().unwrap().builtin, Some(Builtin::RecordMacro));
        assert_eq!(cmd.argument, Some(KeyToken::from('a')));
    }

    #[test]
    fn test_insert_mode() {
        let mut builder = vim();

        let cmd = complete(&mut builder, "A");
        assert_eq!(cmd.name(), "insert-line-end");
        assert_eq!(builder.mode(), VimMode::Insert);

        // Most keys are typed as text, including digits and quotes.
        for s in ["a", "1", "0", "\"", "d", "<Enter>", "<Tab>", "<C-K>"] {
            let key = s.parse::<KeyToken>().unwrap();
            let cmd = complete(&mut builder, s);
            assert_eq!(cmd.kind, CommandKind::Literal(key));
            assert_eq!(cmd.mode, VimMode::Insert);
            assert_eq!(builder.mode(), VimMode::Insert);
            assert_reset(&builder);
        }

        let cmd = complete(&mut builder, "<C-R>a");
        assert_eq!(cmd.name(), "insert-register");
        assert_eq!(cmd.argument, Some(KeyToken::from('a')));
        assert_eq!(cmd.effect(), RegisterEffect::Put);

        let cmd = complete(&mut builder, "<BS>");
        assert_eq!(cmd.name(), "delete-char-before");

        let cmd = complete(&mut builder, "<Insert>");
        assert_eq!(cmd.name(), "toggle-replace");
        assert_eq!(builder.mode(), VimMode::Replace);

        let cmd = complete(&mut builder, "x");
        assert_eq!(cmd.kind, CommandKind::Literal(KeyToken::from('x')));
        assert_eq!(cmd.mode, VimMode::Replace);

        let cmd = complete(&mut builder, "<Esc>");
        assert_eq!(cmd.name(), "normal");
        assert_eq!(builder.mode(), VimMode::Normal);
    }

    #[test]
    fn test_insert_mode_unbound_prefix() {
        let mut catalog = Catalog::vim();
        let escape = ActionDescriptor::command("normal").enters(VimMode::Normal);
        catalog.add(MappedModes::I, "jk", escape);
        let mut builder = CommandBuilder::new(Arc::new(catalog.build().unwrap()));

        complete(&mut builder, "i");
        assert_eq!(feed(&mut builder, "j"), vec![Advance::Pending]);

        // Keys that don't finish the binding are typed as text instead.
        let kinds = builder
            .advance(key!('x'))
            .commands()
            .into_iter()
            .map(|cmd| cmd.kind)
            .collect::<Vec<_>>();
        assert_eq!(kinds, vec![CommandKind::Literal(key!('j')), CommandKind::Literal(key!('x'))]);
        assert_eq!(builder.mode(), VimMode::Insert);
        assert_reset(&builder);

        // And the key that broke the binding can start it again.
        let res = feed(&mut builder, "jjk");
        assert_eq!(res[0], Advance::Pending);
        assert_eq!(
            res[1],
            Advance::Fallback(
                Command {
                    kind: CommandKind::Literal(key!('j')),
                    count: None,
                    register: None,
                    argument: None,
                    keys: vec![key!('j')],
                    mode: VimMode::Insert,
                },
                Box::new(Advance::Pending)
            )
        );
        assert!(matches!(&res[2], Advance::Complete(cmd) if cmd.name() == "normal"));
        assert_eq!(builder.mode(), VimMode::Normal);
    }

    #[test]
    fn test_visual_mode() {
        let mut builder = vim();

        complete(&mut builder, "V");
        assert_eq!(builder.mode(), VimMode::Visual(VisualKind::Line));

        // Motions and text objects keep the selection.
        let cmd = complete(&mut builder, "3j");
        assert_eq!(cmd.mode, VimMode::Visual(VisualKind::Line));
        complete(&mut builder, "ap");
        complete(&mut builder, "o");
        complete(&mut builder, "<C-V>");
        assert_eq!(builder.mode(), VimMode::Visual(VisualKind::Block));

        // Operators act on the selection straight away.
        let cmd = complete(&mut builder, "\"by");
        assert_eq!(cmd.kind, CommandKind::Selection(cmd.action().copied().unwrap()));
        assert_eq!(cmd.name(), "yank");
        assert_eq!(cmd.register, Some(RegisterName::Named('b')));
        assert_eq!(builder.mode(), VimMode::Normal);

        complete(&mut builder, "v");
        complete(&mut builder, "c");
        assert_eq!(builder.mode(), VimMode::Insert);

        // Other commands end Visual mode.
        builder.full_reset();
        complete(&mut builder, "v");
        let cmd = complete(&mut builder, "J");
        assert_eq!(cmd.name(), "join-lines");
        assert_eq!(builder.mode(), VimMode::Normal);

        complete(&mut builder, "v");
        complete(&mut builder, "<Esc>");
        assert_eq!(builder.mode(), VimMode::Normal);
    }

    #[test]
    fn test_invalid() {
        let mut builder = vim();

        let res = feed(&mut builder, "gx");
        assert_eq!(res, vec![Advance::Pending, Advance::Invalid("gx".into())]);
        assert_reset(&builder);

        // Unknown keys are always invalid, even in Insert mode.
        complete(&mut builder, "i");
        assert_eq!(builder.advance(KeyToken::UNKNOWN), Advance::Invalid("<Unknown>".into()));
        assert_eq!(builder.mode(), VimMode::Normal);

        // Escape cancels a pending operator.
        feed(&mut builder, "2d");
        let res = builder.advance(KeyToken::from(KeyCode::Esc));
        assert_eq!(res, Advance::Invalid("2d<Esc>".into()));
        assert_eq!(builder.mode(), VimMode::Normal);
        assert_reset(&builder);

        assert!(matches!(builder.advance(ctl!('q')), Advance::Invalid(_)));
    }

    #[test]
    fn test_reset() {
        let mut builder = vim();

        feed(&mut builder, "\"a3d2");
        assert_eq!(builder.mode(), VimMode::OperatorPending);

        // Reset abandons the operator, and returns to its mode.
        builder.reset();
        assert_eq!(builder.mode(), VimMode::Normal);
        assert_reset(&builder);

        complete(&mut builder, "v");
        feed(&mut builder, "2g");
        builder.reset();
        assert_eq!(builder.mode(), VimMode::Visual(VisualKind::Char));
        assert_reset(&builder);
    }

    #[test]
    fn test_full_reset_matches_new() {
        let fresh = vim();
        let prefixes = ["", "2", "\"a", "d", "2d3", "g", "f", "v2", "i", "V\"", "<C-W>", "R"];

        for prefix in prefixes {
            let mut builder = vim();
            feed(&mut builder, prefix);
            builder.full_reset();

            assert_eq!(builder.mode(), fresh.mode(), "{prefix}");
            assert_eq!(builder.count(), fresh.count());
            assert_eq!(builder.register(), fresh.register());
            assert_eq!(builder.pending_operator(), fresh.pending_operator());
            assert_eq!(builder.current_node(), fresh.current_node());
            assert_eq!(builder.possible_keys(), fresh.possible_keys());
            assert_eq!(builder.is_awaiting(), fresh.is_awaiting());
            assert_eq!(builder.armed_ticket(), fresh.armed_ticket());
            assert_eq!(builder.keys(), fresh.keys());
            assert!(builder.is_idle());
        }

        let (mut builder, timer) = ambiguous();
        feed(&mut builder, "2d");
        builder.full_reset();
        assert_eq!(timer.armed(), None);
        assert!(builder.is_idle());
    }

    #[test]
    fn test_is_change() {
        let mut builder = vim();

        assert!(complete(&mut builder, "dw").is_change());
        assert!(complete(&mut builder, "x").is_change());
        assert!(complete(&mut builder, "p").is_change());
        assert!(!complete(&mut builder, "yy").is_change());
        assert!(!complete(&mut builder, "w").is_change());
        assert!(!complete(&mut builder, "u").is_change());
        assert!(!complete(&mut builder, ".").is_change());

        let cmd = complete(&mut builder, "o");
        assert!(cmd.is_change());

        let cmd = complete(&mut builder, "a");
        assert!(cmd.is_change());

        let cmd = complete(&mut builder, "<Esc>");
        assert!(!cmd.is_change());

        let cmd = complete(&mut builder, "2d3w").with_count(4);
        assert_eq!(cmd.count, Some(4));
        assert!(matches!(cmd.kind, CommandKind::Operator { motion_count: None, .. }));
    }

    #[test]
    fn test_random_walk() {
        let mut rng = rand::thread_rng();
        let mut builder = vim();

        for _ in 0..2000 {
            let keys = builder.possible_keys();

            let key = if builder.is_awaiting() || keys.is_empty() || rng.gen_ratio(1, 10) {
                // Arguments, register names, counts and unbound keys.
                let c = *['a', 'B', '3', '0', '"', ')', 'Z', '_'].choose(&mut rng).unwrap();
                KeyToken::from(c)
            } else {
                *keys.choose(&mut rng).unwrap()
            };

            let mut res = builder.advance(key);

            loop {
                match res {
                    Advance::Complete(cmd) => {
                        assert!(!cmd.keys.is_empty());
                        assert_reset(&builder);
                        break;
                    },
                    Advance::Invalid(_) => {
                        assert_eq!(builder.mode(), VimMode::Normal);
                        assert_reset(&builder);
                        break;
                    },
                    Advance::Fallback(_, then) => {
                        res = *then;
                    },
                    Advance::Pending | Advance::Ambiguous(_) => {
                        assert!(!builder.is_idle() || builder.mode().is_insert());
                        break;
                    },
                }
            }

            // Invariant between a pending operator and the mode.
            assert_eq!(
                builder.pending_operator().is_some(),
                builder.mode() == VimMode::OperatorPending
            );

            if builder.mode().is_insert() && rng.gen_ratio(1, 5) {
                builder.advance(KeyToken::from(KeyCode::Esc));
            }
        }
    }
}
