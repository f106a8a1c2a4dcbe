//! # Sessions
//!
//! ## Overview
//!
//! A [Session] owns everything that outlives a single key press: the command trie built from a
//! [Catalog], the registers, the digraph table, and an editing context for each open document or
//! window. Each context has its own [CommandBuilder], so typing in one doesn't disturb another,
//! but they all share the trie and the registers.
//!
//! The session also performs the builtin actions that need more than one command's worth of
//! state: recording and replaying macros with `q` and `@`, and repeating the last change with `.`.
//!
//! ## Example
//!
//! ```
//! use vimgrammar::catalog::Catalog;
//! use vimgrammar::config::SessionConfig;
//! use vimgrammar::dispatch::{ActionRequest, Editor, Effect};
//! use vimgrammar::key::KeyToken;
//! use vimgrammar::keytrie::timer::NoTimer;
//! use vimgrammar::session::Session;
//!
//! #[derive(Default)]
//! struct Log(Vec<String>);
//!
//! impl Editor for Log {
//!     type Error = String;
//!
//!     fn begin_change(&mut self) {}
//!     fn end_change(&mut self) {}
//!
//!     fn perform(&mut self, req: &ActionRequest<'_>) -> Result<Effect, String> {
//!         self.0.push(req.command.name().to_string());
//!         Ok(Effect::None)
//!     }
//! }
//!
//! let mut session = Session::new(&Catalog::vim(), SessionConfig::default()).unwrap();
//! let ctx = session.open_context(Box::new(NoTimer));
//! let mut editor = Log::default();
//!
//! for c in "d2wgg".chars() {
//!     session.handle_key(ctx, &mut editor, KeyToken::from(c)).unwrap();
//! }
//!
//! assert_eq!(editor.0, vec!["delete", "goto-first-line"]);
//! ```
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockWriteGuard};

use crossterm::event::Event;

use keytrie::timer::{Timer, TimerTicket};
use keytrie::InputKey;

use crate::action::Builtin;
use crate::builder::{Advance, Command, CommandBuilder, CommandKind};
use crate::catalog::{Catalog, VimTrie};
use crate::config::SessionConfig;
use crate::digraph::{DigraphResolver, DigraphStep, DigraphStore};
use crate::dispatch::{Dispatcher, Editor, Effect, Outcome};
use crate::errors::{CatalogError, InterpretError};
use crate::key::{KeyCode, KeyMapper, KeyToken, MacroError};
use crate::register::{RegisterError, RegisterName, RegisterStore, SharedRegisters};

/// Identifies an editing context within a [Session].
#[derive(Clone, Copy, Debug, Hash, Eq, Ord, PartialEq, PartialOrd)]
pub struct ContextId(u64);

impl ContextId {
    /// The number identifying this context, which is also the owner of its timer tickets.
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a context's [CommandBuilder] is after handling some input.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Status {
    /// Nothing is partially typed.
    #[default]
    Idle,

    /// More keys are needed to finish a command or digraph.
    Pending,

    /// A binding is waiting on a timeout or flush, in case a longer one gets typed.
    Ambiguous,
}

/// What happened while handling some input.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Handled {
    /// Where the context's builder is now.
    pub status: Status,

    /// The commands passed to the editor, in order.
    pub executed: Vec<Command>,

    /// An error that was recovered from by discarding input.
    pub recovered: Option<InterpretError>,
}

struct Recording {
    register: RegisterName,
    keys: Vec<KeyToken>,
}

struct Context {
    builder: CommandBuilder,
    digraph: DigraphResolver,
    recording: Option<Recording>,

    /// The commands making up the last change, for `.`.
    last_change: Option<Vec<Command>>,

    /// The commands of a change still being typed in Insert mode.
    change: Option<Vec<Command>>,

    /// The text typed since entering Insert mode.
    inserted: String,
    inserting: bool,
}

impl Context {
    fn status(&self) -> Status {
        if self.builder.armed_ticket().is_some() {
            Status::Ambiguous
        } else if !self.builder.is_idle() || self.digraph.is_active() {
            Status::Pending
        } else {
            Status::Idle
        }
    }

    fn starts_digraph(&self, key: &KeyToken) -> bool {
        if *key != KeyToken::DIGRAPH {
            return false;
        }

        let mode = self.builder.mode();

        (mode.is_insert() && self.builder.is_idle()) || self.builder.is_awaiting_argument()
    }
}

/// Shared state for interpreting keys across several editing contexts.
pub struct Session {
    trie: Arc<VimTrie>,
    registers: SharedRegisters,
    digraphs: DigraphStore,
    config: SessionConfig,
    contexts: HashMap<ContextId, Context>,
    next_id: u64,
}

impl Session {
    /// Create a session that interprets keys using the bindings in `catalog`.
    pub fn new(catalog: &Catalog, config: SessionConfig) -> Result<Self, CatalogError> {
        let trie = Arc::new(catalog.build()?);
        let mut digraphs = DigraphStore::default();

        match config.digraphs() {
            Ok(extra) => {
                for (digraph, c) in extra {
                    digraphs.put(digraph, c);
                }
            },
            Err(e) => {
                tracing::warn!(err = %e, "ignoring configured digraphs");
            },
        }

        let session = Session {
            trie,
            registers: Arc::new(RwLock::new(RegisterStore::new())),
            digraphs,
            config,
            contexts: HashMap::new(),
            next_id: 0,
        };

        return Ok(session);
    }

    /// The registers shared by every context in this session.
    pub fn registers(&self) -> &SharedRegisters {
        &self.registers
    }

    /// The settings this session was created with.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn store(&self) -> RwLockWriteGuard<'_, RegisterStore> {
        self.registers.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Start a new editing context, which arms `timer` when it needs to wait on ambiguous
    /// bindings.
    pub fn open_context(&mut self, timer: Box<dyn Timer>) -> ContextId {
        let id = ContextId(self.next_id);
        self.next_id += 1;

        let builder = CommandBuilder::new(self.trie.clone())
            .with_timer(timer, id.get())
            .with_timeout(self.config.timeout())
            .with_max_count(self.config.max_count);

        let ctx = Context {
            builder,
            digraph: DigraphResolver::new(),
            recording: None,
            last_change: None,
            change: None,
            inserted: String::new(),
            inserting: false,
        };

        self.contexts.insert(id, ctx);

        tracing::debug!(ctx = %id, "opened editing context");

        return id;
    }

    /// Stop an editing context.
    ///
    /// If it was in the middle of a command, the partial command is discarded, and reported as
    /// [InterpretError::IncompleteAtBoundary].
    pub fn close_context(&mut self, id: ContextId) -> Option<InterpretError> {
        let mut ctx = self.contexts.remove(&id)?;

        tracing::debug!(ctx = %id, "closed editing context");

        if ctx.builder.is_idle() && !ctx.digraph.is_active() {
            return None;
        }

        let keys = KeyToken::notate(ctx.builder.keys());
        ctx.builder.full_reset();

        return Some(InterpretError::IncompleteAtBoundary(keys));
    }

    /// Inspect a context's command builder.
    pub fn builder(&self, id: ContextId) -> Option<&CommandBuilder> {
        self.contexts.get(&id).map(|ctx| &ctx.builder)
    }

    fn context(&mut self, id: ContextId) -> Result<&mut Context, InterpretError> {
        self.contexts.get_mut(&id).ok_or(InterpretError::NoContext(id.get()))
    }

    /// Abandon whatever is being typed in a context, and return it to Normal mode.
    pub fn full_reset(&mut self, id: ContextId) -> Result<(), InterpretError> {
        let ctx = self.context(id)?;

        ctx.builder.full_reset();
        ctx.digraph.cancel();

        self.left_insert(id)
    }

    /// Clear every register.
    pub fn reset_registers(&mut self) {
        self.store().reset_registers();
    }

    /// Handle a key typed in the given context.
    pub fn handle_key<E: Editor>(
        &mut self,
        id: ContextId,
        editor: &mut E,
        key: KeyToken,
    ) -> Result<Handled, InterpretError> {
        let mut handled = Handled::default();

        self.guard(id, &mut handled, |session, handled| {
            session.input(id, editor, key, handled, 0)
        })?;

        return Ok(handled);
    }

    /// Handle a terminal event in the given context.
    ///
    /// Losing focus interrupts whatever was being typed, like [Session::full_reset]. Other events
    /// besides key presses are ignored.
    pub fn handle_event<E: Editor>(
        &mut self,
        id: ContextId,
        editor: &mut E,
        event: &Event,
    ) -> Result<Handled, InterpretError> {
        if let Some(key) = KeyMapper::map_event(event) {
            return self.handle_key(id, editor, key);
        }

        if let Event::FocusLost = event {
            self.full_reset(id)?;
        }

        let status = self.context(id)?.status();

        return Ok(Handled { status, ..Default::default() });
    }

    /// Fire a context's ambiguous binding now, without waiting for its timeout.
    pub fn flush<E: Editor>(
        &mut self,
        id: ContextId,
        editor: &mut E,
    ) -> Result<Handled, InterpretError> {
        let mut handled = Handled::default();

        self.guard(id, &mut handled, |session, handled| {
            let cmd = session.context(id)?.builder.flush();

            match cmd {
                Some(cmd) => session.run(id, editor, cmd, handled, 0),
                None => Ok(()),
            }
        })?;

        return Ok(handled);
    }

    /// Handle an expired timer ticket.
    ///
    /// Tickets that are no longer armed, or whose context has been closed, are ignored.
    pub fn timeout<E: Editor>(
        &mut self,
        editor: &mut E,
        ticket: TimerTicket,
    ) -> Result<Handled, InterpretError> {
        let id = ContextId(ticket.owner());
        let mut handled = Handled::default();

        if !self.contexts.contains_key(&id) {
            // The context was closed while its timer was running.
            tracing::debug!(ctx = %id, "dropping timer ticket for a closed context");
            return Ok(handled);
        }

        self.guard(id, &mut handled, |session, handled| {
            let cmd = session.context(id)?.builder.timeout(ticket);

            match cmd {
                Some(cmd) => session.run(id, editor, cmd, handled, 0),
                None => Ok(()),
            }
        })?;

        return Ok(handled);
    }

    /// Run some input handling, making sure the context is left in a usable state if it fails.
    fn guard<F>(&mut self, id: ContextId, handled: &mut Handled, f: F) -> Result<(), InterpretError>
    where
        F: FnOnce(&mut Session, &mut Handled) -> Result<(), InterpretError>,
    {
        let res = f(self, handled);
        let ctx = self.context(id)?;

        if let Err(e) = &res {
            tracing::debug!(ctx = %id, err = %e, "resetting after error");

            ctx.builder.reset();
            ctx.digraph.cancel();
        }

        handled.status = ctx.status();

        return res;
    }

    fn input<E: Editor>(
        &mut self,
        id: ContextId,
        editor: &mut E,
        mut key: KeyToken,
        handled: &mut Handled,
        depth: usize,
    ) -> Result<(), InterpretError> {
        let ctx = self.contexts.get_mut(&id).ok_or(InterpretError::NoContext(id.get()))?;

        if depth == 0 && ctx.recording.is_some() {
            let stops = key.get_char() == Some('q') &&
                ctx.builder.is_idle() &&
                !ctx.digraph.is_active() &&
                !ctx.builder.mode().is_insert();

            if stops {
                return self.stop_recording(id);
            }

            if let Some(recording) = &mut ctx.recording {
                recording.keys.push(key);
            }
        }

        if ctx.digraph.is_active() {
            match ctx.digraph.input(&self.digraphs, &key) {
                DigraphStep::Pending | DigraphStep::Cancelled => return Ok(()),
                DigraphStep::Unknown(d1, d2) => {
                    handled.recovered = Some(InterpretError::UnknownDigraph(d1, d2));

                    return Ok(());
                },
                DigraphStep::Emit(c) => {
                    key = KeyToken::from(c);
                },
            }
        } else if ctx.starts_digraph(&key) {
            ctx.digraph.start();

            return Ok(());
        }

        let res = ctx.builder.advance(key);

        self.resolve(id, editor, res, handled, depth)
    }

    fn resolve<E: Editor>(
        &mut self,
        id: ContextId,
        editor: &mut E,
        res: Advance,
        handled: &mut Handled,
        depth: usize,
    ) -> Result<(), InterpretError> {
        match res {
            Advance::Pending | Advance::Ambiguous(_) => {
                return Ok(());
            },
            Advance::Invalid(keys) => {
                handled.recovered = Some(InterpretError::InvalidSequence(keys));

                return self.left_insert(id);
            },
            Advance::Complete(cmd) => {
                return self.run(id, editor, cmd, handled, depth);
            },
            Advance::Fallback(cmd, then) => {
                self.run(id, editor, cmd, handled, depth)?;

                return self.resolve(id, editor, *then, handled, depth);
            },
        }
    }

    fn run<E: Editor>(
        &mut self,
        id: ContextId,
        editor: &mut E,
        cmd: Command,
        handled: &mut Handled,
        depth: usize,
    ) -> Result<(), InterpretError> {
        match cmd.action().and_then(|action| action.builtin) {
            Some(Builtin::RecordMacro) => return self.start_recording(id, &cmd, handled),
            Some(Builtin::ReplayMacro) => return self.replay(id, editor, &cmd, handled, depth),
            Some(Builtin::RepeatLast) => return self.repeat(id, editor, &cmd, handled),
            None => {},
        }

        let outcome = Dispatcher::execute(editor, &self.registers, &cmd)?;
        let ctx = self.context(id)?;

        match (&cmd.kind, &outcome) {
            (CommandKind::Literal(key), _) => {
                match key.code() {
                    KeyCode::Char(c) => ctx.inserted.push(c),
                    KeyCode::Enter => ctx.inserted.push('\n'),
                    KeyCode::Tab => ctx.inserted.push('\t'),
                    _ => {},
                }
            },
            (_, Outcome::Done(Effect::Inserted(text))) if cmd.mode.is_insert() => {
                // Text pasted while typing, like with <C-R>.
                ctx.inserted.push_str(text);
            },
            _ => {},
        }

        if let Some(change) = &mut ctx.change {
            change.push(cmd.clone());
        } else if cmd.is_change() {
            if ctx.builder.mode().is_insert() {
                ctx.change = Some(vec![cmd.clone()]);
            } else {
                ctx.last_change = Some(vec![cmd.clone()]);
            }
        }

        if let Outcome::Done(_) = outcome {
            handled.executed.push(cmd);
        }

        return self.left_insert(id);
    }

    /// Notice when a context has left Insert or Replace mode, and finish the change typed there.
    fn left_insert(&mut self, id: ContextId) -> Result<(), InterpretError> {
        let ctx = self.context(id)?;
        let inserting = ctx.builder.mode().is_insert();

        if inserting || !ctx.inserting {
            ctx.inserting = inserting;

            return Ok(());
        }

        ctx.inserting = false;

        let text = std::mem::take(&mut ctx.inserted);

        if let Some(change) = ctx.change.take() {
            ctx.last_change = Some(change);
        }

        self.store().set_last_inserted(&text);

        return Ok(());
    }

    /// The register named after `q` or `@`.
    ///
    /// For `@@`, this is `Some(None)`, meaning the last replayed register.
    fn register_argument(cmd: &Command) -> Option<Option<RegisterName>> {
        match cmd.argument?.get_char()? {
            '@' if cmd.action()?.builtin == Some(Builtin::ReplayMacro) => Some(None),
            c => RegisterName::from_char(c).map(Some),
        }
    }

    fn start_recording(
        &mut self,
        id: ContextId,
        cmd: &Command,
        handled: &mut Handled,
    ) -> Result<(), InterpretError> {
        let register = match Session::register_argument(cmd) {
            Some(Some(name)) if name.is_read_only() => {
                return Err(RegisterError::ReadOnly(name).into());
            },
            Some(Some(name)) => name,
            _ => {
                handled.recovered = Some(InterpretError::InvalidSequence(cmd.notation()));

                return Ok(());
            },
        };

        let ctx = self.context(id)?;

        tracing::debug!(ctx = %id, register = %register, "recording macro");

        ctx.recording = Some(Recording { register, keys: vec![] });

        return Ok(());
    }

    fn stop_recording(&mut self, id: ContextId) -> Result<(), InterpretError> {
        let Some(recording) = self.context(id)?.recording.take() else {
            return Ok(());
        };

        tracing::debug!(
            ctx = %id,
            register = %recording.register,
            keys = %KeyToken::notate(&recording.keys),
            "finished recording macro"
        );

        self.store().set_macro(recording.register, &recording.keys)?;

        return Ok(());
    }

    fn replay<E: Editor>(
        &mut self,
        id: ContextId,
        editor: &mut E,
        cmd: &Command,
        handled: &mut Handled,
        depth: usize,
    ) -> Result<(), InterpretError> {
        if depth >= self.config.max_macro_depth {
            tracing::warn!(ctx = %id, depth, "macro replay is too deeply nested");

            return Err(MacroError::LoopingMacro(depth).into());
        }

        let Some(name) = Session::register_argument(cmd) else {
            handled.recovered = Some(InterpretError::InvalidSequence(cmd.notation()));

            return Ok(());
        };

        let keys = self.store().macro_keys(name)?;

        tracing::debug!(ctx = %id, keys = %KeyToken::notate(&keys), "replaying macro");

        for _ in 0..cmd.count_or_default() {
            for key in keys.iter() {
                self.input(id, editor, *key, handled, depth + 1)?;
            }
        }

        return Ok(());
    }

    fn repeat<E: Editor>(
        &mut self,
        id: ContextId,
        editor: &mut E,
        cmd: &Command,
        handled: &mut Handled,
    ) -> Result<(), InterpretError> {
        let ctx = self.context(id)?;

        let Some(mut change) = ctx.last_change.clone() else {
            tracing::debug!(ctx = %id, "no change to repeat");

            return Ok(());
        };

        // A count given to `.` replaces the original one from now on.
        if let (Some(count), Some(first)) = (cmd.count, change.first_mut()) {
            *first = first.clone().with_count(count);
            ctx.last_change = Some(change.clone());
        }

        for cmd in change {
            if let Outcome::Done(_) = Dispatcher::execute(editor, &self.registers, &cmd)? {
                handled.executed.push(cmd);
            }
        }

        return Ok(());
    }
}
