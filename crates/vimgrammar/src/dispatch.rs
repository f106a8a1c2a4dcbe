//! # Dispatching commands
//!
//! ## Overview
//!
//! This crate only decides *which* command was typed. Doing it is left to the host, which
//! implements [Editor] for its text buffer. The [Dispatcher] sits between the two: it wraps each
//! completed [Command] in an undo transaction, hands it to the editor, and then records whatever
//! the editor yanked or deleted in the [RegisterStore](crate::register::RegisterStore).
use std::fmt;

use keytrie::InputKey;

use crate::action::RegisterEffect;
use crate::builder::{Command, CommandKind};
use crate::errors::InterpretError;
use crate::register::{RegisterCell, RegisterError, RegisterName, SharedRegisters};

/// What performing an action did, as far as the registers are concerned.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum Effect {
    /// Nothing worth recording.
    #[default]
    None,

    /// Text was copied.
    Yanked(RegisterCell),

    /// Text was removed.
    Deleted(RegisterCell),

    /// Text was typed or pasted.
    Inserted(String),
}

/// A command for the [Editor] to perform.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ActionRequest<'a> {
    /// The command to perform.
    pub command: &'a Command,

    /// For commands that paste text, the contents of the register to paste.
    pub contents: Option<RegisterCell>,
}

/// The host's text buffer, and the implementations of every action in its catalog.
pub trait Editor {
    /// The error returned when an action fails.
    type Error: fmt::Display;

    /// Start an undo transaction.
    fn begin_change(&mut self);

    /// Finish the current undo transaction.
    fn end_change(&mut self);

    /// Perform a command.
    fn perform(&mut self, request: &ActionRequest<'_>) -> Result<Effect, Self::Error>;
}

/// How executing a command went.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// The editor performed the command, with this effect.
    Done(Effect),

    /// There was nothing to do, and the editor wasn't asked.
    NoOp,
}

/// Runs completed commands against an [Editor].
#[derive(Clone, Copy, Debug, Default)]
pub struct Dispatcher;

impl Dispatcher {
    /// The register a pasting command reads from.
    ///
    /// This is the register typed before the command, or for Insert mode's `<C-R>`, the register
    /// typed after it.
    fn source(command: &Command) -> Result<RegisterName, InterpretError> {
        if let Some(name) = command.register {
            return Ok(name);
        }

        match command.argument {
            None => Ok(RegisterName::Unnamed),
            Some(key) => {
                key.get_char()
                    .and_then(RegisterName::from_char)
                    .ok_or_else(|| InterpretError::InvalidSequence(command.notation()))
            },
        }
    }

    /// Perform `command` in its own undo transaction, and then update the registers.
    pub fn execute<E: Editor>(
        editor: &mut E,
        registers: &SharedRegisters,
        command: &Command,
    ) -> Result<Outcome, InterpretError> {
        let contents = match (&command.kind, command.effect()) {
            (CommandKind::Literal(_), _) => None,
            (_, RegisterEffect::Put) => {
                let name = Dispatcher::source(command)?;
                let store = registers.read().map_err(|_| RegisterError::Poisoned)?;

                match store.read(name) {
                    Some(cell) => Some(cell),
                    None => {
                        tracing::debug!(register = %name, "nothing in register to put");

                        return Ok(Outcome::NoOp);
                    },
                }
            },
            _ => None,
        };

        let request = ActionRequest { command, contents };

        editor.begin_change();
        let res = editor.perform(&request);
        editor.end_change();

        let effect = res.map_err(|e| {
            let err = InterpretError::ActionExecutionFailure {
                action: command.name().to_string(),
                reason: e.to_string(),
            };

            tracing::warn!(%err, keys = %command.notation(), "failed to perform command");

            err
        })?;

        match &effect {
            Effect::Yanked(cell) => {
                let mut store = registers.write().map_err(|_| RegisterError::Poisoned)?;
                store.record_yank(command.register, cell.clone())?;
            },
            Effect::Deleted(cell) => {
                let mut store = registers.write().map_err(|_| RegisterError::Poisoned)?;
                store.record_delete(command.register, cell.clone())?;
            },
            Effect::Inserted(_) | Effect::None => {},
        }

        return Ok(Outcome::Done(effect));
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::{Arc, RwLock};

    use crate::builder::{Advance, CommandBuilder};
    use crate::catalog::Catalog;
    use crate::register::{RegisterShape, RegisterStore};

    /// An editor that records what it was asked to do.
    #[derive(Debug, Default)]
    pub(crate) struct TestEditor {
        pub performed: Vec<String>,
        pub pasted: Vec<String>,
        pub depth: usize,
        pub changes: usize,
        pub fail: Option<&'static str>,
    }

    impl Editor for TestEditor {
        type Error = String;

        fn begin_change(&mut self) {
            assert_eq!(self.depth, 0, "nested undo transaction");
            self.depth += 1;
        }

        fn end_change(&mut self) {
            assert_eq!(self.depth, 1, "unbalanced undo transaction");
            self.depth -= 1;
            self.changes += 1;
        }

        fn perform(&mut self, request: &ActionRequest<'_>) -> Result<Effect, String> {
            let cmd = request.command;

            if self.fail == Some(cmd.name()) {
                return Err("Buffer is read-only".into());
            }

            let desc = match cmd.count {
                Some(n) => format!("{}x{}", cmd.name(), n),
                None => cmd.name().to_string(),
            };
            self.performed.push(desc);

            if let Some(cell) = &request.contents {
                self.pasted.push(cell.text.clone());
            }

            let effect = match (&cmd.kind, cmd.effect()) {
                (CommandKind::Literal(key), _) => {
                    Effect::Inserted(key.get_char().map(String::from).unwrap_or_default())
                },
                (_, RegisterEffect::Yank) => {
                    Effect::Yanked(RegisterCell::new(RegisterShape::LineWise, "yanked\n"))
                },
                (_, RegisterEffect::Delete) => {
                    Effect::Deleted(RegisterCell::new(RegisterShape::CharWise, cmd.name()))
                },
                (_, RegisterEffect::Put) => {
                    Effect::Inserted(request.contents.clone().unwrap_or_default().text)
                },
                (_, RegisterEffect::None) => Effect::None,
            };

            Ok(effect)
        }
    }

    fn command(keys: &str) -> Command {
        let mut builder = CommandBuilder::new(Arc::new(Catalog::vim().build().unwrap()));

        for key in keys!(keys) {
            if let Advance::Complete(cmd) = builder.advance(key) {
                return cmd;
            }
        }

        panic!("{keys:?} didn't complete");
    }

    fn text(registers: &SharedRegisters, name: RegisterName) -> Option<String> {
        registers.read().unwrap().read(name).map(|cell| cell.text)
    }

    #[test]
    fn test_execute_records_registers() {
        let registers = Arc::new(RwLock::new(RegisterStore::new()));
        let mut editor = TestEditor::default();

        let res = Dispatcher::execute(&mut editor, &registers, &command("yy"));
        let yanked = RegisterCell::new(RegisterShape::LineWise, "yanked\n");
        assert_eq!(res, Ok(Outcome::Done(Effect::Yanked(yanked))));
        assert_eq!(text(&registers, RegisterName::Unnamed), Some("yanked\n".into()));
        assert_eq!(text(&registers, RegisterName::Numbered(0)), Some("yanked\n".into()));

        let res = Dispatcher::execute(&mut editor, &registers, &command("\"adw"));
        assert!(matches!(res, Ok(Outcome::Done(Effect::Deleted(_)))));
        assert_eq!(text(&registers, RegisterName::Named('a')), Some("delete".into()));
        assert_eq!(text(&registers, RegisterName::Unnamed), Some("yanked\n".into()));

        let res = Dispatcher::execute(&mut editor, &registers, &command("x"));
        assert!(matches!(res, Ok(Outcome::Done(Effect::Deleted(_)))));
        assert_eq!(text(&registers, RegisterName::Unnamed), Some("delete-char".into()));
        assert_eq!(text(&registers, RegisterName::SmallDelete), Some("delete-char".into()));

        assert_eq!(editor.performed, vec!["yank", "delete", "delete-char"]);
        assert_eq!(editor.changes, 3);
        assert_eq!(editor.depth, 0);
    }

    #[test]
    fn test_execute_put() {
        let registers = Arc::new(RwLock::new(RegisterStore::new()));
        let mut editor = TestEditor::default();

        // Nothing to paste yet.
        let res = Dispatcher::execute(&mut editor, &registers, &command("p"));
        assert_eq!(res, Ok(Outcome::NoOp));
        assert_eq!(editor.changes, 0);

        registers
            .write()
            .unwrap()
            .write(RegisterName::Named('q'), "hello", RegisterShape::CharWise, false)
            .unwrap();

        let res = Dispatcher::execute(&mut editor, &registers, &command("\"q2p"));
        assert_eq!(res, Ok(Outcome::Done(Effect::Inserted("hello".into()))));
        assert_eq!(editor.performed, vec!["put-afterx2"]);
        assert_eq!(editor.pasted, vec!["hello"]);

        // Insert mode names the register after <C-R>.
        let mut builder = CommandBuilder::new(Arc::new(Catalog::vim().build().unwrap()));
        builder.advance(key!('i'));
        builder.advance(ctl!('r'));
        let Advance::Complete(cmd) = builder.advance(key!('q')) else {
            panic!("expected <C-R>q to complete");
        };

        let res = Dispatcher::execute(&mut editor, &registers, &cmd);
        assert_eq!(res, Ok(Outcome::Done(Effect::Inserted("hello".into()))));
        assert_eq!(editor.pasted, vec!["hello", "hello"]);
    }

    #[test]
    fn test_execute_failure() {
        let registers = Arc::new(RwLock::new(RegisterStore::new()));
        let mut editor = TestEditor { fail: Some("delete"), ..Default::default() };

        let res = Dispatcher::execute(&mut editor, &registers, &command("dw"));
        assert_eq!(
            res,
            Err(InterpretError::ActionExecutionFailure {
                action: "delete".into(),
                reason: "Buffer is read-only".into(),
            })
        );

        // The transaction was still closed, and nothing was recorded.
        assert_eq!(editor.depth, 0);
        assert_eq!(editor.changes, 1);
        assert_eq!(text(&registers, RegisterName::Unnamed), None);

        // Deleting into a read-only register fails after the edit.
        let mut editor = TestEditor::default();
        let res = Dispatcher::execute(&mut editor, &registers, &command("\".x"));
        assert_eq!(
            res,
            Err(InterpretError::Register(RegisterError::ReadOnly(RegisterName::LastInserted)))
        );
        assert_eq!(editor.changes, 1);
    }
}
