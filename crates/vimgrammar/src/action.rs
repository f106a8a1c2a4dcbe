//! # Action descriptors
//!
//! ## Overview
//!
//! Every binding in the command trie points at an [ActionDescriptor]. Descriptors don't say how
//! to perform an action, which is left to the host's [Editor](crate::dispatch::Editor); they only
//! describe the shape of the command that invokes it: its [Role], what else it accepts, what it
//! does to the registers, and which mode comes afterwards.
use bitflags::bitflags;

use crate::mode::VimMode;

/// What part of a command an action plays.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum Role {
    /// Acts on the text covered by a following motion or text object (`d`, `y`, `>`).
    Operator,

    /// Moves the cursor (`w`, `j`, `fx`).
    Motion,

    /// Selects a region around the cursor (`iw`, `a(`).
    TextObject,

    /// Does something on its own (`x`, `p`, `i`).
    Command,
}

bitflags! {
    /// Capabilities and properties of an action.
    #[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
    pub struct ActionFlags: u8 {
        /// The action can be repeated with a count.
        const COUNT = 0b00000001;

        /// The action reads or writes a register.
        const REGISTER = 0b00000010;

        /// The action takes the next key verbatim as an argument.
        const ARGUMENT = 0b00000100;

        /// The action works on whole lines.
        const LINEWISE = 0b00001000;

        /// The motion doesn't include the character it lands on.
        const EXCLUSIVE = 0b00010000;

        /// The action leaves Visual mode active afterwards.
        const KEEP_VISUAL = 0b00100000;
    }
}

/// How an action affects the registers once it has been performed.
#[derive(Clone, Copy, Debug, Default, Hash, Eq, PartialEq)]
pub enum RegisterEffect {
    /// Registers are left alone.
    #[default]
    None,

    /// Copied text goes into the registers.
    Yank,

    /// Deleted text goes into the registers.
    Delete,

    /// Text is taken from a register.
    Put,
}

/// Actions that the session handles itself instead of passing to the editor.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum Builtin {
    /// Start recording keys into the register named by the argument.
    RecordMacro,

    /// Replay the keys stored in the register named by the argument.
    ReplayMacro,

    /// Repeat the last change.
    RepeatLast,
}

/// Declarative description of a bound action.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct ActionDescriptor {
    /// The part this action plays in a command.
    pub role: Role,

    /// A name identifying the action to the editor.
    pub name: &'static str,

    /// What the action accepts, and how it behaves.
    pub flags: ActionFlags,

    /// What the action does to the registers.
    pub effect: RegisterEffect,

    /// The mode to switch to after the action.
    pub enter: Option<VimMode>,

    /// Set for actions the session performs itself.
    pub builtin: Option<Builtin>,
}

impl ActionDescriptor {
    const fn new(role: Role, name: &'static str) -> Self {
        ActionDescriptor {
            role,
            name,
            flags: ActionFlags::empty(),
            effect: RegisterEffect::None,
            enter: None,
            builtin: None,
        }
    }

    /// Describe an operator.
    pub const fn operator(name: &'static str) -> Self {
        Self::new(Role::Operator, name)
    }

    /// Describe a motion.
    pub const fn motion(name: &'static str) -> Self {
        Self::new(Role::Motion, name)
    }

    /// Describe a text object.
    pub const fn text_object(name: &'static str) -> Self {
        Self::new(Role::TextObject, name)
    }

    /// Describe a command.
    pub const fn command(name: &'static str) -> Self {
        Self::new(Role::Command, name)
    }

    /// Add flags to this description.
    pub const fn with(mut self, flags: ActionFlags) -> Self {
        self.flags = self.flags.union(flags);
        self
    }

    /// Set how this action affects the registers.
    pub const fn effect(mut self, effect: RegisterEffect) -> Self {
        self.effect = effect;
        self
    }

    /// Switch to `mode` after this action.
    pub const fn enters(mut self, mode: VimMode) -> Self {
        self.enter = Some(mode);
        self
    }

    /// Mark this as an action the session performs itself.
    pub const fn builtin(mut self, builtin: Builtin) -> Self {
        self.builtin = Some(builtin);
        self
    }

    /// Whether this action needs a motion or text object to complete.
    pub fn needs_motion(&self) -> bool {
        self.role == Role::Operator
    }

    /// Whether this action takes the following key as an argument.
    pub fn needs_argument(&self) -> bool {
        self.flags.contains(ActionFlags::ARGUMENT)
    }

    /// Whether this action can be given a count.
    pub fn accepts_count(&self) -> bool {
        self.flags.contains(ActionFlags::COUNT)
    }

    /// Whether this action can be given a register.
    pub fn accepts_register(&self) -> bool {
        self.flags.contains(ActionFlags::REGISTER)
    }

    /// Whether this action works on whole lines.
    pub fn is_linewise(&self) -> bool {
        self.flags.contains(ActionFlags::LINEWISE)
    }
}
