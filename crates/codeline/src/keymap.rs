//! Declarative key dispatch: (key, modifiers) → [`EditorCommand`].

use bitflags::bitflags;
use std::collections::HashMap;

/// A physical key, independent of any front end's event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// A printable character.
    Char(char),
    /// Enter / Return
    Enter,
    /// Backspace
    Backspace,
    /// Delete (forward)
    Delete,
    /// Tab
    Tab,
    /// Left arrow
    Left,
    /// Right arrow
    Right,
    /// Up arrow
    Up,
    /// Down arrow
    Down,
    /// Home
    Home,
    /// End
    End,
    /// Escape
    Escape,
}

bitflags! {
    /// Modifier keys held during a key press.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        /// Shift
        const SHIFT = 0b0001;
        /// Control (Command on macOS front ends)
        const CONTROL = 0b0010;
        /// Alt / Option
        const ALT = 0b0100;
    }
}

/// Cursor motions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Motion {
    /// One char left, wrapping to the end of the previous line.
    Left,
    /// One char right, wrapping to the start of the next line.
    Right,
    /// One line up, keeping the sticky column.
    Up,
    /// One line down, keeping the sticky column.
    Down,
    /// Column 1
    LineStart,
    /// Past the last char of the line
    LineEnd,
    /// Start of the previous word
    WordLeft,
    /// End of the next word
    WordRight,
    /// (1, 1)
    DocumentStart,
    /// End of the last line
    DocumentEnd,
}

/// Editor commands reachable from the key table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditorCommand {
    /// Move the cursor, dropping the selection.
    Move(Motion),
    /// Move the cursor, extending the selection.
    Select(Motion),
    /// Delete backward
    Backspace,
    /// Delete forward
    Delete,
    /// Split the line
    Enter,
    /// Indent / insert indentation
    Tab,
    /// Outdent the current line or selected lines
    Outdent,
    /// Undo
    Undo,
    /// Redo
    Redo,
    /// Cut the selection
    Cut,
    /// Copy the selection
    Copy,
    /// Paste
    Paste,
    /// Select everything
    SelectAll,
    /// Drop the selection
    ClearSelection,
}

/// Lookup table from key chords to commands.
#[derive(Debug, Clone, Default)]
pub struct KeyMap {
    bindings: HashMap<(Key, Modifiers), EditorCommand>,
}

impl KeyMap {
    /// A table with no bindings.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Conventional desktop bindings.
    pub fn default_bindings() -> Self {
        let none = Modifiers::empty();
        let shift = Modifiers::SHIFT;
        let ctrl = Modifiers::CONTROL;
        let ctrl_shift = Modifiers::CONTROL | Modifiers::SHIFT;

        let motions = [
            (Key::Left, none, Motion::Left),
            (Key::Right, none, Motion::Right),
            (Key::Up, none, Motion::Up),
            (Key::Down, none, Motion::Down),
            (Key::Home, none, Motion::LineStart),
            (Key::End, none, Motion::LineEnd),
            (Key::Left, ctrl, Motion::WordLeft),
            (Key::Right, ctrl, Motion::WordRight),
            (Key::Home, ctrl, Motion::DocumentStart),
            (Key::End, ctrl, Motion::DocumentEnd),
        ];

        let mut map = Self::empty();
        for (key, modifiers, motion) in motions {
            map.bind(key, modifiers, EditorCommand::Move(motion));
            map.bind(key, modifiers | shift, EditorCommand::Select(motion));
        }

        map.bind(Key::Backspace, none, EditorCommand::Backspace);
        map.bind(Key::Backspace, shift, EditorCommand::Backspace);
        map.bind(Key::Delete, none, EditorCommand::Delete);
        map.bind(Key::Enter, none, EditorCommand::Enter);
        map.bind(Key::Enter, shift, EditorCommand::Enter);
        map.bind(Key::Tab, none, EditorCommand::Tab);
        map.bind(Key::Tab, shift, EditorCommand::Outdent);
        map.bind(Key::Escape, none, EditorCommand::ClearSelection);
        map.bind(Key::Char('z'), ctrl, EditorCommand::Undo);
        map.bind(Key::Char('y'), ctrl, EditorCommand::Redo);
        map.bind(Key::Char('z'), ctrl_shift, EditorCommand::Redo);
        map.bind(Key::Char('x'), ctrl, EditorCommand::Cut);
        map.bind(Key::Char('c'), ctrl, EditorCommand::Copy);
        map.bind(Key::Char('v'), ctrl, EditorCommand::Paste);
        map.bind(Key::Char('a'), ctrl, EditorCommand::SelectAll);
        map
    }

    /// Bind a chord, replacing any previous binding. Returns the replaced command.
    pub fn bind(
        &mut self,
        key: Key,
        modifiers: Modifiers,
        command: EditorCommand,
    ) -> Option<EditorCommand> {
        self.bindings.insert((normalize(key), modifiers), command)
    }

    /// Remove a binding.
    pub fn unbind(&mut self, key: Key, modifiers: Modifiers) -> Option<EditorCommand> {
        self.bindings.remove(&(normalize(key), modifiers))
    }

    /// The command bound to a chord.
    pub fn resolve(&self, key: Key, modifiers: Modifiers) -> Option<EditorCommand> {
        self.bindings.get(&(normalize(key), modifiers)).copied()
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns `true` if nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Letter chords match regardless of the case the front end reports.
fn normalize(key: Key) -> Key {
    match key {
        Key::Char(ch) if ch.is_ascii_uppercase() => Key::Char(ch.to_ascii_lowercase()),
        other => other,
    }
}
