//! Undo/redo stacks with typing coalescing.
//!
//! An [`UndoItem`] records the range an edit replaced (`before`, with its old text) and the
//! range the new text occupies (`after`). An item whose `after_text` is still `None` is *open*:
//! consecutive keystrokes keep extending it until something closes it.

use crate::document::Document;
use crate::position::{TextLocation, TextRange};
use std::collections::VecDeque;

/// One undoable step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoItem {
    /// Range replaced by the edit, in pre-edit coordinates.
    pub before: TextRange,
    /// Text of `before` prior to the edit.
    pub before_text: String,
    /// Range occupied by the new text, in post-edit coordinates.
    pub after: TextRange,
    /// Text of `after`; `None` while the item is still coalescing keystrokes.
    pub after_text: Option<String>,
}

impl UndoItem {
    /// Returns `true` while the item is still coalescing keystrokes.
    pub fn is_open(&self) -> bool {
        self.after_text.is_none()
    }
}

/// Bounded undo stack plus unbounded redo stack.
#[derive(Debug, Clone)]
pub struct UndoEngine {
    undo_stack: VecDeque<UndoItem>,
    redo_stack: Vec<UndoItem>,
    capacity: usize,
}

impl UndoEngine {
    /// Create an engine keeping at most `capacity` undo steps.
    pub fn new(capacity: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    /// Can undo
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Can redo
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Undo stack depth
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Redo stack depth
    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    /// Top of the undo stack.
    pub fn peek(&self) -> Option<&UndoItem> {
        self.undo_stack.back()
    }

    /// Drop all history.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    fn push(&mut self, item: UndoItem) {
        self.undo_stack.push_back(item);
        while self.undo_stack.len() > self.capacity {
            self.undo_stack.pop_front();
        }
    }

    /// Open a new step replacing `before` (whose current text is `before_text`).
    ///
    /// Clears the redo stack.
    pub fn begin(&mut self, before: TextRange, before_text: String) {
        self.redo_stack.clear();
        self.push(UndoItem {
            before,
            before_text,
            after: TextRange::caret(before.front()),
            after_text: None,
        });
    }

    /// Close the top step with its final `after` range and text.
    pub fn end(&mut self, after: TextRange, after_text: String) {
        if let Some(mut item) = self.undo_stack.pop_back() {
            item.after = after;
            item.after_text = Some(after_text);
            self.undo_stack.push_back(item);
        }
    }

    /// Continue the open typing step, or close it and open a fresh one at `cursor`.
    ///
    /// The open step is reused only while its `before` range is not inverted and `cursor` lies
    /// inside the text it has collected so far. Returns `true` if it was reused.
    pub fn begin_typing(&mut self, document: &Document, cursor: TextLocation) -> bool {
        self.redo_stack.clear();
        let reusable = self.undo_stack.back().is_some_and(|item| {
            item.is_open() && !item.before.is_inverted() && covers(item.after, cursor)
        });
        if reusable {
            return true;
        }

        self.end_typing(document);
        self.begin(TextRange::caret(cursor), String::new());
        false
    }

    /// Record `inserted_len` chars typed at `at` into the open step.
    ///
    /// Returns `false` if there is no open step or `at` lies outside its `after` range.
    pub fn extend_typing(&mut self, at: TextLocation, inserted_len: usize) -> bool {
        let Some(item) = self.undo_stack.back_mut().filter(|item| item.is_open()) else {
            return false;
        };
        if !covers(item.after, at) {
            return false;
        }
        let (front, back) = (item.after.front(), item.after.back());
        item.after = TextRange::new(front, TextLocation::new(back.line, back.column + inserted_len));
        true
    }

    /// Close the open step, if any, capturing the text its `after` range now holds.
    pub fn end_typing(&mut self, document: &Document) {
        if let Some(item) = self.undo_stack.back_mut().filter(|item| item.is_open()) {
            item.after_text = Some(document.get_text(item.after));
        }
    }

    /// Pop the most recent step and move it to the redo stack, returning a copy.
    pub(crate) fn take_undo(&mut self) -> Option<UndoItem> {
        let item = self.undo_stack.pop_back()?;
        self.redo_stack.push(item.clone());
        Some(item)
    }

    /// Pop the most recently undone step and move it back to the undo stack, returning a copy.
    pub(crate) fn take_redo(&mut self) -> Option<UndoItem> {
        let item = self.redo_stack.pop()?;
        self.push(item.clone());
        Some(item)
    }
}

fn covers(range: TextRange, at: TextLocation) -> bool {
    let (front, back) = (range.front(), range.back());
    at.line == back.line && front <= at && at <= back
}

impl Default for UndoEngine {
    fn default() -> Self {
        Self::new(1000)
    }
}
