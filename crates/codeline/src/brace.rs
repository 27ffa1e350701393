//! Auto-inserted closing bracket tracking.

use codeline_lang::BracketMap;

/// What typing a character should do, as decided by [`BraceStack::on_type`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeAction {
    /// Step over the auto-inserted closer already under the cursor.
    SkipCloser,
    /// Insert the opener followed by its closer; the cursor lands between them.
    InsertPair(char, char),
    /// Insert the character alone.
    Insert(char),
}

/// Stack of closers the engine inserted and still expects the user to type or delete past.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BraceStack {
    expected: Vec<char>,
}

impl BraceStack {
    /// An empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// The closer expected next.
    pub fn top(&self) -> Option<char> {
        self.expected.last().copied()
    }

    /// Stack depth.
    pub fn len(&self) -> usize {
        self.expected.len()
    }

    /// Returns `true` if nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.expected.is_empty()
    }

    /// Forget every tracked closer.
    pub fn clear(&mut self) {
        self.expected.clear();
    }

    /// Pop the top closer.
    pub fn pop(&mut self) -> Option<char> {
        self.expected.pop()
    }

    /// Decide how to type `ch` when `next` is the character under the cursor (`None` at end of line).
    pub fn on_type(&mut self, brackets: &BracketMap, ch: char, next: Option<char>) -> TypeAction {
        if self.top() == Some(ch) {
            self.expected.pop();
            if next == Some(ch) {
                return TypeAction::SkipCloser;
            }
            return TypeAction::Insert(ch);
        }

        if let Some(close) = brackets.closer_for(ch)
            && next.is_none_or(|c| c.is_whitespace() || c.is_ascii_punctuation())
        {
            self.expected.push(close);
            return TypeAction::InsertPair(ch, close);
        }

        TypeAction::Insert(ch)
    }

    /// Delete key with `next` under the cursor: pops a matching tracked closer.
    pub fn on_delete(&mut self, next: Option<char>) {
        if next.is_some() && self.top() == next {
            self.expected.pop();
        }
    }

    /// Backspace removing `prev` with `next` under the cursor.
    ///
    /// Returns `true` when the closer after the cursor must be deleted together with `prev`.
    pub fn on_backspace(&mut self, brackets: &BracketMap, prev: char, next: Option<char>) -> bool {
        let Some(top) = self.top() else {
            return false;
        };
        if next == Some(top) && brackets.closer_for(prev) == Some(top) {
            self.expected.pop();
            return true;
        }
        false
    }

    /// Returns `true` if the cursor sits between a tracked `open`/`close` pair.
    pub fn is_inside_pair(&self, brackets: &BracketMap, prev: Option<char>, next: Option<char>) -> bool {
        match (prev, next, self.top()) {
            (Some(open), Some(close), Some(top)) => {
                top == close && brackets.closer_for(open) == Some(close)
            }
            _ => false,
        }
    }
}
