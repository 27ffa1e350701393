//! Cursor and selection tracking.

use crate::document::Document;
use crate::position::{TextLocation, TextRange};
use bitflags::bitflags;

bitflags! {
    /// Modifiers of a cursor move.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MoveFlags: u8 {
        /// Extend (or start) the selection instead of clearing it.
        const HIGHLIGHTING = 0b0001;
        /// Vertical move: keep the sticky column.
        const REMEMBER_COLUMN = 0b0010;
        /// Move caused by typing; keeps bracket tracking alive.
        const TYPING = 0b0100;
    }
}

/// Result of a cursor move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorMove {
    /// Location before the move.
    pub from: TextLocation,
    /// Location after the move.
    pub to: TextLocation,
    /// Selection before the move.
    pub old_selection: Option<TextRange>,
    /// Selection after the move.
    pub new_selection: Option<TextRange>,
}

/// Tracks the cursor, the optional anchor of the selection and the sticky "virtual" column.
#[derive(Debug, Clone, Default)]
pub struct CursorTracker {
    location: TextLocation,
    anchor: Option<TextLocation>,
    virtual_column: Option<usize>,
}

impl CursorTracker {
    /// A tracker at (1, 1) without selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current cursor location.
    pub fn location(&self) -> TextLocation {
        self.location
    }

    /// The remembered column for vertical moves, if any.
    pub fn virtual_column(&self) -> Option<usize> {
        self.virtual_column
    }

    /// The anchor→cursor pair, if a selection is active.
    pub fn selection_range(&self) -> Option<TextRange> {
        self.anchor
            .map(|anchor| TextRange::new(anchor, self.location))
    }

    /// The active selection, or a zero-length range at the cursor.
    pub fn selection(&self) -> TextRange {
        self.selection_range()
            .unwrap_or_else(|| TextRange::caret(self.location))
    }

    /// Returns `true` if a non-empty selection is active.
    pub fn has_selection(&self) -> bool {
        self.selection_range().is_some_and(|range| !range.is_empty())
    }

    /// Forget position and selection without touching any line (the lines are gone).
    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }

    /// Move the cursor, updating the per-line cursor column and selection highlights.
    pub fn move_to(
        &mut self,
        document: &Document,
        line: usize,
        column: usize,
        flags: MoveFlags,
    ) -> CursorMove {
        let from = self.location;
        let old_selection = self.selection_range();

        let line_count = document.line_count();
        let line = if line != from.line {
            line.clamp(1, line_count)
        } else {
            line.min(line_count)
        };
        let max_column = document.line_len(line) + 1;

        let column = if flags.contains(MoveFlags::REMEMBER_COLUMN) {
            let remembered = *self.virtual_column.get_or_insert(from.column);
            remembered.min(max_column)
        } else {
            self.virtual_column = None;
            column
        };
        let to = TextLocation::new(line, column.clamp(1, max_column));

        if flags.contains(MoveFlags::HIGHLIGHTING) {
            self.anchor.get_or_insert(from);
        } else {
            self.anchor = None;
        }
        self.location = to;
        let new_selection = self.selection_range();

        if let Some(range) = old_selection {
            clear_highlight(document, range);
        }
        if let Some(range) = new_selection {
            apply_highlight(document, range);
        }

        document.set_cursor_column(from.line, 0);
        document.set_cursor_column(to.line, to.column);

        CursorMove {
            from,
            to,
            old_selection,
            new_selection,
        }
    }

    /// Drop the selection and clear its highlights, keeping the cursor where it is.
    pub fn clear_selection(&mut self, document: &Document) {
        if let Some(range) = self.selection_range() {
            clear_highlight(document, range);
        }
        self.anchor = None;
    }

    /// Clear every per-line mark this tracker owns, ahead of a structural edit.
    pub(crate) fn detach(&mut self, document: &Document) {
        self.clear_selection(document);
        document.set_cursor_column(self.location.line, 0);
    }
}

fn clear_highlight(document: &Document, range: TextRange) {
    for line in range.front().line..=range.back().line {
        document.set_line_selection(line, 0, 0);
    }
}

fn apply_highlight(document: &Document, range: TextRange) {
    let (front, back) = (range.front(), range.back());
    if front == back {
        return;
    }

    if front.line == back.line {
        document.set_line_selection(front.line, front.column, back.column);
        return;
    }

    document.set_line_selection(front.line, front.column, document.line_len(front.line) + 1);
    for line in front.line + 1..back.line {
        document.set_line_selection(line, 1, document.line_len(line) + 1);
    }
    document.set_line_selection(back.line, 1, back.column);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_clamped_to_line() {
        let doc = Document::from_text("abc\nlonger line");
        let mut cursor = CursorTracker::new();
        let moved = cursor.move_to(&doc, 1, 99, MoveFlags::empty());
        assert_eq!(moved.to, TextLocation::new(1, 4));
        let moved = cursor.move_to(&doc, 7, 0, MoveFlags::empty());
        assert_eq!(moved.to, TextLocation::new(2, 1));
    }

    #[test]
    fn test_sticky_column_across_short_line() {
        let doc = Document::from_text("long line here\nab\nanother long one");
        let mut cursor = CursorTracker::new();
        cursor.move_to(&doc, 1, 10, MoveFlags::empty());

        cursor.move_to(&doc, 2, 10, MoveFlags::REMEMBER_COLUMN);
        assert_eq!(cursor.location(), TextLocation::new(2, 3));
        assert_eq!(cursor.virtual_column(), Some(10));

        cursor.move_to(&doc, 3, 3, MoveFlags::REMEMBER_COLUMN);
        assert_eq!(cursor.location(), TextLocation::new(3, 10));

        cursor.move_to(&doc, 3, 4, MoveFlags::empty());
        assert_eq!(cursor.virtual_column(), None);
    }

    #[test]
    fn test_highlighting_marks_lines() {
        let doc = Document::from_text("Hello\nbig\nWorld");
        let mut cursor = CursorTracker::new();
        cursor.move_to(&doc, 1, 3, MoveFlags::empty());
        cursor.move_to(&doc, 3, 2, MoveFlags::HIGHLIGHTING);

        assert_eq!(
            cursor.selection(),
            TextRange::new(TextLocation::new(1, 3), TextLocation::new(3, 2))
        );
        assert_eq!(doc.line(1).unwrap().selection(), Some((3, 6)));
        assert_eq!(doc.line(2).unwrap().selection(), Some((1, 4)));
        assert_eq!(doc.line(3).unwrap().selection(), Some((1, 2)));

        cursor.move_to(&doc, 1, 1, MoveFlags::empty());
        assert!(cursor.selection_range().is_none());
        for line in 1..=3 {
            assert_eq!(doc.line(line).unwrap().selection(), None);
        }
    }

    #[test]
    fn test_only_cursor_line_has_cursor_column() {
        let doc = Document::from_text("a\nb\nc");
        let mut cursor = CursorTracker::new();
        cursor.move_to(&doc, 2, 2, MoveFlags::empty());
        cursor.move_to(&doc, 3, 1, MoveFlags::empty());
        assert_eq!(doc.line(1).unwrap().cursor_column(), 0);
        assert_eq!(doc.line(2).unwrap().cursor_column(), 0);
        assert_eq!(doc.line(3).unwrap().cursor_column(), 1);
    }
}
