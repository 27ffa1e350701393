//! The line buffer: an ordered, 1-indexed sequence of [`Line`]s plus a content version.
//!
//! The line list, the version counter and the line ending sit behind one document-level lock.
//! Each line carries its own lock. Lock order is always document → line.

use crate::guarded::GuardedCell;
use crate::line::{Line, Piece};
use crate::position::{TextLocation, TextRange};
use crate::text::{LineEnding, char_at, char_len, char_slice, split_lines};
use std::sync::Arc;

#[derive(Debug)]
struct DocumentState {
    lines: Vec<Arc<Line>>,
    version: u64,
    line_ending: LineEnding,
}

/// Result of a [`Document::replace_text`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaceOutcome {
    /// Where the cursor lands: just after the inserted text.
    pub cursor: TextLocation,
    /// First line touched.
    pub first_line: usize,
    /// Lines removed after `first_line`.
    pub lines_removed: usize,
    /// Lines inserted after `first_line`.
    pub lines_inserted: usize,
}

/// The document.
///
/// Invariant: `line_count() >= 1`.
#[derive(Debug)]
pub struct Document {
    state: GuardedCell<DocumentState>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

fn clamp_in(lines: &[Arc<Line>], loc: TextLocation) -> TextLocation {
    let line = loc.line.clamp(1, lines.len());
    let max_column = lines[line - 1].len() + 1;
    TextLocation::new(line, loc.column.clamp(1, max_column))
}

impl Document {
    /// A document holding one empty line.
    pub fn new() -> Self {
        Self::from_text("")
    }

    /// A document split from `text`.
    pub fn from_text(text: &str) -> Self {
        Self {
            state: GuardedCell::new(DocumentState {
                lines: Self::build_lines(text),
                version: 0,
                line_ending: LineEnding::detect(text),
            }),
        }
    }

    fn build_lines(text: &str) -> Vec<Arc<Line>> {
        split_lines(text)
            .into_iter()
            .map(|line| Arc::new(Line::loaded(line)))
            .collect()
    }

    /// Replace every line with the split of `text`. Returns the new line count.
    pub(crate) fn load(&self, text: &str) -> usize {
        let mut state = self.state.lock();
        state.lines = Self::build_lines(text);
        state.line_ending = LineEnding::detect(text);
        state.version += 1;
        state.lines.len()
    }

    /// Number of lines (always at least 1).
    pub fn line_count(&self) -> usize {
        self.state.lock().lines.len()
    }

    /// Content version; incremented by every content-affecting operation and by each refresh.
    pub fn version(&self) -> u64 {
        self.state.lock().version
    }

    pub(crate) fn bump_version(&self) -> u64 {
        let mut state = self.state.lock();
        state.version += 1;
        state.version
    }

    /// Line ending detected on load, used by [`get_content`](Self::get_content).
    pub fn line_ending(&self) -> LineEnding {
        self.state.lock().line_ending
    }

    /// The line with 1-based `number`.
    pub fn line(&self, number: usize) -> Option<Arc<Line>> {
        let state = self.state.lock();
        number
            .checked_sub(1)
            .and_then(|index| state.lines.get(index))
            .cloned()
    }

    /// Length in chars of line `number`, or 0 if it does not exist.
    pub fn line_len(&self, number: usize) -> usize {
        self.line(number).map(|line| line.len()).unwrap_or(0)
    }

    /// Current text (pending or committed) of every line.
    pub fn lines(&self) -> Vec<String> {
        let state = self.state.lock();
        state.lines.iter().map(|line| line.current_text()).collect()
    }

    /// Clamp a location into the document.
    pub fn clamp(&self, loc: TextLocation) -> TextLocation {
        clamp_in(&self.state.lock().lines, loc)
    }

    /// The char at `loc`, or `None` at end of line.
    pub fn char_at(&self, loc: TextLocation) -> Option<char> {
        let line = self.line(loc.line)?;
        let state = line.state();
        char_at(state.current(), loc.column.checked_sub(1)?)
    }

    /// The whole content, lines joined with the detected line ending.
    ///
    /// Each line contributes its pending text if it has any. Nothing is committed; that is left to
    /// the next refresh.
    pub fn get_content(&self) -> String {
        let state = self.state.lock();
        let mut out = String::new();
        for (i, line) in state.lines.iter().enumerate() {
            if i > 0 {
                out.push_str(state.line_ending.as_str());
            }
            out.push_str(line.state().current());
        }
        out
    }

    /// Text covered by `range` (possibly multi-line, possibly reversed), lines joined by `'\n'`.
    pub fn get_text(&self, range: TextRange) -> String {
        let state = self.state.lock();
        let front = clamp_in(&state.lines, range.front());
        let back = clamp_in(&state.lines, range.back());

        if front.line == back.line {
            let line = state.lines[front.line - 1].state();
            return char_slice(line.current(), front.column - 1, back.column - 1).to_string();
        }

        let mut out = String::new();
        for number in front.line..=back.line {
            let line = state.lines[number - 1].state();
            let text = line.current();
            let len = char_len(text);
            let (start, end) = if number == front.line {
                (front.column - 1, len)
            } else if number == back.line {
                (0, back.column - 1)
            } else {
                (0, len)
            };
            if number > front.line {
                out.push('\n');
            }
            out.push_str(char_slice(text, start, end));
        }
        out
    }

    /// Insert single-line `s` into the pending text of `loc.line` at `loc.column`.
    pub(crate) fn insert(&self, loc: TextLocation, s: &str) -> TextLocation {
        let mut state = self.state.lock();
        state.version += 1;
        let loc = clamp_in(&state.lines, loc);
        state.lines[loc.line - 1].state().insert(loc.column, s);
        TextLocation::new(loc.line, loc.column + char_len(s))
    }

    /// Remove columns `[start_column, end_column)` from line `line`.
    pub(crate) fn remove(&self, line: usize, start_column: usize, end_column: usize) {
        let mut state = self.state.lock();
        state.version += 1;
        if let Some(line) = line.checked_sub(1).and_then(|i| state.lines.get(i)) {
            line.state().remove(start_column, end_column);
        }
    }

    /// Replace `range` with `new_text` (which may span lines).
    ///
    /// With single-line `new_text` the cursor lands at `front.column + len(new_text)` on the
    /// front line; otherwise at `len(last fragment) + 1` on the last inserted line, where the
    /// last fragment has been joined with the remainder of the original line.
    pub(crate) fn replace_text(&self, range: TextRange, new_text: &str) -> ReplaceOutcome {
        let mut state = self.state.lock();
        state.version += 1;

        let front = clamp_in(&state.lines, range.front());
        let back = clamp_in(&state.lines, range.back());
        let first = Arc::clone(&state.lines[front.line - 1]);
        let last = Arc::clone(&state.lines[back.line - 1]);

        for line in &state.lines[front.line - 1..back.line] {
            line.state().commit_pending();
        }

        let (tail_text, tail_pieces) = last.state().split_off(back.column);
        first.state().split_off(front.column);

        let lines_removed = back.line - front.line;
        state.lines.drain(front.line..back.line).for_each(drop);

        let segments: Vec<&str> = new_text
            .split('\n')
            .map(|segment| segment.strip_suffix('\r').unwrap_or(segment))
            .collect();
        let head = segments.first().copied().unwrap_or_default();

        {
            let mut first_state = first.state();
            first_state.insert(front.column, head);
            if segments.len() == 1 {
                first_state.append(&tail_text, tail_pieces);
                return ReplaceOutcome {
                    cursor: TextLocation::new(front.line, front.column + char_len(head)),
                    first_line: front.line,
                    lines_removed,
                    lines_inserted: 0,
                };
            }
        }

        let last_index = segments.len() - 1;
        let mut new_lines: Vec<Arc<Line>> = segments[1..last_index]
            .iter()
            .map(|segment| {
                Arc::new(Line::inserted(
                    segment.to_string(),
                    vec![Piece::plain(*segment)],
                ))
            })
            .collect();

        let fragment = segments[last_index];
        let mut pieces = vec![Piece::plain(fragment)];
        pieces.extend(tail_pieces);
        new_lines.push(Arc::new(Line::inserted(
            format!("{fragment}{tail_text}"),
            pieces,
        )));

        let lines_inserted = new_lines.len();
        state
            .lines
            .splice(front.line..front.line, new_lines)
            .for_each(drop);

        ReplaceOutcome {
            cursor: TextLocation::new(front.line + lines_inserted, char_len(fragment) + 1),
            first_line: front.line,
            lines_removed,
            lines_inserted,
        }
    }

    /// Join line `number` with the following line. Returns the first line's former length.
    ///
    /// Both committed texts are concatenated into the first line's pending text and their
    /// piece lists are concatenated.
    pub(crate) fn merge_with_next(&self, number: usize) -> Option<usize> {
        let mut state = self.state.lock();
        if number == 0 || number >= state.lines.len() {
            return None;
        }
        state.version += 1;

        let second = state.lines.remove(number);
        let first = Arc::clone(&state.lines[number - 1]);

        let (text, pieces) = {
            let mut second_state = second.state();
            second_state.commit_pending();
            (second_state.text.clone(), second_state.pieces.clone())
        };

        let mut first_state = first.state();
        first_state.commit_pending();
        let previous_len = char_len(&first_state.text);
        first_state.append(&text, pieces);
        Some(previous_len)
    }

    pub(crate) fn set_cursor_column(&self, number: usize, column: usize) {
        if let Some(line) = self.line(number) {
            line.state().cursor_column = column;
        }
    }

    pub(crate) fn set_line_selection(&self, number: usize, start: usize, end: usize) {
        if let Some(line) = self.line(number) {
            let mut state = line.state();
            state.selection_start = start;
            state.selection_end = end;
        }
    }

    /// Clone out lines `[start, start + len)` (0-based) if the version is still `version`.
    pub(crate) fn batch(&self, version: u64, start: usize, len: usize) -> Option<Vec<Arc<Line>>> {
        let state = self.state.lock();
        if state.version != version {
            return None;
        }
        let end = start.saturating_add(len).min(state.lines.len());
        Some(state.lines.get(start..end).unwrap_or_default().to_vec())
    }

    /// Run `f` over all lines while holding the document lock, if the version is unchanged.
    pub(crate) fn with_lines_at<R>(
        &self,
        version: u64,
        f: impl FnOnce(&[Arc<Line>]) -> R,
    ) -> Option<R> {
        let state = self.state.lock();
        (state.version == version).then(|| f(&state.lines))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(line: usize, column: usize) -> TextLocation {
        TextLocation::new(line, column)
    }

    #[test]
    fn test_get_text_multi_line_reversed() {
        let doc = Document::from_text("Hello\nWorld\nAgain");
        let range = TextRange::new(loc(3, 3), loc(1, 4));
        assert_eq!(doc.get_text(range), "lo\nWorld\nAg");
        assert_eq!(doc.get_text(TextRange::new(loc(2, 2), loc(2, 99))), "orld");
    }

    #[test]
    fn test_replace_single_line_with_single_line() {
        let doc = Document::from_text("Hello World");
        let outcome = doc.replace_text(TextRange::new(loc(1, 7), loc(1, 12)), "Rust");
        assert_eq!(doc.lines(), vec!["Hello Rust"]);
        assert_eq!(outcome.cursor, loc(1, 11));
    }

    #[test]
    fn test_replace_single_line_with_multi_line() {
        let doc = Document::from_text("abcd\nz");
        let outcome = doc.replace_text(TextRange::caret(loc(1, 3)), "X\r\nY\nZZ");
        assert_eq!(doc.lines(), vec!["abX", "Y", "ZZcd", "z"]);
        assert_eq!(outcome.cursor, loc(3, 3));
        assert_eq!(outcome.lines_inserted, 2);
    }

    #[test]
    fn test_replace_multi_line_range() {
        let doc = Document::from_text("one\ntwo\nthree\nfour");
        let outcome = doc.replace_text(TextRange::new(loc(1, 2), loc(3, 3)), "-");
        assert_eq!(doc.lines(), vec!["o-ree", "four"]);
        assert_eq!(outcome.cursor, loc(1, 3));
        assert_eq!(outcome.lines_removed, 2);
    }

    #[test]
    fn test_replace_multi_line_range_with_multi_line_text() {
        let doc = Document::from_text("one\ntwo\nthree");
        let outcome = doc.replace_text(TextRange::new(loc(1, 2), loc(3, 3)), "A\nB");
        assert_eq!(doc.lines(), vec!["oA", "Bree"]);
        assert_eq!(outcome.cursor, loc(2, 2));
    }

    #[test]
    fn test_merge_with_next_uses_pending() {
        let doc = Document::from_text("ab\ncd\nef");
        assert_eq!(doc.merge_with_next(1), Some(2));
        assert_eq!(doc.line_count(), 2);
        let line = doc.line(1).unwrap();
        assert_eq!(line.pending_text().as_deref(), Some("abcd"));
        assert_eq!(doc.merge_with_next(2), None);
    }

    #[test]
    fn test_get_content_reads_pending_and_keeps_line_ending() {
        let doc = Document::from_text("a\r\nb");
        doc.insert(loc(2, 2), "c");
        assert_eq!(doc.get_content(), "a\r\nbc");
        let line = doc.line(2).unwrap();
        assert_eq!(line.text(), "b");
        assert_eq!(line.pending_text().as_deref(), Some("bc"));
        assert!(line.is_dirty());
    }

    #[test]
    fn test_versions_increase_on_edits() {
        let doc = Document::from_text("x");
        let v0 = doc.version();
        doc.insert(loc(1, 1), "y");
        doc.remove(1, 1, 2);
        assert_eq!(doc.version(), v0 + 2);
        assert!(doc.batch(v0, 0, 10).is_none());
        assert_eq!(doc.batch(v0 + 2, 0, 10).map(|b| b.len()), Some(1));
    }
}
