//! Per-line state: committed text, in-flight pending text, style pieces, selection and cursor.

use crate::guarded::GuardedCell;
use crate::text::{byte_offset, char_len};
use parking_lot::MutexGuard;

/// Style identifier carried by a [`Piece`]. The mapping to colors belongs to the front end.
pub type StyleId = u32;

/// Style of text no formatter has claimed.
pub const DEFAULT_STYLE_ID: StyleId = 0;

/// A maximal run of a line's text sharing one style/tooltip/error attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Piece {
    /// Text of the run.
    pub text: String,
    /// Style of the run.
    pub style_id: StyleId,
    /// Optional hover text.
    pub tooltip: Option<String>,
    /// Whether the run is flagged as an error.
    pub is_error: bool,
}

impl Piece {
    /// A run with the given style.
    pub fn new(text: impl Into<String>, style_id: StyleId) -> Self {
        Self {
            text: text.into(),
            style_id,
            tooltip: None,
            is_error: false,
        }
    }

    /// A run in [`DEFAULT_STYLE_ID`].
    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, DEFAULT_STYLE_ID)
    }

    /// Attach a tooltip.
    pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }

    /// Flag the run as an error.
    pub fn as_error(mut self) -> Self {
        self.is_error = true;
        self
    }

    /// Length in chars.
    pub fn char_len(&self) -> usize {
        char_len(&self.text)
    }
}

/// Insert `s` at char `offset` of the run sequence.
///
/// At a boundary whose preceding piece has the default style, the text joins the following piece.
pub(crate) fn insert_into_pieces(pieces: &mut Vec<Piece>, offset: usize, s: &str) {
    if pieces.is_empty() {
        pieces.push(Piece::plain(s));
        return;
    }

    let last = pieces.len() - 1;
    let mut acc = 0usize;
    for i in 0..pieces.len() {
        let end = acc + pieces[i].char_len();
        if offset < end || (offset == end && i == last) {
            let at = byte_offset(&pieces[i].text, offset.saturating_sub(acc));
            pieces[i].text.insert_str(at, s);
            return;
        }
        if offset == end {
            if pieces[i].style_id == DEFAULT_STYLE_ID {
                pieces[i + 1].text.insert_str(0, s);
            } else {
                pieces[i].text.push_str(s);
            }
            return;
        }
        acc = end;
    }
}

/// Remove chars `[start, end)` across piece boundaries.
pub(crate) fn remove_from_pieces(pieces: &mut Vec<Piece>, start: usize, end: usize) {
    let mut acc = 0usize;
    for piece in pieces.iter_mut() {
        let len = piece.char_len();
        let (piece_start, piece_end) = (acc, acc + len);
        acc = piece_end;

        let cut_start = start.max(piece_start);
        let cut_end = end.min(piece_end);
        if cut_start < cut_end {
            let from = byte_offset(&piece.text, cut_start - piece_start);
            let to = byte_offset(&piece.text, cut_end - piece_start);
            piece.text.replace_range(from..to, "");
        }
    }
    normalize_pieces(pieces);
}

/// Split the run sequence at char `offset`, returning the tail.
pub(crate) fn split_pieces(pieces: &mut Vec<Piece>, offset: usize) -> Vec<Piece> {
    let mut acc = 0usize;
    let mut tail = Vec::new();
    let mut split_at = pieces.len();

    for (i, piece) in pieces.iter_mut().enumerate() {
        let len = piece.char_len();
        if offset < acc + len {
            let at = byte_offset(&piece.text, offset.saturating_sub(acc));
            let rest = piece.text.split_off(at);
            if !rest.is_empty() {
                tail.push(Piece {
                    text: rest,
                    ..piece.clone()
                });
            }
            split_at = i + 1;
            break;
        }
        acc += len;
    }

    tail.extend(pieces.drain(split_at..));
    normalize_pieces(pieces);
    tail
}

/// Drop emptied pieces, keeping one (empty) piece when nothing else remains.
pub(crate) fn normalize_pieces(pieces: &mut Vec<Piece>) {
    if pieces.iter().all(|p| p.text.is_empty()) {
        pieces.truncate(1);
        if let Some(first) = pieces.first_mut() {
            first.text.clear();
        } else {
            pieces.push(Piece::plain(""));
        }
    } else {
        pieces.retain(|p| !p.text.is_empty());
    }
}

#[derive(Debug, Clone)]
pub(crate) struct LineState {
    pub(crate) text: String,
    pub(crate) pending: Option<String>,
    pub(crate) pieces: Vec<Piece>,
    pub(crate) selection_start: usize,
    pub(crate) selection_end: usize,
    pub(crate) cursor_column: usize,
    /// Text as of the last refresh; present while structural edits have not been refreshed.
    pub(crate) baseline: Option<String>,
}

impl LineState {
    fn new(text: String, baseline: Option<String>) -> Self {
        let pieces = vec![Piece::plain(text.clone())];
        Self {
            text,
            pending: None,
            pieces,
            selection_start: 0,
            selection_end: 0,
            cursor_column: 0,
            baseline,
        }
    }

    pub(crate) fn current(&self) -> &str {
        self.pending.as_deref().unwrap_or(&self.text)
    }

    pub(crate) fn len(&self) -> usize {
        char_len(self.current())
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.pending.is_some() || self.baseline.is_some()
    }

    fn pending_mut(&mut self) -> &mut String {
        self.pending.get_or_insert_with(|| self.text.clone())
    }

    /// Insert into the pending text at 1-based `column`.
    pub(crate) fn insert(&mut self, column: usize, s: &str) {
        let offset = column.saturating_sub(1).min(self.len());
        let pending = self.pending_mut();
        let at = byte_offset(pending, offset);
        pending.insert_str(at, s);
        insert_into_pieces(&mut self.pieces, offset, s);
    }

    /// Remove the chars at columns `[start_column, end_column)` from the pending text.
    pub(crate) fn remove(&mut self, start_column: usize, end_column: usize) {
        let len = self.len();
        let start = start_column.saturating_sub(1).min(len);
        let end = end_column.saturating_sub(1).min(len);
        if start >= end {
            return;
        }

        let pending = self.pending_mut();
        let from = byte_offset(pending, start);
        let to = byte_offset(pending, end);
        pending.replace_range(from..to, "");
        remove_from_pieces(&mut self.pieces, start, end);
        self.reclamp_selection(start + 1, end + 1);
    }

    /// Shift the in-line selection into the column space left by removing `[start, end)`.
    fn reclamp_selection(&mut self, start: usize, end: usize) {
        if self.selection_start == 0 {
            return;
        }
        if self.selection_start >= start && self.selection_end <= end {
            self.clear_selection();
            return;
        }

        let removed = end - start;
        let map = |column: usize| {
            if column < start {
                column
            } else if column >= end {
                column - removed
            } else {
                start
            }
        };
        let (new_start, new_end) = (map(self.selection_start), map(self.selection_end));
        if new_end <= new_start {
            self.clear_selection();
        } else {
            self.selection_start = new_start;
            self.selection_end = new_end;
        }
    }

    pub(crate) fn clear_selection(&mut self) {
        self.selection_start = 0;
        self.selection_end = 0;
    }

    /// Merge pending text into committed text, remembering the pre-edit text for the next refresh.
    pub(crate) fn commit_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            let previous = std::mem::replace(&mut self.text, pending);
            self.baseline.get_or_insert(previous);
        }
    }

    /// Commit, then cut the line at 1-based `column` and return the tail with its pieces.
    pub(crate) fn split_off(&mut self, column: usize) -> (String, Vec<Piece>) {
        self.commit_pending();
        let offset = column.saturating_sub(1).min(char_len(&self.text));
        let at = byte_offset(&self.text, offset);
        let previous = self.text.clone();
        let tail = self.text.split_off(at);
        self.baseline.get_or_insert(previous);
        let tail_pieces = split_pieces(&mut self.pieces, offset);
        self.clear_selection();
        (tail, tail_pieces)
    }

    /// Append text and its pieces into the pending text.
    pub(crate) fn append(&mut self, text: &str, pieces: Vec<Piece>) {
        self.pending_mut().push_str(text);
        self.pieces.extend(pieces);
        normalize_pieces(&mut self.pieces);
    }

    /// Take the refresh delta `(old, new)` and commit, if the line has unrefreshed changes.
    pub(crate) fn take_refresh(&mut self) -> Option<(String, String)> {
        if !self.is_dirty() {
            return None;
        }
        self.commit_pending();
        let old = self.baseline.take().unwrap_or_else(|| self.text.clone());
        Some((old, self.text.clone()))
    }
}

/// One row of the document.
///
/// Every field sits behind a per-line lock so the refresh context never observes a torn
/// committed/pending pair.
#[derive(Debug)]
pub struct Line {
    state: GuardedCell<LineState>,
}

impl Line {
    /// A line produced by the initial load; it has never been formatted.
    pub(crate) fn loaded(text: String) -> Self {
        Self {
            state: GuardedCell::new(LineState::new(text, Some(String::new()))),
        }
    }

    /// A line created by an edit (split or multi-line insert).
    pub(crate) fn inserted(text: String, pieces: Vec<Piece>) -> Self {
        let mut state = LineState::new(text, Some(String::new()));
        state.pieces = pieces;
        normalize_pieces(&mut state.pieces);
        Self {
            state: GuardedCell::new(state),
        }
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, LineState> {
        self.state.lock()
    }

    /// Committed text.
    pub fn text(&self) -> String {
        self.state.lock().text.clone()
    }

    /// Uncommitted edit-in-progress text, if any.
    pub fn pending_text(&self) -> Option<String> {
        self.state.lock().pending.clone()
    }

    /// Pending text if present, otherwise committed text.
    pub fn current_text(&self) -> String {
        self.state.lock().current().to_string()
    }

    /// Length in chars of the current text.
    pub fn len(&self) -> usize {
        self.state.lock().len()
    }

    /// Returns `true` if the current text is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Style pieces covering the current text.
    pub fn pieces(&self) -> Vec<Piece> {
        self.state.lock().pieces.clone()
    }

    /// Selected column span on this line as `(start, end)`: chars at columns `start..end` are
    /// highlighted. `None` when nothing on this line is selected.
    pub fn selection(&self) -> Option<(usize, usize)> {
        let state = self.state.lock();
        (state.selection_start != 0).then_some((state.selection_start, state.selection_end))
    }

    /// Cursor column, or 0 when the cursor is on another line.
    pub fn cursor_column(&self) -> usize {
        self.state.lock().cursor_column
    }

    /// Returns `true` if the line has changes not yet seen by a refresh.
    pub fn is_dirty(&self) -> bool {
        self.state.lock().is_dirty()
    }
}
