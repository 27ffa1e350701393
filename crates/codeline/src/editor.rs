//! The editing surface.
//!
//! [`Editor`] owns the cursor tracker, the brace stack and the debouncer, and shares the
//! document, the undo engine and the highlight scheduler with the refresh task through an
//! `Arc`. Lock order is undo → document → line everywhere.

use crate::brace::{BraceStack, TypeAction};
use crate::clipboard::{Clipboard, MemoryClipboard};
use crate::config::{EditorConfig, TabKeyBehavior};
use crate::cursor::{CursorTracker, MoveFlags};
use crate::document::{Document, ReplaceOutcome};
use crate::error::EditorError;
use crate::events::{EditorEvent, EventHub, Observable, Subscription};
use crate::guarded::GuardedCell;
use crate::highlight::{
    ExceptionReporter, HighlightScheduler, LineFormatter, LoggingReporter, PlainFormatter,
    RefreshOutcome,
};
use crate::keymap::{EditorCommand, Key, KeyMap, Modifiers, Motion};
use crate::position::{TextLocation, TextRange};
use crate::text::{char_len, leading_whitespace, next_word_end, previous_word_start};
use crate::timer::{Debouncer, ThreadTimer, Timer};
use crate::undo::UndoEngine;
use codeline_lang::{BracketMap, LanguageConfig};
use std::sync::{Arc, Weak};

/// Collaborators supplied by the host.
#[derive(Clone)]
pub struct Services {
    /// Runs the debounced refresh.
    pub timer: Arc<dyn Timer>,
    /// Backs copy, cut and paste.
    pub clipboard: Arc<dyn Clipboard>,
    /// Style/format hook.
    pub formatter: Arc<dyn LineFormatter>,
    /// Receives formatter errors.
    pub reporter: Arc<dyn ExceptionReporter>,
}

impl Default for Services {
    fn default() -> Self {
        Self {
            timer: Arc::new(ThreadTimer::new()),
            clipboard: Arc::new(MemoryClipboard::new()),
            formatter: Arc::new(PlainFormatter),
            reporter: Arc::new(LoggingReporter),
        }
    }
}

impl Services {
    /// Replace the timer.
    pub fn with_timer(mut self, timer: Arc<dyn Timer>) -> Self {
        self.timer = timer;
        self
    }

    /// Replace the clipboard.
    pub fn with_clipboard(mut self, clipboard: Arc<dyn Clipboard>) -> Self {
        self.clipboard = clipboard;
        self
    }

    /// Replace the formatter.
    pub fn with_formatter(mut self, formatter: Arc<dyn LineFormatter>) -> Self {
        self.formatter = formatter;
        self
    }

    /// Replace the exception reporter.
    pub fn with_reporter(mut self, reporter: Arc<dyn ExceptionReporter>) -> Self {
        self.reporter = reporter;
        self
    }
}

/// State reachable from the refresh task.
struct Shared {
    document: Document,
    undo: GuardedCell<UndoEngine>,
    scheduler: HighlightScheduler,
    events: EventHub,
}

impl Shared {
    fn refresh(&self) -> Result<RefreshOutcome, EditorError> {
        self.undo.lock().end_typing(&self.document);
        self.scheduler.refresh(&self.document, &self.events)
    }

    fn on_timer(&self) {
        if let Err(error) = self.refresh() {
            tracing::error!(error = %error, "highlight refresh failed");
            self.scheduler.store_error(error);
        }
    }
}

/// A single-document editing engine.
///
/// # Example
///
/// ```rust
/// use codeline::{Editor, EditorConfig, Services, ManualTimer};
/// use std::sync::Arc;
///
/// let timer = Arc::new(ManualTimer::new());
/// let mut editor = Editor::new(EditorConfig::default(), Services::default().with_timer(timer.clone()));
/// editor.load_content("fn main");
/// editor.move_cursor_to(1, 8, Default::default());
/// editor.insert_character('(');
/// assert_eq!(editor.get_content(), "fn main()");
///
/// editor.undo().unwrap();
/// assert_eq!(editor.get_content(), "fn main");
/// ```
pub struct Editor {
    shared: Arc<Shared>,
    debouncer: Debouncer,
    cursor: CursorTracker,
    braces: BraceStack,
    brackets: BracketMap,
    clipboard: Arc<dyn Clipboard>,
    keymap: KeyMap,
    config: EditorConfig,
    cursor_location: Observable<TextLocation>,
    selection: Observable<Option<TextRange>>,
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("document", &self.shared.document)
            .field("cursor", &self.cursor)
            .field("braces", &self.braces)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorConfig::default(), Services::default())
    }
}

impl Editor {
    /// Create an editor holding one empty line, with C-like auto-closing brackets.
    pub fn new(config: EditorConfig, services: Services) -> Self {
        let scheduler = HighlightScheduler::new(
            services.formatter,
            services.reporter,
            config.refresh_batch_lines,
            config.near_window,
        );
        let shared = Arc::new(Shared {
            document: Document::new(),
            undo: GuardedCell::new(UndoEngine::new(config.undo_capacity)),
            scheduler,
            events: EventHub::new(),
        });

        let mut editor = Self {
            debouncer: Debouncer::new(services.timer, config.debounce_delay()),
            shared,
            cursor: CursorTracker::new(),
            braces: BraceStack::new(),
            brackets: BracketMap::c_like(),
            clipboard: services.clipboard,
            keymap: KeyMap::default_bindings(),
            config,
            cursor_location: Observable::new(TextLocation::origin()),
            selection: Observable::new(None),
        };
        editor.set_cursor(TextLocation::origin(), MoveFlags::empty());
        editor
    }

    /// Create an editor configured for `language` (brackets and indentation).
    pub fn for_language(language: &LanguageConfig, config: EditorConfig, services: Services) -> Self {
        let mut editor = Self::new(config.with_language(language), services);
        editor.brackets = language.brackets.clone();
        editor
    }

    /// The document.
    pub fn document(&self) -> &Document {
        &self.shared.document
    }

    /// The configuration.
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// The bracket map used for auto-closing.
    pub fn brackets(&self) -> &BracketMap {
        &self.brackets
    }

    /// Replace the bracket map. An empty map disables auto-bracketing.
    pub fn set_brackets(&mut self, brackets: BracketMap) {
        self.brackets = brackets;
        self.braces.clear();
    }

    /// The auto-inserted closers still being tracked.
    pub fn brace_stack(&self) -> &BraceStack {
        &self.braces
    }

    /// The key table.
    pub fn keymap(&self) -> &KeyMap {
        &self.keymap
    }

    /// Mutable access to the key table.
    pub fn keymap_mut(&mut self) -> &mut KeyMap {
        &mut self.keymap
    }

    /// Replace the whole content.
    ///
    /// Clears undo/redo history, the brace stack and the selection, puts the cursor at (1, 1) and
    /// schedules a full refresh.
    pub fn load_content(&mut self, text: &str) {
        self.debouncer.cancel();
        self.shared.undo.lock().clear();
        self.braces.clear();
        self.cursor.reset();

        let line_count = self.shared.document.load(text);
        tracing::debug!(line_count, "content loaded");
        self.set_cursor(TextLocation::origin(), MoveFlags::empty());
        self.emit(EditorEvent::ContentLoaded { line_count });
        self.schedule_refresh();
    }

    /// The whole content, lines joined with the line ending detected on load.
    pub fn get_content(&self) -> String {
        self.shared.document.get_content()
    }

    /// Text covered by `range`.
    pub fn get_text(&self, range: TextRange) -> String {
        self.shared.document.get_text(range)
    }

    /// Text of the active selection (empty without one).
    pub fn get_selected_text(&self) -> String {
        self.shared.document.get_text(self.cursor.selection())
    }

    /// Number of lines.
    pub fn line_count(&self) -> usize {
        self.shared.document.line_count()
    }

    /// Current cursor location.
    pub fn cursor(&self) -> TextLocation {
        self.cursor.location()
    }

    /// The anchor→cursor selection, or a zero-length range at the cursor.
    pub fn selection(&self) -> TextRange {
        self.cursor.selection()
    }

    /// Returns `true` if a non-empty selection is active.
    pub fn has_selection(&self) -> bool {
        self.cursor.has_selection()
    }

    /// Observable cursor location.
    pub fn cursor_observable(&self) -> &Observable<TextLocation> {
        &self.cursor_location
    }

    /// Observable selection (`None` when nothing is selected).
    pub fn selection_observable(&self) -> &Observable<Option<TextRange>> {
        &self.selection
    }

    /// Move the cursor. Coordinates are clamped.
    ///
    /// A move without [`MoveFlags::TYPING`] abandons bracket tracking and closes the open
    /// typing undo step.
    pub fn move_cursor_to(&mut self, line: usize, column: usize, flags: MoveFlags) -> TextLocation {
        if !flags.contains(MoveFlags::TYPING) {
            self.braces.clear();
            self.shared.undo.lock().end_typing(&self.shared.document);
        }
        self.set_cursor(TextLocation::new(line, column), flags)
    }

    /// Apply a cursor motion, extending the selection if `extend` is set.
    pub fn move_cursor(&mut self, motion: Motion, extend: bool) -> TextLocation {
        let highlighting = if extend {
            MoveFlags::HIGHLIGHTING
        } else {
            MoveFlags::empty()
        };

        if !extend && self.cursor.has_selection() {
            let selection = self.cursor.selection();
            let collapsed = match motion {
                Motion::Left => Some(selection.front()),
                Motion::Right => Some(selection.back()),
                _ => None,
            };
            if let Some(to) = collapsed {
                return self.move_cursor_to(to.line, to.column, MoveFlags::empty());
            }
        }

        let (target, flags) = self.motion_target(motion, highlighting);
        self.move_cursor_to(target.line, target.column, flags)
    }

    fn motion_target(&self, motion: Motion, highlighting: MoveFlags) -> (TextLocation, MoveFlags) {
        let document = &self.shared.document;
        let at = self.cursor.location();
        let line_len = document.line_len(at.line);
        let last_line = document.line_count();
        let end_of = |line: usize| TextLocation::new(line, document.line_len(line) + 1);
        let vertical = highlighting | MoveFlags::REMEMBER_COLUMN;

        match motion {
            Motion::Left if at.column > 1 => {
                (TextLocation::new(at.line, at.column - 1), highlighting)
            }
            Motion::Left if at.line > 1 => (end_of(at.line - 1), highlighting),
            Motion::Right if at.column <= line_len => {
                (TextLocation::new(at.line, at.column + 1), highlighting)
            }
            Motion::Right if at.line < last_line => (TextLocation::new(at.line + 1, 1), highlighting),
            Motion::Left | Motion::Right => (at, highlighting),
            Motion::Up if at.line > 1 => (TextLocation::new(at.line - 1, at.column), vertical),
            Motion::Up => (TextLocation::origin(), highlighting),
            Motion::Down if at.line < last_line => {
                (TextLocation::new(at.line + 1, at.column), vertical)
            }
            Motion::Down => (end_of(at.line), highlighting),
            Motion::LineStart => (TextLocation::new(at.line, 1), highlighting),
            Motion::LineEnd => (end_of(at.line), highlighting),
            Motion::WordLeft if at.column == 1 && at.line > 1 => (end_of(at.line - 1), highlighting),
            Motion::WordLeft => {
                let text = document.line(at.line).map(|l| l.current_text()).unwrap_or_default();
                let column = previous_word_start(&text, at.column - 1) + 1;
                (TextLocation::new(at.line, column), highlighting)
            }
            Motion::WordRight if at.column > line_len && at.line < last_line => {
                (TextLocation::new(at.line + 1, 1), highlighting)
            }
            Motion::WordRight => {
                let text = document.line(at.line).map(|l| l.current_text()).unwrap_or_default();
                let column = next_word_end(&text, at.column - 1) + 1;
                (TextLocation::new(at.line, column), highlighting)
            }
            Motion::DocumentStart => (TextLocation::origin(), highlighting),
            Motion::DocumentEnd => (end_of(last_line), highlighting),
        }
    }

    /// Select the whole document.
    pub fn select_all(&mut self) {
        let document = &self.shared.document;
        let last_line = document.line_count();
        let end = document.line_len(last_line) + 1;
        self.move_cursor_to(1, 1, MoveFlags::empty());
        self.move_cursor_to(last_line, end, MoveFlags::HIGHLIGHTING);
    }

    /// Drop the selection, keeping the cursor. Returns `true` if there was one.
    pub fn clear_selection(&mut self) -> bool {
        let had_selection = self.cursor.selection_range().is_some();
        self.cursor.clear_selection(&self.shared.document);
        self.publish_cursor();
        had_selection
    }

    /// Type one character at the cursor, replacing the selection if there is one.
    ///
    /// `'\n'` behaves like Enter and `'\t'` like Tab; `'\r'` is ignored. Consecutive keystrokes
    /// coalesce into one undo step.
    pub fn insert_character(&mut self, ch: char) {
        match ch {
            '\n' => {
                self.handle_enter();
            }
            '\t' => {
                self.handle_tab();
            }
            '\r' => {}
            _ => self.type_char(ch),
        }
    }

    fn type_char(&mut self, ch: char) {
        let shared = Arc::clone(&self.shared);
        let document = &shared.document;
        let mut undo = shared.undo.lock();

        let replaced = self.take_selection_for_typing(&mut undo);
        let at = self.cursor.location();
        match self.braces.on_type(&self.brackets, ch, document.char_at(at)) {
            TypeAction::SkipCloser => {}
            TypeAction::InsertPair(open, close) => {
                let pair: String = [open, close].into_iter().collect();
                self.record_typing(&mut undo, at, &pair);
            }
            TypeAction::Insert(ch) => {
                self.record_typing(&mut undo, at, ch.encode_utf8(&mut [0; 4]));
            }
        }
        drop(undo);

        self.finish_typing(replaced, at, TextLocation::new(at.line, at.column + 1));
    }

    /// Type `text` (single line) as keystrokes.
    fn type_text(&mut self, text: &str) {
        let shared = Arc::clone(&self.shared);
        let mut undo = shared.undo.lock();
        let replaced = self.take_selection_for_typing(&mut undo);
        let at = self.cursor.location();
        self.record_typing(&mut undo, at, text);
        drop(undo);

        self.finish_typing(
            replaced,
            at,
            TextLocation::new(at.line, at.column + char_len(text)),
        );
    }

    /// Delete the selection as the first part of a typing step.
    fn take_selection_for_typing(&mut self, undo: &mut UndoEngine) -> Option<ReplaceOutcome> {
        if !self.cursor.has_selection() {
            return None;
        }
        let document = &self.shared.document;
        let selection = self.cursor.selection();
        undo.end_typing(document);
        undo.begin(selection, document.get_text(selection));
        self.cursor.detach(document);
        let outcome = document.replace_text(selection, "");
        self.cursor.move_to(
            document,
            outcome.cursor.line,
            outcome.cursor.column,
            MoveFlags::TYPING,
        );
        self.braces.clear();
        Some(outcome)
    }

    fn record_typing(&self, undo: &mut UndoEngine, at: TextLocation, text: &str) {
        let document = &self.shared.document;
        undo.begin_typing(document, at);
        document.insert(at, text);
        undo.extend_typing(at, char_len(text));
        tracing::trace!(line = at.line, column = at.column, len = text.len(), "typed");
    }

    fn finish_typing(&mut self, replaced: Option<ReplaceOutcome>, at: TextLocation, to: TextLocation) {
        self.set_cursor(to, MoveFlags::TYPING);
        if let Some(outcome) = replaced {
            self.emit_replace(&outcome);
        }
        self.emit(EditorEvent::LineChanged { line: at.line });
        self.schedule_refresh();
    }

    /// Backspace: delete the selection, the char before the cursor (with its auto-inserted
    /// closer), or join with the previous line. Returns `false` at (1, 1).
    pub fn handle_backspace(&mut self) -> bool {
        if self.cursor.has_selection() {
            return self.delete_selection();
        }

        let shared = Arc::clone(&self.shared);
        let document = &shared.document;
        let at = self.cursor.location();
        let mut undo = shared.undo.lock();
        undo.end_typing(document);

        if at.column > 1 {
            let start = TextLocation::new(at.line, at.column - 1);
            let Some(prev) = document.char_at(start) else {
                return false;
            };
            let paired = self
                .braces
                .on_backspace(&self.brackets, prev, document.char_at(at));
            let end = TextLocation::new(at.line, at.column + usize::from(paired));
            self.remove_recorded(&mut undo, TextRange::new(start, end));
            drop(undo);
            self.finish_line_edit(at.line, start);
            return true;
        }

        if at.line > 1 {
            let join = TextLocation::new(at.line - 1, document.line_len(at.line - 1) + 1);
            if document.merge_with_next(at.line - 1).is_none() {
                return false;
            }
            undo.begin(TextRange::new(join, TextLocation::new(at.line, 1)), "\n".to_string());
            undo.end(TextRange::caret(join), String::new());
            drop(undo);
            self.finish_merge(join);
            return true;
        }
        false
    }

    /// Delete: delete the selection, the char under the cursor, or join with the next line.
    /// Returns `false` at the end of the document.
    pub fn handle_delete(&mut self) -> bool {
        if self.cursor.has_selection() {
            return self.delete_selection();
        }

        let shared = Arc::clone(&self.shared);
        let document = &shared.document;
        let at = self.cursor.location();
        let line_len = document.line_len(at.line);
        let mut undo = shared.undo.lock();
        undo.end_typing(document);

        if at.column <= line_len {
            self.braces.on_delete(document.char_at(at));
            let end = TextLocation::new(at.line, at.column + 1);
            self.remove_recorded(&mut undo, TextRange::new(at, end));
            drop(undo);
            self.finish_line_edit(at.line, at);
            return true;
        }

        if at.line < document.line_count() {
            let join = TextLocation::new(at.line, line_len + 1);
            if document.merge_with_next(at.line).is_none() {
                return false;
            }
            undo.begin(TextRange::new(join, TextLocation::new(at.line + 1, 1)), "\n".to_string());
            undo.end(TextRange::caret(join), String::new());
            drop(undo);
            self.finish_merge(join);
            return true;
        }
        false
    }

    /// Remove a single-line range from pending text as its own undo step.
    fn remove_recorded(&self, undo: &mut UndoEngine, range: TextRange) {
        let document = &self.shared.document;
        let (start, end) = (range.front(), range.back());
        undo.begin(range, document.get_text(range));
        document.remove(start.line, start.column, end.column);
        undo.end(TextRange::caret(start), String::new());
        tracing::trace!(line = start.line, from = start.column, to = end.column, "removed");
    }

    fn finish_line_edit(&mut self, line: usize, to: TextLocation) {
        self.set_cursor(to, MoveFlags::TYPING);
        self.emit(EditorEvent::LineChanged { line });
        self.schedule_refresh();
    }

    fn finish_merge(&mut self, join: TextLocation) {
        self.braces.clear();
        self.set_cursor(join, MoveFlags::empty());
        self.emit(EditorEvent::LineChanged { line: join.line });
        self.emit(EditorEvent::LinesRemoved {
            after: join.line,
            count: 1,
        });
        self.schedule_refresh();
    }

    /// Enter: split the line, carrying its indentation.
    ///
    /// Between a tracked auto-closed pair the closer moves down one more line and the cursor
    /// lands on an extra line indented one level deeper; the brace stack is cleared.
    pub fn handle_enter(&mut self) -> bool {
        let document = &self.shared.document;
        let selection = self.cursor.selection();
        let front = selection.front();

        let line_text = document
            .line(front.line)
            .map(|line| line.current_text())
            .unwrap_or_default();
        let indent: String = leading_whitespace(&line_text)
            .chars()
            .take(front.column - 1)
            .collect();

        let prev = front
            .column
            .checked_sub(1)
            .filter(|column| *column >= 1)
            .and_then(|column| document.char_at(TextLocation::new(front.line, column)));
        let inside_pair = selection.is_empty()
            && self
                .braces
                .is_inside_pair(&self.brackets, prev, document.char_at(front));

        let (text, inner) = if inside_pair {
            let unit = self.config.indent_unit();
            let inner = TextLocation::new(front.line + 1, char_len(&indent) + char_len(&unit) + 1);
            (format!("\n{indent}{unit}\n{indent}"), Some(inner))
        } else {
            (format!("\n{indent}"), None)
        };

        let outcome = self.replace_as_step(selection, &text);
        if inside_pair {
            self.braces.clear();
        }
        self.finish_replace(&outcome, inner.unwrap_or(outcome.cursor), MoveFlags::TYPING);
        true
    }

    /// Tab: indent every selected line of a multi-line selection, otherwise type one
    /// indentation unit (a tab, or spaces up to the next tab stop).
    pub fn handle_tab(&mut self) -> bool {
        let selection = self.cursor.selection();
        if selection.is_multi_line() {
            return self.indent_lines(selection.front().line, selection.back().line) > 0;
        }

        let unit = match self.config.tab_key_behavior {
            TabKeyBehavior::Tab => "\t".to_string(),
            TabKeyBehavior::Spaces => {
                let width = self.config.indent_width.max(1);
                " ".repeat(width - (selection.front().column - 1) % width)
            }
        };
        self.type_text(&unit);
        true
    }

    /// Indent lines `first..=last` by one unit, skipping blank lines. Returns lines changed.
    pub fn indent_lines(&mut self, first: usize, last: usize) -> usize {
        let unit = self.config.indent_unit();
        self.transform_lines(first, last, |line| {
            (!line.trim().is_empty()).then(|| format!("{unit}{line}"))
        })
    }

    /// Outdent the cursor line or every selected line. Returns lines changed.
    pub fn outdent(&mut self) -> usize {
        let selection = self.cursor.selection();
        self.outdent_lines(selection.front().line, selection.back().line)
    }

    /// Strip up to one indentation level (a tab, or up to `indent_width` spaces) from lines
    /// `first..=last`. Returns lines changed.
    pub fn outdent_lines(&mut self, first: usize, last: usize) -> usize {
        let width = self.config.indent_width.max(1);
        self.transform_lines(first, last, |line| {
            let strip = if line.starts_with('\t') {
                1
            } else {
                line.chars().take(width).take_while(|ch| *ch == ' ').count()
            };
            (strip > 0).then(|| line[strip..].to_string())
        })
    }

    /// Rewrite whole lines as one undo step; `f` returns `None` to leave a line alone.
    fn transform_lines(
        &mut self,
        first: usize,
        last: usize,
        f: impl Fn(&str) -> Option<String>,
    ) -> usize {
        let document = &self.shared.document;
        let line_count = document.line_count();
        let first = first.clamp(1, line_count);
        let last = last.clamp(first, line_count);

        let originals: Vec<String> = (first..=last)
            .map(|n| document.line(n).map(|line| line.current_text()).unwrap_or_default())
            .collect();
        let mut changed = Vec::new();
        let rewritten: Vec<String> = originals
            .iter()
            .enumerate()
            .map(|(i, line)| match f(line) {
                Some(new) => {
                    changed.push(first + i);
                    new
                }
                None => line.clone(),
            })
            .collect();
        if changed.is_empty() {
            return 0;
        }

        let cursor = self.cursor.location();
        let had_selection = self.cursor.has_selection();
        let last_len = |lines: &[String]| lines.last().map(|l| char_len(l)).unwrap_or(0);
        let range = TextRange::new(
            TextLocation::new(first, 1),
            TextLocation::new(last, last_len(&originals) + 1),
        );
        self.replace_as_step(range, &rewritten.join("\n"));
        self.braces.clear();

        if had_selection {
            self.set_cursor(TextLocation::new(first, 1), MoveFlags::empty());
            self.set_cursor(
                TextLocation::new(last, last_len(&rewritten) + 1),
                MoveFlags::HIGHLIGHTING,
            );
        } else if (first..=last).contains(&cursor.line) {
            let index = cursor.line - first;
            let (old_len, new_len) = (char_len(&originals[index]), char_len(&rewritten[index]));
            let column = if new_len >= old_len {
                cursor.column + (new_len - old_len)
            } else {
                cursor.column.saturating_sub(old_len - new_len).max(1)
            };
            self.set_cursor(TextLocation::new(cursor.line, column), MoveFlags::empty());
        } else {
            self.set_cursor(cursor, MoveFlags::empty());
        }

        for &line in &changed {
            self.emit(EditorEvent::LineChanged { line });
        }
        self.schedule_refresh();
        changed.len()
    }

    /// Replace the selection (or insert at the cursor) as one undo step.
    ///
    /// `None` is rejected with [`EditorError::InvalidArgument`].
    pub fn replace_selection(&mut self, text: Option<&str>) -> Result<(), EditorError> {
        let text = text.ok_or(EditorError::InvalidArgument("replacement text is required"))?;
        let outcome = self.replace_as_step(self.cursor.selection(), text);
        self.braces.clear();
        self.finish_replace(&outcome, outcome.cursor, MoveFlags::empty());
        Ok(())
    }

    /// Delete the selection. Returns `false` if nothing was selected.
    pub fn delete_selection(&mut self) -> bool {
        if !self.cursor.has_selection() {
            return false;
        }
        let outcome = self.replace_as_step(self.cursor.selection(), "");
        self.braces.clear();
        self.finish_replace(&outcome, outcome.cursor, MoveFlags::empty());
        true
    }

    /// Copy the selection to the clipboard. Returns `false` if nothing was selected.
    pub fn copy(&self) -> bool {
        if !self.cursor.has_selection() {
            return false;
        }
        self.clipboard.set_data(&self.get_selected_text());
        true
    }

    /// Copy, then delete the selection as one undo step.
    pub fn cut(&mut self) -> bool {
        self.copy() && self.delete_selection()
    }

    /// Replace the selection with the clipboard text. Returns `false` if the clipboard is empty.
    pub fn paste(&mut self) -> Result<bool, EditorError> {
        let Some(text) = self.clipboard.get_text() else {
            return Ok(false);
        };
        self.replace_selection(Some(&text))?;
        Ok(true)
    }

    /// Replace `range` with `text` as one closed undo step.
    fn replace_as_step(&mut self, range: TextRange, text: &str) -> ReplaceOutcome {
        let shared = Arc::clone(&self.shared);
        let document = &shared.document;
        let mut undo = shared.undo.lock();
        undo.end_typing(document);
        undo.begin(range, document.get_text(range));
        self.cursor.detach(document);
        let outcome = document.replace_text(range, text);
        let after = TextRange::new(range.front(), outcome.cursor);
        undo.end(after, document.get_text(after));
        tracing::trace!(
            line = outcome.first_line,
            removed = outcome.lines_removed,
            inserted = outcome.lines_inserted,
            "replaced"
        );
        outcome
    }

    fn finish_replace(&mut self, outcome: &ReplaceOutcome, to: TextLocation, flags: MoveFlags) {
        self.set_cursor(to, flags);
        self.emit_replace(outcome);
        self.schedule_refresh();
    }

    /// Revert the most recent step. Returns `Ok(false)` when there is nothing to undo.
    pub fn undo(&mut self) -> Result<bool, EditorError> {
        let shared = Arc::clone(&self.shared);
        let document = &shared.document;
        let item = {
            let mut undo = shared.undo.lock();
            undo.end_typing(document);
            undo.take_undo()
        };
        let Some(item) = item else {
            return Ok(false);
        };

        self.braces.clear();
        self.set_cursor(item.after.start, MoveFlags::empty());
        self.cursor.detach(document);
        let outcome = document.replace_text(item.after, &item.before_text);
        tracing::trace!(line = outcome.first_line, "undo");
        self.finish_replace(&outcome, item.before.end, MoveFlags::empty());
        Ok(true)
    }

    /// Re-apply the most recently undone step. Returns `Ok(false)` when there is nothing to redo.
    pub fn redo(&mut self) -> Result<bool, EditorError> {
        let shared = Arc::clone(&self.shared);
        let document = &shared.document;
        let Some(item) = shared.undo.lock().take_redo() else {
            return Ok(false);
        };

        self.braces.clear();
        self.set_cursor(item.before.start, MoveFlags::empty());
        self.cursor.detach(document);
        let after_text = item.after_text.as_deref().unwrap_or_default();
        let outcome = document.replace_text(item.before, after_text);
        tracing::trace!(line = outcome.first_line, "redo");
        self.finish_replace(&outcome, item.after.end, MoveFlags::empty());
        Ok(true)
    }

    /// Can undo
    pub fn can_undo(&self) -> bool {
        self.shared.undo.lock().can_undo()
    }

    /// Can redo
    pub fn can_redo(&self) -> bool {
        self.shared.undo.lock().can_redo()
    }

    /// Undo stack depth
    pub fn undo_depth(&self) -> usize {
        self.shared.undo.lock().undo_depth()
    }

    /// Redo stack depth
    pub fn redo_depth(&self) -> usize {
        self.shared.undo.lock().redo_depth()
    }

    /// Close the open typing step so the next keystroke starts a new one.
    pub fn end_typing_undo(&self) {
        self.shared.undo.lock().end_typing(&self.shared.document);
    }

    /// Run a command. Returns whether it did anything.
    pub fn execute(&mut self, command: EditorCommand) -> Result<bool, EditorError> {
        match command {
            EditorCommand::Move(motion) => {
                self.move_cursor(motion, false);
                Ok(true)
            }
            EditorCommand::Select(motion) => {
                self.move_cursor(motion, true);
                Ok(true)
            }
            EditorCommand::Backspace => Ok(self.handle_backspace()),
            EditorCommand::Delete => Ok(self.handle_delete()),
            EditorCommand::Enter => Ok(self.handle_enter()),
            EditorCommand::Tab => Ok(self.handle_tab()),
            EditorCommand::Outdent => Ok(self.outdent() > 0),
            EditorCommand::Undo => self.undo(),
            EditorCommand::Redo => self.redo(),
            EditorCommand::Cut => Ok(self.cut()),
            EditorCommand::Copy => Ok(self.copy()),
            EditorCommand::Paste => self.paste(),
            EditorCommand::SelectAll => {
                self.select_all();
                Ok(true)
            }
            EditorCommand::ClearSelection => Ok(self.clear_selection()),
        }
    }

    /// Dispatch a key press through the key table.
    ///
    /// Unbound printable characters without Control/Alt are typed. Returns `Ok(false)` for
    /// keys that did nothing.
    pub fn handle_key(&mut self, key: Key, modifiers: Modifiers) -> Result<bool, EditorError> {
        if let Some(command) = self.keymap.resolve(key, modifiers) {
            return self.execute(command);
        }
        match key {
            Key::Char(ch) if !modifiers.intersects(Modifiers::CONTROL | Modifiers::ALT) => {
                self.insert_character(ch);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Run the highlight refresh now, cancelling the scheduled one.
    pub fn refresh_now(&self) -> Result<RefreshOutcome, EditorError> {
        self.debouncer.cancel();
        self.shared.refresh()
    }

    /// Returns `true` while a refresh is scheduled and has not fired.
    pub fn is_refresh_pending(&self) -> bool {
        self.debouncer.is_armed()
    }

    /// Number of refresh runs started so far.
    pub fn refresh_count(&self) -> u64 {
        self.shared.scheduler.refresh_count()
    }

    /// Take the last error a scheduled refresh could not hand to a caller.
    pub fn take_refresh_error(&self) -> Option<EditorError> {
        self.shared.scheduler.take_error()
    }

    /// Subscribe to [`EditorEvent`]s. Dropping the token unsubscribes.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&EditorEvent) + Send + Sync + 'static,
    {
        self.shared.events.subscribe(callback)
    }

    fn schedule_refresh(&self) {
        let shared: Weak<Shared> = Arc::downgrade(&self.shared);
        self.debouncer.arm(Box::new(move || {
            if let Some(shared) = shared.upgrade() {
                shared.on_timer();
            }
        }));
    }

    fn set_cursor(&mut self, to: TextLocation, flags: MoveFlags) -> TextLocation {
        let moved = self
            .cursor
            .move_to(&self.shared.document, to.line, to.column, flags);
        self.publish_cursor();
        moved.to
    }

    fn publish_cursor(&self) {
        self.cursor_location.set(self.cursor.location());
        self.selection
            .set(self.cursor.selection_range().filter(|range| !range.is_empty()));
    }

    fn emit(&self, event: EditorEvent) {
        self.shared.events.notify(&event);
    }

    fn emit_replace(&self, outcome: &ReplaceOutcome) {
        let after = outcome.first_line;
        self.emit(EditorEvent::LineChanged { line: after });
        if outcome.lines_removed > 0 {
            self.emit(EditorEvent::LinesRemoved {
                after,
                count: outcome.lines_removed,
            });
        }
        if outcome.lines_inserted > 0 {
            self.emit(EditorEvent::LinesInserted {
                after,
                count: outcome.lines_inserted,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::ManualTimer;

    fn editor(text: &str) -> (Editor, Arc<ManualTimer>) {
        let timer = Arc::new(ManualTimer::new());
        let mut editor = Editor::new(
            EditorConfig::default(),
            Services::default().with_timer(timer.clone()),
        );
        editor.load_content(text);
        (editor, timer)
    }

    #[test]
    fn test_typing_coalesces_into_one_step() {
        let (mut editor, _timer) = editor("");
        for ch in "abc".chars() {
            editor.insert_character(ch);
        }
        assert_eq!(editor.undo_depth(), 1);
        assert!(editor.undo().unwrap());
        assert_eq!(editor.get_content(), "");
        assert!(!editor.undo().unwrap());
    }

    #[test]
    fn test_timer_closes_typing_step() {
        let (mut editor, timer) = editor("");
        editor.insert_character('a');
        timer.run_pending();
        editor.insert_character('b');
        assert_eq!(editor.undo_depth(), 2);
    }

    #[test]
    fn test_replace_selection_rejects_none() {
        let (mut editor, _timer) = editor("x");
        assert_eq!(
            editor.replace_selection(None),
            Err(EditorError::InvalidArgument("replacement text is required"))
        );
        assert_eq!(editor.get_content(), "x");
    }

    #[test]
    fn test_cursor_observable_follows_typing() {
        let (mut editor, _timer) = editor("");
        editor.insert_character('q');
        assert_eq!(editor.cursor_observable().get(), TextLocation::new(1, 2));
        assert_eq!(editor.selection_observable().get(), None);
    }
}
