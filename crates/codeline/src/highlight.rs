//! Highlight refresh: the style/format hook, exception reporting and the version-checked
//! two-phase walk that commits pending text and re-requests style pieces.
//!
//! A refresh captures a fresh document version and gives up as soon as it sees a different one.
//! It never rolls back: pieces already applied for the old state are overwritten by the run the
//! newer edit scheduled.

use crate::document::Document;
use crate::error::{EditorError, FormatError};
use crate::events::{EditorEvent, EventHub};
use crate::guarded::GuardedCell;
use crate::line::{Line, Piece, normalize_pieces};
use crate::text::char_len;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// What the format hook is told after pending text has been committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentUpdate {
    /// Whole content, lines joined with the document's line ending.
    pub content: String,
    /// Version captured by the refresh.
    pub version: u64,
    /// 1-based numbers of the lines whose text was committed by this refresh.
    pub affected_lines: Vec<usize>,
    /// `true` if every changed line only gained or lost whitespace next to whitespace.
    pub is_whitespace_only_change: bool,
}

/// Style/format hook: turns a line's committed text into style pieces.
pub trait LineFormatter: Send + Sync {
    /// Pieces covering `text` exactly. An empty line may yield no pieces or one empty piece.
    fn format_line(&self, text: &str) -> Result<Vec<Piece>, FormatError>;

    /// Called once per refresh after the commit, before any line is formatted.
    fn content_updated(&self, update: &ContentUpdate) -> Result<(), FormatError> {
        let _ = update;
        Ok(())
    }
}

/// Formatter producing one default-style piece per line.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainFormatter;

impl LineFormatter for PlainFormatter {
    fn format_line(&self, text: &str) -> Result<Vec<Piece>, FormatError> {
        Ok(vec![Piece::plain(text)])
    }
}

/// Receives formatter errors caught during a refresh.
pub trait ExceptionReporter: Send + Sync {
    /// Report `error`. Return `true` to mark it handled; unhandled errors abort the refresh.
    fn report(&self, error: &FormatError) -> bool;
}

/// Reporter that logs every error and marks it handled.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingReporter;

impl ExceptionReporter for LoggingReporter {
    fn report(&self, error: &FormatError) -> bool {
        tracing::warn!(error = %error, "formatter error");
        true
    }
}

/// How a refresh ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Every line was visited.
    Completed {
        /// Version the refresh captured.
        version: u64,
        /// Lines whose text the refresh committed.
        affected_lines: Vec<usize>,
        /// Lines that received new pieces.
        formatted: usize,
    },
    /// The document changed mid-refresh; the refresh stopped without finishing.
    Aborted {
        /// Version the refresh captured.
        version: u64,
    },
}

impl RefreshOutcome {
    /// Returns `true` for [`RefreshOutcome::Aborted`].
    pub fn is_aborted(&self) -> bool {
        matches!(self, RefreshOutcome::Aborted { .. })
    }
}

/// Returns `true` if turning `old` into `new` only added or removed whitespace that touches
/// whitespace or a line edge.
///
/// Whitespace inserted between two non-blank chars splits a token, and whitespace removed
/// between two non-blank chars merges two; neither counts. Identical texts are not a change.
pub fn is_whitespace_only_change(old: &str, new: &str) -> bool {
    if old == new {
        return false;
    }

    let old: Vec<char> = old.chars().collect();
    let new: Vec<char> = new.chars().collect();
    let prefix = old.iter().zip(&new).take_while(|(a, b)| a == b).count();
    let max_suffix = old.len().min(new.len()) - prefix;
    let suffix = old
        .iter()
        .rev()
        .zip(new.iter().rev())
        .take(max_suffix)
        .take_while(|(a, b)| a == b)
        .count();

    let old_middle = &old[prefix..old.len() - suffix];
    let new_middle = &new[prefix..new.len() - suffix];
    if !old_middle.iter().chain(new_middle).all(|c| c.is_whitespace()) {
        return false;
    }

    let before = prefix.checked_sub(1).map(|i| new[i]);
    let after = new.get(new.len() - suffix).copied();
    before.is_none_or(char::is_whitespace) || after.is_none_or(char::is_whitespace)
}

fn validate(text: &str, mut pieces: Vec<Piece>) -> Result<Vec<Piece>, FormatError> {
    let actual: usize = pieces.iter().map(Piece::char_len).sum();
    let covers = actual == char_len(text)
        && pieces.iter().map(|p| p.text.as_str()).collect::<String>() == text;
    if !covers {
        return Err(FormatError::Coverage {
            expected: char_len(text),
            actual,
        });
    }
    normalize_pieces(&mut pieces);
    Ok(pieces)
}

/// Runs highlight refreshes over a [`Document`].
pub struct HighlightScheduler {
    formatter: Arc<dyn LineFormatter>,
    reporter: Arc<dyn ExceptionReporter>,
    batch_lines: usize,
    near_window: usize,
    runs: AtomicU64,
    last_error: GuardedCell<Option<EditorError>>,
}

impl std::fmt::Debug for HighlightScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HighlightScheduler")
            .field("batch_lines", &self.batch_lines)
            .field("near_window", &self.near_window)
            .field("runs", &self.refresh_count())
            .finish()
    }
}

impl HighlightScheduler {
    /// Create a scheduler checking the version every `batch_lines` lines and refreshing
    /// `near_window` lines around each affected line first.
    pub fn new(
        formatter: Arc<dyn LineFormatter>,
        reporter: Arc<dyn ExceptionReporter>,
        batch_lines: usize,
        near_window: usize,
    ) -> Self {
        Self {
            formatter,
            reporter,
            batch_lines: batch_lines.max(1),
            near_window,
            runs: AtomicU64::new(0),
            last_error: GuardedCell::new(None),
        }
    }

    /// Number of refresh runs started so far.
    pub fn refresh_count(&self) -> u64 {
        self.runs.load(Ordering::SeqCst)
    }

    /// Remember an error no caller could receive.
    pub(crate) fn store_error(&self, error: EditorError) {
        *self.last_error.lock() = Some(error);
    }

    /// Take the last stored error.
    pub fn take_error(&self) -> Option<EditorError> {
        self.last_error.lock().take()
    }

    /// Commit pending text and refresh style pieces.
    ///
    /// Returns [`RefreshOutcome::Aborted`] as soon as the document version moves, and
    /// [`EditorError::Format`] if the reporter leaves a formatter error unhandled.
    pub fn refresh(
        &self,
        document: &Document,
        events: &EventHub,
    ) -> Result<RefreshOutcome, EditorError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        let version = document.bump_version();
        tracing::debug!(version, "highlight refresh started");

        let Some(texts) = self.walk(document, version) else {
            return Ok(aborted(version, "walk"));
        };
        let content = texts.join(document.line_ending().as_str());
        if document.version() != version {
            return Ok(aborted(version, "content"));
        }

        let committed = document.with_lines_at(version, |lines| {
            let changes: Vec<(usize, String, String)> = lines
                .iter()
                .enumerate()
                .filter_map(|(i, line)| {
                    line.state()
                        .take_refresh()
                        .map(|(old, new)| (i + 1, old, new))
                })
                .collect();
            (lines.to_vec(), changes)
        });
        let Some((lines, changes)) = committed else {
            return Ok(aborted(version, "commit"));
        };

        let affected_lines: Vec<usize> = changes.iter().map(|(number, _, _)| *number).collect();
        let mut changed = changes.iter().filter(|(_, old, new)| old != new).peekable();
        let whitespace_only = changed.peek().is_some()
            && changed.all(|(_, old, new)| is_whitespace_only_change(old, new));

        let update = ContentUpdate {
            content,
            version,
            affected_lines,
            is_whitespace_only_change: whitespace_only,
        };
        if let Err(error) = self.formatter.content_updated(&update) {
            self.report(error)?;
        }
        if document.version() != version {
            return Ok(aborted(version, "hook"));
        }

        let (near, rest) = self.partition_near(lines.len(), &update.affected_lines);
        let mut formatted = 0;
        match self.format_lines(document, version, &lines, &near, events)? {
            Some(n) => formatted += n,
            None => return Ok(aborted(version, "near lines")),
        }
        if document.version() != version {
            return Ok(aborted(version, "near lines"));
        }
        match self.format_lines(document, version, &lines, &rest, events)? {
            Some(n) => formatted += n,
            None => return Ok(aborted(version, "remaining lines")),
        }

        tracing::debug!(
            version,
            affected = update.affected_lines.len(),
            formatted,
            whitespace_only,
            "highlight refresh completed"
        );
        events.notify(&EditorEvent::RefreshCompleted { version });
        Ok(RefreshOutcome::Completed {
            version,
            affected_lines: update.affected_lines,
            formatted,
        })
    }

    /// Current text of every line, re-checking the version between batches.
    fn walk(&self, document: &Document, version: u64) -> Option<Vec<String>> {
        let mut texts = Vec::new();
        loop {
            let batch = document.batch(version, texts.len(), self.batch_lines)?;
            if batch.is_empty() {
                return Some(texts);
            }
            texts.extend(batch.iter().map(|line| line.current_text()));
        }
    }

    /// Split `1..=line_count` into the lines near an affected line and the rest.
    fn partition_near(&self, line_count: usize, affected: &[usize]) -> (Vec<usize>, Vec<usize>) {
        let mut is_near = vec![false; line_count];
        for &line in affected {
            let low = line.saturating_sub(self.near_window).max(1);
            let high = line.saturating_add(self.near_window).min(line_count);
            for number in low..=high {
                is_near[number - 1] = true;
            }
        }
        (1..=line_count).partition(|number| is_near[number - 1])
    }

    /// Format `numbers` in batches. `Ok(None)` means the version moved.
    fn format_lines(
        &self,
        document: &Document,
        version: u64,
        lines: &[Arc<Line>],
        numbers: &[usize],
        events: &EventHub,
    ) -> Result<Option<usize>, EditorError> {
        let mut formatted = 0;
        for chunk in numbers.chunks(self.batch_lines) {
            if document.version() != version {
                return Ok(None);
            }
            for &number in chunk {
                if self.format_line(&lines[number - 1])? {
                    formatted += 1;
                    events.notify(&EditorEvent::LineFormatRequested { line: number });
                }
            }
        }
        Ok(Some(formatted))
    }

    /// Request pieces for one line; they are applied only if the line has not moved on.
    fn format_line(&self, line: &Line) -> Result<bool, EditorError> {
        let text = line.text();
        let pieces = match self
            .formatter
            .format_line(&text)
            .and_then(|pieces| validate(&text, pieces))
        {
            Ok(pieces) => pieces,
            Err(error) => {
                self.report(error)?;
                return Ok(false);
            }
        };

        let mut state = line.state();
        if state.pending.is_some() || state.text != text {
            return Ok(false);
        }
        state.pieces = pieces;
        Ok(true)
    }

    fn report(&self, error: FormatError) -> Result<(), EditorError> {
        if self.reporter.report(&error) {
            Ok(())
        } else {
            Err(error.into())
        }
    }
}

fn aborted(version: u64, stage: &'static str) -> RefreshOutcome {
    tracing::debug!(version, stage, "highlight refresh superseded");
    RefreshOutcome::Aborted { version }
}
