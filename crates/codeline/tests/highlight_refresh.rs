use codeline::{
    ContentUpdate, DEFAULT_STYLE_ID, Editor, EditorConfig, EditorError, EditorEvent,
    ExceptionReporter, FormatError, LineFormatter, ManualTimer, MoveFlags, Piece,
    RefreshOutcome, Services, StyleId,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const DIGIT_STYLE: StyleId = 7;

/// Plain pieces; remembers every call.
#[derive(Default)]
struct RecordingFormatter {
    formatted: Mutex<Vec<String>>,
    updates: Mutex<Vec<ContentUpdate>>,
}

impl LineFormatter for RecordingFormatter {
    fn format_line(&self, text: &str) -> Result<Vec<Piece>, FormatError> {
        self.formatted.lock().unwrap().push(text.to_string());
        Ok(vec![Piece::plain(text)])
    }

    fn content_updated(&self, update: &ContentUpdate) -> Result<(), FormatError> {
        self.updates.lock().unwrap().push(update.clone());
        Ok(())
    }
}

/// Styles ASCII digits.
struct DigitFormatter;

impl LineFormatter for DigitFormatter {
    fn format_line(&self, text: &str) -> Result<Vec<Piece>, FormatError> {
        let mut pieces: Vec<Piece> = Vec::new();
        for ch in text.chars() {
            let style = if ch.is_ascii_digit() {
                DIGIT_STYLE
            } else {
                DEFAULT_STYLE_ID
            };
            match pieces.last_mut() {
                Some(piece) if piece.style_id == style => piece.text.push(ch),
                _ => pieces.push(Piece::new(ch.to_string(), style)),
            }
        }
        Ok(pieces)
    }
}

/// Fails on lines mentioning "boom".
struct FailingFormatter;

impl LineFormatter for FailingFormatter {
    fn format_line(&self, text: &str) -> Result<Vec<Piece>, FormatError> {
        if text.contains("boom") {
            return Err(FormatError::Failed(format!("cannot format {text:?}")));
        }
        Ok(vec![Piece::plain(text)])
    }
}

/// Returns a single one-char piece whatever the line.
struct ShortFormatter;

impl LineFormatter for ShortFormatter {
    fn format_line(&self, _text: &str) -> Result<Vec<Piece>, FormatError> {
        Ok(vec![Piece::plain("x")])
    }
}

struct CollectingReporter {
    handled: bool,
    errors: Mutex<Vec<FormatError>>,
}

impl CollectingReporter {
    fn new(handled: bool) -> Arc<Self> {
        Arc::new(Self {
            handled,
            errors: Mutex::new(Vec::new()),
        })
    }
}

impl ExceptionReporter for CollectingReporter {
    fn report(&self, error: &FormatError) -> bool {
        self.errors.lock().unwrap().push(error.clone());
        self.handled
    }
}

fn editor_with(services: Services) -> (Editor, Arc<ManualTimer>) {
    let timer = Arc::new(ManualTimer::new());
    let editor = Editor::new(EditorConfig::default(), services.with_timer(timer.clone()));
    (editor, timer)
}

fn texts(pieces: &[Piece]) -> Vec<(&str, StyleId)> {
    pieces.iter().map(|p| (p.text.as_str(), p.style_id)).collect()
}

#[test]
fn test_debounce_coalesces_edits() {
    let (mut editor, timer) = editor_with(Services::default());
    editor.load_content("");
    editor.insert_character('a');
    editor.insert_character('b');
    assert!(editor.is_refresh_pending());
    assert_eq!(timer.pending_count(), 1);

    assert_eq!(timer.advance(Duration::from_millis(299)), 0);
    assert_eq!(editor.refresh_count(), 0);

    assert_eq!(timer.advance(Duration::from_millis(1)), 1);
    assert_eq!(editor.refresh_count(), 1);
    assert!(!editor.is_refresh_pending());
    assert_eq!(editor.document().line(1).unwrap().text(), "ab");
}

#[test]
fn test_edit_restarts_debounce_window() {
    let (mut editor, timer) = editor_with(Services::default());
    editor.load_content("");
    timer.advance(Duration::from_millis(200));
    editor.insert_character('a');

    assert_eq!(timer.advance(Duration::from_millis(200)), 0);
    assert_eq!(editor.refresh_count(), 0);
    assert_eq!(timer.advance(Duration::from_millis(100)), 1);
    assert_eq!(editor.refresh_count(), 1);
}

#[test]
fn test_refresh_now_cancels_scheduled_run() {
    let (mut editor, timer) = editor_with(Services::default());
    editor.load_content("x");
    editor.insert_character('y');

    assert!(!editor.refresh_now().unwrap().is_aborted());
    assert_eq!(editor.refresh_count(), 1);
    assert!(!editor.is_refresh_pending());
    assert_eq!(timer.run_pending(), 0);
}

#[test]
fn test_content_update_after_load() {
    let formatter = Arc::new(RecordingFormatter::default());
    let (mut editor, _timer) = editor_with(Services::default().with_formatter(formatter.clone()));
    editor.load_content("a\nb");

    let outcome = editor.refresh_now().unwrap();
    let RefreshOutcome::Completed {
        version,
        affected_lines,
        formatted,
    } = outcome
    else {
        panic!("refresh aborted");
    };
    assert_eq!(affected_lines, vec![1, 2]);
    assert_eq!(formatted, 2);

    let updates = formatter.updates.lock().unwrap();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].content, "a\nb");
    assert_eq!(updates[0].version, version);
    assert!(!updates[0].is_whitespace_only_change);
}

#[test]
fn test_content_update_uses_document_line_ending() {
    let formatter = Arc::new(RecordingFormatter::default());
    let (mut editor, _timer) = editor_with(Services::default().with_formatter(formatter.clone()));
    editor.load_content("a\r\nb");
    editor.refresh_now().unwrap();
    assert_eq!(formatter.updates.lock().unwrap()[0].content, "a\r\nb");
}

#[test]
fn test_lines_near_edit_are_formatted_first() {
    let formatter = Arc::new(RecordingFormatter::default());
    let (mut editor, _timer) = editor_with(Services::default().with_formatter(formatter.clone()));
    let lines: Vec<String> = (1..=30).map(|n| format!("l{n}")).collect();
    editor.load_content(&lines.join("\n"));
    editor.refresh_now().unwrap();
    formatter.formatted.lock().unwrap().clear();

    editor.move_cursor_to(20, 1, MoveFlags::empty());
    editor.insert_character('x');
    let outcome = editor.refresh_now().unwrap();
    assert!(matches!(
        outcome,
        RefreshOutcome::Completed { ref affected_lines, formatted: 30, .. } if *affected_lines == vec![20]
    ));

    let text_of = |n: usize| {
        if n == 20 {
            "xl20".to_string()
        } else {
            format!("l{n}")
        }
    };
    let expected: Vec<String> = (14..=26).chain(1..=13).chain(27..=30).map(text_of).collect();
    assert_eq!(*formatter.formatted.lock().unwrap(), expected);
}

#[test]
fn test_whitespace_only_change_flag() {
    let formatter = Arc::new(RecordingFormatter::default());
    let (mut editor, _timer) = editor_with(Services::default().with_formatter(formatter.clone()));
    editor.load_content("a b\nc");
    editor.refresh_now().unwrap();

    editor.move_cursor_to(1, 3, MoveFlags::empty());
    editor.insert_character(' ');
    editor.refresh_now().unwrap();

    editor.insert_character('z');
    editor.refresh_now().unwrap();

    let updates = formatter.updates.lock().unwrap();
    assert_eq!(updates.len(), 3);
    assert!(updates[1].is_whitespace_only_change);
    assert_eq!(updates[1].affected_lines, vec![1]);
    assert!(!updates[2].is_whitespace_only_change);
}

#[test]
fn test_refresh_without_changes_is_not_whitespace_only() {
    let formatter = Arc::new(RecordingFormatter::default());
    let (mut editor, _timer) = editor_with(Services::default().with_formatter(formatter.clone()));
    editor.load_content("same");
    editor.refresh_now().unwrap();
    editor.refresh_now().unwrap();

    let updates = formatter.updates.lock().unwrap();
    assert!(updates[1].affected_lines.is_empty());
    assert!(!updates[1].is_whitespace_only_change);
}

#[test]
fn test_pieces_track_edits_between_refreshes() {
    let (mut editor, _timer) = editor_with(Services::default().with_formatter(Arc::new(DigitFormatter)));
    editor.load_content("a1b");
    editor.refresh_now().unwrap();

    let line = editor.document().line(1).unwrap();
    assert_eq!(
        texts(&line.pieces()),
        vec![("a", DEFAULT_STYLE_ID), ("1", DIGIT_STYLE), ("b", DEFAULT_STYLE_ID)]
    );

    editor.move_cursor_to(1, 3, MoveFlags::empty());
    editor.insert_character('2');
    let joined: String = line.pieces().iter().map(|p| p.text.as_str()).collect();
    assert_eq!(joined, line.current_text());

    editor.refresh_now().unwrap();
    assert_eq!(
        texts(&line.pieces()),
        vec![("a", DEFAULT_STYLE_ID), ("12", DIGIT_STYLE), ("b", DEFAULT_STYLE_ID)]
    );
}

#[test]
fn test_split_lines_keep_their_pieces() {
    let (mut editor, _timer) = editor_with(Services::default().with_formatter(Arc::new(DigitFormatter)));
    editor.load_content("ab12cd");
    editor.refresh_now().unwrap();

    editor.move_cursor_to(1, 4, MoveFlags::empty());
    editor.handle_enter();
    let first = editor.document().line(1).unwrap();
    let second = editor.document().line(2).unwrap();
    assert_eq!(texts(&first.pieces()), vec![("ab", DEFAULT_STYLE_ID), ("1", DIGIT_STYLE)]);
    assert_eq!(texts(&second.pieces()), vec![("2", DIGIT_STYLE), ("cd", DEFAULT_STYLE_ID)]);
}

#[test]
fn test_handled_error_skips_line() {
    let reporter = CollectingReporter::new(true);
    let (mut editor, _timer) = editor_with(
        Services::default()
            .with_formatter(Arc::new(FailingFormatter))
            .with_reporter(reporter.clone()),
    );
    editor.load_content("ok\nboom\nfine");

    let outcome = editor.refresh_now().unwrap();
    assert!(matches!(outcome, RefreshOutcome::Completed { formatted: 2, .. }));
    assert_eq!(reporter.errors.lock().unwrap().len(), 1);
    // The failing line keeps the pieces it had.
    assert_eq!(
        editor.document().line(2).unwrap().pieces(),
        vec![Piece::plain("boom")]
    );
}

#[test]
fn test_unhandled_error_fails_refresh() {
    let reporter = CollectingReporter::new(false);
    let (mut editor, _timer) = editor_with(
        Services::default()
            .with_formatter(Arc::new(FailingFormatter))
            .with_reporter(reporter.clone()),
    );
    editor.load_content("boom");
    editor.insert_character('!');

    let error = editor.refresh_now().unwrap_err();
    assert!(matches!(error, EditorError::Format(FormatError::Failed(_))));
    assert_eq!(reporter.errors.lock().unwrap().len(), 1);
    // Pending text was committed before the failure.
    let line = editor.document().line(1).unwrap();
    assert_eq!(line.pending_text(), None);
    assert_eq!(line.text(), "!boom");
}

#[test]
fn test_unhandled_error_on_timer_is_kept() {
    let (mut editor, timer) = editor_with(
        Services::default()
            .with_formatter(Arc::new(FailingFormatter))
            .with_reporter(CollectingReporter::new(false)),
    );
    editor.load_content("boom");
    assert_eq!(timer.run_pending(), 1);

    assert!(matches!(
        editor.take_refresh_error(),
        Some(EditorError::Format(FormatError::Failed(_)))
    ));
    assert_eq!(editor.take_refresh_error(), None);
}

#[test]
fn test_coverage_mismatch_is_reported() {
    let reporter = CollectingReporter::new(true);
    let (mut editor, _timer) = editor_with(
        Services::default()
            .with_formatter(Arc::new(ShortFormatter))
            .with_reporter(reporter.clone()),
    );
    editor.load_content("abc");
    editor.refresh_now().unwrap();

    assert_eq!(
        *reporter.errors.lock().unwrap(),
        vec![FormatError::Coverage {
            expected: 3,
            actual: 1
        }]
    );
}

#[test]
fn test_refresh_events() {
    let (mut editor, _timer) = editor_with(Services::default());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _subscription = editor.subscribe(move |event| sink.lock().unwrap().push(event.clone()));

    editor.load_content("a\nb");
    let version = match editor.refresh_now().unwrap() {
        RefreshOutcome::Completed { version, .. } => version,
        RefreshOutcome::Aborted { .. } => panic!("refresh aborted"),
    };
    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            EditorEvent::ContentLoaded { line_count: 2 },
            EditorEvent::LineFormatRequested { line: 1 },
            EditorEvent::LineFormatRequested { line: 2 },
            EditorEvent::RefreshCompleted { version },
        ]
    );
}

#[test]
fn test_structural_edit_events() {
    let (mut editor, _timer) = editor_with(Services::default());
    editor.load_content("a\nb");
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let subscription = editor.subscribe(move |event| sink.lock().unwrap().push(event.clone()));

    editor.move_cursor_to(1, 2, MoveFlags::empty());
    editor.handle_enter();
    editor.handle_backspace();
    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            EditorEvent::LineChanged { line: 1 },
            EditorEvent::LinesInserted { after: 1, count: 1 },
            EditorEvent::LineChanged { line: 1 },
            EditorEvent::LinesRemoved { after: 1, count: 1 },
        ]
    );

    drop(subscription);
    editor.insert_character('c');
    assert_eq!(seen.lock().unwrap().len(), 4);
}
