use codeline::{
    Document, Editor, EditorConfig, ManualTimer, MoveFlags, Services, TextLocation, TextRange,
    UndoEngine,
};
use std::sync::Arc;
use std::time::Duration;

fn editor(text: &str) -> (Editor, Arc<ManualTimer>) {
    editor_with(text, EditorConfig::default())
}

fn editor_with(text: &str, config: EditorConfig) -> (Editor, Arc<ManualTimer>) {
    let timer = Arc::new(ManualTimer::new());
    let mut editor = Editor::new(config, Services::default().with_timer(timer.clone()));
    editor.load_content(text);
    (editor, timer)
}

fn type_str(editor: &mut Editor, s: &str) {
    for ch in s.chars() {
        editor.insert_character(ch);
    }
}

#[test]
fn test_typing_burst_is_one_step() {
    let (mut editor, _timer) = editor("");
    type_str(&mut editor, "abc");
    assert_eq!(editor.get_content(), "abc");
    assert_eq!(editor.undo_depth(), 1);

    assert!(editor.undo().unwrap());
    assert_eq!(editor.get_content(), "");
    assert_eq!(editor.cursor(), TextLocation::new(1, 1));
    assert!(!editor.can_undo());
    assert!(editor.can_redo());

    assert!(editor.redo().unwrap());
    assert_eq!(editor.get_content(), "abc");
    assert_eq!(editor.cursor(), TextLocation::new(1, 4));
    assert!(!editor.can_redo());
}

#[test]
fn test_undo_with_empty_stack() {
    let (mut editor, _timer) = editor("text");
    assert!(!editor.undo().unwrap());
    assert!(!editor.redo().unwrap());
    assert_eq!(editor.get_content(), "text");
}

#[test]
fn test_cursor_move_splits_typing() {
    let (mut editor, _timer) = editor("");
    type_str(&mut editor, "ab");
    editor.move_cursor_to(1, 1, MoveFlags::empty());
    type_str(&mut editor, "xy");
    assert_eq!(editor.get_content(), "xyab");
    assert_eq!(editor.undo_depth(), 2);

    editor.undo().unwrap();
    assert_eq!(editor.get_content(), "ab");
    editor.undo().unwrap();
    assert_eq!(editor.get_content(), "");
}

#[test]
fn test_end_typing_undo_splits_typing() {
    let (mut editor, _timer) = editor("");
    type_str(&mut editor, "ab");
    editor.end_typing_undo();
    type_str(&mut editor, "cd");
    assert_eq!(editor.undo_depth(), 2);

    editor.undo().unwrap();
    assert_eq!(editor.get_content(), "ab");
}

#[test]
fn test_refresh_closes_typing_step() {
    let (mut editor, timer) = editor("");
    type_str(&mut editor, "ab");
    timer.advance(Duration::from_millis(300));
    type_str(&mut editor, "cd");
    assert_eq!(editor.undo_depth(), 2);
}

#[test]
fn test_backspace_is_its_own_step() {
    let (mut editor, _timer) = editor("");
    type_str(&mut editor, "abc");
    editor.handle_backspace();
    assert_eq!(editor.get_content(), "ab");
    assert_eq!(editor.undo_depth(), 2);

    editor.undo().unwrap();
    assert_eq!(editor.get_content(), "abc");
    assert_eq!(editor.cursor(), TextLocation::new(1, 4));
    editor.undo().unwrap();
    assert_eq!(editor.get_content(), "");
}

#[test]
fn test_enter_undo_restores_single_line() {
    let (mut editor, _timer) = editor("ab\ncd");
    editor.move_cursor_to(1, 3, MoveFlags::empty());
    editor.handle_enter();
    assert_eq!(editor.line_count(), 3);

    editor.undo().unwrap();
    assert_eq!(editor.get_content(), "ab\ncd");
    assert_eq!(editor.cursor(), TextLocation::new(1, 3));

    editor.redo().unwrap();
    assert_eq!(editor.get_content(), "ab\n\ncd");
    assert_eq!(editor.cursor(), TextLocation::new(2, 1));
}

#[test]
fn test_multi_line_delete_undo_redo() {
    let (mut editor, _timer) = editor("Hello\nWorld");
    editor.move_cursor_to(1, 3, MoveFlags::empty());
    editor.move_cursor_to(2, 3, MoveFlags::HIGHLIGHTING);
    editor.delete_selection();
    assert_eq!(editor.get_content(), "Herld");

    editor.undo().unwrap();
    assert_eq!(editor.get_content(), "Hello\nWorld");
    assert_eq!(editor.cursor(), TextLocation::new(2, 3));

    editor.redo().unwrap();
    assert_eq!(editor.get_content(), "Herld");
    assert_eq!(editor.cursor(), TextLocation::new(1, 3));
}

#[test]
fn test_new_edit_clears_redo() {
    let (mut editor, _timer) = editor("");
    type_str(&mut editor, "a");
    editor.undo().unwrap();
    assert!(editor.can_redo());

    type_str(&mut editor, "b");
    assert!(!editor.can_redo());
    assert_eq!(editor.redo_depth(), 0);
}

#[test]
fn test_undo_capacity_drops_oldest() {
    let config = EditorConfig {
        undo_capacity: 2,
        ..EditorConfig::default()
    };
    let (mut editor, _timer) = editor_with("", config);
    for word in ["one ", "two ", "three"] {
        editor.replace_selection(Some(word)).unwrap();
    }
    assert_eq!(editor.undo_depth(), 2);

    while editor.undo().unwrap() {}
    assert_eq!(editor.get_content(), "one ");
}

#[test]
fn test_undo_redo_sequence_walks_history() {
    let (mut editor, _timer) = editor("x");
    editor.move_cursor_to(1, 2, MoveFlags::empty());
    editor.replace_selection(Some("1")).unwrap();
    editor.replace_selection(Some("2")).unwrap();
    editor.replace_selection(Some("3")).unwrap();
    assert_eq!(editor.get_content(), "x123");

    editor.undo().unwrap();
    editor.undo().unwrap();
    assert_eq!(editor.get_content(), "x1");
    assert_eq!(editor.redo_depth(), 2);

    editor.redo().unwrap();
    assert_eq!(editor.get_content(), "x12");
    editor.redo().unwrap();
    assert_eq!(editor.get_content(), "x123");
}

#[test]
fn test_engine_item_texts() {
    let document = Document::from_text("");
    let mut engine = UndoEngine::new(10);

    assert!(!engine.begin_typing(&document, TextLocation::new(1, 1)));
    assert!(engine.extend_typing(TextLocation::new(1, 1), 3));
    assert!(engine.peek().unwrap().is_open());

    engine.end_typing(&document);
    let item = engine.peek().unwrap();
    assert!(!item.is_open());
    assert_eq!(item.before_text, "");
    assert_eq!(item.before, TextRange::caret(TextLocation::new(1, 1)));
    assert_eq!(
        item.after,
        TextRange::new(TextLocation::new(1, 1), TextLocation::new(1, 4))
    );
}

#[test]
fn test_engine_captures_typed_text_on_close() {
    let document = Document::from_text("abc");
    let mut engine = UndoEngine::new(10);
    engine.begin_typing(&document, TextLocation::new(1, 1));
    engine.extend_typing(TextLocation::new(1, 1), 3);
    engine.end_typing(&document);

    let item = engine.peek().unwrap();
    assert_eq!(item.before_text, "");
    assert_eq!(item.after_text.as_deref(), Some("abc"));
}

#[test]
fn test_engine_capacity_and_clear() {
    let mut engine = UndoEngine::new(2);
    for column in 1..=3 {
        let at = TextLocation::new(1, column);
        engine.begin(TextRange::caret(at), String::new());
        engine.end(TextRange::new(at, TextLocation::new(1, column + 1)), "x".to_string());
    }
    assert_eq!(engine.undo_depth(), 2);
    assert_eq!(
        engine.peek().map(|item| item.before.start),
        Some(TextLocation::new(1, 3))
    );

    engine.clear();
    assert!(!engine.can_undo());
    assert!(!engine.can_redo());
}
