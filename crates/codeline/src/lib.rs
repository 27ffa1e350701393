#![warn(missing_docs)]
//! Codeline - Headless Line-Oriented Text Editing Engine
//!
//! # Overview
//!
//! `codeline` is the editing core behind a code editor surface. It keeps a mutable multi-line
//! document with cursor and selection tracking, coalesced multi-level undo/redo, auto-closing
//! brackets and a debounced, version-cancelled highlight refresh. Painting the styled runs is
//! left to the front end.
//!
//! # Core Features
//!
//! - **Line Model**: committed text plus an in-flight pending text per line, each behind its own lock
//! - **General Replace**: one multi-line `replace_text` primitive drives paste, undo and redo
//! - **Undo Coalescing**: a burst of keystrokes is one undo step
//! - **Auto-Brackets**: a stack of auto-inserted closers, typed over or deleted in pairs
//! - **Incremental Highlighting**: near-first two-phase refresh that gives up when the document moves on
//! - **Change Notifications**: event hub and observable fields with drop-to-unsubscribe tokens
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Editor (commands, key table, clipboard)    │  ← Public API
//! ├─────────────────────────────────────────────┤
//! │  Undo Engine  │  Brace Matcher  │  Cursor   │  ← Edit bookkeeping
//! ├─────────────────────────────────────────────┤
//! │  Highlight Scheduler (debounced refresh)    │  ← Styles
//! ├─────────────────────────────────────────────┤
//! │  Document (version, line list)              │  ← Line Buffer
//! ├─────────────────────────────────────────────┤
//! │  Line (text, pending, pieces, selection)    │  ← Per-line state
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use codeline::{Editor, EditorConfig, ManualTimer, Services, TextLocation};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let timer = Arc::new(ManualTimer::new());
//! let mut editor = Editor::new(
//!     EditorConfig::default(),
//!     Services::default().with_timer(timer.clone()),
//! );
//!
//! editor.load_content("ab\ncd");
//! editor.move_cursor_to(1, 3, Default::default());
//! editor.handle_enter();
//! assert_eq!(editor.get_content(), "ab\n\ncd");
//! assert_eq!(editor.cursor(), TextLocation::new(2, 1));
//!
//! // The debounced refresh commits pending text and re-styles lines.
//! timer.advance(Duration::from_millis(300));
//! assert_eq!(editor.refresh_count(), 1);
//! ```
//!
//! # Module Description
//!
//! - [`document`] - the line buffer and its `replace_text` primitive
//! - [`line`] - per-line state and style pieces
//! - [`cursor`] - cursor, selection anchor and sticky column
//! - [`undo`] - undo/redo stacks with typing coalescing
//! - [`brace`] - auto-inserted closer tracking
//! - [`highlight`] - format hook and the version-checked refresh
//! - [`timer`] - timer collaborator and debouncer
//! - [`editor`] - the programmatic editing surface

pub mod brace;
pub mod clipboard;
pub mod config;
pub mod cursor;
pub mod document;
pub mod editor;
pub mod error;
pub mod events;
mod guarded;
pub mod highlight;
pub mod keymap;
pub mod line;
pub mod position;
pub mod text;
pub mod timer;
pub mod undo;

pub use brace::{BraceStack, TypeAction};
pub use clipboard::{Clipboard, MemoryClipboard};
pub use codeline_lang::{BracketMap, LanguageConfig};
pub use config::{EditorConfig, TabKeyBehavior};
pub use cursor::{CursorMove, CursorTracker, MoveFlags};
pub use document::{Document, ReplaceOutcome};
pub use editor::{Editor, Services};
pub use error::{EditorError, FormatError};
pub use events::{EditorEvent, EventHub, Observable, Subscribers, Subscription};
pub use guarded::GuardedCell;
pub use highlight::{
    ContentUpdate, ExceptionReporter, HighlightScheduler, LineFormatter, LoggingReporter,
    PlainFormatter, RefreshOutcome, is_whitespace_only_change,
};
pub use keymap::{EditorCommand, Key, KeyMap, Modifiers, Motion};
pub use line::{DEFAULT_STYLE_ID, Line, Piece, StyleId};
pub use position::{TextLocation, TextRange};
pub use text::{LineEnding, split_lines};
pub use timer::{Debouncer, ManualTimer, ScheduledAction, TaskHandle, ThreadTimer, Timer};
pub use undo::{UndoEngine, UndoItem};
