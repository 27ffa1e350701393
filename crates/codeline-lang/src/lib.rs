#![warn(missing_docs)]
//! `codeline-lang` - data-driven language configuration helpers for `codeline`.
//!
//! This crate intentionally stays lightweight and has no dependencies. It provides small structs
//! that hosts use to configure editing features (auto-closing brackets, indentation) in a
//! language-aware way.

/// Open→close character associations used for bracket auto-completion.
///
/// An empty map disables auto-bracketing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BracketMap {
    pairs: Vec<(char, char)>,
}

impl BracketMap {
    /// Create an empty map (auto-bracketing disabled).
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a pair.
    pub fn with_pair(mut self, open: char, close: char) -> Self {
        self.insert(open, close);
        self
    }

    /// Add (or replace) a pair in place.
    pub fn insert(&mut self, open: char, close: char) {
        if let Some(entry) = self.pairs.iter_mut().find(|(o, _)| *o == open) {
            entry.1 = close;
        } else {
            self.pairs.push((open, close));
        }
    }

    /// Brackets and quotes common to C-family languages.
    pub fn c_like() -> Self {
        Self::new()
            .with_pair('(', ')')
            .with_pair('[', ']')
            .with_pair('{', '}')
            .with_pair('"', '"')
            .with_pair('\'', '\'')
    }

    /// JSON: brackets and double quotes.
    pub fn json() -> Self {
        Self::new()
            .with_pair('{', '}')
            .with_pair('[', ']')
            .with_pair('"', '"')
    }

    /// Closing character registered for `open`, if any.
    pub fn closer_for(&self, open: char) -> Option<char> {
        self.pairs
            .iter()
            .find_map(|(o, c)| (*o == open).then_some(*c))
    }

    /// Returns `true` if `ch` is a registered opener.
    pub fn is_opener(&self, ch: char) -> bool {
        self.closer_for(ch).is_some()
    }

    /// Returns `true` if `ch` closes some registered pair.
    pub fn is_closer(&self, ch: char) -> bool {
        self.pairs.iter().any(|(_, c)| *c == ch)
    }

    /// Returns `true` if no pair is registered.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Iterate over `(open, close)` pairs in registration order.
    pub fn pairs(&self) -> impl Iterator<Item = (char, char)> + '_ {
        self.pairs.iter().copied()
    }
}

/// Per-language editing configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageConfig {
    /// Language name (e.g. `rust`, `json`).
    pub name: String,
    /// Auto-closing bracket pairs.
    pub brackets: BracketMap,
    /// Indent width in spaces.
    pub indent_width: usize,
}

impl LanguageConfig {
    /// Plain text: no auto-bracketing, 4-space indent.
    pub fn plain_text() -> Self {
        Self {
            name: "plaintext".to_string(),
            brackets: BracketMap::new(),
            indent_width: 4,
        }
    }

    /// Rust (C-like pairs, 4-space indent).
    pub fn rust() -> Self {
        Self {
            name: "rust".to_string(),
            brackets: BracketMap::c_like(),
            indent_width: 4,
        }
    }

    /// JSON (2-space indent).
    pub fn json() -> Self {
        Self {
            name: "json".to_string(),
            brackets: BracketMap::json(),
            indent_width: 2,
        }
    }
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self::plain_text()
    }
}
