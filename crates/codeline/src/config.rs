//! Editor configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Controls how a Tab key press inserts text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TabKeyBehavior {
    /// Insert a literal tab character (`'\t'`).
    Tab,
    /// Insert spaces up to the next tab stop.
    #[default]
    Spaces,
}

/// Tunables of the editing engine. Every field has a default, so partial documents deserialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Delay between the last edit and the highlight refresh, in milliseconds.
    pub debounce_ms: u64,
    /// Lines walked between two version checks during a refresh.
    pub refresh_batch_lines: usize,
    /// Lines on each side of an affected line refreshed in the first phase.
    pub near_window: usize,
    /// Maximum number of undo steps kept.
    pub undo_capacity: usize,
    /// Width of one indentation level in spaces.
    pub indent_width: usize,
    /// What the Tab key inserts.
    pub tab_key_behavior: TabKeyBehavior,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            refresh_batch_lines: 128,
            near_window: 6,
            undo_capacity: 1000,
            indent_width: 4,
            tab_key_behavior: TabKeyBehavior::Spaces,
        }
    }
}

impl EditorConfig {
    /// Debounce delay as a [`Duration`].
    pub fn debounce_delay(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// One indentation level.
    pub fn indent_unit(&self) -> String {
        match self.tab_key_behavior {
            TabKeyBehavior::Tab => "\t".to_string(),
            TabKeyBehavior::Spaces => " ".repeat(self.indent_width.max(1)),
        }
    }

    /// Take the indent width from a language configuration.
    pub fn with_language(mut self, language: &codeline_lang::LanguageConfig) -> Self {
        self.indent_width = language.indent_width;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indent_unit() {
        let mut config = EditorConfig::default();
        assert_eq!(config.indent_unit(), "    ");
        config.tab_key_behavior = TabKeyBehavior::Tab;
        assert_eq!(config.indent_unit(), "\t");
        assert_eq!(config.debounce_delay(), Duration::from_millis(300));
    }
}
