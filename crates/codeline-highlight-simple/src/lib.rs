//! `codeline-highlight-simple` - Simple (regex-based) line formatter for `codeline`.
//!
//! This crate is intended for lightweight formats (JSON/INI/etc.) where a real parser is
//! unnecessary. Every line is styled on its own, which is exactly the contract of
//! [`LineFormatter`].

use codeline::{DEFAULT_STYLE_ID, FormatError, LineFormatter, Piece, StyleId};
use regex::Regex;

/// A single regex highlighting rule.
#[derive(Debug, Clone)]
pub struct RegexRule {
    regex: Regex,
    style_id: StyleId,
    capture_group: Option<usize>,
}

impl RegexRule {
    pub fn new(pattern: &str, style_id: StyleId) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
            style_id,
            capture_group: None,
        })
    }

    /// Highlight only a capture group of each match.
    ///
    /// Example (INI key):
    /// - pattern: `^\\s*([^=\\s]+)\\s*=`
    /// - capture_group: `1` (the key)
    pub fn with_capture_group(mut self, group: usize) -> Self {
        self.capture_group = Some(group);
        self
    }

    pub fn style_id(&self) -> StyleId {
        self.style_id
    }

    /// Byte ranges this rule claims in `line`.
    fn spans(&self, line: &str) -> Vec<(usize, usize)> {
        match self.capture_group {
            Some(group) => self
                .regex
                .captures_iter(line)
                .filter_map(|caps| caps.get(group))
                .map(|m| (m.start(), m.end()))
                .collect(),
            None => self
                .regex
                .find_iter(line)
                .map(|m| (m.start(), m.end()))
                .collect(),
        }
    }
}

/// A regex-based [`LineFormatter`].
///
/// Rules are applied in order and the first rule to claim a char wins, so a number inside a
/// string stays a string. Designed for simple formats; it is *not* a parser.
#[derive(Debug, Clone)]
pub struct RegexFormatter {
    rules: Vec<RegexRule>,
}

impl RegexFormatter {
    pub fn new(rules: Vec<RegexRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[RegexRule] {
        &self.rules
    }

    /// Style of every char of `line`.
    fn paint(&self, line: &str) -> Vec<StyleId> {
        let char_starts: Vec<usize> = line.char_indices().map(|(offset, _)| offset).collect();
        let mut styles: Vec<Option<StyleId>> = vec![None; char_starts.len()];

        for rule in &self.rules {
            for (start, end) in rule.spans(line) {
                if start >= end {
                    continue;
                }
                let first = char_starts.partition_point(|offset| *offset < start);
                let last = char_starts.partition_point(|offset| *offset < end);
                for style in &mut styles[first..last] {
                    style.get_or_insert(rule.style_id);
                }
            }
        }

        styles
            .into_iter()
            .map(|style| style.unwrap_or(DEFAULT_STYLE_ID))
            .collect()
    }

    /// A small default JSON grammar (strings, numbers, booleans, null).
    pub fn json_default(styles: SimpleJsonStyles) -> Result<Self, regex::Error> {
        Ok(Self::new(vec![
            // JSON string (single-line, handles escapes)
            RegexRule::new(r#""(?:\\.|[^"\\])*""#, styles.string)?,
            // JSON number
            RegexRule::new(
                r#"-?(?:0|[1-9]\d*)(?:\.\d+)?(?:[eE][+-]?\d+)?"#,
                styles.number,
            )?,
            // JSON boolean / null
            RegexRule::new(r#"\b(?:true|false)\b"#, styles.boolean)?,
            RegexRule::new(r#"\bnull\b"#, styles.null)?,
        ]))
    }

    /// A small default INI grammar (section, key, comment).
    pub fn ini_default(styles: SimpleIniStyles) -> Result<Self, regex::Error> {
        Ok(Self::new(vec![
            // Comment: ;... or #...
            RegexRule::new(r#"^\s*[;#].*$"#, styles.comment)?,
            // Section header: [section]
            RegexRule::new(r#"^\s*\[([^\]]+)\]\s*$"#, styles.section)?.with_capture_group(1),
            // Key: key = value
            RegexRule::new(r#"^\s*([^=\s]+)\s*="#, styles.key)?.with_capture_group(1),
        ]))
    }
}

impl LineFormatter for RegexFormatter {
    fn format_line(&self, text: &str) -> Result<Vec<Piece>, FormatError> {
        let mut pieces: Vec<Piece> = Vec::new();
        for (ch, style_id) in text.chars().zip(self.paint(text)) {
            match pieces.last_mut() {
                Some(piece) if piece.style_id == style_id => piece.text.push(ch),
                _ => pieces.push(Piece::new(ch.to_string(), style_id)),
            }
        }
        if pieces.is_empty() {
            pieces.push(Piece::plain(""));
        }
        Ok(pieces)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SimpleJsonStyles {
    pub string: StyleId,
    pub number: StyleId,
    pub boolean: StyleId,
    pub null: StyleId,
}

impl Default for SimpleJsonStyles {
    fn default() -> Self {
        Self {
            string: SIMPLE_STYLE_STRING,
            number: SIMPLE_STYLE_NUMBER,
            boolean: SIMPLE_STYLE_BOOLEAN,
            null: SIMPLE_STYLE_NULL,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SimpleIniStyles {
    pub section: StyleId,
    pub key: StyleId,
    pub comment: StyleId,
}

impl Default for SimpleIniStyles {
    fn default() -> Self {
        Self {
            section: SIMPLE_STYLE_SECTION,
            key: SIMPLE_STYLE_KEY,
            comment: SIMPLE_STYLE_COMMENT,
        }
    }
}

/// Default `StyleId` constants for `RegexFormatter`-based grammars.
///
/// These are only identifiers. UI/theme layer is expected to map them to actual colors.
pub const SIMPLE_STYLE_STRING: StyleId = 0x0200_0001;
pub const SIMPLE_STYLE_NUMBER: StyleId = 0x0200_0002;
pub const SIMPLE_STYLE_BOOLEAN: StyleId = 0x0200_0003;
pub const SIMPLE_STYLE_NULL: StyleId = 0x0200_0004;
pub const SIMPLE_STYLE_SECTION: StyleId = 0x0200_0010;
pub const SIMPLE_STYLE_KEY: StyleId = 0x0200_0011;
pub const SIMPLE_STYLE_COMMENT: StyleId = 0x0200_0012;
