//! Raw-text helpers: initial line splitting, line endings and char/byte column conversions.
//!
//! All columns used by the engine count Unicode scalar values (`char`s), never bytes.

use unicode_segmentation::UnicodeSegmentation;

/// The line terminator used when joining lines back into a single string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    /// Unix-style LF (`'\n'`).
    #[default]
    Lf,
    /// Windows-style CRLF (`"\r\n"`).
    Crlf,
}

impl LineEnding {
    /// Detect the dominant line ending of a source text.
    ///
    /// Any CRLF in the input selects [`LineEnding::Crlf`].
    pub fn detect(text: &str) -> Self {
        if text.contains("\r\n") {
            Self::Crlf
        } else {
            Self::Lf
        }
    }

    /// The terminator as a string slice.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::Crlf => "\r\n",
        }
    }
}

/// Split raw content into lines with terminators stripped.
///
/// `split('\n')` keeps the trailing empty segment, so content ending with a terminator yields a
/// trailing empty line and the result is never empty.
pub fn split_lines(text: &str) -> Vec<String> {
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
        .collect()
}

/// Number of chars in `s`.
pub(crate) fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Byte offset of the char at `char_index`, or `s.len()` past the end.
pub(crate) fn byte_offset(s: &str, char_index: usize) -> usize {
    s.char_indices()
        .nth(char_index)
        .map(|(offset, _)| offset)
        .unwrap_or(s.len())
}

/// Substring between two char indices (clamped, half-open).
pub(crate) fn char_slice(s: &str, start: usize, end: usize) -> &str {
    let start_byte = byte_offset(s, start);
    let end_byte = byte_offset(s, end.max(start));
    &s[start_byte..end_byte]
}

/// The char at `char_index`, if any.
pub(crate) fn char_at(s: &str, char_index: usize) -> Option<char> {
    s.chars().nth(char_index)
}

/// Leading run of spaces/tabs.
pub(crate) fn leading_whitespace(s: &str) -> &str {
    let end = s
        .char_indices()
        .find(|(_, ch)| *ch != ' ' && *ch != '\t')
        .map(|(offset, _)| offset)
        .unwrap_or(s.len());
    &s[..end]
}

/// Word segments of `s` as char ranges, flagged when the segment is blank.
fn word_segments(s: &str) -> Vec<(usize, usize, bool)> {
    let mut segments = Vec::new();
    let mut start = 0;
    for segment in s.split_word_bounds() {
        let len = char_len(segment);
        segments.push((start, start + len, segment.chars().all(char::is_whitespace)));
        start += len;
    }
    segments
}

/// Char offset where the word before `offset` begins, skipping blanks. 0 if there is none.
pub(crate) fn previous_word_start(s: &str, offset: usize) -> usize {
    word_segments(s)
        .into_iter()
        .rev()
        .find(|(start, _, blank)| *start < offset && !blank)
        .map(|(start, _, _)| start)
        .unwrap_or(0)
}

/// Char offset where the word after `offset` ends, skipping blanks. The line length if there is none.
pub(crate) fn next_word_end(s: &str, offset: usize) -> usize {
    word_segments(s)
        .into_iter()
        .find(|(_, end, blank)| *end > offset && !blank)
        .map(|(_, end, _)| end)
        .unwrap_or_else(|| char_len(s))
}
