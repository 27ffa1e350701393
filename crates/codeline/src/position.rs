//! Document coordinates.

use std::cmp::Ordering;

/// A 1-based `(line, column)` location. Columns count chars; column `len + 1` is end of line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextLocation {
    /// 1-based line number.
    pub line: usize,
    /// 1-based column.
    pub column: usize,
}

impl TextLocation {
    /// Create a new location.
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// The first location of a document.
    pub const fn origin() -> Self {
        Self::new(1, 1)
    }
}

impl Default for TextLocation {
    fn default() -> Self {
        Self::origin()
    }
}

impl Ord for TextLocation {
    fn cmp(&self, other: &Self) -> Ordering {
        self.line
            .cmp(&other.line)
            .then_with(|| self.column.cmp(&other.column))
    }
}

impl PartialOrd for TextLocation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A directed range: `start` is where it was anchored, `end` where it was extended to.
///
/// `end` may lie before `start`; use [`front`](Self::front)/[`back`](Self::back) for the
/// document-ordered bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextRange {
    /// Anchored end.
    pub start: TextLocation,
    /// Moving end.
    pub end: TextLocation,
}

impl TextRange {
    /// Create a range.
    pub const fn new(start: TextLocation, end: TextLocation) -> Self {
        Self { start, end }
    }

    /// A zero-length range at `at`.
    pub const fn caret(at: TextLocation) -> Self {
        Self { start: at, end: at }
    }

    /// The earlier of the two bounds.
    pub fn front(&self) -> TextLocation {
        self.start.min(self.end)
    }

    /// The later of the two bounds.
    pub fn back(&self) -> TextLocation {
        self.start.max(self.end)
    }

    /// `true` iff `start == end`.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// `true` if `end` lies before `start`.
    pub fn is_inverted(&self) -> bool {
        self.end < self.start
    }

    /// The same range with `start <= end`.
    pub fn normalized(&self) -> Self {
        Self::new(self.front(), self.back())
    }

    /// `true` if the range covers more than one line.
    pub fn is_multi_line(&self) -> bool {
        self.start.line != self.end.line
    }
}
