//! Source positions reported by scanners and attached to runtime errors.

/// A line/column position in the scanned input.
///
/// Lines and columns are 1-based; `offset` is the 0-based byte offset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct SourcePosition {
    pub line: u32,
    pub column: u32,
    pub offset: usize,
}

impl SourcePosition {
    #[must_use]
    pub const fn new(line: u32, column: u32, offset: usize) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }

    /// The position of the first character of an input.
    #[must_use]
    pub const fn start() -> Self {
        Self::new(1, 1, 0)
    }
}

impl std::fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}
