//! Source positions attached to expression nodes and errors.

use std::fmt;
use std::sync::Arc;

/// A byte range of the filter source together with the source it points into.
///
/// Spans created by the parser share one `Arc<str>` holding the whole source,
/// so the raw snippet is available without copying it into every node.
#[derive(Clone)]
pub struct SourceSpan {
    start: usize,
    end: usize,
    source: Arc<str>,
}

impl SourceSpan {
    /// Create a span over `source[start..end]`.
    ///
    /// Offsets are clamped to the source and to char boundaries.
    pub fn new(source: Arc<str>, start: usize, end: usize) -> Self {
        let end = floor_char_boundary(&source, end.min(source.len()));
        let start = floor_char_boundary(&source, start.min(end));
        Self { start, end, source }
    }

    /// Span covering a whole source string
    pub fn whole(source: Arc<str>) -> Self {
        let end = source.len();
        Self::new(source, 0, end)
    }

    /// An empty span for nodes built outside the parser
    pub fn detached() -> Self {
        Self {
            start: 0,
            end: 0,
            source: Arc::from(""),
        }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    /// The raw source text at this span
    pub fn text(&self) -> &str {
        &self.source[self.start..self.end]
    }

    pub fn is_detached(&self) -> bool {
        self.source.is_empty()
    }

    /// Smallest span covering both `self` and `other`.
    ///
    /// Spans over different sources cannot be combined; `self` wins.
    pub fn merge(&self, other: &SourceSpan) -> SourceSpan {
        if self.is_detached() {
            return other.clone();
        }
        if !Arc::ptr_eq(&self.source, &other.source) {
            return self.clone();
        }
        SourceSpan {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            source: self.source.clone(),
        }
    }
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    while index > 0 && !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

impl Default for SourceSpan {
    fn default() -> Self {
        Self::detached()
    }
}

impl PartialEq for SourceSpan {
    fn eq(&self, other: &Self) -> bool {
        self.start == other.start && self.end == other.end && self.text() == other.text()
    }
}

impl Eq for SourceSpan {}

impl fmt::Debug for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{} {:?}", self.start, self.end, self.text())
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}
