// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Source location tracking.

/// A byte range in the method's source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// True if `other` lies entirely within `self`.
    pub fn contains(&self, other: Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Smallest span covering both.
    pub fn to(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }
}

/// Offsets of line starts, for offset → line:col conversion.
#[derive(Debug, Clone)]
pub struct LineMap {
    starts: Vec<usize>,
    len: usize,
}

impl LineMap {
    pub fn new(source: &str) -> Self {
        let starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        LineMap { starts, len: source.len() }
    }

    /// 1-based (line, column) of a byte offset. Offsets past the end clamp to
    /// the last position.
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.len);
        let idx = self.starts.partition_point(|&s| s <= offset) - 1;
        (idx + 1, offset - self.starts[idx] + 1)
    }

    /// Text of a 1-based line, without its newline.
    pub fn line<'a>(&self, source: &'a str, line: usize) -> Option<&'a str> {
        let start = *self.starts.get(line.checked_sub(1)?)?;
        let end = self
            .starts
            .get(line)
            .map(|&next| next - 1)
            .unwrap_or(source.len());
        source.get(start..end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containment() {
        let outer = Span::new(10, 40);
        assert!(outer.contains(Span::new(10, 40)));
        assert!(outer.contains(Span::new(12, 20)));
        assert!(!outer.contains(Span::new(5, 20)));
        assert!(!outer.contains(Span::new(30, 41)));
        assert_eq!(Span::new(3, 5).to(Span::new(8, 9)), Span::new(3, 9));
    }

    #[test]
    fn line_lookup() {
        let src = "ref int x;\nawait t;\nx++;";
        let map = LineMap::new(src);
        assert_eq!(map.line_col(0), (1, 1));
        assert_eq!(map.line_col(11), (2, 1));
        assert_eq!(map.line_col(17), (2, 7));
        assert_eq!(map.line(src, 2), Some("await t;"));
        assert_eq!(map.line(src, 3), Some("x++;"));
        assert_eq!(map.line(src, 4), None);
        assert_eq!(map.line(src, 0), None);
    }

    #[test]
    fn newline_belongs_to_its_line() {
        let src = "ab\ncd\n";
        let map = LineMap::new(src);
        assert_eq!(map.line_col(2), (1, 3));
        assert_eq!(map.line_col(3), (2, 1));
        assert_eq!(map.line(src, 3), Some(""));
        assert_eq!(map.line_col(100), (3, 1));
    }
}
