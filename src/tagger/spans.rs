//! Accepted-span bookkeeping for the tagger.
//!
//! Spans are half-open byte intervals in the *current* (already rewritten)
//! paragraph text. The set is kept sorted and non-overlapping, so both the
//! overlap test and the insertion point are binary searches.

/// A half-open `[start, end)` byte interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Sorted, pairwise-disjoint spans.
#[derive(Debug, Clone, Default)]
pub struct SpanSet {
    spans: Vec<Span>,
}

impl SpanSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `[start, end)` intersects any accepted span.
    pub fn overlaps(&self, start: usize, end: usize) -> bool {
        // Disjoint and sorted by start, so ends are sorted too.
        let idx = self.spans.partition_point(|s| s.end <= start);
        self.spans.get(idx).is_some_and(|s| s.start < end)
    }

    /// Accept the match `[start, end)` after `inserted` bytes were written at
    /// `end`. The stored span covers the match plus the insertion, and every
    /// later span moves right by `inserted`.
    ///
    /// The caller must have checked [`SpanSet::overlaps`] first.
    pub fn accept(&mut self, start: usize, end: usize, inserted: usize) {
        debug_assert!(!self.overlaps(start, end));
        let idx = self.spans.partition_point(|s| s.start < start);
        for span in &mut self.spans[idx..] {
            span.start += inserted;
            span.end += inserted;
        }
        self.spans.insert(idx, Span::new(start, end + inserted));
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Span> {
        self.spans.iter()
    }

    pub fn into_vec(self) -> Vec<Span> {
        self.spans
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_open_overlap() {
        let a = Span::new(0, 5);
        assert!(a.overlaps(&Span::new(4, 6)));
        assert!(!a.overlaps(&Span::new(5, 6)));
        assert!(Span::new(2, 3).overlaps(&a));
    }

    #[test]
    fn overlap_queries() {
        let mut set = SpanSet::new();
        set.accept(10, 15, 0);
        set.accept(30, 40, 0);
        assert!(!set.overlaps(0, 10));
        assert!(set.overlaps(9, 11));
        assert!(set.overlaps(14, 20));
        assert!(!set.overlaps(15, 30));
        assert!(set.overlaps(0, 100));
        assert!(!set.overlaps(40, 41));
    }

    #[test]
    fn accept_shifts_later_spans() {
        let mut set = SpanSet::new();
        // "Ganser Harbor" tagged first, then "Mattie" earlier in the text.
        set.accept(22, 35, 12);
        set.accept(0, 6, 16);
        let spans: Vec<Span> = set.iter().copied().collect();
        assert_eq!(spans, vec![Span::new(0, 22), Span::new(38, 63)]);
    }

    #[test]
    fn accept_keeps_order() {
        let mut set = SpanSet::new();
        set.accept(50, 55, 3);
        set.accept(10, 12, 3);
        set.accept(30, 31, 3);
        let starts: Vec<usize> = set.iter().map(|s| s.start).collect();
        assert_eq!(starts, vec![10, 30, 56]);
        assert_eq!(set.len(), 3);
    }
}
