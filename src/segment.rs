//! The shown/unshown partition of a list's item indices.
//!
//! A [`SegmentList`] is a doubly linked list of [`Segment`]s stored in an
//! arena and addressed by [`SegmentId`]. Segments are never freed: a fetch
//! either converts a segment in place or splits it, so ids handed out stay
//! valid for the life of the list.

use crate::container::NodeId;
use crate::error::Error;

/// Index of a segment in its list's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SegmentId(usize);

/// A contiguous run of items that are all rendered or all unrendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Whether the items are rendered in the container.
    pub shown: bool,
    /// First item index, inclusive.
    pub first: usize,
    /// Last item index, inclusive.
    pub last: usize,
    /// The filler for an unshown segment, or the last rendered item of a
    /// shown one.
    pub anchor: Option<NodeId>,
    prev: Option<SegmentId>,
    next: Option<SegmentId>,
}

impl Segment {
    /// Creates a detached segment.
    pub fn new(shown: bool, first: usize, last: usize, anchor: Option<NodeId>) -> Self {
        Self {
            shown,
            first,
            last,
            anchor,
            prev: None,
            next: None,
        }
    }

    /// Number of items covered.
    pub fn len(&self) -> usize {
        self.last + 1 - self.first
    }

    /// Whether `index` falls inside the segment.
    pub fn contains(&self, index: usize) -> bool {
        index >= self.first && index <= self.last
    }

    /// Whether the segment intersects `[first, last]`.
    pub fn overlaps(&self, first: usize, last: usize) -> bool {
        self.contains(first) || self.contains(last) || (first <= self.first && last >= self.last)
    }

    /// The previous segment.
    pub fn prev(&self) -> Option<SegmentId> {
        self.prev
    }

    /// The next segment.
    pub fn next(&self) -> Option<SegmentId> {
        self.next
    }
}

/// Arena-backed linked list of segments in index order.
#[derive(Debug, Clone, Default)]
pub struct SegmentList {
    slots: Vec<Segment>,
    head: Option<SegmentId>,
    tail: Option<SegmentId>,
}

impl SegmentList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// The first segment.
    pub fn head(&self) -> Option<SegmentId> {
        self.head
    }

    /// Number of segments in the chain.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Whether the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Looks up a segment.
    pub fn get(&self, id: SegmentId) -> Option<&Segment> {
        self.slots.get(id.0)
    }

    /// Looks up a segment mutably.
    pub fn get_mut(&mut self, id: SegmentId) -> Option<&mut Segment> {
        self.slots.get_mut(id.0)
    }

    fn alloc(&mut self, segment: Segment) -> SegmentId {
        self.slots.push(segment);
        SegmentId(self.slots.len() - 1)
    }

    /// Appends a segment at the end of the chain.
    pub fn push_back(&mut self, segment: Segment) -> SegmentId {
        match self.tail {
            Some(tail) => self.insert_after(tail, segment),
            None => {
                let id = self.alloc(segment);
                self.head = Some(id);
                self.tail = Some(id);
                id
            }
        }
    }

    /// Links a new segment directly before `at`.
    pub fn insert_before(&mut self, at: SegmentId, mut segment: Segment) -> SegmentId {
        let prev = self.slots[at.0].prev;
        segment.prev = prev;
        segment.next = Some(at);
        let id = self.alloc(segment);
        self.slots[at.0].prev = Some(id);
        match prev {
            Some(prev) => self.slots[prev.0].next = Some(id),
            None => self.head = Some(id),
        }
        id
    }

    /// Links a new segment directly after `at`.
    pub fn insert_after(&mut self, at: SegmentId, mut segment: Segment) -> SegmentId {
        let next = self.slots[at.0].next;
        segment.prev = Some(at);
        segment.next = next;
        let id = self.alloc(segment);
        self.slots[at.0].next = Some(id);
        match next {
            Some(next) => self.slots[next.0].prev = Some(id),
            None => self.tail = Some(id),
        }
        id
    }

    /// Walks the chain from the head.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            list: self,
            cursor: self.head,
        }
    }

    /// The first unshown segment intersecting `[first, last]`.
    pub fn find_unshown_overlap(&self, first: usize, last: usize) -> Option<SegmentId> {
        self.iter()
            .find(|(_, segment)| !segment.shown && segment.overlaps(first, last))
            .map(|(id, _)| id)
    }

    /// Verifies that the chain covers `[0, total)` without gaps or overlaps
    /// and that the back links mirror the forward links.
    pub fn check_partition(&self, total: usize) -> Result<(), Error> {
        let mut expected = 0;
        let mut prev = None;
        let mut cursor = self.head;
        let mut steps = 0;
        while let Some(id) = cursor {
            let segment = self.get(id).ok_or(Error::Partition {
                index: expected,
                reason: "dangling segment link",
            })?;
            if segment.prev != prev {
                return Err(Error::Partition {
                    index: segment.first,
                    reason: "back link does not match chain order",
                });
            }
            if segment.first != expected {
                return Err(Error::Partition {
                    index: expected,
                    reason: if segment.first > expected {
                        "gap between segments"
                    } else {
                        "overlapping segments"
                    },
                });
            }
            if segment.last < segment.first {
                return Err(Error::Partition {
                    index: segment.first,
                    reason: "segment ends before it starts",
                });
            }
            steps += 1;
            if steps > self.slots.len() {
                return Err(Error::Partition {
                    index: segment.first,
                    reason: "cycle in segment chain",
                });
            }
            expected = segment.last + 1;
            prev = Some(id);
            cursor = segment.next;
        }
        if prev != self.tail {
            return Err(Error::Partition {
                index: expected,
                reason: "tail does not match chain end",
            });
        }
        if expected != total {
            return Err(Error::Partition {
                index: expected,
                reason: "segments do not reach the end of the list",
            });
        }
        Ok(())
    }
}

/// Iterator over `(id, segment)` pairs in index order.
#[derive(Debug)]
pub struct Iter<'a> {
    list: &'a SegmentList,
    cursor: Option<SegmentId>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (SegmentId, &'a Segment);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        let segment = self.list.get(id)?;
        self.cursor = segment.next;
        Some((id, segment))
    }
}

/// Clamps `[first, last]` to `[lo, hi]` and widens it so that
/// `last - first >= min_span`, staying inside `[lo, hi]`.
///
/// The end is pushed out first; the start only moves back when the segment
/// ends too early.
///
/// # Examples
///
/// ```rust
/// use bubbletea_dllist::segment::widen;
///
/// assert_eq!(widen(40, 45, 0, 99, 16), (40, 56));
/// assert_eq!(widen(95, 99, 0, 99, 16), (83, 99));
/// assert_eq!(widen(3, 4, 2, 10, 16), (2, 10));
/// ```
pub fn widen(first: usize, last: usize, lo: usize, hi: usize, min_span: usize) -> (usize, usize) {
    let mut first = first.max(lo);
    let mut last = last.min(hi).max(first);
    if last - first < min_span {
        last = (first + min_span).min(hi);
    }
    if last - first < min_span {
        first = last.saturating_sub(min_span).max(lo);
    }
    (first, last)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranges(list: &SegmentList) -> Vec<(bool, usize, usize)> {
        list.iter().map(|(_, s)| (s.shown, s.first, s.last)).collect()
    }

    #[test]
    fn test_push_and_insert_keep_links() {
        let mut list = SegmentList::new();
        let middle = list.push_back(Segment::new(false, 10, 19, None));
        list.insert_before(middle, Segment::new(true, 0, 9, None));
        list.insert_after(middle, Segment::new(false, 20, 29, None));

        assert_eq!(ranges(&list), vec![(true, 0, 9), (false, 10, 19), (false, 20, 29)]);
        assert!(list.check_partition(30).is_ok());
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_check_partition_reports_gap() {
        let mut list = SegmentList::new();
        list.push_back(Segment::new(true, 0, 4, None));
        list.push_back(Segment::new(false, 6, 9, None));
        let err = list.check_partition(10).unwrap_err();
        assert!(matches!(err, Error::Partition { index: 5, .. }));
    }

    #[test]
    fn test_check_partition_reports_short_chain() {
        let mut list = SegmentList::new();
        list.push_back(Segment::new(true, 0, 4, None));
        assert!(list.check_partition(5).is_ok());
        assert!(list.check_partition(8).is_err());
        assert!(SegmentList::new().check_partition(0).is_ok());
    }

    #[test]
    fn test_find_unshown_overlap_skips_shown() {
        let mut list = SegmentList::new();
        list.push_back(Segment::new(true, 0, 9, None));
        let unshown = list.push_back(Segment::new(false, 10, 49, None));

        assert_eq!(list.find_unshown_overlap(2, 8), None);
        assert_eq!(list.find_unshown_overlap(5, 12), Some(unshown));
        assert_eq!(list.find_unshown_overlap(45, 60), Some(unshown));
    }

    #[test]
    fn test_overlap_when_range_contains_segment() {
        let segment = Segment::new(false, 10, 12, None);
        assert!(segment.overlaps(5, 20));
        assert!(!segment.overlaps(13, 20));
        assert!(!segment.overlaps(0, 9));
    }

    #[test]
    fn test_widen_small_segment_stays_inside() {
        assert_eq!(widen(0, 3, 0, 5, 16), (0, 5));
        assert_eq!(widen(10, 10, 10, 10, 16), (10, 10));
    }

    #[test]
    fn test_widen_leaves_large_ranges_alone() {
        assert_eq!(widen(10, 40, 0, 99, 16), (10, 40));
        assert_eq!(widen(0, 120, 5, 99, 16), (5, 99));
    }
}
