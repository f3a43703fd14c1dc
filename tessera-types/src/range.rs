use std::{cmp::Ordering, fmt};

use serde::{Deserialize, Serialize};

/// A scan key. Keys are arbitrary byte strings ordered lexicographically.
pub type Key = Vec<u8>;

/// A requested scan interval over the sorted key space.
///
/// Either bound may be absent, meaning the range extends to the edge of the
/// key space on that side.
#[derive(Debug, Clone, Default, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: Option<Key>,
    pub start_inclusive: bool,
    pub end: Option<Key>,
    pub end_inclusive: bool,
}

/// Orders two start bounds. An absent start is the smallest possible bound,
/// and an inclusive bound starts before an exclusive one on the same key.
pub(crate) fn cmp_start_bounds(
    a: (Option<&[u8]>, bool),
    b: (Option<&[u8]>, bool),
) -> Ordering {
    match (a.0, b.0) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => x.cmp(y).then_with(|| match (a.1, b.1) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => Ordering::Equal,
        }),
    }
}

/// Orders two end bounds. An absent end is the largest possible bound, and an
/// exclusive bound ends before an inclusive one on the same key.
pub(crate) fn cmp_end_bounds(a: (Option<&[u8]>, bool), b: (Option<&[u8]>, bool)) -> Ordering {
    match (a.0, b.0) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => x.cmp(y).then_with(|| match (a.1, b.1) {
            (false, true) => Ordering::Less,
            (true, false) => Ordering::Greater,
            _ => Ordering::Equal,
        }),
    }
}

impl Range {
    pub fn full() -> Self {
        Self {
            start: None,
            start_inclusive: false,
            end: None,
            end_inclusive: false,
        }
    }

    pub fn new(
        start: Option<Key>,
        start_inclusive: bool,
        end: Option<Key>,
        end_inclusive: bool,
    ) -> Self {
        Self {
            start,
            start_inclusive,
            end,
            end_inclusive,
        }
    }

    pub fn inclusive(start: impl Into<Key>, end: impl Into<Key>) -> Self {
        Self::new(Some(start.into()), true, Some(end.into()), true)
    }

    /// `(start, end]`, the shape of a tablet's data range.
    pub fn after_until(start: Option<Key>, end: Option<Key>) -> Self {
        Self::new(start, false, end, true)
    }

    fn start_bound(&self) -> (Option<&[u8]>, bool) {
        (self.start.as_deref(), self.start_inclusive)
    }

    fn end_bound(&self) -> (Option<&[u8]>, bool) {
        (self.end.as_deref(), self.end_inclusive)
    }

    /// A range is empty when its bounds cross, or meet without both being
    /// inclusive.
    pub fn is_empty(&self) -> bool {
        let (Some(start), Some(end)) = (&self.start, &self.end) else {
            return false;
        };
        match start.cmp(end) {
            Ordering::Greater => true,
            Ordering::Equal => !(self.start_inclusive && self.end_inclusive),
            Ordering::Less => false,
        }
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        if let Some(start) = &self.start {
            match key.cmp(&start[..]) {
                Ordering::Less => return false,
                Ordering::Equal if !self.start_inclusive => return false,
                _ => {}
            }
        }
        if let Some(end) = &self.end {
            match key.cmp(&end[..]) {
                Ordering::Greater => return false,
                Ordering::Equal if !self.end_inclusive => return false,
                _ => {}
            }
        }
        true
    }

    /// Whether two ranges cover at least one common key, or meet with no gap
    /// between them (`self` must sort at or before `other`).
    pub fn overlaps_or_touches(&self, other: &Range) -> bool {
        let (Some(end), Some(start)) = (&self.end, &other.start) else {
            return true;
        };
        match end.cmp(start) {
            Ordering::Greater => true,
            Ordering::Equal => self.end_inclusive || other.start_inclusive,
            Ordering::Less => false,
        }
    }

    /// Merges `other` into `self`, keeping the later end bound. Only valid
    /// when the two ranges overlap or touch.
    pub fn extend_to(&mut self, other: &Range) {
        if cmp_end_bounds(self.end_bound(), other.end_bound()) == Ordering::Less {
            self.end = other.end.clone();
            self.end_inclusive = other.end_inclusive;
        }
    }

    /// The intersection of two ranges, or `None` when they are disjoint.
    pub fn clip(&self, other: &Range) -> Option<Range> {
        let (start, start_inclusive) =
            if cmp_start_bounds(self.start_bound(), other.start_bound()) == Ordering::Less {
                (other.start.clone(), other.start_inclusive)
            } else {
                (self.start.clone(), self.start_inclusive)
            };
        let (end, end_inclusive) =
            if cmp_end_bounds(self.end_bound(), other.end_bound()) == Ordering::Greater {
                (other.end.clone(), other.end_inclusive)
            } else {
                (self.end.clone(), self.end_inclusive)
            };
        let clipped = Range {
            start,
            start_inclusive,
            end,
            end_inclusive,
        };
        (!clipped.is_empty()).then_some(clipped)
    }
}

impl Ord for Range {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_start_bounds(self.start_bound(), other.start_bound())
            .then_with(|| cmp_end_bounds(self.end_bound(), other.end_bound()))
    }
}

impl PartialOrd for Range {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn fmt_key(f: &mut fmt::Formatter<'_>, key: &[u8]) -> fmt::Result {
    write!(f, "{}", String::from_utf8_lossy(key))
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.start {
            Some(start) => {
                write!(f, "{}", if self.start_inclusive { '[' } else { '(' })?;
                fmt_key(f, start)?;
            }
            None => write!(f, "(-inf")?,
        }
        write!(f, ",")?;
        match &self.end {
            Some(end) => {
                fmt_key(f, end)?;
                write!(f, "{}", if self.end_inclusive { ']' } else { ')' })
            }
            None => write!(f, "+inf)"),
        }
    }
}
