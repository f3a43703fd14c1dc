use tessera_types::range::Range;

/// Normalizes the caller's requested ranges for one table.
///
/// No ranges means scan everything. With auto-adjustment the ranges are merged
/// into a minimal sorted covering set; without it they pass through untouched,
/// duplicates and overlaps included.
pub fn normalize_ranges(ranges: &[Range], auto_adjust: bool) -> Vec<Range> {
    if ranges.is_empty() {
        return vec![Range::full()];
    }
    if !auto_adjust {
        return ranges.to_vec();
    }
    merge_overlapping(ranges)
}

/// Merges overlapping and adjacent ranges. The output covers exactly the same
/// keys as the input, is sorted by start bound, and contains no two ranges
/// that overlap or touch.
pub fn merge_overlapping(ranges: &[Range]) -> Vec<Range> {
    let mut sorted = ranges.to_vec();
    sorted.sort();

    let mut merged: Vec<Range> = Vec::with_capacity(sorted.len());
    for range in sorted {
        match merged.last_mut() {
            Some(last) if last.overlaps_or_touches(&range) => last.extend_to(&range),
            _ => merged.push(range),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: &[u8], end: &[u8]) -> Range {
        Range::inclusive(start.to_vec(), end.to_vec())
    }

    #[test]
    fn empty_input_becomes_the_full_table() {
        assert_eq!(normalize_ranges(&[], true), vec![Range::full()]);
        assert_eq!(normalize_ranges(&[], false), vec![Range::full()]);
    }

    #[test]
    fn no_auto_adjust_passes_ranges_through() {
        let ranges = vec![range(b"m", b"z"), range(b"a", b"n")];
        assert_eq!(normalize_ranges(&ranges, false), ranges);
    }

    #[test]
    fn overlapping_ranges_merge() {
        let merged = normalize_ranges(&[range(b"m", b"z"), range(b"a", b"n")], true);
        assert_eq!(merged, vec![range(b"a", b"z")]);
    }

    #[test]
    fn adjacent_ranges_merge() {
        let left = Range::new(Some(b"a".to_vec()), true, Some(b"m".to_vec()), false);
        let right = Range::new(Some(b"m".to_vec()), true, Some(b"z".to_vec()), true);
        let merged = merge_overlapping(&[right.clone(), left.clone()]);
        assert_eq!(merged, vec![range(b"a", b"z")]);
    }

    #[test]
    fn disjoint_ranges_stay_apart_and_sorted() {
        let merged = normalize_ranges(&[range(b"x", b"z"), range(b"a", b"c")], true);
        assert_eq!(merged, vec![range(b"a", b"c"), range(b"x", b"z")]);
    }

    #[test]
    fn contained_range_disappears() {
        let merged = merge_overlapping(&[range(b"a", b"z"), range(b"d", b"f")]);
        assert_eq!(merged, vec![range(b"a", b"z")]);
    }

    #[test]
    fn unbounded_range_swallows_everything() {
        let merged = merge_overlapping(&[range(b"d", b"f"), Range::full()]);
        assert_eq!(merged, vec![Range::full()]);
    }

    #[test]
    fn merge_is_idempotent() {
        let once = merge_overlapping(&[
            range(b"a", b"e"),
            range(b"c", b"j"),
            range(b"p", b"q"),
        ]);
        let twice = merge_overlapping(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn merged_set_covers_the_same_keys() {
        let inputs = [range(b"a", b"e"), range(b"d", b"j"), range(b"x", b"z")];
        let merged = merge_overlapping(&inputs);

        for key in [&b"a"[..], b"c", b"e", b"f", b"j", b"y"] {
            let in_input = inputs.iter().any(|r| r.contains(key));
            let in_merged = merged.iter().any(|r| r.contains(key));
            assert_eq!(in_input, in_merged, "key {:?}", key);
        }
        assert!(!merged.iter().any(|r| r.contains(b"k")));
    }
}
