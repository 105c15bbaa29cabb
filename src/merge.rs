use crate::caller::Deletion;

/// Length-similarity threshold (§4.G point 2) below which two merged
/// deletions are folded via breakpoint intersection rather than by
/// picking the higher-support call outright.
pub const LENGTH_SIMILARITY_THRESHOLD: f64 = 0.10;

/// Deduplicates/merges raw per-region [`Deletion`]s into a canonical,
/// non-overlapping set, per spec.md §4.G.
pub struct CallMerger;

impl CallMerger {
    /// Sort by `(reference_name, left_bp, right_bp)` then walk left to
    /// right, folding any adjacent pair that dovetails or nests. Merging
    /// an already-merged set is a no-op (§7 Properties point 2).
    pub fn merge(mut calls: Vec<Deletion>) -> Vec<Deletion> {
        calls.sort_by(|a, b| {
            a.reference_name
                .cmp(&b.reference_name)
                .then(a.left_bp.cmp(&b.left_bp))
                .then(a.right_bp.cmp(&b.right_bp))
        });

        let mut merged: Vec<Deletion> = Vec::with_capacity(calls.len());
        for call in calls {
            match merged.last_mut() {
                Some(last) if overlaps(last, &call) => {
                    *last = fold(last, &call);
                }
                _ => merged.push(call),
            }
        }
        merged
    }
}

/// Two deletions on the same reference overlap (dovetail or nest) when
/// their `[left_bp, right_bp]` spans intersect.
fn overlaps(a: &Deletion, b: &Deletion) -> bool {
    a.reference_name == b.reference_name && a.left_bp <= b.right_bp && b.left_bp <= a.right_bp
}

/// Fold `b` into `a`. If the two lengths are within
/// [`LENGTH_SIMILARITY_THRESHOLD`] of one another, keep the intersection
/// of their breakpoints; otherwise keep the higher-support call (more
/// constituent raw calls, ties broken by greater length).
fn fold(a: &Deletion, b: &Deletion) -> Deletion {
    let longer = a.length.max(b.length) as f64;
    let similar = longer > 0.0 && (a.length - b.length).abs() as f64 / longer <= LENGTH_SIMILARITY_THRESHOLD;

    let mut merged = if similar {
        let left_bp = a.left_bp.max(b.left_bp);
        let right_bp = a.right_bp.min(b.right_bp);
        Deletion::new(a.reference_name.clone(), left_bp, right_bp)
    } else if b.merged_from > a.merged_from || (b.merged_from == a.merged_from && b.length > a.length) {
        b.clone()
    } else {
        a.clone()
    };
    merged.merged_from = a.merged_from + b.merged_from;
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(reference_name: &str, left_bp: i64, right_bp: i64) -> Deletion {
        Deletion::new(reference_name.to_string(), left_bp, right_bp)
    }

    #[test]
    fn test_merge_is_noop_on_disjoint_calls() {
        let calls = vec![call("chr1", 100, 300), call("chr1", 1000, 1200)];
        let merged = CallMerger::merge(calls.clone());
        assert_eq!(merged, calls);
    }

    #[test]
    fn test_dovetailing_similar_length_calls_merge_by_intersection() {
        // 300bp and 320bp deletions overlapping by most of their span
        let a = call("chr1", 1_000, 1_301); // length 300
        let b = call("chr1", 1_010, 1_331); // length 320
        let merged = CallMerger::merge(vec![a, b]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].left_bp, 1_010);
        assert_eq!(merged[0].right_bp, 1_301);
        assert_eq!(merged[0].merged_from, 2);
    }

    #[test]
    fn test_contained_dissimilar_length_keeps_higher_support() {
        let mut small = call("chr1", 1_000, 1_051); // length 50
        small.merged_from = 1;
        let mut big = call("chr1", 990, 1_991); // length 1000, contains `small`
        big.merged_from = 5;
        let merged = CallMerger::merge(vec![small, big]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].length, 1000);
        assert_eq!(merged[0].merged_from, 6);
    }

    #[test]
    fn test_different_references_never_merge() {
        let calls = vec![call("chr1", 100, 300), call("chr2", 100, 300)];
        let merged = CallMerger::merge(calls.clone());
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_merging_already_merged_set_is_idempotent() {
        let calls = vec![call("chr1", 100, 300), call("chr1", 1000, 1200)];
        let once = CallMerger::merge(calls);
        let twice = CallMerger::merge(once.clone());
        assert_eq!(once, twice);
    }
}
