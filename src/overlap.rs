use crate::cluster::Consensus;

/// Outcome of aligning a LEFT consensus against a RIGHT consensus: the
/// ungapped, offset-shifted alignment that may flank a deletion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Overlap {
    pub length: i64,
    pub num_mismatches: i64,
    pub offset: i64,
}

impl Overlap {
    pub fn score(&self) -> f64 {
        self.num_mismatches as f64 / self.length as f64
    }

    /// implied deletion length given the clip positions of the RIGHT-side
    /// consensus (upstream of the gap) and the LEFT-side consensus
    /// (downstream of the gap), per the sign convention in spec.md §4.E.
    pub fn deletion_length(&self, right_side_clip_position: i64, left_side_clip_position: i64) -> i64 {
        left_side_clip_position + self.offset - right_side_clip_position
    }
}

/// Ungapped, offset-scan alignment between a LEFT [`Consensus`] and a
/// RIGHT [`Consensus`].
pub struct OverlapEngine {
    pub min_overlap_length: i64,
    pub mismatch_rate: f64,
}

impl OverlapEngine {
    pub fn new(min_overlap_length: i64, mismatch_rate: f64) -> Self {
        Self {
            min_overlap_length,
            mismatch_rate,
        }
    }

    /// Search `offset in [min_offset, max_offset]` for the overlap with
    /// the lowest mismatch score; ties broken by longest overlap, then by
    /// smallest `|offset|`, per spec.md §4.E's selection rule.
    pub fn overlap(
        &self,
        left: &Consensus,
        right: &Consensus,
        min_offset: i64,
        max_offset: i64,
    ) -> Option<Overlap> {
        let mut best: Option<Overlap> = None;
        for offset in min_offset..=max_offset {
            if let Some(candidate) = self.overlap_at_offset(left, right, offset) {
                best = Some(match best {
                    None => candidate,
                    Some(current) => pick_better(current, candidate),
                });
            }
        }
        best
    }

    /// Compute the overlapping windows on `left`/`right` after shifting
    /// `right`'s coordinate frame by `offset`, then compare base-by-base
    /// with an `N`-wildcard and an early-abort mismatch cap.
    fn overlap_at_offset(&self, left: &Consensus, right: &Consensus, offset: i64) -> Option<Overlap> {
        // left's local clip index is left.local_clip_position; right's
        // shifted local clip index is right.local_clip_position + offset.
        // The two consensuses are placed on a shared coordinate axis
        // anchored at each one's own clip position; the overlap window is
        // the intersection of their read spans on that axis.
        let left_axis_start = -left.local_clip_position;
        let left_axis_end = left.len() - left.local_clip_position;
        let right_axis_start = -right.local_clip_position + offset;
        let right_axis_end = right.len() - right.local_clip_position + offset;

        let window_start = left_axis_start.max(right_axis_start);
        let window_end = left_axis_end.min(right_axis_end);
        let overlap_len = window_end - window_start;
        if overlap_len < self.min_overlap_length {
            return None;
        }

        let max_mismatches = (self.mismatch_rate * overlap_len as f64).ceil() as i64;
        let mut mismatches = 0i64;
        for axis in window_start..window_end {
            let left_idx = (axis + left.local_clip_position) as usize;
            let right_idx = (axis + right.local_clip_position - offset) as usize;
            let lb = left.sequence[left_idx];
            let rb = right.sequence[right_idx];
            if !bases_match(lb, rb) {
                mismatches += 1;
                if mismatches > max_mismatches {
                    return None;
                }
            }
        }

        Some(Overlap {
            length: overlap_len,
            num_mismatches: mismatches,
            offset,
        })
    }
}

fn bases_match(a: u8, b: u8) -> bool {
    let ua = a.to_ascii_uppercase();
    let ub = b.to_ascii_uppercase();
    ua == b'N' || ub == b'N' || ua == ub
}

fn pick_better(current: Overlap, candidate: Overlap) -> Overlap {
    if candidate.score() < current.score() {
        return candidate;
    }
    if candidate.score() > current.score() {
        return current;
    }
    if candidate.length > current.length {
        return candidate;
    }
    if candidate.length < current.length {
        return current;
    }
    if candidate.offset.abs() < current.offset.abs() {
        return candidate;
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    fn consensus(clip_position: i64, local_clip_position: i64, seq: &str) -> Consensus {
        Consensus {
            reference_id: 0,
            clip_position,
            local_clip_position,
            sequence: seq.as_bytes().to_vec(),
            support: 2,
        }
    }

    #[test]
    fn test_exact_overlap_no_mismatches() {
        // left: clip at local pos 4 ("AAAA|CCCC"), right: clip at local pos 0 ("CCCC...")
        let left = consensus(1000, 4, "AAAACCCC");
        let right = consensus(1200, 0, "CCCCGGGG");
        let engine = OverlapEngine::new(4, 0.0);
        let overlap = engine.overlap(&left, &right, 0, 0).unwrap();
        assert_eq!(overlap.num_mismatches, 0);
        assert_eq!(overlap.length, 4);
    }

    #[test]
    fn test_n_wildcard_counts_as_match() {
        let left = consensus(1000, 0, "ACGNNNT");
        let right = consensus(1200, 0, "ACGACGT");
        let engine = OverlapEngine::new(7, 0.0);
        let overlap = engine.overlap(&left, &right, 0, 0).unwrap();
        assert_eq!(overlap.num_mismatches, 0);
        assert_eq!(overlap.length, 7);
    }

    #[test]
    fn test_mismatch_cap_boundary() {
        // 10-base overlap, mismatch_rate 0.2 -> cap = ceil(2.0) = 2
        let left = consensus(1000, 0, "AAAAAAAAAA");
        let right_two_mismatches = consensus(1200, 0, "AAAAAAAATT");
        let engine = OverlapEngine::new(10, 0.2);
        let overlap = engine.overlap(&left, &right_two_mismatches, 0, 0).unwrap();
        assert_eq!(overlap.num_mismatches, 2);

        let right_three_mismatches = consensus(1200, 0, "AAAAAAATTT");
        assert!(engine.overlap(&left, &right_three_mismatches, 0, 0).is_none());
    }

    #[test]
    fn test_below_min_overlap_length_never_succeeds() {
        let left = consensus(1000, 2, "AA");
        let right = consensus(1200, 0, "AA");
        let engine = OverlapEngine::new(10, 0.5);
        assert!(engine.overlap(&left, &right, 0, 0).is_none());
    }

    #[test]
    fn test_selection_prefers_lowest_score_then_length_then_offset() {
        let left = consensus(1000, 4, "AAAACCCCGGGG");
        let right = consensus(1200, 0, "CCCCGGGGTTTT");
        let engine = OverlapEngine::new(4, 0.5);
        let overlap = engine.overlap(&left, &right, -2, 2).unwrap();
        assert_eq!(overlap.num_mismatches, 0);
    }
}
