use crate::cluster::Consensus;
use crate::discordant::TargetRegion;
use crate::overlap::OverlapEngine;

/// A deletion call: 1-based inclusive breakpoints on a reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Deletion {
    pub reference_name: String,
    pub left_bp: i64,
    pub right_bp: i64,
    pub length: i64,
    /// number of raw per-region calls folded into this one by the merger;
    /// 1 for a call that was never merged.
    pub merged_from: usize,
}

impl Deletion {
    /// `left_bp`/`right_bp` are the last aligned base before, and first
    /// aligned base after, the deleted stretch (VCF-like convention,
    /// applied uniformly per spec.md §9).
    pub fn new(reference_name: String, left_bp: i64, right_bp: i64) -> Self {
        Self {
            reference_name,
            left_bp,
            right_bp,
            length: right_bp - left_bp - 1,
            merged_from: 1,
        }
    }
}

/// Minimum deletion length accepted by the caller, per spec.md §4.F.
pub const LENGTH_THRESHOLD: i64 = 50;

/// For each [`TargetRegion`], searches the RIGHT- and LEFT-consensus
/// streams for an overlapping pair that flanks a deletion.
pub struct DeletionCaller<'a> {
    pub engine: OverlapEngine,
    pub reference_name: &'a str,
}

/// One successful overlap candidate, kept alongside the ordering key used
/// to select the best one once all candidates for a region are in hand.
struct Candidate {
    score: f64,
    length: i64,
    abs_offset: i64,
    deletion: Deletion,
}

impl DeletionCaller<'_> {
    pub fn new(engine: OverlapEngine, reference_name: &str) -> DeletionCaller<'_> {
        DeletionCaller {
            engine,
            reference_name,
        }
    }

    /// `right_consensuses`/`left_consensuses` must already be sorted by
    /// `clip_position`, per §4.D's output contract. At most one
    /// [`Deletion`] is returned per region (§4.F point 4).
    pub fn call(
        &self,
        region: &TargetRegion,
        right_consensuses: &[Consensus],
        left_consensuses: &[Consensus],
    ) -> Option<Deletion> {
        let rights = range_within(right_consensuses, region.start, region.end);
        let lefts = range_within(left_consensuses, region.start, region.end);

        let mut best: Option<Candidate> = None;

        for r in &rights {
            for l in &lefts {
                // the offset window for which this (r, l) pair can imply a
                // deletion length inside [minDeletionLength, maxDeletionLength]
                let base = l.clip_position - r.clip_position;
                let min_offset = region.min_deletion_length - base;
                let max_offset = region.max_deletion_length - base;
                if min_offset > max_offset {
                    continue;
                }

                let Some(overlap) = self.engine.overlap(r, l, min_offset, max_offset) else {
                    continue;
                };
                if overlap.score() >= self.engine.mismatch_rate {
                    continue;
                }

                let del_len = overlap.deletion_length(r.clip_position, l.clip_position);
                let floor = LENGTH_THRESHOLD.max(region.min_deletion_length);
                if del_len < floor || del_len > region.max_deletion_length {
                    continue;
                }

                // r sits just upstream of the gap, l just downstream: the
                // genomic left breakpoint comes from r, the right one from l.
                let genomic_left_bp = r.clip_position - 1;
                let genomic_right_bp = l.clip_position + overlap.offset;
                let candidate = Candidate {
                    score: overlap.score(),
                    length: overlap.length,
                    abs_offset: overlap.offset.abs(),
                    deletion: Deletion::new(self.reference_name.to_string(), genomic_left_bp, genomic_right_bp),
                };

                best = Some(match best {
                    None => candidate,
                    Some(current) => pick_better(current, candidate),
                });
            }
        }

        best.map(|c| c.deletion)
    }
}

/// §4.E's selection rule, lifted to whole candidates: minimum score,
/// ties broken by greater length, further ties by smallest `|offset|`.
fn pick_better(current: Candidate, candidate: Candidate) -> Candidate {
    if candidate.score < current.score {
        return candidate;
    }
    if candidate.score > current.score {
        return current;
    }
    if candidate.length > current.length {
        return candidate;
    }
    if candidate.length < current.length {
        return current;
    }
    if candidate.abs_offset < current.abs_offset {
        return candidate;
    }
    current
}

/// lower/upper bound range query over a clip-position-sorted slice of
/// consensuses, inclusive on both ends.
fn range_within(consensuses: &[Consensus], start: i64, end: i64) -> Vec<&Consensus> {
    consensuses
        .iter()
        .filter(|c| c.clip_position >= start && c.clip_position <= end)
        .collect()
}
