use crate::clip::{Clip, Side};
use std::collections::HashMap;

/// A non-empty set of [`Clip`]s sharing `(reference_id, side, clip_position)`.
/// Owns the clips it was built from — moved out of the per-reference,
/// per-side partition rather than borrowed, so the partition can be freed
/// before the next reference is processed (§5 Resources).
pub struct Cluster {
    clips: Vec<Clip>,
}

impl Cluster {
    fn new(clips: Vec<Clip>) -> Self {
        debug_assert!(!clips.is_empty());
        Self { clips }
    }

    pub fn size(&self) -> usize {
        self.clips.len()
    }

    pub fn reference_id(&self) -> i32 {
        self.clips[0].reference_id
    }

    pub fn side(&self) -> Side {
        self.clips[0].side
    }

    pub fn clip_position(&self) -> i64 {
        self.clips[0].clip_position
    }

    /// second-largest value in `values`; spec.md's rationale is that using
    /// the runner-up (rather than the max) keeps one outlier-long read
    /// from widening the consensus beyond majority-supported coverage.
    fn second_largest(values: &[i64]) -> i64 {
        debug_assert!(values.len() > 1);
        let mut max = values[0];
        let mut second = values[1];
        if max < second {
            std::mem::swap(&mut max, &mut second);
        }
        for &v in &values[2..] {
            if v >= max {
                second = max;
                max = v;
            } else if v > second {
                second = v;
            }
        }
        second
    }

    /// Build the quality-weighted majority consensus for this cluster, per
    /// spec.md §4.D.
    pub fn consensus(&self) -> Consensus {
        if self.clips.len() == 1 {
            let clip = &self.clips[0];
            return Consensus {
                reference_id: clip.reference_id,
                clip_position: clip.clip_position,
                local_clip_position: clip.length_of_left_part,
                sequence: clip.sequence.clone(),
                support: 1,
            };
        }

        let left_lengths: Vec<i64> = self.clips.iter().map(|c| c.length_of_left_part).collect();
        let right_lengths: Vec<i64> = self.clips.iter().map(|c| c.length_of_right_part).collect();
        let n_left = Self::second_largest(&left_lengths);
        let n_right = Self::second_largest(&right_lengths);
        let n = n_left + n_right;

        let diffs: Vec<i64> = left_lengths.iter().map(|l| l - n_left).collect();

        let mut sequence = Vec::with_capacity(n.max(0) as usize);
        for i in 0..n {
            let mut counts: HashMap<u8, u32> = HashMap::new();
            let mut qual_sums: HashMap<u8, u64> = HashMap::new();
            for (j, clip) in self.clips.iter().enumerate() {
                let idx = diffs[j] + i;
                if idx < 0 || idx >= clip.len() {
                    continue;
                }
                let base = clip.sequence[idx as usize];
                let qual = clip.qualities[idx as usize] as u64;
                *counts.entry(base).or_insert(0) += 1;
                *qual_sums.entry(base).or_insert(0) += qual;
            }
            sequence.push(correct_base(&counts, &qual_sums));
        }

        Consensus {
            reference_id: self.reference_id(),
            clip_position: self.clip_position(),
            local_clip_position: n_left,
            sequence,
            support: self.clips.len(),
        }
    }
}

/// Pick the majority base: highest count, ties broken by highest average
/// quality, remaining ties broken lexicographically.
fn correct_base(counts: &HashMap<u8, u32>, qual_sums: &HashMap<u8, u64>) -> u8 {
    counts
        .iter()
        .max_by(|(base_a, count_a), (base_b, count_b)| {
            count_a
                .cmp(count_b)
                .then_with(|| {
                    let avg_a = qual_sums[*base_a] as f64 / **count_a as f64;
                    let avg_b = qual_sums[*base_b] as f64 / **count_b as f64;
                    avg_a.partial_cmp(&avg_b).unwrap_or(std::cmp::Ordering::Equal)
                })
                .then_with(|| base_b.cmp(base_a)) // lexicographically smallest wins the final tiebreak
        })
        .map(|(base, _)| *base)
        .expect("at least one base contributes to every consensus position")
}

/// Derived from a [`Cluster`]: the quality-weighted majority base string
/// over the clips sharing a clip position.
#[derive(Debug, Clone, PartialEq)]
pub struct Consensus {
    pub reference_id: i32,
    pub clip_position: i64,
    pub local_clip_position: i64,
    pub sequence: Vec<u8>,
    pub support: usize,
}

impl Consensus {
    pub fn len(&self) -> i64 {
        self.sequence.len() as i64
    }
}

/// Groups clips sharing `clip_position` into [`Cluster`]s and reduces each
/// to a [`Consensus`]. Input must already be partitioned by
/// `(reference_id, side)` and sorted by `(clip_position, -clipped_length)`.
pub struct Clusterer;

impl Clusterer {
    /// Single pass: clips are adjacent-grouped purely by equal
    /// `clip_position` (position-exact clustering, no fuzzy merge).
    pub fn cluster(mut clips: Vec<Clip>) -> Vec<Cluster> {
        clips.sort_by(|a, b| {
            a.clip_position.cmp(&b.clip_position).then_with(|| {
                let clipped_a = match a.side {
                    Side::Left => a.length_of_left_part,
                    Side::Right => a.length_of_right_part,
                };
                let clipped_b = match b.side {
                    Side::Left => b.length_of_left_part,
                    Side::Right => b.length_of_right_part,
                };
                clipped_b.cmp(&clipped_a)
            })
        });

        let mut clusters = Vec::new();
        let mut current: Vec<Clip> = Vec::new();
        for clip in clips {
            if let Some(last) = current.last() {
                if last.clip_position != clip.clip_position {
                    clusters.push(Cluster::new(std::mem::take(&mut current)));
                }
            }
            current.push(clip);
        }
        if !current.is_empty() {
            clusters.push(Cluster::new(current));
        }
        clusters
    }

    /// Convenience: cluster and immediately reduce to consensuses, sorted
    /// by `clip_position` as required by the range-query step in §4.F.
    pub fn consensuses(clips: Vec<Clip>) -> Vec<Consensus> {
        let mut consensuses: Vec<Consensus> =
            Self::cluster(clips).iter().map(Cluster::consensus).collect();
        consensuses.sort_by_key(|c| c.clip_position);
        consensuses
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip(side: Side, clip_position: i64, seq: &str, qual: u8, left: i64) -> Clip {
        let sequence = seq.as_bytes().to_vec();
        let right = sequence.len() as i64 - left;
        Clip {
            reference_id: 0,
            side,
            clip_position,
            sequence: sequence.clone(),
            qualities: vec![qual; sequence.len()],
            length_of_left_part: left,
            length_of_right_part: right,
            mate_reversed: false,
            reversed: false,
            mate_position: 1,
        }
    }

    #[test]
    fn test_single_clip_consensus_equals_its_sequence() {
        let c = clip(Side::Left, 1000, "ACGTACGT", 30, 4);
        let cluster = Cluster::new(vec![c.clone()]);
        let consensus = cluster.consensus();
        assert_eq!(consensus.sequence, c.sequence);
        assert_eq!(consensus.local_clip_position, 4);
        assert_eq!(consensus.support, 1);
    }

    #[test]
    fn test_cluster_members_share_clip_position() {
        let clips = vec![
            clip(Side::Left, 1000, "ACGTACGT", 30, 4),
            clip(Side::Left, 1000, "ACGTACGT", 30, 4),
            clip(Side::Left, 2000, "TTTTTTTT", 30, 4),
        ];
        let clusters = Clusterer::cluster(clips);
        assert_eq!(clusters.len(), 2);
        for cluster in &clusters {
            let positions: Vec<i64> = std::iter::repeat(cluster.clip_position())
                .take(cluster.size())
                .collect();
            assert!(positions.iter().all(|p| *p == cluster.clip_position()));
        }
    }

    #[test]
    fn test_consensus_length_matches_second_largest_extents() {
        // three clips: left-parts 4,5,6 -> second largest = 5
        // right-parts all 4 -> second largest = 4 -> N = 9
        let clips = vec![
            clip(Side::Left, 1000, "AAAACCCC", 30, 4),
            clip(Side::Left, 1000, "AAAAACCCC", 30, 5),
            clip(Side::Left, 1000, "AAAAAACCCC", 30, 6),
        ];
        let cluster = Cluster::new(clips);
        let consensus = cluster.consensus();
        assert_eq!(consensus.local_clip_position, 5);
        assert_eq!(consensus.len(), 9);
    }

    #[test]
    fn test_majority_base_wins_over_minority() {
        let clips = vec![
            clip(Side::Left, 1000, "A", 30, 1),
            clip(Side::Left, 1000, "A", 30, 1),
            clip(Side::Left, 1000, "T", 30, 1),
        ];
        let cluster = Cluster::new(clips);
        let consensus = cluster.consensus();
        assert_eq!(consensus.sequence, b"A");
    }

    #[test]
    fn test_quality_breaks_count_tie() {
        let clips = vec![
            clip(Side::Left, 1000, "A", 10, 1),
            clip(Side::Left, 1000, "T", 40, 1),
        ];
        let cluster = Cluster::new(clips);
        let consensus = cluster.consensus();
        assert_eq!(consensus.sequence, b"T");
    }

    #[test]
    fn test_consensuses_are_sorted_by_clip_position() {
        let clips = vec![
            clip(Side::Left, 2000, "AAAA", 30, 2),
            clip(Side::Left, 1000, "TTTT", 30, 2),
        ];
        let consensuses = Clusterer::consensuses(clips);
        assert_eq!(consensuses[0].clip_position, 1000);
        assert_eq!(consensuses[1].clip_position, 2000);
    }
}
