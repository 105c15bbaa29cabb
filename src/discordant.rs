use crate::insert_stats::InsertStats;

/// A candidate genomic window bracketing a possible deletion, derived
/// from discordant read-pair evidence.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetRegion {
    pub reference_id: i32,
    pub start: i64,
    pub end: i64,
    pub min_deletion_length: i64,
    pub max_deletion_length: i64,
}

/// One `[Position, MatePosition]` interval contributed by a single
/// discordant read pair, collected by the scanner before merging.
#[derive(Debug, Clone, Copy, PartialEq)]
struct DiscordantInterval {
    start: i64,
    end: i64,
    insert_size: i64,
}

/// Identifies windows of discordant paired-end evidence and turns each
/// merged cluster of intervals into a [`TargetRegion`].
pub struct DiscordantScanner {
    stats: InsertStats,
    k: f64,
}

/// One discordant-pair observation, as read off a BAM record: reference
/// id, 1-based leftmost position, mate position, orientation, and the
/// absolute template length. Orientation/flag filtering (§6 BAM flag
/// handling) is the caller's responsibility; the scanner only needs the
/// already-filtered positions and insert size.
#[derive(Debug, Clone, Copy)]
pub struct DiscordantPair {
    pub reference_id: i32,
    pub position: i64,
    pub mate_position: i64,
    pub insert_size: i64,
}

impl DiscordantScanner {
    pub fn new(stats: InsertStats, k: f64) -> Self {
        Self { stats, k }
    }

    /// Step 1: keep only pairs whose insert size exceeds `mean + k*sigma`
    /// and whose positions are ordered `start < end` on the same
    /// reference, then delegate to [`Self::regions_from_intervals`].
    pub fn target_regions(&self, reference_id: i32, pairs: &[DiscordantPair]) -> Vec<TargetRegion> {
        let threshold = self.stats.upper_bound(self.k);
        let mut intervals: Vec<DiscordantInterval> = pairs
            .iter()
            .filter(|p| p.reference_id == reference_id)
            .filter(|p| p.position < p.mate_position)
            .filter(|p| (p.insert_size as f64) > threshold)
            .map(|p| DiscordantInterval {
                start: p.position,
                end: p.mate_position,
                insert_size: p.insert_size,
            })
            .collect();
        intervals.sort_by_key(|i| i.start);
        self.regions_from_intervals(reference_id, &intervals, threshold)
    }

    /// Step 2/3: greedily merge intervals whose starts are within
    /// `mean + k*sigma` of one another, then derive the deletion-length
    /// bounds for each merged cluster per spec.md §4.C.
    fn regions_from_intervals(
        &self,
        reference_id: i32,
        intervals: &[DiscordantInterval],
        merge_distance: f64,
    ) -> Vec<TargetRegion> {
        if intervals.is_empty() {
            return Vec::new();
        }
        let lower = self.stats.lower_bound(self.k);
        let upper = self.stats.upper_bound(self.k);

        let mut regions = Vec::new();
        let mut cluster_last_start = intervals[0].start;
        let mut a = intervals[0].start;
        let mut b = intervals[0].end;
        let mut max_insert = intervals[0].insert_size;

        let flush = |a: i64, b: i64, max_insert: i64| -> TargetRegion {
            let min_deletion_length = ((max_insert as f64) - upper).max(0.0) as i64;
            let max_deletion_length = ((max_insert as f64) - lower) as i64;
            TargetRegion {
                reference_id,
                start: a,
                end: b,
                min_deletion_length,
                max_deletion_length: max_deletion_length.max(min_deletion_length),
            }
        };

        for interval in &intervals[1..] {
            if (interval.start - cluster_last_start) as f64 <= merge_distance {
                b = b.max(interval.end);
                max_insert = max_insert.max(interval.insert_size);
                cluster_last_start = interval.start;
            } else {
                regions.push(flush(a, b, max_insert));
                a = interval.start;
                b = interval.end;
                max_insert = interval.insert_size;
                cluster_last_start = interval.start;
            }
        }
        regions.push(flush(a, b, max_insert));
        regions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats() -> InsertStats {
        InsertStats {
            mean: 200.0,
            std_dev: 10.0,
            n: 1000,
        }
    }

    fn pair(reference_id: i32, position: i64, mate_position: i64, insert_size: i64) -> DiscordantPair {
        DiscordantPair {
            reference_id,
            position,
            mate_position,
            insert_size,
        }
    }

    #[test]
    fn test_single_region_from_one_pair() {
        let scanner = DiscordantScanner::new(stats(), 3.0);
        let pairs = vec![pair(0, 100_000, 100_400, 400)];
        let regions = scanner.target_regions(0, &pairs);
        assert_eq!(regions.len(), 1);
        let r = &regions[0];
        assert_eq!(r.start, 100_000);
        assert_eq!(r.end, 100_400);
        // min = max(0, 400 - 230) = 170; max = 400 - 170 = 230
        assert_eq!(r.min_deletion_length, 170);
        assert_eq!(r.max_deletion_length, 230);
    }

    #[test]
    fn test_low_insert_sizes_produce_no_regions() {
        let scanner = DiscordantScanner::new(stats(), 3.0);
        let pairs = vec![pair(0, 100_000, 100_200, 200)];
        let regions = scanner.target_regions(0, &pairs);
        assert!(regions.is_empty());
    }

    #[test]
    fn test_adjacent_pairs_merge_into_one_region() {
        let scanner = DiscordantScanner::new(stats(), 3.0);
        let pairs = vec![
            pair(0, 100_000, 100_400, 400),
            pair(0, 100_005, 100_410, 405),
        ];
        let regions = scanner.target_regions(0, &pairs);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].end, 100_410);
    }

    #[test]
    fn test_far_apart_pairs_stay_separate_regions() {
        let scanner = DiscordantScanner::new(stats(), 3.0);
        let pairs = vec![
            pair(0, 100_000, 100_400, 400),
            pair(0, 500_000, 500_400, 400),
        ];
        let regions = scanner.target_regions(0, &pairs);
        assert_eq!(regions.len(), 2);
    }

    #[test]
    fn test_other_reference_is_excluded() {
        let scanner = DiscordantScanner::new(stats(), 3.0);
        let pairs = vec![pair(1, 100_000, 100_400, 400)];
        let regions = scanner.target_regions(0, &pairs);
        assert!(regions.is_empty());
    }
}
