/// Mean and sample standard deviation of absolute template length,
/// computed from a one-pass scan over a bounded prefix of properly
/// paired alignments. Pure; holds no reference to the underlying reader.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InsertStats {
    pub mean: f64,
    pub std_dev: f64,
    pub n: usize,
}

impl InsertStats {
    /// Default cap on the number of properly paired alignments scanned.
    pub const DEFAULT_LIMIT: usize = 200_000;

    /// Compute mean/sample-stddev of `|template_length|` over the first
    /// `limit` values in `insert_sizes`. Falls back to the supplied
    /// `(fallback_mean, fallback_std)` pair when fewer than two values are
    /// available (sample variance is undefined for n < 2).
    pub fn from_insert_sizes(
        insert_sizes: impl Iterator<Item = i64>,
        limit: usize,
        fallback_mean: f64,
        fallback_std: f64,
    ) -> Self {
        let values: Vec<f64> = insert_sizes.take(limit).map(|v| v.unsigned_abs() as f64).collect();
        let n = values.len();
        if n < 2 {
            return Self {
                mean: fallback_mean,
                std_dev: fallback_std,
                n,
            };
        }
        let mean = values.iter().sum::<f64>() / n as f64;
        let variance =
            values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n as f64 - 1.0);
        Self {
            mean,
            std_dev: variance.sqrt(),
            n,
        }
    }

    /// Upper bound `mean + k * std_dev` used throughout the discordant
    /// scanner and target-region builder.
    pub fn upper_bound(&self, k: f64) -> f64 {
        self.mean + k * self.std_dev
    }

    /// Lower bound `mean - k * std_dev`, floored at zero since a negative
    /// insert size has no meaning here.
    pub fn lower_bound(&self, k: f64) -> f64 {
        (self.mean - k * self.std_dev).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(vec![200, 200, 200, 200], 200.0, 0.0)]
    #[case(vec![190, 210], 200.0, 14.142135623730951)]
    fn test_insert_stats(#[case] values: Vec<i64>, #[case] expected_mean: f64, #[case] expected_std: f64) {
        let stats = InsertStats::from_insert_sizes(values.into_iter(), InsertStats::DEFAULT_LIMIT, 200.0, 10.0);
        assert!((stats.mean - expected_mean).abs() < 1e-9);
        assert!((stats.std_dev - expected_std).abs() < 1e-9);
    }

    #[test]
    fn test_insert_stats_falls_back_below_two_samples() {
        let stats = InsertStats::from_insert_sizes(std::iter::empty(), 10, 200.0, 10.0);
        assert_eq!(stats.mean, 200.0);
        assert_eq!(stats.std_dev, 10.0);
        assert_eq!(stats.n, 0);
    }

    #[test]
    fn test_insert_stats_respects_limit() {
        let values = vec![100i64; 1000];
        let stats = InsertStats::from_insert_sizes(values.into_iter(), 10, 0.0, 0.0);
        assert_eq!(stats.n, 10);
    }

    #[test]
    fn test_bounds() {
        let stats = InsertStats {
            mean: 200.0,
            std_dev: 10.0,
            n: 100,
        };
        assert_eq!(stats.upper_bound(3.0), 230.0);
        assert_eq!(stats.lower_bound(3.0), 170.0);
    }

    #[test]
    fn test_negative_insert_sizes_treated_as_absolute() {
        let stats = InsertStats::from_insert_sizes(vec![-200i64, 200].into_iter(), 10, 0.0, 0.0);
        assert_eq!(stats.mean, 200.0);
        assert_eq!(stats.std_dev, 0.0);
    }
}
