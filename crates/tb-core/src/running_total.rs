//! Rebuilding absolute product counts from a baseline and per-bucket deltas.

use crate::aggregate::InventoryTally;
use crate::error::TrendError;

/// Absolute totals after each bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningTotals {
    /// Total after each bucket, in bucket order.
    pub per_bucket: Vec<i64>,
    /// Total after the last bucket, or the baseline when there are no buckets.
    pub final_total: i64,
}

/// Applies `deltas` in order on top of `baseline`.
///
/// `baseline` is the number of products that existed before the first bucket.
/// A negative baseline means the store is inconsistent and is rejected rather
/// than clamped.
pub fn reconstruct(baseline: i64, deltas: &[InventoryTally]) -> Result<RunningTotals, TrendError> {
    if baseline < 0 {
        return Err(TrendError::DataIntegrity(format!(
            "baseline product count is negative: {baseline}"
        )));
    }

    let per_bucket: Vec<i64> = deltas
        .iter()
        .scan(baseline, |running, tally| {
            *running += tally.delta();
            Some(*running)
        })
        .collect();
    let final_total = per_bucket.last().copied().unwrap_or(baseline);

    Ok(RunningTotals {
        per_bucket,
        final_total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const fn tally(added: u64, removed: u64) -> InventoryTally {
        InventoryTally { added, removed }
    }

    #[test]
    fn applies_signed_deltas_in_order() {
        let totals = reconstruct(10, &[tally(2, 1), tally(0, 0), tally(1, 1)]).unwrap();
        assert_eq!(totals.per_bucket, vec![11, 11, 11]);
        assert_eq!(totals.final_total, 11);
    }

    #[test]
    fn seed_scenario_from_zero() {
        let totals =
            reconstruct(0, &[tally(2, 0), tally(0, 0), tally(0, 1), tally(1, 0)]).unwrap();
        assert_eq!(totals.per_bucket, vec![2, 2, 1, 2]);
        assert_eq!(totals.final_total, 2);
    }

    #[test]
    fn totals_may_decrease() {
        let totals = reconstruct(5, &[tally(0, 3), tally(1, 0)]).unwrap();
        assert_eq!(totals.per_bucket, vec![2, 3]);
    }

    #[test]
    fn empty_deltas_keep_baseline() {
        let totals = reconstruct(4, &[]).unwrap();
        assert!(totals.per_bucket.is_empty());
        assert_eq!(totals.final_total, 4);
    }

    #[test]
    fn negative_baseline_is_rejected() {
        let err = reconstruct(-1, &[tally(1, 0)]).unwrap_err();
        assert!(matches!(err, TrendError::DataIntegrity(_)));
    }
}
