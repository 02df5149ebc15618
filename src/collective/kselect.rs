//! Neighborhood-size selection by internal cross-validation.
//!
//! The selected k is determined from the training set alone, before any
//! test label is touched, and stays fixed for the remainder of the
//! build.
use itertools::Itertools;
use tracing::debug;

use crate::collective::error::{CollectiveError, Result};
use crate::collective::neighbors::{vote, NeighborSearch, SearchStrategy};
use crate::dataset::{Dataset, DistanceKind};

/// Row bounds `[lo, hi)` of fold `f` (0-based) out of `folds` contiguous
/// chunks over `n` rows.
pub(crate) fn fold_bounds(n: usize, folds: usize, f: usize) -> (usize, usize) {
    (f * n / folds, (f + 1) * n / folds)
}

/// Picks the neighborhood size minimizing the held-out error of a k-NN
/// vote under `cv_folds`-fold cross-validation on the training set.
///
/// Candidates are the odd values `1, 3, ... <= k_cap`; error ties
/// resolve to the smallest k. Any fold whose training part holds fewer
/// than `k_cap + 1` instances is a configuration error; k is never
/// silently reduced.
pub fn select_k(
    train: &Dataset,
    cv_folds: usize,
    k_cap: usize,
    distance: DistanceKind,
) -> Result<usize> {
    if cv_folds < 2 {
        return Err(CollectiveError::Config(format!(
            "k selection requires at least 2 folds, got {}",
            cv_folds
        )));
    }
    if k_cap == 0 {
        return Err(CollectiveError::Config("k cap must be positive".into()));
    }
    let num_classes = train.schema().num_classes().ok_or_else(|| {
        CollectiveError::Config("k selection requires a nominal class attribute".into())
    })?;

    let n = train.len();
    let candidates: Vec<usize> = (1..=k_cap).step_by(2).collect();
    let mut errors = vec![0usize; candidates.len()];

    for f in 0..cv_folds {
        let (lo, hi) = fold_bounds(n, cv_folds, f);
        let held: Vec<usize> = (lo..hi).collect();
        let fit: Vec<usize> = (0..lo).chain(hi..n).collect();
        if fit.len() < k_cap + 1 {
            return Err(CollectiveError::Config(format!(
                "fold {} leaves only {} training instances, but k selection \
                 up to k={} needs at least {}",
                f + 1,
                fit.len(),
                k_cap,
                k_cap + 1
            )));
        }

        let fit_set = train.select_rows(&fit);
        let search = NeighborSearch::build(
            SearchStrategy::Exhaustive,
            distance,
            train.schema().feature_kinds(),
            fit_set.features(),
        );

        for i in held {
            let truth = match train.label(i) {
                Some(y) => y,
                None => continue,
            };
            let neighbors =
                search.nearest(fit_set.features(), &train.row(i), None, k_cap);
            for (ki, k) in candidates.iter().enumerate() {
                let pred = vote(&neighbors[..*k], fit_set.labels(), num_classes);
                if pred != Some(truth) {
                    errors[ki] += 1;
                }
            }
        }
    }

    // position_min keeps the first minimum, so ties resolve to the
    // smallest candidate.
    let pos = errors
        .iter()
        .position_min()
        .ok_or_else(|| CollectiveError::Config("no candidate k".into()))?;
    let best = candidates[pos];
    debug!(k = best, errors = errors[pos], "selected neighborhood size");
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{AttributeKind, Schema};
    use ndarray::prelude::*;

    fn two_cluster_train(n_per_class: usize) -> Dataset {
        let schema = Schema::new(
            vec![AttributeKind::Numeric, AttributeKind::Nominal(2)],
            None,
        )
        .unwrap();
        let mut rows = Vec::new();
        // Interleave the clusters so contiguous folds stay mixed.
        for i in 0..n_per_class {
            rows.push([i as f64 * 0.1, 0.0]);
            rows.push([100.0 + i as f64 * 0.1, 1.0]);
        }
        let raw = Array2::from_shape_vec(
            (rows.len(), 2),
            rows.iter().flatten().copied().collect(),
        )
        .unwrap();
        Dataset::from_matrix(schema, raw).unwrap()
    }

    #[test]
    fn selects_smallest_k_on_clean_data() {
        // Clusters are perfectly separated, so every candidate k has
        // zero error and the tie resolves to k = 1.
        let train = two_cluster_train(10);
        assert_eq!(select_k(&train, 5, 5, DistanceKind::Euclidean).unwrap(), 1);
    }

    #[test]
    fn rejects_too_small_folds() {
        let train = two_cluster_train(3);
        // 6 rows, 2 folds: a fold's training part has 3 rows < k_cap+1.
        let err = select_k(&train, 2, 5, DistanceKind::Euclidean).unwrap_err();
        assert!(matches!(err, CollectiveError::Config(_)));
    }

    #[test]
    fn rejects_degenerate_fold_counts() {
        let train = two_cluster_train(10);
        assert!(select_k(&train, 1, 3, DistanceKind::Euclidean).is_err());
        assert!(select_k(&train, 0, 3, DistanceKind::Euclidean).is_err());
    }

    #[test]
    fn fold_bounds_partition_all_rows() {
        let n = 100;
        let folds = 7;
        let mut covered = 0;
        for f in 0..folds {
            let (lo, hi) = fold_bounds(n, folds, f);
            assert_eq!(lo, covered);
            covered = hi;
        }
        assert_eq!(covered, n);
    }
}
