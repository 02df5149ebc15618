//! Neighbor structures for the propagation engine.
//!
//! A [`NeighborSet`] holds, for one test instance (the *anchor*), its k
//! nearest neighbors drawn from the mixed labeled+unlabeled pool, the
//! derived confidence [`Rank`], and the resolution flags. Neighbor lists
//! are produced by a [`NeighborSearch`], either as an exhaustive linear
//! scan or through a norm-pruned index; both return identical output.
use std::cmp::Ordering;

use float_cmp::approx_eq;
use ndarray::prelude::*;
use ordered_float::OrderedFloat;

use crate::dataset::{self, AttributeKind, DistanceKind};
use crate::Label;

/// A nearest neighbor of some anchor instance: its index in the pool
/// and its distance from the anchor.
#[derive(Clone, Copy, Debug)]
pub struct Neighbor {
    pub index: usize,
    pub distance: f64,
}

impl Neighbor {
    fn new(index: usize, distance: f64) -> Neighbor {
        Neighbor { index, distance }
    }
}

// Ordering for Neighbor: by distance, then by pool index, so that ties
// at the k boundary are resolved the same way on every run.
impl Ord for Neighbor {
    fn cmp(&self, other: &Neighbor) -> Ordering {
        OrderedFloat::from(self.distance)
            .cmp(&OrderedFloat::from(other.distance))
            .then(self.index.cmp(&other.index))
    }
}

impl PartialOrd for Neighbor {
    fn partial_cmp(&self, other: &Neighbor) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Neighbor {
    fn eq(&self, other: &Neighbor) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Neighbor {}

/// Inserts `new` into the sorted bounded list, dropping the worst entry
/// when the list already holds `k` neighbors.
fn insert_bounded(neighbors: &mut Vec<Neighbor>, new: Neighbor, k: usize) {
    if neighbors.len() == k {
        match neighbors.last() {
            Some(last) if new >= *last => return,
            _ => {}
        }
    }
    let pos = neighbors.binary_search(&new).unwrap_or_else(|e| e);
    neighbors.insert(pos, new);
    neighbors.truncate(k);
}

/// How neighbor candidates are enumerated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchStrategy {
    /// Scan every pool row.
    Exhaustive,
    /// Scan rows in order of vector norm, pruning with the bound
    /// `|‖a‖ − ‖b‖| ≤ d(a, b)`. Only sound for the Euclidean distance
    /// on complete data; the constructor falls back to the exhaustive
    /// scan otherwise.
    NormIndexed,
}

/// k-nearest-neighbor search over a fixed pool of feature rows.
pub struct NeighborSearch {
    strategy: SearchStrategy,
    distance: DistanceKind,
    feature_kinds: Vec<AttributeKind>,
    // Pool row indices sorted by vector norm (norm index only).
    order: Vec<usize>,
    norms: Vec<f64>,
}

impl NeighborSearch {
    pub fn build(
        strategy: SearchStrategy,
        distance: DistanceKind,
        feature_kinds: Vec<AttributeKind>,
        pool: &Array2<f64>,
    ) -> NeighborSearch {
        let indexable = distance == DistanceKind::Euclidean
            && pool.iter().all(|v| !v.is_nan());
        let strategy = match strategy {
            SearchStrategy::NormIndexed if indexable => SearchStrategy::NormIndexed,
            _ => SearchStrategy::Exhaustive,
        };

        let (norms, order) = if strategy == SearchStrategy::NormIndexed {
            let norms: Vec<f64> = pool
                .outer_iter()
                .map(|row| row.iter().map(|v| v * v).sum::<f64>().sqrt())
                .collect();
            let mut order: Vec<usize> = (0..pool.nrows()).collect();
            order.sort_by(|a, b| {
                OrderedFloat::from(norms[*a])
                    .cmp(&OrderedFloat::from(norms[*b]))
                    .then(a.cmp(b))
            });
            (norms, order)
        } else {
            (Vec::new(), Vec::new())
        };

        NeighborSearch {
            strategy,
            distance,
            feature_kinds,
            order,
            norms,
        }
    }

    /// Returns the `k` nearest pool rows to `anchor`, excluding the row
    /// `exclude` (the anchor itself when it is part of the pool).
    pub fn nearest(
        &self,
        pool: &Array2<f64>,
        anchor: &ArrayView1<f64>,
        exclude: Option<usize>,
        k: usize,
    ) -> Vec<Neighbor> {
        assert!(k > 0);
        match self.strategy {
            SearchStrategy::Exhaustive => self.nearest_exhaustive(pool, anchor, exclude, k),
            SearchStrategy::NormIndexed => self.nearest_indexed(pool, anchor, exclude, k),
        }
    }

    fn nearest_exhaustive(
        &self,
        pool: &Array2<f64>,
        anchor: &ArrayView1<f64>,
        exclude: Option<usize>,
        k: usize,
    ) -> Vec<Neighbor> {
        let mut neighbors = Vec::with_capacity(k + 1);
        for (i, row) in pool.outer_iter().enumerate() {
            if Some(i) == exclude {
                continue;
            }
            let d = dataset::distance(self.distance, &self.feature_kinds, &row, anchor);
            insert_bounded(&mut neighbors, Neighbor::new(i, d), k);
        }
        neighbors
    }

    fn nearest_indexed(
        &self,
        pool: &Array2<f64>,
        anchor: &ArrayView1<f64>,
        exclude: Option<usize>,
        k: usize,
    ) -> Vec<Neighbor> {
        let a = anchor.iter().map(|v| v * v).sum::<f64>().sqrt();
        let mut neighbors: Vec<Neighbor> = Vec::with_capacity(k + 1);

        let pos = self.order.partition_point(|i| self.norms[*i] < a);
        let mut lo = pos as isize - 1;
        let mut hi = pos;

        loop {
            let lo_gap = if lo >= 0 {
                (a - self.norms[self.order[lo as usize]]).abs()
            } else {
                f64::INFINITY
            };
            let hi_gap = if hi < self.order.len() {
                (self.norms[self.order[hi]] - a).abs()
            } else {
                f64::INFINITY
            };
            let gap = lo_gap.min(hi_gap);
            if gap.is_infinite() {
                break;
            }
            // Every remaining candidate is at least `gap` away.
            if neighbors.len() == k {
                match neighbors.last() {
                    Some(last) if gap > last.distance => break,
                    _ => {}
                }
            }
            let idx = if lo_gap <= hi_gap {
                let i = self.order[lo as usize];
                lo -= 1;
                i
            } else {
                let i = self.order[hi];
                hi += 1;
                i
            };
            if Some(idx) == exclude {
                continue;
            }
            let d = dataset::euclidean_distance(&pool.row(idx), anchor);
            insert_bounded(&mut neighbors, Neighbor::new(idx, d), k);
        }
        neighbors
    }
}

/// Confidence rank of a pending test instance.
///
/// Lexicographic in (number of labeled neighbors, top vote share among
/// them): more evidence always outranks less, and tighter agreement
/// breaks evidence ties. The anchor index breaks exact rank ties where a
/// total order over instances is needed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Rank {
    pub evidence: usize,
    pub agreement: OrderedFloat<f64>,
}

impl Rank {
    /// Rank of an instance with no labeled neighbors yet.
    pub fn missing() -> Rank {
        Rank {
            evidence: 0,
            agreement: OrderedFloat::from(0.0),
        }
    }

    /// Computes the rank of a neighbor list under the current pool
    /// labels.
    pub fn compute(
        neighbors: &[Neighbor],
        labels: &[Option<Label>],
        num_classes: usize,
    ) -> Rank {
        let mut counts = vec![0usize; num_classes];
        let mut evidence = 0;
        for neigh in neighbors {
            if let Some(y) = labels[neigh.index] {
                counts[y] += 1;
                evidence += 1;
            }
        }
        if evidence == 0 {
            return Rank::missing();
        }
        let top = counts.iter().max().copied().unwrap_or(0);
        Rank {
            evidence,
            agreement: OrderedFloat::from(top as f64 / evidence as f64),
        }
    }
}

/// Majority vote over the currently-labeled neighbors.
///
/// Labeled neighbors at distance zero dominate the vote: an exact
/// feature match is stronger evidence than any number of farther
/// neighbors. Vote ties break towards the smallest class code (the fixed
/// enumeration order). Returns `None` when no neighbor is labeled.
pub fn vote(neighbors: &[Neighbor], labels: &[Option<Label>], num_classes: usize) -> Option<Label> {
    let labeled: Vec<&Neighbor> = neighbors
        .iter()
        .filter(|n| labels[n.index].is_some())
        .collect();
    if labeled.is_empty() {
        return None;
    }

    let coincident: Vec<&&Neighbor> = labeled
        .iter()
        .filter(|n| approx_eq!(f64, n.distance, 0.0, epsilon = 1e-12))
        .collect();

    let mut counts = vec![0usize; num_classes];
    if coincident.is_empty() {
        for neigh in &labeled {
            counts[labels[neigh.index].unwrap()] += 1;
        }
    } else {
        for neigh in &coincident {
            counts[labels[neigh.index].unwrap()] += 1;
        }
    }

    let mut winner = 0;
    let mut winner_count = 0;
    for (y, count) in counts.iter().enumerate() {
        if *count > winner_count {
            winner = y;
            winner_count = *count;
        }
    }
    Some(winner)
}

/// Per-test-instance neighbor structure: the anchor's k nearest pool
/// neighbors, its confidence rank, and the resolution flags.
#[derive(Clone, Debug)]
pub struct NeighborSet {
    /// Pool index of the anchor test instance.
    pub anchor: usize,
    pub neighbors: Vec<Neighbor>,
    pub rank: Rank,
    /// The anchor's label changed in the last round.
    pub updated: bool,
    /// The anchor's label is no longer missing.
    pub resolved: bool,
}

impl NeighborSet {
    pub fn new(anchor: usize, neighbors: Vec<Neighbor>) -> NeighborSet {
        NeighborSet {
            anchor,
            neighbors,
            rank: Rank::missing(),
            updated: false,
            resolved: false,
        }
    }

    /// Recomputes the rank after a neighbor's label changed.
    pub fn refresh_rank(&mut self, labels: &[Option<Label>], num_classes: usize) {
        self.rank = Rank::compute(&self.neighbors, labels, num_classes);
    }
}
