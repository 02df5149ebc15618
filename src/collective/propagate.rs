//! The collective k-NN propagation engine.
//!
//! `initialize()` builds one [`NeighborSet`] per test instance over the
//! union of training and test instances. Each `step()` then recomputes
//! the confidence rank of the sets whose neighbor labels changed since
//! the previous round, finds the maximum rank among the still-missing
//! sets, and commits a label to *every* set tied at that maximum in the
//! same round (batch commit): equally confident instances are resolved
//! together, which also accelerates convergence. The loop resolves at
//! least one instance per round on non-degenerate input, so it ends
//! within one round per test instance.
use ndarray::prelude::*;
use tracing::{debug, trace};

use crate::collective::error::{CollectiveError, Result};
use crate::collective::neighbors::{vote, NeighborSearch, NeighborSet, Rank, SearchStrategy};
use crate::collective::{Assignments, CollectiveAlgorithm, Commit, Restartable};
use crate::dataset::{Dataset, DistanceKind, Schema};
use crate::Label;

pub struct KnnPropagation {
    distance: DistanceKind,
    strategy: SearchStrategy,
    k: usize,
    num_classes: usize,
    train_n: usize,
    // Feature rows of the neighbor pool: training rows first, then the
    // private test copy.
    pool: Array2<f64>,
    // Pool-wide labels; test entries start missing and are filled in as
    // the loop commits them.
    labels: Vec<Option<Label>>,
    // One NeighborSet per test instance, in test order.
    sets: Vec<NeighborSet>,
    // Reverse index: pool row -> ids of the sets holding it, used to
    // invalidate ranks when that row's label is committed.
    containing: Vec<Vec<usize>>,
    // Sets whose rank is stale.
    dirty: Vec<usize>,
    dirty_flag: Vec<bool>,
    unresolved: usize,
    round: usize,
    commits: Vec<Commit>,
}

impl KnnPropagation {
    pub fn new(distance: DistanceKind, strategy: SearchStrategy) -> KnnPropagation {
        KnnPropagation {
            distance,
            strategy,
            k: 0,
            num_classes: 0,
            train_n: 0,
            pool: Array2::zeros((0, 0)),
            labels: Vec::new(),
            sets: Vec::new(),
            containing: Vec::new(),
            dirty: Vec::new(),
            dirty_flag: Vec::new(),
            unresolved: 0,
            round: 0,
            commits: Vec::new(),
        }
    }

    pub fn round(&self) -> usize {
        self.round
    }

    /// Pool-wide labels after (or during) convergence; training entries
    /// first, then test entries.
    pub fn pool_labels(&self) -> &[Option<Label>] {
        &self.labels
    }

    fn mark_dirty(&mut self, pool_index: usize) {
        // Split borrow: take the id list out, push ids, put it back.
        let ids = std::mem::take(&mut self.containing[pool_index]);
        for id in &ids {
            if !self.dirty_flag[*id] {
                self.dirty_flag[*id] = true;
                self.dirty.push(*id);
            }
        }
        self.containing[pool_index] = ids;
    }
}

impl CollectiveAlgorithm for KnnPropagation {
    fn check_capability(&self, schema: &Schema) -> Result<()> {
        match schema.num_classes() {
            Some(2) => Ok(()),
            Some(c) => Err(CollectiveError::Capability(format!(
                "collective k-NN requires a binary class attribute, got {} classes",
                c
            ))),
            None => Err(CollectiveError::Capability(
                "collective k-NN requires a nominal class attribute".into(),
            )),
        }
    }

    fn initialize(&mut self, train: &Dataset, test: &Dataset, k: usize) -> Result<()> {
        let pool_n = train.len() + test.len();
        if k == 0 {
            return Err(CollectiveError::Config("k must be positive".into()));
        }
        if k > pool_n.saturating_sub(1) {
            return Err(CollectiveError::Config(format!(
                "k={} larger than the {} candidate neighbors in the pool",
                k,
                pool_n.saturating_sub(1)
            )));
        }
        self.num_classes = train.schema().num_classes().ok_or_else(|| {
            CollectiveError::Capability("propagation requires a nominal class".into())
        })?;

        self.k = k;
        self.train_n = train.len();
        self.pool = train.stack_features(test);
        // The test copy enters with its class missing regardless of what
        // the caller left in it.
        self.labels = train.labels().to_vec();
        self.labels.extend(std::iter::repeat(None).take(test.len()));

        let search = NeighborSearch::build(
            self.strategy,
            self.distance,
            train.schema().feature_kinds(),
            &self.pool,
        );

        self.sets = Vec::with_capacity(test.len());
        self.containing = vec![Vec::new(); pool_n];
        for ti in 0..test.len() {
            let anchor = self.train_n + ti;
            let neighbors = search.nearest(&self.pool, &self.pool.row(anchor), Some(anchor), k);
            for neigh in &neighbors {
                self.containing[neigh.index].push(ti);
            }
            let mut set = NeighborSet::new(anchor, neighbors);
            set.refresh_rank(&self.labels, self.num_classes);
            self.sets.push(set);
        }

        self.dirty = Vec::new();
        self.dirty_flag = vec![false; test.len()];
        self.unresolved = test.len();
        self.round = 0;
        self.commits = Vec::new();
        debug!(
            train = self.train_n,
            test = test.len(),
            k,
            "propagation pool initialized"
        );
        Ok(())
    }

    fn step(&mut self) -> Result<usize> {
        self.round += 1;

        for set in &mut self.sets {
            set.updated = false;
        }

        // Invalidate phase: recompute the rank of every set that holds a
        // just-labeled neighbor.
        let stale = std::mem::take(&mut self.dirty);
        for id in stale {
            self.dirty_flag[id] = false;
            if !self.sets[id].resolved {
                self.sets[id].refresh_rank(&self.labels, self.num_classes);
            }
        }

        // Highest rank among the still-missing sets, counting only sets
        // with some labeled evidence.
        let mut best: Option<Rank> = None;
        for set in &self.sets {
            if set.resolved || set.rank.evidence == 0 {
                continue;
            }
            if best.map_or(true, |b| set.rank > b) {
                best = Some(set.rank);
            }
        }
        let best = match best {
            Some(rank) => rank,
            // No pending set has labeled evidence; nothing can commit.
            None => return Ok(0),
        };

        // Batch commit: every pending set tied at the maximum resolves in
        // this round. Votes are computed from a single consistent label
        // snapshot before any of them is applied.
        let mut pending: Vec<(usize, Label)> = Vec::new();
        for (id, set) in self.sets.iter().enumerate() {
            if set.resolved || set.rank != best {
                continue;
            }
            if let Some(label) = vote(&set.neighbors, &self.labels, self.num_classes) {
                pending.push((id, label));
            }
        }

        let committed = pending.len();
        for (id, label) in pending {
            let anchor = self.sets[id].anchor;
            self.labels[anchor] = Some(label);
            self.sets[id].resolved = true;
            self.sets[id].updated = true;
            self.commits.push(Commit {
                round: self.round,
                test_index: anchor - self.train_n,
                label,
                evidence: best.evidence,
                agreement: best.agreement.into_inner(),
            });
            self.mark_dirty(anchor);
        }
        self.unresolved -= committed;
        trace!(
            round = self.round,
            committed,
            unresolved = self.unresolved,
            "propagation round"
        );
        Ok(committed)
    }

    fn is_done(&self) -> bool {
        self.unresolved == 0
    }

    fn unresolved(&self) -> usize {
        self.unresolved
    }

    fn quality(&self) -> f64 {
        if self.commits.is_empty() {
            return 0.0;
        }
        self.commits.iter().map(|c| c.agreement).sum::<f64>() / self.commits.len() as f64
    }

    fn assignments(&self) -> Result<Assignments> {
        if self.unresolved > 0 {
            return Err(CollectiveError::NoProgress {
                round: self.round,
                unresolved: self.unresolved,
            });
        }
        let mut labels = Vec::with_capacity(self.sets.len());
        for set in &self.sets {
            match self.labels[set.anchor] {
                Some(y) => labels.push(y),
                None => {
                    return Err(CollectiveError::NoProgress {
                        round: self.round,
                        unresolved: 1,
                    })
                }
            }
        }
        Ok(Assignments {
            labels,
            commits: self.commits.clone(),
            rounds: self.round,
            quality: self.quality(),
        })
    }
}

// The k-NN propagation is deterministic: the restart hooks keep their
// no-op defaults.
impl Restartable for KnnPropagation {}
