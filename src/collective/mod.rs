//! Collective (transductive) classification.
//!
//! This module holds the generic iteration/restart framework shared by
//! collective classifiers, and its k-NN label-propagation instantiation.
//! The concrete algorithm is a strategy object implementing
//! [`CollectiveAlgorithm`]; [`IterationController`] drives its
//! `initialize`/`step`/`is_done` cycle, and [`KnnCollective`] is the
//! user-facing classifier composing the two.
pub mod controller;
pub mod error;
pub mod kselect;
pub mod neighbors;
pub mod propagate;

pub use self::controller::{IterationController, KnnCollective, TransductiveModel};
pub use self::error::{CollectiveError, Result};
pub use self::kselect::select_k;
pub use self::neighbors::SearchStrategy;
pub use self::propagate::KnnPropagation;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

use crate::dataset::{Dataset, DistanceKind, Schema};
use crate::Label;

/// Recognized build options.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CollectiveConfig {
    /// Fold count for the internal train/test split used when no test
    /// set is supplied; 0 or 1 means no split (test = train).
    pub folds: usize,
    /// With `folds = F`, fold 1 is the training part unless inverted,
    /// in which case fold 1 becomes the test part.
    pub invert_folds: bool,
    /// Retain the true test labels for diagnostics only; never consulted
    /// by the learning algorithm.
    pub use_insight: bool,
    /// Fixed neighborhood size; skips the internal k selection.
    pub k: Option<usize>,
    /// Largest k tried by the internal cross-validation.
    pub k_cap: usize,
    /// Fold count for the internal k-selection cross-validation.
    pub cv_folds: usize,
    /// Naive linear-scan neighbor search instead of the norm-pruned
    /// index; both produce identical output.
    pub exhaustive_search: bool,
    /// Independent re-runs of the iteration procedure (0 = none).
    pub num_restarts: usize,
    /// Round cap per restart; 0 means unbounded.
    pub num_iterations: usize,
    /// Distance used by the neighbor search.
    pub distance: DistanceKind,
    /// Seed handed to the restart hooks.
    pub seed: u64,
}

impl Default for CollectiveConfig {
    fn default() -> CollectiveConfig {
        CollectiveConfig {
            folds: 10,
            invert_folds: false,
            use_insight: false,
            k: None,
            k_cap: 10,
            cv_folds: 5,
            exhaustive_search: true,
            num_restarts: 0,
            num_iterations: 0,
            distance: DistanceKind::Euclidean,
            seed: 1,
        }
    }
}

/// Shared build state passed through the pipeline instead of global
/// mutable fields: the configuration and the external interruption flag,
/// checked at the top of every round.
#[derive(Clone, Debug)]
pub struct BuildContext {
    pub config: CollectiveConfig,
    pub interrupt: Arc<AtomicBool>,
}

impl BuildContext {
    pub fn new(config: CollectiveConfig) -> BuildContext {
        BuildContext {
            config,
            interrupt: Arc::new(AtomicBool::new(false)),
        }
    }
}

/// One committed label, in resolution order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    /// Convergence round (1-based) in which the label was committed.
    pub round: usize,
    /// Index of the test instance within the test set.
    pub test_index: usize,
    pub label: Label,
    /// Labeled neighbors at commit time.
    pub evidence: usize,
    /// Top vote share among the labeled neighbors at commit time.
    pub agreement: f64,
}

/// The outcome of one converged run: the labels assigned to the test
/// set, the commit log, and a confidence score used to compare restarts.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Assignments {
    pub labels: Vec<Label>,
    pub commits: Vec<Commit>,
    pub rounds: usize,
    pub quality: f64,
}

/// A concrete collective algorithm, driven by the
/// [`IterationController`] through repeated `step()` calls until
/// `is_done()`.
pub trait CollectiveAlgorithm {
    /// Rejects attribute or class types the algorithm cannot handle.
    fn check_capability(&self, schema: &Schema) -> Result<()>;

    /// Builds the algorithm's internal state over the train/test pool.
    /// The test set's labels have already been blanked by the caller.
    fn initialize(&mut self, train: &Dataset, test: &Dataset, k: usize) -> Result<()>;

    /// Runs one convergence round and returns how many test instances
    /// it resolved. `step()` is not reentrant and runs to completion.
    fn step(&mut self) -> Result<usize>;

    /// True once every test instance is resolved.
    fn is_done(&self) -> bool;

    /// Number of test instances still unresolved.
    fn unresolved(&self) -> usize;

    /// Confidence score of the current state; only used to order
    /// restarts, higher is better.
    fn quality(&self) -> f64;

    /// The converged result. Fails if any test instance is unresolved.
    fn assignments(&self) -> Result<Assignments>;
}

/// Restart capability: hooks for algorithms that explore different
/// initial label assignments across restarts. The defaults no-op, which
/// is the correct behavior for deterministic algorithms such as
/// [`KnnPropagation`].
pub trait Restartable: CollectiveAlgorithm {
    /// Called after `initialize()` on every restart with a
    /// restart-specific seed.
    fn initialize_labels(&mut self, _seed: u64) -> Result<()> {
        Ok(())
    }

    /// Called on restarts after the first, before iterating.
    fn flip_labels(&mut self) {}
}

/// A built collective classifier: the two explicit build entry points,
/// prediction, and reset.
pub trait CollectiveModel {
    /// Builds the model from a labeled training set and the unlabeled
    /// test set whose labels are to be inferred.
    fn build(&mut self, train: &Dataset, test: &Dataset) -> Result<()>;

    /// Builds from a training set alone, splitting it internally into a
    /// train/test pair according to the configured fold scheme.
    fn build_internal(&mut self, train: &Dataset) -> Result<()>;

    /// Class distribution for an instance in the resolved pool.
    ///
    /// Takes `&mut self` because a classifier with staged data and no
    /// model yet performs its (documented) lazy build here.
    fn predict(&mut self, features: &ArrayView1<f64>) -> Result<Vec<f64>>;

    /// Drops the built model, keeping the configuration.
    fn reset(&mut self);
}
