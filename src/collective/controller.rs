//! The generic iteration/restart harness and the finished model.
//!
//! [`IterationController`] is parameterized over any type implementing
//! the `initialize`/`step`/`is_done` cycle: it splits a single input set
//! into an internal train/test pair when no explicit test set is given,
//! validates the inputs, blanks the test labels (this is what makes the
//! task transductive), drives the convergence loop with up to the
//! configured number of restarts, and assembles the winning result into
//! a [`TransductiveModel`].
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ndarray::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::collective::error::{CollectiveError, Result};
use crate::collective::kselect::{fold_bounds, select_k};
use crate::collective::neighbors::SearchStrategy;
use crate::collective::propagate::KnnPropagation;
use crate::collective::{
    Assignments, BuildContext, CollectiveConfig, CollectiveModel, Commit, Restartable,
};
use crate::dataset::{feature_key, Dataset, Schema};
use crate::Label;

pub struct IterationController {
    ctx: BuildContext,
}

impl IterationController {
    pub fn new(ctx: BuildContext) -> IterationController {
        IterationController { ctx }
    }

    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.ctx.interrupt)
    }

    /// Splits `train` into an internal train/test pair: fold 1 (the
    /// first `n/F` rows) becomes the training part unless inverted, in
    /// which case fold 1 becomes the test part. `F = 0` or `F = 1`
    /// means no split, so the test set is a copy of the training set.
    pub fn split_internal(train: &Dataset, folds: usize, invert: bool) -> (Dataset, Dataset) {
        if folds < 2 {
            return (train.clone(), train.clone());
        }
        let n = train.len();
        let (_, hi) = fold_bounds(n, folds, 0);
        let first: Vec<usize> = (0..hi).collect();
        let rest: Vec<usize> = (hi..n).collect();
        if invert {
            (train.select_rows(&rest), train.select_rows(&first))
        } else {
            (train.select_rows(&first), train.select_rows(&rest))
        }
    }

    /// Builds a model: validates the inputs, fixes the neighborhood
    /// size, and runs the algorithm's convergence cycle across restarts,
    /// keeping the best-scoring converged result.
    pub fn build<A: Restartable>(
        &self,
        algorithm: &mut A,
        train: &Dataset,
        test: Option<&Dataset>,
    ) -> Result<TransductiveModel> {
        let config = &self.ctx.config;

        if train.is_empty() {
            return Err(CollectiveError::Config("training set is empty".into()));
        }
        // Rows with a missing class carry no information for training.
        let train = train.drop_missing_class();
        if train.is_empty() {
            return Err(CollectiveError::Config(
                "training set has no labeled instances".into(),
            ));
        }

        let test = match test {
            Some(t) => {
                if !train.schema().compatible(t.schema()) {
                    return Err(CollectiveError::Config(
                        "train and test sets have incompatible headers".into(),
                    ));
                }
                t.clone()
            }
            None => {
                let (split_train, split_test) =
                    Self::split_internal(&train, config.folds, config.invert_folds);
                debug!(
                    train = split_train.len(),
                    test = split_test.len(),
                    folds = config.folds,
                    invert = config.invert_folds,
                    "internal train/test split"
                );
                return self.build_split(algorithm, split_train, split_test);
            }
        };

        self.build_split(algorithm, train, test)
    }

    fn build_split<A: Restartable>(
        &self,
        algorithm: &mut A,
        train: Dataset,
        test: Dataset,
    ) -> Result<TransductiveModel> {
        let config = &self.ctx.config;

        algorithm.check_capability(train.schema())?;
        if test.is_empty() {
            return Err(CollectiveError::Config("test set is empty".into()));
        }

        // Diagnostic-only snapshot of the true test labels; never
        // consulted by the learning algorithm.
        let insight = if config.use_insight {
            Some(test.labels().to_vec())
        } else {
            None
        };
        // The private test copy enters learning with every class value
        // missing; the caller-supplied set is never mutated.
        let test = test.blank_labels();

        let k = match config.k {
            Some(k) => k,
            None => select_k(&train, config.cv_folds, config.k_cap, config.distance)?,
        };
        info!(k, train = train.len(), test = test.len(), "building model");

        let total_runs = config.num_restarts + 1;
        let mut best: Option<(usize, Assignments)> = None;

        for restart in 0..total_runs {
            algorithm.initialize(&train, &test, k)?;
            algorithm.initialize_labels(config.seed.wrapping_add(restart as u64))?;
            if restart > 0 {
                algorithm.flip_labels();
            }

            self.iterate(algorithm)?;
            let result = algorithm.assignments()?;
            debug!(
                restart,
                rounds = result.rounds,
                quality = result.quality,
                "restart converged"
            );
            let better = best
                .as_ref()
                .map_or(true, |(_, b)| result.quality > b.quality);
            if better {
                best = Some((restart, result));
            }
        }

        // total_runs >= 1 and every failed restart returned early above.
        let (best_restart, result) = best.ok_or(CollectiveError::NoProgress {
            round: 0,
            unresolved: test.len(),
        })?;

        let mut resolved_test = test;
        for (i, y) in result.labels.iter().enumerate() {
            resolved_test.set_label(i, Some(*y));
        }

        TransductiveModel::new(
            train,
            resolved_test,
            k,
            result,
            total_runs,
            best_restart,
            insight,
        )
    }

    /// Drives `step()` until `is_done()`, checking the interruption flag
    /// at the top of every round and enforcing the convergence
    /// invariant: a round that resolves nothing while instances remain
    /// unresolved aborts the build.
    fn iterate<A: Restartable>(&self, algorithm: &mut A) -> Result<()> {
        let cap = self.ctx.config.num_iterations;
        let mut rounds = 0;

        while !algorithm.is_done() {
            if self.ctx.interrupt.load(Ordering::Relaxed) {
                return Err(CollectiveError::Interrupted { round: rounds + 1 });
            }
            if cap > 0 && rounds >= cap {
                return Err(CollectiveError::Config(format!(
                    "round cap {} reached with {} test instances unresolved",
                    cap,
                    algorithm.unresolved()
                )));
            }
            let committed = algorithm.step()?;
            rounds += 1;
            if committed == 0 && !algorithm.is_done() {
                return Err(CollectiveError::NoProgress {
                    round: rounds,
                    unresolved: algorithm.unresolved(),
                });
            }
        }
        Ok(())
    }
}

/// A finished transductive model: the training snapshot, the resolved
/// test copy, the determined neighborhood size, and the commit log.
/// Predictions are pure lookups into the resolved pool.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransductiveModel {
    train: Dataset,
    test: Dataset,
    determined_k: usize,
    num_classes: usize,
    commits: Vec<Commit>,
    rounds: usize,
    restarts: usize,
    best_restart: usize,
    insight_labels: Option<Vec<Option<Label>>>,
    // Exact-match table from feature keys to committed labels; rebuilt
    // lazily (predictions fall back to a pool scan) after
    // deserialization.
    #[serde(skip)]
    lookup: HashMap<Vec<u64>, Label>,
}

impl TransductiveModel {
    fn new(
        train: Dataset,
        test: Dataset,
        determined_k: usize,
        result: Assignments,
        restarts: usize,
        best_restart: usize,
        insight_labels: Option<Vec<Option<Label>>>,
    ) -> Result<TransductiveModel> {
        let num_classes = train.schema().num_classes().ok_or_else(|| {
            CollectiveError::Capability(
                "a transductive model requires a nominal class attribute".into(),
            )
        })?;
        let mut model = TransductiveModel {
            train,
            test,
            determined_k,
            num_classes,
            commits: result.commits,
            rounds: result.rounds,
            restarts,
            best_restart,
            insight_labels,
            lookup: HashMap::new(),
        };
        model.lookup = model.build_lookup();
        Ok(model)
    }

    fn build_lookup(&self) -> HashMap<Vec<u64>, Label> {
        let mut lookup = HashMap::with_capacity(self.train.len() + self.test.len());
        for ds in [&self.train, &self.test] {
            for (i, row) in ds.features().outer_iter().enumerate() {
                if let Some(y) = ds.label(i) {
                    lookup.entry(feature_key(&row)).or_insert(y);
                }
            }
        }
        lookup
    }

    /// Restores the lookup table after deserialization.
    pub fn rebuild_lookup(&mut self) {
        self.lookup = self.build_lookup();
    }

    /// Class distribution (one-hot over the committed label) for an
    /// instance whose features exactly match a resolved pool instance.
    pub fn predict(&self, features: &ArrayView1<f64>) -> Result<Vec<f64>> {
        let mut dist = vec![0.0; self.num_classes];
        dist[self.predicted_label(features)?] = 1.0;
        Ok(dist)
    }

    /// Committed label for an instance in the resolved pool.
    pub fn predicted_label(&self, features: &ArrayView1<f64>) -> Result<Label> {
        if features.len() != self.train.schema().num_features() {
            return Err(CollectiveError::Config(format!(
                "query has {} features, schema declares {}",
                features.len(),
                self.train.schema().num_features()
            )));
        }
        let key = feature_key(features);
        if !self.lookup.is_empty() {
            return self.lookup.get(&key).copied().ok_or(CollectiveError::LookupMiss);
        }
        // Deserialized model without a rebuilt table: scan the pool.
        for ds in [&self.train, &self.test] {
            for (i, row) in ds.features().outer_iter().enumerate() {
                if feature_key(&row) == key {
                    if let Some(y) = ds.label(i) {
                        return Ok(y);
                    }
                }
            }
        }
        Err(CollectiveError::LookupMiss)
    }

    pub fn schema(&self) -> &Schema {
        self.train.schema()
    }

    pub fn train(&self) -> &Dataset {
        &self.train
    }

    pub fn test(&self) -> &Dataset {
        &self.test
    }

    pub fn determined_k(&self) -> usize {
        self.determined_k
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Commit log in resolution order.
    pub fn commits(&self) -> &[Commit] {
        &self.commits
    }

    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// Which restart produced the kept result.
    pub fn best_restart(&self) -> usize {
        self.best_restart
    }

    /// Did any restart beat restart 0?
    pub fn improved_over_first(&self) -> bool {
        self.best_restart != 0
    }

    /// True test labels, retained only when insight mode was enabled.
    pub fn insight_labels(&self) -> Option<&[Option<Label>]> {
        self.insight_labels.as_deref()
    }

    /// Labels committed to the test set, in test order.
    pub fn test_predictions(&self) -> Vec<Label> {
        self.test.labels().iter().map(|y| y.unwrap_or(0)).collect()
    }

    /// Textual summary for reporting.
    pub fn summary(&self) -> String {
        format!(
            "collective k-NN model\n\
             instances: {} train / {} test\n\
             determined k: {}\n\
             rounds to convergence: {}\n\
             restarts: {} (kept restart {}{})",
            self.train.len(),
            self.test.len(),
            self.determined_k,
            self.rounds,
            self.restarts,
            self.best_restart,
            if self.improved_over_first() {
                ", improved over restart 0"
            } else {
                ""
            }
        )
    }
}

/// The user-facing collective k-NN classifier: configuration plus the
/// iteration controller and the propagation engine.
///
/// The two build entry points are explicit: [`CollectiveModel::build`]
/// with a test set, and [`CollectiveModel::build_internal`] with a
/// training set alone. Data may also be staged without building, in
/// which case the first `predict` performs the documented lazy build:
/// exactly once when a test set is staged, or into a transient
/// internally-split model (not persisted as the real test set) when only
/// training data is staged.
pub struct KnnCollective {
    config: CollectiveConfig,
    controller: IterationController,
    staged_train: Option<Dataset>,
    staged_test: Option<Dataset>,
    model: Option<TransductiveModel>,
    transient: Option<TransductiveModel>,
}

impl KnnCollective {
    pub fn new(config: CollectiveConfig) -> KnnCollective {
        let controller = IterationController::new(BuildContext::new(config.clone()));
        KnnCollective {
            config,
            controller,
            staged_train: None,
            staged_test: None,
            model: None,
            transient: None,
        }
    }

    /// Flag observed at the top of every convergence round; setting it
    /// aborts an in-progress build.
    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        self.controller.interrupt_flag()
    }

    /// Stages data without building; the first `predict` builds lazily.
    pub fn stage(&mut self, train: Dataset, test: Option<Dataset>) {
        self.staged_train = Some(train);
        self.staged_test = test;
        self.model = None;
        self.transient = None;
    }

    pub fn model(&self) -> Option<&TransductiveModel> {
        self.model.as_ref()
    }

    fn engine(&self) -> KnnPropagation {
        let strategy = if self.config.exhaustive_search {
            SearchStrategy::Exhaustive
        } else {
            SearchStrategy::NormIndexed
        };
        KnnPropagation::new(self.config.distance, strategy)
    }
}

impl CollectiveModel for KnnCollective {
    fn build(&mut self, train: &Dataset, test: &Dataset) -> Result<()> {
        let mut engine = self.engine();
        self.model = Some(self.controller.build(&mut engine, train, Some(test))?);
        self.transient = None;
        Ok(())
    }

    fn build_internal(&mut self, train: &Dataset) -> Result<()> {
        let mut engine = self.engine();
        self.model = Some(self.controller.build(&mut engine, train, None)?);
        self.transient = None;
        Ok(())
    }

    fn predict(&mut self, features: &ArrayView1<f64>) -> Result<Vec<f64>> {
        if self.model.is_none() {
            let train = match &self.staged_train {
                Some(t) => t.clone(),
                None => {
                    return Err(CollectiveError::Config(
                        "no model built and no data staged".into(),
                    ))
                }
            };
            match self.staged_test.clone() {
                Some(test) => {
                    // Lazy build on first predict; state transitions to
                    // built thereafter.
                    self.build(&train, &test)?;
                }
                None => {
                    if self.transient.is_none() {
                        let mut engine = self.engine();
                        self.transient =
                            Some(self.controller.build(&mut engine, &train, None)?);
                    }
                    return match &self.transient {
                        Some(m) => m.predict(features),
                        None => Err(CollectiveError::Config(
                            "transient build did not complete".into(),
                        )),
                    };
                }
            }
        }
        match &self.model {
            Some(m) => m.predict(features),
            None => Err(CollectiveError::Config("build did not complete".into())),
        }
    }

    fn reset(&mut self) {
        self.model = None;
        self.transient = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collective::CollectiveAlgorithm;
    use crate::dataset::AttributeKind;

    fn binary_schema() -> Schema {
        Schema::new(
            vec![AttributeKind::Numeric, AttributeKind::Nominal(2)],
            None,
        )
        .unwrap()
    }

    fn dataset(rows: &[[f64; 2]]) -> Dataset {
        let raw = Array2::from_shape_vec(
            (rows.len(), 2),
            rows.iter().flatten().copied().collect(),
        )
        .unwrap();
        Dataset::from_matrix(binary_schema(), raw).unwrap()
    }

    fn hundred_rows() -> Dataset {
        let rows: Vec<[f64; 2]> = (0..100)
            .map(|i| [i as f64, (i % 2) as f64])
            .collect();
        dataset(&rows)
    }

    fn clusters() -> (Dataset, Dataset) {
        let train = dataset(&[
            [0.0, 0.0],
            [1.0, 0.0],
            [2.0, 0.0],
            [3.0, 0.0],
            [4.0, 0.0],
            [20.0, 1.0],
            [21.0, 1.0],
            [22.0, 1.0],
            [23.0, 1.0],
            [24.0, 1.0],
        ]);
        let test = dataset(&[[1.5, f64::NAN], [21.5, f64::NAN]]);
        (train, test)
    }

    fn config_with_k(k: usize) -> CollectiveConfig {
        let mut config = CollectiveConfig::default();
        config.k = Some(k);
        config
    }

    #[test]
    fn split_arithmetic() {
        let train = hundred_rows();

        let (tr, te) = IterationController::split_internal(&train, 5, false);
        assert_eq!(tr.len(), 20);
        assert_eq!(te.len(), 80);

        let (tr, te) = IterationController::split_internal(&train, 5, true);
        assert_eq!(tr.len(), 80);
        assert_eq!(te.len(), 20);

        let (tr, te) = IterationController::split_internal(&train, 0, false);
        assert_eq!(tr.len(), 100);
        assert_eq!(te.features(), train.features());
        assert_eq!(te.labels(), train.labels());
    }

    #[test]
    fn build_resolves_test_labels() {
        let (train, test) = clusters();
        let mut classifier = KnnCollective::new(config_with_k(3));
        classifier.build(&train, &test).unwrap();

        let model = classifier.model().unwrap();
        assert_eq!(model.test_predictions(), vec![0, 1]);
        assert_eq!(model.determined_k(), 3);

        assert_eq!(
            classifier.predict(&array![1.5].view()).unwrap(),
            vec![1.0, 0.0]
        );
        assert_eq!(
            classifier.predict(&array![21.5].view()).unwrap(),
            vec![0.0, 1.0]
        );
        // Training instances are in the resolved pool too.
        assert_eq!(
            classifier.predict(&array![20.0].view()).unwrap(),
            vec![0.0, 1.0]
        );
    }

    #[test]
    fn original_sets_are_never_mutated() {
        let (train, test) = clusters();
        let train_before = train.clone();
        let test_before = test.clone();

        let mut classifier = KnnCollective::new(config_with_k(3));
        classifier.build(&train, &test).unwrap();

        assert_eq!(train.features(), train_before.features());
        assert_eq!(train.labels(), train_before.labels());
        assert_eq!(test.features(), test_before.features());
        assert_eq!(test.labels(), test_before.labels());
    }

    #[test]
    fn incompatible_headers_are_rejected() {
        let (train, _) = clusters();
        let other_schema = Schema::new(
            vec![
                AttributeKind::Numeric,
                AttributeKind::Numeric,
                AttributeKind::Nominal(2),
            ],
            None,
        )
        .unwrap();
        let test = Dataset::from_matrix(other_schema, array![[1.0, 2.0, f64::NAN]]).unwrap();

        let mut classifier = KnnCollective::new(config_with_k(3));
        assert!(matches!(
            classifier.build(&train, &test),
            Err(CollectiveError::Config(_))
        ));
    }

    #[test]
    fn k_selection_ignores_test_content() {
        let (train, test_a) = clusters();
        let test_b = dataset(&[[7.0, f64::NAN], [13.0, f64::NAN]]);

        let mut config = CollectiveConfig::default();
        config.k_cap = 3;
        config.cv_folds = 2;

        let mut a = KnnCollective::new(config.clone());
        a.build(&train, &test_a).unwrap();
        let mut b = KnnCollective::new(config);
        b.build(&train, &test_b).unwrap();

        assert_eq!(
            a.model().unwrap().determined_k(),
            b.model().unwrap().determined_k()
        );
    }

    #[test]
    fn lazy_build_on_first_predict() {
        let (train, test) = clusters();
        let mut classifier = KnnCollective::new(config_with_k(3));
        classifier.stage(train, Some(test));
        assert!(classifier.model().is_none());

        assert_eq!(
            classifier.predict(&array![1.5].view()).unwrap(),
            vec![1.0, 0.0]
        );
        // The lazy build happened exactly once and persisted.
        assert!(classifier.model().is_some());
    }

    #[test]
    fn predict_without_test_uses_transient_split() {
        let (train, _) = clusters();
        let mut config = config_with_k(1);
        config.folds = 2;
        let mut classifier = KnnCollective::new(config);
        classifier.stage(train.clone(), None);

        // Predicting a training instance works via the transient model.
        let dist = classifier.predict(&train.row(0)).unwrap();
        assert_eq!(dist.len(), 2);
        // The transient split is not persisted as the real model.
        assert!(classifier.model().is_none());
    }

    #[test]
    fn lookup_miss_does_not_invalidate_model() {
        let (train, test) = clusters();
        let mut classifier = KnnCollective::new(config_with_k(3));
        classifier.build(&train, &test).unwrap();

        assert!(matches!(
            classifier.predict(&array![555.0].view()),
            Err(CollectiveError::LookupMiss)
        ));
        // The model still answers pool queries afterwards.
        assert_eq!(
            classifier.predict(&array![1.5].view()).unwrap(),
            vec![1.0, 0.0]
        );
    }

    #[test]
    fn interruption_aborts_the_build() {
        let (train, test) = clusters();
        let mut classifier = KnnCollective::new(config_with_k(3));
        classifier.interrupt_flag().store(true, Ordering::Relaxed);

        assert!(matches!(
            classifier.build(&train, &test),
            Err(CollectiveError::Interrupted { .. })
        ));
    }

    #[test]
    fn insight_labels_are_retained_but_unused() {
        let (train, mut test_raw) = clusters();
        // Give the test set true labels; they must be blanked for
        // learning but retained for diagnostics.
        test_raw.set_label(0, Some(1));
        test_raw.set_label(1, Some(0));

        let mut config = config_with_k(3);
        config.use_insight = true;
        let mut classifier = KnnCollective::new(config);
        classifier.build(&train, &test_raw).unwrap();

        let model = classifier.model().unwrap();
        assert_eq!(model.insight_labels(), Some(&[Some(1), Some(0)][..]));
        // Learning ignored the (deliberately wrong) true labels.
        assert_eq!(model.test_predictions(), vec![0, 1]);
    }

    // A deliberately broken algorithm whose rank computation never lets
    // any instance commit.
    struct Stalling {
        pending: usize,
    }

    impl CollectiveAlgorithm for Stalling {
        fn check_capability(&self, _schema: &Schema) -> Result<()> {
            Ok(())
        }
        fn initialize(&mut self, _train: &Dataset, test: &Dataset, _k: usize) -> Result<()> {
            self.pending = test.len();
            Ok(())
        }
        fn step(&mut self) -> Result<usize> {
            Ok(0)
        }
        fn is_done(&self) -> bool {
            self.pending == 0
        }
        fn unresolved(&self) -> usize {
            self.pending
        }
        fn quality(&self) -> f64 {
            0.0
        }
        fn assignments(&self) -> Result<Assignments> {
            Err(CollectiveError::NoProgress {
                round: 0,
                unresolved: self.pending,
            })
        }
    }

    impl Restartable for Stalling {}

    #[test]
    fn stalled_algorithm_raises_no_progress() {
        let (train, test) = clusters();
        let controller = IterationController::new(BuildContext::new(config_with_k(1)));
        let mut broken = Stalling { pending: 0 };

        assert!(matches!(
            controller.build(&mut broken, &train, Some(&test)),
            Err(CollectiveError::NoProgress {
                round: 1,
                unresolved: 2
            })
        ));
    }

    // Converges in one round with a scripted per-restart quality, to
    // exercise the restart bookkeeping.
    struct Scripted {
        qualities: Vec<f64>,
        restart: usize,
        runs: usize,
        test_len: usize,
        done: bool,
    }

    impl CollectiveAlgorithm for Scripted {
        fn check_capability(&self, _schema: &Schema) -> Result<()> {
            Ok(())
        }
        fn initialize(&mut self, _train: &Dataset, test: &Dataset, _k: usize) -> Result<()> {
            self.restart = self.runs;
            self.runs += 1;
            self.test_len = test.len();
            self.done = false;
            Ok(())
        }
        fn step(&mut self) -> Result<usize> {
            self.done = true;
            Ok(self.test_len)
        }
        fn is_done(&self) -> bool {
            self.done
        }
        fn unresolved(&self) -> usize {
            if self.done {
                0
            } else {
                self.test_len
            }
        }
        fn quality(&self) -> f64 {
            self.qualities[self.restart]
        }
        fn assignments(&self) -> Result<Assignments> {
            Ok(Assignments {
                labels: vec![0; self.test_len],
                commits: Vec::new(),
                rounds: 1,
                quality: self.quality(),
            })
        }
    }

    impl Restartable for Scripted {}

    #[test]
    fn restart_harness_keeps_the_best_run() {
        let (train, test) = clusters();
        let mut config = config_with_k(1);
        config.num_restarts = 2;
        let controller = IterationController::new(BuildContext::new(config));

        let mut scripted = Scripted {
            qualities: vec![0.4, 0.9, 0.6],
            restart: 0,
            runs: 0,
            test_len: 0,
            done: false,
        };
        let model = controller.build(&mut scripted, &train, Some(&test)).unwrap();

        assert_eq!(model.best_restart(), 1);
        assert!(model.improved_over_first());
    }

    #[test]
    fn round_cap_aborts_unconverged_runs() {
        let train = dataset(&[[0.0, 0.0], [0.2, 0.0], [0.4, 0.0]]);
        let test = dataset(&[[1.0, f64::NAN], [2.0, f64::NAN]]);

        // This input needs two rounds; a cap of one must abort.
        let mut config = config_with_k(2);
        config.num_iterations = 1;
        let mut classifier = KnnCollective::new(config);
        assert!(matches!(
            classifier.build(&train, &test),
            Err(CollectiveError::Config(_))
        ));

        let mut config = config_with_k(2);
        config.num_iterations = 2;
        let mut classifier = KnnCollective::new(config);
        classifier.build(&train, &test).unwrap();
    }

    #[test]
    fn model_summary_mentions_k_and_sizes() {
        let (train, test) = clusters();
        let mut classifier = KnnCollective::new(config_with_k(3));
        classifier.build(&train, &test).unwrap();

        let summary = classifier.model().unwrap().summary();
        assert!(summary.contains("determined k: 3"));
        assert!(summary.contains("10 train / 2 test"));
    }
}
