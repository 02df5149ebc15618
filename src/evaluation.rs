//! Evaluation of a finished model against a labeled dataset.
//!
//! The evaluator only relies on the model's prediction lookup and
//! schema; it is a consumer of the core, not part of it.
use std::collections::HashMap;

use ndarray::prelude::*;

use crate::collective::{CollectiveError, Result, TransductiveModel};
use crate::Label;

/// Aggregate classification metrics over a labeled set.
#[derive(Clone, Debug, PartialEq)]
pub struct Metrics {
    pub total: usize,
    pub error_count: usize,
    /// confusion[(truth, predicted)] = count.
    pub confusion: HashMap<(Label, Label), usize>,
}

impl Metrics {
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        1.0 - self.error_rate()
    }

    pub fn error_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.error_count as f64 / self.total as f64
    }
}

/// Scores the model's pool predictions against the labels of `x`/`y`.
/// Rows with a missing label are skipped; every labeled row must be
/// present in the model's resolved pool.
pub fn score(
    model: &TransductiveModel,
    x: &Array2<f64>,
    y: &[Option<Label>],
) -> Result<Metrics> {
    if x.nrows() != y.len() {
        return Err(CollectiveError::Config(format!(
            "{} feature rows but {} labels",
            x.nrows(),
            y.len()
        )));
    }

    let mut total = 0;
    let mut error_count = 0;
    let mut confusion = HashMap::new();

    for (row, label) in x.outer_iter().zip(y.iter()) {
        let truth = match label {
            Some(y) => *y,
            None => continue,
        };
        let predicted = model.predicted_label(&row)?;
        total += 1;
        if predicted != truth {
            error_count += 1;
        }
        *confusion.entry((truth, predicted)).or_insert(0) += 1;
    }

    Ok(Metrics {
        total,
        error_count,
        confusion,
    })
}

/// Transductive accuracy of the model on its own test set, available
/// only when the build retained the true labels (insight mode).
pub fn insight_score(model: &TransductiveModel) -> Option<Metrics> {
    let truths = model.insight_labels()?;
    let predictions = model.test_predictions();

    let mut total = 0;
    let mut error_count = 0;
    let mut confusion = HashMap::new();
    for (truth, predicted) in truths.iter().zip(predictions.iter()) {
        let truth = match truth {
            Some(y) => *y,
            None => continue,
        };
        total += 1;
        if *predicted != truth {
            error_count += 1;
        }
        *confusion.entry((truth, *predicted)).or_insert(0) += 1;
    }

    Some(Metrics {
        total,
        error_count,
        confusion,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collective::{CollectiveConfig, CollectiveModel, KnnCollective};
    use crate::dataset::{AttributeKind, Dataset, Schema};

    fn built_classifier(use_insight: bool) -> KnnCollective {
        let schema = Schema::new(
            vec![AttributeKind::Numeric, AttributeKind::Nominal(2)],
            None,
        )
        .unwrap();
        let train = Dataset::from_matrix(
            schema.clone(),
            array![
                [0.0, 0.0],
                [1.0, 0.0],
                [2.0, 0.0],
                [20.0, 1.0],
                [21.0, 1.0],
                [22.0, 1.0]
            ],
        )
        .unwrap();
        let test = Dataset::from_matrix(schema, array![[1.5, 0.0], [21.5, 0.0]]).unwrap();

        let mut config = CollectiveConfig::default();
        config.k = Some(3);
        config.use_insight = use_insight;
        let mut classifier = KnnCollective::new(config);
        classifier.build(&train, &test).unwrap();
        classifier
    }

    #[test]
    fn score_counts_errors_and_confusion() {
        let classifier = built_classifier(false);
        let model = classifier.model().unwrap();

        // True labels: the second one disagrees with the model.
        let x = array![[1.5], [21.5]];
        let y = vec![Some(0), Some(0)];
        let metrics = score(model, &x, &y).unwrap();

        assert_eq!(metrics.total, 2);
        assert_eq!(metrics.error_count, 1);
        assert_eq!(metrics.accuracy(), 0.5);
        assert_eq!(metrics.confusion.get(&(0, 0)), Some(&1));
        assert_eq!(metrics.confusion.get(&(0, 1)), Some(&1));
    }

    #[test]
    fn score_skips_missing_labels() {
        let classifier = built_classifier(false);
        let model = classifier.model().unwrap();

        let x = array![[1.5], [21.5]];
        let y = vec![Some(0), None];
        let metrics = score(model, &x, &y).unwrap();
        assert_eq!(metrics.total, 1);
        assert_eq!(metrics.error_count, 0);
    }

    #[test]
    fn score_fails_on_foreign_instances() {
        let classifier = built_classifier(false);
        let model = classifier.model().unwrap();

        let x = array![[999.0]];
        let y = vec![Some(0)];
        assert!(matches!(
            score(model, &x, &y),
            Err(CollectiveError::LookupMiss)
        ));
    }

    #[test]
    fn insight_score_requires_insight_mode() {
        let without = built_classifier(false);
        assert!(insight_score(without.model().unwrap()).is_none());

        let with = built_classifier(true);
        let metrics = insight_score(with.model().unwrap()).unwrap();
        // The staged test labels were [0, 0]; the model resolves
        // [0, 1], so one error.
        assert_eq!(metrics.total, 2);
        assert_eq!(metrics.error_count, 1);
    }
}
