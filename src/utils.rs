//! Utility routines for loading CSV data and preparing it for a build.
use std::collections::HashMap;
use std::error::Error;

use csv::ReaderBuilder;
use ndarray::prelude::*;

use transknn::dataset::{AttributeKind, Dataset, Schema};
use transknn::Label;

/// Loads a CSV data file.
///
/// The file format should be, for each row:
///     label, x1, x2, ...
/// where x1, x2, ... are features forming a feature vector. A `?` in
/// the label column means the class is unknown; a `?` in a feature
/// column means that value is missing.
pub fn load_data(fname: &str) -> Result<(Array2<f64>, Vec<Option<Label>>), Box<dyn Error>> {
    let mut reader = ReaderBuilder::new().has_headers(false).from_path(fname)?;

    let mut inputs: Vec<f64> = Vec::new();
    let mut targets: Vec<Option<Label>> = Vec::new();
    let mut ncols: Option<usize> = None;

    for result in reader.records() {
        let record = result?;

        for field in record.iter().skip(1) {
            let field = field.trim();
            if field == "?" {
                inputs.push(f64::NAN);
            } else {
                inputs.push(field.parse::<f64>().map_err(|_| {
                    format!("could not parse feature value {:?} in {}", field, fname)
                })?);
            }
        }

        let label = record[0].trim();
        if label == "?" {
            targets.push(None);
        } else {
            targets.push(Some(label.parse::<Label>().map_err(|_| {
                format!("could not parse label {:?} in {}", label, fname)
            })?));
        }

        if let Some(x) = ncols {
            if x != record.len() - 1 {
                return Err(format!("{} has rows of unequal length", fname).into());
            }
        } else {
            ncols = Some(record.len() - 1);
        }
    }

    let inputs_a = if let Some(d) = ncols {
        let n = inputs.len() / d;
        Array::from_vec(inputs).into_shape((n, d))?
    } else {
        return Err(format!("{} is empty", fname).into());
    };

    Ok((inputs_a, targets))
}

/// Remaps labels to zero-based increasing ids, in first-appearance
/// order. A missing label stays missing. Passing the mapping of a
/// previous call extends it consistently.
pub fn remap_labels(
    labels: &[Option<Label>],
    mapping: Option<HashMap<Label, Label>>,
) -> (Vec<Option<Label>>, HashMap<Label, Label>) {
    let mut mapping = mapping.unwrap_or_default();
    let mut next_id = mapping.values().max().map_or(0, |id| id + 1);

    let out = labels
        .iter()
        .map(|y| {
            y.map(|y| {
                *mapping.entry(y).or_insert_with(|| {
                    next_id += 1;
                    next_id - 1
                })
            })
        })
        .collect();

    (out, mapping)
}

/// Scales columns' values in [0,1] with min-max scaling; constant and
/// all-missing columns are left as they are.
pub fn scale01(matrix: &mut Array2<f64>) {
    let mut max = Array::ones(matrix.ncols()) * -f64::INFINITY;
    let mut min = Array::ones(matrix.ncols()) * f64::INFINITY;

    for row in matrix.outer_iter() {
        for i in 0..row.len() {
            if row[i].is_nan() {
                continue;
            }
            if min[i] > row[i] {
                min[i] = row[i];
            }
            if max[i] < row[i] {
                max[i] = row[i];
            }
        }
    }

    for mut row in matrix.outer_iter_mut() {
        for i in 0..row.len() {
            if max[i] > min[i] {
                row[i] = (row[i] - min[i]) / (max[i] - min[i]);
            }
        }
    }
}

/// Estimates the priors on the known labels, and computes the random
/// guessing error as 1 - max priors.
pub fn estimate_random_guessing(labels: &[Option<Label>]) -> f64 {
    let mut counts = HashMap::new();
    let mut max_count = 0;
    let mut total = 0;

    for y in labels.iter().flatten() {
        let count = counts.entry(y).or_insert(0);
        *count += 1;
        total += 1;
        if *count > max_count {
            max_count = *count;
        }
    }

    if total == 0 {
        return 0.0;
    }
    1.0 - max_count as f64 / total as f64
}

/// Wraps loaded numeric features and remapped labels into a dataset
/// with an all-numeric schema and a nominal class of the given
/// cardinality.
pub fn build_dataset(
    x: Array2<f64>,
    y: Vec<Option<Label>>,
    num_classes: usize,
) -> Result<Dataset, Box<dyn Error>> {
    let mut attributes = vec![AttributeKind::Numeric; x.ncols()];
    attributes.push(AttributeKind::Nominal(num_classes));
    let schema = Schema::new(attributes, None)?;
    Ok(Dataset::from_parts(schema, x, y)?)
}
