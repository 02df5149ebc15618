//! Datasets of feature vectors with a possibly-missing class label per row.
//!
//! A [`Dataset`] couples a feature matrix with one label slot per row and
//! a [`Schema`] describing the attribute types and the class attribute
//! position. Missing feature values are encoded as `NaN`; a missing class
//! is `None`. Train and test sets taking part in the same build must have
//! equal schemas ("compatible headers").
use std::cmp::Ordering;

use ndarray::prelude::*;
use ndarray::concatenate;
use serde::{Deserialize, Serialize};

use crate::collective::{CollectiveError, Result};
use crate::Label;

/// Type of a single attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeKind {
    Numeric,
    /// Nominal attribute with the given number of distinct values;
    /// values are stored as zero-based integer codes.
    Nominal(usize),
}

/// Attribute types plus the class attribute position, shared by every
/// row of a [`Dataset`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    attributes: Vec<AttributeKind>,
    class_index: usize,
}

impl Schema {
    /// Creates a schema; the class attribute defaults to the last
    /// attribute when `class_index` is `None`.
    pub fn new(attributes: Vec<AttributeKind>, class_index: Option<usize>) -> Result<Schema> {
        if attributes.len() < 2 {
            return Err(CollectiveError::Config(
                "a schema needs at least one feature and a class attribute".into(),
            ));
        }
        let class_index = class_index.unwrap_or(attributes.len() - 1);
        if class_index >= attributes.len() {
            return Err(CollectiveError::Config(format!(
                "class index {} out of range for {} attributes",
                class_index,
                attributes.len()
            )));
        }
        Ok(Schema {
            attributes,
            class_index,
        })
    }

    pub fn attributes(&self) -> &[AttributeKind] {
        &self.attributes
    }

    pub fn class_index(&self) -> usize {
        self.class_index
    }

    pub fn class_kind(&self) -> AttributeKind {
        self.attributes[self.class_index]
    }

    /// Number of class values, if the class attribute is nominal.
    pub fn num_classes(&self) -> Option<usize> {
        match self.class_kind() {
            AttributeKind::Nominal(c) => Some(c),
            AttributeKind::Numeric => None,
        }
    }

    /// Number of feature attributes (class excluded).
    pub fn num_features(&self) -> usize {
        self.attributes.len() - 1
    }

    /// Feature attribute kinds, in feature-column order (class removed).
    pub fn feature_kinds(&self) -> Vec<AttributeKind> {
        self.attributes
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != self.class_index)
            .map(|(_, k)| *k)
            .collect()
    }

    /// Two schemas are compatible when their attribute types and class
    /// position coincide.
    pub fn compatible(&self, other: &Schema) -> bool {
        self == other
    }
}

/// An ordered sequence of instances sharing one schema.
///
/// The feature matrix holds the non-class columns in attribute order;
/// the class column is kept separately as `Option<Label>` per row.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Dataset {
    schema: Schema,
    x: Array2<f64>,
    y: Vec<Option<Label>>,
}

impl Dataset {
    /// Builds a dataset from an already-split feature matrix and label
    /// column.
    pub fn from_parts(schema: Schema, x: Array2<f64>, y: Vec<Option<Label>>) -> Result<Dataset> {
        if x.nrows() != y.len() {
            return Err(CollectiveError::Config(format!(
                "{} feature rows but {} labels",
                x.nrows(),
                y.len()
            )));
        }
        if x.ncols() != schema.num_features() {
            return Err(CollectiveError::Config(format!(
                "{} feature columns but schema declares {}",
                x.ncols(),
                schema.num_features()
            )));
        }
        let ds = Dataset { schema, x, y };
        ds.check_values()?;
        Ok(ds)
    }

    /// Builds a dataset from a full value matrix including the class
    /// column; `NaN` in the class column means a missing class.
    pub fn from_matrix(schema: Schema, raw: Array2<f64>) -> Result<Dataset> {
        if raw.ncols() != schema.attributes().len() {
            return Err(CollectiveError::Config(format!(
                "{} columns but schema declares {} attributes",
                raw.ncols(),
                schema.attributes().len()
            )));
        }
        let ci = schema.class_index();
        let mut y = Vec::with_capacity(raw.nrows());
        for row in raw.outer_iter() {
            let v = row[ci];
            if v.is_nan() {
                y.push(None);
            } else if v.fract() != 0.0 || v < 0.0 {
                return Err(CollectiveError::Config(format!(
                    "class value {} is not a non-negative integer code",
                    v
                )));
            } else {
                y.push(Some(v as Label));
            }
        }
        let feature_cols: Vec<usize> = (0..raw.ncols()).filter(|c| *c != ci).collect();
        let x = raw.select(Axis(1), &feature_cols);
        Dataset::from_parts(schema, x, y)
    }

    fn check_values(&self) -> Result<()> {
        if let Some(c) = self.schema.num_classes() {
            for y in self.y.iter().flatten() {
                if *y >= c {
                    return Err(CollectiveError::Config(format!(
                        "class code {} out of range for {} classes",
                        y, c
                    )));
                }
            }
        }
        for (kind, col) in self
            .schema
            .feature_kinds()
            .into_iter()
            .zip(self.x.axis_iter(Axis(1)))
        {
            if let AttributeKind::Nominal(card) = kind {
                for v in col.iter().filter(|v| !v.is_nan()) {
                    if v.fract() != 0.0 || *v < 0.0 || *v >= card as f64 {
                        return Err(CollectiveError::Config(format!(
                            "nominal value {} out of range for cardinality {}",
                            v, card
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn features(&self) -> &Array2<f64> {
        &self.x
    }

    pub fn labels(&self) -> &[Option<Label>] {
        &self.y
    }

    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    pub fn row(&self, i: usize) -> ArrayView1<f64> {
        self.x.row(i)
    }

    pub fn label(&self, i: usize) -> Option<Label> {
        self.y[i]
    }

    pub fn set_label(&mut self, i: usize, label: Option<Label>) {
        self.y[i] = label;
    }

    /// Copy of this dataset without the rows whose class is missing.
    pub fn drop_missing_class(&self) -> Dataset {
        let keep: Vec<usize> = (0..self.len()).filter(|i| self.y[*i].is_some()).collect();
        Dataset {
            schema: self.schema.clone(),
            x: self.x.select(Axis(0), &keep),
            y: keep.iter().map(|i| self.y[*i]).collect(),
        }
    }

    /// Copy of this dataset with every class value replaced by missing.
    pub fn blank_labels(&self) -> Dataset {
        Dataset {
            schema: self.schema.clone(),
            x: self.x.clone(),
            y: vec![None; self.len()],
        }
    }

    /// Copy restricted to the given row indices.
    pub fn select_rows(&self, rows: &[usize]) -> Dataset {
        Dataset {
            schema: self.schema.clone(),
            x: self.x.select(Axis(0), rows),
            y: rows.iter().map(|i| self.y[*i]).collect(),
        }
    }

    /// Stacks the feature matrices of `self` and `other` (train pool
    /// first). Schemas must already have been checked for compatibility.
    pub fn stack_features(&self, other: &Dataset) -> Array2<f64> {
        concatenate(Axis(0), &[self.x.view(), other.x.view()])
            .expect("stacking schema-compatible feature matrices cannot fail")
    }
}

/// Exact-match key for a feature row: the bit patterns of its values,
/// with every `NaN` collapsed to one canonical pattern so that missing
/// compares equal to missing and distinct from any value.
pub fn feature_key(row: &ArrayView1<f64>) -> Vec<u64> {
    row.iter()
        .map(|v| if v.is_nan() { f64::NAN.to_bits() } else { v.to_bits() })
        .collect()
}

/// Attribute-by-attribute ordering with a fixed tie rule: missing sorts
/// after any value.
pub fn cmp_rows(a: &ArrayView1<f64>, b: &ArrayView1<f64>) -> Ordering {
    for (va, vb) in a.iter().zip(b.iter()) {
        let ord = match (va.is_nan(), vb.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => va.partial_cmp(vb).unwrap_or(Ordering::Equal),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}

/// Distance functions available to the neighbor search.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceKind {
    /// Plain Euclidean distance; suitable for all-numeric schemas with
    /// no missing values.
    Euclidean,
    /// Heterogeneous distance: numeric attributes contribute their
    /// difference, nominal attributes 0/1 overlap, and a missing value
    /// always contributes the maximal difference 1.
    Mixed,
}

/// Returns the Euclidean distance between two feature vectors.
pub fn euclidean_distance(v1: &ArrayView1<f64>, v2: &ArrayView1<f64>) -> f64 {
    v1.iter()
        .zip(v2.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Distance between two feature rows under the given kind.
pub fn distance(
    kind: DistanceKind,
    feature_kinds: &[AttributeKind],
    a: &ArrayView1<f64>,
    b: &ArrayView1<f64>,
) -> f64 {
    match kind {
        DistanceKind::Euclidean => euclidean_distance(a, b),
        DistanceKind::Mixed => {
            let mut sum = 0.0;
            for ((va, vb), attr) in a.iter().zip(b.iter()).zip(feature_kinds.iter()) {
                let diff = if va.is_nan() || vb.is_nan() {
                    1.0
                } else {
                    match attr {
                        AttributeKind::Numeric => va - vb,
                        AttributeKind::Nominal(_) => {
                            if va == vb {
                                0.0
                            } else {
                                1.0
                            }
                        }
                    }
                };
                sum += diff * diff;
            }
            sum.sqrt()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary_schema(n_features: usize) -> Schema {
        let mut attrs = vec![AttributeKind::Numeric; n_features];
        attrs.push(AttributeKind::Nominal(2));
        Schema::new(attrs, None).unwrap()
    }

    #[test]
    fn class_defaults_to_last_attribute() {
        let schema = binary_schema(3);
        assert_eq!(schema.class_index(), 3);
        assert_eq!(schema.num_classes(), Some(2));
        assert_eq!(schema.num_features(), 3);
    }

    #[test]
    fn from_matrix_splits_class_column() {
        let schema = binary_schema(2);
        let ds = Dataset::from_matrix(
            schema,
            array![[1.0, 2.0, 0.0], [3.0, 4.0, 1.0], [5.0, 6.0, f64::NAN]],
        )
        .unwrap();

        assert_eq!(ds.len(), 3);
        assert_eq!(ds.features(), &array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]);
        assert_eq!(ds.labels(), &[Some(0), Some(1), None]);
    }

    #[test]
    fn from_matrix_rejects_bad_class_codes() {
        let schema = binary_schema(1);
        assert!(Dataset::from_matrix(schema.clone(), array![[1.0, 2.0]]).is_err());
        assert!(Dataset::from_matrix(schema, array![[1.0, 0.5]]).is_err());
    }

    #[test]
    fn drop_and_blank_labels() {
        let schema = binary_schema(1);
        let ds = Dataset::from_matrix(
            schema,
            array![[1.0, 0.0], [2.0, f64::NAN], [3.0, 1.0]],
        )
        .unwrap();

        let dropped = ds.drop_missing_class();
        assert_eq!(dropped.len(), 2);
        assert_eq!(dropped.labels(), &[Some(0), Some(1)]);

        let blank = ds.blank_labels();
        assert_eq!(blank.labels(), &[None, None, None]);
        // The source dataset is untouched.
        assert_eq!(ds.labels(), &[Some(0), None, Some(1)]);
    }

    #[test]
    fn feature_key_canonicalizes_missing() {
        let a = array![1.0, f64::NAN];
        let b = array![1.0, -f64::NAN];
        let c = array![1.0, 2.0];
        assert_eq!(feature_key(&a.view()), feature_key(&b.view()));
        assert_ne!(feature_key(&a.view()), feature_key(&c.view()));
    }

    #[test]
    fn missing_sorts_after_any_value() {
        let missing = array![f64::NAN];
        let value = array![1e300];
        assert_eq!(cmp_rows(&value.view(), &missing.view()), Ordering::Less);
        assert_eq!(cmp_rows(&missing.view(), &missing.view()), Ordering::Equal);
    }

    #[test]
    fn mixed_distance_handles_nominal_and_missing() {
        let kinds = [AttributeKind::Numeric, AttributeKind::Nominal(3)];
        let a = array![1.0, 2.0];
        let b = array![1.0, 1.0];
        let m = array![f64::NAN, 2.0];

        assert_eq!(distance(DistanceKind::Mixed, &kinds, &a.view(), &a.view()), 0.0);
        // Nominal mismatch contributes 1.
        assert_eq!(distance(DistanceKind::Mixed, &kinds, &a.view(), &b.view()), 1.0);
        // Missing numeric contributes the maximal difference 1.
        assert_eq!(distance(DistanceKind::Mixed, &kinds, &a.view(), &m.view()), 1.0);
    }

    #[test]
    fn euclidean_matches_hand_computation() {
        let a = array![0.0, 3.0];
        let b = array![4.0, 0.0];
        assert_eq!(euclidean_distance(&a.view(), &b.view()), 5.0);
    }
}
