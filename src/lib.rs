//! transknn performs transductive (semi-supervised) classification:
//! given a labeled training set and an unlabeled test set drawn from the
//! same distribution, it infers labels for the test set by iteratively
//! propagating label information through a nearest-neighbor graph built
//! jointly over both sets, instead of training a fixed model and applying
//! it to each test point independently.
//!
//! The core is a collective k-NN algorithm: a neighborhood size is first
//! determined by cross-validation on the training set alone, a k-nearest
//! neighbor structure is then built for every test instance over the
//! combined train+test pool, and the convergence loop repeatedly commits
//! the currently most confident pending labels until every test instance
//! is resolved.
//!
//! # Getting started
//!
//! transknn is thought to be mainly used via the binary it provides,
//! `transknn`, which takes training and test data as CSV files.
//! For usage instructions, refer to the help screen: `transknn -h`.
//!
//! As a library, the entry point is [`collective::KnnCollective`]:
//!
//! ```
//! use ndarray::array;
//! use transknn::dataset::{AttributeKind, Dataset, Schema};
//! use transknn::collective::{CollectiveConfig, CollectiveModel, KnnCollective};
//!
//! # fn main() -> Result<(), transknn::collective::CollectiveError> {
//! let schema = Schema::new(
//!     vec![AttributeKind::Numeric, AttributeKind::Nominal(2)],
//!     Some(1),
//! )?;
//! let train = Dataset::from_matrix(
//!     schema.clone(),
//!     array![[0.0, 0.0], [1.0, 0.0], [9.0, 1.0], [10.0, 1.0]],
//! )?;
//! let test = Dataset::from_matrix(
//!     schema,
//!     array![[0.5, f64::NAN], [9.5, f64::NAN]],
//! )?;
//!
//! let mut config = CollectiveConfig::default();
//! config.k = Some(3);
//! let mut classifier = KnnCollective::new(config);
//! classifier.build(&train, &test)?;
//!
//! assert_eq!(classifier.predict(&array![0.5].view())?, vec![1.0, 0.0]);
//! assert_eq!(classifier.predict(&array![9.5].view())?, vec![0.0, 1.0]);
//! # Ok(())
//! # }
//! ```
pub mod collective;
pub mod dataset;
pub mod evaluation;

/// Class labels are zero-based integer codes.
pub type Label = usize;
