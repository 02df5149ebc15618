//! Error taxonomy for collective classification.
//!
//! Configuration and capability errors fail fast before any computation.
//! A `NoProgress` error is an internal-consistency failure of the
//! convergence loop, not a bad-input condition; it aborts the build. A
//! `LookupMiss` is fatal for the failing query only and does not
//! invalidate the model.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollectiveError {
    /// Bad fold count, k larger than the pool, incompatible schemas, ...
    #[error("configuration error: {0}")]
    Config(String),

    /// The concrete algorithm does not support the attribute or class
    /// types of the input data.
    #[error("capability error: {0}")]
    Capability(String),

    /// A convergence round committed no label while unresolved test
    /// instances remain; indicates a defect in the rank computation.
    #[error("no progress in round {round} with {unresolved} test instances unresolved")]
    NoProgress { round: usize, unresolved: usize },

    /// The queried instance is absent from the resolved pool.
    #[error("instance not found in the resolved pool")]
    LookupMiss,

    /// The build was externally interrupted between rounds.
    #[error("build interrupted before round {round}")]
    Interrupted { round: usize },
}

pub type Result<T> = std::result::Result<T, CollectiveError>;
