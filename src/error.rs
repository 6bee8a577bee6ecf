//! Error type for the star schema loader.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The dimension name has no entry in the registry.
    #[error("dimension `{0}` is not registered")]
    UnknownDimension(String),

    #[error("invalid values for dimension `{dimension}`: {reason}")]
    Validation { dimension: String, reason: String },

    /// An insert that should have produced an auto-increment id did not.
    #[error("insert into `{table}` did not produce a generated identifier")]
    MissingIdentifier { table: String },

    #[error("invalid dimension registry: {0}")]
    Registry(String),

    #[error("unsupported database url `{0}` (expected mysql:// or sqlite:)")]
    UnsupportedDatabase(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl Error {
    pub(crate) fn validation(dimension: &str, reason: impl Into<String>) -> Self {
        Error::Validation {
            dimension: dimension.to_owned(),
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
