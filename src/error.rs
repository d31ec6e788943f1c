use std::{io, path::PathBuf};
use thiserror::Error;

/// Every way a statement can fail.
///
/// Errors abort only the statement that raised them. The session reports
/// them and moves on to the next statement of the batch.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed statement shape: unbalanced groups, unknown keyword,
    /// truncated input.
    #[error("parse error: {0}")]
    Parse(String),

    /// Missing table or column, duplicate definition, type mismatch.
    #[error("schema error: {0}")]
    Schema(String),

    /// Primary key duplicate, foreign key violation, protected column.
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// A `load` or `save` target could not be read or written.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub(crate) fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    pub(crate) fn constraint(msg: impl Into<String>) -> Self {
        Self::Constraint(msg.into())
    }

    /// Short name of the error family, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Parse(_) => "parse",
            Self::Schema(_) => "schema",
            Self::Constraint(_) => "constraint",
            Self::Io { .. } => "io",
        }
    }
}
