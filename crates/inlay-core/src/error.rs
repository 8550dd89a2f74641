use crate::codec::DecodeError;
use thiserror::Error as ThisError;

/// Boxed native error of the execution backend.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

///
/// SchemaError
///
/// Construction-time schema failures. A broken schema cannot safely drive any
/// operation, so these are always surfaced and never downgraded to a log line.
///

#[derive(Debug, ThisError)]
pub enum SchemaError {
    #[error("cyclic embedding: {path}")]
    CyclicEmbedding { path: String },

    #[error("unknown field '{field}' on {type_path}")]
    UnknownField {
        type_path: &'static str,
        field: String,
    },

    #[error("schema for {type_path} already built; configure before first use")]
    AlreadyBuilt { type_path: &'static str },

    #[error("schema for {schema_type} cannot materialize {requested}")]
    TypeMismatch {
        schema_type: &'static str,
        requested: &'static str,
    },
}

///
/// Error
///
/// Runtime error surface of the engine. Read operations exist in throwing and
/// non-throwing (log-and-absorb) forms; write operations always propagate.
///

#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("no row matched in '{table}'")]
    NotFound { table: String },

    #[error("column '{column}' of '{table}': {source}")]
    Deserialize {
        table: String,
        column: String,
        source: DecodeError,
    },

    #[error("statement execution failed: {source}")]
    Execution {
        #[source]
        source: BoxError,
    },

    #[error("refusing to delete every row of '{table}' without confirmation")]
    UnconfirmedDelete { table: String },
}

impl Error {
    /// Wrap the execution backend's native error.
    pub fn execution(source: impl Into<BoxError>) -> Self {
        Self::Execution {
            source: source.into(),
        }
    }

    /// Construct a row-decode failure for one column.
    pub(crate) fn deserialize(
        table: impl Into<String>,
        column: impl Into<String>,
        source: DecodeError,
    ) -> Self {
        Self::Deserialize {
            table: table.into(),
            column: column.into(),
            source,
        }
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_errors_convert_into_the_runtime_surface() {
        let err: Error = SchemaError::AlreadyBuilt { type_path: "t::P" }.into();
        assert!(matches!(err, Error::Schema(SchemaError::AlreadyBuilt { .. })));
    }

    #[test]
    fn not_found_is_classified() {
        let err = Error::NotFound {
            table: "person".to_string(),
        };
        assert!(err.is_not_found());
        assert!(!Error::execution("boom").is_not_found());
    }
}
