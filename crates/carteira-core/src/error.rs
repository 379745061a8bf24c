use thiserror::Error;

#[derive(Debug, Error)]
pub enum CarteiraError {
    #[error("Data file not found: {path}")]
    DataFileNotFound { path: String },

    #[error("Malformed data file '{path}': {reason}")]
    MalformedData { path: String, reason: String },

    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("No solver backend available: {0}")]
    SolverUnavailable(String),

    #[error("Solver failure: {0}")]
    SolverFailure(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for CarteiraError {
    fn from(e: serde_json::Error) -> Self {
        CarteiraError::SerializationError(e.to_string())
    }
}
