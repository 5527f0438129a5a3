use thiserror::Error;

/// Result type for Rainbow operations
pub type Result<T> = std::result::Result<T, RainbowError>;

/// Main error type for the Rainbow agent
#[derive(Debug, Clone, Error)]
pub enum RainbowError {
    /// Invalid configuration value, raised at construction
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter {
        name: String,
        reason: String,
    },

    /// Invalid dimensions for operations
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        expected: String,
        actual: String,
    },

    /// The caller broke the calling protocol (e.g. `take_step` before `start`)
    #[error("Precondition violated: {0}")]
    Precondition(String),

    /// Sampling from an empty container
    #[error("Empty buffer: {0}")]
    EmptyBuffer(String),

    /// NaN or infinity in a loss, gradient or projected distribution
    #[error("Numerical error: {0}")]
    NumericalError(String),

    /// IO errors (file operations)
    #[error("IO error: {0}")]
    IoError(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<std::io::Error> for RainbowError {
    fn from(err: std::io::Error) -> Self {
        RainbowError::IoError(err.to_string())
    }
}

impl From<bincode::Error> for RainbowError {
    fn from(err: bincode::Error) -> Self {
        RainbowError::SerializationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for RainbowError {
    fn from(err: serde_yaml::Error) -> Self {
        RainbowError::SerializationError(err.to_string())
    }
}

impl From<serde_json::Error> for RainbowError {
    fn from(err: serde_json::Error) -> Self {
        RainbowError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for RainbowError {
    fn from(err: ndarray::ShapeError) -> Self {
        RainbowError::DimensionMismatch {
            expected: "compatible array shape".to_string(),
            actual: err.to_string(),
        }
    }
}

// Helper functions for common error patterns
impl RainbowError {
    pub fn dimension_mismatch<S: Into<String>>(expected: S, actual: S) -> Self {
        RainbowError::DimensionMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn invalid_parameter<S: Into<String>>(name: S, reason: S) -> Self {
        RainbowError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn precondition<S: Into<String>>(reason: S) -> Self {
        RainbowError::Precondition(reason.into())
    }

    /// True for errors caused by caller misuse rather than bad numbers or bad config.
    pub fn is_precondition(&self) -> bool {
        matches!(self, RainbowError::Precondition(_) | RainbowError::EmptyBuffer(_))
    }
}
