use thiserror::Error;

/// Error taxonomy per the error-handling design: validation, upstream
/// connectivity, insufficient data, constraint violations, and everything
/// else that is the system's own fault.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("upstream data provider unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("insufficient data: {0}")]
    DataInsufficient(String),

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn data_insufficient(msg: impl Into<String>) -> Self {
        Self::DataInsufficient(msg.into())
    }

    pub fn constraint(msg: impl Into<String>) -> Self {
        Self::ConstraintViolation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_kind_prefix() {
        let err = AppError::validation("weights must sum to 1");
        assert!(err.to_string().contains("weights must sum to 1"));
    }
}
