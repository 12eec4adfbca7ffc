use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("VALIDATION_FAILED: {0}")]
    Validation(String),
    #[error("PAST_DATE: {0}")]
    PastSchedule(String),
    #[error("TIME_CONFLICT: {0}")]
    TimeConflict(String),
    #[error("PERSISTENCE_FAILURE: {0}")]
    Persistence(String),
    #[error("NOT_FOUND: {0}")]
    NotFound(String),
    #[error("CONFIG_INVALID: {0}")]
    Config(String),
    #[error("IO_FAILURE: {0}")]
    Io(String),
    #[error("INTERNAL: {0}")]
    Internal(String),
}

impl AppError {
    /// Errors raised locally before any backend call was made.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::PastSchedule(_) | Self::TimeConflict(_)
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Persistence(value.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(value: serde_yaml::Error) -> Self {
        Self::Config(value.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        Self::Internal(format!("{value:#}"))
    }
}

pub type AppResult<T> = Result<T, AppError>;

pub fn to_client_error(error: impl std::fmt::Display) -> String {
    error.to_string()
}

#[cfg(test)]
mod tests {
    use super::AppError;

    #[test]
    fn display_carries_error_code() {
        let error = AppError::TimeConflict("overlaps Product Demo".to_string());
        assert_eq!(error.to_string(), "TIME_CONFLICT: overlaps Product Demo");
    }

    #[test]
    fn local_errors_are_distinguished_from_backend_errors() {
        assert!(AppError::Validation("title".to_string()).is_local());
        assert!(AppError::PastSchedule("start".to_string()).is_local());
        assert!(!AppError::Persistence("offline".to_string()).is_local());
    }
}
