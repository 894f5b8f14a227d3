use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CustomError {
    #[error("Network or Server Error: {0}")]
    NetworkOrServerError(String),

    #[error("Not Found: {0}")]
    NotFoundError(String),

    #[error("Forbidden: {0}")]
    ForbiddenError(String),

    #[error("Unauthenticated: {0}")]
    UnauthenticatedError(String),

    #[error("Unauthorized: {0}")]
    UnauthorizedError(String),

    #[error("Conflict: {0}")]
    ConflictError(String),

    #[error("Validation Error: {0}")]
    ValidationError(String),

    #[error("Config Error: {0}")]
    ConfigError(String),
}

impl CustomError {
    /// Stable machine-readable code, used when a view state is serialized.
    pub fn code(&self) -> &'static str {
        match *self {
            CustomError::NetworkOrServerError(..) => "NETWORK_OR_SERVER_ERROR",
            CustomError::NotFoundError(..) => "NOT_FOUND_ERROR",
            CustomError::ForbiddenError(..) => "FORBIDDEN_ERROR",
            CustomError::UnauthenticatedError(..) => "UNAUTHENTICATED_ERROR",
            CustomError::UnauthorizedError(..) => "UNAUTHORIZED_ERROR",
            CustomError::ConflictError(..) => "CONFLICT_ERROR",
            CustomError::ValidationError(..) => "VALIDATION_ERROR",
            CustomError::ConfigError(..) => "CONFIG_ERROR",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CustomError::NotFoundError(..))
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self, CustomError::ForbiddenError(..))
    }
}

impl From<mongodb::error::Error> for CustomError {
    fn from(err: mongodb::error::Error) -> Self {
        CustomError::NetworkOrServerError(format!("Database error: {}", err))
    }
}

impl From<reqwest::Error> for CustomError {
    fn from(err: reqwest::Error) -> Self {
        CustomError::NetworkOrServerError(format!("Request failed: {}", err))
    }
}
