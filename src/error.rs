//! Typed errors for the marketplace services
//!
//! Every state-machine operation returns a `ServiceError` whose kind the
//! boundary layer can map to a wire code. Guard failures are raised before
//! any mutation, so an error always means nothing was written.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Validation(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ServiceError {
    /// Wire error code for this kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Database(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to send to the caller. Storage errors are replaced with
    /// a generic text; their detail belongs in the logs only.
    pub fn public_message(&self) -> String {
        match self {
            Self::Database(_) => "internal error".to_string(),
            other => other.to_string(),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_distinguish_kinds() {
        assert_eq!(ServiceError::NotFound("booking").code(), "NOT_FOUND");
        assert_eq!(ServiceError::Conflict("x".into()).code(), "CONFLICT");
        assert_eq!(ServiceError::Forbidden("x".into()).code(), "FORBIDDEN");
        assert_eq!(
            ServiceError::Validation("x".into()).code(),
            "VALIDATION_ERROR"
        );
    }

    #[test]
    fn not_found_names_the_entity() {
        assert_eq!(
            ServiceError::NotFound("technician").to_string(),
            "technician not found"
        );
    }
}
