//! NATS message envelopes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ServiceError;

/// Generic request wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request<T> {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub token: Option<String>,
    pub payload: T,
}

impl<T> Request<T> {
    pub fn with_token(token: String, payload: T) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            token: Some(token),
            payload,
        }
    }
}

/// Generic success response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessResponse<T> {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub payload: T,
}

impl<T> SuccessResponse<T> {
    pub fn new(request_id: Uuid, payload: T) -> Self {
        Self {
            id: request_id,
            timestamp: Utc::now(),
            payload,
        }
    }
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(request_id: Uuid, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: request_id,
            timestamp: Utc::now(),
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
            },
        }
    }

    /// Map a service error to its wire representation. Storage errors are
    /// logged by the caller and never leak their text to the wire.
    pub fn from_service(request_id: Uuid, err: &ServiceError) -> Self {
        Self::new(request_id, err.code(), err.public_message())
    }
}

/// Empty `{}` payload for operations addressed purely by the caller
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmptyPayload {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_token_is_optional() {
        let json = r#"{
            "id": "123e4567-e89b-12d3-a456-426614174000",
            "timestamp": "2026-01-10T09:00:00Z",
            "payload": {}
        }"#;

        let req: Request<EmptyPayload> = serde_json::from_str(json).unwrap();
        assert!(req.token.is_none());
    }

    #[test]
    fn error_response_hides_database_detail() {
        let err = ServiceError::Database(sqlx::Error::PoolClosed);
        let resp = ErrorResponse::from_service(Uuid::nil(), &err);

        assert_eq!(resp.error.code, "INTERNAL_ERROR");
        assert!(!resp.error.message.to_lowercase().contains("pool"));
    }

    #[test]
    fn error_response_carries_conflict_detail() {
        let err = ServiceError::Conflict("technician already booked".into());
        let resp = ErrorResponse::from_service(Uuid::nil(), &err);

        assert_eq!(resp.error.code, "CONFLICT");
        assert_eq!(resp.error.message, "technician already booked");
    }
}
