//! Review types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Review row with the reviewer's display name joined in
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDetail {
    pub id: Uuid,
    pub booking_id: Option<Uuid>,
    pub client_id: Uuid,
    pub technician_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub client_name: String,
    pub client_surname: String,
}

/// Client review of a completed booking
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    pub booking_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
}

/// Paginated review page for one technician
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicianReviewsRequest {
    pub technician_id: Uuid,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub per_page: Option<u32>,
}

/// The calling technician's own review page
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MyReviewsRequest {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub per_page: Option<u32>,
}

/// One page of reviews plus the aggregate over all of them
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicianReviewsResponse {
    pub average_rating: f64,
    pub total_reviews: i64,
    pub reviews: Vec<ReviewDetail>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reviews_request_defaults_pagination() {
        let json = r#"{"technicianId": "123e4567-e89b-12d3-a456-426614174000"}"#;
        let req: TechnicianReviewsRequest = serde_json::from_str(json).unwrap();
        assert!(req.page.is_none());
        assert!(req.per_page.is_none());
    }
}
