//! Booking types and lifecycle states

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Booking lifecycle status
///
/// `pending → offered → confirmed → in_progress → completed`, with
/// `rejected` and `cancelled` as retained terminal states. A declined
/// offer deletes the booking row instead of entering a terminal state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Offered,
    Confirmed,
    Rejected,
    InProgress,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Offered => "offered",
            Self::Confirmed => "confirmed",
            Self::Rejected => "rejected",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "offered" => Some(Self::Offered),
            "confirmed" => Some(Self::Confirmed),
            "rejected" => Some(Self::Rejected),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Terminal states never conflict with a new booking and can never be
    /// transitioned out of.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Completed | Self::Cancelled)
    }
}

/// Booking entity
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub client_id: Uuid,
    pub technician_id: Uuid,
    pub service_type: String,
    pub description: String,
    pub status: String,
    pub price: Option<Decimal>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,

    pub client_address: Option<String>,
    pub client_city: Option<String>,
    pub client_postal_code: Option<String>,
    pub client_province: Option<String>,
    pub client_country: Option<String>,
    pub client_latitude: Option<f64>,
    pub client_longitude: Option<f64>,

    pub cancelled: bool,
    pub cancellation_reason: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn status(&self) -> Option<BookingStatus> {
        BookingStatus::parse(&self.status)
    }
}

/// Booking with joined participant names, the shape read endpoints return
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BookingDetail {
    pub id: Uuid,
    pub client_id: Uuid,
    pub technician_id: Uuid,
    pub service_type: String,
    pub description: String,
    pub status: String,
    pub price: Option<Decimal>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub cancelled: bool,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    pub client_name: String,
    pub client_surname: String,
    pub technician_name: String,
    pub technician_surname: String,
}

/// Request to create a booking
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub technician_id: Uuid,
    pub service_type: String,
    pub description: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub client_address: Option<String>,
    pub client_city: Option<String>,
    pub client_postal_code: Option<String>,
    pub client_province: Option<String>,
    pub client_country: Option<String>,
    pub client_latitude: Option<f64>,
    pub client_longitude: Option<f64>,
}

/// Request addressing a single booking
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingIdRequest {
    pub id: Uuid,
}

/// Technician price offer on a pending booking
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferRequest {
    pub id: Uuid,
    pub price: Decimal,
    pub message: Option<String>,
}

/// Client response to an offer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondRequest {
    pub id: Uuid,
    pub accept: bool,
    pub message: Option<String>,
}

/// Outcome of responding to an offer. Declining deletes the booking, so
/// there is no detail row to return in that case.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", untagged)]
pub enum RespondOutcome {
    Accepted(BookingDetail),
    Declined { deleted: bool },
}

/// Cancellation with a mandatory human-readable reason
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequest {
    pub id: Uuid,
    pub reason: String,
}

/// Admin/override status update. Bypasses lifecycle guards except the
/// participant check and terminal-state protection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateRequest {
    pub id: Uuid,
    pub status: BookingStatus,
    pub price: Option<Decimal>,
}

/// List bookings for the calling client
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListBookingsRequest {
    pub status: Option<BookingStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListBookingsResponse {
    pub bookings: Vec<BookingDetail>,
    pub total: i64,
}

/// Completed booking without a payment row, offered for client payment
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PayableBooking {
    pub id: Uuid,
    pub service_type: String,
    pub description: String,
    pub status: String,
    pub price: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub technician_id: Uuid,
    pub technician_name: String,
    pub technician_surname: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_roundtrips_through_strings() {
        let all = [
            BookingStatus::Pending,
            BookingStatus::Offered,
            BookingStatus::Confirmed,
            BookingStatus::Rejected,
            BookingStatus::InProgress,
            BookingStatus::Completed,
            BookingStatus::Cancelled,
        ];
        for status in all {
            assert_eq!(BookingStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(BookingStatus::parse("accepted"), None);
    }

    #[test]
    fn terminal_states() {
        assert!(BookingStatus::Rejected.is_terminal());
        assert!(BookingStatus::Completed.is_terminal());
        assert!(BookingStatus::Cancelled.is_terminal());
        assert!(!BookingStatus::Pending.is_terminal());
        assert!(!BookingStatus::Offered.is_terminal());
        assert!(!BookingStatus::Confirmed.is_terminal());
        assert!(!BookingStatus::InProgress.is_terminal());
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&BookingStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }

    #[test]
    fn declined_outcome_carries_no_booking() {
        let json = serde_json::to_value(RespondOutcome::Declined { deleted: true }).unwrap();
        assert_eq!(json, serde_json::json!({ "deleted": true }));
    }

    #[test]
    fn create_request_parses_minimal_address() {
        let json = r#"{
            "technicianId": "123e4567-e89b-12d3-a456-426614174000",
            "serviceType": "plumbing",
            "description": "Leaking geyser",
            "startDate": "2026-02-01T08:00:00Z",
            "endDate": "2026-02-01T10:00:00Z"
        }"#;

        let req: CreateBookingRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.service_type, "plumbing");
        assert!(req.client_city.is_none());
        assert!(req.client_latitude.is_none());
    }
}
