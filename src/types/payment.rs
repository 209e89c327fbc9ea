//! Payment types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Payment status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }
}

/// Payment row, one effective (non-failed) payment per booking
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub client_id: Uuid,
    pub technician_id: Uuid,
    pub amount: Decimal,
    pub payment_method: Option<String>,
    pub status: String,
    pub transaction_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Client-initiated payment for a completed booking
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub booking_id: Uuid,
    pub payment_method: Option<String>,
}

/// Request addressing a single payment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIdRequest {
    pub id: Uuid,
}

/// List payments for the caller
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPaymentsRequest {
    pub status: Option<PaymentStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPaymentsResponse {
    pub payments: Vec<Payment>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_status_strings() {
        assert_eq!(PaymentStatus::Pending.as_str(), "pending");
        assert_eq!(PaymentStatus::Refunded.as_str(), "refunded");
        let json = serde_json::to_string(&PaymentStatus::Completed).unwrap();
        assert_eq!(json, "\"completed\"");
    }
}
