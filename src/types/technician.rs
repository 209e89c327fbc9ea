//! Technician types and search shapes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Latitude/longitude pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// Technician entity
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Technician {
    pub id: Uuid,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub phone: Option<String>,
    pub location_name: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub service_types: Vec<String>,
    pub experience_years: Option<i32>,
    pub is_available: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Technician {
    pub fn location(&self) -> Coordinates {
        Coordinates {
            lat: self.latitude,
            lng: self.longitude,
        }
    }
}

/// Directory row returned by the search query, rating aggregate included
#[derive(Debug, Clone, FromRow)]
pub struct DirectoryTechnician {
    pub id: Uuid,
    pub name: String,
    pub surname: String,
    pub location_name: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub service_types: Vec<String>,
    pub experience_years: Option<i32>,
    pub is_verified: bool,
    pub avg_rating: Option<f64>,
}

/// Directory technician shaped for a search response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryHit {
    pub id: Uuid,
    pub name: String,
    pub surname: String,
    pub location_name: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub service_types: Vec<String>,
    pub experience_years: Option<i32>,
    pub is_verified: bool,
    pub rating: String,
    pub distance_km: f64,
    pub is_external: bool,
}

/// Externally sourced listing, never persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalHit {
    pub id: String,
    pub place_id: String,
    pub name: String,
    pub location_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub rating: String,
    pub distance_km: f64,
    pub is_external: bool,
    pub external_source: String,
}

/// Technician proximity search request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[serde(default)]
    pub query: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default = "default_radius_km")]
    pub radius_km: f64,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_radius_km() -> f64 {
    10.0
}

fn default_limit() -> usize {
    20
}

/// Both result lists plus the echoed search parameters. The lists keep
/// distinct provenance; the caller composes the final view.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub directory_technicians: Vec<DirectoryHit>,
    pub external_technicians: Vec<ExternalHit>,
    pub search_center_lat: f64,
    pub search_center_lng: f64,
    pub search_radius_km: f64,
}

/// Availability toggle (technician only)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityRequest {
    pub is_available: bool,
}

/// Request addressing a single technician
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicianIdRequest {
    pub id: Uuid,
}

/// Booking counters for the technician dashboard
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TechnicianDashboard {
    pub pending_requests: i64,
    pub confirmed_bookings: i64,
    pub completed_bookings: i64,
    pub total_earnings: rust_decimal::Decimal,
}

/// Aggregate haversine distance over completed bookings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistanceStats {
    pub technician_id: Uuid,
    pub technician_name: String,
    pub technician_surname: String,
    pub total_distance_km: f64,
    pub completed_bookings_count: usize,
    pub average_distance_per_booking_km: f64,
}

/// Per-booking location breakdown for completed work
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingLocationStats {
    pub booking_id: Uuid,
    pub service_type: String,
    pub distance_from_technician_km: f64,
    pub client_address: Option<String>,
    pub client_city: Option<String>,
    pub client_postal_code: Option<String>,
    pub client_province: Option<String>,
    pub client_country: Option<String>,
    pub booking_date: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_request_defaults() {
        let json = r#"{"latitude": -26.2041, "longitude": 28.0473}"#;
        let req: SearchRequest = serde_json::from_str(json).unwrap();

        assert_eq!(req.query, "");
        assert_eq!(req.radius_km, 10.0);
        assert_eq!(req.limit, 20);
    }

    #[test]
    fn external_hit_keeps_provenance() {
        let hit = ExternalHit {
            id: "ext_abc123".to_string(),
            place_id: "abc123".to_string(),
            name: "Joe's Plumbing".to_string(),
            location_name: "12 Main Rd".to_string(),
            latitude: -26.2,
            longitude: 28.0,
            rating: "4.5".to_string(),
            distance_km: 3.21,
            is_external: true,
            external_source: "places".to_string(),
        };

        let json = serde_json::to_string(&hit).unwrap();
        assert!(json.contains("\"isExternal\":true"));
        assert!(json.contains("\"ext_abc123\""));
    }
}
