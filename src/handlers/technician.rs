//! Technician message handlers
//!
//! Search and profile reads are public; availability and the dashboard
//! endpoints require a technician token.

use std::sync::Arc;

use anyhow::Result;
use async_nats::{Client, Subscriber};
use futures::StreamExt;
use serde::Serialize;
use sqlx::PgPool;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::auth;
use crate::db::queries;
use crate::error::ServiceError;
use crate::services::geo;
use crate::services::search::SearchEngine;
use crate::types::{
    AvailabilityRequest, BookingLocationStats, Coordinates, DistanceStats, EmptyPayload,
    ErrorResponse, Request, SearchRequest, SuccessResponse, Technician, TechnicianIdRequest,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TechnicianProfile {
    #[serde(flatten)]
    technician: Technician,
    rating: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DistanceStatsResponse {
    stats: DistanceStats,
    bookings: Vec<BookingLocationStats>,
}

/// Handle technician.search messages. No token needed: the directory is a
/// public surface.
pub async fn handle_search(
    client: Client,
    mut subscriber: Subscriber,
    pool: PgPool,
    engine: SearchEngine,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received technician.search message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<SearchRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse technician.search request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                let _ = client
                    .publish(reply, serde_json::to_vec(&error)?.into())
                    .await;
                continue;
            }
        };

        match engine.search(&pool, request.payload).await {
            Ok(results) => {
                debug!(
                    "Search returned {} directory and {} external hits",
                    results.directory_technicians.len(),
                    results.external_technicians.len()
                );
                let response = SuccessResponse::new(request.id, results);
                let _ = client
                    .publish(reply, serde_json::to_vec(&response)?.into())
                    .await;
            }
            Err(e) => {
                if let ServiceError::Database(ref db) = e {
                    error!("technician.search storage error: {}", db);
                }
                let error = ErrorResponse::from_service(request.id, &e);
                let _ = client
                    .publish(reply, serde_json::to_vec(&error)?.into())
                    .await;
            }
        }
    }

    Ok(())
}

/// Handle technician.get messages
pub async fn handle_get(
    client: Client,
    mut subscriber: Subscriber,
    pool: PgPool,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received technician.get message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<TechnicianIdRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse technician.get request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                let _ = client
                    .publish(reply, serde_json::to_vec(&error)?.into())
                    .await;
                continue;
            }
        };

        let technician = match queries::technician::get_technician(&pool, request.payload.id).await
        {
            Ok(Some(t)) => t,
            Ok(None) => {
                let error = ErrorResponse::new(request.id, "NOT_FOUND", "technician not found");
                let _ = client
                    .publish(reply, serde_json::to_vec(&error)?.into())
                    .await;
                continue;
            }
            Err(e) => {
                error!("technician.get storage error: {}", e);
                let error =
                    ErrorResponse::new(request.id, "INTERNAL_ERROR", "internal error");
                let _ = client
                    .publish(reply, serde_json::to_vec(&error)?.into())
                    .await;
                continue;
            }
        };

        let rating = match queries::technician::avg_rating(&pool, technician.id).await {
            Ok(r) => r,
            Err(e) => {
                warn!("Failed to load rating for {}: {}", technician.id, e);
                None
            }
        };

        let response = SuccessResponse::new(request.id, TechnicianProfile { technician, rating });
        let _ = client
            .publish(reply, serde_json::to_vec(&response)?.into())
            .await;
    }

    Ok(())
}

/// Handle technician.availability.update messages
pub async fn handle_availability(
    client: Client,
    mut subscriber: Subscriber,
    pool: PgPool,
    jwt_secret: Arc<String>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received technician.availability.update message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<AvailabilityRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse technician.availability.update request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                let _ = client
                    .publish(reply, serde_json::to_vec(&error)?.into())
                    .await;
                continue;
            }
        };

        let principal = match auth::extract_auth(&request, &jwt_secret) {
            Ok(p) => p,
            Err(_) => {
                let error =
                    ErrorResponse::new(request.id, "UNAUTHORIZED", "Authentication required");
                let _ = client
                    .publish(reply, serde_json::to_vec(&error)?.into())
                    .await;
                continue;
            }
        };
        if !principal.is_technician() {
            let error = ErrorResponse::new(
                request.id,
                "FORBIDDEN",
                "only technicians can update availability",
            );
            let _ = client
                .publish(reply, serde_json::to_vec(&error)?.into())
                .await;
            continue;
        }

        match queries::technician::set_availability(
            &pool,
            principal.id,
            request.payload.is_available,
        )
        .await
        {
            Ok(Some(technician)) => {
                debug!(
                    "Technician {} availability set to {}",
                    technician.id, technician.is_available
                );
                let response = SuccessResponse::new(request.id, technician);
                let _ = client
                    .publish(reply, serde_json::to_vec(&response)?.into())
                    .await;
            }
            Ok(None) => {
                let error = ErrorResponse::new(request.id, "NOT_FOUND", "technician not found");
                let _ = client
                    .publish(reply, serde_json::to_vec(&error)?.into())
                    .await;
            }
            Err(e) => {
                error!("technician.availability.update storage error: {}", e);
                let error = ErrorResponse::new(request.id, "INTERNAL_ERROR", "internal error");
                let _ = client
                    .publish(reply, serde_json::to_vec(&error)?.into())
                    .await;
            }
        }
    }

    Ok(())
}

/// Handle technician.dashboard messages
pub async fn handle_dashboard(
    client: Client,
    mut subscriber: Subscriber,
    pool: PgPool,
    jwt_secret: Arc<String>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received technician.dashboard message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<EmptyPayload> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse technician.dashboard request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                let _ = client
                    .publish(reply, serde_json::to_vec(&error)?.into())
                    .await;
                continue;
            }
        };

        let principal = match auth::extract_auth(&request, &jwt_secret) {
            Ok(p) => p,
            Err(_) => {
                let error =
                    ErrorResponse::new(request.id, "UNAUTHORIZED", "Authentication required");
                let _ = client
                    .publish(reply, serde_json::to_vec(&error)?.into())
                    .await;
                continue;
            }
        };
        if !principal.is_technician() {
            let error = ErrorResponse::new(
                request.id,
                "FORBIDDEN",
                "only technicians have a dashboard",
            );
            let _ = client
                .publish(reply, serde_json::to_vec(&error)?.into())
                .await;
            continue;
        }

        match queries::booking::dashboard_counts(&pool, principal.id).await {
            Ok(dashboard) => {
                let response = SuccessResponse::new(request.id, dashboard);
                let _ = client
                    .publish(reply, serde_json::to_vec(&response)?.into())
                    .await;
            }
            Err(e) => {
                error!("technician.dashboard storage error: {}", e);
                let error = ErrorResponse::new(request.id, "INTERNAL_ERROR", "internal error");
                let _ = client
                    .publish(reply, serde_json::to_vec(&error)?.into())
                    .await;
            }
        }
    }

    Ok(())
}

/// Handle technician.stats.distance messages. Aggregates haversine
/// distances from the technician's base to each completed booking that
/// carries client coordinates.
pub async fn handle_distance_stats(
    client: Client,
    mut subscriber: Subscriber,
    pool: PgPool,
    jwt_secret: Arc<String>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received technician.stats.distance message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<EmptyPayload> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse technician.stats.distance request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                let _ = client
                    .publish(reply, serde_json::to_vec(&error)?.into())
                    .await;
                continue;
            }
        };

        let principal = match auth::extract_auth(&request, &jwt_secret) {
            Ok(p) => p,
            Err(_) => {
                let error =
                    ErrorResponse::new(request.id, "UNAUTHORIZED", "Authentication required");
                let _ = client
                    .publish(reply, serde_json::to_vec(&error)?.into())
                    .await;
                continue;
            }
        };
        if !principal.is_technician() {
            let error = ErrorResponse::new(
                request.id,
                "FORBIDDEN",
                "only technicians have distance statistics",
            );
            let _ = client
                .publish(reply, serde_json::to_vec(&error)?.into())
                .await;
            continue;
        }

        let technician = match queries::technician::get_technician(&pool, principal.id).await {
            Ok(Some(t)) => t,
            Ok(None) => {
                let error = ErrorResponse::new(request.id, "NOT_FOUND", "technician not found");
                let _ = client
                    .publish(reply, serde_json::to_vec(&error)?.into())
                    .await;
                continue;
            }
            Err(e) => {
                error!("technician.stats.distance storage error: {}", e);
                let error = ErrorResponse::new(request.id, "INTERNAL_ERROR", "internal error");
                let _ = client
                    .publish(reply, serde_json::to_vec(&error)?.into())
                    .await;
                continue;
            }
        };

        let completed =
            match queries::booking::completed_with_location(&pool, technician.id).await {
                Ok(rows) => rows,
                Err(e) => {
                    error!("technician.stats.distance storage error: {}", e);
                    let error =
                        ErrorResponse::new(request.id, "INTERNAL_ERROR", "internal error");
                    let _ = client
                        .publish(reply, serde_json::to_vec(&error)?.into())
                        .await;
                    continue;
                }
            };

        let base = technician.location();
        let points: Vec<Coordinates> = completed
            .iter()
            .filter_map(|b| {
                Some(Coordinates {
                    lat: b.client_latitude?,
                    lng: b.client_longitude?,
                })
            })
            .collect();
        let (total, count, average) = geo::distance_summary(&base, &points);

        let bookings = completed
            .iter()
            .filter_map(|b| {
                let location = Coordinates {
                    lat: b.client_latitude?,
                    lng: b.client_longitude?,
                };
                Some(BookingLocationStats {
                    booking_id: b.id,
                    service_type: b.service_type.clone(),
                    distance_from_technician_km: geo::round_km(geo::haversine_distance(
                        &base, &location,
                    )),
                    client_address: b.client_address.clone(),
                    client_city: b.client_city.clone(),
                    client_postal_code: b.client_postal_code.clone(),
                    client_province: b.client_province.clone(),
                    client_country: b.client_country.clone(),
                    booking_date: b.start_date,
                })
            })
            .collect();

        let response = SuccessResponse::new(
            request.id,
            DistanceStatsResponse {
                stats: DistanceStats {
                    technician_id: technician.id,
                    technician_name: technician.name.clone(),
                    technician_surname: technician.surname.clone(),
                    total_distance_km: total,
                    completed_bookings_count: count,
                    average_distance_per_booking_km: average,
                },
                bookings,
            },
        );
        let _ = client
            .publish(reply, serde_json::to_vec(&response)?.into())
            .await;
    }

    Ok(())
}
