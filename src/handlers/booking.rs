//! Booking message handlers
//!
//! Thin NATS adapters over `BookingService`: parse the envelope, extract
//! the principal, delegate, map the outcome onto the wire.

use std::sync::Arc;

use anyhow::Result;
use async_nats::{Client, Subscriber};
use futures::StreamExt;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::auth;
use crate::error::ServiceError;
use crate::services::booking::BookingService;
use crate::types::{
    BookingIdRequest, CancelRequest, CreateBookingRequest, EmptyPayload, ErrorResponse,
    ListBookingsRequest, ListBookingsResponse, OfferRequest, Request, RespondRequest,
    StatusUpdateRequest, SuccessResponse,
};

/// Handle booking.create messages
pub async fn handle_create(
    client: Client,
    mut subscriber: Subscriber,
    service: BookingService,
    jwt_secret: Arc<String>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received booking.create message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<CreateBookingRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse booking.create request: {}", e);
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

        match service.create(principal, request.payload).await {
            Ok(detail) => {
                debug!("Created booking {}", detail.id);
                let response = SuccessResponse::new(request.id, detail);
                let _ = client
                    .publish(reply, serde_json::to_vec(&response)?.into())
                    .await;
            }
            Err(e) => {
                if let ServiceError::Database(ref db) = e {
                    error!("booking.create storage error: {}", db);
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

/// Handle booking.get messages
pub async fn handle_get(
    client: Client,
    mut subscriber: Subscriber,
    service: BookingService,
    jwt_secret: Arc<String>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received booking.get message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<BookingIdRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse booking.get request: {}", e);
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

        match service.get(principal, request.payload.id).await {
            Ok(detail) => {
                let response = SuccessResponse::new(request.id, detail);
                let _ = client
                    .publish(reply, serde_json::to_vec(&response)?.into())
                    .await;
            }
            Err(e) => {
                if let ServiceError::Database(ref db) = e {
                    error!("booking.get storage error: {}", db);
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

/// Handle booking.list messages
pub async fn handle_list(
    client: Client,
    mut subscriber: Subscriber,
    service: BookingService,
    jwt_secret: Arc<String>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received booking.list message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<ListBookingsRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse booking.list request: {}", e);
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

        match service.list_for_caller(principal, request.payload.status).await {
            Ok(bookings) => {
                let response = SuccessResponse::new(
                    request.id,
                    ListBookingsResponse {
                        total: bookings.len() as i64,
                        bookings,
                    },
                );
                let _ = client
                    .publish(reply, serde_json::to_vec(&response)?.into())
                    .await;
            }
            Err(e) => {
                if let ServiceError::Database(ref db) = e {
                    error!("booking.list storage error: {}", db);
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

/// Handle booking.recent messages
pub async fn handle_recent(
    client: Client,
    mut subscriber: Subscriber,
    service: BookingService,
    jwt_secret: Arc<String>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received booking.recent message");

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
                error!("Failed to parse booking.recent request: {}", e);
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

        match service.recent(principal).await {
            Ok(bookings) => {
                let response = SuccessResponse::new(request.id, bookings);
                let _ = client
                    .publish(reply, serde_json::to_vec(&response)?.into())
                    .await;
            }
            Err(e) => {
                if let ServiceError::Database(ref db) = e {
                    error!("booking.recent storage error: {}", db);
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

/// Handle booking.payable messages
pub async fn handle_payable(
    client: Client,
    mut subscriber: Subscriber,
    service: BookingService,
    jwt_secret: Arc<String>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received booking.payable message");

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
                error!("Failed to parse booking.payable request: {}", e);
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

        match service.payable(principal).await {
            Ok(bookings) => {
                let response = SuccessResponse::new(request.id, bookings);
                let _ = client
                    .publish(reply, serde_json::to_vec(&response)?.into())
                    .await;
            }
            Err(e) => {
                if let ServiceError::Database(ref db) = e {
                    error!("booking.payable storage error: {}", db);
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

/// Handle booking.offer messages
pub async fn handle_offer(
    client: Client,
    mut subscriber: Subscriber,
    service: BookingService,
    jwt_secret: Arc<String>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received booking.offer message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<OfferRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse booking.offer request: {}", e);
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

        match service.offer(principal, request.payload).await {
            Ok(detail) => {
                debug!("Offer recorded on booking {}", detail.id);
                let response = SuccessResponse::new(request.id, detail);
                let _ = client
                    .publish(reply, serde_json::to_vec(&response)?.into())
                    .await;
            }
            Err(e) => {
                if let ServiceError::Database(ref db) = e {
                    error!("booking.offer storage error: {}", db);
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

/// Handle booking.respond messages
pub async fn handle_respond(
    client: Client,
    mut subscriber: Subscriber,
    service: BookingService,
    jwt_secret: Arc<String>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received booking.respond message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<RespondRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse booking.respond request: {}", e);
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

        match service.respond(principal, request.payload).await {
            Ok(outcome) => {
                let response = SuccessResponse::new(request.id, outcome);
                let _ = client
                    .publish(reply, serde_json::to_vec(&response)?.into())
                    .await;
            }
            Err(e) => {
                if let ServiceError::Database(ref db) = e {
                    error!("booking.respond storage error: {}", db);
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

/// Handle booking.reject messages
pub async fn handle_reject(
    client: Client,
    mut subscriber: Subscriber,
    service: BookingService,
    jwt_secret: Arc<String>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received booking.reject message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<BookingIdRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse booking.reject request: {}", e);
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

        match service.reject_pending(principal, request.payload.id).await {
            Ok(detail) => {
                let response = SuccessResponse::new(request.id, detail);
                let _ = client
                    .publish(reply, serde_json::to_vec(&response)?.into())
                    .await;
            }
            Err(e) => {
                if let ServiceError::Database(ref db) = e {
                    error!("booking.reject storage error: {}", db);
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

/// Handle booking.start messages
pub async fn handle_start(
    client: Client,
    mut subscriber: Subscriber,
    service: BookingService,
    jwt_secret: Arc<String>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received booking.start message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<BookingIdRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse booking.start request: {}", e);
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

        match service.start(principal, request.payload.id).await {
            Ok(detail) => {
                debug!("Started booking {}", detail.id);
                let response = SuccessResponse::new(request.id, detail);
                let _ = client
                    .publish(reply, serde_json::to_vec(&response)?.into())
                    .await;
            }
            Err(e) => {
                if let ServiceError::Database(ref db) = e {
                    error!("booking.start storage error: {}", db);
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

/// Handle booking.complete messages
pub async fn handle_complete(
    client: Client,
    mut subscriber: Subscriber,
    service: BookingService,
    jwt_secret: Arc<String>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received booking.complete message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<BookingIdRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse booking.complete request: {}", e);
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

        match service.complete(principal, request.payload.id).await {
            Ok(detail) => {
                debug!("Completed booking {}", detail.id);
                let response = SuccessResponse::new(request.id, detail);
                let _ = client
                    .publish(reply, serde_json::to_vec(&response)?.into())
                    .await;
            }
            Err(e) => {
                if let ServiceError::Database(ref db) = e {
                    error!("booking.complete storage error: {}", db);
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

/// Handle booking.cancel messages
pub async fn handle_cancel(
    client: Client,
    mut subscriber: Subscriber,
    service: BookingService,
    jwt_secret: Arc<String>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received booking.cancel message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<CancelRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse booking.cancel request: {}", e);
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

        match service.cancel(principal, request.payload).await {
            Ok(detail) => {
                let response = SuccessResponse::new(request.id, detail);
                let _ = client
                    .publish(reply, serde_json::to_vec(&response)?.into())
                    .await;
            }
            Err(e) => {
                if let ServiceError::Database(ref db) = e {
                    error!("booking.cancel storage error: {}", db);
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

/// Handle booking.status.update messages
pub async fn handle_status_update(
    client: Client,
    mut subscriber: Subscriber,
    service: BookingService,
    jwt_secret: Arc<String>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received booking.status.update message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<StatusUpdateRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse booking.status.update request: {}", e);
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

        match service.update_status(principal, request.payload).await {
            Ok(detail) => {
                let response = SuccessResponse::new(request.id, detail);
                let _ = client
                    .publish(reply, serde_json::to_vec(&response)?.into())
                    .await;
            }
            Err(e) => {
                if let ServiceError::Database(ref db) = e {
                    error!("booking.status.update storage error: {}", db);
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
