//! Review message handlers
//!
//! A technician's review page is public; writing a review and reading
//! one's own page require a token.

use std::sync::Arc;

use anyhow::Result;
use async_nats::{Client, Subscriber};
use futures::StreamExt;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::auth;
use crate::error::ServiceError;
use crate::services::review::ReviewService;
use crate::types::{
    CreateReviewRequest, ErrorResponse, MyReviewsRequest, Request, SuccessResponse,
    TechnicianReviewsRequest,
};

/// Handle review.create messages
pub async fn handle_create(
    client: Client,
    mut subscriber: Subscriber,
    service: ReviewService,
    jwt_secret: Arc<String>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received review.create message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<CreateReviewRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse review.create request: {}", e);
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
            Ok(review) => {
                debug!("Created review {} for technician {}", review.id, review.technician_id);
                let response = SuccessResponse::new(request.id, review);
                let _ = client
                    .publish(reply, serde_json::to_vec(&response)?.into())
                    .await;
            }
            Err(e) => {
                if let ServiceError::Database(ref db) = e {
                    error!("review.create storage error: {}", db);
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

/// Handle review.technician messages. No token needed: reviews are part
/// of the public technician profile.
pub async fn handle_for_technician(
    client: Client,
    mut subscriber: Subscriber,
    service: ReviewService,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received review.technician message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<TechnicianReviewsRequest> = match serde_json::from_slice(&msg.payload)
        {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse review.technician request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                let _ = client
                    .publish(reply, serde_json::to_vec(&error)?.into())
                    .await;
                continue;
            }
        };

        let payload = request.payload;
        match service
            .for_technician(payload.technician_id, payload.page, payload.per_page)
            .await
        {
            Ok(reviews) => {
                let response = SuccessResponse::new(request.id, reviews);
                let _ = client
                    .publish(reply, serde_json::to_vec(&response)?.into())
                    .await;
            }
            Err(e) => {
                if let ServiceError::Database(ref db) = e {
                    error!("review.technician storage error: {}", db);
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

/// Handle review.mine messages
pub async fn handle_mine(
    client: Client,
    mut subscriber: Subscriber,
    service: ReviewService,
    jwt_secret: Arc<String>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received review.mine message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<MyReviewsRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse review.mine request: {}", e);
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

        let payload = request.payload;
        match service.mine(principal, payload.page, payload.per_page).await {
            Ok(reviews) => {
                let response = SuccessResponse::new(request.id, reviews);
                let _ = client
                    .publish(reply, serde_json::to_vec(&response)?.into())
                    .await;
            }
            Err(e) => {
                if let ServiceError::Database(ref db) = e {
                    error!("review.mine storage error: {}", db);
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
