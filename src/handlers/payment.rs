//! Payment message handlers

use std::sync::Arc;

use anyhow::Result;
use async_nats::{Client, Subscriber};
use futures::StreamExt;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::auth;
use crate::error::ServiceError;
use crate::services::payment::PaymentService;
use crate::types::{
    CreatePaymentRequest, ErrorResponse, ListPaymentsRequest, ListPaymentsResponse,
    PaymentIdRequest, Request, SuccessResponse,
};

/// Handle payment.create messages
pub async fn handle_create(
    client: Client,
    mut subscriber: Subscriber,
    service: PaymentService,
    jwt_secret: Arc<String>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received payment.create message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<CreatePaymentRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse payment.create request: {}", e);
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

        match service.record_payment(principal, request.payload).await {
            Ok(payment) => {
                debug!("Recorded payment {} for booking {}", payment.id, payment.booking_id);
                let response = SuccessResponse::new(request.id, payment);
                let _ = client
                    .publish(reply, serde_json::to_vec(&response)?.into())
                    .await;
            }
            Err(e) => {
                if let ServiceError::Database(ref db) = e {
                    error!("payment.create storage error: {}", db);
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

/// Handle payment.get messages
pub async fn handle_get(
    client: Client,
    mut subscriber: Subscriber,
    service: PaymentService,
    jwt_secret: Arc<String>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received payment.get message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<PaymentIdRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse payment.get request: {}", e);
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
            Ok(payment) => {
                let response = SuccessResponse::new(request.id, payment);
                let _ = client
                    .publish(reply, serde_json::to_vec(&response)?.into())
                    .await;
            }
            Err(e) => {
                if let ServiceError::Database(ref db) = e {
                    error!("payment.get storage error: {}", db);
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

/// Handle payment.list messages
pub async fn handle_list(
    client: Client,
    mut subscriber: Subscriber,
    service: PaymentService,
    jwt_secret: Arc<String>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received payment.list message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<ListPaymentsRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse payment.list request: {}", e);
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

        match service.list(principal, request.payload.status).await {
            Ok(payments) => {
                let response =
                    SuccessResponse::new(request.id, ListPaymentsResponse { payments });
                let _ = client
                    .publish(reply, serde_json::to_vec(&response)?.into())
                    .await;
            }
            Err(e) => {
                if let ServiceError::Database(ref db) = e {
                    error!("payment.list storage error: {}", db);
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
