//! Ping handler for health checks

use anyhow::Result;
use async_nats::{Client, Subscriber};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{debug, error};

#[derive(Debug, Serialize, Deserialize)]
struct PingRequest {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PongResponse {
    service: String,
    message: String,
    database_ok: bool,
    timestamp: String,
}

/// Handle ping messages. Replies with a database liveness check so the
/// frontend can distinguish "worker up" from "worker up and able to
/// serve".
pub async fn handle_ping(client: Client, mut subscriber: Subscriber, pool: PgPool) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received ping message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                error!("Ping message without reply subject");
                continue;
            }
        };

        let request: PingRequest = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse ping request: {}", e);
                let error_response = serde_json::json!({
                    "error": {
                        "code": "INVALID_REQUEST",
                        "message": format!("Failed to parse request: {}", e)
                    }
                });
                let _ = client.publish(reply, error_response.to_string().into()).await;
                continue;
            }
        };

        let database_ok = sqlx::query("SELECT 1").execute(&pool).await.is_ok();

        let response = PongResponse {
            service: env!("CARGO_PKG_NAME").to_string(),
            message: request
                .message
                .map(|m| format!("Pong: {}", m))
                .unwrap_or_else(|| "Pong".to_string()),
            database_ok,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        client
            .publish(reply, serde_json::to_vec(&response)?.into())
            .await?;

        debug!("Sent pong response");
    }

    Ok(())
}
