//! NATS message handlers

pub mod booking;
pub mod notification;
pub mod payment;
pub mod ping;
pub mod review;
pub mod technician;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_nats::Client;
use sqlx::PgPool;
use tokio::select;
use tracing::{error, info};

use crate::config::Config;
use crate::services::booking::BookingService;
use crate::services::payment::PaymentService;
use crate::services::places::{create_places_provider, PlacesProvider};
use crate::services::review::ReviewService;
use crate::services::search::SearchEngine;

/// Start all message handlers
pub async fn start_handlers(client: Client, pool: PgPool, config: &Config) -> Result<()> {
    info!("Starting message handlers...");

    let jwt_secret = Arc::new(config.jwt_secret.clone());

    let provider: Arc<dyn PlacesProvider> = Arc::from(create_places_provider(config));
    info!("Places provider initialized: {}", provider.name());

    let search_engine = SearchEngine::new(
        provider,
        Duration::from_secs(config.places_timeout_secs),
    );
    let booking_service = BookingService::new(pool.clone());
    let payment_service = PaymentService::new(pool.clone());
    let review_service = ReviewService::new(pool.clone());

    // Subscribe to all subjects
    let ping_sub = client.subscribe("fixlink.ping").await?;

    let booking_create_sub = client.subscribe("fixlink.booking.create").await?;
    let booking_get_sub = client.subscribe("fixlink.booking.get").await?;
    let booking_list_sub = client.subscribe("fixlink.booking.list").await?;
    let booking_recent_sub = client.subscribe("fixlink.booking.recent").await?;
    let booking_payable_sub = client.subscribe("fixlink.booking.payable").await?;
    let booking_offer_sub = client.subscribe("fixlink.booking.offer").await?;
    let booking_respond_sub = client.subscribe("fixlink.booking.respond").await?;
    let booking_reject_sub = client.subscribe("fixlink.booking.reject").await?;
    let booking_start_sub = client.subscribe("fixlink.booking.start").await?;
    let booking_complete_sub = client.subscribe("fixlink.booking.complete").await?;
    let booking_cancel_sub = client.subscribe("fixlink.booking.cancel").await?;
    let booking_status_sub = client.subscribe("fixlink.booking.status.update").await?;

    // Technician subjects
    let tech_search_sub = client.subscribe("fixlink.technician.search").await?;
    let tech_get_sub = client.subscribe("fixlink.technician.get").await?;
    let tech_availability_sub = client
        .subscribe("fixlink.technician.availability.update")
        .await?;
    let tech_dashboard_sub = client.subscribe("fixlink.technician.dashboard").await?;
    let tech_distance_sub = client.subscribe("fixlink.technician.stats.distance").await?;

    // Payment subjects
    let payment_create_sub = client.subscribe("fixlink.payment.create").await?;
    let payment_get_sub = client.subscribe("fixlink.payment.get").await?;
    let payment_list_sub = client.subscribe("fixlink.payment.list").await?;

    // Review subjects
    let review_create_sub = client.subscribe("fixlink.review.create").await?;
    let review_technician_sub = client.subscribe("fixlink.review.technician").await?;
    let review_mine_sub = client.subscribe("fixlink.review.mine").await?;

    // Notification subjects
    let notif_list_sub = client.subscribe("fixlink.notification.list").await?;
    let notif_unread_sub = client.subscribe("fixlink.notification.unread.count").await?;
    let notif_read_sub = client.subscribe("fixlink.notification.read").await?;
    let notif_read_all_sub = client.subscribe("fixlink.notification.read.all").await?;

    info!("Subscribed to NATS subjects");

    // Clone for each handler
    let client_ping = client.clone();
    let pool_ping = pool.clone();

    let client_booking_create = client.clone();
    let client_booking_get = client.clone();
    let client_booking_list = client.clone();
    let client_booking_recent = client.clone();
    let client_booking_payable = client.clone();
    let client_booking_offer = client.clone();
    let client_booking_respond = client.clone();
    let client_booking_reject = client.clone();
    let client_booking_start = client.clone();
    let client_booking_complete = client.clone();
    let client_booking_cancel = client.clone();
    let client_booking_status = client.clone();

    let client_tech_search = client.clone();
    let client_tech_get = client.clone();
    let client_tech_availability = client.clone();
    let client_tech_dashboard = client.clone();
    let client_tech_distance = client.clone();

    let client_payment_create = client.clone();
    let client_payment_get = client.clone();
    let client_payment_list = client.clone();

    let client_review_create = client.clone();
    let client_review_technician = client.clone();
    let client_review_mine = client.clone();

    let client_notif_list = client.clone();
    let client_notif_unread = client.clone();
    let client_notif_read = client.clone();
    let client_notif_read_all = client.clone();

    let booking_svc_create = booking_service.clone();
    let booking_svc_get = booking_service.clone();
    let booking_svc_list = booking_service.clone();
    let booking_svc_recent = booking_service.clone();
    let booking_svc_payable = booking_service.clone();
    let booking_svc_offer = booking_service.clone();
    let booking_svc_respond = booking_service.clone();
    let booking_svc_reject = booking_service.clone();
    let booking_svc_start = booking_service.clone();
    let booking_svc_complete = booking_service.clone();
    let booking_svc_cancel = booking_service.clone();
    let booking_svc_status = booking_service;

    let payment_svc_create = payment_service.clone();
    let payment_svc_get = payment_service.clone();
    let payment_svc_list = payment_service;

    let review_svc_create = review_service.clone();
    let review_svc_technician = review_service.clone();
    let review_svc_mine = review_service;

    let pool_tech_search = pool.clone();
    let pool_tech_get = pool.clone();
    let pool_tech_availability = pool.clone();
    let pool_tech_dashboard = pool.clone();
    let pool_tech_distance = pool.clone();

    let pool_notif_list = pool.clone();
    let pool_notif_unread = pool.clone();
    let pool_notif_read = pool.clone();
    let pool_notif_read_all = pool.clone();

    let secret_booking_create = Arc::clone(&jwt_secret);
    let secret_booking_get = Arc::clone(&jwt_secret);
    let secret_booking_list = Arc::clone(&jwt_secret);
    let secret_booking_recent = Arc::clone(&jwt_secret);
    let secret_booking_payable = Arc::clone(&jwt_secret);
    let secret_booking_offer = Arc::clone(&jwt_secret);
    let secret_booking_respond = Arc::clone(&jwt_secret);
    let secret_booking_reject = Arc::clone(&jwt_secret);
    let secret_booking_start = Arc::clone(&jwt_secret);
    let secret_booking_complete = Arc::clone(&jwt_secret);
    let secret_booking_cancel = Arc::clone(&jwt_secret);
    let secret_booking_status = Arc::clone(&jwt_secret);
    let secret_tech_availability = Arc::clone(&jwt_secret);
    let secret_tech_dashboard = Arc::clone(&jwt_secret);
    let secret_tech_distance = Arc::clone(&jwt_secret);
    let secret_payment_create = Arc::clone(&jwt_secret);
    let secret_payment_get = Arc::clone(&jwt_secret);
    let secret_payment_list = Arc::clone(&jwt_secret);
    let secret_review_create = Arc::clone(&jwt_secret);
    let secret_review_mine = Arc::clone(&jwt_secret);
    let secret_notif_list = Arc::clone(&jwt_secret);
    let secret_notif_unread = Arc::clone(&jwt_secret);
    let secret_notif_read = Arc::clone(&jwt_secret);
    let secret_notif_read_all = Arc::clone(&jwt_secret);

    // Spawn handlers
    let ping_handle = tokio::spawn(async move {
        ping::handle_ping(client_ping, ping_sub, pool_ping).await
    });

    let booking_create_handle = tokio::spawn(async move {
        booking::handle_create(client_booking_create, booking_create_sub, booking_svc_create, secret_booking_create).await
    });

    let booking_get_handle = tokio::spawn(async move {
        booking::handle_get(client_booking_get, booking_get_sub, booking_svc_get, secret_booking_get).await
    });

    let booking_list_handle = tokio::spawn(async move {
        booking::handle_list(client_booking_list, booking_list_sub, booking_svc_list, secret_booking_list).await
    });

    let booking_recent_handle = tokio::spawn(async move {
        booking::handle_recent(client_booking_recent, booking_recent_sub, booking_svc_recent, secret_booking_recent).await
    });

    let booking_payable_handle = tokio::spawn(async move {
        booking::handle_payable(client_booking_payable, booking_payable_sub, booking_svc_payable, secret_booking_payable).await
    });

    let booking_offer_handle = tokio::spawn(async move {
        booking::handle_offer(client_booking_offer, booking_offer_sub, booking_svc_offer, secret_booking_offer).await
    });

    let booking_respond_handle = tokio::spawn(async move {
        booking::handle_respond(client_booking_respond, booking_respond_sub, booking_svc_respond, secret_booking_respond).await
    });

    let booking_reject_handle = tokio::spawn(async move {
        booking::handle_reject(client_booking_reject, booking_reject_sub, booking_svc_reject, secret_booking_reject).await
    });

    let booking_start_handle = tokio::spawn(async move {
        booking::handle_start(client_booking_start, booking_start_sub, booking_svc_start, secret_booking_start).await
    });

    let booking_complete_handle = tokio::spawn(async move {
        booking::handle_complete(client_booking_complete, booking_complete_sub, booking_svc_complete, secret_booking_complete).await
    });

    let booking_cancel_handle = tokio::spawn(async move {
        booking::handle_cancel(client_booking_cancel, booking_cancel_sub, booking_svc_cancel, secret_booking_cancel).await
    });

    let booking_status_handle = tokio::spawn(async move {
        booking::handle_status_update(client_booking_status, booking_status_sub, booking_svc_status, secret_booking_status).await
    });

    // Technician handlers
    let tech_search_handle = tokio::spawn(async move {
        technician::handle_search(client_tech_search, tech_search_sub, pool_tech_search, search_engine).await
    });

    let tech_get_handle = tokio::spawn(async move {
        technician::handle_get(client_tech_get, tech_get_sub, pool_tech_get).await
    });

    let tech_availability_handle = tokio::spawn(async move {
        technician::handle_availability(client_tech_availability, tech_availability_sub, pool_tech_availability, secret_tech_availability).await
    });

    let tech_dashboard_handle = tokio::spawn(async move {
        technician::handle_dashboard(client_tech_dashboard, tech_dashboard_sub, pool_tech_dashboard, secret_tech_dashboard).await
    });

    let tech_distance_handle = tokio::spawn(async move {
        technician::handle_distance_stats(client_tech_distance, tech_distance_sub, pool_tech_distance, secret_tech_distance).await
    });

    // Payment handlers
    let payment_create_handle = tokio::spawn(async move {
        payment::handle_create(client_payment_create, payment_create_sub, payment_svc_create, secret_payment_create).await
    });

    let payment_get_handle = tokio::spawn(async move {
        payment::handle_get(client_payment_get, payment_get_sub, payment_svc_get, secret_payment_get).await
    });

    let payment_list_handle = tokio::spawn(async move {
        payment::handle_list(client_payment_list, payment_list_sub, payment_svc_list, secret_payment_list).await
    });

    // Review handlers
    let review_create_handle = tokio::spawn(async move {
        review::handle_create(client_review_create, review_create_sub, review_svc_create, secret_review_create).await
    });

    let review_technician_handle = tokio::spawn(async move {
        review::handle_for_technician(client_review_technician, review_technician_sub, review_svc_technician).await
    });

    let review_mine_handle = tokio::spawn(async move {
        review::handle_mine(client_review_mine, review_mine_sub, review_svc_mine, secret_review_mine).await
    });

    // Notification handlers
    let notif_list_handle = tokio::spawn(async move {
        notification::handle_list(client_notif_list, notif_list_sub, pool_notif_list, secret_notif_list).await
    });

    let notif_unread_handle = tokio::spawn(async move {
        notification::handle_unread_count(client_notif_unread, notif_unread_sub, pool_notif_unread, secret_notif_unread).await
    });

    let notif_read_handle = tokio::spawn(async move {
        notification::handle_mark_read(client_notif_read, notif_read_sub, pool_notif_read, secret_notif_read).await
    });

    let notif_read_all_handle = tokio::spawn(async move {
        notification::handle_mark_all_read(client_notif_read_all, notif_read_all_sub, pool_notif_read_all, secret_notif_read_all).await
    });

    info!("All handlers started, waiting for messages...");

    // Wait for any handler to finish (which means an error occurred)
    select! {
        result = ping_handle => {
            error!("Ping handler finished: {:?}", result);
        }
        result = booking_create_handle => {
            error!("Booking create handler finished: {:?}", result);
        }
        result = booking_get_handle => {
            error!("Booking get handler finished: {:?}", result);
        }
        result = booking_list_handle => {
            error!("Booking list handler finished: {:?}", result);
        }
        result = booking_recent_handle => {
            error!("Booking recent handler finished: {:?}", result);
        }
        result = booking_payable_handle => {
            error!("Booking payable handler finished: {:?}", result);
        }
        result = booking_offer_handle => {
            error!("Booking offer handler finished: {:?}", result);
        }
        result = booking_respond_handle => {
            error!("Booking respond handler finished: {:?}", result);
        }
        result = booking_reject_handle => {
            error!("Booking reject handler finished: {:?}", result);
        }
        result = booking_start_handle => {
            error!("Booking start handler finished: {:?}", result);
        }
        result = booking_complete_handle => {
            error!("Booking complete handler finished: {:?}", result);
        }
        result = booking_cancel_handle => {
            error!("Booking cancel handler finished: {:?}", result);
        }
        result = booking_status_handle => {
            error!("Booking status update handler finished: {:?}", result);
        }
        // Technician handlers
        result = tech_search_handle => {
            error!("Technician search handler finished: {:?}", result);
        }
        result = tech_get_handle => {
            error!("Technician get handler finished: {:?}", result);
        }
        result = tech_availability_handle => {
            error!("Technician availability handler finished: {:?}", result);
        }
        result = tech_dashboard_handle => {
            error!("Technician dashboard handler finished: {:?}", result);
        }
        result = tech_distance_handle => {
            error!("Technician distance stats handler finished: {:?}", result);
        }
        // Payment handlers
        result = payment_create_handle => {
            error!("Payment create handler finished: {:?}", result);
        }
        result = payment_get_handle => {
            error!("Payment get handler finished: {:?}", result);
        }
        result = payment_list_handle => {
            error!("Payment list handler finished: {:?}", result);
        }
        // Review handlers
        result = review_create_handle => {
            error!("Review create handler finished: {:?}", result);
        }
        result = review_technician_handle => {
            error!("Review technician handler finished: {:?}", result);
        }
        result = review_mine_handle => {
            error!("Review mine handler finished: {:?}", result);
        }
        // Notification handlers
        result = notif_list_handle => {
            error!("Notification list handler finished: {:?}", result);
        }
        result = notif_unread_handle => {
            error!("Notification unread count handler finished: {:?}", result);
        }
        result = notif_read_handle => {
            error!("Notification read handler finished: {:?}", result);
        }
        result = notif_read_all_handle => {
            error!("Notification read all handler finished: {:?}", result);
        }
    }

    Ok(())
}
