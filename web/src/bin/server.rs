//! Server binary: wires the pipeline over `PostgreSQL` and the live gateway,
//! serves the HTTP surface, and runs the background drain and reaper tasks.

use anyhow::Context;
use chrono::Duration as ChronoDuration;
use hotdesk_gateway::{HttpGateway, HttpGatewayConfig};
use hotdesk_postgres::{PgBookingStore, PgPaymentStore, PgSpaceStore, PgSyncJobStore};
use hotdesk_reconcile::{CatalogSyncWorker, ReservationOrchestrator, WebhookProcessor};
use hotdesk_web::notify::EventLogNotifier;
use hotdesk_web::{router, AppState, Config};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.server.log_level.clone())),
        )
        .init();

    let metrics_addr: SocketAddr = ([0, 0, 0, 0], config.server.metrics_port).into();
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .context("failed to install metrics exporter")?;

    let pool = hotdesk_postgres::connect(&config.postgres.url, config.postgres.max_connections)
        .await
        .context("failed to connect to database")?;

    let bookings = Arc::new(PgBookingStore::new(pool.clone()));
    let payments = Arc::new(PgPaymentStore::new(pool.clone()));
    let spaces = Arc::new(PgSpaceStore::new(pool.clone()));
    let queue = Arc::new(PgSyncJobStore::new(pool));

    let gateway = Arc::new(
        HttpGateway::new(HttpGatewayConfig {
            base_url: config.gateway.base_url.clone(),
            api_key: config.gateway.api_key.clone(),
            success_url: config.gateway.success_url.clone(),
            cancel_url: config.gateway.cancel_url.clone(),
            timeout: Duration::from_secs(config.gateway.timeout_secs),
        })
        .context("failed to build gateway client")?,
    );
    let notifier = Arc::new(EventLogNotifier::new());

    let reservations = Arc::new(ReservationOrchestrator::new(
        bookings.clone(),
        spaces.clone(),
        gateway.clone(),
        config.booking.currency.clone(),
        config.booking.tax_rate_bps,
        ChronoDuration::minutes(config.booking.pending_ttl_minutes),
    ));
    let webhooks = Arc::new(WebhookProcessor::new(
        config.gateway.webhook_secret.clone(),
        bookings,
        payments,
        gateway.clone(),
        notifier,
    ));
    let catalog = Arc::new(CatalogSyncWorker::new(
        spaces,
        queue,
        gateway,
        config.booking.currency.clone(),
        config.sync.batch_size,
    ));

    spawn_queue_drain(catalog.clone(), config.sync.drain_interval_secs);
    spawn_pending_reaper(reservations.clone(), config.booking.reaper_interval_secs);

    let state = AppState::new(reservations, webhooks, catalog);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(addr = %addr, "Server listening");

    axum::serve(listener, router(state))
        .await
        .context("server error")?;
    Ok(())
}

fn spawn_queue_drain(catalog: Arc<CatalogSyncWorker>, interval_secs: u64) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        loop {
            ticker.tick().await;
            if let Err(e) = catalog.run_batch().await {
                error!(error = %e, "Sync queue drain failed");
            }
        }
    });
}

fn spawn_pending_reaper(reservations: Arc<ReservationOrchestrator>, interval_secs: u64) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        loop {
            ticker.tick().await;
            if let Err(e) = reservations.expire_stale_pending().await {
                error!(error = %e, "Pending-booking reaper failed");
            }
        }
    });
}
