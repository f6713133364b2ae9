use std::net::SocketAddr;
use std::sync::Arc;
use anyhow::Context;
use marquee_api::{app, AppState};
use marquee_core::{BookingService, HoldEngine, SeatStore};
use marquee_shared::{HoldEvent, HoldEventKind};
use marquee_store::{app_config::Config, DbClient, PostgresSeatStore};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "marquee_api=debug,marquee_core=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Marquee API on port {}", config.server.port);

    let db = DbClient::new(&config.database)
        .await
        .context("Failed to connect to Postgres")?;
    db.migrate().await.context("Failed to run migrations")?;

    let rules = match db.fetch_business_rules(config.business_rules.clone()).await {
        Ok(rules) => rules,
        Err(e) => {
            tracing::warn!("Using configured business rules, database overrides unavailable: {}", e);
            config.business_rules.clone()
        }
    };
    tracing::info!("Seat hold grace period: {}s", rules.seat_hold_seconds);

    let store: Arc<dyn SeatStore> = Arc::new(PostgresSeatStore::new(db.pool.clone(), config.retry.clone()));
    let engine = HoldEngine::start(store.clone(), rules.hold_settings())?;
    tokio::spawn(log_hold_events(engine.subscribe()));

    let state = AppState::new(BookingService::new(store, engine.clone()));
    let app = app(state, &config.server.cors_origins);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let abandoned = engine.shutdown().await;
    tracing::info!("Hold engine stopped, {} pending holds abandoned", abandoned);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}

async fn log_hold_events(mut rx: broadcast::Receiver<HoldEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) if event.kind == HoldEventKind::RollbackFailed => {
                tracing::error!("Hold {} on seat {} could not be rolled back", event.hold_id, event.seat_id);
            }
            Ok(event) => {
                tracing::debug!("Hold {} on seat {}: {:?}", event.hold_id, event.seat_id, event.kind);
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!("Hold event log lagged, skipped {} events", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }
}
