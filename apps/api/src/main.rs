use std::sync::Arc;

use anyhow::Context;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use appointment_cell::{AppointmentService, AppointmentState};
use records_cell::RecordsState;
use shared_config::AppConfig;
use shared_database::open_store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Carebook Clinic API server");

    let config = Arc::new(AppConfig::from_env());
    if !config.is_configured() {
        warn!("AUTH_JWT_SECRET is not set; every request will be rejected");
    }

    let store = open_store(&config)
        .await
        .context("opening the document store")?;

    let appointments = AppointmentService::new(store.clone())?;
    let records = RecordsState::open(config.clone(), store)?;

    // Upgrade documents left by older builds before serving anything.
    let report = appointments.migrate().await?;
    info!("{} at version {}", report.key, report.to_version);
    for report in records.migrate().await? {
        info!("{} at version {}", report.key, report.to_version);
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = router::create_router(
        Arc::new(AppointmentState::new(config.clone(), appointments)),
        Arc::new(records),
    )
    .layer(
        TraceLayer::new_for_http()
            .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
            .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
    )
    .layer(cors);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
