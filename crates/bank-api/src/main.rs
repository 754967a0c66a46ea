//! Bank account command service entry point.

use std::sync::Arc;
use std::time::Duration;

use bank_account::application::command_handlers::SnapshotPolicy;
use bank_account::application::projection_runner::ProjectionRunner;
use bank_account::application::projector::AccountProjector;
use bank_account::domain::events::AccountEvent;
use bank_api::config::ServiceConfig;
use bank_api::error::AppError;
use bank_api::state::AppState;
use bank_core::event::SystemClock;
use bank_core::log::EventLog;
use bank_core::repository::EventStore;
use bank_event_store::{
    LogEventStore, PgConsumerOffsetStore, PgEventLog, PgProjectionRepository, PgSnapshotStore,
    schema,
};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

const PROJECTOR_IDLE_WAIT: Duration = Duration::from_millis(500);

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let config = ServiceConfig::from_env()?;
    tracing::info!(
        topic = %config.event_store.topic,
        partitions = config.event_store.partitions,
        snapshot_frequency = config.snapshot_frequency,
        "starting bank account command service"
    );

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    schema::apply(&pool).await.map_err(AppError::Schema)?;

    let log: Arc<dyn EventLog> = Arc::new(PgEventLog::new(pool.clone(), &config.event_store));
    let event_store: Arc<dyn EventStore<AccountEvent>> = Arc::new(LogEventStore::new(
        log.clone(),
        config.event_store.clone(),
    ));

    if config.projector_enabled {
        let projector = AccountProjector::new(
            event_store.clone(),
            Arc::new(PgProjectionRepository::new(pool.clone())),
        );
        let runner = ProjectionRunner::new(
            log.clone(),
            Arc::new(PgConsumerOffsetStore::new(
                pool.clone(),
                config.event_store.topic.clone(),
            )),
            projector,
            config.projector_group_id.clone(),
            config.event_store.poll_timeout,
        );
        tokio::spawn(async move {
            let error = runner.run(PROJECTOR_IDLE_WAIT).await;
            tracing::error!(error = %error, "projection runner stopped");
        });
    }

    let app_state = AppState::new(
        Arc::new(SystemClock),
        event_store,
        Arc::new(PgSnapshotStore::new(pool)),
        SnapshotPolicy::from_frequency(config.snapshot_frequency),
    );

    // TODO: Replace CorsLayer::permissive() with restricted origins for production.
    let app = bank_api::app(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
