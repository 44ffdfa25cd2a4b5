//! Payflow API server entry point.

use std::future::IntoFuture;
use std::sync::Arc;

use payflow_api::config::AppConfig;
use payflow_api::error::AppError;
use payflow_api::state::AppState;
use payflow_api::telemetry::{self, OtelRequestMetrics, OtelTelemetry};
use payflow_core::clock::SystemClock;
use payflow_idempotency::RedisIdempotencyStore;
use payflow_store::pg_payment_repository::PgPaymentRepository;
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tokio::sync::Notify;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = AppConfig::from_env()?;
    let telemetry_guard = telemetry::init(&config)?;

    info!(environment = %config.environment, "Starting payflow API server");

    let result = run(&config).await;
    if let Err(e) = &result {
        tracing::error!(error = %e, "server exited with error");
    }

    telemetry_guard.shutdown();
    result
}

async fn run(config: &AppConfig) -> Result<(), AppError> {
    // Create database connection pool.
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .max_lifetime(config.database.max_lifetime)
        .idle_timeout(config.database.idle_timeout)
        .connect(&config.database.url)
        .await?;

    if config.database.run_migrations {
        sqlx::migrate!("../../migrations").run(&pool).await?;
        info!("database migrations applied");
    }

    let cache = RedisIdempotencyStore::connect(&config.redis.url, &config.redis.namespace).await?;

    // Build application state.
    let app_state = AppState::new(
        Arc::new(SystemClock),
        Arc::new(PgPaymentRepository::new(pool.clone())),
        Arc::new(cache),
        Arc::new(OtelTelemetry::new()),
        config.deadlines(),
    );

    let app = payflow_api::app_with(
        app_state,
        &config.http,
        Arc::new(OtelRequestMetrics::new()),
    );

    // Start server.
    let addr = config.bind_addr()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let draining = Arc::new(Notify::new());
    let signalled = draining.clone();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        signalled.notify_one();
    });
    let drain_deadline = async {
        draining.notified().await;
        tokio::time::sleep(config.http.shutdown_timeout).await;
    };

    tokio::select! {
        result = server.into_future() => result?,
        () = drain_deadline => {
            warn!(
                timeout = ?config.http.shutdown_timeout,
                "in-flight requests did not drain in time, closing"
            );
        }
    }

    pool.close().await;
    info!("server stopped");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received, draining connections");
}
