use anyhow::Context;
use axum::{routing::get, Router};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

mod config;
mod db;
mod error;
mod handlers;
mod models;
mod services;

use config::Config;
use db::PgGateway;
use error::NotifyError;
use services::scheduler::{Scheduler, SystemClock};

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub scheduler: Option<Arc<Scheduler>>,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/readyz", get(handlers::health::readyz))
        .route("/api/scheduler/status", get(handlers::scheduler::get_status))
        .route("/api/scheduler/jobs/:name", get(handlers::scheduler::get_job))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "moodtracker_api=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    let config = Config::from_env();

    // Database
    let db = db::create_pool(&config.database_url, config.database_max_connections)
        .await
        .context("Failed to create database pool")?;

    // Notification scheduler runs on its own tasks; failing to start it
    // never takes the HTTP service down.
    let gateway = Arc::new(PgGateway::new(db.clone(), config.notifier.query_timeout));
    let scheduler = match services::jobs::start_notifications(
        &config.notifier,
        gateway,
        Arc::new(SystemClock),
    )
    .await
    {
        Ok(scheduler) => Some(scheduler),
        Err(NotifyError::ConfigurationMissing(var)) => {
            tracing::warn!(var, "{} not set, skipping notification scheduler", var);
            None
        }
        Err(e) => {
            tracing::error!(error = %e, "Notification scheduler not started");
            None
        }
    };

    let state = AppState { db, scheduler };

    let addr = config.listen_addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app(state))
        .await
        .context("Server error")?;

    Ok(())
}
