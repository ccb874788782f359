//! tourdesk scheduler
//!
//! The scheduler is the coordination service for the guide shift pool. It
//! serves the REST API for shift claims and availability, and drives the
//! background worker that reconciles committed shift changes against the
//! external tour registry.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::watch;
use tourdesk_calendar::HttpTourCalendar;
use tourdesk_scheduler::{
    api,
    availability::{
        alerts::{AlertDispatcher, AlertMailer, LogMailer, RelayMailer},
        AvailabilityAggregator,
    },
    clock::{Clock, SystemClock},
    config::Config,
    dispatch::{
        AssignmentHandler, DispatchWorker, DispatchWorkerConfig, Dispatcher, ReleaseHandler,
    },
    state::AppState,
    store::{memory::MemoryStore, postgres::Database, Stores},
};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize tracing (prefer RUST_LOG, fallback to TOURDESK_LOG_LEVEL)
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting tourdesk scheduler");
    info!(listen_addr = %config.listen_addr, dev_mode = config.dev_mode, "Configuration loaded");

    let stores: Stores = if config.dev_mode {
        info!("Dev mode: running on in-memory stores");
        MemoryStore::new().stores()
    } else {
        let db = match Database::connect(&config.database).await {
            Ok(db) => {
                info!("Database connection established");
                db
            }
            Err(e) => {
                error!(error = %e, "Failed to connect to database");
                return Err(e.into());
            }
        };
        if let Err(e) = db.run_migrations().await {
            error!(error = %e, "Failed to run migrations");
            return Err(e.into());
        }
        db.stores()
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let calendar = Arc::new(HttpTourCalendar::new(
        config.calendar_url.clone(),
        config.calendar_api_key.clone(),
        config.calendar_timeout,
    )?);

    let mailer: Arc<dyn AlertMailer> = match &config.alert_relay_url {
        Some(url) => Arc::new(RelayMailer::new(url.clone())),
        None => {
            warn!("No mail relay configured; availability alerts will only be logged");
            Arc::new(LogMailer)
        }
    };

    let dispatcher = Dispatcher::new(
        AssignmentHandler::new(
            stores.shifts.clone(),
            stores.guides.clone(),
            stores.notifications.clone(),
            calendar.clone(),
            clock.clone(),
        ),
        ReleaseHandler::new(
            stores.guides.clone(),
            stores.notifications.clone(),
            clock.clone(),
        ),
        AvailabilityAggregator::new(
            stores.guides.clone(),
            stores.availability.clone(),
            stores.alerts.clone(),
            AlertDispatcher::new(
                mailer,
                stores.alerts.clone(),
                clock.clone(),
                config.alert_email.clone(),
            ),
            clock.clone(),
            config.alert_window,
        ),
    );

    // Shutdown channel shared by the worker and the HTTP server
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let worker = DispatchWorker::new(stores.clone(), dispatcher, DispatchWorkerConfig::default());
    let worker_handle = tokio::spawn({
        let shutdown_rx = shutdown_rx.clone();
        async move {
            if let Err(e) = worker.run(shutdown_rx).await {
                error!(error = %e, "Dispatch worker failed");
            }
        }
    });

    let state = AppState::new(stores, calendar, clock, config.clone());
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!(addr = %config.listen_addr, "Listening for connections");

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let mut shutdown_rx = shutdown_rx;
                loop {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                    if shutdown_rx.changed().await.is_err() {
                        break;
                    }
                }
                info!("HTTP server shutting down");
            })
            .await
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
        result = server_handle => {
            match result {
                Ok(Ok(())) => info!("Server exited normally"),
                Ok(Err(e)) => error!(error = %e, "Server error"),
                Err(e) => error!(error = %e, "Server task panicked"),
            }
        }
    }

    let _ = shutdown_tx.send(true);

    info!("Waiting for dispatch worker to shut down...");
    let shutdown_timeout = std::time::Duration::from_secs(10);
    if tokio::time::timeout(shutdown_timeout, worker_handle)
        .await
        .is_err()
    {
        warn!("Dispatch worker did not shut down in time");
    }

    info!("Shutdown complete");
    Ok(())
}
