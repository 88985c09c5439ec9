//! ServerBuilder for fluent API to build the HTTP server

use super::AppState;
use super::router::build_routes;
use crate::config::AppConfig;
use crate::core::events::{LogSink, NotificationSink};
use crate::core::store::BookingStore;
use crate::core::transaction::LockingTransactionRunner;
use crate::storage::InMemoryBookingStore;
use crate::workflow::{BookingFields, BookingWorkflow};
use anyhow::Result;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Builder for the booking HTTP server
///
/// Every collaborator is constructed once here and shared through
/// [`AppState`]. Without an explicit store the builder falls back to an
/// in-memory one; without a sink, events are only logged.
///
/// # Example
///
/// ```ignore
/// let app = ServerBuilder::new()
///     .with_config(config)
///     .with_store(PostgresBookingStore::new(pool))
///     .build()?;
/// ```
pub struct ServerBuilder {
    config: AppConfig,
    store: Option<Arc<dyn BookingStore>>,
    sink: Option<Arc<dyn NotificationSink>>,
}

impl ServerBuilder {
    /// Create a new ServerBuilder with the default configuration
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            store: None,
            sink: None,
        }
    }

    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the booking store
    pub fn with_store(mut self, store: impl BookingStore + 'static) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    /// Set an already shared booking store
    pub fn with_shared_store(mut self, store: Arc<dyn BookingStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the sink `booking_created` events are sent to
    pub fn with_sink(mut self, sink: impl NotificationSink + 'static) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Build the shared handler state
    pub fn build_state(&self) -> Result<AppState> {
        self.config.validate()?;

        let store = self
            .store
            .clone()
            .unwrap_or_else(|| Arc::new(InMemoryBookingStore::new()));
        let sink = self.sink.clone().unwrap_or_else(|| Arc::new(LogSink));

        let runner = LockingTransactionRunner::new(Arc::clone(&store), self.config.lock_timeout());
        let workflow =
            BookingWorkflow::new(store, runner, sink).with_topic(&self.config.messaging.topic);
        let fields = BookingFields::new(
            self.config.pagination.default_page,
            self.config.pagination.default_size,
        );

        Ok(AppState::new(Arc::new(workflow), fields))
    }

    /// Build the final router
    pub fn build(self) -> Result<Router> {
        let state = self.build_state()?;
        Ok(build_routes(state))
    }

    /// Serve the application with graceful shutdown
    ///
    /// This will:
    /// - Bind to the configured `server.host:server.port`
    /// - Start serving requests
    /// - Handle SIGTERM and SIGINT (Ctrl+C) for graceful shutdown
    pub async fn serve(self) -> Result<()> {
        let addr = self.config.bind_addr();
        let app = self.build()?;
        let listener = TcpListener::bind(&addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Wait for shutdown signal (SIGTERM or Ctrl+C)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}
