//! Booking API server
//!
//! Reads `BOOKING_CONFIG` (a YAML file) if set, then applies environment
//! overrides. Uses PostgreSQL when built with `postgres` and a database URL
//! is configured, Kafka when built with `kafka` and a broker is configured,
//! and in-memory storage and log-only notifications otherwise.
//!
//! ```bash
//! cargo run --example booking_server
//! DATABASE_URL=postgres://localhost/booking cargo run --example booking_server --features postgres
//! ```

use anyhow::Result;
use booking::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = match std::env::var("BOOKING_CONFIG") {
        Ok(path) => AppConfig::from_yaml_file(path)?,
        Err(_) => AppConfig::default(),
    }
    .apply_env_overrides()?;

    let builder = ServerBuilder::new().with_config(config.clone());
    let builder = with_store(builder, &config).await?;
    let builder = with_sink(builder, &config)?;

    builder.serve().await
}

#[cfg(feature = "postgres")]
async fn with_store(builder: ServerBuilder, config: &AppConfig) -> Result<ServerBuilder> {
    match &config.database.url {
        Some(url) => {
            let store = PostgresBookingStore::connect(url, config.database.max_connections).await?;
            store.migrate().await?;
            tracing::info!("using PostgreSQL storage");
            Ok(builder.with_store(store))
        }
        None => Ok(builder.with_store(InMemoryBookingStore::new())),
    }
}

#[cfg(not(feature = "postgres"))]
async fn with_store(builder: ServerBuilder, _config: &AppConfig) -> Result<ServerBuilder> {
    Ok(builder.with_store(InMemoryBookingStore::new()))
}

#[cfg(feature = "kafka")]
fn with_sink(builder: ServerBuilder, config: &AppConfig) -> Result<ServerBuilder> {
    match &config.messaging.broker {
        Some(broker) => {
            tracing::info!(broker = %broker, "publishing booking events to Kafka");
            Ok(builder.with_sink(KafkaNotificationSink::new(broker)?))
        }
        None => Ok(builder.with_sink(LogSink)),
    }
}

#[cfg(not(feature = "kafka"))]
fn with_sink(builder: ServerBuilder, _config: &AppConfig) -> Result<ServerBuilder> {
    Ok(builder.with_sink(LogSink))
}
