//! # booking-rs
//!
//! A booking management API: create, list, update, soft-delete and
//! summarise bookings over HTTP.
//!
//! ## Features
//!
//! - **Two-stage validation**: a declarative binder coerces HTTP parameters,
//!   then a per-operation schema re-validates them
//! - **Row-locking transactions**: updates and deletes lock their target row
//!   with a bounded wait and roll back on any failure
//! - **Pluggable storage**: in-memory by default, PostgreSQL behind the
//!   `postgres` feature
//! - **Creation notifications**: best-effort `booking_created` events to an
//!   in-process bus, the log, or Kafka behind the `kafka` feature
//! - **Uniform envelopes**: `{success, data}` on success and
//!   `{success: false, error: {code, message}}` on failure
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use booking::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     init_tracing();
//!
//!     ServerBuilder::new()
//!         .with_config(AppConfig::default().apply_env_overrides()?)
//!         .with_store(InMemoryBookingStore::new())
//!         .with_sink(LogSink)
//!         .serve()
//!         .await
//! }
//! ```

pub mod config;
pub mod core;
pub mod notify;
pub mod server;
pub mod storage;
pub mod workflow;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Configuration ===
    pub use crate::config::{AppConfig, init_tracing};

    // === Domain ===
    pub use crate::core::{
        booking::{Booking, BookingChanges, BookingStatus, DateCount, NewBooking},
        error::{BookingError, ErrorBody, Result},
        events::{BookingEvent, EventBus, EventEnvelope, LogSink, NotificationSink},
        query::{BookingFilter, Page, PageRequest, PaginatedResponse, PaginationMeta},
        store::{BookingStore, EntityKind, RowFilter, StoreTransaction},
        transaction::{LockSpec, LockingTransactionRunner},
        validation::{
            FieldSet, FieldSpec, FieldType, Location, Params, PropertySchema, RawRequest,
            RequestParameterBinder, Schema, SchemaValidator,
        },
    };

    // === Workflow ===
    pub use crate::workflow::{BookingFields, BookingSchemas, BookingWorkflow};

    // === Storage ===
    pub use crate::storage::InMemoryBookingStore;
    #[cfg(feature = "postgres")]
    pub use crate::storage::PostgresBookingStore;

    // === Notifications ===
    #[cfg(feature = "kafka")]
    pub use crate::notify::KafkaNotificationSink;

    // === Server ===
    pub use crate::server::{ApiResponse, AppState, ServerBuilder};

    // === Re-exports from dependencies ===
    pub use async_trait::async_trait;
    pub use chrono::{DateTime, Utc};
    pub use serde::{Deserialize, Serialize};
    pub use serde_json::Value;
}
