//! HTTP server for the booking API
//!
//! This module provides a `ServerBuilder` that wires the store, the lock
//! runner, the notification sink and the workflow together and exposes
//! them under `/v1`.

pub mod builder;
pub mod handlers;
pub mod response;
pub mod router;

use std::sync::Arc;

use crate::core::validation::RequestParameterBinder;
use crate::workflow::{BookingFields, BookingWorkflow};

pub use builder::ServerBuilder;
pub use response::ApiResponse;
pub use router::{API_PREFIX, build_routes};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub workflow: Arc<BookingWorkflow>,
    pub binder: RequestParameterBinder,
    pub fields: Arc<BookingFields>,
}

impl AppState {
    pub fn new(workflow: Arc<BookingWorkflow>, fields: BookingFields) -> Self {
        Self {
            workflow,
            binder: RequestParameterBinder::new(),
            fields: Arc::new(fields),
        }
    }
}
