//! HTTP handlers for booking operations
//!
//! Handlers bind the raw request against the operation's field set and
//! hand the parameters to the [`BookingWorkflow`](crate::workflow::BookingWorkflow).
//! Every failure propagates as a [`BookingError`] and renders as the
//! failure envelope.

use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use chrono::NaiveDate;
use std::collections::BTreeMap;

use super::AppState;
use super::response::ApiResponse;
use crate::core::booking::Booking;
use crate::core::error::{BookingError, Result};
use crate::core::query::PaginatedResponse;
use crate::core::validation::RawRequest;

/// GET /ping
pub async fn ping() -> ApiResponse<&'static str> {
    ApiResponse::ok("pong")
}

/// GET /bookings
pub async fn list_bookings(
    State(state): State<AppState>,
    raw: RawRequest,
) -> Result<ApiResponse<PaginatedResponse<Booking>>> {
    let params = state.binder.bind(&state.fields.paginate, &raw)?;
    let page = state.workflow.paginate(params).await?;
    Ok(ApiResponse::ok(page))
}

/// POST /bookings
pub async fn create_booking(
    State(state): State<AppState>,
    raw: RawRequest,
) -> Result<ApiResponse<Booking>> {
    let params = state.binder.bind(&state.fields.create, &raw)?;
    let booking = state.workflow.create(params).await?;
    Ok(ApiResponse::ok(booking))
}

/// GET /bookings/{id}
pub async fn get_booking(
    State(state): State<AppState>,
    id: std::result::Result<Path<i64>, PathRejection>,
) -> Result<ApiResponse<Booking>> {
    let Path(id) = id?;
    let booking = state.workflow.get(id).await?;
    Ok(ApiResponse::ok(booking))
}

/// PUT /bookings/{id}
pub async fn update_booking(
    State(state): State<AppState>,
    id: std::result::Result<Path<i64>, PathRejection>,
    raw: RawRequest,
) -> Result<ApiResponse<Booking>> {
    let Path(id) = id?;
    let params = state.binder.bind(&state.fields.update, &raw)?;
    let booking = state.workflow.update(id, params).await?;
    Ok(ApiResponse::ok(booking))
}

/// DELETE /bookings/{id}
pub async fn delete_booking(
    State(state): State<AppState>,
    id: std::result::Result<Path<i64>, PathRejection>,
) -> Result<ApiResponse<()>> {
    let Path(id) = id?;
    state.workflow.delete(id).await?;
    Ok(ApiResponse::empty())
}

/// GET /reports/summary
pub async fn report_summary(
    State(state): State<AppState>,
) -> Result<ApiResponse<BTreeMap<NaiveDate, i64>>> {
    let summary = state.workflow.summary_by_date().await?;
    Ok(ApiResponse::ok(summary))
}

/// Fallback for unknown routes
pub async fn not_found() -> BookingError {
    BookingError::not_found("resource not found")
}
