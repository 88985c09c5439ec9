//! Route table

use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::AppState;
use super::handlers::{
    create_booking, delete_booking, get_booking, list_bookings, not_found, ping, report_summary,
    update_booking,
};

/// Prefix every public route is mounted under
pub const API_PREFIX: &str = "/v1";

/// Build the booking routes
///
/// - GET    /v1/ping
/// - GET    /v1/bookings
/// - POST   /v1/bookings
/// - GET    /v1/bookings/{id}
/// - PUT    /v1/bookings/{id}
/// - DELETE /v1/bookings/{id}
/// - GET    /v1/reports/summary
pub fn build_routes(state: AppState) -> Router {
    let api = Router::new()
        .route("/ping", get(ping))
        .route("/bookings", get(list_bookings).post(create_booking))
        .route(
            "/bookings/{id}",
            get(get_booking).put(update_booking).delete(delete_booking),
        )
        .route("/reports/summary", get(report_summary))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    Router::new()
        .nest(API_PREFIX, api)
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
