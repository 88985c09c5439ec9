//! Axum extractor producing a [`RawRequest`]
//!
//! The extractor captures the URL, the query string and, for JSON
//! requests, the body object. Binding against a field set happens
//! afterwards in the handler.
//!
//! # Usage
//!
//! ```rust,ignore
//! pub async fn create_booking(
//!     State(state): State<AppState>,
//!     raw: RawRequest,
//! ) -> Result<ApiResponse<Booking>, BookingError> {
//!     let params = state.binder.bind(&state.fields.create, &raw)?;
//!     // ...
//! }
//! ```

use axum::{
    body::Bytes,
    extract::{FromRequest, Query, Request},
    http::header,
};
use serde_json::Value;
use std::collections::HashMap;

use super::binder::RawRequest;
use crate::core::error::BookingError;

impl<S> FromRequest<S> for RawRequest
where
    S: Send + Sync,
{
    type Rejection = BookingError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let uri = req.uri().clone();
        let is_json = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(is_json_content_type);

        let Query(query): Query<HashMap<String, String>> = Query::try_from_uri(&uri)?;

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| BookingError::bad_input(rejection.body_text()))?;

        let body = if is_json && !bytes.is_empty() {
            match serde_json::from_slice::<Value>(&bytes)? {
                Value::Object(map) => Some(map),
                _ => return Err(BookingError::bad_input("request body must be a JSON object")),
            }
        } else {
            None
        };

        Ok(RawRequest {
            url: uri.to_string(),
            query,
            body,
        })
    }
}

fn is_json_content_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
}
