//! Shopper session resolution
//!
//! The engine is session-scoped: every cart, checkout session and order
//! lookup is keyed by the shopper's session id, carried in the
//! `x-cart-session` header. A request without one gets a fresh uuid, echoed
//! back in the response so the caller can persist it.

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::response::Response;
use uuid::Uuid;

pub const SESSION_HEADER: &str = "x-cart-session";

/// Reads the session id from the request headers, minting a new one when
/// absent. The bool reports whether a new session was started.
pub fn resolve_session_id(headers: &HeaderMap) -> (String, bool) {
    match headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
    {
        Some(id) => (id.to_string(), false),
        None => (Uuid::new_v4().simple().to_string(), true),
    }
}

/// Echoes a freshly minted session id back to the caller.
pub fn attach_session_header(response: &mut Response, session_id: &str) {
    if let Ok(value) = HeaderValue::from_str(session_id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(SESSION_HEADER), value);
    }
}
