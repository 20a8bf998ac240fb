//! Router assembly for the commerce engine

use axum::{body::Body, extract::Request, middleware::Next, Router};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::state::SharedState;

/// Creates and configures the application router with all routes and
/// middleware.
pub fn create_app_router(state: SharedState) -> Router {
    // Middleware: log requests
    let log_layer = axum::middleware::from_fn(|req: Request<Body>, next: Next| async move {
        let method = req.method().clone();
        let uri = req.uri().clone();
        info!(%method, %uri, "request");
        let res = next.run(req).await;
        if res.status().is_server_error() {
            warn!(%method, %uri, status = %res.status(), "request failed");
        }
        res
    });

    // Middleware: CORS (permissive for local dev)
    let cors_layer = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(crate::cart::routes())
        .merge(crate::checkout::routes())
        .merge(crate::order::routes())
        .layer(log_layer)
        .layer(cors_layer)
        .with_state(state)
}
