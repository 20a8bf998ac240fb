use std::net::SocketAddr;
use std::sync::Arc;

use commerce_engine::catalog::InMemoryCatalog;
use commerce_engine::router::create_app_router;
use commerce_engine::state::AppState;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("commerce_engine=info")),
        )
        .init();

    // The standalone server runs against the demo catalog; a real
    // deployment swaps in a gateway backed by the catalog service.
    let catalog = Arc::new(InMemoryCatalog::with_demo_products());
    let state = Arc::new(AppState::new(catalog));

    let app = create_app_router(state);

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8000);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "commerce engine listening");

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
