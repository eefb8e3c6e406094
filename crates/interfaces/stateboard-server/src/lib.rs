//! JSON read API over a [`QueryFacade`].

mod handlers;

use std::future::Future;

use axum::{routing::get, Router};
use stateboard_pipeline::QueryFacade;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use handlers::{ApiError, StateView};

pub fn router(facade: QueryFacade) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/states", get(handlers::list_states))
        .route("/api/state/*key", get(handlers::get_state))
        .route("/api/history/*key", get(handlers::get_history))
        .route("/healthz", get(handlers::health))
        .with_state(facade)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Serve the API on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, facade: QueryFacade, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "api listening");
    }
    axum::serve(listener, router(facade))
        .with_graceful_shutdown(shutdown)
        .await
}
