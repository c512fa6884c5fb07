//! # HTTP Service
//!
//! JSON endpoints over the Merkle engine. Handlers only parse, delegate to
//! [`TreeStore`](crate::store::TreeStore) and the proof functions, and shape
//! the response.
//!
//! ## Middleware Stack
//!
//! ```text
//! TraceLayer → Handler
//! ```

pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

pub use error::AppError;
pub use state::AppState;

/// Assemble the application router.
pub fn app(state: AppState) -> Router {
    let api = routes::router()
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let health = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness));

    Router::new().merge(health).merge(api)
}

async fn liveness() -> &'static str {
    "ok"
}

async fn readiness() -> &'static str {
    "ready"
}
