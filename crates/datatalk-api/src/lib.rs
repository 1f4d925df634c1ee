//! The HTTP façade: axum router wiring, mode-flag resolution, and the
//! correlation-id middleware. Everything that answers a question lives
//! in the component crates; this crate only translates HTTP in and out.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod state;

pub use config::Config;
pub use state::AppState;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/chat", post(handlers::chat::chat))
        .route("/queries/execute", post(handlers::queries::execute_queries))
        .route("/reports", get(handlers::reports::list_reports))
        .route("/reports/{id}", get(handlers::reports::get_report))
        .route("/test-ai-connection", get(handlers::ai::test_ai_connection))
        .route(
            "/datasets",
            post(handlers::datasets::register_dataset).get(handlers::datasets::list_datasets),
        )
        .route("/datasets/{id}", get(handlers::datasets::get_dataset))
        .layer(axum::middleware::from_fn(middleware::correlation_id))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
