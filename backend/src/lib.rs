//! Dairy cooperative ledger
//!
//! Milk collection, point-of-sale and production for a dairy cooperative.
//! Pure grading and pricing live in the `shared` crate; this crate owns the
//! atomic ledger, persistence and the HTTP surface.

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod clock;
pub mod config;
pub mod error;
pub mod handlers;
pub mod repository;
pub mod routes;
pub mod services;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use services::LedgerContext;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub ledger: LedgerContext,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(ledger: LedgerContext) -> Self {
        let config = ledger.config.clone();
        Self { ledger, config }
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Dairy Cooperative Ledger API v1.0"
}
