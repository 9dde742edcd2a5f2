//! Route definitions for the dairy cooperative ledger

use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/deliveries", delivery_routes())
        .nest("/farmers", farmer_routes())
        .nest("/customers", customer_routes())
        .nest("/sales", sales_routes())
        .route("/production", post(handlers::run_production))
        .nest("/inventory", inventory_routes())
}

/// Milk collection routes
fn delivery_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::commit_delivery))
        .route("/grade", post(handlers::grade_delivery))
        .route("/rejections", post(handlers::commit_rejection))
}

fn farmer_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::register_farmer))
        .route("/:id/month-summary", get(handlers::get_farmer_month_summary))
        .route("/:id/deliveries", get(handlers::list_farmer_deliveries))
}

fn customer_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::register_customer))
        .route("/:id/balance", post(handlers::adjust_customer_balance))
}

/// Point-of-sale routes
fn sales_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::commit_sale))
        .route("/price", post(handlers::price_cart))
}

fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(handlers::list_products).post(handlers::register_product))
        .route("/low-stock", get(handlers::get_low_stock))
        .route("/products/:id/reconcile", get(handlers::reconcile_product))
        .route("/products/:id/movements", get(handlers::list_product_movements))
}
