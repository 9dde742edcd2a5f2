//! HTTP handlers for inventory endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use shared::{InventoryMovement, Product, StockReconciliation};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::inventory::{InventoryService, RegisterProductInput};
use crate::AppState;

pub async fn list_products(State(state): State<AppState>) -> AppResult<Json<Vec<Product>>> {
    let service = InventoryService::new(state.ledger);
    Ok(Json(service.list_products().await?))
}

/// Register a product with optional opening stock
pub async fn register_product(
    State(state): State<AppState>,
    Json(input): Json<RegisterProductInput>,
) -> AppResult<(StatusCode, Json<Product>)> {
    let service = InventoryService::new(state.ledger);
    let product = service.register_product(input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// Products running low on stock
pub async fn get_low_stock(State(state): State<AppState>) -> AppResult<Json<Vec<Product>>> {
    let service = InventoryService::new(state.ledger);
    let products = service.low_stock_products().await?;
    Ok(Json(products))
}

pub async fn reconcile_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<StockReconciliation>> {
    let service = InventoryService::new(state.ledger);
    let reconciliation = service.reconcile_product(product_id).await?;
    Ok(Json(reconciliation))
}

pub async fn list_product_movements(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Vec<InventoryMovement>>> {
    let service = InventoryService::new(state.ledger);
    let movements = service.product_movements(product_id).await?;
    Ok(Json(movements))
}
