//! HTTP handlers for point-of-sale endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use shared::CartQuote;
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::sales::{
    AdjustBalanceInput, BalanceAdjustment, CommitSaleInput, PriceCartInput, SaleReceipt, SalesService,
};
use crate::AppState;

/// Price a cart without recording it
pub async fn price_cart(
    State(state): State<AppState>,
    Json(input): Json<PriceCartInput>,
) -> AppResult<Json<CartQuote>> {
    let service = SalesService::new(state.ledger);
    let quote = service.price_cart(input).await?;
    Ok(Json(quote))
}

/// Confirm a sale
pub async fn commit_sale(
    State(state): State<AppState>,
    Json(input): Json<CommitSaleInput>,
) -> AppResult<(StatusCode, Json<SaleReceipt>)> {
    let service = SalesService::new(state.ledger);
    let receipt = service.commit_sale(input).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// Record a payment or add credit on a customer's balance
pub async fn adjust_customer_balance(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
    Json(input): Json<AdjustBalanceInput>,
) -> AppResult<Json<BalanceAdjustment>> {
    let service = SalesService::new(state.ledger);
    let adjustment = service.adjust_balance(customer_id, input).await?;
    Ok(Json(adjustment))
}
