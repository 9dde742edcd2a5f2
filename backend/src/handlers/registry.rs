//! HTTP handlers for farmer and customer registration

use axum::{extract::State, http::StatusCode, Json};
use shared::{Customer, Farmer};

use crate::error::AppResult;
use crate::services::registry::{RegisterCustomerInput, RegisterFarmerInput, RegistryService};
use crate::AppState;

pub async fn register_farmer(
    State(state): State<AppState>,
    Json(input): Json<RegisterFarmerInput>,
) -> AppResult<(StatusCode, Json<Farmer>)> {
    let service = RegistryService::new(state.ledger);
    let farmer = service.register_farmer(input).await?;
    Ok((StatusCode::CREATED, Json(farmer)))
}

pub async fn register_customer(
    State(state): State<AppState>,
    Json(input): Json<RegisterCustomerInput>,
) -> AppResult<(StatusCode, Json<Customer>)> {
    let service = RegistryService::new(state.ledger);
    let customer = service.register_customer(input).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}
