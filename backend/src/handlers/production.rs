//! HTTP handlers for production runs

use axum::{extract::State, http::StatusCode, Json};

use crate::error::AppResult;
use crate::services::production::{ProductionReport, ProductionService, RunProductionInput};
use crate::AppState;

pub async fn run_production(
    State(state): State<AppState>,
    Json(input): Json<RunProductionInput>,
) -> AppResult<(StatusCode, Json<ProductionReport>)> {
    let service = ProductionService::new(state.ledger);
    let report = service.run_production(input).await?;
    Ok((StatusCode::CREATED, Json(report)))
}
