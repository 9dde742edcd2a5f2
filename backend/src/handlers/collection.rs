//! HTTP handlers for milk collection endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use shared::{DeliveryPreview, MilkDelivery};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::collection::{
    CollectionService, CommitDeliveryInput, CommitRejectionInput, DeliveryReceipt, FarmerMonthSummary,
    GradeDeliveryInput, RejectionReceipt,
};
use crate::AppState;

/// Grade and price a reading for live display
pub async fn grade_delivery(
    State(state): State<AppState>,
    Json(input): Json<GradeDeliveryInput>,
) -> AppResult<Json<DeliveryPreview>> {
    let service = CollectionService::new(state.ledger);
    let preview = service.grade_delivery(input).await?;
    Ok(Json(preview))
}

/// Record an accepted delivery
pub async fn commit_delivery(
    State(state): State<AppState>,
    Json(input): Json<CommitDeliveryInput>,
) -> AppResult<(StatusCode, Json<DeliveryReceipt>)> {
    let service = CollectionService::new(state.ledger);
    let receipt = service.commit_delivery(input).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// Record a rejected delivery
pub async fn commit_rejection(
    State(state): State<AppState>,
    Json(input): Json<CommitRejectionInput>,
) -> AppResult<(StatusCode, Json<RejectionReceipt>)> {
    let service = CollectionService::new(state.ledger);
    let receipt = service.commit_rejection(input).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

pub async fn get_farmer_month_summary(
    State(state): State<AppState>,
    Path(farmer_id): Path<Uuid>,
) -> AppResult<Json<FarmerMonthSummary>> {
    let service = CollectionService::new(state.ledger);
    let summary = service.farmer_month_summary(farmer_id).await?;
    Ok(Json(summary))
}

pub async fn list_farmer_deliveries(
    State(state): State<AppState>,
    Path(farmer_id): Path<Uuid>,
) -> AppResult<Json<Vec<MilkDelivery>>> {
    let service = CollectionService::new(state.ledger);
    let deliveries = service.farmer_deliveries(farmer_id).await?;
    Ok(Json(deliveries))
}
