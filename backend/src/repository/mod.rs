//! Persistence boundary for the ledger
//!
//! Reads return the current committed state. Every commit is one atomic unit
//! of work that carries the versions it was computed from; if any of those
//! rows changed in the meantime the whole commit fails with
//! `AppError::ConcurrencyConflict` and nothing is written.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use shared::{
    Customer, DateRange, Farmer, InventoryMovement, LoyaltyTier, MilkDelivery, Product, ProductionBatch, Sale,
    SaleLineItem,
};
use uuid::Uuid;

use crate::error::AppResult;

mod memory;
mod postgres;

pub use memory::InMemoryLedgerRepository;
pub use postgres::PgLedgerRepository;

/// Stock change on one product, guarded by the version it was read at
#[derive(Debug, Clone)]
pub struct StockChange {
    pub expected_version: i64,
    pub movement: InventoryMovement,
}

impl StockChange {
    pub fn new(product: &Product, movement: InventoryMovement) -> Self {
        Self {
            expected_version: product.version,
            movement,
        }
    }

    pub fn product_id(&self) -> Uuid {
        self.movement.product_id
    }

    pub fn delta(&self) -> Decimal {
        self.movement.signed_quantity()
    }
}

/// New farmer state after an accepted delivery
#[derive(Debug, Clone)]
pub struct FarmerUpdate {
    pub farmer_id: Uuid,
    pub expected_version: i64,
    pub loyalty_tier: LoyaltyTier,
    pub bonus_earned: Decimal,
}

/// New customer balance and points
#[derive(Debug, Clone)]
pub struct CustomerUpdate {
    pub customer_id: Uuid,
    pub expected_version: i64,
    pub loyalty_points: i64,
    pub outstanding_balance: Decimal,
}

#[derive(Debug, Clone)]
pub struct DeliveryCommit {
    pub delivery: MilkDelivery,
    /// Raw milk receipt; absent for rejected deliveries
    pub stock: Option<StockChange>,
    pub farmer: Option<FarmerUpdate>,
}

#[derive(Debug, Clone)]
pub struct SaleCommit {
    pub sale: Sale,
    pub lines: Vec<SaleLineItem>,
    pub stock: Vec<StockChange>,
    /// Absent for walk-in sales
    pub customer: Option<CustomerUpdate>,
}

#[derive(Debug, Clone)]
pub struct ProductionCommit {
    pub batch: ProductionBatch,
    pub raw_milk: StockChange,
    pub finished_goods: StockChange,
}

/// Accepted volume and payment for a farmer over a date range
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
pub struct DeliveryTotals {
    pub litres: Decimal,
    pub payment: Decimal,
    pub deliveries: i64,
}

#[async_trait]
pub trait LedgerRepository: Send + Sync {
    /// Connectivity check for health probes
    async fn ping(&self) -> AppResult<()>;

    async fn get_farmer(&self, id: Uuid) -> AppResult<Farmer>;
    async fn get_customer(&self, id: Uuid) -> AppResult<Customer>;
    async fn get_product(&self, id: Uuid) -> AppResult<Product>;
    /// The product that collected milk is received into
    async fn raw_milk_product(&self) -> AppResult<Product>;
    async fn list_products(&self) -> AppResult<Vec<Product>>;

    /// Accepted deliveries only
    async fn farmer_delivery_totals(&self, farmer_id: Uuid, range: DateRange) -> AppResult<DeliveryTotals>;
    /// Whether any delivery, accepted or rejected, is recorded on `date`
    async fn farmer_delivered_on(&self, farmer_id: Uuid, date: NaiveDate) -> AppResult<bool>;
    /// Oldest first
    async fn movements_for_product(&self, product_id: Uuid) -> AppResult<Vec<InventoryMovement>>;
    /// Newest first
    async fn deliveries_for_farmer(&self, farmer_id: Uuid) -> AppResult<Vec<MilkDelivery>>;

    async fn insert_farmer(&self, farmer: &Farmer) -> AppResult<()>;
    async fn insert_customer(&self, customer: &Customer) -> AppResult<()>;
    /// `opening` must match the product's initial stock
    async fn insert_product(&self, product: &Product, opening: Option<&InventoryMovement>) -> AppResult<()>;

    async fn commit_delivery(&self, commit: &DeliveryCommit) -> AppResult<()>;
    async fn commit_sale(&self, commit: &SaleCommit) -> AppResult<()>;
    async fn commit_production(&self, commit: &ProductionCommit) -> AppResult<()>;
    async fn commit_balance_adjustment(&self, update: &CustomerUpdate) -> AppResult<()>;
}
