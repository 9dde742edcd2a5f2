//! In-memory repository for tests and local runs
//!
//! A single `RwLock` guards the whole state. Commits take the write lock,
//! check every version and stock level first, then apply all writes.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use shared::{
    Customer, DateRange, DeliveryOutcome, Farmer, InventoryMovement, MilkDelivery, Product, ProductCategory,
    ProductionBatch, Sale, SaleLineItem,
};
use shared::money::checked_add;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    CustomerUpdate, DeliveryCommit, DeliveryTotals, FarmerUpdate, LedgerRepository, ProductionCommit, SaleCommit,
    StockChange,
};
use crate::error::{AppError, AppResult};

#[derive(Default)]
struct MemoryState {
    farmers: HashMap<Uuid, Farmer>,
    customers: HashMap<Uuid, Customer>,
    products: HashMap<Uuid, Product>,
    movements: Vec<InventoryMovement>,
    deliveries: Vec<MilkDelivery>,
    sales: Vec<Sale>,
    sale_lines: Vec<SaleLineItem>,
    batches: Vec<ProductionBatch>,
}

impl MemoryState {
    fn check_stock(&self, change: &StockChange) -> AppResult<()> {
        let product = self
            .products
            .get(&change.product_id())
            .ok_or_else(|| AppError::NotFound(format!("Product {}", change.product_id())))?;
        if product.version != change.expected_version {
            return Err(AppError::ConcurrencyConflict(format!("product {}", product.name)));
        }
        let remaining = product
            .current_stock
            .checked_add(change.delta())
            .ok_or_else(|| AppError::validation("quantity", "is too large"))?;
        if remaining < Decimal::ZERO {
            return Err(AppError::InsufficientStock {
                product: product.name.clone(),
                requested: change.movement.quantity,
                available: product.current_stock,
            });
        }
        Ok(())
    }

    fn check_farmer(&self, update: &FarmerUpdate) -> AppResult<()> {
        let farmer = self
            .farmers
            .get(&update.farmer_id)
            .ok_or_else(|| AppError::NotFound(format!("Farmer {}", update.farmer_id)))?;
        if farmer.version != update.expected_version {
            return Err(AppError::ConcurrencyConflict(format!("farmer {}", farmer.name)));
        }
        Ok(())
    }

    fn check_customer(&self, update: &CustomerUpdate) -> AppResult<()> {
        let customer = self
            .customers
            .get(&update.customer_id)
            .ok_or_else(|| AppError::NotFound(format!("Customer {}", update.customer_id)))?;
        if customer.version != update.expected_version {
            return Err(AppError::ConcurrencyConflict(format!("customer {}", customer.name)));
        }
        if update.outstanding_balance < Decimal::ZERO || update.loyalty_points < 0 {
            return Err(AppError::Internal(format!(
                "customer {} update would go negative",
                customer.name
            )));
        }
        Ok(())
    }

    // Apply steps run only after every check for the commit has passed.

    fn apply_stock(&mut self, change: &StockChange) {
        if let Some(product) = self.products.get_mut(&change.product_id()) {
            product.current_stock += change.delta();
            product.version += 1;
        }
        self.movements.push(change.movement.clone());
    }

    fn apply_farmer(&mut self, update: &FarmerUpdate) {
        if let Some(farmer) = self.farmers.get_mut(&update.farmer_id) {
            farmer.loyalty_tier = update.loyalty_tier;
            farmer.bonus_earned = update.bonus_earned;
            farmer.version += 1;
        }
    }

    fn apply_customer(&mut self, update: &CustomerUpdate) {
        if let Some(customer) = self.customers.get_mut(&update.customer_id) {
            customer.loyalty_points = update.loyalty_points;
            customer.outstanding_balance = update.outstanding_balance;
            customer.version += 1;
        }
    }
}

#[derive(Default)]
pub struct InMemoryLedgerRepository {
    state: RwLock<MemoryState>,
}

impl InMemoryLedgerRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sales(&self) -> Vec<Sale> {
        self.state.read().await.sales.clone()
    }

    pub async fn sale_lines(&self, sale_id: Uuid) -> Vec<SaleLineItem> {
        self.state
            .read()
            .await
            .sale_lines
            .iter()
            .filter(|line| line.sale_id == sale_id)
            .cloned()
            .collect()
    }

    pub async fn production_batches(&self) -> Vec<ProductionBatch> {
        self.state.read().await.batches.clone()
    }
}

#[async_trait]
impl LedgerRepository for InMemoryLedgerRepository {
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn get_farmer(&self, id: Uuid) -> AppResult<Farmer> {
        self.state
            .read()
            .await
            .farmers
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("Farmer".to_string()))
    }

    async fn get_customer(&self, id: Uuid) -> AppResult<Customer> {
        self.state
            .read()
            .await
            .customers
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("Customer".to_string()))
    }

    async fn get_product(&self, id: Uuid) -> AppResult<Product> {
        self.state
            .read()
            .await
            .products
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("Product".to_string()))
    }

    async fn raw_milk_product(&self) -> AppResult<Product> {
        self.state
            .read()
            .await
            .products
            .values()
            .filter(|p| p.category == ProductCategory::RawMilk)
            .min_by_key(|p| p.created_at)
            .cloned()
            .ok_or_else(|| AppError::NotFound("Raw milk product".to_string()))
    }

    async fn list_products(&self) -> AppResult<Vec<Product>> {
        let mut products: Vec<Product> = self.state.read().await.products.values().cloned().collect();
        products.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(products)
    }

    async fn farmer_delivery_totals(&self, farmer_id: Uuid, range: DateRange) -> AppResult<DeliveryTotals> {
        let state = self.state.read().await;
        Ok(state
            .deliveries
            .iter()
            .filter(|d| {
                d.farmer_id == farmer_id && d.outcome == DeliveryOutcome::Accepted && range.contains(d.delivery_date)
            })
            .try_fold(DeliveryTotals::default(), |mut totals, d| -> AppResult<DeliveryTotals> {
                totals.litres = checked_add("litres", totals.litres, d.litres)?;
                totals.payment = checked_add("total_payment", totals.payment, d.total_payment)?;
                totals.deliveries += 1;
                Ok(totals)
            })?)
    }

    async fn farmer_delivered_on(&self, farmer_id: Uuid, date: NaiveDate) -> AppResult<bool> {
        Ok(self
            .state
            .read()
            .await
            .deliveries
            .iter()
            .any(|d| d.farmer_id == farmer_id && d.delivery_date == date))
    }

    async fn movements_for_product(&self, product_id: Uuid) -> AppResult<Vec<InventoryMovement>> {
        Ok(self
            .state
            .read()
            .await
            .movements
            .iter()
            .filter(|m| m.product_id == product_id)
            .cloned()
            .collect())
    }

    async fn deliveries_for_farmer(&self, farmer_id: Uuid) -> AppResult<Vec<MilkDelivery>> {
        let state = self.state.read().await;
        Ok(state
            .deliveries
            .iter()
            .rev()
            .filter(|d| d.farmer_id == farmer_id)
            .cloned()
            .collect())
    }

    async fn insert_farmer(&self, farmer: &Farmer) -> AppResult<()> {
        self.state.write().await.farmers.insert(farmer.id, farmer.clone());
        Ok(())
    }

    async fn insert_customer(&self, customer: &Customer) -> AppResult<()> {
        self.state.write().await.customers.insert(customer.id, customer.clone());
        Ok(())
    }

    async fn insert_product(&self, product: &Product, opening: Option<&InventoryMovement>) -> AppResult<()> {
        let mut state = self.state.write().await;
        if state.products.values().any(|p| p.name == product.name) {
            return Err(AppError::validation("name", format!("product '{}' already exists", product.name)));
        }
        state.products.insert(product.id, product.clone());
        if let Some(movement) = opening {
            state.movements.push(movement.clone());
        }
        Ok(())
    }

    async fn commit_delivery(&self, commit: &DeliveryCommit) -> AppResult<()> {
        let mut state = self.state.write().await;
        if !state.farmers.contains_key(&commit.delivery.farmer_id) {
            return Err(AppError::NotFound("Farmer".to_string()));
        }
        if let Some(change) = &commit.stock {
            state.check_stock(change)?;
        }
        if let Some(update) = &commit.farmer {
            state.check_farmer(update)?;
        }

        if let Some(change) = &commit.stock {
            state.apply_stock(change);
        }
        if let Some(update) = &commit.farmer {
            state.apply_farmer(update);
        }
        state.deliveries.push(commit.delivery.clone());
        Ok(())
    }

    async fn commit_sale(&self, commit: &SaleCommit) -> AppResult<()> {
        let mut state = self.state.write().await;
        for change in &commit.stock {
            state.check_stock(change)?;
        }
        if let Some(update) = &commit.customer {
            state.check_customer(update)?;
        }

        for change in &commit.stock {
            state.apply_stock(change);
        }
        if let Some(update) = &commit.customer {
            state.apply_customer(update);
        }
        state.sales.push(commit.sale.clone());
        state.sale_lines.extend(commit.lines.iter().cloned());
        Ok(())
    }

    async fn commit_production(&self, commit: &ProductionCommit) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.check_stock(&commit.raw_milk)?;
        state.check_stock(&commit.finished_goods)?;

        state.apply_stock(&commit.raw_milk);
        state.apply_stock(&commit.finished_goods);
        state.batches.push(commit.batch.clone());
        Ok(())
    }

    async fn commit_balance_adjustment(&self, update: &CustomerUpdate) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.check_customer(update)?;
        state.apply_customer(update);
        Ok(())
    }
}
