//! Stock reports, reconciliation and product registration

use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{
    validate_non_negative, validate_required_text, InventoryMovement, MovementDirection, Product, ProductCategory,
    StockReconciliation,
};
use uuid::Uuid;

use super::ledger::LedgerContext;
use crate::error::AppResult;

/// Inventory service for stock reports and product master data
#[derive(Clone)]
pub struct InventoryService {
    ctx: LedgerContext,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterProductInput {
    pub name: String,
    pub category: ProductCategory,
    pub unit: String,
    pub standard_price: Decimal,
    pub low_stock_threshold: Decimal,
    #[serde(default)]
    pub initial_stock: Decimal,
    pub actor: String,
}

impl InventoryService {
    pub fn new(ctx: LedgerContext) -> Self {
        Self { ctx }
    }

    pub async fn list_products(&self) -> AppResult<Vec<Product>> {
        self.ctx.repo.list_products().await
    }

    /// Sellable products with `0 < stock <= threshold`
    pub async fn low_stock_products(&self) -> AppResult<Vec<Product>> {
        let products = self.ctx.repo.list_products().await?;
        Ok(products.into_iter().filter(Product::is_low_stock).collect())
    }

    /// Compare stored stock with the signed sum of the product's movements
    pub async fn reconcile_product(&self, product_id: Uuid) -> AppResult<StockReconciliation> {
        let product = self.ctx.repo.get_product(product_id).await?;
        let movements = self.ctx.repo.movements_for_product(product_id).await?;
        let reconciliation = StockReconciliation::new(product.id, product.name, product.current_stock, &movements);

        if !reconciliation.balanced {
            tracing::warn!(
                product_id = %product_id,
                recorded = %reconciliation.recorded_stock,
                movements = %reconciliation.movement_total,
                "Stock does not match movement history"
            );
        }
        Ok(reconciliation)
    }

    pub async fn product_movements(&self, product_id: Uuid) -> AppResult<Vec<InventoryMovement>> {
        self.ctx.repo.get_product(product_id).await?;
        self.ctx.repo.movements_for_product(product_id).await
    }

    /// Add a product; opening stock is recorded as an IN movement
    pub async fn register_product(&self, input: RegisterProductInput) -> AppResult<Product> {
        validate_required_text("name", &input.name)?;
        validate_required_text("unit", &input.unit)?;
        validate_required_text("actor", &input.actor)?;
        validate_non_negative("standard_price", input.standard_price)?;
        validate_non_negative("low_stock_threshold", input.low_stock_threshold)?;
        validate_non_negative("initial_stock", input.initial_stock)?;

        let mut product = Product::new(
            input.name.trim(),
            input.category,
            input.unit.trim(),
            input.standard_price,
            input.low_stock_threshold,
        );
        product.created_at = self.ctx.clock.now();
        product.current_stock = input.initial_stock;

        let opening = (input.initial_stock > Decimal::ZERO).then(|| {
            InventoryMovement::new(
                product.id,
                MovementDirection::In,
                input.initial_stock,
                "Opening stock",
                &input.actor,
                product.created_at,
            )
        });

        self.ctx.repo.insert_product(&product, opening.as_ref()).await?;
        tracing::info!(product_id = %product.id, name = %product.name, stock = %product.current_stock, "Product registered");
        Ok(product)
    }
}
