//! PostgreSQL repository
//!
//! Each commit runs in one transaction. Versioned rows are updated with
//! `WHERE id = $1 AND version = $2`; a zero-row update aborts the transaction.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use shared::{
    Customer, DateRange, DiscountPolicy, EngineError, Farmer, InventoryMovement, MilkDelivery, Product,
};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{
    CustomerUpdate, DeliveryCommit, DeliveryTotals, FarmerUpdate, LedgerRepository, ProductionCommit, SaleCommit,
    StockChange,
};
use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct PgLedgerRepository {
    db: PgPool,
}

impl PgLedgerRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

/// Parse a text column into a domain enum
fn decode<T: FromStr<Err = EngineError>>(column: &str, value: &str) -> AppResult<T> {
    value
        .parse()
        .map_err(|_| AppError::Internal(format!("invalid {} '{}' in database", column, value)))
}

#[derive(Debug, FromRow)]
struct FarmerRow {
    id: Uuid,
    name: String,
    contact: Option<String>,
    address: Option<String>,
    loyalty_tier: String,
    bonus_earned: Decimal,
    version: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<FarmerRow> for Farmer {
    type Error = AppError;

    fn try_from(row: FarmerRow) -> AppResult<Self> {
        Ok(Farmer {
            id: row.id,
            name: row.name,
            contact: row.contact,
            address: row.address,
            loyalty_tier: decode("loyalty_tier", &row.loyalty_tier)?,
            bonus_earned: row.bonus_earned,
            version: row.version,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct CustomerRow {
    id: Uuid,
    name: String,
    customer_type: String,
    contact: Option<String>,
    discount_type: String,
    discount_value: Decimal,
    loyalty_points: i64,
    outstanding_balance: Decimal,
    version: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<CustomerRow> for Customer {
    type Error = AppError;

    fn try_from(row: CustomerRow) -> AppResult<Self> {
        Ok(Customer {
            id: row.id,
            name: row.name,
            customer_type: decode("customer_type", &row.customer_type)?,
            contact: row.contact,
            discount: DiscountPolicy::from_parts(&row.discount_type, row.discount_value)
                .map_err(|_| AppError::Internal(format!("invalid discount_type '{}' in database", row.discount_type)))?,
            loyalty_points: row.loyalty_points,
            outstanding_balance: row.outstanding_balance,
            version: row.version,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    category: String,
    unit: String,
    standard_price: Decimal,
    current_stock: Decimal,
    low_stock_threshold: Decimal,
    version: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = AppError;

    fn try_from(row: ProductRow) -> AppResult<Self> {
        Ok(Product {
            id: row.id,
            name: row.name,
            category: decode("category", &row.category)?,
            unit: row.unit,
            standard_price: row.standard_price,
            current_stock: row.current_stock,
            low_stock_threshold: row.low_stock_threshold,
            version: row.version,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct MovementRow {
    id: Uuid,
    product_id: Uuid,
    direction: String,
    quantity: Decimal,
    reason: String,
    recorded_by: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<MovementRow> for InventoryMovement {
    type Error = AppError;

    fn try_from(row: MovementRow) -> AppResult<Self> {
        Ok(InventoryMovement {
            id: row.id,
            product_id: row.product_id,
            direction: decode("direction", &row.direction)?,
            quantity: row.quantity,
            reason: row.reason,
            recorded_by: row.recorded_by,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct DeliveryRow {
    id: Uuid,
    farmer_id: Uuid,
    litres: Decimal,
    fat_percent: Decimal,
    snf_percent: Decimal,
    temperature_celsius: Decimal,
    quality_score: Decimal,
    price_per_litre: Decimal,
    total_payment: Decimal,
    outcome: String,
    rejection_reason: Option<String>,
    notes: Option<String>,
    recorded_by: String,
    delivery_date: NaiveDate,
    created_at: DateTime<Utc>,
}

impl TryFrom<DeliveryRow> for MilkDelivery {
    type Error = AppError;

    fn try_from(row: DeliveryRow) -> AppResult<Self> {
        Ok(MilkDelivery {
            id: row.id,
            farmer_id: row.farmer_id,
            litres: row.litres,
            fat_percent: row.fat_percent,
            snf_percent: row.snf_percent,
            temperature_celsius: row.temperature_celsius,
            quality_score: row.quality_score,
            price_per_litre: row.price_per_litre,
            total_payment: row.total_payment,
            outcome: decode("outcome", &row.outcome)?,
            rejection_reason: row.rejection_reason,
            notes: row.notes,
            recorded_by: row.recorded_by,
            delivery_date: row.delivery_date,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct TotalsRow {
    litres: Decimal,
    payment: Decimal,
    deliveries: i64,
}

#[derive(Debug, FromRow)]
struct StockRow {
    name: String,
    current_stock: Decimal,
    version: i64,
}

const PRODUCT_COLUMNS: &str =
    "id, name, category, unit, standard_price, current_stock, low_stock_threshold, version, created_at";

async fn insert_movement(tx: &mut Transaction<'_, Postgres>, movement: &InventoryMovement) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO inventory_movements (id, product_id, direction, quantity, reason, recorded_by, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(movement.id)
    .bind(movement.product_id)
    .bind(movement.direction.as_str())
    .bind(movement.quantity)
    .bind(&movement.reason)
    .bind(&movement.recorded_by)
    .bind(movement.created_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Apply a guarded stock change and append its movement
async fn apply_stock(tx: &mut Transaction<'_, Postgres>, change: &StockChange) -> AppResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE products
        SET current_stock = current_stock + $3, version = version + 1
        WHERE id = $1 AND version = $2 AND current_stock + $3 >= 0
        "#,
    )
    .bind(change.product_id())
    .bind(change.expected_version)
    .bind(change.delta())
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        let current = sqlx::query_as::<_, StockRow>("SELECT name, current_stock, version FROM products WHERE id = $1")
            .bind(change.product_id())
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        if current.version != change.expected_version {
            return Err(AppError::ConcurrencyConflict(format!("product {}", current.name)));
        }
        return Err(AppError::InsufficientStock {
            product: current.name,
            requested: change.movement.quantity,
            available: current.current_stock,
        });
    }

    insert_movement(tx, &change.movement).await
}

async fn apply_farmer(tx: &mut Transaction<'_, Postgres>, update: &FarmerUpdate) -> AppResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE farmers
        SET loyalty_tier = $3, bonus_earned = $4, version = version + 1
        WHERE id = $1 AND version = $2
        "#,
    )
    .bind(update.farmer_id)
    .bind(update.expected_version)
    .bind(update.loyalty_tier.as_str())
    .bind(update.bonus_earned)
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::ConcurrencyConflict(format!("farmer {}", update.farmer_id)));
    }
    Ok(())
}

async fn apply_customer(tx: &mut Transaction<'_, Postgres>, update: &CustomerUpdate) -> AppResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE customers
        SET loyalty_points = $3, outstanding_balance = $4, version = version + 1
        WHERE id = $1 AND version = $2
        "#,
    )
    .bind(update.customer_id)
    .bind(update.expected_version)
    .bind(update.loyalty_points)
    .bind(update.outstanding_balance)
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::ConcurrencyConflict(format!("customer {}", update.customer_id)));
    }
    Ok(())
}

#[async_trait]
impl LedgerRepository for PgLedgerRepository {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }

    async fn get_farmer(&self, id: Uuid) -> AppResult<Farmer> {
        sqlx::query_as::<_, FarmerRow>(
            r#"
            SELECT id, name, contact, address, loyalty_tier, bonus_earned, version, created_at
            FROM farmers
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Farmer".to_string()))?
        .try_into()
    }

    async fn get_customer(&self, id: Uuid) -> AppResult<Customer> {
        sqlx::query_as::<_, CustomerRow>(
            r#"
            SELECT id, name, customer_type, contact, discount_type, discount_value,
                   loyalty_points, outstanding_balance, version, created_at
            FROM customers
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Customer".to_string()))?
        .try_into()
    }

    async fn get_product(&self, id: Uuid) -> AppResult<Product> {
        sqlx::query_as::<_, ProductRow>(&format!("SELECT {} FROM products WHERE id = $1", PRODUCT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Product".to_string()))?
            .try_into()
    }

    async fn raw_milk_product(&self) -> AppResult<Product> {
        sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM products WHERE category = 'raw_milk' ORDER BY created_at LIMIT 1",
            PRODUCT_COLUMNS
        ))
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Raw milk product".to_string()))?
        .try_into()
    }

    async fn list_products(&self) -> AppResult<Vec<Product>> {
        sqlx::query_as::<_, ProductRow>(&format!("SELECT {} FROM products ORDER BY name", PRODUCT_COLUMNS))
            .fetch_all(&self.db)
            .await?
            .into_iter()
            .map(Product::try_from)
            .collect()
    }

    async fn farmer_delivery_totals(&self, farmer_id: Uuid, range: DateRange) -> AppResult<DeliveryTotals> {
        let row = sqlx::query_as::<_, TotalsRow>(
            r#"
            SELECT COALESCE(SUM(litres), 0) AS litres,
                   COALESCE(SUM(total_payment), 0) AS payment,
                   COUNT(*) AS deliveries
            FROM milk_deliveries
            WHERE farmer_id = $1 AND outcome = 'accepted'
              AND delivery_date BETWEEN $2 AND $3
            "#,
        )
        .bind(farmer_id)
        .bind(range.start)
        .bind(range.end)
        .fetch_one(&self.db)
        .await?;

        Ok(DeliveryTotals {
            litres: row.litres,
            payment: row.payment,
            deliveries: row.deliveries,
        })
    }

    async fn farmer_delivered_on(&self, farmer_id: Uuid, date: NaiveDate) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM milk_deliveries WHERE farmer_id = $1 AND delivery_date = $2)",
        )
        .bind(farmer_id)
        .bind(date)
        .fetch_one(&self.db)
        .await?;
        Ok(exists)
    }

    async fn movements_for_product(&self, product_id: Uuid) -> AppResult<Vec<InventoryMovement>> {
        sqlx::query_as::<_, MovementRow>(
            r#"
            SELECT id, product_id, direction, quantity, reason, recorded_by, created_at
            FROM inventory_movements
            WHERE product_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(InventoryMovement::try_from)
        .collect()
    }

    async fn deliveries_for_farmer(&self, farmer_id: Uuid) -> AppResult<Vec<MilkDelivery>> {
        sqlx::query_as::<_, DeliveryRow>(
            r#"
            SELECT id, farmer_id, litres, fat_percent, snf_percent, temperature_celsius,
                   quality_score, price_per_litre, total_payment, outcome, rejection_reason,
                   notes, recorded_by, delivery_date, created_at
            FROM milk_deliveries
            WHERE farmer_id = $1
            ORDER BY delivery_date DESC, created_at DESC
            "#,
        )
        .bind(farmer_id)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(MilkDelivery::try_from)
        .collect()
    }

    async fn insert_farmer(&self, farmer: &Farmer) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO farmers (id, name, contact, address, loyalty_tier, bonus_earned, version, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(farmer.id)
        .bind(&farmer.name)
        .bind(&farmer.contact)
        .bind(&farmer.address)
        .bind(farmer.loyalty_tier.as_str())
        .bind(farmer.bonus_earned)
        .bind(farmer.version)
        .bind(farmer.created_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn insert_customer(&self, customer: &Customer) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO customers (
                id, name, customer_type, contact, discount_type, discount_value,
                loyalty_points, outstanding_balance, version, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(customer.id)
        .bind(&customer.name)
        .bind(customer.customer_type.as_str())
        .bind(&customer.contact)
        .bind(customer.discount.kind())
        .bind(customer.discount.value())
        .bind(customer.loyalty_points)
        .bind(customer.outstanding_balance)
        .bind(customer.version)
        .bind(customer.created_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn insert_product(&self, product: &Product, opening: Option<&InventoryMovement>) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let existing: Option<Uuid> = sqlx::query_scalar("SELECT id FROM products WHERE name = $1")
            .bind(&product.name)
            .fetch_optional(&mut *tx)
            .await?;
        if existing.is_some() {
            return Err(AppError::validation("name", format!("product '{}' already exists", product.name)));
        }

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, category, unit, standard_price, current_stock,
                low_stock_threshold, version, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(product.category.as_str())
        .bind(&product.unit)
        .bind(product.standard_price)
        .bind(product.current_stock)
        .bind(product.low_stock_threshold)
        .bind(product.version)
        .bind(product.created_at)
        .execute(&mut *tx)
        .await?;

        if let Some(movement) = opening {
            insert_movement(&mut tx, movement).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn commit_delivery(&self, commit: &DeliveryCommit) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        if let Some(change) = &commit.stock {
            apply_stock(&mut tx, change).await?;
        }
        if let Some(update) = &commit.farmer {
            apply_farmer(&mut tx, update).await?;
        }

        let d = &commit.delivery;
        sqlx::query(
            r#"
            INSERT INTO milk_deliveries (
                id, farmer_id, litres, fat_percent, snf_percent, temperature_celsius,
                quality_score, price_per_litre, total_payment, outcome, rejection_reason,
                notes, recorded_by, delivery_date, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(d.id)
        .bind(d.farmer_id)
        .bind(d.litres)
        .bind(d.fat_percent)
        .bind(d.snf_percent)
        .bind(d.temperature_celsius)
        .bind(d.quality_score)
        .bind(d.price_per_litre)
        .bind(d.total_payment)
        .bind(d.outcome.as_str())
        .bind(&d.rejection_reason)
        .bind(&d.notes)
        .bind(&d.recorded_by)
        .bind(d.delivery_date)
        .bind(d.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn commit_sale(&self, commit: &SaleCommit) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let s = &commit.sale;
        sqlx::query(
            r#"
            INSERT INTO sales (
                id, customer_id, customer_name, subtotal, promo_discount, points_discount,
                vat, grand_total, payment_method, amount_paid, points_redeemed,
                points_earned, recorded_by, sale_date, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(s.id)
        .bind(s.customer_id)
        .bind(&s.customer_name)
        .bind(s.subtotal)
        .bind(s.promo_discount)
        .bind(s.points_discount)
        .bind(s.vat)
        .bind(s.grand_total)
        .bind(s.payment_method.as_str())
        .bind(s.amount_paid)
        .bind(s.points_redeemed)
        .bind(s.points_earned)
        .bind(&s.recorded_by)
        .bind(s.sale_date)
        .bind(s.created_at)
        .execute(&mut *tx)
        .await?;

        for line in &commit.lines {
            sqlx::query(
                r#"
                INSERT INTO sale_line_items (id, sale_id, product_id, quantity, unit_price, line_total)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(line.id)
            .bind(line.sale_id)
            .bind(line.product_id)
            .bind(line.quantity)
            .bind(line.unit_price)
            .bind(line.line_total)
            .execute(&mut *tx)
            .await?;
        }

        for change in &commit.stock {
            apply_stock(&mut tx, change).await?;
        }
        if let Some(update) = &commit.customer {
            apply_customer(&mut tx, update).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn commit_production(&self, commit: &ProductionCommit) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        apply_stock(&mut tx, &commit.raw_milk).await?;
        apply_stock(&mut tx, &commit.finished_goods).await?;

        let b = &commit.batch;
        sqlx::query(
            r#"
            INSERT INTO production_batches (
                id, product_id, units_produced, raw_required_litres, waste_litres,
                raw_used_litres, yield_percent, production_date, expiry_date, notes,
                recorded_by, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(b.id)
        .bind(b.product_id)
        .bind(b.units_produced)
        .bind(b.raw_required_litres)
        .bind(b.waste_litres)
        .bind(b.raw_used_litres)
        .bind(b.yield_percent)
        .bind(b.production_date)
        .bind(b.expiry_date)
        .bind(&b.notes)
        .bind(&b.recorded_by)
        .bind(b.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn commit_balance_adjustment(&self, update: &CustomerUpdate) -> AppResult<()> {
        let mut tx = self.db.begin().await?;
        apply_customer(&mut tx, update).await?;
        tx.commit().await?;
        Ok(())
    }
}
