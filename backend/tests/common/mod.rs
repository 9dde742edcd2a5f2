//! Shared fixtures for ledger integration tests
#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDate;
use dairy_ledger::clock::FixedClock;
use dairy_ledger::config::Config;
use dairy_ledger::repository::InMemoryLedgerRepository;
use dairy_ledger::services::inventory::RegisterProductInput;
use dairy_ledger::services::registry::{RegisterCustomerInput, RegisterFarmerInput};
use dairy_ledger::services::{InventoryService, LedgerContext, RecordingNotificationSink, RegistryService};
use rust_decimal::Decimal;
use shared::{Customer, CustomerType, DiscountPolicy, Farmer, LoyaltyTier, Product, ProductCategory};

// Helper to create Decimal from string
pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Business date every fixture runs on unless told otherwise
pub fn today() -> NaiveDate {
    date(2024, 6, 15)
}

pub const ACTOR: &str = "clerk.maria";

pub struct Fixture {
    pub ctx: LedgerContext,
    pub repo: Arc<InMemoryLedgerRepository>,
    pub notifier: Arc<RecordingNotificationSink>,
    pub raw_milk: Product,
    pub fresh_milk: Product,
    pub yogurt: Product,
    pub cheese: Product,
}

impl Fixture {
    /// Same repository and sinks, different business date
    pub fn on(&self, day: NaiveDate) -> LedgerContext {
        LedgerContext::new(
            self.repo.clone(),
            self.notifier.clone(),
            Arc::new(FixedClock::on(day)),
            self.ctx.config.clone(),
        )
    }

    pub async fn product(&self, product: &Product) -> Product {
        use dairy_ledger::repository::LedgerRepository;
        self.repo.get_product(product.id).await.unwrap()
    }

    pub async fn farmer(&self, tier: LoyaltyTier) -> Farmer {
        RegistryService::new(self.ctx.clone())
            .register_farmer(RegisterFarmerInput {
                name: "Juan Dela Cruz".to_string(),
                contact: Some("0917 555 0101".to_string()),
                address: None,
                loyalty_tier: tier,
            })
            .await
            .unwrap()
    }

    pub async fn customer(&self, discount: DiscountPolicy, points: i64) -> Customer {
        RegistryService::new(self.ctx.clone())
            .register_customer(RegisterCustomerInput {
                name: "Calapan Grocery".to_string(),
                customer_type: CustomerType::Reseller,
                contact: None,
                discount,
                loyalty_points: points,
            })
            .await
            .unwrap()
    }
}

async fn register(
    service: &InventoryService,
    name: &str,
    category: ProductCategory,
    unit: &str,
    price: &str,
    threshold: &str,
    stock: &str,
) -> Product {
    service
        .register_product(RegisterProductInput {
            name: name.to_string(),
            category,
            unit: unit.to_string(),
            standard_price: dec(price),
            low_stock_threshold: dec(threshold),
            initial_stock: dec(stock),
            actor: ACTOR.to_string(),
        })
        .await
        .unwrap()
}

pub async fn fixture() -> Fixture {
    fixture_with(Config::for_tests()).await
}

/// Catalog: 500 L raw milk, 100 Fresh Milk 1L @ 50, 40 Yogurt 500g @ 80, 30 Cheese 200g @ 120
pub async fn fixture_with(config: Config) -> Fixture {
    let (ctx, repo, notifier) = LedgerContext::in_memory(config, Arc::new(FixedClock::on(today())));
    let inventory = InventoryService::new(ctx.clone());

    let raw_milk = register(&inventory, "Raw Milk", ProductCategory::RawMilk, "L", "0", "0", "500").await;
    let fresh_milk = register(&inventory, "Fresh Milk 1L", ProductCategory::FinishedGoods, "Bottle", "50", "20", "100").await;
    let yogurt = register(&inventory, "Yogurt 500g", ProductCategory::FinishedGoods, "Cup", "80", "10", "40").await;
    let cheese = register(&inventory, "Cheese 200g", ProductCategory::FinishedGoods, "Pack", "120", "10", "30").await;

    Fixture {
        ctx,
        repo,
        notifier,
        raw_milk,
        fresh_milk,
        yogurt,
        cheese,
    }
}
