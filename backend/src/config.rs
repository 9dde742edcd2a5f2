//! Configuration management for the dairy cooperative ledger
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (config/development.toml, config/production.toml)
//! 3. Environment variable overrides with DAIRY_ prefix

use std::collections::HashMap;

use config::{ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{CartPricingPolicy, MilkPricing, PointsPolicy, PromotionRule};

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    #[serde(default)]
    pub pricing: PricingConfig,

    #[serde(default)]
    pub promotions: PromotionConfig,

    #[serde(default)]
    pub production: ProductionConfig,

    #[serde(default)]
    pub ledger: LedgerSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

/// Milk purchase and point-of-sale pricing constants
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PricingConfig {
    /// Base price paid per litre of accepted milk
    pub milk_base_price: Decimal,
    pub vat_percent: Decimal,
    pub points_per_redemption_block: i64,
    /// Currency value of one redemption block
    pub redemption_block_value: Decimal,
    /// One loyalty point per this much spent
    pub points_earning_divisor: Decimal,
}

impl Default for PricingConfig {
    fn default() -> Self {
        let points = PointsPolicy::default();
        Self {
            milk_base_price: MilkPricing::default().base_price,
            vat_percent: Decimal::from(12),
            points_per_redemption_block: points.points_per_block,
            redemption_block_value: points.block_value,
            points_earning_divisor: points.earning_divisor,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PromotionConfig {
    pub flagship_product: String,
    pub flagship_buy_quantity: Decimal,
    /// Fixed value of a free flagship unit; unset means its standard price
    pub flagship_free_unit_price: Option<Decimal>,
    pub bundle_groups: Vec<String>,
    pub bundle_discount_percent: Decimal,
}

impl Default for PromotionConfig {
    fn default() -> Self {
        Self {
            flagship_product: "Fresh Milk 1L".to_string(),
            flagship_buy_quantity: Decimal::TEN,
            flagship_free_unit_price: Some(Decimal::from(50)),
            bundle_groups: vec!["Yogurt".to_string(), "Cheese".to_string()],
            bundle_discount_percent: Decimal::TEN,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ProductionConfig {
    /// Raw litres per unit for products without an explicit ratio
    pub default_litres_per_unit: Decimal,
    /// Raw litres consumed per finished unit, by product name
    pub litres_per_unit: HashMap<String, Decimal>,
    pub minimum_shelf_life_days: i64,
}

impl Default for ProductionConfig {
    fn default() -> Self {
        let litres_per_unit = [
            ("Fresh Milk 1L", Decimal::ONE),
            ("Yogurt 500g", Decimal::new(105, 2)),
            ("Cheese 200g", Decimal::TEN),
        ]
        .into_iter()
        .map(|(name, ratio)| (name.to_string(), ratio))
        .collect();

        Self {
            default_litres_per_unit: Decimal::ONE,
            litres_per_unit,
            minimum_shelf_life_days: shared::MIN_SHELF_LIFE_DAYS,
        }
    }
}

impl ProductionConfig {
    pub fn litres_per_unit_for(&self, product_name: &str) -> Decimal {
        self.litres_per_unit
            .get(product_name)
            .copied()
            .unwrap_or(self.default_litres_per_unit)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LedgerSettings {
    /// Attempts per commit before a concurrency conflict is surfaced
    pub max_commit_attempts: u32,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            max_commit_attempts: 3,
        }
    }
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("DAIRY_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (DAIRY_ prefix)
            .add_source(
                Environment::with_prefix("DAIRY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    pub fn milk_pricing(&self) -> MilkPricing {
        MilkPricing::new(self.pricing.milk_base_price)
    }

    pub fn cart_policy(&self) -> CartPricingPolicy {
        CartPricingPolicy {
            vat_percent: self.pricing.vat_percent,
            points: PointsPolicy {
                points_per_block: self.pricing.points_per_redemption_block,
                block_value: self.pricing.redemption_block_value,
                earning_divisor: self.pricing.points_earning_divisor,
            },
            promotions: vec![
                PromotionRule::BuyQuantityGetOneFree {
                    product_name: self.promotions.flagship_product.clone(),
                    buy_quantity: self.promotions.flagship_buy_quantity,
                    free_unit_price: self.promotions.flagship_free_unit_price,
                },
                PromotionRule::GroupBundle {
                    groups: self.promotions.bundle_groups.clone(),
                    discount_percent: self.promotions.bundle_discount_percent,
                },
            ],
        }
    }

    /// Configuration for tests and embedded use; no database settings are read
    pub fn for_tests() -> Self {
        Self {
            environment: "test".to_string(),
            server: ServerConfig::default(),
            database: DatabaseConfig {
                url: String::new(),
                max_connections: 1,
                min_connections: 1,
            },
            pricing: PricingConfig::default(),
            promotions: PromotionConfig::default(),
            production: ProductionConfig::default(),
            ledger: LedgerSettings::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}
