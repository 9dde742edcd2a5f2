//! WebAssembly module for the dairy cooperative ledger
//!
//! Runs the pure grading and cart-pricing engines in the browser so the
//! collection and point-of-sale screens can show live totals before commit.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{
    preview_delivery, price_cart, CartLine, CartPricingPolicy, CustomerProfile, LabReading, LoyaltyTier, MilkPricing,
    Product, ProductCategory,
};
use uuid::Uuid;
use wasm_bindgen::prelude::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {}

fn to_decimal(field: &str, value: f64) -> Result<Decimal, String> {
    Decimal::try_from(value).map_err(|_| format!("{} must be a finite number, got {}", field, value))
}

fn reading_from(litres: f64, fat_percent: f64, snf_percent: f64, temperature_celsius: f64) -> Result<LabReading, String> {
    Ok(LabReading {
        litres: to_decimal("litres", litres)?,
        fat_percent: to_decimal("fat_percent", fat_percent)?,
        snf_percent: to_decimal("snf_percent", snf_percent)?,
        temperature_celsius: to_decimal("temperature_celsius", temperature_celsius)?,
    })
}

/// Catalog entry as known to the point-of-sale screen
#[derive(Debug, Deserialize)]
struct PreviewProduct {
    product_id: Uuid,
    name: String,
    standard_price: Decimal,
    current_stock: Decimal,
}

impl From<PreviewProduct> for Product {
    fn from(item: PreviewProduct) -> Self {
        let mut product = Product::new(
            item.name,
            ProductCategory::FinishedGoods,
            "unit",
            item.standard_price,
            Decimal::ZERO,
        );
        product.id = item.product_id;
        product.current_stock = item.current_stock;
        product
    }
}

#[derive(Debug, Deserialize)]
struct CartPreviewRequest {
    catalog: Vec<PreviewProduct>,
    customer: Option<CustomerProfile>,
    lines: Vec<CartLine>,
    #[serde(default)]
    points_to_redeem: i64,
}

fn grade_preview_json(
    litres: f64,
    fat_percent: f64,
    snf_percent: f64,
    temperature_celsius: f64,
    tier: &str,
    delivered_previous_day: bool,
) -> Result<String, String> {
    let tier: LoyaltyTier = tier.parse().map_err(|e| format!("{}", e))?;
    let reading = reading_from(litres, fat_percent, snf_percent, temperature_celsius)?;
    let preview = preview_delivery(&MilkPricing::default(), &reading, tier, delivered_previous_day)
        .map_err(|e| e.to_string())?;
    serde_json::to_string(&preview).map_err(|e| e.to_string())
}

fn cart_preview_json(request_json: &str) -> Result<String, String> {
    let request: CartPreviewRequest =
        serde_json::from_str(request_json).map_err(|e| format!("Invalid cart JSON: {}", e))?;
    let catalog: Vec<Product> = request.catalog.into_iter().map(Product::from).collect();

    let quote = price_cart(
        &CartPricingPolicy::default(),
        &catalog,
        request.customer.as_ref(),
        &request.lines,
        request.points_to_redeem,
    )
    .map_err(|e| e.to_string())?;
    serde_json::to_string(&quote).map_err(|e| e.to_string())
}

/// Grade and price a delivery; returns the preview as JSON
#[wasm_bindgen]
pub fn grade_delivery_preview(
    litres: f64,
    fat_percent: f64,
    snf_percent: f64,
    temperature_celsius: f64,
    tier: &str,
    delivered_previous_day: bool,
) -> Result<String, JsValue> {
    grade_preview_json(
        litres,
        fat_percent,
        snf_percent,
        temperature_celsius,
        tier,
        delivered_previous_day,
    )
    .map_err(|e| JsValue::from_str(&e))
}

/// Price a cart described as JSON; returns the quote as JSON
#[wasm_bindgen]
pub fn price_cart_preview(request_json: &str) -> Result<String, JsValue> {
    cart_preview_json(request_json).map_err(|e| JsValue::from_str(&e))
}

fn quality_score_value(litres: f64, fat_percent: f64, snf_percent: f64, temperature_celsius: f64) -> Result<f64, String> {
    let reading = reading_from(litres, fat_percent, snf_percent, temperature_celsius)?;
    shared::quality_score(&reading)
        .to_f64()
        .ok_or_else(|| "quality score is not representable".to_string())
}

/// Quality score on the 0-100 scale
#[wasm_bindgen]
pub fn quality_score(
    litres: f64,
    fat_percent: f64,
    snf_percent: f64,
    temperature_celsius: f64,
) -> Result<f64, JsValue> {
    quality_score_value(litres, fat_percent, snf_percent, temperature_celsius).map_err(|e| JsValue::from_str(&e))
}
