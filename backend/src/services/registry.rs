//! Farmer and customer registration

use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{
    normalize_optional_text, validate_non_negative, validate_range, validate_required_text, Customer, CustomerType, DiscountPolicy,
    Farmer, LoyaltyTier,
};

use super::ledger::LedgerContext;
use super::notification::{Notification, Recipient};
use crate::error::AppResult;

#[derive(Clone)]
pub struct RegistryService {
    ctx: LedgerContext,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterFarmerInput {
    pub name: String,
    pub contact: Option<String>,
    pub address: Option<String>,
    #[serde(default)]
    pub loyalty_tier: LoyaltyTier,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterCustomerInput {
    pub name: String,
    pub customer_type: CustomerType,
    pub contact: Option<String>,
    #[serde(default)]
    pub discount: DiscountPolicy,
    #[serde(default)]
    pub loyalty_points: i64,
}

impl RegistryService {
    pub fn new(ctx: LedgerContext) -> Self {
        Self { ctx }
    }

    pub async fn register_farmer(&self, input: RegisterFarmerInput) -> AppResult<Farmer> {
        validate_required_text("name", &input.name)?;

        let mut farmer = Farmer::new(input.name.trim(), input.loyalty_tier);
        farmer.contact = normalize_optional_text(input.contact.as_deref());
        farmer.address = normalize_optional_text(input.address.as_deref());
        farmer.created_at = self.ctx.clock.now();

        self.ctx.repo.insert_farmer(&farmer).await?;
        tracing::info!(farmer_id = %farmer.id, tier = %farmer.loyalty_tier, "Farmer registered");

        self.ctx
            .notify(Notification::new(
                Recipient::Farmer(farmer.id),
                "Welcome to the cooperative! Your account is ready.",
                farmer.created_at,
            ))
            .await;
        Ok(farmer)
    }

    pub async fn register_customer(&self, input: RegisterCustomerInput) -> AppResult<Customer> {
        validate_required_text("name", &input.name)?;
        match input.discount {
            DiscountPolicy::Percentage(percent) => validate_range("discount", percent, Decimal::ZERO, Decimal::ONE_HUNDRED)?,
            DiscountPolicy::Fixed(amount) => validate_non_negative("discount", amount)?,
        }
        if input.loyalty_points < 0 {
            return Err(shared::EngineError::validation("loyalty_points", "cannot be negative").into());
        }

        let mut customer = Customer::new(input.name.trim(), input.customer_type, input.discount);
        customer.contact = normalize_optional_text(input.contact.as_deref());
        customer.loyalty_points = input.loyalty_points;
        customer.created_at = self.ctx.clock.now();

        self.ctx.repo.insert_customer(&customer).await?;
        tracing::info!(customer_id = %customer.id, customer_type = customer.customer_type.as_str(), "Customer registered");
        Ok(customer)
    }
}
