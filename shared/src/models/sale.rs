//! Sales and payment settlement

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    #[serde(rename = "gcash")]
    GCash,
    BankTransfer,
    /// Sold on credit ("utang"); nothing collected at the counter
    Credit,
    PartialPayment,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::GCash => "gcash",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Credit => "credit",
            PaymentMethod::PartialPayment => "partial_payment",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(PaymentMethod::Cash),
            "gcash" => Ok(PaymentMethod::GCash),
            "bank_transfer" => Ok(PaymentMethod::BankTransfer),
            "credit" => Ok(PaymentMethod::Credit),
            "partial_payment" => Ok(PaymentMethod::PartialPayment),
            other => Err(EngineError::validation(
                "payment_method",
                format!("unknown payment method '{}'", other),
            )),
        }
    }
}

/// What the counter collected against a grand total
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PaymentSettlement {
    pub amount_paid: Decimal,
    /// Unpaid remainder added to the buyer's outstanding balance
    pub shortfall: Decimal,
}

/// Work out the amount paid for a sale.
///
/// Immediate methods default to paying the full total, credit defaults to
/// nothing, and a partial payment must state its amount. Walk-in buyers have
/// no account to carry a balance, so they must pay in full.
pub fn settle_payment(
    grand_total: Decimal,
    method: PaymentMethod,
    amount_paid: Option<Decimal>,
    registered_buyer: bool,
) -> EngineResult<PaymentSettlement> {
    let paid = match (method, amount_paid) {
        (_, Some(amount)) => amount,
        (PaymentMethod::Credit, None) => Decimal::ZERO,
        (PaymentMethod::PartialPayment, None) => {
            return Err(EngineError::validation(
                "amount_paid",
                "required for a partial payment",
            ))
        }
        (_, None) => grand_total,
    };

    if paid < Decimal::ZERO {
        return Err(EngineError::validation("amount_paid", "cannot be negative"));
    }
    if paid > grand_total {
        return Err(EngineError::Overpayment {
            paid,
            due: grand_total,
        });
    }

    let shortfall = grand_total - paid;
    if !registered_buyer && shortfall > Decimal::ZERO {
        return Err(EngineError::validation(
            "amount_paid",
            "walk-in sales must be paid in full",
        ));
    }

    Ok(PaymentSettlement {
        amount_paid: paid,
        shortfall,
    })
}

/// A committed sale
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sale {
    pub id: Uuid,
    /// `None` for walk-in buyers
    pub customer_id: Option<Uuid>,
    pub customer_name: String,
    pub subtotal: Decimal,
    pub promo_discount: Decimal,
    pub points_discount: Decimal,
    pub vat: Decimal,
    pub grand_total: Decimal,
    pub payment_method: PaymentMethod,
    pub amount_paid: Decimal,
    pub points_redeemed: i64,
    pub points_earned: i64,
    pub recorded_by: String,
    pub sale_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleLineItem {
    pub id: Uuid,
    pub sale_id: Uuid,
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

pub const WALK_IN_CUSTOMER: &str = "Walk-in";

pub fn sale_reason(sale_id: Uuid, customer_name: &str) -> String {
    format!("Sale #{} to {}", sale_id, customer_name)
}
