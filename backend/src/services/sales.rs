//! Point-of-sale: cart pricing, sale commits and customer balances

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::money::checked_add;
use shared::{
    price_cart, sale_reason, settle_payment, validate_positive, validate_required_text, AppliedPromotion, CartLine,
    CartQuote, Customer, InventoryMovement, MovementDirection, PaymentMethod, Product, Sale, SaleLineItem,
    WALK_IN_CUSTOMER,
};
use uuid::Uuid;

use super::ledger::LedgerContext;
use crate::error::{AppError, AppResult};
use crate::repository::{CustomerUpdate, SaleCommit, StockChange};

/// Sales service
#[derive(Clone)]
pub struct SalesService {
    ctx: LedgerContext,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriceCartInput {
    /// `None` for walk-in buyers
    pub customer_id: Option<Uuid>,
    pub lines: Vec<CartLine>,
    #[serde(default)]
    pub points_to_redeem: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitSaleInput {
    pub customer_id: Option<Uuid>,
    pub lines: Vec<CartLine>,
    #[serde(default)]
    pub points_to_redeem: i64,
    pub payment_method: PaymentMethod,
    /// Defaults by payment method when omitted
    pub amount_paid: Option<Decimal>,
    pub actor: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SaleReceipt {
    pub sale_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub customer_name: String,
    pub lines: Vec<SaleLineItem>,
    pub subtotal: Decimal,
    pub promotions: Vec<AppliedPromotion>,
    pub promo_discount: Decimal,
    pub points_discount: Decimal,
    pub vat: Decimal,
    pub grand_total: Decimal,
    pub payment_method: PaymentMethod,
    pub amount_paid: Decimal,
    /// Unpaid part of this sale
    pub remaining_balance: Decimal,
    pub points_redeemed: i64,
    pub points_earned: i64,
    /// Buyer's balances after the sale; absent for walk-ins
    pub points_balance: Option<i64>,
    pub outstanding_balance: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceAdjustmentKind {
    /// Customer paid down what they owe
    RecordPayment,
    /// Goods given on credit outside a sale
    AddCredit,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdjustBalanceInput {
    pub kind: BalanceAdjustmentKind,
    pub amount: Decimal,
    pub note: Option<String>,
    pub actor: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BalanceAdjustment {
    pub customer_id: Uuid,
    pub kind: BalanceAdjustmentKind,
    pub amount: Decimal,
    pub previous_balance: Decimal,
    pub outstanding_balance: Decimal,
}

impl SalesService {
    pub fn new(ctx: LedgerContext) -> Self {
        Self { ctx }
    }

    /// Load the buyer and every product named in the cart
    async fn load_cart(
        &self,
        customer_id: Option<Uuid>,
        lines: &[CartLine],
    ) -> AppResult<(Option<Customer>, Vec<Product>)> {
        let customer = match customer_id {
            Some(id) => Some(self.ctx.repo.get_customer(id).await?),
            None => None,
        };

        let mut catalog: Vec<Product> = Vec::new();
        for line in lines {
            if catalog.iter().any(|p| p.id == line.product_id) {
                continue;
            }
            catalog.push(self.ctx.repo.get_product(line.product_id).await?);
        }
        Ok((customer, catalog))
    }

    /// Price a cart for display; nothing is recorded
    pub async fn price_cart(&self, input: PriceCartInput) -> AppResult<CartQuote> {
        let (customer, catalog) = self.load_cart(input.customer_id, &input.lines).await?;
        let profile = customer.as_ref().map(Customer::profile);

        Ok(price_cart(
            &self.ctx.config.cart_policy(),
            &catalog,
            profile.as_ref(),
            &input.lines,
            input.points_to_redeem,
        )?)
    }

    /// Confirm a sale: stock, movements, line items, buyer points and balance in one commit
    pub async fn commit_sale(&self, input: CommitSaleInput) -> AppResult<SaleReceipt> {
        self.ctx
            .retry_on_conflict("commit_sale", || self.try_commit_sale(&input))
            .await
    }

    async fn try_commit_sale(&self, input: &CommitSaleInput) -> AppResult<SaleReceipt> {
        validate_required_text("actor", &input.actor)?;
        let (customer, catalog) = self.load_cart(input.customer_id, &input.lines).await?;
        let profile = customer.as_ref().map(Customer::profile);

        let quote = price_cart(
            &self.ctx.config.cart_policy(),
            &catalog,
            profile.as_ref(),
            &input.lines,
            input.points_to_redeem,
        )?;
        if quote.is_empty() {
            return Err(AppError::validation("lines", "cart is empty"));
        }
        let settlement = settle_payment(
            quote.grand_total,
            input.payment_method,
            input.amount_paid,
            customer.is_some(),
        )?;

        let now = self.ctx.clock.now();
        let sale_id = Uuid::new_v4();
        let customer_name = customer
            .as_ref()
            .map(|c| c.name.clone())
            .unwrap_or_else(|| WALK_IN_CUSTOMER.to_string());
        let reason = sale_reason(sale_id, &customer_name);

        let mut lines = Vec::with_capacity(quote.lines.len());
        let mut stock = Vec::with_capacity(quote.lines.len());
        for priced in &quote.lines {
            let product = catalog
                .iter()
                .find(|p| p.id == priced.product_id)
                .ok_or_else(|| AppError::NotFound("Product".to_string()))?;
            lines.push(SaleLineItem {
                id: Uuid::new_v4(),
                sale_id,
                product_id: priced.product_id,
                quantity: priced.quantity,
                unit_price: priced.unit_price,
                line_total: priced.line_total,
            });
            stock.push(StockChange::new(
                product,
                InventoryMovement::new(
                    product.id,
                    MovementDirection::Out,
                    priced.quantity,
                    reason.clone(),
                    &input.actor,
                    now,
                ),
            ));
        }

        let customer_update = match customer.as_ref() {
            Some(c) => Some(CustomerUpdate {
                customer_id: c.id,
                expected_version: c.version,
                loyalty_points: c
                    .loyalty_points
                    .checked_sub(quote.points_redeemed)
                    .and_then(|points| points.checked_add(quote.points_earned))
                    .ok_or_else(|| AppError::validation("loyalty_points", "is too large"))?,
                outstanding_balance: checked_add("outstanding_balance", c.outstanding_balance, settlement.shortfall)?,
            }),
            None => None,
        };

        let sale = Sale {
            id: sale_id,
            customer_id: customer.as_ref().map(|c| c.id),
            customer_name: customer_name.clone(),
            subtotal: quote.subtotal,
            promo_discount: quote.promo_discount,
            points_discount: quote.points_discount,
            vat: quote.vat,
            grand_total: quote.grand_total,
            payment_method: input.payment_method,
            amount_paid: settlement.amount_paid,
            points_redeemed: quote.points_redeemed,
            points_earned: quote.points_earned,
            recorded_by: input.actor.clone(),
            sale_date: self.ctx.clock.today(),
            created_at: now,
        };

        self.ctx
            .repo
            .commit_sale(&SaleCommit {
                sale: sale.clone(),
                lines: lines.clone(),
                stock,
                customer: customer_update.clone(),
            })
            .await?;

        tracing::info!(
            sale_id = %sale.id,
            customer = %customer_name,
            grand_total = %sale.grand_total,
            amount_paid = %sale.amount_paid,
            lines = lines.len(),
            "Sale recorded"
        );

        Ok(SaleReceipt {
            sale_id,
            customer_id: sale.customer_id,
            customer_name,
            lines,
            subtotal: quote.subtotal,
            promotions: quote.promotions,
            promo_discount: quote.promo_discount,
            points_discount: quote.points_discount,
            vat: quote.vat,
            grand_total: quote.grand_total,
            payment_method: input.payment_method,
            amount_paid: settlement.amount_paid,
            remaining_balance: settlement.shortfall,
            points_redeemed: quote.points_redeemed,
            points_earned: quote.points_earned,
            points_balance: customer_update.as_ref().map(|u| u.loyalty_points),
            outstanding_balance: customer_update.as_ref().map(|u| u.outstanding_balance),
        })
    }

    /// Record a payment against, or add credit to, a customer's balance
    pub async fn adjust_balance(&self, customer_id: Uuid, input: AdjustBalanceInput) -> AppResult<BalanceAdjustment> {
        validate_positive("amount", input.amount)?;
        validate_required_text("actor", &input.actor)?;

        self.ctx
            .retry_on_conflict("adjust_balance", || async {
                let customer = self.ctx.repo.get_customer(customer_id).await?;
                let previous_balance = customer.outstanding_balance;
                let outstanding_balance = match input.kind {
                    BalanceAdjustmentKind::RecordPayment => {
                        if input.amount > previous_balance {
                            return Err(AppError::Overpayment {
                                paid: input.amount,
                                due: previous_balance,
                            });
                        }
                        previous_balance - input.amount
                    }
                    BalanceAdjustmentKind::AddCredit => checked_add("amount", previous_balance, input.amount)?,
                };

                self.ctx
                    .repo
                    .commit_balance_adjustment(&CustomerUpdate {
                        customer_id,
                        expected_version: customer.version,
                        loyalty_points: customer.loyalty_points,
                        outstanding_balance,
                    })
                    .await?;

                tracing::info!(
                    customer_id = %customer_id,
                    kind = ?input.kind,
                    amount = %input.amount,
                    balance = %outstanding_balance,
                    note = input.note.as_deref().unwrap_or(""),
                    actor = %input.actor,
                    "Customer balance adjusted"
                );

                Ok(BalanceAdjustment {
                    customer_id,
                    kind: input.kind,
                    amount: input.amount,
                    previous_balance,
                    outstanding_balance,
                })
            })
            .await
    }
}
