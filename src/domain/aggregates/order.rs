//! Structured Order Aggregate

use serde::{Deserialize, Serialize};
use crate::domain::aggregates::product::Product;
use crate::domain::value_objects::{assigned_seller, Location, PaymentMethod, Seller};

/// One (product, quantity) pair. Quantity is always positive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct OrderLine {
    pub product: Product,
    pub quantity: u32,
}

impl OrderLine {
    /// `None` for zero, negative or out-of-range quantities.
    pub fn new(product: Product, quantity: i64) -> Option<Self> {
        let quantity = u32::try_from(quantity).ok().filter(|q| *q > 0)?;
        Some(Self { product, quantity })
    }

    pub fn line_total(&self) -> i64 { self.product.unit_price.saturating_mul(i64::from(self.quantity)) }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Discount {
    Percentage(u32),
    Amount(i64),
}

/// Shipping and discount tokens found in a message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Charges {
    pub shipping_fee: Option<i64>,
    pub discount: Option<Discount>,
}

/// Mutable working copy used while a parse path assembles an order.
#[derive(Clone, Debug, Default)]
pub struct OrderDraft {
    pub customer_name: Option<String>,
    pub lines: Vec<OrderLine>,
    pub payment_method: Option<PaymentMethod>,
    pub customer_location: Option<Location>,
    pub charges: Charges,
}

impl OrderDraft {
    pub fn finish(self, raw_message: impl Into<String>) -> StructuredOrder {
        let subtotal = self.lines.iter().map(OrderLine::line_total).fold(0i64, i64::saturating_add);
        let (discount_amount, discount_percentage) = match self.charges.discount {
            Some(Discount::Percentage(pct)) => (Some(subtotal.saturating_mul(i64::from(pct)) / 100), Some(pct)),
            Some(Discount::Amount(amount)) => (Some(amount), None),
            None => (None, None),
        };
        // Saturates instead of wrapping; the extractors already bound fees and discounts.
        let total_amount = subtotal
            .saturating_add(self.charges.shipping_fee.unwrap_or(0))
            .saturating_sub(discount_amount.unwrap_or(0));
        StructuredOrder {
            customer_name: self.customer_name.filter(|n| !n.trim().is_empty()),
            lines: self.lines,
            payment_method: self.payment_method,
            customer_location: self.customer_location,
            assigned_seller: assigned_seller(self.customer_location),
            shipping_fee: self.charges.shipping_fee,
            discount_amount,
            discount_percentage,
            subtotal,
            total_amount,
            raw_message: raw_message.into(),
        }
    }
}

/// Result of interpreting one message. Immutable; use [`StructuredOrder::revise`] for corrections.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StructuredOrder {
    customer_name: Option<String>,
    lines: Vec<OrderLine>,
    payment_method: Option<PaymentMethod>,
    customer_location: Option<Location>,
    assigned_seller: Option<Seller>,
    shipping_fee: Option<i64>,
    discount_amount: Option<i64>,
    discount_percentage: Option<u32>,
    subtotal: i64,
    total_amount: i64,
    raw_message: String,
}

impl StructuredOrder {
    pub fn customer_name(&self) -> Option<&str> { self.customer_name.as_deref() }
    pub fn lines(&self) -> &[OrderLine] { &self.lines }
    pub fn payment_method(&self) -> Option<PaymentMethod> { self.payment_method }
    pub fn customer_location(&self) -> Option<Location> { self.customer_location }
    pub fn assigned_seller(&self) -> Option<Seller> { self.assigned_seller }
    pub fn shipping_fee(&self) -> Option<i64> { self.shipping_fee }
    pub fn discount_amount(&self) -> Option<i64> { self.discount_amount }
    pub fn discount_percentage(&self) -> Option<u32> { self.discount_percentage }
    pub fn subtotal(&self) -> i64 { self.subtotal }
    pub fn total_amount(&self) -> i64 { self.total_amount }
    pub fn raw_message(&self) -> &str { &self.raw_message }
    pub fn is_empty(&self) -> bool { self.lines.is_empty() }
    pub fn item_count(&self) -> u32 { self.lines.iter().map(|l| l.quantity).sum() }

    pub fn to_draft(&self) -> OrderDraft {
        let discount = match (self.discount_percentage, self.discount_amount) {
            (Some(pct), _) => Some(Discount::Percentage(pct)),
            (None, Some(amount)) => Some(Discount::Amount(amount)),
            (None, None) => None,
        };
        OrderDraft {
            customer_name: self.customer_name.clone(),
            lines: self.lines.clone(),
            payment_method: self.payment_method,
            customer_location: self.customer_location,
            charges: Charges { shipping_fee: self.shipping_fee, discount },
        }
    }

    /// Copy-on-write correction: derived fields are recomputed on the new copy.
    pub fn revise(&self, edit: impl FnOnce(&mut OrderDraft)) -> StructuredOrder {
        let mut draft = self.to_draft();
        edit(&mut draft);
        draft.finish(self.raw_message.clone())
    }

    pub fn export(&self) -> OrderExport {
        OrderExport {
            customer_name: self.customer_name.clone(),
            payment_method: self.payment_method,
            customer_location: self.customer_location,
            assigned_seller: self.assigned_seller,
            items: self.lines.iter().map(|l| ExportItem {
                code: l.product.code.to_string(),
                name: l.product.display_name(),
                quantity: l.quantity,
                unit_price: l.product.unit_price,
                line_total: l.line_total(),
            }).collect(),
            shipping_fee: self.shipping_fee,
            discount_amount: self.discount_amount,
            discount_percentage: self.discount_percentage,
            total_amount: self.total_amount,
            total_item_count: self.item_count(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportItem {
    pub code: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price: i64,
    pub line_total: i64,
}

/// Flat hand-off record for front ends.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderExport {
    pub customer_name: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub customer_location: Option<Location>,
    pub assigned_seller: Option<Seller>,
    pub items: Vec<ExportItem>,
    pub shipping_fee: Option<i64>,
    pub discount_amount: Option<i64>,
    pub discount_percentage: Option<u32>,
    pub total_amount: i64,
    pub total_item_count: u32,
}

impl OrderExport {
    pub fn recomputed_total(&self) -> i64 {
        let items = self.items.iter().map(|i| i.unit_price.saturating_mul(i64::from(i.quantity))).fold(0i64, i64::saturating_add);
        items.saturating_add(self.shipping_fee.unwrap_or(0)).saturating_sub(self.discount_amount.unwrap_or(0))
    }
}
