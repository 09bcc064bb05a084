//! Plain-text renderings of an order for the chat front end.

use crate::domain::aggregates::StructuredOrder;

/// `₱1,234`; negative amounts render as `-₱50`.
pub fn pesos(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 { grouped.push(','); }
        grouped.push(ch);
    }
    if amount < 0 { format!("-₱{}", grouped) } else { format!("₱{}", grouped) }
}

/// Pre-confirmation summary shown with the confirm/cancel prompt.
pub fn order_summary(order: &StructuredOrder) -> String {
    let mut lines = vec!["Order parsed".to_string(), String::new()];

    if let Some(name) = order.customer_name() { lines.push(format!("Customer: {}", name)); }
    if let Some(method) = order.payment_method() { lines.push(format!("Payment: {} (Unpaid)", method)); }
    if let Some(location) = order.customer_location() { lines.push(format!("Location: {}", location.label())); }
    if let Some(seller) = order.assigned_seller() { lines.push(format!("Seller: {}", seller.name())); }

    if order.is_empty() {
        lines.push("Items: none recognized".to_string());
    } else {
        lines.push("Items:".to_string());
        for line in order.lines() {
            lines.push(format!("  • {}x {}", line.quantity, line.product.display_name()));
        }
    }

    if let Some(fee) = order.shipping_fee() { lines.push(format!("Shipping: {}", pesos(fee))); }
    match (order.discount_percentage(), order.discount_amount()) {
        (Some(pct), Some(amount)) => lines.push(format!("Discount ({}%): {}", pct, pesos(amount))),
        (None, Some(amount)) => lines.push(format!("Discount: {} off", pesos(amount))),
        _ => {}
    }

    lines.push(String::new());
    lines.push(format!("Final Total: {}", pesos(order.total_amount())));
    lines.join("\n")
}

/// Customer-facing price breakdown sent after the ledger write.
pub fn customer_breakdown(order: &StructuredOrder) -> String {
    let mut lines: Vec<String> = order
        .lines()
        .iter()
        .map(|l| format!("{} - {} - {}", l.product.display_name(), l.quantity, pesos(l.product.unit_price)))
        .collect();

    if let Some(fee) = order.shipping_fee() { lines.push(format!("Shipping Fee: {}", pesos(fee))); }
    if let Some(amount) = order.discount_amount() {
        match order.discount_percentage() {
            Some(pct) => lines.push(format!("Discount ({}%): -{}", pct, pesos(amount))),
            None => lines.push(format!("Discount: -{}", pesos(amount))),
        }
    }

    lines.push("----------".to_string());
    lines.push(format!("Total - {}", pesos(order.total_amount())));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{Catalog, Charges, Discount, OrderDraft, OrderLine};
    use crate::domain::value_objects::{Location, PaymentMethod};

    fn order(charges: Charges) -> StructuredOrder {
        let catalog = Catalog::standard();
        OrderDraft {
            customer_name: Some("Ana Cruz".into()),
            lines: vec![
                OrderLine::new(*catalog.get("P-CHZ").unwrap(), 1).unwrap(),
                OrderLine::new(*catalog.get("2L-BBQ").unwrap(), 4).unwrap(),
            ],
            payment_method: Some(PaymentMethod::Gcash),
            customer_location: Some(Location::Paranaque),
            charges,
        }
        .finish("raw")
    }

    #[test]
    fn test_pesos() {
        assert_eq!(pesos(0), "₱0");
        assert_eq!(pesos(150), "₱150");
        assert_eq!(pesos(1234), "₱1,234");
        assert_eq!(pesos(1_234_567), "₱1,234,567");
        assert_eq!(pesos(-50), "-₱50");
    }

    #[test]
    fn test_customer_breakdown() {
        let text = customer_breakdown(&order(Charges { shipping_fee: Some(100), discount: Some(Discount::Percentage(10)) }));
        assert_eq!(
            text,
            "Pouch Cheese - 1 - ₱150\nTub BBQ - 4 - ₱290\nShipping Fee: ₱100\nDiscount (10%): -₱131\n----------\nTotal - ₱1,279"
        );
    }

    #[test]
    fn test_flat_discount_breakdown() {
        let text = customer_breakdown(&order(Charges { shipping_fee: None, discount: Some(Discount::Amount(30)) }));
        assert!(text.contains("Discount: -₱30"));
        assert!(text.ends_with("Total - ₱1,280"));
    }

    #[test]
    fn test_order_summary() {
        let text = order_summary(&order(Charges::default()));
        assert!(text.contains("Customer: Ana Cruz"));
        assert!(text.contains("Payment: Gcash (Unpaid)"));
        assert!(text.contains("Location: Paranaque"));
        assert!(text.contains("Seller: Nina"));
        assert!(text.contains("  • 4x Tub BBQ"));
        assert!(text.ends_with("Final Total: ₱1,310"));
    }
}
