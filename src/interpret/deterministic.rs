//! Keyword parser used when the oracle is unavailable or its reply is unusable.

use async_trait::async_trait;
use tracing::debug;

use crate::domain::aggregates::{Catalog, OrderDraft, OrderLine, StructuredOrder};
use crate::domain::value_objects::ParseSource;
use crate::interpret::lexicon::{extract_customer_name, extract_location, extract_payment_method, MessageScan};
use crate::interpret::OrderSource;
use crate::oracle::OracleError;

/// Treats the message as a flat bag of product mentions; corrections are not resolved.
#[derive(Clone, Copy, Debug, Default)]
pub struct DeterministicParser {
    catalog: Catalog,
}

impl DeterministicParser {
    pub fn new(catalog: Catalog) -> Self { Self { catalog } }

    /// Never fails: text with nothing recognizable yields an order with no lines.
    pub fn parse(&self, text: &str) -> StructuredOrder {
        let scan = MessageScan::new(text, &self.catalog);
        let lines: Vec<OrderLine> = scan
            .mentions
            .iter()
            .filter_map(|m| OrderLine::new(*m.product, m.effective_quantity()))
            .collect();
        debug!(mentions = scan.mentions.len(), lines = lines.len(), "keyword parse");
        OrderDraft {
            customer_name: extract_customer_name(text, &self.catalog),
            lines,
            payment_method: extract_payment_method(text),
            customer_location: extract_location(text),
            charges: scan.charges,
        }
        .finish(text)
    }
}

#[async_trait]
impl OrderSource for DeterministicParser {
    fn source(&self) -> ParseSource { ParseSource::Deterministic }

    async fn interpret(&self, text: &str) -> Result<StructuredOrder, OracleError> { Ok(self.parse(text)) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{Location, PaymentMethod, Seller};

    fn codes(order: &StructuredOrder) -> Vec<(&'static str, u32)> {
        order.lines().iter().map(|l| (l.product.code, l.quantity)).collect()
    }

    #[test]
    fn test_codes_and_subtotal() {
        let order = DeterministicParser::default().parse("2 P-CHZ and 1 2L-BBQ");
        assert_eq!(codes(&order), vec![("P-CHZ", 2), ("2L-BBQ", 1)]);
        assert_eq!(order.subtotal(), 2 * 150 + 290);
        assert_eq!(order.total_amount(), 590);
    }

    #[test]
    fn test_line_count_matches_mentions() {
        let order = DeterministicParser::default().parse("3 keso, 2 bbq tub, P-OG x4, isang maliit sour cream");
        assert_eq!(codes(&order), vec![("P-CHZ", 3), ("2L-BBQ", 2), ("P-OG", 4), ("P-SC", 1)]);
        assert_eq!(order.subtotal(), 3 * 150 + 2 * 290 + 4 * 150 + 150);
    }

    #[test]
    fn test_payment_and_location() {
        let order = DeterministicParser::default().parse("Customer: Lea\n2 P-BBQ sa QC, gcash na lang");
        assert_eq!(order.payment_method(), Some(PaymentMethod::Gcash));
        assert_eq!(order.customer_location(), Some(Location::QuezonCity));
        assert_eq!(order.assigned_seller(), Some(Seller::Ferdie));
        assert_eq!(order.customer_name(), Some("Lea"));
    }

    #[test]
    fn test_unknown_code_yields_no_lines() {
        let order = DeterministicParser::default().parse("X-ZZZ 5");
        assert!(order.is_empty());
        assert_eq!(order.subtotal(), 0);
        assert_eq!(order.assigned_seller(), None);
    }

    #[test]
    fn test_zero_quantity_dropped() {
        let order = DeterministicParser::default().parse("0 P-CHZ, 1 P-SC");
        assert_eq!(codes(&order), vec![("P-SC", 1)]);
    }

    #[test]
    fn test_corrections_are_not_resolved() {
        let text = "isang tub cheese po tapos padd pa ng tatlong bbq pouch, wait patanggal yung tub cheese, pa-add na lang ng 3 sour cream tub";
        let order = DeterministicParser::default().parse(text);
        assert_eq!(codes(&order), vec![("2L-CHZ", 1), ("P-BBQ", 3), ("2L-CHZ", 1), ("2L-SC", 3)]);
    }

    #[test]
    fn test_shipping_and_discount() {
        let order = DeterministicParser::default().parse("2 P-CHZ, sf 100, less 10%");
        assert_eq!(order.shipping_fee(), Some(100));
        assert_eq!(order.discount_percentage(), Some(10));
        assert_eq!(order.discount_amount(), Some(30));
        assert_eq!(order.total_amount(), 300 + 100 - 30);
    }

    #[test]
    fn test_oversized_fee_keeps_lines() {
        let order = DeterministicParser::default().parse("1 P-CHZ sf 9223372036854775807");
        assert_eq!(codes(&order), vec![("P-CHZ", 1)]);
        assert_eq!(order.shipping_fee(), None);
        assert_eq!(order.total_amount(), 150);
    }
}
