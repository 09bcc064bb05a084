//! Oracle adapter: prompt an external text-inference service and decode its reply
//! into the same [`StructuredOrder`] shape the keyword parser produces.

pub mod anthropic;
pub mod decode;
pub mod prompt;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::domain::aggregates::{Catalog, StructuredOrder};
use crate::domain::value_objects::ParseSource;
use crate::interpret::lexicon::MessageScan;
use crate::interpret::OrderSource;

pub use anthropic::{AnthropicClient, OracleSettings};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    /// No credential configured. A routing signal, not a failure.
    #[error("Oracle unavailable: no credential configured")]
    Unavailable,

    #[error("Oracle communication error: {0}")]
    Communication(String),

    #[error("Oracle reply could not be decoded: {0}")]
    Decode(String),
}

/// Transport to the inference service: one prompt in, free text out.
#[async_trait]
pub trait OracleClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, OracleError>;
}

#[derive(Clone)]
pub struct OracleAdapter {
    client: Option<Arc<dyn OracleClient>>,
    catalog: Catalog,
}

impl OracleAdapter {
    pub fn new(client: Arc<dyn OracleClient>, catalog: Catalog) -> Self {
        Self { client: Some(client), catalog }
    }

    /// Adapter with no credential; every call reports [`OracleError::Unavailable`].
    pub fn unconfigured(catalog: Catalog) -> Self { Self { client: None, catalog } }

    pub async fn interpret(&self, text: &str) -> Result<StructuredOrder, OracleError> {
        let client = self.client.as_ref().ok_or(OracleError::Unavailable)?;
        let scan = MessageScan::new(text, &self.catalog);
        let prompt = prompt::build(text, &self.catalog, &scan);
        let reply = client.complete(&prompt).await?;
        let decoded = decode::decode_reply(&reply)?;
        debug!(items = decoded.items.len(), confidence = ?decoded.confidence, notes = ?decoded.notes, "oracle reply decoded");
        Ok(decoded.into_order(text, &self.catalog, scan.charges))
    }
}

#[async_trait]
impl OrderSource for OracleAdapter {
    fn source(&self) -> ParseSource { ParseSource::Oracle }

    async fn interpret(&self, text: &str) -> Result<StructuredOrder, OracleError> {
        OracleAdapter::interpret(self, text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{Location, PaymentMethod, Seller};
    use crate::interpret::{DeterministicParser, OrderInterpreter};
    use std::sync::Mutex;

    struct Canned {
        reply: Result<String, OracleError>,
        prompts: Mutex<Vec<String>>,
    }

    impl Canned {
        fn new(reply: Result<&str, OracleError>) -> Arc<Self> {
            Arc::new(Self { reply: reply.map(str::to_string), prompts: Mutex::new(Vec::new()) })
        }
    }

    #[async_trait]
    impl OracleClient for Canned {
        async fn complete(&self, prompt: &str) -> Result<String, OracleError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply.clone()
        }
    }

    fn codes(order: &StructuredOrder) -> Vec<(&'static str, u32)> {
        order.lines().iter().map(|l| (l.product.code, l.quantity)).collect()
    }

    #[tokio::test]
    async fn test_unconfigured_is_unavailable() {
        let adapter = OracleAdapter::unconfigured(Catalog::standard());
        assert_eq!(adapter.interpret("2 P-CHZ").await, Err(OracleError::Unavailable));
    }

    #[tokio::test]
    async fn test_correction_chat_through_oracle() {
        let text = "isang tub cheese po tapos padd pa ng tatlong bbq pouch, wait patanggal yung tub cheese, pa-add na lang ng 3 sour cream tub";
        let client = Canned::new(Ok(r#"Here you go:
{"customer_name": "maria clara", "payment_method": "Gcash", "customer_location": "Quezon City",
 "items": [{"product_code": "p-bbq", "quantity": 3}, {"product_code": "2L-SC", "quantity": 3}],
 "confidence": 0.92, "notes": "added 2L-CHZ, removed 2L-CHZ, added P-BBQ and 2L-SC"}"#));
        let adapter = OracleAdapter::new(client.clone(), Catalog::standard());
        let order = adapter.interpret(text).await.unwrap();
        assert_eq!(codes(&order), vec![("P-BBQ", 3), ("2L-SC", 3)]);
        assert_eq!(order.customer_name(), Some("Maria Clara"));
        assert_eq!(order.payment_method(), Some(PaymentMethod::Gcash));
        assert_eq!(order.assigned_seller(), Some(Seller::Ferdie));
        assert_eq!(order.raw_message(), text);

        let prompts = client.prompts.lock().unwrap();
        assert!(prompts[0].contains(text));
        assert!(prompts[0].contains("3x P-BBQ, 3x 2L-SC"));
    }

    #[tokio::test]
    async fn test_invalid_items_are_dropped() {
        let client = Canned::new(Ok(r#"{"customer_name": null, "payment_method": "Venmo", "customer_location": "Paranaque",
            "items": [{"product_code": "X-ZZZ", "quantity": 5}, {"product_code": "P-OG", "quantity": 0},
                      {"product_code": "2L-OG", "quantity": -1}, {"product_code": "P-SC", "quantity": 2}],
            "confidence": 0.5, "notes": ""}"#));
        let order = OracleAdapter::new(client, Catalog::standard()).interpret("whatever").await.unwrap();
        assert_eq!(codes(&order), vec![("P-SC", 2)]);
        assert_eq!(order.payment_method(), None);
        assert_eq!(order.customer_location(), Some(Location::Paranaque));
        assert_eq!(order.assigned_seller(), Some(Seller::Nina));
    }

    #[tokio::test]
    async fn test_seller_mapping_matches_keyword_parser() {
        let text = "2 P-CHZ sa paranaque";
        let client = Canned::new(Ok(r#"{"customer_location": "Paranaque", "items": [{"product_code": "P-CHZ", "quantity": 2}]}"#));
        let oracle = OracleAdapter::new(client, Catalog::standard()).interpret(text).await.unwrap();
        let keyword = DeterministicParser::default().parse(text);
        assert_eq!(oracle.assigned_seller(), keyword.assigned_seller());
        assert_eq!(oracle.customer_location(), keyword.customer_location());
    }

    #[tokio::test]
    async fn test_unparseable_reply_falls_back() {
        let client = Canned::new(Ok("Sorry, I cannot help with that."));
        let adapter = OracleAdapter::new(client, Catalog::standard());
        assert!(matches!(adapter.interpret("1 P-BBQ").await, Err(OracleError::Decode(_))));

        let interp = OrderInterpreter::new(Arc::new(adapter), DeterministicParser::default());
        let result = interp.interpret("1 P-BBQ").await;
        assert_eq!(result.source, ParseSource::Deterministic);
        assert_eq!(codes(&result.order), vec![("P-BBQ", 1)]);
    }

    #[tokio::test]
    async fn test_oversized_fee_is_ignored() {
        let client = Canned::new(Ok(r#"{"items": [{"product_code": "P-CHZ", "quantity": 1}]}"#));
        let order = OracleAdapter::new(client, Catalog::standard())
            .interpret("1 P-CHZ sf 9223372036854775807")
            .await
            .unwrap();
        assert_eq!(codes(&order), vec![("P-CHZ", 1)]);
        assert_eq!(order.shipping_fee(), None);
        assert_eq!(order.total_amount(), 150);
    }

    #[tokio::test]
    async fn test_transport_error_is_propagated() {
        let client = Canned::new(Err(OracleError::Communication("connection refused".into())));
        let adapter = OracleAdapter::new(client, Catalog::standard());
        assert!(matches!(adapter.interpret("1 P-BBQ").await, Err(OracleError::Communication(_))));
    }
}
