//! Reply decoding and validation.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

use crate::domain::aggregates::{Catalog, Charges, OrderDraft, OrderLine, StructuredOrder};
use crate::domain::value_objects::{title_case, Location, PaymentMethod};
use crate::oracle::OracleError;

static FENCED: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)```").expect("fence pattern is valid"));

#[derive(Clone, Debug, PartialEq)]
pub struct DecodedItem {
    pub product_code: String,
    pub quantity: Option<i64>,
}

/// The reply object before catalog validation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OracleReply {
    pub customer_name: Option<String>,
    pub payment_method: Option<String>,
    pub customer_location: Option<String>,
    pub items: Vec<DecodedItem>,
    pub confidence: Option<f64>,
    pub notes: Option<String>,
}

/// Outermost braces: first `{` through last `}`.
fn braced(reply: &str) -> Option<&str> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    (end > start).then(|| &reply[start..=end])
}

fn fenced(reply: &str) -> Option<&str> {
    FENCED.captures(reply).and_then(|c| c.get(1)).map(|m| m.as_str())
}

fn whole(reply: &str) -> Option<&str> { Some(reply) }

fn parse_object(body: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(body.trim()) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Tries, in order: the braced object, a fenced block, the whole reply.
pub fn decode_reply(reply: &str) -> Result<OracleReply, OracleError> {
    let strategies: [(&str, fn(&str) -> Option<&str>); 3] = [
        ("braced", braced),
        ("fenced", fenced),
        ("whole", whole),
    ];
    let object = strategies
        .iter()
        .find_map(|(name, locate)| {
            let map = locate(reply).and_then(parse_object)?;
            debug!(strategy = *name, "oracle reply parsed");
            Some(map)
        })
        .ok_or_else(|| OracleError::Decode("no JSON object found in reply".to_string()))?;

    let items = object
        .get("items")
        .ok_or_else(|| OracleError::Decode("reply has no items field".to_string()))?;
    let items: Vec<DecodedItem> = items.as_array().map(|list| list.iter().filter_map(decode_item).collect()).unwrap_or_default();

    Ok(OracleReply {
        customer_name: string_field(&object, "customer_name"),
        payment_method: string_field(&object, "payment_method"),
        customer_location: string_field(&object, "customer_location"),
        items,
        confidence: object.get("confidence").and_then(Value::as_f64).map(|c| c.clamp(0.0, 1.0)),
        notes: string_field(&object, "notes"),
    })
}

fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object.get(key)?.as_str().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

fn decode_item(item: &Value) -> Option<DecodedItem> {
    let product_code = item.get("product_code")?.as_str()?.trim().to_uppercase();
    let quantity = item.get("quantity").and_then(integer);
    Some(DecodedItem { product_code, quantity })
}

/// Integers, integral floats ("2.0") and numeric strings ("2").
fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl OracleReply {
    /// Drops unknown codes and non-positive quantities; maps labels onto the closed sets.
    pub fn into_order(self, raw_message: &str, catalog: &Catalog, charges: Charges) -> StructuredOrder {
        let lines = self
            .items
            .iter()
            .filter_map(|item| {
                let product = catalog.get(&item.product_code)?;
                OrderLine::new(*product, item.quantity?)
            })
            .collect();
        OrderDraft {
            customer_name: self.customer_name.map(|n| title_case(&n)),
            lines,
            payment_method: self.payment_method.as_deref().and_then(PaymentMethod::from_label),
            customer_location: self.customer_location.as_deref().and_then(Location::from_label),
            charges,
        }
        .finish(raw_message)
    }
}
