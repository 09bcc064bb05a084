//! Instruction payload sent to the inference service.

use std::fmt::Write;

use crate::domain::aggregates::Catalog;
use crate::domain::value_objects::{Location, PaymentMethod};
use crate::interpret::lexicon::{MessageScan, FLAVOR_ALIASES, NUMBER_WORDS, SIZE_CUES};
use crate::interpret::modification::{extract_modifications, resolve_lines, IntentKind};

const RULES: &str = "\
MODIFICATION RULES (apply strictly in chronological order, one step at a time):
1. Read the message from start to end and keep a list of pending items.
2. A plain product mention or an addition marker (add, add pa, dagdag pa, plus, padd, pa-add) appends an item.
3. A removal marker (tanggal, patanggal, remove, cancel, alisin) deletes the most recently added pending item
   for that product before any later addition is considered.
4. A replacement marker (replace, palit, palitan, instead of) is a removal immediately followed by an addition.
5. Return only the net list after every modification has been applied, never an intermediate state.
6. Do not merge separate mentions of the same product unless a modification tells you to.";

const REPLY_FORMAT: &str = r#"Reply with exactly one JSON object and nothing else:
{
  "customer_name": string or null,
  "payment_method": one of the payment methods above, or null,
  "customer_location": one of the locations above, or null,
  "items": [{"product_code": "<code from the catalog>", "quantity": <positive integer>}],
  "confidence": number between 0 and 1,
  "notes": "short trace of each modification you applied"
}"#;

/// Builds the prompt for one message. The keyword pre-scan is advisory context only.
pub fn build(message: &str, catalog: &Catalog, scan: &MessageScan) -> String {
    let mut out = String::with_capacity(4096);
    out.push_str("You parse chat orders for chickpea chips. Messages mix English and Filipino (Taglish).\n\n");

    out.push_str("PRODUCT CATALOG (code: size flavor - price in pesos):\n");
    for p in catalog.products() {
        let _ = writeln!(out, "- {}: {} {} - {}", p.code, p.size, p.flavor, p.unit_price);
    }

    out.push_str("\nFILIPINO NUMBER WORDS:\n");
    let numbers: Vec<String> = NUMBER_WORDS.iter().map(|(w, n)| format!("{}={}", w, n)).collect();
    let _ = writeln!(out, "{}", numbers.join(", "));

    out.push_str("\nPRODUCT ALIASES:\n");
    for (alias, flavor) in FLAVOR_ALIASES {
        let _ = writeln!(out, "- \"{}\" means {}", alias, flavor);
    }
    out.push_str("- \"sour cream\" means Sour Cream\n");
    out.push_str("\nSIZE CUES (a flavor without a size cue is a Pouch):\n");
    for (cue, size) in SIZE_CUES {
        let _ = writeln!(out, "- \"{}\" means {}", cue, size);
    }

    let payments: Vec<&str> = PaymentMethod::ALL.iter().map(|m| m.label()).collect();
    let locations: Vec<&str> = Location::ALL.iter().map(|l| l.label()).collect();
    let _ = writeln!(out, "\nPAYMENT METHODS (exactly one of, or null): {}", payments.join(", "));
    let _ = writeln!(out, "LOCATIONS (exactly one of, or null): {}", locations.join(", "));
    out.push_str("QC, Quezon City, \"sa qc\" and \"taga qc\" mean Quezon City; Parañaque and pque mean Paranaque.\n\n");

    out.push_str(RULES);
    out.push_str("\n\n");
    pre_scan(&mut out, scan);
    out.push_str(REPLY_FORMAT);
    let _ = write!(out, "\n\nCUSTOMER MESSAGE TO PARSE:\n{}\n", message);
    out
}

fn pre_scan(out: &mut String, scan: &MessageScan) {
    let intents = extract_modifications(scan);
    if intents.is_empty() { return; }
    out.push_str("KEYWORD PRE-SCAN (may be wrong; the message is authoritative):\n");
    for intent in &intents {
        let kind = match intent.kind { IntentKind::Add => "addition", IntentKind::Remove => "removal", IntentKind::Replace => "replacement" };
        let target = intent
            .target
            .and_then(|k| scan.mentions.get(k))
            .map_or_else(|| "no product nearby".to_string(), |m| m.product.code.to_string());
        let _ = writeln!(out, "- {} marker \"{}\" -> {}", kind, intent.marker, target);
    }
    let net: Vec<String> = resolve_lines(scan, &intents)
        .iter()
        .map(|l| format!("{}x {}", l.quantity, l.product.code))
        .collect();
    let _ = writeln!(out, "Keyword net result: {}\n", if net.is_empty() { "nothing".to_string() } else { net.join(", ") });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_sections() {
        let catalog = Catalog::standard();
        let message = "2 P-CHZ, remove P-CHZ, 1 2L-BBQ";
        let prompt = build(message, &catalog, &MessageScan::new(message, &catalog));
        assert!(prompt.contains("- 2L-BBQ: Tub BBQ - 290"));
        assert!(prompt.contains("tatlong=3"));
        assert!(prompt.contains("\"keso\" means Cheese"));
        assert!(prompt.contains("Gcash, BPI, Maya, Cash, BDO, Others"));
        assert!(prompt.contains("Quezon City, Paranaque"));
        assert!(prompt.contains("chronological order"));
        assert!(prompt.contains("removal marker \"remove\" -> P-CHZ"));
        assert!(prompt.contains("Keyword net result: 1x 2L-BBQ"));
        assert!(prompt.ends_with(&format!("{}\n", message)));
    }

    #[test]
    fn test_no_pre_scan_without_markers() {
        let catalog = Catalog::standard();
        let prompt = build("2 P-CHZ", &catalog, &MessageScan::new("2 P-CHZ", &catalog));
        assert!(!prompt.contains("KEYWORD PRE-SCAN"));
    }
}
