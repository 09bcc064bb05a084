//! Lexical extractors over raw order text
//!
//! Every extractor is a pure function of the message (and the catalog). Positions are
//! byte offsets into the original text so results from different extractors can be
//! merged in order of appearance.

use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

use crate::domain::aggregates::{Catalog, Charges, Discount, Product};
use crate::domain::value_objects::{Flavor, Location, PaymentMethod, Size};

/// Filipino number words accepted as quantities.
pub const NUMBER_WORDS: &[(&str, i64)] = &[
    ("isa", 1), ("isang", 1), ("ung", 1),
    ("dalawa", 2), ("dalawang", 2),
    ("tatlo", 3), ("tatlong", 3),
    ("apat", 4),
    ("lima", 5), ("limang", 5),
    ("anim", 6),
    ("pito", 7), ("pitong", 7),
    ("walo", 8), ("walong", 8),
    ("siyam", 9), ("siyamna", 9),
    ("sampu", 10), ("sampung", 10),
];

/// Casual and Filipino flavor terms. "sour cream" is matched as a two-word phrase.
pub const FLAVOR_ALIASES: &[(&str, Flavor)] = &[
    ("cheese", Flavor::Cheese), ("keso", Flavor::Cheese), ("chz", Flavor::Cheese),
    ("sourcream", Flavor::SourCream), ("sour-cream", Flavor::SourCream), ("sc", Flavor::SourCream),
    ("bbq", Flavor::Bbq), ("barbeque", Flavor::Bbq), ("barbecue", Flavor::Bbq),
    ("original", Flavor::Original), ("og", Flavor::Original), ("plain", Flavor::Original),
];

pub const SIZE_CUES: &[(&str, Size)] = &[
    ("pouch", Size::Pouch), ("pouches", Size::Pouch), ("maliit", Size::Pouch), ("small", Size::Pouch),
    ("tub", Size::Tub), ("tubs", Size::Tub), ("malaki", Size::Tub), ("big", Size::Tub),
    ("large", Size::Tub), ("2l", Size::Tub),
];

/// Words allowed between a quantity and the product it counts ("3 pcs cheese", "2 x P-CHZ").
const FILLERS: &[&str] = &["x", "pcs", "pc", "piece", "pieces", "pack", "packs", "ng", "na", "po", "of", "yung", "order", "orders"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub lower: String,
    pub span: Range<usize>,
    /// Clause punctuation (comma, period, newline, ...) sits between this token and the previous one.
    pub clause_start: bool,
}

fn is_token_char(c: char) -> bool { c.is_alphanumeric() || c == '-' || c == '\'' }

fn is_clause_break(c: char) -> bool { matches!(c, ',' | ';' | '.' | '!' | '?' | ':' | '\n') }

pub fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;
    let mut pending_break = false;
    for (i, c) in text.char_indices().chain(std::iter::once((text.len(), ' '))) {
        if is_token_char(c) {
            start.get_or_insert(i);
            continue;
        }
        if let Some(s) = start.take() {
            let raw = &text[s..i];
            let lead = raw.len() - raw.trim_start_matches(['-', '\'']).len();
            let word = raw.trim_matches(['-', '\'']);
            if !word.is_empty() {
                let begin = s + lead;
                tokens.push(Token {
                    lower: word.to_lowercase(),
                    span: begin..begin + word.len(),
                    clause_start: std::mem::take(&mut pending_break),
                });
            }
        }
        if is_clause_break(c) { pending_break = true; }
    }
    tokens
}

/// Digits (`3`, `2x`, `x2`) or a Filipino number word.
pub fn parse_quantity(word: &str) -> Option<i64> {
    let digits = |w: &str| !w.is_empty() && w.bytes().all(|b| b.is_ascii_digit());
    if digits(word) { return word.parse().ok(); }
    if let Some(core) = word.strip_suffix('x').or_else(|| word.strip_prefix('x')) {
        if digits(core) { return core.parse().ok(); }
    }
    NUMBER_WORDS.iter().find(|(w, _)| *w == word).map(|(_, n)| *n)
}

pub fn size_cue(word: &str) -> Option<Size> {
    SIZE_CUES.iter().find(|(w, _)| *w == word).map(|(_, s)| *s)
}

fn flavor_at(tokens: &[Token], i: usize) -> Option<(Flavor, usize)> {
    let word = tokens[i].lower.as_str();
    if word == "sour" && tokens.get(i + 1).is_some_and(|t| t.lower == "cream" && !t.clause_start) {
        return Some((Flavor::SourCream, 2));
    }
    FLAVOR_ALIASES.iter().find(|(w, _)| *w == word).map(|(_, f)| (*f, 1))
}

/// A product reference in the text, with the quantity bound to it (if any).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Mention {
    pub product: &'static Product,
    pub quantity: Option<i64>,
    /// False when the size fell back to the Pouch default.
    pub size_explicit: bool,
    /// Token range `[start, end)`.
    pub start: usize,
    pub end: usize,
    pub offset: usize,
}

impl Mention {
    /// A mention with no adjacent number counts as one.
    pub fn effective_quantity(&self) -> i64 { self.quantity.unwrap_or(1) }
}

/// Product codes and flavor aliases in textual order, quantities not yet bound.
pub fn find_mentions(tokens: &[Token], catalog: &Catalog) -> Vec<Mention> {
    let mut mentions = Vec::new();
    let mut consumed = 0;
    let mut i = 0;
    while i < tokens.len() {
        if let Some(product) = catalog.get(&tokens[i].lower) {
            mentions.push(Mention { product, quantity: None, size_explicit: true, start: i, end: i + 1, offset: tokens[i].span.start });
            consumed = i + 1;
            i += 1;
            continue;
        }
        let Some((flavor, width)) = flavor_at(tokens, i) else {
            i += 1;
            continue;
        };
        let (mut start, mut end, mut size) = (i, i + width, None);
        if i > consumed && !tokens[i].clause_start {
            if let Some(s) = size_cue(&tokens[i - 1].lower) {
                size = Some(s);
                start = i - 1;
            }
        }
        if size.is_none() {
            if let Some(next) = tokens.get(end).filter(|t| !t.clause_start) {
                if let Some(s) = size_cue(&next.lower) {
                    size = Some(s);
                    end += 1;
                }
            }
        }
        if let Some(product) = catalog.find(flavor, size.unwrap_or(Size::Pouch)) {
            mentions.push(Mention { product, quantity: None, size_explicit: size.is_some(), start, end, offset: tokens[start].span.start });
        }
        consumed = end;
        i = end;
    }
    mentions
}

fn lead_quantity(tokens: &[Token], free: &[bool], start: usize, floor: usize) -> Option<usize> {
    let (mut idx, mut skipped) = (start, 0);
    while idx > floor && !tokens[idx].clause_start {
        let j = idx - 1;
        if !free[j] { break; }
        let word = tokens[j].lower.as_str();
        if parse_quantity(word).is_some() { return Some(j); }
        if skipped < 2 && FILLERS.contains(&word) {
            skipped += 1;
            idx = j;
            continue;
        }
        break;
    }
    None
}

fn trail_quantity(tokens: &[Token], free: &[bool], end: usize, ceiling: usize) -> Option<usize> {
    let (mut idx, mut skipped) = (end, 0);
    while idx < ceiling && !tokens[idx].clause_start {
        if !free[idx] { break; }
        let word = tokens[idx].lower.as_str();
        if parse_quantity(word).is_some() { return Some(idx); }
        if skipped < 1 && FILLERS.contains(&word) {
            skipped += 1;
            idx += 1;
            continue;
        }
        break;
    }
    None
}

/// Binds each mention to the number right before it ("3 bbq") or right after it ("bbq x3").
///
/// The first mention decides which side is tried first for the whole message, so
/// "P-CHZ 2 2L-BBQ 1" and "2 P-CHZ 1 2L-BBQ" both bind each number once. Tokens
/// inside `blocked` spans (fees, discounts, prices) never bind.
pub fn bind_quantities(tokens: &[Token], mentions: &mut [Mention], blocked: &[Range<usize>]) {
    let mut free: Vec<bool> = tokens
        .iter()
        .map(|t| !blocked.iter().any(|b| b.start < t.span.end && t.span.start < b.end))
        .collect();
    for m in mentions.iter() {
        free[m.start..m.end].iter_mut().for_each(|f| *f = false);
    }

    let bounds: Vec<(usize, usize)> = (0..mentions.len())
        .map(|k| {
            let floor = if k == 0 { 0 } else { mentions[k - 1].end };
            let ceiling = mentions.get(k + 1).map_or(tokens.len(), |n| n.start);
            (floor, ceiling)
        })
        .collect();

    let trail_first = match mentions.first() {
        Some(first) => {
            lead_quantity(tokens, &free, first.start, bounds[0].0).is_none()
                && trail_quantity(tokens, &free, first.end, bounds[0].1).is_some()
        }
        None => return,
    };

    for pass in 0..2 {
        let use_lead = (pass == 0) != trail_first;
        for (k, m) in mentions.iter_mut().enumerate() {
            if m.quantity.is_some() { continue; }
            let (floor, ceiling) = bounds[k];
            let found = if use_lead {
                lead_quantity(tokens, &free, m.start, floor)
            } else {
                trail_quantity(tokens, &free, m.end, ceiling)
            };
            if let Some(j) = found {
                free[j] = false;
                m.quantity = parse_quantity(&tokens[j].lower);
            }
        }
    }
}

fn pattern(source: &str) -> Regex {
    Regex::new(source).expect("lexicon patterns are valid")
}

static PAYMENT_PATTERNS: Lazy<Vec<(PaymentMethod, Regex)>> = Lazy::new(|| {
    vec![
        (PaymentMethod::Gcash, pattern(r"(?i)\bg[\s-]?cash\b")),
        (PaymentMethod::Bpi, pattern(r"(?i)\bbpi\b")),
        (PaymentMethod::Maya, pattern(r"(?i)\b(?:pay\s?maya|maya)\b")),
        (PaymentMethod::Cash, pattern(r"(?i)\b(?:cash\s+on\s+delivery|cod|cash)\b")),
        (PaymentMethod::Bdo, pattern(r"(?i)\bbdo\b")),
        (PaymentMethod::Others, pattern(r"(?i)\b(?:transfer|bank|online)\b")),
    ]
});

static LOCATION_PATTERNS: Lazy<Vec<(Location, Regex)>> = Lazy::new(|| {
    vec![
        (Location::QuezonCity, pattern(r"(?i)(?:^|[^\p{L}\p{N}])(?:quezon(?:\s+city)?|qc|q\.c)(?:[^\p{L}\p{N}]|$)")),
        (Location::Paranaque, pattern(r"(?i)\b(?:para[nñ]aque|pque)\b")),
    ]
});

static SHIPPING: Lazy<Regex> = Lazy::new(|| {
    pattern(r"(?i)\b(?:sf|df|shipping(?:\s+fee)?|delivery(?:\s+fee)?)\s*[:=-]?\s*(?:₱|php)?\s*(\d+)")
});

static PERCENT: Lazy<Regex> = Lazy::new(|| pattern(r"(\d{1,3})\s*%"));
static DISCOUNT_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    pattern(r"(?i)\b(?:less|discount|disc)\s*[:=-]?\s*(?:₱|php)?\s*(\d+)(\s*%)?")
});
static AMOUNT_OFF: Lazy<Regex> = Lazy::new(|| pattern(r"(?i)\b(\d+)\s*(?:php|pesos?)?\s*off\b"));
static MONEY: Lazy<Regex> = Lazy::new(|| pattern(r"(?i)(?:₱|\bphp)\s*\d+"));

/// First keyword group (in fixed priority order) that appears anywhere in the text.
pub fn extract_payment_method(text: &str) -> Option<PaymentMethod> {
    PAYMENT_PATTERNS.iter().find(|(_, re)| re.is_match(text)).map(|(m, _)| *m)
}

pub fn extract_location(text: &str) -> Option<Location> {
    LOCATION_PATTERNS.iter().find(|(_, re)| re.is_match(text)).map(|(l, _)| *l)
}

/// Largest fee or peso discount taken from a message; bigger figures are dropped.
pub const MAX_CHARGE: i64 = 1_000_000;

fn captured_number(caps: &regex::Captures<'_>) -> Option<i64> {
    caps.get(1)?.as_str().parse().ok().filter(|n| *n <= MAX_CHARGE)
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChargeScan {
    pub charges: Charges,
    /// Text consumed by fee, discount and price tokens.
    pub spans: Vec<Range<usize>>,
}

/// Shipping fee ("sf 100", "delivery fee: 80") and discount ("10%", "less 50", "20 off").
pub fn extract_charges(text: &str) -> ChargeScan {
    let mut scan = ChargeScan::default();

    for caps in SHIPPING.captures_iter(text) {
        let Some(m) = caps.get(0) else { continue };
        scan.spans.push(m.range());
        if let Some(fee) = captured_number(&caps) {
            scan.charges.shipping_fee.get_or_insert(fee);
        }
    }

    let mut discounts: Vec<(usize, Discount)> = Vec::new();
    for caps in PERCENT.captures_iter(text) {
        let Some(m) = caps.get(0) else { continue };
        scan.spans.push(m.range());
        if let Some(pct) = captured_number(&caps).and_then(|n| u32::try_from(n).ok()).filter(|p| *p <= 100) {
            discounts.push((m.start(), Discount::Percentage(pct)));
        }
    }
    for caps in DISCOUNT_KEYWORD.captures_iter(text) {
        let Some(m) = caps.get(0) else { continue };
        scan.spans.push(m.range());
        let discount = captured_number(&caps).and_then(|n| match caps.get(2) {
            Some(_) => u32::try_from(n).ok().filter(|p| *p <= 100).map(Discount::Percentage),
            None => Some(Discount::Amount(n)),
        });
        if let Some(d) = discount { discounts.push((m.start(), d)); }
    }
    for caps in AMOUNT_OFF.captures_iter(text) {
        let Some(m) = caps.get(0) else { continue };
        scan.spans.push(m.range());
        if let Some(n) = captured_number(&caps) {
            discounts.push((m.start(), Discount::Amount(n)));
        }
    }
    scan.charges.discount = discounts.into_iter().min_by_key(|(at, _)| *at).map(|(_, d)| d);

    scan.spans.extend(MONEY.find_iter(text).map(|m| m.range()));
    scan
}

static NAME_LABELLED: Lazy<Regex> = Lazy::new(|| pattern(r"(?i)\b(?:customer|name|pangalan)\s*[:=-]\s*([^\n,;]+)"));
static NAME_FROM: Lazy<Regex> = Lazy::new(|| pattern(r"\b[Ff]rom[ \t]+(\p{Lu}[\w'.-]*(?:[ \t]+\p{Lu}[\w'.-]*){0,2})"));
static NAME_ORDERED: Lazy<Regex> = Lazy::new(|| pattern(r"\b(\p{Lu}[\w'.-]*(?:[ \t]+\p{Lu}[\w'.-]*){0,2})[ \t]+ordered\b"));

/// Best-effort customer name: "customer: X", "from X", "X ordered".
pub fn extract_customer_name(text: &str, catalog: &Catalog) -> Option<String> {
    [&*NAME_LABELLED, &*NAME_FROM, &*NAME_ORDERED]
        .into_iter()
        .flat_map(|re| re.captures_iter(text).filter_map(|caps| caps.get(1)).collect::<Vec<_>>())
        .map(|m| m.as_str().split_whitespace().take(4).collect::<Vec<_>>().join(" "))
        .map(|name| name.trim_end_matches(['.', '-']).to_string())
        .find(|name| plausible_name(name, catalog))
}

fn plausible_name(name: &str, catalog: &Catalog) -> bool {
    !name.is_empty()
        && name.chars().any(char::is_alphabetic)
        && Location::from_label(name).is_none()
        && extract_location(name).is_none()
        && catalog.get(name).is_none()
        && name.split_whitespace().all(|w| catalog.get(w).is_none())
}

/// Tokens, product mentions with bound quantities, and charges for one message.
#[derive(Clone, Debug)]
pub struct MessageScan {
    pub tokens: Vec<Token>,
    pub mentions: Vec<Mention>,
    pub charges: Charges,
}

impl MessageScan {
    pub fn new(text: &str, catalog: &Catalog) -> Self {
        let tokens = tokenize(text);
        let charge_scan = extract_charges(text);
        let mut mentions = find_mentions(&tokens, catalog);
        bind_quantities(&tokens, &mut mentions, &charge_scan.spans);
        Self { tokens, mentions, charges: charge_scan.charges }
    }
}
