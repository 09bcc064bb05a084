//! In-message corrections: "patanggal yung tub cheese", "add pa 2 bbq", "palitan ng bbq".

use serde::Serialize;

use crate::domain::aggregates::OrderLine;
use crate::interpret::lexicon::{Mention, MessageScan, Token};

/// How far (in tokens) a marker may sit from the product it modifies.
const MARKER_WINDOW: usize = 6;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind { Add, Remove, Replace }

const MARKERS: &[(&str, IntentKind)] = &[
    ("add", IntentKind::Add), ("padd", IntentKind::Add), ("pa-add", IntentKind::Add),
    ("dagdag", IntentKind::Add), ("plus", IntentKind::Add),
    ("tanggal", IntentKind::Remove), ("patanggal", IntentKind::Remove), ("tanggalin", IntentKind::Remove),
    ("remove", IntentKind::Remove), ("cancel", IntentKind::Remove), ("alisin", IntentKind::Remove),
    ("replace", IntentKind::Replace), ("palit", IntentKind::Replace), ("palitan", IntentKind::Replace),
    ("papalit", IntentKind::Replace), ("instead", IntentKind::Replace),
];

/// Words after a replacement marker that introduce the new item, so the replaced one came before.
const REPLACEMENT_LEADS: &[&str] = &["ng", "with", "to", "into", "by"];

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ModificationIntent {
    pub kind: IntentKind,
    pub marker: String,
    /// Byte offset of the marker.
    pub offset: usize,
    /// Index into the scan's mentions of the product this marker acts on.
    pub target: Option<usize>,
}

fn marker_kind(word: &str) -> Option<IntentKind> {
    MARKERS.iter().find(|(m, _)| *m == word).map(|(_, k)| *k)
}

fn following(tokens: &[Token], mentions: &[Mention], at: usize) -> Option<usize> {
    let k = mentions.iter().position(|m| m.start > at)?;
    let start = mentions[k].start;
    let blocked = tokens[at + 1..start].iter().any(|t| marker_kind(&t.lower).is_some());
    (start - at <= MARKER_WINDOW && !blocked).then_some(k)
}

fn preceding(mentions: &[Mention], at: usize) -> Option<usize> {
    let k = mentions.iter().rposition(|m| m.end <= at)?;
    (at + 1 - mentions[k].end <= MARKER_WINDOW).then_some(k)
}

/// Addition, removal and replacement markers in textual order, each tied to the
/// nearest following product mention (else the nearest preceding one).
pub fn extract_modifications(scan: &MessageScan) -> Vec<ModificationIntent> {
    let tokens = &scan.tokens;
    let mentions = &scan.mentions;
    tokens
        .iter()
        .enumerate()
        .filter_map(|(at, token)| {
            let kind = marker_kind(&token.lower)?;
            let replaced_before = kind == IntentKind::Replace
                && tokens.get(at + 1).is_some_and(|t| REPLACEMENT_LEADS.contains(&t.lower.as_str()));
            let target = if replaced_before {
                preceding(mentions, at)
            } else {
                following(tokens, mentions, at).or_else(|| preceding(mentions, at))
            };
            Some(ModificationIntent { kind, marker: token.lower.clone(), offset: token.span.start, target })
        })
        .collect()
}

/// Applies mentions and markers in chronological order and returns the net lines.
///
/// A mention targeted by a removal or replacement marker deletes the most recent
/// pending line for the same product (or the same flavor when the mention did not
/// name a size) instead of adding one. Every other mention adds a line.
pub fn resolve_lines(scan: &MessageScan, intents: &[ModificationIntent]) -> Vec<OrderLine> {
    let mut lines: Vec<OrderLine> = Vec::new();
    for (k, mention) in scan.mentions.iter().enumerate() {
        let removes = intents
            .iter()
            .any(|i| i.target == Some(k) && matches!(i.kind, IntentKind::Remove | IntentKind::Replace));
        if !removes {
            lines.extend(OrderLine::new(*mention.product, mention.effective_quantity()));
            continue;
        }
        let same_code = lines.iter().rposition(|l| l.product.code == mention.product.code);
        let hit = same_code.or_else(|| {
            (!mention.size_explicit)
                .then(|| lines.iter().rposition(|l| l.product.flavor == mention.product.flavor))
                .flatten()
        });
        if let Some(idx) = hit {
            lines.remove(idx);
        }
    }
    lines
}
