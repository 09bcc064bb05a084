//! Value Objects for order intake

use serde::{Deserialize, Serialize};
use std::fmt;

/// Payment channel a customer names in an order message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    Gcash,
    #[serde(rename = "BPI")]
    Bpi,
    Maya,
    Cash,
    #[serde(rename = "BDO")]
    Bdo,
    Others,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 6] = [Self::Gcash, Self::Bpi, Self::Maya, Self::Cash, Self::Bdo, Self::Others];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Gcash => "Gcash",
            Self::Bpi => "BPI",
            Self::Maya => "Maya",
            Self::Cash => "Cash",
            Self::Bdo => "BDO",
            Self::Others => "Others",
        }
    }

    /// Case-insensitive lookup of one of the closed labels.
    pub fn from_label(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL.into_iter().find(|m| m.label().eq_ignore_ascii_case(value))
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.label()) }
}

/// Delivery area; decides which seller handles the order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Location {
    #[serde(rename = "Quezon City")]
    QuezonCity,
    Paranaque,
}

impl Location {
    pub const ALL: [Location; 2] = [Self::QuezonCity, Self::Paranaque];

    pub fn label(&self) -> &'static str {
        match self { Self::QuezonCity => "Quezon City", Self::Paranaque => "Paranaque" }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "quezon city" | "qc" => Some(Self::QuezonCity),
            "paranaque" | "parañaque" => Some(Self::Paranaque),
            _ => None,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.label()) }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Seller { Ferdie, Nina }

impl Seller {
    pub fn name(&self) -> &'static str {
        match self { Self::Ferdie => "Ferdie", Self::Nina => "Nina" }
    }
}

impl fmt::Display for Seller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

/// Seller assignment by delivery area. Every parse path goes through this one table.
pub fn assigned_seller(location: Option<Location>) -> Option<Seller> {
    match location? {
        Location::QuezonCity => Some(Seller::Ferdie),
        Location::Paranaque => Some(Seller::Nina),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Size { Pouch, Tub }

impl Size {
    pub fn label(&self) -> &'static str {
        match self { Self::Pouch => "Pouch", Self::Tub => "Tub" }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.label()) }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Flavor { Cheese, SourCream, Bbq, Original }

impl Flavor {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Cheese => "Cheese",
            Self::SourCream => "Sour Cream",
            Self::Bbq => "BBQ",
            Self::Original => "Original",
        }
    }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

/// Which interpretation path produced an order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseSource { Oracle, Deterministic }

impl fmt::Display for ParseSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::Oracle => write!(f, "oracle"), Self::Deterministic => write!(f, "deterministic") }
    }
}

/// Spreadsheet column letter (A..Z)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Column(u8);

impl Column {
    /// Const constructor for the fixed ledger layout; panics at compile time on a bad letter.
    pub const fn of(letter: char) -> Self {
        assert!(letter.is_ascii_uppercase());
        Self(letter as u8)
    }

    pub fn letter(&self) -> char { self.0 as char }

    /// A1-style reference, e.g. `N12`.
    pub fn cell(&self, row: u32) -> String { format!("{}{}", self.letter(), row) }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.letter()) }
}

impl Serialize for Column {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_char(self.letter())
    }
}

/// Title-cases each whitespace-separated word ("juan dela cruz" -> "Juan Dela Cruz").
pub fn title_case(value: &str) -> String {
    value
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
