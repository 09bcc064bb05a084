//! Product Catalog

use serde::Serialize;
use crate::domain::value_objects::{Column, Flavor, Size};

/// A sellable item. Prices are whole pesos.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Product {
    pub code: &'static str,
    pub flavor: Flavor,
    pub size: Size,
    pub unit_price: i64,
    /// Quantity column for this product in the order ledger.
    pub ledger_column: Column,
}

impl Product {
    /// "Pouch Cheese", "Tub Sour Cream"
    pub fn display_name(&self) -> String { format!("{} {}", self.size, self.flavor) }
}

const PRODUCTS: [Product; 8] = [
    Product { code: "P-CHZ", flavor: Flavor::Cheese, size: Size::Pouch, unit_price: 150, ledger_column: Column::of('N') },
    Product { code: "P-SC", flavor: Flavor::SourCream, size: Size::Pouch, unit_price: 150, ledger_column: Column::of('O') },
    Product { code: "P-BBQ", flavor: Flavor::Bbq, size: Size::Pouch, unit_price: 150, ledger_column: Column::of('P') },
    Product { code: "P-OG", flavor: Flavor::Original, size: Size::Pouch, unit_price: 150, ledger_column: Column::of('Q') },
    Product { code: "2L-CHZ", flavor: Flavor::Cheese, size: Size::Tub, unit_price: 290, ledger_column: Column::of('T') },
    Product { code: "2L-SC", flavor: Flavor::SourCream, size: Size::Tub, unit_price: 290, ledger_column: Column::of('U') },
    Product { code: "2L-BBQ", flavor: Flavor::Bbq, size: Size::Tub, unit_price: 290, ledger_column: Column::of('V') },
    Product { code: "2L-OG", flavor: Flavor::Original, size: Size::Tub, unit_price: 290, ledger_column: Column::of('W') },
];

/// Fixed code -> product registry. Also the single code -> ledger column table.
#[derive(Clone, Copy, Debug)]
pub struct Catalog {
    products: &'static [Product],
}

impl Default for Catalog {
    fn default() -> Self { Self::standard() }
}

impl Catalog {
    pub const fn standard() -> Self { Self { products: &PRODUCTS } }

    /// Case-insensitive code lookup.
    pub fn get(&self, code: &str) -> Option<&'static Product> {
        let code = code.trim();
        let products: &'static [Product] = self.products;
        products.iter().find(|p| p.code.eq_ignore_ascii_case(code))
    }

    pub fn find(&self, flavor: Flavor, size: Size) -> Option<&'static Product> {
        let products: &'static [Product] = self.products;
        products.iter().find(|p| p.flavor == flavor && p.size == size)
    }

    pub fn products(&self) -> &'static [Product] { self.products }

    pub fn ledger_columns(&self) -> impl Iterator<Item = Column> + '_ {
        self.products.iter().map(|p| p.ledger_column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let catalog = Catalog::standard();
        let p = catalog.get("2l-bbq").unwrap();
        assert_eq!(p.code, "2L-BBQ");
        assert_eq!(p.unit_price, 290);
        assert_eq!(p.display_name(), "Tub BBQ");
        assert!(catalog.get("X-ZZZ").is_none());
    }

    #[test]
    fn test_ledger_columns_are_unique() {
        let catalog = Catalog::standard();
        let mut cols: Vec<char> = catalog.ledger_columns().map(|c| c.letter()).collect();
        cols.sort();
        cols.dedup();
        assert_eq!(cols, vec!['N', 'O', 'P', 'Q', 'T', 'U', 'V', 'W']);
        assert_eq!(catalog.find(Flavor::SourCream, Size::Tub).unwrap().code, "2L-SC");
    }
}
