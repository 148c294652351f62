//! Product catalog types.
//!
//! A product owns a non-negative stock balance. The balance is only ever
//! mutated through the ledger store's atomic movement operations; the
//! catalog update path carries the administrative override fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ProductId;

/// A catalog product with its current stock balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    /// Unique short code (e.g. SKU)
    pub code: String,
    /// Display name, unique case-insensitively after normalization
    pub name: String,
    pub category: String,
    /// Invariant: never negative
    pub current_stock: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub code: String,
    pub name: String,
    pub category: String,
    pub current_stock: i64,
}

impl NewProduct {
    /// Normalize free-text fields: trimmed, title-cased name and category.
    pub fn normalized(mut self) -> Self {
        self.code = self.code.trim().to_string();
        self.name = title_case(&self.name);
        self.category = title_case(&self.category);
        self
    }
}

/// Partial update for a product.
///
/// `current_stock` sets an absolute balance, `add_stock` adjusts relatively;
/// supplying both is rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub category: Option<String>,
    pub current_stock: Option<i64>,
    pub add_stock: Option<i64>,
}

impl ProductUpdate {
    pub fn normalized(mut self) -> Self {
        self.name = self.name.map(|n| title_case(&n));
        self.category = self.category.map(|c| title_case(&c));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.category.is_none()
            && self.current_stock.is_none()
            && self.add_stock.is_none()
    }
}

/// Listing filter: exact code match wins over partial name match.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub code: Option<String>,
    pub name: Option<String>,
}

/// Trim and title-case a free-text field ("warehouse  tools" -> "Warehouse Tools").
pub fn title_case(s: &str) -> String {
    s.trim()
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
