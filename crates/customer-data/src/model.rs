//! Domain Models
//!
//! Customer and product records as served by the customer API.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A registered customer
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    /// Directory identifier (>= 1)
    pub id: i64,

    /// Contact email, stored lowercase
    pub email: String,

    /// Full name
    pub name: String,

    /// Date of birth
    pub dob: NaiveDate,
}

impl Customer {
    pub fn new(id: i64, email: impl Into<String>, name: impl Into<String>, dob: NaiveDate) -> Self {
        Self {
            id,
            email: normalize_email(&email.into()),
            name: name.into(),
            dob,
        }
    }
}

/// A product bought by a customer
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Product code (e.g. "LAP001")
    pub code: String,

    /// Display name
    pub name: String,

    /// Catalog price (USD)
    #[serde(with = "rust_decimal::serde::float")]
    pub list_price: Decimal,

    /// Price the customer paid (USD)
    #[serde(with = "rust_decimal::serde::float")]
    pub buy_price: Decimal,

    /// Purchase date
    pub date: NaiveDate,

    /// Whether a warranty was sold with the product
    pub has_warranty: bool,

    /// Warranty expiry, when there is one
    #[serde(default)]
    pub warranty_date: Option<NaiveDate>,
}

/// Trim and lowercase an email for lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Loose syntactic check: one `@`, a non-empty local part, a dotted domain.
pub fn is_plausible_email(email: &str) -> bool {
    let email = email.trim();
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain
            .split('.')
            .filter(|label| !label.is_empty())
            .count()
            >= 2
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}
