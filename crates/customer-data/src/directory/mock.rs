//! In-memory Customer Store
//!
//! Seeded with the demo customers. Backs the customer API binary and tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::CustomerDirectory;
use crate::error::{DataError, Result};
use crate::model::{Customer, Product, normalize_email};

/// Static customer store
#[derive(Clone, Debug, Default)]
pub struct MockCustomerStore {
    customers: Vec<Customer>,
    products: BTreeMap<i64, Vec<Product>>,
}

impl MockCustomerStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store holding the three demo customers and their purchases
    pub fn seeded() -> Self {
        let mut store = Self::new();

        store.add_customer(Customer::new(1, "john.doe@example.com", "John Doe", ymd(1990, 5, 15)));
        store.add_customer(Customer::new(2, "jane.smith@example.com", "Jane Smith", ymd(1985, 8, 22)));
        store.add_customer(Customer::new(3, "bob.wilson@example.com", "Bob Wilson", ymd(1992, 3, 10)));

        let purchases = [
            (1, product("LAP001", "Dell XPS 15 Laptop", dec!(1899.99), dec!(1699.99), ymd(2024, 1, 15), Some(ymd(2027, 1, 15)))),
            (1, product("MOU002", "Logitech MX Master 3", dec!(99.99), dec!(89.99), ymd(2024, 2, 20), Some(ymd(2025, 2, 20)))),
            (1, product("USB003", "USB-C Hub Adapter", dec!(49.99), dec!(39.99), ymd(2024, 3, 10), None)),
            (2, product("PHO001", "iPhone 15 Pro", dec!(1199.99), dec!(1099.99), ymd(2024, 6, 5), Some(ymd(2026, 6, 5)))),
            (2, product("CAB002", "USB-C to Lightning Cable", dec!(29.99), dec!(24.99), ymd(2024, 6, 5), None)),
            (3, product("TAB001", "iPad Air", dec!(599.99), dec!(549.99), ymd(2023, 11, 20), Some(ymd(2024, 11, 20)))),
            (3, product("PEN001", "Apple Pencil 2nd Gen", dec!(129.99), dec!(119.99), ymd(2023, 11, 20), Some(ymd(2024, 11, 20)))),
            (3, product("KEY001", "Magic Keyboard", dec!(299.99), dec!(279.99), ymd(2023, 12, 5), Some(ymd(2024, 12, 5)))),
            (3, product("BAG001", "Laptop Backpack", dec!(79.99), dec!(59.99), ymd(2024, 1, 10), None)),
        ];
        for (customer_id, item) in purchases {
            store.add_product(customer_id, item);
        }

        store
    }

    /// Add or replace a customer (matched by id)
    pub fn add_customer(&mut self, customer: Customer) {
        self.customers.retain(|c| c.id != customer.id);
        self.customers.push(customer);
        self.customers.sort_by_key(|c| c.id);
    }

    /// Record a purchase
    pub fn add_product(&mut self, customer_id: i64, product: Product) {
        self.products.entry(customer_id).or_default().push(product);
    }
}

#[async_trait]
impl CustomerDirectory for MockCustomerStore {
    async fn customer_by_email(&self, email: &str) -> Result<Customer> {
        let wanted = normalize_email(email);
        self.customers
            .iter()
            .find(|c| c.email == wanted)
            .cloned()
            .ok_or_else(|| DataError::NotFound(format!("Customer with email '{}' not found", email.trim())))
    }

    async fn customers(&self) -> Result<Vec<Customer>> {
        Ok(self.customers.clone())
    }

    async fn products_for(&self, customer_id: i64) -> Result<Vec<Product>> {
        if !self.customers.iter().any(|c| c.id == customer_id) {
            return Err(DataError::NotFound(format!("Customer with ID {} not found", customer_id)));
        }
        Ok(self.products.get(&customer_id).cloned().unwrap_or_default())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

fn product(
    code: &str,
    name: &str,
    list_price: Decimal,
    buy_price: Decimal,
    date: NaiveDate,
    warranty_date: Option<NaiveDate>,
) -> Product {
    Product {
        code: code.into(),
        name: name.into(),
        list_price,
        buy_price,
        date,
        has_warranty: warranty_date.is_some(),
        warranty_date,
    }
}
