//! Customer Directory
//!
//! Read access to customers and their purchases. The agent tools only see
//! this trait, so they run the same against the in-memory store and the
//! REST client.

mod http;
mod mock;

pub use http::{CustomerApiClient, CustomerApiConfig, DEFAULT_API_URL, DEFAULT_TIMEOUT_SECS};
pub use mock::MockCustomerStore;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{Customer, Product};

/// Customer directory trait (Strategy pattern)
#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    /// Look up a customer by email, case-insensitively
    async fn customer_by_email(&self, email: &str) -> Result<Customer>;

    /// Every customer in the directory
    async fn customers(&self) -> Result<Vec<Customer>>;

    /// Purchases of one customer; `NotFound` when the customer is unknown
    async fn products_for(&self, customer_id: i64) -> Result<Vec<Product>>;

    /// Backend name, for logs
    fn name(&self) -> &str;
}
