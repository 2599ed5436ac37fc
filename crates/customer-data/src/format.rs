//! Tool Output Rendering
//!
//! Markdown for people and models, pretty JSON for machines.

use serde::Serialize;

use crate::error::Result;
use crate::model::{Customer, Product};

/// Output format selected by the `response_format` tool argument
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResponseFormat {
    #[default]
    Markdown,
    Json,
}

impl ResponseFormat {
    /// `"json"` selects JSON (case-insensitive); anything else is markdown.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some(value) if value.trim().eq_ignore_ascii_case("json") => ResponseFormat::Json,
            _ => ResponseFormat::Markdown,
        }
    }
}

pub fn customer_markdown(customer: &Customer) -> String {
    format!(
        "- **ID:** {}\n  **Name:** {}\n  **Email:** {}\n  **Date of Birth:** {}",
        customer.id, customer.name, customer.email, customer.dob
    )
}

pub fn product_markdown(product: &Product) -> String {
    let mut out = format!(
        "- **Code:** {}  |  **Name:** {}\n  **List Price:** ${:.2}  |  **Buy Price:** ${:.2}\n  **Purchase Date:** {}\n  **Has Warranty:** {}",
        product.code,
        product.name,
        product.list_price,
        product.buy_price,
        product.date,
        if product.has_warranty { "Yes" } else { "No" },
    );
    if product.has_warranty {
        let expires = product
            .warranty_date
            .map_or_else(|| "N/A".to_string(), |d| d.to_string());
        out.push_str(&format!("\n  **Warranty Expires:** {}", expires));
    }
    out
}

/// Single customer lookup
pub fn render_customer(customer: &Customer, format: ResponseFormat) -> Result<String> {
    match format {
        ResponseFormat::Json => pretty(customer),
        ResponseFormat::Markdown => Ok(format!("### Customer\n{}", customer_markdown(customer))),
    }
}

/// Full customer listing
pub fn render_customers(customers: &[Customer], format: ResponseFormat) -> Result<String> {
    match format {
        ResponseFormat::Json => pretty(customers),
        ResponseFormat::Markdown if customers.is_empty() => {
            Ok("### All Customers\n_No customers found._".into())
        }
        ResponseFormat::Markdown => Ok(format!(
            "### All Customers (total: {})\n\n{}",
            customers.len(),
            join_blocks(customers.iter().map(customer_markdown))
        )),
    }
}

/// Purchases of one customer
pub fn render_products(customer_id: i64, products: &[Product], format: ResponseFormat) -> Result<String> {
    match format {
        ResponseFormat::Json => pretty(products),
        ResponseFormat::Markdown if products.is_empty() => Ok(format!(
            "### Products for Customer {}\n_No purchases recorded._",
            customer_id
        )),
        ResponseFormat::Markdown => Ok(format!(
            "### Products for Customer {} (total: {})\n\n{}",
            customer_id,
            products.len(),
            join_blocks(products.iter().map(product_markdown))
        )),
    }
}

fn join_blocks(blocks: impl Iterator<Item = String>) -> String {
    blocks.collect::<Vec<_>>().join("\n\n")
}

fn pretty<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
