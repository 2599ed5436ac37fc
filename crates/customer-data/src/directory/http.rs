//! Customer API Client
//!
//! `CustomerDirectory` over the customer REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::CustomerDirectory;
use crate::error::{DataError, Result};
use crate::model::{Customer, Product, normalize_email};

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Where the customer API lives
#[derive(Clone, Debug)]
pub struct CustomerApiConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for CustomerApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl CustomerApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Read `CUSTOMER_API_URL` and `CUSTOMER_API_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(url) = lookup("CUSTOMER_API_URL").filter(|v| !v.trim().is_empty()) {
            config.base_url = url.trim().to_string();
        }
        if let Some(raw) = lookup("CUSTOMER_API_TIMEOUT_SECS") {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                DataError::Config(format!("CUSTOMER_API_TIMEOUT_SECS is not a number: {}", raw))
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

/// REST client for the customer API
pub struct CustomerApiClient {
    client: Client,
    config: CustomerApiConfig,
}

impl CustomerApiClient {
    pub fn new(config: CustomerApiConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(CustomerApiConfig::from_env()?)
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = self.url(path);
        tracing::debug!(%url, "Customer API request");

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status.is_success() {
            let body = response.text().await.map_err(|e| self.transport_error(e))?;
            return Ok(serde_json::from_str(&body)?);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::warn!(%url, status = status.as_u16(), "Customer API error");
        Err(status_error(status, &body))
    }

    fn transport_error(&self, err: reqwest::Error) -> DataError {
        if err.is_timeout() {
            DataError::Timeout
        } else if err.is_connect() {
            DataError::Connect(self.config.base_url.clone())
        } else {
            DataError::Network(err)
        }
    }
}

#[async_trait]
impl CustomerDirectory for CustomerApiClient {
    async fn customer_by_email(&self, email: &str) -> Result<Customer> {
        let email = normalize_email(email);
        self.get_json("/customer", &[("email", email.as_str())]).await
    }

    async fn customers(&self) -> Result<Vec<Customer>> {
        self.get_json("/customers", &[]).await
    }

    async fn products_for(&self, customer_id: i64) -> Result<Vec<Product>> {
        self.get_json(&format!("/customer/{}/products", customer_id), &[]).await
    }

    fn name(&self) -> &str {
        "customer-api"
    }
}

/// Map an error status to a `DataError`, keeping the server's `detail`.
fn status_error(status: StatusCode, body: &str) -> DataError {
    let detail = detail_of(body);
    match status {
        StatusCode::NOT_FOUND => DataError::NotFound(detail),
        StatusCode::UNPROCESSABLE_ENTITY => DataError::Validation(detail),
        StatusCode::TOO_MANY_REQUESTS => DataError::RateLimited,
        other => DataError::Status(other.as_u16()),
    }
}

fn detail_of(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => match value.get("detail") {
            Some(Value::String(detail)) => detail.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        },
        Err(_) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> CustomerApiClient {
        CustomerApiClient::new(CustomerApiConfig::new(server.uri())).unwrap()
    }

    #[tokio::test]
    async fn test_customer_by_email() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/customer"))
            .and(query_param("email", "john.doe@example.com"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 1, "email": "john.doe@example.com", "name": "John Doe", "dob": "1990-05-15"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let customer = client.customer_by_email(" John.Doe@Example.com ").await.unwrap();
        assert_eq!(customer.id, 1);
        assert_eq!(customer.name, "John Doe");
    }

    #[tokio::test]
    async fn test_products() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/customer/2/products"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "code": "PHO001", "name": "iPhone 15 Pro", "list_price": 1199.99, "buy_price": 1099.99,
                "date": "2024-06-05", "has_warranty": true, "warranty_date": "2026-06-05"
            }])))
            .mount(&server)
            .await;

        let products = client_for(&server).products_for(2).await.unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].code, "PHO001");
        assert_eq!(products[0].buy_price.to_string(), "1099.99");
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let server = MockServer::start().await;
        Mock::given(path("/customer/9/products"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({"detail": "Customer with ID 9 not found"})),
            )
            .mount(&server)
            .await;
        Mock::given(path("/customer"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "detail": [{"loc": ["query", "email"], "msg": "value is not a valid email address"}]
            })))
            .mount(&server)
            .await;
        Mock::given(path("/customers"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = client_for(&server);

        let err = client.products_for(9).await.unwrap_err();
        assert!(matches!(err, DataError::NotFound(ref d) if d == "Customer with ID 9 not found"));

        let err = client.customer_by_email("x@example.com").await.unwrap_err();
        assert!(matches!(err, DataError::Validation(ref d) if d.contains("not a valid email")));

        let err = client.customers().await.unwrap_err();
        assert!(matches!(err, DataError::RateLimited));
    }

    #[tokio::test]
    async fn test_server_error_status() {
        let server = MockServer::start().await;
        Mock::given(path("/customers"))
            .respond_with(ResponseTemplate::new(503).set_body_string("down"))
            .mount(&server)
            .await;

        let err = client_for(&server).customers().await.unwrap_err();
        assert_eq!(err.user_message(), "Error: API returned status 503.");
    }

    #[tokio::test]
    async fn test_connection_refused() {
        // Bind then drop to get a port with nothing listening
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let client = CustomerApiClient::new(CustomerApiConfig::new(url.clone())).unwrap();
        let err = client.customers().await.unwrap_err();
        assert!(matches!(err, DataError::Connect(ref u) if *u == url));
    }

    #[test]
    fn test_config_from_lookup() {
        let config = CustomerApiConfig::from_lookup(|key| match key {
            "CUSTOMER_API_URL" => Some("http://api.internal:9000".into()),
            "CUSTOMER_API_TIMEOUT_SECS" => Some("3".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.base_url, "http://api.internal:9000");
        assert_eq!(config.timeout, Duration::from_secs(3));

        let config = CustomerApiConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.base_url, DEFAULT_API_URL);

        let err = CustomerApiConfig::from_lookup(|key| {
            (key == "CUSTOMER_API_TIMEOUT_SECS").then(|| "soon".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, DataError::Config(_)));
    }
}
