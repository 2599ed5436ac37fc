//! Customer REST API
//!
//! `GET /`, `GET /customer?email=`, `GET /customers`,
//! `GET /customer/{customer_id}/products`. Errors carry `{"detail": ...}`.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::directory::CustomerDirectory;
use crate::error::DataError;
use crate::model::{Customer, Product, is_plausible_email};

pub type ApiResult<T> = Result<Json<T>, (StatusCode, Json<DetailResponse>)>;

#[derive(Debug, Serialize, Deserialize)]
pub struct DetailResponse {
    pub detail: String,
}

#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    #[serde(default)]
    pub email: Option<String>,
}

/// Build the API router over a directory
pub fn router(directory: Arc<dyn CustomerDirectory>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/customer", get(customer_by_email))
        .route("/customers", get(all_customers))
        .route("/customer/{customer_id}/products", get(customer_products))
        .with_state(directory)
}

async fn root() -> Json<Value> {
    Json(json!({
        "message": "Customer API is running. Use /customer?email=<email> to get customer details."
    }))
}

async fn customer_by_email(
    State(directory): State<Arc<dyn CustomerDirectory>>,
    Query(query): Query<EmailQuery>,
) -> ApiResult<Customer> {
    let email = query
        .email
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| reject(StatusCode::UNPROCESSABLE_ENTITY, "query parameter 'email' is required"))?;
    if !is_plausible_email(&email) {
        return Err(reject(
            StatusCode::UNPROCESSABLE_ENTITY,
            "value is not a valid email address",
        ));
    }

    directory.customer_by_email(&email).await.map(Json).map_err(into_response)
}

async fn all_customers(State(directory): State<Arc<dyn CustomerDirectory>>) -> ApiResult<Vec<Customer>> {
    directory.customers().await.map(Json).map_err(into_response)
}

async fn customer_products(
    State(directory): State<Arc<dyn CustomerDirectory>>,
    Path(raw_id): Path<String>,
) -> ApiResult<Vec<Product>> {
    let customer_id: i64 = raw_id.parse().map_err(|_| {
        reject(
            StatusCode::UNPROCESSABLE_ENTITY,
            "customer_id must be an integer",
        )
    })?;

    let products = directory.products_for(customer_id).await.map_err(into_response)?;
    if products.is_empty() {
        return Err(reject(
            StatusCode::NOT_FOUND,
            &format!("No products found for customer with ID {}", customer_id),
        ));
    }
    Ok(Json(products))
}

fn reject(status: StatusCode, detail: &str) -> (StatusCode, Json<DetailResponse>) {
    (status, Json(DetailResponse { detail: detail.to_string() }))
}

fn into_response(err: DataError) -> (StatusCode, Json<DetailResponse>) {
    let status = match &err {
        DataError::NotFound(_) => StatusCode::NOT_FOUND,
        DataError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DataError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        DataError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        DataError::Connect(_) | DataError::Network(_) | DataError::Status(_) => StatusCode::BAD_GATEWAY,
        DataError::Config(_) | DataError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!(error = %err, "Customer directory failure");
    }

    let detail = match err {
        DataError::NotFound(detail) | DataError::Validation(detail) => detail,
        other => other.to_string(),
    };
    (status, Json(DetailResponse { detail }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::MockCustomerStore;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    async fn get_json(uri: &str) -> (StatusCode, Value) {
        let app = router(Arc::new(MockCustomerStore::seeded()));
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_root() {
        let (status, body) = get_json("/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["message"].as_str().unwrap().contains("/customer?email="));
    }

    #[tokio::test]
    async fn test_customer_lookup() {
        let (status, body) = get_json("/customer?email=Bob.Wilson%40example.com").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], 3);
        assert_eq!(body["dob"], "1992-03-10");

        let (status, body) = get_json("/customer?email=ghost%40example.com").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "Customer with email 'ghost@example.com' not found");
    }

    #[tokio::test]
    async fn test_customer_lookup_validation() {
        let (status, body) = get_json("/customer?email=nope").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["detail"], "value is not a valid email address");

        let (status, _) = get_json("/customer").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_list_and_products() {
        let (status, body) = get_json("/customers").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 3);

        let (status, body) = get_json("/customer/1/products").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["code"], "LAP001");
        assert_eq!(body[0]["list_price"], json!(1899.99));
        assert!(body[2]["warranty_date"].is_null());

        let (status, body) = get_json("/customer/99/products").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "Customer with ID 99 not found");

        let (status, _) = get_json("/customer/abc/products").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_customer_without_products() {
        let mut store = MockCustomerStore::new();
        store.add_customer(Customer::new(
            4,
            "new@example.com",
            "New Customer",
            chrono::NaiveDate::from_ymd_opt(2001, 2, 3).unwrap(),
        ));
        let app = router(Arc::new(store));
        let response = app
            .oneshot(Request::builder().uri("/customer/4/products").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["detail"], "No products found for customer with ID 4");
    }
}
