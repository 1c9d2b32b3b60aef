use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A product as served by the API, with its stock count merged in.
///
/// The authoritative stock count lives in a separate [`Stock`] record; the
/// `count` field here is populated at read time and is not part of the stored
/// product item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub count: i32,
}

/// Per-product stock record, one-to-one with [`Product`] by
/// `product_id == Product.id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stock {
    pub product_id: Uuid,
    pub count: i32,
}

/// Payload accepted by the create-product endpoint.
///
/// A client-supplied `id` must be a syntactically valid UUID, but the server
/// always generates a fresh identifier for the stored record.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProductRequest {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub count: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_count_defaults_to_zero_when_absent() {
        let json = r#"{
            "id": "550e8400-e29b-41d4-a716-446655440000",
            "title": "Widget",
            "description": "A widget",
            "price": 9.99
        }"#;

        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.count, 0);
    }

    #[test]
    fn create_request_accepts_missing_id_and_count() {
        let json = r#"{"title": "Widget", "description": "A widget", "price": 1.5}"#;

        let req: CreateProductRequest = serde_json::from_str(json).unwrap();
        assert!(req.id.is_none());
        assert_eq!(req.count, 0);
    }
}
