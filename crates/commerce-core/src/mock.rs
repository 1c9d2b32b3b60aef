//! Static fallback catalog.
//!
//! Predates the DynamoDB-backed store and is kept as a fixture for tests and
//! local development without a running backend.

use crate::product::Product;
use uuid::Uuid;

/// Returns the legacy mock catalog.
pub fn mock_products() -> Vec<Product> {
    vec![
        Product {
            id: Uuid::parse_str("7567ec4b-b10c-48c5-9345-fc73c48a80aa").unwrap(),
            title: "ProTab 11".to_string(),
            description: "11-inch tablet with stylus support".to_string(),
            price: 549.0,
            count: 4,
        },
        Product {
            id: Uuid::parse_str("7567ec4b-b10c-48c5-9345-fc73c48a80a1").unwrap(),
            title: "SoundCore Mini".to_string(),
            description: "Portable bluetooth speaker".to_string(),
            price: 39.99,
            count: 12,
        },
        Product {
            id: Uuid::parse_str("7567ec4b-b10c-48c5-9345-fc73c48a80a2").unwrap(),
            title: "TrailRunner GPS Watch".to_string(),
            description: "Multisport watch with offline maps".to_string(),
            price: 229.5,
            count: 7,
        },
        Product {
            id: Uuid::parse_str("7567ec4b-b10c-48c5-9345-fc73c48a80a3").unwrap(),
            title: "HomeBrew Grinder".to_string(),
            description: "Conical burr coffee grinder, 40 settings".to_string(),
            price: 89.0,
            count: 0,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_catalog_has_unique_ids() {
        let products = mock_products();
        let mut ids: Vec<_> = products.iter().map(|p| p.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), products.len());
    }
}
