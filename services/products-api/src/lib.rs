//! Products API service for the storefront backend.
//!
//! Exposes the product catalog over HTTP:
//!
//! - `GET /products` — bounded scan of the products table with stock counts
//!   merged in from the stocks table
//! - `GET /products/{id}` — single product lookup
//! - `POST /products` — atomic creation of a product and its stock record
//!   via a transactional dual-write
//!
//! Products and stock live in separate DynamoDB tables joined by
//! `id == product_id`; the stock count is merged into responses at read time
//! and never stored on the product record itself.

pub mod config;
pub mod handlers;
pub mod store;

pub use config::Config;
pub use handlers::{create_router, AppState};
pub use store::{ProductStore, StoreError};
