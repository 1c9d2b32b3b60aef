//! Shared domain model and HTTP response envelopes for the storefront backend.
//!
//! Both the Products API and the Import service speak the same response
//! dialect: JSON everywhere, `{ "success": false, "message", "errorMessage" }`
//! error envelopes, and success payloads that are either a bare record or a
//! `{ "success": true, "data", "total" }` wrapper. Centralizing the envelope
//! builders here keeps the two services from drifting apart.

pub mod mock;
pub mod product;
pub mod response;

pub use product::{CreateProductRequest, Product, Stock};
pub use response::{ApiError, ItemResponse, ListResponse};
