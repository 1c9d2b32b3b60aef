//! Import service for the storefront backend.
//!
//! Two halves, wired to the same S3 bucket:
//!
//! - **Presigned upload API**: `GET /import?fileName=<name>.csv` hands out a
//!   time-limited, write-scoped URL under the `uploaded/` prefix. The service
//!   never touches the bucket here; the client performs the upload itself.
//! - **Import consumer**: S3 object-created notifications arrive through a
//!   queue. Each uploaded file is fetched, parsed as header-driven CSV into
//!   product records, and relocated to `processed/` on success or `error/` on
//!   failure.
//!
//! Pipeline state lives entirely in key prefixes:
//!
//! ```text
//! uploaded/x.csv ──parse ok──▶ processed/x.csv
//!        │
//!        └──any failure─────▶ error/x.csv   (best effort; the original
//!                                            stays put if even this fails)
//! ```

pub mod config;
pub mod consumer;
pub mod csv_parser;
pub mod events;
pub mod presign;
pub mod s3_store;

pub use config::Config;
pub use consumer::{ImportConsumer, ImportError, ImportPipeline};
pub use csv_parser::{parse_products, ParseError, ProductRecord};
pub use events::{decode_object_key, S3Event};
pub use presign::AppState;
pub use s3_store::{ImportStore, ObjectOps};
