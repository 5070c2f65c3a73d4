//! HTTP API handlers
//!
//! Local reconciliation service: the rendered page pushes its committed
//! catalog to `/api/save`, then asks for an enrichment pass via `/api/enrich`.

pub mod catalog;
pub mod health;

pub use catalog::catalog_routes;
pub use health::health_routes;
