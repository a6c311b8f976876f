//! # configstore HTTP Server Module
//!
//! Combines all endpoint routers into one Axum server.
//!
//! # Endpoints
//!
//! - `/health` - Health check
//! - `/maintenance` - Maintenance status, enable, disable
//! - `/export`, `/import` - Bulk dump transfer
//! - `/entities/*` - Ordinary entity traffic
//! - `/observability/*` - Metrics

pub mod body;
pub mod config;
pub mod dump_routes;
pub mod entity_routes;
pub mod maintenance_routes;
pub mod observability_routes;
pub mod server;

pub use config::HttpServerConfig;
pub use server::HttpServer;
