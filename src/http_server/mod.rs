//! HTTP lifecycle API
//!
//! The `/v2` service-instance protocol over axum, with HTTP Basic auth on
//! every route. Long-running operations return 202 and are observed via
//! `last_operation` polling; auth failures are 401 before the engine is
//! ever consulted.

mod auth;
mod broker_routes;
mod config;
mod errors;
mod server;

pub use auth::{basic_header_value, require_basic_auth, BasicCredentials};
pub use broker_routes::{broker_routes, BrokerState};
pub use config::BrokerConfig;
pub use errors::{ApiError, ApiResult};
pub use server::HttpServer;
