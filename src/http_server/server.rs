//! # HTTP Server
//!
//! Assembles the lifecycle router around an engine and serves it.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::engine::Engine;
use crate::observability::{Logger, Severity};

use super::auth::BasicCredentials;
use super::broker_routes::{broker_routes, BrokerState};
use super::config::BrokerConfig;

/// HTTP server for the broker lifecycle API
pub struct HttpServer {
    config: BrokerConfig,
    router: Router,
}

impl HttpServer {
    /// Build the server for an engine under the given configuration.
    pub fn new(config: BrokerConfig, engine: Engine) -> Self {
        let router = Self::build_router(&config, engine);
        Self { config, router }
    }

    fn build_router(config: &BrokerConfig, engine: Engine) -> Router {
        let credentials = BasicCredentials::new(&config.username, &config.password);
        let state = Arc::new(BrokerState::new(engine, credentials));

        let cors = if config.cors_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<_> = config
                .cors_origins
                .iter()
                .filter_map(|s| s.parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        };

        Router::new()
            .route("/health", get(health))
            .merge(broker_routes(state))
            .layer(cors)
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Start serving (runs until the process exits).
    pub async fn start(self) -> Result<(), std::io::Error> {
        let addr: SocketAddr = self.config.socket_addr().parse().map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid bind address {}: {}", self.config.socket_addr(), e),
            )
        })?;

        Logger::log(
            Severity::Info,
            "server_started",
            &[("addr", &addr.to_string())],
        );

        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, self.router).await?;
        Ok(())
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}
