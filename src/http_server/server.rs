//! # HTTP Server
//!
//! Combines the query and observability routers over one shared engine.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::config::HttpConfig;
use crate::engine::QueryEngine;
use crate::observability::Logger;

use super::observability_routes::observability_routes;
use super::query_routes::query_routes;

/// HTTP server for the query engine
pub struct HttpServer {
    config: HttpConfig,
    router: Router,
}

impl HttpServer {
    pub fn new(engine: Arc<QueryEngine>, config: HttpConfig) -> Self {
        let router = Self::build_router(engine, &config);
        Self { config, router }
    }

    fn build_router(engine: Arc<QueryEngine>, config: &HttpConfig) -> Router {
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
            .merge(observability_routes(Arc::clone(&engine)))
            .nest("/v1", query_routes(engine))
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

    /// Binds and serves until the process stops.
    pub async fn start(self) -> Result<(), io::Error> {
        let addr: SocketAddr = self
            .config
            .socket_addr()
            .parse()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        let listener = TcpListener::bind(addr).await?;
        Logger::info("HTTP_LISTENING", &[("addr", &addr.to_string())]);
        axum::serve(listener, self.router).await
    }
}
