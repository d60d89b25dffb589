//! # HTTP Server
//!
//! Binds the assembled router and serves it.

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::core::{CoreError, CoreResult};
use crate::observability::{log_event, Event};

use super::config::HttpServerConfig;

/// CORS layer for the configured origins; permissive when none are listed
pub fn cors_layer(config: &HttpServerConfig) -> CorsLayer {
    if config.cors_origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<_> = config
        .cors_origins
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// HTTP server
pub struct HttpServer {
    config: HttpServerConfig,
    router: Router,
}

impl HttpServer {
    pub fn new(config: HttpServerConfig, router: Router) -> Self {
        Self { config, router }
    }

    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Bind and serve until the process exits
    pub async fn start(self) -> CoreResult<()> {
        let addr = self.config.bind_addr()?;
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            CoreError::configuration(format!("Cannot bind {}: {}", addr, e))
        })?;

        let addr = addr.to_string();
        log_event(Event::ServerStart, &[("addr", addr.as_str())]);

        if let Err(e) = axum::serve(listener, self.router).await {
            let error = e.to_string();
            log_event(Event::ServerError, &[("error", error.as_str())]);
            return Err(CoreError::internal(error));
        }
        Ok(())
    }
}
