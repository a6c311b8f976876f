//! # HTTP Server
//!
//! Main HTTP server combining all endpoint routers. Starting the server
//! also starts the convergence loop; both stop on the same shutdown signal.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::api::ApiHandler;
use crate::maintenance::DEFAULT_POLL_INTERVAL;
use crate::observability::{log_event, log_event_with_fields, Event};

use super::config::HttpServerConfig;
use super::dump_routes::dump_routes;
use super::entity_routes::entity_routes;
use super::maintenance_routes::maintenance_routes;
use super::observability_routes::{health_routes, observability_routes};

pub struct HttpServer {
    config: HttpServerConfig,
    api: Arc<ApiHandler>,
    poll_interval: Duration,
    router: Router,
}

impl HttpServer {
    pub fn with_config(config: HttpServerConfig, api: Arc<ApiHandler>) -> Self {
        let router = Self::build_router(&config, Arc::clone(&api));
        Self {
            config,
            api,
            poll_interval: DEFAULT_POLL_INTERVAL,
            router,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Build the combined router with all endpoints
    pub fn build_router(config: &HttpServerConfig, api: Arc<ApiHandler>) -> Router {
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
            .merge(health_routes())
            .merge(maintenance_routes(Arc::clone(&api)))
            .merge(dump_routes(Arc::clone(&api)))
            .merge(entity_routes(Arc::clone(&api)))
            .nest("/observability", observability_routes(api))
            .layer(cors)
    }

    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Serve until `shutdown` resolves, running the convergence loop
    /// alongside.
    pub async fn start<F>(self, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr: SocketAddr = self
            .config
            .socket_addr()
            .parse()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let listener = TcpListener::bind(addr).await?;

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let convergence = self
            .api
            .convergence_loop()
            .with_poll_interval(self.poll_interval);
        let loop_handle = tokio::spawn(convergence.run(async move {
            let _ = stop_rx.changed().await;
        }));

        log_event_with_fields(Event::Serving, &[("addr", &addr.to_string())]);
        let served = axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.await;
                log_event(Event::ShutdownStart);
            })
            .await;

        let _ = stop_tx.send(true);
        let _ = loop_handle.await;
        log_event(Event::ShutdownComplete);
        served
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn api() -> Arc<ApiHandler> {
        Arc::new(ApiHandler::bootstrap(Arc::new(MemoryStore::new())).unwrap())
    }

    #[test]
    fn test_server_with_custom_port() {
        let server = HttpServer::with_config(HttpServerConfig::with_port(8080), api());
        assert_eq!(server.socket_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_router_builds_with_cors_list() {
        let config = HttpServerConfig {
            cors_origins: vec!["http://localhost:3000".to_string()],
            ..Default::default()
        };
        let _router = HttpServer::with_config(config, api()).router();
    }
}
