//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router and mount one dispatcher per resource
//! - Wire up middleware (timeout, request ID, tracing)
//! - Answer unknown paths with a CORS-decorated 404 envelope
//! - Re-attach CORS outside the timeout so a timed-out request stays readable
//! - Serve until the shutdown signal fires

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::HttpBody,
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::{ConfigError, EndpointConfig, ValidationError};
use crate::dispatch::{Dispatcher, Resource};
use crate::failure::Envelope;
use crate::http::cors::CorsPolicy;
use crate::http::reply::Reply;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};

/// HTTP server for the xAPI endpoint.
pub struct EndpointServer {
    router: Router,
    config: EndpointConfig,
    cors: CorsPolicy,
}

impl EndpointServer {
    /// Create a server with no resources mounted yet.
    pub fn new(config: EndpointConfig) -> Result<Self, ConfigError> {
        let cors = CorsPolicy::new(&config.service.base_url).map_err(|_| {
            ConfigError::Validation(vec![ValidationError::InvalidBaseUrl(
                config.service.base_url.clone(),
            )])
        })?;

        Ok(Self {
            router: Router::new(),
            config,
            cors,
        })
    }

    /// Serve `resource` at `route_prefix + path`, for every HTTP method.
    pub fn mount<R: Resource>(self, path: &str, resource: R) -> Self {
        self.mount_shared(path, Arc::new(resource))
    }

    /// Like [`mount`](Self::mount), for a resource the caller keeps a handle to.
    pub fn mount_shared<R: Resource>(mut self, path: &str, resource: Arc<R>) -> Self {
        let dispatcher = Dispatcher::from_shared(resource, self.cors.clone())
            .with_trace(self.config.responses.include_trace)
            .with_body_limit(self.config.limits.max_body_size);

        let route = format!("{}{}", self.config.service.route_prefix, path);
        tracing::info!(route = %route, "Resource mounted");

        self.router = self.router.route(
            &route,
            any(move |request: Request| {
                let dispatcher = dispatcher.clone();
                async move { dispatcher.serve(request).await }
            }),
        );
        self
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }

    /// Finish the router: 404 fallback plus the middleware stack.
    #[allow(deprecated)]
    pub fn into_router(self) -> Router {
        let cors = self.cors;
        let fallback_cors = cors.clone();
        self.router
            .fallback(move |request: Request| {
                let cors = fallback_cors.clone();
                async move { not_found(&cors, request) }
            })
            .layer(TimeoutLayer::new(Duration::from_secs(
                self.config.timeouts.request_secs,
            )))
            .layer(middleware::from_fn_with_state(cors, outer_cors))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.into_router())
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Decorate whatever the inner stack produced, including the timeout layer's bare 408.
async fn outer_cors(State(cors): State<CorsPolicy>, request: Request, next: Next) -> Response {
    let origin = request.headers().get(header::ORIGIN).cloned();
    let mut response = next.run(request).await;

    if response.status() == StatusCode::REQUEST_TIMEOUT
        && response.body().size_hint().exact() == Some(0)
    {
        tracing::warn!("Request timed out");
        response = Reply::envelope(
            StatusCode::REQUEST_TIMEOUT,
            Envelope::from_message("Request timed out"),
        )
        .into_response();
    }

    cors.attach(origin.as_ref(), response)
}

fn not_found(cors: &CorsPolicy, request: Request) -> Reply {
    let reply = Reply::envelope(
        StatusCode::NOT_FOUND,
        Envelope::from_message(format!("No resource found - {}", request.uri().path())),
    );
    cors.attach(request.headers().get(header::ORIGIN), reply)
}
