//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::http::StatusCode;
use axum::Router;
use serde_json::json;
use tokio::net::TcpListener;

use xapi_endpoint::dispatch::HookResult;
use xapi_endpoint::{EndpointConfig, EndpointServer, Failure, Reply, RequestContext, Resource, Shutdown};

/// Parameter telling [`RecordingResource`] how its hooks should fail.
pub const OUTCOME_PARAM: &str = "outcome";

/// Resource that records which hook ran and fails on demand.
#[derive(Default)]
pub struct RecordingResource {
    calls: Mutex<Vec<&'static str>>,
}

#[allow(dead_code)]
impl RecordingResource {
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, hook: &'static str, ctx: &RequestContext) -> HookResult {
        self.calls.lock().unwrap().push(hook);

        match ctx.param(OUTCOME_PARAM).and_then(|v| v.as_str()) {
            Some("validation") => Err(Failure::validation(vec![
                "`agent` is not a valid Agent in params".into(),
                "`since` is not a valid timestamp in params".into(),
            ])),
            Some("conflict") => Err(Failure::conflict("Statement already exists")),
            Some("precondition") => Err(Failure::precondition("Stale ETag")),
            Some("generic") => Err(Failure::generic("Something broke")),
            Some("bare") => Err(Failure::from("Plain message")),
            Some("panic") => panic!("hook panicked"),
            _ => Ok(Reply::json(StatusCode::OK, json!({ "hook": hook }))),
        }
    }
}

impl Resource for RecordingResource {
    fn identifier(&self) -> &str {
        "statementId"
    }

    async fn show(&self, ctx: &RequestContext) -> HookResult {
        self.record("show", ctx)
    }

    async fn index(&self, ctx: &RequestContext) -> HookResult {
        self.record("index", ctx)
    }

    async fn update(&self, ctx: &RequestContext) -> HookResult {
        self.record("update", ctx)
    }

    async fn store(&self, ctx: &RequestContext) -> HookResult {
        self.record("store", ctx)
    }

    async fn destroy(&self, ctx: &RequestContext) -> HookResult {
        self.record("destroy", ctx)
    }
}

/// Router with `resource` mounted at `/data/xAPI/statements`.
#[allow(dead_code)]
pub fn router_with<R: Resource>(path: &str, resource: Arc<R>) -> Router {
    EndpointServer::new(EndpointConfig::default())
        .unwrap()
        .mount_shared(path, resource)
        .into_router()
}

/// Start a server on an ephemeral port; returns its address and shutdown handle.
#[allow(dead_code)]
pub async fn spawn_server<R: Resource>(path: &str, resource: Arc<R>) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let mut config = EndpointConfig::default();
    config.listener.bind_address = addr.to_string();
    config.service.base_url = format!("http://{}", addr);

    let server = EndpointServer::new(config).unwrap().mount_shared(path, resource);
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}
