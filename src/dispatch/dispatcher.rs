//! Method dispatcher.
//!
//! # Responsibilities
//! - Resolve the effective verb (override parameter first)
//! - Invoke exactly the hook the verb maps to
//! - Classify failures and panics into envelope replies
//! - Attach CORS headers as the last step of every path
//!
//! # Design Decisions
//! - OPTIONS is answered with 204 and no hook call (CORS preflight)
//! - Other verbs get 405 with an `Allow` header instead of an empty reply
//! - HEAD replies keep status and headers but drop the body, also under `method=HEAD`
//! - A panicking hook degrades to a generic failure so clients still get CORS headers

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::Request,
    http::{header, HeaderValue, StatusCode},
};
use futures_util::FutureExt;

use crate::dispatch::resource::{HookResult, Resource};
use crate::dispatch::verb::{Hook, Verb, ALLOWED_VERBS};
use crate::failure::{Envelope, Failure};
use crate::http::context::RequestContext;
use crate::http::cors::CorsPolicy;
use crate::http::reply::Reply;
use crate::observability::metrics;

pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Dispatches requests for one resource.
pub struct Dispatcher<R> {
    resource: Arc<R>,
    cors: CorsPolicy,
    include_trace: bool,
    body_limit: usize,
}

impl<R> Clone for Dispatcher<R> {
    fn clone(&self) -> Self {
        Self {
            resource: self.resource.clone(),
            cors: self.cors.clone(),
            include_trace: self.include_trace,
            body_limit: self.body_limit,
        }
    }
}

impl<R: Resource> Dispatcher<R> {
    pub fn new(resource: R, cors: CorsPolicy) -> Self {
        Self::from_shared(Arc::new(resource), cors)
    }

    pub fn from_shared(resource: Arc<R>, cors: CorsPolicy) -> Self {
        Self {
            resource,
            cors,
            include_trace: true,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    /// Whether failure envelopes carry the diagnostic `trace` field.
    pub fn with_trace(mut self, include: bool) -> Self {
        self.include_trace = include;
        self
    }

    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    pub fn resource(&self) -> &R {
        &self.resource
    }

    /// Build the request context from a transport request, then dispatch it.
    pub async fn serve(&self, request: Request) -> Reply {
        let origin = request.headers().get(header::ORIGIN).cloned();
        match RequestContext::from_request(request, self.body_limit).await {
            Ok(ctx) => self.dispatch(&ctx).await,
            Err(failure) => self.cors.attach(origin.as_ref(), self.failure_reply(failure)),
        }
    }

    pub async fn dispatch(&self, ctx: &RequestContext) -> Reply {
        let started = Instant::now();
        let verb = Verb::resolve(ctx);
        tracing::debug!(verb = %verb, transport = %ctx.method(), "Dispatching request");

        let reply = match verb.hook() {
            Some(hook) => match AssertUnwindSafe(self.invoke(hook, ctx)).catch_unwind().await {
                Ok(Ok(reply)) => reply,
                Ok(Err(failure)) => self.failure_reply(failure),
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    tracing::error!(verb = %verb, panic = %message, "Operation hook panicked");
                    self.failure_reply(Failure::generic(message))
                }
            },
            None if verb == Verb::Options => Reply::no_content(),
            None => method_not_allowed(&verb),
        };

        let reply = if verb == Verb::Head {
            reply.without_body()
        } else {
            reply
        };

        metrics::record_dispatch(verb.metric_label(), reply.status().as_u16(), started);
        self.cors.attach(ctx.headers().get(header::ORIGIN), reply)
    }

    async fn invoke(&self, hook: Hook, ctx: &RequestContext) -> HookResult {
        match hook {
            Hook::Get => self.get(ctx).await,
            Hook::Update => self.resource.update(ctx).await,
            Hook::Store => self.resource.store(ctx).await,
            Hook::Destroy => self.resource.destroy(ctx).await,
        }
    }

    async fn get(&self, ctx: &RequestContext) -> HookResult {
        if ctx.has_param(self.resource.identifier()) {
            self.resource.show(ctx).await
        } else {
            self.resource.index(ctx).await
        }
    }

    fn failure_reply(&self, failure: Failure) -> Reply {
        tracing::warn!(
            kind = %failure.kind(),
            status = failure.status().as_u16(),
            message = %failure,
            "Request failed"
        );
        metrics::record_failure(failure.kind().as_str());

        if self.include_trace {
            Reply::from(failure)
        } else {
            Reply::from(failure.without_trace())
        }
    }
}

fn method_not_allowed(verb: &Verb) -> Reply {
    Reply::envelope(
        StatusCode::METHOD_NOT_ALLOWED,
        Envelope::from_message(format!("Method not allowed - {}", verb)),
    )
    .with_header(header::ALLOW, HeaderValue::from_static(ALLOWED_VERBS))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "Operation failed unexpectedly".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::EnvelopeMessage;
    use crate::http::reply::ReplyBody;
    use axum::http::{header::ACCESS_CONTROL_ALLOW_ORIGIN, Method};

    struct Fixed;

    impl Resource for Fixed {
        fn identifier(&self) -> &str {
            "id"
        }

        async fn show(&self, _: &RequestContext) -> HookResult {
            Ok(Reply::json(StatusCode::OK, serde_json::json!("show")))
        }

        async fn index(&self, _: &RequestContext) -> HookResult {
            Err(Failure::conflict("index conflict"))
        }

        async fn update(&self, _: &RequestContext) -> HookResult {
            panic!("update exploded")
        }

        async fn store(&self, _: &RequestContext) -> HookResult {
            Err(Failure::precondition("stale"))
        }

        async fn destroy(&self, _: &RequestContext) -> HookResult {
            Ok(Reply::no_content())
        }
    }

    fn dispatcher() -> Dispatcher<Fixed> {
        Dispatcher::new(Fixed, CorsPolicy::new("http://localhost:8080").unwrap())
    }

    #[tokio::test]
    async fn test_get_branches_on_identifier() {
        let ctx = RequestContext::new(Method::GET).with_param("id", "1");
        assert_eq!(dispatcher().dispatch(&ctx).await.status(), StatusCode::OK);

        let ctx = RequestContext::new(Method::GET);
        assert_eq!(dispatcher().dispatch(&ctx).await.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_panic_becomes_generic_failure_with_cors() {
        let ctx = RequestContext::new(Method::PUT);
        let reply = dispatcher().dispatch(&ctx).await;

        assert_eq!(reply.status(), StatusCode::BAD_REQUEST);
        assert_eq!(reply.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "http://localhost:8080");
        match reply.body() {
            ReplyBody::Envelope(envelope) => {
                assert_eq!(envelope.message, EnvelopeMessage::Text("update exploded".into()));
            }
            other => panic!("unexpected body: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_verb_is_method_not_allowed() {
        let ctx = RequestContext::new(Method::PATCH);
        let reply = dispatcher().dispatch(&ctx).await;

        assert_eq!(reply.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(reply.headers()[header::ALLOW], ALLOWED_VERBS);
        assert!(reply.headers().contains_key(ACCESS_CONTROL_ALLOW_ORIGIN));
    }

    #[tokio::test]
    async fn test_options_is_answered_without_hooks() {
        let ctx = RequestContext::new(Method::OPTIONS);
        let reply = dispatcher().dispatch(&ctx).await;

        assert_eq!(reply.status(), StatusCode::NO_CONTENT);
        assert!(reply.headers().contains_key(ACCESS_CONTROL_ALLOW_ORIGIN));
    }

    #[tokio::test]
    async fn test_trace_can_be_withheld() {
        let ctx = RequestContext::new(Method::POST);
        let reply = dispatcher().with_trace(false).dispatch(&ctx).await;

        assert_eq!(reply.status(), StatusCode::PRECONDITION_FAILED);
        match reply.body() {
            ReplyBody::Envelope(envelope) => assert!(envelope.trace.is_none()),
            other => panic!("unexpected body: {other:?}"),
        }
    }
}
