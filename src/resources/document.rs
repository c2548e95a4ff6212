//! In-memory xAPI document resource (State API style).
//!
//! Documents are scoped by `activityId`, `agent` and an optional `registration`,
//! and identified inside the scope by a configurable parameter (e.g. `stateId`).
//!
//! # Concurrency
//! Writes to one document go through a single `DashMap` entry, so precondition
//! checks and the write that follows them cannot interleave with another writer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::{
    body::Bytes,
    http::{header, HeaderMap, HeaderValue, StatusCode},
};
use dashmap::{mapref::entry::Entry, DashMap};
use serde_json::Value;

use crate::dispatch::resource::{HookResult, Resource};
use crate::failure::Failure;
use crate::http::context::RequestContext;
use crate::http::reply::Reply;
use crate::params::{ParamPipeline, TypeValidator};
use crate::version::check_version;

const JSON_CONTENT_TYPE: &str = "application/json";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Scope {
    activity_id: String,
    agent: String,
    registration: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DocumentKey {
    scope: Scope,
    id: String,
}

#[derive(Debug, Clone)]
struct StoredDocument {
    content: Bytes,
    content_type: HeaderValue,
    revision: u64,
}

impl StoredDocument {
    fn etag(&self) -> String {
        format!("\"{}\"", self.revision)
    }
}

/// Documents kept in process memory.
pub struct DocumentResource {
    identifier: String,
    validator: Arc<dyn TypeValidator>,
    documents: DashMap<DocumentKey, StoredDocument>,
    revisions: AtomicU64,
}

impl DocumentResource {
    /// `identifier` names the parameter that selects one document.
    pub fn new(identifier: impl Into<String>, validator: Arc<dyn TypeValidator>) -> Self {
        Self {
            identifier: identifier.into(),
            validator,
            documents: DashMap::new(),
            revisions: AtomicU64::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn params<'a>(&'a self, ctx: &'a RequestContext) -> ParamPipeline<'a> {
        ParamPipeline::new(ctx, self.validator.as_ref())
    }

    fn scope(&self, params: &ParamPipeline<'_>) -> Result<Scope, Failure> {
        let ctx = params.context();
        let activity_id = params.required("activityId", ctx.param("activityId"), "iri")?;
        let agent = params.required("agent", ctx.param("agent"), "Agent")?;
        let registration = params.named_with_default("uuid", "registration", None)?;

        Ok(Scope {
            activity_id: text(&activity_id),
            agent: agent.to_string(),
            registration: registration.as_ref().map(text),
        })
    }

    fn key(&self, params: &ParamPipeline<'_>) -> Result<DocumentKey, Failure> {
        let scope = self.scope(params)?;
        let id = params.required_text(
            &self.identifier,
            params.context().param(&self.identifier),
            "string",
        )?;
        Ok(DocumentKey { scope, id })
    }

    fn next_revision(&self) -> u64 {
        self.revisions.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl Resource for DocumentResource {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    async fn show(&self, ctx: &RequestContext) -> HookResult {
        check_version(ctx.headers())?;
        let key = self.key(&self.params(ctx))?;

        let document = self
            .documents
            .get(&key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Failure::generic(format!("No document found - {}", key.id)))?;

        Ok(Reply::bytes(StatusCode::OK, document.content_type.clone(), document.content.clone())
            .with_header(header::ETAG, etag_value(&document)?))
    }

    async fn index(&self, ctx: &RequestContext) -> HookResult {
        check_version(ctx.headers())?;
        let scope = self.scope(&self.params(ctx))?;

        let mut ids: Vec<String> = self
            .documents
            .iter()
            .filter(|entry| entry.key().scope == scope)
            .map(|entry| entry.key().id.clone())
            .collect();
        ids.sort();

        Ok(Reply::json(StatusCode::OK, Value::from(ids)))
    }

    async fn update(&self, ctx: &RequestContext) -> HookResult {
        check_version(ctx.headers())?;
        let key = self.key(&self.params(ctx))?;
        let content = required_content(ctx)?;
        let content_type = document_content_type(ctx, &content);
        let revision = self.next_revision();

        match self.documents.entry(key) {
            Entry::Occupied(mut entry) => {
                let current = entry.get().etag();
                if !has_preconditions(ctx.headers()) {
                    return Err(Failure::conflict(
                        "A document already exists - supply If-Match or If-None-Match to replace it",
                    ));
                }
                check_preconditions(ctx.headers(), Some(&current))?;
                entry.insert(StoredDocument {
                    content,
                    content_type,
                    revision,
                });
            }
            Entry::Vacant(entry) => {
                check_preconditions(ctx.headers(), None)?;
                entry.insert(StoredDocument {
                    content,
                    content_type,
                    revision,
                });
            }
        }

        tracing::debug!(revision, "Document replaced");
        Ok(Reply::no_content())
    }

    async fn store(&self, ctx: &RequestContext) -> HookResult {
        check_version(ctx.headers())?;
        let key = self.key(&self.params(ctx))?;
        let content = required_content(ctx)?;
        let content_type = document_content_type(ctx, &content);
        let revision = self.next_revision();

        match self.documents.entry(key) {
            Entry::Occupied(mut entry) => {
                check_preconditions(ctx.headers(), Some(&entry.get().etag()))?;
                let merged = merge_json(&entry.get().content, &content)?;
                entry.insert(StoredDocument {
                    content: merged,
                    content_type: HeaderValue::from_static(JSON_CONTENT_TYPE),
                    revision,
                });
            }
            Entry::Vacant(entry) => {
                check_preconditions(ctx.headers(), None)?;
                entry.insert(StoredDocument {
                    content,
                    content_type,
                    revision,
                });
            }
        }

        tracing::debug!(revision, "Document stored");
        Ok(Reply::no_content())
    }

    async fn destroy(&self, ctx: &RequestContext) -> HookResult {
        check_version(ctx.headers())?;
        let params = self.params(ctx);

        if ctx.has_param(&self.identifier) {
            let key = self.key(&params)?;
            self.documents.remove(&key);
        } else {
            let scope = self.scope(&params)?;
            self.documents.retain(|key, _| key.scope != scope);
        }

        Ok(Reply::no_content())
    }
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn etag_value(document: &StoredDocument) -> Result<HeaderValue, Failure> {
    HeaderValue::from_str(&document.etag()).map_err(|e| Failure::uncategorized(&e))
}

fn required_content(ctx: &RequestContext) -> Result<Bytes, Failure> {
    ctx.content()
        .ok_or_else(|| Failure::generic("Required parameter is missing - content"))
}

/// Content type recorded for a new document.
///
/// Alternate-syntax requests arrive form-encoded, so their real type is sniffed.
fn document_content_type(ctx: &RequestContext, content: &Bytes) -> HeaderValue {
    let declared = ctx
        .headers()
        .get(header::CONTENT_TYPE)
        .filter(|v| !v.to_str().unwrap_or_default().starts_with(FORM_CONTENT_TYPE));

    match declared {
        Some(value) => value.clone(),
        None if serde_json::from_slice::<Value>(content).is_ok() => {
            HeaderValue::from_static(JSON_CONTENT_TYPE)
        }
        None => HeaderValue::from_static("application/octet-stream"),
    }
}

fn has_preconditions(headers: &HeaderMap) -> bool {
    headers.contains_key(header::IF_MATCH) || headers.contains_key(header::IF_NONE_MATCH)
}

/// Evaluate `If-Match` / `If-None-Match` against the current ETag (`None` when absent).
fn check_preconditions(headers: &HeaderMap, current: Option<&str>) -> Result<(), Failure> {
    let header_text = |name| headers.get(name).and_then(|v: &HeaderValue| v.to_str().ok());

    if let Some(expected) = header_text(header::IF_MATCH) {
        let matched = match current {
            Some(etag) => expected.trim() == "*" || etag_list_contains(expected, etag),
            None => false,
        };
        if !matched {
            return Err(Failure::precondition(
                "Precondition failed - If-Match does not match the current document",
            ));
        }
    }

    if let Some(unexpected) = header_text(header::IF_NONE_MATCH) {
        let matched = match current {
            Some(etag) => unexpected.trim() == "*" || etag_list_contains(unexpected, etag),
            None => false,
        };
        if matched {
            return Err(Failure::precondition(
                "Precondition failed - If-None-Match matched the current document",
            ));
        }
    }

    Ok(())
}

fn etag_list_contains(list: &str, etag: &str) -> bool {
    list.split(',').any(|candidate| candidate.trim() == etag)
}

/// Merge two JSON object documents; keys from `incoming` win.
fn merge_json(existing: &Bytes, incoming: &Bytes) -> Result<Bytes, Failure> {
    let existing = serde_json::from_slice::<Value>(existing).ok();
    let incoming = serde_json::from_slice::<Value>(incoming).ok();

    match (existing, incoming) {
        (Some(Value::Object(mut base)), Some(Value::Object(update))) => {
            base.extend(update);
            Ok(Bytes::from(serde_json::to_vec(&Value::Object(base))?))
        }
        _ => Err(Failure::generic(
            "Only JSON object documents can be merged with a POST",
        )),
    }
}
