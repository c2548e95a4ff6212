//! Operation hooks a resource exposes to the dispatcher.

use std::future::Future;

use crate::failure::Failure;
use crate::http::context::RequestContext;
use crate::http::reply::Reply;

pub type HookResult = Result<Reply, Failure>;

/// A resource served by the dispatcher.
///
/// GET and HEAD call `show` when the request carries the [`identifier`](Resource::identifier)
/// parameter and `index` otherwise; PUT calls `update`, POST `store`, DELETE `destroy`.
pub trait Resource: Send + Sync + 'static {
    /// Name of the parameter identifying a single item (e.g. `statementId`).
    fn identifier(&self) -> &str;

    fn show(&self, ctx: &RequestContext) -> impl Future<Output = HookResult> + Send;

    fn index(&self, ctx: &RequestContext) -> impl Future<Output = HookResult> + Send;

    fn update(&self, ctx: &RequestContext) -> impl Future<Output = HookResult> + Send;

    fn store(&self, ctx: &RequestContext) -> impl Future<Output = HookResult> + Send;

    fn destroy(&self, ctx: &RequestContext) -> impl Future<Output = HookResult> + Send;
}
