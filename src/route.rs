//! Per-method route entries and their fluent builder.

use crate::handler::{BoxedHandler, Handler};
use crate::middleware::Chain;
use crate::request::Request;

/// Everything registered for one HTTP method.
pub(crate) struct Route {
    handler: BoxedHandler,
    headers: Vec<(String, String)>,
    queries: Vec<(String, String)>,
    middleware: Vec<BoxedHandler>,
}

impl Route {
    pub(crate) fn new(handler: BoxedHandler) -> Self {
        Self {
            handler,
            headers: Vec::new(),
            queries: Vec::new(),
            middleware: Vec::new(),
        }
    }

    /// True when every required header and query pair is present with the
    /// exact same value. An empty predicate set accepts anything.
    pub(crate) fn accepts(&self, req: &Request) -> bool {
        let headers = self.headers.iter().all(|(k, v)| req.header(k) == Some(v.as_str()));
        let queries = self.queries.iter().all(|(k, v)| req.query(k) == Some(v.as_str()));
        headers && queries
    }

    /// The steps to run for this route, after the router's `global` chain.
    pub(crate) fn chain<'a>(&'a self, global: &'a [BoxedHandler]) -> Chain<'a> {
        Chain { global, route: &self.middleware, handler: &self.handler }
    }
}

/// Fluent configuration for a freshly registered route.
///
/// Returned by [`Router::handler`](crate::Router::handler). Every call adds to
/// what is already there; nothing is deduplicated.
///
/// ```rust
/// use sluice::{Method, Request, ResponseWriter, Router};
///
/// fn create(w: &mut ResponseWriter, _req: &Request) {
///     w.write(b"created");
/// }
///
/// fn audit(_w: &mut ResponseWriter, req: &Request) {
///     tracing::info!(body_len = req.body().len(), "audited");
/// }
///
/// let mut router = Router::new();
/// router
///     .handler(Method::POST, create)
///     .header("content-type", "application/json")
///     .query("version", "2")
///     .middleware(audit);
/// ```
pub struct RouteBuilder<'r> {
    route: &'r mut Route,
}

impl<'r> RouteBuilder<'r> {
    pub(crate) fn new(route: &'r mut Route) -> Self {
        Self { route }
    }

    /// Requires header `key` to be present with exactly `value`.
    pub fn header(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.route.headers.push((key.into(), value.into()));
        self
    }

    /// Requires query parameter `key` to be present with exactly `value`.
    pub fn query(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.route.queries.push((key.into(), value.into()));
        self
    }

    /// Appends route-scoped middleware. It runs after the router's global
    /// middleware and before the handler.
    pub fn middleware(self, middleware: impl Handler) -> Self {
        self.route.middleware.push(middleware.into_boxed_handler());
        self
    }
}
