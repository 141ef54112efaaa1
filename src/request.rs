//! Inbound request type.

use std::collections::HashMap;

use bytes::Bytes;
use http::Method;

/// An inbound request, decoded from the platform event by a transport adapter.
///
/// The router borrows a `Request` immutably for the whole dispatch, so
/// handlers and middleware all observe the same value.
///
/// Header and query lookups are **case-sensitive**: `content-type` and
/// `Content-Type` are different keys. The adapters pass keys through exactly
/// as the platform delivers them.
#[derive(Clone, Debug)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) headers: HashMap<String, String>,
    pub(crate) query: HashMap<String, String>,
    pub(crate) body: Bytes,
}

impl Request {
    /// Starts building a request for `method`.
    ///
    /// ```rust
    /// use sluice::{Method, Request};
    ///
    /// let req = Request::builder(Method::GET)
    ///     .header("content-type", "application/json")
    ///     .query("key", "value")
    ///     .build();
    ///
    /// assert_eq!(req.header("content-type"), Some("application/json"));
    /// assert_eq!(req.query("key"), Some("value"));
    /// ```
    pub fn builder(method: Method) -> RequestBuilder {
        RequestBuilder {
            inner: Self {
                method,
                path: "/".to_owned(),
                headers: HashMap::new(),
                query: HashMap::new(),
                body: Bytes::new(),
            },
        }
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn headers(&self) -> &HashMap<String, String> { &self.headers }
    pub fn queries(&self) -> &HashMap<String, String> { &self.query }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Exact-key header lookup.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(String::as_str)
    }

    /// Exact-key query parameter lookup.
    pub fn query(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }
}

/// Fluent builder for [`Request`]. Obtain via [`Request::builder`].
///
/// Setting the same header or query key twice keeps the last value.
pub struct RequestBuilder {
    inner: Request,
}

impl RequestBuilder {
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.inner.path = path.into();
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.inner.headers.insert(key.into(), value.into());
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.inner.query.insert(key.into(), value.into());
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.inner.body = body.into();
        self
    }

    pub fn build(self) -> Request {
        self.inner
    }
}
