//! The response side of a dispatch: the [`ResponseWriter`] handlers write
//! into, the finished [`Response`] the router hands back, and the
//! [`IntoResponse`] conversion trait.

use std::collections::HashMap;
use std::io;

use bytes::{Bytes, BytesMut};
use http::StatusCode;
use tracing::debug;

// ── ResponseWriter ────────────────────────────────────────────────────────────

/// In-memory accumulator shared by every step of one dispatch.
///
/// The first call to [`write_status`](Self::write_status) or
/// [`write`](Self::write) *commits* the writer. Committing fixes the status
/// code and the header set; the router stops the middleware chain as soon as
/// a step leaves the writer committed.
///
/// ```rust
/// use sluice::{ResponseWriter, StatusCode};
/// # fn demo(w: &mut ResponseWriter) {
/// w.set_header("content-type", "text/plain");
/// w.write_status(StatusCode::CREATED);
/// w.write(b"made it");
/// assert!(w.is_committed());
/// # }
/// ```
///
/// It also implements [`io::Write`], so serializers can stream straight in:
/// `serde_json::to_writer(&mut *w, &value)`.
#[derive(Debug, Default)]
pub struct ResponseWriter {
    status: Option<StatusCode>,
    headers: HashMap<String, String>,
    body: BytesMut,
}

impl ResponseWriter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Sets a response header, replacing any previous value for `key`.
    ///
    /// Ignored once the writer is committed.
    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        if self.is_committed() {
            debug!(header = %key, "header set after commit ignored");
            return;
        }
        self.headers.insert(key, value.into());
    }

    /// Commits the writer with `status`. Only the first call has any effect.
    pub fn write_status(&mut self, status: StatusCode) {
        match self.status {
            None => self.status = Some(status),
            Some(current) => {
                debug!(current = current.as_u16(), ignored = status.as_u16(), "superfluous write_status");
            }
        }
    }

    /// Appends `buf` to the body and returns the number of bytes written.
    ///
    /// Commits with `200 OK` if no status was written yet.
    pub fn write(&mut self, buf: &[u8]) -> usize {
        if self.status.is_none() {
            self.status = Some(StatusCode::OK);
        }
        self.body.extend_from_slice(buf);
        buf.len()
    }

    pub fn is_committed(&self) -> bool {
        self.status.is_some()
    }

    /// The committed status, if any.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Freezes the accumulated state. An uncommitted writer yields `200 OK`
    /// with whatever headers were staged and an empty body.
    pub(crate) fn into_response(self) -> Response {
        Response {
            status: self.status.unwrap_or(StatusCode::OK),
            headers: self.headers,
            body: self.body.freeze(),
        }
    }
}

impl io::Write for ResponseWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(ResponseWriter::write(self, buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ── Response ──────────────────────────────────────────────────────────────────

/// A finished response: status, headers, body.
///
/// Produced fresh for every dispatch and handed to the transport adapter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    pub(crate) status: StatusCode,
    pub(crate) headers: HashMap<String, String>,
    pub(crate) body: Bytes,
}

impl Response {
    /// Response with no headers and no body.
    pub fn with_status(status: StatusCode) -> Self {
        Self { status, headers: HashMap::new(), body: Bytes::new() }
    }

    /// `text/plain; charset=utf-8` response.
    pub fn text(status: StatusCode, body: impl Into<String>) -> Self {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_owned(), "text/plain; charset=utf-8".to_owned());
        Self { status, headers, body: Bytes::from(body.into()) }
    }

    pub fn status(&self) -> StatusCode { self.status }
    pub fn headers(&self) -> &HashMap<String, String> { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(String::as_str)
    }

    /// The body as UTF-8, or `None` for binary payloads.
    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    pub fn into_parts(self) -> (StatusCode, HashMap<String, String>, Bytes) {
        (self.status, self.headers, self.body)
    }
}

// ── IntoResponse ──────────────────────────────────────────────────────────────

/// Conversion into a [`Response`].
///
/// Transport adapters use this to turn a dispatch rejection
/// ([`Error`](crate::Error)) into the response the client should see.
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response { self }
}

impl IntoResponse for StatusCode {
    fn into_response(self) -> Response { Response::with_status(self) }
}
