//! API Gateway proxy integration.
//!
//! Serverless platforms deliver an HTTP call as a JSON event and expect a JSON
//! response envelope back. This module is the thin adapter between that shape
//! and the router's [`Request`]/[`Response`]:
//!
//! ```text
//! {"httpMethod":"GET","headers":{…},…}   ← platform event
//!        ↓ ProxyRequest (serde)
//! Request::try_from(event)               ← method + base64 body validated
//!        ↓ Router::dispatch
//! ProxyResponse::from(response)          ← non-UTF-8 bodies base64-encoded
//!        ↓
//! {"statusCode":200,"body":"…",…}        ← platform response
//! ```

use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use http::Method;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Error;
use crate::request::Request;
use crate::response::{IntoResponse, Response};
use crate::router::Router;

/// Inbound proxy event.
///
/// `headers` and `queryStringParameters` arrive as `null` when empty; both
/// decode to an empty map.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyRequest {
    pub http_method: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
    #[serde(default)]
    pub query_string_parameters: Option<HashMap<String, String>>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub is_base64_encoded: bool,
}

/// Outbound proxy response envelope.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProxyResponse {
    pub status_code: u16,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub is_base64_encoded: bool,
}

impl TryFrom<ProxyRequest> for Request {
    type Error = Error;

    fn try_from(event: ProxyRequest) -> Result<Self, Self::Error> {
        let method = Method::from_bytes(event.http_method.as_bytes())
            .map_err(|_| Error::InvalidMethod(event.http_method.clone()))?;

        let body = match event.body {
            None => Bytes::new(),
            Some(b) if event.is_base64_encoded => Bytes::from(STANDARD.decode(b)?),
            Some(b) => Bytes::from(b),
        };

        Ok(Self {
            method,
            path: event.path.unwrap_or_else(|| "/".to_owned()),
            headers: event.headers.unwrap_or_default(),
            query: event.query_string_parameters.unwrap_or_default(),
            body,
        })
    }
}

impl From<Response> for ProxyResponse {
    fn from(resp: Response) -> Self {
        let (status, headers, body) = resp.into_parts();
        let (body, is_base64_encoded) = match String::from_utf8(body.to_vec()) {
            Ok(text) => (text, false),
            Err(_) => (STANDARD.encode(&body), true),
        };
        Self { status_code: status.as_u16(), headers, body, is_base64_encoded }
    }
}

impl Router {
    /// Handles one proxy event end to end. Never fails: an undecodable event
    /// becomes `400`, a rejection its `405`/`406`.
    pub fn handle_event(&self, event: ProxyRequest) -> ProxyResponse {
        let response = match Request::try_from(event) {
            Ok(req) => self.serve(&req),
            Err(e) => {
                warn!("undecodable proxy event: {e}");
                e.into_response()
            }
        };
        ProxyResponse::from(response)
    }
}

/// Handles a raw JSON event payload and returns the JSON response envelope.
///
/// Fails only when `payload` is not a proxy event at all.
///
/// ```rust
/// use sluice::{Method, Request, ResponseWriter, Router, proxy};
///
/// let mut router = Router::new();
/// router.handler(Method::GET, |w: &mut ResponseWriter, _: &Request| {
///     w.write(b"pong");
/// });
///
/// let out = proxy::handle_json(&router, r#"{"httpMethod":"GET","headers":null}"#).unwrap();
/// assert!(out.contains(r#""body":"pong""#));
/// ```
pub fn handle_json(router: &Router, payload: &str) -> Result<String, Error> {
    let event: ProxyRequest = serde_json::from_str(payload)?;
    Ok(serde_json::to_string(&router.handle_event(event))?)
}

#[cfg(test)]
mod tests {
    use http::StatusCode;

    use super::*;

    #[test]
    fn null_maps_decode_to_empty() {
        let event: ProxyRequest = serde_json::from_str(
            r#"{"httpMethod":"DELETE","headers":null,"queryStringParameters":null,"body":null}"#,
        )
        .unwrap();

        let req = Request::try_from(event).unwrap();
        assert_eq!(req.method(), Method::DELETE);
        assert!(req.headers().is_empty());
        assert!(req.queries().is_empty());
        assert!(req.body().is_empty());
        assert_eq!(req.path(), "/");
    }

    #[test]
    fn base64_bodies_are_decoded() {
        let event = ProxyRequest {
            http_method: "POST".into(),
            body: Some(STANDARD.encode([0xde, 0xad, 0xbe, 0xef])),
            is_base64_encoded: true,
            ..Default::default()
        };

        let req = Request::try_from(event).unwrap();
        assert_eq!(req.body(), [0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn malformed_events_are_rejected() {
        let bad_method = ProxyRequest { http_method: "GE T".into(), ..Default::default() };
        assert!(matches!(Request::try_from(bad_method), Err(Error::InvalidMethod(m)) if m == "GE T"));

        let bad_body = ProxyRequest {
            http_method: "POST".into(),
            body: Some("%%%".into()),
            is_base64_encoded: true,
            ..Default::default()
        };
        assert!(matches!(Request::try_from(bad_body), Err(Error::InvalidBody(_))));
    }

    #[test]
    fn binary_responses_are_base64_encoded() {
        let mut resp = Response::with_status(StatusCode::OK);
        resp.body = Bytes::from_static(&[0xff, 0x00]);

        let out = ProxyResponse::from(resp);
        assert!(out.is_base64_encoded);
        assert_eq!(out.body, STANDARD.encode([0xff, 0x00]));
    }

    #[test]
    fn text_responses_pass_through() {
        let out = ProxyResponse::from(Response::text(StatusCode::ACCEPTED, "queued"));
        assert_eq!(out.status_code, 202);
        assert_eq!(out.body, "queued");
        assert!(!out.is_base64_encoded);
        assert_eq!(out.headers["content-type"], "text/plain; charset=utf-8");
    }
}
