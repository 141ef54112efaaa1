//! Unified error type.

use http::StatusCode;
use thiserror::Error;

use crate::response::{IntoResponse, Response};

/// The error type returned by sluice's fallible operations.
///
/// The first two variants are dispatch rejections: the router refused the
/// request before any user code ran. They are ordinary values, not failures
/// of the process, and each maps to a status-only [`Response`] via
/// [`IntoResponse`].
///
/// Faults raised *inside* handlers or middleware never show up here. They are
/// absorbed by the recovery boundary and become a `500` response instead.
#[derive(Debug, Error)]
pub enum Error {
    /// No route is registered for the request's method.
    #[error("not allowed")]
    NotAllowed,

    /// A route exists but a required header or query parameter is missing or
    /// has a different value.
    #[error("not acceptable")]
    NotAcceptable,

    /// The inbound event carried a method string that is not a valid token.
    #[error("invalid method: {0:?}")]
    InvalidMethod(String),

    /// The inbound event claimed a base64 body that does not decode.
    #[error("invalid body encoding: {0}")]
    InvalidBody(#[from] base64::DecodeError),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid socket address: {0}")]
    InvalidAddr(#[from] std::net::AddrParseError),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The HTTP status a client sees for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::NotAcceptable => StatusCode::NOT_ACCEPTABLE,
            Self::InvalidMethod(_) | Self::InvalidBody(_) | Self::Json(_) => StatusCode::BAD_REQUEST,
            Self::InvalidAddr(_) | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// A rejected request becomes a response with the matching status and no body.
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        Response::with_status(self.status())
    }
}
