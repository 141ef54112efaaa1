//! Local HTTP server adapter.
//!
//! Runs a [`Router`] behind a real socket so a function can be exercised with
//! `curl` before it is deployed. Each HTTP request is collected, converted
//! into a [`Request`], dispatched on tokio's blocking pool (handlers are
//! synchronous and may block), and the [`Response`] is written back.
//!
//! # Graceful shutdown
//!
//! [`Server::serve`] stops accepting on SIGTERM or Ctrl-C, lets every
//! in-flight connection finish, then returns.

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderName, HeaderValue, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::error::Error;
use crate::request::Request;
use crate::response::{IntoResponse, Response};
use crate::router::Router;

/// The local HTTP server.
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    /// Configures the server to bind to `addr` when serving starts.
    ///
    /// ```rust
    /// use sluice::Server;
    /// let server = Server::bind("127.0.0.1:3000").unwrap();
    /// ```
    pub fn bind(addr: &str) -> Result<Self, Error> {
        Ok(Self { addr: addr.parse()? })
    }

    /// Serves until SIGTERM or Ctrl-C, then drains in-flight connections.
    pub async fn serve(self, router: Router) -> Result<(), Error> {
        self.serve_with_shutdown(router, shutdown_signal()).await
    }

    /// Serves until `signal` resolves, then drains in-flight connections.
    pub async fn serve_with_shutdown<S>(self, router: Router, signal: S) -> Result<(), Error>
    where
        S: Future<Output = ()>,
    {
        let listener = TcpListener::bind(self.addr).await?;
        let router = Arc::new(router);

        info!(addr = %self.addr, "sluice listening");

        let mut tasks = tokio::task::JoinSet::new();
        tokio::pin!(signal);

        loop {
            tokio::select! {
                // Check shutdown first so a signal stops accepting immediately.
                biased;

                () = &mut signal => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let router = Arc::clone(&router);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        let svc = service_fn(move |req| {
                            let router = Arc::clone(&router);
                            async move { handle(router, req).await }
                        });

                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connection tasks.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("sluice stopped");
        Ok(())
    }
}

// ── Request handling ──────────────────────────────────────────────────────────

/// Routes one hyper request. Every failure becomes a response, so hyper never
/// sees an error.
async fn handle(
    router: Arc<Router>,
    req: hyper::Request<hyper::body::Incoming>,
) -> Result<http::Response<Full<Bytes>>, std::convert::Infallible> {
    let (parts, body) = req.into_parts();

    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!("failed to read request body: {e}");
            return Ok(into_http(StatusCode::BAD_REQUEST.into_response()));
        }
    };

    let request = from_parts(&parts, body);
    let response = match tokio::task::spawn_blocking(move || router.serve(&request)).await {
        Ok(resp) => resp,
        Err(e) => {
            error!("dispatch task failed: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    };

    Ok(into_http(response))
}

/// Builds a [`Request`] from the HTTP head and collected body.
///
/// Header values that are not visible ASCII are dropped. Repeated header or
/// query keys keep the last value.
fn from_parts(parts: &http::request::Parts, body: Bytes) -> Request {
    let headers: HashMap<String, String> = parts
        .headers
        .iter()
        .filter_map(|(k, v)| Some((k.as_str().to_owned(), v.to_str().ok()?.to_owned())))
        .collect();

    let query: HashMap<String, String> = parts
        .uri
        .query()
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default();

    Request {
        method: parts.method.clone(),
        path: parts.uri.path().to_owned(),
        headers,
        query,
        body,
    }
}

/// Converts a [`Response`] into a hyper response. Headers that are not valid
/// HTTP are skipped with a warning.
fn into_http(resp: Response) -> http::Response<Full<Bytes>> {
    let (status, headers, body) = resp.into_parts();

    let mut out = http::Response::new(Full::new(body));
    *out.status_mut() = status;
    for (k, v) in headers {
        match (HeaderName::try_from(k.as_str()), HeaderValue::try_from(v.as_str())) {
            (Ok(name), Ok(value)) => {
                out.headers_mut().insert(name, value);
            }
            _ => warn!(header = %k, "dropping invalid response header"),
        }
    }
    out
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first SIGTERM or SIGINT the process receives.
///
/// If a handler cannot be installed, that signal is never waited on.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
