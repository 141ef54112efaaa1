//! # sluice
//!
//! A request router and middleware engine for serverless HTTP functions.
//!
//! One function invocation carries one request. sluice picks the handler
//! registered for the request's method, checks the route's header and query
//! requirements, runs global middleware, route middleware and the handler
//! against one shared [`ResponseWriter`], and hands back a [`Response`].
//! A handler that panics never takes the invocation down with it.
//!
//! What sluice deliberately does not do:
//!
//! - **Path routing** — one handler per method; the platform maps paths to
//!   functions already
//! - **Content negotiation** — predicates are exact string matches
//! - **Async handlers** — handlers are plain synchronous functions
//!
//! ## Quick start
//!
//! ```rust
//! use sluice::{Method, Request, ResponseWriter, Router, StatusCode};
//!
//! let mut router = Router::new();
//! router
//!     .handler(Method::GET, get_user)
//!     .header("content-type", "application/json");
//! router.middleware(request_id);
//! router.recovery(|info| eprintln!("fault on {}: {}", info.request.method(), info.fault));
//!
//! let req = Request::builder(Method::GET)
//!     .header("content-type", "application/json")
//!     .build();
//! let resp = router.dispatch(&req).unwrap();
//! assert_eq!(resp.status(), StatusCode::OK);
//! assert_eq!(resp.body(), b"{\"id\":42}\n");
//!
//! fn get_user(w: &mut ResponseWriter, _req: &Request) -> Result<(), serde_json::Error> {
//!     w.set_header("content-type", "application/json");
//!     w.write_status(StatusCode::OK);
//!     serde_json::to_writer(&mut *w, &serde_json::json!({ "id": 42 }))?;
//!     w.write(b"\n");
//!     Ok(())
//! }
//!
//! // Global middleware: runs first, stops the chain only if it writes.
//! fn request_id(_w: &mut ResponseWriter, req: &Request) {
//!     tracing::debug!(id = req.header("x-request-id"), "request");
//! }
//! ```
//!
//! ## Failure model
//!
//! | Situation | `dispatch` returns | Status |
//! |---|---|---|
//! | no route for the method | `Err(Error::NotAllowed)` | 405 |
//! | header/query requirement unmet | `Err(Error::NotAcceptable)` | 406 |
//! | handler or middleware panics or returns `Err` | `Ok`, body [`RECOVERED_BODY`] | 500 |

mod error;
mod handler;
mod log;
mod recovery;
mod request;
mod response;
mod route;
mod router;
mod server;

pub mod middleware;
pub mod proxy;

pub use error::Error;
pub use handler::{Handler, IntoOutcome};
pub use http::{Method, StatusCode};
pub use log::{Format, LogEntry, LogSink, Outcome, TracingSink, WriterSink};
pub use recovery::{Fault, PanicInfo, RECOVERED_BODY};
pub use request::{Request, RequestBuilder};
pub use response::{IntoResponse, Response, ResponseWriter};
pub use route::RouteBuilder;
pub use router::Router;
pub use server::Server;
