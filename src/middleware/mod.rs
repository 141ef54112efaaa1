//! Middleware chain execution.
//!
//! Middleware is handler-shaped: it receives the same [`ResponseWriter`] and
//! [`Request`] as the handler and may write to the writer. A chain runs the
//! router's global middleware, then the matched route's middleware, then the
//! route handler, strictly in that order and one at a time.
//!
//! Writing a status or any body bytes *commits* the writer. The chain stops
//! after the first step that leaves the writer committed, so a middleware
//! that answers the request on its own (an auth check returning `401`, say)
//! keeps every later step, handler included, from running:
//!
//! ```rust
//! use sluice::{Method, Request, ResponseWriter, Router, StatusCode};
//!
//! fn require_token(w: &mut ResponseWriter, req: &Request) {
//!     if req.header("authorization").is_none() {
//!         w.write_status(StatusCode::UNAUTHORIZED);
//!     }
//! }
//!
//! fn secret(w: &mut ResponseWriter, _req: &Request) {
//!     w.write(b"secret");
//! }
//!
//! let mut router = Router::new();
//! router.middleware(require_token);
//! router.handler(Method::GET, secret);
//!
//! let resp = router.serve(&Request::builder(Method::GET).build());
//! assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
//! assert!(resp.body().is_empty());
//! ```

use std::iter;

use tracing::debug;

use crate::handler::BoxedHandler;
use crate::recovery::Fault;
use crate::request::Request;
use crate::response::ResponseWriter;

/// One dispatch's worth of steps, borrowed from the router and the route.
pub(crate) struct Chain<'a> {
    pub(crate) global: &'a [BoxedHandler],
    pub(crate) route: &'a [BoxedHandler],
    pub(crate) handler: &'a BoxedHandler,
}

impl Chain<'_> {
    fn len(&self) -> usize {
        self.global.len() + self.route.len() + 1
    }

    /// Runs every step in order until one commits the writer.
    ///
    /// A fault returned by a step ends the chain immediately and is handed
    /// back to the recovery boundary.
    pub(crate) fn run(&self, w: &mut ResponseWriter, req: &Request) -> Result<(), Fault> {
        let total = self.len();
        let steps = self.global.iter().chain(self.route).chain(iter::once(self.handler));

        for (index, step) in steps.enumerate() {
            step.call(w, req)?;

            if w.is_committed() {
                let skipped = total - index - 1;
                if skipped > 0 {
                    debug!(step = index, skipped, "middleware committed response, chain short-circuited");
                }
                break;
            }
        }
        Ok(())
    }
}
