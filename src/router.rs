//! Method-dispatch router.
//!
//! One route per HTTP method, no path matching. A request is resolved by its
//! method, checked against the route's header and query predicates, and then
//! run through global middleware, route middleware and the handler inside the
//! recovery boundary.

use std::collections::HashMap;
use std::time::Instant;

use http::Method;

use crate::error::Error;
use crate::handler::{BoxedHandler, Handler};
use crate::log::{LogEntry, LogSink, Outcome, TracingSink};
use crate::recovery::{Guarded, PanicInfo, Supervisor};
use crate::request::Request;
use crate::response::{IntoResponse, Response};
use crate::route::{Route, RouteBuilder};

/// The application router.
///
/// Configure it once at startup through `&mut self`, then share it (behind an
/// `Arc` if needed) and dispatch through `&self`. Setup and dispatch can never
/// overlap: the borrow checker rules it out.
pub struct Router {
    routes: HashMap<Method, Route>,
    middleware: Vec<BoxedHandler>,
    supervisor: Supervisor,
    sink: Box<dyn LogSink>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            middleware: Vec::new(),
            supervisor: Supervisor::default(),
            sink: Box::new(TracingSink),
        }
    }

    /// Registers `handler` for `method`, replacing any earlier route for the
    /// same method along with its predicates and middleware.
    ///
    /// ```rust
    /// use sluice::{Method, Request, ResponseWriter, Router, StatusCode};
    ///
    /// fn hello(w: &mut ResponseWriter, _req: &Request) {
    ///     w.write_status(StatusCode::OK);
    ///     w.write(b"hello");
    /// }
    ///
    /// let mut router = Router::new();
    /// router.handler(Method::GET, hello).header("content-type", "text/plain");
    ///
    /// let req = Request::builder(Method::GET).header("content-type", "text/plain").build();
    /// let resp = router.dispatch(&req).unwrap();
    /// assert_eq!(resp.body(), b"hello");
    /// ```
    pub fn handler(&mut self, method: Method, handler: impl Handler) -> RouteBuilder<'_> {
        let route = Route::new(handler.into_boxed_handler());
        RouteBuilder::new(self.routes.entry(method).insert_entry(route).into_mut())
    }

    /// Appends global middleware. It runs for every request that resolves to a
    /// route, before that route's own middleware.
    pub fn middleware(&mut self, middleware: impl Handler) -> &mut Self {
        self.middleware.push(middleware.into_boxed_handler());
        self
    }

    /// Sets the hook notified once per recovered fault. Replaces any earlier
    /// hook. Without one, faults are still recovered and logged.
    pub fn recovery<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&PanicInfo<'_>) + Send + Sync + 'static,
    {
        self.supervisor.set_hook(hook);
        self
    }

    /// Replaces the logging sink. Defaults to [`TracingSink`].
    pub fn logging(&mut self, sink: impl LogSink + 'static) -> &mut Self {
        self.sink = Box::new(sink);
        self
    }

    /// Dispatches one request.
    ///
    /// Returns [`Error::NotAllowed`] when no route exists for the method and
    /// [`Error::NotAcceptable`] when a header or query predicate fails; no user
    /// code runs in either case, and the error converts into the matching
    /// `405`/`406` response via [`IntoResponse`].
    ///
    /// Faults inside middleware or the handler are never returned here. They
    /// produce `Ok` with a `500` response whose body is
    /// [`RECOVERED_BODY`](crate::RECOVERED_BODY).
    pub fn dispatch(&self, req: &Request) -> Result<Response, Error> {
        let started = Instant::now();

        let (result, outcome, fault) = match self.resolve(req) {
            Err(rejection) => (Err(Error::from(rejection)), rejection.outcome(), None),
            Ok(route) => {
                let chain = route.chain(&self.middleware);
                match self.supervisor.run_guarded(req, |w| chain.run(w, req)) {
                    Guarded::Completed(resp) => (Ok(resp), Outcome::Handled, None),
                    Guarded::Recovered { response, fault } => {
                        (Ok(response), Outcome::Recovered, Some(fault.to_string()))
                    }
                }
            }
        };

        let status = match &result {
            Ok(resp) => resp.status(),
            Err(e) => e.status(),
        };
        let error = match &result {
            Err(e) => Some(e.to_string()),
            Ok(_) => fault,
        };

        self.sink.record(&LogEntry {
            method: req.method(),
            path: req.path(),
            status,
            outcome,
            elapsed: started.elapsed(),
            error: error.as_deref(),
        });

        result
    }

    /// Like [`dispatch`](Self::dispatch), with rejections turned into their
    /// status-only responses.
    pub fn serve(&self, req: &Request) -> Response {
        self.dispatch(req).unwrap_or_else(IntoResponse::into_response)
    }

    fn resolve(&self, req: &Request) -> Result<&Route, Rejection> {
        let route = self.routes.get(req.method()).ok_or(Rejection::NotAllowed)?;
        if !route.accepts(req) {
            return Err(Rejection::NotAcceptable);
        }
        Ok(route)
    }

    /// Methods with a registered route.
    pub fn methods(&self) -> impl Iterator<Item = &Method> {
        self.routes.keys()
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

/// Why a request never reached user code.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Rejection {
    NotAllowed,
    NotAcceptable,
}

impl Rejection {
    fn outcome(self) -> Outcome {
        match self {
            Self::NotAllowed => Outcome::NotAllowed,
            Self::NotAcceptable => Outcome::NotAcceptable,
        }
    }
}

impl From<Rejection> for Error {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::NotAllowed => Error::NotAllowed,
            Rejection::NotAcceptable => Error::NotAcceptable,
        }
    }
}
