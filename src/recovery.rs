//! Failure boundary around handler and middleware execution.
//!
//! Everything user code can throw at the router ends here: a panic caught by
//! [`catch_unwind`](std::panic::catch_unwind), or an `Err` returned from a
//! handler-shaped function. Either way the caller receives a well-formed
//! `500` response, and the raw fault goes to the recovery hook.
//!
//! Catching panics requires the default `panic = "unwind"` strategy. With
//! `panic = "abort"` a panicking handler still takes the process down.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use http::StatusCode;
use thiserror::Error;
use tracing::error;

use crate::request::Request;
use crate::response::{Response, ResponseWriter};

/// Body of every response produced by the recovery boundary.
pub const RECOVERED_BODY: &str = "failed to obtain response";

/// A run-time failure inside a handler or middleware.
#[derive(Debug, Error)]
pub enum Fault {
    /// The step panicked. Holds the raw panic payload, so a hook can
    /// `downcast_ref` values raised with [`std::panic::panic_any`].
    #[error("panicked: {}", Fault::describe(.0))]
    Panic(Box<dyn Any + Send>),

    /// The step returned an error.
    #[error("{0}")]
    Error(Box<dyn std::error::Error + Send + Sync>),
}

impl Fault {
    /// The panic message, when the payload was a string.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Panic(payload) => panic_message(&**payload),
            Self::Error(_) => None,
        }
    }

    #[allow(clippy::borrowed_box)]
    fn describe(payload: &Box<dyn Any + Send>) -> &str {
        panic_message(&**payload).unwrap_or("non-string panic payload")
    }

    /// The raw panic payload.
    pub fn payload(&self) -> Option<&(dyn Any + Send)> {
        match self {
            Self::Panic(payload) => Some(&**payload),
            Self::Error(_) => None,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> Option<&str> {
    payload
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| payload.downcast_ref::<&'static str>().copied())
}

/// What the recovery hook is told about a fault.
#[derive(Debug)]
pub struct PanicInfo<'a> {
    pub fault: &'a Fault,
    pub request: &'a Request,
}

/// Observer invoked once per recovered fault.
type RecoveryHook = Arc<dyn Fn(&PanicInfo<'_>) + Send + Sync + 'static>;

/// Result of one guarded chain execution.
pub(crate) enum Guarded {
    Completed(Response),
    Recovered { response: Response, fault: Fault },
}

/// Runs chains inside the failure boundary.
#[derive(Default)]
pub(crate) struct Supervisor {
    hook: Option<RecoveryHook>,
}

impl Supervisor {
    pub(crate) fn set_hook<F>(&mut self, hook: F)
    where
        F: Fn(&PanicInfo<'_>) + Send + Sync + 'static,
    {
        self.hook = Some(Arc::new(hook));
    }

    /// Runs `chain` against a fresh writer.
    ///
    /// On a fault, whatever the chain wrote is discarded.
    pub(crate) fn run_guarded<F>(&self, request: &Request, chain: F) -> Guarded
    where
        F: FnOnce(&mut ResponseWriter) -> Result<(), Fault>,
    {
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut writer = ResponseWriter::new();
            chain(&mut writer).map(|()| writer.into_response())
        }));

        let fault = match result {
            Ok(Ok(response)) => return Guarded::Completed(response),
            Ok(Err(fault)) => fault,
            Err(payload) => Fault::Panic(payload),
        };

        error!(method = %request.method(), path = request.path(), %fault, "recovered from fault");
        self.notify(&fault, request);

        Guarded::Recovered {
            response: Response::text(StatusCode::INTERNAL_SERVER_ERROR, RECOVERED_BODY),
            fault,
        }
    }

    fn notify(&self, fault: &Fault, request: &Request) {
        let Some(hook) = &self.hook else { return };
        let info = PanicInfo { fault, request };

        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| hook(&info))) {
            let nested = Fault::Panic(payload);
            error!(fault = %nested, "recovery hook panicked");
        }
    }
}
