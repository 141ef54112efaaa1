//! Handler trait and type erasure.
//!
//! Handlers and middleware share one shape: a synchronous function that takes
//! the dispatch's [`ResponseWriter`] and the inbound [`Request`].
//!
//! ```text
//! fn hello(w: &mut ResponseWriter, req: &Request) { … }   ← user writes this
//!        ↓ router.handler(Method::GET, hello)
//! hello.into_boxed_handler()                               ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(hello))                               ← stored as BoxedHandler
//!        ↓
//! handler.call(&mut writer, &req) -> Result<(), Fault>     ← one vtable dispatch
//! ```
//!
//! The return type may be `()` or `Result<(), E>`. An `Err` is a [`Fault`]: it
//! takes the same path as a panic and ends at the recovery boundary.

use std::sync::Arc;

use crate::recovery::Fault;
use crate::request::Request;
use crate::response::ResponseWriter;

// ── Internal types ────────────────────────────────────────────────────────────

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Handler` trait's `into_boxed_handler` method.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, w: &mut ResponseWriter, req: &Request) -> Result<(), Fault>;
}

/// A type-erased handler, shared by every concurrent dispatch.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── Outcome conversion ────────────────────────────────────────────────────────

/// What a handler-shaped function may return.
///
/// Implemented for `()` and for `Result<(), E>` with any boxable error, so
/// handlers can use `?`:
///
/// ```rust
/// use sluice::{Request, ResponseWriter};
///
/// fn json(w: &mut ResponseWriter, _req: &Request) -> Result<(), serde_json::Error> {
///     w.set_header("content-type", "application/json");
///     serde_json::to_writer(w, &["a", "b"])?;
///     Ok(())
/// }
/// ```
pub trait IntoOutcome {
    fn into_outcome(self) -> Result<(), Fault>;
}

impl IntoOutcome for () {
    fn into_outcome(self) -> Result<(), Fault> {
        Ok(())
    }
}

impl<E> IntoOutcome for Result<(), E>
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    fn into_outcome(self) -> Result<(), Fault> {
        self.map_err(|e| Fault::Error(e.into()))
    }
}

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid handler or middleware.
///
/// You never implement this yourself. It is satisfied by any function or
/// closure with the signature:
///
/// ```text
/// Fn(&mut ResponseWriter, &Request) -> impl IntoOutcome
/// ```
///
/// A closure whose body only panics has return type `!`, which is not an
/// [`IntoOutcome`]. Give such closures an explicit `-> ()`:
///
/// ```text
/// router.handler(Method::GET, |_: &mut ResponseWriter, _: &Request| -> () {
///     panic!("not yet")
/// });
/// ```
///
/// Named `fn` items are unaffected since their signature already says `()`.
///
/// The trait is sealed: only the blanket impl below can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

// ── Blanket implementations ───────────────────────────────────────────────────

impl<F, R> private::Sealed for F
where
    F: Fn(&mut ResponseWriter, &Request) -> R + Send + Sync + 'static,
    R: IntoOutcome,
{
}

impl<F, R> Handler for F
where
    F: Fn(&mut ResponseWriter, &Request) -> R + Send + Sync + 'static,
    R: IntoOutcome,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

/// Bridges a concrete `F` to the [`ErasedHandler`] trait object.
struct FnHandler<F>(F);

impl<F, R> ErasedHandler for FnHandler<F>
where
    F: Fn(&mut ResponseWriter, &Request) -> R,
    R: IntoOutcome,
{
    fn call(&self, w: &mut ResponseWriter, req: &Request) -> Result<(), Fault> {
        (self.0)(w, req).into_outcome()
    }
}
