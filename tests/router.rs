//! End-to-end dispatch scenarios: routing, predicates, middleware
//! short-circuiting and panic recovery.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use sluice::{
    Error, Fault, LogEntry, LogSink, Method, Outcome, PanicInfo, RECOVERED_BODY, Request,
    ResponseWriter, Router, StatusCode,
};

// ── Fixtures ──────────────────────────────────────────────────────────────────

fn get_handler(w: &mut ResponseWriter, _req: &Request) -> Result<(), serde_json::Error> {
    w.set_header("Content-Type", "application/json");
    w.write_status(StatusCode::OK);
    serde_json::to_writer(&mut *w, "hello test")?;
    w.write(b"\n");
    Ok(())
}

fn panic_handler(_w: &mut ResponseWriter, _req: &Request) {
    panic!("uh oh");
}

fn error_middleware(w: &mut ResponseWriter, _req: &Request) {
    w.write_status(StatusCode::INTERNAL_SERVER_ERROR);
    w.write(b"\"error\"");
}

fn middleware(_w: &mut ResponseWriter, _req: &Request) {}

fn json_get() -> Request {
    Request::builder(Method::GET)
        .header("content-type", "application/json")
        .query("key", "value")
        .build()
}

/// Collects `(status, outcome)` for every dispatch.
#[derive(Default)]
struct Recorder(Mutex<Vec<(u16, Outcome)>>);

impl LogSink for Recorder {
    fn record(&self, entry: &LogEntry<'_>) {
        self.0.lock().push((entry.status.as_u16(), entry.outcome));
    }
}

// ── Middleware ────────────────────────────────────────────────────────────────

#[test]
fn passive_middleware_lets_handler_respond() {
    let mut router = Router::new();
    router
        .handler(Method::GET, get_handler)
        .header("content-type", "application/json")
        .middleware(middleware);
    router.middleware(middleware);

    let resp = router.dispatch(&json_get()).unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.body_str(), Some("\"hello test\"\n"));
    assert_eq!(resp.header("Content-Type"), Some("application/json"));
}

#[test]
fn committing_middleware_preempts_handler() {
    let mut router = Router::new();
    router
        .handler(Method::GET, get_handler)
        .header("content-type", "application/json")
        .middleware(error_middleware);
    router.middleware(error_middleware);

    let resp = router.dispatch(&json_get()).unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(resp.body_str(), Some("\"error\""));
}

#[test]
fn steps_run_global_then_route_then_handler() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let step = |name: &'static str| {
        let order = Arc::clone(&order);
        move |_: &mut ResponseWriter, _: &Request| order.lock().push(name)
    };

    let mut router = Router::new();
    router.middleware(step("global-1")).middleware(step("global-2"));
    router
        .handler(Method::POST, step("handler"))
        .middleware(step("route-1"))
        .middleware(step("route-2"));

    router.dispatch(&Request::builder(Method::POST).build()).unwrap();

    assert_eq!(*order.lock(), ["global-1", "global-2", "route-1", "route-2", "handler"]);
}

// ── Routing and predicates ────────────────────────────────────────────────────

#[test]
fn predicate_and_method_table() {
    struct Case {
        name: &'static str,
        request: Request,
        register: bool,
        status: StatusCode,
        error: Option<&'static str>,
    }

    let cases = [
        Case {
            name: "valid GET with required header and query",
            request: json_get(),
            register: true,
            status: StatusCode::OK,
            error: None,
        },
        Case {
            name: "wrong header value",
            request: Request::builder(Method::GET)
                .header("content-type", "application/xml")
                .query("key", "value")
                .build(),
            register: true,
            status: StatusCode::NOT_ACCEPTABLE,
            error: Some("not acceptable"),
        },
        Case {
            name: "no handlers registered",
            request: json_get(),
            register: false,
            status: StatusCode::METHOD_NOT_ALLOWED,
            error: Some("not allowed"),
        },
        Case {
            name: "no headers at all",
            request: Request::builder(Method::GET).query("key", "value").build(),
            register: true,
            status: StatusCode::NOT_ACCEPTABLE,
            error: Some("not acceptable"),
        },
        Case {
            name: "DELETE with only GET registered",
            request: Request::builder(Method::DELETE)
                .header("content-type", "application/json")
                .query("key", "value")
                .build(),
            register: true,
            status: StatusCode::METHOD_NOT_ALLOWED,
            error: Some("not allowed"),
        },
        Case {
            name: "missing required query parameter",
            request: Request::builder(Method::GET)
                .header("content-type", "application/json")
                .build(),
            register: true,
            status: StatusCode::NOT_ACCEPTABLE,
            error: Some("not acceptable"),
        },
    ];

    for case in cases {
        let mut router = Router::new();
        if case.register {
            router
                .handler(Method::GET, get_handler)
                .header("content-type", "application/json")
                .query("key", "value");
        }

        let (status, error) = match router.dispatch(&case.request) {
            Ok(resp) => (resp.status(), None),
            Err(e) => (e.status(), Some(e.to_string())),
        };

        assert_eq!(status, case.status, "{}", case.name);
        assert_eq!(error.as_deref(), case.error, "{}", case.name);
        assert_eq!(router.serve(&case.request).status(), case.status, "{}", case.name);
    }
}

#[test]
fn unregistered_method_is_rejected_regardless_of_content() {
    let mut router = Router::new();
    router.handler(Method::GET, get_handler);

    for method in [Method::POST, Method::PUT, Method::PATCH, Method::HEAD] {
        let req = Request::builder(method)
            .header("content-type", "application/json")
            .query("key", "value")
            .body("{}")
            .build();
        assert!(matches!(router.dispatch(&req), Err(Error::NotAllowed)));
    }
}

// ── Recovery ──────────────────────────────────────────────────────────────────

#[test]
fn panicking_handler_is_recovered_and_reported_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);

    let mut router = Router::new();
    router.recovery(move |info: &PanicInfo<'_>| {
        assert_eq!(info.request.method(), Method::GET);
        assert_eq!(info.fault.message(), Some("uh oh"));
        seen.fetch_add(1, Ordering::SeqCst);
    });
    router
        .handler(Method::GET, panic_handler)
        .header("content-type", "application/json");

    let resp = router.dispatch(&json_get()).unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(resp.body_str(), Some(RECOVERED_BODY));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn panicking_middleware_is_recovered_without_hook() {
    let handled = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&handled);

    let mut router = Router::new();
    router.middleware(panic_handler);
    router.handler(Method::GET, move |w: &mut ResponseWriter, _: &Request| {
        seen.fetch_add(1, Ordering::SeqCst);
        w.write(b"unreachable");
    });

    let resp = router.dispatch(&json_get()).unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(resp.body(), RECOVERED_BODY.as_bytes());
    assert_eq!(handled.load(Ordering::SeqCst), 0);
}

#[test]
fn panicking_middleware_reports_to_hook_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);

    let mut router = Router::new();
    router.recovery(move |info: &PanicInfo<'_>| {
        assert!(matches!(info.fault, Fault::Panic(_)));
        seen.fetch_add(1, Ordering::SeqCst);
    });
    router.handler(Method::GET, get_handler).middleware(panic_handler);

    let resp = router.dispatch(&json_get()).unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(resp.body_str(), Some(RECOVERED_BODY));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
#[allow(clippy::unused_unit)]
fn hook_can_downcast_typed_panic_values() {
    #[derive(Debug)]
    struct Code(u16);

    let codes = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&codes);

    let mut router = Router::new();
    router.recovery(move |info: &PanicInfo<'_>| {
        if let Some(Code(code)) = info.fault.payload().and_then(|p| p.downcast_ref::<Code>()) {
            seen.lock().push(*code);
        }
    });
    // Closures that only panic need an explicit `-> ()`.
    router.handler(Method::GET, |_: &mut ResponseWriter, _: &Request| -> () {
        std::panic::panic_any(Code(418))
    });

    let resp = router.dispatch(&json_get()).unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(*codes.lock(), [418]);
}

#[test]
fn returned_errors_take_the_recovery_path() {
    let faults = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&faults);

    let mut router = Router::new();
    router.recovery(move |info: &PanicInfo<'_>| seen.lock().push(info.fault.to_string()));
    router.handler(Method::PUT, |w: &mut ResponseWriter, _: &Request| {
        w.write(b"half written");
        Err::<(), _>(std::io::Error::other("disk full"))
    });

    let resp = router.dispatch(&Request::builder(Method::PUT).build()).unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(resp.body_str(), Some(RECOVERED_BODY));
    assert_eq!(*faults.lock(), ["disk full"]);
}

// ── Logging ───────────────────────────────────────────────────────────────────

#[test]
fn every_dispatch_is_logged_once_with_its_outcome() {
    let recorder = Arc::new(Recorder::default());

    let mut router = Router::new();
    router.logging(Arc::clone(&recorder));
    router.handler(Method::GET, get_handler).header("content-type", "application/json");
    router.handler(Method::POST, panic_handler);

    router.dispatch(&json_get()).unwrap();
    let _ = router.dispatch(&Request::builder(Method::GET).build());
    let _ = router.dispatch(&Request::builder(Method::DELETE).build());
    router.dispatch(&Request::builder(Method::POST).build()).unwrap();

    assert_eq!(
        *recorder.0.lock(),
        [
            (200, Outcome::Handled),
            (406, Outcome::NotAcceptable),
            (405, Outcome::NotAllowed),
            (500, Outcome::Recovered),
        ]
    );
}

#[test]
fn router_is_shareable_across_threads() {
    let mut router = Router::new();
    router.handler(Method::GET, get_handler);
    let router = Arc::new(router);

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let router = Arc::clone(&router);
            std::thread::spawn(move || router.serve(&json_get()).status())
        })
        .collect();

    for worker in workers {
        assert_eq!(worker.join().unwrap(), StatusCode::OK);
    }
}
