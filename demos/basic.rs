//! Minimal sluice example: a JSON function served locally.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl -H 'content-type: application/json' 'http://localhost:3000/?user=42'
//!   curl -X DELETE http://localhost:3000/                      # 405
//!   curl http://localhost:3000/?user=42                        # 406, header missing
//!   curl -H 'content-type: application/json' \
//!        -H 'x-debug: panic' 'http://localhost:3000/?user=42'   # 500, recovered

use sluice::{Method, PanicInfo, Request, ResponseWriter, Router, Server, StatusCode};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let mut router = Router::new();
    router
        .middleware(debug_panic)
        .recovery(|info: &PanicInfo<'_>| {
            eprintln!("recovered {} {}: {}", info.request.method(), info.request.path(), info.fault);
        });
    router
        .handler(Method::GET, get_user)
        .header("content-type", "application/json")
        .middleware(require_user);

    let server = Server::bind("0.0.0.0:3000").expect("valid address");
    server.serve(router).await.expect("server error");
}

// GET → 200 {"id":"42","name":"alice"}
fn get_user(w: &mut ResponseWriter, req: &Request) -> Result<(), serde_json::Error> {
    let id = req.query("user").unwrap_or("unknown");
    w.set_header("content-type", "application/json");
    w.write_status(StatusCode::OK);
    serde_json::to_writer(&mut *w, &serde_json::json!({ "id": id, "name": "alice" }))
}

// Route middleware: answers 400 itself when `?user=` is missing, so the
// handler never runs.
fn require_user(w: &mut ResponseWriter, req: &Request) {
    if req.query("user").is_none() {
        w.write_status(StatusCode::BAD_REQUEST);
        w.write(b"missing user");
    }
}

// Global middleware that blows up on demand, to show recovery.
fn debug_panic(_w: &mut ResponseWriter, req: &Request) {
    if req.header("x-debug") == Some("panic") {
        panic!("debug panic requested");
    }
}
