//! End-to-end routing semantics: group flattening, execution order,
//! short-circuiting, isolation, and the 404/405/redirect fallbacks.

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use http_body_util::Full;
use trellis::{App, Config, Context, Key, Next, Response, RouteHandler, Status};

type Log = Arc<Mutex<Vec<String>>>;

fn request(method: &str, uri: &str) -> http::Request<Full<Bytes>> {
    http::Request::builder()
        .method(method)
        .uri(uri)
        .body(Full::new(Bytes::new()))
        .unwrap()
}

/// Middleware that appends `tag` to the shared log and continues.
fn record(log: &Log, tag: &'static str) -> RouteHandler {
    let log = Arc::clone(log);
    RouteHandler::middleware(move |ctx: Context, next: Next| {
        let log = Arc::clone(&log);
        async move {
            log.lock().unwrap().push(tag.to_owned());
            next.run(ctx).await
        }
    })
}

/// Middleware that appends `tag` and stops the chain with `403`.
fn record_and_stop(log: &Log, tag: &'static str) -> RouteHandler {
    let log = Arc::clone(log);
    RouteHandler::middleware(move |_ctx: Context, _next: Next| {
        let log = Arc::clone(&log);
        async move {
            log.lock().unwrap().push(tag.to_owned());
            Response::status(Status::Forbidden)
        }
    })
}

/// Terminal handler that appends `tag` and answers `200 done`.
fn record_handler(log: &Log, tag: &'static str) -> RouteHandler {
    let log = Arc::clone(log);
    RouteHandler::plain(move |_ctx: Context| {
        let log = Arc::clone(&log);
        async move {
            log.lock().unwrap().push(tag.to_owned());
            Response::text("done")
        }
    })
}

#[tokio::test]
async fn nested_groups_execute_root_to_leaf() {
    let log: Log = Arc::default();

    let mut app = App::new();
    app.wrap(record(&log, "m1")).wrap(record(&log, "m2"));
    let a = app.group("/a");
    a.wrap(record(&log, "m3"));
    let b = a.group("/b");
    b.wrap(record(&log, "m4")).wrap(record(&log, "m5"));
    b.get("/end", record_handler(&log, "h1"));

    let bound = app.bind();
    let resp = bound.handle(request("GET", "/a/b/end")).await;

    assert_eq!(resp.status_code(), 200);
    assert_eq!(
        *log.lock().unwrap(),
        vec!["m1", "m2", "m3", "m4", "m5", "h1"]
    );
}

#[tokio::test]
async fn short_circuit_skips_everything_downstream() {
    let log: Log = Arc::default();

    let mut app = App::new();
    app.wrap(record(&log, "m1")).wrap(record(&log, "m2"));
    let a = app.group("/a");
    a.wrap(record_and_stop(&log, "m3"));
    let b = a.group("/b");
    b.wrap(record(&log, "m4")).wrap(record(&log, "m5"));
    b.get("/end", record_handler(&log, "h1"));

    let bound = app.bind();
    let resp = bound.handle(request("GET", "/a/b/end")).await;

    assert_eq!(resp.status_code(), 403);
    assert_eq!(*log.lock().unwrap(), vec!["m1", "m2", "m3"]);
}

#[tokio::test]
async fn repeated_wrap_calls_concatenate() {
    let log: Log = Arc::default();

    let mut app = App::new();
    let g = app.group("/g");
    g.wrap(record(&log, "m1"));
    g.wrap(record(&log, "m2"));
    g.get("/end", record_handler(&log, "h"));

    app.bind().handle(request("GET", "/g/end")).await;
    assert_eq!(*log.lock().unwrap(), vec!["m1", "m2", "h"]);
}

#[tokio::test]
async fn middleware_appended_after_the_endpoint_still_applies() {
    let log: Log = Arc::default();

    let mut app = App::new();
    let g = app.group("/g");
    g.get("/end", record_handler(&log, "h"));
    // Declared after the endpoint, read at bind time all the same.
    g.wrap(record(&log, "late"));

    app.bind().handle(request("GET", "/g/end")).await;
    assert_eq!(*log.lock().unwrap(), vec!["late", "h"]);
}

#[tokio::test]
async fn endpoint_stack_runs_in_declared_order() {
    let log: Log = Arc::default();

    let mut app = App::new();
    app.get(
        "/stacked",
        (
            record(&log, "own1"),
            record(&log, "own2"),
            record_handler(&log, "h"),
        ),
    );

    let resp = app.bind().handle(request("GET", "/stacked")).await;
    assert_eq!(resp.body_bytes().as_ref(), b"done");
    assert_eq!(*log.lock().unwrap(), vec!["own1", "own2", "h"]);
}

#[tokio::test]
async fn concurrent_requests_keep_independent_state() {
    const TAG: Key<String> = Key::new("test.tag");

    let mut app = App::new();
    app.wrap(|mut ctx: Context, next: Next| async move {
        let tag = ctx.query_or("v", "none").to_owned();
        ctx.set(TAG, tag);
        next.run(ctx).await
    });
    app.get("/echo", |ctx: Context| async move {
        // Hold the request open so the two chain walks overlap.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        ctx.get(TAG).cloned().unwrap_or_default()
    });

    let bound = app.bind();
    let (left, right) = tokio::join!(
        bound.handle(request("GET", "/echo?v=left")),
        bound.handle(request("GET", "/echo?v=right")),
    );

    assert_eq!(left.body_bytes().as_ref(), b"left");
    assert_eq!(right.body_bytes().as_ref(), b"right");
}

#[tokio::test]
async fn path_parameter_reaches_the_handler() {
    let mut app = App::new();
    app.get("/a/{id}", |ctx: Context| async move {
        ctx.param("id").unwrap_or("unknown").to_owned()
    });

    let resp = app.bind().handle(request("GET", "/a/42")).await;
    assert_eq!(resp.status_code(), 200);
    assert_eq!(resp.body_bytes().as_ref(), b"42");
}

#[tokio::test]
async fn unknown_path_is_404_same_path_other_method_is_405() {
    let mut app = App::new();
    app.get("/x", |_ctx: Context| async { "x" });

    let bound = app.bind();

    let miss = bound.handle(request("GET", "/y")).await;
    assert_eq!(miss.status_code(), 404);

    let wrong_method = bound.handle(request("POST", "/x")).await;
    assert_eq!(wrong_method.status_code(), 405);
    assert_eq!(wrong_method.header("allow"), Some("GET"));

    // A method outside the routable set lands on the same fallbacks.
    let trace = bound.handle(request("TRACE", "/x")).await;
    assert_eq!(trace.status_code(), 405);
    let trace_miss = bound.handle(request("TRACE", "/y")).await;
    assert_eq!(trace_miss.status_code(), 404);
}

#[tokio::test]
async fn trailing_slash_redirects_when_enabled() {
    let mut app = App::new();
    app.get("/users/{id}", |_ctx: Context| async { "u" });
    app.post("/users", |_ctx: Context| async { "c" });

    let bound = app.bind();

    let get = bound.handle(request("GET", "/users/42/")).await;
    assert_eq!(get.status_code(), 301);
    assert_eq!(get.header("location"), Some("/users/42"));

    let post = bound.handle(request("POST", "/users/")).await;
    assert_eq!(post.status_code(), 308);
    assert_eq!(post.header("location"), Some("/users"));
}

#[tokio::test]
async fn trailing_slash_redirect_can_be_disabled() {
    let mut config = Config::new();
    config.redirect_trailing_slash = false;
    let mut app = App::with_config(config);
    app.get("/users/{id}", |_ctx: Context| async { "u" });

    let resp = app.bind().handle(request("GET", "/users/42/")).await;
    assert_eq!(resp.status_code(), 404);
}

#[tokio::test]
async fn custom_fallback_handlers_replace_the_defaults() {
    let config = Config::new()
        .on_not_found(|_ctx: Context| async {
            Response::builder().status(Status::NotFound).text("nothing here")
        })
        .on_method_not_allowed(|_ctx: Context| async {
            Response::builder()
                .status(Status::MethodNotAllowed)
                .text("wrong verb")
        });

    let mut app = App::with_config(config);
    app.get("/x", |_ctx: Context| async { "x" });
    let bound = app.bind();

    let miss = bound.handle(request("GET", "/y")).await;
    assert_eq!(miss.body_bytes().as_ref(), b"nothing here");

    let wrong = bound.handle(request("POST", "/x")).await;
    assert_eq!(wrong.body_bytes().as_ref(), b"wrong verb");
}

#[tokio::test]
async fn factories_resolve_once_per_endpoint_with_route_info() {
    let seen: Log = Arc::default();

    let factory = {
        let seen = Arc::clone(&seen);
        RouteHandler::factory(move |info| {
            seen.lock()
                .unwrap()
                .push(format!("{} {} in {}", info.method, info.path, info.group_path));
            None
        })
    };

    let mut app = App::new();
    let api = app.group("/api");
    api.wrap(factory);
    api.get("/users", |_ctx: Context| async { "[]" });
    api.post("/users", |_ctx: Context| async { "created" });

    let bound = app.bind();
    {
        let mut seen = seen.lock().unwrap();
        seen.sort();
        assert_eq!(
            *seen,
            vec!["GET /api/users in /api", "POST /api/users in /api"]
        );
    }

    // A None-producing factory contributes nothing at request time.
    let resp = bound.handle(request("GET", "/api/users")).await;
    assert_eq!(resp.body_bytes().as_ref(), b"[]");
}

#[tokio::test]
async fn wildcard_route_captures_the_tail() {
    let mut app = App::new();
    app.get("/files/{*rest}", |ctx: Context| async move {
        ctx.param("rest").unwrap_or_default().to_owned()
    });

    let resp = app.bind().handle(request("GET", "/files/a/b/c.txt")).await;
    assert_eq!(resp.body_bytes().as_ref(), b"a/b/c.txt");
}

#[tokio::test]
async fn group_path_is_visible_to_handler_construction() {
    let mut app = App::new();
    let api = app.group("/api");
    let v1 = api.group("/v1");
    assert_eq!(v1.path(), "/api/v1");

    let login = format!("{}/login", v1.path());
    v1.get("/login", move |_ctx: Context| {
        let login = login.clone();
        async move { login }
    });

    let resp = app.bind().handle(request("GET", "/api/v1/login")).await;
    assert_eq!(resp.body_bytes().as_ref(), b"/api/v1/login");
}
