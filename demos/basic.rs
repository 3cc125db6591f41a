//! Minimal trellis example — grouped JSON endpoints, middleware, and
//! health checks.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/healthz
//!   curl http://localhost:3000/api/users/42
//!   curl -X POST http://localhost:3000/api/users \
//!        -H 'content-type: application/json' \
//!        -d '{"name":"alice"}'
//!   curl http://localhost:3000/admin/whoami            # 401
//!   curl -u admin:hunter2 http://localhost:3000/admin/whoami

use serde::{Deserialize, Serialize};
use trellis::middleware::{BASIC_AUTH_USER, basic_auth, logger, recovery};
use trellis::{App, Context, Error, Json, Response, Server, Status, health};

#[derive(Deserialize)]
struct CreateUser {
    name: String,
}

#[derive(Serialize)]
struct User {
    id: String,
    name: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let mut app = App::new();
    // Outermost first: recovery guards everything, logger times everything.
    app.wrap(recovery()).wrap(logger());

    app.get("/healthz", health::liveness)
        .get("/readyz", health::readiness);

    let api = app.group("/api");
    api.get("/users/{id}", get_user)
        .post("/users", create_user)
        .delete("/users/{id}", delete_user);

    let admin = app.group("/admin");
    admin.wrap(basic_auth("admin", "hunter2"));
    admin.get("/whoami", whoami);

    Server::bind("0.0.0.0:3000")
        .serve(app)
        .await
        .expect("server error");
}

// GET /api/users/{id}
async fn get_user(ctx: Context) -> Result<Json<User>, Error> {
    let id = ctx.require_param("id")?;
    Ok(Json(User { id: id.to_owned(), name: "alice".to_owned() }))
}

// POST /api/users — body binds straight into CreateUser via serde.
async fn create_user(ctx: Context) -> Result<Response, Error> {
    let input: CreateUser = ctx.bind_json()?;
    let user = User { id: "99".to_owned(), name: input.name };
    Ok(Response::builder()
        .status(Status::Created)
        .header("location", "/api/users/99")
        .json(serde_json::to_vec(&user).unwrap_or_default()))
}

// DELETE /api/users/{id} → 204 No Content
async fn delete_user(_ctx: Context) -> Status {
    Status::NoContent
}

// GET /admin/whoami — the auth middleware put the user in the store.
async fn whoami(ctx: Context) -> Result<Response, Error> {
    let user = ctx.require(BASIC_AUTH_USER)?;
    Ok(Response::text(user.clone()))
}
