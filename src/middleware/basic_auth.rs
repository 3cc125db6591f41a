//! HTTP Basic authentication middleware.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::chain::Next;
use crate::context::Context;
use crate::handler::RouteHandler;
use crate::response::Response;
use crate::status::Status;
use crate::store::Key;

/// Store key under which the authenticated username is published for
/// downstream chain entries.
pub const BASIC_AUTH_USER: Key<String> = Key::new("middleware.basic_auth.user");

const REALM: &str = "Basic realm=\"Authorization Required\"";

/// Requires `Authorization: Basic …` matching the fixed credential pair.
///
/// On success the username is stored under [`BASIC_AUTH_USER`] and the
/// chain continues; otherwise the chain is short-circuited with `401` and a
/// `WWW-Authenticate` challenge.
pub fn basic_auth(username: &str, password: &str) -> RouteHandler {
    let expected = format!(
        "Basic {}",
        BASE64.encode(format!("{username}:{password}"))
    );
    let username = username.to_owned();

    RouteHandler::middleware(move |mut ctx: Context, next: Next| {
        let expected = expected.clone();
        let username = username.clone();
        async move {
            let accepted = ctx
                .header("authorization")
                .is_some_and(|given| constant_time_eq(given.as_bytes(), expected.as_bytes()));
            if accepted {
                ctx.set(BASIC_AUTH_USER, username);
                next.run(ctx).await
            } else {
                unauthorized()
            }
        }
    })
}

/// Like [`basic_auth`], but validates the decoded `user:password` pair with
/// a caller-supplied check.
pub fn basic_auth_with(
    check: impl Fn(&str, &str) -> bool + Send + Sync + 'static,
) -> RouteHandler {
    RouteHandler::middleware(move |mut ctx: Context, next: Next| {
        let credentials = ctx
            .header("authorization")
            .and_then(|auth| auth.strip_prefix("Basic "))
            .and_then(|token| BASE64.decode(token).ok())
            .and_then(|raw| String::from_utf8(raw).ok())
            .and_then(|pair| {
                pair.split_once(':')
                    .map(|(user, pass)| (user.to_owned(), pass.to_owned()))
            });
        let accepted = credentials
            .as_ref()
            .is_some_and(|(user, pass)| check(user, pass));

        async move {
            match (accepted, credentials) {
                (true, Some((user, _))) => {
                    ctx.set(BASIC_AUTH_USER, user);
                    next.run(ctx).await
                }
                _ => unauthorized(),
            }
        }
    })
}

fn unauthorized() -> Response {
    let mut response = Response::abort(Status::Unauthorized, "");
    response.set_header("www-authenticate", REALM);
    response
}

/// Compares the full input regardless of where a mismatch occurs, to avoid
/// leaking the matching prefix length through timing.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_time_eq_basics() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
    }

    #[test]
    fn challenge_carries_the_realm() {
        let resp = unauthorized();
        assert_eq!(resp.status_code(), 401);
        assert_eq!(resp.header("www-authenticate"), Some(REALM));
    }
}
