//! Authentication middleware that validates session cookies and extends sessions.

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::header::SET_COOKIE,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use time::Duration;

use crate::{
    AppState, Error,
    auth::cookie::{extend_auth_cookie_duration_if_needed, get_user_id_from_auth_cookie},
};

/// The state needed for the auth middleware
#[derive(Debug, Clone)]
pub struct AuthState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AuthState> for Key {
    fn from_ref(state: &AuthState) -> Self {
        state.cookie_key.clone()
    }
}

/// Middleware function that checks for a valid session cookie.
///
/// The user ID is placed into the request and the request is run as normal if
/// the cookie is valid, otherwise a 401 JSON error is returned. Successful
/// requests push the session expiry out by the configured cookie duration.
///
/// **Note**: Route handlers can use the function argument `Extension(user_id): Extension<UserID>` to receive the user ID.
pub async fn auth_guard(State(state): State<AuthState>, request: Request, next: Next) -> Response {
    let (mut parts, body) = request.into_parts();
    let jar = match PrivateCookieJar::<Key>::from_request_parts(&mut parts, &state).await {
        Ok(jar) => jar,
        Err(error) => {
            tracing::error!("could not get cookie jar: {error:?}");
            return Error::InvalidCredentials.into_response();
        }
    };
    let user_id = match get_user_id_from_auth_cookie(&jar) {
        Ok(user_id) => user_id,
        Err(error) => {
            tracing::debug!("rejected request to {}: {error}", parts.uri.path());
            return Error::InvalidCredentials.into_response();
        }
    };

    parts.extensions.insert(user_id);
    let request = Request::from_parts(parts, body);
    let response = next.run(request).await;

    let (mut parts, body) = response.into_parts();
    let jar = match extend_auth_cookie_duration_if_needed(jar.clone(), state.cookie_duration) {
        Ok(updated_jar) => updated_jar,
        Err(error) => {
            tracing::error!("could not extend session: {error}. Rolling back cookie jar.");
            jar
        }
    };
    for (key, value) in jar.into_response().headers().iter() {
        if key != SET_COOKIE {
            continue;
        }

        parts.headers.append(key, value.to_owned());
    }

    Response::from_parts(parts, body)
}

#[cfg(test)]
mod auth_guard_tests {
    use axum::{
        Extension, Json, Router,
        http::StatusCode,
        middleware,
        routing::get,
    };
    use axum_extra::extract::{PrivateCookieJar, cookie::Key};
    use axum_test::TestServer;
    use serde_json::{Value, json};
    use sha2::{Digest, Sha512};
    use time::Duration;

    use crate::{
        UserID,
        auth::cookie::{COOKIE_EXPIRY, COOKIE_USER_ID, set_auth_cookie},
    };

    use super::{AuthState, auth_guard};

    const PROTECTED: &str = "/protected";
    const LOG_IN: &str = "/log_in";

    async fn whoami(Extension(user_id): Extension<UserID>) -> Json<Value> {
        Json(json!({ "userId": user_id.as_i64() }))
    }

    async fn fake_log_in(jar: PrivateCookieJar) -> PrivateCookieJar {
        set_auth_cookie(jar, UserID::new(7), Duration::minutes(5))
    }

    fn get_test_server() -> TestServer {
        let state = AuthState {
            cookie_key: Key::from(&Sha512::digest("nafstenoas")),
            cookie_duration: Duration::minutes(5),
        };

        let app = Router::new()
            .route(PROTECTED, get(whoami))
            .route_layer(middleware::from_fn_with_state(state.clone(), auth_guard))
            .route(LOG_IN, get(fake_log_in))
            .with_state(state);

        TestServer::try_new(app).expect("Could not create test server")
    }

    #[tokio::test]
    async fn rejects_request_without_session() {
        let server = get_test_server();

        let response = server.get(PROTECTED).await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        response.assert_json_contains(&json!({ "error": "invalid credentials" }));
    }

    #[tokio::test]
    async fn passes_user_id_to_handler_and_refreshes_cookies() {
        let server = get_test_server();
        let response = server.get(LOG_IN).await;
        response.assert_status_ok();
        let jar = response.cookies();

        let response = server.get(PROTECTED).add_cookies(jar).await;

        response.assert_status_ok();
        response.assert_json(&json!({ "userId": 7 }));
        let jar = response.cookies();
        assert!(jar.get(COOKIE_USER_ID).is_some());
        assert!(jar.get(COOKIE_EXPIRY).is_some());
    }
}
