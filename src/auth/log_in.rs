//! Log-in and log-out endpoints.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use time::Duration;

use crate::{
    AppState, Error,
    auth::cookie::{invalidate_auth_cookie, set_auth_cookie},
    timestamp::now_utc,
    user::{UserResponse, get_user_by_email, record_log_in},
};

/// The state needed to perform a log-in.
#[derive(Debug, Clone)]
pub struct LogInState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    /// The database connection holding the users.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for LogInState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<LogInState> for Key {
    fn from_ref(state: &LogInState) -> Self {
        state.cookie_key.clone()
    }
}

/// The credentials submitted to log in.
#[derive(Clone, Serialize, Deserialize)]
pub struct LogInData {
    /// The email the user registered with, compared case-insensitively.
    pub email: String,
    /// The user's password in plain text.
    pub password: String,
}

/// Handler for log-in requests.
///
/// On success the session cookies are set and the user is returned.
///
/// # Errors
///
/// Returns [Error::InvalidCredentials] if the email is not registered, the
/// user is inactive, or the password is wrong. The three cases are not
/// distinguished in the response.
pub async fn post_log_in(
    State(state): State<LogInState>,
    jar: PrivateCookieJar,
    Json(credentials): Json<LogInData>,
) -> Result<(PrivateCookieJar, Json<UserResponse>), Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let user = match get_user_by_email(&credentials.email, &connection) {
        Ok(user) => user,
        Err(Error::NotFound) => return Err(Error::InvalidCredentials),
        Err(error) => return Err(error),
    };

    if !user.is_active {
        return Err(Error::InvalidCredentials);
    }

    let is_password_valid = user
        .password_hash
        .verify(&credentials.password)
        .map_err(|error| Error::HashingError(error.to_string()))?;

    if !is_password_valid {
        return Err(Error::InvalidCredentials);
    }

    record_log_in(user.id, now_utc(), &connection)?;
    tracing::info!("user {} logged in", user.id);

    let jar = set_auth_cookie(jar, user.id, state.cookie_duration);

    Ok((jar, Json(UserResponse::from(&user))))
}

/// Handler for log-out requests. Clears the session cookies.
pub async fn post_log_out(jar: PrivateCookieJar) -> (PrivateCookieJar, Json<Value>) {
    (invalidate_auth_cookie(jar), Json(json!({ "msg": "Logged out" })))
}
