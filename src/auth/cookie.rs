//! Session cookies.
//!
//! A session is a pair of private (encrypted and signed) cookies: one holds
//! the user ID and the other the session expiry as a Unix timestamp.

use std::cmp::max;

use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, SameSite},
};
use time::{Duration, OffsetDateTime};

use crate::UserID;

pub(crate) const COOKIE_USER_ID: &str = "user_id";
pub(crate) const COOKIE_EXPIRY: &str = "expiry";
/// The default duration for which session cookies are valid.
pub const DEFAULT_COOKIE_DURATION: Duration = Duration::minutes(30);

/// Why a session could not be read from or updated in a cookie jar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CookieError {
    /// The user ID or expiry cookie is not in the jar.
    #[error("the session cookies are missing")]
    Missing,
    /// A cookie holds a value that could not be parsed.
    #[error("the session cookies are malformed")]
    Malformed,
    /// The session has expired.
    #[error("the session has expired")]
    Expired,
    /// The new expiry could not be represented.
    #[error("the session expiry is out of range")]
    OutOfRange,
}

fn session_cookie(name: &'static str, value: String, expiry: OffsetDateTime) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .expires(expiry)
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(true)
        .build()
}

/// Add the session cookies for `user_id` to `jar`, valid for `duration` from now.
pub fn set_auth_cookie(
    jar: PrivateCookieJar,
    user_id: UserID,
    duration: Duration,
) -> PrivateCookieJar {
    let expiry = OffsetDateTime::now_utc() + duration;

    jar.add(session_cookie(
        COOKIE_USER_ID,
        user_id.as_i64().to_string(),
        expiry,
    ))
    .add(session_cookie(
        COOKIE_EXPIRY,
        expiry.unix_timestamp().to_string(),
        expiry,
    ))
}

/// Overwrite the session cookies with expired ones so that the client drops them.
pub fn invalidate_auth_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    let expire = |name: &'static str| {
        let mut cookie = session_cookie(name, "deleted".to_owned(), OffsetDateTime::UNIX_EPOCH);
        cookie.set_max_age(Duration::ZERO);
        cookie
    };

    jar.add(expire(COOKIE_USER_ID)).add(expire(COOKIE_EXPIRY))
}

/// Get the logged in user from the session cookies in `jar`.
///
/// # Errors
/// Returns a [CookieError] if the cookies are missing, malformed, or expired.
pub(crate) fn get_user_id_from_auth_cookie(jar: &PrivateCookieJar) -> Result<UserID, CookieError> {
    let user_id_cookie = jar.get(COOKIE_USER_ID).ok_or(CookieError::Missing)?;
    let expiry = get_expiry(jar)?;

    if expiry <= OffsetDateTime::now_utc() {
        return Err(CookieError::Expired);
    }

    user_id_cookie
        .value_trimmed()
        .parse()
        .map(UserID::new)
        .map_err(|_| CookieError::Malformed)
}

/// Push the session expiry in `jar` out to now plus `duration`, unless it
/// already expires later than that.
///
/// # Errors
/// Returns a [CookieError] and leaves `jar` untouched if the session cookies
/// are missing or malformed.
pub(crate) fn extend_auth_cookie_duration_if_needed(
    jar: PrivateCookieJar,
    duration: Duration,
) -> Result<PrivateCookieJar, CookieError> {
    let current_expiry = get_expiry(&jar)?;
    let new_expiry = OffsetDateTime::now_utc()
        .checked_add(duration)
        .ok_or(CookieError::OutOfRange)?;

    set_auth_cookie_expiry(jar, max(current_expiry, new_expiry))
}

fn set_auth_cookie_expiry(
    jar: PrivateCookieJar,
    expiry: OffsetDateTime,
) -> Result<PrivateCookieJar, CookieError> {
    let user_id = jar
        .get(COOKIE_USER_ID)
        .ok_or(CookieError::Missing)?
        .value_trimmed()
        .to_owned();

    Ok(jar
        .add(session_cookie(COOKIE_USER_ID, user_id, expiry))
        .add(session_cookie(
            COOKIE_EXPIRY,
            expiry.unix_timestamp().to_string(),
            expiry,
        )))
}

fn get_expiry(jar: &PrivateCookieJar) -> Result<OffsetDateTime, CookieError> {
    let timestamp: i64 = jar
        .get(COOKIE_EXPIRY)
        .ok_or(CookieError::Missing)?
        .value_trimmed()
        .parse()
        .map_err(|_| CookieError::Malformed)?;

    OffsetDateTime::from_unix_timestamp(timestamp).map_err(|_| CookieError::Malformed)
}
