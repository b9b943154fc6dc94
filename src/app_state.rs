//! Implements a struct that holds the state of the REST server.

use std::sync::{Arc, Mutex};

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use rusqlite::Connection;
use sha2::{Digest, Sha512};
use time::Duration;

use crate::{Error, auth::DEFAULT_COOKIE_DURATION, db::initialize, user::count_users};

/// The currency reported when none is configured.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Settings that apply to every report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportConfig {
    /// The ISO 4217 code echoed in reports, e.g. "USD".
    pub currency: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            currency: DEFAULT_CURRENCY.to_owned(),
        }
    }
}

/// The state of the REST server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,

    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,

    /// The settings applied to reports.
    pub report_config: ReportConfig,

    /// The database connection
    pub db_connection: Arc<Mutex<Connection>>,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by creating the tables and
    /// seeding the default categories.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(
        db_connection: Connection,
        cookie_secret: &str,
        report_config: ReportConfig,
    ) -> Result<Self, Error> {
        initialize(&db_connection)?;
        tracing::info!(
            "database ready with {} registered users",
            count_users(&db_connection)?
        );

        Ok(Self {
            cookie_key: create_cookie_key(cookie_secret),
            cookie_duration: DEFAULT_COOKIE_DURATION,
            report_config,
            db_connection: Arc::new(Mutex::new(db_connection)),
        })
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// Create a signing key for cookies from a `secret` string.
pub fn create_cookie_key(secret: &str) -> Key {
    let hash = Sha512::digest(secret);

    Key::from(&hash)
}

#[cfg(test)]
mod app_state_tests {
    use rusqlite::Connection;

    use crate::{ReportConfig, category::list_visible_categories, user::count_users};

    use super::{AppState, create_cookie_key};

    #[test]
    fn new_initializes_database() {
        let connection = Connection::open_in_memory().unwrap();

        let state = AppState::new(connection, "foobar", ReportConfig::default()).unwrap();

        let connection = state.db_connection.lock().unwrap();
        assert_eq!(count_users(&connection), Ok(0));
        let categories = list_visible_categories(crate::UserID::new(1), &connection).unwrap();
        assert_eq!(categories.len(), 8);
        assert_eq!(state.report_config.currency, "USD");
    }

    #[test]
    fn same_secret_gives_same_key() {
        assert_eq!(
            create_cookie_key("foobar").master(),
            create_cookie_key("foobar").master()
        );
        assert_ne!(
            create_cookie_key("foobar").master(),
            create_cookie_key("barfoo").master()
        );
    }
}
