//! Registration and the current-user endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
    http::StatusCode,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error, PasswordHash, UserID,
    user::{UserResponse, create_user, get_user_by_id, normalize_email},
};

/// The state needed for creating a new user.
#[derive(Debug, Clone)]
pub struct RegistrationState {
    /// The database connection for managing users.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The bcrypt cost used to hash new passwords.
    pub password_cost: u32,
}

impl FromRef<AppState> for RegistrationState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            password_cost: PasswordHash::DEFAULT_COST,
        }
    }
}

/// The details submitted to register.
#[derive(Clone, Serialize, Deserialize)]
pub struct RegisterForm {
    /// The user's display name.
    pub name: String,
    /// The email to log in with.
    pub email: String,
    /// The password in plain text.
    pub password: String,
}

/// Register a new user. The user is not logged in.
///
/// # Errors
/// Returns [Error::InvalidEmail], [Error::EmptyName] for a blank name or
/// password, or [Error::DuplicateEmail].
pub async fn register_user(
    State(state): State<RegistrationState>,
    Json(form): Json<RegisterForm>,
) -> Result<(StatusCode, Json<UserResponse>), Error> {
    let email = normalize_email(&form.email)?;
    let password_hash = PasswordHash::from_raw_password(&form.password, state.password_cost)?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let user = create_user(&form.name, &email, password_hash, &connection)?;
    tracing::info!("registered user {}", user.id);

    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

/// Get the logged in user.
pub async fn get_current_user(
    State(state): State<RegistrationState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<UserResponse>, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let user = get_user_by_id(user_id, &connection)?;

    Ok(Json(UserResponse::from(&user)))
}
