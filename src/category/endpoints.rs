//! JSON endpoints for listing, creating, editing and deleting categories.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Path, State},
    http::StatusCode,
};
use rusqlite::Connection;

use crate::{
    AppState, Error, UserID,
    category::{
        CategoryOwner, create_category, delete_category,
        domain::{CategoryForm, CategoryResponse, CategoryUpdateForm},
        list_visible_categories, update_category,
    },
    database_id::CategoryId,
};

/// The state needed by the category endpoints.
#[derive(Debug, Clone)]
pub struct CategoryState {
    /// The database connection for managing categories.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CategoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// List the categories the user can choose from.
pub async fn list_categories_endpoint(
    State(state): State<CategoryState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<Vec<CategoryResponse>>, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let categories = list_visible_categories(user_id, &connection)?
        .into_iter()
        .map(CategoryResponse::from)
        .collect();

    Ok(Json(categories))
}

/// Create a category owned by the user.
pub async fn create_category_endpoint(
    State(state): State<CategoryState>,
    Extension(user_id): Extension<UserID>,
    Json(form): Json<CategoryForm>,
) -> Result<(StatusCode, Json<CategoryResponse>), Error> {
    let new_category = form.validate()?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let category = create_category(CategoryOwner::User(user_id), new_category, &connection)?;

    Ok((StatusCode::CREATED, Json(category.into())))
}

/// Update one of the user's categories.
pub async fn update_category_endpoint(
    State(state): State<CategoryState>,
    Extension(user_id): Extension<UserID>,
    Path(category_id): Path<CategoryId>,
    Json(form): Json<CategoryUpdateForm>,
) -> Result<Json<CategoryResponse>, Error> {
    let changes = form.validate()?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let category = update_category(user_id, category_id, changes, &connection)?;

    Ok(Json(category.into()))
}

/// Delete one of the user's categories.
pub async fn delete_category_endpoint(
    State(state): State<CategoryState>,
    Extension(user_id): Extension<UserID>,
    Path(category_id): Path<CategoryId>,
) -> Result<StatusCode, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    delete_category(user_id, category_id, &connection)?;

    Ok(StatusCode::NO_CONTENT)
}
