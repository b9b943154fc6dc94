//! Database operations for categories.

use rusqlite::{Connection, Row};

use crate::{
    Error, UserID,
    category::{
        Category, CategoryChanges, CategoryName, CategoryOwner, Kind, NewCategory,
    },
    database_id::CategoryId,
    timestamp::{format_timestamp, now_utc},
};

/// The shared categories every user starts with: name, kind, colour and emoji.
const DEFAULT_CATEGORIES: [(&str, Kind, &str, &str); 8] = [
    ("Salary", Kind::Income, "#16a34a", "💼"),
    ("Other Income", Kind::Income, "#22c55e", "💰"),
    ("Groceries", Kind::Expense, "#f97316", "🛒"),
    ("Rent", Kind::Expense, "#ef4444", "🏠"),
    ("Transport", Kind::Expense, "#3b82f6", "🚌"),
    ("Dining", Kind::Expense, "#eab308", "🍽️"),
    ("Utilities", Kind::Expense, "#6366f1", "💡"),
    ("Entertainment", Kind::Expense, "#a855f7", "🎬"),
];

const SELECT_COLUMNS: &str =
    "SELECT id, user_id, name, kind, color_hex, icon, is_default, is_archived FROM category";

/// Initialize the category table.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS category (
            id INTEGER PRIMARY KEY,
            user_id INTEGER REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
            name TEXT NOT NULL,
            kind TEXT NOT NULL CHECK (kind IN ('income', 'expense')),
            color_hex TEXT,
            icon TEXT,
            is_default INTEGER NOT NULL DEFAULT 0,
            is_archived INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            UNIQUE(user_id, name)
        );

        CREATE INDEX IF NOT EXISTS idx_category_user ON category(user_id);",
    )?;

    Ok(())
}

/// Insert the shared default categories if there are no shared categories yet.
pub fn seed_default_categories(connection: &Connection) -> Result<(), rusqlite::Error> {
    let global_count: i64 = connection.query_row(
        "SELECT COUNT(id) FROM category WHERE user_id IS NULL",
        [],
        |row| row.get(0),
    )?;

    if global_count > 0 {
        return Ok(());
    }

    let created_at = format_timestamp(now_utc());
    let mut statement = connection.prepare(
        "INSERT INTO category (user_id, name, kind, color_hex, icon, is_default, created_at)
         VALUES (NULL, ?1, ?2, ?3, ?4, 1, ?5)",
    )?;

    for (name, kind, color, icon) in DEFAULT_CATEGORIES {
        statement.execute((name, kind, color, icon, &created_at))?;
    }

    tracing::info!("Seeded {} default categories", DEFAULT_CATEGORIES.len());

    Ok(())
}

/// Create a category and return it with its generated ID.
///
/// # Errors
///
/// Returns [Error::DuplicateCategoryName] if `owner` already has a category
/// with the same name.
pub fn create_category(
    owner: CategoryOwner,
    category: NewCategory,
    connection: &Connection,
) -> Result<Category, Error> {
    connection
        .execute(
            "INSERT INTO category (user_id, name, kind, color_hex, icon, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            (
                owner.user_id(),
                category.name.as_ref(),
                category.kind,
                &category.color,
                &category.icon,
                format_timestamp(now_utc()),
            ),
        )
        .map_err(|error| map_duplicate_name(error, &category.name))?;

    Ok(Category {
        id: connection.last_insert_rowid(),
        owner,
        name: category.name,
        kind: category.kind,
        color: category.color,
        icon: category.icon,
        is_default: false,
        is_archived: false,
    })
}

/// Retrieve a single category by ID, regardless of owner.
pub fn get_category(category_id: CategoryId, connection: &Connection) -> Result<Category, Error> {
    connection
        .prepare(&format!("{SELECT_COLUMNS} WHERE id = :id"))?
        .query_row(&[(":id", &category_id)], map_category_row)
        .map_err(|error| error.into())
}

/// Retrieve a category that `user_id` can see.
///
/// The user's own categories are checked first, then the shared ones.
///
/// # Errors
///
/// Returns [Error::NotFound] if the category does not exist or belongs to
/// another user.
pub fn get_visible_category(
    user_id: UserID,
    category_id: CategoryId,
    connection: &Connection,
) -> Result<Category, Error> {
    let own = connection
        .prepare(&format!(
            "{SELECT_COLUMNS} WHERE id = :id AND user_id = :user_id"
        ))?
        .query_row(
            &[(":id", &category_id), (":user_id", &user_id.as_i64())],
            map_category_row,
        );

    match own {
        Ok(category) => Ok(category),
        Err(rusqlite::Error::QueryReturnedNoRows) => connection
            .prepare(&format!("{SELECT_COLUMNS} WHERE id = :id AND user_id IS NULL"))?
            .query_row(&[(":id", &category_id)], map_category_row)
            .map_err(|error| error.into()),
        Err(error) => Err(error.into()),
    }
}

/// Retrieve a category that `user_id` may file new transactions or budgets under.
///
/// # Errors
///
/// Returns [Error::InvalidCategory] if the category is not visible to the
/// user or is archived.
pub fn get_usable_category(
    user_id: UserID,
    category_id: CategoryId,
    connection: &Connection,
) -> Result<Category, Error> {
    match get_visible_category(user_id, category_id, connection) {
        Ok(category) if !category.is_archived => Ok(category),
        Ok(_) | Err(Error::NotFound) => Err(Error::InvalidCategory(Some(category_id))),
        Err(error) => Err(error),
    }
}

/// Retrieve the categories a user can pick from: their own and the shared
/// ones, excluding archived categories. Defaults come first, then by name.
pub fn list_visible_categories(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<Category>, Error> {
    connection
        .prepare(&format!(
            "{SELECT_COLUMNS}
             WHERE (user_id = :user_id OR user_id IS NULL) AND is_archived = 0
             ORDER BY is_default DESC, name ASC, id ASC"
        ))?
        .query_map(&[(":user_id", &user_id.as_i64())], map_category_row)?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

/// Apply `changes` to one of the user's own categories.
///
/// Changing the kind does not change the kind of existing transactions.
///
/// # Errors
///
/// Returns [Error::NotFound] if the category does not belong to the user,
/// and [Error::DuplicateCategoryName] if the new name is taken.
pub fn update_category(
    user_id: UserID,
    category_id: CategoryId,
    changes: CategoryChanges,
    connection: &Connection,
) -> Result<Category, Error> {
    let mut category = get_own_category(user_id, category_id, connection)?;

    if let Some(name) = changes.name {
        category.name = name;
    }
    if let Some(color) = changes.color {
        category.color = Some(color);
    }
    if let Some(icon) = changes.icon {
        category.icon = Some(icon);
    }
    if let Some(is_archived) = changes.is_archived {
        category.is_archived = is_archived;
    }
    if let Some(kind) = changes.kind {
        category.kind = kind;
    }

    connection
        .execute(
            "UPDATE category SET name = ?1, kind = ?2, color_hex = ?3, icon = ?4, is_archived = ?5
             WHERE id = ?6 AND user_id = ?7",
            (
                category.name.as_ref(),
                category.kind,
                &category.color,
                &category.icon,
                category.is_archived,
                category_id,
                user_id.as_i64(),
            ),
        )
        .map_err(|error| map_duplicate_name(error, &category.name))?;

    Ok(category)
}

/// Delete one of the user's own categories.
///
/// Budgets for the category are deleted with it.
///
/// # Errors
///
/// Returns [Error::NotFound] if the category does not belong to the user,
/// and [Error::CategoryInUse] if transactions still refer to it.
pub fn delete_category(
    user_id: UserID,
    category_id: CategoryId,
    connection: &Connection,
) -> Result<(), Error> {
    get_own_category(user_id, category_id, connection)?;

    // Soft deleted transactions still hold the foreign key.
    let is_in_use: bool = connection.query_row(
        "SELECT EXISTS(SELECT 1 FROM \"transaction\" WHERE category_id = ?1)",
        (category_id,),
        |row| row.get(0),
    )?;

    if is_in_use {
        return Err(Error::CategoryInUse);
    }

    connection.execute(
        "DELETE FROM category WHERE id = ?1 AND user_id = ?2",
        (category_id, user_id.as_i64()),
    )?;

    Ok(())
}

fn get_own_category(
    user_id: UserID,
    category_id: CategoryId,
    connection: &Connection,
) -> Result<Category, Error> {
    connection
        .prepare(&format!(
            "{SELECT_COLUMNS} WHERE id = :id AND user_id = :user_id"
        ))?
        .query_row(
            &[(":id", &category_id), (":user_id", &user_id.as_i64())],
            map_category_row,
        )
        .map_err(|error| error.into())
}

fn map_duplicate_name(error: rusqlite::Error, name: &CategoryName) -> Error {
    match error {
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: _,
                extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
            },
            _,
        ) => Error::DuplicateCategoryName(name.to_string()),
        error => error.into(),
    }
}

fn map_category_row(row: &Row) -> Result<Category, rusqlite::Error> {
    let raw_name: String = row.get(2)?;

    Ok(Category {
        id: row.get(0)?,
        owner: CategoryOwner::from_user_id(row.get(1)?),
        name: CategoryName::new_unchecked(&raw_name),
        kind: row.get(3)?,
        color: row.get(4)?,
        icon: row.get(5)?,
        is_default: row.get(6)?,
        is_archived: row.get(7)?,
    })
}

#[cfg(test)]
mod category_query_tests {
    use time::macros::date;

    use crate::{
        Error,
        category::{
            CategoryChanges, CategoryName, CategoryOwner, Kind, NewCategory, create_category,
            delete_category, get_category, get_usable_category, get_visible_category,
            list_visible_categories, update_category,
        },
        test_utils::{create_test_user, create_test_user_with_email, get_test_connection},
        transaction::{Transaction, create_transaction, delete_transaction},
    };

    fn new_category(name: &str, kind: Kind) -> NewCategory {
        NewCategory {
            name: CategoryName::new_unchecked(name),
            kind,
            color: Some("#123456".to_owned()),
            icon: None,
        }
    }

    #[test]
    fn initialize_seeds_defaults_once() {
        let connection = get_test_connection();
        crate::db::initialize(&connection).expect("Could not re-initialize database");
        let user = create_test_user(&connection);

        let categories = list_visible_categories(user.id, &connection).unwrap();

        assert_eq!(categories.len(), 8);
        assert!(categories.iter().all(|category| category.is_default));
        assert!(
            categories
                .iter()
                .all(|category| category.owner == CategoryOwner::Global)
        );
    }

    #[test]
    fn create_category_succeeds() {
        let connection = get_test_connection();
        let user = create_test_user(&connection);

        let category = create_category(
            CategoryOwner::User(user.id),
            new_category("Pets", Kind::Expense),
            &connection,
        )
        .unwrap();

        assert!(category.id > 0);
        assert_eq!(get_category(category.id, &connection), Ok(category));
    }

    #[test]
    fn create_category_rejects_duplicate_name_for_same_owner() {
        let connection = get_test_connection();
        let user = create_test_user(&connection);
        let owner = CategoryOwner::User(user.id);
        create_category(owner, new_category("Pets", Kind::Expense), &connection).unwrap();

        let result = create_category(owner, new_category("Pets", Kind::Income), &connection);

        assert_eq!(result, Err(Error::DuplicateCategoryName("Pets".to_owned())));
    }

    #[test]
    fn different_users_may_share_a_name() {
        let connection = get_test_connection();
        let ada = create_test_user(&connection);
        let bob = create_test_user_with_email("bob@example.com", &connection);
        create_category(
            CategoryOwner::User(ada.id),
            new_category("Pets", Kind::Expense),
            &connection,
        )
        .unwrap();

        let result = create_category(
            CategoryOwner::User(bob.id),
            new_category("Pets", Kind::Expense),
            &connection,
        );

        assert!(result.is_ok());
    }

    #[test]
    fn visible_category_falls_back_to_global() {
        let connection = get_test_connection();
        let user = create_test_user(&connection);
        let global = create_category(
            CategoryOwner::Global,
            new_category("Shared", Kind::Expense),
            &connection,
        )
        .unwrap();

        let got = get_visible_category(user.id, global.id, &connection);

        assert_eq!(got, Ok(global));
    }

    #[test]
    fn other_users_categories_are_not_visible() {
        let connection = get_test_connection();
        let ada = create_test_user(&connection);
        let bob = create_test_user_with_email("bob@example.com", &connection);
        let category = create_category(
            CategoryOwner::User(ada.id),
            new_category("Pets", Kind::Expense),
            &connection,
        )
        .unwrap();

        assert_eq!(
            get_visible_category(bob.id, category.id, &connection),
            Err(Error::NotFound)
        );
        assert_eq!(
            get_usable_category(bob.id, category.id, &connection),
            Err(Error::InvalidCategory(Some(category.id)))
        );
    }

    #[test]
    fn archived_categories_are_not_usable_or_listed() {
        let connection = get_test_connection();
        let user = create_test_user(&connection);
        let category = create_category(
            CategoryOwner::User(user.id),
            new_category("Pets", Kind::Expense),
            &connection,
        )
        .unwrap();
        update_category(
            user.id,
            category.id,
            CategoryChanges {
                is_archived: Some(true),
                ..Default::default()
            },
            &connection,
        )
        .unwrap();

        assert_eq!(
            get_usable_category(user.id, category.id, &connection),
            Err(Error::InvalidCategory(Some(category.id)))
        );
        let listed = list_visible_categories(user.id, &connection).unwrap();
        assert!(listed.iter().all(|listed| listed.id != category.id));
    }

    #[test]
    fn list_puts_defaults_first_then_sorts_by_name() {
        let connection = get_test_connection();
        let user = create_test_user(&connection);
        let owner = CategoryOwner::User(user.id);
        create_category(owner, new_category("Zoo", Kind::Expense), &connection).unwrap();
        create_category(owner, new_category("Aquarium", Kind::Expense), &connection).unwrap();

        let names: Vec<String> = list_visible_categories(user.id, &connection)
            .unwrap()
            .into_iter()
            .map(|category| category.name.to_string())
            .collect();

        assert_eq!(
            names,
            [
                "Dining",
                "Entertainment",
                "Groceries",
                "Other Income",
                "Rent",
                "Salary",
                "Transport",
                "Utilities",
                "Aquarium",
                "Zoo"
            ]
        );
    }

    #[test]
    fn update_renames_own_category() {
        let connection = get_test_connection();
        let user = create_test_user(&connection);
        let category = create_category(
            CategoryOwner::User(user.id),
            new_category("Pets", Kind::Expense),
            &connection,
        )
        .unwrap();

        let updated = update_category(
            user.id,
            category.id,
            CategoryChanges {
                name: Some(CategoryName::new_unchecked("Animals")),
                ..Default::default()
            },
            &connection,
        )
        .unwrap();

        assert_eq!(updated.name.as_ref(), "Animals");
        assert_eq!(get_category(category.id, &connection), Ok(updated));
    }

    #[test]
    fn cannot_update_global_category() {
        let connection = get_test_connection();
        let user = create_test_user(&connection);
        let global = list_visible_categories(user.id, &connection).unwrap()[0].clone();

        let result = update_category(user.id, global.id, CategoryChanges::default(), &connection);

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn delete_removes_own_category() {
        let connection = get_test_connection();
        let user = create_test_user(&connection);
        let category = create_category(
            CategoryOwner::User(user.id),
            new_category("Pets", Kind::Expense),
            &connection,
        )
        .unwrap();

        delete_category(user.id, category.id, &connection).unwrap();

        assert_eq!(get_category(category.id, &connection), Err(Error::NotFound));
    }

    #[test]
    fn update_changes_kind() {
        let connection = get_test_connection();
        let user = create_test_user(&connection);
        let category = create_category(
            CategoryOwner::User(user.id),
            new_category("Side gig", Kind::Expense),
            &connection,
        )
        .unwrap();

        let updated = update_category(
            user.id,
            category.id,
            CategoryChanges {
                kind: Some(Kind::Income),
                ..Default::default()
            },
            &connection,
        )
        .unwrap();

        assert_eq!(updated.kind, Kind::Income);
        assert_eq!(get_category(category.id, &connection), Ok(updated));
    }

    #[test]
    fn deleted_transactions_still_keep_category_in_use() {
        let connection = get_test_connection();
        let user = create_test_user(&connection);
        let category = create_category(
            CategoryOwner::User(user.id),
            new_category("Pets", Kind::Expense),
            &connection,
        )
        .unwrap();
        let transaction = create_transaction(
            user.id,
            Transaction::build(20.0, date!(2025 - 09 - 01), "Vet").category_id(Some(category.id)),
            &connection,
        )
        .unwrap();
        delete_transaction(user.id, transaction.id, &connection).unwrap();

        let result = delete_category(user.id, category.id, &connection);

        assert_eq!(result, Err(Error::CategoryInUse));
        assert!(get_category(category.id, &connection).is_ok());
    }

    #[test]
    fn delete_with_invalid_id_returns_not_found() {
        let connection = get_test_connection();
        let user = create_test_user(&connection);

        assert_eq!(
            delete_category(user.id, 999_999, &connection),
            Err(Error::NotFound)
        );
    }
}
