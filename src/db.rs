//! Creates the application's tables in a SQLite database.

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};

use crate::{
    Error,
    budget::create_budget_table,
    category::{create_category_table, seed_default_categories},
    transaction::create_transaction_table,
    user::create_user_table,
};

/// Create the application's tables, if they do not exist, and seed the shared
/// default categories.
///
/// All tables are created within one SQL transaction, so either every table
/// exists afterwards or none of the new ones do. Foreign key enforcement is
/// switched on for `connection`.
///
/// # Errors
///
/// Returns an [Error::SqlError] if any of the statements fail.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    // Must be set outside of a transaction to take effect.
    connection.pragma_update(None, "foreign_keys", "ON")?;

    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_category_table(&transaction)?;
    create_transaction_table(&transaction)?;
    create_budget_table(&transaction)?;
    seed_default_categories(&transaction)?;

    transaction.commit()?;

    Ok(())
}

#[cfg(test)]
mod db_tests {
    use rusqlite::Connection;

    use super::initialize;

    #[test]
    fn initialize_is_idempotent() {
        let connection = Connection::open_in_memory().unwrap();

        initialize(&connection).expect("first initialization failed");
        initialize(&connection).expect("second initialization failed");

        let table_count: i64 = connection
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
                 AND name IN ('user', 'category', 'transaction', 'budget')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(table_count, 4);
    }

    #[test]
    fn initialize_enables_foreign_keys() {
        let connection = Connection::open_in_memory().unwrap();

        initialize(&connection).unwrap();

        let foreign_keys: i64 = connection
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(foreign_keys, 1);
    }
}
