#![allow(missing_docs)]

use rusqlite::Connection;

use crate::{
    PasswordHash, User,
    category::{CategoryName, Kind, NewCategory},
    db::initialize,
    user::create_user,
};

/// An in-memory database with every table created and the defaults seeded.
pub(crate) fn get_test_connection() -> Connection {
    let connection = Connection::open_in_memory().expect("Could not open in-memory SQLite database");
    initialize(&connection).expect("Could not initialize database");
    connection
}

pub(crate) fn create_test_user(connection: &Connection) -> User {
    create_test_user_with_email("ada@example.com", connection)
}

pub(crate) fn create_test_user_with_email(email: &str, connection: &Connection) -> User {
    create_user(
        "Test User",
        email,
        PasswordHash::new_unchecked("hunter2"),
        connection,
    )
    .expect("Could not create test user")
}

pub(crate) fn new_test_category(name: &str, kind: Kind) -> NewCategory {
    NewCategory {
        name: CategoryName::new_unchecked(name),
        kind,
        color: None,
        icon: None,
    }
}
