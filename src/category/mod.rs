//! Categories group transactions and scope budgets.
//!
//! A category is either shared by every user (the seeded defaults) or owned by
//! a single user. Lookups on behalf of a user see both.

mod db;
mod domain;
mod endpoints;

pub use db::{
    create_category, create_category_table, delete_category, get_category,
    get_usable_category, get_visible_category, list_visible_categories,
    seed_default_categories, update_category,
};
pub use domain::{
    Category, CategoryChanges, CategoryName, CategoryOwner, Kind, NewCategory, validate_color,
};
pub use endpoints::{
    create_category_endpoint, delete_category_endpoint, list_categories_endpoint,
    update_category_endpoint,
};
