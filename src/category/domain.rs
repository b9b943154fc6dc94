//! Core category domain types.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};

use crate::{Error, UserID, database_id::CategoryId};

/// Whether money came in or went out.
///
/// Categories have a kind, and transactions copy the kind of their category
/// when they are created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    /// Money coming in, e.g. a salary.
    Income,
    /// Money going out, e.g. groceries.
    Expense,
}

impl Kind {
    /// The text stored in the database and used in query strings.
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Income => "income",
            Kind::Expense => "expense",
        }
    }
}

impl Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(Kind::Income),
            "expense" => Ok(Kind::Expense),
            other => Err(format!("unknown transaction type \"{other}\"")),
        }
    }
}

impl ToSql for Kind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Kind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error: String| FromSqlError::Other(error.into()))
    }
}

/// Who a category belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoryOwner {
    /// A shared default that every user can see.
    Global,
    /// A category that only its owner can see.
    User(UserID),
}

impl CategoryOwner {
    /// The value of the nullable `user_id` column.
    pub fn user_id(&self) -> Option<i64> {
        match self {
            CategoryOwner::Global => None,
            CategoryOwner::User(user_id) => Some(user_id.as_i64()),
        }
    }

    /// Map the nullable `user_id` column back to an owner.
    pub fn from_user_id(user_id: Option<i64>) -> Self {
        match user_id {
            Some(id) => CategoryOwner::User(UserID::new(id)),
            None => CategoryOwner::Global,
        }
    }
}

/// A validated, non-empty category name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct CategoryName(String);

impl CategoryName {
    /// Create a category name.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::EmptyName] if `name` is blank.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            Err(Error::EmptyName("category name"))
        } else {
            Ok(Self(name.to_string()))
        }
    }

    /// Create a category name without validation.
    ///
    /// The caller should ensure that the string is not empty.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl AsRef<str> for CategoryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for CategoryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Check that `color` is a hex colour code such as `#fff` or `#1f2937`.
///
/// # Errors
///
/// Returns [Error::InvalidColor] for anything else.
pub fn validate_color(color: &str) -> Result<String, Error> {
    let color = color.trim();

    let is_valid = color
        .strip_prefix('#')
        .is_some_and(|digits| {
            matches!(digits.len(), 3 | 6) && digits.chars().all(|c| c.is_ascii_hexdigit())
        });

    if is_valid {
        Ok(color.to_owned())
    } else {
        Err(Error::InvalidColor(color.to_owned()))
    }
}

/// A category for grouping transactions (e.g., 'Groceries', 'Salary').
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    /// The ID of the category.
    pub id: CategoryId,
    /// Who can see and use the category.
    pub owner: CategoryOwner,
    /// The display name, unique among the owner's categories.
    pub name: CategoryName,
    /// Whether the category is for income or expenses.
    pub kind: Kind,
    /// A hex colour code used when charting the category.
    pub color: Option<String>,
    /// An emoji shown next to the name.
    pub icon: Option<String>,
    /// Whether the category is one of the seeded defaults.
    pub is_default: bool,
    /// Archived categories cannot be used for new transactions.
    pub is_archived: bool,
}

/// The fields needed to create a category.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCategory {
    /// The display name.
    pub name: CategoryName,
    /// Income or expense.
    pub kind: Kind,
    /// Optional hex colour code.
    pub color: Option<String>,
    /// Optional emoji.
    pub icon: Option<String>,
}

/// The changes to apply to an existing category. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryChanges {
    /// A new name.
    pub name: Option<CategoryName>,
    /// A new colour.
    pub color: Option<String>,
    /// A new emoji.
    pub icon: Option<String>,
    /// Archive or restore the category.
    pub is_archived: Option<bool>,
    /// Switch between income and expense.
    pub kind: Option<Kind>,
}

/// JSON body for creating a category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryForm {
    /// The display name.
    pub name: String,
    /// Income or expense.
    #[serde(rename = "type")]
    pub kind: Kind,
    /// Optional hex colour code.
    #[serde(default)]
    pub color: Option<String>,
    /// Optional emoji.
    #[serde(default)]
    pub emoji: Option<String>,
}

impl CategoryForm {
    /// Validate the form.
    ///
    /// # Errors
    ///
    /// Returns [Error::EmptyName] or [Error::InvalidColor] for invalid fields.
    pub fn validate(self) -> Result<NewCategory, Error> {
        Ok(NewCategory {
            name: CategoryName::new(&self.name)?,
            kind: self.kind,
            color: self.color.as_deref().map(validate_color).transpose()?,
            icon: non_blank(self.emoji),
        })
    }
}

/// JSON body for updating a category.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryUpdateForm {
    /// A new name.
    #[serde(default)]
    pub name: Option<String>,
    /// A new colour.
    #[serde(default)]
    pub color: Option<String>,
    /// A new emoji.
    #[serde(default)]
    pub emoji: Option<String>,
    /// Archive or restore the category.
    #[serde(default)]
    pub is_archived: Option<bool>,
    /// Income or expense.
    #[serde(default, rename = "type")]
    pub kind: Option<Kind>,
}

impl CategoryUpdateForm {
    /// Validate the form.
    ///
    /// # Errors
    ///
    /// Returns [Error::EmptyName] or [Error::InvalidColor] for invalid fields.
    pub fn validate(self) -> Result<CategoryChanges, Error> {
        Ok(CategoryChanges {
            name: self.name.as_deref().map(CategoryName::new).transpose()?,
            color: self.color.as_deref().map(validate_color).transpose()?,
            icon: non_blank(self.emoji),
            is_archived: self.is_archived,
            kind: self.kind,
        })
    }
}

fn non_blank(text: Option<String>) -> Option<String> {
    text.map(|text| text.trim().to_owned())
        .filter(|text| !text.is_empty())
}

/// The JSON representation of a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryResponse {
    /// The ID of the category.
    pub id: CategoryId,
    /// The display name.
    pub name: String,
    /// Income or expense.
    #[serde(rename = "type")]
    pub kind: Kind,
    /// Hex colour code.
    pub color: Option<String>,
    /// Emoji.
    pub emoji: Option<String>,
    /// Whether this is a shared default category.
    pub is_default: bool,
    /// Whether the category is archived.
    pub is_archived: bool,
}

impl From<Category> for CategoryResponse {
    fn from(category: Category) -> Self {
        Self {
            id: category.id,
            name: category.name.to_string(),
            kind: category.kind,
            color: category.color,
            emoji: category.icon,
            is_default: category.is_default,
            is_archived: category.is_archived,
        }
    }
}
