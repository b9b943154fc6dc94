//! Filtered, paginated listing of a user's transactions.

use rusqlite::{Connection, ToSql};
use serde::Deserialize;
use time::Date;

use crate::{
    Error, UserID,
    category::Kind,
    database_id::CategoryId,
    period::Interval,
    timestamp::parse_date,
    transaction::{Transaction, core::map_transaction_row},
};

/// The number of transactions returned when the client does not ask for a limit.
pub const DEFAULT_LIMIT: u32 = 100;
/// The most transactions a single request can return.
pub const MAX_LIMIT: u32 = 500;

/// The query string accepted by the transaction listing endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionQuery {
    /// The first day to include, "YYYY-MM-DD".
    pub start: Option<String>,
    /// The last day to include, "YYYY-MM-DD".
    pub end: Option<String>,
    /// Only include transactions in this category.
    pub category_id: Option<CategoryId>,
    /// Only include income or expenses.
    #[serde(rename = "type")]
    pub kind: Option<Kind>,
    /// Case-insensitive text to look for in the title or note.
    pub q: Option<String>,
    /// The page size, clamped to `1..=500`.
    pub limit: Option<u32>,
    /// The number of transactions to skip.
    pub offset: Option<u32>,
}

/// A validated [TransactionQuery].
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionFilter {
    /// Include transactions on or after this day.
    pub start: Option<Date>,
    /// Include transactions on or before this day.
    pub end: Option<Date>,
    /// Include only this category.
    pub category_id: Option<CategoryId>,
    /// Include only this kind.
    pub kind: Option<Kind>,
    /// Lower case text to look for in the title or note.
    pub search: Option<String>,
    /// The maximum number of transactions to return.
    pub limit: u32,
    /// The number of matching transactions to skip.
    pub offset: u32,
}

impl Default for TransactionFilter {
    fn default() -> Self {
        Self {
            start: None,
            end: None,
            category_id: None,
            kind: None,
            search: None,
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl TryFrom<TransactionQuery> for TransactionFilter {
    type Error = Error;

    fn try_from(query: TransactionQuery) -> Result<Self, Self::Error> {
        let start = query.start.as_deref().map(parse_date).transpose()?;
        let end = query.end.as_deref().map(parse_date).transpose()?;
        let search = query
            .q
            .map(|q| q.trim().to_lowercase())
            .filter(|q| !q.is_empty());

        Ok(Self {
            start,
            end,
            category_id: query.category_id,
            kind: query.kind,
            search,
            limit: query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
            offset: query.offset.unwrap_or(0),
        })
    }
}

/// Get the user's live transactions matching `filter`, most recent first.
///
/// Transactions on the same day are ordered by ID, newest first.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn list_transactions(
    user_id: UserID,
    filter: &TransactionFilter,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let user_id = user_id.as_i64();
    let mut clauses = vec!["user_id = :user_id", "deleted_at IS NULL"];
    let mut params: Vec<(&str, &dyn ToSql)> = vec![(":user_id", &user_id)];

    let start_param = filter
        .start
        .map(|start| Interval::from_days(start, start).start_param());
    let end_param = filter
        .end
        .map(|end| Interval::from_days(end, end).end_param());

    if let Some(start) = &start_param {
        clauses.push("occurred_at >= :start");
        params.push((":start", start));
    }
    if let Some(end) = &end_param {
        clauses.push("occurred_at <= :end");
        params.push((":end", end));
    }
    if let Some(category_id) = &filter.category_id {
        clauses.push("category_id = :category_id");
        params.push((":category_id", category_id));
    }
    if let Some(kind) = &filter.kind {
        clauses.push("kind = :kind");
        params.push((":kind", kind));
    }
    let pattern = filter.search.as_ref().map(|search| format!("%{search}%"));
    if let Some(pattern) = &pattern {
        clauses.push("(LOWER(title) LIKE :pattern OR LOWER(IFNULL(note, '')) LIKE :pattern)");
        params.push((":pattern", pattern));
    }
    params.push((":limit", &filter.limit));
    params.push((":offset", &filter.offset));

    let query = format!(
        "SELECT id, user_id, category_id, kind, amount, occurred_at, title, note, deleted_at
         FROM \"transaction\"
         WHERE {}
         ORDER BY occurred_at DESC, id DESC
         LIMIT :limit OFFSET :offset",
        clauses.join(" AND ")
    );

    connection
        .prepare(&query)?
        .query_map(params.as_slice(), map_transaction_row)?
        .map(|transaction_result| transaction_result.map_err(|error| error.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use crate::{
        Error,
        category::{CategoryOwner, Kind, create_category},
        test_utils::{
            create_test_user, create_test_user_with_email, get_test_connection,
            new_test_category,
        },
        transaction::{Transaction, create_transaction, delete_transaction},
    };

    use super::{MAX_LIMIT, TransactionFilter, TransactionQuery, list_transactions};

    fn titles(transactions: Vec<Transaction>) -> Vec<String> {
        transactions
            .into_iter()
            .map(|transaction| transaction.title)
            .collect()
    }

    #[test]
    fn lists_newest_first_and_skips_deleted() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);
        for (title, date) in [
            ("first", date!(2025 - 09 - 01)),
            ("second", date!(2025 - 09 - 02)),
            ("also second", date!(2025 - 09 - 02)),
        ] {
            create_transaction(
                user.id,
                Transaction::build(1.0, date, title).kind(Some(Kind::Expense)),
                &conn,
            )
            .unwrap();
        }
        let deleted = create_transaction(
            user.id,
            Transaction::build(1.0, date!(2025 - 09 - 03), "deleted").kind(Some(Kind::Expense)),
            &conn,
        )
        .unwrap();
        delete_transaction(user.id, deleted.id, &conn).unwrap();

        let got = list_transactions(user.id, &TransactionFilter::default(), &conn).unwrap();

        assert_eq!(titles(got), ["also second", "second", "first"]);
    }

    #[test]
    fn filters_by_inclusive_date_range() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);
        for day in 1..=5 {
            let date = date!(2025 - 09 - 01).replace_day(day).unwrap();
            create_transaction(
                user.id,
                Transaction::build(1.0, date, &format!("day {day}")).kind(Some(Kind::Expense)),
                &conn,
            )
            .unwrap();
        }

        let filter = TransactionFilter {
            start: Some(date!(2025 - 09 - 02)),
            end: Some(date!(2025 - 09 - 04)),
            ..Default::default()
        };
        let got = list_transactions(user.id, &filter, &conn).unwrap();

        assert_eq!(titles(got), ["day 4", "day 3", "day 2"]);
    }

    #[test]
    fn filters_by_category_kind_and_text() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);
        let pets = create_category(
            CategoryOwner::User(user.id),
            new_test_category("Pets", Kind::Expense),
            &conn,
        )
        .unwrap();
        create_transaction(
            user.id,
            Transaction::build(5.0, date!(2025 - 09 - 01), "Dog food")
                .category_id(Some(pets.id)),
            &conn,
        )
        .unwrap();
        create_transaction(
            user.id,
            Transaction::build(5.0, date!(2025 - 09 - 01), "Coffee")
                .note(Some("with the DOG".to_owned()))
                .kind(Some(Kind::Expense)),
            &conn,
        )
        .unwrap();
        create_transaction(
            user.id,
            Transaction::build(5.0, date!(2025 - 09 - 01), "Pay").kind(Some(Kind::Income)),
            &conn,
        )
        .unwrap();

        let by_category = TransactionFilter {
            category_id: Some(pets.id),
            ..Default::default()
        };
        let by_kind = TransactionFilter {
            kind: Some(Kind::Income),
            ..Default::default()
        };
        let by_text = TransactionFilter {
            search: Some("dog".to_owned()),
            ..Default::default()
        };

        assert_eq!(
            titles(list_transactions(user.id, &by_category, &conn).unwrap()),
            ["Dog food"]
        );
        assert_eq!(
            titles(list_transactions(user.id, &by_kind, &conn).unwrap()),
            ["Pay"]
        );
        let mut matched = titles(list_transactions(user.id, &by_text, &conn).unwrap());
        matched.sort();
        assert_eq!(matched, ["Coffee", "Dog food"]);
    }

    #[test]
    fn paginates_with_limit_and_offset() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);
        for day in 1..=5 {
            let date = date!(2025 - 09 - 01).replace_day(day).unwrap();
            create_transaction(
                user.id,
                Transaction::build(1.0, date, &format!("day {day}")).kind(Some(Kind::Expense)),
                &conn,
            )
            .unwrap();
        }

        let filter = TransactionFilter {
            limit: 2,
            offset: 1,
            ..Default::default()
        };
        let got = list_transactions(user.id, &filter, &conn).unwrap();

        assert_eq!(titles(got), ["day 4", "day 3"]);
    }

    #[test]
    fn excludes_other_users() {
        let conn = get_test_connection();
        let ada = create_test_user(&conn);
        let bob = create_test_user_with_email("bob@example.com", &conn);
        create_transaction(
            ada.id,
            Transaction::build(1.0, date!(2025 - 09 - 01), "Ada's").kind(Some(Kind::Expense)),
            &conn,
        )
        .unwrap();

        let got = list_transactions(bob.id, &TransactionFilter::default(), &conn).unwrap();

        assert!(got.is_empty());
    }

    #[test]
    fn query_clamps_limit_and_parses_dates() {
        let query = TransactionQuery {
            start: Some("2025-09-01".to_owned()),
            limit: Some(10_000),
            q: Some("  ".to_owned()),
            ..Default::default()
        };

        let filter = TransactionFilter::try_from(query).unwrap();

        assert_eq!(filter.start, Some(date!(2025 - 09 - 01)));
        assert_eq!(filter.limit, MAX_LIMIT);
        assert_eq!(filter.search, None);
    }

    #[test]
    fn query_rejects_bad_dates() {
        let query = TransactionQuery {
            end: Some("yesterday".to_owned()),
            ..Default::default()
        };

        assert_eq!(
            TransactionFilter::try_from(query),
            Err(Error::InvalidDate("yesterday".to_owned()))
        );
    }
}
