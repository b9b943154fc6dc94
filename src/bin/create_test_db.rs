use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::{Connection, params};
use time::{Date, Duration, OffsetDateTime, macros::format_description};

use ledgerlens::{PasswordHash, initialize_db};

/// A utility for creating a demo database for the ledgerlens server.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,

    /// The number of complete months of transactions to generate.
    #[arg(long, short, default_value_t = 3)]
    months: u8,
}

const TEST_EMAIL: &str = "test@example.com";
const TEST_PASSWORD: &str = "test";

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    let created_at = format_timestamp(OffsetDateTime::now_utc())?;

    println!("Creating test user {TEST_EMAIL} with password '{TEST_PASSWORD}'...");
    let password_hash = PasswordHash::from_raw_password(TEST_PASSWORD, PasswordHash::DEFAULT_COST)?;
    conn.execute(
        "INSERT INTO user (name, email, password, created_at) VALUES (?1, ?2, ?3, ?4)",
        params!["Test User", TEST_EMAIL, password_hash.to_string(), created_at],
    )?;
    let user_id = conn.last_insert_rowid();

    let today = OffsetDateTime::now_utc().date();
    let mut month_start = today.replace_day(1)?;

    for _ in 0..args.months {
        month_start = (month_start - Duration::days(1)).replace_day(1)?;
        println!("Adding transactions for {}-{:02}...", month_start.year(), month_start.month() as u8);
        insert_month(&conn, user_id, month_start, &created_at)?;
    }

    println!("Success!");

    Ok(())
}

fn insert_month(
    conn: &Connection,
    user_id: i64,
    month_start: Date,
    created_at: &str,
) -> Result<(), Box<dyn Error>> {
    let month_index = i64::from(month_start.month() as u8);

    let monthly = [
        ("Salary", "income", 4200.0, 1, "Pay"),
        ("Rent", "expense", 1500.0, 2, "Rent"),
        ("Utilities", "expense", 110.0 + (month_index % 3) as f64 * 15.0, 12, "Power bill"),
        ("Entertainment", "expense", 15.99, 18, "Streaming"),
    ];

    for (category, kind, amount, day, title) in monthly {
        insert_transaction(
            conn,
            user_id,
            category_id(conn, category)?,
            kind,
            amount,
            month_start.replace_day(day)?,
            title,
            created_at,
        )?;
    }

    let groceries = category_id(conn, "Groceries")?;
    let dining = category_id(conn, "Dining")?;
    let transport = category_id(conn, "Transport")?;

    for week in 0..4_i64 {
        let date = month_start + Duration::days(week * 7 + 3);
        let amount = 85.0 + ((week + month_index) % 4) as f64 * 12.5;
        insert_transaction(conn, user_id, groceries, "expense", amount, date, "Supermarket", created_at)?;

        let date = month_start + Duration::days(week * 7 + 5);
        insert_transaction(conn, user_id, dining, "expense", 32.0 + week as f64 * 4.0, date, "Dinner out", created_at)?;

        let date = month_start + Duration::days(week * 7 + 1);
        insert_transaction(conn, user_id, transport, "expense", 20.0, date, "Bus card top up", created_at)?;
    }

    let month_start_param = format!("{}-{:02}-01", month_start.year(), month_start.month() as u8);
    conn.execute(
        "INSERT INTO budget (user_id, category_id, month_start, limit_amount, notify, created_at)
         VALUES (?1, ?2, ?3, ?4, 1, ?5)",
        params![user_id, groceries, month_start_param, 400.0, created_at],
    )?;
    conn.execute(
        "INSERT INTO budget (user_id, category_id, month_start, limit_amount, notify, created_at)
         VALUES (?1, ?2, ?3, ?4, 1, ?5)",
        params![user_id, dining, month_start_param, 120.0, created_at],
    )?;
    conn.execute(
        "INSERT INTO budget (user_id, category_id, month_start, limit_amount, notify, created_at)
         VALUES (?1, NULL, ?2, ?3, 0, ?4)",
        params![user_id, month_start_param, 2500.0, created_at],
    )?;

    Ok(())
}

fn category_id(conn: &Connection, name: &str) -> Result<i64, rusqlite::Error> {
    conn.query_row(
        "SELECT id FROM category WHERE user_id IS NULL AND name = ?1",
        (name,),
        |row| row.get(0),
    )
}

#[allow(clippy::too_many_arguments)]
fn insert_transaction(
    conn: &Connection,
    user_id: i64,
    category_id: i64,
    kind: &str,
    amount: f64,
    date: Date,
    title: &str,
    created_at: &str,
) -> Result<(), Box<dyn Error>> {
    let occurred_at = format!("{} 12:00:00", date);

    conn.execute(
        "INSERT INTO \"transaction\"
            (user_id, category_id, kind, amount, occurred_at, title, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        params![user_id, category_id, kind, amount, occurred_at, title, created_at],
    )?;

    Ok(())
}

fn format_timestamp(date_time: OffsetDateTime) -> Result<String, time::error::Format> {
    date_time.format(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second]"
    ))
}
