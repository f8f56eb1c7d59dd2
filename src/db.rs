// src/db.rs
use crate::error::{AppError, Result};
use crate::models::{Direction, Transaction, User, UserId};
use chrono::{DateTime, SecondsFormat, Utc};
use log::{error, info};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    hash TEXT NOT NULL,
    cash TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS history (
    user_id INTEGER NOT NULL,
    symbol TEXT NOT NULL,
    price TEXT NOT NULL,
    quantity INTEGER NOT NULL CHECK (quantity != 0),
    date_time TEXT NOT NULL,
    FOREIGN KEY (user_id) REFERENCES users (id)
);

CREATE INDEX IF NOT EXISTS idx_history_user_symbol ON history (user_id, symbol);
"#;

/// Shared handle to the SQLite store.
#[derive(Clone)]
pub struct Database {
    connection: Arc<Mutex<Connection>>,
}

impl Database {
    pub async fn open(path: &Path) -> Result<Self> {
        info!("Opening database at {:?}", path);
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::init(conn)
    }

    pub async fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        if let Err(e) = conn.execute_batch(SCHEMA) {
            error!("Failed to create schema: {}", e);
            return Err(e.into());
        }
        Ok(Database {
            connection: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs read-only work against the connection.
    pub async fn read<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Connection) -> Result<R>,
    {
        let conn = self.connection.lock().await;
        f(&conn)
    }

    /// Runs `f` inside an immediate transaction. The write lock is taken
    /// before the first read, so a balance read inside `f` cannot go stale.
    /// Any error rolls the whole unit back.
    pub async fn transaction<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Connection) -> Result<R>,
    {
        let mut conn = self.connection.lock().await;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let result = f(&tx)?;
        tx.commit()?;
        Ok(result)
    }
}

/// A user row including the password hash, never sent to clients.
pub struct UserRecord {
    pub user: User,
    pub hash: String,
}

fn decimal_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(idx)?;
    Decimal::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn timestamp_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRecord> {
    Ok(UserRecord {
        user: User {
            id: UserId(row.get(0)?),
            username: row.get(1)?,
            cash: decimal_column(row, 3)?,
        },
        hash: row.get(2)?,
    })
}

pub fn insert_user(conn: &Connection, username: &str, hash: &str, cash: Decimal) -> Result<User> {
    let inserted = conn.execute(
        "INSERT INTO users (username, hash, cash) VALUES (?1, ?2, ?3)",
        params![username, hash, cash.to_string()],
    );
    match inserted {
        Ok(_) => Ok(User {
            id: UserId(conn.last_insert_rowid()),
            username: username.to_string(),
            cash,
        }),
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Err(AppError::Validation("username taken".into()))
        }
        Err(e) => Err(e.into()),
    }
}

pub fn username_exists(conn: &Connection, username: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE username = ?1",
        [username],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn find_user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRecord>> {
    let record = conn
        .query_row(
            "SELECT id, username, hash, cash FROM users WHERE username = ?1",
            [username],
            user_from_row,
        )
        .optional()?;
    Ok(record)
}

pub fn get_cash(conn: &Connection, user_id: UserId) -> Result<Decimal> {
    conn.query_row(
        "SELECT cash FROM users WHERE id = ?1",
        [user_id.0],
        |row| decimal_column(row, 0),
    )
    .optional()?
    .ok_or_else(|| AppError::NotFound(format!("user {}", user_id)))
}

pub fn set_cash(conn: &Connection, user_id: UserId, cash: Decimal) -> Result<()> {
    if cash.is_sign_negative() && !cash.is_zero() {
        return Err(AppError::Internal(format!(
            "refusing to store negative cash {} for user {}",
            cash, user_id
        )));
    }
    let updated = conn.execute(
        "UPDATE users SET cash = ?1 WHERE id = ?2",
        params![cash.to_string(), user_id.0],
    )?;
    if updated == 0 {
        return Err(AppError::NotFound(format!("user {}", user_id)));
    }
    Ok(())
}

pub fn insert_transaction(
    conn: &Connection,
    user_id: UserId,
    symbol: &str,
    price: Decimal,
    quantity: i64,
    timestamp: DateTime<Utc>,
) -> Result<()> {
    if quantity == 0 || price <= Decimal::ZERO {
        return Err(AppError::Internal(format!(
            "invalid ledger row: {} x {} @ {}",
            symbol, quantity, price
        )));
    }
    conn.execute(
        "INSERT INTO history (user_id, symbol, price, quantity, date_time) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            user_id.0,
            symbol,
            price.to_string(),
            quantity,
            timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
        ],
    )?;
    Ok(())
}

/// Net shares per symbol, keeping only positive positions.
pub fn holdings(conn: &Connection, user_id: UserId) -> Result<BTreeMap<String, i64>> {
    let mut stmt = conn.prepare(
        "SELECT symbol, SUM(quantity) AS shares
         FROM history
         WHERE user_id = ?1
         GROUP BY symbol
         HAVING SUM(quantity) > 0
         ORDER BY symbol",
    )?;
    let rows = stmt
        .query_map([user_id.0], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?
        .collect::<std::result::Result<BTreeMap<_, _>, _>>()?;
    Ok(rows)
}

pub fn transactions(conn: &Connection, user_id: UserId) -> Result<Vec<Transaction>> {
    let mut stmt = conn.prepare(
        "SELECT symbol, price, quantity, date_time
         FROM history
         WHERE user_id = ?1
         ORDER BY date_time ASC, rowid ASC",
    )?;
    let rows = stmt
        .query_map([user_id.0], |row| {
            let quantity: i64 = row.get(2)?;
            Ok(Transaction {
                symbol: row.get(0)?,
                price: decimal_column(row, 1)?,
                quantity,
                timestamp: timestamp_column(row, 3)?,
                direction: Direction::from_quantity(quantity),
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
