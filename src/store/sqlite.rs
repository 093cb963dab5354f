//! SQLite-backed quote log.
//!
//! Every observed quote is appended as a new row; nothing is updated or keyed by time.
//! Columns are TEXT so the provider's formatting survives the round trip.

use crate::core::{Deadline, NormalizedQuote, PersistenceError, QuoteSink};
use async_trait::async_trait;
use rusqlite::{Connection, params};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, instrument};

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS dollar_exchanges (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    code TEXT NOT NULL,
    code_in TEXT NOT NULL,
    name TEXT NOT NULL,
    high TEXT NOT NULL,
    low TEXT NOT NULL,
    var_bid TEXT NOT NULL,
    pct_change TEXT NOT NULL,
    bid TEXT NOT NULL,
    ask TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    create_date TEXT NOT NULL
)";

const INSERT_QUOTE: &str = "INSERT INTO dollar_exchanges
    (code, code_in, name, high, low, var_bid, pct_change, bid, ask, timestamp, create_date)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)";

/// Number of VM steps between cancellation checks during an insert.
const PROGRESS_STEPS: i32 = 8;

/// A persisted observation: store-assigned id plus the quote as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredQuoteRow {
    pub id: i64,
    pub quote: NormalizedQuote,
}

pub struct SqliteQuoteStore {
    path: PathBuf,
}

impl SqliteQuoteStore {
    /// Opens (creating if needed) the database at `path` and ensures the table exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PersistenceError> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path).map_err(PersistenceError::Connect)?;
        conn.execute_batch(CREATE_TABLE).map_err(PersistenceError::Statement)?;
        info!("Quote store ready at {}", path.display());
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every stored row in insertion order.
    pub fn rows(&self) -> Result<Vec<StoredQuoteRow>, PersistenceError> {
        let conn = Connection::open(&self.path).map_err(PersistenceError::Connect)?;
        let mut stmt = conn
            .prepare(
                "SELECT id, code, code_in, name, high, low, var_bid, pct_change, bid, ask,
                        timestamp, create_date
                 FROM dollar_exchanges ORDER BY id",
            )
            .map_err(PersistenceError::Statement)?;

        let rows = stmt
            .query_map([], |row| {
                Ok(StoredQuoteRow {
                    id: row.get(0)?,
                    quote: NormalizedQuote {
                        code: row.get(1)?,
                        code_in: row.get(2)?,
                        name: row.get(3)?,
                        high: row.get(4)?,
                        low: row.get(5)?,
                        var_bid: row.get(6)?,
                        pct_change: row.get(7)?,
                        bid: row.get(8)?,
                        ask: row.get(9)?,
                        timestamp: row.get(10)?,
                        create_date: row.get(11)?,
                    },
                })
            })
            .map_err(PersistenceError::Statement)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(PersistenceError::Statement)?;
        Ok(rows)
    }
}

fn insert_quote(
    path: &Path,
    quote: &NormalizedQuote,
    deadline: Deadline,
    cancelled: Arc<AtomicBool>,
) -> Result<(), PersistenceError> {
    let conn = Connection::open(path).map_err(PersistenceError::Connect)?;
    conn.busy_timeout(deadline.remaining()).map_err(PersistenceError::Connect)?;
    conn.progress_handler(PROGRESS_STEPS, Some(move || cancelled.load(Ordering::SeqCst)));

    // Opening may already have used up the budget.
    if deadline.is_expired() {
        return Err(PersistenceError::DeadlineExceeded(deadline.budget()));
    }

    conn.execute(
        INSERT_QUOTE,
        params![
            quote.code,
            quote.code_in,
            quote.name,
            quote.high,
            quote.low,
            quote.var_bid,
            quote.pct_change,
            quote.bid,
            quote.ask,
            quote.timestamp,
            quote.create_date,
        ],
    )
    .map_err(|e| match e.sqlite_error_code() {
        Some(rusqlite::ErrorCode::OperationInterrupted) => {
            PersistenceError::DeadlineExceeded(deadline.budget())
        }
        _ => PersistenceError::Statement(e),
    })?;
    Ok(())
}

#[async_trait]
impl QuoteSink for SqliteQuoteStore {
    /// Inserts on a blocking worker with a fresh connection.
    ///
    /// When `deadline` passes the cancellation flag is raised; the progress
    /// handler aborts a statement still executing and the worker is abandoned.
    #[instrument(
        name = "PersistQuote",
        skip(self, quote, deadline),
        fields(budget_ms = deadline.budget().as_millis() as u64)
    )]
    async fn persist(
        &self,
        quote: &NormalizedQuote,
        deadline: Deadline,
    ) -> Result<(), PersistenceError> {
        let cancelled = Arc::new(AtomicBool::new(false));
        let worker = {
            let path = self.path.clone();
            let quote = quote.clone();
            let cancelled = Arc::clone(&cancelled);
            tokio::task::spawn_blocking(move || insert_quote(&path, &quote, deadline, cancelled))
        };

        match deadline.run(worker).await {
            Ok(joined) => {
                joined??;
                debug!("Quote row written");
                Ok(())
            }
            Err(_) => {
                cancelled.store(true, Ordering::SeqCst);
                Err(PersistenceError::DeadlineExceeded(deadline.budget()))
            }
        }
    }
}
