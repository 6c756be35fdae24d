use std::time::{SystemTime, UNIX_EPOCH};

use rand::distributions::Alphanumeric;
use rand::Rng;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::debug;

use crate::db::models::StockRow;
use crate::error::{AppError, Result};
use crate::types::StockRecord;

/// Length of store-assigned record identifiers.
pub const RECORD_ID_LEN: usize = 20;

const SELECT_COLUMNS: &str = r#"
    SELECT id, name, sector, listed_date, total_listed_shares, promoter_share,
           public_share, promoter_percent, public_percent, lock_in_period,
           book_value, eps, remark
    FROM stocks
"#;

/// Open (creating if needed) the SQLite database and apply migrations.
pub async fn connect(db_path: &str) -> Result<SqlitePool> {
    let pool = if db_path == ":memory:" {
        // Every connection to `:memory:` is a separate database, so pin to one.
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?
    } else {
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        SqlitePool::connect_with(options).await?
    };
    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(pool)
}

/// CRUD over the `stocks` collection. Every write is a single statement with
/// no version check: concurrent edits of one record are last-write-wins.
#[derive(Clone)]
pub struct StockRepo {
    pool: SqlitePool,
}

impl StockRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a record under a freshly assigned id and return it with that id.
    pub async fn create(&self, mut record: StockRecord) -> Result<StockRecord> {
        record.id = new_record_id();
        let now = now_ms();

        sqlx::query(
            r#"
            INSERT INTO stocks (
                id, name, sector, listed_date, total_listed_shares, promoter_share,
                public_share, promoter_percent, public_percent, lock_in_period,
                book_value, eps, remark, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.name)
        .bind(record.sector.as_str())
        .bind(record.listed_date)
        .bind(record.total_listed_shares)
        .bind(record.promoter_share)
        .bind(record.public_share)
        .bind(&record.promoter_public_percent.promoter)
        .bind(&record.promoter_public_percent.public)
        .bind(record.lock_in_period)
        .bind(record.book_value)
        .bind(record.eps)
        .bind(&record.remark)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        debug!(id = %record.id, name = %record.name, "stock created");
        Ok(record)
    }

    pub async fn get(&self, id: &str) -> Result<Option<StockRecord>> {
        let row = sqlx::query_as::<_, StockRow>(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(StockRecord::try_from).transpose()
    }

    /// Replace every field of an existing record. `NotFound` if `id` is unknown.
    pub async fn update(&self, id: &str, record: &StockRecord) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE stocks SET
                name = ?, sector = ?, listed_date = ?, total_listed_shares = ?,
                promoter_share = ?, public_share = ?, promoter_percent = ?,
                public_percent = ?, lock_in_period = ?, book_value = ?, eps = ?,
                remark = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&record.name)
        .bind(record.sector.as_str())
        .bind(record.listed_date)
        .bind(record.total_listed_shares)
        .bind(record.promoter_share)
        .bind(record.public_share)
        .bind(&record.promoter_public_percent.promoter)
        .bind(&record.promoter_public_percent.public)
        .bind(record.lock_in_period)
        .bind(record.book_value)
        .bind(record.eps)
        .bind(&record.remark)
        .bind(now_ms())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("No stock found with id {id}")));
        }
        Ok(())
    }

    /// Delete by id. `NotFound` if nothing was deleted.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM stocks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("No stock found with id {id}")));
        }
        Ok(())
    }

    /// All records in insertion order.
    pub async fn list(&self) -> Result<Vec<StockRecord>> {
        let rows = sqlx::query_as::<_, StockRow>(&format!(
            "{SELECT_COLUMNS} ORDER BY created_at ASC, rowid ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(StockRecord::try_from).collect()
    }

    pub async fn count(&self) -> Result<i64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stocks")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }
}

pub fn new_record_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RECORD_ID_LEN)
        .map(char::from)
        .collect()
}

pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
