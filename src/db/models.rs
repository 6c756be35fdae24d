//! Database row types for the `stocks` table (migrations/0001_create_stocks.sql).
use chrono::NaiveDate;

use crate::error::AppError;
use crate::types::{PromoterPublicPercent, Sector, StockRecord};

#[derive(Debug, sqlx::FromRow)]
pub struct StockRow {
    pub id: String,
    pub name: String,
    pub sector: String,
    pub listed_date: Option<NaiveDate>,
    pub total_listed_shares: i64,
    pub promoter_share: i64,
    pub public_share: i64,
    pub promoter_percent: String,
    pub public_percent: String,
    pub lock_in_period: Option<NaiveDate>,
    pub book_value: f64,
    pub eps: f64,
    pub remark: String,
}

impl TryFrom<StockRow> for StockRecord {
    type Error = AppError;

    fn try_from(row: StockRow) -> Result<Self, Self::Error> {
        let sector: Sector = row.sector.parse().map_err(|reason| AppError::CorruptRecord {
            id: row.id.clone(),
            reason,
        })?;
        Ok(StockRecord {
            id: row.id,
            name: row.name,
            sector,
            listed_date: row.listed_date,
            total_listed_shares: row.total_listed_shares,
            promoter_share: row.promoter_share,
            public_share: row.public_share,
            promoter_public_percent: PromoterPublicPercent {
                promoter: row.promoter_percent,
                public: row.public_percent,
            },
            lock_in_period: row.lock_in_period,
            book_value: row.book_value,
            eps: row.eps,
            remark: row.remark,
        })
    }
}
