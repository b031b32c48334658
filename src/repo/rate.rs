use rusqlite::{Connection, OptionalExtension};
use crate::models::RateQuote;
use anyhow::{Context, Result};

/// Exchange-rate cache and observation history
pub struct RateRepo;

impl RateRepo {
    /// Cached rate for a currency pair, if any
    pub fn get_cached(conn: &Connection, base: &str, quote: &str) -> Result<Option<RateQuote>> {
        conn.query_row(
            "SELECT base, quote, rate, source, fetched_ts FROM rate_cache WHERE base = ?1 AND quote = ?2",
            [base, quote],
            |row| {
                Ok(RateQuote {
                    base: row.get(0)?,
                    quote: row.get(1)?,
                    rate: row.get(2)?,
                    source: row.get(3)?,
                    fetched_ts: row.get(4)?,
                })
            },
        )
        .optional()
        .context("Failed to read rate cache")
    }

    /// Replace the cached rate and append it to the history
    pub fn store(conn: &Connection, rate: &RateQuote) -> Result<()> {
        let tx = conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO rate_cache (base, quote, rate, source, fetched_ts) VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(base, quote) DO UPDATE SET
                rate = excluded.rate, source = excluded.source, fetched_ts = excluded.fetched_ts",
            rusqlite::params![rate.base, rate.quote, rate.rate, rate.source, rate.fetched_ts],
        )?;
        tx.execute(
            "INSERT INTO rate_history (base, quote, rate, source, fetched_ts) VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![rate.base, rate.quote, rate.rate, rate.source, rate.fetched_ts],
        )?;
        tx.commit().context("Failed to store exchange rate")?;
        Ok(())
    }

    /// Observed rates since `since_ts`, oldest first
    pub fn history_since(conn: &Connection, base: &str, quote: &str, since_ts: i64) -> Result<Vec<RateQuote>> {
        let mut stmt = conn.prepare(
            "SELECT base, quote, rate, source, fetched_ts FROM rate_history
             WHERE base = ?1 AND quote = ?2 AND fetched_ts >= ?3
             ORDER BY fetched_ts, id"
        )?;
        let rows = stmt.query_map(rusqlite::params![base, quote, since_ts], |row| {
            Ok(RateQuote {
                base: row.get(0)?,
                quote: row.get(1)?,
                rate: row.get(2)?,
                source: row.get(3)?,
                fetched_ts: row.get(4)?,
            })
        })?;

        let mut history = Vec::new();
        for row in rows {
            history.push(row?);
        }
        Ok(history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbConnection;

    fn quote(rate: f64, ts: i64) -> RateQuote {
        RateQuote {
            base: "USD".to_string(),
            quote: "JPY".to_string(),
            rate,
            source: "test".to_string(),
            fetched_ts: ts,
        }
    }

    #[test]
    fn test_store_replaces_cache_and_keeps_history() {
        let conn = DbConnection::connect_in_memory().unwrap();
        assert!(RateRepo::get_cached(&conn, "USD", "JPY").unwrap().is_none());

        RateRepo::store(&conn, &quote(149.0, 100)).unwrap();
        RateRepo::store(&conn, &quote(151.5, 200)).unwrap();

        let cached = RateRepo::get_cached(&conn, "USD", "JPY").unwrap().unwrap();
        assert_eq!(cached.rate, 151.5);
        assert_eq!(cached.fetched_ts, 200);

        let history = RateRepo::history_since(&conn, "USD", "JPY", 150).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(RateRepo::history_since(&conn, "USD", "JPY", 0).unwrap().len(), 2);
    }
}
