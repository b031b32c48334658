use rusqlite::{Connection, OptionalExtension, Row};
use crate::models::{Deal, DealRow, Quote, Specification, StageCode, StageValue, StatusHistoryEntry};
use crate::repo::HistoryRepo;
use anyhow::{Context, Result};

const DEAL_COLUMNS: &str = "d.id, d.uuid, d.title, d.client_id, d.current_stage, d.created_ts, d.modified_ts";

fn row_to_deal(row: &Row) -> rusqlite::Result<Deal> {
    let stage: String = row.get(4)?;
    Ok(Deal {
        id: Some(row.get(0)?),
        uuid: row.get(1)?,
        title: row.get(2)?,
        client_id: row.get(3)?,
        current_stage: StageValue::parse(&stage),
        created_ts: row.get(5)?,
        modified_ts: row.get(6)?,
    })
}

/// Deal repository for database operations
///
/// Stage changes go through `workflow::SqliteTransitionApplier`; the only
/// stage write here is the initial stage at creation.
pub struct DealRepo;

impl DealRepo {
    /// Create a deal at its initial stage and record the creation in history
    pub fn create(
        conn: &Connection,
        title: &str,
        client_id: Option<i64>,
        initial_stage: StageCode,
        actor: Option<&str>,
    ) -> Result<Deal> {
        let mut deal = Deal::new(title.to_string(), initial_stage);
        deal.client_id = client_id;

        let tx = conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO deals (uuid, title, client_id, current_stage, created_ts, modified_ts)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                deal.uuid,
                deal.title,
                deal.client_id,
                deal.current_stage.as_stored(),
                deal.created_ts,
                deal.modified_ts,
            ],
        )
        .with_context(|| format!("Failed to create deal: {}", title))?;
        let id = tx.last_insert_rowid();

        let entry = StatusHistoryEntry {
            created_ts: deal.created_ts,
            ..StatusHistoryEntry::new(id, None, initial_stage, "Deal created".to_string(), actor.map(str::to_string))
        };
        HistoryRepo::append(&tx, &entry)?;
        tx.commit()?;

        log::debug!("Created deal {} at {}", id, initial_stage);
        Ok(Deal {
            id: Some(id),
            ..deal
        })
    }

    /// Get deal by ID
    pub fn get_by_id(conn: &Connection, id: i64) -> Result<Option<Deal>> {
        let sql = format!("SELECT {} FROM deals d WHERE d.id = ?1", DEAL_COLUMNS);
        conn.query_row(&sql, [id], row_to_deal)
            .optional()
            .context("Failed to query deal")
    }

    /// Write a new current stage. Callers must also append history in the same transaction.
    pub(crate) fn set_stage(conn: &Connection, id: i64, stage: StageCode, modified_ts: i64) -> Result<usize> {
        conn.execute(
            "UPDATE deals SET current_stage = ?1, modified_ts = ?2 WHERE id = ?3",
            rusqlite::params![stage.as_str(), modified_ts, id],
        )
        .with_context(|| format!("Failed to update stage of deal {}", id))
    }

    /// Set (replace) the specification for a deal
    pub fn set_specification(conn: &Connection, spec: &Specification) -> Result<()> {
        conn.execute(
            "INSERT INTO specifications (deal_id, product, material, dimensions, quantity)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(deal_id) DO UPDATE SET
                product = excluded.product,
                material = excluded.material,
                dimensions = excluded.dimensions,
                quantity = excluded.quantity",
            rusqlite::params![spec.deal_id, spec.product, spec.material, spec.dimensions, spec.quantity],
        )
        .with_context(|| format!("Failed to save specification for deal {}", spec.deal_id))?;
        Ok(())
    }

    pub fn get_specification(conn: &Connection, deal_id: i64) -> Result<Option<Specification>> {
        conn.query_row(
            "SELECT deal_id, product, material, dimensions, quantity FROM specifications WHERE deal_id = ?1",
            [deal_id],
            |row| {
                Ok(Specification {
                    deal_id: row.get(0)?,
                    product: row.get(1)?,
                    material: row.get(2)?,
                    dimensions: row.get(3)?,
                    quantity: row.get(4)?,
                })
            },
        )
        .optional()
        .context("Failed to query specification")
    }

    /// Add a quote to a deal
    pub fn add_quote(conn: &Connection, deal_id: i64, unit_price_usd: f64, quantity: i64) -> Result<Quote> {
        if !unit_price_usd.is_finite() || unit_price_usd < 0.0 {
            anyhow::bail!("Unit price must be a non-negative number");
        }
        if quantity <= 0 {
            anyhow::bail!("Quantity must be positive");
        }
        let now = chrono::Utc::now().timestamp();
        conn.execute(
            "INSERT INTO quotes (deal_id, unit_price_usd, quantity, created_ts) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![deal_id, unit_price_usd, quantity, now],
        )
        .with_context(|| format!("Failed to add quote for deal {}", deal_id))?;
        let id = conn.last_insert_rowid();

        conn.execute("UPDATE deals SET modified_ts = ?1 WHERE id = ?2", rusqlite::params![now, deal_id])?;

        Ok(Quote {
            id: Some(id),
            deal_id,
            unit_price_usd,
            quantity,
            created_ts: now,
        })
    }

    /// Most recent quote for a deal
    pub fn latest_quote(conn: &Connection, deal_id: i64) -> Result<Option<Quote>> {
        conn.query_row(
            "SELECT id, deal_id, unit_price_usd, quantity, created_ts FROM quotes
             WHERE deal_id = ?1 ORDER BY created_ts DESC, id DESC LIMIT 1",
            [deal_id],
            |row| {
                Ok(Quote {
                    id: Some(row.get(0)?),
                    deal_id: row.get(1)?,
                    unit_price_usd: row.get(2)?,
                    quantity: row.get(3)?,
                    created_ts: row.get(4)?,
                })
            },
        )
        .optional()
        .context("Failed to query quote")
    }

    /// List deals joined with client, specification and latest quote, ordered by ID
    pub fn list_rows(conn: &Connection) -> Result<Vec<DealRow>> {
        let sql = format!(
            "SELECT {},
                    COALESCE(c.company, c.name),
                    s.product,
                    s.quantity,
                    (SELECT q.unit_price_usd * q.quantity FROM quotes q
                     WHERE q.deal_id = d.id ORDER BY q.created_ts DESC, q.id DESC LIMIT 1)
             FROM deals d
             LEFT JOIN clients c ON c.id = d.client_id
             LEFT JOIN specifications s ON s.deal_id = d.id
             ORDER BY d.id",
            DEAL_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            Ok(DealRow {
                deal: row_to_deal(row)?,
                client_name: row.get(7)?,
                product: row.get(8)?,
                quantity: row.get(9)?,
                quote_total_usd: row.get(10)?,
            })
        })?;

        let mut deal_rows = Vec::new();
        for row in rows {
            deal_rows.push(row?);
        }
        Ok(deal_rows)
    }
}
