use rusqlite::{Connection, Result};
use std::collections::HashMap;

/// Current database schema version
const CURRENT_VERSION: u32 = 2;

/// Migration system for managing database schema versions
pub struct MigrationManager;

impl MigrationManager {
    /// Initialize the database with the current schema
    /// This creates the schema_version table and applies all migrations
    pub fn initialize(conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            )",
            [],
        )?;

        let current_version = Self::get_version(conn)?;

        for version in (current_version + 1)..=CURRENT_VERSION {
            Self::apply_migration(conn, version)?;
        }

        Ok(())
    }

    /// Apply a specific migration by version number
    fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
        let migrations = get_migrations();
        if let Some(migration) = migrations.get(&version) {
            let tx = conn.unchecked_transaction()?;
            migration(&tx)?;
            tx.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                [version],
            )?;
            tx.commit()?;
            log::debug!("Applied schema migration v{}", version);
            Ok(())
        } else {
            Err(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_MISUSE),
                Some(format!("No migration found for version {}", version)),
            ))
        }
    }

    /// Get the current schema version
    pub fn get_version(conn: &Connection) -> Result<u32> {
        conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
    }
}

type Migration = fn(&rusqlite::Transaction) -> Result<(), rusqlite::Error>;

/// Get all migrations indexed by version
fn get_migrations() -> HashMap<u32, Migration> {
    let mut migrations: HashMap<u32, Migration> = HashMap::new();
    migrations.insert(1, migration_v1);
    migrations.insert(2, migration_v2);
    migrations
}

/// Migration v1: deals, clients, specifications, quotes, status history, profiles
fn migration_v1(tx: &rusqlite::Transaction) -> Result<(), rusqlite::Error> {
    tx.execute(
        "CREATE TABLE clients (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            company TEXT NULL,
            email TEXT NULL,
            created_ts INTEGER NOT NULL
        )",
        [],
    )?;

    // current_stage is free text: older rows carry pre-M-code values
    tx.execute(
        "CREATE TABLE deals (
            id INTEGER PRIMARY KEY,
            uuid TEXT NOT NULL UNIQUE,
            title TEXT NOT NULL,
            client_id INTEGER NULL REFERENCES clients(id),
            current_stage TEXT NOT NULL,
            created_ts INTEGER NOT NULL,
            modified_ts INTEGER NOT NULL
        )",
        [],
    )?;
    tx.execute("CREATE INDEX idx_deals_client_id ON deals(client_id)", [])?;
    tx.execute("CREATE INDEX idx_deals_current_stage ON deals(current_stage)", [])?;

    tx.execute(
        "CREATE TABLE specifications (
            deal_id INTEGER PRIMARY KEY REFERENCES deals(id) ON DELETE CASCADE,
            product TEXT NULL,
            material TEXT NULL,
            dimensions TEXT NULL,
            quantity INTEGER NULL
        )",
        [],
    )?;

    tx.execute(
        "CREATE TABLE quotes (
            id INTEGER PRIMARY KEY,
            deal_id INTEGER NOT NULL REFERENCES deals(id) ON DELETE CASCADE,
            unit_price_usd REAL NOT NULL CHECK(unit_price_usd >= 0),
            quantity INTEGER NOT NULL CHECK(quantity > 0),
            created_ts INTEGER NOT NULL
        )",
        [],
    )?;
    tx.execute("CREATE INDEX idx_quotes_deal ON quotes(deal_id, created_ts)", [])?;

    tx.execute(
        "CREATE TABLE status_history (
            id INTEGER PRIMARY KEY,
            deal_id INTEGER NOT NULL REFERENCES deals(id),
            previous_stage TEXT NULL,
            new_stage TEXT NOT NULL,
            note TEXT NOT NULL,
            actor TEXT NULL,
            created_ts INTEGER NOT NULL
        )",
        [],
    )?;
    tx.execute(
        "CREATE INDEX idx_status_history_deal ON status_history(deal_id, created_ts)",
        [],
    )?;

    // History is append-only
    tx.execute(
        "CREATE TRIGGER status_history_no_update
         BEFORE UPDATE ON status_history
         BEGIN
             SELECT RAISE(ABORT, 'status_history is append-only');
         END",
        [],
    )?;
    tx.execute(
        "CREATE TRIGGER status_history_no_delete
         BEFORE DELETE ON status_history
         BEGIN
             SELECT RAISE(ABORT, 'status_history is append-only');
         END",
        [],
    )?;

    tx.execute(
        "CREATE TABLE profiles (
            id INTEGER PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            display_name TEXT NOT NULL,
            role TEXT NOT NULL CHECK(role IN ('admin','sales','factory','logistics','viewer')),
            created_ts INTEGER NOT NULL,
            modified_ts INTEGER NOT NULL
        )",
        [],
    )?;

    Ok(())
}

/// Migration v2: exchange-rate cache and observation history
fn migration_v2(tx: &rusqlite::Transaction) -> Result<(), rusqlite::Error> {
    tx.execute(
        "CREATE TABLE rate_cache (
            base TEXT NOT NULL,
            quote TEXT NOT NULL,
            rate REAL NOT NULL,
            source TEXT NOT NULL,
            fetched_ts INTEGER NOT NULL,
            PRIMARY KEY(base, quote)
        )",
        [],
    )?;

    tx.execute(
        "CREATE TABLE rate_history (
            id INTEGER PRIMARY KEY,
            base TEXT NOT NULL,
            quote TEXT NOT NULL,
            rate REAL NOT NULL,
            source TEXT NOT NULL,
            fetched_ts INTEGER NOT NULL
        )",
        [],
    )?;
    tx.execute(
        "CREATE INDEX idx_rate_history_pair_ts ON rate_history(base, quote, fetched_ts)",
        [],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys=ON").unwrap();
        MigrationManager::initialize(&conn).unwrap();
        conn
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let conn = fresh();
        MigrationManager::initialize(&conn).unwrap();
        assert_eq!(MigrationManager::get_version(&conn).unwrap(), CURRENT_VERSION);
    }

    #[test]
    fn test_status_history_rejects_update_and_delete() {
        let conn = fresh();
        conn.execute(
            "INSERT INTO deals (uuid, title, current_stage, created_ts, modified_ts)
             VALUES ('u1', 'Deal', 'M01', 0, 0)",
            [],
        ).unwrap();
        conn.execute(
            "INSERT INTO status_history (deal_id, previous_stage, new_stage, note, created_ts)
             VALUES (1, NULL, 'M01', 'created', 0)",
            [],
        ).unwrap();

        let update = conn.execute("UPDATE status_history SET note = 'edited'", []);
        assert!(update.is_err());
        let delete = conn.execute("DELETE FROM status_history", []);
        assert!(delete.is_err());

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM status_history", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_profile_role_check() {
        let conn = fresh();
        let result = conn.execute(
            "INSERT INTO profiles (email, display_name, role, created_ts, modified_ts)
             VALUES ('a@b.jp', 'A', 'owner', 0, 0)",
            [],
        );
        assert!(result.is_err());
    }
}
