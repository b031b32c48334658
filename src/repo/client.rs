use rusqlite::{Connection, OptionalExtension};
use crate::models::Client;
use anyhow::{Context, Result};

/// Client repository for database operations
pub struct ClientRepo;

impl ClientRepo {
    /// Create a new client
    pub fn create(conn: &Connection, name: &str, company: Option<&str>, email: Option<&str>) -> Result<Client> {
        let mut client = Client::new(name.to_string());
        client.company = company.map(str::to_string);
        client.email = email.map(str::to_string);

        conn.execute(
            "INSERT INTO clients (name, company, email, created_ts) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![client.name, client.company, client.email, client.created_ts],
        )
        .with_context(|| format!("Failed to create client: {}", name))?;

        Ok(Client {
            id: Some(conn.last_insert_rowid()),
            ..client
        })
    }

    /// Get client by ID
    pub fn get_by_id(conn: &Connection, id: i64) -> Result<Option<Client>> {
        conn.query_row(
            "SELECT id, name, company, email, created_ts FROM clients WHERE id = ?1",
            [id],
            |row| {
                Ok(Client {
                    id: Some(row.get(0)?),
                    name: row.get(1)?,
                    company: row.get(2)?,
                    email: row.get(3)?,
                    created_ts: row.get(4)?,
                })
            },
        )
        .optional()
        .context("Failed to query client")
    }

    /// List all clients ordered by name
    pub fn list(conn: &Connection) -> Result<Vec<Client>> {
        let mut stmt = conn.prepare(
            "SELECT id, name, company, email, created_ts FROM clients ORDER BY name, id"
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Client {
                id: Some(row.get(0)?),
                name: row.get(1)?,
                company: row.get(2)?,
                email: row.get(3)?,
                created_ts: row.get(4)?,
            })
        })?;

        let mut clients = Vec::new();
        for row in rows {
            clients.push(row?);
        }
        Ok(clients)
    }
}
