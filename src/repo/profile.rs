use rusqlite::{Connection, OptionalExtension};
use crate::models::{Role, UserProfile};
use anyhow::{Context, Result};

/// User profile repository
pub struct ProfileRepo;

impl ProfileRepo {
    /// Create or update the profile for an email address
    pub fn upsert(conn: &Connection, email: &str, display_name: &str, role: Role) -> Result<UserProfile> {
        let now = chrono::Utc::now().timestamp();
        conn.execute(
            "INSERT INTO profiles (email, display_name, role, created_ts, modified_ts)
             VALUES (?1, ?2, ?3, ?4, ?4)
             ON CONFLICT(email) DO UPDATE SET
                display_name = excluded.display_name,
                role = excluded.role,
                modified_ts = excluded.modified_ts",
            rusqlite::params![email, display_name, role.as_str(), now],
        )
        .with_context(|| format!("Failed to save profile for {}", email))?;

        Self::get_by_email(conn, email)?
            .ok_or_else(|| anyhow::anyhow!("Profile for {} missing after save", email))
    }

    /// Get profile by email
    pub fn get_by_email(conn: &Connection, email: &str) -> Result<Option<UserProfile>> {
        conn.query_row(
            "SELECT id, email, display_name, role, created_ts, modified_ts FROM profiles WHERE email = ?1",
            [email],
            |row| {
                let role: String = row.get(3)?;
                Ok(UserProfile {
                    id: Some(row.get(0)?),
                    email: row.get(1)?,
                    display_name: row.get(2)?,
                    role: Role::from_str(&role).unwrap_or(Role::Viewer),
                    created_ts: row.get(4)?,
                    modified_ts: row.get(5)?,
                })
            },
        )
        .optional()
        .context("Failed to query profile")
    }

    /// Display name for an actor email, falling back to the email itself
    pub fn display_name_for(conn: &Connection, email: &str) -> String {
        match Self::get_by_email(conn, email) {
            Ok(Some(profile)) => profile.display_name,
            Ok(None) => email.to_string(),
            Err(e) => {
                log::warn!("Profile lookup for {} failed: {:#}", email, e);
                email.to_string()
            }
        }
    }
}
