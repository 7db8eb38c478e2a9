use crate::db::{self, Db};
use crate::error::{OnboardError, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const COLUMNS: &str = "id, name, app_url, logo_url, created_at, updated_at";

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: Uuid,
    pub name: String,
    pub app_url: Option<String>,
    pub logo_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewClient {
    pub name: String,
    #[serde(default)]
    pub app_url: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
}

/// Partial update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub app_url: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
}

fn normalize_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(OnboardError::InvalidInput(
            "client name must not be empty".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

fn map_write_err(err: rusqlite::Error, name: &str) -> OnboardError {
    if db::is_unique_violation(&err, "clients.name") {
        OnboardError::ClientNameTaken(name.to_string())
    } else {
        OnboardError::Database(err)
    }
}

impl Client {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            app_url: row.get("app_url")?,
            logo_url: row.get("logo_url")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Insert a new client. Names are unique across all clients.
    pub fn create(db: &Db, new: NewClient) -> Result<Self> {
        let name = normalize_name(&new.name)?;
        let now = Utc::now();
        let client = Self {
            id: Uuid::new_v4(),
            name,
            app_url: new.app_url.filter(|s| !s.trim().is_empty()),
            logo_url: new.logo_url.filter(|s| !s.trim().is_empty()),
            created_at: now,
            updated_at: now,
        };
        db.with_conn(|conn| {
            conn.execute(
                &format!("INSERT INTO clients ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
                params![
                    client.id,
                    client.name,
                    client.app_url,
                    client.logo_url,
                    client.created_at,
                    client.updated_at
                ],
            )
            .map_err(|e| map_write_err(e, &client.name))?;
            Ok(())
        })?;
        tracing::info!(client = %client.id, name = %client.name, "created client");
        Ok(client)
    }

    pub fn get(db: &Db, id: Uuid) -> Result<Self> {
        db.with_conn(|conn| Self::get_in(conn, id))
    }

    pub(crate) fn get_in(conn: &Connection, id: Uuid) -> Result<Self> {
        conn.query_row(
            &format!("SELECT {COLUMNS} FROM clients WHERE id = ?1"),
            [id],
            Self::from_row,
        )
        .map_err(|e| db::not_found_as(e, OnboardError::ClientNotFound(id)))
    }

    /// Fail with `ClientNotFound` unless `id` exists.
    pub(crate) fn ensure_exists(conn: &Connection, id: Uuid) -> Result<()> {
        let found: Option<i64> = conn
            .query_row("SELECT 1 FROM clients WHERE id = ?1", [id], |r| r.get(0))
            .optional()?;
        match found {
            Some(_) => Ok(()),
            None => Err(OnboardError::ClientNotFound(id)),
        }
    }

    /// All clients ordered by name.
    pub fn list(db: &Db) -> Result<Vec<Self>> {
        db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM clients ORDER BY name COLLATE NOCASE"
            ))?;
            let rows = stmt.query_map([], Self::from_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    pub fn find_by_name(db: &Db, name: &str) -> Result<Option<Self>> {
        db.with_conn(|conn| {
            Ok(conn
                .query_row(
                    &format!("SELECT {COLUMNS} FROM clients WHERE name = ?1"),
                    [name.trim()],
                    Self::from_row,
                )
                .optional()?)
        })
    }

    pub fn update(db: &Db, id: Uuid, update: ClientUpdate) -> Result<Self> {
        db.with_conn(|conn| {
            let mut client = Self::get_in(conn, id)?;
            if let Some(name) = update.name {
                client.name = normalize_name(&name)?;
            }
            if let Some(url) = update.app_url {
                client.app_url = Some(url).filter(|s| !s.trim().is_empty());
            }
            if let Some(url) = update.logo_url {
                client.logo_url = Some(url).filter(|s| !s.trim().is_empty());
            }
            client.updated_at = Utc::now();
            conn.execute(
                "UPDATE clients SET name = ?2, app_url = ?3, logo_url = ?4, updated_at = ?5 \
                 WHERE id = ?1",
                params![
                    client.id,
                    client.name,
                    client.app_url,
                    client.logo_url,
                    client.updated_at
                ],
            )
            .map_err(|e| map_write_err(e, &client.name))?;
            Ok(client)
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
