use crate::client::Client;
use crate::db::{self, Db};
use crate::error::{OnboardError, Result};
use crate::step::double_option;
use crate::storage::{self, Bucket, ObjectStore};
use crate::upload::{self, FileUpload};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

const COLUMNS: &str = "id, client_id, milestone_name, title, description, document_path, \
                       version, file_name, file_size, content_type, created_at, updated_at";

const DEFAULT_VERSION: &str = "1.0";

/// A versioned output document grouped under a milestone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientDeliverable {
    pub id: Uuid,
    pub client_id: Uuid,
    pub milestone_name: String,
    pub title: String,
    pub description: Option<String>,
    pub document_path: String,
    pub version: String,
    pub file_name: String,
    pub file_size: i64,
    pub content_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewDeliverable {
    pub milestone_name: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

/// Metadata-only edit; the stored file never changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeliverableUpdate {
    #[serde(default)]
    pub milestone_name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub version: Option<String>,
}

/// Deliverables sharing a milestone name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MilestoneGroup {
    pub milestone_name: String,
    pub deliverables: Vec<ClientDeliverable>,
}

fn non_empty(field: &str, value: &str) -> Result<String> {
    let v = value.trim();
    if v.is_empty() {
        return Err(OnboardError::InvalidInput(format!(
            "{field} must not be empty"
        )));
    }
    Ok(v.to_string())
}

/// Group by milestone name (ascending); newest first within a group.
pub fn group_by_milestone(deliverables: Vec<ClientDeliverable>) -> Vec<MilestoneGroup> {
    let mut groups: BTreeMap<String, Vec<ClientDeliverable>> = BTreeMap::new();
    for d in deliverables {
        groups.entry(d.milestone_name.clone()).or_default().push(d);
    }
    groups
        .into_iter()
        .map(|(milestone_name, mut deliverables)| {
            deliverables.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            MilestoneGroup {
                milestone_name,
                deliverables,
            }
        })
        .collect()
}

impl ClientDeliverable {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            client_id: row.get("client_id")?,
            milestone_name: row.get("milestone_name")?,
            title: row.get("title")?,
            description: row.get("description")?,
            document_path: row.get("document_path")?,
            version: row.get("version")?,
            file_name: row.get("file_name")?,
            file_size: row.get("file_size")?,
            content_type: row.get("content_type")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    pub fn upload(
        db: &Db,
        store: &dyn ObjectStore,
        client_id: Uuid,
        new: NewDeliverable,
        file: FileUpload<'_>,
    ) -> Result<Self> {
        let milestone_name = non_empty("milestone name", &new.milestone_name)?;
        let title = non_empty("deliverable title", &new.title)?;
        db.with_conn(|conn| Client::ensure_exists(conn, client_id))?;

        let now = Utc::now();
        let deliverable = Self {
            id: Uuid::new_v4(),
            client_id,
            milestone_name,
            title,
            description: new.description,
            document_path: storage::object_path(&client_id.to_string(), file.file_name),
            version: new
                .version
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_VERSION.to_string()),
            file_name: file.file_name.to_string(),
            file_size: file.size(),
            content_type: file.content_type(),
            created_at: now,
            updated_at: now,
        };

        upload::upload_then_insert(
            store,
            Bucket::ClientDeliverables,
            &deliverable.document_path,
            file.data,
            || {
                db.with_conn(|conn| {
                    conn.execute(
                        &format!(
                            "INSERT INTO client_deliverables ({COLUMNS}) \
                             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
                        ),
                        params![
                            deliverable.id,
                            deliverable.client_id,
                            deliverable.milestone_name,
                            deliverable.title,
                            deliverable.description,
                            deliverable.document_path,
                            deliverable.version,
                            deliverable.file_name,
                            deliverable.file_size,
                            deliverable.content_type,
                            deliverable.created_at,
                            deliverable.updated_at
                        ],
                    )?;
                    Ok(())
                })
            },
        )?;
        tracing::info!(client = %client_id, deliverable = %deliverable.id, "uploaded deliverable");
        Ok(deliverable)
    }

    pub fn get(db: &Db, id: Uuid) -> Result<Self> {
        db.with_conn(|conn| Self::get_in(conn, id))
    }

    fn get_in(conn: &Connection, id: Uuid) -> Result<Self> {
        conn.query_row(
            &format!("SELECT {COLUMNS} FROM client_deliverables WHERE id = ?1"),
            [id],
            Self::from_row,
        )
        .map_err(|e| db::not_found_as(e, OnboardError::DeliverableNotFound(id)))
    }

    pub fn list_for_client(db: &Db, client_id: Uuid) -> Result<Vec<Self>> {
        db.with_conn(|conn| Self::list_in(conn, client_id))
    }

    pub(crate) fn list_in(conn: &Connection, client_id: Uuid) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM client_deliverables WHERE client_id = ?1 \
             ORDER BY created_at DESC"
        ))?;
        let rows = stmt.query_map([client_id], Self::from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn grouped_for_client(db: &Db, client_id: Uuid) -> Result<Vec<MilestoneGroup>> {
        Ok(group_by_milestone(Self::list_for_client(db, client_id)?))
    }

    pub fn update(db: &Db, id: Uuid, update: DeliverableUpdate) -> Result<Self> {
        db.with_conn(|conn| {
            let mut d = Self::get_in(conn, id)?;
            if let Some(m) = update.milestone_name {
                d.milestone_name = non_empty("milestone name", &m)?;
            }
            if let Some(t) = update.title {
                d.title = non_empty("deliverable title", &t)?;
            }
            if let Some(v) = update.description {
                d.description = v;
            }
            if let Some(v) = update.version {
                d.version = non_empty("version", &v)?;
            }
            d.updated_at = Utc::now();
            conn.execute(
                "UPDATE client_deliverables SET milestone_name = ?2, title = ?3, \
                 description = ?4, version = ?5, updated_at = ?6 WHERE id = ?1",
                params![
                    d.id,
                    d.milestone_name,
                    d.title,
                    d.description,
                    d.version,
                    d.updated_at
                ],
            )?;
            Ok(d)
        })
    }

    pub fn public_url(&self, store: &dyn ObjectStore) -> String {
        store.public_url(Bucket::ClientDeliverables, &self.document_path)
    }

    /// Remove the stored object (best-effort) and then the row.
    pub fn delete(db: &Db, store: &dyn ObjectStore, id: Uuid) -> Result<()> {
        let d = Self::get(db, id)?;
        upload::remove_best_effort(store, Bucket::ClientDeliverables, &d.document_path);
        db.with_conn(|conn| {
            conn.execute("DELETE FROM client_deliverables WHERE id = ?1", [id])?;
            Ok(())
        })
    }
}
