use crate::client::Client;
use crate::db::{self, Db};
use crate::error::{OnboardError, Result};
use crate::paths;
use crate::types::EngagementStatus;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const COLUMNS: &str =
    "id, client_id, status, email_sent_at, client_email, welcome_message, created_at, updated_at";

/// The record of a welcome package having been sent, and its progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientEngagement {
    pub id: Uuid,
    pub client_id: Uuid,
    pub status: EngagementStatus,
    pub email_sent_at: Option<DateTime<Utc>>,
    pub client_email: String,
    pub welcome_message: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEngagement {
    pub client_email: String,
    pub welcome_message: String,
    /// Defaults to `sent`, stamping `email_sent_at`.
    #[serde(default)]
    pub status: Option<EngagementStatus>,
}

impl ClientEngagement {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            client_id: row.get("client_id")?,
            status: row.get("status")?,
            email_sent_at: row.get("email_sent_at")?,
            client_email: row.get("client_email")?,
            welcome_message: row.get("welcome_message")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    pub fn create(db: &Db, client_id: Uuid, new: NewEngagement) -> Result<Self> {
        paths::validate_email(new.client_email.trim())?;
        let status = new.status.unwrap_or(EngagementStatus::Sent);
        let now = Utc::now();
        let engagement = Self {
            id: Uuid::new_v4(),
            client_id,
            status,
            email_sent_at: (status != EngagementStatus::Draft).then_some(now),
            client_email: new.client_email.trim().to_string(),
            welcome_message: new.welcome_message,
            created_at: now,
            updated_at: now,
        };
        db.with_conn(|conn| {
            Client::ensure_exists(conn, client_id)?;
            conn.execute(
                &format!(
                    "INSERT INTO client_engagements ({COLUMNS}) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
                ),
                params![
                    engagement.id,
                    engagement.client_id,
                    engagement.status,
                    engagement.email_sent_at,
                    engagement.client_email,
                    engagement.welcome_message,
                    engagement.created_at,
                    engagement.updated_at
                ],
            )?;
            Ok(())
        })?;
        tracing::info!(client = %client_id, engagement = %engagement.id, "recorded engagement");
        Ok(engagement)
    }

    pub fn get(db: &Db, id: Uuid) -> Result<Self> {
        db.with_conn(|conn| Self::get_in(conn, id))
    }

    fn get_in(conn: &Connection, id: Uuid) -> Result<Self> {
        conn.query_row(
            &format!("SELECT {COLUMNS} FROM client_engagements WHERE id = ?1"),
            [id],
            Self::from_row,
        )
        .map_err(|e| db::not_found_as(e, OnboardError::EngagementNotFound(id)))
    }

    /// Newest first; all clients when `client_id` is `None`.
    pub fn list(db: &Db, client_id: Option<Uuid>) -> Result<Vec<Self>> {
        db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM client_engagements \
                 WHERE ?1 IS NULL OR client_id = ?1 ORDER BY created_at DESC"
            ))?;
            let rows = stmt.query_map([client_id], Self::from_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    pub fn latest_for_client(db: &Db, client_id: Uuid) -> Result<Option<Self>> {
        db.with_conn(|conn| {
            Ok(conn
                .query_row(
                    &format!(
                        "SELECT {COLUMNS} FROM client_engagements WHERE client_id = ?1 \
                         ORDER BY created_at DESC LIMIT 1"
                    ),
                    [client_id],
                    Self::from_row,
                )
                .optional()?)
        })
    }

    /// Set the status. Any status may follow any other.
    pub fn update_status(db: &Db, id: Uuid, status: EngagementStatus) -> Result<Self> {
        db.with_conn(|conn| {
            let mut engagement = Self::get_in(conn, id)?;
            engagement.status = status;
            engagement.updated_at = Utc::now();
            conn.execute(
                "UPDATE client_engagements SET status = ?2, updated_at = ?3 WHERE id = ?1",
                params![engagement.id, engagement.status, engagement.updated_at],
            )?;
            Ok(engagement)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::NewClient;

    fn setup() -> (Db, Uuid) {
        let db = Db::open_in_memory().unwrap();
        let c = Client::create(
            &db,
            NewClient {
                name: "Acme Co".into(),
                ..Default::default()
            },
        )
        .unwrap();
        (db, c.id)
    }

    fn welcome() -> NewEngagement {
        NewEngagement {
            client_email: "ops@acme.example".into(),
            welcome_message: "Welcome aboard".into(),
            status: None,
        }
    }

    #[test]
    fn send_defaults_to_sent_with_timestamp() {
        let (db, client) = setup();
        let e = ClientEngagement::create(&db, client, welcome()).unwrap();
        assert_eq!(e.status, EngagementStatus::Sent);
        assert!(e.email_sent_at.is_some());
        assert_eq!(ClientEngagement::get(&db, e.id).unwrap(), e);
    }

    #[test]
    fn draft_has_no_sent_timestamp() {
        let (db, client) = setup();
        let e = ClientEngagement::create(
            &db,
            client,
            NewEngagement {
                status: Some(EngagementStatus::Draft),
                ..welcome()
            },
        )
        .unwrap();
        assert!(e.email_sent_at.is_none());
    }

    #[test]
    fn invalid_email_is_rejected() {
        let (db, client) = setup();
        let err = ClientEngagement::create(
            &db,
            client,
            NewEngagement {
                client_email: "not-an-email".into(),
                ..welcome()
            },
        )
        .unwrap_err();
        assert!(matches!(err, OnboardError::InvalidInput(_)));
    }

    #[test]
    fn list_filters_and_latest() {
        let (db, client) = setup();
        let other = Client::create(
            &db,
            NewClient {
                name: "Globex".into(),
                ..Default::default()
            },
        )
        .unwrap();
        ClientEngagement::create(&db, client, welcome()).unwrap();
        let second = ClientEngagement::create(&db, client, welcome()).unwrap();
        ClientEngagement::create(&db, other.id, welcome()).unwrap();

        assert_eq!(ClientEngagement::list(&db, None).unwrap().len(), 3);
        assert_eq!(ClientEngagement::list(&db, Some(client)).unwrap().len(), 2);
        assert_eq!(
            ClientEngagement::latest_for_client(&db, client)
                .unwrap()
                .unwrap()
                .id,
            second.id
        );
    }

    #[test]
    fn status_update_is_permissive() {
        let (db, client) = setup();
        let e = ClientEngagement::create(&db, client, welcome()).unwrap();
        let done = ClientEngagement::update_status(&db, e.id, EngagementStatus::Completed).unwrap();
        assert_eq!(done.status, EngagementStatus::Completed);
        let draft = ClientEngagement::update_status(&db, e.id, EngagementStatus::Draft).unwrap();
        assert_eq!(draft.status, EngagementStatus::Draft);
    }
}
