//! E-signature requests for a client's SOW and/or NDA documents.
//!
//! The `signature_requests` table arrives in a later schema version than
//! the rest of the store. When it is absent, listing degrades to an empty
//! result and every other operation fails with
//! [`OnboardError::SignatureTableMissing`].

use crate::client::Client;
use crate::db::{self, Db};
use crate::error::{OnboardError, Result};
use crate::paths;
use crate::types::SignatureStatus;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const TABLE: &str = "signature_requests";

const COLUMNS: &str = "id, client_id, sow_document_id, nda_document_id, recipient_name, \
                       recipient_email, status, signed_document_url, sent_at, signed_at, \
                       created_at, updated_at";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureRequest {
    pub id: Uuid,
    pub client_id: Uuid,
    pub sow_document_id: Option<Uuid>,
    pub nda_document_id: Option<Uuid>,
    pub recipient_name: String,
    pub recipient_email: String,
    pub status: SignatureStatus,
    pub signed_document_url: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub signed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSignatureRequest {
    #[serde(default)]
    pub sow_document_id: Option<Uuid>,
    #[serde(default)]
    pub nda_document_id: Option<Uuid>,
    pub recipient_name: String,
    pub recipient_email: String,
}

fn table_missing(err: OnboardError) -> OnboardError {
    match err {
        OnboardError::Database(ref e) if db::is_missing_table(e, TABLE) => {
            OnboardError::SignatureTableMissing
        }
        other => other,
    }
}

/// Check that `doc_id` exists and belongs to `client_id`.
fn check_document(conn: &Connection, client_id: Uuid, doc_id: Uuid) -> Result<()> {
    let owner: Option<Uuid> = conn
        .query_row(
            "SELECT client_id FROM client_documents WHERE id = ?1",
            [doc_id],
            |r| r.get(0),
        )
        .optional()?;
    match owner {
        None => Err(OnboardError::DocumentNotFound(doc_id)),
        Some(owner) if owner != client_id => Err(OnboardError::InvalidInput(format!(
            "document {doc_id} does not belong to client {client_id}"
        ))),
        Some(_) => Ok(()),
    }
}

impl SignatureRequest {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            client_id: row.get("client_id")?,
            sow_document_id: row.get("sow_document_id")?,
            nda_document_id: row.get("nda_document_id")?,
            recipient_name: row.get("recipient_name")?,
            recipient_email: row.get("recipient_email")?,
            status: row.get("status")?,
            signed_document_url: row.get("signed_document_url")?,
            sent_at: row.get("sent_at")?,
            signed_at: row.get("signed_at")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Record a request in `sent` state, stamped with `sent_at = now`.
    pub fn create(db: &Db, client_id: Uuid, new: NewSignatureRequest) -> Result<Self> {
        if new.sow_document_id.is_none() && new.nda_document_id.is_none() {
            return Err(OnboardError::InvalidInput(
                "a signature request needs a SOW or NDA document".into(),
            ));
        }
        let recipient_name = new.recipient_name.trim().to_string();
        if recipient_name.is_empty() {
            return Err(OnboardError::InvalidInput(
                "recipient name must not be empty".into(),
            ));
        }
        let recipient_email = new.recipient_email.trim().to_string();
        paths::validate_email(&recipient_email)?;

        let now = Utc::now();
        let request = Self {
            id: Uuid::new_v4(),
            client_id,
            sow_document_id: new.sow_document_id,
            nda_document_id: new.nda_document_id,
            recipient_name,
            recipient_email,
            status: SignatureStatus::Sent,
            signed_document_url: None,
            sent_at: Some(now),
            signed_at: None,
            created_at: now,
            updated_at: now,
        };

        db.with_conn(|conn| {
            Client::ensure_exists(conn, client_id)?;
            for doc in [request.sow_document_id, request.nda_document_id]
                .into_iter()
                .flatten()
            {
                check_document(conn, client_id, doc)?;
            }
            conn.execute(
                &format!(
                    "INSERT INTO {TABLE} ({COLUMNS}) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
                ),
                params![
                    request.id,
                    request.client_id,
                    request.sow_document_id,
                    request.nda_document_id,
                    request.recipient_name,
                    request.recipient_email,
                    request.status,
                    request.signed_document_url,
                    request.sent_at,
                    request.signed_at,
                    request.created_at,
                    request.updated_at
                ],
            )?;
            Ok(())
        })
        .map_err(table_missing)?;
        tracing::info!(client = %client_id, request = %request.id, "created signature request");
        Ok(request)
    }

    pub fn get(db: &Db, id: Uuid) -> Result<Self> {
        db.with_conn(|conn| Self::get_in(conn, id))
            .map_err(table_missing)
    }

    fn get_in(conn: &Connection, id: Uuid) -> Result<Self> {
        conn.query_row(
            &format!("SELECT {COLUMNS} FROM {TABLE} WHERE id = ?1"),
            [id],
            Self::from_row,
        )
        .map_err(|e| db::not_found_as(e, OnboardError::SignatureRequestNotFound(id)))
    }

    /// Newest first. Empty when the table has not been created.
    pub fn list_for_client(db: &Db, client_id: Uuid) -> Result<Vec<Self>> {
        let listed = db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM {TABLE} WHERE client_id = ?1 ORDER BY created_at DESC"
            ))?;
            let rows = stmt.query_map([client_id], Self::from_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        });
        match listed.map_err(table_missing) {
            Err(OnboardError::SignatureTableMissing) => {
                tracing::warn!("signature requests table missing; returning no requests");
                Ok(Vec::new())
            }
            other => other,
        }
    }

    /// Set the status. `sent` and `signed` stamp their timestamps once.
    pub fn update_status(db: &Db, id: Uuid, status: SignatureStatus) -> Result<Self> {
        Self::modify(db, id, |req, now| {
            req.status = status;
            match status {
                SignatureStatus::Sent if req.sent_at.is_none() => req.sent_at = Some(now),
                SignatureStatus::Signed if req.signed_at.is_none() => req.signed_at = Some(now),
                _ => {}
            }
        })
    }

    /// Record where the counter-signed copy lives.
    pub fn set_signed_document_url(db: &Db, id: Uuid, url: Option<String>) -> Result<Self> {
        Self::modify(db, id, |req, _| req.signed_document_url = url)
    }

    /// Drop the SOW reference; the document itself is untouched.
    pub fn detach_sow(db: &Db, id: Uuid) -> Result<Self> {
        Self::modify(db, id, |req, _| req.sow_document_id = None)
    }

    /// Drop the NDA reference; the document itself is untouched.
    pub fn detach_nda(db: &Db, id: Uuid) -> Result<Self> {
        Self::modify(db, id, |req, _| req.nda_document_id = None)
    }

    fn modify(
        db: &Db,
        id: Uuid,
        apply: impl FnOnce(&mut Self, DateTime<Utc>),
    ) -> Result<Self> {
        db.with_conn(|conn| {
            let mut req = Self::get_in(conn, id)?;
            let now = Utc::now();
            apply(&mut req, now);
            req.updated_at = now;
            conn.execute(
                &format!(
                    "UPDATE {TABLE} SET sow_document_id = ?2, nda_document_id = ?3, status = ?4, \
                     signed_document_url = ?5, sent_at = ?6, signed_at = ?7, updated_at = ?8 \
                     WHERE id = ?1"
                ),
                params![
                    req.id,
                    req.sow_document_id,
                    req.nda_document_id,
                    req.status,
                    req.signed_document_url,
                    req.sent_at,
                    req.signed_at,
                    req.updated_at
                ],
            )?;
            Ok(req)
        })
        .map_err(table_missing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::NewClient;
    use crate::document::ClientDocument;
    use crate::storage::FsObjectStore;
    use crate::types::DocumentType;
    use crate::upload::FileUpload;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        db: Db,
        client: Uuid,
        sow: Uuid,
        nda: Uuid,
    }

    fn setup() -> Fixture {
        let dir = TempDir::new().unwrap();
        let db = Db::open_in_memory().unwrap();
        let store = FsObjectStore::new(dir.path(), "/storage");
        let client = Client::create(
            &db,
            NewClient {
                name: "Acme Co".into(),
                ..Default::default()
            },
        )
        .unwrap()
        .id;
        let upload = |name: &str| {
            ClientDocument::upload(
                &db,
                &store,
                client,
                DocumentType::Sow,
                FileUpload {
                    file_name: name,
                    content_type: None,
                    data: b"%PDF",
                },
            )
            .unwrap()
            .id
        };
        let sow = upload("sow.pdf");
        let nda = upload("nda.pdf");
        Fixture {
            _dir: dir,
            db,
            client,
            sow,
            nda,
        }
    }

    fn both(f: &Fixture) -> NewSignatureRequest {
        NewSignatureRequest {
            sow_document_id: Some(f.sow),
            nda_document_id: Some(f.nda),
            recipient_name: "Dana Client".into(),
            recipient_email: "dana@acme.example".into(),
        }
    }

    #[test]
    fn create_is_sent_with_timestamp() {
        let f = setup();
        let req = SignatureRequest::create(&f.db, f.client, both(&f)).unwrap();
        assert_eq!(req.status, SignatureStatus::Sent);
        assert!(req.sent_at.is_some());
        assert!(req.signed_at.is_none());
        assert_eq!(SignatureRequest::get(&f.db, req.id).unwrap(), req);
    }

    #[test]
    fn create_needs_a_document() {
        let f = setup();
        let err = SignatureRequest::create(
            &f.db,
            f.client,
            NewSignatureRequest {
                sow_document_id: None,
                nda_document_id: None,
                ..both(&f)
            },
        )
        .unwrap_err();
        assert!(matches!(err, OnboardError::InvalidInput(_)));
    }

    #[test]
    fn create_rejects_foreign_document() {
        let f = setup();
        let other = Client::create(
            &f.db,
            NewClient {
                name: "Globex".into(),
                ..Default::default()
            },
        )
        .unwrap();
        let err = SignatureRequest::create(&f.db, other.id, both(&f)).unwrap_err();
        assert!(matches!(err, OnboardError::InvalidInput(_)));
    }

    #[test]
    fn detach_sow_keeps_nda_and_status() {
        let f = setup();
        let req = SignatureRequest::create(&f.db, f.client, both(&f)).unwrap();
        let detached = SignatureRequest::detach_sow(&f.db, req.id).unwrap();
        assert_eq!(detached.sow_document_id, None);
        assert_eq!(detached.nda_document_id, Some(f.nda));
        assert_eq!(detached.status, req.status);
        assert!(detached.updated_at >= req.updated_at);
        // The document row is still there.
        ClientDocument::get(&f.db, f.sow).unwrap();

        let both_gone = SignatureRequest::detach_nda(&f.db, req.id).unwrap();
        assert_eq!(both_gone.nda_document_id, None);
    }

    #[test]
    fn detach_nda_keeps_sow_and_status() {
        let f = setup();
        let req = SignatureRequest::create(&f.db, f.client, both(&f)).unwrap();
        let detached = SignatureRequest::detach_nda(&f.db, req.id).unwrap();
        assert_eq!(detached.nda_document_id, None);
        assert_eq!(detached.sow_document_id, Some(f.sow));
        assert_eq!(detached.status, SignatureStatus::Sent);
        ClientDocument::get(&f.db, f.nda).unwrap();
    }

    #[test]
    fn signing_stamps_signed_at_once() {
        let f = setup();
        let req = SignatureRequest::create(&f.db, f.client, both(&f)).unwrap();
        let signed = SignatureRequest::update_status(&f.db, req.id, SignatureStatus::Signed).unwrap();
        let stamp = signed.signed_at.unwrap();
        let again = SignatureRequest::update_status(&f.db, req.id, SignatureStatus::Signed).unwrap();
        assert_eq!(again.signed_at, Some(stamp));
        assert_eq!(again.sent_at, req.sent_at);
    }

    #[test]
    fn missing_table_degrades() {
        let f = setup();
        f.db
            .with_conn(|c| Ok(c.execute_batch("DROP TABLE signature_requests")?))
            .unwrap();
        assert!(SignatureRequest::list_for_client(&f.db, f.client)
            .unwrap()
            .is_empty());
        let err = SignatureRequest::create(&f.db, f.client, both(&f)).unwrap_err();
        assert!(matches!(err, OnboardError::SignatureTableMissing));
    }

    #[test]
    fn unknown_request_is_not_found() {
        let f = setup();
        let err = SignatureRequest::detach_nda(&f.db, Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, OnboardError::SignatureRequestNotFound(_)));
    }
}
