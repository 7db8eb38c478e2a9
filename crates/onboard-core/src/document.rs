use crate::client::Client;
use crate::db::{self, Db};
use crate::error::{OnboardError, Result};
use crate::storage::{self, Bucket, ObjectStore};
use crate::types::DocumentType;
use crate::upload::{self, FileUpload};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// ClientDocument
// ---------------------------------------------------------------------------

const DOC_COLUMNS: &str =
    "id, client_id, document_path, document_type, file_name, file_size, content_type, uploaded_at";

/// An uploaded SOW or kickoff file owned by one client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientDocument {
    pub id: Uuid,
    pub client_id: Uuid,
    pub document_path: String,
    pub document_type: DocumentType,
    pub file_name: String,
    pub file_size: i64,
    pub content_type: String,
    pub uploaded_at: DateTime<Utc>,
}

impl ClientDocument {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            client_id: row.get("client_id")?,
            document_path: row.get("document_path")?,
            document_type: row.get("document_type")?,
            file_name: row.get("file_name")?,
            file_size: row.get("file_size")?,
            content_type: row.get("content_type")?,
            uploaded_at: row.get("uploaded_at")?,
        })
    }

    pub fn bucket(&self) -> Bucket {
        self.document_type.bucket()
    }

    /// Upload a file for `client_id` and record it.
    pub fn upload(
        db: &Db,
        store: &dyn ObjectStore,
        client_id: Uuid,
        document_type: DocumentType,
        file: FileUpload<'_>,
    ) -> Result<Self> {
        db.with_conn(|conn| Client::ensure_exists(conn, client_id))?;

        let doc = Self {
            id: Uuid::new_v4(),
            client_id,
            document_path: storage::object_path(&client_id.to_string(), file.file_name),
            document_type,
            file_name: file.file_name.to_string(),
            file_size: file.size(),
            content_type: file.content_type(),
            uploaded_at: Utc::now(),
        };

        upload::upload_then_insert(
            store,
            doc.bucket(),
            &doc.document_path,
            file.data,
            || {
                db.with_conn(|conn| {
                    conn.execute(
                        &format!(
                            "INSERT INTO client_documents ({DOC_COLUMNS}) \
                             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
                        ),
                        params![
                            doc.id,
                            doc.client_id,
                            doc.document_path,
                            doc.document_type,
                            doc.file_name,
                            doc.file_size,
                            doc.content_type,
                            doc.uploaded_at
                        ],
                    )?;
                    Ok(())
                })
            },
        )?;
        tracing::info!(client = %client_id, document = %doc.id, kind = %document_type, "uploaded document");
        Ok(doc)
    }

    pub fn get(db: &Db, id: Uuid) -> Result<Self> {
        db.with_conn(|conn| Self::get_in(conn, id))
    }

    fn get_in(conn: &Connection, id: Uuid) -> Result<Self> {
        conn.query_row(
            &format!("SELECT {DOC_COLUMNS} FROM client_documents WHERE id = ?1"),
            [id],
            Self::from_row,
        )
        .map_err(|e| db::not_found_as(e, OnboardError::DocumentNotFound(id)))
    }

    /// Documents for a client, newest first, optionally of one type.
    pub fn list_for_client(
        db: &Db,
        client_id: Uuid,
        document_type: Option<DocumentType>,
    ) -> Result<Vec<Self>> {
        db.with_conn(|conn| Self::list_in(conn, client_id, document_type))
    }

    pub(crate) fn list_in(
        conn: &Connection,
        client_id: Uuid,
        document_type: Option<DocumentType>,
    ) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {DOC_COLUMNS} FROM client_documents \
             WHERE client_id = ?1 AND (?2 IS NULL OR document_type = ?2) \
             ORDER BY uploaded_at DESC"
        ))?;
        let rows = stmt.query_map(params![client_id, document_type], Self::from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn public_url(&self, store: &dyn ObjectStore) -> String {
        store.public_url(self.bucket(), &self.document_path)
    }

    pub fn read(&self, store: &dyn ObjectStore) -> Result<Vec<u8>> {
        store.read(self.bucket(), &self.document_path)
    }

    /// Remove the stored object (best-effort) and then the row.
    pub fn delete(db: &Db, store: &dyn ObjectStore, id: Uuid) -> Result<()> {
        let doc = Self::get(db, id)?;
        upload::remove_best_effort(store, doc.bucket(), &doc.document_path);
        db.with_conn(|conn| {
            conn.execute("DELETE FROM client_documents WHERE id = ?1", [id])?;
            Ok(())
        })?;
        tracing::info!(document = %id, "deleted document");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// UniversalDocument
// ---------------------------------------------------------------------------

const UNIVERSAL_COLUMNS: &str =
    "id, title, description, document_path, file_name, file_size, content_type, uploaded_at";

/// A shared resource (template, deck) not owned by any client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniversalDocument {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub document_path: String,
    pub file_name: String,
    pub file_size: i64,
    pub content_type: String,
    pub uploaded_at: DateTime<Utc>,
}

impl UniversalDocument {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            title: row.get("title")?,
            description: row.get("description")?,
            document_path: row.get("document_path")?,
            file_name: row.get("file_name")?,
            file_size: row.get("file_size")?,
            content_type: row.get("content_type")?,
            uploaded_at: row.get("uploaded_at")?,
        })
    }

    pub fn upload(
        db: &Db,
        store: &dyn ObjectStore,
        title: Option<&str>,
        description: Option<&str>,
        file: FileUpload<'_>,
    ) -> Result<Self> {
        let title = title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(file.file_name)
            .to_string();
        let doc = Self {
            id: Uuid::new_v4(),
            title,
            description: description.map(str::to_string),
            document_path: storage::object_path("shared", file.file_name),
            file_name: file.file_name.to_string(),
            file_size: file.size(),
            content_type: file.content_type(),
            uploaded_at: Utc::now(),
        };

        upload::upload_then_insert(
            store,
            Bucket::UniversalDocuments,
            &doc.document_path,
            file.data,
            || {
                db.with_conn(|conn| {
                    conn.execute(
                        &format!(
                            "INSERT INTO universal_documents ({UNIVERSAL_COLUMNS}) \
                             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
                        ),
                        params![
                            doc.id,
                            doc.title,
                            doc.description,
                            doc.document_path,
                            doc.file_name,
                            doc.file_size,
                            doc.content_type,
                            doc.uploaded_at
                        ],
                    )?;
                    Ok(())
                })
            },
        )?;
        Ok(doc)
    }

    pub fn get(db: &Db, id: Uuid) -> Result<Self> {
        db.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {UNIVERSAL_COLUMNS} FROM universal_documents WHERE id = ?1"),
                [id],
                Self::from_row,
            )
            .map_err(|e| db::not_found_as(e, OnboardError::DocumentNotFound(id)))
        })
    }

    /// Newest first.
    pub fn list(db: &Db) -> Result<Vec<Self>> {
        db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {UNIVERSAL_COLUMNS} FROM universal_documents ORDER BY uploaded_at DESC"
            ))?;
            let rows = stmt.query_map([], Self::from_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    pub fn public_url(&self, store: &dyn ObjectStore) -> String {
        store.public_url(Bucket::UniversalDocuments, &self.document_path)
    }

    pub fn delete(db: &Db, store: &dyn ObjectStore, id: Uuid) -> Result<()> {
        let doc = Self::get(db, id)?;
        upload::remove_best_effort(store, Bucket::UniversalDocuments, &doc.document_path);
        db.with_conn(|conn| {
            conn.execute("DELETE FROM universal_documents WHERE id = ?1", [id])?;
            Ok(())
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::NewClient;
    use crate::storage::FsObjectStore;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Db, FsObjectStore, Client) {
        let dir = TempDir::new().unwrap();
        let db = Db::open_in_memory().unwrap();
        let store = FsObjectStore::new(dir.path().join("objects"), "/storage");
        let client = Client::create(
            &db,
            NewClient {
                name: "Acme Co".into(),
                ..Default::default()
            },
        )
        .unwrap();
        (dir, db, store, client)
    }

    fn pdf(name: &str) -> FileUpload<'_> {
        FileUpload {
            file_name: name,
            content_type: None,
            data: b"%PDF-1.7",
        }
    }

    #[test]
    fn upload_writes_object_and_row() {
        let (_dir, db, store, client) = setup();
        let doc =
            ClientDocument::upload(&db, &store, client.id, DocumentType::Sow, pdf("sow.pdf"))
                .unwrap();
        assert!(store.exists(Bucket::SowDocuments, &doc.document_path));
        assert_eq!(doc.content_type, "application/pdf");
        assert_eq!(doc.file_size, 8);
        assert_eq!(doc.read(&store).unwrap(), b"%PDF-1.7");

        let listed = ClientDocument::list_for_client(&db, client.id, None).unwrap();
        assert_eq!(listed, vec![doc]);
    }

    #[test]
    fn kickoff_material_goes_to_its_bucket_and_filters() {
        let (_dir, db, store, client) = setup();
        ClientDocument::upload(&db, &store, client.id, DocumentType::Sow, pdf("sow.pdf")).unwrap();
        let kick = ClientDocument::upload(
            &db,
            &store,
            client.id,
            DocumentType::KickoffMaterial,
            pdf("deck.pdf"),
        )
        .unwrap();
        assert!(store.exists(Bucket::KickoffMaterials, &kick.document_path));

        let only_kickoff =
            ClientDocument::list_for_client(&db, client.id, Some(DocumentType::KickoffMaterial))
                .unwrap();
        assert_eq!(only_kickoff.len(), 1);
        assert_eq!(only_kickoff[0].id, kick.id);
    }

    #[test]
    fn upload_for_unknown_client_stores_nothing() {
        let (dir, db, store, _client) = setup();
        let err = ClientDocument::upload(
            &db,
            &store,
            Uuid::new_v4(),
            DocumentType::Sow,
            pdf("sow.pdf"),
        )
        .unwrap_err();
        assert!(matches!(err, OnboardError::ClientNotFound(_)));
        assert!(!dir.path().join("objects/sow-documents").exists());
    }

    #[test]
    fn delete_removes_object_and_row() {
        let (_dir, db, store, client) = setup();
        let doc =
            ClientDocument::upload(&db, &store, client.id, DocumentType::Sow, pdf("sow.pdf"))
                .unwrap();
        ClientDocument::delete(&db, &store, doc.id).unwrap();
        assert!(!store.exists(Bucket::SowDocuments, &doc.document_path));
        assert!(matches!(
            ClientDocument::get(&db, doc.id),
            Err(OnboardError::DocumentNotFound(_))
        ));
    }

    #[test]
    fn universal_document_lifecycle() {
        let (_dir, db, store, _client) = setup();
        let doc = UniversalDocument::upload(&db, &store, None, Some("intro deck"), pdf("deck.pdf"))
            .unwrap();
        assert_eq!(doc.title, "deck.pdf");
        assert!(doc.public_url(&store).starts_with("/storage/universal-documents/shared/"));
        assert_eq!(UniversalDocument::list(&db).unwrap().len(), 1);

        UniversalDocument::delete(&db, &store, doc.id).unwrap();
        assert!(UniversalDocument::list(&db).unwrap().is_empty());
        assert!(!store.exists(Bucket::UniversalDocuments, &doc.document_path));
    }
}
