//! Client deletion across the relational store and object storage.

use crate::client::Client;
use crate::config::CascadePolicy;
use crate::db::{self, Db};
use crate::deliverable::ClientDeliverable;
use crate::document::ClientDocument;
use crate::error::{OnboardError, Result};
use crate::storage::{Bucket, ObjectStore};
use crate::types::DocumentType;
use crate::upload;
use rusqlite::Transaction;
use serde::Serialize;
use uuid::Uuid;

/// What a client deletion touched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CascadeReport {
    pub documents_removed: usize,
    pub objects_removed: usize,
    pub objects_failed: usize,
    pub risks_removed: usize,
    pub deliverables_removed: usize,
    pub signature_requests_removed: usize,
}

impl CascadeReport {
    fn object_result(&mut self, removed: bool) {
        if removed {
            self.objects_removed += 1;
        } else {
            self.objects_failed += 1;
        }
    }
}

/// Delete a client and what hangs off it.
///
/// SOW objects are removed from storage best-effort; failures are counted
/// and logged but never abort the deletion. Documents, steps and
/// engagements go with the client row through the schema's cascading
/// foreign keys. Risks, deliverables and signature requests follow
/// `policy`.
pub fn delete_client(
    db: &Db,
    store: &dyn ObjectStore,
    client_id: Uuid,
    policy: CascadePolicy,
) -> Result<CascadeReport> {
    let (documents, deliverables) = db.with_conn(|conn| {
        Client::ensure_exists(conn, client_id)?;
        let documents = ClientDocument::list_in(conn, client_id, None)?;
        let deliverables = match policy {
            CascadePolicy::Cascade => ClientDeliverable::list_in(conn, client_id)?,
            CascadePolicy::Orphan => Vec::new(),
        };
        Ok((documents, deliverables))
    })?;

    let mut report = CascadeReport {
        documents_removed: documents.len(),
        ..Default::default()
    };

    for doc in documents
        .iter()
        .filter(|d| d.document_type == DocumentType::Sow)
    {
        let removed = upload::remove_best_effort(store, Bucket::SowDocuments, &doc.document_path);
        report.object_result(removed);
    }
    for d in &deliverables {
        let removed =
            upload::remove_best_effort(store, Bucket::ClientDeliverables, &d.document_path);
        report.object_result(removed);
    }

    db.with_tx(|tx| {
        if policy == CascadePolicy::Cascade {
            report.risks_removed = delete_rows(tx, "risks", client_id)?;
            report.deliverables_removed = delete_rows(tx, "client_deliverables", client_id)?;
            report.signature_requests_removed =
                match delete_rows(tx, "signature_requests", client_id) {
                    Err(OnboardError::Database(ref e))
                        if db::is_missing_table(e, "signature_requests") =>
                    {
                        0
                    }
                    other => other?,
                };
        }
        tx.execute("DELETE FROM clients WHERE id = ?1", [client_id])?;
        Ok(())
    })?;

    tracing::info!(
        client = %client_id,
        %policy,
        documents = report.documents_removed,
        objects_failed = report.objects_failed,
        "deleted client"
    );
    Ok(report)
}

fn delete_rows(tx: &Transaction<'_>, table: &str, client_id: Uuid) -> Result<usize> {
    Ok(tx.execute(
        &format!("DELETE FROM {table} WHERE client_id = ?1"),
        [client_id],
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::NewClient;
    use crate::deliverable::NewDeliverable;
    use crate::risk::{NewRisk, Risk};
    use crate::signature::{NewSignatureRequest, SignatureRequest};
    use crate::step::{NewStep, OnboardingStep};
    use crate::types::{RiskLikelihood, RiskSeverity};
    use crate::upload::testing::FlakyStore;
    use crate::upload::FileUpload;

    fn file(name: &str) -> FileUpload<'_> {
        FileUpload {
            file_name: name,
            content_type: None,
            data: b"data",
        }
    }

    fn seeded(store: &dyn ObjectStore) -> (Db, Uuid, ClientDocument) {
        let db = Db::open_in_memory().unwrap();
        let c = Client::create(
            &db,
            NewClient {
                name: "Acme Co".into(),
                ..Default::default()
            },
        )
        .unwrap();
        let sow = ClientDocument::upload(&db, store, c.id, DocumentType::Sow, file("sow.pdf"))
            .unwrap();
        ClientDocument::upload(
            &db,
            store,
            c.id,
            DocumentType::KickoffMaterial,
            file("deck.pdf"),
        )
        .unwrap();
        OnboardingStep::create(&db, c.id, NewStep::titled("Kickoff")).unwrap();
        Risk::create(
            &db,
            c.id,
            NewRisk {
                title: "Scope creep".into(),
                description: None,
                severity: RiskSeverity::High,
                likelihood: RiskLikelihood::Medium,
                status: None,
                impact: None,
                mitigation: None,
                assignee: None,
                due_date: None,
            },
        )
        .unwrap();
        ClientDeliverable::upload(
            &db,
            store,
            c.id,
            NewDeliverable {
                milestone_name: "Discovery".into(),
                title: "Audit".into(),
                ..Default::default()
            },
            file("audit.pdf"),
        )
        .unwrap();
        SignatureRequest::create(
            &db,
            c.id,
            NewSignatureRequest {
                sow_document_id: Some(sow.id),
                nda_document_id: None,
                recipient_name: "Dana".into(),
                recipient_email: "dana@acme.example".into(),
            },
        )
        .unwrap();
        (db, c.id, sow)
    }

    fn count(db: &Db, table: &str) -> i64 {
        db.with_conn(|c| {
            Ok(c.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))?)
        })
        .unwrap()
    }

    #[test]
    fn cascade_removes_everything() {
        let store = FlakyStore::default();
        let (db, id, sow) = seeded(&store);
        let report = delete_client(&db, &store, id, CascadePolicy::Cascade).unwrap();

        assert_eq!(report.documents_removed, 2);
        assert_eq!(report.objects_removed, 2); // sow + deliverable
        assert_eq!(report.objects_failed, 0);
        assert_eq!(report.risks_removed, 1);
        assert_eq!(report.deliverables_removed, 1);
        assert_eq!(report.signature_requests_removed, 1);
        assert!(!store.exists(Bucket::SowDocuments, &sow.document_path));

        for table in [
            "clients",
            "client_documents",
            "onboarding_steps",
            "risks",
            "client_deliverables",
            "signature_requests",
        ] {
            assert_eq!(count(&db, table), 0, "{table} not empty");
        }
    }

    #[test]
    fn kickoff_objects_are_left_in_storage() {
        let store = FlakyStore::default();
        let (db, id, _) = seeded(&store);
        delete_client(&db, &store, id, CascadePolicy::Cascade).unwrap();
        let left = store.objects.lock().unwrap();
        assert!(left.keys().any(|(b, _)| *b == Bucket::KickoffMaterials));
    }

    #[test]
    fn orphan_policy_keeps_dependents() {
        let store = FlakyStore::default();
        let (db, id, _) = seeded(&store);
        let report = delete_client(&db, &store, id, CascadePolicy::Orphan).unwrap();
        assert_eq!(report.risks_removed, 0);
        assert_eq!(count(&db, "clients"), 0);
        assert_eq!(count(&db, "client_documents"), 0);
        assert_eq!(count(&db, "risks"), 1);
        assert_eq!(count(&db, "client_deliverables"), 1);
        assert_eq!(count(&db, "signature_requests"), 1);
    }

    #[test]
    fn storage_failures_do_not_abort() {
        let store = FlakyStore {
            fail_deletes: true,
            ..Default::default()
        };
        let (db, id, _) = seeded(&store);
        let report = delete_client(&db, &store, id, CascadePolicy::Cascade).unwrap();
        assert_eq!(report.objects_failed, 2);
        assert_eq!(count(&db, "clients"), 0);
    }

    #[test]
    fn client_without_documents_deletes_cleanly() {
        let store = FlakyStore::default();
        let db = Db::open_in_memory().unwrap();
        let c = Client::create(
            &db,
            NewClient {
                name: "Empty".into(),
                ..Default::default()
            },
        )
        .unwrap();
        let report = delete_client(&db, &store, c.id, CascadePolicy::Cascade).unwrap();
        assert_eq!(report, CascadeReport::default());
    }

    #[test]
    fn unknown_client_is_not_found() {
        let store = FlakyStore::default();
        let db = Db::open_in_memory().unwrap();
        let err = delete_client(&db, &store, Uuid::new_v4(), CascadePolicy::Cascade).unwrap_err();
        assert!(matches!(err, OnboardError::ClientNotFound(_)));
    }

    #[test]
    fn missing_signature_table_is_tolerated() {
        let store = FlakyStore::default();
        let (db, id, _) = seeded(&store);
        db.with_conn(|c| Ok(c.execute_batch("DROP TABLE signature_requests")?))
            .unwrap();
        let report = delete_client(&db, &store, id, CascadePolicy::Cascade).unwrap();
        assert_eq!(report.signature_requests_removed, 0);
        assert_eq!(count(&db, "clients"), 0);
    }
}
