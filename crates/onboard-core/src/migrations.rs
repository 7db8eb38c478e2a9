//! Relational schema, applied in order and tracked with `PRAGMA user_version`.
//!
//! `client_documents`, `onboarding_steps` and `client_engagements` reference
//! `clients` with `ON DELETE CASCADE`. `risks`, `client_deliverables` and
//! `signature_requests` only carry a `client_id` column: their fate on client
//! deletion is decided by [`crate::config::CascadePolicy`].

use crate::error::Result;
use rusqlite::Connection;

pub const SCHEMA_VERSION: i32 = 2;

const MIGRATION_V1: &str = r#"
CREATE TABLE IF NOT EXISTS clients (
    id BLOB PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    app_url TEXT,
    logo_url TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS client_documents (
    id BLOB PRIMARY KEY,
    client_id BLOB NOT NULL REFERENCES clients(id) ON DELETE CASCADE,
    document_path TEXT NOT NULL UNIQUE,
    document_type TEXT NOT NULL,
    file_name TEXT NOT NULL,
    file_size INTEGER NOT NULL DEFAULT 0,
    content_type TEXT NOT NULL,
    uploaded_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_documents_client ON client_documents(client_id);

CREATE TABLE IF NOT EXISTS universal_documents (
    id BLOB PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT,
    document_path TEXT NOT NULL UNIQUE,
    file_name TEXT NOT NULL,
    file_size INTEGER NOT NULL DEFAULT 0,
    content_type TEXT NOT NULL,
    uploaded_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS onboarding_steps (
    id BLOB PRIMARY KEY,
    client_id BLOB NOT NULL REFERENCES clients(id) ON DELETE CASCADE,
    title TEXT NOT NULL,
    description TEXT,
    status TEXT NOT NULL DEFAULT 'not_started',
    start_date TEXT,
    end_date TEXT,
    order_index INTEGER NOT NULL DEFAULT 0,
    client_visible INTEGER NOT NULL DEFAULT 1,
    internal_notes TEXT,
    assigned_to TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_steps_client_order ON onboarding_steps(client_id, order_index);

CREATE TABLE IF NOT EXISTS client_engagements (
    id BLOB PRIMARY KEY,
    client_id BLOB NOT NULL REFERENCES clients(id) ON DELETE CASCADE,
    status TEXT NOT NULL DEFAULT 'draft',
    email_sent_at TEXT,
    client_email TEXT NOT NULL,
    welcome_message TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_engagements_client ON client_engagements(client_id);

CREATE TABLE IF NOT EXISTS risks (
    id BLOB PRIMARY KEY,
    client_id BLOB NOT NULL,
    title TEXT NOT NULL,
    description TEXT,
    severity TEXT NOT NULL DEFAULT 'medium',
    likelihood TEXT NOT NULL DEFAULT 'medium',
    status TEXT NOT NULL DEFAULT 'open',
    impact TEXT,
    mitigation TEXT,
    assignee TEXT,
    due_date TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_risks_client ON risks(client_id);

CREATE TABLE IF NOT EXISTS client_deliverables (
    id BLOB PRIMARY KEY,
    client_id BLOB NOT NULL,
    milestone_name TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT,
    document_path TEXT NOT NULL UNIQUE,
    version TEXT NOT NULL DEFAULT '1.0',
    file_name TEXT NOT NULL,
    file_size INTEGER NOT NULL DEFAULT 0,
    content_type TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_deliverables_client ON client_deliverables(client_id);
"#;

/// V2: e-signature workflow.
const MIGRATION_V2: &str = r#"
CREATE TABLE IF NOT EXISTS signature_requests (
    id BLOB PRIMARY KEY,
    client_id BLOB NOT NULL,
    sow_document_id BLOB,
    nda_document_id BLOB,
    recipient_name TEXT NOT NULL,
    recipient_email TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'draft',
    signed_document_url TEXT,
    sent_at TEXT,
    signed_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_signatures_client ON signature_requests(client_id);
"#;

const MIGRATIONS: &[&str] = &[MIGRATION_V1, MIGRATION_V2];

/// Apply every migration newer than the database's `user_version`.
///
/// Returns the number of migrations applied.
pub fn apply(conn: &mut Connection) -> Result<usize> {
    let current: i32 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    let mut applied = 0;
    for (idx, sql) in MIGRATIONS.iter().enumerate() {
        let version = idx as i32 + 1;
        if version <= current {
            continue;
        }
        let tx = conn.transaction()?;
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", version)?;
        tx.commit()?;
        tracing::info!(version, "applied schema migration");
        applied += 1;
    }
    Ok(applied)
}
