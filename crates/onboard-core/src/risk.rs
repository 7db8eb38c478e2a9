use crate::client::Client;
use crate::db::{self, Db};
use crate::error::{OnboardError, Result};
use crate::step::double_option;
use crate::types::{RiskLikelihood, RiskSeverity, RiskStatus};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Priority scoring
// ---------------------------------------------------------------------------

impl RiskSeverity {
    pub fn score(self) -> u32 {
        match self {
            RiskSeverity::Low => 1,
            RiskSeverity::Medium => 2,
            RiskSeverity::High => 3,
            RiskSeverity::Critical => 4,
        }
    }
}

impl RiskLikelihood {
    pub fn score(self) -> u32 {
        match self {
            RiskLikelihood::Low => 1,
            RiskLikelihood::Medium => 2,
            RiskLikelihood::High => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PriorityLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for PriorityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PriorityLevel::Low => "Low",
            PriorityLevel::Medium => "Medium",
            PriorityLevel::High => "High",
            PriorityLevel::Critical => "Critical",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Priority {
    pub score: u32,
    pub level: PriorityLevel,
}

/// `severity × likelihood`, classified at 9 / 6 / 3.
pub fn priority(severity: RiskSeverity, likelihood: RiskLikelihood) -> Priority {
    let score = severity.score() * likelihood.score();
    let level = match score {
        s if s >= 9 => PriorityLevel::Critical,
        s if s >= 6 => PriorityLevel::High,
        s if s >= 3 => PriorityLevel::Medium,
        _ => PriorityLevel::Low,
    };
    Priority { score, level }
}

// ---------------------------------------------------------------------------
// Risk
// ---------------------------------------------------------------------------

const COLUMNS: &str = "id, client_id, title, description, severity, likelihood, status, \
                       impact, mitigation, assignee, due_date, created_at, updated_at";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Risk {
    pub id: Uuid,
    pub client_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub severity: RiskSeverity,
    pub likelihood: RiskLikelihood,
    pub status: RiskStatus,
    pub impact: Option<String>,
    pub mitigation: Option<String>,
    pub assignee: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRisk {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub severity: RiskSeverity,
    pub likelihood: RiskLikelihood,
    #[serde(default)]
    pub status: Option<RiskStatus>,
    #[serde(default)]
    pub impact: Option<String>,
    #[serde(default)]
    pub mitigation: Option<String>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RiskUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub severity: Option<RiskSeverity>,
    #[serde(default)]
    pub likelihood: Option<RiskLikelihood>,
    #[serde(default)]
    pub status: Option<RiskStatus>,
    #[serde(default, with = "double_option")]
    pub impact: Option<Option<String>>,
    #[serde(default, with = "double_option")]
    pub mitigation: Option<Option<String>>,
    #[serde(default, with = "double_option")]
    pub assignee: Option<Option<String>>,
    #[serde(default, with = "double_option")]
    pub due_date: Option<Option<NaiveDate>>,
}

impl Risk {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            client_id: row.get("client_id")?,
            title: row.get("title")?,
            description: row.get("description")?,
            severity: row.get("severity")?,
            likelihood: row.get("likelihood")?,
            status: row.get("status")?,
            impact: row.get("impact")?,
            mitigation: row.get("mitigation")?,
            assignee: row.get("assignee")?,
            due_date: row.get("due_date")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    pub fn priority(&self) -> Priority {
        priority(self.severity, self.likelihood)
    }

    pub fn create(db: &Db, client_id: Uuid, new: NewRisk) -> Result<Self> {
        let title = new.title.trim().to_string();
        if title.is_empty() {
            return Err(OnboardError::InvalidInput(
                "risk title must not be empty".to_string(),
            ));
        }
        let now = Utc::now();
        let risk = Self {
            id: Uuid::new_v4(),
            client_id,
            title,
            description: new.description,
            severity: new.severity,
            likelihood: new.likelihood,
            status: new.status.unwrap_or(RiskStatus::Open),
            impact: new.impact,
            mitigation: new.mitigation,
            assignee: new.assignee,
            due_date: new.due_date,
            created_at: now,
            updated_at: now,
        };
        db.with_conn(|conn| {
            Client::ensure_exists(conn, client_id)?;
            conn.execute(
                &format!(
                    "INSERT INTO risks ({COLUMNS}) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
                ),
                params![
                    risk.id,
                    risk.client_id,
                    risk.title,
                    risk.description,
                    risk.severity,
                    risk.likelihood,
                    risk.status,
                    risk.impact,
                    risk.mitigation,
                    risk.assignee,
                    risk.due_date,
                    risk.created_at,
                    risk.updated_at
                ],
            )?;
            Ok(())
        })?;
        Ok(risk)
    }

    pub fn get(db: &Db, id: Uuid) -> Result<Self> {
        db.with_conn(|conn| Self::get_in(conn, id))
    }

    fn get_in(conn: &Connection, id: Uuid) -> Result<Self> {
        conn.query_row(
            &format!("SELECT {COLUMNS} FROM risks WHERE id = ?1"),
            [id],
            Self::from_row,
        )
        .map_err(|e| db::not_found_as(e, OnboardError::RiskNotFound(id)))
    }

    /// Risks for a client, highest priority first, then oldest first.
    pub fn list_for_client(db: &Db, client_id: Uuid) -> Result<Vec<Self>> {
        let mut risks = db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM risks WHERE client_id = ?1 ORDER BY created_at"
            ))?;
            let rows = stmt.query_map([client_id], Self::from_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })?;
        // stable sort keeps created_at order within a score
        risks.sort_by(|a, b| b.priority().score.cmp(&a.priority().score));
        Ok(risks)
    }

    pub fn update(db: &Db, id: Uuid, update: RiskUpdate) -> Result<Self> {
        db.with_conn(|conn| {
            let mut risk = Self::get_in(conn, id)?;
            if let Some(title) = update.title {
                let t = title.trim();
                if t.is_empty() {
                    return Err(OnboardError::InvalidInput(
                        "risk title must not be empty".to_string(),
                    ));
                }
                risk.title = t.to_string();
            }
            if let Some(v) = update.description {
                risk.description = v;
            }
            if let Some(v) = update.severity {
                risk.severity = v;
            }
            if let Some(v) = update.likelihood {
                risk.likelihood = v;
            }
            if let Some(v) = update.status {
                risk.status = v;
            }
            if let Some(v) = update.impact {
                risk.impact = v;
            }
            if let Some(v) = update.mitigation {
                risk.mitigation = v;
            }
            if let Some(v) = update.assignee {
                risk.assignee = v;
            }
            if let Some(v) = update.due_date {
                risk.due_date = v;
            }
            risk.updated_at = Utc::now();
            conn.execute(
                "UPDATE risks SET title = ?2, description = ?3, severity = ?4, likelihood = ?5, \
                 status = ?6, impact = ?7, mitigation = ?8, assignee = ?9, due_date = ?10, \
                 updated_at = ?11 WHERE id = ?1",
                params![
                    risk.id,
                    risk.title,
                    risk.description,
                    risk.severity,
                    risk.likelihood,
                    risk.status,
                    risk.impact,
                    risk.mitigation,
                    risk.assignee,
                    risk.due_date,
                    risk.updated_at
                ],
            )?;
            Ok(risk)
        })
    }

    /// Set the status. Any status may follow any other.
    pub fn update_status(db: &Db, id: Uuid, status: RiskStatus) -> Result<Self> {
        Self::update(
            db,
            id,
            RiskUpdate {
                status: Some(status),
                ..Default::default()
            },
        )
    }

    pub fn delete(db: &Db, id: Uuid) -> Result<()> {
        db.with_conn(|conn| {
            let n = conn.execute("DELETE FROM risks WHERE id = ?1", [id])?;
            if n == 0 {
                return Err(OnboardError::RiskNotFound(id));
            }
            Ok(())
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
