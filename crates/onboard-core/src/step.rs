use crate::client::Client;
use crate::db::{self, Db};
use crate::error::{OnboardError, Result};
use crate::types::StepStatus;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const COLUMNS: &str = "id, client_id, title, description, status, start_date, end_date, \
                       order_index, client_visible, internal_notes, assigned_to, created_at, updated_at";

// ---------------------------------------------------------------------------
// OnboardingStep
// ---------------------------------------------------------------------------

/// One checklist/timeline entry in a client's onboarding plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnboardingStep {
    pub id: Uuid,
    pub client_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: StepStatus,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub order_index: i64,
    pub client_visible: bool,
    pub internal_notes: Option<String>,
    pub assigned_to: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewStep {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<StepStatus>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Appended after the current last step when omitted.
    #[serde(default)]
    pub order_index: Option<i64>,
    #[serde(default)]
    pub client_visible: Option<bool>,
    #[serde(default)]
    pub internal_notes: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<String>,
}

impl NewStep {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

/// Partial update. Nullable fields use a nested option: `Some(None)` clears.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub status: Option<StepStatus>,
    #[serde(default, with = "double_option")]
    pub start_date: Option<Option<NaiveDate>>,
    #[serde(default, with = "double_option")]
    pub end_date: Option<Option<NaiveDate>>,
    #[serde(default)]
    pub order_index: Option<i64>,
    #[serde(default)]
    pub client_visible: Option<bool>,
    #[serde(default, with = "double_option")]
    pub internal_notes: Option<Option<String>>,
    #[serde(default, with = "double_option")]
    pub assigned_to: Option<Option<String>>,
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
pub(crate) mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<T: Serialize, S: Serializer>(
        value: &Option<Option<T>>,
        s: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(inner) => inner.serialize(s),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, T: Deserialize<'de>, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<Option<T>>, D::Error> {
        Option::<T>::deserialize(d).map(Some)
    }
}

fn require_title(title: &str) -> Result<String> {
    let t = title.trim();
    if t.is_empty() {
        return Err(OnboardError::InvalidInput(
            "step title must not be empty".to_string(),
        ));
    }
    Ok(t.to_string())
}

impl OnboardingStep {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            client_id: row.get("client_id")?,
            title: row.get("title")?,
            description: row.get("description")?,
            status: row.get("status")?,
            start_date: row.get("start_date")?,
            end_date: row.get("end_date")?,
            order_index: row.get("order_index")?,
            client_visible: row.get("client_visible")?,
            internal_notes: row.get("internal_notes")?,
            assigned_to: row.get("assigned_to")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    fn next_order_index(conn: &Connection, client_id: Uuid) -> Result<i64> {
        let max: Option<i64> = conn.query_row(
            "SELECT MAX(order_index) FROM onboarding_steps WHERE client_id = ?1",
            [client_id],
            |r| r.get(0),
        )?;
        Ok(max.map_or(0, |m| m + 1))
    }

    fn insert(conn: &Connection, step: &Self) -> Result<()> {
        conn.execute(
            &format!(
                "INSERT INTO onboarding_steps ({COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
            ),
            params![
                step.id,
                step.client_id,
                step.title,
                step.description,
                step.status,
                step.start_date,
                step.end_date,
                step.order_index,
                step.client_visible,
                step.internal_notes,
                step.assigned_to,
                step.created_at,
                step.updated_at
            ],
        )?;
        Ok(())
    }

    fn build(conn: &Connection, client_id: Uuid, new: NewStep) -> Result<Self> {
        let title = require_title(&new.title)?;
        let order_index = match new.order_index {
            Some(i) => i,
            None => Self::next_order_index(conn, client_id)?,
        };
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            client_id,
            title,
            description: new.description,
            status: new.status.unwrap_or(StepStatus::NotStarted),
            start_date: new.start_date,
            end_date: new.end_date,
            order_index,
            client_visible: new.client_visible.unwrap_or(true),
            internal_notes: new.internal_notes,
            assigned_to: new.assigned_to,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn create(db: &Db, client_id: Uuid, new: NewStep) -> Result<Self> {
        db.with_tx(|tx| {
            Client::ensure_exists(tx, client_id)?;
            let step = Self::build(tx, client_id, new)?;
            Self::insert(tx, &step)?;
            Ok(step)
        })
    }

    /// Append one not-started step per title, in order.
    pub fn create_many(db: &Db, client_id: Uuid, titles: &[String]) -> Result<Vec<Self>> {
        db.with_tx(|tx| {
            Client::ensure_exists(tx, client_id)?;
            let mut created = Vec::with_capacity(titles.len());
            for title in titles {
                if title.trim().is_empty() {
                    continue;
                }
                let step = Self::build(tx, client_id, NewStep::titled(title.as_str()))?;
                Self::insert(tx, &step)?;
                created.push(step);
            }
            Ok(created)
        })
    }

    pub fn get(db: &Db, id: Uuid) -> Result<Self> {
        db.with_conn(|conn| Self::get_in(conn, id))
    }

    fn get_in(conn: &Connection, id: Uuid) -> Result<Self> {
        conn.query_row(
            &format!("SELECT {COLUMNS} FROM onboarding_steps WHERE id = ?1"),
            [id],
            Self::from_row,
        )
        .map_err(|e| db::not_found_as(e, OnboardError::StepNotFound(id)))
    }

    /// Steps for a client in timeline order.
    pub fn list_for_client(db: &Db, client_id: Uuid) -> Result<Vec<Self>> {
        db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM onboarding_steps WHERE client_id = ?1 \
                 ORDER BY order_index, created_at"
            ))?;
            let rows = stmt.query_map([client_id], Self::from_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    pub fn update(db: &Db, id: Uuid, update: StepUpdate) -> Result<Self> {
        db.with_conn(|conn| {
            let mut step = Self::get_in(conn, id)?;
            if let Some(title) = update.title {
                step.title = require_title(&title)?;
            }
            if let Some(v) = update.description {
                step.description = v;
            }
            if let Some(v) = update.status {
                step.status = v;
            }
            if let Some(v) = update.start_date {
                step.start_date = v;
            }
            if let Some(v) = update.end_date {
                step.end_date = v;
            }
            if let Some(v) = update.order_index {
                step.order_index = v;
            }
            if let Some(v) = update.client_visible {
                step.client_visible = v;
            }
            if let Some(v) = update.internal_notes {
                step.internal_notes = v;
            }
            if let Some(v) = update.assigned_to {
                step.assigned_to = v;
            }
            step.updated_at = Utc::now();
            conn.execute(
                "UPDATE onboarding_steps SET title = ?2, description = ?3, status = ?4, \
                 start_date = ?5, end_date = ?6, order_index = ?7, client_visible = ?8, \
                 internal_notes = ?9, assigned_to = ?10, updated_at = ?11 WHERE id = ?1",
                params![
                    step.id,
                    step.title,
                    step.description,
                    step.status,
                    step.start_date,
                    step.end_date,
                    step.order_index,
                    step.client_visible,
                    step.internal_notes,
                    step.assigned_to,
                    step.updated_at
                ],
            )?;
            Ok(step)
        })
    }

    /// Set the status. Any status may follow any other.
    pub fn update_status(db: &Db, id: Uuid, status: StepStatus) -> Result<Self> {
        Self::update(
            db,
            id,
            StepUpdate {
                status: Some(status),
                ..Default::default()
            },
        )
    }

    pub fn delete(db: &Db, id: Uuid) -> Result<()> {
        db.with_conn(|conn| {
            let n = conn.execute("DELETE FROM onboarding_steps WHERE id = ?1", [id])?;
            if n == 0 {
                return Err(OnboardError::StepNotFound(id));
            }
            Ok(())
        })
    }

    /// Delete every step of a client. Returns the number removed.
    pub fn delete_all_for_client(db: &Db, client_id: Uuid) -> Result<usize> {
        db.with_conn(|conn| {
            Ok(conn.execute(
                "DELETE FROM onboarding_steps WHERE client_id = ?1",
                [client_id],
            )?)
        })
    }

    /// Whole days between start and end, when both are set.
    pub fn duration_days(&self) -> Option<i64> {
        match (self.start_date, self.end_date) {
            (Some(s), Some(e)) => Some((e - s).num_days()),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

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

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn create_defaults() {
        let (db, client) = setup();
        let step = OnboardingStep::create(&db, client, NewStep::titled("Kickoff call")).unwrap();
        assert_eq!(step.status, StepStatus::NotStarted);
        assert!(step.client_visible);
        assert_eq!(step.order_index, 0);
        assert_eq!(OnboardingStep::get(&db, step.id).unwrap(), step);
    }

    #[test]
    fn order_index_appends_and_sorts() {
        let (db, client) = setup();
        OnboardingStep::create(&db, client, NewStep::titled("first")).unwrap();
        OnboardingStep::create(
            &db,
            client,
            NewStep {
                title: "zero".into(),
                order_index: Some(-1),
                ..Default::default()
            },
        )
        .unwrap();
        let third = OnboardingStep::create(&db, client, NewStep::titled("second")).unwrap();
        assert_eq!(third.order_index, 1);

        let titles: Vec<_> = OnboardingStep::list_for_client(&db, client)
            .unwrap()
            .into_iter()
            .map(|s| s.title)
            .collect();
        assert_eq!(titles, vec!["zero", "first", "second"]);
    }

    #[test]
    fn duplicate_order_index_is_allowed() {
        let (db, client) = setup();
        for title in ["a", "b"] {
            OnboardingStep::create(
                &db,
                client,
                NewStep {
                    title: title.into(),
                    order_index: Some(3),
                    ..Default::default()
                },
            )
            .unwrap();
        }
        assert_eq!(OnboardingStep::list_for_client(&db, client).unwrap().len(), 2);
    }

    #[test]
    fn status_transitions_are_permissive() {
        let (db, client) = setup();
        let step = OnboardingStep::create(&db, client, NewStep::titled("x")).unwrap();
        let done = OnboardingStep::update_status(&db, step.id, StepStatus::Completed).unwrap();
        assert_eq!(done.status, StepStatus::Completed);
        let back = OnboardingStep::update_status(&db, step.id, StepStatus::NotStarted).unwrap();
        assert_eq!(back.status, StepStatus::NotStarted);
    }

    #[test]
    fn update_sets_and_clears_fields() {
        let (db, client) = setup();
        let step = OnboardingStep::create(
            &db,
            client,
            NewStep {
                title: "Access".into(),
                assigned_to: Some("dana".into()),
                ..Default::default()
            },
        )
        .unwrap();
        let updated = OnboardingStep::update(
            &db,
            step.id,
            StepUpdate {
                start_date: Some(Some(date("2024-01-01"))),
                end_date: Some(Some(date("2024-01-08"))),
                assigned_to: Some(None),
                client_visible: Some(false),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(updated.duration_days(), Some(7));
        assert!(updated.assigned_to.is_none());
        assert!(!updated.client_visible);
    }

    #[test]
    fn dates_are_stored_as_given() {
        let (db, client) = setup();
        let step = OnboardingStep::create(
            &db,
            client,
            NewStep {
                start_date: Some(date("2024-01-01")),
                end_date: Some(date("2024-01-08")),
                ..NewStep::titled("Kickoff call")
            },
        )
        .unwrap();
        let moved = OnboardingStep::update(
            &db,
            step.id,
            StepUpdate {
                start_date: Some(Some(date("2024-02-01"))),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(moved.start_date, Some(date("2024-02-01")));
        assert_eq!(moved.end_date, Some(date("2024-01-08")));
        assert_eq!(moved.duration_days(), Some(-24));
    }

    #[test]
    fn create_many_and_bulk_delete() {
        let (db, client) = setup();
        OnboardingStep::create(&db, client, NewStep::titled("existing")).unwrap();
        let titles = vec!["Review SOW".to_string(), " ".to_string(), "Grant access".to_string()];
        let created = OnboardingStep::create_many(&db, client, &titles).unwrap();
        assert_eq!(created.len(), 2);
        assert_eq!(created[0].order_index, 1);
        assert_eq!(created[1].order_index, 2);

        assert_eq!(OnboardingStep::delete_all_for_client(&db, client).unwrap(), 3);
        assert!(OnboardingStep::list_for_client(&db, client).unwrap().is_empty());
    }

    #[test]
    fn delete_unknown_is_not_found() {
        let (db, _client) = setup();
        assert!(matches!(
            OnboardingStep::delete(&db, Uuid::new_v4()),
            Err(OnboardError::StepNotFound(_))
        ));
    }

    #[test]
    fn double_option_distinguishes_null() {
        let u: StepUpdate = serde_json::from_str(r#"{"assigned_to": null}"#).unwrap();
        assert_eq!(u.assigned_to, Some(None));
        let u: StepUpdate = serde_json::from_str("{}").unwrap();
        assert_eq!(u.assigned_to, None);
    }
}
