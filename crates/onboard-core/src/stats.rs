//! Aggregate counts for the dashboard and reports.
//!
//! The bucketing functions are pure and take raw status strings, so rows
//! written by older tooling with values outside the closed sets are simply
//! not bucketed. `total` always counts every row scanned.

use crate::db::Db;
use crate::error::Result;
use crate::step::OnboardingStep;
use crate::types::{EngagementStatus, RiskSeverity, RiskStatus, StepStatus};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Months covered by [`monthly_growth`].
pub const GROWTH_MONTHS: usize = 12;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementStats {
    pub draft: usize,
    pub sent: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub on_hold: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepStats {
    pub not_started: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub on_hold: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskStatusCounts {
    pub open: usize,
    pub in_progress: usize,
    pub mitigated: usize,
    pub closed: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskSeverityCounts {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
    pub critical: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskStats {
    pub by_status: RiskStatusCounts,
    pub by_severity: RiskSeverityCounts,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyGrowth {
    /// `YYYY-MM`
    pub month: String,
    pub client_count: usize,
    pub engagement_count: usize,
}

/// Everything the dashboard shows, in one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub client_count: usize,
    pub engagements: EngagementStats,
    pub steps: StepStats,
    pub risks: RiskStats,
    pub average_onboarding_days: f64,
    pub monthly_growth: Vec<MonthlyGrowth>,
}

// ---------------------------------------------------------------------------
// Pure aggregation
// ---------------------------------------------------------------------------

pub fn engagement_stats<'a>(statuses: impl IntoIterator<Item = &'a str>) -> EngagementStats {
    let mut s = EngagementStats::default();
    for status in statuses {
        s.total += 1;
        match status.parse::<EngagementStatus>() {
            Ok(EngagementStatus::Draft) => s.draft += 1,
            Ok(EngagementStatus::Sent) => s.sent += 1,
            Ok(EngagementStatus::InProgress) => s.in_progress += 1,
            Ok(EngagementStatus::Completed) => s.completed += 1,
            Ok(EngagementStatus::OnHold) => s.on_hold += 1,
            Err(_) => {}
        }
    }
    s
}

pub fn step_stats<'a>(statuses: impl IntoIterator<Item = &'a str>) -> StepStats {
    let mut s = StepStats::default();
    for status in statuses {
        s.total += 1;
        match status.parse::<StepStatus>() {
            Ok(StepStatus::NotStarted) => s.not_started += 1,
            Ok(StepStatus::InProgress) => s.in_progress += 1,
            Ok(StepStatus::Completed) => s.completed += 1,
            Ok(StepStatus::OnHold) => s.on_hold += 1,
            Err(_) => {}
        }
    }
    s
}

/// Bucket `(status, severity)` pairs.
pub fn risk_stats<'a>(rows: impl IntoIterator<Item = (&'a str, &'a str)>) -> RiskStats {
    let mut s = RiskStats::default();
    for (status, severity) in rows {
        s.total += 1;
        match status.parse::<RiskStatus>() {
            Ok(RiskStatus::Open) => s.by_status.open += 1,
            Ok(RiskStatus::InProgress) => s.by_status.in_progress += 1,
            Ok(RiskStatus::Mitigated) => s.by_status.mitigated += 1,
            Ok(RiskStatus::Closed) => s.by_status.closed += 1,
            Err(_) => {}
        }
        match severity.parse::<RiskSeverity>() {
            Ok(RiskSeverity::Low) => s.by_severity.low += 1,
            Ok(RiskSeverity::Medium) => s.by_severity.medium += 1,
            Ok(RiskSeverity::High) => s.by_severity.high += 1,
            Ok(RiskSeverity::Critical) => s.by_severity.critical += 1,
            Err(_) => {}
        }
    }
    s
}

fn mean(days: impl IntoIterator<Item = i64>) -> f64 {
    let (sum, n) = days
        .into_iter()
        .fold((0i64, 0usize), |(sum, n), d| (sum + d, n + 1));
    if n == 0 {
        0.0
    } else {
        sum as f64 / n as f64
    }
}

/// Mean of `end - start` in whole days; `0.0` for no spans.
pub fn mean_days(spans: impl IntoIterator<Item = (NaiveDate, NaiveDate)>) -> f64 {
    mean(spans.into_iter().map(|(start, end)| (end - start).num_days()))
}

/// Average duration of completed steps that carry both dates.
pub fn average_onboarding_days(steps: &[OnboardingStep]) -> f64 {
    mean(
        steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .filter_map(OnboardingStep::duration_days),
    )
}

fn month_key(year: i32, month: u32) -> String {
    format!("{year:04}-{month:02}")
}

/// Twelve months ending with `now`'s month, oldest first.
///
/// Timestamps outside the window are ignored.
pub fn monthly_growth(
    now: DateTime<Utc>,
    clients: &[DateTime<Utc>],
    engagements: &[DateTime<Utc>],
) -> Vec<MonthlyGrowth> {
    // Months since year 0, so stepping back never has to borrow a year.
    let current = now.year() * 12 + now.month0() as i32;
    let first = current - (GROWTH_MONTHS as i32 - 1);

    let mut out: Vec<MonthlyGrowth> = (first..=current)
        .map(|m| MonthlyGrowth {
            month: month_key(m.div_euclid(12), m.rem_euclid(12) as u32 + 1),
            client_count: 0,
            engagement_count: 0,
        })
        .collect();

    let slot = |t: &DateTime<Utc>| {
        let m = t.year() * 12 + t.month0() as i32;
        (first..=current)
            .contains(&m)
            .then(|| (m - first) as usize)
    };
    for t in clients {
        if let Some(i) = slot(t) {
            out[i].client_count += 1;
        }
    }
    for t in engagements {
        if let Some(i) = slot(t) {
            out[i].engagement_count += 1;
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Store fetch helpers
// ---------------------------------------------------------------------------

fn column<T: rusqlite::types::FromSql>(
    db: &Db,
    sql: &str,
    client_id: Option<Uuid>,
) -> Result<Vec<T>> {
    db.with_conn(|conn| {
        tracing::debug!(sql, "stats query");
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params![client_id], |r| r.get(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    })
}

pub fn fetch_engagement_stats(db: &Db, client_id: Option<Uuid>) -> Result<EngagementStats> {
    let statuses: Vec<String> = column(
        db,
        "SELECT status FROM client_engagements WHERE ?1 IS NULL OR client_id = ?1",
        client_id,
    )?;
    Ok(engagement_stats(statuses.iter().map(String::as_str)))
}

pub fn fetch_step_stats(db: &Db, client_id: Option<Uuid>) -> Result<StepStats> {
    let statuses: Vec<String> = column(
        db,
        "SELECT status FROM onboarding_steps WHERE ?1 IS NULL OR client_id = ?1",
        client_id,
    )?;
    Ok(step_stats(statuses.iter().map(String::as_str)))
}

pub fn fetch_risk_stats(db: &Db, client_id: Option<Uuid>) -> Result<RiskStats> {
    let rows: Vec<(String, String)> = db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT status, severity FROM risks WHERE ?1 IS NULL OR client_id = ?1",
        )?;
        let rows = stmt.query_map(params![client_id], |r| Ok((r.get(0)?, r.get(1)?)))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    })?;
    Ok(risk_stats(
        rows.iter().map(|(st, sev)| (st.as_str(), sev.as_str())),
    ))
}

pub fn fetch_average_onboarding_days(db: &Db, client_id: Option<Uuid>) -> Result<f64> {
    let spans: Vec<(NaiveDate, NaiveDate)> = db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT start_date, end_date FROM onboarding_steps \
             WHERE status = 'completed' AND start_date IS NOT NULL AND end_date IS NOT NULL \
             AND (?1 IS NULL OR client_id = ?1)",
        )?;
        let rows = stmt.query_map(params![client_id], |r| Ok((r.get(0)?, r.get(1)?)))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    })?;
    Ok(mean_days(spans))
}

pub fn fetch_monthly_growth(db: &Db, now: DateTime<Utc>) -> Result<Vec<MonthlyGrowth>> {
    let clients: Vec<DateTime<Utc>> = column(
        db,
        "SELECT created_at FROM clients WHERE ?1 IS NULL OR id = ?1",
        None,
    )?;
    let engagements: Vec<DateTime<Utc>> = column(
        db,
        "SELECT created_at FROM client_engagements WHERE ?1 IS NULL OR client_id = ?1",
        None,
    )?;
    Ok(monthly_growth(now, &clients, &engagements))
}

/// All dashboard figures, optionally narrowed to one client. Growth is
/// always global.
pub fn dashboard(db: &Db, client_id: Option<Uuid>, now: DateTime<Utc>) -> Result<Dashboard> {
    let client_count = db.with_conn(|conn| {
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM clients WHERE ?1 IS NULL OR id = ?1",
            params![client_id],
            |r| r.get(0),
        )?;
        Ok(n as usize)
    })?;
    Ok(Dashboard {
        client_count,
        engagements: fetch_engagement_stats(db, client_id)?,
        steps: fetch_step_stats(db, client_id)?,
        risks: fetch_risk_stats(db, client_id)?,
        average_onboarding_days: fetch_average_onboarding_days(db, client_id)?,
        monthly_growth: fetch_monthly_growth(db, now)?,
    })
}
