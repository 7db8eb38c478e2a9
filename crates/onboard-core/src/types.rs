use crate::error::OnboardError;
use crate::storage::Bucket;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declares a closed status set with its wire spelling.
///
/// Every generated enum gets `all()`, `as_str()`, `Display`, `FromStr`
/// and SQLite conversions. Unknown strings parse to
/// [`OnboardError::InvalidStatus`].
macro_rules! status_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $($variant:ident => $s:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn all() -> &'static [$name] {
                &[$($name::$variant),+]
            }

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $s),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = OnboardError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok($name::$variant),)+
                    _ => Err(OnboardError::InvalidStatus {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: OnboardError| FromSqlError::Other(Box::new(e)))
            }
        }
    };
}

// ---------------------------------------------------------------------------
// StepStatus
// ---------------------------------------------------------------------------

status_enum! {
    StepStatus, "step status" {
        NotStarted => "not_started",
        InProgress => "in_progress",
        Completed => "completed",
        OnHold => "on_hold",
    }
}

// ---------------------------------------------------------------------------
// EngagementStatus
// ---------------------------------------------------------------------------

status_enum! {
    EngagementStatus, "engagement status" {
        Draft => "draft",
        Sent => "sent",
        InProgress => "in_progress",
        Completed => "completed",
        OnHold => "on_hold",
    }
}

// ---------------------------------------------------------------------------
// Risk enums
// ---------------------------------------------------------------------------

status_enum! {
    RiskStatus, "risk status" {
        Open => "open",
        InProgress => "in_progress",
        Mitigated => "mitigated",
        Closed => "closed",
    }
}

status_enum! {
    RiskSeverity, "risk severity" {
        Low => "low",
        Medium => "medium",
        High => "high",
        Critical => "critical",
    }
}

status_enum! {
    RiskLikelihood, "risk likelihood" {
        Low => "low",
        Medium => "medium",
        High => "high",
    }
}

// ---------------------------------------------------------------------------
// SignatureStatus
// ---------------------------------------------------------------------------

status_enum! {
    SignatureStatus, "signature status" {
        Draft => "draft",
        Sent => "sent",
        Viewed => "viewed",
        Signed => "signed",
        Declined => "declined",
        Voided => "voided",
    }
}

// ---------------------------------------------------------------------------
// DocumentType
// ---------------------------------------------------------------------------

status_enum! {
    DocumentType, "document type" {
        Sow => "sow",
        KickoffMaterial => "kickoff_material",
    }
}

impl DocumentType {
    /// The object bucket files of this type are uploaded to.
    pub fn bucket(self) -> Bucket {
        match self {
            DocumentType::Sow => Bucket::SowDocuments,
            DocumentType::KickoffMaterial => Bucket::KickoffMaterials,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
