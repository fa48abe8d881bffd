//! Audit trail of queue mutations.
//!
//! Rows are `(timestamp, user, action, queue, rep, details)`. Writing is
//! best effort: callers log and swallow [`AuditError`].

pub mod log_file;

pub use log_file::JsonlAuditLog;

use async_trait::async_trait;
use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Timestamp layout used in audit rows.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Kind of change recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    #[serde(rename = "Updated weight")]
    WeightUpdate,
    #[serde(rename = "Removed rep from queue")]
    RepRemove,
    #[serde(rename = "Added rep to queue")]
    RepAdd,
}

impl ActionKind {
    pub const ALL: [ActionKind; 3] = [
        ActionKind::WeightUpdate,
        ActionKind::RepRemove,
        ActionKind::RepAdd,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ActionKind::WeightUpdate => "Updated weight",
            ActionKind::RepRemove => "Removed rep from queue",
            ActionKind::RepAdd => "Added rep to queue",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        match normalized.as_str() {
            "weight" | "weight-update" | "updated weight" => Ok(ActionKind::WeightUpdate),
            "remove" | "rep-remove" | "removed rep from queue" => Ok(ActionKind::RepRemove),
            "add" | "rep-add" | "added rep to queue" => Ok(ActionKind::RepAdd),
            _ => Err(format!(
                "unknown action '{}' (expected weight, remove or add)",
                s
            )),
        }
    }
}

/// One audit row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    #[serde(with = "timestamp")]
    pub timestamp: NaiveDateTime,
    /// Acting user.
    pub user: String,
    pub action: ActionKind,
    pub queue: String,
    pub rep: String,
    pub details: String,
}

impl AuditEntry {
    /// A row stamped with the current local time.
    pub fn now(
        user: impl Into<String>,
        action: ActionKind,
        queue: impl Into<String>,
        rep: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Local::now().naive_local(),
            user: user.into(),
            action,
            queue: queue.into(),
            rep: rep.into(),
            details: details.into(),
        }
    }

    pub fn formatted_timestamp(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }
}

mod timestamp {
    use super::TIMESTAMP_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(TIMESTAMP_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT).map_err(serde::de::Error::custom)
    }
}

/// Filters for reading the audit log back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditFilter {
    /// Calendar day of the timestamp.
    pub date: Option<NaiveDate>,
    pub action: Option<ActionKind>,
    /// Case-insensitive substring of the acting user.
    pub user: Option<String>,
}

impl AuditFilter {
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        self.date.map_or(true, |d| entry.timestamp.date() == d)
            && self.action.map_or(true, |a| entry.action == a)
            && self.user.as_deref().map_or(true, |u| {
                entry.user.to_lowercase().contains(&u.to_lowercase())
            })
    }
}

/// Why an audit write or read failed.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit log is not configured")]
    NotConfigured,

    #[error("audit log I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode audit entry: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Append-only destination for audit rows.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, entry: &AuditEntry) -> Result<(), AuditError>;
}

/// The audit destination chosen by configuration.
#[derive(Debug, Clone)]
pub enum AuditLog {
    /// No log path configured; every append fails with [`AuditError::NotConfigured`].
    Disabled,
    File(JsonlAuditLog),
}

impl AuditLog {
    pub fn from_path(path: Option<std::path::PathBuf>) -> Self {
        match path {
            Some(path) => AuditLog::File(JsonlAuditLog::new(path)),
            None => AuditLog::Disabled,
        }
    }

    /// Read rows matching `filter`.
    pub async fn read(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>, AuditError> {
        match self {
            AuditLog::Disabled => Err(AuditError::NotConfigured),
            AuditLog::File(log) => log.read(filter).await,
        }
    }
}

#[async_trait]
impl AuditSink for AuditLog {
    async fn append(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        match self {
            AuditLog::Disabled => Err(AuditError::NotConfigured),
            AuditLog::File(log) => log.append(entry).await,
        }
    }
}
