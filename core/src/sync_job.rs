//! Durable catalog-sync job rows.

use crate::space::SpaceSnapshot;
use crate::types::SpaceId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which space mutation produced the job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncEventType {
    /// Space row inserted
    Insert,
    /// Space row updated
    Update,
    /// Space row deleted (catalog product gets archived, not deleted)
    Delete,
}

impl SyncEventType {
    /// Database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    /// Parse an event type from its database string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "insert" => Some(Self::Insert),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }
}

/// Processing status of a sync job.
///
/// `Done` and `Error` are terminal; a failed job is retried only by a fresh
/// enqueue, never by re-running the same row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncJobStatus {
    /// Waiting for a worker
    Pending,
    /// Processed successfully
    Done,
    /// Failed; error text recorded on the row
    Error,
}

impl SyncJobStatus {
    /// Database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Done => "done",
            Self::Error => "error",
        }
    }

    /// Parse a status from its database string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "done" => Some(Self::Done),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// One pending unit of catalog-reconciliation work for a space.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SyncJob {
    /// Queue row id
    pub id: i64,
    /// Space the job reconciles
    pub space_id: SpaceId,
    /// Which mutation produced the job
    pub event_type: SyncEventType,
    /// Space snapshot captured at enqueue time
    pub payload: SpaceSnapshot,
    /// Processing status
    pub status: SyncJobStatus,
    /// Error text, for `Error` rows
    pub error_message: Option<String>,
    /// Enqueue timestamp
    pub created_at: DateTime<Utc>,
    /// Terminal-transition timestamp
    pub processed_at: Option<DateTime<Utc>>,
}
