//! Secondary entities: advisory locks and append-only audit trails
//! (spec.md §3 "Locks", "SyncLog/DispatchEvents").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lock {
    pub name: String,
    pub owner: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncLogEntry {
    pub id: Option<i64>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub repos_synced: u32,
    pub items_synced: u32,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchOutcome {
    Success,
    Failure,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchEvent {
    pub id: Option<i64>,
    pub item_id: String,
    pub action: String,
    pub revision: String,
    pub agent: String,
    pub outcome: DispatchOutcome,
    pub timestamp: DateTime<Utc>,
    pub detail: Option<String>,
}
