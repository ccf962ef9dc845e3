use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::infrastructure::record_service::WriteAck;
use crate::models::Asset;
use crate::store::StoreError;

/// Remote write kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncOperation {
    Create,
    Update,
    Delete,
}

impl fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SyncOperation::Create => "create",
            SyncOperation::Update => "update",
            SyncOperation::Delete => "delete",
        })
    }
}

/// Where a record stands relative to the remote service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SyncState {
    PendingCreate,
    Synced,
    PendingUpdate,
    PendingDelete,
    /// The remote write failed and the local change was kept
    Failed {
        operation: SyncOperation,
        reason: String,
    },
}

impl SyncState {
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            SyncState::PendingCreate | SyncState::PendingUpdate | SyncState::PendingDelete
        )
    }
}

/// A failed remote write, as kept in the store's failure log
#[derive(Debug, Clone, Serialize)]
pub struct SyncFailure {
    pub asset_id: String,
    pub operation: SyncOperation,
    pub reason: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadPhase {
    Uninitialized,
    Loading,
    Ready,
}

/// Result of a `load()`. Loads never raise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LoadOutcome {
    /// The response replaced the collection, which now holds `records` visible entries
    Applied { records: usize },
    /// A newer load was issued before this one returned
    Superseded,
    /// The collection was left as it was
    Failed { reason: String },
}

/// What to do with a local change whose remote write failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationPolicy {
    /// Undo the change locally
    #[default]
    Rollback,
    /// Keep the change and mark the record as failed until the next refresh
    KeepOptimistic,
}

impl FromStr for ReconciliationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rollback" => Ok(Self::Rollback),
            "keep" | "keep_optimistic" => Ok(Self::KeepOptimistic),
            other => Err(format!("unknown reconciliation policy: {}", other)),
        }
    }
}

/// A record together with its sync state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreEntry {
    pub asset: Asset,
    pub sync: SyncState,
}

impl AsRef<Asset> for StoreEntry {
    fn as_ref(&self) -> &Asset {
        &self.asset
    }
}

/// Handle on a spawned remote write.
///
/// The local change is already visible when this is returned. Dropping the
/// handle does not cancel the write.
#[derive(Debug)]
pub struct PendingSync {
    pub(crate) asset_id: String,
    pub(crate) operation: SyncOperation,
    pub(crate) handle: JoinHandle<Result<WriteAck, StoreError>>,
}

impl PendingSync {
    pub fn asset_id(&self) -> &str {
        &self.asset_id
    }

    pub fn operation(&self) -> SyncOperation {
        self.operation
    }

    /// Wait for the remote write and its reconciliation to finish
    pub async fn settled(self) -> Result<WriteAck, StoreError> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) => Err(StoreError::Task(e.to_string())),
        }
    }
}
