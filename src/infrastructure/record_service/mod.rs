//! Remote record service
//!
//! The spreadsheet-backed endpoint that persists asset records. It accepts a
//! plain `GET` for the whole collection and `POST`ed JSON actions for writes:
//!
//! - `{"action": "save", "asset": {...}}`
//! - `{"action": "update", "id": "...", "data": {...changed fields}}`
//! - `{"action": "delete", "id": "..."}`

pub mod client;
pub mod error;

pub use client::HttpRecordService;
pub use error::RecordServiceError;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::Serialize;

use crate::models::{Asset, AssetPatch};

/// How a write was acknowledged by the remote side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteAck {
    /// The service answered with a success status
    Confirmed,
    /// The exchange completed but its answer was not inspected
    Assumed,
}

/// Policy for turning a completed write exchange into a [`WriteAck`].
///
/// Apps Script deployments often answer writes with redirects or opaque
/// bodies, so by default any exchange that completes counts as success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteAcknowledgement {
    #[default]
    AssumeSuccess,
    RequireSuccessStatus,
}

impl FromStr for WriteAcknowledgement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "assume" | "assume_success" => Ok(Self::AssumeSuccess),
            "status" | "require_success_status" => Ok(Self::RequireSuccessStatus),
            other => Err(format!("unknown write acknowledgement policy: {}", other)),
        }
    }
}

/// Uniform result of every remote write
pub type RemoteOutcome = Result<WriteAck, RecordServiceError>;

/// Write actions understood by the record service
#[derive(Debug, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum WriteRequest<'a> {
    Save { asset: &'a Asset },
    Update { id: &'a str, data: &'a AssetPatch },
    Delete { id: &'a str },
}

impl WriteRequest<'_> {
    pub fn action(&self) -> &'static str {
        match self {
            WriteRequest::Save { .. } => "save",
            WriteRequest::Update { .. } => "update",
            WriteRequest::Delete { .. } => "delete",
        }
    }
}

impl fmt::Display for WriteRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.action())
    }
}

/// Backend that persists asset records
#[async_trait]
pub trait RecordService: Send + Sync + fmt::Debug {
    /// Endpoint the service talks to, for display and logging
    fn endpoint(&self) -> &str;

    /// Fetch the whole collection
    async fn fetch_all(&self) -> Result<Vec<Asset>, RecordServiceError>;

    async fn create(&self, asset: &Asset) -> RemoteOutcome;

    /// Send only the changed fields of a record
    async fn update(&self, id: &str, patch: &AssetPatch) -> RemoteOutcome;

    async fn delete(&self, id: &str) -> RemoteOutcome;
}
