//! Asset Store
//!
//! The in-process copy of every asset record. Mutations apply locally and
//! synchronously, then a remote write is spawned; reads never wait on the
//! remote service. Loads and write settlements are ordered with a logical
//! clock so that a slow response can never undo a newer local change.

mod state;
pub mod sync;
#[cfg(test)]
pub(crate) mod test_support;

pub use sync::{
    LoadOutcome, LoadPhase, PendingSync, ReconciliationPolicy, StoreEntry, SyncFailure,
    SyncOperation, SyncState,
};

use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::infrastructure::record_service::{
    RecordService, RecordServiceError, RemoteOutcome, WriteAck,
};
use crate::models::{Asset, AssetDraft, AssetPatch, ValidationError, DEFAULT_MAX_IMAGE_BYTES};
use state::{StoreState, Undo, WriteTurn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Asset id {0} is already in use")]
    DuplicateId(String),
    #[error("Remote write failed: {0}")]
    Remote(RecordServiceError),
    #[error("Sync task failed: {0}")]
    Task(String),
}

#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub reconciliation: ReconciliationPolicy,
    pub max_image_bytes: usize,
    /// How many failed remote writes `sync_failures()` remembers
    pub failure_log_capacity: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            reconciliation: ReconciliationPolicy::default(),
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            failure_log_capacity: 50,
        }
    }
}

#[derive(Debug)]
struct StoreInner {
    service: Arc<dyn RecordService>,
    options: StoreOptions,
    state: RwLock<StoreState>,
}

impl StoreInner {
    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn settle(
        &self,
        asset_id: &str,
        ticket: u64,
        undo: Undo,
        outcome: RemoteOutcome,
    ) -> Result<WriteAck, StoreError> {
        let operation = undo.operation();
        match outcome {
            Ok(ack) => {
                self.write().settle_success(asset_id, ticket, undo);
                debug!(asset_id, %operation, ?ack, "Remote write settled");
                Ok(ack)
            }
            Err(e) => {
                warn!(
                    asset_id,
                    %operation,
                    policy = ?self.options.reconciliation,
                    error = %e,
                    "Remote write failed"
                );
                self.write().settle_failure(
                    asset_id,
                    ticket,
                    undo,
                    e.to_string(),
                    self.options.reconciliation,
                );
                Err(StoreError::Remote(e))
            }
        }
    }
}

/// Shared handle on the asset collection. Cloning is cheap.
///
/// Mutations spawn their remote write on the current tokio runtime, so they
/// must be called from within one.
#[derive(Debug, Clone)]
pub struct AssetStore {
    inner: Arc<StoreInner>,
}

impl AssetStore {
    pub fn new(service: Arc<dyn RecordService>, options: StoreOptions) -> Self {
        let state = StoreState::new(options.failure_log_capacity);
        Self {
            inner: Arc::new(StoreInner {
                service,
                options,
                state: RwLock::new(state),
            }),
        }
    }

    /// Fetch the whole collection and reconcile it with local changes
    pub async fn load(&self) -> LoadOutcome {
        let ticket = self.inner.write().begin_load();
        debug!(seq = ticket.seq, "Loading assets");

        let result = self
            .inner
            .service
            .fetch_all()
            .await
            .map_err(|e| e.to_string());
        if let Err(reason) = &result {
            warn!(seq = ticket.seq, error = %reason, "Failed to load assets, keeping the current collection");
        }

        let outcome = self.inner.write().finish_load(ticket, result);
        match &outcome {
            LoadOutcome::Applied { records } => {
                info!(seq = ticket.seq, records, "Asset collection loaded")
            }
            LoadOutcome::Superseded => debug!(seq = ticket.seq, "Dropping superseded load"),
            LoadOutcome::Failed { .. } => {}
        }
        outcome
    }

    pub async fn refresh(&self) -> LoadOutcome {
        self.load().await
    }

    /// Add a record. It is visible as soon as this returns.
    pub fn create(&self, draft: AssetDraft) -> Result<PendingSync, StoreError> {
        let asset = draft.into_asset(self.inner.options.max_image_bytes)?;
        let asset_id = asset.id.clone();
        let turn = {
            let mut state = self.inner.write();
            state.insert_pending_create(asset.clone())?;
            state.queue_write(&asset_id)
        };
        info!(asset_id = %asset_id, operation = "create", "Asset added");

        Ok(self.spawn_write(asset_id, turn, Undo::Create, move |service| async move {
            service.create(&asset).await
        }))
    }

    /// Merge `patch` into a record and send only the patch. `Ok(None)` when
    /// no visible record has `id`.
    pub fn update(&self, id: &str, patch: AssetPatch) -> Result<Option<PendingSync>, StoreError> {
        let patch = patch.validated(self.inner.options.max_image_bytes)?;
        let (turn, undo) = {
            let mut state = self.inner.write();
            let Some(undo) = state.apply_update(id, &patch) else {
                return Ok(None);
            };
            (state.queue_write(id), undo)
        };
        info!(asset_id = id, operation = "update", "Asset updated");

        let asset_id = id.to_string();
        let remote_id = asset_id.clone();
        Ok(Some(self.spawn_write(asset_id, turn, undo, move |service| async move {
            service.update(&remote_id, &patch).await
        })))
    }

    /// Hide a record and delete it remotely. `Ok(None)` when no visible record has `id`.
    pub fn delete(&self, id: &str) -> Result<Option<PendingSync>, StoreError> {
        let (turn, undo) = {
            let mut state = self.inner.write();
            let Some(undo) = state.mark_pending_delete(id) else {
                return Ok(None);
            };
            (state.queue_write(id), undo)
        };
        info!(asset_id = id, operation = "delete", "Asset deleted");

        let asset_id = id.to_string();
        let remote_id = asset_id.clone();
        Ok(Some(self.spawn_write(asset_id, turn, undo, move |service| async move {
            service.delete(&remote_id).await
        })))
    }

    /// Send a remote write once every earlier write for the same record has settled
    fn spawn_write<F, Fut>(
        &self,
        asset_id: String,
        turn: WriteTurn,
        undo: Undo,
        call: F,
    ) -> PendingSync
    where
        F: FnOnce(Arc<dyn RecordService>) -> Fut,
        Fut: Future<Output = RemoteOutcome> + Send + 'static,
    {
        let operation = undo.operation();
        let inner = Arc::clone(&self.inner);
        let request = call(Arc::clone(&inner.service));
        let id = asset_id.clone();
        let WriteTurn {
            ticket,
            after,
            done,
        } = turn;

        let handle = tokio::spawn(async move {
            if let Some(previous) = after {
                // A dropped sender means the previous write is gone either way
                let _ = previous.await;
            }
            let outcome = request.await;
            let result = inner.settle(&id, ticket, undo, outcome);
            let _ = done.send(());
            result
        });

        PendingSync {
            asset_id,
            operation,
            handle,
        }
    }

    // Reads

    /// Visible records in collection order
    pub fn assets(&self) -> Vec<Asset> {
        self.inner.read().assets()
    }

    pub fn get(&self, id: &str) -> Option<Asset> {
        self.inner.read().get(id)
    }

    pub fn entry(&self, id: &str) -> Option<StoreEntry> {
        self.inner.read().entry(id)
    }

    pub fn entries(&self) -> Vec<StoreEntry> {
        self.inner.read().entries()
    }

    pub fn sync_state(&self, id: &str) -> Option<SyncState> {
        self.inner.read().sync_state(id)
    }

    pub fn phase(&self) -> LoadPhase {
        self.inner.read().phase()
    }

    pub fn is_loading(&self) -> bool {
        self.phase() == LoadPhase::Loading
    }

    pub fn last_load_error(&self) -> Option<String> {
        self.inner.read().last_load_error()
    }

    /// Recent failed remote writes, oldest first
    pub fn sync_failures(&self) -> Vec<SyncFailure> {
        self.inner.read().failures()
    }

    pub fn endpoint(&self) -> &str {
        self.inner.service.endpoint()
    }

    pub fn options(&self) -> &StoreOptions {
        &self.inner.options
    }
}
