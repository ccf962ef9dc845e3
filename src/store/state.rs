// Collection state behind the store lock. Every method here is synchronous and
// runs with the write guard held.

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::Utc;
use tokio::sync::oneshot;

use crate::models::{Asset, AssetPatch};
use crate::store::sync::{
    LoadOutcome, LoadPhase, ReconciliationPolicy, StoreEntry, SyncFailure, SyncOperation,
    SyncState,
};
use crate::store::StoreError;

#[derive(Debug)]
struct Entry {
    asset: Asset,
    sync: SyncState,
    /// Last state the remote service is known to hold
    confirmed: Asset,
    /// A remote write failed under rollback; restore `confirmed` once idle
    diverged: bool,
    /// Clock value of the last event of any kind
    touched: u64,
    /// Remote writes not yet settled
    inflight: u32,
}

impl Entry {
    fn visible(&self) -> bool {
        self.sync != SyncState::PendingDelete
    }

    fn to_store_entry(&self) -> StoreEntry {
        StoreEntry {
            asset: self.asset.clone(),
            sync: self.sync.clone(),
        }
    }

    fn keeps_local_copy(&self, issued_at: u64) -> bool {
        self.sync.is_pending() || self.inflight > 0 || self.touched > issued_at
    }

    fn synced(asset: Asset, touched: u64) -> Self {
        Self {
            confirmed: asset.clone(),
            asset,
            sync: SyncState::Synced,
            diverged: false,
            touched,
            inflight: 0,
        }
    }

    /// Once nothing is in flight a pending create or update has nothing left
    /// to wait for. Writes for one record settle in order, so at that point
    /// `confirmed` is exactly what the remote service holds.
    fn quiesce(&mut self) {
        if self.inflight > 0 {
            return;
        }
        if self.diverged {
            self.asset = self.confirmed.clone();
            self.diverged = false;
        }
        if matches!(self.sync, SyncState::PendingCreate | SyncState::PendingUpdate) {
            self.sync = SyncState::Synced;
        }
    }
}

/// How to take back a local mutation
#[derive(Debug)]
pub(crate) enum Undo {
    Create,
    Update { patch: AssetPatch },
    Delete { prior_sync: SyncState },
}

impl Undo {
    pub(crate) fn operation(&self) -> SyncOperation {
        match self {
            Undo::Create => SyncOperation::Create,
            Undo::Update { .. } => SyncOperation::Update,
            Undo::Delete { .. } => SyncOperation::Delete,
        }
    }
}

/// A remote write's place in its record's queue. Writes for one record are
/// sent one at a time, in the order their local mutations happened.
#[derive(Debug)]
pub(crate) struct WriteTurn {
    pub(crate) ticket: u64,
    /// Fires when the previous write for the same record has settled
    pub(crate) after: Option<oneshot::Receiver<()>>,
    pub(crate) done: oneshot::Sender<()>,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct LoadTicket {
    pub(crate) seq: u64,
    issued_at: u64,
}

#[derive(Debug)]
pub(crate) struct StoreState {
    phase: LoadPhase,
    entries: Vec<Entry>,
    /// Ids deleted remotely, with the clock value of the deletion
    tombstones: HashMap<String, u64>,
    clock: u64,
    load_seq: u64,
    last_load_error: Option<String>,
    failures: VecDeque<SyncFailure>,
    failure_capacity: usize,
    write_seq: u64,
    /// Latest queued write per record id
    write_tails: HashMap<String, (u64, oneshot::Receiver<()>)>,
}

impl StoreState {
    pub(crate) fn new(failure_capacity: usize) -> Self {
        Self {
            phase: LoadPhase::Uninitialized,
            entries: Vec::new(),
            tombstones: HashMap::new(),
            clock: 0,
            load_seq: 0,
            last_load_error: None,
            failures: VecDeque::new(),
            failure_capacity,
            write_seq: 0,
            write_tails: HashMap::new(),
        }
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.asset.id == id)
    }

    fn visible_mut(&mut self, id: &str) -> Option<&mut Entry> {
        self.entries
            .iter_mut()
            .find(|e| e.asset.id == id && e.visible())
    }

    // Reads

    pub(crate) fn phase(&self) -> LoadPhase {
        self.phase
    }

    pub(crate) fn last_load_error(&self) -> Option<String> {
        self.last_load_error.clone()
    }

    pub(crate) fn assets(&self) -> Vec<Asset> {
        self.entries
            .iter()
            .filter(|e| e.visible())
            .map(|e| e.asset.clone())
            .collect()
    }

    pub(crate) fn get(&self, id: &str) -> Option<Asset> {
        self.entries
            .iter()
            .find(|e| e.asset.id == id && e.visible())
            .map(|e| e.asset.clone())
    }

    pub(crate) fn entry(&self, id: &str) -> Option<StoreEntry> {
        self.entries
            .iter()
            .find(|e| e.asset.id == id && e.visible())
            .map(Entry::to_store_entry)
    }

    pub(crate) fn entries(&self) -> Vec<StoreEntry> {
        self.entries
            .iter()
            .filter(|e| e.visible())
            .map(Entry::to_store_entry)
            .collect()
    }

    /// Includes records hidden by a pending delete
    pub(crate) fn sync_state(&self, id: &str) -> Option<SyncState> {
        self.entries
            .iter()
            .find(|e| e.asset.id == id)
            .map(|e| e.sync.clone())
    }

    pub(crate) fn failures(&self) -> Vec<SyncFailure> {
        self.failures.iter().cloned().collect()
    }

    // Local mutations

    pub(crate) fn insert_pending_create(&mut self, asset: Asset) -> Result<(), StoreError> {
        if self.position(&asset.id).is_some() {
            return Err(StoreError::DuplicateId(asset.id));
        }
        let now = self.tick();
        self.entries.push(Entry {
            confirmed: asset.clone(),
            asset,
            sync: SyncState::PendingCreate,
            diverged: false,
            touched: now,
            inflight: 1,
        });
        Ok(())
    }

    pub(crate) fn apply_update(&mut self, id: &str, patch: &AssetPatch) -> Option<Undo> {
        let now = self.clock + 1;
        let entry = self.visible_mut(id)?;
        patch.apply_to(&mut entry.asset);
        if entry.sync != SyncState::PendingCreate {
            entry.sync = SyncState::PendingUpdate;
        }
        entry.touched = now;
        entry.inflight += 1;
        self.clock = now;
        Some(Undo::Update {
            patch: patch.clone(),
        })
    }

    pub(crate) fn mark_pending_delete(&mut self, id: &str) -> Option<Undo> {
        let now = self.clock + 1;
        let entry = self.visible_mut(id)?;
        let undo = Undo::Delete {
            prior_sync: entry.sync.clone(),
        };
        entry.sync = SyncState::PendingDelete;
        entry.touched = now;
        entry.inflight += 1;
        self.clock = now;
        Some(undo)
    }

    /// Queue a remote write for `id` behind any write already queued for it.
    /// Call under the same guard as the local mutation it sends.
    pub(crate) fn queue_write(&mut self, id: &str) -> WriteTurn {
        self.write_seq += 1;
        let ticket = self.write_seq;
        let (done, next) = oneshot::channel();
        let after = self
            .write_tails
            .insert(id.to_string(), (ticket, next))
            .map(|(_, previous)| previous);
        WriteTurn {
            ticket,
            after,
            done,
        }
    }

    fn release_write(&mut self, id: &str, ticket: u64) {
        if self
            .write_tails
            .get(id)
            .is_some_and(|(latest, _)| *latest == ticket)
        {
            self.write_tails.remove(id);
        }
    }

    // Remote write settlement

    pub(crate) fn settle_success(&mut self, id: &str, ticket: u64, undo: Undo) {
        self.release_write(id, ticket);
        let now = self.tick();
        let Some(index) = self.position(id) else {
            return;
        };

        let entry = &mut self.entries[index];
        entry.inflight = entry.inflight.saturating_sub(1);
        entry.touched = now;

        match undo {
            Undo::Delete { .. } if entry.sync == SyncState::PendingDelete => {
                self.entries.remove(index);
                self.tombstones.insert(id.to_string(), now);
                return;
            }
            Undo::Update { patch } => patch.apply_to(&mut entry.confirmed),
            _ => {}
        }
        entry.quiesce();
    }

    pub(crate) fn settle_failure(
        &mut self,
        id: &str,
        ticket: u64,
        undo: Undo,
        reason: String,
        policy: ReconciliationPolicy,
    ) {
        self.release_write(id, ticket);
        let now = self.tick();
        let operation = undo.operation();
        self.record_failure(id, operation, reason.clone());

        let Some(index) = self.position(id) else {
            return;
        };
        let entry = &mut self.entries[index];
        entry.inflight = entry.inflight.saturating_sub(1);
        entry.touched = now;

        match (policy, undo) {
            (ReconciliationPolicy::Rollback, Undo::Create) => {
                self.entries.remove(index);
                return;
            }
            (ReconciliationPolicy::Rollback, Undo::Update { .. }) => {
                entry.diverged = true;
            }
            (ReconciliationPolicy::Rollback, Undo::Delete { prior_sync }) => {
                if entry.sync == SyncState::PendingDelete {
                    entry.sync = prior_sync;
                }
            }
            (ReconciliationPolicy::KeepOptimistic, Undo::Delete { .. }) => {
                if entry.sync == SyncState::PendingDelete {
                    self.entries.remove(index);
                    self.tombstones.insert(id.to_string(), now);
                    return;
                }
            }
            (ReconciliationPolicy::KeepOptimistic, _) => {
                if entry.visible() {
                    entry.sync = SyncState::Failed { operation, reason };
                }
            }
        }
        entry.quiesce();
    }

    fn record_failure(&mut self, id: &str, operation: SyncOperation, reason: String) {
        self.failures.push_back(SyncFailure {
            asset_id: id.to_string(),
            operation,
            reason,
            at: Utc::now(),
        });
        while self.failures.len() > self.failure_capacity {
            self.failures.pop_front();
        }
    }

    // Loads

    pub(crate) fn begin_load(&mut self) -> LoadTicket {
        self.load_seq += 1;
        self.phase = LoadPhase::Loading;
        LoadTicket {
            seq: self.load_seq,
            issued_at: self.tick(),
        }
    }

    pub(crate) fn finish_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<Vec<Asset>, String>,
    ) -> LoadOutcome {
        if ticket.seq != self.load_seq {
            return LoadOutcome::Superseded;
        }
        self.phase = LoadPhase::Ready;

        let records = match result {
            Ok(records) => records,
            Err(reason) => {
                self.last_load_error = Some(reason.clone());
                return LoadOutcome::Failed { reason };
            }
        };
        self.last_load_error = None;
        self.reconcile(records, ticket.issued_at);

        LoadOutcome::Applied {
            records: self.entries.iter().filter(|e| e.visible()).count(),
        }
    }

    /// Replace the collection with `records` in server order, keeping local
    /// entries that are pending or changed after the load was issued
    fn reconcile(&mut self, records: Vec<Asset>, issued_at: u64) {
        let mut local: HashMap<String, Entry> = HashMap::with_capacity(self.entries.len());
        let mut local_order = Vec::with_capacity(self.entries.len());
        for entry in self.entries.drain(..) {
            local_order.push(entry.asset.id.clone());
            local.insert(entry.asset.id.clone(), entry);
        }

        let mut seen = HashSet::with_capacity(records.len());
        let mut merged = Vec::with_capacity(records.len().max(local.len()));
        for asset in records {
            if !seen.insert(asset.id.clone()) {
                continue;
            }
            if self
                .tombstones
                .get(&asset.id)
                .is_some_and(|deleted_at| *deleted_at > issued_at)
            {
                continue;
            }
            match local.remove(&asset.id) {
                Some(entry) if entry.keeps_local_copy(issued_at) => merged.push(entry),
                _ => merged.push(Entry::synced(asset, issued_at)),
            }
        }

        for id in local_order {
            if let Some(entry) = local.remove(&id) {
                if entry.keeps_local_copy(issued_at) {
                    merged.push(entry);
                }
            }
        }

        self.entries = merged;
        // Any later load is issued after every current tombstone
        self.tombstones.clear();
    }
}
