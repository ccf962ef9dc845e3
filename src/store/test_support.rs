// In-memory record service for store tests. Fetches and writes can be held
// back with gates to stage races.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::oneshot;

use crate::infrastructure::record_service::{
    RecordService, RecordServiceError, RemoteOutcome, WriteAck, WriteRequest,
};
use crate::models::{Asset, AssetPatch};

pub(crate) fn asset(id: &str, name: &str) -> Asset {
    serde_json::from_value(json!({
        "id": id,
        "name": name,
        "type": "furniture",
        "quantity": 2,
        "value": 15,
        "date": "2024-03-05",
        "location": "Store Room",
        "createdAt": "2024-03-05T01:00:00.000Z"
    }))
    .unwrap()
}

#[derive(Debug, Default)]
pub(crate) struct MockRecordService {
    records: Mutex<Vec<Asset>>,
    fail_fetch: AtomicBool,
    fail_writes: AtomicBool,
    fetch_gates: Mutex<VecDeque<oneshot::Receiver<()>>>,
    write_gates: Mutex<VecDeque<oneshot::Receiver<()>>>,
    writes: Mutex<Vec<Value>>,
}

impl MockRecordService {
    pub(crate) fn with_records(records: Vec<Asset>) -> Self {
        let mock = Self::default();
        mock.set_records(records);
        mock
    }

    pub(crate) fn set_records(&self, records: Vec<Asset>) {
        *self.records.lock().unwrap() = records;
    }

    pub(crate) fn records(&self) -> Vec<Asset> {
        self.records.lock().unwrap().clone()
    }

    /// Every write request received, in wire shape
    pub(crate) fn write_log(&self) -> Vec<Value> {
        self.writes.lock().unwrap().clone()
    }

    pub(crate) fn fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Hold the next fetch until the returned sender fires. The fetched
    /// snapshot is taken before waiting.
    pub(crate) fn gate_next_fetch(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.fetch_gates.lock().unwrap().push_back(rx);
        tx
    }

    /// Hold the next write until the returned sender fires
    pub(crate) fn gate_next_write(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.write_gates.lock().unwrap().push_back(rx);
        tx
    }

    async fn write(&self, request: WriteRequest<'_>) -> RemoteOutcome {
        self.writes
            .lock()
            .unwrap()
            .push(serde_json::to_value(&request).unwrap());

        let gate = self.write_gates.lock().unwrap().pop_front();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RecordServiceError::Status(500));
        }

        let mut records = self.records.lock().unwrap();
        match request {
            WriteRequest::Save { asset } => records.push(asset.clone()),
            WriteRequest::Update { id, data } => {
                if let Some(record) = records.iter_mut().find(|r| r.id == id) {
                    data.apply_to(record);
                }
            }
            WriteRequest::Delete { id } => records.retain(|r| r.id != id),
        }
        Ok(WriteAck::Confirmed)
    }
}

#[async_trait]
impl RecordService for MockRecordService {
    fn endpoint(&self) -> &str {
        "memory://test"
    }

    async fn fetch_all(&self) -> Result<Vec<Asset>, RecordServiceError> {
        let snapshot = self.records();
        let gate = self.fetch_gates.lock().unwrap().pop_front();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(RecordServiceError::Status(500));
        }
        Ok(snapshot)
    }

    async fn create(&self, asset: &Asset) -> RemoteOutcome {
        self.write(WriteRequest::Save { asset }).await
    }

    async fn update(&self, id: &str, patch: &AssetPatch) -> RemoteOutcome {
        self.write(WriteRequest::Update { id, data: patch }).await
    }

    async fn delete(&self, id: &str) -> RemoteOutcome {
        self.write(WriteRequest::Delete { id }).await
    }
}
