// Local stand-in for the spreadsheet record service
#![allow(dead_code)]

use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};

#[derive(Debug, Clone)]
pub struct StubRecordService {
    records: Arc<Mutex<Vec<Value>>>,
    writes: Arc<Mutex<Vec<(Option<String>, Value)>>>,
    fetch_status: Arc<AtomicU16>,
    write_status: Arc<AtomicU16>,
    raw_payload: Arc<Mutex<Option<String>>>,
}

impl Default for StubRecordService {
    fn default() -> Self {
        Self {
            records: Arc::default(),
            writes: Arc::default(),
            fetch_status: Arc::new(AtomicU16::new(200)),
            write_status: Arc::new(AtomicU16::new(200)),
            raw_payload: Arc::default(),
        }
    }
}

impl StubRecordService {
    pub fn with_records(records: Vec<Value>) -> Self {
        let stub = Self::default();
        *stub.records.lock().unwrap() = records;
        stub
    }

    pub fn records(&self) -> Vec<Value> {
        self.records.lock().unwrap().clone()
    }

    /// Write bodies received, with their content type
    pub fn writes(&self) -> Vec<(Option<String>, Value)> {
        self.writes.lock().unwrap().clone()
    }

    pub fn set_fetch_status(&self, status: u16) {
        self.fetch_status.store(status, Ordering::SeqCst);
    }

    pub fn set_write_status(&self, status: u16) {
        self.write_status.store(status, Ordering::SeqCst);
    }

    /// Answer fetches with this body verbatim
    pub fn set_raw_payload(&self, payload: &str) {
        *self.raw_payload.lock().unwrap() = Some(payload.to_string());
    }

    /// Serve the stub on an ephemeral port and return its endpoint URL
    pub async fn spawn(&self) -> String {
        let app = Router::new()
            .route("/exec", get(fetch_records).post(write_record))
            .with_state(self.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{}/exec", addr)
    }
}

fn status(code: &AtomicU16) -> StatusCode {
    StatusCode::from_u16(code.load(Ordering::SeqCst)).unwrap()
}

async fn fetch_records(State(stub): State<StubRecordService>) -> Response {
    let status = status(&stub.fetch_status);
    if !status.is_success() {
        return (status, "Service unavailable").into_response();
    }
    if let Some(raw) = stub.raw_payload.lock().unwrap().clone() {
        return raw.into_response();
    }
    Json(stub.records()).into_response()
}

async fn write_record(
    State(stub): State<StubRecordService>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let request: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
    stub.writes
        .lock()
        .unwrap()
        .push((content_type, request.clone()));

    let status = status(&stub.write_status);
    if !status.is_success() {
        return (status, "Write failed").into_response();
    }

    let mut records = stub.records.lock().unwrap();
    match request["action"].as_str() {
        Some("save") => records.push(request["asset"].clone()),
        Some("update") => {
            if let Some(record) = records.iter_mut().find(|r| r["id"] == request["id"]) {
                if let (Some(record), Some(changes)) =
                    (record.as_object_mut(), request["data"].as_object())
                {
                    for (key, value) in changes {
                        record.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        Some("delete") => records.retain(|r| r["id"] != request["id"]),
        _ => {}
    }

    Json(json!({"status": "success"})).into_response()
}

pub fn chair() -> Value {
    json!({
        "id": "chair-1",
        "name": "Chair",
        "type": "furniture",
        "location": "Store Room",
        "quantity": 2,
        "value": "15.00",
        "date": "2024-03-05",
        "createdAt": "2024-03-05T01:00:00.000Z"
    })
}

pub fn router_record() -> Value {
    json!({
        "id": "router-1",
        "name": "Router",
        "type": "electronics",
        "quantity": "1",
        "value": 25.5,
        "date": "2024-02-01"
    })
}
