use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde_json::Value;

use crate::config::DashboardConfig;
use crate::infrastructure::record_service::{
    RecordService, RecordServiceError, RemoteOutcome, WriteAck, WriteAcknowledgement, WriteRequest,
};
use crate::models::{Asset, AssetPatch};

// Apps Script rejects preflighted requests, so writes go out as plain text
const WRITE_CONTENT_TYPE: &str = "text/plain;charset=utf-8";

/// Client for the spreadsheet-backed record service
#[derive(Debug)]
pub struct HttpRecordService {
    client: Client,
    endpoint: String,
    acknowledgement: WriteAcknowledgement,
}

impl HttpRecordService {
    /// Create a new client for `endpoint` with the configured timeouts
    pub fn new(
        config: &DashboardConfig,
        endpoint: impl Into<String>,
    ) -> Result<Self, RecordServiceError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| {
                RecordServiceError::Client(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim().to_string(),
            acknowledgement: config.write_acknowledgement,
        })
    }

    fn url(&self) -> Result<&str, RecordServiceError> {
        if self.endpoint.is_empty() {
            Err(RecordServiceError::NotConfigured)
        } else {
            Ok(&self.endpoint)
        }
    }

    async fn send_write(&self, request: WriteRequest<'_>) -> RemoteOutcome {
        let url = self.url()?;
        let body = serde_json::to_string(&request)?;

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, WRITE_CONTENT_TYPE)
            .body(body)
            .send()
            .await?;
        let status = response.status();

        match self.acknowledgement {
            WriteAcknowledgement::AssumeSuccess => {
                tracing::debug!(action = %request, %status, "Write sent, assuming success");
                Ok(WriteAck::Assumed)
            }
            WriteAcknowledgement::RequireSuccessStatus if status.is_success() => {
                Ok(WriteAck::Confirmed)
            }
            WriteAcknowledgement::RequireSuccessStatus => {
                Err(RecordServiceError::Status(status.as_u16()))
            }
        }
    }
}

/// Turn a fetch payload into records.
///
/// Anything that is not an array counts as an empty collection; elements that
/// do not decode, or decode without an id, are skipped.
pub fn decode_records(payload: Value) -> Vec<Asset> {
    let Value::Array(items) = payload else {
        tracing::warn!("Record service returned a non-array payload, treating it as empty");
        return Vec::new();
    };

    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value::<Asset>(item) {
            Ok(asset) if !asset.id.trim().is_empty() => Some(asset),
            Ok(_) => {
                tracing::warn!(index, "Skipping record without an id");
                None
            }
            Err(e) => {
                tracing::warn!(index, error = %e, "Skipping undecodable record");
                None
            }
        })
        .collect()
}

#[async_trait]
impl RecordService for HttpRecordService {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn fetch_all(&self) -> Result<Vec<Asset>, RecordServiceError> {
        let url = self.url()?;

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RecordServiceError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let payload: Value = serde_json::from_str(&body)?;

        Ok(decode_records(payload))
    }

    async fn create(&self, asset: &Asset) -> RemoteOutcome {
        self.send_write(WriteRequest::Save { asset }).await
    }

    async fn update(&self, id: &str, patch: &AssetPatch) -> RemoteOutcome {
        self.send_write(WriteRequest::Update { id, data: patch }).await
    }

    async fn delete(&self, id: &str) -> RemoteOutcome {
        self.send_write(WriteRequest::Delete { id }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_records_skips_bad_elements() {
        let records = decode_records(json!([
            {"id": "a", "name": "Desk", "quantity": "2"},
            {"name": "no id"},
            {"id": "", "name": "blank id"},
            "garbage",
            {"id": 7, "name": "Fork"}
        ]));

        let ids: Vec<&str> = records.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "7"]);
        assert_eq!(records[0].units(), 2);
    }

    #[test]
    fn test_decode_records_non_array_is_empty() {
        assert!(decode_records(json!({"error": "quota"})).is_empty());
        assert!(decode_records(Value::Null).is_empty());
    }

    #[test]
    fn test_write_request_wire_shape() {
        let patch = AssetPatch::name("Chair");
        let body = serde_json::to_value(WriteRequest::Update { id: "a1", data: &patch }).unwrap();
        assert_eq!(
            body,
            json!({"action": "update", "id": "a1", "data": {"name": "Chair"}})
        );

        let body = serde_json::to_value(WriteRequest::Delete { id: "a1" }).unwrap();
        assert_eq!(body, json!({"action": "delete", "id": "a1"}));
    }

    #[tokio::test]
    async fn test_blank_endpoint_is_not_configured() {
        let service = HttpRecordService::new(&DashboardConfig::default(), "   ").unwrap();
        assert!(matches!(
            service.fetch_all().await,
            Err(RecordServiceError::NotConfigured)
        ));
        assert!(matches!(
            service.delete("a").await,
            Err(RecordServiceError::NotConfigured)
        ));
    }
}
