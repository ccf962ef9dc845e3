// Asset record models shared by the store, the record service and the API

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::utils::formatters::{
    calculate_total_value, display_offset, parse_date, parse_float, parse_int, safe_float,
    safe_int,
};

/// Default cap on an embedded image, in decoded bytes
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 1024 * 1024;

/// Accepts strings, numbers and booleans as text; anything else becomes empty
fn deserialize_lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_text(&value).unwrap_or_default())
}

fn deserialize_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_text(&value))
}

/// Present-but-unparsable quantities become `Some(0)` so normalization turns them into 1
fn deserialize_optional_quantity<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => None,
        other => Some(parse_int(&other).unwrap_or(0)),
    })
}

/// Present-but-unparsable amounts become `Some(NaN)` and fail validation
fn deserialize_optional_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => None,
        Value::String(ref s) if s.trim().is_empty() => None,
        other => Some(parse_float(&other).unwrap_or(f64::NAN)),
    })
}

fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Known asset categories. Records may carry other values; those pass through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Electronics,
    Furniture,
    Cutlery,
    Other,
}

impl AssetType {
    pub const ALL: [AssetType; 4] = [
        AssetType::Electronics,
        AssetType::Furniture,
        AssetType::Cutlery,
        AssetType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetType::Electronics => "electronics",
            AssetType::Furniture => "furniture",
            AssetType::Cutlery => "cutlery",
            AssetType::Other => "other",
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        AssetType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| format!("unknown asset type: {}", s))
    }
}

/// One tracked inventory item, in the remote service's wire shape.
///
/// `quantity`, `value` and `date` stay as raw JSON because sheet cells come back
/// with whatever type the spreadsheet inferred; the accessor methods apply the
/// safe-parse fallbacks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    #[serde(deserialize_with = "deserialize_lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub name: String,
    #[serde(rename = "type", default, deserialize_with = "deserialize_lenient_string")]
    pub asset_type: String,
    #[serde(default)]
    pub quantity: Value,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub date: Value,
    #[serde(
        default,
        deserialize_with = "deserialize_optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub location: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub image: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<String>,
}

impl Asset {
    /// Quantity with the `|| 1` fallback
    pub fn units(&self) -> i64 {
        safe_int(&self.quantity, 1)
    }

    /// Unit price with the `|| 0` fallback
    pub fn unit_value(&self) -> f64 {
        safe_float(&self.value, 0.0)
    }

    pub fn total_value(&self) -> f64 {
        calculate_total_value(&self.value, &self.quantity)
    }

    /// Acquisition date in the deployment offset, if it parses
    pub fn acquired_on(&self) -> Option<NaiveDate> {
        parse_date(&self.date, display_offset())
    }

    /// The known category, if the type is one of them
    pub fn kind(&self) -> Option<AssetType> {
        self.asset_type.parse().ok()
    }
}

impl AsRef<Asset> for Asset {
    fn as_ref(&self) -> &Asset {
        self
    }
}

/// Rejections raised before any mutation is attempted
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Asset name is required")]
    MissingName,
    #[error("Asset value is required")]
    MissingValue,
    #[error("Asset value must be a non-negative number")]
    InvalidValue,
    #[error("Asset id must not be empty")]
    EmptyId,
    #[error("Image is {size} bytes, the limit is {limit} bytes")]
    ImageTooLarge { size: usize, limit: usize },
}

/// Decoded size of an image payload.
///
/// Base64 data URLs are measured by their decoded length; anything else
/// (plain links, raw text) by its byte length.
pub fn image_payload_bytes(payload: &str) -> usize {
    if let Some(rest) = payload.strip_prefix("data:") {
        if let Some((meta, data)) = rest.split_once(',') {
            if meta.ends_with(";base64") {
                let data = data.trim_end();
                let padding = data.bytes().rev().take_while(|b| *b == b'=').count();
                return (data.len() * 3 / 4).saturating_sub(padding);
            }
            return data.len();
        }
    }
    payload.len()
}

fn validate_image(image: Option<&str>, limit: usize) -> Result<(), ValidationError> {
    if let Some(image) = image {
        let size = image_payload_bytes(image);
        if size > limit {
            return Err(ValidationError::ImageTooLarge { size, limit });
        }
    }
    Ok(())
}

fn validate_amount(value: f64) -> Result<f64, ValidationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ValidationError::InvalidValue)
    }
}

fn normalize_quantity(quantity: i64) -> i64 {
    if quantity > 0 {
        quantity
    } else {
        1
    }
}

fn default_asset_type() -> String {
    AssetType::Electronics.as_str().to_string()
}

/// Input for creating an asset
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetDraft {
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub name: String,
    #[serde(rename = "type", default = "default_asset_type")]
    pub asset_type: String,
    #[serde(default, deserialize_with = "deserialize_optional_quantity")]
    pub quantity: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_optional_amount")]
    pub value: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub created_at: Option<String>,
}

impl AssetDraft {
    pub fn new(name: impl Into<String>, asset_type: AssetType, value: f64) -> Self {
        Self {
            name: name.into(),
            asset_type: asset_type.as_str().to_string(),
            value: Some(value),
            ..Self::default()
        }
    }

    /// Validate the draft and turn it into a record, assigning an id and a
    /// creation timestamp when the draft does not carry them.
    pub fn into_asset(self, max_image_bytes: usize) -> Result<Asset, ValidationError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::MissingName);
        }
        let value = validate_amount(self.value.ok_or(ValidationError::MissingValue)?)?;
        validate_image(self.image.as_deref(), max_image_bytes)?;

        let id = match self.id {
            Some(id) if id.trim().is_empty() => return Err(ValidationError::EmptyId),
            Some(id) => id,
            None => Uuid::new_v4().to_string(),
        };
        let created_at = self
            .created_at
            .unwrap_or_else(|| Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true));
        let date = self
            .date
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| Utc::now().with_timezone(&display_offset()).date_naive().to_string());

        Ok(Asset {
            id,
            name,
            asset_type: self.asset_type,
            quantity: Value::from(normalize_quantity(self.quantity.unwrap_or(1))),
            value: Value::from(value),
            date: Value::from(date),
            location: self.location,
            image: self.image,
            created_at: Some(created_at),
        })
    }
}

/// Partial update of an asset. Only the fields present are sent to the remote service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetPatch {
    #[serde(
        default,
        deserialize_with = "deserialize_optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
    #[serde(
        rename = "type",
        default,
        deserialize_with = "deserialize_optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub asset_type: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_optional_quantity",
        skip_serializing_if = "Option::is_none"
    )]
    pub quantity: Option<i64>,
    #[serde(
        default,
        deserialize_with = "deserialize_optional_amount",
        skip_serializing_if = "Option::is_none"
    )]
    pub value: Option<f64>,
    #[serde(
        default,
        deserialize_with = "deserialize_optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub date: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub location: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub image: Option<String>,
}

impl AssetPatch {
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Check the patch and normalize quantity the same way drafts are normalized
    pub fn validated(mut self, max_image_bytes: usize) -> Result<Self, ValidationError> {
        if let Some(name) = self.name.as_mut() {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                return Err(ValidationError::MissingName);
            }
            *name = trimmed.to_string();
        }
        if let Some(value) = self.value {
            validate_amount(value)?;
        }
        self.quantity = self.quantity.map(normalize_quantity);
        validate_image(self.image.as_deref(), max_image_bytes)?;
        Ok(self)
    }

    /// Merge the present fields into `asset`. `id` and `createdAt` are never touched.
    pub fn apply_to(&self, asset: &mut Asset) {
        if let Some(name) = &self.name {
            asset.name = name.clone();
        }
        if let Some(asset_type) = &self.asset_type {
            asset.asset_type = asset_type.clone();
        }
        if let Some(quantity) = self.quantity {
            asset.quantity = Value::from(quantity);
        }
        if let Some(value) = self.value {
            asset.value = Value::from(value);
        }
        if let Some(date) = &self.date {
            asset.date = Value::from(date.clone());
        }
        if let Some(location) = &self.location {
            asset.location = Some(location.clone());
        }
        if let Some(image) = &self.image {
            asset.image = Some(image.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lenient_record_deserialization() {
        let asset: Asset = serde_json::from_value(json!({
            "id": 17,
            "name": 42,
            "type": "furniture",
            "quantity": "3",
            "value": "10.50",
            "date": "2024-03-05",
            "location": null,
            "createdAt": "2024-03-05T01:00:00.000Z"
        }))
        .unwrap();

        assert_eq!(asset.id, "17");
        assert_eq!(asset.name, "42");
        assert_eq!(asset.units(), 3);
        assert_eq!(asset.unit_value(), 10.5);
        assert_eq!(asset.total_value(), 31.5);
        assert_eq!(asset.location, None);
        assert_eq!(asset.kind(), Some(AssetType::Furniture));
        assert_eq!(asset.acquired_on(), NaiveDate::from_ymd_opt(2024, 3, 5));
    }

    #[test]
    fn test_missing_numeric_fields_fall_back() {
        let asset: Asset = serde_json::from_value(json!({"id": "a", "name": "Lamp"})).unwrap();
        assert_eq!(asset.units(), 1);
        assert_eq!(asset.unit_value(), 0.0);
        assert_eq!(asset.asset_type, "");
        assert!(asset.acquired_on().is_none());
    }

    #[test]
    fn test_record_without_id_is_rejected() {
        assert!(serde_json::from_value::<Asset>(json!({"name": "Lamp"})).is_err());
    }

    #[test]
    fn test_serializes_wire_field_names() {
        let asset = AssetDraft {
            location: Some("Hall".to_string()),
            quantity: Some(2),
            ..AssetDraft::new("Desk", AssetType::Furniture, 15.0)
        }
        .into_asset(DEFAULT_MAX_IMAGE_BYTES)
        .unwrap();

        let wire = serde_json::to_value(&asset).unwrap();
        assert_eq!(wire["type"], "furniture");
        assert_eq!(wire["quantity"], 2);
        assert_eq!(wire["value"], 15.0);
        assert_eq!(wire["location"], "Hall");
        assert!(wire["createdAt"].is_string());
        assert!(wire.get("image").is_none());
    }

    #[test]
    fn test_draft_assigns_id_and_normalizes_quantity() {
        let draft = AssetDraft {
            quantity: Some(-4),
            ..AssetDraft::new("  Chair ", AssetType::Furniture, 15.0)
        };
        let asset = draft.into_asset(DEFAULT_MAX_IMAGE_BYTES).unwrap();

        assert!(Uuid::parse_str(&asset.id).is_ok());
        assert_eq!(asset.name, "Chair");
        assert_eq!(asset.units(), 1);
        assert!(asset.created_at.is_some());
        assert!(asset.acquired_on().is_some());
    }

    #[test]
    fn test_draft_keeps_supplied_id() {
        let draft = AssetDraft {
            id: Some("fixed-id".to_string()),
            ..AssetDraft::new("Chair", AssetType::Furniture, 15.0)
        };
        assert_eq!(draft.into_asset(DEFAULT_MAX_IMAGE_BYTES).unwrap().id, "fixed-id");
    }

    #[test]
    fn test_draft_validation() {
        let nameless = AssetDraft::new("   ", AssetType::Other, 1.0);
        assert_eq!(
            nameless.into_asset(DEFAULT_MAX_IMAGE_BYTES).unwrap_err(),
            ValidationError::MissingName
        );

        let valueless = AssetDraft {
            value: None,
            ..AssetDraft::new("Fork", AssetType::Cutlery, 0.0)
        };
        assert_eq!(
            valueless.into_asset(DEFAULT_MAX_IMAGE_BYTES).unwrap_err(),
            ValidationError::MissingValue
        );

        let negative = AssetDraft::new("Fork", AssetType::Cutlery, -1.0);
        assert_eq!(
            negative.into_asset(DEFAULT_MAX_IMAGE_BYTES).unwrap_err(),
            ValidationError::InvalidValue
        );
    }

    #[test]
    fn test_draft_from_form_strings() {
        let draft: AssetDraft = serde_json::from_value(json!({
            "name": "Kettle",
            "type": "electronics",
            "quantity": "abc",
            "value": "49.90",
            "date": "2024-01-10"
        }))
        .unwrap();
        let asset = draft.into_asset(DEFAULT_MAX_IMAGE_BYTES).unwrap();
        assert_eq!(asset.units(), 1);
        assert_eq!(asset.unit_value(), 49.9);

        let bad_value: AssetDraft =
            serde_json::from_value(json!({"name": "Kettle", "value": "free"})).unwrap();
        assert_eq!(
            bad_value.into_asset(DEFAULT_MAX_IMAGE_BYTES).unwrap_err(),
            ValidationError::InvalidValue
        );
    }

    #[test]
    fn test_oversized_image_is_rejected() {
        let payload = format!("data:image/png;base64,{}", "A".repeat(16));
        assert_eq!(image_payload_bytes(&payload), 12);

        let draft = AssetDraft {
            image: Some(payload),
            ..AssetDraft::new("Plate", AssetType::Cutlery, 2.0)
        };
        assert_eq!(
            draft.into_asset(8).unwrap_err(),
            ValidationError::ImageTooLarge { size: 12, limit: 8 }
        );
    }

    #[test]
    fn test_patch_serializes_only_present_fields() {
        let patch = AssetPatch::name("Chair");
        assert_eq!(serde_json::to_value(&patch).unwrap(), json!({"name": "Chair"}));
        assert!(!patch.is_empty());
        assert!(AssetPatch::default().is_empty());
    }

    #[test]
    fn test_patch_apply_changes_only_given_fields() {
        let mut asset: Asset = serde_json::from_value(json!({
            "id": "a", "name": "Desk", "type": "furniture", "quantity": 3,
            "value": 10, "date": "2024-03-05", "location": "Hall",
            "createdAt": "2024-03-05T01:00:00.000Z"
        }))
        .unwrap();
        let before = asset.clone();

        AssetPatch::name("X").apply_to(&mut asset);

        assert_eq!(asset.name, "X");
        assert_eq!(asset.id, before.id);
        assert_eq!(asset.quantity, before.quantity);
        assert_eq!(asset.value, before.value);
        assert_eq!(asset.location, before.location);
        assert_eq!(asset.created_at, before.created_at);
    }

    #[test]
    fn test_patch_validation() {
        assert_eq!(
            AssetPatch::name(" ").validated(DEFAULT_MAX_IMAGE_BYTES).unwrap_err(),
            ValidationError::MissingName
        );

        let patch: AssetPatch = serde_json::from_value(json!({"quantity": "0"})).unwrap();
        assert_eq!(
            patch.validated(DEFAULT_MAX_IMAGE_BYTES).unwrap().quantity,
            Some(1)
        );
    }

    #[test]
    fn test_asset_type_parsing() {
        assert_eq!("Furniture".parse::<AssetType>(), Ok(AssetType::Furniture));
        assert!("spaceship".parse::<AssetType>().is_err());
        assert_eq!(AssetType::Cutlery.to_string(), "cutlery");
    }
}
