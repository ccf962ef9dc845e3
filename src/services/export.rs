// CSV export of the inventory table

use chrono::NaiveDate;
use csv::{Terminator, WriterBuilder};
use thiserror::Error;

use crate::models::Asset;
use crate::utils::formatters::{format_date, format_number, get_type_label};

pub const EXPORT_HEADER: [&str; 7] = [
    "Name",
    "Type",
    "Location",
    "Quantity",
    "Date",
    "Unit Value",
    "Total",
];

const MISSING_LOCATION: &str = "-";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Failed to finish CSV output: {0}")]
    Flush(String),
    #[error("CSV output is not UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Render records as CSV, one row per record in the given order
pub fn export_csv<T: AsRef<Asset>>(assets: &[T]) -> Result<String, ExportError> {
    let mut writer = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(EXPORT_HEADER)?;
    for item in assets {
        writer.write_record(export_row(item.as_ref()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Flush(e.to_string()))?;
    Ok(String::from_utf8(bytes)?)
}

fn export_row(asset: &Asset) -> [String; 7] {
    let location = asset
        .location
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .unwrap_or(MISSING_LOCATION);

    [
        asset.name.clone(),
        get_type_label(&asset.asset_type),
        location.to_string(),
        asset.units().to_string(),
        format_date(&asset.date),
        format_number(asset.unit_value()),
        format_number(asset.total_value()),
    ]
}

/// Download name for an export made on `date`
pub fn export_filename(date: NaiveDate) -> String {
    format!("inventory_{}.csv", date.format("%Y-%m-%d"))
}
