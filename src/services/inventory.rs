use std::cmp::Ordering;
use std::str::FromStr;

use serde::Serialize;

use crate::models::Asset;
use crate::store::{StoreEntry, SyncState};
use crate::utils::formatters::{format_amount, format_date, get_type_label, location_label};

/// Table ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Newest acquisition first, undated last
    #[default]
    Date,
    /// A to Z
    Name,
    /// Highest unit value first
    Value,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "date" | "newest" => Ok(SortKey::Date),
            "name" => Ok(SortKey::Name),
            "value" => Ok(SortKey::Value),
            other => Err(format!("unknown sort key: {}", other)),
        }
    }
}

impl SortKey {
    /// Query-string form; anything unknown falls back to the default order
    pub fn from_param(param: Option<&str>) -> Self {
        param.and_then(|p| p.parse().ok()).unwrap_or_default()
    }
}

/// Keep the records whose name, type or location contains `term`, ignoring case
pub fn filter_assets<T: AsRef<Asset>>(assets: Vec<T>, term: &str) -> Vec<T> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return assets;
    }

    assets
        .into_iter()
        .filter(|item| {
            let asset = item.as_ref();
            asset.name.to_lowercase().contains(&needle)
                || asset.asset_type.to_lowercase().contains(&needle)
                || get_type_label(&asset.asset_type)
                    .to_lowercase()
                    .contains(&needle)
                || asset
                    .location
                    .as_deref()
                    .is_some_and(|l| l.to_lowercase().contains(&needle))
        })
        .collect()
}

/// Stable sort by `key`
pub fn sort_assets<T: AsRef<Asset>>(assets: &mut [T], key: SortKey) {
    match key {
        SortKey::Date => {
            assets.sort_by(|a, b| b.as_ref().acquired_on().cmp(&a.as_ref().acquired_on()))
        }
        SortKey::Name => assets.sort_by(|a, b| compare_names(&a.as_ref().name, &b.as_ref().name)),
        SortKey::Value => assets.sort_by(|a, b| {
            b.as_ref()
                .unit_value()
                .total_cmp(&a.as_ref().unit_value())
        }),
    }
}

fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Units held in one category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryShare {
    pub asset_type: String,
    pub label: String,
    pub units: i64,
}

/// Summary cards and table footer totals
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventorySummary {
    pub total_value: f64,
    pub total_units: i64,
    pub unique_assets: usize,
    pub average_unit_value: f64,
    pub dominant_category: Option<CategoryShare>,
    pub formatted_total_value: String,
    pub formatted_average_unit_value: String,
}

pub fn summarize<T: AsRef<Asset>>(assets: &[T]) -> InventorySummary {
    let mut total_value = 0.0;
    let mut total_units = 0;
    // Insertion order decides ties
    let mut categories: Vec<(String, i64)> = Vec::new();

    for item in assets {
        let asset = item.as_ref();
        let units = asset.units();
        total_value += asset.total_value();
        total_units += units;

        match categories.iter_mut().find(|(t, _)| *t == asset.asset_type) {
            Some((_, count)) => *count += units,
            None => categories.push((asset.asset_type.clone(), units)),
        }
    }

    let average_unit_value = if total_units > 0 {
        total_value / total_units as f64
    } else {
        0.0
    };

    let dominant_category = categories
        .into_iter()
        .fold(None::<(String, i64)>, |best, (asset_type, units)| match best {
            Some((_, best_units)) if best_units >= units => best,
            _ => Some((asset_type, units)),
        })
        .map(|(asset_type, units)| CategoryShare {
            label: get_type_label(&asset_type),
            asset_type,
            units,
        });

    InventorySummary {
        total_value,
        total_units,
        unique_assets: assets.len(),
        average_unit_value,
        dominant_category,
        formatted_total_value: format_amount(total_value, 2),
        formatted_average_unit_value: format_amount(average_unit_value, 0),
    }
}

/// Display projection of one record
#[derive(Debug, Clone, Serialize)]
pub struct AssetView {
    #[serde(flatten)]
    pub asset: Asset,
    pub type_label: String,
    pub location_label: String,
    pub units: i64,
    pub unit_value: f64,
    pub total_value: f64,
    pub formatted_unit_value: String,
    pub formatted_total_value: String,
    pub formatted_date: String,
    pub sync: SyncState,
}

impl From<StoreEntry> for AssetView {
    fn from(entry: StoreEntry) -> Self {
        let StoreEntry { asset, sync } = entry;
        let unit_value = asset.unit_value();
        let total_value = asset.total_value();

        Self {
            type_label: get_type_label(&asset.asset_type),
            location_label: location_label(asset.location.as_deref()),
            units: asset.units(),
            unit_value,
            total_value,
            formatted_unit_value: format_amount(unit_value, 2),
            formatted_total_value: format_amount(total_value, 2),
            formatted_date: format_date(&asset.date),
            sync,
            asset,
        }
    }
}
