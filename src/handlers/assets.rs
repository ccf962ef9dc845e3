use axum::{
    extract::{Path, Query, RawQuery, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};

use crate::error::{DashboardError, DashboardResult};
use crate::handlers::AppState;
use crate::models::{Asset, AssetDraft, AssetPatch};
use crate::services::inventory::{
    filter_assets, sort_assets, summarize, AssetView, InventorySummary, SortKey,
};
use crate::services::scan::{scan_url, scanned_asset_id, SCAN_QUERY_PARAM};
use crate::store::{LoadOutcome, LoadPhase, StoreEntry, SyncFailure};

// Query parameters shared by the table and the export
#[derive(Debug, Default, Deserialize)]
pub struct AssetListQuery {
    pub search: Option<String>,
    pub sort: Option<String>,
}

impl AssetListQuery {
    /// Apply the search term and ordering to `items`
    pub fn apply<T: AsRef<Asset>>(&self, items: Vec<T>) -> Vec<T> {
        let mut items = filter_assets(items, self.search.as_deref().unwrap_or(""));
        sort_assets(&mut items, SortKey::from_param(self.sort.as_deref()));
        items
    }
}

#[derive(Debug, Serialize)]
pub struct AssetListResponse {
    pub assets: Vec<AssetView>,
    pub loading: bool,
    pub last_load_error: Option<String>,
    /// Footer totals over the rows shown
    pub totals: InventorySummary,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    #[serde(flatten)]
    pub summary: InventorySummary,
    pub phase: LoadPhase,
    pub loading: bool,
}

/// A single record with its scan link
#[derive(Debug, Serialize)]
pub struct AssetDetail {
    #[serde(flatten)]
    pub view: AssetView,
    pub scan_url: String,
}

#[derive(Debug, Serialize)]
pub struct SyncFailuresResponse {
    pub failures: Vec<SyncFailure>,
}

fn detail(state: &AppState, entry: StoreEntry) -> DashboardResult<AssetDetail> {
    let scan_url = scan_url(&state.config.public_base_url, &entry.asset.id)
        .map_err(|e| DashboardError::InternalError(format!("Invalid PUBLIC_BASE_URL: {}", e)))?;

    Ok(AssetDetail {
        view: AssetView::from(entry),
        scan_url,
    })
}

fn find_detail(state: &AppState, id: &str) -> DashboardResult<AssetDetail> {
    let entry = state
        .store
        .entry(id)
        .ok_or_else(|| DashboardError::asset_not_found(id))?;
    detail(state, entry)
}

// Handler for GET /assets
pub async fn list_assets(
    State(state): State<AppState>,
    Query(params): Query<AssetListQuery>,
) -> Json<AssetListResponse> {
    let entries = params.apply(state.store.entries());
    let totals = summarize(&entries);

    Json(AssetListResponse {
        assets: entries.into_iter().map(AssetView::from).collect(),
        loading: state.store.is_loading(),
        last_load_error: state.store.last_load_error(),
        totals,
    })
}

// Handler for GET /assets/summary
pub async fn get_summary(State(state): State<AppState>) -> Json<SummaryResponse> {
    Json(SummaryResponse {
        summary: summarize(&state.store.assets()),
        phase: state.store.phase(),
        loading: state.store.is_loading(),
    })
}

// Handler for GET /assets/{id}
pub async fn get_asset(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> DashboardResult<Json<AssetDetail>> {
    Ok(Json(find_detail(&state, &id)?))
}

// Handler for POST /assets
pub async fn create_asset(
    State(state): State<AppState>,
    Json(draft): Json<AssetDraft>,
) -> DashboardResult<(StatusCode, Json<AssetDetail>)> {
    // The remote write keeps running after the response is sent
    let pending = state.store.create(draft)?;
    let detail = find_detail(&state, pending.asset_id())?;

    Ok((StatusCode::CREATED, Json(detail)))
}

// Handler for PATCH /assets/{id}
pub async fn update_asset(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<AssetPatch>,
) -> DashboardResult<Json<AssetDetail>> {
    state
        .store
        .update(&id, patch)?
        .ok_or_else(|| DashboardError::asset_not_found(&id))?;

    Ok(Json(find_detail(&state, &id)?))
}

// Handler for DELETE /assets/{id}
pub async fn delete_asset(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> DashboardResult<StatusCode> {
    state
        .store
        .delete(&id)?
        .ok_or_else(|| DashboardError::asset_not_found(&id))?;

    Ok(StatusCode::NO_CONTENT)
}

// Handler for POST /assets/refresh
pub async fn refresh_assets(State(state): State<AppState>) -> Json<LoadOutcome> {
    Json(state.store.refresh().await)
}

// Handler for GET /scan?assetId=
pub async fn scan_asset(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> DashboardResult<Json<AssetDetail>> {
    let id = scanned_asset_id(query.as_deref().unwrap_or_default()).ok_or_else(|| {
        DashboardError::InvalidRequest(format!("Missing {} query parameter", SCAN_QUERY_PARAM))
    })?;

    Ok(Json(find_detail(&state, &id)?))
}

// Handler for GET /sync/failures
pub async fn list_sync_failures(State(state): State<AppState>) -> Json<SyncFailuresResponse> {
    Json(SyncFailuresResponse {
        failures: state.store.sync_failures(),
    })
}
