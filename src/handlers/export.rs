use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::Utc;

use crate::error::DashboardResult;
use crate::handlers::assets::AssetListQuery;
use crate::handlers::AppState;
use crate::services::export::{export_csv, export_filename};
use crate::utils::formatters::display_offset;

const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

// Handler for GET /assets/export
pub async fn export_assets(
    State(state): State<AppState>,
    Query(params): Query<AssetListQuery>,
) -> DashboardResult<Response> {
    let assets = state.store.assets();
    if assets.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let rows = params.apply(assets);
    let csv = export_csv(&rows)?;
    let filename = export_filename(Utc::now().with_timezone(&display_offset()).date_naive());
    tracing::info!(rows = rows.len(), %filename, "Exporting inventory");

    Ok((
        [
            (header::CONTENT_TYPE, CSV_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        csv,
    )
        .into_response())
}
