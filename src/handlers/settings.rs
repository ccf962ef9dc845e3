use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};

use crate::error::DashboardResult;
use crate::handlers::AppState;
use crate::settings::Settings;

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    /// Saved override, if any
    pub record_service_url: Option<String>,
    /// Endpoint the running store talks to
    pub active_endpoint: String,
    /// Whether the saved settings differ from what is running
    pub restart_required: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSettingsRequest {
    pub record_service_url: Option<String>,
}

fn settings_response(state: &AppState, settings: &Settings) -> SettingsResponse {
    let active_endpoint = state.store.endpoint().to_string();
    let saved_endpoint = settings.effective_endpoint(&state.config.record_service_url);

    SettingsResponse {
        record_service_url: settings.record_service_url.clone(),
        restart_required: saved_endpoint != active_endpoint,
        active_endpoint,
    }
}

// Handler for GET /settings
pub async fn get_settings(State(state): State<AppState>) -> Json<SettingsResponse> {
    let settings = state.settings().clone();
    Json(settings_response(&state, &settings))
}

// Handler for PUT /settings
pub async fn put_settings(
    State(state): State<AppState>,
    Json(request): Json<UpdateSettingsRequest>,
) -> DashboardResult<Json<SettingsResponse>> {
    let settings = Settings {
        record_service_url: request
            .record_service_url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty()),
    };

    settings.save(&state.config.settings_path)?;
    tracing::info!(
        path = %state.config.settings_path.display(),
        "Settings saved, the new endpoint applies after a restart"
    );

    let response = settings_response(&state, &settings);
    state.replace_settings(settings);
    Ok(Json(response))
}
