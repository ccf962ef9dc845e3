// Handlers Module
// This module contains the dashboard API endpoint handlers

pub mod assets;
pub mod export;
pub mod settings;

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::config::DashboardConfig;
use crate::settings::Settings;
use crate::store::AssetStore;

/// Everything the handlers share
#[derive(Debug)]
pub struct DashboardState {
    pub store: AssetStore,
    pub config: DashboardConfig,
    settings: RwLock<Settings>,
}

// Type alias for the application state
pub type AppState = Arc<DashboardState>;

impl DashboardState {
    pub fn new(store: AssetStore, config: DashboardConfig, settings: Settings) -> AppState {
        Arc::new(Self {
            store,
            config,
            settings: RwLock::new(settings),
        })
    }

    pub fn settings(&self) -> RwLockReadGuard<'_, Settings> {
        self.settings.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn replace_settings(&self, settings: Settings) {
        *self.settings.write().unwrap_or_else(PoisonError::into_inner) = settings;
    }
}

/// Build the API router
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.body_limit();

    Router::new()
        .route("/health", get(health_check))
        .route(
            "/assets",
            get(assets::list_assets).post(assets::create_asset),
        )
        .route("/assets/summary", get(assets::get_summary))
        .route("/assets/export", get(export::export_assets))
        .route("/assets/refresh", post(assets::refresh_assets))
        .route(
            "/assets/{id}",
            get(assets::get_asset)
                .patch(assets::update_asset)
                .delete(assets::delete_asset),
        )
        .route("/scan", get(assets::scan_asset))
        .route("/sync/failures", get(assets::list_sync_failures))
        .route(
            "/settings",
            get(settings::get_settings).put(settings::put_settings),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

// Health check response
#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    status: String,
}

// Handler for GET /health
pub async fn health_check() -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse {
        status: "ok".to_string(),
    })
}
