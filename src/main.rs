// Asset inventory dashboard server entry point

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use http::{header, Method};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use asset_inventory::config::DashboardConfig;
use asset_inventory::handlers::{router, DashboardState};
use asset_inventory::infrastructure::record_service::HttpRecordService;
use asset_inventory::settings::Settings;
use asset_inventory::store::AssetStore;
use asset_inventory::utils::logging;

#[tokio::main]
async fn main() {
    // Configure logging with tracing
    logging::init_tracing();

    // Load configuration from environment and the settings file
    let config = DashboardConfig::from_env();
    let settings = Settings::load_or_default(&config.settings_path);
    let endpoint = settings.effective_endpoint(&config.record_service_url);
    tracing::info!("Configuration loaded");

    if endpoint.is_empty() {
        tracing::warn!(
            "No record service endpoint configured; set RECORD_SERVICE_URL or save one through PUT /settings"
        );
    } else {
        tracing::info!(%endpoint, "Using record service");
    }

    let service = HttpRecordService::new(&config, endpoint)
        .expect("Failed to create record service client");
    let store = AssetStore::new(Arc::new(service), config.store_options());

    // Initial load runs in the background; the collection reads as empty until it lands
    tokio::spawn({
        let store = store.clone();
        async move {
            store.load().await;
        }
    });

    // Configure CORS policy
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::ORIGIN])
        .expose_headers([
            header::CONTENT_TYPE,
            header::CONTENT_LENGTH,
            header::CONTENT_DISPOSITION,
        ])
        .max_age(Duration::from_secs(3600));

    let body_limit = config.body_limit();
    // Refresh waits on the record service, so leave room beyond its own timeout
    let request_timeout = config.request_timeout() + Duration::from_secs(5);
    let addr: SocketAddr = config.server_addr().parse().expect("Invalid address");

    let app_state = DashboardState::new(store, config, settings);
    let app = router(app_state)
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start HTTP server
    tracing::info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");
    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
