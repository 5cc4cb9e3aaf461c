use std::sync::{Arc, Mutex};

use axum::{http::HeaderMap, Router};
use tower_http::{services::ServeDir, trace::TraceLayer};

pub mod api;
pub mod cart;
pub mod checkout;
pub mod components;
pub mod config;
pub mod content;
pub mod debug;
pub mod err_responses;
pub mod icons;
pub mod reports;
pub mod session;
pub mod square;

use config::{Config, PageLocation};
use reports::dashboard::Dashboard;
use session::{MemoryStorage, Session, Storage};
use square::SdkLoader;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub http_client: reqwest::Client,
    pub storage: Arc<dyn Storage>,
    pub sdk: Arc<SdkLoader>,
    pub dashboard: Arc<Mutex<Dashboard>>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
            storage: Arc::new(MemoryStorage::default()),
            sdk: Arc::new(SdkLoader::new()),
            dashboard: Arc::new(Mutex::new(Dashboard::new())),
        }
    }

    pub fn session(&self) -> Session {
        Session::new(self.storage.clone())
    }

    /// Backend client for the current request. The location feeds the
    /// backend-URL resolver's page-origin fallbacks.
    pub fn api(&self, location: Option<&PageLocation>) -> api::ApiClient {
        api::ApiClient::new(
            self.http_client.clone(),
            self.config.backend_url(location),
            self.session(),
        )
    }
}

#[cfg(test)]
impl AppState {
    pub fn for_tests() -> Self {
        Self::new(Config {
            port: 0,
            environment: config::Environment::Development,
            backend: config::BackendUrlVars::default(),
            square: config::SquareConfig::default(),
        })
    }
}

/// Page location as seen by the incoming request, when a Host header is
/// present.
pub fn page_location(headers: &HeaderMap) -> Option<PageLocation> {
    let host = headers.get(axum::http::header::HOST)?.to_str().ok()?;
    Some(PageLocation::from_host(host, "http"))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(checkout::router(state.clone()))
        .nest("/admin/reports", reports::router(state))
        .nest_service("/assets", ServeDir::new("static"))
        .layer(TraceLayer::new_for_http())
}
