use std::env;

use tracing::info;

/// Origin used when the page is served from a developer machine and no
/// backend origin is configured.
pub const LOCAL_DEV_ORIGIN: &str = "http://localhost:8000";

/// Where the current page is being served from, derived from the incoming
/// request. Absent outside of a request context (startup, tests).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLocation {
    pub hostname: String,
    pub origin: String,
}

impl PageLocation {
    pub fn from_host(host: &str, scheme: &str) -> Self {
        let hostname = host.split(':').next().unwrap_or(host).to_string();
        Self {
            hostname,
            origin: format!("{scheme}://{host}"),
        }
    }
}

/// Backend origin candidates, checked in order. Two naming conventions are
/// recognized so deployments can keep whichever their tooling already sets.
#[derive(Debug, Clone, Default)]
pub struct BackendUrlVars {
    pub canopy_api_url: Option<String>,
    pub api_url: Option<String>,
}

/// Resolve the backend API origin. Pure: same inputs, same output.
///
/// Priority: `CANOPY_API_URL`, then `API_URL`, then the fixed local
/// development origin when the page is served from `localhost`, then the
/// page's own origin, then empty (no request context, nothing configured).
pub fn resolve_backend_url(vars: &BackendUrlVars, location: Option<&PageLocation>) -> String {
    if let Some(url) = non_empty(&vars.canopy_api_url) {
        return url;
    }
    if let Some(url) = non_empty(&vars.api_url) {
        return url;
    }
    match location {
        Some(loc) if loc.hostname == "localhost" => LOCAL_DEV_ORIGIN.to_string(),
        Some(loc) => loc.origin.clone(),
        None => String::new(),
    }
}

fn non_empty(var: &Option<String>) -> Option<String> {
    var.as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

/// Square Web Payments credentials. Either id may be absent, in which case
/// the checkout page degrades to its unsupported state.
#[derive(Debug, Clone, Default)]
pub struct SquareConfig {
    pub application_id: Option<String>,
    pub location_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub environment: Environment,
    pub backend: BackendUrlVars,
    pub square: SquareConfig,
}

impl Config {
    pub fn load() -> Self {
        let environment = match env::var("CANOPY_ENV").as_deref() {
            Ok("production") => Environment::Production,
            _ => Environment::Development,
        };

        let config = Self {
            port: env::var("CANOPY_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            environment,
            backend: BackendUrlVars {
                canopy_api_url: env::var("CANOPY_API_URL").ok(),
                api_url: env::var("API_URL").ok(),
            },
            square: SquareConfig {
                application_id: first_var(&["CANOPY_SQUARE_APP_ID", "SQUARE_APPLICATION_ID"]),
                location_id: first_var(&["CANOPY_SQUARE_LOCATION_ID", "SQUARE_LOCATION_ID"]),
            },
        };

        info!(
            environment = ?config.environment,
            backend = resolve_backend_url(&config.backend, None),
            "configuration loaded"
        );
        config
    }

    pub fn backend_url(&self, location: Option<&PageLocation>) -> String {
        resolve_backend_url(&self.backend, location)
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }
}

fn first_var(names: &[&str]) -> Option<String> {
    first_non_empty(names, |name| env::var(name).ok())
}

// A set-but-blank variable falls through to the next convention rather
// than masking it.
fn first_non_empty<F>(names: &[&str], lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    names
        .iter()
        .find_map(|name| lookup(name).and_then(|v| non_empty(&Some(v))))
}
