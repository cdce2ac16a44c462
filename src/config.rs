// src/config.rs
use std::env;

/// Runtime configuration, resolved once in `main` and passed explicitly.
/// Nothing else in the crate reads the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub use_mock_auth: bool,
    pub client_id: String,
    pub authority: String,
    pub proxy_origin: String,
    pub backend_url: String,
}

const DEFAULT_CLIENT_ID: &str = "your-client-id-here";
const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com/common";
const DEFAULT_PROXY_ORIGIN: &str = "http://localhost:3000";
const DEFAULT_BACKEND_URL: &str =
    "https://document-analyzer-backend.localhost/api/analyzeDocument";

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            use_mock_auth: env_flag("ANALYZER_USE_MOCK_AUTH"),
            client_id: env_or("ANALYZER_CLIENT_ID", DEFAULT_CLIENT_ID),
            authority: trim_trailing_slash(env_or("ANALYZER_AUTHORITY", DEFAULT_AUTHORITY)),
            proxy_origin: trim_trailing_slash(env_or(
                "ANALYZER_PROXY_ORIGIN",
                DEFAULT_PROXY_ORIGIN,
            )),
            backend_url: env_or("ANALYZER_BACKEND_URL", DEFAULT_BACKEND_URL),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            use_mock_auth: false,
            client_id: DEFAULT_CLIENT_ID.to_string(),
            authority: DEFAULT_AUTHORITY.to_string(),
            proxy_origin: DEFAULT_PROXY_ORIGIN.to_string(),
            backend_url: DEFAULT_BACKEND_URL.to_string(),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value.trim().to_string(),
        _ => default.to_string(),
    }
}

fn env_flag(key: &str) -> bool {
    matches!(
        env::var(key).as_deref().map(str::trim),
        Ok("true") | Ok("1") | Ok("yes")
    )
}

fn trim_trailing_slash(mut value: String) -> String {
    while value.ends_with('/') {
        value.pop();
    }
    value
}
