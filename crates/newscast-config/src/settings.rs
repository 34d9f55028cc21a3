//! Process-level settings
//!
//! Everything here comes from the environment at startup: provider
//! credentials, object-store coordinates, and the auth secrets of the HTTP
//! surface. Run parameters live in [`crate::DashboardConfig`] instead.

use serde::{Deserialize, Serialize};

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// S3 coordinates for the object store.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct S3Settings {
    pub endpoint: Option<String>,
    pub bucket: String,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub region: Option<String>,
}

/// Settings resolved once at process start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Object store backend selector. Only "s3" (default) and "memory" are
    /// recognized; "memory" exists for local smoke runs.
    pub storage_backend: String,
    pub s3: S3Settings,
    pub openai_api_key: Option<String>,
    /// Default for `force_overwrite` when a trigger omits it.
    pub force_overwrite: bool,
    pub dashboard_user: Option<String>,
    pub dashboard_pass: Option<String>,
    pub dashboard_token: Option<String>,
    pub external_api_key: Option<String>,
    pub cron_secret: Option<String>,
    /// Bind address for the HTTP server.
    pub listen_addr: String,
}

impl AppSettings {
    /// Read settings from the environment.
    pub fn from_env() -> Self {
        Self {
            storage_backend: env_opt("STORAGE_BACKEND").unwrap_or_else(|| "s3".to_string()),
            s3: S3Settings {
                endpoint: env_opt("S3_ENDPOINT"),
                bucket: env_opt("S3_BUCKET").unwrap_or_default(),
                access_key: env_opt("S3_ACCESS_KEY"),
                secret_key: env_opt("S3_SECRET_KEY"),
                region: env_opt("S3_REGION"),
            },
            openai_api_key: env_opt("OPENAI_API_KEY"),
            force_overwrite: matches!(
                std::env::var("FORCE_OVERWRITE").as_deref(),
                Ok("1") | Ok("true") | Ok("yes")
            ),
            dashboard_user: env_opt("DASHBOARD_USER"),
            dashboard_pass: env_opt("DASHBOARD_PASS"),
            dashboard_token: env_opt("DASHBOARD_TOKEN"),
            external_api_key: env_opt("EXTERNAL_API_KEY"),
            cron_secret: env_opt("CRON_SECRET"),
            listen_addr: env_opt("LISTEN_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
        }
    }

    /// Names of the expected env vars that are present, for the health
    /// endpoint. Values are never reported.
    pub fn present_env_vars(&self) -> Vec<&'static str> {
        let mut present = Vec::new();
        if !self.s3.bucket.is_empty() {
            present.push("S3_BUCKET");
        }
        if self.s3.access_key.is_some() {
            present.push("S3_ACCESS_KEY");
        }
        if self.s3.secret_key.is_some() {
            present.push("S3_SECRET_KEY");
        }
        if self.openai_api_key.is_some() {
            present.push("OPENAI_API_KEY");
        }
        if self.dashboard_token.is_some() {
            present.push("DASHBOARD_TOKEN");
        }
        if self.cron_secret.is_some() {
            present.push("CRON_SECRET");
        }
        present
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            storage_backend: "memory".to_string(),
            s3: S3Settings::default(),
            openai_api_key: None,
            force_overwrite: false,
            dashboard_user: None,
            dashboard_pass: None,
            dashboard_token: None,
            external_api_key: None,
            cron_secret: None,
            listen_addr: "127.0.0.1:8080".to_string(),
        }
    }
}
