use std::time::Duration;

use mosaico_pipeline::persistence::PersistenceConfig;
use mosaico_pipeline::WorkflowConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `120`). Generation calls
    /// are slow, so this is well above a typical API timeout.
    pub request_timeout_secs: u64,
    /// Base URL of the content backend.
    pub backend_url: String,
    /// Bearer token for the content backend; unset sends no auth header.
    pub backend_token: Option<String>,
    /// Quiet period before component changes are saved.
    pub persist_debounce_ms: u64,
    /// Translation calls in flight per batch.
    pub translation_concurrency: usize,
    /// Generation temperature for newly opened workspaces.
    pub default_temperature: f64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                  |
    /// |---------------------------|--------------------------|
    /// | `HOST`                    | `0.0.0.0`                |
    /// | `PORT`                    | `3000`                   |
    /// | `CORS_ORIGINS`            | `http://localhost:5173`  |
    /// | `REQUEST_TIMEOUT_SECS`    | `120`                    |
    /// | `MOSAICO_BACKEND_URL`     | `http://localhost:8080`  |
    /// | `MOSAICO_BACKEND_TOKEN`   | unset                    |
    /// | `PERSIST_DEBOUNCE_MS`     | `500`                    |
    /// | `TRANSLATION_CONCURRENCY` | `4`                      |
    /// | `DEFAULT_TEMPERATURE`     | `0.7`                    |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "120".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let backend_url =
            std::env::var("MOSAICO_BACKEND_URL").unwrap_or_else(|_| "http://localhost:8080".into());

        let backend_token = std::env::var("MOSAICO_BACKEND_TOKEN")
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        let persist_debounce_ms: u64 = std::env::var("PERSIST_DEBOUNCE_MS")
            .unwrap_or_else(|_| "500".into())
            .parse()
            .expect("PERSIST_DEBOUNCE_MS must be a valid u64");

        let translation_concurrency: usize = std::env::var("TRANSLATION_CONCURRENCY")
            .unwrap_or_else(|_| "4".into())
            .parse()
            .expect("TRANSLATION_CONCURRENCY must be a valid usize");
        assert!(translation_concurrency > 0, "TRANSLATION_CONCURRENCY must be at least 1");

        let default_temperature: f64 = std::env::var("DEFAULT_TEMPERATURE")
            .unwrap_or_else(|_| "0.7".into())
            .parse()
            .expect("DEFAULT_TEMPERATURE must be a number");
        assert!(
            (0.0..=1.0).contains(&default_temperature),
            "DEFAULT_TEMPERATURE must be between 0.0 and 1.0"
        );

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            backend_url,
            backend_token,
            persist_debounce_ms,
            translation_concurrency,
            default_temperature,
        }
    }

    /// Workflow tuning derived from this configuration.
    pub fn workflow_config(&self) -> WorkflowConfig {
        WorkflowConfig {
            translation_concurrency: self.translation_concurrency,
            default_temperature: self.default_temperature,
            persistence: PersistenceConfig {
                debounce: Duration::from_millis(self.persist_debounce_ms),
                ..Default::default()
            },
        }
    }
}
