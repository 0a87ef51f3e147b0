use std::time::Duration;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// ComfyUI WebSocket base URL, e.g. `ws://127.0.0.1:8188`.
    pub comfyui_ws_url: String,
    /// ComfyUI HTTP API base URL, e.g. `http://127.0.0.1:8188`.
    pub comfyui_api_url: String,
    /// Directory on the backend host where output files are written.
    /// Used to resolve `file_reference` payloads.
    pub comfyui_output_dir: String,
    /// Timeout for outbound ComfyUI API calls (history, file fetch).
    pub backend_timeout: Duration,
    /// Timeout for the single webhook delivery POST.
    pub webhook_timeout: Duration,
    /// Delay between event-feed reconnection attempts.
    pub reconnect_delay: Duration,
    /// Completed jobs older than this many days are purged at startup.
    pub retention_completed_days: i64,
    /// Any job older than this many days is purged at startup.
    pub retention_all_days: i64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default                  |
    /// |----------------------------|--------------------------|
    /// | `HOST`                     | `0.0.0.0`                |
    /// | `PORT`                     | `3000`                   |
    /// | `CORS_ORIGINS`             | `http://localhost:5173`  |
    /// | `REQUEST_TIMEOUT_SECS`     | `30`                     |
    /// | `COMFYUI_WS_URL`           | `ws://127.0.0.1:8188`    |
    /// | `COMFYUI_API_URL`          | `http://127.0.0.1:8188`  |
    /// | `COMFYUI_OUTPUT_DIR`       | `/comfyui/output`        |
    /// | `BACKEND_TIMEOUT_SECS`     | `120`                    |
    /// | `WEBHOOK_TIMEOUT_SECS`     | `30`                     |
    /// | `RECONNECT_DELAY_SECS`     | `5`                      |
    /// | `RETENTION_COMPLETED_DAYS` | `7`                      |
    /// | `RETENTION_ALL_DAYS`       | `30`                     |
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

        let request_timeout_secs: u64 = env_u64("REQUEST_TIMEOUT_SECS", 30);

        let comfyui_ws_url =
            std::env::var("COMFYUI_WS_URL").unwrap_or_else(|_| "ws://127.0.0.1:8188".into());
        let comfyui_api_url =
            std::env::var("COMFYUI_API_URL").unwrap_or_else(|_| "http://127.0.0.1:8188".into());
        let comfyui_output_dir =
            std::env::var("COMFYUI_OUTPUT_DIR").unwrap_or_else(|_| "/comfyui/output".into());

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            comfyui_ws_url,
            comfyui_api_url,
            comfyui_output_dir,
            backend_timeout: Duration::from_secs(env_u64("BACKEND_TIMEOUT_SECS", 120)),
            webhook_timeout: Duration::from_secs(env_u64("WEBHOOK_TIMEOUT_SECS", 30)),
            reconnect_delay: Duration::from_secs(env_u64("RECONNECT_DELAY_SECS", 5)),
            retention_completed_days: env_u64("RETENTION_COMPLETED_DAYS", 7) as i64,
            retention_all_days: env_u64("RETENTION_ALL_DAYS", 30) as i64,
        }
    }
}

fn env_u64(var: &str, default: u64) -> u64 {
    std::env::var(var)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .unwrap_or_else(|_| panic!("{var} must be a valid u64"))
}
