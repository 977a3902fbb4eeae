use serde::Deserialize;

/// ScreenSage runtime configuration.
///
/// Constructed once at startup and passed into the components that need
/// it; there is no ambient global.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// HTTP server bind address
    pub bind_address: String,
    /// HTTP server port
    pub port: u16,
    /// SQLite history database path
    pub db_path: String,
    /// Directory of viewer frontend assets, if any
    pub static_path: Option<String>,
    /// Baidu OCR API key
    pub baidu_api_key: Option<String>,
    /// Baidu OCR secret key
    pub baidu_secret_key: Option<String>,
    /// DeepSeek API key
    pub deepseek_api_key: Option<String>,
    /// Records replayed to a freshly attached viewer
    pub history_snapshot_limit: usize,
    /// Page size for the history API
    pub history_page_size: usize,
    /// Log level
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8081,
            db_path: "data/screensage.db".to_string(),
            static_path: None,
            baidu_api_key: None,
            baidu_secret_key: None,
            deepseek_api_key: None,
            history_snapshot_limit: 10,
            history_page_size: 50,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    pub fn from_env() -> Self {
        let defaults = Config::default();
        Self {
            bind_address: std::env::var("SCREENSAGE_BIND")
                .unwrap_or(defaults.bind_address),
            port: std::env::var("SCREENSAGE_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            db_path: std::env::var("SCREENSAGE_DB").unwrap_or(defaults.db_path),
            static_path: std::env::var("SCREENSAGE_STATIC_PATH").ok(),
            baidu_api_key: std::env::var("BAIDU_API_KEY").ok(),
            baidu_secret_key: std::env::var("BAIDU_SECRET_KEY").ok(),
            deepseek_api_key: std::env::var("DEEPSEEK_API_KEY").ok(),
            history_snapshot_limit: std::env::var("SCREENSAGE_SNAPSHOT_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.history_snapshot_limit),
            history_page_size: std::env::var("SCREENSAGE_PAGE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.history_page_size),
            log_level: std::env::var("RUST_LOG").unwrap_or(defaults.log_level),
        }
    }
}
