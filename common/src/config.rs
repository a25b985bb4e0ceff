use once_cell::sync::OnceCell;
use std::{env, fs};

/// Runtime configuration for the ClubHub client, loaded once from the
/// environment (optionally seeded from a `.env` file).
#[derive(Debug, Clone)]
pub struct Config {
    pub project_name: String,
    pub log_level: String,
    pub log_file: String,
    pub api_base_url: String,
    pub ws_base_url: String,
    pub request_timeout_seconds: u64,
    pub max_attachment_mb: u64,
}

static CONFIG: OnceCell<Config> = OnceCell::new();

impl Config {
    pub fn init(env_path: &str) -> &'static Self {
        dotenvy::from_filename(env_path).ok();

        CONFIG.get_or_init(|| {
            let project_name = env::var("PROJECT_NAME").unwrap_or_else(|_| "clubhub-client".into());
            let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "debug".into());
            let log_file = env::var("LOG_FILE").unwrap_or_else(|_| "logs/client.log".into());
            let api_base_url = env::var("API_BASE_URL").expect("API_BASE_URL must be set");
            let ws_base_url = env::var("WS_BASE_URL").expect("WS_BASE_URL must be set");
            let request_timeout_seconds = env::var("REQUEST_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30);
            let max_attachment_mb = env::var("MAX_ATTACHMENT_MB")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10);

            if let Some(parent) = std::path::Path::new(&log_file).parent() {
                fs::create_dir_all(parent).expect("Failed to create log directory");
            }

            Config {
                project_name,
                log_level,
                log_file,
                api_base_url,
                ws_base_url,
                request_timeout_seconds,
                max_attachment_mb,
            }
        })
    }

    pub fn get() -> &'static Self {
        CONFIG.get().expect("Config not initialized")
    }
}
