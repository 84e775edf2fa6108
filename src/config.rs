use serde::{Deserialize, Serialize};
use std::env;
use tracing_subscriber::EnvFilter;

/// 未设置 LOG_LEVEL 时的日志过滤规则
pub const DEFAULT_LOG_LEVEL: &str = "league_push=debug,tower_http=debug";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub server_host: String,
    pub server_port: u16,
    pub environment: String,
    pub log_level: String,

    // Database configuration (未设置时使用内存存储)
    pub database_url: Option<String>,
    pub database_max_connections: u32,

    // VAPID configuration
    pub vapid_public_key: Option<String>,
    pub vapid_private_key: Option<String>,
    pub vapid_subject: Option<String>,

    // Push delivery
    pub push_ttl_seconds: u32,
    pub push_admin_token: Option<String>,

    // CORS configuration
    pub cors_allowed_origins: String,

    // Monitoring
    pub metrics_enabled: bool,
    pub metrics_port: u16,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Config {
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string()),

            database_url: non_empty_var("DATABASE_URL"),
            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()?,

            vapid_public_key: non_empty_var("VAPID_PUBLIC_KEY"),
            vapid_private_key: non_empty_var("VAPID_PRIVATE_KEY"),
            vapid_subject: non_empty_var("VAPID_SUBJECT"),

            push_ttl_seconds: env::var("PUSH_TTL_SECONDS")
                .unwrap_or_else(|_| "86400".to_string())
                .parse()?,
            push_admin_token: non_empty_var("PUSH_ADMIN_TOKEN"),

            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3001".to_string()),

            metrics_enabled: env::var("METRICS_ENABLED")
                .unwrap_or_else(|_| "false".to_string())
                .parse()?,
            metrics_port: env::var("METRICS_PORT")
                .unwrap_or_else(|_| "9090".to_string())
                .parse()?,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// LOG_LEVEL 无法解析时退回默认规则
    pub fn log_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.log_level).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: "127.0.0.1".to_string(),
            server_port: 3000,
            environment: "development".to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            database_url: None,
            database_max_connections: 5,
            vapid_public_key: None,
            vapid_private_key: None,
            vapid_subject: None,
            push_ttl_seconds: 86400,
            push_admin_token: None,
            cors_allowed_origins: "http://localhost:3001".to_string(),
            metrics_enabled: false,
            metrics_port: 9090,
        }
    }
}

/// 空字符串视为未设置
fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
