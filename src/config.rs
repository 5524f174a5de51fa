use std::env;
use std::time::Duration;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub event_buffer_size: usize,
    pub request_timeout: Duration,
    pub order_service_url: String,
    pub restaurant_service_url: String,
    pub user_service_url: String,
    pub notification_service_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3003)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
            request_timeout: Duration::from_millis(parse_or_default("REQUEST_TIMEOUT_MS", 5_000)?),
            order_service_url: url_or_default("ORDER_SERVICE_URL", "http://localhost:3002/api"),
            restaurant_service_url: url_or_default(
                "RESTAURANT_SERVICE_URL",
                "http://localhost:3001/api",
            ),
            user_service_url: url_or_default("USER_SERVICE_URL", "http://localhost:3000/api"),
            notification_service_url: url_or_default(
                "NOTIFICATION_SERVICE_URL",
                "http://localhost:3004/api/notify",
            ),
        })
    }
}

fn url_or_default(key: &str, default: &str) -> String {
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    raw.trim_end_matches('/').to_string()
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
