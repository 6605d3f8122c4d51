pub mod database;

use std::env;
use std::time::Duration;
use anyhow::{Context, Result};

pub use database::DatabaseConfig;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub encryption_key: String,
    pub jwt_secret: String,
    pub server_host: String,
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    /// Public URL of this CRM site; base for co-located quotation links.
    pub crm_site_url: String,
    pub erpnext_request_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:8080".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let timeout_secs: u64 = env::var("ERPNEXT_REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .context("ERPNEXT_REQUEST_TIMEOUT_SECS must be a number of seconds")?;

        Ok(Self {
            database: DatabaseConfig::from_env()?,
            encryption_key: env::var("ENCRYPTION_KEY").context("ENCRYPTION_KEY must be set")?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            cors_origins,
            crm_site_url: env::var("CRM_SITE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            erpnext_request_timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}
