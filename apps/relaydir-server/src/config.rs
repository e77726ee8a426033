use anyhow::{Context, Result};
use std::env;

/// Runtime configuration, read once in main and handed to constructors.
/// Nothing reads the environment after startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub jwt_secret: String,
    /// Optional MaxMind database for region/ISP enrichment.
    pub geoip_db_path: Option<String>,
    pub log_dir: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET is not set")?;
        if jwt_secret.trim().len() < 16 {
            anyhow::bail!("JWT_SECRET must be at least 16 characters");
        }

        Ok(Self {
            database_url,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            jwt_secret,
            geoip_db_path: env::var("GEOIP_DB_PATH").ok(),
            log_dir: env::var("LOG_DIR").ok(),
        })
    }
}
