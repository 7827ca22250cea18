use std::path::PathBuf;

use anyhow::bail;
use serde::Deserialize;

use crate::auth::refresh::DEFAULT_REFRESH_TTL;

/// Upper bound for token lifetimes, 100 years.
pub const MAX_TTL_SECONDS: u64 = 100 * 365 * 24 * 60 * 60;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub ttl_seconds: u64,
    pub refresh_ttl_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub jwt: JwtConfig,
    pub polka_key: String,
    pub fileserver_root: PathBuf,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "chirpy".into()),
            ttl_seconds: parse_ttl(
                "JWT_TTL_SECONDS",
                std::env::var("JWT_TTL_SECONDS").ok(),
                60 * 60 * 24,
            )?,
            refresh_ttl_seconds: parse_ttl(
                "REFRESH_TTL_SECONDS",
                std::env::var("REFRESH_TTL_SECONDS").ok(),
                DEFAULT_REFRESH_TTL.as_secs(),
            )?,
        };
        Ok(Self {
            database_path: std::env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "database.json".into())
                .into(),
            jwt,
            polka_key: std::env::var("POLKA_KEY").unwrap_or_default(),
            fileserver_root: std::env::var("FILESERVER_ROOT")
                .unwrap_or_else(|_| ".".into())
                .into(),
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: std::env::var("APP_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(8080),
        })
    }
}

/// Unset or unparsable values fall back to `default`; anything above
/// `MAX_TTL_SECONDS` is rejected.
fn parse_ttl(name: &str, raw: Option<String>, default: u64) -> anyhow::Result<u64> {
    let secs = raw
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default);
    if secs > MAX_TTL_SECONDS {
        bail!("{name}={secs} exceeds the maximum of {MAX_TTL_SECONDS} seconds");
    }
    Ok(secs)
}
