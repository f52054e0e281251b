use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, bail};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub media_base_url: String,
    pub token_ttl_days: i64,
    /// Promoted to admin at startup if the account exists.
    pub admin_username: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let jwt_secret = get("TRIPSHARE_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("TRIPSHARE_JWT_SECRET is unset or still a placeholder; set it in your .env file");
        }

        let port = match get("TRIPSHARE_PORT") {
            Some(p) => p.parse().with_context(|| format!("TRIPSHARE_PORT '{}' is not a port", p))?,
            None => 3000,
        };
        let token_ttl_days = match get("TRIPSHARE_TOKEN_TTL_DAYS") {
            Some(d) => d
                .parse()
                .with_context(|| format!("TRIPSHARE_TOKEN_TTL_DAYS '{}' is not a number", d))?,
            None => 30,
        };
        if token_ttl_days <= 0 {
            bail!("TRIPSHARE_TOKEN_TTL_DAYS must be positive");
        }

        Ok(Self {
            jwt_secret,
            db_path: get("TRIPSHARE_DB_PATH")
                .unwrap_or_else(|| "tripshare.db".into())
                .into(),
            host: get("TRIPSHARE_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            media_base_url: get("TRIPSHARE_MEDIA_BASE_URL")
                .unwrap_or_else(|| "http://localhost:3000/media/".into()),
            token_ttl_days,
            admin_username: get("TRIPSHARE_ADMIN_USERNAME").filter(|u| !u.trim().is_empty()),
        })
    }

    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}
