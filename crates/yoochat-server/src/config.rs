use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, anyhow, bail};

use yoochat_crypto::CipherKind;
use yoochat_types::models::SearchMode;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "secret",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub cipher: CipherKind,
    pub cipher_key: String,
    pub upload_dir: PathBuf,
    pub search_mode: SearchMode,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; `from_env` passes the process
    /// environment.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let jwt_secret = var("YOOCHAT_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("YOOCHAT_JWT_SECRET is unset or still a placeholder");
        }

        let cipher_key = var("YOOCHAT_CIPHER_KEY")
            .filter(|k| !k.is_empty())
            .context("YOOCHAT_CIPHER_KEY is required")?;

        let cipher = match var("YOOCHAT_CIPHER") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("invalid YOOCHAT_CIPHER '{raw}'"))?,
            None => CipherKind::default(),
        };

        let search_mode = match var("YOOCHAT_SEARCH_MODE") {
            Some(raw) => raw
                .parse()
                .map_err(|e| anyhow!("invalid YOOCHAT_SEARCH_MODE: {e}"))?,
            None => SearchMode::default(),
        };

        let port = var("YOOCHAT_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("YOOCHAT_PORT must be a port number")?;

        Ok(Self {
            host: var("YOOCHAT_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            db_path: var("YOOCHAT_DB_PATH")
                .unwrap_or_else(|| "yoochat.db".into())
                .into(),
            jwt_secret,
            cipher,
            cipher_key,
            upload_dir: var("YOOCHAT_UPLOAD_DIR")
                .unwrap_or_else(|| "uploads".into())
                .into(),
            search_mode,
        })
    }

    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}
