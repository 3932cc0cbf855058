use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct CmsConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_database_url")]
    pub database_url: String,

    #[serde(default = "default_db_pool_max_size")]
    pub db_pool_max_size: u32,

    #[serde(default = "default_query_retries")]
    pub query_retries: u32,

    #[serde(default)]
    pub jwt_secret: String,

    /// Adds `Secure` to the auth cookie. Leave off for plain-http development.
    #[serde(default)]
    pub cookie_secure: bool,

    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,

    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_bind_address() -> String {
    "127.0.0.1".into()
}

fn default_port() -> u16 {
    3030
}

fn default_database_url() -> String {
    "gazette.db".into()
}

fn default_db_pool_max_size() -> u32 {
    crate::DEFAULT_DB_POOL_MAX_SIZE
}

fn default_query_retries() -> u32 {
    crate::DEFAULT_QUERY_RETRIES
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_max_upload_bytes() -> usize {
    crate::DEFAULT_MAX_UPLOAD_BYTES
}

impl Default for CmsConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            database_url: default_database_url(),
            db_pool_max_size: default_db_pool_max_size(),
            query_retries: default_query_retries(),
            jwt_secret: String::new(),
            cookie_secure: false,
            upload_dir: default_upload_dir(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl CmsConfig {
    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        toml::from_str(contents).context("invalid config file")
    }

    /// Read the optional config file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(p) => {
                let contents = std::fs::read_to_string(p)
                    .with_context(|| format!("error reading config file {:?}", p))?;
                Self::from_toml(&contents)?
            }
            None => Self::default(),
        };

        if let Ok(url) = std::env::var(crate::DATABASE_URL_VAR) {
            config.database_url = url;
        }
        if let Ok(secret) = std::env::var(crate::JWT_SECRET_VAR) {
            config.jwt_secret = secret;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.jwt_secret.len() < crate::MIN_JWT_SECRET_LEN {
            return Err(anyhow!(
                "jwt_secret must be at least {} characters (set {} or jwt_secret in the config file)",
                crate::MIN_JWT_SECRET_LEN,
                crate::JWT_SECRET_VAR
            ));
        }
        if self.max_upload_bytes == 0 {
            return Err(anyhow!("max_upload_bytes must be positive"));
        }
        Ok(())
    }
}
