use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use murmur_api::countries::DEFAULT_COUNTRIES_URL;
use murmur_api::responder::{DEFAULT_REPLY_DELAY, DEFAULT_REPLY_TEXT, ReplyConfig};
use murmur_db::DEFAULT_STORAGE_KEY;

/// `MURMUR_DB_PATH` value that keeps everything in memory.
const IN_MEMORY: &str = ":memory:";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// `None` when running without a database file.
    pub db_path: Option<PathBuf>,
    pub storage_key: String,
    pub reply: ReplyConfig,
    pub countries_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let host = var("MURMUR_HOST").unwrap_or_else(|| "127.0.0.1".into());
        let port: u16 = var("MURMUR_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("MURMUR_PORT must be a port number")?;

        let db_path = var("MURMUR_DB_PATH").unwrap_or_else(|| "murmur.db".into());
        let db_path = (db_path != IN_MEMORY).then(|| PathBuf::from(db_path));

        let storage_key = var("MURMUR_STORAGE_KEY").unwrap_or_else(|| DEFAULT_STORAGE_KEY.into());

        let delay = match var("MURMUR_REPLY_DELAY_MS") {
            Some(ms) => Duration::from_millis(
                ms.parse()
                    .context("MURMUR_REPLY_DELAY_MS must be a number of milliseconds")?,
            ),
            None => DEFAULT_REPLY_DELAY,
        };
        let text = var("MURMUR_REPLY_TEXT").unwrap_or_else(|| DEFAULT_REPLY_TEXT.into());

        let countries_url =
            var("MURMUR_COUNTRIES_URL").unwrap_or_else(|| DEFAULT_COUNTRIES_URL.into());

        Ok(Self {
            host,
            port,
            db_path,
            storage_key,
            reply: ReplyConfig { delay, text },
            countries_url,
        })
    }
}
