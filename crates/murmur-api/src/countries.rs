use std::time::Duration;

use axum::{Json, extract::State};
use murmur_types::api::Country;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::state::AppState;

pub const DEFAULT_COUNTRIES_URL: &str = "https://restcountries.com/v3.1/all?fields=name,idd,flags";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct RawCountry {
    #[serde(default)]
    name: Option<RawName>,
    #[serde(default)]
    idd: Option<RawIdd>,
    #[serde(default)]
    flags: Option<RawFlags>,
}

#[derive(Debug, Deserialize)]
struct RawName {
    common: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawIdd {
    root: Option<String>,
    #[serde(default)]
    suffixes: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawFlags {
    png: Option<String>,
}

/// Used whenever the remote list cannot be fetched or parsed.
pub fn fallback_countries() -> Vec<Country> {
    [
        ("India", "+91"),
        ("United States", "+1"),
        ("United Kingdom", "+44"),
    ]
    .into_iter()
    .map(|(name, dial_code)| Country {
        name: name.to_string(),
        dial_code: dial_code.to_string(),
        flag_url: None,
    })
    .collect()
}

/// Dial code is the IDD root plus its first suffix. Entries without a root
/// or a name are dropped; the rest are sorted by name.
fn normalize(raw: Vec<RawCountry>) -> Vec<Country> {
    let mut countries: Vec<Country> = raw
        .into_iter()
        .filter_map(|c| {
            let idd = c.idd?;
            let root = idd.root.filter(|r| !r.is_empty())?;
            let suffix = idd.suffixes.into_iter().next().unwrap_or_default();
            Some(Country {
                name: c.name?.common?,
                dial_code: format!("{}{}", root, suffix),
                flag_url: c.flags.and_then(|f| f.png),
            })
        })
        .collect();
    countries.sort_by(|a, b| a.name.cmp(&b.name));
    countries
}

/// Country dial-code lookup backed by the REST Countries API.
pub struct CountryProvider {
    client: reqwest::Client,
    url: String,
    cache: RwLock<Option<Vec<Country>>>,
}

impl CountryProvider {
    pub fn new(url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to build HTTP client, using defaults: {}", e);
                reqwest::Client::new()
            });
        Self {
            client,
            url: url.into(),
            cache: RwLock::new(None),
        }
    }

    /// Never fails: errors fall back to [`fallback_countries`], which is not cached.
    pub async fn fetch_countries(&self) -> Vec<Country> {
        if let Some(countries) = self.cache.read().await.as_ref() {
            return countries.clone();
        }

        match self.fetch_remote().await {
            Ok(countries) => {
                info!("Loaded {} countries from {}", countries.len(), self.url);
                *self.cache.write().await = Some(countries.clone());
                countries
            }
            Err(e) => {
                warn!("Failed to load countries, using fallback list: {}", e);
                fallback_countries()
            }
        }
    }

    async fn fetch_remote(&self) -> Result<Vec<Country>, reqwest::Error> {
        let raw: Vec<RawCountry> = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(normalize(raw))
    }
}

impl Default for CountryProvider {
    fn default() -> Self {
        Self::new(DEFAULT_COUNTRIES_URL)
    }
}

/// GET /countries
pub async fn list_countries(State(state): State<AppState>) -> Json<Vec<Country>> {
    Json(state.countries.fetch_countries().await)
}
