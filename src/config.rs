//! Service configuration.
//!
//! Values come from an optional YAML file (path in `ML_CONFIG_FILE`) and the
//! environment, with the environment taking precedence. Everything is
//! resolved once at start-up and treated as read-only afterwards.

use std::{net::SocketAddr, str::FromStr, time::Duration};

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_API_BASE_URL: &str = "https://api.mercadolibre.com";
pub const DEFAULT_SITE_ID: &str = "MLA";
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:80";
const DEFAULT_PAGE_SIZE: usize = 50;
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
    #[error("reading config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// How the seller's active listings are discovered.
///
/// The two upstream searches do not agree with each other, so a deployment
/// picks exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStrategy {
    /// `/users/{seller}/items/search`, returns identifiers only.
    #[default]
    SellerItems,
    /// `/sites/{site}/search?seller_id=..`, returns item summaries.
    SiteSearch,
}

impl FromStr for ListingStrategy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "seller_items" => Ok(Self::SellerItems),
            "site_search" => Ok(Self::SiteSearch),
            _ => Err(()),
        }
    }
}

/// Contents of the optional YAML config file. Every key may be omitted.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub listen_addr: Option<String>,
    pub api_base_url: Option<String>,
    pub access_token: Option<String>,
    pub seller_id: Option<String>,
    pub site_id: Option<String>,
    pub listing_strategy: Option<ListingStrategy>,
    pub concurrency: Option<usize>,
    pub page_size: Option<usize>,
    pub request_timeout_secs: Option<u64>,
}

impl FileConfig {
    pub async fn read(path: &str) -> Result<Self, ConfigError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_string(),
                source,
            })?;

        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }
}

#[derive(Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub api_base_url: String,
    pub access_token: String,
    pub seller_id: String,
    pub site_id: String,
    pub listing_strategy: ListingStrategy,
    /// Number of items processed at once, 1 means strictly sequential.
    pub concurrency: usize,
    pub page_size: usize,
    pub request_timeout: Duration,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("listen_addr", &self.listen_addr)
            .field("api_base_url", &self.api_base_url)
            .field("access_token", &"****")
            .field("seller_id", &self.seller_id)
            .field("site_id", &self.site_id)
            .field("listing_strategy", &self.listing_strategy)
            .field("concurrency", &self.concurrency)
            .field("page_size", &self.page_size)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl Config {
    /// Loads the config from the process environment and, if `ML_CONFIG_FILE`
    /// is set, the YAML file it points at.
    pub async fn load() -> Result<Self, ConfigError> {
        let file = match std::env::var("ML_CONFIG_FILE") {
            Ok(path) => {
                tracing::info!("Loading config file {}", path);
                FileConfig::read(&path).await?
            }
            Err(_) => FileConfig::default(),
        };

        Self::resolve(file, |key| std::env::var(key).ok())
    }

    pub fn resolve(
        file: FileConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let lookup = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let access_token = lookup("ML_ACCESS_TOKEN")
            .or(file.access_token)
            .ok_or(ConfigError::Missing("ML_ACCESS_TOKEN"))?;
        let seller_id = lookup("ML_SELLER_ID")
            .or(file.seller_id)
            .ok_or(ConfigError::Missing("ML_SELLER_ID"))?;
        let site_id = lookup("ML_SITE_ID")
            .or(file.site_id)
            .unwrap_or_else(|| DEFAULT_SITE_ID.to_string());
        let api_base_url = lookup("ML_API_BASE_URL")
            .or(file.api_base_url)
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let listen_addr = lookup("ML_LISTEN_ADDR")
            .or(file.listen_addr)
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
        let listen_addr = parse("ML_LISTEN_ADDR", &listen_addr)?;

        let listing_strategy = match lookup("ML_LISTING_STRATEGY") {
            Some(raw) => parse("ML_LISTING_STRATEGY", &raw)?,
            None => file.listing_strategy.unwrap_or_default(),
        };

        let concurrency = match lookup("ML_CONCURRENCY") {
            Some(raw) => parse("ML_CONCURRENCY", &raw)?,
            None => file.concurrency.unwrap_or(1),
        };
        if concurrency == 0 {
            return Err(ConfigError::Invalid {
                key: "ML_CONCURRENCY",
                value: "0".to_string(),
            });
        }

        let page_size = match lookup("ML_PAGE_SIZE") {
            Some(raw) => parse("ML_PAGE_SIZE", &raw)?,
            None => file.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        };
        if page_size == 0 {
            return Err(ConfigError::Invalid {
                key: "ML_PAGE_SIZE",
                value: "0".to_string(),
            });
        }

        let timeout_secs = match lookup("ML_REQUEST_TIMEOUT_SECS") {
            Some(raw) => parse("ML_REQUEST_TIMEOUT_SECS", &raw)?,
            None => file.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        };

        Ok(Self {
            listen_addr,
            api_base_url,
            access_token,
            seller_id,
            site_id,
            listing_strategy,
            concurrency,
            page_size,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn parse<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: raw.to_string(),
    })
}
