use std::{path::PathBuf, time::Duration};

use serde::Deserialize;

pub const DEFAULT_ENDPOINT: &str = "https://steamcommunity.com/market/search/render/";

/// The Steam search endpoint never returns more than 100 results per page
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Milliseconds between the end of one cycle and the start of the next
    pub update_interval: u64,
    pub apps: Vec<u32>,
    #[serde(default)]
    pub properties: Vec<String>,
    pub mongodb: MongoConfig,
    #[serde(default = "default_watermark_path")]
    pub watermark_path: PathBuf,
    #[serde(default = "default_rate_limit_interval")]
    pub rate_limit_interval: u64,
    #[serde(default = "default_cooldown")]
    pub cooldown: u64,
    #[serde(default = "default_cooldown_jitter")]
    pub cooldown_jitter: u64,
    #[serde(default = "default_page_size")]
    page_size: usize,
    #[serde(default)]
    pub max_pages: Option<usize>,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_metrics_addr")]
    pub metrics_addr: Option<std::net::SocketAddr>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
    #[serde(default = "default_collection")]
    pub collection: String,
}

fn default_watermark_path() -> PathBuf {
    PathBuf::from("last_update.txt")
}
fn default_rate_limit_interval() -> u64 {
    10_000
}
fn default_cooldown() -> u64 {
    30_000
}
fn default_cooldown_jitter() -> u64 {
    500
}
fn default_page_size() -> usize {
    MAX_PAGE_SIZE
}
fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}
fn default_metrics_addr() -> Option<std::net::SocketAddr> {
    Some(std::net::SocketAddr::from(([0, 0, 0, 0], 9100)))
}
fn default_collection() -> String {
    "items".to_string()
}

impl Config {
    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(raw)
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval)
    }

    pub fn rate_limit_interval(&self) -> Duration {
        Duration::from_millis(self.rate_limit_interval)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown)
    }

    /// The configured page size, clamped to what the endpoint accepts
    pub fn page_size(&self) -> usize {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }

    #[cfg(test)]
    pub(crate) fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size;
    }

    #[cfg(test)]
    pub(crate) fn for_tests(apps: Vec<u32>, properties: Vec<&str>) -> Self {
        Self {
            update_interval: 60 * 60 * 1000,
            apps,
            properties: properties.into_iter().map(String::from).collect(),
            mongodb: MongoConfig {
                uri: "mongodb://localhost:27017".to_string(),
                database: "steamsnap".to_string(),
                collection: default_collection(),
            },
            watermark_path: default_watermark_path(),
            rate_limit_interval: default_rate_limit_interval(),
            cooldown: default_cooldown(),
            cooldown_jitter: 0,
            page_size: default_page_size(),
            max_pages: None,
            endpoint: default_endpoint(),
            metrics_addr: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = Config::from_yaml(
            r#"
updateInterval: 3600000
apps: [730, 570]
mongodb:
  uri: mongodb://localhost:27017
  database: market
"#,
        )
        .unwrap();

        assert_eq!(vec![730, 570], config.apps);
        assert!(config.properties.is_empty());
        assert_eq!(Duration::from_secs(3600), config.update_interval());
        assert_eq!(Duration::from_secs(10), config.rate_limit_interval());
        assert_eq!(Duration::from_secs(30), config.cooldown());
        assert_eq!(100, config.page_size());
        assert_eq!(None, config.max_pages);
        assert_eq!("items", config.mongodb.collection);
        assert_eq!(DEFAULT_ENDPOINT, config.endpoint);
        assert_eq!(PathBuf::from("last_update.txt"), config.watermark_path);
    }

    #[test]
    fn example_config_parses() {
        let config = Config::from_yaml(include_str!("../config.example.yaml")).unwrap();

        assert_eq!(vec![730, 440], config.apps);
        assert_eq!(5, config.properties.len());
        assert_eq!(
            Some(std::net::SocketAddr::from(([0, 0, 0, 0], 9100))),
            config.metrics_addr
        );
    }

    #[test]
    fn page_size_is_clamped() {
        let mut config = Config::for_tests(vec![730], vec![]);

        config.page_size = 500;
        assert_eq!(100, config.page_size());

        config.page_size = 0;
        assert_eq!(1, config.page_size());

        config.page_size = 42;
        assert_eq!(42, config.page_size());
    }

    #[test]
    fn null_metrics_addr_disables_server() {
        let config = Config::from_yaml(
            r#"
updateInterval: 1000
apps: [730]
properties: [name, sell_listings]
metricsAddr: null
mongodb:
  uri: mongodb://localhost:27017
  database: market
  collection: listings
"#,
        )
        .unwrap();

        assert_eq!(None, config.metrics_addr);
        assert_eq!(vec!["name", "sell_listings"], config.properties);
        assert_eq!("listings", config.mongodb.collection);
    }

    #[test]
    fn missing_apps_is_rejected() {
        let result = Config::from_yaml(
            r#"
updateInterval: 1000
mongodb:
  uri: mongodb://localhost:27017
  database: market
"#,
        );

        assert!(result.is_err());
    }
}
