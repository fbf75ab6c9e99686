use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::{fmt, path::Path};
use thiserror::Error;
use tokio::fs;
use tracing::{info, warn};

pub const DEFAULT_BASE_URL: &str = "https://search.censys.io/api/v2";
pub const DEFAULT_SUMMARY_ROUTE: &str = "/api/censys-summary";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ProxyConfig {
    pub listen: String,
    pub summary_route: String,
    pub upstream: UpstreamConf,
    pub summary: SummaryConf,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct UpstreamConf {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SummaryConf {
    pub strategy: Strategy,
    pub query: Option<String>, // sinon la requête par défaut de la stratégie
    pub service_buckets: u32,
    pub country_buckets: u32,
    pub exclude_virtual_hosts: bool,
}

/// Façon d'interroger Censys.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// 3 requêtes concurrentes : recherche + 2 stats par buckets (pays en majuscules)
    BucketStats,
    /// 1 requête de recherche dont on lit les facettes (pays tels que renvoyés)
    SearchFacets,
}

impl Strategy {
    pub fn default_query(self) -> &'static str {
        match self {
            Strategy::BucketStats => "*",
            Strategy::SearchFacets => "services.service_name:*",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::BucketStats => "bucket_stats",
            Strategy::SearchFacets => "search_facets",
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".into(),
            summary_route: DEFAULT_SUMMARY_ROUTE.into(),
            upstream: UpstreamConf::default(),
            summary: SummaryConf::default(),
        }
    }
}

impl Default for UpstreamConf {
    fn default() -> Self {
        Self { base_url: DEFAULT_BASE_URL.into(), timeout_secs: 15 }
    }
}

impl Default for SummaryConf {
    fn default() -> Self {
        Self {
            strategy: Strategy::BucketStats,
            query: None,
            service_buckets: 25,
            country_buckets: 50,
            exclude_virtual_hosts: true,
        }
    }
}

impl SummaryConf {
    pub fn effective_query(&self) -> &str {
        match self.query.as_deref().map(str::trim) {
            Some(q) if !q.is_empty() => q,
            _ => self.strategy.default_query(),
        }
    }
}

/// Identifiants Censys (id + secret), lus dans l'environnement.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub id: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self { id: id.into(), secret: secret.into() }
    }

    pub fn from_env() -> Self {
        Self {
            id: std::env::var("CENSYS_API_ID").unwrap_or_default(),
            secret: std::env::var("CENSYS_API_SECRET").unwrap_or_default(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.id.trim().is_empty() || self.secret.trim().is_empty() {
            return Err(ConfigError::MissingCredentials);
        }
        Ok(())
    }
}

// jamais le secret dans les logs
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("id", &self.id)
            .field("secret", &if self.secret.is_empty() { "<unset>" } else { "<redacted>" })
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },
    #[error("invalid config {path}: {source}")]
    Yaml { path: String, #[source] source: serde_yaml::Error },
}

/// Lit un fichier YAML. Fichier vide => config par défaut.
pub async fn load_config_from(path: &Path) -> Result<ProxyConfig, ConfigLoadError> {
    let display = path.display().to_string();
    let txt = fs::read_to_string(path)
        .await
        .map_err(|source| ConfigLoadError::Io { path: display.clone(), source })?;
    if txt.trim().is_empty() {
        return Ok(ProxyConfig::default());
    }
    serde_yaml::from_str(&txt).map_err(|source| ConfigLoadError::Yaml { path: display, source })
}

/// Config du proxy : `SCANBOARD_CONFIG` (défaut scanboard.yaml), puis `SCANBOARD_LISTEN`.
pub async fn load_config() -> ProxyConfig {
    let path = std::env::var("SCANBOARD_CONFIG").unwrap_or_else(|_| "scanboard.yaml".into());
    let mut cfg = if Path::new(&path).exists() {
        load_config_from(Path::new(&path)).await.unwrap_or_else(|e| {
            warn!("{e}, using defaults");
            ProxyConfig::default()
        })
    } else {
        info!("no {path}, using default config");
        ProxyConfig::default()
    };

    if let Ok(listen) = std::env::var("SCANBOARD_LISTEN") {
        if !listen.trim().is_empty() {
            cfg.listen = listen.trim().to_string();
        }
    }
    cfg
}
