/*!
# Scanboard Kernel - Proxy de résumé Censys pour le dashboard

- `aggregator` : Censys -> SummaryResult (stratégies bucket stats / facettes)
- `upstream`   : trait `CensysApi` + client reqwest
- `http`       : routes axum (résumé, santé)
- `health`     : compteurs process-local
- `config`     : scanboard.yaml + variables d'environnement
*/

pub mod aggregator;
pub mod config;
pub mod error;
pub mod health;
pub mod http;
pub mod models;
pub mod upstream;

pub use aggregator::SummaryAggregator;
pub use config::{Credentials, ProxyConfig, Strategy, SummaryConf};
pub use error::{ConfigError, SummaryError, UpstreamError};
pub use http::{build_router, AppState};
pub use models::SummaryResult;
pub use upstream::{CensysApi, HttpCensysClient};
