/**
 * CLIENT CENSYS - Accès à l'API de recherche Censys v2
 *
 * RÔLE :
 * Seule porte de sortie réseau du proxy. Le trait `CensysApi` isole
 * l'agrégateur du transport (reqwest en prod, stub en test).
 *
 * FONCTIONNEMENT :
 * - POST {base}/hosts/search        { q, per_page, virtual_hosts? }
 * - POST {base}/hosts/stats/{field} { q, num_buckets }
 * - Auth HTTP Basic base64(id:secret), timeout global du client
 * - Non-2xx / transport / timeout / JSON illisible => UpstreamError
 */

use crate::config::{Credentials, UpstreamConf};
use crate::error::UpstreamError;
use crate::models::{HostSearchRequest, HostSearchResponse, StatsRequest, StatsResponse};
use reqwest::header::ACCEPT;
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

pub const SEARCH_PATH: &str = "/hosts/search";

pub fn stats_path(field: &str) -> String {
    format!("/hosts/stats/{field}")
}

/// Les deux opérations Censys dont le proxy a besoin.
pub trait CensysApi: Send + Sync {
    fn search_hosts(
        &self,
        creds: &Credentials,
        req: &HostSearchRequest,
    ) -> impl Future<Output = Result<HostSearchResponse, UpstreamError>> + Send;

    fn host_stats(
        &self,
        creds: &Credentials,
        field: &str,
        req: &StatsRequest,
    ) -> impl Future<Output = Result<StatsResponse, UpstreamError>> + Send;
}

#[derive(Clone, Debug)]
pub struct HttpCensysClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCensysClient {
    pub fn new(conf: &UpstreamConf) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(conf.timeout_secs.max(1)))
            .user_agent(concat!("scanboard-kernel/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: conf.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_json<B, T>(&self, creds: &Credentials, path: &str, body: &B) -> Result<T, UpstreamError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "censys request");

        let res = self
            .client
            .post(&url)
            .basic_auth(&creds.id, Some(&creds.secret))
            .header(ACCEPT, "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| UpstreamError::from_reqwest(path, e))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(UpstreamError::Status {
                path: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let bytes = res.bytes().await.map_err(|e| UpstreamError::from_reqwest(path, e))?;
        serde_json::from_slice(&bytes).map_err(|e| UpstreamError::Decode {
            path: path.to_string(),
            message: e.to_string(),
        })
    }
}

impl CensysApi for HttpCensysClient {
    async fn search_hosts(
        &self,
        creds: &Credentials,
        req: &HostSearchRequest,
    ) -> Result<HostSearchResponse, UpstreamError> {
        self.post_json(creds, SEARCH_PATH, req).await
    }

    async fn host_stats(
        &self,
        creds: &Credentials,
        field: &str,
        req: &StatsRequest,
    ) -> Result<StatsResponse, UpstreamError> {
        self.post_json(creds, &stats_path(field), req).await
    }
}
