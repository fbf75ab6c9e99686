/*!
Stub Censys en mémoire pour tester l'agrégateur sans réseau

Implémente `CensysApi` avec des réponses préparées, enregistre chaque appel
et permet d'injecter des échecs et des délais par endpoint.
*/

use parking_lot::Mutex;
use scanboard_kernel::aggregator::{COUNTRY_FACET, SERVICE_FIELD};
use scanboard_kernel::models::{
    FacetBucket, FacetEntry, HostSearchRequest, HostSearchResponse, HostSearchResult,
    StatsRequest, StatsResponse, StatsResult,
};
use scanboard_kernel::upstream::{stats_path, CensysApi, SEARCH_PATH};
use scanboard_kernel::{Credentials, UpstreamError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Un appel reçu par le stub.
#[derive(Debug, Clone, PartialEq)]
pub enum StubCall {
    Search { creds_id: String, request: HostSearchRequest },
    Stats { creds_id: String, field: String, request: StatsRequest },
}

impl StubCall {
    pub fn path(&self) -> String {
        match self {
            StubCall::Search { .. } => SEARCH_PATH.to_string(),
            StubCall::Stats { field, .. } => stats_path(field),
        }
    }
}

#[derive(Default)]
struct StubState {
    search: Option<Result<HostSearchResponse, UpstreamError>>,
    stats: HashMap<String, Result<StatsResponse, UpstreamError>>,
    delays: HashMap<String, Duration>,
    calls: Vec<StubCall>,
}

#[derive(Clone, Default)]
pub struct StubCensys {
    state: Arc<Mutex<StubState>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl StubCensys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Réponse de recherche : total seul.
    pub fn with_total_hosts(self, total: u64) -> Self {
        self.state.lock().search = Some(Ok(HostSearchResponse {
            result: HostSearchResult { total: Some(total), facets: HashMap::new() },
        }));
        self
    }

    /// Réponse de recherche avec les facettes service et pays (`{name, count}`).
    pub fn with_search_facets(self, total: u64, services: &[(&str, u64)], countries: &[(&str, u64)]) -> Self {
        let entries = |pairs: &[(&str, u64)]| -> Vec<FacetEntry> {
            pairs
                .iter()
                .map(|(n, c)| FacetEntry { name: Some(n.to_string()), count: *c })
                .collect()
        };
        let facets = HashMap::from([
            (SERVICE_FIELD.to_string(), entries(services)),
            (COUNTRY_FACET.to_string(), entries(countries)),
        ]);
        self.state.lock().search = Some(Ok(HostSearchResponse {
            result: HostSearchResult { total: Some(total), facets },
        }));
        self
    }

    pub fn with_buckets(self, field: &str, buckets: Vec<FacetBucket>) -> Self {
        self.state.lock().stats.insert(
            field.to_string(),
            Ok(StatsResponse { result: StatsResult { buckets } }),
        );
        self
    }

    pub fn fail_search(self, status: u16, body: &str) -> Self {
        self.state.lock().search = Some(Err(UpstreamError::Status {
            path: SEARCH_PATH.to_string(),
            status,
            body: body.to_string(),
        }));
        self
    }

    pub fn fail_stats(self, field: &str, status: u16, body: &str) -> Self {
        self.state.lock().stats.insert(
            field.to_string(),
            Err(UpstreamError::Status { path: stats_path(field), status, body: body.to_string() }),
        );
        self
    }

    pub fn fail_with(self, path: &str, err: UpstreamError) -> Self {
        {
            let mut state = self.state.lock();
            if path == SEARCH_PATH {
                state.search = Some(Err(err));
            } else if let Some(field) = path.strip_prefix("/hosts/stats/") {
                state.stats.insert(field.to_string(), Err(err));
            }
        }
        self
    }

    /// Retarde la réponse d'un endpoint (`/hosts/search` ou `/hosts/stats/{field}`).
    pub fn delay(self, path: &str, delay: Duration) -> Self {
        self.state.lock().delays.insert(path.to_string(), delay);
        self
    }

    pub fn calls(&self) -> Vec<StubCall> {
        self.state.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().calls.len()
    }

    /// Nombre max d'appels simultanément en cours observé.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn enter(&self, call: StubCall) -> InFlight {
        let path = call.path();
        let delay = {
            let mut state = self.state.lock();
            state.calls.push(call);
            state.delays.get(&path).copied()
        };
        let guard = InFlight::new(self.in_flight.clone(), &self.max_in_flight);
        tracing::debug!("[stub] {path} (delay {delay:?})");
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
        guard
    }
}

/// Compteur d'appels en cours, décrémenté au drop (y compris si la future est abandonnée).
struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    fn new(counter: Arc<AtomicUsize>, max: &AtomicUsize) -> Self {
        let now = counter.fetch_add(1, Ordering::SeqCst) + 1;
        max.fetch_max(now, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl CensysApi for StubCensys {
    async fn search_hosts(
        &self,
        creds: &Credentials,
        req: &HostSearchRequest,
    ) -> Result<HostSearchResponse, UpstreamError> {
        let _guard = self
            .enter(StubCall::Search { creds_id: creds.id.clone(), request: req.clone() })
            .await;
        self.state.lock().search.clone().unwrap_or_else(|| Ok(HostSearchResponse::default()))
    }

    async fn host_stats(
        &self,
        creds: &Credentials,
        field: &str,
        req: &StatsRequest,
    ) -> Result<StatsResponse, UpstreamError> {
        let _guard = self
            .enter(StubCall::Stats {
                creds_id: creds.id.clone(),
                field: field.to_string(),
                request: req.clone(),
            })
            .await;
        self.state
            .lock()
            .stats
            .get(field)
            .cloned()
            .unwrap_or_else(|| Ok(StatsResponse::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stub_records_calls_and_replies() {
        let stub = StubCensys::new()
            .with_total_hosts(42)
            .with_buckets("services.service_name", vec![FacetBucket::new("ssh", 3)]);
        let creds = Credentials::new("id", "secret");

        let search = HostSearchRequest { q: "*".into(), per_page: 1, virtual_hosts: None };
        let resp = stub.search_hosts(&creds, &search).await.unwrap();
        assert_eq!(resp.result.total, Some(42));

        let stats = StatsRequest { q: "*".into(), num_buckets: 5 };
        let resp = stub.host_stats(&creds, "services.service_name", &stats).await.unwrap();
        assert_eq!(resp.result.buckets, vec![FacetBucket::new("ssh", 3)]);

        // champ non configuré => réponse vide
        let resp = stub.host_stats(&creds, "location.country_code", &stats).await.unwrap();
        assert!(resp.result.buckets.is_empty());

        assert_eq!(stub.call_count(), 3);
        assert_eq!(stub.calls()[1].path(), "/hosts/stats/services.service_name");
        assert_eq!(stub.max_in_flight(), 1);
    }

    #[tokio::test]
    async fn test_stub_failure_injection() {
        let stub = StubCensys::new().fail_stats("location.country_code", 429, "slow down");
        let creds = Credentials::new("id", "secret");
        let stats = StatsRequest { q: "*".into(), num_buckets: 5 };
        let err = stub.host_stats(&creds, "location.country_code", &stats).await.unwrap_err();
        assert_eq!(err.status(), Some(429));
        assert_eq!(err.path(), "/hosts/stats/location.country_code");
    }
}
