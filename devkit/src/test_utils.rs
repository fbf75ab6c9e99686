/*!
Harness de test pour le proxy Scanboard

- Lance le router axum du kernel sur un port éphémère
- Client reqwest prêt à l'emploi pour interroger le proxy
- Init des logs de test (une seule fois)
*/

use crate::fixtures::test_credentials;
use crate::upstream_stub::StubCensys;
use anyhow::Result;
use scanboard_kernel::config::{Credentials, SummaryConf, DEFAULT_SUMMARY_ROUTE};
use scanboard_kernel::{build_router, AppState, CensysApi, SummaryAggregator};
use std::net::SocketAddr;
use tokio::net::TcpListener;

pub fn init_test_logging() {
    tracing_subscriber::fmt().with_test_writer().try_init().ok();
}

/// Proxy démarré en tâche de fond.
pub struct RunningProxy<U> {
    pub addr: SocketAddr,
    pub state: AppState<U>,
    pub client: reqwest::Client,
}

impl<U> RunningProxy<U> {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn get(&self, path: &str) -> Result<reqwest::Response> {
        Ok(self.client.get(self.url(path)).send().await?)
    }

    pub async fn get_summary(&self) -> Result<reqwest::Response> {
        self.get(DEFAULT_SUMMARY_ROUTE).await
    }
}

pub async fn spawn_proxy<U: CensysApi + 'static>(
    upstream: U,
    settings: SummaryConf,
    credentials: Credentials,
) -> Result<RunningProxy<U>> {
    init_test_logging();
    let state = AppState::new(SummaryAggregator::new(upstream, settings), credentials);
    let app = build_router(state.clone(), DEFAULT_SUMMARY_ROUTE);

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("[test-proxy] server stopped: {e}");
        }
    });

    Ok(RunningProxy { addr, state, client: reqwest::Client::new() })
}

/// Raccourci : stub + réglages par défaut + identifiants de test.
pub async fn spawn_stub_proxy(stub: StubCensys) -> Result<RunningProxy<StubCensys>> {
    spawn_proxy(stub, SummaryConf::default(), test_credentials()).await
}
