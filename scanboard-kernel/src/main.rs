/**
 * SCANBOARD KERNEL - Point d'entrée du proxy de résumé
 *
 * RÔLE : .env, logs, config, client Censys, serveur axum.
 * Les identifiants manquants ne bloquent pas le démarrage : la route de
 * résumé répond 500 tant qu'ils ne sont pas fournis.
 */

use anyhow::Context;
use scanboard_kernel::config::{load_config, Credentials};
use scanboard_kernel::{build_router, AppState, HttpCensysClient, SummaryAggregator};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Ok si .env n'existe pas
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = load_config().await;
    let credentials = Credentials::from_env();
    if credentials.validate().is_err() {
        warn!("CENSYS_API_ID / CENSYS_API_SECRET not set, {} will answer 500", cfg.summary_route);
    }

    let client = HttpCensysClient::new(&cfg.upstream).context("failed to build Censys HTTP client")?;
    info!(
        base_url = client.base_url(),
        strategy = cfg.summary.strategy.as_str(),
        "Censys upstream configured"
    );

    let aggregator = SummaryAggregator::new(client, cfg.summary.clone());
    let app = build_router(AppState::new(aggregator, credentials), &cfg.summary_route);

    let listener = TcpListener::bind(&cfg.listen)
        .await
        .with_context(|| format!("failed to bind {}", cfg.listen))?;
    info!("listening on http://{}{}", listener.local_addr()?, cfg.summary_route);
    axum::serve(listener, app).await.context("http server stopped")?;
    Ok(())
}
