/**
 * API HTTP SCANBOARD - Serveur axum du proxy de résumé
 *
 * RÔLE :
 * Expose le résumé Censys au dashboard statique, plus deux routes de santé.
 *
 * FONCTIONNEMENT :
 * - GET {summary_route} (défaut /api/censys-summary) : 200 / 500 / 502
 * - GET /health : liveness ("ok")
 * - GET /system/health : compteurs du HealthTracker
 * - Middleware : x-request-id + une ligne de log par requête
 *
 * CONTRAT :
 * - 200 => SummaryResult, 500 => { error }, 502 => { error, details, + résumé vide }
 * - Cache-Control no-store sur toutes les réponses de résumé
 * - Identifiants pris dans l'environnement, jamais dans la requête
 */

use crate::aggregator::SummaryAggregator;
use crate::config::Credentials;
use crate::error::SummaryError;
use crate::health::{HealthTracker, KernelHealth};
use crate::models::SummaryResult;
use crate::upstream::CensysApi;
use axum::extract::{Request, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

pub const NO_STORE: &str = "no-store, no-cache, must-revalidate";
pub const REQUEST_ID_HEADER: &str = "x-request-id";

pub struct AppState<U> {
    pub aggregator: Arc<SummaryAggregator<U>>,
    pub credentials: Arc<Credentials>,
    pub health_tracker: HealthTracker,
}

// derive(Clone) exigerait U: Clone
impl<U> Clone for AppState<U> {
    fn clone(&self) -> Self {
        Self {
            aggregator: self.aggregator.clone(),
            credentials: self.credentials.clone(),
            health_tracker: self.health_tracker.clone(),
        }
    }
}

impl<U: CensysApi> AppState<U> {
    pub fn new(aggregator: SummaryAggregator<U>, credentials: Credentials) -> Self {
        let health_tracker = HealthTracker::new(aggregator.settings().strategy);
        Self {
            aggregator: Arc::new(aggregator),
            credentials: Arc::new(credentials),
            health_tracker,
        }
    }
}

/// Corps des réponses 502 : erreur + résumé à zéro pour simplifier le client.
#[derive(Debug, Serialize)]
struct UpstreamFailureBody {
    error: &'static str,
    details: String,
    #[serde(flatten)]
    summary: SummaryResult,
}

#[derive(Debug, Serialize)]
struct ConfigFailureBody {
    error: String,
}

pub fn build_router<U: CensysApi + 'static>(app_state: AppState<U>, summary_route: &str) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/system/health", get(get_system_health::<U>))
        .route(summary_route, get(get_summary::<U>))
        .with_state(app_state)
        .layer(middleware::from_fn(trace_request))
}

async fn trace_request(req: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let mut res = next.run(req).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        res.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    info!(
        %request_id,
        %method,
        %path,
        status = res.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request served"
    );
    res
}

// GET /api/censys-summary
async fn get_summary<U: CensysApi + 'static>(State(app): State<AppState<U>>) -> Response {
    match app.aggregator.get_summary(&app.credentials).await {
        Ok(summary) => {
            app.health_tracker.record_success(&summary.last_sync);
            no_store(StatusCode::OK, Json(summary))
        }
        Err(err) => {
            app.health_tracker.record_failure(&err);
            summary_error_response(err)
        }
    }
}

// GET /system/health
async fn get_system_health<U: CensysApi + 'static>(State(app): State<AppState<U>>) -> Json<KernelHealth> {
    Json(app.health_tracker.get_health())
}

pub fn summary_error_response(err: SummaryError) -> Response {
    match err {
        SummaryError::Config(e) => {
            warn!("summary refused: {e}");
            no_store(StatusCode::INTERNAL_SERVER_ERROR, Json(ConfigFailureBody { error: e.to_string() }))
        }
        SummaryError::Upstream(e) => {
            error!(path = e.path(), status = ?e.status(), "Censys summary error: {e}");
            let body = UpstreamFailureBody {
                error: "Unable to retrieve Censys summary",
                details: e.to_string(),
                summary: SummaryResult::empty(),
            };
            no_store(StatusCode::BAD_GATEWAY, Json(body))
        }
    }
}

fn no_store(status: StatusCode, body: impl IntoResponse) -> Response {
    let mut res = (status, body).into_response();
    let headers = res.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static(NO_STORE));
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, UpstreamError};

    #[test]
    fn test_config_error_maps_to_500() {
        let res = summary_error_response(ConfigError::MissingCredentials.into());
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(res.headers()[CACHE_CONTROL], NO_STORE);
    }

    #[test]
    fn test_upstream_error_maps_to_502() {
        let err = UpstreamError::Decode { path: "/hosts/search".into(), message: "eof".into() };
        let res = summary_error_response(err.into());
        assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(res.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(res.headers()[CACHE_CONTROL], NO_STORE);
    }

    #[test]
    fn test_upstream_body_is_flat() {
        let body = UpstreamFailureBody {
            error: "Unable to retrieve Censys summary",
            details: "boom".into(),
            summary: SummaryResult::empty(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["details"], "boom");
        assert_eq!(json["total_hosts"], 0);
        assert_eq!(json["total_services"], 0);
        assert_eq!(json["countries"], serde_json::json!({}));
        assert_eq!(json["services"], serde_json::json!({}));
        assert!(json["last_sync"].is_string());
    }
}
