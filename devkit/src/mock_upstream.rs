/*!
Faux serveur Censys HTTP (axum) pour tester `HttpCensysClient` de bout en bout

Sert /hosts/search et /hosts/stats/{field} sur 127.0.0.1:port-éphémère,
renvoie les réponses préparées et enregistre chaque requête reçue
(chemin, header Authorization, corps JSON).
*/

use anyhow::Result;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Debug, Clone)]
pub struct CannedReply {
    pub status: StatusCode,
    pub body: String,
    pub delay: Option<Duration>,
}

impl CannedReply {
    pub fn json(body: &Value) -> Self {
        Self { status: StatusCode::OK, body: body.to_string(), delay: None }
    }

    pub fn status(status: u16, body: &str) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            body: body.to_string(),
            delay: None,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[derive(Default)]
struct MockState {
    replies: HashMap<String, CannedReply>,
    requests: Vec<RecordedRequest>,
}

#[derive(Clone)]
pub struct MockUpstream {
    addr: SocketAddr,
    state: Arc<Mutex<MockState>>,
}

impl MockUpstream {
    /// Démarre le serveur en tâche de fond.
    pub async fn start() -> Result<Self> {
        let state = Arc::new(Mutex::new(MockState::default()));
        let app = Router::new()
            .route("/hosts/search", post(search))
            .route("/hosts/stats/{field}", post(stats))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("[mock-upstream] server stopped: {e}");
            }
        });
        Ok(Self { addr, state })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Prépare la réponse d'un chemin (`/hosts/search`, `/hosts/stats/{field}`).
    pub fn reply(&self, path: &str, reply: CannedReply) -> &Self {
        self.state.lock().replies.insert(path.to_string(), reply);
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().requests.clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests().into_iter().filter(|r| r.path == path).collect()
    }
}

async fn search(State(state): State<Arc<Mutex<MockState>>>, headers: HeaderMap, body: Bytes) -> Response {
    answer(&state, "/hosts/search".to_string(), &headers, &body).await
}

async fn stats(
    State(state): State<Arc<Mutex<MockState>>>,
    Path(field): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    answer(&state, format!("/hosts/stats/{field}"), &headers, &body).await
}

async fn answer(state: &Mutex<MockState>, path: String, headers: &HeaderMap, body: &Bytes) -> Response {
    let reply = {
        let mut st = state.lock();
        st.requests.push(RecordedRequest {
            path: path.clone(),
            authorization: headers
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            body: serde_json::from_slice(body).unwrap_or(Value::Null),
        });
        st.replies.get(&path).cloned()
    };

    let Some(reply) = reply else {
        return (StatusCode::NOT_FOUND, format!("no canned reply for {path}")).into_response();
    };
    if let Some(delay) = reply.delay {
        tokio::time::sleep(delay).await;
    }
    (reply.status, [("content-type", "application/json")], reply.body).into_response()
}
