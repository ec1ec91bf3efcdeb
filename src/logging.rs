//! Request logging middleware. Every response is timed and written to
//! `request_logs` after it has been produced; failures to write are only traced.

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{Method, StatusCode},
    middleware::Next,
    response::Response,
};
use tokio::time::Instant;
use uuid::Uuid;

use crate::{audit::ClientInfo, db, models::RequestLog, AppState};

/// Slot placed in request extensions so the authenticated user of a request
/// is visible to the middleware once the handler has run
#[derive(Debug, Clone, Default)]
pub struct RequestUser(Arc<OnceLock<Uuid>>);

impl RequestUser {
    pub fn set(&self, user_id: Uuid) {
        // A second extraction in the same request sees the same user
        let _ = self.0.set(user_id);
    }

    pub fn get(&self) -> Option<Uuid> {
        self.0.get().copied()
    }
}

pub async fn log_requests(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let endpoint = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = ClientInfo::from_headers(request.headers(), peer);

    let user = RequestUser::default();
    request.extensions_mut().insert(user.clone());

    let response = next.run(request).await;

    let log = request_log(
        &method,
        endpoint,
        user.get(),
        client,
        response.status(),
        started.elapsed(),
    );

    let pool = state.db.clone();
    tokio::spawn(async move {
        if let Err(e) = db::queries::insert_request_log(&pool, &log).await {
            tracing::error!("Failed to log request {} {}: {}", log.method, log.endpoint, e);
        }
    });

    response
}

fn request_log(
    method: &Method,
    endpoint: String,
    user_id: Option<Uuid>,
    client: ClientInfo,
    status: StatusCode,
    elapsed: Duration,
) -> RequestLog {
    RequestLog {
        user_id,
        method: method.as_str().to_string(),
        endpoint,
        status_code: i32::from(status.as_u16()),
        client,
        response_time_ms: i32::try_from(elapsed.as_millis()).unwrap_or(i32::MAX),
    }
}
