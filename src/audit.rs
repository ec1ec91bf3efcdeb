//! Audit trail of game creation attempts and rejections.
//!
//! Recording never fails and never blocks: the event is traced immediately
//! and, when a database is attached, written by a spawned task.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{db, models::LogAction};

/// Where a request came from, as recorded in audit and request logs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    pub fn from_headers(headers: &HeaderMap, peer: Option<SocketAddr>) -> Self {
        // First hop of X-Forwarded-For wins over the socket address
        let ip_address = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|ip| ip.trim().to_string())
            .filter(|ip| !ip.is_empty())
            .or_else(|| peer.map(|addr| addr.ip().to_string()));

        Self {
            ip_address,
            user_agent: headers
                .get(header::USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .map(String::from),
        }
    }

    pub fn from_parts(parts: &Parts) -> Self {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Self::from_headers(&parts.headers, peer)
    }
}

impl<S> FromRequestParts<S> for ClientInfo
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub user_id: Option<Uuid>,
    pub action: LogAction,
    pub game_id: Option<Uuid>,
    pub details: Option<String>,
    pub client: ClientInfo,
}

impl AuditEntry {
    pub fn new(action: LogAction) -> Self {
        Self {
            user_id: None,
            action,
            game_id: None,
            details: None,
            client: ClientInfo::default(),
        }
    }

    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_game(mut self, game_id: Uuid) -> Self {
        self.game_id = Some(game_id);
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_client(mut self, client: &ClientInfo) -> Self {
        self.client = client.clone();
        self
    }
}

#[derive(Clone, Default)]
pub struct AuditLogger {
    pool: Option<PgPool>,
}

impl AuditLogger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Some(pool) }
    }

    /// Trace-only logger that persists nothing
    #[cfg(test)]
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: AuditEntry) {
        tracing::info!(
            action = %entry.action,
            user_id = ?entry.user_id,
            game_id = ?entry.game_id,
            details = entry.details.as_deref().unwrap_or(""),
            ip = entry.client.ip_address.as_deref().unwrap_or(""),
            "audit"
        );

        let Some(pool) = self.pool.clone() else {
            return;
        };

        tokio::spawn(async move {
            if let Err(e) = db::queries::insert_game_log(&pool, &entry).await {
                tracing::error!("Failed to write audit entry {}: {}", entry.action, e);
            }
        });
    }
}
