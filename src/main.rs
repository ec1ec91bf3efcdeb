mod audit;
mod auth;
mod cache;
mod config;
mod db;
mod error;
mod game;
mod kv;
mod logging;
mod models;
mod rate_limit;
mod routes;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Result;
use axum::Router;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use audit::AuditLogger;
use cache::GameCache;
use config::Config;
use db::PgGameStore;
use game::{DifficultyResolver, GameService};
use kv::{KvStore, MemoryStore};
use rate_limit::RateLimitGate;

/// How often expired cache entries and counters are swept from memory
const KV_PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Application state shared across all handlers
pub struct AppState {
    pub config: Config,
    pub db: PgPool,
    pub games: GameService,
    pub rate_gate: RateLimitGate,
    pub audit: AuditLogger,
}

impl AppState {
    pub fn new(config: Config, db: PgPool, kv: Arc<dyn KvStore>) -> Self {
        let audit = AuditLogger::new(db.clone());
        let rate_gate = RateLimitGate::new(kv.clone(), config.rate_limit.clone());
        let games = GameService::new(
            Arc::new(PgGameStore::new(db.clone())),
            GameCache::new(kv, config.cache.clone()),
            rate_gate.clone(),
            DifficultyResolver::new(&config.game),
            audit.clone(),
        );

        Self {
            config,
            db,
            games,
            rate_gate,
            audit,
        }
    }
}

fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    routes::create_routes()
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            logging::log_requests,
        ))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "minesweeper_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Minesweeper backend server...");

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded");

    // Connect to database
    let db = db::create_pool(config.database_url(), config.database.max_connections).await?;
    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("./migrations").run(&db).await?;
    tracing::info!("Database migrations completed");

    auth::seed_default_user(&db, &config.default_user).await?;

    // Cache entries and rate counters share one store
    let kv = Arc::new(MemoryStore::new());
    let purge_store = kv.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(KV_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            let purged = purge_store.purge_expired();
            if purged > 0 {
                tracing::debug!("Purged {} expired key-value entries", purged);
            }
        }
    });

    let state = Arc::new(AppState::new(config.clone(), db, kv));
    let app = build_router(state);

    // Start server
    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check: http://{}/health", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    fn test_router() -> Router {
        let config = Config::from_lookup(|_| None).unwrap();
        // Never connects unless a handler touches the database
        let db = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(100))
            .connect_lazy(config.database_url())
            .unwrap();
        build_router(Arc::new(AppState::new(config, db, Arc::new(MemoryStore::new()))))
    }

    #[tokio::test]
    async fn test_health_route() {
        let response = test_router()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_games_require_api_key() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/games")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let response = test_router()
            .oneshot(Request::builder().uri("/api/lobbies").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
