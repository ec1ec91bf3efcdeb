//! Game creation and cached reads.
//!
//! Creation runs resolve, generate, then a single transaction holding the game
//! row and every cell. Bookkeeping (daily quota, list invalidation, cache warm)
//! happens only after commit and never undoes the committed game: a failed
//! step is logged and handed back to the caller as a [`PostCommitWarning`].
//! The bookkeeping runs on its own task, so it completes even when the caller
//! stops waiting for the response.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use super::{BoardGenerator, DifficultyResolver, GameRequest};
use crate::{
    audit::{AuditEntry, AuditLogger, ClientInfo},
    cache::GameCache,
    db::GameStore,
    error::GameError,
    models::{Game, GameListQuery, GameStatus, GameWithCells, GamesPage, LogAction, NewGame},
    rate_limit::RateLimitGate,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PostCommitStep {
    DailyCounter,
    ListInvalidation,
    CacheWarm,
}

/// A bookkeeping step that failed after the game was committed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostCommitWarning {
    pub step: PostCommitStep,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct CreatedGame {
    pub game: Game,
    pub warnings: Vec<PostCommitWarning>,
}

#[derive(Clone)]
pub struct GameService {
    store: Arc<dyn GameStore>,
    cache: GameCache,
    rate_gate: RateLimitGate,
    resolver: DifficultyResolver,
    audit: AuditLogger,
}

impl GameService {
    pub fn new(
        store: Arc<dyn GameStore>,
        cache: GameCache,
        rate_gate: RateLimitGate,
        resolver: DifficultyResolver,
        audit: AuditLogger,
    ) -> Self {
        Self {
            store,
            cache,
            rate_gate,
            resolver,
            audit,
        }
    }

    pub async fn create_game(
        &self,
        user_id: Uuid,
        request: &GameRequest,
        client: &ClientInfo,
    ) -> Result<CreatedGame, GameError> {
        self.audit.record(
            AuditEntry::new(LogAction::GameCreateAttempt)
                .with_user(user_id)
                .with_details(format!("{:?}", request))
                .with_client(client),
        );

        match self.create_committed(user_id, request).await {
            Ok(game) => {
                let warnings = self.spawn_after_commit(&game).await;
                self.audit.record(
                    AuditEntry::new(LogAction::GameCreateSuccess)
                        .with_user(user_id)
                        .with_game(game.id)
                        .with_client(client)
                        .with_details(format!(
                            "{} {}x{} density {}",
                            game.difficulty, game.rows, game.columns, game.mine_density
                        )),
                );
                Ok(CreatedGame { game, warnings })
            }
            Err(e) => {
                self.audit.record(
                    AuditEntry::new(LogAction::GameCreateFailed)
                        .with_user(user_id)
                        .with_details(e.to_string())
                        .with_client(client),
                );
                Err(e)
            }
        }
    }

    async fn create_committed(&self, user_id: Uuid, request: &GameRequest) -> Result<Game, GameError> {
        let resolved = self.resolver.resolve(request)?;
        let board = BoardGenerator::generate(resolved.rows, resolved.columns, resolved.mine_density);

        tracing::debug!(
            "Generated {}x{} board with {} mines for user {}",
            board.rows,
            board.columns,
            board.mine_count(),
            user_id
        );

        let new_game = NewGame {
            user_id,
            status: GameStatus::Pending,
            difficulty: resolved.difficulty,
            rows: resolved.rows,
            columns: resolved.columns,
            mine_density: resolved.mine_density,
        };

        let mut tx = self.store.begin().await?;

        let game = match tx.insert_game(&new_game).await {
            Ok(game) => game,
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    tracing::error!("Rollback after failed game insert also failed: {}", rollback);
                }
                return Err(e.into());
            }
        };

        if let Err(e) = tx.insert_cells(game.id, &board.cells).await {
            if let Err(rollback) = tx.rollback().await {
                tracing::error!("Rollback after failed cell insert also failed: {}", rollback);
            }
            return Err(e.into());
        }

        tx.commit().await?;

        tracing::info!(
            "Created {} game {} ({}x{}) for user {}",
            game.difficulty,
            game.id,
            game.rows,
            game.columns,
            user_id
        );
        Ok(game)
    }

    async fn spawn_after_commit(&self, game: &Game) -> Vec<PostCommitWarning> {
        let service = self.clone();
        let committed = game.clone();
        let task = tokio::spawn(async move { service.after_commit(&committed).await });

        match task.await {
            Ok(warnings) => warnings,
            Err(e) => {
                tracing::error!("Post-commit task for game {} failed: {}", game.id, e);
                vec![PostCommitWarning {
                    step: PostCommitStep::DailyCounter,
                    message: format!("post-commit task failed: {}", e),
                }]
            }
        }
    }

    async fn after_commit(&self, game: &Game) -> Vec<PostCommitWarning> {
        let mut warnings = Vec::new();
        let mut warn = |step: PostCommitStep, message: String| {
            tracing::warn!("Post-commit {:?} failed for game {}: {}", step, game.id, message);
            warnings.push(PostCommitWarning { step, message });
        };

        if let Err(e) = self.rate_gate.increment_daily(game.user_id).await {
            warn(PostCommitStep::DailyCounter, e.to_string());
        }

        if let Err(e) = self.cache.invalidate_user_games_cache(game.user_id).await {
            warn(PostCommitStep::ListInvalidation, e.to_string());
        }

        match self.store.find_game(game.id, Some(game.user_id)).await {
            Ok(Some(full)) => {
                if let Err(e) = self.cache.set_single_game(game.id, &full).await {
                    warn(PostCommitStep::CacheWarm, e.to_string());
                }
            }
            Ok(None) => warn(
                PostCommitStep::CacheWarm,
                "committed game could not be read back".to_string(),
            ),
            Err(e) => warn(PostCommitStep::CacheWarm, e.to_string()),
        }

        warnings
    }

    /// A game with its cells, visible only to its owner
    pub async fn find_one_game(&self, game_id: Uuid, owner: Uuid) -> Result<GameWithCells, GameError> {
        match self.cache.get_single_game(game_id).await {
            Ok(Some(cached)) if cached.game.user_id == owner => return Ok(cached),
            Ok(Some(_)) => return Err(GameError::NotFound(game_id)),
            Ok(None) => {}
            Err(e) => tracing::warn!("Cache read failed for game {}, using database: {}", game_id, e),
        }

        let game = self
            .store
            .find_game(game_id, Some(owner))
            .await?
            .ok_or(GameError::NotFound(game_id))?;

        if let Err(e) = self.cache.set_single_game(game_id, &game).await {
            tracing::warn!("Failed to cache game {}: {}", game_id, e);
        }
        Ok(game)
    }

    pub async fn find_all_games(
        &self,
        user_id: Uuid,
        query: &GameListQuery,
    ) -> Result<GamesPage, GameError> {
        match self.cache.get_games_list(user_id, query).await {
            Ok(Some(page)) => return Ok(page),
            Ok(None) => {}
            Err(e) => tracing::warn!("Cache read failed for user {} games, using database: {}", user_id, e),
        }

        let page = self.store.list_games(user_id, query).await?;

        if let Err(e) = self.cache.set_games_list(user_id, query, &page).await {
            tracing::warn!("Failed to cache games list for user {}: {}", user_id, e);
        }
        Ok(page)
    }
}
