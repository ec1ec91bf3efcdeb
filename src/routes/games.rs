use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    audit::{AuditEntry, ClientInfo},
    auth::AuthenticatedUser,
    error::{FieldError, GameError},
    game::{GameRequest, PostCommitWarning},
    models::{Difficulty, Game, GameListQuery, GameStatus, GameWithCells, GamesPage, LogAction},
    rate_limit::Admission,
    AppState,
};

const MIN_DIMENSION: i64 = 5;
const MIN_DENSITY: f64 = 0.01;
const MAX_DENSITY: f64 = 0.8;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameBody {
    pub difficulty: Option<String>,
    pub rows: Option<i64>,
    pub columns: Option<i64>,
    #[serde(alias = "bombDensity")]
    pub mine_density: Option<f64>,
}

impl CreateGameBody {
    /// Check every field and turn the body into a resolver request.
    /// All violations are reported together.
    pub fn validate(&self, max_game_size: i32) -> Result<GameRequest, GameError> {
        let mut errors = Vec::new();
        let max = i64::from(max_game_size);

        let difficulty = match self.difficulty.as_deref() {
            Some(raw) => match raw.parse::<Difficulty>() {
                Ok(difficulty) => Some(difficulty),
                Err(_) => {
                    errors.push(FieldError::new(
                        "difficulty",
                        "difficulty must be one of EASY, NORMAL, HARD, CUSTOM",
                    ));
                    None
                }
            },
            None => None,
        };

        for (field, value) in [("rows", self.rows), ("columns", self.columns)] {
            if let Some(value) = value {
                if value < MIN_DIMENSION {
                    errors.push(FieldError::new(field, format!("Minimum {} is {}", field, MIN_DIMENSION)));
                } else if value > max {
                    errors.push(FieldError::new(field, format!("Maximum {} is {}", field, max)));
                }
            }
        }

        if let Some(density) = self.mine_density {
            if !(MIN_DENSITY..=MAX_DENSITY).contains(&density) {
                errors.push(FieldError::new(
                    "mineDensity",
                    format!("mineDensity must be between {} and {}", MIN_DENSITY, MAX_DENSITY),
                ));
            }
        }

        let custom = self.rows.is_some() || self.columns.is_some() || self.mine_density.is_some();
        if self.difficulty.is_some() && custom {
            errors.push(FieldError::new(
                "difficulty",
                "Either provide difficulty OR custom parameters (rows, columns, mineDensity)",
            ));
        }

        if !errors.is_empty() {
            return Err(GameError::Validation(errors));
        }

        // Bounds were checked above, so the narrowing casts are lossless
        Ok(match difficulty {
            Some(difficulty) => GameRequest::ByDifficulty(difficulty),
            None if custom => GameRequest::ByDimensions {
                rows: self.rows.map(|v| v as i32),
                columns: self.columns.map(|v| v as i32),
                mine_density: self.mine_density,
            },
            None => GameRequest::Default,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListGamesParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub status: Option<String>,
    pub difficulty: Option<String>,
}

impl ListGamesParams {
    pub fn validate(&self) -> Result<GameListQuery, GameError> {
        let mut errors = Vec::new();

        let page = match self.page.as_deref().map(str::parse::<u32>) {
            None => GameListQuery::DEFAULT_PAGE,
            Some(Ok(page)) if page >= 1 => page,
            Some(_) => {
                errors.push(FieldError::new("page", "page must be an integer of at least 1"));
                GameListQuery::DEFAULT_PAGE
            }
        };

        let limit = match self.limit.as_deref().map(str::parse::<u32>) {
            None => GameListQuery::DEFAULT_LIMIT,
            Some(Ok(limit)) if (1..=GameListQuery::MAX_LIMIT).contains(&limit) => limit,
            Some(_) => {
                errors.push(FieldError::new(
                    "limit",
                    format!("limit must be an integer between 1 and {}", GameListQuery::MAX_LIMIT),
                ));
                GameListQuery::DEFAULT_LIMIT
            }
        };

        let status = match self.status.as_deref().map(str::parse::<GameStatus>) {
            None => None,
            Some(Ok(status)) => Some(status),
            Some(Err(_)) => {
                errors.push(FieldError::new(
                    "status",
                    "status must be one of PENDING, CLEARED, DETONATED",
                ));
                None
            }
        };

        let difficulty = match self.difficulty.as_deref().map(str::parse::<Difficulty>) {
            None => None,
            Some(Ok(difficulty)) => Some(difficulty),
            Some(Err(_)) => {
                errors.push(FieldError::new(
                    "difficulty",
                    "difficulty must be one of EASY, NORMAL, HARD, CUSTOM",
                ));
                None
            }
        };

        if !errors.is_empty() {
            return Err(GameError::Validation(errors));
        }

        Ok(GameListQuery {
            page,
            limit,
            status,
            difficulty,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct CreateGameResponse {
    #[serde(flatten)]
    pub game: Game,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<PostCommitWarning>,
}

/// List the caller's games, newest first
pub async fn list_games(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Query(params): Query<ListGamesParams>,
) -> Result<Json<GamesPage>, GameError> {
    let query = params.validate()?;
    let page = state.games.find_all_games(user.user_id, &query).await?;
    Ok(Json(page))
}

/// Fetch one of the caller's games with its cells
pub async fn get_game(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(game_id): Path<Uuid>,
) -> Result<Json<GameWithCells>, GameError> {
    let game = state.games.find_one_game(game_id, user.user_id).await?;
    Ok(Json(game))
}

/// Create a game after the caller passes the rate limit. The gate runs before
/// the body is looked at, so malformed requests count against the window too.
pub async fn create_game(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    client: ClientInfo,
    body: Bytes,
) -> Result<(StatusCode, Json<CreateGameResponse>), GameError> {
    if let Admission::Rejected(limit) = state.rate_gate.admit(user.user_id).await? {
        tracing::info!("Rate limit hit by {}: {}", user.username, limit);
        state.audit.record(
            AuditEntry::new(LogAction::RateLimitExceeded)
                .with_user(user.user_id)
                .with_details(limit.to_string())
                .with_client(&client),
        );
        return Err(GameError::RateLimited(limit));
    }

    let body: CreateGameBody = if body.iter().all(u8::is_ascii_whitespace) {
        CreateGameBody::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| GameError::Validation(vec![FieldError::new("body", e.to_string())]))?
    };
    let request = body.validate(state.config.game.max_game_size)?;

    let created = state.games.create_game(user.user_id, &request, &client).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateGameResponse {
            game: created.game,
            warnings: created.warnings,
        }),
    ))
}
