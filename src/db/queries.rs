use sqlx::{PgConnection, PgPool, Result};
use uuid::Uuid;

use crate::{
    audit::AuditEntry,
    game::BoardCell,
    models::{Cell, Game, GameListQuery, GameWithCells, GamesPage, NewGame, RequestLog, User},
};

// User queries
pub async fn find_user_by_api_key(pool: &PgPool, api_key: &str) -> Result<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE api_key = $1")
        .bind(api_key)
        .fetch_optional(pool)
        .await
}

pub async fn find_user_by_username(pool: &PgPool, username: &str) -> Result<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await
}

pub async fn create_user(pool: &PgPool, username: &str, api_key: &str) -> Result<User> {
    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, username, api_key)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(username)
    .bind(api_key)
    .fetch_one(pool)
    .await
}

// Game queries

/// Insert the game row. Runs inside the creation transaction.
pub async fn insert_game(conn: &mut PgConnection, game: &NewGame) -> Result<Game> {
    sqlx::query_as::<_, Game>(
        r#"
        INSERT INTO games (id, user_id, status, difficulty, rows, columns, mine_density)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(game.user_id)
    .bind(game.status)
    .bind(game.difficulty)
    .bind(game.rows)
    .bind(game.columns)
    .bind(game.mine_density)
    .fetch_one(conn)
    .await
}

/// Insert the whole board in one statement. Runs inside the creation transaction.
pub async fn insert_cells(
    conn: &mut PgConnection,
    game_id: Uuid,
    cells: &[BoardCell],
) -> Result<u64> {
    let ids: Vec<Uuid> = cells.iter().map(|_| Uuid::new_v4()).collect();
    let xs: Vec<i32> = cells.iter().map(|c| c.x).collect();
    let ys: Vec<i32> = cells.iter().map(|c| c.y).collect();
    let mines: Vec<bool> = cells.iter().map(|c| c.is_mine).collect();
    let counts: Vec<i32> = cells.iter().map(|c| c.neighbor_mine_count).collect();
    let statuses: Vec<String> = cells.iter().map(|c| c.status.as_str().to_string()).collect();

    let result = sqlx::query(
        r#"
        INSERT INTO game_cells (id, game_id, x, y, is_mine, neighbor_mine_count, status)
        SELECT id, $1, x, y, is_mine, neighbor_mine_count, status
        FROM UNNEST($2::uuid[], $3::int4[], $4::int4[], $5::bool[], $6::int4[], $7::text[])
            AS board(id, x, y, is_mine, neighbor_mine_count, status)
        "#,
    )
    .bind(game_id)
    .bind(&ids)
    .bind(&xs)
    .bind(&ys)
    .bind(&mines)
    .bind(&counts)
    .bind(&statuses)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

/// Fetch a game with its cells ordered by (y, x), optionally restricted to an owner
pub async fn get_game_with_cells(
    pool: &PgPool,
    game_id: Uuid,
    owner: Option<Uuid>,
) -> Result<Option<GameWithCells>> {
    let game = sqlx::query_as::<_, Game>(
        "SELECT * FROM games WHERE id = $1 AND ($2::uuid IS NULL OR user_id = $2)",
    )
    .bind(game_id)
    .bind(owner)
    .fetch_optional(pool)
    .await?;

    let Some(game) = game else {
        return Ok(None);
    };

    let cells = sqlx::query_as::<_, Cell>(
        "SELECT * FROM game_cells WHERE game_id = $1 ORDER BY y ASC, x ASC",
    )
    .bind(game_id)
    .fetch_all(pool)
    .await?;

    Ok(Some(GameWithCells { game, cells }))
}

/// One page of a user's games, newest first
pub async fn list_games(pool: &PgPool, user_id: Uuid, query: &GameListQuery) -> Result<GamesPage> {
    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM games
        WHERE user_id = $1
          AND ($2::varchar IS NULL OR status = $2)
          AND ($3::varchar IS NULL OR difficulty = $3)
        "#,
    )
    .bind(user_id)
    .bind(query.status)
    .bind(query.difficulty)
    .fetch_one(pool)
    .await?;

    let games = sqlx::query_as::<_, Game>(
        r#"
        SELECT * FROM games
        WHERE user_id = $1
          AND ($2::varchar IS NULL OR status = $2)
          AND ($3::varchar IS NULL OR difficulty = $3)
        ORDER BY created_at DESC
        LIMIT $4 OFFSET $5
        "#,
    )
    .bind(user_id)
    .bind(query.status)
    .bind(query.difficulty)
    .bind(query.limit as i64)
    .bind(query.offset())
    .fetch_all(pool)
    .await?;

    Ok(GamesPage {
        games,
        total,
        page: query.page,
        limit: query.limit,
    })
}

// Log queries
pub async fn insert_game_log(pool: &PgPool, entry: &AuditEntry) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO game_logs (id, user_id, action, game_id, details, ip_address, user_agent)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(entry.user_id)
    .bind(entry.action)
    .bind(entry.game_id)
    .bind(entry.details.as_deref())
    .bind(entry.client.ip_address.as_deref())
    .bind(entry.client.user_agent.as_deref())
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn insert_request_log(pool: &PgPool, log: &RequestLog) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO request_logs (
            id, user_id, method, endpoint, status_code, ip_address, user_agent, response_time
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(log.user_id)
    .bind(&log.method)
    .bind(&log.endpoint)
    .bind(log.status_code)
    .bind(log.client.ip_address.as_deref())
    .bind(log.client.user_agent.as_deref())
    .bind(log.response_time_ms)
    .execute(pool)
    .await?;

    Ok(())
}
