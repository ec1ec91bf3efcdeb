use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, Result, Transaction};
use uuid::Uuid;

use crate::{
    game::BoardCell,
    models::{Game, GameListQuery, GameWithCells, GamesPage, NewGame},
};

#[cfg(test)]
pub mod memory;
pub mod queries;

pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Durable storage for games and their cells
#[async_trait]
pub trait GameStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn GameTransaction>>;

    async fn find_game(&self, game_id: Uuid, owner: Option<Uuid>) -> Result<Option<GameWithCells>>;

    async fn list_games(&self, user_id: Uuid, query: &GameListQuery) -> Result<GamesPage>;
}

/// Writes staged here are invisible to readers until `commit`
#[async_trait]
pub trait GameTransaction: Send {
    async fn insert_game(&mut self, game: &NewGame) -> Result<Game>;

    async fn insert_cells(&mut self, game_id: Uuid, cells: &[BoardCell]) -> Result<u64>;

    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}

#[derive(Clone)]
pub struct PgGameStore {
    pool: PgPool,
}

impl PgGameStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GameStore for PgGameStore {
    async fn begin(&self) -> Result<Box<dyn GameTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgGameTransaction { tx }))
    }

    async fn find_game(&self, game_id: Uuid, owner: Option<Uuid>) -> Result<Option<GameWithCells>> {
        queries::get_game_with_cells(&self.pool, game_id, owner).await
    }

    async fn list_games(&self, user_id: Uuid, query: &GameListQuery) -> Result<GamesPage> {
        queries::list_games(&self.pool, user_id, query).await
    }
}

pub struct PgGameTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl GameTransaction for PgGameTransaction {
    async fn insert_game(&mut self, game: &NewGame) -> Result<Game> {
        queries::insert_game(&mut *self.tx, game).await
    }

    async fn insert_cells(&mut self, game_id: Uuid, cells: &[BoardCell]) -> Result<u64> {
        queries::insert_cells(&mut *self.tx, game_id, cells).await
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await
    }
}
