//! In-process `GameStore` used by unit tests, with failure injection

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::Result;
use uuid::Uuid;

use super::{GameStore, GameTransaction};
use crate::{
    game::BoardCell,
    models::{Cell, Game, GameListQuery, GameWithCells, GamesPage, NewGame},
};

#[derive(Default)]
struct Tables {
    games: Vec<Game>,
    cells: Vec<Cell>,
}

#[derive(Default)]
pub struct MemoryGameStore {
    tables: Arc<Mutex<Tables>>,
    pub fail_begin: AtomicBool,
    pub fail_cells: AtomicBool,
    pub fail_commit: AtomicBool,
    pub rollbacks: Arc<AtomicUsize>,
    pub reads: AtomicUsize,
}

impl MemoryGameStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn game_count(&self) -> usize {
        self.tables.lock().unwrap().games.len()
    }

    pub fn cell_count(&self) -> usize {
        self.tables.lock().unwrap().cells.len()
    }
}

fn injected(what: &str) -> sqlx::Error {
    sqlx::Error::Protocol(format!("injected {} failure", what))
}

#[async_trait]
impl GameStore for MemoryGameStore {
    async fn begin(&self) -> Result<Box<dyn GameTransaction>> {
        if self.fail_begin.load(Ordering::SeqCst) {
            return Err(injected("begin"));
        }
        Ok(Box::new(MemoryTransaction {
            tables: self.tables.clone(),
            fail_cells: self.fail_cells.load(Ordering::SeqCst),
            fail_commit: self.fail_commit.load(Ordering::SeqCst),
            rollbacks: self.rollbacks.clone(),
            games: Vec::new(),
            cells: Vec::new(),
        }))
    }

    async fn find_game(&self, game_id: Uuid, owner: Option<Uuid>) -> Result<Option<GameWithCells>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let tables = self.tables.lock().unwrap();
        let Some(game) = tables
            .games
            .iter()
            .find(|g| g.id == game_id && owner.is_none_or(|owner| g.user_id == owner))
            .cloned()
        else {
            return Ok(None);
        };

        let mut cells: Vec<Cell> = tables
            .cells
            .iter()
            .filter(|c| c.game_id == game_id)
            .cloned()
            .collect();
        cells.sort_by_key(|c| (c.y, c.x));

        Ok(Some(GameWithCells { game, cells }))
    }

    async fn list_games(&self, user_id: Uuid, query: &GameListQuery) -> Result<GamesPage> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let tables = self.tables.lock().unwrap();
        let mut games: Vec<Game> = tables
            .games
            .iter()
            .filter(|g| g.user_id == user_id)
            .filter(|g| query.status.is_none_or(|s| g.status == s))
            .filter(|g| query.difficulty.is_none_or(|d| g.difficulty == d))
            .cloned()
            .collect();
        games.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = games.len() as i64;
        let games = games
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.limit as usize)
            .collect();

        Ok(GamesPage {
            games,
            total,
            page: query.page,
            limit: query.limit,
        })
    }
}

struct MemoryTransaction {
    tables: Arc<Mutex<Tables>>,
    fail_cells: bool,
    fail_commit: bool,
    rollbacks: Arc<AtomicUsize>,
    games: Vec<Game>,
    cells: Vec<Cell>,
}

#[async_trait]
impl GameTransaction for MemoryTransaction {
    async fn insert_game(&mut self, game: &NewGame) -> Result<Game> {
        let now = Utc::now();
        let row = Game {
            id: Uuid::new_v4(),
            user_id: game.user_id,
            status: game.status,
            difficulty: game.difficulty,
            rows: game.rows,
            columns: game.columns,
            mine_density: game.mine_density,
            created_at: now,
            updated_at: now,
        };
        self.games.push(row.clone());
        Ok(row)
    }

    async fn insert_cells(&mut self, game_id: Uuid, cells: &[BoardCell]) -> Result<u64> {
        if self.fail_cells {
            return Err(injected("cell insert"));
        }
        self.cells.extend(cells.iter().map(|c| Cell {
            id: Uuid::new_v4(),
            game_id,
            x: c.x,
            y: c.y,
            is_mine: c.is_mine,
            neighbor_mine_count: c.neighbor_mine_count,
            status: c.status,
        }));
        Ok(cells.len() as u64)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let this = *self;
        if this.fail_commit {
            return Err(injected("commit"));
        }
        let mut tables = this.tables.lock().unwrap();
        tables.games.extend(this.games);
        tables.cells.extend(this.cells);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
