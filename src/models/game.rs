use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum GameStatus {
    Pending,
    Cleared,
    Detonated,
}

impl GameStatus {
    pub const ALL: [GameStatus; 3] = [GameStatus::Pending, GameStatus::Cleared, GameStatus::Detonated];

    pub fn as_str(&self) -> &'static str {
        match self {
            GameStatus::Pending => "PENDING",
            GameStatus::Cleared => "CLEARED",
            GameStatus::Detonated => "DETONATED",
        }
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GameStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown game status '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Difficulty {
    Easy,
    Normal,
    Hard,
    /// Dimensions that match none of the named presets. Never registered in
    /// the difficulty table.
    Custom,
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Easy,
        Difficulty::Normal,
        Difficulty::Hard,
        Difficulty::Custom,
    ];

    /// Presets that can carry a static board configuration
    pub const NAMED: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Normal, Difficulty::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "EASY",
            Difficulty::Normal => "NORMAL",
            Difficulty::Hard => "HARD",
            Difficulty::Custom => "CUSTOM",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Difficulty::ALL
            .into_iter()
            .find(|difficulty| difficulty.as_str() == s)
            .ok_or_else(|| format!("unknown difficulty '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum CellStatus {
    Hidden,
}

impl CellStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CellStatus::Hidden => "HIDDEN",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: GameStatus,
    pub difficulty: Difficulty,
    pub rows: i32,
    pub columns: i32,
    pub mine_density: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    pub id: Uuid,
    pub game_id: Uuid,
    pub x: i32,
    pub y: i32,
    pub is_mine: bool,
    pub neighbor_mine_count: i32,
    pub status: CellStatus,
}

/// A game together with its full board, cells ordered by (y, x)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameWithCells {
    #[serde(flatten)]
    pub game: Game,
    pub cells: Vec<Cell>,
}

/// Row data for a game that has not been inserted yet
#[derive(Debug, Clone, PartialEq)]
pub struct NewGame {
    pub user_id: Uuid,
    pub status: GameStatus,
    pub difficulty: Difficulty,
    pub rows: i32,
    pub columns: i32,
    pub mine_density: f64,
}

/// Filters for the paginated game list
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameListQuery {
    pub page: u32,
    pub limit: u32,
    pub status: Option<GameStatus>,
    pub difficulty: Option<Difficulty>,
}

impl GameListQuery {
    pub const DEFAULT_PAGE: u32 = 1;
    pub const DEFAULT_LIMIT: u32 = 10;
    pub const MAX_LIMIT: u32 = 100;

    pub fn offset(&self) -> i64 {
        (self.page.saturating_sub(1) as i64) * self.limit as i64
    }
}

impl Default for GameListQuery {
    fn default() -> Self {
        Self {
            page: Self::DEFAULT_PAGE,
            limit: Self::DEFAULT_LIMIT,
            status: None,
            difficulty: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GamesPage {
    pub games: Vec<Game>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
}
