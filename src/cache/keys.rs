//! Key templates for cached games and rate-limit counters

use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::{Difficulty, GameStatus};

pub const GAMES_LIST: &str = "games:user:{userId}:page:{page}:status:{status}:difficulty:{difficulty}";
pub const SINGLE_GAME: &str = "game:{gameId}";
pub const DAILY_GAMES: &str = "daily_games:{userId}:{date}";
pub const SHORT_TERM_GAMES: &str = "short_term_games:{userId}";

/// Placeholder used in list keys when a filter is absent
pub const UNFILTERED: &str = "all";

pub fn games_list(
    user_id: Uuid,
    page: u32,
    status: Option<GameStatus>,
    difficulty: Option<Difficulty>,
) -> String {
    GAMES_LIST
        .replace("{userId}", &user_id.to_string())
        .replace("{page}", &page.to_string())
        .replace("{status}", status.map_or(UNFILTERED, |s| s.as_str()))
        .replace("{difficulty}", difficulty.map_or(UNFILTERED, |d| d.as_str()))
}

/// Prefix shared by every list key of one user
pub fn games_list_prefix(user_id: Uuid) -> String {
    format!("games:user:{}:", user_id)
}

pub fn single_game(game_id: Uuid) -> String {
    SINGLE_GAME.replace("{gameId}", &game_id.to_string())
}

pub fn daily_games(user_id: Uuid, date: NaiveDate) -> String {
    DAILY_GAMES
        .replace("{userId}", &user_id.to_string())
        .replace("{date}", &date.format("%Y-%m-%d").to_string())
}

pub fn short_term_games(user_id: Uuid) -> String {
    SHORT_TERM_GAMES.replace("{userId}", &user_id.to_string())
}

/// Every list key a user can have on pages `1..=page_bound`:
/// (unfiltered + each status) x (unfiltered + each difficulty) x pages
pub fn games_list_key_space(user_id: Uuid, page_bound: u32) -> Vec<String> {
    let statuses: Vec<Option<GameStatus>> = std::iter::once(None)
        .chain(GameStatus::ALL.into_iter().map(Some))
        .collect();
    let difficulties: Vec<Option<Difficulty>> = std::iter::once(None)
        .chain(Difficulty::ALL.into_iter().map(Some))
        .collect();

    let mut keys = Vec::with_capacity(statuses.len() * difficulties.len() * page_bound as usize);
    for status in &statuses {
        for difficulty in &difficulties {
            for page in 1..=page_bound {
                keys.push(games_list(user_id, page, *status, *difficulty));
            }
        }
    }
    keys
}
