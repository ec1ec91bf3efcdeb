//! Read-through cache for single games and paginated game lists.
//!
//! Entries are never updated in place: writes that affect a user's games
//! invalidate that user's list keys, and single-game entries are overwritten
//! by the creating path or left to expire.

pub mod keys;

use std::sync::Arc;
use std::time::Duration;

use futures::future::try_join_all;
use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

use crate::{
    config::CacheConfig,
    kv::{KvError, KvStore},
    models::{GameListQuery, GameWithCells, GamesPage},
};

#[derive(Clone)]
pub struct GameCache {
    store: Arc<dyn KvStore>,
    config: CacheConfig,
}

impl GameCache {
    pub fn new(store: Arc<dyn KvStore>, config: CacheConfig) -> Self {
        Self { store, config }
    }

    pub async fn get_games_list(
        &self,
        user_id: Uuid,
        query: &GameListQuery,
    ) -> Result<Option<GamesPage>, KvError> {
        let key = keys::games_list(user_id, query.page, query.status, query.difficulty);
        self.get_json(&key).await
    }

    pub async fn set_games_list(
        &self,
        user_id: Uuid,
        query: &GameListQuery,
        page: &GamesPage,
    ) -> Result<(), KvError> {
        let key = keys::games_list(user_id, query.page, query.status, query.difficulty);
        self.set_json(&key, page, self.config.games_list_ttl()).await
    }

    pub async fn get_single_game(&self, game_id: Uuid) -> Result<Option<GameWithCells>, KvError> {
        self.get_json(&keys::single_game(game_id)).await
    }

    pub async fn set_single_game(&self, game_id: Uuid, game: &GameWithCells) -> Result<(), KvError> {
        self.set_json(&keys::single_game(game_id), game, self.config.single_game_ttl())
            .await
    }

    /// Drop every cached list page of `user_id`, returning how many deletes were issued.
    ///
    /// Stores that can enumerate keys are scanned by prefix. Otherwise the list
    /// key space is rebuilt for pages `1..=invalidation_page_bound`; pages past
    /// the bound are left to their TTL.
    pub async fn invalidate_user_games_cache(&self, user_id: Uuid) -> Result<usize, KvError> {
        let keys = match self.store.scan_prefix(&keys::games_list_prefix(user_id)).await? {
            Some(found) => found,
            None => keys::games_list_key_space(user_id, self.config.invalidation_page_bound),
        };

        try_join_all(keys.iter().map(|key| self.store.del(key))).await?;

        tracing::debug!("Invalidated {} list cache keys for user {}", keys.len(), user_id);
        Ok(keys.len())
    }

    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, KvError> {
        let Some(raw) = self.store.get(key).await? else {
            tracing::debug!("Cache miss: {}", key);
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                tracing::debug!("Cache hit: {}", key);
                Ok(Some(value))
            }
            Err(e) => {
                // Unreadable entries behave as misses and get repopulated
                tracing::warn!("Discarding unreadable cache entry {}: {}", key, e);
                self.store.del(key).await?;
                Ok(None)
            }
        }
    }

    async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> Result<(), KvError> {
        let raw = serde_json::to_string(value).map_err(|source| KvError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.store.set(key, raw, ttl).await
    }
}
