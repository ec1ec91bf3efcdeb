//! Per-user admission control for game creation.
//!
//! Two independent counters live in the key-value store: a short rolling
//! window counting admitted attempts, and a calendar-day quota counting
//! games that were actually created. The check reads both and increments the
//! window counter afterwards, so concurrent requests from one user may both
//! pass before either increment lands.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::{
    cache::keys,
    config::RateLimitConfig,
    kv::{KvError, KvStore},
};

const DAILY_COUNTER_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitExceeded {
    Daily { limit: u64 },
    Window { max_requests: u64, window_seconds: u64 },
}

impl fmt::Display for LimitExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitExceeded::Daily { limit } => {
                write!(f, "Daily game creation limit of {} exceeded", limit)
            }
            LimitExceeded::Window {
                max_requests,
                window_seconds,
            } => write!(
                f,
                "Too many games created. Maximum {} games per {} seconds",
                max_requests, window_seconds
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    Rejected(LimitExceeded),
}

impl Admission {
    #[cfg(test)]
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted)
    }
}

#[derive(Clone)]
pub struct RateLimitGate {
    store: Arc<dyn KvStore>,
    config: RateLimitConfig,
}

impl RateLimitGate {
    pub fn new(store: Arc<dyn KvStore>, config: RateLimitConfig) -> Self {
        Self { store, config }
    }

    /// Decide whether `user_id` may start another creation attempt.
    /// Admission bumps the window counter; rejections change nothing.
    pub async fn admit(&self, user_id: Uuid) -> Result<Admission, KvError> {
        let (daily, window) =
            futures::try_join!(self.daily_count(user_id), self.window_count(user_id))?;

        if daily >= self.config.daily_game_limit {
            return Ok(Admission::Rejected(LimitExceeded::Daily {
                limit: self.config.daily_game_limit,
            }));
        }

        if window >= self.config.max_requests {
            return Ok(Admission::Rejected(LimitExceeded::Window {
                max_requests: self.config.max_requests,
                window_seconds: self.config.window_seconds,
            }));
        }

        self.increment(&keys::short_term_games(user_id), self.config.window())
            .await?;
        Ok(Admission::Admitted)
    }

    pub async fn daily_count(&self, user_id: Uuid) -> Result<u64, KvError> {
        self.read_counter(&keys::daily_games(user_id, today())).await
    }

    pub async fn window_count(&self, user_id: Uuid) -> Result<u64, KvError> {
        self.read_counter(&keys::short_term_games(user_id)).await
    }

    /// Count one successfully created game against today's quota
    pub async fn increment_daily(&self, user_id: Uuid) -> Result<u64, KvError> {
        self.increment(&keys::daily_games(user_id, today()), DAILY_COUNTER_TTL)
            .await
    }

    async fn read_counter(&self, key: &str) -> Result<u64, KvError> {
        match self.store.get(key).await? {
            Some(raw) => raw.parse().map_err(|_| KvError::Corrupt {
                key: key.to_string(),
                message: format!("expected a counter, found '{}'", raw),
            }),
            None => Ok(0),
        }
    }

    // Read-then-write; every write restarts the key's expiry
    async fn increment(&self, key: &str, ttl: Duration) -> Result<u64, KvError> {
        let next = self.read_counter(key).await? + 1;
        self.store.set(key, next.to_string(), ttl).await?;
        Ok(next)
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::{testing::FlakyStore, MemoryStore};

    fn gate() -> RateLimitGate {
        RateLimitGate::new(Arc::new(MemoryStore::new()), RateLimitConfig::default())
    }

    #[tokio::test]
    async fn test_fourth_attempt_in_window_is_rejected() {
        tokio::time::pause();
        let gate = gate();
        let user = Uuid::new_v4();

        for _ in 0..3 {
            assert_eq!(gate.admit(user).await.unwrap(), Admission::Admitted);
        }

        assert_eq!(
            gate.admit(user).await.unwrap(),
            Admission::Rejected(LimitExceeded::Window {
                max_requests: 3,
                window_seconds: 10,
            })
        );
    }

    #[tokio::test]
    async fn test_rejection_does_not_increment() {
        tokio::time::pause();
        let gate = gate();
        let user = Uuid::new_v4();
        for _ in 0..3 {
            gate.admit(user).await.unwrap();
        }

        for _ in 0..5 {
            assert!(!gate.admit(user).await.unwrap().is_admitted());
        }
        assert_eq!(gate.window_count(user).await.unwrap(), 3);
        assert_eq!(gate.daily_count(user).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_window_reopens_after_expiry() {
        tokio::time::pause();
        let gate = gate();
        let user = Uuid::new_v4();
        for _ in 0..3 {
            gate.admit(user).await.unwrap();
        }
        assert!(!gate.admit(user).await.unwrap().is_admitted());

        tokio::time::advance(Duration::from_secs(11)).await;

        assert!(gate.admit(user).await.unwrap().is_admitted());
    }

    #[tokio::test]
    async fn test_users_are_limited_independently() {
        tokio::time::pause();
        let gate = gate();
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
        for _ in 0..3 {
            gate.admit(alice).await.unwrap();
        }

        assert!(!gate.admit(alice).await.unwrap().is_admitted());
        assert!(gate.admit(bob).await.unwrap().is_admitted());
    }

    #[tokio::test]
    async fn test_admission_alone_does_not_consume_daily_quota() {
        tokio::time::pause();
        let gate = gate();
        let user = Uuid::new_v4();

        gate.admit(user).await.unwrap();

        assert_eq!(gate.daily_count(user).await.unwrap(), 0);
        assert_eq!(gate.window_count(user).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_fifty_first_game_of_the_day_is_rejected() {
        tokio::time::pause();
        let gate = gate();
        let user = Uuid::new_v4();

        for _ in 0..50 {
            assert!(gate.admit(user).await.unwrap().is_admitted());
            gate.increment_daily(user).await.unwrap();
            // Let the short window lapse so only the daily quota is in play
            tokio::time::advance(Duration::from_secs(11)).await;
        }

        assert_eq!(gate.window_count(user).await.unwrap(), 0);
        assert_eq!(
            gate.admit(user).await.unwrap(),
            Admission::Rejected(LimitExceeded::Daily { limit: 50 })
        );
    }

    #[tokio::test]
    async fn test_daily_limit_checked_before_window() {
        let gate = RateLimitGate::new(
            Arc::new(MemoryStore::new()),
            RateLimitConfig {
                daily_game_limit: 1,
                window_seconds: 10,
                max_requests: 1,
            },
        );
        let user = Uuid::new_v4();
        gate.admit(user).await.unwrap();
        gate.increment_daily(user).await.unwrap();

        assert_eq!(
            gate.admit(user).await.unwrap(),
            Admission::Rejected(LimitExceeded::Daily { limit: 1 })
        );
    }

    #[tokio::test]
    async fn test_store_failure_is_reported() {
        let store = Arc::new(FlakyStore::default());
        store.set_down(true);
        let gate = RateLimitGate::new(store, RateLimitConfig::default());

        tokio_test::assert_err!(gate.admit(Uuid::new_v4()).await);
    }

    #[tokio::test]
    async fn test_corrupt_counter_is_an_error() {
        let store = Arc::new(MemoryStore::new());
        let user = Uuid::new_v4();
        store
            .set(&keys::short_term_games(user), "many".to_string(), Duration::from_secs(10))
            .await
            .unwrap();
        let gate = RateLimitGate::new(store, RateLimitConfig::default());

        assert!(matches!(
            gate.admit(user).await,
            Err(KvError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_limit_messages() {
        assert_eq!(
            LimitExceeded::Window {
                max_requests: 3,
                window_seconds: 10
            }
            .to_string(),
            "Too many games created. Maximum 3 games per 10 seconds"
        );
        assert!(LimitExceeded::Daily { limit: 50 }.to_string().contains("50"));
    }
}
