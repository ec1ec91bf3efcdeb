use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::audit::ClientInfo;

/// Audited actions around game creation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogAction {
    GameCreateAttempt,
    GameCreateSuccess,
    GameCreateFailed,
    RateLimitExceeded,
    AuthFailed,
}

impl LogAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogAction::GameCreateAttempt => "GAME_CREATE_ATTEMPT",
            LogAction::GameCreateSuccess => "GAME_CREATE_SUCCESS",
            LogAction::GameCreateFailed => "GAME_CREATE_FAILED",
            LogAction::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            LogAction::AuthFailed => "AUTH_FAILED",
        }
    }
}

impl fmt::Display for LogAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One HTTP request as recorded by the request logging middleware
#[derive(Debug, Clone)]
pub struct RequestLog {
    /// Set when the request authenticated successfully
    pub user_id: Option<Uuid>,
    pub method: String,
    pub endpoint: String,
    pub status_code: i32,
    pub client: ClientInfo,
    pub response_time_ms: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_action_serialization_matches_column_values() {
        for action in [
            LogAction::GameCreateAttempt,
            LogAction::GameCreateSuccess,
            LogAction::GameCreateFailed,
            LogAction::RateLimitExceeded,
            LogAction::AuthFailed,
        ] {
            let json = serde_json::to_value(action).unwrap();
            assert_eq!(json, action.as_str());
        }
    }
}
