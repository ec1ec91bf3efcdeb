use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    audit::{AuditEntry, ClientInfo},
    config::DefaultUserConfig,
    db,
    error::GameError,
    logging::RequestUser,
    models::LogAction,
    AppState,
};

/// Prefix carried by every generated API key
pub const API_KEY_PREFIX: &str = "msw_";
const API_KEY_BYTES: usize = 24;

#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub username: String,
}

/// Extractor for users presenting `Authorization: Bearer <api key>`
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
    Arc<AppState>: FromRef<S>,
{
    type Rejection = GameError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let app_state = Arc::<AppState>::from_ref(state);

        let token = bearer_token(parts).map(String::from);
        let client = ClientInfo::from_parts(parts);
        let slot = parts.extensions.get::<RequestUser>().cloned();

        async move {
            let token = token.ok_or(GameError::Unauthorized("API key is required"))?;

            match db::queries::find_user_by_api_key(&app_state.db, &token).await? {
                Some(user) => {
                    if let Some(slot) = slot {
                        slot.set(user.id);
                    }
                    Ok(AuthenticatedUser {
                        user_id: user.id,
                        username: user.username,
                    })
                }
                None => {
                    app_state.audit.record(
                        AuditEntry::new(LogAction::AuthFailed)
                            .with_details("unknown API key")
                            .with_client(&client),
                    );
                    Err(GameError::Unauthorized("Invalid API key"))
                }
            }
        }
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Generate a fresh random API key
pub fn generate_api_key() -> String {
    let mut bytes = [0u8; API_KEY_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    format!("{}{}", API_KEY_PREFIX, URL_SAFE_NO_PAD.encode(bytes))
}

/// Make sure the configured default user exists. A generated key is logged
/// once, on creation; it is not recoverable afterwards.
pub async fn seed_default_user(pool: &PgPool, config: &DefaultUserConfig) -> anyhow::Result<()> {
    if db::queries::find_user_by_username(pool, &config.username)
        .await?
        .is_some()
    {
        tracing::debug!("Default user '{}' already exists", config.username);
        return Ok(());
    }

    let (api_key, generated) = match &config.api_key {
        Some(key) => (key.clone(), false),
        None => (generate_api_key(), true),
    };

    let user = db::queries::create_user(pool, &config.username, &api_key).await?;
    if generated {
        tracing::info!(
            "Created default user '{}' ({}) with API key {}",
            user.username,
            user.id,
            api_key
        );
    } else {
        tracing::info!("Created default user '{}' ({})", user.username, user.id);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(authorization: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/games");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_extraction() {
        assert_eq!(bearer_token(&parts_with(Some("Bearer msw_abc"))), Some("msw_abc"));
        assert_eq!(bearer_token(&parts_with(Some("Basic msw_abc"))), None);
        assert_eq!(bearer_token(&parts_with(Some("Bearer "))), None);
        assert_eq!(bearer_token(&parts_with(None)), None);
    }

    #[test]
    fn test_generated_keys_are_prefixed_and_unique() {
        let a = generate_api_key();
        let b = generate_api_key();

        assert!(a.starts_with(API_KEY_PREFIX));
        // 24 bytes encode to 32 unpadded base64 characters
        assert_eq!(a.len(), API_KEY_PREFIX.len() + 32);
        assert!(a[API_KEY_PREFIX.len()..]
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_ne!(a, b);
    }
}
