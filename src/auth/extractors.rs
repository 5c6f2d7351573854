use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;
use uuid::Uuid;

use super::{
    claims::{Claims, TokenKind},
    jwt::JwtKeys,
};
use crate::{cache::keys, error::AppError, state::AppState};

/// Verified access-token claims of the caller.
pub struct AccessClaims(pub Claims);

/// Id of the authenticated caller.
pub struct AuthUser(pub Uuid);

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::unauthorized("Missing Authorization header"))?;
    header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::unauthorized("Invalid Authorization header"))
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AccessClaims {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jwt = JwtKeys::from_ref(state);
        let token = bearer_token(parts)?;

        let claims = jwt.verify(token).map_err(|_| {
            warn!("invalid or expired token");
            AppError::unauthorized("Invalid or expired token")
        })?;

        if claims.kind != TokenKind::Access {
            return Err(AppError::unauthorized("Access token required"));
        }

        // A cache outage reads as a miss, so revoked tokens pass until it recovers.
        if state.cache.get::<bool>(&keys::deny(claims.jti)).await.is_some() {
            warn!(user_id = %claims.sub, "revoked token presented");
            return Err(AppError::unauthorized("Token has been revoked"));
        }

        Ok(AccessClaims(claims))
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AccessClaims(claims) = AccessClaims::from_request_parts(parts, state).await?;
        Ok(AuthUser(claims.sub))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::Request;

    use super::*;
    use crate::cache::memory::MemoryCache;
    use crate::notify::queue::testing::RecordingPublisher;

    fn parts_with(auth: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/v1/users/me");
        if let Some(v) = auth {
            builder = builder.header(AUTHORIZATION, v);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn accepts_fresh_access_token() {
        let state = AppState::fake();
        let user_id = Uuid::new_v4();
        let token = JwtKeys::from_ref(&state).sign_access(user_id).unwrap();
        let mut parts = parts_with(Some(&format!("Bearer {token}")));
        let AuthUser(id) = AuthUser::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(id, user_id);
    }

    #[tokio::test]
    async fn rejects_missing_header_and_refresh_tokens() {
        let state = AppState::fake();
        let mut parts = parts_with(None);
        assert!(matches!(
            AuthUser::from_request_parts(&mut parts, &state).await,
            Err(AppError::Unauthorized(_))
        ));

        let refresh = JwtKeys::from_ref(&state).sign_refresh(Uuid::new_v4()).unwrap();
        let mut parts = parts_with(Some(&format!("Bearer {refresh}")));
        assert!(matches!(
            AuthUser::from_request_parts(&mut parts, &state).await,
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn rejects_deny_listed_token() {
        let state = AppState::fake();
        let jwt = JwtKeys::from_ref(&state);
        let token = jwt.sign_access(Uuid::new_v4()).unwrap();
        let claims = jwt.verify(&token).unwrap();
        state.cache.set(&keys::deny(claims.jti), &true).await;

        let mut parts = parts_with(Some(&format!("Bearer {token}")));
        assert!(matches!(
            AuthUser::from_request_parts(&mut parts, &state).await,
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn cache_outage_does_not_lock_users_out() {
        let state = AppState::fake_with(
            Arc::new(MemoryCache::unavailable()),
            Arc::new(RecordingPublisher::default()),
        );
        let token = JwtKeys::from_ref(&state).sign_access(Uuid::new_v4()).unwrap();
        let mut parts = parts_with(Some(&format!("Bearer {token}")));
        assert!(AuthUser::from_request_parts(&mut parts, &state).await.is_ok());
    }
}
