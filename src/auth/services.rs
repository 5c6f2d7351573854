use axum::extract::FromRef;
use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    claims::Claims,
    dto::{AuthResponse, LoginRequest, PublicUser, RegisterRequest, TokenValidation},
    jwt::JwtKeys,
    oauth::{login_from_email, GoogleUserInfo},
    password::{hash_password, verify_password},
};
use crate::{
    cache::keys,
    error::{AppError, AppResult},
    notify::{queue::publish_registration, RegistrationMessage},
    state::AppState,
    users::repo_types::User,
};

pub const MIN_PASSWORD_LEN: usize = 8;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    static ref ENGLISH_RE: Regex = Regex::new(r"^[a-zA-Z0-9@._-]+$").unwrap();
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub(crate) fn validate_english_only(field: &str, value: &str) -> AppResult<()> {
    if !ENGLISH_RE.is_match(value) {
        return Err(AppError::validation(format!(
            "{field} should contain only English letters, numbers, and valid special characters"
        )));
    }
    Ok(())
}

/// Trims and lower-cases; rejects anything that does not look like an email.
pub(crate) fn normalize_email(raw: &str) -> AppResult<String> {
    let email = raw.trim().to_lowercase();
    validate_english_only("Email", &email)?;
    if !is_valid_email(&email) {
        return Err(AppError::validation("Invalid email"));
    }
    Ok(email)
}

pub(crate) fn validate_password(password: &str) -> AppResult<()> {
    validate_english_only("Password", password)?;
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::validation("Password too short"));
    }
    Ok(())
}

fn issue_tokens(keys: &JwtKeys, user: &User) -> AppResult<AuthResponse> {
    Ok(AuthResponse {
        access_token: keys.sign_access(user.id)?,
        refresh_token: keys.sign_refresh(user.id)?,
        token_type: "bearer",
        user: PublicUser {
            id: user.id,
            login: user.login.clone(),
            email: user.email.clone(),
        },
    })
}

pub async fn register(state: &AppState, req: RegisterRequest) -> AppResult<AuthResponse> {
    let login = req.login.trim().to_string();
    validate_english_only("Login", &login)?;
    let email = normalize_email(&req.email)?;
    validate_password(&req.password)?;

    if User::email_taken(&state.db, &email, None).await? {
        warn!(%email, "email already registered");
        return Err(AppError::conflict("User with this email already exists"));
    }
    if User::login_taken(&state.db, &login, None).await? {
        warn!(%login, "login already registered");
        return Err(AppError::conflict("User with this login already exists"));
    }

    let hash = hash_password(&req.password)?;
    let user = User::create(&state.db, &login, &email, Some(&hash)).await?;

    publish_registration(
        state.queue.as_ref(),
        &RegistrationMessage {
            email: user.email.clone(),
            login: user.login.clone(),
        },
    )
    .await;

    info!(user_id = %user.id, login = %user.login, "user registered");
    issue_tokens(&JwtKeys::from_ref(state), &user)
}

pub async fn login(state: &AppState, req: LoginRequest) -> AppResult<AuthResponse> {
    let needle = req.login.trim();
    let needle = if needle.contains('@') {
        needle.to_lowercase()
    } else {
        needle.to_string()
    };

    let invalid = || AppError::unauthorized("Invalid login credentials");
    let Some(user) = User::find_by_login_or_email(&state.db, &needle).await? else {
        warn!(login = %needle, "login for unknown user");
        return Err(invalid());
    };
    let Some(hash) = user.password_hash.as_deref() else {
        warn!(user_id = %user.id, "password login on federated account");
        return Err(invalid());
    };
    if !verify_password(&req.password, hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(invalid());
    }

    info!(user_id = %user.id, "user logged in");
    issue_tokens(&JwtKeys::from_ref(state), &user)
}

pub async fn refresh(state: &AppState, refresh_token: &str) -> AppResult<AuthResponse> {
    let keys = JwtKeys::from_ref(state);
    let claims = keys.verify_refresh(refresh_token).map_err(|e| {
        warn!(error = %e, "refresh rejected");
        AppError::unauthorized("Invalid refresh token")
    })?;
    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| AppError::unauthorized("User not found"))?;
    issue_tokens(&keys, &user)
}

/// Deny-lists the access token until it would have expired anyway.
pub async fn logout(state: &AppState, claims: &Claims) {
    let ttl = claims.remaining_secs(OffsetDateTime::now_utc().unix_timestamp());
    if ttl == 0 {
        return;
    }
    state
        .cache
        .set_with_ttl(&keys::deny(claims.jti), &true, ttl)
        .await;
    info!(user_id = %claims.sub, "user logged out");
}

pub async fn validate_token(state: &AppState, user_id: Uuid) -> AppResult<TokenValidation> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::unauthorized("Invalid or expired token"))?;
    Ok(TokenValidation {
        message: "Token is valid",
        user_id: user.id,
        login: user.login,
    })
}

pub const OAUTH_STATE_TTL_SECONDS: u64 = 600;

/// Starts a Google sign-in: remembers a fresh `state` value and returns the
/// provider URL carrying it.
pub async fn begin_google_login(state: &AppState) -> AppResult<String> {
    let csrf_state = Uuid::new_v4().simple().to_string();
    let url = state.google.authorization_url(&csrf_state)?;
    state
        .cache
        .set_with_ttl(&keys::oauth_state(&csrf_state), &true, OAUTH_STATE_TTL_SECONDS)
        .await;
    Ok(url)
}

/// Accepts a callback `state` once. Unknown, reused or expired values are
/// rejected, as is any value while the cache is unreachable.
pub async fn consume_oauth_state(state: &AppState, csrf_state: Option<&str>) -> AppResult<()> {
    let csrf_state = csrf_state
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::unauthorized("OAuth state is missing"))?;
    let key = keys::oauth_state(csrf_state);
    if state.cache.get::<bool>(&key).await.is_none() {
        warn!("unknown or expired oauth state");
        return Err(AppError::unauthorized("OAuth state is invalid or expired"));
    }
    state.cache.remove(&key).await;
    Ok(())
}

/// Email of a Google identity, usable for account matching only once the
/// provider has verified it.
pub(crate) fn verified_email(info: &GoogleUserInfo) -> AppResult<String> {
    let email = info
        .email
        .as_deref()
        .map(|e| e.trim().to_lowercase())
        .filter(|e| is_valid_email(e))
        .ok_or_else(|| AppError::Dependency("Google user info has no email".into()))?;
    if info.email_verified == Some(false) {
        warn!(sub = %info.sub, "google email not verified");
        return Err(AppError::unauthorized("Google email address is not verified"));
    }
    Ok(email)
}

/// Maps a Google identity to a local account, creating it on first sign-in.
pub async fn login_with_google(state: &AppState, info: GoogleUserInfo) -> AppResult<AuthResponse> {
    let email = verified_email(&info)?;

    let user = match User::find_by_email(&state.db, &email).await? {
        Some(user) => user,
        None => {
            let mut login = login_from_email(&email);
            if User::login_taken(&state.db, &login, None).await? {
                let suffix = Uuid::new_v4().simple().to_string();
                login = format!("{login}_{}", &suffix[..6]);
            }
            let user = User::create(&state.db, &login, &email, None).await?;
            publish_registration(
                state.queue.as_ref(),
                &RegistrationMessage {
                    email: user.email.clone(),
                    login: user.login.clone(),
                },
            )
            .await;
            info!(user_id = %user.id, %login, "user created from google sign-in");
            user
        }
    };

    issue_tokens(&JwtKeys::from_ref(state), &user)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::cache::memory::MemoryCache;
    use crate::notify::queue::testing::RecordingPublisher;

    #[test]
    fn email_validation() {
        assert!(is_valid_email("user@example.com"));
        assert!(!is_valid_email("user@example"));
        assert!(!is_valid_email("user example@x.com"));
        assert_eq!(normalize_email("  Ann@Example.com ").unwrap(), "ann@example.com");
        assert!(matches!(normalize_email("анна@пример.рф"), Err(AppError::Validation(_))));
    }

    #[test]
    fn password_rules() {
        assert!(validate_password("long-enough").is_ok());
        assert!(matches!(validate_password("short"), Err(AppError::Validation(_))));
        assert!(matches!(validate_password("pässwörd123"), Err(AppError::Validation(_))));
    }

    fn google_info(email: Option<&str>, email_verified: Option<bool>) -> GoogleUserInfo {
        GoogleUserInfo {
            sub: "1093".into(),
            email: email.map(str::to_string),
            email_verified,
        }
    }

    #[test]
    fn unverified_google_email_is_rejected() {
        let info = google_info(Some("victim@example.com"), Some(false));
        assert!(matches!(verified_email(&info), Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn verified_google_email_is_normalized() {
        let info = google_info(Some(" Jane@Gmail.com "), Some(true));
        assert_eq!(verified_email(&info).unwrap(), "jane@gmail.com");
        assert!(matches!(
            verified_email(&google_info(None, Some(true))),
            Err(AppError::Dependency(_))
        ));
    }

    #[tokio::test]
    async fn oauth_state_is_accepted_once() {
        let store = Arc::new(MemoryCache::new());
        let state = AppState::fake_with(store.clone(), Arc::new(RecordingPublisher::default()));

        let url = begin_google_login(&state).await.unwrap();
        let sent = reqwest::Url::parse(&url)
            .unwrap()
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned())
            .unwrap();
        assert_eq!(
            store.ttl_of(&keys::oauth_state(&sent)),
            Some(OAUTH_STATE_TTL_SECONDS)
        );

        consume_oauth_state(&state, Some(&sent)).await.unwrap();
        assert!(matches!(
            consume_oauth_state(&state, Some(&sent)).await,
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn forged_or_missing_oauth_state_is_rejected() {
        let state = AppState::fake();
        for value in [None, Some(""), Some("forged")] {
            assert!(matches!(
                consume_oauth_state(&state, value).await,
                Err(AppError::Unauthorized(_))
            ));
        }
    }

    #[test]
    fn login_must_be_english() {
        assert!(validate_english_only("Login", "john_doe-1.x").is_ok());
        assert!(validate_english_only("Login", "john doe").is_err());
        assert!(validate_english_only("Login", "").is_err());
    }

    fn claims_for(keys: &JwtKeys) -> Claims {
        let token = keys.sign_access(Uuid::new_v4()).unwrap();
        keys.verify(&token).unwrap()
    }

    #[tokio::test]
    async fn logout_deny_lists_until_expiry() {
        let store = Arc::new(MemoryCache::new());
        let state = AppState::fake_with(store.clone(), Arc::new(RecordingPublisher::default()));
        let claims = claims_for(&JwtKeys::from_ref(&state));

        logout(&state, &claims).await;

        let ttl = store.ttl_of(&keys::deny(claims.jti)).expect("deny entry");
        assert!(ttl > 0 && ttl <= 300);
    }

    #[tokio::test]
    async fn logout_of_expired_token_writes_nothing() {
        let store = Arc::new(MemoryCache::new());
        let state = AppState::fake_with(store.clone(), Arc::new(RecordingPublisher::default()));
        let mut claims = claims_for(&JwtKeys::from_ref(&state));
        claims.exp = claims.iat.saturating_sub(10);

        logout(&state, &claims).await;
        assert!(store.keys().is_empty());
    }

    #[tokio::test]
    async fn register_rejects_bad_input_before_touching_the_database() {
        let state = AppState::fake();
        let bad = [
            ("jo hn", "john@example.com", "password1"),
            ("john", "not-an-email", "password1"),
            ("john", "john@example.com", "short"),
        ];
        for (login, email, password) in bad {
            let err = register(
                &state,
                RegisterRequest {
                    login: login.into(),
                    email: email.into(),
                    password: password.into(),
                },
            )
            .await
            .unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "{login} {email}");
        }
    }
}
