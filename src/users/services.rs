use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{UserRead, UserUpdate},
    repo_types::{Picture, User, UserChanges},
};
use crate::{
    auth::{
        password::hash_password,
        services::{normalize_email, validate_english_only, validate_password},
    },
    cache::{keys, Mutation},
    dates::today,
    error::{AppError, AppResult},
    nutrition::{calculate, ProfileAttributes, Recommendation},
    pictures::{validate_upload, USER_PICTURE_TYPES},
    state::AppState,
    weights::repo_types::UserWeight,
};

fn user_not_found() -> AppError {
    AppError::not_found("User not found")
}

pub async fn get_user(state: &AppState, user_id: Uuid) -> AppResult<UserRead> {
    state
        .cache
        .get_or_load(&keys::user(user_id), || async move {
            let user = User::find_by_id(&state.db, user_id)
                .await?
                .ok_or_else(user_not_found)?;
            Ok(UserRead::from(user))
        })
        .await
}

pub async fn find_user(state: &AppState, login_or_email: &str) -> AppResult<UserRead> {
    let needle = login_or_email.trim();
    state
        .cache
        .get_or_load(&keys::user_lookup(needle), || async move {
            let user = User::find_by_login_or_email(&state.db, needle)
                .await?
                .ok_or_else(user_not_found)?;
            Ok(UserRead::from(user))
        })
        .await
}

/// Merges a partial update onto the stored row and derives
/// `recommended_calories`: recomputed when all six profile attributes are
/// present, cleared otherwise.
pub fn apply_update(current: &User, upd: UserUpdate) -> AppResult<UserChanges> {
    let login = match upd.login {
        Some(login) => {
            let login = login.trim().to_string();
            validate_english_only("Login", &login)?;
            login
        }
        None => current.login.clone(),
    };
    let email = match upd.email {
        Some(email) => normalize_email(&email)?,
        None => current.email.clone(),
    };
    let password_hash = match upd.password {
        Some(password) => {
            validate_password(&password)?;
            Some(hash_password(&password)?)
        }
        None => current.password_hash.clone(),
    };
    ProfileAttributes {
        age: upd.age,
        height: upd.height,
        weight: upd.weight,
        ..ProfileAttributes::default()
    }
    .check_ranges()?;

    let mut changes = UserChanges {
        login,
        email,
        password_hash,
        firstname: upd.firstname.or_else(|| current.firstname.clone()),
        lastname: upd.lastname.or_else(|| current.lastname.clone()),
        age: upd.age.or(current.age),
        height: upd.height.or(current.height),
        weight: upd.weight.or(current.weight),
        gender: upd.gender.or_else(|| current.gender.clone()),
        aim: upd.aim.or_else(|| current.aim.clone()),
        activity_level: upd.activity_level.or_else(|| current.activity_level.clone()),
        recommended_calories: None,
    };

    let attrs = ProfileAttributes {
        age: changes.age,
        height: changes.height,
        weight: changes.weight,
        gender: changes.gender.clone(),
        aim: changes.aim.clone(),
        activity_level: changes.activity_level.clone(),
    };
    if attrs.is_complete() {
        changes.recommended_calories = Some(calculate(&attrs)?.calories);
    }
    Ok(changes)
}

/// Applies a profile update; a supplied weight is also recorded as today's
/// weight entry in the same transaction.
pub async fn update_user(state: &AppState, user_id: Uuid, upd: UserUpdate) -> AppResult<UserRead> {
    let new_weight = upd.weight;

    let mut tx = state.db.begin().await?;
    let current = User::lock_by_id(&mut *tx, user_id)
        .await?
        .ok_or_else(user_not_found)?;
    let changes = apply_update(&current, upd)?;

    if changes.login != current.login && User::login_taken(&state.db, &changes.login, Some(user_id)).await? {
        warn!(login = %changes.login, "login already taken");
        return Err(AppError::conflict("User with this login already exists"));
    }
    if changes.email != current.email && User::email_taken(&state.db, &changes.email, Some(user_id)).await? {
        warn!(email = %changes.email, "email already taken");
        return Err(AppError::conflict("User with this email already exists"));
    }

    let updated = User::update(&mut *tx, user_id, &changes).await?;
    let date = today();
    if let Some(weight) = new_weight {
        UserWeight::upsert(&mut *tx, user_id, weight, date).await?;
    }
    tx.commit().await?;

    let mut mutations = vec![
        Mutation::ProfileChanged {
            user_id,
            login: current.login,
            email: current.email,
        },
        Mutation::ProfileChanged {
            user_id,
            login: updated.login.clone(),
            email: updated.email.clone(),
        },
    ];
    if new_weight.is_some() {
        mutations.push(Mutation::WeightSaved { user_id, date });
    }
    state.cache.invalidate_all(&mutations).await;

    info!(%user_id, "user profile updated");
    Ok(updated.into())
}

pub async fn delete_user(state: &AppState, user_id: Uuid) -> AppResult<()> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(user_not_found)?;
    if !User::delete(&state.db, user_id).await? {
        return Err(user_not_found());
    }
    state
        .cache
        .invalidate(&Mutation::UserDeleted {
            user_id,
            login: user.login,
            email: user.email,
        })
        .await;
    info!(%user_id, "user deleted");
    Ok(())
}

/// Daily targets for the stored profile, cached for a day.
pub async fn nutrients(state: &AppState, user_id: Uuid) -> AppResult<Recommendation> {
    let ttl = state.config.cache.nutrients_ttl_seconds;
    state
        .cache
        .get_or_load_with_ttl(&keys::user_nutrients(user_id), ttl, || async move {
            let user = User::find_by_id(&state.db, user_id)
                .await?
                .ok_or_else(user_not_found)?;
            calculate(&user.profile_attributes())
        })
        .await
}

pub async fn set_picture(
    state: &AppState,
    user_id: Uuid,
    content_type: Option<String>,
    data: bytes::Bytes,
) -> AppResult<()> {
    let upload = validate_upload(content_type, data, USER_PICTURE_TYPES)?;
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(user_not_found)?;
    User::set_picture(&state.db, user_id, &upload.data, &upload.content_type).await?;
    state
        .cache
        .invalidate(&Mutation::ProfileChanged {
            user_id,
            login: user.login,
            email: user.email,
        })
        .await;
    info!(%user_id, bytes = upload.data.len(), "profile picture stored");
    Ok(())
}

pub async fn picture(state: &AppState, user_id: Uuid) -> AppResult<Picture> {
    User::picture(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Profile picture not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn stored_user() -> User {
        User {
            id: Uuid::new_v4(),
            login: "max".into(),
            email: "max@example.com".into(),
            password_hash: Some("$argon2id$old".into()),
            firstname: Some("Max".into()),
            lastname: None,
            age: Some(30),
            height: Some(175),
            weight: Some(70.0),
            gender: Some("male".into()),
            aim: Some("gain".into()),
            activity_level: None,
            recommended_calories: Some(1234.0),
            has_profile_picture: false,
            registered_at: date!(2024 - 01 - 01),
        }
    }

    #[test]
    fn completing_the_profile_computes_calories() {
        let upd = UserUpdate {
            activity_level: Some("moderate".into()),
            ..UserUpdate::default()
        };
        let changes = apply_update(&stored_user(), upd).unwrap();
        assert_eq!(changes.recommended_calories, Some(3066.67));
        assert_eq!(changes.firstname.as_deref(), Some("Max"));
        assert_eq!(changes.password_hash.as_deref(), Some("$argon2id$old"));
    }

    #[test]
    fn incomplete_profile_clears_calories() {
        let changes = apply_update(&stored_user(), UserUpdate::default()).unwrap();
        assert_eq!(changes.recommended_calories, None);
    }

    #[test]
    fn unknown_gender_in_complete_profile_is_rejected() {
        let upd = UserUpdate {
            activity_level: Some("moderate".into()),
            gender: Some("robot".into()),
            ..UserUpdate::default()
        };
        assert!(matches!(
            apply_update(&stored_user(), upd),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn email_is_normalized_and_password_rehashed() {
        let upd = UserUpdate {
            email: Some("  Max@Example.COM ".into()),
            password: Some("new-password-1".into()),
            ..UserUpdate::default()
        };
        let changes = apply_update(&stored_user(), upd).unwrap();
        assert_eq!(changes.email, "max@example.com");
        let hash = changes.password_hash.unwrap();
        assert!(crate::auth::password::verify_password("new-password-1", &hash).unwrap());
    }

    #[test]
    fn rejects_out_of_range_attributes() {
        for upd in [
            UserUpdate { age: Some(0), ..UserUpdate::default() },
            UserUpdate { height: Some(1000), ..UserUpdate::default() },
            UserUpdate { weight: Some(-500.0), ..UserUpdate::default() },
            UserUpdate { login: Some("мария".into()), ..UserUpdate::default() },
        ] {
            assert!(matches!(
                apply_update(&stored_user(), upd),
                Err(AppError::Validation(_))
            ));
        }
    }

    #[tokio::test]
    async fn cached_nutrients_are_served_without_database() {
        let state = AppState::fake();
        let user_id = Uuid::new_v4();
        let rec = Recommendation {
            calories: 2000.0,
            protein: 150.0,
            fat: 66.67,
            carbohydrates: 200.0,
        };
        state.cache.set(&keys::user_nutrients(user_id), &rec).await;
        assert_eq!(nutrients(&state, user_id).await.unwrap(), rec);
    }

    #[tokio::test]
    async fn cached_user_is_served_without_database() {
        let state = AppState::fake();
        let user = UserRead::from(stored_user());
        state.cache.set(&keys::user(user.id), &user).await;
        assert_eq!(get_user(&state, user.id).await.unwrap(), user);
    }
}
