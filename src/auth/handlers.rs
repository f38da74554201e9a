use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{error, info, instrument, warn};

use crate::auth::dto::{
    AdminCreated, AdminSetupRequest, LoginRequest, PublicUser, RegisterRequest, TokenResponse,
};
use crate::auth::jwt::JwtKeys;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::repo_types::{Role, User};
use crate::error::{is_unique_violation, violated_constraint, ApiError};
use crate::state::AppState;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/setup-admin", post(setup_admin))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn validate_registration(name: &str, email: &str, password: &str) -> Result<(), ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::InvalidInput("Name is required".into()));
    }
    if !is_valid_email(email) {
        return Err(ApiError::InvalidInput("Invalid email".into()));
    }
    if password.len() < 8 {
        return Err(ApiError::InvalidInput("Password too short".into()));
    }
    Ok(())
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<PublicUser>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();
    validate_registration(&payload.name, &payload.email, &payload.password)?;

    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "registration with taken email");
        return Err(ApiError::Conflict("Email already exists.".into()));
    }

    let hash = hash_password(&payload.password)?;

    let user = User::create(&state.db, payload.name.trim(), &payload.email, &hash, Role::User)
        .await
        .map_err(|e| {
            // The unique index is the authority; the pre-check above only
            // exists for a friendlier fast path.
            if is_unique_violation(&e) {
                ApiError::Conflict("Email already exists.".into())
            } else {
                error!(error = %e, "create user failed");
                ApiError::internal(e)
            }
        })?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((StatusCode::CREATED, Json(PublicUser::from(&user))))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        return Err(ApiError::InvalidInput("Invalid email".into()));
    }

    let user = match User::find_by_email(&state.db, &payload.email).await? {
        Some(u) => u,
        None => {
            warn!(email = %payload.email, "login unknown email");
            return Err(ApiError::Unauthorized("Invalid credentials.".into()));
        }
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::Unauthorized("Invalid credentials.".into()));
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(&user)?;

    info!(user_id = %user.id, "user logged in");
    Ok(Json(TokenResponse { token }))
}

/// One-time bootstrap of the first admin account, gated by the
/// configured setup key. Refuses once any admin exists.
#[instrument(skip(state, payload))]
pub async fn setup_admin(
    State(state): State<AppState>,
    Json(mut payload): Json<AdminSetupRequest>,
) -> Result<(StatusCode, Json<AdminCreated>), ApiError> {
    let expected = state
        .config
        .admin_setup_key
        .as_deref()
        .filter(|k| !k.is_empty());
    if expected.is_none() || expected != Some(payload.setup_key.as_str()) {
        warn!("admin setup with invalid key");
        return Err(ApiError::Unauthorized("Invalid setup key.".into()));
    }

    payload.email = payload.email.trim().to_lowercase();
    validate_registration(&payload.name, &payload.email, &payload.password)?;

    if User::admin_exists(&state.db).await? {
        warn!("admin setup attempted while an admin exists");
        return Err(ApiError::Conflict("An admin user already exists.".into()));
    }

    let hash = hash_password(&payload.password)?;
    let admin = User::create(
        &state.db,
        payload.name.trim(),
        &payload.email,
        &hash,
        Role::Admin,
    )
    .await
    .map_err(|e| {
        // Two bootstrap calls can both pass the existence check; the
        // partial unique index on role turns the loser into a conflict.
        match violated_constraint(&e) {
            Some("users_single_admin_idx") => {
                warn!("admin setup lost race to a concurrent bootstrap");
                ApiError::Conflict("An admin user already exists.".into())
            }
            Some(_) => ApiError::Conflict("Email already exists.".into()),
            None => {
                error!(error = %e, "create admin failed");
                ApiError::internal(e)
            }
        }
    })?;

    info!(user_id = %admin.id, "admin account created");
    Ok((
        StatusCode::CREATED,
        Json(AdminCreated {
            id: admin.id,
            name: admin.name,
            email: admin.email,
            role: admin.role,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation_accepts_plain_addresses() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("a.b+c@sub.domain.org"));
    }

    #[test]
    fn email_validation_rejects_garbage() {
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("two@@example.com"));
        assert!(!is_valid_email("spaces in@example.com"));
    }

    #[test]
    fn registration_validation_covers_all_fields() {
        assert!(validate_registration("Ann", "ann@example.com", "longenough").is_ok());
        assert!(matches!(
            validate_registration("", "ann@example.com", "longenough"),
            Err(ApiError::InvalidInput(_))
        ));
        assert!(matches!(
            validate_registration("Ann", "not-an-email", "longenough"),
            Err(ApiError::InvalidInput(_))
        ));
        assert!(matches!(
            validate_registration("Ann", "ann@example.com", "short"),
            Err(ApiError::InvalidInput(_))
        ));
    }

    #[test]
    fn public_user_shape() {
        let user = crate::auth::repo_types::User {
            id: uuid::Uuid::new_v4(),
            name: "Ann".into(),
            email: "ann@example.com".into(),
            password_hash: "hash".into(),
            role: Role::User,
            created_at: time::OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_string(&PublicUser::from(&user)).unwrap();
        assert!(json.contains("ann@example.com"));
        assert!(!json.contains("hash"));
    }
}
