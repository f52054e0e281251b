use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::{SecondsFormat, TimeZone, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::{info, warn};
use uuid::Uuid;

use tripshare_types::api::{Claims, LoginRequest, LoginResponse};

use crate::error::ApiError;
use crate::permissions::Identity;
use crate::state::{AppState, run_blocking};

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = run_blocking(&state, move |s| {
        let user = s
            .db
            .get_user_by_username(&req.username)?
            .filter(|u| u.active)
            .ok_or(ApiError::Unauthenticated)?;
        verify_password(&req.password, &user.password)?;
        Ok(user)
    })
    .await?;

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("Corrupt user id '{}': {}", user.id, e)))?;

    let (token, _) = create_token(&state.jwt_secret, user_id, &user.username, state.token_ttl)?;
    info!("User {} logged in", user.username);

    Ok(Json(LoginResponse {
        user_id,
        username: user.username,
        token,
    }))
}

/// Revoke the presented token. It stays revoked until it would have expired.
pub async fn logout(
    State(state): State<AppState>,
    identity: Identity,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let expires_at = Utc
        .timestamp_opt(claims.exp as i64, 0)
        .single()
        .unwrap_or_else(Utc::now)
        .to_rfc3339_opts(SecondsFormat::Micros, true);
    let jti = claims.jti.to_string();

    run_blocking(&state, move |s| Ok(s.db.revoke_token(&jti, &expires_at)?)).await?;
    info!("User {} logged out", identity.username);

    Ok(StatusCode::NO_CONTENT)
}

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("password hashing failed: {}", e)))?
        .to_string();
    Ok(hash)
}

pub fn verify_password(password: &str, stored_hash: &str) -> Result<(), ApiError> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| {
        warn!("Unparseable password hash: {}", e);
        ApiError::Unauthenticated
    })?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| ApiError::Unauthenticated)
}

pub fn create_token(
    secret: &str,
    user_id: Uuid,
    username: &str,
    ttl: chrono::Duration,
) -> Result<(String, Claims), ApiError> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        jti: Uuid::new_v4(),
        exp: (Utc::now() + ttl).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(e.into()))?;

    Ok((token, claims))
}

/// Check signature and expiry of a bearer token.
pub fn verify_token(secret: &str, token: &str) -> Result<Claims, ApiError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::Unauthenticated)?;
    Ok(data.claims)
}
