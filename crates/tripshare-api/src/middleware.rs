use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use tracing::{debug, warn};

use tripshare_types::models::Role;

use crate::auth::verify_token;
use crate::error::ApiError;
use crate::permissions::Identity;
use crate::state::{AppState, run_blocking};

/// Resolve the bearer token, if any, into an [`Identity`] request extension.
///
/// Requests without an `Authorization` header pass through anonymously;
/// handlers that need a caller extract [`Identity`] and get a 401 otherwise.
/// A header that is present but malformed, expired, revoked, or names an
/// inactive user is rejected here.
pub async fn resolve_identity(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = req
        .headers()
        .typed_try_get::<Authorization<Bearer>>()
        .map_err(|_| ApiError::Unauthenticated)?;

    if let Some(auth) = header {
        let claims = verify_token(&state.jwt_secret, auth.token())?;

        let jti = claims.jti.to_string();
        let user_id = claims.sub;
        let identity = run_blocking(&state, move |s| {
            if s.db.is_token_revoked(&jti)? {
                return Err(ApiError::Unauthenticated);
            }
            let user = s
                .db
                .get_user_by_id(&user_id.to_string())?
                .filter(|u| u.active)
                .ok_or(ApiError::Unauthenticated)?;
            let role = user.role.parse::<Role>().unwrap_or_else(|e| {
                warn!("Corrupt role on user '{}': {}", user.id, e);
                Role::User
            });
            Ok(Identity {
                user_id,
                username: user.username,
                role,
            })
        })
        .await?;

        debug!("Request authenticated as {} ({})", identity.username, identity.role);
        req.extensions_mut().insert(identity);
        req.extensions_mut().insert(claims);
    }

    Ok(next.run(req).await)
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .ok_or(ApiError::Unauthenticated)
    }
}

/// The caller's identity when one was presented, for endpoints open to
/// anonymous callers.
#[derive(Debug, Clone)]
pub struct MaybeIdentity(pub Option<Identity>);

impl<S> FromRequestParts<S> for MaybeIdentity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<Identity>().cloned()))
    }
}
