use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;

use super::jwt::{format_timestamp, JwtKeys, TokenError};
use crate::{
    error::AppError,
    state::AppState,
    store::{User, UserStatus, UserStore},
};

/// The authenticated user, loaded fresh from the store on every request.
pub struct AuthUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let keys = JwtKeys::from_ref(&state);
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        let user = authenticate(state.store.as_ref(), &keys, header).await?;
        Ok(AuthUser(user))
    }
}

/// Read-only gate: bearer scheme, token validity, then live account state.
pub async fn authenticate(
    store: &dyn UserStore,
    keys: &JwtKeys,
    authorization: Option<&str>,
) -> Result<User, AppError> {
    let header = match authorization {
        Some(h) if h.starts_with("Bearer") => h,
        _ => {
            return Err(AppError::Unauthenticated(
                "No bearer token provided".into(),
            ))
        }
    };
    let token = header.split_once(' ').map(|(_, t)| t).unwrap_or_default();

    let claims = keys.verify(token).map_err(|e| {
        warn!(error = %e, "token rejected");
        match e {
            TokenError::Malformed => AppError::Unauthenticated("Invalid token".into()),
            TokenError::Expired { expired_at } => AppError::Unauthenticated(format!(
                "Token expired at {}",
                format_timestamp(&expired_at)
            )),
            TokenError::Verification(_) => {
                AppError::Unauthenticated("Token verification failed".into())
            }
        }
    })?;

    let user = store
        .find_by_id(claims.user_id)
        .await?
        .ok_or_else(|| {
            warn!(user_id = claims.user_id, "token for unknown user");
            AppError::Unauthenticated("User not found".into())
        })?;

    if user.status == UserStatus::Blocked {
        warn!(user_id = user.id, "blocked user presented a valid token");
        return Err(AppError::Forbidden("Account blocked".into()));
    }

    Ok(user)
}
