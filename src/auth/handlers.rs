use axum::{
    extract::{rejection::JsonRejection, FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, MessageResponse, RegisterRequest},
        extractors::AuthUser,
        jwt::JwtKeys,
        services,
    },
    error::AppResult,
    state::AppState,
    store::User,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let Json(payload) = payload?;
    let keys = JwtKeys::from_ref(&state);
    let res = services::register(state.store.as_ref(), &keys, payload).await?;
    Ok((StatusCode::CREATED, Json(res)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Json<AuthResponse>> {
    let Json(payload) = payload?;
    let keys = JwtKeys::from_ref(&state);
    let res = services::login(state.store.as_ref(), &keys, payload).await?;
    Ok(Json(res))
}

/// Tokens are not revoked; they stay valid until they expire.
#[instrument(skip_all)]
pub async fn logout(AuthUser(user): AuthUser) -> Json<MessageResponse> {
    info!(user_id = user.id, "user logged out");
    Json(MessageResponse {
        message: "Logged out successfully".into(),
    })
}

#[instrument(skip_all)]
pub async fn get_me(AuthUser(user): AuthUser) -> Json<User> {
    Json(user)
}

#[cfg(test)]
mod me_tests {
    use crate::store::{User, UserStatus};

    #[test]
    fn test_me_response_serialization() {
        let response = User {
            id: 1,
            email: "test@example.com".to_string(),
            first_name: "Test".into(),
            last_name: "User".into(),
            job_title: Some("Engineer".into()),
            company: None,
            status: UserStatus::Active,
            registration_date: time::OffsetDateTime::UNIX_EPOCH,
            last_login_date: None,
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("test@example.com"));
        assert!(json.contains("\"jobTitle\":\"Engineer\""));
    }
}
