use anyhow::anyhow;
use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{info, instrument, warn};

use super::{
    dto::{AuthResponse, LoginRequest, RegisterRequest, Registration},
    jwt::JwtKeys,
    password::{hash_password_blocking, verify_password_blocking},
};
use crate::{
    error::{AppError, AppResult},
    store::{abort, NewUser, User, UserStatus, UserStore, UserTx},
};

/// Same text for unknown email and wrong password.
pub const INVALID_CREDENTIALS: &str = "Invalid email or password";
pub const EMAIL_TAKEN: &str = "Email already registered";
pub const ACCOUNT_BLOCKED: &str = "Account blocked";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

#[instrument(skip(store, keys, payload))]
pub async fn register(
    store: &dyn UserStore,
    keys: &JwtKeys,
    payload: RegisterRequest,
) -> AppResult<AuthResponse> {
    let input = payload.validate()?;

    let mut tx = store.begin().await?;
    let created = create_account(tx.as_mut(), input).await;
    let user = match created {
        Ok(user) => user,
        Err(e) => return Err(abort(tx, e).await),
    };
    tx.commit().await?;

    let token = keys.sign(user.id, &user.email)?;
    info!(user_id = user.id, email = %user.email, "user registered");
    Ok(AuthResponse {
        message: "User registered successfully".into(),
        token,
        user,
    })
}

async fn create_account(tx: &mut dyn UserTx, input: Registration) -> AppResult<User> {
    if tx.email_exists(&input.email).await? {
        warn!(email = %input.email, "email already registered");
        return Err(AppError::Conflict(EMAIL_TAKEN.into()));
    }

    let password_digest = hash_password_blocking(input.password).await?;
    let id = tx
        .insert(&NewUser {
            email: input.email,
            password_digest,
            first_name: input.first_name,
            last_name: input.last_name,
            job_title: input.job_title,
            company: input.company,
        })
        .await?;
    tx.update_last_login(id, OffsetDateTime::now_utc()).await?;

    tx.find_by_id(id)
        .await?
        .ok_or_else(|| AppError::Internal(anyhow!("inserted user {} not readable", id)))
}

#[instrument(skip(store, keys, payload))]
pub async fn login(
    store: &dyn UserStore,
    keys: &JwtKeys,
    payload: LoginRequest,
) -> AppResult<AuthResponse> {
    let (email, password) = payload.validate()?;

    let mut tx = store.begin().await?;
    let checked = check_credentials(tx.as_mut(), &email, password).await;
    let user = match checked {
        Ok(user) => user,
        Err(e) => return Err(abort(tx, e).await),
    };
    tx.commit().await?;

    let token = keys.sign(user.id, &user.email)?;
    info!(user_id = user.id, email = %user.email, "user logged in");
    Ok(AuthResponse {
        message: "Login successful".into(),
        token,
        user,
    })
}

async fn check_credentials(tx: &mut dyn UserTx, email: &str, password: String) -> AppResult<User> {
    let Some(row) = tx.find_by_email(email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(AppError::Unauthenticated(INVALID_CREDENTIALS.into()));
    };

    if !verify_password_blocking(password, row.password_digest).await? {
        warn!(user_id = row.user.id, "login invalid password");
        return Err(AppError::Unauthenticated(INVALID_CREDENTIALS.into()));
    }

    let mut user = row.user;
    if user.status == UserStatus::Blocked {
        warn!(user_id = user.id, "login on blocked account");
        return Err(AppError::Forbidden(ACCOUNT_BLOCKED.into()));
    }

    let now = OffsetDateTime::now_utc();
    tx.update_last_login(user.id, now).await?;
    user.last_login_date = Some(now);
    Ok(user)
}
