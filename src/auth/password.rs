//! Password digests: argon2id with default parameters and a fresh random salt,
//! stored in PHC string form (`$argon2id$v=19$...`).

use anyhow::{anyhow, Context};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

/// Digest `plain` for storage in `users.password_digest`.
pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|digest| digest.to_string())
        .map_err(|e| {
            error!(error = %e, "password digest failed");
            anyhow!("password digest failed: {}", e)
        })
}

/// `Ok(false)` on a mismatch. An unreadable stored digest is an error, not a
/// mismatch, so a corrupt row never looks like a wrong password.
pub fn verify_password(plain: &str, digest: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(digest).map_err(|e| {
        error!(error = %e, "stored password digest unreadable");
        anyhow!("stored password digest unreadable: {}", e)
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// [`hash_password`] on the blocking pool.
pub async fn hash_password_blocking(plain: String) -> anyhow::Result<String> {
    tokio::task::spawn_blocking(move || hash_password(&plain))
        .await
        .context("hash task failed")?
}

/// [`verify_password`] on the blocking pool.
pub async fn verify_password_blocking(plain: String, digest: String) -> anyhow::Result<bool> {
    tokio::task::spawn_blocking(move || verify_password(&plain, &digest))
        .await
        .context("verify task failed")?
}
