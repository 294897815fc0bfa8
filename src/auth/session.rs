use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::password::{hash_password, verify_password};
use crate::auth::store::{NewUser, UserRecord, UserStore};
use crate::auth::tokens::{TokenError, TokenKeys};

/// Session state machine failures. Everything except `AlreadyExists` and
/// `Internal` collapses to a generic 401 at the HTTP boundary.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("refresh token missing")]
    MissingToken,
    #[error("refresh token expired")]
    TokenExpired,
    #[error("invalid refresh token")]
    InvalidToken,
    #[error("user not found")]
    UserNotFound,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("refresh token mismatch")]
    TokenMismatch,
    #[error("user already exists")]
    AlreadyExists,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<TokenError> for AuthError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Expired => AuthError::TokenExpired,
            TokenError::Invalid => AuthError::InvalidToken,
        }
    }
}

/// A freshly minted access/refresh pair. The access token is never
/// persisted; the refresh token's only persisted copy lives in the user
/// record.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

// Argon2 is CPU-bound by design; keep it off the async workers.
async fn hash_blocking(plain: String) -> anyhow::Result<String> {
    tokio::task::spawn_blocking(move || hash_password(&plain))
        .await
        .map_err(|e| anyhow::anyhow!(e))?
}

async fn verify_blocking(plain: String, hash: String) -> anyhow::Result<bool> {
    tokio::task::spawn_blocking(move || verify_password(&plain, &hash))
        .await
        .map_err(|e| anyhow::anyhow!(e))?
}

/// Mint a token pair and persist the refresh half, overwriting any prior
/// session for this user.
async fn issue_pair(
    store: &dyn UserStore,
    keys: &TokenKeys,
    user: &UserRecord,
) -> Result<TokenPair, AuthError> {
    let access_token = keys.sign_access(user)?;
    let refresh_token = keys.sign_refresh(user.id)?;
    store
        .set_refresh_token(user.id, Some(&refresh_token))
        .await?;
    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

/// Create a user account. Uniqueness is checked on both username and email.
pub async fn register(
    store: &dyn UserStore,
    username: &str,
    email: &str,
    full_name: &str,
    password: &str,
) -> Result<UserRecord, AuthError> {
    if store.find_by_identifier(username).await?.is_some()
        || store.find_by_identifier(email).await?.is_some()
    {
        warn!(username, "registration for existing user");
        return Err(AuthError::AlreadyExists);
    }

    let password_hash = hash_blocking(password.to_string()).await?;
    let user = store
        .create(NewUser {
            username: username.to_string(),
            email: email.to_string(),
            full_name: full_name.to_string(),
            password_hash,
        })
        .await?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(user)
}

/// Authenticate by username or email plus password.
///
/// Unknown users and wrong passwords are indistinguishable to the caller;
/// the difference survives only in server-side logs.
pub async fn login(
    store: &dyn UserStore,
    keys: &TokenKeys,
    identifier: &str,
    password: &str,
) -> Result<(UserRecord, TokenPair), AuthError> {
    let user = match store.find_by_identifier(identifier).await? {
        Some(u) => u,
        None => {
            warn!(identifier, "login for unknown user");
            return Err(AuthError::InvalidCredentials);
        }
    };

    if !verify_blocking(password.to_string(), user.password_hash.clone()).await? {
        warn!(user_id = %user.id, "login with invalid password");
        return Err(AuthError::InvalidCredentials);
    }

    let pair = issue_pair(store, keys, &user).await?;
    info!(user_id = %user.id, "user logged in");
    Ok((user, pair))
}

/// Exchange a refresh token for a new pair, rotating the stored token.
///
/// A validly signed token that is no longer the one on record (superseded
/// by a newer login or refresh) is rejected: the stored value is the sole
/// source of truth, signature expiry is only a secondary check.
pub async fn refresh(
    store: &dyn UserStore,
    keys: &TokenKeys,
    presented: Option<&str>,
) -> Result<TokenPair, AuthError> {
    let presented = presented.ok_or(AuthError::MissingToken)?;
    let claims = keys.verify_refresh(presented)?;

    let user = store
        .find_by_id(claims.sub)
        .await?
        .ok_or(AuthError::UserNotFound)?;

    if user.refresh_token.as_deref() != Some(presented) {
        warn!(user_id = %user.id, "refresh token mismatch");
        return Err(AuthError::TokenMismatch);
    }

    let pair = issue_pair(store, keys, &user).await?;
    info!(user_id = %user.id, "session refreshed");
    Ok(pair)
}

/// End the user's session server-side. Safe to call when already logged out.
pub async fn logout(store: &dyn UserStore, user_id: Uuid) -> Result<(), AuthError> {
    store.set_refresh_token(user_id, None).await?;
    info!(user_id = %user_id, "user logged out");
    Ok(())
}

/// Verify the old password, then re-hash and store the new one.
///
/// Does not revoke the current refresh token; the session survives a
/// password change.
pub async fn change_password(
    store: &dyn UserStore,
    user_id: Uuid,
    old_password: &str,
    new_password: &str,
) -> Result<(), AuthError> {
    let user = store
        .find_by_id(user_id)
        .await?
        .ok_or(AuthError::UserNotFound)?;

    if !verify_blocking(old_password.to_string(), user.password_hash.clone()).await? {
        warn!(user_id = %user.id, "password change with invalid old password");
        return Err(AuthError::InvalidCredentials);
    }

    let new_hash = hash_blocking(new_password.to_string()).await?;
    store.set_password_hash(user.id, &new_hash).await?;
    info!(user_id = %user.id, "password changed");
    Ok(())
}
