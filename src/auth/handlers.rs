use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{instrument, warn};

use crate::{
    auth::{
        cookies::{
            access_cookie, clear_access_cookie, clear_refresh_cookie, refresh_cookie,
            REFRESH_COOKIE,
        },
        dto::{
            ChangePasswordRequest, LoginRequest, LoginResponse, PublicUser, RefreshRequest,
            RegisterRequest, TokenPairResponse,
        },
        extractors::AuthUser,
        session::{self, AuthError, TokenPair},
        tokens::TokenKeys,
    },
    error::ApiError,
    response::ApiResponse,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/auth/change-password", post(change_password))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(me))
}

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn token_cookies(jar: CookieJar, keys: &TokenKeys, pair: &TokenPair) -> CookieJar {
    jar.add(access_cookie(&pair.access_token, keys.access_ttl))
        .add(refresh_cookie(&pair.refresh_token, keys.refresh_ttl))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    payload.username = payload.username.trim().to_lowercase();
    payload.email = payload.email.trim().to_lowercase();
    payload.full_name = payload.full_name.trim().to_string();

    if payload.username.is_empty()
        || payload.email.is_empty()
        || payload.full_name.is_empty()
        || payload.password.is_empty()
    {
        return Err(ApiError::BadRequest("All fields are required".into()));
    }
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::BadRequest("Invalid email".into()));
    }
    if payload.password.len() < 8 {
        return Err(ApiError::BadRequest("Password too short".into()));
    }

    let user = session::register(
        state.users.as_ref(),
        &payload.username,
        &payload.email,
        &payload.full_name,
        &payload.password,
    )
    .await?;

    let body = ApiResponse::new(
        StatusCode::CREATED,
        PublicUser::from(user),
        "User registered successfully",
    );
    Ok((StatusCode::CREATED, Json(body)))
}

#[instrument(skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let identifier = payload
        .username
        .as_deref()
        .or(payload.email.as_deref())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Username or email is required".into()))?;
    if payload.password.is_empty() {
        return Err(ApiError::BadRequest("Password is required".into()));
    }

    let keys = TokenKeys::from_ref(&state);
    let (user, pair) = session::login(state.users.as_ref(), &keys, identifier, &payload.password)
        .await?;

    let jar = token_cookies(jar, &keys, &pair);
    let body = ApiResponse::new(
        StatusCode::OK,
        LoginResponse {
            user: PublicUser::from(user),
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        },
        "User logged in successfully",
    );
    Ok((StatusCode::OK, jar, Json(body)))
}

#[instrument(skip(state, jar, body))]
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Option<Json<RefreshRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    // Cookie first, request body as fallback.
    let presented = jar
        .get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .or_else(|| body.and_then(|Json(b)| b.refresh_token));

    let keys = TokenKeys::from_ref(&state);
    let pair = session::refresh(state.users.as_ref(), &keys, presented.as_deref()).await?;

    let jar = token_cookies(jar, &keys, &pair);
    let body = ApiResponse::new(
        StatusCode::OK,
        TokenPairResponse {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        },
        "Access token refreshed successfully",
    );
    Ok((StatusCode::OK, jar, Json(body)))
}

#[instrument(skip(state, jar))]
pub async fn logout(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    session::logout(state.users.as_ref(), user_id).await?;

    let jar = jar.add(clear_access_cookie()).add(clear_refresh_cookie());
    let body = ApiResponse::message_only(StatusCode::OK, "User logged out successfully");
    Ok((StatusCode::OK, jar, Json(body)))
}

#[instrument(skip(state, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.old_password.is_empty() || payload.new_password.is_empty() {
        return Err(ApiError::BadRequest("All fields are required".into()));
    }
    if payload.new_password.len() < 8 {
        return Err(ApiError::BadRequest("Password too short".into()));
    }

    match session::change_password(
        state.users.as_ref(),
        user_id,
        &payload.old_password,
        &payload.new_password,
    )
    .await
    {
        Ok(()) => {
            let body = ApiResponse::message_only(StatusCode::OK, "Password changed successfully");
            Ok((StatusCode::OK, Json(body)))
        }
        Err(AuthError::InvalidCredentials) => {
            Err(ApiError::BadRequest("Invalid old password".into()))
        }
        Err(e) => Err(e.into()),
    }
}

#[instrument(skip(state))]
pub async fn me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .users
        .find_by_id(user_id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    let body = ApiResponse::new(
        StatusCode::OK,
        PublicUser::from(user),
        "Current user fetched successfully",
    );
    Ok((StatusCode::OK, Json(body)))
}
