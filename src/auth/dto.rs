use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::store::UserRecord;

/// Request body for user registration.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password: String,
}

/// Request body for login. Either `username` or `email` identifies the user.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: String,
}

/// Request body for token refresh, used when the cookie is absent.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

/// Request body for a password change.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

/// Sanitized user projection; the only user shape returned to clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<UserRecord> for PublicUser {
    fn from(u: UserRecord) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            full_name: u.full_name,
            created_at: u.created_at,
        }
    }
}

/// Response payload for login: user plus both tokens in the body, on top of
/// the cookies.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: PublicUser,
    pub access_token: String,
    pub refresh_token: String,
}

/// Response payload for refresh.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPairResponse {
    pub access_token: String,
    pub refresh_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_record() -> UserRecord {
        let now = OffsetDateTime::now_utc();
        UserRecord {
            id: Uuid::new_v4(),
            username: "alice".into(),
            email: "alice@x.com".into(),
            full_name: "Alice A".into(),
            password_hash: "$argon2id$secret".into(),
            refresh_token: Some("live-refresh-token".into()),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn public_user_strips_credentials() {
        let user = PublicUser::from(make_record());
        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains("\"fullName\""));
        assert!(!json.contains("password"));
        assert!(!json.contains("refreshToken"));
        assert!(!json.contains("live-refresh-token"));
    }

    #[test]
    fn login_response_uses_camel_case_token_fields() {
        let resp = LoginResponse {
            user: PublicUser::from(make_record()),
            access_token: "a".into(),
            refresh_token: "r".into(),
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["accessToken"], "a");
        assert_eq!(json["refreshToken"], "r");
        assert_eq!(json["user"]["username"], "alice");
    }
}
