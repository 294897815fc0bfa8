use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Persisted user record. The password hash and the current refresh token
/// never cross the HTTP boundary.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub refresh_token: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Fields required to create a user. `password_hash` is already hashed;
/// plaintext never reaches the store.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
}

/// Credential store interface. Username and email are matched on their
/// stored, lower-cased form.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up a user by username or email.
    async fn find_by_identifier(&self, identifier: &str) -> anyhow::Result<Option<UserRecord>>;

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<UserRecord>>;

    async fn create(&self, new: NewUser) -> anyhow::Result<UserRecord>;

    /// Overwrite the single refresh-token slot. `None` clears it (logout).
    async fn set_refresh_token(&self, id: Uuid, token: Option<&str>) -> anyhow::Result<()>;

    async fn set_password_hash(&self, id: Uuid, hash: &str) -> anyhow::Result<()>;
}

/// Postgres-backed credential store.
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_identifier(&self, identifier: &str) -> anyhow::Result<Option<UserRecord>> {
        let ident = identifier.trim().to_lowercase();
        let user = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT id, username, email, full_name, password_hash, refresh_token,
                   created_at, updated_at
            FROM users
            WHERE username = $1 OR email = $1
            "#,
        )
        .bind(ident)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<UserRecord>> {
        let user = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT id, username, email, full_name, password_hash, refresh_token,
                   created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create(&self, new: NewUser) -> anyhow::Result<UserRecord> {
        let user = sqlx::query_as::<_, UserRecord>(
            r#"
            INSERT INTO users (username, email, full_name, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, email, full_name, password_hash, refresh_token,
                      created_at, updated_at
            "#,
        )
        .bind(new.username.trim().to_lowercase())
        .bind(new.email.trim().to_lowercase())
        .bind(new.full_name.trim())
        .bind(&new.password_hash)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn set_refresh_token(&self, id: Uuid, token: Option<&str>) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET refresh_token = $2, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(token)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn set_password_hash(&self, id: Uuid, hash: &str) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(hash)
        .execute(&self.db)
        .await?;
        Ok(())
    }
}

/// In-memory credential store used by `AppState::fake()` and unit tests.
#[derive(Default)]
pub struct MemUserStore {
    users: Mutex<HashMap<Uuid, UserRecord>>,
}

#[async_trait]
impl UserStore for MemUserStore {
    async fn find_by_identifier(&self, identifier: &str) -> anyhow::Result<Option<UserRecord>> {
        let ident = identifier.trim().to_lowercase();
        let users = self.users.lock().unwrap();
        Ok(users
            .values()
            .find(|u| u.username == ident || u.email == ident)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<UserRecord>> {
        let users = self.users.lock().unwrap();
        Ok(users.get(&id).cloned())
    }

    async fn create(&self, new: NewUser) -> anyhow::Result<UserRecord> {
        let now = OffsetDateTime::now_utc();
        let user = UserRecord {
            id: Uuid::new_v4(),
            username: new.username.trim().to_lowercase(),
            email: new.email.trim().to_lowercase(),
            full_name: new.full_name.trim().to_string(),
            password_hash: new.password_hash,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        };
        let mut users = self.users.lock().unwrap();
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn set_refresh_token(&self, id: Uuid, token: Option<&str>) -> anyhow::Result<()> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .get_mut(&id)
            .ok_or_else(|| anyhow::anyhow!("no such user: {id}"))?;
        user.refresh_token = token.map(|t| t.to_string());
        user.updated_at = OffsetDateTime::now_utc();
        Ok(())
    }

    async fn set_password_hash(&self, id: Uuid, hash: &str) -> anyhow::Result<()> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .get_mut(&id)
            .ok_or_else(|| anyhow::anyhow!("no such user: {id}"))?;
        user.password_hash = hash.to_string();
        user.updated_at = OffsetDateTime::now_utc();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.into(),
            email: email.into(),
            full_name: "Test User".into(),
            password_hash: "$argon2id$fake".into(),
        }
    }

    #[tokio::test]
    async fn identifier_lookup_is_case_insensitive() {
        let store = MemUserStore::default();
        store
            .create(new_user("Alice", "Alice@Example.COM"))
            .await
            .expect("create");

        let by_name = store.find_by_identifier("ALICE").await.expect("lookup");
        assert!(by_name.is_some());
        let by_email = store
            .find_by_identifier(" alice@example.com ")
            .await
            .expect("lookup");
        assert!(by_email.is_some());
    }

    #[tokio::test]
    async fn refresh_token_slot_overwrites_and_clears() {
        let store = MemUserStore::default();
        let user = store.create(new_user("bob", "bob@x.com")).await.expect("create");

        store
            .set_refresh_token(user.id, Some("first"))
            .await
            .expect("set");
        store
            .set_refresh_token(user.id, Some("second"))
            .await
            .expect("overwrite");
        let loaded = store.find_by_id(user.id).await.expect("find").expect("some");
        assert_eq!(loaded.refresh_token.as_deref(), Some("second"));

        store.set_refresh_token(user.id, None).await.expect("clear");
        let loaded = store.find_by_id(user.id).await.expect("find").expect("some");
        assert!(loaded.refresh_token.is_none());
    }

    #[test]
    fn record_serialization_hides_credentials() {
        let record = UserRecord {
            id: Uuid::new_v4(),
            username: "carol".into(),
            email: "carol@x.com".into(),
            full_name: "Carol C".into(),
            password_hash: "$argon2id$secret".into(),
            refresh_token: Some("token-on-record".into()),
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("argon2id"));
        assert!(!json.contains("token-on-record"));
        assert!(json.contains("carol@x.com"));
    }
}
