use std::collections::HashMap;

use anyhow::Context;
use axum::async_trait;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::platform::Platform;

/// User record as this service sees it.
///
/// Owned by the wider platform and read-only here; this core only verifies
/// credentials and gates against it.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub role: Platform,
    pub approved: bool,
    pub first_name: String,
    pub last_name: String,
    pub created_at: OffsetDateTime,
}

/// Read-only access to user rows.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
}

/// Raw database row. `role` is TEXT in the schema and parsed here, so a bad
/// value surfaces as a store error instead of a decode panic.
#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
    role: String,
    approved: bool,
    first_name: String,
    last_name: String,
    created_at: OffsetDateTime,
}

impl UserRow {
    fn into_user(self) -> anyhow::Result<User> {
        let role = self
            .role
            .parse::<Platform>()
            .with_context(|| format!("user {} has invalid role", self.id))?;
        Ok(User {
            id: self.id,
            email: self.email,
            password_hash: self.password_hash,
            role,
            approved: self.approved,
            first_name: self.first_name,
            last_name: self.last_name,
            created_at: self.created_at,
        })
    }
}

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
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, password_hash, role, approved, first_name, last_name, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        row.map(UserRow::into_user).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, password_hash, role, approved, first_name, last_name, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        row.map(UserRow::into_user).transpose()
    }
}

/// In-memory user store backing `AppState::fake()` and the test suites.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user. Production rows arrive through the platform's own
    /// tooling; this surface exists for tests and local fixtures.
    pub async fn insert(&self, user: User) {
        self.users.write().await.insert(user.id, user);
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }
}
