use anyhow::Context;
use axum::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::platform::Platform;

/// Persisted handoff record. Holds the digest only; the raw token lives in
/// the redirect URL and nowhere else. Rows are never updated after insert.
#[derive(Debug, Clone)]
pub struct HandoffToken {
    pub token_digest: String,
    pub user_id: Uuid,
    pub platform: Platform,
    pub expires_at: OffsetDateTime,
    pub created_at: OffsetDateTime,
}

impl HandoffToken {
    /// Expiry is inclusive: a token presented exactly at `expires_at` is
    /// already dead.
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Clone)]
pub struct NewHandoffToken {
    pub token_digest: String,
    pub user_id: Uuid,
    pub platform: Platform,
    pub expires_at: OffsetDateTime,
}

#[async_trait]
pub trait HandoffTokenStore: Send + Sync {
    /// Insert a fresh record. Fails on a digest collision rather than
    /// overwriting, so every issuance stays an independent row.
    async fn insert(&self, token: NewHandoffToken) -> anyhow::Result<HandoffToken>;
    async fn find_by_digest(&self, digest: &str) -> anyhow::Result<Option<HandoffToken>>;
    /// Reap rows whose expiry has passed. Returns how many were removed.
    async fn delete_expired(&self, now: OffsetDateTime) -> anyhow::Result<u64>;
}

#[derive(Debug, sqlx::FromRow)]
struct HandoffTokenRow {
    token_digest: String,
    user_id: Uuid,
    platform: String,
    expires_at: OffsetDateTime,
    created_at: OffsetDateTime,
}

impl HandoffTokenRow {
    fn into_token(self) -> anyhow::Result<HandoffToken> {
        let platform = self
            .platform
            .parse::<Platform>()
            .with_context(|| format!("handoff token row {}", self.token_digest))?;
        Ok(HandoffToken {
            token_digest: self.token_digest,
            user_id: self.user_id,
            platform,
            expires_at: self.expires_at,
            created_at: self.created_at,
        })
    }
}

#[derive(Clone)]
pub struct PgHandoffTokenStore {
    db: PgPool,
}

impl PgHandoffTokenStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl HandoffTokenStore for PgHandoffTokenStore {
    async fn insert(&self, token: NewHandoffToken) -> anyhow::Result<HandoffToken> {
        let row = sqlx::query_as::<_, HandoffTokenRow>(
            r#"INSERT INTO handoff_tokens (token_digest, user_id, platform, expires_at)
               VALUES ($1, $2, $3, $4)
               RETURNING token_digest, user_id, platform, expires_at, created_at"#,
        )
        .bind(&token.token_digest)
        .bind(token.user_id)
        .bind(token.platform.as_str())
        .bind(token.expires_at)
        .fetch_one(&self.db)
        .await
        .context("insert handoff token")?;
        row.into_token()
    }

    async fn find_by_digest(&self, digest: &str) -> anyhow::Result<Option<HandoffToken>> {
        let row = sqlx::query_as::<_, HandoffTokenRow>(
            r#"SELECT token_digest, user_id, platform, expires_at, created_at
               FROM handoff_tokens WHERE token_digest = $1"#,
        )
        .bind(digest)
        .fetch_optional(&self.db)
        .await
        .context("find handoff token")?;
        row.map(HandoffTokenRow::into_token).transpose()
    }

    async fn delete_expired(&self, now: OffsetDateTime) -> anyhow::Result<u64> {
        let result = sqlx::query(r#"DELETE FROM handoff_tokens WHERE expires_at <= $1"#)
            .bind(now)
            .execute(&self.db)
            .await
            .context("delete expired handoff tokens")?;
        Ok(result.rows_affected())
    }
}

/// In-memory store keyed by digest, for tests and local runs.
#[derive(Default)]
pub struct MemoryHandoffTokenStore {
    tokens: RwLock<HashMap<String, HandoffToken>>,
}

impl MemoryHandoffTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.tokens.read().await.len()
    }
}

#[async_trait]
impl HandoffTokenStore for MemoryHandoffTokenStore {
    async fn insert(&self, token: NewHandoffToken) -> anyhow::Result<HandoffToken> {
        let mut tokens = self.tokens.write().await;
        if tokens.contains_key(&token.token_digest) {
            anyhow::bail!("duplicate token digest");
        }
        let stored = HandoffToken {
            token_digest: token.token_digest.clone(),
            user_id: token.user_id,
            platform: token.platform,
            expires_at: token.expires_at,
            created_at: OffsetDateTime::now_utc(),
        };
        tokens.insert(token.token_digest, stored.clone());
        Ok(stored)
    }

    async fn find_by_digest(&self, digest: &str) -> anyhow::Result<Option<HandoffToken>> {
        Ok(self.tokens.read().await.get(digest).cloned())
    }

    async fn delete_expired(&self, now: OffsetDateTime) -> anyhow::Result<u64> {
        let mut tokens = self.tokens.write().await;
        let before = tokens.len();
        tokens.retain(|_, t| !t.is_expired(now));
        Ok((before - tokens.len()) as u64)
    }
}
