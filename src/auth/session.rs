use std::fmt;
use std::time::Duration;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::principal::Principal;
use crate::config::SessionConfig;
use crate::error::AuthError;
use crate::platform::Platform;
use crate::state::AppState;

/// Opaque reference to an established session.
///
/// The holder presents it as a bearer credential; the newtype keeps the raw
/// artifact out of format strings and logs.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionHandle(String);

impl SessionHandle {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionHandle(..)")
    }
}

/// Claims embedded in the signed session artifact.
///
/// Carries the whole principal so authenticated requests skip the user
/// table. Written once at establishment and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: Uuid,
    pub role: Platform,
    pub approved: bool,
    pub first_name: String,
    pub last_name: String,
    pub iat: usize,
    pub exp: usize,
    pub iss: String,
    pub aud: String,
}

impl SessionClaims {
    fn into_principal(self) -> Principal {
        Principal {
            user_id: self.sub,
            role: self.role,
            approved: self.approved,
            first_name: self.first_name,
            last_name: self.last_name,
        }
    }
}

/// Failures at the session-mechanism seam.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Missing, malformed, expired, or tampered artifact.
    #[error("invalid or expired session")]
    Invalid,
    /// The artifact could not be produced.
    #[error("session signing failed: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

impl From<SessionError> for AuthError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Invalid => AuthError::Unauthenticated,
            SessionError::Signing(e) => AuthError::Internal(anyhow::Error::new(e)),
        }
    }
}

/// The session mechanism as the protocol sees it.
///
/// Kept behind a trait so the hand-off logic is testable without a cookie
/// or browser stack; [`SessionKeys`] is the signed-token implementation.
pub trait SessionMechanism: Send + Sync {
    /// Wrap a verified principal into a new session artifact.
    fn establish(&self, principal: &Principal) -> Result<SessionHandle, SessionError>;

    /// Resolve a handle back into the principal it was established with.
    fn read_claims(&self, handle: &SessionHandle) -> Result<Principal, SessionError>;

    /// Acknowledge sign-out. The artifact is bearer-held, so destruction is
    /// the holder's discard; the mechanism validates and records it.
    fn revoke(&self, handle: &SessionHandle) -> Result<(), SessionError>;
}

/// HS256 signing and verification keys plus the fixed claim envelope.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    ttl: Duration,
}

impl SessionKeys {
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            ttl: Duration::from_secs((config.ttl_minutes as u64) * 60),
        }
    }
}

impl FromRef<AppState> for SessionKeys {
    fn from_ref(state: &AppState) -> Self {
        SessionKeys::from_config(&state.config.session)
    }
}

impl SessionMechanism for SessionKeys {
    fn establish(&self, principal: &Principal) -> Result<SessionHandle, SessionError> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = SessionClaims {
            sub: principal.user_id,
            role: principal.role,
            approved: principal.approved,
            first_name: principal.first_name.clone(),
            last_name: principal.last_name.clone(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)
            .map_err(SessionError::Signing)?;
        debug!(user_id = %principal.user_id, role = %principal.role, "session established");
        Ok(SessionHandle(token))
    }

    fn read_claims(&self, handle: &SessionHandle) -> Result<Principal, SessionError> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<SessionClaims>(handle.as_str(), &self.decoding, &validation)
            .map_err(|_| SessionError::Invalid)?;
        Ok(data.claims.into_principal())
    }

    fn revoke(&self, handle: &SessionHandle) -> Result<(), SessionError> {
        let principal = self.read_claims(handle)?;
        info!(user_id = %principal.user_id, "session revoked by holder");
        Ok(())
    }
}

/// Authenticated session extracted from the `Authorization: Bearer` header.
pub struct AuthSession {
    pub handle: SessionHandle,
    pub principal: Principal,
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthSession
where
    S: Send + Sync,
    SessionKeys: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = SessionKeys::from_ref(state);
        let token = bearer_token(parts).ok_or(AuthError::Unauthenticated)?;
        let handle = SessionHandle::new(token);
        let principal = keys.read_claims(&handle).map_err(|_| {
            warn!("rejected invalid or expired session artifact");
            AuthError::Unauthenticated
        })?;
        Ok(AuthSession { handle, principal })
    }
}

/// Like [`AuthSession`], but absence or invalidity yields `None` instead of
/// a rejection. Used where sign-out must stay idempotent.
pub struct MaybeSession(pub Option<AuthSession>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeSession
where
    S: Send + Sync,
    SessionKeys: FromRef<S>,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeSession(
            AuthSession::from_request_parts(parts, state).await.ok(),
        ))
    }
}
