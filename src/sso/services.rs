use rand::rngs::OsRng;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::auth::principal::Principal;
use crate::config::PlatformUrls;
use crate::error::{AuthError, AuthResult};
use crate::platform::Platform;
use crate::sso::repo::{HandoffTokenStore, NewHandoffToken};
use crate::sso::token::{digest_raw_token, generate_raw_token, HANDOFF_TOKEN_TTL};

/// How often the background reaper sweeps expired token rows.
pub const REAP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60);

/// Outcome of a successful issuance. `token` is the raw secret; it goes to
/// the caller and into `redirect_url`, and is never logged or stored.
#[derive(Debug)]
pub struct IssuedHandoff {
    pub token: String,
    pub redirect_url: String,
    pub expires_at: OffsetDateTime,
}

/// Mint a single-use handoff token for an authenticated principal.
///
/// Preconditions run in order: the requested platform must match the
/// session role, then the platform must have a configured origin. Only then
/// is a token generated and its digest persisted.
pub async fn issue_handoff(
    tokens: &dyn HandoffTokenStore,
    platforms: &PlatformUrls,
    principal: &Principal,
    platform: Platform,
) -> AuthResult<IssuedHandoff> {
    if principal.role != platform {
        warn!(user_id = %principal.user_id, role = %principal.role, %platform, "handoff role mismatch");
        return Err(AuthError::RoleMismatch);
    }

    let origin = platforms.origin(platform).ok_or_else(|| {
        error!(%platform, "no origin configured for platform");
        AuthError::PlatformUnconfigured
    })?;

    let raw_token = generate_raw_token(&mut OsRng);
    let digest = digest_raw_token(&raw_token);
    let expires_at = OffsetDateTime::now_utc() + HANDOFF_TOKEN_TTL;

    let stored = tokens
        .insert(NewHandoffToken {
            token_digest: digest,
            user_id: principal.user_id,
            platform,
            expires_at,
        })
        .await?;

    let redirect_url = build_redirect_url(origin, &raw_token);
    info!(
        user_id = %principal.user_id,
        %platform,
        digest = %stored.token_digest,
        "handoff token issued"
    );

    Ok(IssuedHandoff {
        token: raw_token,
        redirect_url,
        expires_at: stored.expires_at,
    })
}

/// `<origin>/sso?token=<urlencoded raw token>`, with any trailing slash on
/// the origin trimmed first.
pub fn build_redirect_url(origin: &str, raw_token: &str) -> String {
    format!(
        "{}/sso?token={}",
        origin.trim_end_matches('/'),
        urlencoding::encode(raw_token)
    )
}

/// Periodically drop token rows past their expiry. Redemption already
/// rejects expired digests on its own; this just keeps the table from
/// growing without bound.
pub fn spawn_token_reaper(tokens: Arc<dyn HandoffTokenStore>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(REAP_INTERVAL);
        loop {
            ticker.tick().await;
            match tokens.delete_expired(OffsetDateTime::now_utc()).await {
                Ok(0) => {}
                Ok(removed) => info!(removed, "reaped expired handoff tokens"),
                Err(e) => warn!(error = %e, "handoff token reap failed"),
            }
        }
    })
}
