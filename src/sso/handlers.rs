use axum::{extract::State, routing::post, Json, Router};
use tracing::instrument;

use crate::{
    auth::session::AuthSession,
    error::{AuthError, AuthResult},
    platform::Platform,
    sso::{
        dto::{SsoTokenRequest, SsoTokenResponse},
        services::issue_handoff,
    },
    state::AppState,
};

pub fn sso_routes() -> Router<AppState> {
    Router::new().route("/auth/sso-token", post(create_sso_token))
}

/// Extractor order matters: the session check runs before the body is
/// touched, so a missing session is a 401 even when the body is also bad.
#[instrument(skip_all)]
pub async fn create_sso_token(
    State(state): State<AppState>,
    session: AuthSession,
    payload: Option<Json<SsoTokenRequest>>,
) -> AuthResult<Json<SsoTokenResponse>> {
    let platform = payload
        .and_then(|Json(body)| body.platform)
        .ok_or(AuthError::InvalidPlatform)?
        .parse::<Platform>()
        .map_err(|_| AuthError::InvalidPlatform)?;

    let issued = issue_handoff(
        state.tokens.as_ref(),
        &state.config.platforms,
        &session.principal,
        platform,
    )
    .await?;

    Ok(Json(SsoTokenResponse {
        token: issued.token,
        redirect_url: issued.redirect_url,
        expires_at: issued.expires_at,
    }))
}
