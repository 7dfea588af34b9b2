use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginRequest, PublicUser, SessionResponse},
        session::{AuthSession, MaybeSession, SessionKeys, SessionMechanism},
        verifier::verify_credentials,
    },
    error::{AuthError, AuthResult},
    platform::Platform,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/session", get(get_session))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
}

fn requested_platform(raw: Option<&str>) -> Result<Option<Platform>, AuthError> {
    raw.map(str::parse)
        .transpose()
        .map_err(|_| AuthError::InvalidPlatform)
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AuthResult<Json<SessionResponse>> {
    let platform = requested_platform(payload.platform.as_deref())?;

    let principal =
        verify_credentials(state.users.as_ref(), &payload.email, &payload.password, platform)
            .await?;

    let keys = SessionKeys::from_ref(&state);
    let handle = keys.establish(&principal)?;

    info!(user_id = %principal.user_id, role = %principal.role, "session established");
    Ok(Json(SessionResponse {
        session_token: handle.into_inner(),
        user: PublicUser::from(&principal),
    }))
}

/// Read-back of the session presented in the Authorization header.
#[instrument(skip_all)]
pub async fn get_session(session: AuthSession) -> Json<PublicUser> {
    Json(PublicUser::from(&session.principal))
}

/// Re-hydrate the session claims from the user store and start a new
/// session life. The approval and existence gates run again, so a teacher
/// whose approval was withdrawn cannot keep refreshing an old artifact.
#[instrument(skip(state, session))]
pub async fn refresh(
    State(state): State<AppState>,
    session: AuthSession,
) -> AuthResult<Json<SessionResponse>> {
    let user = state
        .users
        .find_by_id(session.principal.user_id)
        .await?
        .ok_or_else(|| {
            warn!(user_id = %session.principal.user_id, "refresh for missing user");
            AuthError::Unauthenticated
        })?;

    if user.role == Platform::Teacher && !user.approved {
        info!(user_id = %user.id, "refresh while approval pending");
        return Err(AuthError::ApprovalPending);
    }

    let principal = crate::auth::principal::Principal::from(&user);
    let keys = SessionKeys::from_ref(&state);
    let handle = keys.establish(&principal)?;

    info!(user_id = %principal.user_id, "session refreshed");
    Ok(Json(SessionResponse {
        session_token: handle.into_inner(),
        user: PublicUser::from(&principal),
    }))
}

/// Idempotent: replies 204 whether or not a live session was presented.
#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, MaybeSession(session): MaybeSession) -> StatusCode {
    if let Some(session) = session {
        let keys = SessionKeys::from_ref(&state);
        if let Err(e) = keys.revoke(&session.handle) {
            warn!(error = %e, "revoke on logout failed");
        }
    }
    StatusCode::NO_CONTENT
}
