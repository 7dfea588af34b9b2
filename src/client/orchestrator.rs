use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::client::api::{ApiError, AuthApi};
use crate::platform::Platform;

/// Delay before the one permitted retry of a 401 during the hand-off.
pub const RETRY_DELAY: Duration = Duration::from_millis(200);

/// User-facing failure taxonomy for the login and hand-off flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    InvalidCredentials,
    PlatformMismatch,
    ApprovalPending,
    /// The session never became readable, even after the single retry.
    SessionNotReady,
    /// Server-side fault (misconfiguration or internal error). The client
    /// only ever shows the generic message.
    PlatformUnavailable,
    /// A success response without a usable redirect target.
    MalformedResponse,
    Unexpected,
}

impl FlowError {
    pub fn user_message(&self) -> &'static str {
        match self {
            FlowError::InvalidCredentials => "Invalid email or password",
            FlowError::PlatformMismatch => "This account belongs to a different platform",
            FlowError::ApprovalPending => "Your account is awaiting approval",
            FlowError::SessionNotReady => "Unable to start session, please retry",
            FlowError::PlatformUnavailable => "Something went wrong. Please try again later",
            FlowError::MalformedResponse | FlowError::Unexpected => {
                "An unexpected error occurred"
            }
        }
    }
}

fn map_api_error(err: &ApiError) -> FlowError {
    match err {
        ApiError::Transport(_) => FlowError::Unexpected,
        ApiError::Rejected(rejection) => match rejection.code.as_deref() {
            Some("INVALID_CREDENTIALS") => FlowError::InvalidCredentials,
            Some("PLATFORM_MISMATCH") | Some("ROLE_MISMATCH") => FlowError::PlatformMismatch,
            Some("APPROVAL_PENDING") => FlowError::ApprovalPending,
            Some("UNAUTHENTICATED") => FlowError::SessionNotReady,
            Some("PLATFORM_UNCONFIGURED") | Some("INTERNAL_ERROR") => {
                FlowError::PlatformUnavailable
            }
            _ => FlowError::Unexpected,
        },
    }
}

/// Flow states for one login attempt. `Redirecting` is terminal; the two
/// failed states hold the surfaced error and accept a fresh submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    Authenticating,
    SessionPending,
    TokenRequesting,
    Redirecting,
    AuthFailed(FlowError),
    TokenFailed(FlowError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowEvent {
    SubmitAccepted,
    AuthSucceeded,
    AuthFailed(FlowError),
    SessionConfirmed,
    SessionUnavailable(FlowError),
    HandoffIssued,
    HandoffFailed(FlowError),
}

/// Pure transition function. Pairs outside the table leave the state
/// unchanged, so a stray event can never conjure an unreachable state.
pub fn advance(state: &FlowState, event: FlowEvent) -> FlowState {
    match (state, event) {
        (FlowState::Idle | FlowState::AuthFailed(_) | FlowState::TokenFailed(_), FlowEvent::SubmitAccepted) => {
            FlowState::Authenticating
        }
        (FlowState::Authenticating, FlowEvent::AuthSucceeded) => FlowState::SessionPending,
        (FlowState::Authenticating, FlowEvent::AuthFailed(e)) => FlowState::AuthFailed(e),
        (FlowState::SessionPending, FlowEvent::SessionConfirmed) => FlowState::TokenRequesting,
        (FlowState::SessionPending, FlowEvent::SessionUnavailable(e)) => FlowState::TokenFailed(e),
        (FlowState::TokenRequesting, FlowEvent::HandoffIssued) => FlowState::Redirecting,
        (FlowState::TokenRequesting, FlowEvent::HandoffFailed(e)) => FlowState::TokenFailed(e),
        (other, _) => other.clone(),
    }
}

/// One retry per login attempt, shared between the session read-back and
/// the handoff request.
#[derive(Debug, Default)]
struct RetryBudget {
    spent: bool,
}

impl RetryBudget {
    fn try_consume(&mut self) -> bool {
        if self.spent {
            false
        } else {
            self.spent = true;
            true
        }
    }
}

/// Browser-side navigation seam; release builds point this at the real
/// location change, tests record the target.
pub trait Navigator: Send + Sync {
    fn navigate(&self, url: &str);
}

/// Drives one login attempt end to end: authenticate, confirm the session
/// is readable, request a handoff token, redirect. Submits are serialized
/// through `can_submit`; a submit while a flow is in flight is ignored.
pub struct LoginFlow {
    api: Arc<dyn AuthApi>,
    navigator: Arc<dyn Navigator>,
    state: FlowState,
}

impl LoginFlow {
    pub fn new(api: Arc<dyn AuthApi>, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            api,
            navigator,
            state: FlowState::Idle,
        }
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    pub fn can_submit(&self) -> bool {
        matches!(
            self.state,
            FlowState::Idle | FlowState::AuthFailed(_) | FlowState::TokenFailed(_)
        )
    }

    /// The error surfaced by the last attempt, if it failed.
    pub fn last_error(&self) -> Option<&FlowError> {
        match &self.state {
            FlowState::AuthFailed(e) | FlowState::TokenFailed(e) => Some(e),
            _ => None,
        }
    }

    pub async fn submit(&mut self, email: &str, password: &str, platform: Platform) -> &FlowState {
        if !self.can_submit() {
            return &self.state;
        }
        self.state = advance(&self.state, FlowEvent::SubmitAccepted);

        let outcome = match self.api.login(email, password, platform).await {
            Ok(outcome) => outcome,
            Err(e) => {
                let cause = map_api_error(&e);
                warn!(?cause, "login rejected");
                self.state = advance(&self.state, FlowEvent::AuthFailed(cause));
                return &self.state;
            }
        };
        self.state = advance(&self.state, FlowEvent::AuthSucceeded);

        let mut budget = RetryBudget::default();
        let token = outcome.session_token;

        // The session write may not be readable yet; confirm it before
        // asking for a handoff token.
        let read_back = match self.api.read_session(&token).await {
            Err(e) if e.is_unauthorized() && budget.try_consume() => {
                info!("session not yet visible, retrying read-back");
                sleep(RETRY_DELAY).await;
                self.api.read_session(&token).await
            }
            other => other,
        };
        if let Err(e) = read_back {
            let cause = if e.is_unauthorized() {
                FlowError::SessionNotReady
            } else {
                map_api_error(&e)
            };
            warn!(?cause, "session read-back failed");
            self.state = advance(&self.state, FlowEvent::SessionUnavailable(cause));
            return &self.state;
        }
        self.state = advance(&self.state, FlowEvent::SessionConfirmed);

        let handoff = match self.api.request_handoff(&token, platform).await {
            Err(e) if e.is_unauthorized() && budget.try_consume() => {
                info!("handoff rejected as unauthenticated, retrying once");
                sleep(RETRY_DELAY).await;
                self.api.request_handoff(&token, platform).await
            }
            other => other,
        };
        let handoff = match handoff {
            Ok(handoff) => handoff,
            Err(e) => {
                let cause = if e.is_unauthorized() {
                    FlowError::SessionNotReady
                } else {
                    map_api_error(&e)
                };
                warn!(?cause, "handoff request failed");
                self.state = advance(&self.state, FlowEvent::HandoffFailed(cause));
                return &self.state;
            }
        };

        let redirect_url = match handoff.redirect_url.filter(|url| !url.is_empty()) {
            Some(url) => url,
            None => {
                warn!("handoff response missing redirect target");
                self.state = advance(
                    &self.state,
                    FlowEvent::HandoffFailed(FlowError::MalformedResponse),
                );
                return &self.state;
            }
        };

        self.state = advance(&self.state, FlowEvent::HandoffIssued);
        info!("handoff complete, redirecting");
        self.navigator.navigate(&redirect_url);
        &self.state
    }
}
