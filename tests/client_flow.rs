//! End-to-end client flow: the login orchestrator talking to the real
//! router through an in-process transport, no sockets involved.

mod common;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::Router;
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;
use serde_json::json;
use tower::ServiceExt;

use common::{test_app, test_app_with_config, PASSWORD, PENDING_EMAIL, STUDENT_EMAIL};
use schoolgate::client::api::{
    ApiError, AuthApi, HandoffOutcome, LoginOutcome, Rejection, SessionUser,
};
use schoolgate::client::orchestrator::{FlowError, FlowState, LoginFlow, Navigator};
use schoolgate::config::PlatformUrls;
use schoolgate::platform::Platform;
use schoolgate::state::AppState;

struct RouterApi {
    router: Router,
}

impl RouterApi {
    fn new(router: Router) -> Arc<Self> {
        Arc::new(Self { router })
    }

    async fn call<T: DeserializeOwned>(&self, request: Request<Body>) -> Result<T, ApiError> {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?
            .to_bytes();

        if status.is_success() {
            return serde_json::from_slice(&bytes).map_err(|e| ApiError::Transport(e.to_string()));
        }

        #[derive(Default, serde::Deserialize)]
        struct ErrorBody {
            error: Option<String>,
            code: Option<String>,
        }
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap_or_default();
        Err(ApiError::Rejected(Rejection {
            status: status.as_u16(),
            code: body.code,
            message: body.error,
        }))
    }
}

#[async_trait]
impl AuthApi for RouterApi {
    async fn login(
        &self,
        email: &str,
        password: &str,
        platform: Platform,
    ) -> Result<LoginOutcome, ApiError> {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({ "email": email, "password": password, "platform": platform }).to_string(),
            ))
            .unwrap();
        self.call(request).await
    }

    async fn read_session(&self, session_token: &str) -> Result<SessionUser, ApiError> {
        let request = Request::builder()
            .method(Method::GET)
            .uri("/auth/session")
            .header(header::AUTHORIZATION, format!("Bearer {session_token}"))
            .body(Body::empty())
            .unwrap();
        self.call(request).await
    }

    async fn request_handoff(
        &self,
        session_token: &str,
        platform: Platform,
    ) -> Result<HandoffOutcome, ApiError> {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/auth/sso-token")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {session_token}"))
            .body(Body::from(json!({ "platform": platform }).to_string()))
            .unwrap();
        self.call(request).await
    }

    async fn logout(&self, session_token: &str) -> Result<(), ApiError> {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/auth/logout")
            .header(header::AUTHORIZATION, format!("Bearer {session_token}"))
            .body(Body::empty())
            .unwrap();
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(ApiError::Rejected(Rejection {
                status: response.status().as_u16(),
                code: None,
                message: None,
            }))
        }
    }
}

#[derive(Default)]
struct RecordingNavigator {
    targets: Mutex<Vec<String>>,
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, url: &str) {
        self.targets.lock().unwrap().push(url.to_string());
    }
}

#[tokio::test]
async fn student_flow_redirects_to_the_student_origin() {
    let app = test_app().await;
    let origin = app
        .config
        .platforms
        .origin(Platform::Student)
        .unwrap()
        .to_string();

    let navigator = Arc::new(RecordingNavigator::default());
    let mut flow = LoginFlow::new(RouterApi::new(app.router), navigator.clone());

    let state = flow.submit(STUDENT_EMAIL, PASSWORD, Platform::Student).await;
    assert_eq!(*state, FlowState::Redirecting);

    let targets = navigator.targets.lock().unwrap();
    assert_eq!(targets.len(), 1);
    assert!(targets[0].starts_with(&format!("{origin}/sso?token=")));
}

#[tokio::test]
async fn wrong_password_surfaces_invalid_credentials() {
    let app = test_app().await;
    let navigator = Arc::new(RecordingNavigator::default());
    let mut flow = LoginFlow::new(RouterApi::new(app.router), navigator.clone());

    flow.submit(STUDENT_EMAIL, "wrong", Platform::Student).await;
    assert_eq!(
        flow.state(),
        &FlowState::AuthFailed(FlowError::InvalidCredentials)
    );
    assert_eq!(
        flow.last_error().unwrap().user_message(),
        "Invalid email or password"
    );
    assert!(navigator.targets.lock().unwrap().is_empty());
}

#[tokio::test]
async fn pending_teacher_surfaces_approval_pending() {
    let app = test_app().await;
    let navigator = Arc::new(RecordingNavigator::default());
    let mut flow = LoginFlow::new(RouterApi::new(app.router), navigator);

    flow.submit(PENDING_EMAIL, PASSWORD, Platform::Teacher).await;
    assert_eq!(
        flow.state(),
        &FlowState::AuthFailed(FlowError::ApprovalPending)
    );
}

#[tokio::test]
async fn wrong_surface_surfaces_platform_mismatch() {
    let app = test_app().await;
    let navigator = Arc::new(RecordingNavigator::default());
    let mut flow = LoginFlow::new(RouterApi::new(app.router), navigator);

    flow.submit(STUDENT_EMAIL, PASSWORD, Platform::Teacher).await;
    assert_eq!(
        flow.state(),
        &FlowState::AuthFailed(FlowError::PlatformMismatch)
    );
}

#[tokio::test]
async fn unconfigured_origin_fails_the_flow_with_the_generic_message() {
    let mut config = AppState::fake_config();
    config.platforms = PlatformUrls {
        student: None,
        teacher: Some("http://localhost:5174".into()),
    };
    let app = test_app_with_config(config).await;

    let navigator = Arc::new(RecordingNavigator::default());
    let mut flow = LoginFlow::new(RouterApi::new(app.router), navigator.clone());

    flow.submit(STUDENT_EMAIL, PASSWORD, Platform::Student).await;
    assert_eq!(
        flow.state(),
        &FlowState::TokenFailed(FlowError::PlatformUnavailable)
    );
    assert_eq!(
        flow.last_error().unwrap().user_message(),
        "Something went wrong. Please try again later"
    );
    assert!(navigator.targets.lock().unwrap().is_empty());
}
