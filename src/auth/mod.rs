use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod handlers;
pub mod password;
pub mod principal;
pub mod repo;
pub mod session;
pub mod verifier;

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::auth_routes())
}
