//! Identity service for the student and teacher platforms: credential
//! verification, session establishment and the session-to-token SSO
//! hand-off, plus the browser-side flow logic under [`client`].

pub mod app;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod platform;
pub mod sso;
pub mod state;
