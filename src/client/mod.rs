//! Browser-side half of the hand-off protocol: the HTTP seam, the login
//! flow state machine, the activity monitor and the local session state.
//! Everything here talks to the server through [`api::AuthApi`], so the
//! whole module runs against fakes in tests.

pub mod activity;
pub mod api;
pub mod orchestrator;
pub mod session;
