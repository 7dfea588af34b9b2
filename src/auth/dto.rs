use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::principal::Principal;
use crate::platform::Platform;

/// Request body for login.
///
/// `platform` is the surface the form was rendered on; it is kept as a raw
/// string so an unknown value can be rejected explicitly instead of failing
/// body extraction.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub platform: Option<String>,
}

/// Response returned after login, session read-back or refresh.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub session_token: String,
    pub user: PublicUser,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub role: Platform,
    pub approved: bool,
    pub first_name: String,
    pub last_name: String,
}

impl From<&Principal> for PublicUser {
    fn from(p: &Principal) -> Self {
        Self {
            id: p.user_id,
            role: p.role,
            approved: p.approved,
            first_name: p.first_name.clone(),
            last_name: p.last_name.clone(),
        }
    }
}
