use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Request body for minting a handoff token. `platform` stays a raw string
/// so an unknown value maps to the invalid-platform rejection rather than a
/// body-extraction failure.
#[derive(Debug, Deserialize)]
pub struct SsoTokenRequest {
    pub platform: Option<String>,
}

/// Successful issuance. `token` is the raw secret the satellite redeems.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SsoTokenResponse {
    pub token: String,
    pub redirect_url: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}
