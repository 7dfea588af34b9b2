use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};
use time::Duration;

/// Fixed handoff token lifetime. Policy constant, not configurable.
pub const HANDOFF_TOKEN_TTL: Duration = Duration::minutes(5);

/// 256 bits of entropy per raw token.
pub const RAW_TOKEN_BYTES: usize = 32;

/// Mint a fresh raw token as unpadded url-safe base64.
///
/// The caller decides the RNG so tests can issue deterministically; release
/// paths pass `OsRng`.
pub fn generate_raw_token(rng: &mut (impl RngCore + CryptoRng)) -> String {
    let mut bytes = [0u8; RAW_TOKEN_BYTES];
    rng.fill_bytes(&mut bytes);
    Base64UrlUnpadded::encode_string(&bytes)
}

/// One-way digest of a raw token, hex-encoded. Only this form is ever
/// persisted or logged.
pub fn digest_raw_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    format!("{:x}", hasher.finalize())
}
