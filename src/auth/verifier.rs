use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use crate::auth::password::verify_password;
use crate::auth::principal::Principal;
use crate::auth::repo::UserStore;
use crate::error::AuthError;
use crate::platform::Platform;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Check a submitted email/password pair and the account gates.
///
/// Gate order: lookup, login-surface (platform) gate, digest compare,
/// approval gate, compare result. The compare always runs before any gate
/// consults its outcome, so an unapproved teacher gets `ApprovalPending`
/// whether or not the password was right, and timing does not separate the
/// gates. The returned principal never includes the password hash.
pub async fn verify_credentials(
    users: &dyn UserStore,
    email: &str,
    password: &str,
    requested_platform: Option<Platform>,
) -> Result<Principal, AuthError> {
    let email = email.trim().to_lowercase();

    if !is_valid_email(&email) {
        warn!("login with malformed email");
        return Err(AuthError::InvalidCredentials);
    }

    let user = match users.find_by_email(&email).await? {
        Some(user) => user,
        None => {
            warn!(%email, "login unknown email");
            return Err(AuthError::InvalidCredentials);
        }
    };

    if let Some(platform) = requested_platform {
        if platform != user.role {
            warn!(user_id = %user.id, %platform, role = %user.role, "login on wrong surface");
            return Err(AuthError::PlatformMismatch);
        }
    }

    let password_ok = verify_password(password, &user.password_hash)
        .map_err(|e| AuthError::Internal(anyhow::anyhow!(e.to_string())))?;

    if user.role == Platform::Teacher && !user.approved {
        info!(user_id = %user.id, "login while approval pending");
        return Err(AuthError::ApprovalPending);
    }

    if !password_ok {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AuthError::InvalidCredentials);
    }

    info!(user_id = %user.id, role = %user.role, "credentials verified");
    Ok(Principal::from(&user))
}
