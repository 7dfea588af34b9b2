use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::repo::User;
use crate::platform::Platform;

/// The authenticated identity a session carries.
///
/// Built once at login (or refresh) from the user row and embedded in the
/// signed session artifact, so later requests need no database round trip.
/// Never contains the password hash. Immutable for the life of one session;
/// role or approval changes only take effect at the next establishment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: Uuid,
    pub role: Platform,
    pub approved: bool,
    pub first_name: String,
    pub last_name: String,
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            role: user.role,
            approved: user.approved,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }
}
