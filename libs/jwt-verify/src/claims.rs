use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims carried by an OrderHub access token.
///
/// `sub` is the user id as a UUID string, `role` one of the `ROLE_*` names,
/// `jti` the blacklist key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub iss: String,
    pub aud: String,
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
    pub role: String,
}

impl AccessClaims {
    /// Parse the subject as a user id.
    pub fn user_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }
}
