//! Identity, role and token claims

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role flag carried by every identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Standard,
    Elevated,
}

impl Role {
    pub fn from_admin_flag(is_admin: bool) -> Self {
        if is_admin {
            Role::Elevated
        } else {
            Role::Standard
        }
    }

    pub fn is_admin(self) -> bool {
        self == Role::Elevated
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Standard => write!(f, "STANDARD"),
            Role::Elevated => write!(f, "ELEVATED"),
        }
    }
}

/// Payload signed into every token
///
/// Field names are the wire format; `sub` mirrors `login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Identity id
    pub id: String,
    /// Login name
    pub login: String,
    pub is_admin: bool,
    /// Unique token id
    pub jti: String,
    pub sub: String,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Expiration time (Unix seconds)
    pub exp: i64,
}

impl Claims {
    pub fn role(&self) -> Role {
        Role::from_admin_flag(self.is_admin)
    }

    /// The public identity view of these claims
    pub fn identity(&self) -> PublicIdentity {
        PublicIdentity {
            id: self.id.clone(),
            login: self.login.clone(),
            is_admin: self.is_admin,
        }
    }

    pub fn is_expired_at(&self, now: i64) -> bool {
        self.exp <= now
    }
}

/// What a client may learn about an identity. Never carries secrets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicIdentity {
    pub id: String,
    pub login: String,
    pub is_admin: bool,
}
