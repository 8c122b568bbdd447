//! Error taxonomy for the authentication boundary
//!
//! Each failure kind carries enough detail for server-side logging, while
//! [`ClientOutcome`] is the only thing a client ever gets to see.

use std::fmt;

/// The small, fixed set of outcomes a client can observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientOutcome {
    InvalidCredentials,
    Unauthorized,
    ServerError,
}

impl ClientOutcome {
    /// HTTP status code for this outcome
    pub fn status_code(self) -> u16 {
        match self {
            Self::InvalidCredentials | Self::Unauthorized => 401,
            Self::ServerError => 500,
        }
    }

    /// Generic message safe to return to any client
    pub fn message(self) -> &'static str {
        match self {
            Self::InvalidCredentials => "Invalid credentials",
            Self::Unauthorized => "Unauthorized",
            Self::ServerError => "Internal server error",
        }
    }
}

impl fmt::Display for ClientOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Failures while issuing or verifying a token
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token algorithm is not in the HMAC family")]
    AlgorithmMismatch,

    #[error("token is malformed")]
    Malformed,

    #[error("token has expired")]
    Expired,

    /// A delegated verification endpoint refused the token
    #[error("token rejected by verification endpoint: {0}")]
    Rejected(String),

    #[error("failed to sign token: {0}")]
    Signing(String),
}

impl TokenError {
    /// Short, stable name used in structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidSignature => "invalid_signature",
            Self::AlgorithmMismatch => "algorithm_mismatch",
            Self::Malformed => "malformed",
            Self::Expired => "expired",
            Self::Rejected(_) => "rejected",
            Self::Signing(_) => "signing_error",
        }
    }

    pub fn client_outcome(&self) -> ClientOutcome {
        match self {
            Self::Signing(_) => ClientOutcome::ServerError,
            _ => ClientOutcome::Unauthorized,
        }
    }
}

/// The stored hash could not be parsed. Denies like a mismatch but is an
/// operational fault.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("stored credential hash is corrupt: {0}")]
pub struct CorruptCredential(pub String);

/// Failures of the authorization gate
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    #[error("authorization header is missing")]
    MissingCredential,

    #[error("authorization header is not of the form 'Bearer <token>'")]
    MalformedCredential,

    #[error("token verification failed: {0}")]
    InvalidToken(#[from] TokenError),

    /// The delegated verification endpoint could not be reached or answered
    /// with something other than accept/reject
    #[error("verification endpoint unavailable: {0}")]
    Unavailable(String),
}

impl GateError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingCredential => "missing_credential",
            Self::MalformedCredential => "malformed_credential",
            Self::InvalidToken(e) => e.kind(),
            Self::Unavailable(_) => "gate_unavailable",
        }
    }

    /// Every credential problem collapses to `Unauthorized`; only an
    /// unreachable verifier is a server fault.
    pub fn client_outcome(&self) -> ClientOutcome {
        match self {
            Self::Unavailable(_) => ClientOutcome::ServerError,
            _ => ClientOutcome::Unauthorized,
        }
    }
}

/// The credential store could not answer a lookup
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("credential store unavailable: {0}")]
    Unavailable(String),

    #[error("credential store returned an unreadable record: {0}")]
    Corrupt(String),
}

/// Failures of the login flow
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoginError {
    /// Unknown login or wrong secret. Deliberately indistinguishable.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error(transparent)]
    CorruptCredential(#[from] CorruptCredential),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The blocking password check could not be run
    #[error("password verification task failed: {0}")]
    Verification(String),

    #[error(transparent)]
    Signing(TokenError),
}

impl LoginError {
    pub fn client_outcome(&self) -> ClientOutcome {
        match self {
            Self::InvalidCredentials | Self::CorruptCredential(_) => {
                ClientOutcome::InvalidCredentials
            }
            Self::Store(_) | Self::Verification(_) | Self::Signing(_) => {
                ClientOutcome::ServerError
            }
        }
    }
}

/// The signing secret failed startup validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SecretError {
    #[error("signing secret is required")]
    Missing,

    #[error("signing secret must be at least {min} bytes (got {actual})")]
    TooShort { min: usize, actual: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_errors_collapse_to_unauthorized() {
        let errors = [
            GateError::MissingCredential,
            GateError::MalformedCredential,
            GateError::InvalidToken(TokenError::InvalidSignature),
            GateError::InvalidToken(TokenError::AlgorithmMismatch),
            GateError::InvalidToken(TokenError::Malformed),
            GateError::InvalidToken(TokenError::Expired),
            GateError::InvalidToken(TokenError::Rejected("nope".into())),
        ];

        for err in errors {
            assert_eq!(err.client_outcome(), ClientOutcome::Unauthorized, "{err}");
        }
    }

    #[test]
    fn test_unavailable_is_server_error() {
        let err = GateError::Unavailable("timed out".into());
        assert_eq!(err.client_outcome(), ClientOutcome::ServerError);
        assert_eq!(err.client_outcome().status_code(), 500);
    }

    #[test]
    fn test_login_errors() {
        assert_eq!(
            LoginError::InvalidCredentials.client_outcome(),
            ClientOutcome::InvalidCredentials
        );
        assert_eq!(
            LoginError::CorruptCredential(CorruptCredential("bad".into())).client_outcome(),
            ClientOutcome::InvalidCredentials
        );
        assert_eq!(
            LoginError::from(StoreError::Unavailable("down".into())).client_outcome(),
            ClientOutcome::ServerError
        );
    }
}
