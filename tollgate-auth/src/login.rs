//! Login flow: credential lookup, secret verification, token issuance
//!
//! An unknown login and a wrong secret produce the same error, and both
//! paths run one Argon2 verification so they cost the same.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::claims::PublicIdentity;
use crate::error::{CorruptCredential, LoginError, TokenError};
use crate::password::{hash_password, verify_password, PasswordMatch};
use crate::store::CredentialStore;
use crate::token::TokenMaker;

/// Successful login
#[derive(Debug, Clone)]
pub struct LoginResult {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: PublicIdentity,
}

/// Composes the credential store, the credential verifier and the token maker
#[derive(Clone)]
pub struct LoginService {
    store: Arc<dyn CredentialStore>,
    maker: TokenMaker,
    lifetime: Duration,
    /// Verified against when the login is unknown
    dummy_hash: Option<Arc<str>>,
}

impl LoginService {
    pub fn new(store: Arc<dyn CredentialStore>, maker: TokenMaker, lifetime: Duration) -> Self {
        let dummy_hash = hash_password("tollgate-unknown-login").ok().map(Arc::from);
        Self {
            store,
            maker,
            lifetime,
            dummy_hash,
        }
    }

    pub fn maker(&self) -> &TokenMaker {
        &self.maker
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Authenticate `login`/`password` and issue a token
    pub async fn login(&self, login: &str, password: &str) -> Result<LoginResult, LoginError> {
        let record = self
            .store
            .fetch_by_login(login)
            .await?;

        let Some(record) = record else {
            if let Some(dummy) = &self.dummy_hash {
                let _ = check_password(password, dummy).await;
            }
            // The login field sometimes holds a mistyped secret
            warn!(login_len = login.len(), "Login failed - unknown login");
            debug!(login = %login, "Unknown login");
            return Err(LoginError::InvalidCredentials);
        };

        match check_password(password, &record.password_hash).await? {
            Ok(PasswordMatch::Match) => {}
            Ok(PasswordMatch::Mismatch) => {
                warn!(login = %login, "Login failed - invalid password");
                return Err(LoginError::InvalidCredentials);
            }
            Err(corrupt) => {
                error!(login = %login, id = %record.id, error = %corrupt, "Stored credential is corrupt");
                return Err(LoginError::CorruptCredential(corrupt));
            }
        }

        let (token, claims) = self
            .maker
            .issue(&record.id, &record.login, record.role(), self.lifetime)
            .map_err(|e| {
                error!(login = %login, error = %e, "Token issuance failed");
                LoginError::Signing(e)
            })?;

        let expires_at = DateTime::<Utc>::from_timestamp(claims.exp, 0).ok_or_else(|| {
            LoginError::Signing(TokenError::Signing("expiry out of range".into()))
        })?;

        info!(login = %login, role = %record.role(), "Login successful");

        Ok(LoginResult {
            token,
            expires_at,
            user: record.identity(),
        })
    }

    /// Current public view of an identity, re-read from the store
    pub async fn identity(&self, id: &str) -> Result<Option<PublicIdentity>, LoginError> {
        let record = self.store.fetch_by_id(id).await?;
        Ok(record.map(|r| r.identity()))
    }
}

/// Run the Argon2 comparison off the async executor
async fn check_password(
    password: &str,
    hash: &str,
) -> Result<Result<PasswordMatch, CorruptCredential>, LoginError> {
    let password = password.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| LoginError::Verification(e.to_string()))
}
