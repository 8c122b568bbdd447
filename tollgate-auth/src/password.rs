//! Credential verification using Argon2
//!
//! Hashes are stored in PHC string format (salt and parameters embedded).
//! Verification goes through the `password-hash` verifier, which compares
//! digests in constant time.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::error::CorruptCredential;

/// Result of comparing a presented secret with a stored hash
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordMatch {
    Match,
    Mismatch,
}

impl PasswordMatch {
    pub fn is_match(self) -> bool {
        self == Self::Match
    }
}

/// Hash a password using Argon2id
///
/// Returns the PHC-formatted hash string that includes the salt and parameters.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
}

/// Verify a presented secret against a stored hash
///
/// A hash that cannot be parsed is a [`CorruptCredential`], never a mismatch.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<PasswordMatch, CorruptCredential> {
    let parsed_hash =
        PasswordHash::new(stored_hash).map_err(|e| CorruptCredential(e.to_string()))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(PasswordMatch::Match),
        Err(argon2::password_hash::Error::Password) => Ok(PasswordMatch::Mismatch),
        Err(e) => Err(CorruptCredential(e.to_string())),
    }
}
