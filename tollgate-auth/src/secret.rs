//! Process-wide signing secret
//!
//! Loaded once at startup and shared read-only by every token operation.

use std::fmt;
use std::sync::Arc;

use zeroize::Zeroizing;

use crate::error::SecretError;

/// Minimum accepted secret length in bytes
pub const MIN_SECRET_LEN: usize = 32;

/// Symmetric key used to sign and verify tokens.
///
/// Cloning is cheap; all clones share the same bytes, which are wiped when
/// the last clone is dropped.
#[derive(Clone)]
pub struct SigningSecret(Arc<Zeroizing<Vec<u8>>>);

impl SigningSecret {
    /// Validate and wrap a secret. Shorter than [`MIN_SECRET_LEN`] bytes is
    /// an error; callers treat it as fatal at startup.
    pub fn new(secret: impl Into<Vec<u8>>) -> Result<Self, SecretError> {
        let bytes = Zeroizing::new(secret.into());

        if bytes.is_empty() {
            return Err(SecretError::Missing);
        }

        if bytes.len() < MIN_SECRET_LEN {
            return Err(SecretError::TooShort {
                min: MIN_SECRET_LEN,
                actual: bytes.len(),
            });
        }

        Ok(Self(Arc::new(bytes)))
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        self.0.as_slice()
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningSecret([REDACTED; {} bytes])", self.0.len())
    }
}
