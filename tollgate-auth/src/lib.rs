//! Tollgate auth - token issuance, credential verification and the
//! request authorization gate.
//!
//! Logins are checked against one-way Argon2 hashes and answered with a
//! short-lived HMAC-signed token. The gate sits in front of every request,
//! lets public paths through untouched, and requires a valid bearer token
//! everywhere else.

pub mod claims;
pub mod error;
pub mod gate;
pub mod lifetime;
pub mod login;
pub mod password;
pub mod secret;
pub mod store;
pub mod token;

pub use claims::{Claims, PublicIdentity, Role};
pub use error::{
    ClientOutcome, CorruptCredential, GateError, LoginError, SecretError, StoreError,
    TokenError,
};
pub use gate::{
    extract_bearer, Authorization, Gate, LocalVerifier, PathMatcher, PublicPaths, RemoteVerifier,
    TokenVerifier,
};
pub use lifetime::{parse_lifetime, resolve_lifetime, DEFAULT_TOKEN_LIFETIME, MAX_TOKEN_LIFETIME};
pub use login::{LoginResult, LoginService};
pub use password::{hash_password, verify_password, PasswordMatch};
pub use secret::{SigningSecret, MIN_SECRET_LEN};
pub use store::{demo_users, CredentialRecord, CredentialStore, InMemoryCredentialStore};
pub use token::TokenMaker;
