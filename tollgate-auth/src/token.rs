//! Token issuance and verification
//!
//! Tokens are compact JWTs signed with HMAC-SHA256 over the claims payload.
//! Verification accepts only the HMAC family (HS256/HS384/HS512); a header
//! naming any other algorithm is rejected before the signature is looked at.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Deserialize;
use std::time::Duration;
use uuid::Uuid;

use crate::claims::{Claims, Role};
use crate::error::TokenError;
use crate::secret::SigningSecret;

/// Algorithms a token header may name
const HMAC_FAMILY: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Issues and verifies signed tokens
#[derive(Clone)]
pub struct TokenMaker {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenMaker {
    pub fn new(secret: &SigningSecret) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = HMAC_FAMILY.to_vec();
        // Expiry is checked against our own clock in `verify_at`
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Issue a token for an identity, valid for `duration` from now
    pub fn issue(
        &self,
        id: &str,
        login: &str,
        role: Role,
        duration: Duration,
    ) -> Result<(String, Claims), TokenError> {
        self.issue_at(Utc::now(), id, login, role, duration)
    }

    /// Issue a token as if the current time were `now`.
    ///
    /// `duration` must be a whole number of seconds so that `exp - iat` is
    /// exactly the lifetime, and the expiry must be a representable time.
    pub fn issue_at(
        &self,
        now: DateTime<Utc>,
        id: &str,
        login: &str,
        role: Role,
        duration: Duration,
    ) -> Result<(String, Claims), TokenError> {
        if duration.subsec_nanos() != 0 {
            return Err(TokenError::Signing(
                "token lifetime must be a whole number of seconds".into(),
            ));
        }
        let lifetime = i64::try_from(duration.as_secs())
            .map_err(|_| TokenError::Signing("token lifetime is out of range".into()))?;
        if lifetime <= 0 {
            return Err(TokenError::Signing(
                "token lifetime must be at least one second".into(),
            ));
        }

        let iat = now.timestamp();
        let exp = iat
            .checked_add(lifetime)
            .filter(|exp| DateTime::<Utc>::from_timestamp(*exp, 0).is_some())
            .ok_or_else(|| TokenError::Signing("token expiry is out of range".into()))?;
        let claims = Claims {
            id: id.to_string(),
            login: login.to_string(),
            is_admin: role.is_admin(),
            jti: Uuid::new_v4().to_string(),
            sub: login.to_string(),
            iat,
            exp,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        Ok((token, claims))
    }

    /// Verify a token against the signing secret and the current time
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, Utc::now().timestamp())
    }

    /// Verify a token as if the current Unix time were `now`
    pub fn verify_at(&self, token: &str, now: i64) -> Result<Claims, TokenError> {
        let algorithm = header_algorithm(token)?;
        if !is_hmac(&algorithm) {
            return Err(TokenError::AlgorithmMismatch);
        }

        let claims = decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| {
                use jsonwebtoken::errors::ErrorKind;
                match err.kind() {
                    ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                    ErrorKind::InvalidAlgorithm => TokenError::AlgorithmMismatch,
                    ErrorKind::ExpiredSignature => TokenError::Expired,
                    _ => TokenError::Malformed,
                }
            })?;

        if claims.is_expired_at(now) {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

#[derive(Deserialize)]
struct RawHeader {
    alg: String,
}

/// Read the `alg` field from the token header without trusting anything else
fn header_algorithm(token: &str) -> Result<String, TokenError> {
    let mut parts = token.split('.');
    let (Some(header), Some(_), Some(_), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(TokenError::Malformed);
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(header)
        .map_err(|_| TokenError::Malformed)?;
    let header: RawHeader = serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)?;

    Ok(header.alg)
}

fn is_hmac(algorithm: &str) -> bool {
    matches!(algorithm, "HS256" | "HS384" | "HS512")
}

/// Decode claims without checking the signature.
///
/// Only for tokens a trusted verification endpoint has already accepted.
pub(crate) fn decode_unverified(token: &str) -> Result<Claims, TokenError> {
    let mut parts = token.split('.');
    let payload = parts.nth(1).ok_or(TokenError::Malformed)?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| TokenError::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SECRET_A: &str = "test-secret-that-is-at-least-32-characters-long";
    const SECRET_B: &str = "different-secret-that-is-at-least-32-characters";

    fn maker(secret: &str) -> TokenMaker {
        TokenMaker::new(&SigningSecret::new(secret).unwrap())
    }

    fn reheader(token: &str, header_json: &str) -> String {
        let rest = token.split_once('.').unwrap().1;
        format!("{}.{}", URL_SAFE_NO_PAD.encode(header_json), rest)
    }

    #[test]
    fn test_issue_and_verify() {
        let maker = maker(SECRET_A);

        let (token, issued) = maker
            .issue("user-123", "admin", Role::Elevated, Duration::from_secs(3600))
            .unwrap();
        assert!(!token.is_empty());

        let claims = maker.verify(&token).unwrap();
        assert_eq!(claims, issued);
        assert_eq!(claims.id, "user-123");
        assert_eq!(claims.login, "admin");
        assert_eq!(claims.sub, "admin");
        assert_eq!(claims.role(), Role::Elevated);
    }

    #[test]
    fn test_expiry_is_exactly_duration_after_issue() {
        let maker = maker(SECRET_A);
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();

        let (_, claims) = maker
            .issue_at(now, "id", "user", Role::Standard, Duration::from_secs(900))
            .unwrap();

        assert_eq!(claims.iat, now.timestamp());
        assert_eq!(claims.exp - claims.iat, 900);
    }

    #[test]
    fn test_token_ids_are_unique() {
        let maker = maker(SECRET_A);
        let (_, a) = maker.issue("id", "user", Role::Standard, Duration::from_secs(60)).unwrap();
        let (_, b) = maker.issue("id", "user", Role::Standard, Duration::from_secs(60)).unwrap();
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn test_zero_lifetime_is_refused() {
        let maker = maker(SECRET_A);
        let result = maker.issue("id", "user", Role::Standard, Duration::ZERO);
        assert!(matches!(result, Err(TokenError::Signing(_))));
    }

    #[test]
    fn test_sub_second_lifetime_is_refused() {
        let maker = maker(SECRET_A);
        for duration in [Duration::from_millis(1999), Duration::from_millis(500)] {
            let result = maker.issue("id", "user", Role::Standard, duration);
            assert!(matches!(result, Err(TokenError::Signing(_))), "{duration:?}");
        }
    }

    #[test]
    fn test_unrepresentable_expiry_is_refused() {
        let maker = maker(SECRET_A);
        for secs in [i64::MAX as u64, u64::MAX, 8_300_000_000_000] {
            let result = maker.issue("id", "admin", Role::Elevated, Duration::from_secs(secs));
            assert!(matches!(result, Err(TokenError::Signing(_))), "{secs}");
        }

        let (_, claims) = maker
            .issue("id", "admin", Role::Elevated, crate::lifetime::MAX_TOKEN_LIFETIME)
            .unwrap();
        assert_eq!(
            claims.exp - claims.iat,
            crate::lifetime::MAX_TOKEN_LIFETIME.as_secs() as i64
        );
    }

    #[test]
    fn test_expired_token() {
        let maker = maker(SECRET_A);
        let (token, claims) = maker
            .issue("id", "user", Role::Standard, Duration::from_secs(60))
            .unwrap();

        assert!(maker.verify_at(&token, claims.exp - 1).is_ok());
        assert_eq!(maker.verify_at(&token, claims.exp), Err(TokenError::Expired));
        assert_eq!(maker.verify_at(&token, claims.exp + 3600), Err(TokenError::Expired));
    }

    #[test]
    fn test_token_issued_in_the_past_is_expired() {
        let maker = maker(SECRET_A);
        let two_hours_ago = Utc::now() - chrono::Duration::hours(2);

        let (token, _) = maker
            .issue_at(two_hours_ago, "id", "user", Role::Standard, Duration::from_secs(3600))
            .unwrap();

        assert_eq!(maker.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_wrong_secret() {
        let (token, _) = maker(SECRET_A)
            .issue("id", "user", Role::Standard, Duration::from_secs(3600))
            .unwrap();

        assert_eq!(
            maker(SECRET_B).verify(&token),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_tampered_payload() {
        let maker = maker(SECRET_A);
        let (token, claims) = maker
            .issue("id", "user", Role::Standard, Duration::from_secs(3600))
            .unwrap();

        let mut forged = claims.clone();
        forged.is_admin = true;
        let parts: Vec<&str> = token.split('.').collect();
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged).unwrap());
        let tampered = format!("{}.{}.{}", parts[0], payload, parts[2]);

        assert_eq!(maker.verify(&tampered), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_non_hmac_algorithm_rejected() {
        let maker = maker(SECRET_A);
        let (token, _) = maker
            .issue("id", "user", Role::Standard, Duration::from_secs(3600))
            .unwrap();

        for header in [
            r#"{"alg":"RS256","typ":"JWT"}"#,
            r#"{"alg":"ES256","typ":"JWT"}"#,
            r#"{"alg":"none","typ":"JWT"}"#,
            r#"{"alg":"EdDSA","typ":"JWT"}"#,
        ] {
            assert_eq!(
                maker.verify(&reheader(&token, header)),
                Err(TokenError::AlgorithmMismatch),
                "{header}"
            );
        }
    }

    #[test]
    fn test_other_hmac_variant_accepted() {
        let secret = SigningSecret::new(SECRET_A).unwrap();
        let maker = TokenMaker::new(&secret);
        let (_, claims) = maker
            .issue("id", "user", Role::Standard, Duration::from_secs(3600))
            .unwrap();

        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET_A.as_bytes()),
        )
        .unwrap();

        assert_eq!(maker.verify(&token).unwrap(), claims);
    }

    #[test]
    fn test_malformed_tokens() {
        let maker = maker(SECRET_A);

        for token in ["", "invalid-token", "a.b", "a.b.c.d", "!!!.???.###"] {
            assert_eq!(maker.verify(token), Err(TokenError::Malformed), "{token}");
        }
    }

    #[test]
    fn test_missing_claims_are_malformed() {
        let token = encode(
            &Header::new(Algorithm::HS256),
            &serde_json::json!({ "sub": "user", "exp": Utc::now().timestamp() + 60 }),
            &EncodingKey::from_secret(SECRET_A.as_bytes()),
        )
        .unwrap();

        assert_eq!(maker(SECRET_A).verify(&token), Err(TokenError::Malformed));
    }

    #[test]
    fn test_decode_unverified() {
        let (token, claims) = maker(SECRET_A)
            .issue("id", "user", Role::Standard, Duration::from_secs(60))
            .unwrap();
        assert_eq!(decode_unverified(&token).unwrap(), claims);
        assert!(decode_unverified("garbage").is_err());
    }
}
