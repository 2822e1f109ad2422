use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{TimeZone, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use tracing::debug;

use shared_models::auth::{JwtClaims, JwtHeader, Role, User};

type HmacSha256 = Hmac<Sha256>;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AuthError {
    #[error("JWT secret is not set")]
    MissingSecret,

    #[error("Invalid token format")]
    Malformed,

    #[error("Unsupported token algorithm {0}")]
    UnsupportedAlgorithm(String),

    #[error("Invalid token signature")]
    BadSignature,

    #[error("Invalid claims format")]
    BadClaims,

    #[error("Token expired")]
    Expired,
}

fn decode_segment(segment: &str) -> Result<Vec<u8>, AuthError> {
    URL_SAFE_NO_PAD.decode(segment).map_err(|e| {
        debug!("Failed to decode token segment: {}", e);
        AuthError::Malformed
    })
}

/// Validate an HS256 bearer token issued by the identity provider and turn
/// its claims into the caller.
pub fn validate_token(token: &str, jwt_secret: &str) -> Result<User, AuthError> {
    if jwt_secret.is_empty() {
        return Err(AuthError::MissingSecret);
    }

    let mut parts = token.split('.');
    let (Some(header_b64), Some(claims_b64), Some(signature_b64), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(AuthError::Malformed);
    };

    let header: JwtHeader =
        serde_json::from_slice(&decode_segment(header_b64)?).map_err(|_| AuthError::Malformed)?;
    if header.alg != "HS256" {
        return Err(AuthError::UnsupportedAlgorithm(header.alg));
    }

    let signature = decode_segment(signature_b64)?;
    let mut mac =
        HmacSha256::new_from_slice(jwt_secret.as_bytes()).map_err(|_| AuthError::MissingSecret)?;
    mac.update(header_b64.as_bytes());
    mac.update(b".");
    mac.update(claims_b64.as_bytes());
    if mac.verify_slice(&signature).is_err() {
        debug!("Token signature verification failed");
        return Err(AuthError::BadSignature);
    }

    let claims: JwtClaims = serde_json::from_slice(&decode_segment(claims_b64)?).map_err(|e| {
        debug!("Failed to parse claims: {}", e);
        AuthError::BadClaims
    })?;

    if let Some(exp) = claims.exp {
        let now = Utc::now().timestamp().max(0) as u64;
        if exp < now {
            debug!("Token expired at {} (now: {})", exp, now);
            return Err(AuthError::Expired);
        }
    }

    let user = User {
        role: Role::from_claim(claims.role.as_deref()),
        created_at: claims
            .iat
            .and_then(|iat| Utc.timestamp_opt(iat as i64, 0).single()),
        id: claims.sub,
        email: claims.email,
        name: claims.name,
    };

    debug!("Token validated for user {} ({:?})", user.id, user.role);
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{JwtTestUtils, TestUser};

    const SECRET: &str = "unit-test-secret";

    #[test]
    fn accepts_a_well_formed_token() {
        let doctor = TestUser::doctor("doc@example.com");
        let token = JwtTestUtils::create_test_token(&doctor, SECRET, Some(1));

        let user = validate_token(&token, SECRET).unwrap();
        assert_eq!(user.id, doctor.id);
        assert_eq!(user.role, Role::Doctor);
        assert_eq!(user.email.as_deref(), Some("doc@example.com"));
    }

    #[test]
    fn rejects_tampered_expired_and_malformed_tokens() {
        let patient = TestUser::default();

        let forged = JwtTestUtils::create_invalid_signature_token(&patient);
        assert_eq!(validate_token(&forged, SECRET), Err(AuthError::BadSignature));

        let expired = JwtTestUtils::create_expired_token(&patient, SECRET);
        assert_eq!(validate_token(&expired, SECRET), Err(AuthError::Expired));

        assert_eq!(
            validate_token(&JwtTestUtils::create_malformed_token(), SECRET),
            Err(AuthError::Malformed)
        );
        assert_eq!(validate_token("a.b", SECRET), Err(AuthError::Malformed));
    }

    #[test]
    fn empty_secret_rejects_everything() {
        let token = JwtTestUtils::create_test_token(&TestUser::default(), SECRET, None);
        assert_eq!(validate_token(&token, ""), Err(AuthError::MissingSecret));
    }
}
