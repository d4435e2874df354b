//! HS256 identity token issuance.

use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretSlice};
use thiserror::Error;
use tracing::debug;

use crate::claims::{TokenClaims, TokenValidationError, validate_claims};

pub const DEFAULT_ISSUER: &str = "authgate";
pub const DEFAULT_AUDIENCE: &str = "authgate-services";
pub const DEFAULT_KEY_ID: &str = "1";

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("missing signing secret")]
    MissingSecret,

    #[error("missing token subject")]
    MissingSubject,

    #[error("token duration must be at least one second")]
    InvalidDuration,

    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

#[derive(Debug, Error)]
pub enum TokenDecodeError {
    #[error("missing signing secret")]
    MissingSecret,

    /// Bad signature, wrong algorithm, issuer or audience, or malformed token.
    #[error("invalid token: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Claims(#[from] TokenValidationError),
}

/// Issues a signed token for a verified subject.
pub trait TokenIssuer: Send + Sync {
    fn issue_token(&self, subject: &str) -> Result<String, TokenError>;
}

pub struct TokenIssuerConfig {
    pub secret: SecretSlice<u8>,
    pub duration: Duration,
    pub issuer: String,
    pub audience: Vec<String>,
    /// `kid` header, reserved for key rotation.
    pub key_id: String,
}

impl TokenIssuerConfig {
    /// Config with the default issuer, audience and key id.
    pub fn new(secret: impl Into<Vec<u8>>, duration: Duration) -> Self {
        Self {
            secret: SecretSlice::from(secret.into()),
            duration,
            issuer: DEFAULT_ISSUER.to_string(),
            audience: vec![DEFAULT_AUDIENCE.to_string()],
            key_id: DEFAULT_KEY_ID.to_string(),
        }
    }
}

impl core::fmt::Debug for TokenIssuerConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenIssuerConfig")
            .field("secret", &"[REDACTED]")
            .field("duration", &self.duration)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("key_id", &self.key_id)
            .finish()
    }
}

/// HMAC-SHA256 signed JWTs.
#[derive(Debug)]
pub struct Hs256TokenIssuer {
    config: TokenIssuerConfig,
}

impl Hs256TokenIssuer {
    pub fn new(config: TokenIssuerConfig) -> Self {
        Self { config }
    }

    pub fn issue_token_at(&self, subject: &str, now: DateTime<Utc>) -> Result<String, TokenError> {
        let secret = self.config.secret.expose_secret();
        if secret.is_empty() {
            return Err(TokenError::MissingSecret);
        }
        if subject.is_empty() {
            return Err(TokenError::MissingSubject);
        }
        let ttl = i64::try_from(self.config.duration.as_secs())
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or(TokenError::InvalidDuration)?;

        let iat = now.timestamp();
        let exp = iat.checked_add(ttl).ok_or(TokenError::InvalidDuration)?;
        let claims = TokenClaims {
            sub: subject.to_string(),
            iat,
            nbf: iat,
            exp,
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
        };

        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some(self.config.key_id.clone());

        let token = jsonwebtoken::encode(&header, &claims, &EncodingKey::from_secret(secret))
            .map_err(TokenError::Signing)?;

        debug!(sub = subject, exp, kid = %self.config.key_id, "issued token");
        Ok(token)
    }

    /// Verify signature, issuer and audience, then the time window at `now`.
    pub fn decode_token(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenDecodeError> {
        let secret = self.config.secret.expose_secret();
        if secret.is_empty() {
            return Err(TokenDecodeError::MissingSecret);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.config.issuer.as_str()]);
        validation.set_audience(self.config.audience.as_slice());
        validation.set_required_spec_claims(&["exp", "nbf", "iat", "sub", "iss", "aud"]);
        // Time checks are done by `validate_claims` against the caller's clock.
        validation.validate_exp = false;
        validation.validate_nbf = false;

        let data = jsonwebtoken::decode::<TokenClaims>(
            token,
            &DecodingKey::from_secret(secret),
            &validation,
        )
        .map_err(TokenDecodeError::Invalid)?;

        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

impl TokenIssuer for Hs256TokenIssuer {
    fn issue_token(&self, subject: &str) -> Result<String, TokenError> {
        self.issue_token_at(subject, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    fn issuer(secret: &str, duration: Duration) -> Hs256TokenIssuer {
        Hs256TokenIssuer::new(TokenIssuerConfig::new(secret.as_bytes(), duration))
    }

    #[test]
    fn issued_token_decodes_to_subject() {
        let issuer = issuer("test-secret", DAY);
        let now = Utc::now();

        let token = issuer.issue_token_at("test-user", now).unwrap();
        let claims = issuer.decode_token(&token, now).unwrap();

        assert_eq!(claims.sub, "test-user");
        assert_eq!(claims.iss, DEFAULT_ISSUER);
        assert_eq!(claims.aud, vec![DEFAULT_AUDIENCE.to_string()]);
        assert_eq!(claims.nbf, claims.iat);
        assert_eq!(claims.exp - claims.iat, 24 * 60 * 60);
    }

    #[test]
    fn token_is_compact_and_carries_key_id() {
        let token = issuer("test-secret", DAY).issue_token("alice").unwrap();
        assert_eq!(token.split('.').count(), 3);

        let header = jsonwebtoken::decode_header(&token).unwrap();
        assert_eq!(header.alg, Algorithm::HS256);
        assert_eq!(header.kid.as_deref(), Some(DEFAULT_KEY_ID));
    }

    #[test]
    fn token_expires_after_duration() {
        let duration = Duration::from_secs(3600);
        let issuer = issuer("test-secret", duration);
        let now = Utc::now();
        let token = issuer.issue_token_at("alice", now).unwrap();

        let later = now + chrono::Duration::seconds(3600);
        assert!(matches!(
            issuer.decode_token(&token, later),
            Err(TokenDecodeError::Claims(TokenValidationError::Expired))
        ));

        let just_before = now + chrono::Duration::seconds(3599);
        assert!(issuer.decode_token(&token, just_before).is_ok());
    }

    #[test]
    fn empty_secret_fails_before_signing() {
        let err = issuer("", DAY).issue_token("alice").unwrap_err();
        assert!(matches!(err, TokenError::MissingSecret));
        assert_eq!(err.to_string(), "missing signing secret");
    }

    #[test]
    fn zero_duration_is_rejected() {
        assert!(matches!(
            issuer("s", Duration::ZERO).issue_token("alice"),
            Err(TokenError::InvalidDuration)
        ));
        assert!(matches!(
            issuer("s", Duration::from_millis(500)).issue_token("alice"),
            Err(TokenError::InvalidDuration)
        ));
    }

    #[test]
    fn empty_subject_is_rejected() {
        assert!(matches!(
            issuer("s", DAY).issue_token(""),
            Err(TokenError::MissingSubject)
        ));
    }

    #[test]
    fn other_secret_cannot_decode() {
        let token = issuer("secret-a", DAY).issue_token("alice").unwrap();
        assert!(matches!(
            issuer("secret-b", DAY).decode_token(&token, Utc::now()),
            Err(TokenDecodeError::Invalid(_))
        ));
    }

    #[test]
    fn other_audience_cannot_decode() {
        let token = issuer("secret", DAY).issue_token("alice").unwrap();

        let mut config = TokenIssuerConfig::new("secret", DAY);
        config.audience = vec!["someone-else".to_string()];
        let other = Hs256TokenIssuer::new(config);

        assert!(matches!(
            other.decode_token(&token, Utc::now()),
            Err(TokenDecodeError::Invalid(_))
        ));
    }

    #[test]
    fn debug_output_redacts_secret() {
        let rendered = format!("{:?}", TokenIssuerConfig::new("super-secret-value", DAY));
        assert!(!rendered.contains("super-secret-value"));
    }

    proptest! {
        #[test]
        fn round_trip_recovers_subject(
            subject in "[A-Za-z0-9._@-]{1,32}",
            secret in prop::collection::vec(any::<u8>(), 1..64),
            secs in 1u64..(10 * 365 * 24 * 3600),
        ) {
            let issuer = Hs256TokenIssuer::new(TokenIssuerConfig::new(secret, Duration::from_secs(secs)));
            let now = Utc::now();
            let token = issuer.issue_token_at(&subject, now).unwrap();
            let claims = issuer.decode_token(&token, now).unwrap();
            prop_assert_eq!(claims.sub, subject);
            prop_assert!(claims.exp > claims.iat);
        }
    }
}
