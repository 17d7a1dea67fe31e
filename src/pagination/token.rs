//! Continuation token signing
//!
//! Tokens are HS256 JWTs. They carry the query fingerprint, never SQL or
//! catalog mappings, so a client cannot alter what a token will run.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::cursor::CursorState;
use super::errors::{PaginationError, PaginationResult};

/// Claims of a continuation token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageClaims {
    /// Query fingerprint
    pub fp: String,
    /// Page size
    pub ps: u32,
    pub cursor: CursorState,
    /// Page number this token fetches (1-based)
    pub pg: u32,
    /// Catalog generation the query was compiled under
    pub gen: u64,
    /// Single-use nonce
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
}

/// Token signer configuration
#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub secret: String,
    pub ttl: Duration,
    pub issuer: String,
    pub audience: String,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: "CHANGE_THIS_SECRET_IN_PRODUCTION".to_string(),
            ttl: Duration::minutes(15),
            issuer: "querypilot".to_string(),
            audience: "querypilot".to_string(),
        }
    }
}

/// Mints and verifies continuation tokens
#[derive(Clone)]
pub struct TokenSigner {
    config: TokenConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenSigner {
    pub fn new(config: TokenConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// Token lifetime
    pub fn ttl(&self) -> Duration {
        self.config.ttl
    }

    /// Builds fresh claims stamped with a new nonce and expiry.
    pub fn claims(
        &self,
        fingerprint: &str,
        page_size: u32,
        cursor: CursorState,
        page: u32,
        generation: u64,
    ) -> PageClaims {
        let now = Utc::now();
        PageClaims {
            fp: fingerprint.to_string(),
            ps: page_size,
            cursor,
            pg: page,
            gen: generation,
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: (now + self.config.ttl).timestamp(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
        }
    }

    pub fn sign(&self, claims: &PageClaims) -> PaginationResult<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|_| PaginationError::TokenGenerationFailed)
    }

    /// Verifies signature, issuer, audience and expiry (zero leeway).
    pub fn verify(&self, token: &str) -> PaginationResult<PageClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[&self.config.audience]);
        validation.set_issuer(&[&self.config.issuer]);
        validation.leeway = 0;

        let data = decode::<PageClaims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => PaginationError::ExpiredToken,
                _ => PaginationError::InvalidToken,
            }
        })?;

        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::SqlParam;

    fn signer() -> TokenSigner {
        TokenSigner::new(TokenConfig {
            secret: "test_secret_key_for_testing_only".to_string(),
            ..TokenConfig::default()
        })
    }

    #[test]
    fn test_sign_and_verify() {
        let signer = signer();
        let cursor = CursorState::Keyset {
            values: vec![SqlParam::Integer(10)],
        };
        let claims = signer.claims("fp-1", 10, cursor.clone(), 2, 1);
        let token = signer.sign(&claims).unwrap();

        let verified = signer.verify(&token).unwrap();
        assert_eq!(verified.fp, "fp-1");
        assert_eq!(verified.ps, 10);
        assert_eq!(verified.cursor, cursor);
        assert_eq!(verified.pg, 2);
    }

    #[test]
    fn test_nonces_are_unique() {
        let signer = signer();
        let a = signer.claims("fp", 10, CursorState::Start, 2, 1);
        let b = signer.claims("fp", 10, CursorState::Start, 2, 1);
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn test_expired_token() {
        let signer = signer();
        let mut claims = signer.claims("fp", 10, CursorState::Start, 2, 1);
        claims.iat -= 3600;
        claims.exp = claims.iat + 60;
        let token = signer.sign(&claims).unwrap();
        assert_eq!(signer.verify(&token), Err(PaginationError::ExpiredToken));
    }

    #[test]
    fn test_tampered_token() {
        let signer = signer();
        let token = signer
            .sign(&signer.claims("fp", 10, CursorState::Start, 2, 1))
            .unwrap();
        let mut tampered = token.clone();
        tampered.push('x');
        assert_eq!(signer.verify(&tampered), Err(PaginationError::InvalidToken));
        assert_eq!(signer.verify("not-a-token"), Err(PaginationError::InvalidToken));
    }

    #[test]
    fn test_foreign_secret_or_audience() {
        let token = signer()
            .sign(&signer().claims("fp", 10, CursorState::Start, 2, 1))
            .unwrap();

        let other_secret = TokenSigner::new(TokenConfig {
            secret: "another_secret".to_string(),
            ..TokenConfig::default()
        });
        assert_eq!(other_secret.verify(&token), Err(PaginationError::InvalidToken));

        let other_audience = TokenSigner::new(TokenConfig {
            secret: "test_secret_key_for_testing_only".to_string(),
            audience: "someone-else".to_string(),
            ..TokenConfig::default()
        });
        assert_eq!(other_audience.verify(&token), Err(PaginationError::InvalidToken));
    }
}
