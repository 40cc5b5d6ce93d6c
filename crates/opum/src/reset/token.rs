//! Signed, time-limited password reset tokens and the links that carry them.
//!
//! Tokens are HS512 JWTs keyed with the employee's own salt. The salt never
//! leaves the server and credential stores rotate it on every password change,
//! so a link stops working once it has been used.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::{ResetConfig, DEFAULT_TOKEN_TTL_HOURS, MAX_TOKEN_TTL_HOURS};

const RESET_LINK_PATH: &str = "/online-pum-ui/resetPassword/resetPasswordLink";

/// Claims embedded in every reset token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetClaims {
    /// Intranet id the token was issued for.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("no signing salt recorded for this account")]
    MissingSalt,
    #[error("reset token outlives the configured lifetime")]
    Lifetime,
    #[error("reset token rejected: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("reset link could not be built: {0}")]
    Link(#[from] url::ParseError),
}

/// Issues and verifies reset tokens and builds reset links.
#[derive(Debug, Clone)]
pub struct ResetTokenIssuer {
    ttl: Duration,
    server_url: String,
}

impl ResetTokenIssuer {
    pub fn new(config: &ResetConfig) -> Self {
        Self {
            ttl: Duration::hours(config.token_ttl_hours.clamp(1, MAX_TOKEN_TTL_HOURS)),
            server_url: config.server_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn with_ttl(server_url: &str, ttl: Duration) -> Self {
        Self {
            ttl,
            server_url: server_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn generate(&self, email: &str, salt: &str) -> Result<String, TokenError> {
        self.generate_at(email, salt, Utc::now())
    }

    pub fn generate_at(
        &self,
        email: &str,
        salt: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        if salt.is_empty() {
            return Err(TokenError::MissingSalt);
        }

        let claims = ResetClaims {
            sub: email.to_string(),
            iat: issued_at.timestamp(),
            exp: (issued_at + self.ttl).timestamp(),
        };

        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(salt.as_bytes()),
        )?;
        Ok(token)
    }

    /// Checks signature, expiry and that the token was not issued for longer
    /// than the configured lifetime. Does not compare the subject; see
    /// [`ResetTokenIssuer::is_issued_for`].
    pub fn verify(&self, token: &str, salt: &str) -> Result<ResetClaims, TokenError> {
        if salt.is_empty() {
            return Err(TokenError::MissingSalt);
        }

        let data = decode::<ResetClaims>(
            token,
            &DecodingKey::from_secret(salt.as_bytes()),
            &Validation::new(Algorithm::HS512),
        )?;
        if data.claims.exp - data.claims.iat > self.ttl.num_seconds() {
            return Err(TokenError::Lifetime);
        }
        Ok(data.claims)
    }

    pub fn is_issued_for(&self, email: &str, token: &str, salt: &str) -> bool {
        match self.verify(token, salt) {
            Ok(claims) => claims.sub == email,
            Err(err) => {
                tracing::debug!(error = %err, "reset token failed verification");
                false
            }
        }
    }

    pub fn reset_link(&self, email: &str, token: &str) -> Result<String, TokenError> {
        let base = format!("{}{}", self.server_url, RESET_LINK_PATH);
        let url = Url::parse_with_params(&base, &[("email", email), ("token", token)])?;
        Ok(url.into())
    }
}

impl Default for ResetTokenIssuer {
    fn default() -> Self {
        Self::with_ttl(
            "http://localhost:8080",
            Duration::hours(DEFAULT_TOKEN_TTL_HOURS),
        )
    }
}
