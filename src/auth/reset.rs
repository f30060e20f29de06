//! Signed, time-limited password reset tokens.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

#[derive(Debug, Serialize, Deserialize)]
struct ResetClaims {
    reset_password: i64,
    exp: u64,
}

#[derive(Clone)]
pub struct ResetTokens {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: u64,
}

impl ResetTokens {
    pub fn new(secret: &str, ttl_secs: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs,
        }
    }

    pub fn issue(&self, user_id: i64) -> AppResult<String> {
        self.issue_at(user_id, chrono::Utc::now().timestamp())
    }

    /// Issue a token as if the current time were `now` (unix seconds).
    pub fn issue_at(&self, user_id: i64, now: i64) -> AppResult<String> {
        let exp = u64::try_from(now)
            .map_err(|_| AppError::Internal("reset token issued before epoch".into()))?
            + self.ttl_secs;
        let claims = ResetClaims {
            reset_password: user_id,
            exp,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("reset token: {e}")))
    }

    /// User id bound to `token`. Bad signatures and expired tokens fail alike.
    pub fn verify(&self, token: &str) -> AppResult<i64> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        decode::<ResetClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims.reset_password)
            .map_err(|e| {
                tracing::debug!("Rejected reset token: {}", e);
                AppError::InvalidResetToken
            })
    }
}
